//! Users and branches: reference records read for names and actor lookup.

use borka_core::{Branch, User};
use sqlx::{SqliteExecutor, SqlitePool};
use tracing::debug;

use crate::error::DbResult;

pub(crate) async fn fetch_user<'e>(exec: impl SqliteExecutor<'e>, id: &str) -> DbResult<Option<User>> {
    let user = sqlx::query_as::<_, User>("SELECT id, name, email FROM users WHERE id = ?1")
        .bind(id)
        .fetch_optional(exec)
        .await?;
    Ok(user)
}

pub(crate) async fn fetch_branch<'e>(
    exec: impl SqliteExecutor<'e>,
    id: &str,
) -> DbResult<Option<Branch>> {
    let branch = sqlx::query_as::<_, Branch>("SELECT id, name FROM branches WHERE id = ?1")
        .bind(id)
        .fetch_optional(exec)
        .await?;
    Ok(branch)
}

#[derive(Debug, Clone)]
pub struct UserRepository {
    pool: SqlitePool,
}

impl UserRepository {
    pub fn new(pool: SqlitePool) -> Self {
        UserRepository { pool }
    }

    /// Looks up the acting staff member.
    pub async fn get(&self, id: &str) -> DbResult<Option<User>> {
        fetch_user(&self.pool, id).await
    }

    pub async fn insert(&self, user: &User) -> DbResult<()> {
        debug!(id = %user.id, "Inserting user");

        sqlx::query("INSERT INTO users (id, name, email) VALUES (?1, ?2, ?3)")
            .bind(&user.id)
            .bind(&user.name)
            .bind(&user.email)
            .execute(&self.pool)
            .await?;

        Ok(())
    }
}

#[derive(Debug, Clone)]
pub struct BranchRepository {
    pool: SqlitePool,
}

impl BranchRepository {
    pub fn new(pool: SqlitePool) -> Self {
        BranchRepository { pool }
    }

    pub async fn get(&self, id: &str) -> DbResult<Option<Branch>> {
        fetch_branch(&self.pool, id).await
    }

    pub async fn list(&self) -> DbResult<Vec<Branch>> {
        let branches = sqlx::query_as::<_, Branch>("SELECT id, name FROM branches ORDER BY name")
            .fetch_all(&self.pool)
            .await?;
        Ok(branches)
    }

    pub async fn insert(&self, branch: &Branch) -> DbResult<()> {
        debug!(id = %branch.id, name = %branch.name, "Inserting branch");

        sqlx::query("INSERT INTO branches (id, name) VALUES (?1, ?2)")
            .bind(&branch.id)
            .bind(&branch.name)
            .execute(&self.pool)
            .await?;

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use crate::repository::testing::{gulshan, manager, test_db};

    #[tokio::test]
    async fn test_user_and_branch_lookup() {
        let db = test_db().await;
        db.users().insert(&manager()).await.unwrap();
        db.branches().insert(&gulshan()).await.unwrap();

        let user = db.users().get("user-manager").await.unwrap().unwrap();
        assert_eq!(user.display_name(), "Rumana Akter");
        assert!(db.users().get("nobody").await.unwrap().is_none());

        let branches = db.branches().list().await.unwrap();
        assert_eq!(branches, vec![gulshan()]);
    }
}
