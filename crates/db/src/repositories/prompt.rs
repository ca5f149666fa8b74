use sqlx::Row;

use super::{PromptRepository, RepositoryError};
use crate::DbPool;

pub struct SqlPromptRepository {
    pool: DbPool,
}

impl SqlPromptRepository {
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }
}

#[async_trait::async_trait]
impl PromptRepository for SqlPromptRepository {
    async fn find_prompt(&self, key: &str) -> Result<Option<String>, RepositoryError> {
        let row = sqlx::query("SELECT prompt_text FROM system_prompts WHERE prompt_key = ?")
            .bind(key)
            .fetch_optional(&self.pool)
            .await?;

        Ok(row.map(|row| row.try_get::<String, _>("prompt_text")).transpose()?)
    }

    async fn save_prompt(&self, key: &str, text: &str) -> Result<(), RepositoryError> {
        sqlx::query(
            "INSERT INTO system_prompts (prompt_key, prompt_text) VALUES (?, ?)
             ON CONFLICT(prompt_key) DO UPDATE SET
                prompt_text = excluded.prompt_text,
                updated_at = strftime('%Y-%m-%dT%H:%M:%SZ', 'now')",
        )
        .bind(key)
        .bind(text)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    async fn list_keys(&self) -> Result<Vec<String>, RepositoryError> {
        let rows = sqlx::query("SELECT prompt_key FROM system_prompts ORDER BY prompt_key")
            .fetch_all(&self.pool)
            .await?;
        Ok(rows
            .iter()
            .map(|row| row.try_get::<String, _>("prompt_key"))
            .collect::<Result<Vec<_>, _>>()?)
    }
}
