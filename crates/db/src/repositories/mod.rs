use async_trait::async_trait;
use thiserror::Error;

use productmaster_core::domain::product::{Product, ProductCode, ProductSummary};

use crate::search::SearchStatement;

pub mod memory;
pub mod product;
pub mod prompt;

pub use memory::{InMemoryProductRepository, InMemoryPromptRepository};
pub use product::SqlProductRepository;
pub use prompt::SqlPromptRepository;

#[derive(Debug, Error)]
pub enum RepositoryError {
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),
    #[error("decode error: {0}")]
    Decode(String),
}

#[async_trait]
pub trait ProductRepository: Send + Sync {
    /// Runs one search statement and returns the matching projections in
    /// statement order.
    async fn search(
        &self,
        statement: &SearchStatement,
    ) -> Result<Vec<ProductSummary>, RepositoryError>;
    async fn find_by_code(&self, code: &ProductCode) -> Result<Option<Product>, RepositoryError>;
    async fn save(&self, product: Product) -> Result<(), RepositoryError>;
    async fn count_active(&self) -> Result<u64, RepositoryError>;
}

#[async_trait]
pub trait PromptRepository: Send + Sync {
    async fn find_prompt(&self, key: &str) -> Result<Option<String>, RepositoryError>;
    async fn save_prompt(&self, key: &str, text: &str) -> Result<(), RepositoryError>;
    async fn list_keys(&self) -> Result<Vec<String>, RepositoryError>;
}
