use std::collections::HashMap;

use tokio::sync::RwLock;

use productmaster_core::domain::product::{Product, ProductCode, ProductSummary};

use super::{ProductRepository, PromptRepository, RepositoryError};
use crate::search::SearchStatement;

#[derive(Default)]
pub struct InMemoryProductRepository {
    products: RwLock<HashMap<String, Product>>,
}

impl InMemoryProductRepository {
    pub fn with_products(products: impl IntoIterator<Item = Product>) -> Self {
        let products =
            products.into_iter().map(|product| (product.code.0.clone(), product)).collect();
        Self { products: RwLock::new(products) }
    }
}

#[async_trait::async_trait]
impl ProductRepository for InMemoryProductRepository {
    async fn search(
        &self,
        statement: &SearchStatement,
    ) -> Result<Vec<ProductSummary>, RepositoryError> {
        let products = self.products.read().await;
        Ok(statement.apply(products.values()))
    }

    async fn find_by_code(&self, code: &ProductCode) -> Result<Option<Product>, RepositoryError> {
        let products = self.products.read().await;
        Ok(products.get(&code.0).cloned())
    }

    async fn save(&self, product: Product) -> Result<(), RepositoryError> {
        let mut products = self.products.write().await;
        products.insert(product.code.0.clone(), product);
        Ok(())
    }

    async fn count_active(&self) -> Result<u64, RepositoryError> {
        let products = self.products.read().await;
        Ok(products.values().filter(|product| product.active).count() as u64)
    }
}

#[derive(Default)]
pub struct InMemoryPromptRepository {
    prompts: RwLock<HashMap<String, String>>,
}

impl InMemoryPromptRepository {
    pub fn with_prompts<K, V>(prompts: impl IntoIterator<Item = (K, V)>) -> Self
    where
        K: Into<String>,
        V: Into<String>,
    {
        let prompts = prompts.into_iter().map(|(key, text)| (key.into(), text.into())).collect();
        Self { prompts: RwLock::new(prompts) }
    }
}

#[async_trait::async_trait]
impl PromptRepository for InMemoryPromptRepository {
    async fn find_prompt(&self, key: &str) -> Result<Option<String>, RepositoryError> {
        let prompts = self.prompts.read().await;
        Ok(prompts.get(key).cloned())
    }

    async fn save_prompt(&self, key: &str, text: &str) -> Result<(), RepositoryError> {
        let mut prompts = self.prompts.write().await;
        prompts.insert(key.to_string(), text.to_string());
        Ok(())
    }

    async fn list_keys(&self) -> Result<Vec<String>, RepositoryError> {
        let prompts = self.prompts.read().await;
        let mut keys: Vec<String> = prompts.keys().cloned().collect();
        keys.sort();
        Ok(keys)
    }
}
