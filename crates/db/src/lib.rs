pub mod connection;
pub mod fixtures;
pub mod migrations;
pub mod repositories;
pub mod search;

pub use connection::{connect, connect_with_config, connect_with_settings, DbPool};
pub use fixtures::{demo_catalog, seed_demo_catalog, SeedReport};
pub use repositories::{
    InMemoryProductRepository, InMemoryPromptRepository, ProductRepository, PromptRepository,
    RepositoryError, SqlProductRepository, SqlPromptRepository,
};
pub use search::{BindValue, SearchStatement};
