use std::sync::Arc;

use productmaster_agent::{
    GuardrailPolicy, HttpLlmClient, HttpPromptStore, LlmClient, LlmError, PipelineSettings,
    PromptError, PromptStore, QueryPipeline, RepositoryPromptStore, ToolRegistry,
};
use productmaster_core::config::{AppConfig, ConfigError, LoadOptions};
use productmaster_db::{
    connect_with_config, migrations, DbPool, SqlProductRepository, SqlPromptRepository,
};
use thiserror::Error;
use tracing::info;

use crate::ProductMasterMcpServer;

pub struct Application {
    pub config: AppConfig,
    pub db_pool: DbPool,
    pub pipeline: Arc<QueryPipeline>,
    pub mcp: ProductMasterMcpServer,
}

#[derive(Debug, Error)]
pub enum BootstrapError {
    #[error(transparent)]
    Config(#[from] ConfigError),
    #[error("database connection failed: {0}")]
    DatabaseConnect(#[source] sqlx::Error),
    #[error("database migration failed: {0}")]
    Migration(#[source] sqlx::migrate::MigrateError),
    #[error("prompt store setup failed: {0}")]
    Prompts(#[from] PromptError),
    #[error("llm client setup failed: {0}")]
    Llm(#[from] LlmError),
}

pub async fn bootstrap(options: LoadOptions) -> Result<Application, BootstrapError> {
    let config = AppConfig::load(options)?;
    bootstrap_with_config(config).await
}

pub async fn bootstrap_with_config(config: AppConfig) -> Result<Application, BootstrapError> {
    let llm = HttpLlmClient::from_config(&config.llm)?;
    info!(
        event_name = "system.bootstrap.llm_configured",
        correlation_id = "bootstrap",
        provider = ?llm.provider(),
        model = %config.llm.model,
        "llm client configured"
    );
    bootstrap_with_llm(config, Arc::new(llm)).await
}

/// Wires everything but the model client, which the caller supplies.
pub async fn bootstrap_with_llm(
    config: AppConfig,
    llm: Arc<dyn LlmClient>,
) -> Result<Application, BootstrapError> {
    info!(
        event_name = "system.bootstrap.start",
        correlation_id = "bootstrap",
        "starting application bootstrap"
    );

    let db_pool =
        connect_with_config(&config.database).await.map_err(BootstrapError::DatabaseConnect)?;
    info!(
        event_name = "system.bootstrap.database_connected",
        correlation_id = "bootstrap",
        "database connection established"
    );

    migrations::run_pending(&db_pool).await.map_err(BootstrapError::Migration)?;
    info!(
        event_name = "system.bootstrap.migrations_applied",
        correlation_id = "bootstrap",
        "database migrations applied"
    );

    let prompts: Arc<dyn PromptStore> = match HttpPromptStore::from_config(&config.prompts)? {
        Some(store) => {
            info!(
                event_name = "system.bootstrap.prompt_store",
                correlation_id = "bootstrap",
                source = "http",
                url = %store.prompt_url("{key}"),
                "prompt store configured"
            );
            Arc::new(store)
        }
        None => {
            info!(
                event_name = "system.bootstrap.prompt_store",
                correlation_id = "bootstrap",
                source = "database",
                "prompt store configured"
            );
            Arc::new(RepositoryPromptStore::new(Arc::new(SqlPromptRepository::new(
                db_pool.clone(),
            ))))
        }
    };

    let pipeline = Arc::new(QueryPipeline::new(
        prompts,
        llm,
        Arc::new(SqlProductRepository::new(db_pool.clone())),
        PipelineSettings::from(&config.pipeline),
    ));
    let guardrails = GuardrailPolicy {
        max_input_chars: config.pipeline.max_input_chars,
        max_limit: config.pipeline.max_limit,
    };
    let mcp = ProductMasterMcpServer::new(pipeline.clone(), ToolRegistry::standard(), guardrails);

    Ok(Application { config, db_pool, pipeline, mcp })
}

#[cfg(test)]
mod tests {
    use productmaster_core::config::{ConfigOverrides, LoadOptions};

    use crate::bootstrap::bootstrap;

    #[tokio::test]
    async fn bootstrap_fails_fast_without_required_llm_api_key() {
        let result = bootstrap(LoadOptions {
            overrides: ConfigOverrides {
                database_url: Some("sqlite::memory:".to_string()),
                llm_provider: Some(productmaster_core::config::LlmProvider::Anthropic),
                ..ConfigOverrides::default()
            },
            ..LoadOptions::default()
        })
        .await;

        assert!(result.is_err());
        let message = result.err().map(|error| error.to_string()).unwrap_or_default();
        assert!(message.contains("llm.api_key"), "unexpected message: {message}");
    }

    #[tokio::test]
    async fn bootstrap_applies_migrations_and_exposes_the_standard_tools() {
        let app = bootstrap(LoadOptions {
            overrides: ConfigOverrides {
                database_url: Some("sqlite::memory:".to_string()),
                ..ConfigOverrides::default()
            },
            ..LoadOptions::default()
        })
        .await
        .expect("bootstrap should succeed with the default ollama provider");

        let (prompt_count,): (i64,) = sqlx::query_as("SELECT COUNT(*) FROM system_prompts")
            .fetch_one(&app.db_pool)
            .await
            .expect("system_prompts should exist after bootstrap");
        assert_eq!(prompt_count, 8);
        assert_eq!(app.mcp.registry().len(), 4);
        assert_eq!(app.pipeline.limits().max_limit, app.config.pipeline.max_limit);
    }
}
