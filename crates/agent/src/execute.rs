//! Stage 2: parameters to catalog rows through one store call.

use std::sync::Arc;
use std::time::Instant;

use productmaster_core::domain::product::ProductSummary;
use productmaster_core::domain::query::{QueryParameters, SearchLimits};
use productmaster_core::errors::StageError;
use productmaster_core::trace::{
    StageFragment, FIELD_ELAPSED_MS, FIELD_ERROR, FIELD_QUERY, FIELD_RESULTS, FIELD_RESULTS_COUNT,
    STAGE_EXECUTE,
};
use productmaster_db::{ProductRepository, SearchStatement};

use crate::llm::elapsed_ms;
use crate::runtime::StageDeadline;

pub struct Executor {
    products: Arc<dyn ProductRepository>,
    limits: SearchLimits,
}

impl Executor {
    pub fn new(products: Arc<dyn ProductRepository>, limits: SearchLimits) -> Self {
        Self { products, limits }
    }

    pub fn limits(&self) -> SearchLimits {
        self.limits
    }

    /// On failure the record keeps `query`, `execution_time_ms` and `error`
    /// and has no `results` field.
    pub async fn execute(
        &self,
        params: &QueryParameters,
        deadline: &StageDeadline,
    ) -> (Result<Vec<ProductSummary>, StageError>, StageFragment) {
        let started = Instant::now();
        let statement = SearchStatement::build(params, &self.limits);
        let mut fragment = StageFragment::new(STAGE_EXECUTE).with(FIELD_QUERY, statement.render());

        let outcome = match deadline.run(self.products.search(&statement)).await {
            Ok(Ok(rows)) => serde_json::to_value(&rows)
                .map(|value| (rows, value))
                .map_err(|error| StageError::Serialization(format!("results: {error}"))),
            Ok(Err(error)) => Err(StageError::Store(error.to_string())),
            Err(error) => Err(error),
        };

        match outcome {
            Ok((rows, value)) => {
                fragment.set(FIELD_RESULTS, value);
                fragment.set(FIELD_RESULTS_COUNT, rows.len());
                fragment.set(FIELD_ELAPSED_MS, elapsed_ms(started));
                (Ok(rows), fragment)
            }
            Err(error) => {
                fragment.set(FIELD_ELAPSED_MS, elapsed_ms(started));
                fragment.set(FIELD_ERROR, error.to_string());
                (Err(error), fragment)
            }
        }
    }
}
