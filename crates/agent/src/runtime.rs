use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use productmaster_core::config::PipelineConfig;
use productmaster_core::domain::query::SearchLimits;
use productmaster_core::envelope::Envelope;
use productmaster_core::errors::StageError;
use productmaster_core::trace::{
    StageFragment, Trace, STAGE_EXECUTE, STAGE_FORMAT, STAGE_STANDARDIZE,
};
use productmaster_db::ProductRepository;
use tokio::time::Instant;
use tracing::{debug, error, info};
use uuid::Uuid;

use crate::execute::Executor;
use crate::format::Formatter;
use crate::guardrails::PipelineRequest;
use crate::llm::{elapsed_ms, LlmClient};
use crate::prompts::{PromptContext, PromptStore};
use crate::standardize::Standardizer;

pub const FAILURE_PREFIX: &str = "Product search failed";
const FIELD_EXPLICIT_OVERRIDES: &str = "explicit_overrides";

/// Time budget for one stage, shared by all of its suspension points.
#[derive(Clone, Copy, Debug)]
pub struct StageDeadline {
    stage: &'static str,
    at: Instant,
    millis: u64,
}

impl StageDeadline {
    pub fn start(stage: &'static str, budget: Duration) -> Self {
        Self {
            stage,
            at: Instant::now() + budget,
            millis: u64::try_from(budget.as_millis()).unwrap_or(u64::MAX),
        }
    }

    pub async fn run<F: Future>(&self, future: F) -> Result<F::Output, StageError> {
        tokio::time::timeout_at(self.at, future)
            .await
            .map_err(|_| StageError::Timeout { stage: self.stage, millis: self.millis })
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum PipelineState {
    Standardizing,
    Executing,
    Formatting,
    Done,
    Failed,
}

impl PipelineState {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Standardizing => "standardizing",
            Self::Executing => "executing",
            Self::Formatting => "formatting",
            Self::Done => "done",
            Self::Failed => "failed",
        }
    }

    pub fn is_terminal(self) -> bool {
        matches!(self, Self::Done | Self::Failed)
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct PipelineSettings {
    pub limits: SearchLimits,
    pub stage_timeout: Duration,
    pub no_results_message: String,
}

impl From<&PipelineConfig> for PipelineSettings {
    fn from(config: &PipelineConfig) -> Self {
        Self {
            limits: config.search_limits(),
            stage_timeout: Duration::from_secs(config.stage_timeout_secs),
            no_results_message: config.no_results_message.clone(),
        }
    }
}

impl Default for PipelineSettings {
    fn default() -> Self {
        Self {
            limits: SearchLimits::default(),
            stage_timeout: Duration::from_secs(90),
            no_results_message: productmaster_core::config::DEFAULT_NO_RESULTS_MESSAGE.to_string(),
        }
    }
}

/// Runs standardize, execute and format strictly in sequence for one request
/// and always answers with an [`Envelope`] carrying the trace.
pub struct QueryPipeline {
    standardizer: Standardizer,
    executor: Executor,
    formatter: Formatter,
    stage_timeout: Duration,
}

impl QueryPipeline {
    pub fn new(
        prompts: Arc<dyn PromptStore>,
        llm: Arc<dyn LlmClient>,
        products: Arc<dyn ProductRepository>,
        settings: PipelineSettings,
    ) -> Self {
        let context = PromptContext::new(settings.limits);
        Self {
            standardizer: Standardizer::new(prompts.clone(), llm.clone(), context.clone()),
            executor: Executor::new(products, settings.limits),
            formatter: Formatter::new(prompts, llm, context, settings.no_results_message),
            stage_timeout: settings.stage_timeout,
        }
    }

    pub fn limits(&self) -> SearchLimits {
        self.executor.limits()
    }

    pub async fn run(&self, operation: &str, raw_input: &str) -> Envelope {
        self.run_request(PipelineRequest::text(operation, raw_input)).await
    }

    pub async fn run_request(&self, request: PipelineRequest) -> Envelope {
        let started = Instant::now();
        let correlation_id =
            request.request_id.clone().unwrap_or_else(|| Uuid::new_v4().to_string());
        let operation = request.operation.as_str();
        let mut trace = Trace::new(operation, request.input_params.clone())
            .with_request_id(correlation_id.as_str());
        let mut state = PipelineState::Standardizing;

        info!(
            event_name = "pipeline.started",
            correlation_id = %correlation_id,
            operation,
            "query pipeline started"
        );

        let deadline = StageDeadline::start(STAGE_STANDARDIZE, self.stage_timeout);
        let (params, fragment) =
            self.standardizer.standardize(operation, &request.text_input, &deadline).await;
        trace.record(fragment);

        let params = if request.explicit.is_empty() {
            params
        } else {
            let overrides =
                serde_json::to_value(&request.explicit).unwrap_or(serde_json::Value::Null);
            trace.record(
                StageFragment::new(STAGE_STANDARDIZE).with(FIELD_EXPLICIT_OVERRIDES, overrides),
            );
            params.with_explicit(&request.explicit).normalized()
        };

        transition(&mut state, PipelineState::Executing, &correlation_id);
        let deadline = StageDeadline::start(STAGE_EXECUTE, self.stage_timeout);
        let (rows, fragment) = self.executor.execute(&params, &deadline).await;
        trace.record(fragment);
        let rows = match rows {
            Ok(rows) => rows,
            Err(error) => return fail(trace, &mut state, error, started, &correlation_id),
        };

        transition(&mut state, PipelineState::Formatting, &correlation_id);
        let deadline = StageDeadline::start(STAGE_FORMAT, self.stage_timeout);
        let (text, fragment) =
            self.formatter.format(operation, &request.text_input, &rows, &deadline).await;
        if let Some(fragment) = fragment {
            trace.record(fragment);
        }

        match text {
            Ok(text) => {
                transition(&mut state, PipelineState::Done, &correlation_id);
                let total_ms = elapsed_ms(started.into_std());
                trace.finalize(total_ms, None);
                info!(
                    event_name = "pipeline.completed",
                    correlation_id = %correlation_id,
                    operation,
                    results_count = rows.len(),
                    elapsed_ms = total_ms,
                    "query pipeline completed"
                );
                Envelope::success(text, trace)
            }
            Err(error) => fail(trace, &mut state, error, started, &correlation_id),
        }
    }
}

fn transition(state: &mut PipelineState, next: PipelineState, correlation_id: &str) {
    debug!(
        event_name = "pipeline.transition",
        correlation_id,
        from = state.as_str(),
        to = next.as_str(),
        "pipeline state changed"
    );
    *state = next;
}

fn fail(
    mut trace: Trace,
    state: &mut PipelineState,
    error: StageError,
    started: Instant,
    correlation_id: &str,
) -> Envelope {
    let failed_in = state.as_str();
    transition(state, PipelineState::Failed, correlation_id);

    let description = error.to_string();
    let total_ms = elapsed_ms(started.into_std());
    trace.finalize(total_ms, Some(description.clone()));

    error!(
        event_name = "pipeline.failed",
        correlation_id,
        operation = trace.function_name(),
        state = failed_in,
        error_class = error.class(),
        error = %description,
        elapsed_ms = total_ms,
        "query pipeline failed"
    );

    Envelope::failure(format!("{FAILURE_PREFIX}: {description}"), description, trace)
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use productmaster_core::config::AppConfig;
    use productmaster_core::errors::StageError;

    use super::{PipelineSettings, PipelineState, StageDeadline};

    #[tokio::test]
    async fn deadline_turns_slow_futures_into_stage_timeouts() {
        let deadline = StageDeadline::start("format", Duration::from_millis(10));
        let outcome = deadline.run(tokio::time::sleep(Duration::from_secs(5))).await;

        assert_eq!(outcome, Err(StageError::Timeout { stage: "format", millis: 10 }));
    }

    #[tokio::test]
    async fn deadline_passes_through_fast_futures() {
        let deadline = StageDeadline::start("execute", Duration::from_secs(5));
        assert_eq!(deadline.run(async { 7 }).await, Ok(7));
    }

    #[test]
    fn settings_follow_pipeline_config() {
        let config = AppConfig::default();
        let settings = PipelineSettings::from(&config.pipeline);

        assert_eq!(settings.limits.max_limit, 100);
        assert_eq!(settings.limits.default_limit, 20);
        assert_eq!(settings.stage_timeout, Duration::from_secs(config.pipeline.stage_timeout_secs));
    }

    #[test]
    fn only_done_and_failed_are_terminal() {
        assert!(PipelineState::Done.is_terminal());
        assert!(PipelineState::Failed.is_terminal());
        assert!(!PipelineState::Executing.is_terminal());
    }
}
