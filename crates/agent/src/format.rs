//! Stage 3: rows plus the original text back to prose through one model call.

use std::sync::Arc;
use std::time::Instant;

use productmaster_core::domain::product::ProductSummary;
use productmaster_core::errors::StageError;
use productmaster_core::trace::{
    StageFragment, FIELD_ELAPSED_MS, FIELD_ERROR, FIELD_LLM_REQUEST, FIELD_LLM_RESPONSE,
    FIELD_PROMPT_KEY, STAGE_FORMAT,
};

use crate::llm::{elapsed_ms, LlmClient};
use crate::prompts::{post_prompt_key, PromptContext, PromptStore};
use crate::runtime::StageDeadline;

pub struct Formatter {
    prompts: Arc<dyn PromptStore>,
    llm: Arc<dyn LlmClient>,
    context: PromptContext,
    no_results_message: String,
}

impl Formatter {
    pub fn new(
        prompts: Arc<dyn PromptStore>,
        llm: Arc<dyn LlmClient>,
        context: PromptContext,
        no_results_message: impl Into<String>,
    ) -> Self {
        Self { prompts, llm, context, no_results_message: no_results_message.into() }
    }

    pub fn no_results_message(&self) -> &str {
        &self.no_results_message
    }

    /// Empty `records` short-circuit to the fixed message with no model call
    /// and no stage record.
    pub async fn format(
        &self,
        operation: &str,
        raw_input: &str,
        records: &[ProductSummary],
        deadline: &StageDeadline,
    ) -> (Result<String, StageError>, Option<StageFragment>) {
        if records.is_empty() {
            return (Ok(self.no_results_message.clone()), None);
        }

        let started = Instant::now();
        let key = post_prompt_key(operation);
        let mut fragment = StageFragment::new(STAGE_FORMAT).with(FIELD_PROMPT_KEY, key.as_str());

        let outcome = self.generate(&key, raw_input, records, deadline, &mut fragment).await;
        if let Err(error) = &outcome {
            fragment.set(FIELD_ELAPSED_MS, elapsed_ms(started));
            fragment.set(FIELD_ERROR, error.to_string());
        }
        (outcome, Some(fragment))
    }

    async fn generate(
        &self,
        key: &str,
        raw_input: &str,
        records: &[ProductSummary],
        deadline: &StageDeadline,
        fragment: &mut StageFragment,
    ) -> Result<String, StageError> {
        let template = deadline
            .run(self.prompts.get_prompt(key))
            .await?
            .map_err(|error| StageError::Prompt { key: key.to_string(), message: error.to_string() })?;

        let data = serde_json::to_string_pretty(records)
            .map_err(|error| StageError::Serialization(format!("records: {error}")))?;
        let prompt = response_prompt(&self.context.render(key, &template), raw_input, &data);
        fragment.set(FIELD_LLM_REQUEST, prompt.as_str());

        let generation = deadline
            .run(self.llm.generate(&prompt))
            .await?
            .map_err(|error| StageError::Model(error.to_string()))?;

        fragment.set(FIELD_LLM_RESPONSE, generation.text.as_str());
        fragment.set(FIELD_ELAPSED_MS, generation.elapsed_ms);
        Ok(generation.text.trim().to_string())
    }
}

pub fn response_prompt(template: &str, raw_input: &str, data: &str) -> String {
    format!("{template}\n\nOriginal question: {raw_input}\n\nData:\n{data}")
}
