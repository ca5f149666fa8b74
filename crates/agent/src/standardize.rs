//! Stage 1: free text to [`QueryParameters`] through one model call.
//!
//! This stage never fails the request. A missing prompt, a model error, a
//! timeout or unparseable output all degrade to empty parameters, with the
//! reason kept under `parse_error` in the stage record.

use std::sync::Arc;
use std::time::Instant;

use productmaster_core::domain::query::QueryParameters;
use productmaster_core::errors::StageError;
use productmaster_core::trace::{
    StageFragment, FIELD_ELAPSED_MS, FIELD_LLM_REQUEST, FIELD_LLM_RESPONSE, FIELD_PARSED_PARAMS,
    FIELD_PARSE_ERROR, FIELD_PROMPT_KEY, STAGE_STANDARDIZE,
};
use serde_json::{json, Value};
use tracing::warn;

use crate::llm::{elapsed_ms, LlmClient};
use crate::prompts::{pre_prompt_key, PromptContext, PromptStore};
use crate::runtime::StageDeadline;

pub struct Standardizer {
    prompts: Arc<dyn PromptStore>,
    llm: Arc<dyn LlmClient>,
    context: PromptContext,
}

impl Standardizer {
    pub fn new(
        prompts: Arc<dyn PromptStore>,
        llm: Arc<dyn LlmClient>,
        context: PromptContext,
    ) -> Self {
        Self { prompts, llm, context }
    }

    pub async fn standardize(
        &self,
        operation: &str,
        raw_input: &str,
        deadline: &StageDeadline,
    ) -> (QueryParameters, StageFragment) {
        let started = Instant::now();
        let key = pre_prompt_key(operation);
        let mut fragment = StageFragment::new(STAGE_STANDARDIZE).with(FIELD_PROMPT_KEY, key.as_str());

        let template = match deadline.run(self.prompts.get_prompt(&key)).await {
            Ok(Ok(template)) => template,
            Ok(Err(error)) => {
                let error = StageError::Prompt { key: key.clone(), message: error.to_string() };
                return degrade(fragment, &error, started);
            }
            Err(error) => return degrade(fragment, &error, started),
        };

        let prompt = request_prompt(&self.context.render(&key, &template), raw_input);
        fragment.set(FIELD_LLM_REQUEST, prompt.as_str());

        let generation = match deadline.run(self.llm.generate(&prompt)).await {
            Ok(Ok(generation)) => generation,
            Ok(Err(error)) => return degrade(fragment, &StageError::Model(error.to_string()), started),
            Err(error) => return degrade(fragment, &error, started),
        };

        fragment.set(FIELD_LLM_RESPONSE, generation.text.as_str());
        fragment.set(FIELD_ELAPSED_MS, generation.elapsed_ms);

        match parse_parameters(&generation.text) {
            Ok(params) => {
                let parsed = serde_json::to_value(&params).unwrap_or_else(|_| json!({}));
                fragment.set(FIELD_PARSED_PARAMS, parsed);
                (params, fragment)
            }
            Err(reason) => {
                warn!(
                    event_name = "pipeline.standardize.parse_failed",
                    operation,
                    reason = %reason,
                    "model output was not usable parameters, continuing without filters"
                );
                fragment.set(FIELD_PARSED_PARAMS, json!({}));
                fragment.set(FIELD_PARSE_ERROR, reason);
                (QueryParameters::default(), fragment)
            }
        }
    }
}

fn degrade(
    mut fragment: StageFragment,
    error: &StageError,
    started: Instant,
) -> (QueryParameters, StageFragment) {
    warn!(
        event_name = "pipeline.standardize.degraded",
        error_class = error.class(),
        error = %error,
        "standardization unavailable, continuing without filters"
    );
    fragment.set(FIELD_PARSED_PARAMS, json!({}));
    fragment.set(FIELD_PARSE_ERROR, error.to_string());
    fragment.set(FIELD_ELAPSED_MS, elapsed_ms(started));
    (QueryParameters::default(), fragment)
}

pub fn request_prompt(template: &str, raw_input: &str) -> String {
    format!("{template}\n\nUser Input: {raw_input}")
}

/// Strict parse of model output into parameters. A single fenced code block
/// around the JSON object is tolerated; anything else must be the object.
pub fn parse_parameters(text: &str) -> Result<QueryParameters, String> {
    let body = strip_code_fence(text.trim());
    let value: Value = serde_json::from_str(body)
        .map_err(|error| format!("model output is not valid JSON: {error}"))?;

    if !value.is_object() {
        return Err(format!("model output must be a JSON object, got `{body}`"));
    }

    serde_json::from_value::<QueryParameters>(value)
        .map(QueryParameters::normalized)
        .map_err(|error| format!("model output does not describe search parameters: {error}"))
}

fn strip_code_fence(text: &str) -> &str {
    let Some(rest) = text.strip_prefix("```") else {
        return text;
    };
    let Some(body) = rest.strip_suffix("```") else {
        return text;
    };
    match body.find('\n') {
        Some(newline) => body[newline + 1..].trim(),
        None => body.trim(),
    }
}

#[cfg(test)]
mod tests {
    use productmaster_core::domain::product::ProductType;
    use productmaster_core::domain::query::SortDirective;

    use super::{parse_parameters, request_prompt};

    #[test]
    fn parses_plain_json_object() {
        let params =
            parse_parameters(r#"{"risk_levels":[2,1],"product_types":["bond"]}"#).expect("parse");

        assert_eq!(params.risk_levels, Some(vec![1, 2]));
        assert_eq!(params.product_types, Some(vec![ProductType::Bond]));
    }

    #[test]
    fn unwraps_fenced_json_block() {
        let params = parse_parameters("```json\n{\"sort\": \"risk_desc\"}\n```").expect("parse");
        assert_eq!(params.sort, Some(SortDirective::RiskDesc));
    }

    #[test]
    fn rejects_prose_and_non_objects() {
        assert!(parse_parameters("Sure! Here are the filters you asked for.").is_err());
        assert!(parse_parameters("[1, 2]").is_err());
        assert!(parse_parameters(r#"{"risk_levels": "low"}"#).is_err());
        assert!(parse_parameters("```json\n{\"limit\": 3}").is_err());
    }

    #[test]
    fn prompt_concatenates_template_and_raw_text() {
        assert_eq!(request_prompt("Return JSON.", "low risk"), "Return JSON.\n\nUser Input: low risk");
    }
}
