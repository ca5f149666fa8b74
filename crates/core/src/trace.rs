//! Per-request execution trace.
//!
//! A [`Trace`] is created before the first pipeline stage starts and is
//! attached to every response. Stages never touch it directly: each stage hands
//! back a [`StageFragment`] and the orchestrator merges it with
//! [`Trace::record`], so whatever completed before a failure is still there.
//!
//! The serialized form has a fixed set of top-level fields (`function_name`,
//! `input_params`, `total_execution_time_ms`, `error`) with one open-ended
//! object per stage in between, in the order the stages ran.

use serde::ser::{Serialize, SerializeMap, Serializer};
use serde_json::{Map, Value};

pub const STAGE_STANDARDIZE: &str = "standardize";
pub const STAGE_EXECUTE: &str = "execute";
pub const STAGE_FORMAT: &str = "format";

pub const FIELD_PROMPT_KEY: &str = "prompt_key";
pub const FIELD_LLM_REQUEST: &str = "llm_request";
pub const FIELD_LLM_RESPONSE: &str = "llm_response";
pub const FIELD_PARSED_PARAMS: &str = "parsed_params";
pub const FIELD_PARSE_ERROR: &str = "parse_error";
pub const FIELD_QUERY: &str = "query";
pub const FIELD_RESULTS: &str = "results";
pub const FIELD_RESULTS_COUNT: &str = "results_count";
pub const FIELD_ELAPSED_MS: &str = "execution_time_ms";
pub const FIELD_ERROR: &str = "error";

const RESERVED_KEYS: [&str; 5] =
    ["function_name", "input_params", "request_id", "total_execution_time_ms", "error"];

pub type StageRecord = Map<String, Value>;

/// Fields one stage produced, keyed by the stage name.
#[derive(Clone, Debug, PartialEq)]
pub struct StageFragment {
    stage: String,
    fields: StageRecord,
}

impl StageFragment {
    pub fn new(stage: impl Into<String>) -> Self {
        Self { stage: stage.into(), fields: StageRecord::new() }
    }

    pub fn stage(&self) -> &str {
        &self.stage
    }

    pub fn fields(&self) -> &StageRecord {
        &self.fields
    }

    pub fn get(&self, key: &str) -> Option<&Value> {
        self.fields.get(key)
    }

    pub fn set(&mut self, key: impl Into<String>, value: impl Into<Value>) {
        self.fields.insert(key.into(), value.into());
    }

    pub fn with(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.set(key, value);
        self
    }
}

#[derive(Clone, Debug, PartialEq)]
pub struct Trace {
    function_name: String,
    input_params: Value,
    request_id: Option<String>,
    stages: Vec<(String, StageRecord)>,
    total_execution_time_ms: u64,
    error: Option<String>,
}

impl Trace {
    pub fn new(function_name: impl Into<String>, input_params: Value) -> Self {
        Self {
            function_name: function_name.into(),
            input_params,
            request_id: None,
            stages: Vec::new(),
            total_execution_time_ms: 0,
            error: None,
        }
    }

    pub fn with_request_id(mut self, request_id: impl Into<String>) -> Self {
        self.request_id = Some(request_id.into());
        self
    }

    /// Appends a stage, or merges into it when the stage already exists.
    /// Later values for the same field replace earlier ones.
    pub fn record(&mut self, fragment: StageFragment) {
        let StageFragment { stage, fields } = fragment;
        let stage = if RESERVED_KEYS.contains(&stage.as_str()) {
            format!("stage_{stage}")
        } else {
            stage
        };

        match self.stages.iter_mut().find(|(name, _)| *name == stage) {
            Some((_, existing)) => existing.extend(fields),
            None => self.stages.push((stage, fields)),
        }
    }

    pub fn finalize(&mut self, total_execution_time_ms: u64, error: Option<String>) {
        self.total_execution_time_ms = total_execution_time_ms;
        self.error = error;
    }

    pub fn function_name(&self) -> &str {
        &self.function_name
    }

    pub fn input_params(&self) -> &Value {
        &self.input_params
    }

    pub fn request_id(&self) -> Option<&str> {
        self.request_id.as_deref()
    }

    pub fn stage(&self, name: &str) -> Option<&StageRecord> {
        self.stages.iter().find(|(stage, _)| stage == name).map(|(_, fields)| fields)
    }

    pub fn stage_names(&self) -> Vec<&str> {
        self.stages.iter().map(|(name, _)| name.as_str()).collect()
    }

    pub fn total_execution_time_ms(&self) -> u64 {
        self.total_execution_time_ms
    }

    pub fn error(&self) -> Option<&str> {
        self.error.as_deref()
    }

    pub fn to_value(&self) -> Value {
        serde_json::to_value(self).unwrap_or(Value::Null)
    }
}

impl Serialize for Trace {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let extra = usize::from(self.request_id.is_some());
        let mut map = serializer.serialize_map(Some(4 + extra + self.stages.len()))?;
        map.serialize_entry("function_name", &self.function_name)?;
        map.serialize_entry("input_params", &self.input_params)?;
        if let Some(request_id) = &self.request_id {
            map.serialize_entry("request_id", request_id)?;
        }
        for (name, fields) in &self.stages {
            map.serialize_entry(name, fields)?;
        }
        map.serialize_entry("total_execution_time_ms", &self.total_execution_time_ms)?;
        map.serialize_entry("error", &self.error)?;
        map.end()
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::{StageFragment, Trace, FIELD_ELAPSED_MS, FIELD_QUERY, STAGE_EXECUTE};

    #[test]
    fn fresh_trace_serializes_required_fields() {
        let trace = Trace::new("search_products", json!({"text_input": "bonds"}));
        let text = serde_json::to_string(&trace).expect("serialize");

        assert_eq!(
            text,
            r#"{"function_name":"search_products","input_params":{"text_input":"bonds"},"total_execution_time_ms":0,"error":null}"#
        );
    }

    #[test]
    fn stages_serialize_in_recorded_order_between_required_fields() {
        let mut trace = Trace::new("op", json!({}));
        trace.record(StageFragment::new("standardize").with("a", 1));
        trace.record(StageFragment::new("execute").with("b", 2));
        trace.finalize(42, Some("boom".to_string()));

        let text = serde_json::to_string(&trace).expect("serialize");
        assert_eq!(
            text,
            r#"{"function_name":"op","input_params":{},"standardize":{"a":1},"execute":{"b":2},"total_execution_time_ms":42,"error":"boom"}"#
        );
    }

    #[test]
    fn recording_same_stage_merges_fields() {
        let mut trace = Trace::new("op", json!({}));
        trace.record(StageFragment::new(STAGE_EXECUTE).with(FIELD_QUERY, "SELECT 1"));
        trace.record(StageFragment::new(STAGE_EXECUTE).with(FIELD_ELAPSED_MS, 7));

        let stage = trace.stage(STAGE_EXECUTE).expect("stage");
        assert_eq!(stage.get(FIELD_QUERY), Some(&json!("SELECT 1")));
        assert_eq!(stage.get(FIELD_ELAPSED_MS), Some(&json!(7)));
        assert_eq!(trace.stage_names(), vec![STAGE_EXECUTE]);
    }

    #[test]
    fn reserved_stage_names_cannot_shadow_required_fields() {
        let mut trace = Trace::new("op", json!({}));
        trace.record(StageFragment::new("error").with("x", true));

        assert!(trace.stage("stage_error").is_some());
        assert_eq!(trace.to_value()["error"], json!(null));
    }

    #[test]
    fn request_id_is_emitted_when_present() {
        let trace = Trace::new("op", json!({})).with_request_id("req-1");
        assert_eq!(trace.to_value()["request_id"], json!("req-1"));
        assert_eq!(trace.request_id(), Some("req-1"));
    }
}
