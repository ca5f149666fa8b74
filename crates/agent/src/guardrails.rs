//! Inbound argument checks that run before any pipeline stage.
//!
//! Anything rejected here never reaches the model or the store and carries no
//! trace; the transport turns the [`ValidationError`] into a protocol error.

use std::str::FromStr;

use productmaster_core::domain::query::ExplicitFilters;
use productmaster_core::errors::ValidationError;
use rust_decimal::Decimal;
use serde_json::{Map, Value};

/// A request that passed validation and is ready for the pipeline.
#[derive(Clone, Debug, PartialEq)]
pub struct PipelineRequest {
    pub operation: String,
    pub text_input: String,
    pub explicit: ExplicitFilters,
    pub request_id: Option<String>,
    pub input_params: Value,
}

impl PipelineRequest {
    /// Request with nothing but free text; used by callers that already
    /// trust their input.
    pub fn text(operation: impl Into<String>, text_input: impl Into<String>) -> Self {
        let text_input = text_input.into();
        Self {
            operation: operation.into(),
            input_params: Value::Object(Map::from_iter([(
                "text_input".to_string(),
                Value::String(text_input.clone()),
            )])),
            text_input,
            explicit: ExplicitFilters::default(),
            request_id: None,
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct GuardrailPolicy {
    pub max_input_chars: usize,
    pub max_limit: u32,
}

impl Default for GuardrailPolicy {
    fn default() -> Self {
        Self { max_input_chars: 2000, max_limit: 100 }
    }
}

impl GuardrailPolicy {
    pub fn evaluate(
        &self,
        operation: &str,
        arguments: &Value,
    ) -> Result<PipelineRequest, ValidationError> {
        let object = match arguments {
            Value::Object(object) => object,
            Value::Null => return Err(ValidationError::MissingField("text_input")),
            other => {
                return Err(ValidationError::MalformedArguments(format!(
                    "arguments must be an object, got {}",
                    json_kind(other)
                )))
            }
        };

        let text_input = match object.get("text_input") {
            Some(Value::String(text)) if !text.trim().is_empty() => text.trim().to_string(),
            Some(Value::String(_)) | Some(Value::Null) | None => {
                return Err(ValidationError::MissingField("text_input"))
            }
            Some(other) => {
                return Err(ValidationError::MalformedArguments(format!(
                    "`text_input` must be a string, got {}",
                    json_kind(other)
                )))
            }
        };

        let length = text_input.chars().count();
        if length > self.max_input_chars {
            return Err(ValidationError::InputTooLong { length, maximum: self.max_input_chars });
        }

        let limit = read_limit(object.get("limit"))?;
        if let Some(limit) = limit {
            if limit == 0 {
                return Err(ValidationError::ZeroLimit);
            }
            if limit > self.max_limit {
                return Err(ValidationError::LimitExceedsMaximum {
                    requested: limit,
                    maximum: self.max_limit,
                });
            }
        }

        let min_investment = read_amount("min_investment", object.get("min_investment"))?;
        let max_investment = read_amount("max_investment", object.get("max_investment"))?;
        if let (Some(min), Some(max)) = (min_investment, max_investment) {
            if min > max {
                return Err(ValidationError::InvertedRange { min, max });
            }
        }

        let request_id = match object.get("request_id") {
            Some(Value::String(id)) if !id.trim().is_empty() => Some(id.trim().to_string()),
            Some(Value::String(_)) | Some(Value::Null) | None => None,
            Some(other) => {
                return Err(ValidationError::MalformedArguments(format!(
                    "`request_id` must be a string, got {}",
                    json_kind(other)
                )))
            }
        };

        Ok(PipelineRequest {
            operation: operation.to_string(),
            text_input,
            explicit: ExplicitFilters { limit, min_investment, max_investment },
            request_id,
            input_params: arguments.clone(),
        })
    }
}

fn read_limit(value: Option<&Value>) -> Result<Option<u32>, ValidationError> {
    match value {
        None | Some(Value::Null) => Ok(None),
        Some(Value::Number(number)) => {
            if let Some(unsigned) = number.as_u64() {
                return u32::try_from(unsigned).map(Some).map_err(|_| {
                    ValidationError::MalformedArguments(format!("`limit` {unsigned} is out of range"))
                });
            }
            Err(ValidationError::MalformedArguments(format!(
                "`limit` must be a non-negative integer, got {number}"
            )))
        }
        Some(other) => Err(ValidationError::MalformedArguments(format!(
            "`limit` must be an integer, got {}",
            json_kind(other)
        ))),
    }
}

fn read_amount(field: &'static str, value: Option<&Value>) -> Result<Option<Decimal>, ValidationError> {
    let amount = match value {
        None | Some(Value::Null) => return Ok(None),
        Some(Value::Number(number)) => Decimal::from_str(&number.to_string())
            .or_else(|_| Decimal::from_scientific(&number.to_string())),
        Some(Value::String(text)) => Decimal::from_str(text.trim()),
        Some(other) => {
            return Err(ValidationError::MalformedArguments(format!(
                "`{field}` must be a number, got {}",
                json_kind(other)
            )))
        }
    }
    .map_err(|_| ValidationError::MalformedArguments(format!("`{field}` is not a valid amount")))?;

    if amount.is_sign_negative() && !amount.is_zero() {
        return Err(ValidationError::NegativeAmount { field, value: amount });
    }
    Ok(Some(amount))
}

fn json_kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}
