//! Query pipeline for the product catalog.
//!
//! One request runs three stages in order:
//! 1. **Standardize** (`standardize`): free text to `QueryParameters` via the model
//! 2. **Execute** (`execute`): parameters to catalog rows via the product store
//! 3. **Format** (`format`): rows back to prose via the model
//!
//! `runtime::QueryPipeline` sequences them, owns the per-request trace and
//! always answers with an envelope. `guardrails` validates inbound arguments
//! before a run starts; `tools` lists the operations that share the pipeline.
//!
//! The model only translates. Which products exist and which ones match is
//! decided by the store.

pub mod execute;
pub mod format;
pub mod guardrails;
pub mod llm;
pub mod prompts;
pub mod runtime;
pub mod standardize;
pub mod tools;

pub use guardrails::{GuardrailPolicy, PipelineRequest};
pub use llm::{Generation, HttpLlmClient, LlmClient, LlmError};
pub use prompts::{HttpPromptStore, PromptContext, PromptError, PromptStore, RepositoryPromptStore};
pub use runtime::{PipelineSettings, PipelineState, QueryPipeline};
pub use tools::{ToolRegistry, ToolSpec};
