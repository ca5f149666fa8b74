pub mod config;
pub mod domain;
pub mod envelope;
pub mod errors;
pub mod trace;

pub use config::{AppConfig, ConfigError, ConfigOverrides, LoadOptions};
pub use domain::product::{Product, ProductCode, ProductSummary, ProductType};
pub use domain::query::{ExplicitFilters, QueryParameters, SearchLimits, SortDirective};
pub use envelope::{ContentBlock, Envelope, ToolResult};
pub use errors::{StageError, ValidationError};
pub use trace::{StageFragment, StageRecord, Trace};
