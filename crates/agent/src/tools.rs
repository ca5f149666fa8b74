use serde::Serialize;
use serde_json::{json, Value};

pub const SEARCH_PRODUCTS: &str = "search_products";
pub const FILTER_BY_RISK_AND_TYPE: &str = "filter_products_by_risk_and_type";
pub const GET_PRODUCT_DETAILS: &str = "get_product_details";
pub const SEARCH_BY_NAME_FUZZY: &str = "search_products_by_name_fuzzy";

/// One catalog operation. Every operation runs the same pipeline and differs
/// only in the prompt pair selected by its name.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct ToolSpec {
    pub name: &'static str,
    pub description: &'static str,
    pub usage_context: &'static str,
}

impl ToolSpec {
    pub fn input_schema(&self, max_limit: u32) -> Value {
        json!({
            "type": "object",
            "properties": {
                "text_input": {
                    "type": "string",
                    "description": "Natural-language request, passed through unchanged",
                },
                "limit": {
                    "type": "integer",
                    "minimum": 1,
                    "maximum": max_limit,
                    "description": "Maximum number of products to return",
                },
                "min_investment": {
                    "type": "number",
                    "minimum": 0,
                    "description": "Lower bound on the minimum investment amount",
                },
                "max_investment": {
                    "type": "number",
                    "minimum": 0,
                    "description": "Upper bound on the minimum investment amount",
                },
                "request_id": {
                    "type": "string",
                    "description": "Correlation identifier echoed in the debug trace",
                },
            },
            "required": ["text_input"],
        })
    }

    /// Entry for `tools/list`.
    pub fn describe(&self, max_limit: u32) -> Value {
        json!({
            "name": self.name,
            "description": self.description,
            "inputSchema": self.input_schema(max_limit),
        })
    }

    /// Entry for the agent-facing descriptions endpoint.
    pub fn describe_for_agent(&self) -> Value {
        json!({
            "name": self.name,
            "description": self.description,
            "usage_context": self.usage_context,
            "parameters": {
                "text_input": "Pass the user's request exactly as written; do not pre-process it",
            },
        })
    }
}

#[derive(Clone, Debug, Default)]
pub struct ToolRegistry {
    tools: Vec<ToolSpec>,
}

impl ToolRegistry {
    pub fn standard() -> Self {
        let mut registry = Self::default();
        registry.register(ToolSpec {
            name: SEARCH_PRODUCTS,
            description: "Search the product catalog from a free-text request covering \
                          keywords, product types, currencies, issuers, amounts and risk.",
            usage_context: "General product questions, e.g. \"USD funds under 5,000\".",
        });
        registry.register(ToolSpec {
            name: FILTER_BY_RISK_AND_TYPE,
            description: "List products matching a risk level and product type described \
                          in natural language.",
            usage_context: "Risk-driven questions, e.g. \"low risk bond products\".",
        });
        registry.register(ToolSpec {
            name: GET_PRODUCT_DETAILS,
            description: "Describe one product, identified by code or by part of its name.",
            usage_context: "Follow-up questions about a specific product.",
        });
        registry.register(ToolSpec {
            name: SEARCH_BY_NAME_FUZZY,
            description: "Find products whose name loosely matches a remembered, partial or \
                          misspelled product name.",
            usage_context: "Vague name lookups, e.g. \"that global tech fund, something like Horizon\".",
        });
        registry
    }

    pub fn register(&mut self, tool: ToolSpec) {
        match self.tools.iter_mut().find(|existing| existing.name == tool.name) {
            Some(existing) => *existing = tool,
            None => self.tools.push(tool),
        }
    }

    pub fn get(&self, name: &str) -> Option<&ToolSpec> {
        self.tools.iter().find(|tool| tool.name == name)
    }

    pub fn iter(&self) -> impl Iterator<Item = &ToolSpec> {
        self.tools.iter()
    }

    pub fn len(&self) -> usize {
        self.tools.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tools.is_empty()
    }
}
