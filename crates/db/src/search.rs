//! Builds the single parameterized statement used for catalog retrieval.
//!
//! Only present filters contribute a clause; all clauses are AND-ed together
//! with the active-product restriction. The same [`SearchStatement`] also
//! evaluates against in-memory products so both repository implementations
//! agree on matching, ordering and the clamped limit.

use std::cmp::Ordering;

use productmaster_core::domain::product::{Product, ProductSummary};
use productmaster_core::domain::query::{QueryParameters, SearchLimits, SortDirective};
use rust_decimal::prelude::ToPrimitive;
use rust_decimal::Decimal;

const SELECT_COLUMNS: &str = "SELECT product_code, product_name, product_type, currency, issuer, \
     risk_level, minimum_investment, description FROM products";

/// Unicode-lowercased copies of name, code, issuer and description, written
/// on save. SQLite's `LOWER` and `LIKE` only fold ASCII.
const FOLDED_TEXT_COLUMNS: [&str; 4] =
    ["name_folded", "code_folded", "issuer_folded", "description_folded"];

#[derive(Clone, Debug, PartialEq)]
pub enum BindValue {
    Text(String),
    Integer(i64),
    Amount(Decimal),
}

impl BindValue {
    fn literal(&self) -> String {
        match self {
            Self::Text(value) => format!("'{}'", value.replace('\'', "''")),
            Self::Integer(value) => value.to_string(),
            Self::Amount(value) => value.normalize().to_string(),
        }
    }

    /// SQLite compares `CAST(minimum_investment AS REAL)` against a REAL bind.
    pub fn amount_as_real(value: &Decimal) -> f64 {
        value.to_f64().unwrap_or(0.0)
    }
}

#[derive(Clone, Debug, PartialEq)]
pub struct SearchStatement {
    sql: String,
    binds: Vec<BindValue>,
    params: QueryParameters,
    limit: u32,
}

impl SearchStatement {
    pub fn build(params: &QueryParameters, limits: &SearchLimits) -> Self {
        let params = params.clone().normalized();
        let limit = limits.resolve(params.limit);
        let mut clauses = vec!["is_active = 1".to_string()];
        let mut binds = Vec::new();

        if let Some(query) = &params.query {
            let pattern = like_pattern(query);
            let column_clauses: Vec<String> = FOLDED_TEXT_COLUMNS
                .iter()
                .map(|column| format!("{column} LIKE ? ESCAPE '\\'"))
                .collect();
            clauses.push(format!("({})", column_clauses.join(" OR ")));
            binds.extend(FOLDED_TEXT_COLUMNS.iter().map(|_| BindValue::Text(pattern.clone())));
        }

        if let Some(types) = &params.product_types {
            clauses.push(format!("product_type IN ({})", placeholders(types.len())));
            binds.extend(types.iter().map(|kind| BindValue::Text(kind.as_str().to_string())));
        }

        if let Some(currencies) = &params.currencies {
            clauses.push(format!("UPPER(currency) IN ({})", placeholders(currencies.len())));
            binds.extend(currencies.iter().cloned().map(BindValue::Text));
        }

        if let Some(min) = params.min_investment {
            clauses.push("CAST(minimum_investment AS REAL) >= ?".to_string());
            binds.push(BindValue::Amount(min));
        }

        if let Some(max) = params.max_investment {
            clauses.push("CAST(minimum_investment AS REAL) <= ?".to_string());
            binds.push(BindValue::Amount(max));
        }

        if let Some(levels) = &params.risk_levels {
            clauses.push(format!("risk_level IN ({})", placeholders(levels.len())));
            binds.extend(levels.iter().map(|level| BindValue::Integer(i64::from(*level))));
        }

        if let Some(issuers) = &params.issuers {
            let issuer_clauses: Vec<&str> =
                issuers.iter().map(|_| "issuer_folded LIKE ? ESCAPE '\\'").collect();
            clauses.push(format!("({})", issuer_clauses.join(" OR ")));
            binds.extend(issuers.iter().map(|issuer| BindValue::Text(like_pattern(issuer))));
        }

        let order_by = match params.sort_or_default() {
            SortDirective::InvestmentDesc => {
                "CAST(minimum_investment AS REAL) DESC, product_code ASC"
            }
            SortDirective::RiskDesc => "risk_level DESC, product_code ASC",
            SortDirective::NameAsc | SortDirective::Unrecognized => {
                "product_name ASC, product_code ASC"
            }
        };

        let sql = format!(
            "{SELECT_COLUMNS} WHERE {} ORDER BY {order_by} LIMIT ?",
            clauses.join(" AND ")
        );
        binds.push(BindValue::Integer(i64::from(limit)));

        Self { sql, binds, params, limit }
    }

    pub fn sql(&self) -> &str {
        &self.sql
    }

    pub fn binds(&self) -> &[BindValue] {
        &self.binds
    }

    pub fn params(&self) -> &QueryParameters {
        &self.params
    }

    pub fn limit(&self) -> u32 {
        self.limit
    }

    /// The statement with every placeholder replaced by its literal value.
    pub fn render(&self) -> String {
        let mut rendered = String::with_capacity(self.sql.len() + 64);
        let mut binds = self.binds.iter();
        for ch in self.sql.chars() {
            if ch == '?' {
                match binds.next() {
                    Some(bind) => rendered.push_str(&bind.literal()),
                    None => rendered.push(ch),
                }
            } else {
                rendered.push(ch);
            }
        }
        rendered
    }

    pub fn matches(&self, product: &Product) -> bool {
        if !product.active {
            return false;
        }

        let params = &self.params;

        if let Some(query) = &params.query {
            let needle = query.to_lowercase();
            let haystacks =
                [&product.name, &product.code.0, &product.issuer, &product.description];
            if !haystacks.iter().any(|value| value.to_lowercase().contains(&needle)) {
                return false;
            }
        }

        if let Some(types) = &params.product_types {
            if !types.contains(&product.product_type) {
                return false;
            }
        }

        if let Some(currencies) = &params.currencies {
            if !currencies.contains(&product.currency.to_ascii_uppercase()) {
                return false;
            }
        }

        if let Some(min) = params.min_investment {
            if product.minimum_investment < min {
                return false;
            }
        }

        if let Some(max) = params.max_investment {
            if product.minimum_investment > max {
                return false;
            }
        }

        if let Some(levels) = &params.risk_levels {
            if !levels.contains(&product.risk_level) {
                return false;
            }
        }

        if let Some(issuers) = &params.issuers {
            let issuer = product.issuer.to_lowercase();
            if !issuers.iter().any(|keyword| issuer.contains(&keyword.to_lowercase())) {
                return false;
            }
        }

        true
    }

    pub fn compare(&self, left: &ProductSummary, right: &ProductSummary) -> Ordering {
        let primary = match self.params.sort_or_default() {
            SortDirective::InvestmentDesc => {
                right.minimum_investment.cmp(&left.minimum_investment)
            }
            SortDirective::RiskDesc => right.risk_level.cmp(&left.risk_level),
            SortDirective::NameAsc | SortDirective::Unrecognized => {
                left.product_name.cmp(&right.product_name)
            }
        };
        primary.then_with(|| left.product_code.cmp(&right.product_code))
    }

    /// Filters, orders and truncates a product set the way the SQL does.
    pub fn apply<'a>(&self, products: impl IntoIterator<Item = &'a Product>) -> Vec<ProductSummary> {
        let mut rows: Vec<ProductSummary> = products
            .into_iter()
            .filter(|product| self.matches(product))
            .map(Product::summary)
            .collect();
        rows.sort_by(|left, right| self.compare(left, right));
        rows.truncate(self.limit as usize);
        rows
    }
}

fn placeholders(count: usize) -> String {
    vec!["?"; count].join(", ")
}

fn like_pattern(value: &str) -> String {
    let mut escaped = String::with_capacity(value.len() + 2);
    escaped.push('%');
    for ch in value.to_lowercase().chars() {
        if matches!(ch, '%' | '_' | '\\') {
            escaped.push('\\');
        }
        escaped.push(ch);
    }
    escaped.push('%');
    escaped
}
