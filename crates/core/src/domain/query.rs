use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use super::product::ProductType;

/// Structured filter produced by standardization and consumed by retrieval.
///
/// Every field is optional; `None` means "no filter on this dimension". Set
/// fields that come back empty are treated the same as absent ones.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct QueryParameters {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub query: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub product_types: Option<Vec<ProductType>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub currencies: Option<Vec<String>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub min_investment: Option<Decimal>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_investment: Option<Decimal>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub risk_levels: Option<Vec<u8>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub issuers: Option<Vec<String>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sort: Option<SortDirective>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub limit: Option<u32>,
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SortDirective {
    #[default]
    #[serde(alias = "name")]
    NameAsc,
    #[serde(alias = "min_investment_desc", alias = "investment")]
    InvestmentDesc,
    #[serde(alias = "risk_level_desc", alias = "risk")]
    RiskDesc,
    #[serde(other)]
    Unrecognized,
}

/// Default and hard maximum for result counts.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct SearchLimits {
    pub default_limit: u32,
    pub max_limit: u32,
}

impl Default for SearchLimits {
    fn default() -> Self {
        Self { default_limit: 20, max_limit: 100 }
    }
}

impl SearchLimits {
    /// Resolves a requested limit against the default and the hard maximum.
    /// A zero or missing request falls back to the default.
    pub fn resolve(&self, requested: Option<u32>) -> u32 {
        let max_limit = self.max_limit.max(1);
        let wanted = match requested {
            Some(0) | None => self.default_limit,
            Some(value) => value,
        };
        wanted.clamp(1, max_limit)
    }
}

/// Arguments the caller states explicitly next to the free text. These win
/// over whatever standardization derived for the same fields.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExplicitFilters {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub limit: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub min_investment: Option<Decimal>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_investment: Option<Decimal>,
}

impl ExplicitFilters {
    pub fn is_empty(&self) -> bool {
        self.limit.is_none() && self.min_investment.is_none() && self.max_investment.is_none()
    }
}

impl QueryParameters {
    pub fn is_unfiltered(&self) -> bool {
        let normalized = self.clone().normalized();
        normalized.query.is_none()
            && normalized.product_types.is_none()
            && normalized.currencies.is_none()
            && normalized.min_investment.is_none()
            && normalized.max_investment.is_none()
            && normalized.risk_levels.is_none()
            && normalized.issuers.is_none()
    }

    /// Canonical form: trimmed text, upper-case currencies, sorted and
    /// de-duplicated sets, empty sets dropped, unknown sort removed.
    pub fn normalized(self) -> Self {
        let query = self.query.map(|value| value.trim().to_string()).filter(|value| !value.is_empty());

        let product_types = self.product_types.map(sorted_unique).filter(|types| !types.is_empty());

        let currencies = self
            .currencies
            .map(|values| {
                sorted_unique(
                    values
                        .into_iter()
                        .map(|value| value.trim().to_ascii_uppercase())
                        .filter(|value| !value.is_empty())
                        .collect(),
                )
            })
            .filter(|values| !values.is_empty());

        let risk_levels = self.risk_levels.map(sorted_unique).filter(|levels| !levels.is_empty());

        let issuers = self
            .issuers
            .map(|values| {
                sorted_unique(
                    values
                        .into_iter()
                        .map(|value| value.trim().to_string())
                        .filter(|value| !value.is_empty())
                        .collect(),
                )
            })
            .filter(|values| !values.is_empty());

        let sort = self.sort.filter(|sort| *sort != SortDirective::Unrecognized);
        let limit = self.limit.filter(|limit| *limit > 0);

        Self {
            query,
            product_types,
            currencies,
            min_investment: self.min_investment,
            max_investment: self.max_investment,
            risk_levels,
            issuers,
            sort,
            limit,
        }
    }

    pub fn with_explicit(mut self, explicit: &ExplicitFilters) -> Self {
        if let Some(limit) = explicit.limit {
            self.limit = Some(limit);
        }
        if let Some(min_investment) = explicit.min_investment {
            self.min_investment = Some(min_investment);
        }
        if let Some(max_investment) = explicit.max_investment {
            self.max_investment = Some(max_investment);
        }
        self
    }

    pub fn sort_or_default(&self) -> SortDirective {
        match self.sort {
            Some(SortDirective::Unrecognized) | None => SortDirective::NameAsc,
            Some(sort) => sort,
        }
    }
}

fn sorted_unique<T: Ord>(mut values: Vec<T>) -> Vec<T> {
    values.sort();
    values.dedup();
    values
}
