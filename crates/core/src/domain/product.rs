use std::fmt;
use std::str::FromStr;

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

#[derive(Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ProductCode(pub String);

impl fmt::Display for ProductCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ProductType {
    #[serde(alias = "bonds")]
    Bond,
    #[serde(alias = "stocks", alias = "equity")]
    Stock,
    #[serde(alias = "funds", alias = "investment_trust")]
    Fund,
    Other,
}

impl ProductType {
    pub const ALL: [ProductType; 4] =
        [ProductType::Bond, ProductType::Stock, ProductType::Fund, ProductType::Other];

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Bond => "bond",
            Self::Stock => "stock",
            Self::Fund => "fund",
            Self::Other => "other",
        }
    }
}

impl fmt::Display for ProductType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct UnknownProductType(pub String);

impl fmt::Display for UnknownProductType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "unknown product type `{}` (expected bond|stock|fund|other)", self.0)
    }
}

impl std::error::Error for UnknownProductType {}

impl FromStr for ProductType {
    type Err = UnknownProductType;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_ascii_lowercase().as_str() {
            "bond" | "bonds" => Ok(Self::Bond),
            "stock" | "stocks" | "equity" => Ok(Self::Stock),
            "fund" | "funds" | "investment_trust" => Ok(Self::Fund),
            "other" => Ok(Self::Other),
            other => Err(UnknownProductType(other.to_string())),
        }
    }
}

/// Ordinal risk classification, 1 (lowest) to 5 (highest).
pub const MIN_RISK_LEVEL: u8 = 1;
pub const MAX_RISK_LEVEL: u8 = 5;

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Product {
    pub code: ProductCode,
    pub name: String,
    pub product_type: ProductType,
    pub currency: String,
    pub issuer: String,
    pub risk_level: u8,
    pub minimum_investment: Decimal,
    pub description: String,
    pub active: bool,
}

impl Product {
    pub fn summary(&self) -> ProductSummary {
        ProductSummary {
            product_code: self.code.clone(),
            product_name: self.name.clone(),
            product_type: self.product_type,
            currency: self.currency.clone(),
            issuer: self.issuer.clone(),
            risk_level: self.risk_level,
            minimum_investment: self.minimum_investment,
            description: self.description.clone(),
        }
    }
}

/// Read projection handed from retrieval to formatting.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProductSummary {
    pub product_code: ProductCode,
    pub product_name: String,
    pub product_type: ProductType,
    pub currency: String,
    pub issuer: String,
    pub risk_level: u8,
    pub minimum_investment: Decimal,
    pub description: String,
}
