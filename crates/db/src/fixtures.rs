//! Deterministic demo catalog used by `seed` and by tests.

use productmaster_core::domain::product::{Product, ProductCode, ProductType};
use rust_decimal::Decimal;
use tracing::info;

use crate::connection::DbPool;
use crate::repositories::{ProductRepository, RepositoryError, SqlProductRepository};

struct DemoProduct {
    code: &'static str,
    name: &'static str,
    product_type: ProductType,
    currency: &'static str,
    issuer: &'static str,
    risk_level: u8,
    minimum_investment: i64,
    description: &'static str,
    active: bool,
}

const DEMO_PRODUCTS: &[DemoProduct] = &[
    DemoProduct {
        code: "JGB-10Y",
        name: "Japan Government Bond 10Y",
        product_type: ProductType::Bond,
        currency: "JPY",
        issuer: "Ministry of Finance Japan",
        risk_level: 1,
        minimum_investment: 10_000,
        description: "Fixed-rate sovereign bond with semi-annual coupons.",
        active: true,
    },
    DemoProduct {
        code: "UST-5Y",
        name: "US Treasury Note 5Y",
        product_type: ProductType::Bond,
        currency: "USD",
        issuer: "US Department of the Treasury",
        risk_level: 1,
        minimum_investment: 1_000,
        description: "Five-year treasury note backed by the US government.",
        active: true,
    },
    DemoProduct {
        code: "CORP-BBB",
        name: "Global Corporate Bond BBB",
        product_type: ProductType::Bond,
        currency: "USD",
        issuer: "Acme Capital",
        risk_level: 2,
        minimum_investment: 5_000,
        description: "Investment-grade corporate bond basket.",
        active: true,
    },
    DemoProduct {
        code: "EM-HY",
        name: "Emerging Market High Yield Bond",
        product_type: ProductType::Bond,
        currency: "USD",
        issuer: "Frontier Securities",
        risk_level: 5,
        minimum_investment: 10_000,
        description: "High-yield sovereign and corporate debt from emerging markets.",
        active: true,
    },
    DemoProduct {
        code: "TOPIX-IF",
        name: "TOPIX Index Fund",
        product_type: ProductType::Fund,
        currency: "JPY",
        issuer: "Nippon Asset Management",
        risk_level: 3,
        minimum_investment: 10_000,
        description: "Passive fund tracking the TOPIX index.",
        active: true,
    },
    DemoProduct {
        code: "BAL-INC",
        name: "Balanced Income Fund",
        product_type: ProductType::Fund,
        currency: "JPY",
        issuer: "Nippon Asset Management",
        risk_level: 2,
        minimum_investment: 10_000,
        description: "Mixed bond and equity allocation targeting steady income.",
        active: true,
    },
    DemoProduct {
        code: "GLB-EQ",
        name: "Global Equity Growth Fund",
        product_type: ProductType::Fund,
        currency: "USD",
        issuer: "Horizon Investments",
        risk_level: 4,
        minimum_investment: 1_000,
        description: "Actively managed developed-market growth equities.",
        active: true,
    },
    DemoProduct {
        code: "PTH",
        name: "Pacific Technology Holdings",
        product_type: ProductType::Stock,
        currency: "USD",
        issuer: "Pacific Technology Holdings",
        risk_level: 4,
        minimum_investment: 500,
        description: "Listed semiconductor and cloud services company.",
        active: true,
    },
    DemoProduct {
        code: "KEU",
        name: "Kanto Electric Utility",
        product_type: ProductType::Stock,
        currency: "JPY",
        issuer: "Kanto Electric",
        risk_level: 3,
        minimum_investment: 100_000,
        description: "Regional utility with a long dividend record.",
        active: true,
    },
    DemoProduct {
        code: "GOLD-LN",
        name: "Gold Linked Note",
        product_type: ProductType::Other,
        currency: "USD",
        issuer: "Bullion Trust",
        risk_level: 3,
        minimum_investment: 2_500,
        description: "Structured note linked to the spot gold price.",
        active: true,
    },
    DemoProduct {
        code: "MUNI-OLD",
        name: "Legacy Municipal Bond",
        product_type: ProductType::Bond,
        currency: "JPY",
        issuer: "City of Sakura",
        risk_level: 1,
        minimum_investment: 10_000,
        description: "Matured municipal issue kept for history.",
        active: false,
    },
];

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct SeedReport {
    pub upserted: usize,
    pub active: usize,
    pub inactive: usize,
}

pub fn demo_catalog() -> Vec<Product> {
    DEMO_PRODUCTS
        .iter()
        .map(|demo| Product {
            code: ProductCode(demo.code.to_string()),
            name: demo.name.to_string(),
            product_type: demo.product_type,
            currency: demo.currency.to_string(),
            issuer: demo.issuer.to_string(),
            risk_level: demo.risk_level,
            minimum_investment: Decimal::new(demo.minimum_investment, 0),
            description: demo.description.to_string(),
            active: demo.active,
        })
        .collect()
}

/// Upserts the demo catalog; running it twice leaves the same rows.
pub async fn seed_demo_catalog(pool: &DbPool) -> Result<SeedReport, RepositoryError> {
    let repo = SqlProductRepository::new(pool.clone());
    let mut report = SeedReport::default();

    for product in demo_catalog() {
        if product.active {
            report.active += 1;
        } else {
            report.inactive += 1;
        }
        repo.save(product).await?;
        report.upserted += 1;
    }

    info!(
        event_name = "db.seed.completed",
        upserted = report.upserted,
        active = report.active,
        inactive = report.inactive,
        "demo catalog seeded"
    );
    Ok(report)
}
