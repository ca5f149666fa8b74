use std::str::FromStr;

use productmaster_core::domain::product::{Product, ProductCode, ProductSummary, ProductType};
use rust_decimal::Decimal;
use sqlx::{sqlite::SqliteRow, Row};

use super::{ProductRepository, RepositoryError};
use crate::search::{BindValue, SearchStatement};
use crate::DbPool;

pub struct SqlProductRepository {
    pool: DbPool,
}

impl SqlProductRepository {
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }
}

#[async_trait::async_trait]
impl ProductRepository for SqlProductRepository {
    async fn search(
        &self,
        statement: &SearchStatement,
    ) -> Result<Vec<ProductSummary>, RepositoryError> {
        let mut query = sqlx::query(statement.sql());
        for bind in statement.binds() {
            query = match bind {
                BindValue::Text(value) => query.bind(value.as_str()),
                BindValue::Integer(value) => query.bind(*value),
                BindValue::Amount(value) => query.bind(BindValue::amount_as_real(value)),
            };
        }

        let rows = query.fetch_all(&self.pool).await?;
        rows.iter().map(summary_from_row).collect()
    }

    async fn find_by_code(&self, code: &ProductCode) -> Result<Option<Product>, RepositoryError> {
        let row = sqlx::query(
            "SELECT product_code, product_name, product_type, currency, issuer, risk_level,
                    minimum_investment, description, is_active
             FROM products WHERE product_code = ?",
        )
        .bind(&code.0)
        .fetch_optional(&self.pool)
        .await?;

        row.as_ref().map(product_from_row).transpose()
    }

    async fn save(&self, product: Product) -> Result<(), RepositoryError> {
        sqlx::query(
            r#"
            INSERT INTO products (
                product_code, product_name, product_type, currency, issuer,
                risk_level, minimum_investment, description, is_active,
                name_folded, code_folded, issuer_folded, description_folded
            ) VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
            ON CONFLICT(product_code) DO UPDATE SET
                product_name = excluded.product_name,
                product_type = excluded.product_type,
                currency = excluded.currency,
                issuer = excluded.issuer,
                risk_level = excluded.risk_level,
                minimum_investment = excluded.minimum_investment,
                description = excluded.description,
                is_active = excluded.is_active,
                name_folded = excluded.name_folded,
                code_folded = excluded.code_folded,
                issuer_folded = excluded.issuer_folded,
                description_folded = excluded.description_folded,
                updated_at = strftime('%Y-%m-%dT%H:%M:%SZ', 'now')
            "#,
        )
        .bind(&product.code.0)
        .bind(&product.name)
        .bind(product.product_type.as_str())
        .bind(&product.currency)
        .bind(&product.issuer)
        .bind(i64::from(product.risk_level))
        .bind(product.minimum_investment.normalize().to_string())
        .bind(&product.description)
        .bind(product.active)
        .bind(product.name.to_lowercase())
        .bind(product.code.0.to_lowercase())
        .bind(product.issuer.to_lowercase())
        .bind(product.description.to_lowercase())
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    async fn count_active(&self) -> Result<u64, RepositoryError> {
        let count: i64 = sqlx::query("SELECT COUNT(*) AS count FROM products WHERE is_active = 1")
            .fetch_one(&self.pool)
            .await?
            .try_get("count")?;
        u64::try_from(count).map_err(|_| RepositoryError::Decode(format!("negative count {count}")))
    }
}

fn summary_from_row(row: &SqliteRow) -> Result<ProductSummary, RepositoryError> {
    Ok(ProductSummary {
        product_code: ProductCode(row.try_get("product_code")?),
        product_name: row.try_get("product_name")?,
        product_type: decode_product_type(row)?,
        currency: row.try_get("currency")?,
        issuer: row.try_get("issuer")?,
        risk_level: decode_risk_level(row)?,
        minimum_investment: decode_amount(row)?,
        description: row.try_get("description")?,
    })
}

fn product_from_row(row: &SqliteRow) -> Result<Product, RepositoryError> {
    let summary = summary_from_row(row)?;
    Ok(Product {
        code: summary.product_code,
        name: summary.product_name,
        product_type: summary.product_type,
        currency: summary.currency,
        issuer: summary.issuer,
        risk_level: summary.risk_level,
        minimum_investment: summary.minimum_investment,
        description: summary.description,
        active: row.try_get("is_active")?,
    })
}

fn decode_product_type(row: &SqliteRow) -> Result<ProductType, RepositoryError> {
    let raw: String = row.try_get("product_type")?;
    ProductType::from_str(&raw).map_err(|error| RepositoryError::Decode(error.to_string()))
}

fn decode_risk_level(row: &SqliteRow) -> Result<u8, RepositoryError> {
    let raw: i64 = row.try_get("risk_level")?;
    u8::try_from(raw).map_err(|_| RepositoryError::Decode(format!("risk level {raw} out of range")))
}

fn decode_amount(row: &SqliteRow) -> Result<Decimal, RepositoryError> {
    let raw: String = row.try_get("minimum_investment")?;
    Decimal::from_str(raw.trim()).map_err(|error| {
        RepositoryError::Decode(format!("minimum_investment `{raw}` is not a decimal: {error}"))
    })
}
