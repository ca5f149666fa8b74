use productmaster_core::domain::product::ProductType;
use productmaster_core::domain::query::{QueryParameters, SearchLimits, SortDirective};
use productmaster_db::{
    connect_with_settings, migrations, seed_demo_catalog, ProductRepository, SearchStatement,
    SqlProductRepository,
};
use rust_decimal::Decimal;

type ContractResult<T = ()> = Result<T, String>;

macro_rules! require {
    ($cond:expr) => {
        if !$cond {
            return Err(format!("assertion failed: `{}`", stringify!($cond)));
        }
    };
    ($cond:expr, $($arg:tt)*) => {
        if !$cond {
            return Err(format!($($arg)*));
        }
    };
}

macro_rules! require_eq {
    ($left:expr, $right:expr) => {
        if $left != $right {
            return Err(format!(
                "assertion failed: `left == right` (`{:?}` != `{:?}`)",
                $left,
                $right
            ));
        }
    };
}

async fn seeded_repository() -> ContractResult<SqlProductRepository> {
    let pool = connect_with_settings("sqlite::memory:", 1, 30)
        .await
        .map_err(|error| format!("connect failed: {error}"))?;
    migrations::run_pending(&pool).await.map_err(|error| format!("migrate failed: {error}"))?;
    seed_demo_catalog(&pool).await.map_err(|error| format!("seed failed: {error}"))?;
    Ok(SqlProductRepository::new(pool))
}

#[tokio::test]
async fn result_count_never_exceeds_requested_or_hard_maximum() -> ContractResult {
    let repo = seeded_repository().await?;
    let limits = SearchLimits { default_limit: 20, max_limit: 4 };

    for requested in [None, Some(1), Some(3), Some(4), Some(10_000)] {
        let params = QueryParameters { limit: requested, ..QueryParameters::default() };
        let statement = SearchStatement::build(&params, &limits);
        let rows = repo.search(&statement).await.map_err(|error| error.to_string())?;

        let expected_cap = requested.unwrap_or(limits.default_limit).min(limits.max_limit);
        require!(
            rows.len() <= expected_cap as usize,
            "limit {requested:?} returned {} rows",
            rows.len()
        );
        require!(rows.len() <= limits.max_limit as usize);
    }
    Ok(())
}

#[tokio::test]
async fn low_risk_bonds_come_back_in_name_order() -> ContractResult {
    let repo = seeded_repository().await?;
    let params = QueryParameters {
        risk_levels: Some(vec![1, 2]),
        product_types: Some(vec![ProductType::Bond]),
        ..QueryParameters::default()
    };
    let statement = SearchStatement::build(&params, &SearchLimits::default());
    let rows = repo.search(&statement).await.map_err(|error| error.to_string())?;

    let codes: Vec<&str> = rows.iter().map(|row| row.product_code.0.as_str()).collect();
    require_eq!(codes, vec!["CORP-BBB", "JGB-10Y", "UST-5Y"]);
    Ok(())
}

#[tokio::test]
async fn investment_descending_breaks_ties_by_code() -> ContractResult {
    let repo = seeded_repository().await?;
    let params = QueryParameters {
        currencies: Some(vec!["JPY".to_string()]),
        sort: Some(SortDirective::InvestmentDesc),
        ..QueryParameters::default()
    };
    let statement = SearchStatement::build(&params, &SearchLimits::default());
    let rows = repo.search(&statement).await.map_err(|error| error.to_string())?;

    let codes: Vec<&str> = rows.iter().map(|row| row.product_code.0.as_str()).collect();
    require_eq!(codes, vec!["KEU", "BAL-INC", "JGB-10Y", "TOPIX-IF"]);
    require!(rows.first().map(|row| row.minimum_investment) == Some(Decimal::new(100_000, 0)));
    Ok(())
}

#[tokio::test]
async fn repeated_searches_are_deterministic() -> ContractResult {
    let repo = seeded_repository().await?;
    let params = QueryParameters { query: Some("Fund".to_string()), ..QueryParameters::default() };
    let statement = SearchStatement::build(&params, &SearchLimits::default());

    let first = repo.search(&statement).await.map_err(|error| error.to_string())?;
    let second = repo.search(&statement).await.map_err(|error| error.to_string())?;

    require!(!first.is_empty());
    require_eq!(first, second);
    Ok(())
}
