use productmaster_agent::prompts::{post_prompt_key, pre_prompt_key};
use productmaster_agent::{HttpLlmClient, ToolRegistry};
use productmaster_core::config::{AppConfig, LoadOptions};
use productmaster_db::{connect_with_config, migrations, DbPool, PromptRepository, SqlPromptRepository};
use serde::Serialize;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
enum CheckStatus {
    Pass,
    Fail,
    Skipped,
}

#[derive(Debug, Serialize)]
struct DoctorCheck {
    name: &'static str,
    status: CheckStatus,
    details: String,
}

impl DoctorCheck {
    fn pass(name: &'static str, details: impl Into<String>) -> Self {
        Self { name, status: CheckStatus::Pass, details: details.into() }
    }

    fn fail(name: &'static str, details: impl Into<String>) -> Self {
        Self { name, status: CheckStatus::Fail, details: details.into() }
    }

    fn skipped(name: &'static str, reason: &str) -> Self {
        Self { name, status: CheckStatus::Skipped, details: format!("skipped because {reason}") }
    }
}

#[derive(Debug, Serialize)]
struct DoctorReport {
    overall_status: CheckStatus,
    summary: String,
    checks: Vec<DoctorCheck>,
}

pub fn run(json_output: bool) -> String {
    let report = build_report();

    if json_output {
        return serde_json::to_string_pretty(&report).unwrap_or_else(|error| {
            format!(
                "{{\"overall_status\":\"fail\",\"summary\":\"doctor serialization failed\",\"error\":\"{}\"}}",
                escape_json(&error.to_string())
            )
        });
    }

    render_human(&report)
}

fn build_report() -> DoctorReport {
    let mut checks = Vec::new();

    match AppConfig::load(LoadOptions::default()) {
        Ok(config) => {
            checks.push(DoctorCheck::pass("config_validation", "configuration loaded and validated"));
            checks.push(check_llm_client(&config));
            checks.extend(check_database(&config));
        }
        Err(error) => {
            checks.push(DoctorCheck::fail("config_validation", error.to_string()));
            for name in ["llm_client", "database_connectivity", "prompt_coverage"] {
                checks.push(DoctorCheck::skipped(name, "configuration did not load"));
            }
        }
    }

    let all_pass = checks.iter().all(|check| check.status == CheckStatus::Pass);
    let overall_status = if all_pass { CheckStatus::Pass } else { CheckStatus::Fail };
    let summary = if all_pass {
        "doctor: all readiness checks passed".to_string()
    } else {
        "doctor: one or more readiness checks failed".to_string()
    };

    DoctorReport { overall_status, summary, checks }
}

fn check_llm_client(config: &AppConfig) -> DoctorCheck {
    match HttpLlmClient::from_config(&config.llm) {
        Ok(client) => DoctorCheck::pass(
            "llm_client",
            format!("{:?} client ready for model `{}`", client.provider(), config.llm.model),
        ),
        Err(error) => DoctorCheck::fail("llm_client", error.to_string()),
    }
}

/// Connectivity plus prompt coverage; the second depends on the first.
fn check_database(config: &AppConfig) -> Vec<DoctorCheck> {
    let runtime = match tokio::runtime::Builder::new_current_thread().enable_all().build() {
        Ok(runtime) => runtime,
        Err(error) => {
            return vec![
                DoctorCheck::fail(
                    "database_connectivity",
                    format!("failed to initialize async runtime: {error}"),
                ),
                DoctorCheck::skipped("prompt_coverage", "the async runtime did not start"),
            ];
        }
    };

    runtime.block_on(async {
        let pool = match connect_with_config(&config.database).await {
            Ok(pool) => pool,
            Err(error) => {
                return vec![
                    DoctorCheck::fail(
                        "database_connectivity",
                        format!("failed to connect to database: {error}"),
                    ),
                    DoctorCheck::skipped("prompt_coverage", "the database is unreachable"),
                ];
            }
        };

        let checks = vec![
            DoctorCheck::pass(
                "database_connectivity",
                format!("connected using `{}`", config.database.url),
            ),
            check_prompt_coverage(config, &pool).await,
        ];
        pool.close().await;
        checks
    })
}

async fn check_prompt_coverage(config: &AppConfig, pool: &DbPool) -> DoctorCheck {
    if let Some(url) = &config.prompts.management_url {
        return DoctorCheck::pass("prompt_coverage", format!("prompts served by `{url}`"));
    }
    if let Err(error) = migrations::run_pending(pool).await {
        return DoctorCheck::fail("prompt_coverage", format!("migrations failed: {error}"));
    }

    let keys = match SqlPromptRepository::new(pool.clone()).list_keys().await {
        Ok(keys) => keys,
        Err(error) => return DoctorCheck::fail("prompt_coverage", error.to_string()),
    };
    let missing: Vec<String> = ToolRegistry::standard()
        .iter()
        .flat_map(|tool| [pre_prompt_key(tool.name), post_prompt_key(tool.name)])
        .filter(|key| !keys.contains(key))
        .collect();

    if missing.is_empty() {
        DoctorCheck::pass("prompt_coverage", "every tool has a pre and post prompt")
    } else {
        DoctorCheck::fail("prompt_coverage", format!("missing prompts: {}", missing.join(", ")))
    }
}

fn render_human(report: &DoctorReport) -> String {
    let mut lines = Vec::new();
    lines.push(report.summary.clone());

    for check in &report.checks {
        let marker = match check.status {
            CheckStatus::Pass => "ok",
            CheckStatus::Fail => "fail",
            CheckStatus::Skipped => "skip",
        };
        lines.push(format!("- [{marker}] {}: {}", check.name, check.details));
    }

    lines.join("\n")
}

fn escape_json(value: &str) -> String {
    value.replace('\\', "\\\\").replace('"', "\\\"")
}
