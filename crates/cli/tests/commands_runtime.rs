use std::env;
use std::sync::{Mutex, OnceLock};

use productmaster_cli::commands::query::QueryArgs;
use productmaster_cli::commands::{doctor, migrate, query, seed};
use serde_json::Value;

/// Nothing listens on the discard port, so the model call fails fast and the
/// pipeline degrades instead of hanging.
const UNREACHABLE_MODEL: &str = "http://127.0.0.1:9";

#[test]
fn migrate_returns_success_with_valid_env() {
    with_env(&[("PRODUCTMASTER_DATABASE_URL", "sqlite::memory:")], || {
        let result = migrate::run();
        assert_eq!(result.exit_code, 0, "expected successful migrate run");

        let payload = parse_payload(&result.output);
        assert_eq!(payload["command"], "migrate");
        assert_eq!(payload["status"], "ok");
        assert_eq!(payload["message"], "applied pending migrations (8 system prompts available)");
    });
}

#[test]
fn migrate_returns_config_failure_without_llm_api_key() {
    with_env(
        &[
            ("PRODUCTMASTER_DATABASE_URL", "sqlite::memory:"),
            ("PRODUCTMASTER_LLM_PROVIDER", "anthropic"),
        ],
        || {
            let result = migrate::run();
            assert_eq!(result.exit_code, 2, "expected config validation failure code");

            let payload = parse_payload(&result.output);
            assert_eq!(payload["command"], "migrate");
            assert_eq!(payload["status"], "error");
            assert_eq!(payload["error_class"], "config_validation");
        },
    );
}

#[test]
fn seed_reports_demo_catalog_counts() {
    with_env(&[("PRODUCTMASTER_DATABASE_URL", "sqlite::memory:")], || {
        let result = seed::run();
        assert_eq!(result.exit_code, 0, "expected deterministic seed success");

        let payload = parse_payload(&result.output);
        assert_eq!(payload["command"], "seed");
        assert_eq!(payload["status"], "ok");
        assert_eq!(
            payload["message"],
            "demo catalog loaded: 11 products upserted (10 active, 1 inactive)"
        );
    });
}

#[test]
fn seed_is_idempotent_across_runs() {
    with_env(&[("PRODUCTMASTER_DATABASE_URL", "sqlite::memory:")], || {
        let first = seed::run();
        let second = seed::run();
        assert_eq!(first.exit_code, 0);
        assert_eq!(second.exit_code, 0);

        assert_eq!(parse_payload(&first.output)["message"], parse_payload(&second.output)["message"]);
    });
}

#[test]
fn doctor_json_reports_every_check() {
    with_env(&[("PRODUCTMASTER_DATABASE_URL", "sqlite::memory:")], || {
        let payload = parse_payload(&doctor::run(true));
        let names: Vec<&str> = payload["checks"]
            .as_array()
            .expect("checks array")
            .iter()
            .filter_map(|check| check["name"].as_str())
            .collect();

        assert_eq!(
            names,
            vec!["config_validation", "llm_client", "database_connectivity", "prompt_coverage"]
        );
        assert_eq!(payload["overall_status"], "pass");
    });
}

#[test]
fn query_degrades_without_a_model_and_still_returns_a_trace() {
    with_env(
        &[
            ("PRODUCTMASTER_DATABASE_URL", "sqlite::memory:"),
            ("PRODUCTMASTER_LLM_BASE_URL", UNREACHABLE_MODEL),
        ],
        || {
            let result = query::run(&QueryArgs {
                tool: "search_products".to_string(),
                text: "low risk bond products".to_string(),
                limit: None,
                request_id: Some("cli-1".to_string()),
            });
            assert_eq!(result.exit_code, 0, "empty catalog is not an error: {}", result.output);

            let envelope = parse_payload(&result.output);
            assert_eq!(envelope["result"]["isError"], false);
            assert_eq!(envelope["result"]["content"][0]["text"], "No products matched your request.");
            assert_eq!(envelope["debug_response"]["request_id"], "cli-1");
            assert!(envelope["debug_response"]["standardize"]["parse_error"].is_string());
            assert!(envelope["debug_response"].get("format").is_none());
        },
    );
}

#[test]
fn query_rejects_invalid_limit_before_running() {
    with_env(&[("PRODUCTMASTER_DATABASE_URL", "sqlite::memory:")], || {
        let result = query::run(&QueryArgs {
            tool: "search_products".to_string(),
            text: "bonds".to_string(),
            limit: Some(10_000),
            request_id: None,
        });
        assert_eq!(result.exit_code, 6);

        let payload = parse_payload(&result.output);
        assert_eq!(payload["error_class"], "invalid_input");
    });
}

fn parse_payload(output: &str) -> Value {
    serde_json::from_str(output).expect("command output should be valid JSON")
}

fn with_env(vars: &[(&str, &str)], test_fn: impl FnOnce()) {
    static ENV_LOCK: OnceLock<Mutex<()>> = OnceLock::new();
    let _guard =
        ENV_LOCK.get_or_init(|| Mutex::new(())).lock().expect("env mutex should not be poisoned");

    let keys = [
        "PRODUCTMASTER_DATABASE_URL",
        "PRODUCTMASTER_DATABASE_MAX_CONNECTIONS",
        "PRODUCTMASTER_DATABASE_TIMEOUT_SECS",
        "PRODUCTMASTER_LLM_PROVIDER",
        "PRODUCTMASTER_LLM_API_KEY",
        "PRODUCTMASTER_LLM_BASE_URL",
        "PRODUCTMASTER_LLM_MODEL",
        "PRODUCTMASTER_LLM_TIMEOUT_SECS",
        "PRODUCTMASTER_PROMPTS_MANAGEMENT_URL",
        "PRODUCTMASTER_PIPELINE_DEFAULT_LIMIT",
        "PRODUCTMASTER_PIPELINE_MAX_LIMIT",
        "PRODUCTMASTER_PIPELINE_STAGE_TIMEOUT_SECS",
        "PRODUCTMASTER_SERVER_BIND_ADDRESS",
        "PRODUCTMASTER_SERVER_PORT",
        "PRODUCTMASTER_LOGGING_LEVEL",
        "PRODUCTMASTER_LOGGING_FORMAT",
        "PRODUCTMASTER_LOG_LEVEL",
        "PRODUCTMASTER_LOG_FORMAT",
    ];

    let previous_values: Vec<(&str, Option<String>)> =
        keys.iter().map(|key| (*key, env::var(key).ok())).collect();

    for key in &keys {
        env::remove_var(key);
    }
    for (key, value) in vars {
        env::set_var(key, value);
    }

    test_fn();

    for (key, value) in previous_values {
        if let Some(value) = value {
            env::set_var(key, value);
        } else {
            env::remove_var(key);
        }
    }
}
