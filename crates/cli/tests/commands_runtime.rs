use std::env;
use std::sync::{Mutex, OnceLock};

use adpulse_cli::commands::{config, smoke};
use serde_json::Value;

static ENV_LOCK: OnceLock<Mutex<()>> = OnceLock::new();

fn with_env(vars: &[(&str, &str)], run: impl FnOnce()) {
    let _guard = ENV_LOCK.get_or_init(|| Mutex::new(())).lock().expect("env lock");
    for (key, value) in vars {
        env::set_var(key, value);
    }
    run();
    for (key, _) in vars {
        env::remove_var(key);
    }
}

fn parse_report(output: &str) -> Value {
    let machine = output.lines().last().expect("machine-readable line");
    serde_json::from_str(machine).expect("valid smoke JSON")
}

#[test]
fn smoke_passes_all_engine_checks() {
    with_env(&[], || {
        let result = smoke::run();
        assert_eq!(result.exit_code, 0, "expected all smoke checks to pass: {}", result.output);

        let report = parse_report(&result.output);
        assert_eq!(report["command"], "smoke");
        assert_eq!(report["status"], "pass");
        assert_eq!(report["checks"].as_array().expect("checks array").len(), 6);
    });
}

#[test]
fn smoke_fails_fast_on_invalid_config() {
    with_env(&[("ADPULSE_SYNC_COOLDOWN_SECS", "0")], || {
        let result = smoke::run();
        assert_eq!(result.exit_code, 6, "invalid config should fail the smoke run");

        let report = parse_report(&result.output);
        assert_eq!(report["status"], "fail");
        assert_eq!(report["checks"][0]["name"], "config_validation");
        assert_eq!(report["checks"][0]["status"], "fail");
    });
}

#[test]
fn config_redacts_the_api_token() {
    with_env(&[("ADPULSE_SYNC_API_TOKEN", "tok-super-secret")], || {
        let output = config::run();
        assert!(output.contains("sync.api_token = <redacted>"));
        assert!(!output.contains("tok-super-secret"));
        assert!(output.contains("env (ADPULSE_SYNC_API_TOKEN)"));
    });
}

#[test]
fn config_reports_default_sources_without_env() {
    with_env(&[], || {
        let output = config::run();
        assert!(output.contains("sync.cooldown_secs = 120"));
        assert!(output.contains("(source: default)"));
    });
}
