use std::env;
use std::fs;
use std::path::{Path, PathBuf};

use toml::Value;

use adpulse_core::config::{AppConfig, LoadOptions};

pub fn run() -> String {
    let config = match AppConfig::load(LoadOptions::default()) {
        Ok(config) => config,
        Err(error) => return format!("config validation failed: {error}"),
    };

    let config_file_path = detect_config_path();
    let config_file_doc = load_config_file_doc(config_file_path.as_deref());

    let mut lines = vec!["effective config (source precedence: env > file > default):".to_string()];

    lines.push(render_line(
        "sync.cooldown_secs",
        &config.sync.cooldown_secs.to_string(),
        field_source(
            "sync.cooldown_secs",
            Some("ADPULSE_SYNC_COOLDOWN_SECS"),
            config_file_doc.as_ref(),
            config_file_path.as_deref(),
        ),
    ));
    lines.push(render_line(
        "sync.fetch_timeout_secs",
        &config.sync.fetch_timeout_secs.to_string(),
        field_source(
            "sync.fetch_timeout_secs",
            Some("ADPULSE_SYNC_FETCH_TIMEOUT_SECS"),
            config_file_doc.as_ref(),
            config_file_path.as_deref(),
        ),
    ));

    let api_token = if config.sync.api_token.is_some() { "<redacted>" } else { "<unset>" };
    lines.push(render_line(
        "sync.api_token",
        api_token,
        field_source(
            "sync.api_token",
            Some("ADPULSE_SYNC_API_TOKEN"),
            config_file_doc.as_ref(),
            config_file_path.as_deref(),
        ),
    ));

    lines.push(render_line(
        "attribution.revenue_source",
        &format!("{:?}", config.attribution.revenue_source),
        field_source(
            "attribution.revenue_source",
            Some("ADPULSE_ATTRIBUTION_REVENUE_SOURCE"),
            config_file_doc.as_ref(),
            config_file_path.as_deref(),
        ),
    ));
    lines.push(render_line(
        "attribution.manual_events_enabled",
        &config.attribution.manual_events_enabled.to_string(),
        field_source(
            "attribution.manual_events_enabled",
            Some("ADPULSE_ATTRIBUTION_MANUAL_EVENTS"),
            config_file_doc.as_ref(),
            config_file_path.as_deref(),
        ),
    ));

    lines.push(render_line(
        "logging.level",
        &config.logging.level,
        field_source(
            "logging.level",
            Some("ADPULSE_LOGGING_LEVEL"),
            config_file_doc.as_ref(),
            config_file_path.as_deref(),
        ),
    ));
    lines.push(render_line(
        "logging.format",
        &format!("{:?}", config.logging.format),
        field_source(
            "logging.format",
            Some("ADPULSE_LOGGING_FORMAT"),
            config_file_doc.as_ref(),
            config_file_path.as_deref(),
        ),
    ));

    lines.join("\n")
}

fn detect_config_path() -> Option<PathBuf> {
    let root = PathBuf::from("adpulse.toml");
    if root.exists() {
        return Some(root);
    }

    let nested = PathBuf::from("config/adpulse.toml");
    if nested.exists() {
        return Some(nested);
    }

    None
}

fn load_config_file_doc(path: Option<&Path>) -> Option<Value> {
    let path = path?;
    let raw = fs::read_to_string(path).ok()?;
    raw.parse::<Value>().ok()
}

fn field_source(
    key_path: &str,
    env_key: Option<&str>,
    config_file_doc: Option<&Value>,
    config_file_path: Option<&Path>,
) -> String {
    if let Some(env_key) = env_key {
        if env::var_os(env_key).is_some() {
            return format!("env ({env_key})");
        }
    }

    if let Some(doc) = config_file_doc {
        if contains_path(doc, key_path) {
            let file_path = config_file_path
                .map(|path| path.display().to_string())
                .unwrap_or_else(|| "config file".to_string());
            return format!("file ({file_path})");
        }
    }

    "default".to_string()
}

fn contains_path(root: &Value, key_path: &str) -> bool {
    let mut current = root;
    for key in key_path.split('.') {
        let Some(next) = current.get(key) else {
            return false;
        };
        current = next;
    }
    true
}

fn render_line(key: &str, value: &str, source: String) -> String {
    format!("- {key} = {value} (source: {source})")
}
