use std::env;
use std::fs;
use std::path::Path;

use pricewise_core::config::{
    resolve_config_path, AppConfig, LoadOptions, DISPLAY_SCALE_ENV, LOG_FORMAT_ENV, LOG_LEVEL_ENV,
    ROUNDING_ENV,
};
use toml::Value;

pub fn run(options: &LoadOptions) -> String {
    let config = match AppConfig::load(options.clone()) {
        Ok(config) => config,
        Err(error) => return format!("config validation failed: {error}"),
    };

    let config_file_path = resolve_config_path(options.config_path.as_deref());
    let config_file_doc = load_config_file_doc(config_file_path.as_deref());
    let source = |key_path: &str, flag: Option<&str>, env_keys: &[&str]| {
        if let Some(flag) = flag {
            return format!("override ({flag})");
        }
        field_source(key_path, env_keys, config_file_doc.as_ref(), config_file_path.as_deref())
    };
    let overrides = &options.overrides;

    let lines = [
        "effective config (source precedence: override > env > file > default):".to_string(),
        render_line(
            "pricing.display_scale",
            &config.pricing.display_scale.to_string(),
            source(
                "pricing.display_scale",
                overrides.display_scale.map(|_| "--display-scale"),
                DISPLAY_SCALE_ENV,
            ),
        ),
        render_line(
            "pricing.rounding",
            &format!("{:?}", config.pricing.rounding),
            source("pricing.rounding", overrides.rounding.map(|_| "--rounding"), ROUNDING_ENV),
        ),
        render_line(
            "logging.level",
            &config.logging.level,
            source(
                "logging.level",
                overrides.log_level.as_ref().map(|_| "--log-level"),
                LOG_LEVEL_ENV,
            ),
        ),
        render_line(
            "logging.format",
            &format!("{:?}", config.logging.format),
            source("logging.format", overrides.log_format.map(|_| "--log-format"), LOG_FORMAT_ENV),
        ),
    ];

    lines.join("\n")
}

fn load_config_file_doc(path: Option<&Path>) -> Option<Value> {
    let path = path?;
    let raw = fs::read_to_string(path).ok()?;
    raw.parse::<Value>().ok()
}

fn field_source(
    key_path: &str,
    env_keys: &[&str],
    config_file_doc: Option<&Value>,
    config_file_path: Option<&Path>,
) -> String {
    if let Some(env_key) = env_keys.iter().find(|key| env::var_os(key).is_some()) {
        return format!("env ({env_key})");
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
