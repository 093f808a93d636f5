use std::env;
use std::fs;
use std::path::{Path, PathBuf};
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::domain::price::RoundingMode;

pub const MAX_DISPLAY_SCALE: u32 = 10;

/// Environment keys per setting. When several are set the first one wins.
pub const DISPLAY_SCALE_ENV: &[&str] = &["PRICEWISE_PRICING_DISPLAY_SCALE"];
pub const ROUNDING_ENV: &[&str] = &["PRICEWISE_PRICING_ROUNDING"];
pub const LOG_LEVEL_ENV: &[&str] = &["PRICEWISE_LOGGING_LEVEL", "PRICEWISE_LOG_LEVEL"];
pub const LOG_FORMAT_ENV: &[&str] = &["PRICEWISE_LOGGING_FORMAT", "PRICEWISE_LOG_FORMAT"];

#[derive(Clone, Debug)]
pub struct AppConfig {
    pub pricing: PricingConfig,
    pub logging: LoggingConfig,
}

#[derive(Clone, Debug)]
pub struct PricingConfig {
    /// Decimal places used when a summary is rendered; calculations are never
    /// rounded.
    pub display_scale: u32,
    pub rounding: RoundingMode,
}

#[derive(Clone, Debug)]
pub struct LoggingConfig {
    pub level: String,
    pub format: LogFormat,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LogFormat {
    Compact,
    Pretty,
    Json,
}

#[derive(Clone, Debug, Default)]
pub struct ConfigOverrides {
    pub display_scale: Option<u32>,
    pub rounding: Option<RoundingMode>,
    pub log_level: Option<String>,
    pub log_format: Option<LogFormat>,
}

#[derive(Clone, Debug, Default)]
pub struct LoadOptions {
    pub config_path: Option<PathBuf>,
    pub require_file: bool,
    pub overrides: ConfigOverrides,
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("could not read config file `{path}`: {source}")]
    ReadFile { path: PathBuf, source: std::io::Error },
    #[error("could not parse config file `{path}`: {source}")]
    ParseFile { path: PathBuf, source: toml::de::Error },
    #[error("required config file was not found: `{0}`")]
    MissingConfigFile(PathBuf),
    #[error("environment variable interpolation failed for `{var}`")]
    MissingEnvInterpolation { var: String },
    #[error("unterminated environment interpolation expression")]
    UnterminatedInterpolation,
    #[error("invalid environment override for `{key}`: `{value}`")]
    InvalidEnvOverride { key: String, value: String },
    #[error("configuration validation failed: {0}")]
    Validation(String),
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            pricing: PricingConfig { display_scale: 2, rounding: RoundingMode::HalfUp },
            logging: LoggingConfig { level: "info".to_string(), format: LogFormat::Compact },
        }
    }
}

impl FromStr for LogFormat {
    type Err = ConfigError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_ascii_lowercase().as_str() {
            "compact" => Ok(Self::Compact),
            "pretty" => Ok(Self::Pretty),
            "json" => Ok(Self::Json),
            other => Err(ConfigError::Validation(format!(
                "unsupported log format `{other}` (expected compact|pretty|json)"
            ))),
        }
    }
}

impl FromStr for RoundingMode {
    type Err = ConfigError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_ascii_lowercase().as_str() {
            "half_up" => Ok(Self::HalfUp),
            "half_even" => Ok(Self::HalfEven),
            "truncate" => Ok(Self::Truncate),
            other => Err(ConfigError::Validation(format!(
                "unsupported rounding mode `{other}` (expected half_up|half_even|truncate)"
            ))),
        }
    }
}

impl AppConfig {
    pub fn load(options: LoadOptions) -> Result<Self, ConfigError> {
        let mut config = Self::default();
        let maybe_path = resolve_config_path(options.config_path.as_deref());

        if let Some(path) = maybe_path {
            let patch = read_patch(&path)?;
            config.apply_patch(patch);
        } else if options.require_file {
            let expected = options.config_path.unwrap_or_else(|| PathBuf::from("pricewise.toml"));
            return Err(ConfigError::MissingConfigFile(expected));
        }

        config.apply_env_overrides()?;
        config.apply_overrides(options.overrides);
        config.validate()?;

        Ok(config)
    }

    fn apply_patch(&mut self, patch: ConfigPatch) {
        if let Some(pricing) = patch.pricing {
            if let Some(display_scale) = pricing.display_scale {
                self.pricing.display_scale = display_scale;
            }
            if let Some(rounding) = pricing.rounding {
                self.pricing.rounding = rounding;
            }
        }

        if let Some(logging) = patch.logging {
            if let Some(level) = logging.level {
                self.logging.level = level;
            }
            if let Some(format) = logging.format {
                self.logging.format = format;
            }
        }
    }

    fn apply_env_overrides(&mut self) -> Result<(), ConfigError> {
        if let Some(display_scale) = env_override(DISPLAY_SCALE_ENV)? {
            self.pricing.display_scale = display_scale;
        }
        if let Some(rounding) = env_override(ROUNDING_ENV)? {
            self.pricing.rounding = rounding;
        }
        if let Some(level) = env_override(LOG_LEVEL_ENV)? {
            self.logging.level = level;
        }
        if let Some(format) = env_override(LOG_FORMAT_ENV)? {
            self.logging.format = format;
        }

        Ok(())
    }

    fn apply_overrides(&mut self, overrides: ConfigOverrides) {
        if let Some(display_scale) = overrides.display_scale {
            self.pricing.display_scale = display_scale;
        }
        if let Some(rounding) = overrides.rounding {
            self.pricing.rounding = rounding;
        }
        if let Some(log_level) = overrides.log_level {
            self.logging.level = log_level;
        }
        if let Some(log_format) = overrides.log_format {
            self.logging.format = log_format;
        }
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        validate_pricing(&self.pricing)?;
        validate_logging(&self.logging)?;
        Ok(())
    }
}

pub fn resolve_config_path(explicit_path: Option<&Path>) -> Option<PathBuf> {
    if let Some(path) = explicit_path {
        return path.exists().then_some(path.to_path_buf());
    }

    [PathBuf::from("pricewise.toml"), PathBuf::from("config/pricewise.toml")]
        .into_iter()
        .find(|path| path.exists())
}

fn read_patch(path: &Path) -> Result<ConfigPatch, ConfigError> {
    let raw = fs::read_to_string(path)
        .map_err(|source| ConfigError::ReadFile { path: path.to_path_buf(), source })?;

    let interpolated = interpolate_env_vars(&raw)?;
    toml::from_str::<ConfigPatch>(&interpolated)
        .map_err(|source| ConfigError::ParseFile { path: path.to_path_buf(), source })
}

fn interpolate_env_vars(input: &str) -> Result<String, ConfigError> {
    let mut output = String::with_capacity(input.len());
    let mut chars = input.chars().peekable();

    while let Some(ch) = chars.next() {
        if ch == '$' && matches!(chars.peek(), Some('{')) {
            chars.next();
            let mut key = String::new();

            loop {
                match chars.next() {
                    Some('}') => break,
                    Some(next) => key.push(next),
                    None => return Err(ConfigError::UnterminatedInterpolation),
                }
            }

            let value = env::var(&key)
                .map_err(|_| ConfigError::MissingEnvInterpolation { var: key.clone() })?;
            output.push_str(&value);
            continue;
        }

        output.push(ch);
    }

    Ok(output)
}

fn validate_pricing(pricing: &PricingConfig) -> Result<(), ConfigError> {
    if pricing.display_scale > MAX_DISPLAY_SCALE {
        return Err(ConfigError::Validation(format!(
            "pricing.display_scale must be in range 0..={MAX_DISPLAY_SCALE}"
        )));
    }

    Ok(())
}

fn validate_logging(logging: &LoggingConfig) -> Result<(), ConfigError> {
    let level = logging.level.trim().to_ascii_lowercase();
    match level.as_str() {
        "trace" | "debug" | "info" | "warn" | "error" => Ok(()),
        _ => Err(ConfigError::Validation(
            "logging.level must be one of trace|debug|info|warn|error".to_string(),
        )),
    }
}

/// Parses the first non-blank variable among `keys`.
fn env_override<T: FromStr>(keys: &[&str]) -> Result<Option<T>, ConfigError> {
    let found = keys.iter().find_map(|key| {
        env::var(key).ok().filter(|value| !value.trim().is_empty()).map(|value| (*key, value))
    });
    let Some((key, value)) = found else {
        return Ok(None);
    };

    value
        .trim()
        .parse()
        .map(Some)
        .map_err(|_| ConfigError::InvalidEnvOverride { key: key.to_string(), value })
}

#[derive(Debug, Default, Deserialize)]
struct ConfigPatch {
    pricing: Option<PricingPatch>,
    logging: Option<LoggingPatch>,
}

#[derive(Debug, Default, Deserialize)]
struct PricingPatch {
    display_scale: Option<u32>,
    rounding: Option<RoundingMode>,
}

#[derive(Debug, Default, Deserialize)]
struct LoggingPatch {
    level: Option<String>,
    format: Option<LogFormat>,
}

#[cfg(test)]
mod tests {
    use std::env;
    use std::fs;
    use std::path::PathBuf;
    use std::sync::{Mutex, OnceLock, PoisonError};

    use tempfile::TempDir;

    use super::{
        AppConfig, ConfigError, ConfigOverrides, LoadOptions, LogFormat, DISPLAY_SCALE_ENV,
        LOG_FORMAT_ENV, LOG_LEVEL_ENV, ROUNDING_ENV,
    };
    use crate::domain::price::RoundingMode;

    /// Runs `test` with only `vars` set among the pricing variables.
    fn with_env(vars: &[(&str, &str)], test: impl FnOnce()) {
        static ENV_LOCK: OnceLock<Mutex<()>> = OnceLock::new();
        let _guard =
            ENV_LOCK.get_or_init(|| Mutex::new(())).lock().unwrap_or_else(PoisonError::into_inner);

        let known = [DISPLAY_SCALE_ENV, ROUNDING_ENV, LOG_LEVEL_ENV, LOG_FORMAT_ENV].concat();
        for key in known.iter().chain(vars.iter().map(|(key, _)| key)) {
            env::remove_var(key);
        }
        for (key, value) in vars {
            env::set_var(key, value);
        }

        test();

        for (key, _) in vars {
            env::remove_var(key);
        }
    }

    fn config_file(contents: &str) -> (TempDir, PathBuf) {
        let dir = TempDir::new().expect("temp dir");
        let path = dir.path().join("pricewise.toml");
        fs::write(&path, contents).expect("write config fixture");
        (dir, path)
    }

    fn load_from(path: PathBuf) -> Result<AppConfig, ConfigError> {
        AppConfig::load(LoadOptions { config_path: Some(path), ..LoadOptions::default() })
    }

    #[test]
    fn defaults_display_two_places_half_up() {
        with_env(&[], || {
            let config = AppConfig::load(LoadOptions::default()).expect("defaults load");

            assert_eq!(config.pricing.display_scale, 2);
            assert_eq!(config.pricing.rounding, RoundingMode::HalfUp);
            assert_eq!(config.logging.level, "info");
            assert_eq!(config.logging.format, LogFormat::Compact);
        });
    }

    #[test]
    fn display_scale_is_interpolated_into_the_file() {
        with_env(&[("PRICEWISE_TEST_SCALE", "4")], || {
            let (_dir, path) = config_file(
                "[pricing]\ndisplay_scale = ${PRICEWISE_TEST_SCALE}\nrounding = \"half_even\"\n",
            );
            let config = load_from(path).expect("interpolated config");

            assert_eq!(config.pricing.display_scale, 4);
            assert_eq!(config.pricing.rounding, RoundingMode::HalfEven);
        });
    }

    #[test]
    fn unset_interpolation_variable_is_named() {
        with_env(&[], || {
            let (_dir, path) = config_file("[logging]\nlevel = \"${PRICEWISE_TEST_ABSENT}\"\n");

            let error = load_from(path).expect_err("unset variable");

            assert!(matches!(
                error,
                ConfigError::MissingEnvInterpolation { ref var } if var == "PRICEWISE_TEST_ABSENT"
            ));
        });
    }

    #[test]
    fn short_logging_aliases_apply() {
        with_env(&[("PRICEWISE_LOG_LEVEL", "warn"), ("PRICEWISE_LOG_FORMAT", "json")], || {
            let config = AppConfig::load(LoadOptions::default()).expect("aliases load");

            assert_eq!(config.logging.level, "warn");
            assert_eq!(config.logging.format, LogFormat::Json);
        });
    }

    #[test]
    fn overrides_beat_env_and_env_beats_file() {
        let vars =
            [("PRICEWISE_PRICING_DISPLAY_SCALE", "3"), ("PRICEWISE_PRICING_ROUNDING", "truncate")];
        with_env(&vars, || {
            let (_dir, path) = config_file(concat!(
                "[pricing]\ndisplay_scale = 6\nrounding = \"half_even\"\n",
                "[logging]\nlevel = \"warn\"\n",
            ));
            let config = AppConfig::load(LoadOptions {
                config_path: Some(path),
                overrides: ConfigOverrides {
                    display_scale: Some(0),
                    log_level: Some("debug".to_string()),
                    ..ConfigOverrides::default()
                },
                ..LoadOptions::default()
            })
            .expect("layered config");

            assert_eq!(config.pricing.display_scale, 0);
            assert_eq!(config.pricing.rounding, RoundingMode::Truncate);
            assert_eq!(config.logging.level, "debug");
        });
    }

    #[test]
    fn display_scale_above_maximum_is_rejected() {
        with_env(&[("PRICEWISE_PRICING_DISPLAY_SCALE", "12")], || {
            let error = AppConfig::load(LoadOptions::default()).expect_err("scale 12");

            assert!(error.to_string().contains("pricing.display_scale"));
        });
    }

    #[test]
    fn unparsable_env_values_name_their_key() {
        let cases =
            [("PRICEWISE_PRICING_DISPLAY_SCALE", "two"), ("PRICEWISE_PRICING_ROUNDING", "up")];
        for (key, value) in cases {
            with_env(&[(key, value)], || {
                assert!(matches!(
                    AppConfig::load(LoadOptions::default()),
                    Err(ConfigError::InvalidEnvOverride { key: ref named, .. }) if named == key
                ));
            });
        }
    }

    #[test]
    fn rounding_names_parse_case_insensitively() {
        assert_eq!(" HALF_EVEN ".parse::<RoundingMode>().ok(), Some(RoundingMode::HalfEven));
        assert!("bankers".parse::<RoundingMode>().is_err());
    }

    #[test]
    fn required_file_must_exist() {
        with_env(&[], || {
            let dir = TempDir::new().expect("temp dir");
            let result = AppConfig::load(LoadOptions {
                config_path: Some(dir.path().join("absent.toml")),
                require_file: true,
                ..LoadOptions::default()
            });

            assert!(matches!(result, Err(ConfigError::MissingConfigFile(_))));
        });
    }
}
