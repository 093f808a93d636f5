pub mod config;
pub mod distribution;
pub mod final_total;
pub mod price;

use std::fs;
use std::path::Path;

use pricewise_core::config::{AppConfig, LoadOptions};
use pricewise_core::errors::{ApplicationError, InterfaceError};
use pricewise_core::{InMemoryQuoteDataProvider, PricingService, Quote};
use serde::Serialize;
use serde_json::Value;

#[derive(Debug, Clone)]
pub struct CommandResult {
    pub exit_code: u8,
    pub output: String,
}

#[derive(Debug, Serialize)]
struct CommandOutcome {
    command: String,
    status: String,
    error_class: Option<String>,
    message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    data: Option<Value>,
}

impl CommandResult {
    pub fn success_with_data(
        command: &str,
        message: impl Into<String>,
        data: Option<Value>,
    ) -> Self {
        let payload = CommandOutcome {
            command: command.to_string(),
            status: "ok".to_string(),
            error_class: None,
            message: message.into(),
            data,
        };
        Self { exit_code: 0, output: serialize_payload(payload) }
    }

    pub fn failure(
        command: &str,
        error_class: &str,
        message: impl Into<String>,
        exit_code: u8,
    ) -> Self {
        Self::failure_with_data(command, error_class, message, exit_code, None)
    }

    fn failure_with_data(
        command: &str,
        error_class: &str,
        message: impl Into<String>,
        exit_code: u8,
        data: Option<Value>,
    ) -> Self {
        let payload = CommandOutcome {
            command: command.to_string(),
            status: "error".to_string(),
            error_class: Some(error_class.to_string()),
            message: message.into(),
            data,
        };
        Self { exit_code, output: serialize_payload(payload) }
    }
}

fn serialize_payload(payload: CommandOutcome) -> String {
    serde_json::to_string(&payload).unwrap_or_else(|error| {
        format!(
            "{{\"command\":\"unknown\",\"status\":\"error\",\"error_class\":\"serialization\",\"message\":\"{}\"}}",
            error.to_string().replace('\\', "\\\\").replace('"', "\\\"")
        )
    })
}

pub(crate) fn to_data(command: &str, value: &impl Serialize) -> Result<Value, CommandResult> {
    serde_json::to_value(value)
        .map_err(|error| CommandResult::failure(command, "serialization", error.to_string(), 1))
}

pub(crate) fn load_config(
    command: &str,
    options: &LoadOptions,
) -> Result<AppConfig, CommandResult> {
    AppConfig::load(options.clone()).map_err(|error| {
        CommandResult::failure(
            command,
            "config_validation",
            format!("configuration issue: {error}"),
            2,
        )
    })
}

/// Reads a quote snapshot from a JSON file.
pub(crate) fn load_quote(command: &str, path: &Path) -> Result<Quote, CommandResult> {
    let raw = fs::read_to_string(path).map_err(|error| {
        CommandResult::failure(
            command,
            "input_read",
            format!("could not read quote file `{}`: {error}", path.display()),
            3,
        )
    })?;

    serde_json::from_str::<Quote>(&raw).map_err(|error| {
        CommandResult::failure(
            command,
            "input_parse",
            format!("could not parse quote file `{}`: {error}", path.display()),
            4,
        )
    })
}

pub(crate) fn service_for(quote: Quote) -> PricingService<InMemoryQuoteDataProvider> {
    PricingService::with_default_validator(InMemoryQuoteDataProvider::with_quotes([quote]))
}

pub(crate) fn application_failure(
    command: &str,
    correlation_id: &str,
    error: ApplicationError,
) -> CommandResult {
    let violations = match &error {
        ApplicationError::Calculation(calculation) if !calculation.violations().is_empty() => {
            serde_json::to_value(calculation.violations()).ok()
        }
        _ => None,
    };

    let interface = error.into_interface(correlation_id);
    let (error_class, exit_code) = match &interface {
        InterfaceError::BadRequest { .. } => ("validation", 5),
        InterfaceError::NotFound { .. } => ("not_found", 6),
        InterfaceError::ServiceUnavailable { .. } => ("data_provider", 7),
        InterfaceError::Internal { .. } => ("calculation", 5),
    };

    CommandResult::failure_with_data(
        command,
        error_class,
        format!("{} ({interface})", interface.user_message()),
        exit_code,
        violations.map(|violations| serde_json::json!({ "violations": violations })),
    )
}
