use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::domain::quote::QuoteId;

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConstraintViolation {
    pub field: String,
    pub code: String,
    pub message: String,
}

impl ConstraintViolation {
    pub fn new(
        field: impl Into<String>,
        code: impl Into<String>,
        message: impl Into<String>,
    ) -> Self {
        Self { field: field.into(), code: code.into(), message: message.into() }
    }
}

#[derive(Clone, Debug, Error, PartialEq, Eq)]
pub enum CalculationError {
    #[error("validation failed for {entity}: {} violation(s)", .violations.len())]
    Validation { entity: String, violations: Vec<ConstraintViolation> },
    #[error("quote {} has no supported contract type", .quote_id.0)]
    UnsupportedContractType { quote_id: QuoteId },
    #[error("contract quote {} has no distributions", .quote_id.0)]
    MissingDistributions { quote_id: QuoteId },
    #[error("arithmetic overflow while pricing {entity}")]
    Overflow { entity: String },
}

impl CalculationError {
    pub fn violations(&self) -> &[ConstraintViolation] {
        match self {
            Self::Validation { violations, .. } => violations,
            Self::UnsupportedContractType { .. }
            | Self::MissingDistributions { .. }
            | Self::Overflow { .. } => &[],
        }
    }
}

#[derive(Clone, Debug, Error, PartialEq, Eq)]
pub enum ApplicationError {
    #[error(transparent)]
    Calculation(#[from] CalculationError),
    #[error("{entity} `{id}` was not found")]
    NotFound { entity: &'static str, id: String },
    #[error("data provider failure: {0}")]
    DataProvider(String),
    #[error("configuration failure: {0}")]
    Configuration(String),
}

#[derive(Clone, Debug, Error, PartialEq, Eq)]
pub enum InterfaceError {
    #[error("bad request: {message}")]
    BadRequest { message: String, correlation_id: String },
    #[error("not found: {message}")]
    NotFound { message: String, correlation_id: String },
    #[error("service unavailable: {message}")]
    ServiceUnavailable { message: String, correlation_id: String },
    #[error("internal error: {message}")]
    Internal { message: String, correlation_id: String },
}

impl InterfaceError {
    pub fn user_message(&self) -> &'static str {
        match self {
            Self::BadRequest { .. } => {
                "The pricing input was rejected. Check margin, tax and discount values."
            }
            Self::NotFound { .. } => "The requested quote or distribution does not exist.",
            Self::ServiceUnavailable { .. } => {
                "Quote data is temporarily unavailable. Please retry shortly."
            }
            Self::Internal { .. } => "An unexpected internal error occurred.",
        }
    }
}

impl ApplicationError {
    pub fn into_interface(self, correlation_id: impl Into<String>) -> InterfaceError {
        let correlation_id = correlation_id.into();
        let mut mapped = InterfaceError::from(self);
        match &mut mapped {
            InterfaceError::BadRequest { correlation_id: id, .. }
            | InterfaceError::NotFound { correlation_id: id, .. }
            | InterfaceError::ServiceUnavailable { correlation_id: id, .. }
            | InterfaceError::Internal { correlation_id: id, .. } => *id = correlation_id,
        }
        mapped
    }
}

impl From<ApplicationError> for InterfaceError {
    fn from(value: ApplicationError) -> Self {
        let unassigned = || "unassigned".to_owned();
        match value {
            ApplicationError::Calculation(
                error @ (CalculationError::Validation { .. } | CalculationError::Overflow { .. }),
            ) => Self::BadRequest { message: error.to_string(), correlation_id: unassigned() },
            ApplicationError::Calculation(
                error @ (CalculationError::UnsupportedContractType { .. }
                | CalculationError::MissingDistributions { .. }),
            ) => Self::Internal { message: error.to_string(), correlation_id: unassigned() },
            error @ ApplicationError::NotFound { .. } => {
                Self::NotFound { message: error.to_string(), correlation_id: unassigned() }
            }
            ApplicationError::DataProvider(message) => {
                Self::ServiceUnavailable { message, correlation_id: unassigned() }
            }
            ApplicationError::Configuration(message) => {
                Self::Internal { message, correlation_id: unassigned() }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use crate::domain::quote::QuoteId;
    use crate::errors::{ApplicationError, CalculationError, ConstraintViolation, InterfaceError};

    fn validation_error() -> CalculationError {
        CalculationError::Validation {
            entity: "distribution D-1".to_owned(),
            violations: vec![ConstraintViolation::new(
                "custom_discount",
                "discount_out_of_range",
                "custom discount must be within 0..=100",
            )],
        }
    }

    #[test]
    fn validation_error_maps_to_bad_request_interface_error() {
        let interface = ApplicationError::from(validation_error()).into_interface("req-1");

        assert!(matches!(
            interface,
            InterfaceError::BadRequest {
                ref correlation_id,
                ..
            } if correlation_id == "req-1"
        ));
        assert_eq!(
            interface.user_message(),
            "The pricing input was rejected. Check margin, tax and discount values."
        );
    }

    #[test]
    fn validation_error_exposes_its_violations() {
        let error = validation_error();
        assert_eq!(error.violations().len(), 1);
        assert_eq!(error.to_string(), "validation failed for distribution D-1: 1 violation(s)");
    }

    #[test]
    fn unsupported_contract_type_maps_to_internal() {
        let interface = ApplicationError::from(CalculationError::UnsupportedContractType {
            quote_id: QuoteId("Q-9".to_owned()),
        })
        .into_interface("req-2");

        assert!(matches!(
            interface,
            InterfaceError::Internal { ref message, .. } if message.contains("Q-9")
        ));
    }

    #[test]
    fn overflow_maps_to_bad_request_without_violations() {
        let error = CalculationError::Overflow { entity: "quote Q-HUGE".to_owned() };
        assert!(error.violations().is_empty());

        let interface = ApplicationError::from(error).into_interface("req-5");
        assert!(matches!(
            interface,
            InterfaceError::BadRequest { ref message, .. } if message.contains("Q-HUGE")
        ));
    }

    #[test]
    fn missing_entity_maps_to_not_found() {
        let interface =
            ApplicationError::NotFound { entity: "quote", id: "Q-404".to_owned() }
                .into_interface("req-3");

        assert!(matches!(interface, InterfaceError::NotFound { .. }));
        assert_eq!(
            interface.user_message(),
            "The requested quote or distribution does not exist."
        );
    }

    #[test]
    fn provider_error_maps_to_service_unavailable() {
        let interface =
            ApplicationError::DataProvider("snapshot lock poisoned".to_owned())
                .into_interface("req-4");

        assert!(matches!(interface, InterfaceError::ServiceUnavailable { .. }));
    }
}
