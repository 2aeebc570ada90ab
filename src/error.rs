//! Error types for plan-signup.

use std::time::Duration;

/// Top-level error type.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("Service error: {0}")]
    Service(#[from] ServiceError),

    #[error("Wizard error: {0}")]
    Wizard(#[from] WizardError),

    #[error("Submission error: {0}")]
    Submit(#[from] SubmitError),
}

/// Configuration-related errors.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Invalid configuration value for {key}: {message}")]
    InvalidValue { key: String, message: String },

    #[error("Failed to parse configuration: {0}")]
    ParseError(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Failures talking to an external validation or webhook service.
///
/// These never reach the visitor directly: validators fold them into an
/// advisory outcome and the submission flow maps them to
/// [`SubmitError::Connectivity`].
#[derive(Debug, thiserror::Error)]
pub enum ServiceError {
    #[error("{service} request failed: {reason}")]
    RequestFailed { service: String, reason: String },

    #[error("Invalid response from {service}: {reason}")]
    InvalidResponse { service: String, reason: String },

    #[error("Invalid URL for {service}: {reason}")]
    InvalidUrl { service: String, reason: String },

    #[error("Failed to build HTTP client: {0}")]
    Client(String),
}

/// Events the wizard refuses to apply.
#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum WizardError {
    #[error("Unknown plan: {0}")]
    UnknownPlan(String),

    #[error("Plan {0} cannot be activated on an eSIM")]
    PlanNotEsimCapable(String),

    #[error("Shipping method {method} is not offered for this chip type")]
    ShippingUnavailable { method: String },

    #[error("Field {0} is read-only")]
    ReadOnlyField(String),

    #[error("Field {0} has no validator")]
    NoValidator(String),

    #[error("Step {0} is incomplete")]
    StepIncomplete(String),

    #[error("A submission is already in progress")]
    SubmissionInProgress,

    #[error("Form session already finished")]
    Finished,
}

/// Reasons a submission ends in the error display.
///
/// `Display` renders the message shown to the visitor.
#[derive(Debug, Clone, thiserror::Error, PartialEq, Eq)]
pub enum SubmitError {
    #[error("CPF inválido! Por favor, verifique o CPF informado.")]
    InvalidTaxId,

    #[error("CEP inválido! Por favor, verifique o CEP informado e corrija antes de continuar.")]
    InvalidPostalCode,

    #[error("Por favor, selecione um plano antes de continuar.")]
    MissingPlan,

    #[error("Por favor, selecione a forma de envio antes de continuar.")]
    MissingShipping,

    #[error("Representante não encontrado. Favor verificar.")]
    UnknownReferrer { referrer_id: String },

    #[error("Tempo limite excedido. O servidor está demorando para responder. Tente novamente.")]
    Timeout { after: Duration },

    #[error("Não foi possível completar o cadastro. Verifique sua conexão e tente novamente.")]
    Connectivity { reason: String },

    #[error("{message}")]
    Rejected { message: String, status: u16 },
}

impl SubmitError {
    /// Whether the submission was stopped before anything left the process.
    pub fn is_local(&self) -> bool {
        matches!(
            self,
            Self::InvalidTaxId
                | Self::InvalidPostalCode
                | Self::MissingPlan
                | Self::MissingShipping
                | Self::UnknownReferrer { .. }
        )
    }
}

/// Result type alias.
pub type Result<T> = std::result::Result<T, Error>;
