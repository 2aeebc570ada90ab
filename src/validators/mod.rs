//! Blur-triggered validators backed by external services.
//!
//! Every validator implements [`Validator`]: it reads the current form,
//! performs at most one round trip, and returns a [`ValidationOutcome`].
//! Validators never fail. Transport and parse errors are logged and folded
//! into whatever outcome the field's contract prescribes, so a validator can
//! only ever produce advisory flags and notices.

pub mod coupon;
pub mod cpf;
pub mod email;
pub mod phone;
pub mod postal;

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use serde::Serialize;
use serde_json::Value;

use crate::config::FormConfig;
use crate::error::ServiceError;
use crate::form::{Field, FormData};

pub use coupon::CouponCheck;
pub use cpf::CpfLookup;
pub use email::EmailCheck;
pub use phone::WhatsAppCheck;
pub use postal::PostalCodeLookup;

/// What a validator concluded about its field.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Verdict {
    Valid,
    Invalid,
    /// Not checkable yet; clears a previous verdict.
    Unknown,
    /// Leave the field's flag as it is.
    Unchanged,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Severity {
    Info,
    Warning,
}

/// A short message for the visitor (rendered as a toast by front ends).
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Notice {
    pub title: String,
    pub description: String,
    pub severity: Severity,
}

impl Notice {
    pub fn info(title: &str, description: &str) -> Self {
        Self {
            title: title.to_string(),
            description: description.to_string(),
            severity: Severity::Info,
        }
    }

    pub fn warning(title: &str, description: &str) -> Self {
        Self {
            title: title.to_string(),
            description: description.to_string(),
            severity: Severity::Warning,
        }
    }
}

/// Result of one validation round trip.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ValidationOutcome {
    pub verdict: Verdict,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub notice: Option<Notice>,
    /// Values to write into other fields (e.g. address from a postal code).
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub autofill: Vec<(Field, String)>,
}

impl ValidationOutcome {
    pub fn new(verdict: Verdict) -> Self {
        Self {
            verdict,
            notice: None,
            autofill: Vec::new(),
        }
    }

    pub fn valid() -> Self {
        Self::new(Verdict::Valid)
    }

    pub fn invalid() -> Self {
        Self::new(Verdict::Invalid)
    }

    pub fn unknown() -> Self {
        Self::new(Verdict::Unknown)
    }

    pub fn unchanged() -> Self {
        Self::new(Verdict::Unchanged)
    }

    pub fn with_notice(mut self, notice: Notice) -> Self {
        self.notice = Some(notice);
        self
    }

    pub fn with_autofill(mut self, field: Field, value: impl Into<String>) -> Self {
        self.autofill.push((field, value.into()));
        self
    }
}

/// A field check run when the visitor leaves `trigger()`.
#[async_trait]
pub trait Validator: Send + Sync {
    /// Name used in logs.
    fn name(&self) -> &str;

    /// Field whose blur fires this validator.
    fn trigger(&self) -> Field;

    async fn validate(&self, form: &FormData) -> ValidationOutcome;
}

/// Validators keyed by their trigger field.
#[derive(Default)]
pub struct ValidatorSet {
    validators: HashMap<Field, Arc<dyn Validator>>,
}

impl ValidatorSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// The five service-backed validators, sharing one HTTP client.
    pub fn standard(config: &FormConfig) -> Result<Self, ServiceError> {
        let client = http_client(config)?;
        let services = &config.services;
        let mut set = Self::new();
        set.register(Arc::new(CpfLookup::new(
            client.clone(),
            &services.cpf_search,
            config.cpf_token.clone(),
        )));
        set.register(Arc::new(PostalCodeLookup::new(
            client.clone(),
            &services.postal_code,
        )));
        set.register(Arc::new(EmailCheck::new(client.clone(), &services.email_check)));
        set.register(Arc::new(WhatsAppCheck::new(
            client.clone(),
            &services.whatsapp_check,
        )));
        set.register(Arc::new(CouponCheck::new(client, &services.coupon_check)));
        Ok(set)
    }

    /// Register a validator, replacing any other with the same trigger.
    pub fn register(&mut self, validator: Arc<dyn Validator>) {
        tracing::debug!(
            validator = validator.name(),
            field = %validator.trigger(),
            "Registered validator"
        );
        self.validators.insert(validator.trigger(), validator);
    }

    pub fn for_field(&self, field: Field) -> Option<Arc<dyn Validator>> {
        self.validators.get(&field).cloned()
    }

    pub fn count(&self) -> usize {
        self.validators.len()
    }
}

/// HTTP client shared by the validators.
pub fn http_client(config: &FormConfig) -> Result<reqwest::Client, ServiceError> {
    reqwest::Client::builder()
        .timeout(config.service_timeout)
        .build()
        .map_err(|e| ServiceError::Client(e.to_string()))
}

/// Send a request and decode its body as JSON, whatever the status.
pub(crate) async fn fetch_json(
    request: reqwest::RequestBuilder,
    service: &str,
) -> Result<Value, ServiceError> {
    let response = request.send().await.map_err(|e| ServiceError::RequestFailed {
        service: service.to_string(),
        reason: e.to_string(),
    })?;
    response
        .json::<Value>()
        .await
        .map_err(|e| ServiceError::InvalidResponse {
            service: service.to_string(),
            reason: e.to_string(),
        })
}

/// `{base}/{segment}` with the segment percent-encoded.
pub(crate) fn join_segment(
    base: &str,
    segment: &str,
    service: &str,
) -> Result<reqwest::Url, ServiceError> {
    let invalid = |reason: String| ServiceError::InvalidUrl {
        service: service.to_string(),
        reason,
    };
    let mut url = reqwest::Url::parse(base).map_err(|e| invalid(e.to_string()))?;
    url.path_segments_mut()
        .map_err(|_| invalid(format!("{base} cannot be a base URL")))?
        .pop_if_empty()
        .push(segment);
    Ok(url)
}

/// Loose truthiness of a JSON value: `null`, `false`, `0` and `""` are false.
pub(crate) fn is_truthy(value: Option<&Value>) -> bool {
    match value {
        None | Some(Value::Null) => false,
        Some(Value::Bool(b)) => *b,
        Some(Value::Number(n)) => n.as_f64().is_some_and(|f| f != 0.0),
        Some(Value::String(s)) => !s.is_empty(),
        Some(Value::Array(_)) | Some(Value::Object(_)) => true,
    }
}

/// Non-empty string at `key`.
pub(crate) fn non_empty_str<'a>(body: &'a Value, key: &str) -> Option<&'a str> {
    body.get(key)
        .and_then(|v| v.as_str())
        .filter(|s| !s.is_empty())
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    struct FixedValidator {
        field: Field,
    }

    #[async_trait]
    impl Validator for FixedValidator {
        fn name(&self) -> &str {
            "fixed"
        }
        fn trigger(&self) -> Field {
            self.field
        }
        async fn validate(&self, _form: &FormData) -> ValidationOutcome {
            ValidationOutcome::valid()
        }
    }

    #[test]
    fn standard_set_covers_blur_fields() {
        let set = ValidatorSet::standard(&FormConfig::default()).unwrap();
        assert_eq!(set.count(), 5);
        for field in [Field::Birth, Field::Cep, Field::Email, Field::Cell, Field::Coupon] {
            assert!(set.for_field(field).is_some(), "missing validator for {field}");
        }
        assert!(set.for_field(Field::Street).is_none());
    }

    #[tokio::test]
    async fn register_replaces_same_trigger() {
        let mut set = ValidatorSet::new();
        set.register(Arc::new(FixedValidator { field: Field::Cep }));
        set.register(Arc::new(FixedValidator { field: Field::Cep }));
        assert_eq!(set.count(), 1);
        let validator = set.for_field(Field::Cep).unwrap();
        let outcome = validator.validate(&FormData::default()).await;
        assert_eq!(outcome.verdict, Verdict::Valid);
    }

    #[test]
    fn truthiness_follows_loose_rules() {
        assert!(!is_truthy(None));
        assert!(!is_truthy(Some(&json!(null))));
        assert!(!is_truthy(Some(&json!(false))));
        assert!(!is_truthy(Some(&json!(0))));
        assert!(!is_truthy(Some(&json!(""))));
        assert!(is_truthy(Some(&json!(true))));
        assert!(is_truthy(Some(&json!("true"))));
        assert!(is_truthy(Some(&json!(42))));
        assert!(is_truthy(Some(&json!({}))));
    }

    #[test]
    fn join_segment_encodes_and_handles_trailing_slash() {
        let url = join_segment("https://example.com/getEmail", "a b@x.com", "email").unwrap();
        assert_eq!(url.as_str(), "https://example.com/getEmail/a%20b@x.com");

        let url = join_segment("https://example.com/getEmail/", "x", "email").unwrap();
        assert_eq!(url.as_str(), "https://example.com/getEmail/x");

        assert!(join_segment("not a url", "x", "email").is_err());
    }

    #[test]
    fn outcome_builders_chain() {
        let outcome = ValidationOutcome::valid()
            .with_notice(Notice::info("ok", "fine"))
            .with_autofill(Field::City, "São Paulo");
        assert_eq!(outcome.verdict, Verdict::Valid);
        assert_eq!(outcome.notice.unwrap().severity, Severity::Info);
        assert_eq!(outcome.autofill, vec![(Field::City, "São Paulo".to_string())]);
    }
}
