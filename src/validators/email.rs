//! E-mail uniqueness check. No local syntax validation is done.

use async_trait::async_trait;
use serde_json::Value;
use tracing::warn;

use super::{Notice, ValidationOutcome, Validator, fetch_json, join_segment, non_empty_str};
use crate::form::{Field, FormData};

pub struct EmailCheck {
    client: reqwest::Client,
    base_url: String,
}

impl EmailCheck {
    pub fn new(client: reqwest::Client, base_url: &str) -> Self {
        Self {
            client,
            base_url: base_url.to_string(),
        }
    }
}

#[async_trait]
impl Validator for EmailCheck {
    fn name(&self) -> &str {
        "email_check"
    }

    fn trigger(&self) -> Field {
        Field::Email
    }

    async fn validate(&self, form: &FormData) -> ValidationOutcome {
        if form.email.is_empty() {
            return ValidationOutcome::unchanged();
        }
        let result = match join_segment(&self.base_url, &form.email, self.name()) {
            Ok(url) => fetch_json(self.client.get(url), self.name()).await,
            Err(e) => Err(e),
        };
        match result {
            Ok(body) => interpret(&body),
            Err(e) => {
                warn!(error = %e, "E-mail check failed");
                ValidationOutcome::unchanged()
            }
        }
    }
}

/// `{"status": "success" | "error", "msg"?: ...}`
pub(crate) fn interpret(body: &Value) -> ValidationOutcome {
    match body.get("status").and_then(|s| s.as_str()) {
        Some("success") => ValidationOutcome::valid()
            .with_notice(Notice::info("Email validado!", "Email confirmado com sucesso.")),
        Some("error") => {
            let msg = non_empty_str(body, "msg").unwrap_or("Email já cadastrado ou inválido.");
            ValidationOutcome::unchanged().with_notice(Notice::warning("Erro", msg))
        }
        _ => ValidationOutcome::unchanged(),
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;
    use crate::validators::{Severity, Verdict};

    #[test]
    fn success_marks_verified() {
        let outcome = interpret(&json!({"status": "success"}));
        assert_eq!(outcome.verdict, Verdict::Valid);
        assert_eq!(outcome.notice.unwrap().severity, Severity::Info);
    }

    #[test]
    fn error_surfaces_server_message() {
        let outcome = interpret(&json!({"status": "error", "msg": "E-mail já utilizado"}));
        assert_eq!(outcome.verdict, Verdict::Unchanged);
        let notice = outcome.notice.unwrap();
        assert_eq!(notice.description, "E-mail já utilizado");
        assert_eq!(notice.severity, Severity::Warning);
    }

    #[test]
    fn error_without_message_uses_fallback() {
        let outcome = interpret(&json!({"status": "error", "msg": ""}));
        assert_eq!(
            outcome.notice.unwrap().description,
            "Email já cadastrado ou inválido."
        );
    }

    #[test]
    fn unknown_status_is_silent() {
        let outcome = interpret(&json!({"status": "pending"}));
        assert_eq!(outcome, ValidationOutcome::unchanged());
    }

    #[tokio::test]
    async fn empty_email_is_skipped() {
        let check = EmailCheck::new(reqwest::Client::new(), "http://127.0.0.1:9/getEmail");
        let outcome = check.validate(&FormData::default()).await;
        assert_eq!(outcome, ValidationOutcome::unchanged());
    }
}
