//! Coupon code check. Advisory only; coupons never gate the wizard.

use async_trait::async_trait;
use serde_json::Value;
use tracing::warn;

use super::{Notice, ValidationOutcome, Validator, fetch_json, join_segment, non_empty_str};
use crate::form::{Field, FormData};

pub struct CouponCheck {
    client: reqwest::Client,
    base_url: String,
}

impl CouponCheck {
    pub fn new(client: reqwest::Client, base_url: &str) -> Self {
        Self {
            client,
            base_url: base_url.to_string(),
        }
    }
}

#[async_trait]
impl Validator for CouponCheck {
    fn name(&self) -> &str {
        "coupon_check"
    }

    fn trigger(&self) -> Field {
        Field::Coupon
    }

    async fn validate(&self, form: &FormData) -> ValidationOutcome {
        if form.coupon.is_empty() {
            return ValidationOutcome::unchanged();
        }
        let result = match join_segment(&self.base_url, &form.coupon, self.name()) {
            Ok(url) => fetch_json(self.client.get(url), self.name()).await,
            Err(e) => Err(e),
        };
        match result {
            Ok(body) => interpret(&body),
            Err(e) => {
                warn!(error = %e, "Coupon check failed");
                ValidationOutcome::unchanged()
            }
        }
    }
}

pub(crate) fn interpret(body: &Value) -> ValidationOutcome {
    let msg = non_empty_str(body, "msg");
    match body.get("status").and_then(|s| s.as_str()) {
        Some("success") => ValidationOutcome::valid().with_notice(Notice::info(
            "Cupom válido!",
            msg.unwrap_or("Cupom aplicado com sucesso."),
        )),
        Some("error") => ValidationOutcome::invalid().with_notice(Notice::warning(
            "Cupom inválido",
            msg.unwrap_or("Verifique o código do cupom."),
        )),
        _ => ValidationOutcome::unchanged(),
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;
    use crate::validators::Verdict;

    #[test]
    fn success_and_error_messages() {
        let ok = interpret(&json!({"status": "success", "msg": "10% off"}));
        assert_eq!(ok.verdict, Verdict::Valid);
        assert_eq!(ok.notice.unwrap().description, "10% off");

        let bad = interpret(&json!({"status": "error"}));
        assert_eq!(bad.verdict, Verdict::Invalid);
        assert_eq!(bad.notice.unwrap().description, "Verifique o código do cupom.");
    }

    #[tokio::test]
    async fn empty_coupon_is_skipped() {
        let check = CouponCheck::new(reqwest::Client::new(), "http://127.0.0.1:9/coupon");
        assert_eq!(
            check.validate(&FormData::default()).await,
            ValidationOutcome::unchanged()
        );
    }
}
