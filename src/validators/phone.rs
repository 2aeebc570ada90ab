//! WhatsApp existence check for the contact phone.

use async_trait::async_trait;
use serde_json::{Value, json};
use tracing::warn;

use super::{Notice, ValidationOutcome, Validator, fetch_json};
use crate::fields;
use crate::form::{Field, FormData};

/// Country code prepended to the local number.
const COUNTRY_CODE: &str = "55";

pub struct WhatsAppCheck {
    client: reqwest::Client,
    url: String,
}

impl WhatsAppCheck {
    pub fn new(client: reqwest::Client, url: &str) -> Self {
        Self {
            client,
            url: url.to_string(),
        }
    }
}

/// Whether a phone with this many digits goes to the network at all.
pub fn is_checkable(digit_count: usize) -> bool {
    (10..=11).contains(&digit_count)
}

#[async_trait]
impl Validator for WhatsAppCheck {
    fn name(&self) -> &str {
        "whatsapp_check"
    }

    fn trigger(&self) -> Field {
        Field::Cell
    }

    async fn validate(&self, form: &FormData) -> ValidationOutcome {
        let number = fields::digits(&form.cell);
        if number.is_empty() {
            return ValidationOutcome::unchanged();
        }
        if !is_checkable(number.len()) {
            return ValidationOutcome::invalid();
        }

        let body = json!({ "chat": { "phone": format!("{COUNTRY_CODE}{number}") } });
        match fetch_json(self.client.post(&self.url).json(&body), self.name()).await {
            Ok(body) => interpret(&body),
            Err(e) => {
                warn!(error = %e, "WhatsApp check failed");
                ValidationOutcome::invalid().with_notice(Notice::warning(
                    "Erro na validação",
                    "Não foi possível validar o WhatsApp. Tente novamente.",
                ))
            }
        }
    }
}

/// Only a literal `{"existe": true}` counts as a WhatsApp account.
pub(crate) fn interpret(body: &Value) -> ValidationOutcome {
    if body.get("existe").and_then(|v| v.as_bool()) == Some(true) {
        ValidationOutcome::valid()
    } else {
        ValidationOutcome::invalid().with_notice(Notice::warning(
            "WhatsApp inválido",
            "O número informado não possui WhatsApp. Por favor, verifique.",
        ))
    }
}
