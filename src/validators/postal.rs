//! Postal code (CEP) lookup with address autofill.

use async_trait::async_trait;
use serde_json::Value;
use tracing::warn;

use super::{ValidationOutcome, Validator, fetch_json, is_truthy, join_segment};
use crate::fields;
use crate::form::{Field, FormData};

pub struct PostalCodeLookup {
    client: reqwest::Client,
    base_url: String,
}

impl PostalCodeLookup {
    pub fn new(client: reqwest::Client, base_url: &str) -> Self {
        Self {
            client,
            base_url: base_url.to_string(),
        }
    }

    async fn lookup(&self, cep: &str) -> Result<Value, crate::error::ServiceError> {
        let mut url = join_segment(&self.base_url, cep, self.name())?;
        // ViaCEP wants `/{cep}/json/`
        if let Ok(mut segments) = url.path_segments_mut() {
            segments.push("json").push("");
        }
        fetch_json(self.client.get(url), self.name()).await
    }
}

#[async_trait]
impl Validator for PostalCodeLookup {
    fn name(&self) -> &str {
        "postal_code"
    }

    fn trigger(&self) -> Field {
        Field::Cep
    }

    async fn validate(&self, form: &FormData) -> ValidationOutcome {
        let cep = fields::digits(&form.cep);
        if cep.len() != 8 {
            return ValidationOutcome::unknown();
        }
        match self.lookup(&cep).await {
            Ok(body) => interpret(&body),
            Err(e) => {
                warn!(error = %e, cep = %cep, "Postal code lookup failed");
                ValidationOutcome::invalid()
            }
        }
    }
}

/// A truthy `erro` marks a miss; otherwise the address fields are filled.
pub(crate) fn interpret(body: &Value) -> ValidationOutcome {
    if is_truthy(body.get("erro")) {
        return ValidationOutcome::invalid();
    }
    let text = |key: &str| {
        body.get(key)
            .and_then(|v| v.as_str())
            .unwrap_or_default()
            .to_string()
    };
    ValidationOutcome::valid()
        .with_autofill(Field::Street, text("logradouro"))
        .with_autofill(Field::District, text("bairro"))
        .with_autofill(Field::City, text("localidade"))
        .with_autofill(Field::State, text("uf"))
}
