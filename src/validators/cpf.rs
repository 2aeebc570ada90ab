//! CPF + birth date identity lookup.
//!
//! Runs when the visitor leaves the birth date field. A match fills in the
//! registered name and locks it; anything else is only a warning.

use async_trait::async_trait;
use secrecy::{ExposeSecret, SecretString};
use serde_json::Value;
use tracing::warn;

use super::{Notice, ValidationOutcome, Validator, fetch_json, is_truthy};
use crate::fields;
use crate::form::{Field, FormData};

pub struct CpfLookup {
    client: reqwest::Client,
    url: String,
    token: SecretString,
}

impl CpfLookup {
    pub fn new(client: reqwest::Client, url: &str, token: SecretString) -> Self {
        Self {
            client,
            url: url.to_string(),
            token,
        }
    }
}

#[async_trait]
impl Validator for CpfLookup {
    fn name(&self) -> &str {
        "cpf_lookup"
    }

    fn trigger(&self) -> Field {
        Field::Birth
    }

    async fn validate(&self, form: &FormData) -> ValidationOutcome {
        let cpf = fields::digits(&form.cpf);
        let Some(birth) = fields::birth_for_lookup(&form.birth) else {
            return ValidationOutcome::unchanged();
        };
        if cpf.len() != 11 {
            return ValidationOutcome::unchanged();
        }

        let request = self.client.get(&self.url).query(&[
            ("numeroDeCpf", cpf.as_str()),
            ("dataNascimento", birth.as_str()),
            ("token", self.token.expose_secret()),
        ]);
        match fetch_json(request, self.name()).await {
            Ok(body) => interpret(&body),
            Err(e) => {
                warn!(error = %e, "CPF lookup failed");
                ValidationOutcome::unchanged()
            }
        }
    }
}

/// `{"data": {"id": ..., "nome_da_pf": ...}}` on a match.
pub(crate) fn interpret(body: &Value) -> ValidationOutcome {
    let record = body.get("data").filter(|d| is_truthy(Some(*d)));
    match record {
        Some(record) if is_truthy(record.get("id")) => {
            let name = record
                .get("nome_da_pf")
                .and_then(|v| v.as_str())
                .unwrap_or_default();
            ValidationOutcome::valid()
                .with_autofill(Field::Name, name)
                .with_notice(Notice::info(
                    "CPF validado!",
                    "Dados preenchidos automaticamente.",
                ))
        }
        _ => ValidationOutcome::unchanged().with_notice(Notice::warning(
            "CPF não encontrado",
            "Verifique o CPF e data de nascimento.",
        )),
    }
}
