//! Final submission: local re-checks, payload assembly and webhook dispatch.
//!
//! The flow never retries. Local failures abort before any network call;
//! webhook replies are classified by status and by the wording of the
//! message they carry.

use std::collections::HashMap;
use std::sync::{Arc, LazyLock};
use std::time::Duration;

use async_trait::async_trait;
use regex::Regex;
use serde::Serialize;
use serde_json::Value;
use tracing::{info, warn};

use crate::catalog::{ChipType, PlanCatalog};
use crate::config::FormConfig;
use crate::error::{ServiceError, SubmitError};
use crate::fields;
use crate::form::{Check, FieldFlags, FormData};
use crate::validators::is_truthy;

pub const DEFAULT_SUCCESS_MESSAGE: &str = "Cadastro realizado com sucesso!";
pub const DEFAULT_FAILURE_MESSAGE: &str = "Erro ao processar cadastro. Tente novamente.";

/// Reply fields that may carry the webhook's message, in priority order.
const MESSAGE_KEYS: [&str; 3] = ["message", "msg", "mensagem"];

/// Wording that marks a webhook message as a rejection.
const NEGATIVE_MARKERS: [&str; 6] = ["erro", "já", "inválido", "falha", "não", "sendo utilizado"];

static NEGATIVE_PATTERN: LazyLock<Regex> = LazyLock::new(|| {
    let alternatives: Vec<String> = NEGATIVE_MARKERS.iter().map(|m| regex::escape(m)).collect();
    Regex::new(&format!("(?i){}", alternatives.join("|")))
        .expect("negative markers are literal alternatives")
});

/// Body posted to the referrer's webhook. Keys are the ones the CRM expects.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SubmissionPayload {
    #[serde(rename = "nome")]
    pub name: String,
    pub cpf: String,
    #[serde(rename = "data_nascimento")]
    pub birth: String,
    pub email: String,
    pub whatsapp: String,
    #[serde(rename = "telefone_fixo")]
    pub landline: String,
    #[serde(rename = "plano")]
    pub plan: String,
    pub plan_id: String,
    #[serde(rename = "tipo_chip")]
    pub chip_type: String,
    #[serde(rename = "forma_envio")]
    pub shipping: String,
    pub cep: String,
    #[serde(rename = "endereco")]
    pub street: String,
    #[serde(rename = "numero")]
    pub number: String,
    #[serde(rename = "complemento")]
    pub complement: String,
    #[serde(rename = "bairro")]
    pub district: String,
    #[serde(rename = "cidade")]
    pub city: String,
    #[serde(rename = "estado")]
    pub state: String,
    pub referral_id: String,
}

impl SubmissionPayload {
    /// Flatten the form, resolving plan and shipping labels.
    pub fn build(form: &FormData, catalog: &PlanCatalog, referral_id: &str) -> Self {
        let plan_id = form.plan_id.clone().unwrap_or_default();
        Self {
            name: form.name.clone(),
            cpf: form.cpf.clone(),
            birth: form.birth.clone(),
            email: form.email.clone(),
            whatsapp: form.cell.clone(),
            landline: String::new(),
            plan: catalog.plan_label(&plan_id),
            plan_id,
            chip_type: form.chip_type.unwrap_or(ChipType::ESim).label().to_string(),
            shipping: form
                .shipping
                .map(|m| m.label().to_string())
                .unwrap_or_default(),
            cep: form.cep.clone(),
            street: form.street.clone(),
            number: form.number.clone(),
            complement: form.complement.clone(),
            district: form.district.clone(),
            city: form.city.clone(),
            state: form.state.clone(),
            referral_id: referral_id.to_string(),
        }
    }
}

/// Raw webhook reply.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WebhookReply {
    pub status: u16,
    pub body: String,
}

impl WebhookReply {
    pub fn new(status: u16, body: impl Into<String>) -> Self {
        Self {
            status,
            body: body.into(),
        }
    }

    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }
}

/// Delivers a payload to a webhook URL.
#[async_trait]
pub trait WebhookTransport: Send + Sync {
    async fn post(
        &self,
        url: &str,
        payload: &SubmissionPayload,
    ) -> Result<WebhookReply, ServiceError>;
}

/// Default transport over reqwest. The deadline is enforced by [`Submitter`].
pub struct ReqwestTransport {
    client: reqwest::Client,
}

impl ReqwestTransport {
    pub fn new(client: reqwest::Client) -> Self {
        Self { client }
    }
}

#[async_trait]
impl WebhookTransport for ReqwestTransport {
    async fn post(
        &self,
        url: &str,
        payload: &SubmissionPayload,
    ) -> Result<WebhookReply, ServiceError> {
        let response = self
            .client
            .post(url)
            .json(payload)
            .send()
            .await
            .map_err(|e| ServiceError::RequestFailed {
                service: "webhook".into(),
                reason: e.to_string(),
            })?;
        let status = response.status().as_u16();
        let body = response
            .text()
            .await
            .map_err(|e| ServiceError::InvalidResponse {
                service: "webhook".into(),
                reason: e.to_string(),
            })?;
        Ok(WebhookReply { status, body })
    }
}

/// Re-check what must hold before anything is sent.
pub fn precheck(form: &FormData, flags: &FieldFlags) -> Result<(), SubmitError> {
    if !fields::is_valid_cpf(&form.cpf) {
        return Err(SubmitError::InvalidTaxId);
    }
    if flags.postal_code == Check::Invalid {
        return Err(SubmitError::InvalidPostalCode);
    }
    if form.plan_id.as_deref().is_none_or(str::is_empty) {
        return Err(SubmitError::MissingPlan);
    }
    if form.shipping.is_none() {
        return Err(SubmitError::MissingShipping);
    }
    Ok(())
}

/// Pull the message out of a reply body.
///
/// JSON bodies yield the first truthy value among [`MESSAGE_KEYS`], which
/// must be a string; anything that is not JSON is used as trimmed text.
pub fn extract_message(body: &str) -> Result<String, SubmitError> {
    let Ok(value) = serde_json::from_str::<Value>(body) else {
        return Ok(body.trim().to_string());
    };
    let Some(found) = MESSAGE_KEYS
        .iter()
        .map(|key| value.get(key))
        .find(|v| is_truthy(*v))
        .flatten()
    else {
        return Ok(String::new());
    };
    match found.as_str() {
        Some(message) => Ok(message.to_string()),
        None => Err(SubmitError::Connectivity {
            reason: format!("webhook message is not text: {found}"),
        }),
    }
}

pub fn looks_negative(message: &str) -> bool {
    NEGATIVE_PATTERN.is_match(message)
}

/// Map a webhook reply to the visitor-facing result.
pub fn classify(reply: &WebhookReply) -> Result<String, SubmitError> {
    let message = extract_message(&reply.body)?;
    if message.is_empty() {
        return if reply.is_success() {
            Ok(DEFAULT_SUCCESS_MESSAGE.to_string())
        } else {
            Err(SubmitError::Rejected {
                message: DEFAULT_FAILURE_MESSAGE.to_string(),
                status: reply.status,
            })
        };
    }
    if !reply.is_success() || looks_negative(&message) {
        return Err(SubmitError::Rejected {
            message,
            status: reply.status,
        });
    }
    Ok(message)
}

/// Sends completed forms to the referrer's webhook.
pub struct Submitter {
    transport: Arc<dyn WebhookTransport>,
    catalog: Arc<PlanCatalog>,
    webhooks: HashMap<String, String>,
    timeout: Duration,
}

impl Submitter {
    pub fn new(
        transport: Arc<dyn WebhookTransport>,
        catalog: Arc<PlanCatalog>,
        webhooks: HashMap<String, String>,
        timeout: Duration,
    ) -> Self {
        Self {
            transport,
            catalog,
            webhooks,
            timeout,
        }
    }

    pub fn from_config(config: &FormConfig, catalog: Arc<PlanCatalog>) -> Result<Self, ServiceError> {
        let client = reqwest::Client::builder()
            .build()
            .map_err(|e| ServiceError::Client(e.to_string()))?;
        Ok(Self::new(
            Arc::new(ReqwestTransport::new(client)),
            catalog,
            config.webhooks.clone(),
            config.submit_timeout,
        ))
    }

    pub fn endpoint_for(&self, referrer_id: &str) -> Option<&str> {
        self.webhooks.get(referrer_id).map(String::as_str)
    }

    /// Run the whole submission. `Ok` carries the success message.
    pub async fn submit(
        &self,
        form: &FormData,
        flags: &FieldFlags,
        referrer_id: &str,
    ) -> Result<String, SubmitError> {
        precheck(form, flags)?;

        let payload = SubmissionPayload::build(form, &self.catalog, referrer_id);
        let Some(url) = self.endpoint_for(referrer_id) else {
            warn!(referral_id = %referrer_id, "No webhook configured for referrer");
            return Err(SubmitError::UnknownReferrer {
                referrer_id: referrer_id.to_string(),
            });
        };

        info!(referral_id = %referrer_id, plan = %payload.plan, "Dispatching signup");
        let reply = match tokio::time::timeout(self.timeout, self.transport.post(url, &payload)).await
        {
            Err(_) => {
                warn!(referral_id = %referrer_id, timeout = ?self.timeout, "Signup webhook timed out");
                return Err(SubmitError::Timeout {
                    after: self.timeout,
                });
            }
            Ok(Err(e)) => {
                warn!(referral_id = %referrer_id, error = %e, "Signup webhook failed");
                return Err(SubmitError::Connectivity {
                    reason: e.to_string(),
                });
            }
            Ok(Ok(reply)) => reply,
        };

        let result = classify(&reply);
        match &result {
            Ok(message) => info!(status = reply.status, message = %message, "Signup accepted"),
            Err(e) => info!(status = reply.status, message = %e, "Signup rejected"),
        }
        result
    }
}
