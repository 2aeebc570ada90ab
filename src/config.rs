//! Configuration types.

use std::collections::HashMap;
use std::time::Duration;

use secrecy::SecretString;

use crate::error::ConfigError;
use crate::referrers::{self, Referrer};

/// Timeout applied to the submission webhook.
pub const DEFAULT_SUBMIT_TIMEOUT: Duration = Duration::from_secs(20);

/// External validation services.
#[derive(Debug, Clone)]
pub struct ServiceEndpoints {
    /// CPF + birth date lookup (query string request).
    pub cpf_search: String,
    /// ViaCEP-style lookup, `{base}/{cep}/json/`.
    pub postal_code: String,
    /// `{base}/{email}`
    pub email_check: String,
    /// `{base}/{coupon}`
    pub coupon_check: String,
    /// WhatsApp existence webhook (POST).
    pub whatsapp_check: String,
}

impl Default for ServiceEndpoints {
    fn default() -> Self {
        Self {
            cpf_search: "https://apicpf.whatsgps.com.br/api/cpf/search".to_string(),
            postal_code: "https://viacep.com.br/ws".to_string(),
            email_check: "https://federalassociados.com.br/getEmail".to_string(),
            coupon_check: "https://federalassociados.com.br/getValidateCoupon".to_string(),
            whatsapp_check: "https://webhook.fiqon.app/webhook/019b97c2-6aed-7162-8a3a-1fd63694ecd6/5fb591d0-1499-4928-9b9f-198abec46afe".to_string(),
        }
    }
}

/// Signup form configuration.
#[derive(Debug, Clone)]
pub struct FormConfig {
    /// HTTP listen port.
    pub port: u16,
    /// Sponsor credited when the visitor has no referrer link.
    pub default_referrer: Referrer,
    /// Referrers reachable through `/{id}` links.
    pub referrers: HashMap<String, Referrer>,
    /// Submission endpoint per referrer id.
    pub webhooks: HashMap<String, String>,
    pub services: ServiceEndpoints,
    /// Bearer token for the CPF lookup service.
    pub cpf_token: SecretString,
    pub submit_timeout: Duration,
    /// Per-request timeout for the validation services.
    pub service_timeout: Duration,
    /// Media fetched once per new session to warm caches.
    pub warmup_media_url: Option<String>,
    /// Sessions older than this are dropped from memory.
    pub session_ttl: Duration,
}

impl Default for FormConfig {
    fn default() -> Self {
        Self {
            port: 8080,
            default_referrer: referrers::default_referrer(),
            referrers: referrers::builtin_referrers(),
            webhooks: referrers::builtin_webhooks(),
            services: ServiceEndpoints::default(),
            cpf_token: SecretString::from(
                "2|VL3z6OcyARWRoaEniPyoHJpPtxWcD99NN2oueGGn4acc0395".to_string(),
            ),
            submit_timeout: DEFAULT_SUBMIT_TIMEOUT,
            service_timeout: Duration::from_secs(15),
            warmup_media_url: Some(
                "https://myehbxfidszreorsaexi.supabase.co/storage/v1/object/public/adesao/adesao.mp4"
                    .to_string(),
            ),
            session_ttl: Duration::from_secs(2 * 60 * 60),
        }
    }
}

impl FormConfig {
    /// Build config from environment variables layered over the defaults.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build config from an arbitrary variable source.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut config = Self::default();

        if let Some(port) = lookup("PLAN_SIGNUP_PORT") {
            config.port = port.parse().map_err(|_| ConfigError::InvalidValue {
                key: "PLAN_SIGNUP_PORT".to_string(),
                message: format!("'{port}' is not a valid port"),
            })?;
        }

        if let Some(token) = lookup("PLAN_SIGNUP_CPF_TOKEN") {
            config.cpf_token = SecretString::from(token);
        }

        if let Some(secs) = lookup("PLAN_SIGNUP_SUBMIT_TIMEOUT_SECS") {
            let secs: u64 = secs.parse().map_err(|_| ConfigError::InvalidValue {
                key: "PLAN_SIGNUP_SUBMIT_TIMEOUT_SECS".to_string(),
                message: format!("'{secs}' is not a number of seconds"),
            })?;
            if secs == 0 {
                return Err(ConfigError::InvalidValue {
                    key: "PLAN_SIGNUP_SUBMIT_TIMEOUT_SECS".to_string(),
                    message: "must be greater than zero".to_string(),
                });
            }
            config.submit_timeout = Duration::from_secs(secs);
        }

        if let Some(id) = lookup("PLAN_SIGNUP_DEFAULT_REFERRER") {
            let id = id.trim().to_string();
            config.default_referrer = config
                .referrers
                .get(&id)
                .cloned()
                .unwrap_or_else(|| Referrer::new(&id, "", ""));
        }

        if let Some(path) = lookup("PLAN_SIGNUP_WEBHOOKS_FILE") {
            let raw = std::fs::read_to_string(&path)?;
            let extra = parse_webhooks(&raw)?;
            tracing::info!(path = %path, count = extra.len(), "Loaded webhook overrides");
            config.webhooks.extend(extra);
        }

        if let Some(mins) = lookup("PLAN_SIGNUP_SESSION_TTL_MINS") {
            let mins: u64 = mins.parse().map_err(|_| ConfigError::InvalidValue {
                key: "PLAN_SIGNUP_SESSION_TTL_MINS".to_string(),
                message: format!("'{mins}' is not a number of minutes"),
            })?;
            config.session_ttl = Duration::from_secs(mins * 60);
        }

        if let Some(url) = lookup("PLAN_SIGNUP_WARMUP_URL") {
            config.warmup_media_url = if url.trim().is_empty() {
                None
            } else {
                Some(url)
            };
        }

        Ok(config)
    }
}

/// Parse a JSON object of `referrer id -> webhook URL`.
pub fn parse_webhooks(raw: &str) -> Result<HashMap<String, String>, ConfigError> {
    let map: HashMap<String, String> =
        serde_json::from_str(raw).map_err(|e| ConfigError::ParseError(e.to_string()))?;
    for (id, url) in &map {
        if !url.starts_with("http://") && !url.starts_with("https://") {
            return Err(ConfigError::InvalidValue {
                key: format!("webhooks.{id}"),
                message: format!("'{url}' is not an http(s) URL"),
            });
        }
    }
    Ok(map)
}
