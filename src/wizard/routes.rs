//! REST endpoints for referrers, the plan catalog and form sessions.

use std::collections::HashMap;
use std::sync::Arc;

use axum::{
    Json, Router,
    extract::{Path, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, post},
};
use serde::Deserialize;
use tower_http::cors::CorsLayer;
use tracing::warn;
use uuid::Uuid;

use super::controller::FormEvent;
use super::session::{FormSession, SessionStore, spawn_media_warmup};
use crate::catalog::{BRAZILIAN_STATES, ChipType, PlanCatalog, ShippingMethod};
use crate::config::FormConfig;
use crate::error::{self, WizardError};
use crate::form::Field;
use crate::referrers::Referrer;
use crate::submission::Submitter;
use crate::validators::{self, ValidatorSet};

const UNKNOWN_REFERRER: &str = "Representante não encontrado.";

/// Shared state for the signup routes.
#[derive(Clone)]
pub struct SignupState {
    pub referrers: Arc<HashMap<String, Referrer>>,
    pub default_referrer: Referrer,
    pub catalog: Arc<PlanCatalog>,
    pub validators: Arc<ValidatorSet>,
    pub submitter: Arc<Submitter>,
    pub sessions: Arc<SessionStore>,
    /// Client and URL for the per-session media warm-up, if enabled.
    pub warmup: Option<(reqwest::Client, String)>,
}

impl SignupState {
    pub fn from_config(config: &FormConfig) -> error::Result<Self> {
        let catalog = Arc::new(PlanCatalog::standard());
        let warmup = match &config.warmup_media_url {
            Some(url) => Some((validators::http_client(config)?, url.clone())),
            None => None,
        };
        Ok(Self {
            referrers: Arc::new(config.referrers.clone()),
            default_referrer: config.default_referrer.clone(),
            catalog: Arc::clone(&catalog),
            validators: Arc::new(ValidatorSet::standard(config)?),
            submitter: Arc::new(Submitter::from_config(config, catalog)?),
            sessions: SessionStore::new(),
            warmup,
        })
    }

    fn referrer(&self, id: &str) -> Option<Referrer> {
        self.referrers.get(id).cloned()
    }
}

/// Build the signup router.
pub fn signup_routes(state: SignupState) -> Router {
    Router::new()
        .route("/health", get(health))
        .route("/api/catalog", get(catalog))
        .route("/api/referrers/{id}", get(get_referrer))
        .route("/api/referrers/{id}/sessions", post(create_referred_session))
        .route("/api/sessions", post(create_default_session))
        .route("/api/sessions/{id}", get(get_session))
        .route("/api/sessions/{id}/events", post(post_event))
        .route("/api/sessions/{id}/blur", post(blur_field))
        .route("/api/sessions/{id}/submit", post(submit))
        .layer(CorsLayer::permissive())
        .with_state(state)
}

fn error_response(status: StatusCode, message: impl Into<String>) -> Response {
    (status, Json(serde_json::json!({"error": message.into()}))).into_response()
}

fn wizard_error(e: WizardError) -> Response {
    let status = match e {
        WizardError::Finished | WizardError::SubmissionInProgress => StatusCode::CONFLICT,
        _ => StatusCode::UNPROCESSABLE_ENTITY,
    };
    error_response(status, e.to_string())
}

async fn find_session(state: &SignupState, id: &str) -> Result<Arc<FormSession>, Response> {
    let Ok(session_id) = Uuid::parse_str(id) else {
        return Err(error_response(StatusCode::BAD_REQUEST, "Invalid session ID"));
    };
    state
        .sessions
        .get(session_id)
        .await
        .ok_or_else(|| error_response(StatusCode::NOT_FOUND, "Session not found"))
}

// ── Health / catalog ────────────────────────────────────────────────────

async fn health() -> impl IntoResponse {
    Json(serde_json::json!({
        "status": "ok",
        "service": "plan-signup"
    }))
}

async fn catalog(State(state): State<SignupState>) -> impl IntoResponse {
    let states: Vec<_> = BRAZILIAN_STATES
        .iter()
        .map(|(code, name)| serde_json::json!({"code": code, "name": name}))
        .collect();
    let chip_types: Vec<_> = [ChipType::Physical, ChipType::ESim]
        .into_iter()
        .map(|chip| {
            serde_json::json!({
                "chip": chip,
                "label": chip.label(),
                "shipping": ShippingMethod::offered_for(chip)
                    .iter()
                    .map(|m| serde_json::json!({"method": m, "label": m.label()}))
                    .collect::<Vec<_>>(),
            })
        })
        .collect();
    let carriers: Vec<_> = state
        .catalog
        .carriers()
        .iter()
        .map(|entry| {
            serde_json::json!({
                "carrier": entry.carrier,
                "plans": entry
                    .plans
                    .iter()
                    .map(|plan| {
                        serde_json::json!({
                            "id": plan.id,
                            "label": plan.label,
                            "price": plan.price,
                            "price_label": plan.price_display(),
                            "esim_capable": plan.esim_capable,
                        })
                    })
                    .collect::<Vec<_>>(),
            })
        })
        .collect();
    Json(serde_json::json!({
        "carriers": carriers,
        "chip_types": chip_types,
        "states": states,
    }))
}

// ── Referrers ───────────────────────────────────────────────────────────

async fn get_referrer(State(state): State<SignupState>, Path(id): Path<String>) -> Response {
    match state.referrer(&id) {
        Some(referrer) => Json(referrer).into_response(),
        None => error_response(StatusCode::NOT_FOUND, UNKNOWN_REFERRER),
    }
}

async fn create_referred_session(
    State(state): State<SignupState>,
    Path(id): Path<String>,
) -> Response {
    match state.referrer(&id) {
        Some(referrer) => start_session(&state, referrer).await,
        None => {
            warn!(referrer = %id, "Session requested for unknown referrer");
            error_response(StatusCode::NOT_FOUND, UNKNOWN_REFERRER)
        }
    }
}

async fn create_default_session(State(state): State<SignupState>) -> Response {
    let referrer = state.default_referrer.clone();
    start_session(&state, referrer).await
}

async fn start_session(state: &SignupState, referrer: Referrer) -> Response {
    let session = FormSession::new(
        referrer,
        Arc::clone(&state.catalog),
        Arc::clone(&state.validators),
        Arc::clone(&state.submitter),
    );
    state.sessions.insert(Arc::clone(&session)).await;

    if let Some((client, url)) = &state.warmup {
        spawn_media_warmup(client.clone(), url.clone());
    }

    (StatusCode::CREATED, Json(session.view().await)).into_response()
}

// ── Sessions ────────────────────────────────────────────────────────────

async fn get_session(State(state): State<SignupState>, Path(id): Path<String>) -> Response {
    match find_session(&state, &id).await {
        Ok(session) => Json(session.view().await).into_response(),
        Err(response) => response,
    }
}

async fn post_event(
    State(state): State<SignupState>,
    Path(id): Path<String>,
    Json(event): Json<FormEvent>,
) -> Response {
    let session = match find_session(&state, &id).await {
        Ok(session) => session,
        Err(response) => return response,
    };
    match session.handle(event).await {
        Ok(view) => Json(view).into_response(),
        Err(e) => wizard_error(e),
    }
}

#[derive(Deserialize)]
struct BlurRequest {
    field: Field,
}

async fn blur_field(
    State(state): State<SignupState>,
    Path(id): Path<String>,
    Json(body): Json<BlurRequest>,
) -> Response {
    let session = match find_session(&state, &id).await {
        Ok(session) => session,
        Err(response) => return response,
    };
    match session.blur(body.field).await {
        Ok(report) => Json(report).into_response(),
        Err(e) => wizard_error(e),
    }
}

async fn submit(State(state): State<SignupState>, Path(id): Path<String>) -> Response {
    let session = match find_session(&state, &id).await {
        Ok(session) => session,
        Err(response) => return response,
    };
    match session.submit(&state.sessions).await {
        Ok(report) => Json(report).into_response(),
        Err(e) => wizard_error(e),
    }
}
