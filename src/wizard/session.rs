//! Form sessions: one wizard per visitor, plus the in-memory store.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};
use serde::Serialize;
use tokio::sync::RwLock;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};
use uuid::Uuid;

use super::controller::{FormEvent, WizardController, WizardView};
use crate::catalog::PlanCatalog;
use crate::error::{SubmitError, WizardError};
use crate::form::Field;
use crate::referrers::Referrer;
use crate::submission::Submitter;
use crate::validators::{ValidationOutcome, ValidatorSet};

/// A session as returned to front ends.
#[derive(Debug, Clone, Serialize)]
pub struct SessionView {
    pub id: Uuid,
    pub referrer: Referrer,
    pub created_at: DateTime<Utc>,
    #[serde(flatten)]
    pub wizard: WizardView,
}

/// Result of a blur-triggered validation.
#[derive(Debug, Clone, Serialize)]
pub struct BlurReport {
    /// `false` when a newer edit or check superseded this one.
    pub applied: bool,
    pub outcome: ValidationOutcome,
    pub session: SessionView,
}

/// Result of a submission attempt.
#[derive(Debug, Clone, Serialize)]
pub struct SubmitReport {
    pub success: bool,
    pub message: String,
    pub session: SessionView,
}

/// One visitor's signup wizard.
///
/// The controller lock is never held across a network call. Validator and
/// webhook round trips run on spawned tasks that apply their own result, so
/// a caller that goes away mid-request cannot strand the session in a
/// checking or loading state.
pub struct FormSession {
    pub id: Uuid,
    pub referrer: Referrer,
    pub created_at: DateTime<Utc>,
    controller: RwLock<WizardController>,
    validators: Arc<ValidatorSet>,
    submitter: Arc<Submitter>,
}

impl FormSession {
    pub fn new(
        referrer: Referrer,
        catalog: Arc<PlanCatalog>,
        validators: Arc<ValidatorSet>,
        submitter: Arc<Submitter>,
    ) -> Arc<Self> {
        Arc::new(Self {
            id: Uuid::new_v4(),
            referrer,
            created_at: Utc::now(),
            controller: RwLock::new(WizardController::new(catalog)),
            validators,
            submitter,
        })
    }

    pub async fn view(&self) -> SessionView {
        let wizard = self.controller.read().await.view();
        self.view_from(wizard)
    }

    fn view_from(&self, wizard: WizardView) -> SessionView {
        SessionView {
            id: self.id,
            referrer: self.referrer.clone(),
            created_at: self.created_at,
            wizard,
        }
    }

    pub async fn is_finished(&self) -> bool {
        self.controller.read().await.is_finished()
    }

    pub async fn handle(&self, event: FormEvent) -> Result<SessionView, WizardError> {
        let mut controller = self.controller.write().await;
        controller.handle(event)?;
        let wizard = controller.view();
        drop(controller);
        Ok(self.view_from(wizard))
    }

    /// Run the validator attached to `field`.
    pub async fn blur(self: &Arc<Self>, field: Field) -> Result<BlurReport, WizardError> {
        let validator = self
            .validators
            .for_field(field)
            .ok_or_else(|| WizardError::NoValidator(field.to_string()))?;

        let (ticket, form) = {
            let mut controller = self.controller.write().await;
            if controller.is_finished() {
                return Err(WizardError::Finished);
            }
            (controller.begin_check(field), controller.form().clone())
        };

        let session = Arc::clone(self);
        let task = tokio::spawn(async move {
            let outcome = validator.validate(&form).await;
            let applied = session
                .controller
                .write()
                .await
                .finish_check(ticket, &outcome);
            debug!(
                session_id = %session.id,
                validator = validator.name(),
                verdict = ?outcome.verdict,
                applied,
                "Validation finished"
            );
            (applied, outcome)
        });

        let (applied, outcome) = match task.await {
            Ok(result) => result,
            Err(e) => {
                warn!(session_id = %self.id, field = %field, error = %e, "Validator task failed");
                (false, ValidationOutcome::unchanged())
            }
        };

        Ok(BlurReport {
            applied,
            outcome,
            session: self.view().await,
        })
    }

    /// Submit the form to the referrer's webhook.
    ///
    /// Rejected with a [`WizardError`] only when the wizard cannot submit at
    /// all; every submission outcome, good or bad, is a [`SubmitReport`].
    /// On success the session is removed from `store`, even if the caller
    /// has stopped waiting.
    pub async fn submit(
        self: &Arc<Self>,
        store: &Arc<SessionStore>,
    ) -> Result<SubmitReport, WizardError> {
        let (form, flags) = {
            let mut controller = self.controller.write().await;
            controller.begin_submit()?;
            (controller.form().clone(), controller.flags().clone())
        };

        let session = Arc::clone(self);
        let store = Arc::clone(store);
        let task = tokio::spawn(async move {
            let result = session
                .submitter
                .submit(&form, &flags, &session.referrer.id)
                .await;
            session.controller.write().await.finish_submit(&result);
            if result.is_ok() && store.remove(session.id).await.is_some() {
                info!(session_id = %session.id, "Session completed");
            }
            result
        });

        let result = match task.await {
            Ok(result) => result,
            Err(e) => {
                warn!(session_id = %self.id, error = %e, "Submission task failed");
                let result = Err(SubmitError::Connectivity {
                    reason: e.to_string(),
                });
                self.controller.write().await.finish_submit(&result);
                result
            }
        };

        let (success, message) = match result {
            Ok(message) => (true, message),
            Err(e) => (false, e.to_string()),
        };
        Ok(SubmitReport {
            success,
            message,
            session: self.view().await,
        })
    }
}

/// Live sessions keyed by id.
pub struct SessionStore {
    sessions: RwLock<HashMap<Uuid, Arc<FormSession>>>,
}

impl SessionStore {
    pub fn new() -> Arc<Self> {
        Arc::new(Self {
            sessions: RwLock::new(HashMap::new()),
        })
    }

    pub async fn insert(&self, session: Arc<FormSession>) {
        info!(
            session_id = %session.id,
            referrer = %session.referrer.id,
            "Session started"
        );
        self.sessions.write().await.insert(session.id, session);
    }

    pub async fn get(&self, id: Uuid) -> Option<Arc<FormSession>> {
        self.sessions.read().await.get(&id).cloned()
    }

    pub async fn remove(&self, id: Uuid) -> Option<Arc<FormSession>> {
        self.sessions.write().await.remove(&id)
    }

    pub async fn len(&self) -> usize {
        self.sessions.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.sessions.read().await.is_empty()
    }

    /// Drop sessions created more than `ttl` ago. Returns how many went.
    pub async fn prune_older_than(&self, ttl: Duration) -> usize {
        let Some(cutoff) = chrono::Duration::from_std(ttl)
            .ok()
            .and_then(|ttl| Utc::now().checked_sub_signed(ttl))
        else {
            return 0;
        };

        let mut sessions = self.sessions.write().await;
        let before = sessions.len();
        sessions.retain(|_, session| session.created_at > cutoff);
        let pruned = before - sessions.len();

        if pruned > 0 {
            info!(count = pruned, "Pruned expired sessions");
        }
        pruned
    }
}

/// Spawn a background task that prunes stale sessions every minute.
pub fn spawn_prune_task(store: Arc<SessionStore>, ttl: Duration) -> JoinHandle<()> {
    tokio::spawn(async move {
        let mut interval = tokio::time::interval(Duration::from_secs(60));
        loop {
            interval.tick().await;
            store.prune_older_than(ttl).await;
        }
    })
}

/// Fetch the onboarding media once so the CDN has it warm.
pub fn spawn_media_warmup(client: reqwest::Client, url: String) -> JoinHandle<()> {
    tokio::spawn(async move {
        match client.get(&url).send().await {
            Ok(response) => debug!(url = %url, status = %response.status(), "Media warm-up done"),
            Err(e) => warn!(url = %url, error = %e, "Media warm-up failed"),
        }
    })
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicUsize, Ordering};

    use async_trait::async_trait;

    use super::*;
    use crate::catalog::{ChipType, ShippingMethod};
    use crate::error::ServiceError;
    use crate::form::{Check, FormData};
    use crate::submission::{SubmissionPayload, WebhookReply, WebhookTransport};
    use crate::validators::Validator;
    use crate::wizard::controller::Screen;

    /// Postal-code validator: slow and negative for one CEP, instant and
    /// positive for everything else.
    struct SlowCep {
        slow_cep: &'static str,
        delay: Duration,
    }

    #[async_trait]
    impl Validator for SlowCep {
        fn name(&self) -> &str {
            "slow_cep"
        }
        fn trigger(&self) -> Field {
            Field::Cep
        }
        async fn validate(&self, form: &FormData) -> ValidationOutcome {
            if form.cep == self.slow_cep {
                tokio::time::sleep(self.delay).await;
                ValidationOutcome::invalid()
            } else {
                ValidationOutcome::valid().with_autofill(Field::City, "São Paulo")
            }
        }
    }

    struct CountingTransport {
        status: u16,
        body: &'static str,
        delay: Duration,
        calls: AtomicUsize,
    }

    #[async_trait]
    impl WebhookTransport for CountingTransport {
        async fn post(
            &self,
            _url: &str,
            _payload: &SubmissionPayload,
        ) -> Result<WebhookReply, ServiceError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            if !self.delay.is_zero() {
                tokio::time::sleep(self.delay).await;
            }
            Ok(WebhookReply::new(self.status, self.body))
        }
    }

    fn referrer() -> Referrer {
        Referrer::new("110956", "Francisco Eliedisom Dos Santos", "")
    }

    fn session_with(transport: Arc<CountingTransport>) -> Arc<FormSession> {
        session_with_timeout(transport, Duration::from_secs(5))
    }

    fn session_with_timeout(
        transport: Arc<CountingTransport>,
        timeout: Duration,
    ) -> Arc<FormSession> {
        let catalog = Arc::new(PlanCatalog::standard());
        let mut validators = ValidatorSet::new();
        validators.register(Arc::new(SlowCep {
            slow_cep: "01310-100",
            delay: Duration::from_millis(100),
        }));
        let submitter = Submitter::new(
            transport,
            Arc::clone(&catalog),
            HashMap::from([("110956".to_string(), "http://hooks.test/1".to_string())]),
            timeout,
        );
        FormSession::new(referrer(), catalog, Arc::new(validators), Arc::new(submitter))
    }

    fn transport(status: u16, body: &'static str) -> Arc<CountingTransport> {
        slow_transport(status, body, Duration::ZERO)
    }

    fn slow_transport(status: u16, body: &'static str, delay: Duration) -> Arc<CountingTransport> {
        Arc::new(CountingTransport {
            status,
            body,
            delay,
            calls: AtomicUsize::new(0),
        })
    }

    /// A store holding `session`, as the routes keep it.
    async fn stored(session: &Arc<FormSession>) -> Arc<SessionStore> {
        let store = SessionStore::new();
        store.insert(Arc::clone(session)).await;
        store
    }

    async fn input(session: &FormSession, field: Field, value: &str) {
        session
            .handle(FormEvent::Input {
                field,
                value: value.to_string(),
            })
            .await
            .unwrap();
    }

    async fn fill_to_shipping(session: &FormSession) {
        session
            .handle(FormEvent::SelectChip {
                chip: ChipType::Physical,
            })
            .await
            .unwrap();
        session.handle(FormEvent::Next).await.unwrap();
        session
            .handle(FormEvent::SelectPlan {
                plan_id: "69".into(),
            })
            .await
            .unwrap();
        session.handle(FormEvent::Next).await.unwrap();
        input(session, Field::Cpf, "52998224725").await;
        input(session, Field::Birth, "15031990").await;
        input(session, Field::Name, "Maria").await;
        session.handle(FormEvent::Next).await.unwrap();
        input(session, Field::Email, "maria@example.com").await;
        input(session, Field::Cell, "21969400194").await;
        session.handle(FormEvent::Next).await.unwrap();
        input(session, Field::Cep, "04538133").await;
        input(session, Field::District, "Itaim Bibi").await;
        input(session, Field::City, "São Paulo").await;
        input(session, Field::State, "SP").await;
        input(session, Field::Street, "Avenida Faria Lima").await;
        session.handle(FormEvent::Next).await.unwrap();
        session
            .handle(FormEvent::SelectShipping {
                method: ShippingMethod::Pickup,
            })
            .await
            .unwrap();
    }

    #[tokio::test]
    async fn blur_without_validator_is_rejected() {
        let session = session_with(transport(200, ""));
        let err = session.blur(Field::Street).await.unwrap_err();
        assert_eq!(err, WizardError::NoValidator("street".into()));
    }

    #[tokio::test]
    async fn blur_applies_autofill() {
        let session = session_with(transport(200, ""));
        input(&session, Field::Cep, "04538133").await;
        let report = session.blur(Field::Cep).await.unwrap();
        assert!(report.applied);
        assert_eq!(report.session.wizard.flags.postal_code, Check::Valid);
        assert_eq!(report.session.wizard.form.city, "São Paulo");
    }

    #[tokio::test]
    async fn slow_stale_response_loses_to_newer_edit() {
        let session = session_with(transport(200, ""));
        input(&session, Field::Cep, "01310100").await;

        let slow = {
            let session = Arc::clone(&session);
            tokio::spawn(async move { session.blur(Field::Cep).await })
        };
        tokio::time::sleep(Duration::from_millis(10)).await;

        input(&session, Field::Cep, "04538133").await;
        let fresh = session.blur(Field::Cep).await.unwrap();
        assert!(fresh.applied);

        let stale = slow.await.unwrap().unwrap();
        assert!(!stale.applied);
        assert_eq!(stale.outcome.verdict, crate::validators::Verdict::Invalid);

        let view = session.view().await;
        assert_eq!(view.wizard.flags.postal_code, Check::Valid);
        assert_eq!(view.wizard.form.cep, "04538-133");
    }

    #[tokio::test]
    async fn abandoned_blur_still_applies() {
        let session = session_with(transport(200, ""));
        input(&session, Field::Cep, "01310100").await;

        let result =
            tokio::time::timeout(Duration::from_millis(10), session.blur(Field::Cep)).await;
        assert!(result.is_err());

        tokio::time::sleep(Duration::from_millis(200)).await;
        assert_eq!(
            session.view().await.wizard.flags.postal_code,
            Check::Invalid
        );
    }

    #[tokio::test]
    async fn successful_submit_finishes_session() {
        let transport = transport(200, r#"{"message": "Cadastro recebido"}"#);
        let session = session_with(Arc::clone(&transport));
        let store = stored(&session).await;
        fill_to_shipping(&session).await;

        let report = session.submit(&store).await.unwrap();
        assert!(report.success);
        assert_eq!(report.message, "Cadastro recebido");
        assert!(!report.session.wizard.loading);
        assert_eq!(
            report.session.wizard.screen,
            Screen::Success {
                message: "Cadastro recebido".into()
            }
        );
        assert!(session.is_finished().await);
        assert!(store.is_empty().await);
        assert_eq!(transport.calls.load(Ordering::SeqCst), 1);

        assert_eq!(
            session.submit(&store).await.unwrap_err(),
            WizardError::Finished
        );
    }

    #[tokio::test]
    async fn abandoned_submit_still_removes_session() {
        let transport = slow_transport(200, "", Duration::from_millis(100));
        let session = session_with(Arc::clone(&transport));
        let store = stored(&session).await;
        fill_to_shipping(&session).await;

        let result = tokio::time::timeout(Duration::from_millis(10), session.submit(&store)).await;
        assert!(result.is_err());
        assert_eq!(store.len().await, 1);

        tokio::time::sleep(Duration::from_millis(300)).await;
        assert!(session.is_finished().await);
        assert!(store.get(session.id).await.is_none());
    }

    #[tokio::test]
    async fn rejected_submit_shows_error_and_allows_retry() {
        let transport = transport(200, r#"{"msg": "CPF já cadastrado"}"#);
        let session = session_with(Arc::clone(&transport));
        let store = stored(&session).await;
        fill_to_shipping(&session).await;

        let report = session.submit(&store).await.unwrap();
        assert!(!report.success);
        assert_eq!(report.message, "CPF já cadastrado");
        assert!(matches!(report.session.wizard.screen, Screen::Error { .. }));
        assert_eq!(store.len().await, 1);

        session.handle(FormEvent::DismissError).await.unwrap();
        let again = session.submit(&store).await.unwrap();
        assert!(!again.success);
        assert_eq!(transport.calls.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn stalled_webhook_times_out_and_clears_loading() {
        let transport = slow_transport(200, "", Duration::from_secs(30));
        let session = session_with_timeout(Arc::clone(&transport), Duration::from_millis(50));
        let store = stored(&session).await;
        fill_to_shipping(&session).await;

        let report = session.submit(&store).await.unwrap();
        assert!(!report.success);
        assert!(report.message.starts_with("Tempo limite"), "{}", report.message);
        assert!(!report.session.wizard.loading);
        assert!(matches!(report.session.wizard.screen, Screen::Error { .. }));
        assert_eq!(store.len().await, 1);
    }

    #[tokio::test]
    async fn incomplete_wizard_cannot_submit() {
        let transport = transport(200, "");
        let session = session_with(Arc::clone(&transport));
        let store = stored(&session).await;
        assert!(matches!(
            session.submit(&store).await,
            Err(WizardError::StepIncomplete(_))
        ));
        assert_eq!(transport.calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn store_insert_get_remove() {
        let store = SessionStore::new();
        assert!(store.is_empty().await);

        let session = session_with(transport(200, ""));
        let id = session.id;
        store.insert(session).await;
        assert_eq!(store.len().await, 1);
        assert!(store.get(id).await.is_some());
        assert!(store.get(Uuid::new_v4()).await.is_none());

        assert!(store.remove(id).await.is_some());
        assert!(store.is_empty().await);
    }

    #[tokio::test]
    async fn prune_drops_only_expired() {
        let store = SessionStore::new();
        store.insert(session_with(transport(200, ""))).await;

        assert_eq!(store.prune_older_than(Duration::from_secs(3600)).await, 0);
        assert_eq!(store.len().await, 1);

        tokio::time::sleep(Duration::from_millis(5)).await;
        assert_eq!(store.prune_older_than(Duration::from_millis(1)).await, 1);
        assert!(store.is_empty().await);
    }
}
