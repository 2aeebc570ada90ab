//! WizardController: form state, step gating and validator bookkeeping.
//!
//! The controller is synchronous and owns nothing but data; the async
//! round trips live in [`FormSession`](super::session::FormSession), which
//! brackets each one with [`WizardController::begin_check`] and
//! [`WizardController::finish_check`].

use std::collections::HashMap;
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use tracing::debug;

use super::state::{StepEvent, WizardStep, transition};
use crate::catalog::{ChipType, PlanCatalog, ShippingMethod};
use crate::error::{SubmitError, WizardError};
use crate::fields::digit_count;
use crate::form::{Check, Field, FieldFlags, FormData, PhoneCheck};
use crate::validators::phone::is_checkable;
use crate::validators::{Notice, ValidationOutcome, Verdict};

/// What the visitor is looking at.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Screen {
    Form,
    /// Terminal: the signup was accepted.
    Success { message: String },
    /// Shown over the form until dismissed.
    Error { message: String },
}

/// Visitor actions, as posted by the front end.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum FormEvent {
    Input { field: Field, value: String },
    SelectChip { chip: ChipType },
    SelectPlan { plan_id: String },
    SelectShipping { method: ShippingMethod },
    Next,
    Back,
    DismissError,
}

/// Identifies one validator round trip.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CheckTicket {
    pub field: Field,
    generation: u64,
}

/// Whether `step`'s required fields are filled in.
pub fn step_complete(step: WizardStep, form: &FormData) -> bool {
    match step {
        WizardStep::ChipType => form.chip_type.is_some(),
        WizardStep::Plan => form.plan_id.as_deref().is_some_and(|id| !id.is_empty()),
        WizardStep::PersonalData => {
            digit_count(&form.cpf) == 11
                && digit_count(&form.birth) == 8
                && !form.name.trim().is_empty()
        }
        WizardStep::Contact => !form.email.trim().is_empty() && digit_count(&form.cell) >= 10,
        WizardStep::Address => {
            digit_count(&form.cep) == 8
                && !form.district.trim().is_empty()
                && !form.city.trim().is_empty()
                && !form.state.is_empty()
                && !form.street.trim().is_empty()
        }
        WizardStep::ShippingMethod => form.shipping.is_some(),
    }
}

/// Field whose validator must be re-run after `field` is edited.
fn dependent_check(field: Field) -> Option<Field> {
    match field {
        Field::Cpf | Field::Birth => Some(Field::Birth),
        Field::Cep | Field::Email | Field::Cell | Field::Coupon => Some(field),
        _ => None,
    }
}

fn check_for(verdict: Verdict) -> Option<Check> {
    match verdict {
        Verdict::Valid => Some(Check::Valid),
        Verdict::Invalid => Some(Check::Invalid),
        Verdict::Unknown => Some(Check::Unknown),
        Verdict::Unchanged => None,
    }
}

/// Snapshot of the wizard for rendering.
#[derive(Debug, Clone, Serialize)]
pub struct WizardView {
    pub step: WizardStep,
    pub step_index: usize,
    pub step_title: &'static str,
    pub can_continue: bool,
    pub loading: bool,
    pub name_locked: bool,
    pub form: FormData,
    pub flags: FieldFlags,
    pub shipping_options: Vec<ShippingMethod>,
    pub screen: Screen,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub last_notice: Option<Notice>,
}

pub struct WizardController {
    step: WizardStep,
    form: FormData,
    flags: FieldFlags,
    screen: Screen,
    loading: bool,
    catalog: Arc<PlanCatalog>,
    generations: HashMap<Field, u64>,
    phone_before_check: PhoneCheck,
    last_notice: Option<Notice>,
}

impl WizardController {
    pub fn new(catalog: Arc<PlanCatalog>) -> Self {
        Self {
            step: WizardStep::default(),
            form: FormData::default(),
            flags: FieldFlags::default(),
            screen: Screen::Form,
            loading: false,
            catalog,
            generations: HashMap::new(),
            phone_before_check: PhoneCheck::Unknown,
            last_notice: None,
        }
    }

    pub fn step(&self) -> WizardStep {
        self.step
    }

    pub fn form(&self) -> &FormData {
        &self.form
    }

    pub fn flags(&self) -> &FieldFlags {
        &self.flags
    }

    pub fn screen(&self) -> &Screen {
        &self.screen
    }

    pub fn loading(&self) -> bool {
        self.loading
    }

    pub fn can_continue(&self) -> bool {
        step_complete(self.step, &self.form)
    }

    pub fn is_finished(&self) -> bool {
        matches!(self.screen, Screen::Success { .. })
    }

    /// Apply one visitor action.
    pub fn handle(&mut self, event: FormEvent) -> Result<(), WizardError> {
        if self.is_finished() {
            return Err(WizardError::Finished);
        }
        match event {
            FormEvent::Input { field, value } => self.input(field, &value)?,
            FormEvent::SelectChip { chip } => {
                // Plan and shipping both depend on the chip.
                self.form.chip_type = Some(chip);
                self.form.plan_id = None;
                self.form.shipping = None;
            }
            FormEvent::SelectPlan { plan_id } => self.select_plan(plan_id)?,
            FormEvent::SelectShipping { method } => self.select_shipping(method)?,
            FormEvent::Next => {
                self.step = transition(self.step, StepEvent::Next, self.can_continue());
            }
            FormEvent::Back => {
                self.step = transition(self.step, StepEvent::Back, self.can_continue());
            }
            FormEvent::DismissError => {
                if matches!(self.screen, Screen::Error { .. }) {
                    self.screen = Screen::Form;
                }
            }
        }
        Ok(())
    }

    fn input(&mut self, field: Field, value: &str) -> Result<(), WizardError> {
        if field == Field::Name && self.flags.tax_id_verified {
            return Err(WizardError::ReadOnlyField(field.to_string()));
        }
        match field {
            Field::Birth => {
                self.flags.birth_date = match digit_count(value) {
                    8 => Check::Valid,
                    0 => Check::Unknown,
                    _ => Check::Invalid,
                };
            }
            Field::Cep => self.flags.postal_code = Check::Unknown,
            Field::Cell if self.flags.phone == PhoneCheck::Checking => {
                self.flags.phone = self.phone_before_check;
            }
            _ => {}
        }
        self.form.set(field, field.mask(value));
        if let Some(check) = dependent_check(field) {
            self.bump(check);
        }
        Ok(())
    }

    fn select_plan(&mut self, plan_id: String) -> Result<(), WizardError> {
        let Some((_, plan)) = self.catalog.find(&plan_id) else {
            return Err(WizardError::UnknownPlan(plan_id));
        };
        if self.form.chip_type == Some(ChipType::ESim) && !plan.esim_capable {
            return Err(WizardError::PlanNotEsimCapable(plan_id));
        }
        self.form.plan_id = Some(plan_id);
        Ok(())
    }

    fn select_shipping(&mut self, method: ShippingMethod) -> Result<(), WizardError> {
        let offered = self
            .form
            .chip_type
            .is_some_and(|chip| ShippingMethod::offered_for(chip).contains(&method));
        if !offered {
            return Err(WizardError::ShippingUnavailable {
                method: method.to_string(),
            });
        }
        self.form.shipping = Some(method);
        Ok(())
    }

    fn bump(&mut self, field: Field) -> u64 {
        let generation = self.generations.entry(field).or_insert(0);
        *generation += 1;
        *generation
    }

    /// Start a validator round trip for `field`.
    ///
    /// Any round trip already in flight for the same field becomes stale.
    pub fn begin_check(&mut self, field: Field) -> CheckTicket {
        let generation = self.bump(field);
        if field == Field::Cell && is_checkable(digit_count(&self.form.cell)) {
            if self.flags.phone != PhoneCheck::Checking {
                self.phone_before_check = self.flags.phone;
            }
            self.flags.phone = PhoneCheck::Checking;
        }
        CheckTicket { field, generation }
    }

    /// Apply a validator outcome. Returns `false` if it was stale and dropped.
    pub fn finish_check(&mut self, ticket: CheckTicket, outcome: &ValidationOutcome) -> bool {
        let latest = self.generations.get(&ticket.field).copied();
        if latest != Some(ticket.generation) || self.is_finished() {
            debug!(
                field = %ticket.field,
                generation = ticket.generation,
                "Discarding stale validation result"
            );
            return false;
        }

        for (field, value) in &outcome.autofill {
            self.form.set(*field, value.clone());
        }

        match (ticket.field, outcome.verdict) {
            (Field::Birth, Verdict::Valid) => self.flags.tax_id_verified = true,
            (Field::Email, Verdict::Valid) => self.flags.email_verified = true,
            (Field::Cep, verdict) => {
                if let Some(check) = check_for(verdict) {
                    self.flags.postal_code = check;
                }
            }
            (Field::Coupon, verdict) => {
                if let Some(check) = check_for(verdict) {
                    self.flags.coupon = check;
                }
            }
            (Field::Cell, verdict) => {
                self.flags.phone = match verdict {
                    Verdict::Valid => PhoneCheck::Valid,
                    Verdict::Invalid => PhoneCheck::Invalid,
                    Verdict::Unknown => PhoneCheck::Unknown,
                    Verdict::Unchanged if self.flags.phone == PhoneCheck::Checking => {
                        self.phone_before_check
                    }
                    Verdict::Unchanged => self.flags.phone,
                };
            }
            _ => {}
        }

        if let Some(notice) = &outcome.notice {
            self.last_notice = Some(notice.clone());
        }
        true
    }

    /// Enter the loading state for a submission.
    pub fn begin_submit(&mut self) -> Result<(), WizardError> {
        if self.is_finished() {
            return Err(WizardError::Finished);
        }
        if self.loading {
            return Err(WizardError::SubmissionInProgress);
        }
        if !self.step.is_last() || !self.can_continue() {
            return Err(WizardError::StepIncomplete(self.step.to_string()));
        }
        self.loading = true;
        self.screen = Screen::Form;
        Ok(())
    }

    /// Leave the loading state and show the result.
    pub fn finish_submit(&mut self, result: &Result<String, SubmitError>) {
        self.loading = false;
        self.screen = match result {
            Ok(message) => Screen::Success {
                message: message.clone(),
            },
            Err(e) => Screen::Error {
                message: e.to_string(),
            },
        };
    }

    pub fn view(&self) -> WizardView {
        WizardView {
            step: self.step,
            step_index: self.step.index(),
            step_title: self.step.title(),
            can_continue: self.can_continue(),
            loading: self.loading,
            name_locked: self.flags.tax_id_verified,
            form: self.form.clone(),
            flags: self.flags.clone(),
            shipping_options: self
                .form
                .chip_type
                .map(|chip| ShippingMethod::offered_for(chip).to_vec())
                .unwrap_or_default(),
            screen: self.screen.clone(),
            last_notice: self.last_notice.clone(),
        }
    }
}
