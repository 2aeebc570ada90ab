//! Wizard steps and the step transition function.

use serde::{Deserialize, Serialize};

/// The six steps of the signup form, in order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum WizardStep {
    ChipType,
    Plan,
    PersonalData,
    Contact,
    Address,
    ShippingMethod,
}

impl WizardStep {
    pub const ALL: [WizardStep; 6] = [
        Self::ChipType,
        Self::Plan,
        Self::PersonalData,
        Self::Contact,
        Self::Address,
        Self::ShippingMethod,
    ];

    pub fn index(&self) -> usize {
        match self {
            Self::ChipType => 0,
            Self::Plan => 1,
            Self::PersonalData => 2,
            Self::Contact => 3,
            Self::Address => 4,
            Self::ShippingMethod => 5,
        }
    }

    pub fn next(&self) -> Option<WizardStep> {
        Self::ALL.get(self.index() + 1).copied()
    }

    pub fn prev(&self) -> Option<WizardStep> {
        self.index().checked_sub(1).map(|i| Self::ALL[i])
    }

    pub fn is_last(&self) -> bool {
        self.next().is_none()
    }

    /// Heading shown above the step.
    pub fn title(&self) -> &'static str {
        match self {
            Self::ChipType => "Qual o tipo de chip você deseja utilizar?",
            Self::Plan => "Em qual cobertura você deseja ativar seu plano?",
            Self::PersonalData => "Dados Pessoais",
            Self::Contact => "Contato",
            Self::Address => "Endereço",
            Self::ShippingMethod => "Forma de Envio",
        }
    }
}

impl Default for WizardStep {
    fn default() -> Self {
        Self::ChipType
    }
}

impl std::fmt::Display for WizardStep {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            Self::ChipType => "chip_type",
            Self::Plan => "plan",
            Self::PersonalData => "personal_data",
            Self::Contact => "contact",
            Self::Address => "address",
            Self::ShippingMethod => "shipping_method",
        };
        write!(f, "{s}")
    }
}

/// Navigation requests.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StepEvent {
    Next,
    Back,
}

/// Pure step transition.
///
/// `Next` moves forward only when the current step is complete and is not
/// the last one. `Back` is unconditional from any step after the first.
pub fn transition(step: WizardStep, event: StepEvent, can_continue: bool) -> WizardStep {
    match event {
        StepEvent::Next if can_continue => step.next().unwrap_or(step),
        StepEvent::Next => step,
        StepEvent::Back => step.prev().unwrap_or(step),
    }
}
