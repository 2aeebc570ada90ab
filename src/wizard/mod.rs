//! The signup wizard: steps, controller, sessions and HTTP routes.

pub mod controller;
pub mod routes;
pub mod session;
pub mod state;

pub use controller::{FormEvent, Screen, WizardController, WizardView, step_complete};
pub use routes::{SignupState, signup_routes};
pub use session::{FormSession, SessionStore, SessionView, spawn_prune_task};
pub use state::{StepEvent, WizardStep, transition};
