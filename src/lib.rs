//! Plan Signup: lead capture wizard for mobile plan activations.

pub mod catalog;
pub mod config;
pub mod error;
pub mod fields;
pub mod form;
pub mod referrers;
pub mod submission;
pub mod validators;
pub mod wizard;
