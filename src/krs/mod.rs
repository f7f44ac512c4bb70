//! Course registration (KRS) rules that do not need storage.

pub mod transition;
pub mod validation;

pub use transition::{InvalidTransition, RegistrationAction, transition};
pub use validation::{
    MAX_CREDITS, RegistrationSnapshot, Rule, ValidationOutcome, Violation, run_chain,
};
