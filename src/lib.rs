#![warn(clippy::all, clippy::pedantic)]
#![allow(
    clippy::missing_errors_doc,
    clippy::missing_panics_doc,
    clippy::unnecessary_literal_bound,
    clippy::module_name_repetitions,
    clippy::struct_field_names,
    clippy::must_use_candidate,
    clippy::new_without_default,
    clippy::return_self_not_must_use
)]

//! Mediator between an agent and a clarification service.
//!
//! When an agent lacks human-supplied meaning or direction it stops, fetches
//! a structural directive from a [`DirectiveProvider`], renders a question
//! locally and only proceeds once the question is answered.

pub mod config;
pub mod enforcement;
pub mod error;
pub mod logging;
pub mod protocol;
pub mod providers;

pub use config::StopgateConfig;
pub use enforcement::{
    Awaiting, ClarifyEvent, ClarifyObserver, ClarifyOutcome, Cleared, Enforcer, GuardedAction,
    QuestionRenderer,
};
pub use error::{ClarifyError, Result};
pub use protocol::{Directive, FeedbackRecord, Mode, RenderingSpec, Stage, StructuralRequest};
pub use providers::local::{LocalProvider, Selector};
pub use providers::remote::RemoteProvider;
pub use providers::DirectiveProvider;
