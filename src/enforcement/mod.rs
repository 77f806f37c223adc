//! Stop, ask, proceed.
//!
//! [`Enforcer`] decides whether a stop is needed and turns a provider
//! directive into a question. [`GuardedAction`] makes skipping the answer a
//! type error, with a runtime check behind it.

pub mod guard;
pub mod hooks;
pub mod orchestrator;
pub mod render;

pub use guard::{Awaiting, Cleared, GuardedAction};
pub use hooks::{ClarifyEvent, ClarifyObserver, LogObserver, NoopObserver, create_observer};
pub use orchestrator::{ClarifyOutcome, Enforcer};
pub use render::QuestionRenderer;
