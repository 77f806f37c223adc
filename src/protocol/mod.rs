pub mod types;
pub mod validate;

pub use types::{
    Directive, FeedbackRecord, Mode, RenderingSpec, SessionSignals, Stage, StructuralRequest,
};
pub use validate::{parse_directive, validate_directive, validate_feedback, validate_request};
