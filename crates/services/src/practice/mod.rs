//! Practice batches and the session lifecycle around them.

mod lifecycle;
mod selector;

pub use lifecycle::{IssuedBatch, PracticeConfig, PracticeSessionService};
pub use selector::{QuestionBatch, QuestionSelector};
