pub mod drawing_ctx;
pub mod drawing_flow;
pub mod outcome;

pub use drawing_ctx::DrawingCtx;
pub use drawing_flow::{DocumentOperation, DrawingFlow, RESULT_SYMBOL};
pub use outcome::{classify, OutcomeClass};
