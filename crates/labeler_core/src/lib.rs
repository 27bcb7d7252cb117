//! Labeler core: pure labeling rules, retry schedule and checkpoint arithmetic.
mod checkpoint;
mod failure;
mod label;
mod retry;
mod stats;
mod text;

pub use checkpoint::{resume_index, FlushSchedule, DEFAULT_FLUSH_EVERY};
pub use failure::FailureCategory;
pub use label::{parse_answer, Sentiment, LABEL_CODE_COLUMN, LABEL_NAME_COLUMN};
pub use retry::RetryPolicy;
pub use stats::LabelStats;
pub use text::{detect_text_column, is_blank_text, MISSING_VALUE_MARKER};
