//! Labeler engine: service client, dataset IO and the checkpointed pipeline.
mod client;
mod coordinator;
mod dataset;
mod decode;
mod paths;
mod persist;
mod processor;
mod report;
mod resume;
mod types;

pub use client::{
    Classifier, ClientSettings, GeminiClassifier, GenerationConfig, DEFAULT_BASE_URL,
    DEFAULT_MODEL, DEFAULT_PROMPT,
};
pub use coordinator::{Coordinator, RunSummary};
pub use dataset::{
    encode_dataset, read_dataset, CellKind, Dataset, DatasetError, DatasetFormat, LabelColumns,
};
pub use decode::{decode_text, DecodeError, DecodedText};
pub use paths::{
    discover_inputs, is_candidate_input, output_path_for, report_path_for, OUTPUT_MARKER,
    REPORT_MARKER,
};
pub use persist::{ensure_output_dir, write_atomically, AtomicFileWriter, PersistError};
pub use processor::{
    LogProgressSink, ProcessError, ProcessOutcome, ProcessSummary, ProcessorSettings,
    ProgressSink, RowProcessor,
};
pub use report::{generate_report, label_stats, ReportError, ReportSummary};
pub use resume::{discover_resume_point, PriorOutputError, ResumePoint};
pub use types::{ClassifyError, DatasetJob, ProgressEvent};
