#![allow(dead_code)]

use std::collections::{HashMap, VecDeque};
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use labeler_core::{FailureCategory, FlushSchedule, RetryPolicy, Sentiment};
use labeler_engine::{
    read_dataset, ClassifyError, Classifier, ProcessorSettings, ProgressEvent, ProgressSink,
    RowProcessor,
};
use tokio_util::sync::CancellationToken;

pub fn init_logging() {
    labeler_logging::initialize_for_tests();
}

/// Classifier answering from per-text scripts, falling back to a fixed label.
pub struct ScriptedClassifier {
    scripts: Mutex<HashMap<String, VecDeque<Result<Sentiment, ClassifyError>>>>,
    calls: Mutex<Vec<String>>,
    fallback: Sentiment,
    cancel_on: Mutex<Option<(String, CancellationToken)>>,
}

impl ScriptedClassifier {
    pub fn new(fallback: Sentiment) -> Self {
        Self {
            scripts: Mutex::new(HashMap::new()),
            calls: Mutex::new(Vec::new()),
            fallback,
            cancel_on: Mutex::new(None),
        }
    }

    pub fn script(
        self,
        text: &str,
        answers: impl IntoIterator<Item = Result<Sentiment, ClassifyError>>,
    ) -> Self {
        self.scripts
            .lock()
            .unwrap()
            .insert(text.to_string(), answers.into_iter().collect());
        self
    }

    /// Cancels `token` the first time `text` is classified.
    pub fn cancel_when_asked(self, text: &str, token: CancellationToken) -> Self {
        *self.cancel_on.lock().unwrap() = Some((text.to_string(), token));
        self
    }

    pub fn calls(&self) -> Vec<String> {
        self.calls.lock().unwrap().clone()
    }
}

#[async_trait::async_trait]
impl Classifier for ScriptedClassifier {
    async fn classify(&self, text: &str) -> Result<Sentiment, ClassifyError> {
        self.calls.lock().unwrap().push(text.to_string());
        if let Some((trigger, token)) = self.cancel_on.lock().unwrap().as_ref() {
            if trigger == text {
                token.cancel();
            }
        }
        let scripted = self
            .scripts
            .lock()
            .unwrap()
            .get_mut(text)
            .and_then(|answers| answers.pop_front());
        scripted.unwrap_or(Ok(self.fallback))
    }
}

pub fn rate_limited() -> Result<Sentiment, ClassifyError> {
    Err(ClassifyError::transport("http status 429 Too Many Requests"))
}

pub fn invalid(answer: &str) -> Result<Sentiment, ClassifyError> {
    Err(ClassifyError::new(
        FailureCategory::InvalidOutput,
        format!("unexpected answer {answer:?}"),
    ))
}

/// Records every event; on each flush also counts the labeled rows found on disk.
pub struct RecordingSink {
    events: Mutex<Vec<ProgressEvent>>,
    watched: Option<PathBuf>,
    on_disk: Mutex<Vec<usize>>,
}

impl RecordingSink {
    pub fn new() -> Self {
        Self {
            events: Mutex::new(Vec::new()),
            watched: None,
            on_disk: Mutex::new(Vec::new()),
        }
    }

    pub fn watching(path: &Path) -> Self {
        Self {
            watched: Some(path.to_path_buf()),
            ..Self::new()
        }
    }

    pub fn events(&self) -> Vec<ProgressEvent> {
        self.events.lock().unwrap().clone()
    }

    pub fn labeled_on_disk_at_each_flush(&self) -> Vec<usize> {
        self.on_disk.lock().unwrap().clone()
    }

    pub fn flushes(&self) -> Vec<usize> {
        self.events()
            .into_iter()
            .filter_map(|event| match event {
                ProgressEvent::Flushed { labeled_rows, .. } => Some(labeled_rows),
                _ => None,
            })
            .collect()
    }

    pub fn retry_waits(&self) -> Vec<(usize, u32, FailureCategory, Duration)> {
        self.events()
            .into_iter()
            .filter_map(|event| match event {
                ProgressEvent::RetryScheduled {
                    row,
                    attempt,
                    category,
                    wait,
                    ..
                } => Some((row, attempt, category, wait)),
                _ => None,
            })
            .collect()
    }
}

impl ProgressSink for RecordingSink {
    fn emit(&self, event: ProgressEvent) {
        if let (ProgressEvent::Flushed { .. }, Some(path)) = (&event, &self.watched) {
            self.on_disk.lock().unwrap().push(labeled_rows_in(path));
        }
        self.events.lock().unwrap().push(event);
    }
}

pub fn labeled_rows_in(path: &Path) -> usize {
    let dataset = read_dataset(path).expect("readable output");
    let cols = dataset.label_columns().expect("label columns");
    dataset
        .labels(cols)
        .filter(|(code, name)| !code.is_empty() && !name.is_empty())
        .count()
}

pub fn fast_settings() -> ProcessorSettings {
    ProcessorSettings {
        text_column: Some("comment".to_string()),
        inter_row_delay: Duration::from_secs(3),
        flush: FlushSchedule::default(),
        retry: RetryPolicy::default(),
    }
}

pub fn processor(
    classifier: Arc<ScriptedClassifier>,
    sink: Arc<RecordingSink>,
    settings: ProcessorSettings,
) -> RowProcessor {
    RowProcessor::new(classifier, settings, sink)
}

/// Writes a CSV with an `id` and a `comment` column.
pub fn write_comments_csv(path: &Path, comments: &[&str]) {
    let mut writer = csv::Writer::from_path(path).unwrap();
    writer.write_record(["id", "comment"]).unwrap();
    for (idx, comment) in comments.iter().enumerate() {
        writer
            .write_record([(idx + 1).to_string().as_str(), comment])
            .unwrap();
    }
    writer.flush().unwrap();
}

pub fn comment_rows(count: usize) -> Vec<String> {
    (1..=count).map(|i| format!("comment number {i}")).collect()
}

pub fn read_file(path: &Path) -> Vec<u8> {
    fs::read(path).unwrap()
}
