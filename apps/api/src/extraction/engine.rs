//! Extraction Engine — runs every registered field against one document.
//!
//! Each field is evaluated on its own and yields a `FieldOutcome`. A field
//! that errors or panics is logged and left out of the result; the remaining
//! fields are still computed, so callers always receive a (possibly partial)
//! mapping.

use std::any::Any;
use std::backtrace::Backtrace;
use std::cell::RefCell;
use std::collections::{BTreeMap, HashSet};
use std::panic::{self, AssertUnwindSafe};
use std::path::Path;
use std::sync::{Arc, LazyLock, Once};

use regex::Regex;
use serde::Serialize;
use thiserror::Error;
use tracing::{debug, error};

use crate::extraction::field::{Field, FieldPolicy};
use crate::extraction::registry::{PatternRegistry, NAME_PATTERN};
use crate::extraction::segmenter::{SegmentError, Segmenter};

static PHONE_SEPARATORS: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"[ -]+").unwrap());

static PANIC_TRACE_HOOK: Once = Once::new();

thread_local! {
    static LAST_PANIC_TRACE: RefCell<Option<String>> = const { RefCell::new(None) };
}

/// Chains a panic hook that records the panicking thread's backtrace so a
/// caught field panic can be logged with its trace.
fn install_panic_trace_hook() {
    PANIC_TRACE_HOOK.call_once(|| {
        let previous = panic::take_hook();
        panic::set_hook(Box::new(move |info| {
            let trace = Backtrace::force_capture().to_string();
            LAST_PANIC_TRACE.with(|slot| *slot.borrow_mut() = Some(trace));
            previous(info);
        }));
    });
}

fn take_panic_trace() -> Option<String> {
    LAST_PANIC_TRACE.with(|slot| slot.borrow_mut().take())
}

#[derive(Debug, Clone)]
pub struct ExtractOptions {
    /// POS tag marking a segment as an institution name.
    pub institution_tag: String,
    /// Passed through to the segmenter; enables out-of-vocabulary detection.
    pub detailed_segmentation: bool,
    pub separator: String,
}

impl Default for ExtractOptions {
    fn default() -> Self {
        ExtractOptions {
            institution_tag: "ntu".to_string(),
            detailed_segmentation: true,
            separator: ",".to_string(),
        }
    }
}

#[derive(Debug, Error)]
pub enum FieldError {
    #[error(transparent)]
    Segmentation(#[from] SegmentError),
}

/// Outcome of extracting one field.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FieldOutcome {
    Value(String),
    /// Nothing to report; the field is left out of the result.
    Absent,
    Failed(String),
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FieldFailure {
    pub field: Field,
    pub reason: String,
}

/// Aggregated result of one extraction call.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Extraction {
    pub fields: BTreeMap<String, String>,
    pub failures: Vec<FieldFailure>,
}

#[derive(Clone)]
pub struct Extractor {
    segmenter: Arc<dyn Segmenter>,
    options: ExtractOptions,
}

impl Extractor {
    pub fn new(segmenter: Arc<dyn Segmenter>, options: ExtractOptions) -> Self {
        install_panic_trace_hook();
        Extractor { segmenter, options }
    }

    pub fn extract(&self, filename: &str, text: &str, registry: &PatternRegistry) -> Extraction {
        let mut extraction = Extraction::default();

        for (field, pattern) in registry.iter() {
            match self.extract_field(field, pattern, filename, text) {
                FieldOutcome::Value(value) => {
                    extraction.fields.insert(field.to_string(), value);
                }
                FieldOutcome::Absent => {
                    debug!(field = %field, "No match");
                }
                FieldOutcome::Failed(reason) => {
                    extraction.failures.push(FieldFailure {
                        field: field.clone(),
                        reason,
                    });
                }
            }
        }

        extraction
    }

    /// Applies `field`'s policy, converting both errors and panics into
    /// `FieldOutcome::Failed`.
    pub fn extract_field(
        &self,
        field: &Field,
        pattern: &Regex,
        filename: &str,
        text: &str,
    ) -> FieldOutcome {
        take_panic_trace();
        let result = panic::catch_unwind(AssertUnwindSafe(|| {
            self.apply_policy(field, pattern, filename, text)
        }));

        match result {
            Ok(Ok(Some(value))) => FieldOutcome::Value(value),
            Ok(Ok(None)) => FieldOutcome::Absent,
            Ok(Err(e)) => {
                error!(field = %field, filename, "Field extraction failed: {e:?}");
                FieldOutcome::Failed(e.to_string())
            }
            Err(payload) => {
                let reason = panic_message(payload.as_ref());
                let trace = take_panic_trace().unwrap_or_else(|| "<no backtrace>".to_string());
                error!(field = %field, filename, "Field extraction panicked: {reason}\n{trace}");
                FieldOutcome::Failed(reason)
            }
        }
    }

    fn apply_policy(
        &self,
        field: &Field,
        pattern: &Regex,
        filename: &str,
        text: &str,
    ) -> Result<Option<String>, FieldError> {
        match field.policy() {
            FieldPolicy::FilenameCapture => {
                Ok(Some(capture_from_filename(&NAME_PATTERN, filename)))
            }
            FieldPolicy::FirstMatchStripped => Ok(Some(first_match_stripped(pattern, text))),
            FieldPolicy::InstitutionFiltered => self.institutions(pattern, text),
            FieldPolicy::JoinAll => Ok(Some(
                pattern
                    .find_iter(text)
                    .map(|m| m.as_str())
                    .collect::<Vec<_>>()
                    .join(&self.options.separator),
            )),
        }
    }

    /// Narrows school matches to institution-tagged segments, falling back to
    /// the deduplicated raw matches when segmentation tags none.
    fn institutions(&self, pattern: &Regex, text: &str) -> Result<Option<String>, FieldError> {
        let matches: Vec<&str> = pattern.find_iter(text).map(|m| m.as_str()).collect();
        if matches.is_empty() {
            return Ok(None);
        }

        let segments = self
            .segmenter
            .segment(&matches.join(" "), self.options.detailed_segmentation)?;
        let tagged = unique_in_order(
            segments
                .iter()
                .filter(|s| s.pos == self.options.institution_tag)
                .map(|s| s.text.as_str()),
        );

        let names = if tagged.is_empty() {
            debug!("No institution-tagged segments, using raw matches");
            unique_in_order(matches)
        } else {
            tagged
        };
        Ok(Some(names.join(&self.options.separator)))
    }
}

fn capture_from_filename(pattern: &Regex, filename: &str) -> String {
    let base = Path::new(filename)
        .file_name()
        .and_then(|name| name.to_str())
        .unwrap_or(filename);
    pattern
        .captures(base)
        .and_then(|caps| caps.get(1).or_else(|| caps.get(0)))
        .map(|m| m.as_str().to_string())
        .unwrap_or_default()
}

fn first_match_stripped(pattern: &Regex, text: &str) -> String {
    pattern
        .find(text)
        .map(|m| PHONE_SEPARATORS.replace_all(m.as_str(), "").into_owned())
        .unwrap_or_default()
}

/// Keeps the first occurrence of each exact string, preserving order.
fn unique_in_order<'a, I>(items: I) -> Vec<&'a str>
where
    I: IntoIterator<Item = &'a str>,
{
    let mut seen = HashSet::new();
    items.into_iter().filter(|item| seen.insert(*item)).collect()
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        (*s).to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "panic with non-string payload".to_string()
    }
}
