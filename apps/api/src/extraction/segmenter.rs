//! Segmenter — lexical segmentation with part-of-speech tags.
//!
//! The service builds one `JiebaSegmenter` at startup and shares it as an
//! `Arc<dyn Segmenter>`. The loaded vocabulary is never mutated afterwards, so
//! concurrent extraction calls segment without locking.

use std::fs::File;
use std::io::{BufRead, BufReader};
use std::path::{Path, PathBuf};

use jieba_rs::Jieba;
use thiserror::Error;
use tracing::{debug, info};

/// One tagged unit of segmented text.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Segment {
    pub text: String,
    pub pos: String,
}

/// Failure while segmenting a single input.
#[derive(Debug, Error)]
pub enum SegmentError {
    // Not produced by the jieba backend, which cannot fail once loaded.
    #[allow(dead_code)]
    #[error("segmentation failed: {0}")]
    Failed(String),
}

/// Startup failure while loading the dictionary.
#[derive(Debug, Error)]
pub enum SegmenterError {
    #[error("no segmentation dictionary found (tried {primary:?} and {fallback:?})")]
    DictionaryNotFound { primary: PathBuf, fallback: PathBuf },

    #[error("failed to read dictionary {path:?}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("invalid dictionary {path:?}: {source}")]
    InvalidDictionary {
        path: PathBuf,
        #[source]
        source: jieba_rs::Error,
    },
}

/// Splits text into tagged segments.
///
/// `detailed` enables the slower pass that also recognises words missing from
/// the dictionary.
pub trait Segmenter: Send + Sync {
    fn segment(&self, text: &str, detailed: bool) -> Result<Vec<Segment>, SegmentError>;
}

/// Well-known dictionary locations, tried in order.
#[derive(Debug, Clone)]
pub struct DictionaryPaths {
    pub primary: PathBuf,
    /// Bundled dictionary used when `primary` is missing.
    pub fallback: PathBuf,
    /// Optional supplementary vocabulary layered over the main dictionary.
    pub user: PathBuf,
}

impl Default for DictionaryPaths {
    fn default() -> Self {
        DictionaryPaths {
            primary: PathBuf::from("default.dic"),
            fallback: PathBuf::from("dict.txt"),
            user: PathBuf::from("userdict.txt"),
        }
    }
}

pub struct JiebaSegmenter {
    jieba: Jieba,
}

impl JiebaSegmenter {
    /// Loads the main dictionary (primary, else fallback) and then the user
    /// dictionary if one exists.
    pub fn load(paths: &DictionaryPaths) -> Result<Self, SegmenterError> {
        let main = if paths.primary.is_file() {
            &paths.primary
        } else if paths.fallback.is_file() {
            info!(
                "Dictionary {:?} not found, falling back to {:?}",
                paths.primary, paths.fallback
            );
            &paths.fallback
        } else {
            return Err(SegmenterError::DictionaryNotFound {
                primary: paths.primary.clone(),
                fallback: paths.fallback.clone(),
            });
        };

        let mut jieba = Jieba::empty();
        load_into(&mut jieba, main)?;
        info!("Loaded segmentation dictionary {:?}", main);

        if paths.user.is_file() {
            load_into(&mut jieba, &paths.user)?;
            info!("Loaded user dictionary {:?}", paths.user);
        } else {
            debug!("No user dictionary at {:?}", paths.user);
        }

        Ok(JiebaSegmenter { jieba })
    }

    /// Builds a segmenter from in-memory dictionaries, in order.
    #[cfg(test)]
    pub fn from_readers<R: BufRead>(dicts: &mut [R]) -> Result<Self, jieba_rs::Error> {
        let mut jieba = Jieba::empty();
        for dict in dicts.iter_mut() {
            jieba.load_dict(dict)?;
        }
        Ok(JiebaSegmenter { jieba })
    }
}

fn load_into(jieba: &mut Jieba, path: &Path) -> Result<(), SegmenterError> {
    let file = File::open(path).map_err(|source| SegmenterError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    jieba
        .load_dict(&mut BufReader::new(file))
        .map_err(|source| SegmenterError::InvalidDictionary {
            path: path.to_path_buf(),
            source,
        })
}

impl Segmenter for JiebaSegmenter {
    fn segment(&self, text: &str, detailed: bool) -> Result<Vec<Segment>, SegmentError> {
        Ok(self
            .jieba
            .tag(text, detailed)
            .into_iter()
            .map(|tag| Segment {
                text: tag.word.to_string(),
                pos: tag.tag.to_string(),
            })
            .collect())
    }
}
