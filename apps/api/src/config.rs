use std::path::PathBuf;
use std::str::FromStr;

use anyhow::{Context, Result};

use crate::extraction::engine::ExtractOptions;
use crate::extraction::segmenter::DictionaryPaths;

/// Application configuration loaded from environment variables.
/// Every variable has a default; malformed values fail startup.
#[derive(Debug, Clone)]
pub struct Config {
    pub port: u16,
    pub rust_log: String,
    pub dict_path: PathBuf,
    pub dict_fallback_path: PathBuf,
    pub user_dict_path: PathBuf,
    pub institution_tag: String,
    pub segment_hmm: bool,
    pub max_upload_bytes: usize,
}

impl Config {
    pub fn from_env() -> Result<Self> {
        dotenvy::dotenv().ok(); // load .env if present; ignore if missing

        Ok(Config {
            port: parse_env("PORT", 8888)?,
            rust_log: env_or("RUST_LOG", "info"),
            dict_path: env_or("DICT_PATH", "default.dic").into(),
            dict_fallback_path: env_or("DICT_FALLBACK_PATH", "dict.txt").into(),
            user_dict_path: env_or("USER_DICT_PATH", "userdict.txt").into(),
            institution_tag: env_or("INSTITUTION_TAG", "ntu"),
            segment_hmm: parse_env("SEGMENT_HMM", true)?,
            max_upload_bytes: parse_env("MAX_UPLOAD_BYTES", 20 * 1024 * 1024)?,
        })
    }

    pub fn dictionary_paths(&self) -> DictionaryPaths {
        DictionaryPaths {
            primary: self.dict_path.clone(),
            fallback: self.dict_fallback_path.clone(),
            user: self.user_dict_path.clone(),
        }
    }

    pub fn extract_options(&self) -> ExtractOptions {
        ExtractOptions {
            institution_tag: self.institution_tag.clone(),
            detailed_segmentation: self.segment_hmm,
            ..ExtractOptions::default()
        }
    }
}

fn env_or(key: &str, default: &str) -> String {
    std::env::var(key).unwrap_or_else(|_| default.to_string())
}

fn parse_env<T>(key: &str, default: T) -> Result<T>
where
    T: FromStr,
    T::Err: std::error::Error + Send + Sync + 'static,
{
    match std::env::var(key) {
        Ok(raw) => raw
            .trim()
            .parse::<T>()
            .with_context(|| format!("Environment variable '{key}' has an invalid value '{raw}'")),
        Err(_) => Ok(default),
    }
}
