use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::extraction::engine::FieldFailure;
use crate::extraction::registry::PatternError;

#[derive(Debug, Deserialize)]
pub struct ExtractRequest {
    pub filename: String,
    pub text: String,
    /// Keys are `exp-<field>` or a bare field name; values are raw patterns.
    #[serde(default)]
    pub overrides: BTreeMap<String, String>,
}

#[derive(Debug, Serialize)]
pub struct ExtractResponse {
    pub info: BTreeMap<String, String>,
    pub override_errors: Vec<PatternError>,
    pub failed_fields: Vec<FieldFailure>,
}

#[derive(Debug, Serialize)]
pub struct ConvertResponse {
    pub body: String,
    pub mime_type: String,
    pub msecs: u64,
    pub info: BTreeMap<String, String>,
    pub override_errors: Vec<PatternError>,
    pub failed_fields: Vec<FieldFailure>,
}
