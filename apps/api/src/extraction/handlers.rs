use std::collections::BTreeMap;
use std::time::Instant;

use anyhow::anyhow;
use axum::{
    extract::{Multipart, State},
    Json,
};
use bytes::Bytes;
use tracing::info;

use crate::errors::AppError;
use crate::extraction::convert::to_text;
use crate::extraction::registry::{
    build_registry, collect_overrides, strip_override_prefix, OVERRIDE_PREFIX,
};
use crate::models::extraction::{ConvertResponse, ExtractRequest, ExtractResponse};
use crate::state::AppState;

/// Multipart part carrying the uploaded document.
const INPUT_PART: &str = "input";

struct Upload {
    filename: String,
    content_type: Option<String>,
    data: Bytes,
}

/// POST /api/v1/extract
pub async fn handle_extract(
    State(state): State<AppState>,
    Json(req): Json<ExtractRequest>,
) -> Result<Json<ExtractResponse>, AppError> {
    let overrides = normalize_overrides(req.overrides);
    let extractor = state.extractor.clone();

    let (override_errors, extraction) = tokio::task::spawn_blocking(move || {
        let build = build_registry(&overrides);
        let extraction = extractor.extract(&req.filename, &req.text, &build.registry);
        (build.errors, extraction)
    })
    .await
    .map_err(|e| AppError::Internal(anyhow!("extraction task failed: {e}")))?;

    Ok(Json(ExtractResponse {
        info: extraction.fields,
        override_errors,
        failed_fields: extraction.failures,
    }))
}

/// POST /convert
///
/// Multipart upload: the document in `input`, pattern overrides as
/// `exp-<field>` text parts.
pub async fn handle_convert(
    State(state): State<AppState>,
    mut multipart: Multipart,
) -> Result<Json<ConvertResponse>, AppError> {
    let mut upload = None;
    let mut form = Vec::new();

    while let Some(field) = multipart.next_field().await? {
        let name = field.name().unwrap_or_default().to_string();
        if name == INPUT_PART {
            let filename = field.file_name().unwrap_or_default().to_string();
            let content_type = field.content_type().map(str::to_string);
            let data = field.bytes().await?;
            upload = Some(Upload {
                filename,
                content_type,
                data,
            });
        } else {
            let value = field.text().await?;
            form.push((name, value));
        }
    }

    let upload = upload.ok_or_else(|| {
        AppError::Validation(format!("could not get input file: missing '{INPUT_PART}' part"))
    })?;
    let content_type = upload.content_type.ok_or_else(|| {
        AppError::UnprocessableEntity(format!(
            "input file {} does not have a Content-Type header",
            upload.filename
        ))
    })?;
    info!("Received file: {} ({})", upload.filename, content_type);

    let overrides = collect_overrides(form);
    let extractor = state.extractor.clone();
    let filename = upload.filename;
    let data = upload.data;

    let response = tokio::task::spawn_blocking(move || {
        let started = Instant::now();
        let document = to_text(&filename, &content_type, &data)?;
        let msecs = started.elapsed().as_millis() as u64;

        let build = build_registry(&overrides);
        let extraction = extractor.extract(&filename, &document.body, &build.registry);

        Ok::<_, AppError>(ConvertResponse {
            body: document.body,
            mime_type: document.mime_type,
            msecs,
            info: extraction.fields,
            override_errors: build.errors,
            failed_fields: extraction.failures,
        })
    })
    .await
    .map_err(|e| {
        if e.is_panic() {
            AppError::UnprocessableEntity("could not convert file".to_string())
        } else {
            AppError::Internal(anyhow!("conversion task failed: {e}"))
        }
    })??;

    Ok(Json(response))
}

/// Accepts both `exp-<field>` and bare field names; blank patterns are skipped.
fn normalize_overrides(raw: BTreeMap<String, String>) -> BTreeMap<String, String> {
    raw.into_iter()
        .filter(|(_, pattern)| !pattern.trim().is_empty())
        .filter_map(|(key, pattern)| {
            let name = if key.starts_with(OVERRIDE_PREFIX) {
                strip_override_prefix(&key)?
            } else {
                key.trim()
            };
            (!name.is_empty()).then(|| (name.to_string(), pattern))
        })
        .collect()
}
