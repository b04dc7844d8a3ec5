//! On-disk storage for uploaded resumes, served back under `/static/resumes`.

use std::path::{Path, PathBuf};

use anyhow::{bail, Context, Result};
use tracing::{info, warn};
use url::Url;
use uuid::Uuid;

use crate::errors::AppError;

/// A resume written to disk.
#[derive(Debug, Clone)]
pub struct StoredResume {
    /// `<uuid>_<sanitized original name>`; unique and used as the match key.
    pub filename: String,
    pub path: PathBuf,
}

#[derive(Debug, Clone)]
pub struct ResumeStorage {
    dir: PathBuf,
    public_base: Url,
}

impl ResumeStorage {
    /// Creates the upload directory if needed and validates the public base URL.
    pub async fn init(dir: impl Into<PathBuf>, public_base_url: &str) -> Result<Self> {
        let dir = dir.into();
        tokio::fs::create_dir_all(&dir)
            .await
            .with_context(|| format!("Failed to create upload directory {}", dir.display()))?;

        let public_base = Url::parse(public_base_url)
            .with_context(|| format!("PUBLIC_BASE_URL '{public_base_url}' is not a valid URL"))?;
        if public_base.cannot_be_a_base() {
            bail!("PUBLIC_BASE_URL '{public_base_url}' cannot be used as a base URL");
        }

        info!("Resume storage at {}", dir.display());
        Ok(Self { dir, public_base })
    }

    /// Writes an uploaded PDF under a unique name.
    pub async fn save(&self, original_name: &str, bytes: &[u8]) -> Result<StoredResume, AppError> {
        ensure_pdf(original_name)?;

        let filename = format!("{}_{}", Uuid::new_v4(), sanitize_filename(original_name));
        let path = self.dir.join(&filename);
        tokio::fs::write(&path, bytes)
            .await
            .map_err(|e| AppError::Storage(format!("Failed to write {}: {e}", path.display())))?;

        info!("Stored resume {} ({} bytes)", filename, bytes.len());
        Ok(StoredResume { filename, path })
    }

    /// Removes a stored upload that will not be analyzed. Failures are only logged.
    pub async fn discard(&self, stored: &StoredResume) {
        match tokio::fs::remove_file(&stored.path).await {
            Ok(()) => info!("Discarded upload {}", stored.filename),
            Err(e) => warn!("Failed to remove {}: {e}", stored.path.display()),
        }
    }

    /// Absolute, percent-encoded link to a stored resume.
    pub fn public_url(&self, filename: &str) -> String {
        let mut url = self.public_base.clone();
        if let Ok(mut segments) = url.path_segments_mut() {
            segments.pop_if_empty().extend(["static", "resumes", filename]);
        }
        url.to_string()
    }
}

/// Rejects anything that does not carry a `.pdf` extension.
pub fn ensure_pdf(filename: &str) -> Result<(), AppError> {
    if filename.to_lowercase().ends_with(".pdf") {
        Ok(())
    } else {
        Err(AppError::Validation("Only PDF files are supported.".to_string()))
    }
}

/// Keeps the base name and replaces anything outside `[A-Za-z0-9._-]` with `_`.
pub fn sanitize_filename(name: &str) -> String {
    let base = name.rsplit(['/', '\\']).next().unwrap_or(name);
    let cleaned: String = base
        .chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() || matches!(c, '.' | '-' | '_') {
                c
            } else {
                '_'
            }
        })
        .collect();
    let cleaned = cleaned.trim_start_matches('.');
    if cleaned.is_empty() {
        "resume.pdf".to_string()
    } else {
        cleaned.to_string()
    }
}

/// Human-readable name for a stored file: `3f2a..._jane-doe_cv.pdf` → `Jane Doe Cv`.
pub fn display_name(filename: &str) -> String {
    let name = filename
        .split_once('_')
        .map(|(_, rest)| rest)
        .filter(|rest| !rest.is_empty())
        .unwrap_or(filename);
    let stem = Path::new(name)
        .file_stem()
        .and_then(|s| s.to_str())
        .unwrap_or(name);

    stem.replace(['-', '_'], " ")
        .split_whitespace()
        .map(capitalize)
        .collect::<Vec<_>>()
        .join(" ")
}

fn capitalize(word: &str) -> String {
    let mut chars = word.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars.flat_map(char::to_lowercase)).collect(),
        None => String::new(),
    }
}
