//! Local course catalog stored in the `coursera` vector collection.

use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::{info, warn};

use super::{rating_suffix, CourseCandidate, CourseSource};
use crate::errors::AppError;
use crate::vector::store::{VectorStore, VectorStoreError};
use crate::vector::COURSE_COLLECTION;

/// A course as accepted by `POST /courses`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CourseRecord {
    pub title: String,
    pub url: String,
    #[serde(default)]
    pub institution: String,
    #[serde(default)]
    pub rating: String,
    #[serde(default)]
    pub description: String,
}

impl CourseRecord {
    pub fn validate(&self) -> Result<(), AppError> {
        if self.title.trim().is_empty() {
            return Err(AppError::Validation("title cannot be empty".to_string()));
        }
        if self.url.trim().is_empty() {
            return Err(AppError::Validation("url cannot be empty".to_string()));
        }
        Ok(())
    }

    /// Text that gets embedded: title, institution and description.
    fn embedding_text(&self) -> String {
        format!("{} {} {}", self.title, self.institution, self.description)
            .trim()
            .to_string()
    }

    fn meta(&self) -> Value {
        serde_json::to_value(CourseMeta {
            title: self.title.clone(),
            url: self.url.clone(),
            institution: self.institution.clone(),
            rating: self.rating.clone(),
            kind: "coursera".to_string(),
        })
        .unwrap_or(Value::Null)
    }
}

/// Metadata stored next to each catalog vector.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct CourseMeta {
    pub title: String,
    pub url: String,
    pub institution: String,
    pub rating: String,
    #[serde(rename = "type")]
    pub kind: String,
}

/// One entry of a scraper export. Every field is optional; `into_record`
/// decides whether the entry is usable.
#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct ScrapedCourse {
    pub title: String,
    pub url: String,
    pub institution: String,
    pub instructor: String,
    pub platform: String,
    pub description: String,
    pub rating: Value,
}

impl ScrapedCourse {
    /// `None` when title or url is missing. Institution falls back to the
    /// instructor, then the platform.
    pub fn into_record(self) -> Option<CourseRecord> {
        let title = self.title.trim();
        let url = self.url.trim();
        if title.is_empty() || url.is_empty() {
            return None;
        }

        let institution = [&self.institution, &self.instructor, &self.platform]
            .into_iter()
            .map(|s| s.trim())
            .find(|s| !s.is_empty())
            .unwrap_or_default();

        Some(CourseRecord {
            title: title.to_string(),
            url: url.to_string(),
            institution: institution.to_string(),
            rating: rating_text(&self.rating),
            description: self.description.trim().to_string(),
        })
    }
}

/// Scrapers emit `0.0` for "no rating"; that renders as empty.
fn rating_text(rating: &Value) -> String {
    match rating {
        Value::Number(n) if n.as_f64().is_some_and(|v| v > 0.0) => n.to_string(),
        Value::String(s) => s.trim().to_string(),
        _ => String::new(),
    }
}

#[derive(Debug, Default, Clone, PartialEq, Serialize)]
pub struct ImportSummary {
    pub added: usize,
    pub skipped: usize,
}

pub async fn add_course(store: &VectorStore, course: &CourseRecord) -> Result<(), VectorStoreError> {
    store
        .add(COURSE_COLLECTION, &course.embedding_text(), course.meta())
        .await?;
    info!("Added course '{}' to the catalog", course.title);
    Ok(())
}

/// Bulk-loads a scraper export. Entries that are not objects or lack a title
/// or url are skipped; the rest are embedded and written in one batch.
pub async fn import_courses(
    store: &VectorStore,
    entries: Vec<Value>,
) -> Result<ImportSummary, VectorStoreError> {
    let total = entries.len();
    let records: Vec<CourseRecord> = entries
        .into_iter()
        .enumerate()
        .filter_map(|(i, entry)| {
            let record = serde_json::from_value::<ScrapedCourse>(entry)
                .ok()
                .and_then(ScrapedCourse::into_record);
            if record.is_none() {
                warn!("Skipping course entry {}: not an object or missing title/url", i + 1);
            }
            record
        })
        .collect();

    let items = records
        .iter()
        .map(|r| (r.embedding_text(), r.meta()))
        .collect();
    let added = store.add_batch(COURSE_COLLECTION, items).await?;

    let summary = ImportSummary {
        added,
        skipped: total - records.len(),
    };
    info!("Imported {} course(s), skipped {}", summary.added, summary.skipped);
    Ok(summary)
}

/// Every catalog entry in insertion order.
pub async fn list_courses(store: &VectorStore) -> Result<Vec<CourseMeta>, VectorStoreError> {
    let corpus = store.corpus(COURSE_COLLECTION).await?;
    Ok(corpus
        .into_iter()
        .map(|(_, meta)| serde_json::from_value(meta).unwrap_or_default())
        .collect())
}

/// Catalog courses most similar to `query`.
pub async fn search_catalog(
    store: &VectorStore,
    query: &str,
    top_k: usize,
) -> Result<Vec<CourseCandidate>, VectorStoreError> {
    let hits = store.search(COURSE_COLLECTION, query, top_k).await?;
    Ok(hits
        .into_iter()
        .map(|hit| {
            let meta: CourseMeta = serde_json::from_value(hit.meta).unwrap_or_default();
            CourseCandidate {
                description: format!("Coursera course: {}", meta.title),
                title: meta.title,
                url: meta.url,
                institution: meta.institution,
                rating: meta.rating,
                source: CourseSource::Coursera,
                similarity: hit.similarity,
            }
        })
        .collect())
}

/// Markdown list used by the basic (unranked) recommendation path.
pub fn format_catalog_courses(courses: &[CourseCandidate]) -> String {
    if courses.is_empty() {
        return "No relevant Coursera courses found.".to_string();
    }

    let mut out = String::from("**Coursera Courses:**\n\n");
    for (i, course) in courses.iter().enumerate() {
        out.push_str(&format!(
            "{}. [{}]({})\n   {}{} - **{:.1}% Match**\n\n",
            i + 1,
            course.title,
            course.url,
            course.institution,
            rating_suffix(&course.rating),
            course.similarity * 100.0
        ));
    }
    out.trim().to_string()
}
