//! Retrieved documents and their metadata.
//!
//! Documents arrive from an external retrieval layer with a loosely shaped
//! metadata bag. Fields that several upstream sources spell differently
//! (relevance scores, timestamps) are read through ordered accessor lists:
//! the first field that holds a usable value wins.

use chrono::{DateTime, NaiveDate, NaiveDateTime, Utc};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

/// A retrieved document.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Document {
    #[serde(rename = "pageContent", default)]
    pub page_content: String,

    #[serde(default)]
    pub metadata: DocumentMetadata,
}

impl Document {
    pub fn new(page_content: impl Into<String>) -> Self {
        Self {
            page_content: page_content.into(),
            metadata: DocumentMetadata::default(),
        }
    }

    pub fn with_id(mut self, id: impl Into<String>) -> Self {
        self.metadata.id = Some(id.into());
        self
    }

    pub fn with_title(mut self, title: impl Into<String>) -> Self {
        self.metadata.title = Some(title.into());
        self
    }

    pub fn with_source(mut self, source: impl Into<String>) -> Self {
        self.metadata.source = Some(source.into());
        self
    }

    pub fn with_score(mut self, score: f64) -> Self {
        self.metadata.score = Some(score);
        self
    }

    pub fn with_entity_type(mut self, entity_type: impl Into<String>) -> Self {
        self.metadata.entity_type = Some(entity_type.into());
        self
    }

    pub fn with_timestamp(mut self, field: TimestampField, value: TimestampValue) -> Self {
        field.write(&mut self.metadata, value);
        self
    }

    /// Hex SHA-256 of the page content. Identifies documents without an id.
    pub fn content_hash(&self) -> String {
        hex::encode(Sha256::digest(self.page_content.as_bytes()))
    }

    /// Key used for deduplication: the stable id when present, otherwise
    /// the content hash.
    pub fn dedup_key(&self) -> String {
        match self.metadata.id.as_deref() {
            Some(id) if !id.is_empty() => id.to_string(),
            _ => self.content_hash(),
        }
    }

    /// Header line for rendering: `[title]` when a title or name exists,
    /// otherwise `Source: <source>` when any source-like field exists.
    pub fn header(&self) -> Option<String> {
        let meta = &self.metadata;
        if let Some(title) = non_empty(&meta.title).or_else(|| non_empty(&meta.name)) {
            return Some(format!("[{title}]"));
        }
        non_empty(&meta.source)
            .or_else(|| non_empty(&meta.url))
            .or_else(|| non_empty(&meta.collection))
            .map(|source| format!("Source: {source}"))
    }
}

fn non_empty(value: &Option<String>) -> Option<&str> {
    value.as_deref().filter(|s| !s.trim().is_empty())
}

/// Structured view over a document's metadata bag.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DocumentMetadata {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub source: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub collection: Option<String>,

    /// Entity marker, e.g. `repository_file` or `github_commit`.
    #[serde(default, alias = "__type", skip_serializing_if = "Option::is_none")]
    pub entity_type: Option<String>,
    #[serde(default, alias = "extension", skip_serializing_if = "Option::is_none")]
    pub file_extension: Option<String>,

    // Score-like fields, see `ScoreField`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub score: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub relevance_score: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub similarity: Option<f64>,
    #[serde(default, rename = "_score", skip_serializing_if = "Option::is_none")]
    pub raw_score: Option<f64>,

    // Timestamp-like fields, see `TimestampField`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub created_at: Option<TimestampValue>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub updated_at: Option<TimestampValue>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub played_at: Option<TimestampValue>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub merged_at: Option<TimestampValue>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub pushed_at: Option<TimestampValue>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub timestamp: Option<TimestampValue>,

    /// Set by the reranker on every document it returns.
    #[serde(flatten)]
    pub rerank: Option<RerankAnnotation>,

    /// Everything else, passed through untouched.
    #[serde(flatten)]
    pub extra: serde_json::Map<String, serde_json::Value>,
}

impl DocumentMetadata {
    /// First usable score-like field, unclamped.
    pub fn relevance_score(&self) -> Option<f64> {
        ScoreField::LOOKUP_ORDER
            .iter()
            .find_map(|field| field.read(self))
    }

    /// First parsable timestamp-like field, as epoch milliseconds.
    pub fn timestamp_millis(&self) -> Option<i64> {
        TimestampField::LOOKUP_ORDER
            .iter()
            .find_map(|field| field.read(self))
    }

    /// The document's entity type: an explicit known type, else
    /// `RepositoryFile` when a file extension is present, else `None`.
    pub fn inferred_entity_type(&self) -> Option<EntityType> {
        if let Some(kind) = self.entity_type.as_deref().and_then(EntityType::parse) {
            return Some(kind);
        }
        non_empty(&self.file_extension).map(|_| EntityType::RepositoryFile)
    }
}

/// Scores written by the reranker.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RerankAnnotation {
    /// Final score scaled to 0–10 for display.
    pub rerank_score: f64,
    pub keyword_score: f64,
    pub vector_score: f64,
    pub recency_score: f64,
    /// Zero-based position after reranking.
    pub rerank_rank: usize,
    pub was_reranked: bool,
}

/// Score-like metadata fields, in lookup order.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScoreField {
    Score,
    RelevanceScore,
    Similarity,
    RawScore,
}

impl ScoreField {
    pub const LOOKUP_ORDER: [ScoreField; 4] = [
        ScoreField::Score,
        ScoreField::RelevanceScore,
        ScoreField::Similarity,
        ScoreField::RawScore,
    ];

    pub fn key(self) -> &'static str {
        match self {
            ScoreField::Score => "score",
            ScoreField::RelevanceScore => "relevanceScore",
            ScoreField::Similarity => "similarity",
            ScoreField::RawScore => "_score",
        }
    }

    /// The field's value if present and finite.
    pub fn read(self, meta: &DocumentMetadata) -> Option<f64> {
        let value = match self {
            ScoreField::Score => meta.score,
            ScoreField::RelevanceScore => meta.relevance_score,
            ScoreField::Similarity => meta.similarity,
            ScoreField::RawScore => meta.raw_score,
        };
        value.filter(|v| v.is_finite())
    }
}

/// Timestamp-like metadata fields, in lookup order.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TimestampField {
    CreatedAt,
    UpdatedAt,
    PlayedAt,
    MergedAt,
    PushedAt,
    Timestamp,
}

impl TimestampField {
    pub const LOOKUP_ORDER: [TimestampField; 6] = [
        TimestampField::CreatedAt,
        TimestampField::UpdatedAt,
        TimestampField::PlayedAt,
        TimestampField::MergedAt,
        TimestampField::PushedAt,
        TimestampField::Timestamp,
    ];

    fn slot(self, meta: &DocumentMetadata) -> &Option<TimestampValue> {
        match self {
            TimestampField::CreatedAt => &meta.created_at,
            TimestampField::UpdatedAt => &meta.updated_at,
            TimestampField::PlayedAt => &meta.played_at,
            TimestampField::MergedAt => &meta.merged_at,
            TimestampField::PushedAt => &meta.pushed_at,
            TimestampField::Timestamp => &meta.timestamp,
        }
    }

    fn write(self, meta: &mut DocumentMetadata, value: TimestampValue) {
        let slot = match self {
            TimestampField::CreatedAt => &mut meta.created_at,
            TimestampField::UpdatedAt => &mut meta.updated_at,
            TimestampField::PlayedAt => &mut meta.played_at,
            TimestampField::MergedAt => &mut meta.merged_at,
            TimestampField::PushedAt => &mut meta.pushed_at,
            TimestampField::Timestamp => &mut meta.timestamp,
        };
        *slot = Some(value);
    }

    /// The field's value as epoch milliseconds, if present and parsable.
    pub fn read(self, meta: &DocumentMetadata) -> Option<i64> {
        self.slot(meta).as_ref().and_then(TimestampValue::epoch_millis)
    }
}

/// A timestamp as upstream sources deliver it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum TimestampValue {
    /// Epoch milliseconds.
    Millis(f64),
    /// A native date value.
    Date(DateTime<Utc>),
    /// Any other textual date.
    Text(String),
}

impl TimestampValue {
    /// Epoch milliseconds, or `None` for empty, zero, non-finite,
    /// unparsable or out-of-range values.
    pub fn epoch_millis(&self) -> Option<i64> {
        match self {
            TimestampValue::Millis(ms) if ms.is_finite() && *ms != 0.0 => {
                DateTime::<Utc>::from_timestamp_millis(*ms as i64).map(|date| date.timestamp_millis())
            }
            TimestampValue::Millis(_) => None,
            TimestampValue::Date(date) => Some(date.timestamp_millis()),
            TimestampValue::Text(text) => parse_date_text(text.trim()),
        }
    }
}

fn parse_date_text(text: &str) -> Option<i64> {
    if text.is_empty() {
        return None;
    }
    if let Ok(date) = DateTime::parse_from_rfc3339(text) {
        return Some(date.timestamp_millis());
    }
    if let Ok(date) = DateTime::parse_from_rfc2822(text) {
        return Some(date.timestamp_millis());
    }
    for format in ["%Y-%m-%dT%H:%M:%S%.f", "%Y-%m-%d %H:%M:%S%.f"] {
        if let Ok(naive) = NaiveDateTime::parse_from_str(text, format) {
            return Some(naive.and_utc().timestamp_millis());
        }
    }
    NaiveDate::parse_from_str(text, "%Y-%m-%d")
        .ok()
        .and_then(|date| date.and_hms_opt(0, 0, 0))
        .map(|naive| naive.and_utc().timestamp_millis())
}

/// Known kinds of retrieved entities.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EntityType {
    RepositoryFile,
    Commit,
    PullRequest,
    Repository,
    Issue,
    Track,
    Playlist,
    Page,
    Message,
    CalendarEvent,
}

impl EntityType {
    /// Parse a type marker. Accepts bare kinds (`commit`) and
    /// vendor-qualified kinds (`github_commit`, `github_file`).
    pub fn parse(raw: &str) -> Option<Self> {
        let raw = raw.trim().to_ascii_lowercase();
        Self::from_kind(&raw).or_else(|| {
            raw.split_once('_')
                .and_then(|(_vendor, kind)| Self::from_kind(kind))
        })
    }

    fn from_kind(kind: &str) -> Option<Self> {
        let parsed = match kind {
            "repository_file" | "file" => EntityType::RepositoryFile,
            "commit" => EntityType::Commit,
            "pull_request" => EntityType::PullRequest,
            "repository" => EntityType::Repository,
            "issue" => EntityType::Issue,
            "track" => EntityType::Track,
            "playlist" => EntityType::Playlist,
            "page" => EntityType::Page,
            "message" => EntityType::Message,
            "calendar_event" | "event" => EntityType::CalendarEvent,
            _ => return None,
        };
        Some(parsed)
    }

    /// Source-code entities get the code-aware tokenizer.
    pub fn is_code(self) -> bool {
        matches!(
            self,
            EntityType::RepositoryFile
                | EntityType::Commit
                | EntityType::PullRequest
                | EntityType::Repository
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn score_lookup_first_present_wins() {
        let meta = DocumentMetadata {
            similarity: Some(0.4),
            raw_score: Some(0.9),
            ..Default::default()
        };
        assert_eq!(meta.relevance_score(), Some(0.4));

        let meta = DocumentMetadata {
            score: Some(0.7),
            similarity: Some(0.4),
            ..Default::default()
        };
        assert_eq!(meta.relevance_score(), Some(0.7));
    }

    #[test]
    fn non_finite_score_is_skipped() {
        let meta = DocumentMetadata {
            score: Some(f64::NAN),
            relevance_score: Some(0.3),
            ..Default::default()
        };
        assert_eq!(meta.relevance_score(), Some(0.3));
    }

    #[test]
    fn timestamp_lookup_skips_unparsable_fields() {
        let meta = DocumentMetadata {
            created_at: Some(TimestampValue::Text("not a date".into())),
            merged_at: Some(TimestampValue::Text("2024-03-01T12:00:00Z".into())),
            ..Default::default()
        };
        let expected = DateTime::parse_from_rfc3339("2024-03-01T12:00:00Z")
            .unwrap()
            .timestamp_millis();
        assert_eq!(meta.timestamp_millis(), Some(expected));
    }

    #[test]
    fn timestamp_value_variants() {
        assert_eq!(TimestampValue::Millis(1_700_000_000_000.0).epoch_millis(), Some(1_700_000_000_000));
        assert_eq!(TimestampValue::Millis(0.0).epoch_millis(), None);
        assert_eq!(TimestampValue::Millis(f64::INFINITY).epoch_millis(), None);
        assert_eq!(TimestampValue::Millis(-1e300).epoch_millis(), None);
        assert_eq!(TimestampValue::Millis(1e300).epoch_millis(), None);
        assert_eq!(TimestampValue::Text(String::new()).epoch_millis(), None);
        assert!(TimestampValue::Text("2024-01-15".into()).epoch_millis().is_some());
        let now = Utc::now();
        assert_eq!(TimestampValue::Date(now).epoch_millis(), Some(now.timestamp_millis()));
    }

    #[test]
    fn metadata_deserializes_upstream_keys() {
        let json = serde_json::json!({
            "id": "doc-1",
            "__type": "github_commit",
            "relevanceScore": 0.8,
            "_score": 0.1,
            "pushedAt": 1_700_000_000_000_i64,
            "author": "octocat"
        });
        let meta: DocumentMetadata = serde_json::from_value(json).unwrap();
        assert_eq!(meta.id.as_deref(), Some("doc-1"));
        assert_eq!(meta.entity_type.as_deref(), Some("github_commit"));
        assert_eq!(meta.relevance_score, Some(0.8));
        assert_eq!(meta.raw_score, Some(0.1));
        assert_eq!(meta.timestamp_millis(), Some(1_700_000_000_000));
        assert_eq!(meta.extra.get("author"), Some(&serde_json::json!("octocat")));
        assert!(meta.rerank.is_none());
    }

    #[test]
    fn entity_type_parsing() {
        assert_eq!(EntityType::parse("repository_file"), Some(EntityType::RepositoryFile));
        assert_eq!(EntityType::parse("github_file"), Some(EntityType::RepositoryFile));
        assert_eq!(EntityType::parse("github_pull_request"), Some(EntityType::PullRequest));
        assert_eq!(EntityType::parse("spotify_track"), Some(EntityType::Track));
        assert_eq!(EntityType::parse("mystery"), None);
        assert!(EntityType::Commit.is_code());
        assert!(!EntityType::Track.is_code());
    }

    #[test]
    fn file_extension_implies_repository_file() {
        let meta = DocumentMetadata {
            file_extension: Some("rs".into()),
            ..Default::default()
        };
        assert_eq!(meta.inferred_entity_type(), Some(EntityType::RepositoryFile));

        let meta = DocumentMetadata {
            entity_type: Some("unknown_kind".into()),
            ..Default::default()
        };
        assert_eq!(meta.inferred_entity_type(), None);
    }

    #[test]
    fn header_prefers_title_then_source() {
        let doc = Document::new("body").with_title("Doc 1").with_source("notion");
        assert_eq!(doc.header().as_deref(), Some("[Doc 1]"));

        let doc = Document::new("body").with_source("notion");
        assert_eq!(doc.header().as_deref(), Some("Source: notion"));

        assert_eq!(Document::new("body").header(), None);
    }

    #[test]
    fn dedup_key_falls_back_to_content_hash() {
        let a = Document::new("Same Content");
        let b = Document::new("Same Content");
        assert_eq!(a.dedup_key(), b.dedup_key());
        assert_eq!(a.dedup_key().len(), 64);

        let c = Document::new("Same Content").with_id("x");
        assert_eq!(c.dedup_key(), "x");
    }
}
