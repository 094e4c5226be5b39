//! Core data models shared by the build and query pipelines.
//!
//! [`Post`] and [`DocChunk`] are the raw corpus records produced by the
//! external scrapers. [`Window`] is the unit stored in the index, and
//! [`QueryResult`] is what retrieval hands back to callers.

use serde::{Deserialize, Serialize};

/// A single forum post as exported by the Discourse scraper.
///
/// Unknown fields in the export (author, timestamps, likes) are ignored.
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct Post {
    pub topic_id: u64,
    #[serde(default)]
    pub topic_title: String,
    pub post_number: u64,
    #[serde(default)]
    pub content: String,
    /// Post number this post replies to, if any.
    #[serde(default)]
    pub reply_to_post_number: Option<u64>,
    #[serde(default)]
    pub url: Option<String>,
}

/// A documentation page converted to markdown by the site crawler.
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct DocChunk {
    pub chunk: String,
    pub original_url: String,
}

/// Where a [`Window`] came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Deserialize, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum WindowSource {
    Discourse,
    Markdown,
}

impl WindowSource {
    pub fn as_str(&self) -> &'static str {
        match self {
            WindowSource::Discourse => "discourse",
            WindowSource::Markdown => "markdown",
        }
    }
}

/// One retrievable unit of text plus its metadata.
///
/// Windows are stored in the metadata file in the same order as their
/// vectors in the index; the array position is the only join key.
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct Window {
    /// Composed text used for embedding and returned as context.
    pub text: String,
    pub title: String,
    pub topic_id: String,
    /// Canonical URL of the window.
    pub url: String,
    pub source: WindowSource,
    /// Root post of the subthread (discourse windows only).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub root_post_number: Option<u64>,
    /// Every post in the subthread, in traversal order (discourse windows only).
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub post_numbers: Vec<u64>,
}

/// A single retrieval hit.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct QueryResult {
    /// Inner-product similarity; higher is better.
    pub score: f32,
    pub title: String,
    /// Window text, truncated to the configured character budget.
    pub text: String,
    pub url: String,
    pub source: WindowSource,
}
