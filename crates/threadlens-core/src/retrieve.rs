//! Query-time retrieval over a [`Corpus`]: nearest-neighbor search,
//! URL deduplication, snippet truncation, and cited-URL fallback.
//!
//! # Algorithm
//!
//! 1. Search the index for the `top_k` nearest windows to the query vector.
//! 2. Walk hits best first. Normalize each window URL with
//!    [`normalize_url`]; skip the hit if that URL was already emitted.
//! 3. Truncate each emitted text to `snippet_chars` characters.
//! 4. If the raw query text mentions the URL of a window that was not
//!    itself returned, append the first such window with
//!    [`FALLBACK_SCORE`]. This check uses the window's own URL, so a cited
//!    subthread still surfaces when a sibling from the same topic ranked.

use std::collections::HashSet;

use anyhow::{ensure, Result};

use crate::index::FlatIndex;
use crate::models::{QueryResult, Window};
use crate::text::truncate_chars;

/// Score given to a window surfaced because the query cites its URL.
pub const FALLBACK_SCORE: f32 = 1.0;

/// Retrieval tuning parameters, decoupled from application config.
#[derive(Debug, Clone)]
pub struct RetrievalParams {
    /// Number of nearest neighbors to fetch.
    pub top_k: usize,
    /// Character budget for returned window text.
    pub snippet_chars: usize,
}

impl Default for RetrievalParams {
    fn default() -> Self {
        Self {
            top_k: 10,
            snippet_chars: 700,
        }
    }
}

/// The vector index and its window metadata, joined by position.
#[derive(Debug)]
pub struct Corpus {
    index: FlatIndex,
    windows: Vec<Window>,
}

impl Corpus {
    /// Pair an index with its windows. Fails if the counts differ.
    pub fn new(index: FlatIndex, windows: Vec<Window>) -> Result<Self> {
        ensure!(
            index.len() == windows.len(),
            "index holds {} vectors but metadata holds {} windows",
            index.len(),
            windows.len()
        );
        Ok(Self { index, windows })
    }

    pub fn index(&self) -> &FlatIndex {
        &self.index
    }

    pub fn windows(&self) -> &[Window] {
        &self.windows
    }

    pub fn len(&self) -> usize {
        self.windows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.windows.is_empty()
    }

    /// Retrieve results for `query` given its (unit-length) embedding.
    pub fn retrieve(
        &self,
        query: &str,
        query_vec: &[f32],
        params: &RetrievalParams,
    ) -> Result<Vec<QueryResult>> {
        let hits = self.index.search(query_vec, params.top_k)?;

        let mut emitted: HashSet<String> = HashSet::new();
        let mut returned: HashSet<usize> = HashSet::new();
        let mut results = Vec::with_capacity(hits.len() + 1);

        for hit in hits {
            let window = &self.windows[hit.position];
            if !emitted.insert(normalize_url(&window.url)) {
                continue;
            }
            returned.insert(hit.position);
            results.push(to_result(window, hit.score, params.snippet_chars));
        }

        if let Some(window) = self.cited_window(query, &returned) {
            results.push(to_result(window, FALLBACK_SCORE, params.snippet_chars));
        }

        Ok(results)
    }

    /// First window whose URL appears in `query` and that is not among the
    /// `returned` positions.
    fn cited_window(&self, query: &str, returned: &HashSet<usize>) -> Option<&Window> {
        self.windows
            .iter()
            .enumerate()
            .find(|(pos, w)| {
                !w.url.is_empty() && !returned.contains(pos) && mentions_url(query, &w.url)
            })
            .map(|(_, w)| w)
    }
}

fn to_result(window: &Window, score: f32, snippet_chars: usize) -> QueryResult {
    QueryResult {
        score,
        title: window.title.clone(),
        text: truncate_chars(&window.text, snippet_chars),
        url: window.url.clone(),
        source: window.source,
    }
}

/// Canonical form of a window URL used for deduplication.
///
/// Trailing slashes are dropped. Discourse reply links look like
/// `/t/<slug>/<topic_id>/<post_number>`; when the last two path segments
/// are both numeric, the last one (the reply anchor) is removed so every
/// reply on a topic collapses to the topic URL. A single trailing numeric
/// segment is kept, since it is the topic id itself.
///
/// ```rust
/// use threadlens_core::retrieve::normalize_url;
///
/// assert_eq!(
///     normalize_url("https://forum.example.org/t/uv-setup/4211/7"),
///     "https://forum.example.org/t/uv-setup/4211"
/// );
/// assert_eq!(
///     normalize_url("https://forum.example.org/t/uv-setup/4211"),
///     "https://forum.example.org/t/uv-setup/4211"
/// );
/// ```
pub fn normalize_url(url: &str) -> String {
    let trimmed = url.trim().trim_end_matches('/');
    if let Some((head, last)) = trimmed.rsplit_once('/') {
        if is_numeric(last) {
            if let Some((_, prev)) = head.rsplit_once('/') {
                if is_numeric(prev) {
                    return head.to_string();
                }
            }
        }
    }
    trimmed.to_string()
}

fn is_numeric(segment: &str) -> bool {
    !segment.is_empty() && segment.bytes().all(|b| b.is_ascii_digit())
}

/// True if `url` occurs in `text` and is not merely a prefix of a longer
/// word or number (so `/t/9` does not match inside `/t/91`).
fn mentions_url(text: &str, url: &str) -> bool {
    text.match_indices(url).any(|(start, m)| {
        text[start + m.len()..]
            .chars()
            .next()
            .map_or(true, |c| !c.is_alphanumeric() && c != '-' && c != '_')
    })
}
