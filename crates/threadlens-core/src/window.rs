//! Corpus unit assembly: turning subthreads and documentation pages into
//! [`Window`]s.
//!
//! Discourse windows carry a `Topic title:` header followed by every post
//! of the subthread, cleaned and separated by [`POST_SEPARATOR`].
//! Markdown windows carry the page text as-is, a placeholder title and
//! topic id, and the page's own URL.

use crate::models::{DocChunk, Post, Window, WindowSource};
use crate::text::clean_text;
use crate::thread::{group_topics, topic_subthreads, ReplyGraph};

/// Delimiter placed between posts of a subthread.
pub const POST_SEPARATOR: &str = "\n\n---\n\n";

/// Placeholder topic id assigned to documentation windows.
pub const DOCS_TOPIC_ID: &str = "md";

/// Settings that shape window text and URLs.
#[derive(Debug, Clone)]
pub struct AssembleOptions {
    /// Forum base URL used when a root post has no URL of its own.
    pub base_url: String,
    /// Title given to every documentation window.
    pub docs_title: String,
}

/// Why an input record did not become a window.
#[derive(Debug, Clone, PartialEq)]
pub enum SkipReason {
    /// Subthread whose posts are all blank.
    EmptySubthread { topic_id: u64, root_post_number: u64 },
    /// Documentation chunk with no text.
    EmptyChunk { url: String },
    /// Documentation chunk with no source URL.
    MissingUrl,
}

/// A post that had to be promoted to a root, could not be reached at all,
/// or repeated an earlier post number.
#[derive(Debug, Clone, PartialEq)]
pub struct ThreadAnomaly {
    pub topic_id: u64,
    pub post_number: u64,
}

/// Result of assembling the whole corpus.
#[derive(Debug, Default)]
pub struct Assembly {
    /// Windows in index order: discourse first, then markdown.
    pub windows: Vec<Window>,
    pub topics: usize,
    pub discourse_windows: usize,
    pub markdown_windows: usize,
    pub skipped: Vec<SkipReason>,
    pub promoted_orphans: Vec<ThreadAnomaly>,
    pub unreachable: Vec<ThreadAnomaly>,
    /// Later copies of a repeated post number, left out of every window.
    pub duplicates: Vec<ThreadAnomaly>,
}

/// Build the URL for a discourse window.
///
/// Uses the root post's URL when present and non-empty, otherwise
/// `{base}/t/{topic_id}/{root_post_number}`.
pub fn subthread_url(base_url: &str, root: &Post) -> String {
    match root.url.as_deref().map(str::trim) {
        Some(url) if !url.is_empty() => url.to_string(),
        _ => format!(
            "{}/t/{}/{}",
            base_url.trim_end_matches('/'),
            root.topic_id,
            root.post_number
        ),
    }
}

/// Compose one window from a subthread. Returns `None` if every post is blank.
pub fn subthread_window(topic_title: &str, subthread: &[&Post], base_url: &str) -> Option<Window> {
    let root = subthread.first()?;

    let bodies: Vec<String> = subthread
        .iter()
        .map(|p| clean_text(&p.content))
        .filter(|c| !c.is_empty())
        .collect();
    if bodies.is_empty() {
        return None;
    }

    let mut text = format!("Topic title: {}\n\n", topic_title);
    text.push_str(&bodies.join(POST_SEPARATOR));

    Some(Window {
        text,
        title: topic_title.to_string(),
        topic_id: root.topic_id.to_string(),
        url: subthread_url(base_url, root),
        source: WindowSource::Discourse,
        root_post_number: Some(root.post_number),
        post_numbers: subthread.iter().map(|p| p.post_number).collect(),
    })
}

/// Compose a window from a documentation chunk.
pub fn doc_window(chunk: &DocChunk, docs_title: &str) -> Result<Window, SkipReason> {
    let url = chunk.original_url.trim();
    if url.is_empty() {
        return Err(SkipReason::MissingUrl);
    }
    if chunk.chunk.trim().is_empty() {
        return Err(SkipReason::EmptyChunk {
            url: url.to_string(),
        });
    }
    Ok(Window {
        text: chunk.chunk.clone(),
        title: docs_title.to_string(),
        topic_id: DOCS_TOPIC_ID.to_string(),
        url: url.to_string(),
        source: WindowSource::Markdown,
        root_post_number: None,
        post_numbers: Vec::new(),
    })
}

/// Assemble the full window list from forum posts and documentation chunks.
pub fn assemble(posts: Vec<Post>, docs: &[DocChunk], opts: &AssembleOptions) -> Assembly {
    let mut out = Assembly::default();
    let topics = group_topics(posts);
    out.topics = topics.len();

    for topic in &topics {
        let graph = ReplyGraph::build(&topic.posts);
        let parts = topic_subthreads(&graph);

        for sub in &parts.subthreads {
            match subthread_window(&topic.title, sub, &opts.base_url) {
                Some(window) => out.windows.push(window),
                None => out.skipped.push(SkipReason::EmptySubthread {
                    topic_id: topic.topic_id,
                    root_post_number: sub[0].post_number,
                }),
            }
        }

        out.promoted_orphans
            .extend(parts.promoted_orphans.iter().map(|&n| ThreadAnomaly {
                topic_id: topic.topic_id,
                post_number: n,
            }));
        out.unreachable
            .extend(parts.unreachable.iter().map(|&n| ThreadAnomaly {
                topic_id: topic.topic_id,
                post_number: n,
            }));
        out.duplicates
            .extend(parts.duplicates.iter().map(|&n| ThreadAnomaly {
                topic_id: topic.topic_id,
                post_number: n,
            }));
    }
    out.discourse_windows = out.windows.len();

    for chunk in docs {
        match doc_window(chunk, &opts.docs_title) {
            Ok(window) => out.windows.push(window),
            Err(reason) => out.skipped.push(reason),
        }
    }
    out.markdown_windows = out.windows.len() - out.discourse_windows;

    out
}
