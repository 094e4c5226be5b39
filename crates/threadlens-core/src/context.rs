//! Context assembly and prompt composition for answer synthesis.
//!
//! Retrieved texts are joined with [`CONTEXT_SEPARATOR`] into one context
//! block. Image-derived text, when present, goes first under
//! [`OCR_LABEL`]. An empty retrieval is replaced by [`NO_CONTEXT`] so the
//! completion service never receives an empty context.

use crate::models::QueryResult;

pub const CONTEXT_SEPARATOR: &str = "\n\n---\n\n";
pub const OCR_LABEL: &str = "[Text extracted from image]:";
pub const NO_CONTEXT: &str = "No context available.";

/// System instruction sent with every completion request.
pub const SYSTEM_PROMPT: &str = "You are a helpful teaching assistant that answers questions \
using excerpts from course forum discussions and course documentation. Answer only from the \
provided excerpts. If they do not contain the answer, say that you could not find it.";

/// A fully composed request for the completion service.
#[derive(Debug, Clone, PartialEq)]
pub struct Prompt {
    pub system: String,
    pub user: String,
}

/// Text used both for retrieval and as the question in the prompt.
///
/// Combines the typed question with image-derived text. Either part may
/// be empty; the result is trimmed.
pub fn effective_query(question: &str, ocr_text: Option<&str>) -> String {
    let question = question.trim();
    match ocr_text.map(str::trim).filter(|t| !t.is_empty()) {
        Some(ocr) if question.is_empty() => ocr.to_string(),
        Some(ocr) => format!("{}\n\n{}", question, ocr),
        None => question.to_string(),
    }
}

/// Join retrieved texts (and optional image text) into one context block.
pub fn build_context(results: &[QueryResult], ocr_text: Option<&str>) -> String {
    let mut segments: Vec<String> = Vec::with_capacity(results.len() + 1);

    if let Some(ocr) = ocr_text.map(str::trim).filter(|t| !t.is_empty()) {
        segments.push(format!("{}\n{}", OCR_LABEL, ocr));
    }

    if results.is_empty() {
        segments.push(NO_CONTEXT.to_string());
    } else {
        segments.extend(results.iter().map(|r| r.text.clone()));
    }

    segments.join(CONTEXT_SEPARATOR)
}

/// Compose the system instruction and user prompt for `question`.
pub fn compose_prompt(question: &str, context: &str) -> Prompt {
    Prompt {
        system: SYSTEM_PROMPT.to_string(),
        user: format!(
            "Based on these excerpts:\n\n{}\n\nQuestion: {}\n\nAnswer:",
            context, question
        ),
    }
}
