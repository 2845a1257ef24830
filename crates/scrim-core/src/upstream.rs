//! Best-effort extraction of component bundles from AI-provider responses.
//!
//! The AI provider is an opaque upstream that yields free-form text; this
//! module maps that text onto a `title + html/css/js/mode` tuple. It is
//! deliberately outside the security-critical path: whatever it extracts
//! still flows through the capability policy and the content normalizer
//! before anything is persisted. Extraction is attempted once; failures
//! surface as [`UpstreamError`] and are not retried.
//!
//! Extraction ladder: a JSON object (bare, then fenced), fenced
//! ```html/```css/```js code blocks, and finally the whole response treated
//! as markup when it plausibly is markup.

use std::sync::LazyLock;

use regex::Regex;
use serde::Deserialize;
use thiserror::Error;

use crate::component::RenderMode;

static JSON_BLOCK: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?s)```json\s*(.*?)```").expect("invalid json block pattern")
});

static HTML_BLOCK: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?s)```html\s*(.*?)```").expect("invalid html block pattern")
});

static CSS_BLOCK: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?s)```css\s*(.*?)```").expect("invalid css block pattern")
});

static JS_BLOCK: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?s)```(?:js|javascript)\s*(.*?)```").expect("invalid js block pattern")
});

/// Failures from the upstream response parser.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum UpstreamError {
    /// The provider returned nothing usable at all.
    #[error("upstream provider returned an empty response")]
    EmptyResponse,

    /// The response contained no recognizable component payload.
    #[error("upstream response contained no usable component payload")]
    NoPayload,
}

/// A component bundle extracted from an upstream response.
///
/// Untrusted input: callers feed this into the regular deployment pipeline,
/// which applies policy and sanitization exactly as for any other payload.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GeneratedBundle {
    /// Title, when the response carried one.
    pub title: Option<String>,
    /// Raw HTML payload.
    pub markup: String,
    /// Raw CSS payload.
    pub style: String,
    /// Raw script payload.
    pub script: String,
    /// Requested isolation mode, already normalized.
    pub mode: RenderMode,
}

#[derive(Debug, Deserialize)]
struct RawBundle {
    title: Option<String>,
    html: Option<String>,
    css: Option<String>,
    js: Option<String>,
    mode: Option<String>,
}

/// Extracts a component bundle from free-form provider output.
///
/// # Errors
///
/// [`UpstreamError::EmptyResponse`] for blank input;
/// [`UpstreamError::NoPayload`] when no extraction strategy produced a
/// payload.
pub fn parse_bundle(text: &str) -> Result<GeneratedBundle, UpstreamError> {
    let trimmed = text.trim();
    if trimmed.is_empty() {
        return Err(UpstreamError::EmptyResponse);
    }

    if let Some(bundle) = parse_json_bundle(trimmed) {
        return Ok(bundle);
    }
    if let Some(captures) = JSON_BLOCK.captures(trimmed) {
        if let Some(bundle) = parse_json_bundle(captures[1].trim()) {
            return Ok(bundle);
        }
    }

    let html = HTML_BLOCK
        .captures(trimmed)
        .map(|c| c[1].trim().to_string());
    let css = CSS_BLOCK.captures(trimmed).map(|c| c[1].trim().to_string());
    let js = JS_BLOCK.captures(trimmed).map(|c| c[1].trim().to_string());
    if html.is_some() || css.is_some() || js.is_some() {
        return Ok(GeneratedBundle {
            title: None,
            markup: html.unwrap_or_default(),
            style: css.unwrap_or_default(),
            script: js.unwrap_or_default(),
            mode: RenderMode::Shadow,
        });
    }

    // Last resort: the whole response as markup, when it plausibly is.
    if trimmed.contains('<') {
        return Ok(GeneratedBundle {
            title: None,
            markup: trimmed.to_string(),
            style: String::new(),
            script: String::new(),
            mode: RenderMode::Shadow,
        });
    }

    Err(UpstreamError::NoPayload)
}

/// Accepts a JSON object only when it carries at least one payload field.
fn parse_json_bundle(text: &str) -> Option<GeneratedBundle> {
    let raw: RawBundle = serde_json::from_str(text).ok()?;
    if raw.html.is_none() && raw.css.is_none() && raw.js.is_none() {
        return None;
    }
    Some(GeneratedBundle {
        title: raw.title.map(|t| t.trim().to_string()).filter(|t| !t.is_empty()),
        markup: raw.html.unwrap_or_default(),
        style: raw.css.unwrap_or_default(),
        script: raw.js.unwrap_or_default(),
        mode: RenderMode::normalize(raw.mode.as_deref()),
    })
}
