//! Core data model for deployable components.
//!
//! A [`Component`] is the unit of deployment and rendering: sanitized markup,
//! raw style/script text, and a [`RenderMode`] selecting one of the three
//! isolation strategies. Inbound webhook bodies parse into a
//! [`DeployRequest`]; stored mutations are expressed as a [`ComponentPatch`]
//! so that fields a write is not allowed (or did not ask) to touch are left
//! exactly as persisted.
//!
//! # Invariants
//!
//! - [`RenderMode`] normalization is total: every input string (and absence)
//!   maps to exactly one of the three variants, never an error.
//! - [`ComponentId`] values are assigned by the store at first creation and
//!   are never reused.

use std::fmt;

use serde::de::Deserializer;
use serde::ser::Serializer;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Opaque stable identifier for a stored component.
///
/// Assigned by the component store at first creation; immutable thereafter.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ComponentId(u64);

impl ComponentId {
    /// Wraps a raw store-assigned identifier.
    #[must_use]
    pub const fn new(raw: u64) -> Self {
        Self(raw)
    }

    /// Returns the raw identifier value.
    #[must_use]
    pub const fn get(self) -> u64 {
        self.0
    }
}

impl fmt::Display for ComponentId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

/// Isolation strategy used when a component is rendered into a page.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum RenderMode {
    /// Shadow-root embedding: DOM and style scoping, no script isolation.
    #[default]
    Shadow,
    /// Sandboxed inline-document frame: the only mode with genuine script
    /// isolation.
    Frame,
    /// Light-DOM slot projection: content stays visible to page scripts.
    Slot,
}

impl RenderMode {
    /// Normalizes arbitrary mode input onto the closed enumeration.
    ///
    /// Input is trimmed and case-folded. `"iframe"` is accepted as a legacy
    /// alias for [`RenderMode::Frame`] so an explicit isolation request is
    /// never downgraded. Anything else, including absence, maps to
    /// [`RenderMode::Shadow`]. This function is total; unknown input is
    /// never an error.
    #[must_use]
    pub fn normalize(input: Option<&str>) -> Self {
        let Some(raw) = input else {
            return Self::Shadow;
        };
        match raw.trim().to_ascii_lowercase().as_str() {
            "frame" | "iframe" => Self::Frame,
            "slot" => Self::Slot,
            _ => Self::Shadow,
        }
    }

    /// Canonical lowercase name of this mode.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Shadow => "shadow",
            Self::Frame => "frame",
            Self::Slot => "slot",
        }
    }

    /// Human-readable label for operator-facing listings.
    #[must_use]
    pub const fn label(self) -> &'static str {
        match self {
            Self::Shadow => "Shadow DOM",
            Self::Frame => "Sandboxed frame",
            Self::Slot => "Slot (light DOM)",
        }
    }
}

impl fmt::Display for RenderMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl Serialize for RenderMode {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(self.as_str())
    }
}

impl<'de> Deserialize<'de> for RenderMode {
    /// Deserializes through [`RenderMode::normalize`], so a stored string
    /// that predates the current enumeration can never poison a read.
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = String::deserialize(deserializer)?;
        Ok(Self::normalize(Some(&raw)))
    }
}

/// How a deployment resolves against an existing same-titled component.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum UpdateStrategy {
    /// Re-deploying the same title converges onto one component.
    #[default]
    Overwrite,
    /// Always allocate a new component, even when the title already exists.
    Create,
}

impl UpdateStrategy {
    /// Maps raw strategy input onto the enumeration.
    ///
    /// Absence means [`UpdateStrategy::Overwrite`]; the literal `"overwrite"`
    /// means overwrite; any other value means always-create. Callers rely on
    /// the always-create escape hatch to force duplication, so unrecognized
    /// values are intentionally not errors.
    #[must_use]
    pub fn from_input(input: Option<&str>) -> Self {
        match input {
            None => Self::Overwrite,
            Some(raw) if raw == "overwrite" => Self::Overwrite,
            Some(_) => Self::Create,
        }
    }
}

/// A stored component: the unit of deployment and rendering.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Component {
    /// Stable identifier, assigned at first creation.
    pub id: ComponentId,
    /// Human-readable label; used for overwrite-by-title matching.
    pub title: String,
    /// URL-safe identifier derived from the title at creation time.
    pub slug: String,
    /// Sanitized HTML fragment (safe-HTML subset).
    pub markup: String,
    /// Raw CSS text; scoped only by the rendering mode, never sanitized.
    pub style: String,
    /// Raw script text; present only if a privileged write stored it.
    pub script: Option<String>,
    /// Isolation strategy for rendering.
    pub mode: RenderMode,
}

/// Errors produced while parsing and validating an inbound request body.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum RequestError {
    /// The body was not a JSON object of the expected shape.
    #[error("invalid deployment payload: {0}")]
    MalformedBody(String),

    /// The required title field was missing or empty after trimming.
    #[error("missing component title")]
    MissingTitle,

    /// A slug lookup was attempted without a slug value.
    #[error("missing component slug")]
    MissingSlug,
}

/// Raw wire shape of a deployment body. All fields optional; validation
/// happens in [`DeployRequest::from_json`].
#[derive(Debug, Deserialize)]
struct RawDeployRequest {
    title: Option<String>,
    component_id: Option<u64>,
    update_strategy: Option<String>,
    mode: Option<String>,
    html: Option<String>,
    css: Option<String>,
    js: Option<String>,
}

/// A validated inbound deployment request.
///
/// Not persisted; consumed exactly once into a [`ComponentPatch`] by the
/// deployment pipeline.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeployRequest {
    /// Component title, non-empty after trimming.
    pub title: String,
    /// Explicit target component; `0` on the wire is treated as absent.
    pub component_id: Option<ComponentId>,
    /// Resolution strategy for same-titled components.
    pub update_strategy: UpdateStrategy,
    /// Requested isolation mode, already normalized.
    pub mode: RenderMode,
    /// Raw HTML payload, if supplied.
    pub markup: Option<String>,
    /// Raw CSS payload, if supplied.
    pub style: Option<String>,
    /// Raw script payload, if supplied. Whether this is persisted at all is
    /// decided by the capability policy, not here.
    pub script: Option<String>,
}

impl DeployRequest {
    /// Parses and validates a raw JSON body.
    ///
    /// # Errors
    ///
    /// Returns [`RequestError::MalformedBody`] when the body is not a JSON
    /// object of the expected shape, and [`RequestError::MissingTitle`] when
    /// the title is absent or empty after trimming.
    pub fn from_json(raw_body: &[u8]) -> Result<Self, RequestError> {
        let raw: RawDeployRequest = serde_json::from_slice(raw_body)
            .map_err(|err| RequestError::MalformedBody(err.to_string()))?;

        let title = raw
            .title
            .as_deref()
            .map(str::trim)
            .filter(|t| !t.is_empty())
            .ok_or(RequestError::MissingTitle)?
            .to_string();

        let component_id = raw.component_id.filter(|&id| id != 0).map(ComponentId::new);

        Ok(Self {
            title,
            component_id,
            update_strategy: UpdateStrategy::from_input(raw.update_strategy.as_deref()),
            mode: RenderMode::normalize(raw.mode.as_deref()),
            markup: raw.html,
            style: raw.css,
            script: raw.js,
        })
    }
}

/// A single-field write directive: leave the stored value untouched, or set
/// it to a new value.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum FieldWrite<T> {
    /// Leave the persisted value exactly as it is.
    #[default]
    Keep,
    /// Replace the persisted value.
    Set(T),
}

impl<T> FieldWrite<T> {
    /// Applies this directive to a mutable slot.
    pub fn apply(self, slot: &mut T) {
        if let Self::Set(value) = self {
            *slot = value;
        }
    }
}

/// Field-level mutation of a stored component.
///
/// The deployment pipeline builds patches so that a write lacking script
/// capability carries [`FieldWrite::Keep`] for the script field: a stored
/// script is never silently cleared by an unprivileged write. A privileged
/// write that supplies an explicitly empty script clears it with
/// `Set(None)`.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct ComponentPatch {
    /// New title, when the write carries one.
    pub title: FieldWrite<String>,
    /// Sanitized markup.
    pub markup: FieldWrite<String>,
    /// Raw style text.
    pub style: FieldWrite<String>,
    /// Script text; `Set(None)` clears a previously stored script.
    pub script: FieldWrite<Option<String>>,
    /// Isolation mode.
    pub mode: FieldWrite<RenderMode>,
}

impl ComponentPatch {
    /// Applies every directive in this patch to a stored component.
    ///
    /// The component id is not part of a patch; ids are immutable.
    pub fn apply(self, component: &mut Component) {
        self.title.apply(&mut component.title);
        self.markup.apply(&mut component.markup);
        self.style.apply(&mut component.style);
        self.script.apply(&mut component.script);
        self.mode.apply(&mut component.mode);
    }
}

/// Derives a URL-safe slug from a component title.
///
/// Lowercases, collapses every run of non-alphanumeric characters to a
/// single `-`, and trims leading/trailing dashes. A title with no
/// alphanumeric content falls back to `"component"` so the slug is never
/// empty. Slugs are derived once at allocation and preserved across
/// updates; uniqueness is owned by the store.
#[must_use]
pub fn slugify(title: &str) -> String {
    let mut slug = String::with_capacity(title.len());
    let mut pending_dash = false;
    for ch in title.chars() {
        if ch.is_ascii_alphanumeric() {
            if pending_dash && !slug.is_empty() {
                slug.push('-');
            }
            pending_dash = false;
            slug.push(ch.to_ascii_lowercase());
        } else {
            pending_dash = true;
        }
    }
    if slug.is_empty() {
        slug.push_str("component");
    }
    slug
}
