//! Deployment pipeline orchestration.
//!
//! [`DeployPipeline`] wires the stages together: signature verification,
//! body parsing, capability policy, content normalization, upsert
//! resolution, and persistence. Each call receives all of its inputs as
//! parameters (there is no shared per-session state), so concurrent
//! deployments interact only at the store.
//!
//! A deployment either completes atomically or fails with no partial
//! writes: field writes happen in a single store update, issued only after
//! the target id is confirmed, and every earlier stage short-circuits.

use std::sync::Arc;

use serde::Serialize;
use tracing::{info, warn};

use crate::component::{
    Component, ComponentId, ComponentPatch, DeployRequest, FieldWrite, RenderMode, RequestError,
};
use crate::config::DeployConfig;
use crate::error::DeployError;
use crate::policy::{CapabilityPolicy, PermittedFields, WriteOrigin};
use crate::sanitize::sanitize_markup;
use crate::signature::{self, SignatureContext};
use crate::store::ComponentStore;
use crate::upsert::{self, UpsertAction};

/// Success response for a deployment.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DeployReceipt {
    /// The component id the deployment landed on.
    pub id: ComponentId,
    /// Component title as stored.
    pub title: String,
    /// Isolation mode as stored.
    pub mode: RenderMode,
    /// Embed shortcode for page authors.
    pub shortcode: String,
    /// Whether the write was permitted to carry script.
    pub js_allowed: bool,
}

/// Public read view of a component, served to unauthenticated readers.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ComponentView {
    /// Component id.
    pub id: ComponentId,
    /// Title.
    pub title: String,
    /// URL-safe slug.
    pub slug: String,
    /// Sanitized markup.
    pub html: String,
    /// Raw style text.
    pub css: String,
    /// Script text; empty when none is stored.
    pub js: String,
    /// Isolation mode.
    pub mode: RenderMode,
}

impl From<Component> for ComponentView {
    fn from(component: Component) -> Self {
        Self {
            id: component.id,
            title: component.title,
            slug: component.slug,
            html: component.markup,
            css: component.style,
            js: component.script.unwrap_or_default(),
            mode: component.mode,
        }
    }
}

/// An editorial write: fields a UI editor submitted.
///
/// Unlike the webhook body, absent fields here mean "leave untouched": an
/// editor saving one field must not blank the others.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct EditorialEdit {
    /// New title, if edited.
    pub title: Option<String>,
    /// New markup, if edited; sanitized before storage.
    pub markup: Option<String>,
    /// New style text, if edited.
    pub style: Option<String>,
    /// New script text, if edited; an empty string clears the stored
    /// script. Ignored entirely without the script capability.
    pub script: Option<String>,
    /// New mode input, if edited; normalized before storage.
    pub mode: Option<String>,
}

/// The deployment pipeline over an injected component store.
pub struct DeployPipeline {
    config: DeployConfig,
    store: Arc<dyn ComponentStore>,
}

impl DeployPipeline {
    /// Builds a pipeline from operator configuration and a store.
    #[must_use]
    pub fn new(config: DeployConfig, store: Arc<dyn ComponentStore>) -> Self {
        Self { config, store }
    }

    /// The operator configuration in effect.
    #[must_use]
    pub const fn config(&self) -> &DeployConfig {
        &self.config
    }

    /// Processes one signed deployment request.
    ///
    /// Stages, each short-circuiting on failure:
    ///
    /// 1. Authenticate the raw body against the shared secret (fail-closed,
    ///    size ceiling before any digest work).
    /// 2. Parse and validate the body shape.
    /// 3. Evaluate the capability policy for the webhook origin.
    /// 4. Normalize content into a field patch (markup sanitized, script
    ///    discarded without capability).
    /// 5. Resolve the target component id.
    /// 6. Persist the patch in a single store update.
    ///
    /// # Errors
    ///
    /// Returns the first failing stage's [`DeployError`]. No field writes
    /// are committed on failure; the only earlier store effect is the id
    /// allocation for brand-new components.
    pub fn deploy(
        &self,
        raw_body: &[u8],
        presented_signature: Option<&str>,
    ) -> Result<DeployReceipt, DeployError> {
        // 1. Authenticate. Logged without signature or body content.
        signature::verify(&SignatureContext {
            raw_body,
            presented: presented_signature,
            secret: self.config.shared_secret.as_ref(),
            max_body_bytes: self.config.effective_max_body_bytes(),
        })
        .map_err(|err| {
            warn!(body_bytes = raw_body.len(), reason = %err, "deployment rejected");
            DeployError::from(err)
        })?;

        // 2. Parse and validate.
        let request = DeployRequest::from_json(raw_body)?;

        // 3. Capability policy, evaluated fresh for this write.
        let permitted = CapabilityPolicy::new(self.config.allow_webhook_script)
            .permitted_fields(WriteOrigin::Webhook);

        // 4. Normalize into a patch.
        let patch = normalize_deployment(&request, permitted);

        // 5. Resolve the target id. The allocation for a new component is
        //    the only store write before the patch lands.
        let target = upsert::resolve(&request, self.store.as_ref())?;

        // 6. Persist.
        self.store.update(target.id, patch)?;

        info!(
            component_id = %target.id,
            created = target.action == UpsertAction::Created,
            mode = %request.mode,
            js_allowed = permitted.script,
            body_bytes = raw_body.len(),
            "component deployment persisted"
        );

        Ok(DeployReceipt {
            id: target.id,
            shortcode: format!("[component id=\"{}\"]", target.id),
            title: request.title,
            mode: request.mode,
            js_allowed: permitted.script,
        })
    }

    /// Applies a direct editorial write.
    ///
    /// Editorial callers are authenticated by the embedding application;
    /// this path applies the same policy/normalization discipline as the
    /// webhook, with the editorial capability gating script.
    ///
    /// # Errors
    ///
    /// [`DeployError::Store`] when the component does not exist or the
    /// store fails.
    pub fn apply_editorial(
        &self,
        id: ComponentId,
        edit: EditorialEdit,
        origin: WriteOrigin,
    ) -> Result<(), DeployError> {
        let permitted =
            CapabilityPolicy::new(self.config.allow_webhook_script).permitted_fields(origin);

        let patch = ComponentPatch {
            title: edit
                .title
                .map_or(FieldWrite::Keep, FieldWrite::Set),
            markup: edit
                .markup
                .map_or(FieldWrite::Keep, |m| FieldWrite::Set(sanitize_markup(&m))),
            style: edit.style.map_or(FieldWrite::Keep, FieldWrite::Set),
            script: script_write(edit.script, permitted),
            mode: edit.mode.map_or(FieldWrite::Keep, |m| {
                FieldWrite::Set(RenderMode::normalize(Some(&m)))
            }),
        };

        self.store.update(id, patch)?;
        info!(component_id = %id, "editorial update persisted");
        Ok(())
    }

    /// Public read lookup by id.
    ///
    /// # Errors
    ///
    /// [`DeployError::NotFound`] for an unknown id.
    pub fn component_view(&self, id: ComponentId) -> Result<ComponentView, DeployError> {
        let component = self.store.get(id)?.ok_or(DeployError::NotFound)?;
        Ok(component.into())
    }

    /// Public read lookup by slug.
    ///
    /// # Errors
    ///
    /// [`DeployError::Validation`] for a missing slug value,
    /// [`DeployError::NotFound`] for an unknown slug.
    pub fn component_view_by_slug(&self, slug: &str) -> Result<ComponentView, DeployError> {
        if slug.trim().is_empty() {
            return Err(RequestError::MissingSlug.into());
        }
        let component = self
            .store
            .find_by_slug(slug)?
            .ok_or(DeployError::NotFound)?;
        Ok(component.into())
    }
}

/// Normalizes a webhook deployment into a field patch.
///
/// Markup passes through the safe-HTML filter; style is empty-string
/// coalesced and otherwise untouched. Script is the careful one: without
/// capability the inbound value is discarded entirely and the stored value
/// kept; with capability, an absent field keeps the stored value, an empty
/// string clears it, and anything else replaces it.
fn normalize_deployment(request: &DeployRequest, permitted: PermittedFields) -> ComponentPatch {
    ComponentPatch {
        title: FieldWrite::Set(request.title.clone()),
        markup: FieldWrite::Set(sanitize_markup(
            request.markup.as_deref().unwrap_or_default(),
        )),
        style: FieldWrite::Set(request.style.clone().unwrap_or_default()),
        script: script_write(request.script.clone(), permitted),
        mode: FieldWrite::Set(request.mode),
    }
}

fn script_write(
    script: Option<String>,
    permitted: PermittedFields,
) -> FieldWrite<Option<String>> {
    if !permitted.script {
        return FieldWrite::Keep;
    }
    match script {
        None => FieldWrite::Keep,
        Some(js) if js.is_empty() => FieldWrite::Set(None),
        Some(js) => FieldWrite::Set(Some(js)),
    }
}
