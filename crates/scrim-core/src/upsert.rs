//! Upsert resolution: which stored component a deployment targets.
//!
//! The resolution ladder guarantees idempotent re-deployment: repeated
//! delivery of the same `(title, overwrite)` pair converges onto one
//! component instead of accumulating duplicates, while an explicit
//! component id always wins over title matching so callers can rename a
//! component without losing its identity.

use tracing::debug;

use crate::component::{ComponentId, DeployRequest, UpdateStrategy, slugify};
use crate::store::{ComponentStore, StoreError};

/// Whether resolution landed on an existing component or allocated a new
/// one.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UpsertAction {
    /// A fresh id was allocated.
    Created,
    /// An existing id is being overwritten.
    Updated,
}

/// The resolved target of a deployment.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct UpsertTarget {
    /// The component id all field writes will go to.
    pub id: ComponentId,
    /// How the id was obtained.
    pub action: UpsertAction,
}

/// Resolves a deployment request onto a target component id.
///
/// Priority order:
///
/// 1. An explicit, non-zero `component_id` is the target (update); it wins
///    over title matching to support rename-safe updates.
/// 2. Under [`UpdateStrategy::Overwrite`], an existing component with a
///    byte-exact title match is the target (update). Titles differing only
///    in case or whitespace do not match; that is a recorded decision, not
///    an oversight: silently folding case would change which component an
///    existing caller overwrites.
/// 3. Otherwise a new id is allocated (create). [`UpdateStrategy::Create`]
///    never title-matches, even when a same-titled component exists; callers
///    use it to force duplication.
///
/// Field writes happen only after the returned id is confirmed; resolution
/// itself writes nothing beyond the allocation in case 3.
///
/// # Errors
///
/// Store failures are surfaced verbatim as [`StoreError`] and abort the
/// deployment.
pub fn resolve(
    request: &DeployRequest,
    store: &dyn ComponentStore,
) -> Result<UpsertTarget, StoreError> {
    if let Some(id) = request.component_id {
        debug!(component_id = %id, "deployment targets an explicit component id");
        return Ok(UpsertTarget {
            id,
            action: UpsertAction::Updated,
        });
    }

    if request.update_strategy == UpdateStrategy::Overwrite {
        if let Some(id) = store.find_by_title(&request.title)? {
            debug!(component_id = %id, title = %request.title, "overwriting component matched by title");
            return Ok(UpsertTarget {
                id,
                action: UpsertAction::Updated,
            });
        }
    }

    let slug = slugify(&request.title);
    let id = store.allocate(&request.title, &slug)?;
    debug!(component_id = %id, title = %request.title, slug = %slug, "allocated new component");
    Ok(UpsertTarget {
        id,
        action: UpsertAction::Created,
    })
}
