//! Capability policy: which payload fields a write may persist.
//!
//! The write path has exactly one place deciding what is persistable. Every
//! write, webhook or editorial, asks this policy for its permitted field
//! set; nothing downstream re-checks capabilities, and nothing here caches a
//! decision across requests.
//!
//! Markup and style are always permitted once a caller is past
//! authentication. Script is the dangerous field, gated by two independent
//! switches: an operator-configured flag for the webhook path, and a
//! per-caller administrative capability for direct editorial writes.

/// The origin of a component write.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WriteOrigin {
    /// A signed deployment request from the external automation.
    Webhook,
    /// A direct editorial write by an authenticated operator.
    Editorial {
        /// Whether the caller holds the script-management capability.
        manage_scripts: bool,
    },
}

/// The set of component fields a write is permitted to persist.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PermittedFields {
    /// Sanitized HTML markup.
    pub markup: bool,
    /// Raw style text.
    pub style: bool,
    /// Raw script text.
    pub script: bool,
}

impl PermittedFields {
    /// The baseline grant for any authenticated writer: markup and style,
    /// no script.
    #[must_use]
    pub const fn baseline() -> Self {
        Self {
            markup: true,
            style: true,
            script: false,
        }
    }

    /// The baseline grant extended with script capability.
    #[must_use]
    pub const fn with_script() -> Self {
        Self {
            markup: true,
            style: true,
            script: true,
        }
    }
}

/// Decides which fields a given write origin may persist.
///
/// Stateless and evaluated fresh on every write; constructing one is free.
#[derive(Debug, Clone, Copy, Default)]
pub struct CapabilityPolicy {
    allow_webhook_script: bool,
}

impl CapabilityPolicy {
    /// Builds a policy from the operator-configured webhook script flag.
    #[must_use]
    pub const fn new(allow_webhook_script: bool) -> Self {
        Self {
            allow_webhook_script,
        }
    }

    /// Returns the permitted field set for a write origin.
    ///
    /// The webhook flag and the editorial capability are deliberately
    /// independent: enabling script deployment over the webhook grants
    /// nothing to editorial callers, and vice versa.
    #[must_use]
    pub const fn permitted_fields(&self, origin: WriteOrigin) -> PermittedFields {
        let script = match origin {
            WriteOrigin::Webhook => self.allow_webhook_script,
            WriteOrigin::Editorial { manage_scripts } => manage_scripts,
        };
        if script {
            PermittedFields::with_script()
        } else {
            PermittedFields::baseline()
        }
    }
}
