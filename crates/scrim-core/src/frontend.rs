//! Client-side assets shipped with rendered components.
//!
//! The crate embeds its frontend assets so the host application can serve
//! them without a build step. The interesting one is the rehydration
//! observer: slot-mode components place their markup in the light DOM
//! precisely so third-party page scripts (form handlers, commerce widgets)
//! can see it, but those libraries initialized before the component was
//! injected. The observer watches each tagged host for structural mutation
//! and re-invokes a fixed, ordered list of idempotent re-init hooks
//! (conditional-logic re-evaluation, price-field refresh, date-picker
//! re-binding, contact-form re-init, checkout-fragment refresh), each a
//! no-op when the corresponding library is absent.
//!
//! The observer runs once per page view, never unobserves, and stays
//! attached for the lifetime of the host element. Rapid mutation bursts may
//! trigger redundant reinitialization; that is accepted because every hook
//! is required to be idempotent.

/// The rehydration observer, enqueued for pages containing slot-mode hosts.
pub const REHYDRATION_OBSERVER_JS: &str = include_str!("../assets/observer.js");

/// Baseline host/frame styling.
pub const HOST_STYLESHEET: &str = include_str!("../assets/host.css");

/// A client asset a rendered component depends on.
///
/// The render engine reports these; the embedding page is responsible for
/// enqueueing each required asset once per page view.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ClientAsset {
    /// Baseline styling for hosts and frames.
    HostStyle,
    /// The slot-mode rehydration observer.
    RehydrationObserver,
}

impl ClientAsset {
    /// The embedded source text of this asset.
    #[must_use]
    pub const fn source(self) -> &'static str {
        match self {
            Self::HostStyle => HOST_STYLESHEET,
            Self::RehydrationObserver => REHYDRATION_OBSERVER_JS,
        }
    }

    /// Canonical file name under which the asset should be served.
    #[must_use]
    pub const fn file_name(self) -> &'static str {
        match self {
            Self::HostStyle => "scrim-host.css",
            Self::RehydrationObserver => "scrim-observer.js",
        }
    }
}
