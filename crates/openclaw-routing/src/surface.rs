//! Surface classification.
//!
//! An internal surface (the embedded web console) is a view onto an agent
//! session, not an address a reply can be delivered to. Every check for
//! "is this an internal surface" goes through [`classify_surface`].

use serde::Serialize;

use openclaw_core::normalize_id;

/// Surfaces that view or drive a session but cannot receive replies.
pub const INTERNAL_SURFACES: &[&str] = &["webchat"];

/// Whether a surface can own a session's delivery context.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum SurfaceClass {
    /// Administrative/console surface; never a delivery address.
    Internal,
    /// Externally addressable channel.
    External,
}

impl SurfaceClass {
    /// Whether this class may update the delivery context.
    #[must_use]
    pub const fn is_deliverable(self) -> bool {
        matches!(self, Self::External)
    }
}

/// Classify a surface or channel name.
#[must_use]
pub fn classify_surface(name: &str) -> SurfaceClass {
    let name = normalize_id(name);
    if INTERNAL_SURFACES.contains(&name.as_str()) {
        SurfaceClass::Internal
    } else {
        SurfaceClass::External
    }
}
