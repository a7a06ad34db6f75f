//! Error types.

use thiserror::Error;

/// Errors reported by the host renderer.
///
/// The selector and marker layers never fail; everything they cannot resolve
/// degrades to a default. Only driving the renderer itself can go wrong.
#[derive(Debug, Error)]
pub enum HostError {
    /// The renderer was driven from inside one of its own render passes or
    /// commits, for example by calling `Renderer::render` in an effect.
    #[error("renderer is busy; render and act cannot be called re-entrantly")]
    Reentrant,

    /// Updates kept scheduling further passes past the configured limit.
    #[error("maximum update depth exceeded: more than {limit} render passes in one flush")]
    UpdateDepthExceeded { limit: usize },

    /// The engine configuration could not be parsed.
    #[error("invalid engine configuration: {0}")]
    Config(#[from] serde_json::Error),
}

pub type Result<T, E = HostError> = std::result::Result<T, E>;
