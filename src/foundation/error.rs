use crate::foundation::core::{AssetId, ClipId};

/// Convenience result type used across montage.
pub type MontageResult<T> = Result<T, MontageError>;

/// Top-level error taxonomy used by engine APIs.
///
/// Structural variants (`AssetNotFound`, `InvalidAdjacency`, `OverlapViolation`,
/// `DurationExceeded`) are returned by the mutation that caused them; the timeline is left
/// unchanged. `DecodeUnavailable` is recovered by the compositor and never fails a render.
#[derive(thiserror::Error, Debug)]
pub enum MontageError {
    /// A media locator could not be opened or probed.
    #[error("media unreadable '{locator}': {reason}")]
    MediaUnreadable {
        /// Locator passed to registration.
        locator: String,
        /// Back-end specific reason.
        reason: String,
    },

    /// Lookup of an unknown id.
    #[error("{0} not found")]
    NotFound(String),

    /// A media clip references an asset that is not registered.
    #[error("asset not found: {0}")]
    AssetNotFound(AssetId),

    /// A transition does not bridge two time-adjacent clips of the same layer.
    #[error("invalid adjacency: {0}")]
    InvalidAdjacency(String),

    /// A clip range intersects another clip without a bridging transition.
    #[error("overlap violation: {clip} intersects {other}")]
    OverlapViolation {
        /// Clip being inserted or moved.
        clip: ClipId,
        /// Existing clip it collides with.
        other: ClipId,
    },

    /// A transition window is longer than one of its clips.
    #[error("duration exceeded: {0}")]
    DurationExceeded(String),

    /// The decode back end could not supply a frame (transient, per frame).
    #[error("decode unavailable for {asset} at {time:.3}s: {reason}")]
    DecodeUnavailable {
        /// Asset that was requested.
        asset: AssetId,
        /// Local media time that was requested.
        time: f64,
        /// Back-end specific reason.
        reason: String,
    },

    /// Invalid user-provided data.
    #[error("validation error: {0}")]
    Validation(String),

    /// Invalid or unreadable configuration.
    #[error("config error: {0}")]
    Config(String),

    /// Wrapped lower-level error from dependencies or IO.
    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

impl MontageError {
    /// Build a [`MontageError::MediaUnreadable`] value.
    pub fn media_unreadable(locator: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::MediaUnreadable {
            locator: locator.into(),
            reason: reason.into(),
        }
    }

    /// Build a [`MontageError::NotFound`] value from anything displayable (usually an id).
    pub fn not_found(what: impl std::fmt::Display) -> Self {
        Self::NotFound(what.to_string())
    }

    /// Build a [`MontageError::InvalidAdjacency`] value.
    pub fn invalid_adjacency(msg: impl Into<String>) -> Self {
        Self::InvalidAdjacency(msg.into())
    }

    /// Build a [`MontageError::DurationExceeded`] value.
    pub fn duration_exceeded(msg: impl Into<String>) -> Self {
        Self::DurationExceeded(msg.into())
    }

    /// Build a [`MontageError::DecodeUnavailable`] value.
    pub fn decode_unavailable(asset: AssetId, time: f64, reason: impl Into<String>) -> Self {
        Self::DecodeUnavailable {
            asset,
            time,
            reason: reason.into(),
        }
    }

    /// Build a [`MontageError::Validation`] value.
    pub fn validation(msg: impl Into<String>) -> Self {
        Self::Validation(msg.into())
    }

    /// Build a [`MontageError::Config`] value.
    pub fn config(msg: impl Into<String>) -> Self {
        Self::Config(msg.into())
    }

    /// `true` for errors raised by structural validation of a timeline mutation.
    pub fn is_structural(&self) -> bool {
        matches!(
            self,
            Self::AssetNotFound(_)
                | Self::InvalidAdjacency(_)
                | Self::OverlapViolation { .. }
                | Self::DurationExceeded(_)
        )
    }
}

#[cfg(test)]
#[path = "../../tests/unit/foundation/error.rs"]
mod tests;
