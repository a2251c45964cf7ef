/// Convenience result type used across panostitch.
pub type StitchResult<T> = Result<T, StitchError>;

/// Top-level error taxonomy for stitching sessions.
#[derive(thiserror::Error, Debug)]
pub enum StitchError {
    /// Unknown configuration key, out-of-range value or invalid manual center.
    #[error("configuration error: {0}")]
    Configuration(String),

    /// The match graph has more than one connected component.
    #[error("connectivity error: image(s) {} could not be stitched", .unstitchable.join(","))]
    Connectivity {
        /// Names of every image outside the majority component, in insertion order.
        unstitchable: Vec<String>,
    },

    /// A spanning-tree edge produced a homography without inliers.
    #[error("estimation error: {0}")]
    Estimation(String),

    /// Corner projection did not yield a well-formed quadrilateral.
    #[error("geometry error: {0}")]
    Geometry(String),

    /// A graph operation was attempted on a session without images.
    #[error("empty session: at least one image is required")]
    EmptySession,

    /// Pixel data could not be normalized to RGBA8, or the image name is already taken.
    #[error("image error: {0}")]
    Image(String),

    /// Wrapped lower-level error from dependencies or IO.
    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

impl StitchError {
    /// Build a [`StitchError::Configuration`] value.
    pub fn configuration(msg: impl Into<String>) -> Self {
        Self::Configuration(msg.into())
    }

    /// Build a [`StitchError::Connectivity`] value.
    pub fn connectivity(unstitchable: Vec<String>) -> Self {
        Self::Connectivity { unstitchable }
    }

    /// Build a [`StitchError::Estimation`] value.
    pub fn estimation(msg: impl Into<String>) -> Self {
        Self::Estimation(msg.into())
    }

    /// Build a [`StitchError::Geometry`] value.
    pub fn geometry(msg: impl Into<String>) -> Self {
        Self::Geometry(msg.into())
    }

    /// Build a [`StitchError::Image`] value.
    pub fn image(msg: impl Into<String>) -> Self {
        Self::Image(msg.into())
    }
}

#[cfg(test)]
#[path = "../../tests/unit/foundation/error.rs"]
mod tests;
