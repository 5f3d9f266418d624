use thiserror::Error;

#[derive(Error, Debug)]
pub enum Error {
    #[error("Degenerate triangle: signed area denominator {denominator} is too close to zero")]
    DegenerateTriangle { denominator: f32 },

    #[error("Degenerate reference: landmark pair distance {distance} is too close to zero")]
    DegenerateReference { distance: f32 },

    #[error("No face detected in frame")]
    MissingDetection,

    #[error("Setup failed: {0}")]
    Setup(String),

    #[error("Landmark count mismatch: expected {expected}, got {actual}")]
    CardinalityMismatch { expected: usize, actual: usize },

    #[error("Triangle index list of length {len} is not a multiple of 3")]
    RaggedIndexList { len: usize },

    #[error("Landmark index {index} out of range for {len} landmarks")]
    LandmarkIndexOutOfRange { index: usize, len: usize },

    #[error("Landmark group is empty")]
    EmptyLandmarkGroup,

    #[error("Transform is singular and cannot be inverted")]
    SingularTransform,

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] bincode::Error),

    #[error("Config error: {0}")]
    Config(#[from] serde_json::Error),
}

impl Error {
    /// Errors confined to a single triangle or frame. The engine logs and
    /// skips these instead of surfacing them.
    pub fn is_local(&self) -> bool {
        matches!(
            self,
            Error::DegenerateTriangle { .. } | Error::DegenerateReference { .. }
        )
    }
}

pub type Result<T> = std::result::Result<T, Error>;
