use thiserror::Error;

/// Failure taxonomy shared by every recognition and tracking call.
///
/// Backend failures surface to the immediate caller as exactly one of
/// these variants, carrying the backend's message text; nothing is
/// retried internally.
#[derive(Error, Debug)]
pub enum FaceError {
    /// Input bytes/path were absent, empty or undecodable, or a model
    /// file was missing at initialization. Recoverable: retry with valid
    /// input. Never corrupts recognizer or tracker state.
    #[error("image load failed: {0}")]
    ImageLoad(String),

    /// A model file failed to deserialize at initialization. The backend
    /// that reported this must not be used; build a new one.
    #[error("model deserialization failed: {0}")]
    Serialization(String),

    /// The backend could not compute a descriptor, landmarks or a track
    /// update for an otherwise valid input. Recoverable per call.
    #[error("recognition failed: {0}")]
    Recognize(String),

    /// Unclassified backend failure, message preserved verbatim.
    #[error("backend error: {0}")]
    Unknown(String),
}
