/// Core error types for audx
use thiserror::Error;

/// Result type alias using `AudxError`
pub type Result<T> = std::result::Result<T, AudxError>;

/// Broad failure classes, used to decide how a failure is reported.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorCategory {
    /// Input could not be opened or probed
    Open,
    /// A stream, codec, container or sample format is not supported
    UnsupportedFormat,
    /// A user-supplied value is malformed or out of range
    InvalidParameter,
    /// Allocation or buffer capacity failure
    ResourceExhausted,
    /// Sample representation, layout or rate conversion failed
    Conversion,
    /// Filter graph lookup, parse, configuration or runtime failure
    Graph,
    /// Encoder or decoder failure
    CodecIo,
    /// Container header, packet or trailer write failure
    ContainerIo,
}

/// Core error type for audx
#[derive(Error, Debug)]
pub enum AudxError {
    /// Input could not be opened or probed
    #[error("Could not open '{path}': {reason}")]
    Open { path: String, reason: String },

    /// Input contains no audio-bearing stream
    #[error("No audio stream found in '{0}'")]
    NoAudioStream(String),

    /// No decoder matches the audio stream
    #[error("Unsupported codec: {0}")]
    UnsupportedCodec(String),

    /// Sample format, layout, container or codec combination not supported
    #[error("Unsupported format: {0}")]
    UnsupportedFormat(String),

    /// Invalid option value
    #[error("Invalid parameter: {0}")]
    InvalidParameter(String),

    /// Malformed or out-of-range bitrate string
    #[error("Invalid bitrate '{0}' (expected a positive integer with optional k suffix)")]
    InvalidBitrate(String),

    /// Encoder name unknown or not built in
    #[error("Encoder not found: {0}")]
    EncoderNotFound(String),

    /// Allocation or capacity failure
    #[error("Resource exhausted: {0}")]
    ResourceExhausted(String),

    /// Format conversion failed
    #[error("Conversion error: {0}")]
    Conversion(String),

    /// Empty or otherwise unusable format description
    #[error("Invalid format: {0}")]
    InvalidFormat(String),

    /// A required filter node type is not registered
    #[error("Filter not found: {0}")]
    FilterNotFound(String),

    /// Filter chain text could not be parsed
    #[error("Failed to parse filter chain: {0}")]
    GraphParse(String),

    /// Filter chain parsed but could not be configured
    #[error("Failed to configure filter graph: {0}")]
    GraphConfig(String),

    /// Filter graph failed while processing
    #[error("Filter error: {0}")]
    Graph(String),

    /// Encoder or decoder failure
    #[error("Codec error: {0}")]
    CodecIo(String),

    /// Container write failure
    #[error("Container error: {0}")]
    ContainerIo(String),

    /// The sample FIFO accepted fewer samples than offered
    #[error("FIFO accepted {accepted} of {offered} samples")]
    FifoWrite { offered: usize, accepted: usize },

    /// Flushing the encoder or writing the trailer failed
    #[error("Failed to finalize output: {0}")]
    Finalize(Box<AudxError>),

    /// Operation called in the wrong lifecycle state
    #[error("Invalid state: {0}")]
    InvalidState(String),

    /// I/O errors
    #[error(transparent)]
    Io(#[from] std::io::Error),
}

impl AudxError {
    /// Create an open error
    pub fn open(path: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::Open {
            path: path.into(),
            reason: reason.into(),
        }
    }

    /// Create a codec error
    pub fn codec(msg: impl Into<String>) -> Self {
        Self::CodecIo(msg.into())
    }

    /// Create a container error
    pub fn container(msg: impl Into<String>) -> Self {
        Self::ContainerIo(msg.into())
    }

    /// Create a conversion error
    pub fn conversion(msg: impl Into<String>) -> Self {
        Self::Conversion(msg.into())
    }

    /// Create an invalid parameter error
    pub fn invalid_parameter(msg: impl Into<String>) -> Self {
        Self::InvalidParameter(msg.into())
    }

    /// Create an invalid state error
    pub fn invalid_state(msg: impl Into<String>) -> Self {
        Self::InvalidState(msg.into())
    }

    /// Wrap an error raised while finalizing output
    pub fn finalize(err: AudxError) -> Self {
        match err {
            already @ Self::Finalize(_) => already,
            other => Self::Finalize(Box::new(other)),
        }
    }

    /// Failure class of this error
    pub fn category(&self) -> ErrorCategory {
        match self {
            Self::Open { .. } | Self::NoAudioStream(_) => ErrorCategory::Open,
            Self::UnsupportedCodec(_)
            | Self::UnsupportedFormat(_)
            | Self::EncoderNotFound(_)
            | Self::InvalidFormat(_) => ErrorCategory::UnsupportedFormat,
            Self::InvalidParameter(_) | Self::InvalidBitrate(_) | Self::InvalidState(_) => {
                ErrorCategory::InvalidParameter
            }
            Self::ResourceExhausted(_) | Self::FifoWrite { .. } => ErrorCategory::ResourceExhausted,
            Self::Conversion(_) => ErrorCategory::Conversion,
            Self::FilterNotFound(_)
            | Self::GraphParse(_)
            | Self::GraphConfig(_)
            | Self::Graph(_) => ErrorCategory::Graph,
            Self::CodecIo(_) => ErrorCategory::CodecIo,
            Self::ContainerIo(_) | Self::Io(_) => ErrorCategory::ContainerIo,
            Self::Finalize(inner) => inner.category(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn categories_follow_taxonomy() {
        assert_eq!(
            AudxError::NoAudioStream("a.txt".into()).category(),
            ErrorCategory::Open
        );
        assert_eq!(
            AudxError::InvalidBitrate("abc".into()).category(),
            ErrorCategory::InvalidParameter
        );
        assert_eq!(
            AudxError::GraphParse("x".into()).category(),
            ErrorCategory::Graph
        );
        assert_eq!(
            AudxError::FifoWrite {
                offered: 10,
                accepted: 4
            }
            .category(),
            ErrorCategory::ResourceExhausted
        );
    }

    #[test]
    fn finalize_keeps_inner_category_and_does_not_nest() {
        let err = AudxError::finalize(AudxError::container("trailer"));
        assert_eq!(err.category(), ErrorCategory::ContainerIo);

        let twice = AudxError::finalize(err);
        match twice {
            AudxError::Finalize(inner) => {
                assert!(matches!(*inner, AudxError::ContainerIo(_)));
            }
            other => panic!("unexpected {other:?}"),
        }
    }

    #[test]
    fn message_includes_underlying_text() {
        let err = AudxError::open("song.mp3", "No such file or directory");
        assert_eq!(
            err.to_string(),
            "Could not open 'song.mp3': No such file or directory"
        );
    }
}
