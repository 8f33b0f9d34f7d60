//! Capture error types.

use std::io;

use thiserror::Error;

/// Result type for capture operations.
pub type CaptureResult<T> = Result<T, CaptureError>;

/// Errors raised by capture sources and the capture device.
///
/// None of these are fatal to the process: the caller decides whether to
/// pause the graph, retry or quit.
#[derive(Debug, Error)]
pub enum CaptureError {
    /// The capture process could not be launched.
    #[error("failed to spawn {program}: {source}")]
    Spawn {
        /// Program that was executed.
        program: String,
        /// Underlying OS error.
        #[source]
        source: io::Error,
    },

    /// I/O error while reading frames.
    #[error("capture I/O error: {0}")]
    Io(#[from] io::Error),

    /// The frame stream ended before a whole frame was read.
    #[error("capture stream closed")]
    Closed,

    /// The capture process exited and left diagnostics on stderr.
    #[error("{program} exited: {stderr}")]
    Exited {
        /// Program that was executed.
        program: String,
        /// Last lines the process printed.
        stderr: String,
    },

    /// A frame was requested from a source that is not running.
    #[error("capture source not started")]
    NotStarted,

    /// Destination buffer does not hold exactly one frame.
    #[error("frame size mismatch: expected {expected} bytes, got {got}")]
    FrameSize {
        /// Bytes in one frame.
        expected: usize,
        /// Bytes provided.
        got: usize,
    },

    /// Invalid capture configuration.
    #[error("invalid capture config: {0}")]
    Config(String),

    /// Config file could not be parsed.
    #[error("YAML parse error: {0}")]
    Yaml(#[from] serde_yaml::Error),

    /// Frame could not be stored in the shared buffer.
    #[error(transparent)]
    Buffer(#[from] lapse_core::Error),
}

impl CaptureError {
    /// Creates a [`CaptureError::Config`] error.
    pub fn config(msg: impl Into<String>) -> Self {
        Self::Config(msg.into())
    }

    /// Maps an `UnexpectedEof` from a blocking read to [`CaptureError::Closed`].
    pub(crate) fn from_read(err: io::Error) -> Self {
        if err.kind() == io::ErrorKind::UnexpectedEof {
            Self::Closed
        } else {
            Self::Io(err)
        }
    }
}
