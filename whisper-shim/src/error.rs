//! Error types for the adapter boundary.
//!
//! The engine reports failure through two narrow channels (a null context
//! from init, a non-zero status from inference), so the taxonomy here stays
//! shallow on purpose. Statuses are carried opaquely; this layer never
//! tries to interpret them.

use std::path::PathBuf;

/// Errors raised while loading a model and creating a context.
#[derive(Debug, thiserror::Error)]
pub enum ModelLoadError {
    /// Model file does not exist.
    #[error("model file not found: {}", .path.display())]
    NotFound { path: PathBuf },

    /// File exists but its header is not a known ggml/gguf signature.
    #[error("not a ggml/gguf model file: {} (magic {:?})", .path.display(), .found)]
    InvalidFormat { path: PathBuf, found: String },

    /// Path cannot be handed to the engine (interior NUL or non-UTF-8).
    #[error("model path not representable as a C string: {}", .path.display())]
    InvalidPath { path: PathBuf },

    /// Reading the file header failed.
    #[error("failed to read model file: {0}")]
    Io(#[from] std::io::Error),

    /// Engine returned a null context for a file that passed preflight.
    #[error("engine failed to load model: {}", .path.display())]
    Engine { path: PathBuf },
}

/// Errors raised by a transcription run.
#[derive(Debug, thiserror::Error)]
pub enum TranscribeError {
    /// Non-zero status from the engine, passed through uninterpreted.
    #[error("engine returned status {0}")]
    Engine(i32),

    /// Language code not present in the engine's language table.
    #[error("unsupported language code: {0:?}")]
    UnsupportedLanguage(String),

    /// Sample count exceeds the engine's 32-bit addressing.
    #[error("sample buffer too large for the engine: {0} samples")]
    BufferTooLarge(usize),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn messages_name_the_offending_input() {
        let err = ModelLoadError::NotFound {
            path: PathBuf::from("/tmp/ggml-missing.bin"),
        };
        assert!(err.to_string().contains("ggml-missing.bin"));

        let err = TranscribeError::UnsupportedLanguage("klingon".into());
        assert!(err.to_string().contains("klingon"));

        let err = TranscribeError::Engine(-6);
        assert_eq!(err.to_string(), "engine returned status -6");
    }

    #[test]
    fn io_errors_convert() {
        let io = std::io::Error::new(std::io::ErrorKind::PermissionDenied, "denied");
        let err: ModelLoadError = io.into();
        assert!(matches!(err, ModelLoadError::Io(_)));
    }
}
