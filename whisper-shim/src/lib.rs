//! A struct-by-value-free boundary over the whisper.cpp speech-recognition
//! engine.
//!
//! Two surfaces share one adapter core:
//!
//! - the safe Rust API ([`Transcriber`] plus [`TranscribeParams`]), where
//!   the engine's lifecycle rules (release exactly once, results valid only
//!   until the next run, one writer per context) are enforced by the
//!   compiler instead of by documentation, and
//! - a flat C export surface ([`capi`], declared in
//!   `include/whisper_shim.h`) for host-language FFI layers that cannot
//!   pass structs by value. It preserves the engine's unchecked contract.
//!
//! The engine itself is linked in by `whisper-rs-sys`; the recognition
//! model, tensor math and decoding all live there. This crate adapts the
//! boundary only: parameter blocks built from engine defaults, result
//! marshaling, diagnostics routing, ownership.
//!
//! ```no_run
//! use whisper_shim::{TranscribeParams, Transcriber};
//!
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let mut transcriber = Transcriber::from_model_file("models/ggml-tiny.bin")?;
//! let samples = vec![0.0f32; whisper_shim::SAMPLE_RATE as usize * 2];
//! transcriber.transcribe(&samples, &TranscribeParams::default())?;
//! for segment in transcriber.segments() {
//!     println!("[{:>6}-{:>6}] {}", segment.start(), segment.end(), segment.text());
//! }
//! # Ok(())
//! # }
//! ```

pub mod capi;
mod error;
mod logging;
mod params;
mod segment;
mod transcriber;

// Re-export the public surface flat at the crate root.
pub use error::{ModelLoadError, TranscribeError};
pub use logging::install_engine_logging;
pub use params::{language_is_supported, EngineConfig, SamplingStrategy, TranscribeParams};
pub use segment::{Segment, Segments, TranscriptSegment};
pub use transcriber::Transcriber;

/// Sample rate the engine expects: mono PCM at 16 kHz.
pub const SAMPLE_RATE: u32 = whisper_rs::whisper_rs_sys::WHISPER_SAMPLE_RATE as u32;
