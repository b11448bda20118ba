//! Request and configuration types, and the one place engine parameter
//! blocks get built.
//!
//! The engine's params struct has dozens of fields; this boundary fetches the
//! engine's own defaults and overrides only what it owns (threads, language,
//! translate, decoding strategy, print flags). Everything else keeps whatever
//! default the linked engine version ships with.

use std::ffi::CString;

use serde::{Deserialize, Serialize};
use whisper_rs::whisper_rs_sys as sys;

use crate::error::TranscribeError;

/// Context-creation settings.
///
/// The default is deterministic CPU-only execution: GPU offload must be
/// asked for explicitly even when a GPU backend is compiled in.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    /// Offload inference to a GPU backend if one was compiled in.
    pub use_gpu: bool,
    /// Which GPU device to use when `use_gpu` is set.
    pub gpu_device: i32,
    /// Enable flash attention kernels where the backend supports them.
    pub flash_attn: bool,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            use_gpu: false,
            gpu_device: 0,
            flash_attn: false,
        }
    }
}

/// Per-call transcription request. Ephemeral; nothing here outlives the call.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct TranscribeParams {
    /// Worker threads for this call. `None` keeps the engine default;
    /// values below 1 are clamped to 1.
    pub threads: Option<i32>,
    /// Target language code ("en", "de", ...). `None`, `""` and `"auto"`
    /// all mean auto-detect.
    pub language: Option<String>,
    /// Translate the result to English instead of transcribing verbatim.
    pub translate: bool,
    /// Decoding strategy. Greedy unless a caller opts into beam search.
    pub strategy: SamplingStrategy,
}

/// Decoding search policy.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum SamplingStrategy {
    /// Pick the locally best token at each step.
    Greedy { best_of: i32 },
    /// Explore several candidate paths in parallel.
    BeamSearch { beam_size: i32, patience: f32 },
}

impl Default for SamplingStrategy {
    fn default() -> Self {
        // Mirrors the engine's own greedy defaults.
        SamplingStrategy::Greedy { best_of: 5 }
    }
}

impl SamplingStrategy {
    fn to_raw(self) -> sys::whisper_sampling_strategy {
        match self {
            SamplingStrategy::Greedy { .. } => {
                sys::whisper_sampling_strategy_WHISPER_SAMPLING_GREEDY
            }
            SamplingStrategy::BeamSearch { .. } => {
                sys::whisper_sampling_strategy_WHISPER_SAMPLING_BEAM_SEARCH
            }
        }
    }
}

/// Whether `code` names a language the engine's table knows about.
///
/// Accepts both short codes ("de") and full names ("german"). Note that
/// `"auto"` is not a language code; it is the request-level spelling of
/// "no override".
pub fn language_is_supported(code: &str) -> bool {
    let Ok(code) = CString::new(code) else {
        return false;
    };
    unsafe { sys::whisper_lang_id(code.as_ptr()) >= 0 }
}

/// Validates a request's language field and produces the C string the
/// engine will borrow for the duration of the call.
pub(crate) fn language_override(
    language: Option<&str>,
) -> Result<Option<CString>, TranscribeError> {
    let Some(code) = language else {
        return Ok(None);
    };
    if code.is_empty() || code == "auto" {
        return Ok(None);
    }
    if !language_is_supported(code) {
        return Err(TranscribeError::UnsupportedLanguage(code.to_string()));
    }
    CString::new(code)
        .map(Some)
        .map_err(|_| TranscribeError::UnsupportedLanguage(code.to_string()))
}

/// Engine defaults for `strategy` with this boundary's overrides applied:
/// all progress/diagnostic printing off, strategy knobs set.
pub(crate) fn raw_full_params(strategy: SamplingStrategy) -> sys::whisper_full_params {
    let mut fp = unsafe { sys::whisper_full_default_params(strategy.to_raw()) };
    fp.print_special = false;
    fp.print_progress = false;
    fp.print_realtime = false;
    fp.print_timestamps = false;
    match strategy {
        SamplingStrategy::Greedy { best_of } => {
            fp.greedy.best_of = best_of;
        }
        SamplingStrategy::BeamSearch {
            beam_size,
            patience,
        } => {
            fp.beam_search.beam_size = beam_size;
            fp.beam_search.patience = patience;
        }
    }
    fp
}

/// Full parameter block for one safe-API call. `language` must outlive the
/// engine call that borrows the returned block; `None` clears the engine's
/// default so the engine auto-detects.
pub(crate) fn build_full_params(
    request: &TranscribeParams,
    language: Option<&CString>,
) -> sys::whisper_full_params {
    let mut fp = raw_full_params(request.strategy);
    if let Some(threads) = request.threads {
        fp.n_threads = threads.max(1);
    }
    fp.translate = request.translate;
    // The engine's default block carries language "en"; auto-detect needs an
    // explicit null, so assign unconditionally.
    fp.language = language.map_or(std::ptr::null(), |code| code.as_ptr());
    fp
}
