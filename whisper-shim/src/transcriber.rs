//! The context handle: model loading, inference, and result accessors.

use std::ffi::{c_int, CStr, CString};
use std::fs::File;
use std::io::Read;
use std::path::{Path, PathBuf};
use std::ptr::NonNull;
use std::time::Instant;

use whisper_rs::whisper_rs_sys as sys;

use crate::error::{ModelLoadError, TranscribeError};
use crate::logging;
use crate::params::{self, EngineConfig, TranscribeParams};
use crate::segment::{Segment, Segments};
use crate::SAMPLE_RATE;

// Known model container signatures, in both byte orders.
const MODEL_MAGICS: [&[u8; 4]; 6] = [b"ggml", b"GGUF", b"ggmf", b"lmgg", b"FUGU", b"fmgg"];

/// An opaque handle owning one loaded model and its runtime state.
///
/// Lifecycle and result validity are enforced through ownership: dropping
/// the handle frees the engine context, [`transcribe`](Self::transcribe)
/// takes `&mut self`, and segments borrow `&self`. A released context
/// cannot be used and stale segments cannot be read, by construction.
///
/// A `Transcriber` may move between threads but cannot be shared across
/// them: the engine keeps per-context result storage with no internal
/// synchronization, so everything here is single-writer.
#[derive(Debug)]
pub struct Transcriber {
    ctx: NonNull<sys::whisper_context>,
    path: PathBuf,
}

// Moving the context is fine; sharing is not. No Sync impl on purpose:
// the &self accessors read the same storage transcribe overwrites.
unsafe impl Send for Transcriber {}

impl Transcriber {
    /// Loads a model with default settings (CPU-only execution).
    pub fn from_model_file(path: impl AsRef<Path>) -> Result<Self, ModelLoadError> {
        Self::with_config(path, &EngineConfig::default())
    }

    /// Loads a model with explicit engine settings.
    pub fn with_config(
        path: impl AsRef<Path>,
        config: &EngineConfig,
    ) -> Result<Self, ModelLoadError> {
        logging::install_engine_logging();

        let path = path.as_ref();
        let c_path = path
            .to_str()
            .and_then(|p| CString::new(p).ok())
            .ok_or_else(|| ModelLoadError::InvalidPath {
                path: path.to_path_buf(),
            })?;
        preflight(path)?;

        let mut cparams = unsafe { sys::whisper_context_default_params() };
        cparams.use_gpu = config.use_gpu;
        cparams.gpu_device = config.gpu_device;
        cparams.flash_attn = config.flash_attn;

        log::info!("loading model {} (gpu: {})", path.display(), config.use_gpu);
        let started = Instant::now();
        let raw = unsafe { sys::whisper_init_from_file_with_params(c_path.as_ptr(), cparams) };
        let ctx = NonNull::new(raw).ok_or_else(|| ModelLoadError::Engine {
            path: path.to_path_buf(),
        })?;
        log::info!("model loaded in {:.2}s", started.elapsed().as_secs_f64());
        log::debug!("system info: {}", system_info());

        Ok(Self {
            ctx,
            path: path.to_path_buf(),
        })
    }

    /// Runs inference over `samples` (mono f32 PCM at [`SAMPLE_RATE`]),
    /// blocking until the engine finishes.
    ///
    /// Replaces the context's segment list; segments from an earlier call
    /// cannot outlive this one (the `&mut` receiver sees to that). A
    /// non-zero engine status comes back untouched in
    /// [`TranscribeError::Engine`].
    pub fn transcribe(
        &mut self,
        samples: &[f32],
        params: &TranscribeParams,
    ) -> Result<(), TranscribeError> {
        let n_samples = c_int::try_from(samples.len())
            .map_err(|_| TranscribeError::BufferTooLarge(samples.len()))?;
        let language = params::language_override(params.language.as_deref())?;

        if params.translate && !self.is_multilingual() {
            log::warn!("translate requested but the loaded model is English-only");
        }

        let duration = samples.len() as f64 / f64::from(SAMPLE_RATE);
        if !samples.is_empty() && duration < 1.0 {
            log::debug!("buffer is only {duration:.2}s; the engine skips input under 1s");
        }

        // `language` owns the string the params block borrows; it must stay
        // alive until whisper_full returns.
        let fp = params::build_full_params(params, language.as_ref());

        log::debug!("transcribing {} samples ({duration:.2}s)", samples.len());
        let started = Instant::now();
        let status =
            unsafe { sys::whisper_full(self.ctx.as_ptr(), fp, samples.as_ptr(), n_samples) };
        if status != 0 {
            log::warn!("engine rejected the run with status {status}");
            return Err(TranscribeError::Engine(status));
        }
        log::debug!(
            "transcribed in {:.2}s ({} segments)",
            started.elapsed().as_secs_f64(),
            self.segment_count()
        );
        Ok(())
    }

    /// Number of segments produced by the most recent transcription.
    /// Zero before the first call.
    pub fn segment_count(&self) -> usize {
        let n = unsafe { sys::whisper_full_n_segments(self.ctx.as_ptr()) };
        usize::try_from(n).unwrap_or(0)
    }

    /// The segment at `index`, or `None` past the end.
    pub fn segment(&self, index: usize) -> Option<Segment<'_>> {
        if index >= self.segment_count() {
            return None;
        }
        let index = index as c_int;
        unsafe {
            let text = sys::whisper_full_get_segment_text(self.ctx.as_ptr(), index);
            let text = if text.is_null() { c"" } else { CStr::from_ptr(text) };
            Some(Segment {
                text,
                start: sys::whisper_full_get_segment_t0(self.ctx.as_ptr(), index),
                end: sys::whisper_full_get_segment_t1(self.ctx.as_ptr(), index),
            })
        }
    }

    /// Iterates the segments of the most recent transcription in order.
    pub fn segments(&self) -> Segments<'_> {
        Segments {
            inner: self,
            index: 0,
            count: self.segment_count(),
        }
    }

    /// All segment text joined with single spaces, trimmed.
    pub fn full_text(&self) -> String {
        let mut out = String::new();
        for segment in self.segments() {
            let text = segment.text();
            let trimmed = text.trim();
            if trimmed.is_empty() {
                continue;
            }
            if !out.is_empty() {
                out.push(' ');
            }
            out.push_str(trimmed);
        }
        out
    }

    /// Language the engine settled on for the most recent run. Reports the
    /// engine's default ("en") before the first run.
    pub fn detected_language(&self) -> Option<&'static str> {
        let id = unsafe { sys::whisper_full_lang_id(self.ctx.as_ptr()) };
        if id < 0 {
            return None;
        }
        let name = unsafe { sys::whisper_lang_str(id) };
        if name.is_null() {
            return None;
        }
        // The engine's language table is static data.
        unsafe { CStr::from_ptr(name) }.to_str().ok()
    }

    /// Whether the loaded model handles languages other than English.
    pub fn is_multilingual(&self) -> bool {
        unsafe { sys::whisper_is_multilingual(self.ctx.as_ptr()) != 0 }
    }

    /// Path the model was loaded from.
    pub fn model_path(&self) -> &Path {
        &self.path
    }

    pub(crate) fn as_ptr(&self) -> *mut sys::whisper_context {
        self.ctx.as_ptr()
    }
}

impl Drop for Transcriber {
    fn drop(&mut self) {
        log::debug!("freeing context for {}", self.path.display());
        unsafe { sys::whisper_free(self.ctx.as_ptr()) };
    }
}

/// Rejects paths that are not model files before the engine sees them, so
/// missing and malformed files get distinct errors instead of one null.
fn preflight(path: &Path) -> Result<(), ModelLoadError> {
    let mut file = File::open(path).map_err(|err| {
        if err.kind() == std::io::ErrorKind::NotFound {
            ModelLoadError::NotFound {
                path: path.to_path_buf(),
            }
        } else {
            ModelLoadError::Io(err)
        }
    })?;
    let mut magic = [0u8; 4];
    if let Err(err) = file.read_exact(&mut magic) {
        // A short read is a malformed file; any other read failure (a
        // directory path, for instance) is I/O, not a format verdict.
        return Err(if err.kind() == std::io::ErrorKind::UnexpectedEof {
            ModelLoadError::InvalidFormat {
                path: path.to_path_buf(),
                found: String::from_utf8_lossy(&magic).into_owned(),
            }
        } else {
            ModelLoadError::Io(err)
        });
    }
    if !MODEL_MAGICS.iter().any(|m| magic == **m) {
        return Err(ModelLoadError::InvalidFormat {
            path: path.to_path_buf(),
            found: String::from_utf8_lossy(&magic).into_owned(),
        });
    }
    Ok(())
}

fn system_info() -> String {
    let info = unsafe { sys::whisper_print_system_info() };
    if info.is_null() {
        return String::new();
    }
    unsafe { CStr::from_ptr(info) }.to_string_lossy().into_owned()
}
