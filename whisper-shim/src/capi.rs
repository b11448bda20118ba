//! The exported C surface: seven flat functions, no structs by value.
//!
//! This is the unchecked layer, declared for C callers in
//! `include/whisper_shim.h`. It validates only what the engine cannot
//! survive being handed (a null path, a null context on free) and leaves
//! index and lifecycle misuse undefined rather than masking engine-level
//! contract violations. Hosts that want checking use the Rust API; both
//! layers build their parameter blocks the same way.

use std::ffi::{c_char, c_int, CStr};
use std::ptr;

use whisper_rs::whisper_rs_sys as sys;

use crate::params::{raw_full_params, SamplingStrategy};
use crate::transcriber::Transcriber;

/// Loads a model and returns an owned context handle, or null on failure
/// (missing or malformed file, non-UTF-8 path, engine refusal). The reason
/// is reported through the `log` facade.
///
/// # Safety
/// `model_path` must be null or a valid NUL-terminated string.
#[no_mangle]
pub unsafe extern "C" fn whisper_shim_init(model_path: *const c_char) -> *mut Transcriber {
    if model_path.is_null() {
        return ptr::null_mut();
    }
    let path = match CStr::from_ptr(model_path).to_str() {
        Ok(path) => path,
        Err(_) => {
            log::error!("model path is not valid UTF-8");
            return ptr::null_mut();
        }
    };
    match Transcriber::from_model_file(path) {
        Ok(transcriber) => Box::into_raw(Box::new(transcriber)),
        Err(err) => {
            log::error!("{err}");
            ptr::null_mut()
        }
    }
}

/// Runs greedy transcription over `n_samples` mono f32 samples at 16 kHz
/// and returns the engine's status, 0 on success. `n_threads <= 0` keeps
/// the engine default; `language` may be null for auto-detection;
/// `translate != 0` translates the result to English. Blocks until the
/// engine finishes, and replaces the context's segment list.
///
/// # Safety
/// `ctx` must be a live handle from [`whisper_shim_init`], not used
/// concurrently from another thread. `samples` must point to `n_samples`
/// readable floats. `language`, if non-null, must be a NUL-terminated
/// string that outlives this call; it is borrowed, never stored.
#[no_mangle]
pub unsafe extern "C" fn whisper_shim_transcribe(
    ctx: *mut Transcriber,
    samples: *const f32,
    n_samples: c_int,
    n_threads: c_int,
    language: *const c_char,
    translate: c_int,
) -> c_int {
    let mut fp = raw_full_params(SamplingStrategy::default());
    if n_threads > 0 {
        fp.n_threads = n_threads;
    }
    // The engine's default block carries language "en"; null must reach the
    // engine for auto-detection, so no null guard here.
    fp.language = language;
    fp.translate = translate != 0;
    sys::whisper_full((*ctx).as_ptr(), fp, samples, n_samples)
}

/// Number of segments produced by the most recent transcription on `ctx`.
///
/// # Safety
/// `ctx` must be a live handle from [`whisper_shim_init`].
#[no_mangle]
pub unsafe extern "C" fn whisper_shim_segment_count(ctx: *mut Transcriber) -> c_int {
    sys::whisper_full_n_segments((*ctx).as_ptr())
}

/// Borrowed text of segment `index`; valid until the next transcribe or
/// free on this context. The adapter never copies or frees it.
///
/// # Safety
/// `ctx` must be a live handle and `index` in `0..segment_count`; neither
/// is checked here.
#[no_mangle]
pub unsafe extern "C" fn whisper_shim_segment_text(
    ctx: *mut Transcriber,
    index: c_int,
) -> *const c_char {
    sys::whisper_full_get_segment_text((*ctx).as_ptr(), index)
}

/// Start offset of segment `index` in centiseconds.
///
/// # Safety
/// Same contract as [`whisper_shim_segment_text`].
#[no_mangle]
pub unsafe extern "C" fn whisper_shim_segment_start(ctx: *mut Transcriber, index: c_int) -> i64 {
    sys::whisper_full_get_segment_t0((*ctx).as_ptr(), index)
}

/// End offset of segment `index` in centiseconds.
///
/// # Safety
/// Same contract as [`whisper_shim_segment_text`].
#[no_mangle]
pub unsafe extern "C" fn whisper_shim_segment_end(ctx: *mut Transcriber, index: c_int) -> i64 {
    sys::whisper_full_get_segment_t1((*ctx).as_ptr(), index)
}

/// Releases a context and everything it owns. Null is a no-op.
///
/// # Safety
/// `ctx` must be null or a live handle from [`whisper_shim_init`];
/// releasing the same handle twice is undefined behavior.
#[no_mangle]
pub unsafe extern "C" fn whisper_shim_free(ctx: *mut Transcriber) {
    if ctx.is_null() {
        return;
    }
    drop(Box::from_raw(ctx));
}
