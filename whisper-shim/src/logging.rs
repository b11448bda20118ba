//! Routes engine diagnostics into the `log` facade.
//!
//! Left alone, the engine prints its diagnostics straight to stderr, past
//! whatever logging the host set up. Rather than silencing the stream
//! globally, a process-wide hook forwards each line to `log` under the
//! `whisper` target and lets the host's logger decide what to surface.

use std::ffi::{c_char, c_void, CStr};
use std::sync::Once;

use whisper_rs::whisper_rs_sys as sys;

static INSTALL: Once = Once::new();

/// Installs the engine-to-`log` forwarding hook.
///
/// Process-wide and idempotent. Runs automatically on first context
/// creation; exposed for embedders that want engine output routed before
/// any model is loaded.
pub fn install_engine_logging() {
    INSTALL.call_once(|| unsafe {
        sys::whisper_log_set(Some(forward_to_log), std::ptr::null_mut());
    });
}

/// `ggml_log_callback` trampoline. Must not unwind into the engine.
unsafe extern "C" fn forward_to_log(
    level: sys::ggml_log_level,
    text: *const c_char,
    _user_data: *mut c_void,
) {
    if text.is_null() {
        return;
    }
    let text = CStr::from_ptr(text).to_string_lossy();
    let text = text.trim_end();
    if text.is_empty() {
        return;
    }
    // The engine's INFO level is mostly load-time banner chatter; demote it
    // so host stderr stays clean. Real problems arrive at WARN and ERROR.
    let level = match level {
        sys::ggml_log_level_GGML_LOG_LEVEL_ERROR => log::Level::Error,
        sys::ggml_log_level_GGML_LOG_LEVEL_WARN => log::Level::Warn,
        sys::ggml_log_level_GGML_LOG_LEVEL_INFO => log::Level::Debug,
        _ => log::Level::Trace,
    };
    log::log!(target: "whisper", level, "{text}");
}
