//! Fixed-arity relay over the broker's variadic `mosquitto_log_printf`.
//!
//! Runtimes hand over one fully formatted line; it reaches the broker as the
//! single argument of a constant `"%s"` format, so `%` sequences inside the
//! message are never interpreted. Logging is best-effort: a missing host or a
//! failing broker logger is ignored.

use std::ffi::{CStr, CString};

use libc::{c_char, c_int};

use crate::host;

const PASSTHROUGH_FORMAT: &[u8] = b"%s\0";

/// Emits `message` verbatim at `level` (one of the `MOSQ_LOG_*` constants).
pub fn log(level: c_int, message: &CStr) {
    let Ok(api) = host::get() else {
        return;
    };
    unsafe {
        (api.log_printf)(
            level,
            PASSTHROUGH_FORMAT.as_ptr() as *const c_char,
            message.as_ptr(),
        );
    }
}

/// Same as [`log`] for Rust strings. A message containing a NUL byte cannot
/// be passed through unchanged and is dropped.
pub fn log_str(level: c_int, message: &str) {
    if let Ok(line) = CString::new(message) {
        log(level, &line);
    }
}

/// C entry point of the relay for runtimes that cannot call variadic
/// functions. A null message is ignored.
///
/// # Safety
/// `message` must be null or point to a NUL-terminated string.
#[no_mangle]
pub unsafe extern "C" fn mosq_bridge_log(level: c_int, message: *const c_char) {
    if message.is_null() {
        return;
    }
    log(level, CStr::from_ptr(message));
}
