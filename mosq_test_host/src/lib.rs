//! A stand-in for the three broker functions a plugin calls back into.
//!
//! The callback registry follows Mosquitto's rules: a null identifier is
//! invalid, registering the same `(id, event, callback)` twice reports
//! already-exists, and unregistering something that is not registered reports
//! not-found. [`fire`] plays the broker's side of an event. The logger is a
//! genuine variadic C function that formats with `vsnprintf`, and keeps what
//! it formatted per thread.
//!
//! Nothing here depends on the adapter crate; identifiers are plain
//! `*mut c_void`.

use std::ffi::CStr;
use std::sync::Mutex;

use libc::{c_char, c_int, c_void};

pub const SUCCESS: c_int = 0;
pub const INVAL: c_int = 3;
pub const NOT_FOUND: c_int = 6;
pub const PLUGIN_DEFER: c_int = 17;
pub const ALREADY_EXISTS: c_int = 31;

pub type RawCallback = unsafe extern "C" fn(c_int, *mut c_void, *mut c_void) -> c_int;

extern "C" {
    /// `mosquitto_log_printf` stand-in, defined in `csrc/fake_log.c`.
    pub fn fake_log_printf(level: c_int, fmt: *const c_char, ...);
    fn fake_log_count() -> c_int;
    fn fake_log_entry(index: c_int, level: *mut c_int) -> *const c_char;
    fn fake_log_clear();
}

#[derive(Clone, Copy)]
struct Registration {
    id: usize,
    event: c_int,
    callback: RawCallback,
    userdata: usize,
}

struct Injected {
    id: usize,
    event: c_int,
    code: c_int,
}

static REGISTRY: Mutex<Vec<Registration>> = Mutex::new(Vec::new());
static INJECTED: Mutex<Vec<Injected>> = Mutex::new(Vec::new());
static INJECTED_UNREGISTER: Mutex<Vec<Injected>> = Mutex::new(Vec::new());

fn registry() -> std::sync::MutexGuard<'static, Vec<Registration>> {
    REGISTRY.lock().unwrap_or_else(|p| p.into_inner())
}

/// A fresh identifier, distinct from every other one handed out.
pub fn new_plugin_id() -> *mut c_void {
    Box::into_raw(Box::new(0u64)) as *mut c_void
}

/// Makes the next registration of `event` under `id` fail with `code`.
pub fn fail_next_register(id: *mut c_void, event: c_int, code: c_int) {
    INJECTED
        .lock()
        .unwrap_or_else(|p| p.into_inner())
        .push(Injected { id: id as usize, event, code });
}

/// Makes the next unregistration of `event` under `id` fail with `code`,
/// leaving the registration in place.
pub fn fail_next_unregister(id: *mut c_void, event: c_int, code: c_int) {
    INJECTED_UNREGISTER
        .lock()
        .unwrap_or_else(|p| p.into_inner())
        .push(Injected { id: id as usize, event, code });
}

fn take_injected(list: &Mutex<Vec<Injected>>, id: usize, event: c_int) -> Option<c_int> {
    let mut injected = list.lock().unwrap_or_else(|p| p.into_inner());
    let pos = injected.iter().position(|i| i.id == id && i.event == event)?;
    Some(injected.remove(pos).code)
}

/// `mosquitto_callback_register` stand-in.
///
/// # Safety
/// Only compares pointers; never dereferences them.
pub unsafe extern "C" fn fake_callback_register(
    identifier: *mut c_void,
    event: c_int,
    callback: RawCallback,
    _event_data: *const c_void,
    userdata: *mut c_void,
) -> c_int {
    if identifier.is_null() {
        return INVAL;
    }
    let id = identifier as usize;
    if let Some(code) = take_injected(&INJECTED, id, event) {
        return code;
    }

    let mut registry = registry();
    if registry
        .iter()
        .any(|r| r.id == id && r.event == event && r.callback as usize == callback as usize)
    {
        return ALREADY_EXISTS;
    }
    registry.push(Registration {
        id,
        event,
        callback,
        userdata: userdata as usize,
    });
    SUCCESS
}

/// `mosquitto_callback_unregister` stand-in.
///
/// # Safety
/// Only compares pointers; never dereferences them.
pub unsafe extern "C" fn fake_callback_unregister(
    identifier: *mut c_void,
    event: c_int,
    callback: RawCallback,
    _event_data: *const c_void,
) -> c_int {
    if identifier.is_null() {
        return INVAL;
    }
    let id = identifier as usize;
    if let Some(code) = take_injected(&INJECTED_UNREGISTER, id, event) {
        return code;
    }
    let mut registry = registry();
    match registry
        .iter()
        .position(|r| r.id == id && r.event == event && r.callback as usize == callback as usize)
    {
        Some(pos) => {
            registry.remove(pos);
            SUCCESS
        }
        None => NOT_FOUND,
    }
}

/// Number of callbacks registered for `(id, event)`.
pub fn registered(id: *mut c_void, event: c_int) -> usize {
    registry()
        .iter()
        .filter(|r| r.id == id as usize && r.event == event)
        .count()
}

/// Total registrations held for `id`.
pub fn registrations_for(id: *mut c_void) -> usize {
    registry().iter().filter(|r| r.id == id as usize).count()
}

/// Delivers `event` to the callbacks registered under `id`, in registration
/// order, the way the broker does.
///
/// Returns `None` when nothing is registered, otherwise the first answer that
/// is not a deferral (or the deferral if every callback deferred).
pub fn fire(id: *mut c_void, event: c_int, payload: *mut c_void) -> Option<c_int> {
    let targets: Vec<Registration> = registry()
        .iter()
        .filter(|r| r.id == id as usize && r.event == event)
        .copied()
        .collect();
    if targets.is_empty() {
        return None;
    }

    let mut answer = PLUGIN_DEFER;
    for target in targets {
        let rc = unsafe { (target.callback)(event, payload, target.userdata as *mut c_void) };
        if rc != PLUGIN_DEFER {
            answer = rc;
            break;
        }
    }
    Some(answer)
}

/// Lines formatted by [`fake_log_printf`] on this thread since the last call.
pub fn take_log_lines() -> Vec<(c_int, String)> {
    let mut lines = Vec::new();
    unsafe {
        for index in 0..fake_log_count() {
            let mut level: c_int = 0;
            let entry = fake_log_entry(index, &mut level);
            if !entry.is_null() {
                lines.push((level, CStr::from_ptr(entry).to_string_lossy().into_owned()));
            }
        }
        fake_log_clear();
    }
    lines
}
