use std::fmt;
use std::ptr;

use libc::c_int;

use crate::abi::{
    status_name, EventCallback, EventKind, PluginId, MOSQ_ERR_INVAL, MOSQ_ERR_SUCCESS, MOSQ_ERR_UNKNOWN,
};
use crate::host;
use crate::runtime::DecisionRuntime;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RegistryOp {
    Register,
    Unregister,
}

/// A non-success status from the broker's callback registry.
///
/// `code()` is the broker's status unchanged, suitable for returning straight
/// back across the C boundary.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RegistryError {
    pub op: RegistryOp,
    pub event: EventKind,
    code: c_int,
}

impl RegistryError {
    pub(crate) fn new(op: RegistryOp, event: EventKind, code: c_int) -> Self {
        RegistryError { op, event, code }
    }

    pub fn code(&self) -> c_int {
        self.code
    }
}

impl fmt::Display for RegistryError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let op = match self.op {
            RegistryOp::Register => "register",
            RegistryOp::Unregister => "unregister",
        };
        write!(
            f,
            "Failed to {} {} callback: {} ({})",
            op,
            self.event.name(),
            status_name(self.code),
            self.code
        )
    }
}

impl std::error::Error for RegistryError {}

fn check(op: RegistryOp, event: EventKind, code: c_int) -> Result<(), RegistryError> {
    if code == MOSQ_ERR_SUCCESS {
        Ok(())
    } else {
        Err(RegistryError::new(op, event, code))
    }
}

/// Registers `callback` for `event` under `identifier`.
///
/// No event data and no userdata are attached; runtimes keep their own state.
/// Registering the same `(identifier, event)` twice without unregistering in
/// between is a caller error whose outcome is up to the broker.
pub fn register(
    identifier: *mut PluginId,
    event: EventKind,
    callback: EventCallback,
) -> Result<(), RegistryError> {
    let api = host::get().map_err(|_| RegistryError::new(RegistryOp::Register, event, MOSQ_ERR_UNKNOWN))?;

    let rc = unsafe {
        (api.callback_register)(identifier, event.as_raw(), callback, ptr::null(), ptr::null_mut())
    };
    crate::log_debug!(&format!("register {} -> {}", event.name(), status_name(rc)));
    check(RegistryOp::Register, event, rc)
}

/// Removes the `(identifier, event, callback)` registration.
///
/// `callback` must be the same function that was registered. Unregistering
/// an event with nothing registered reports the broker's not-found status.
pub fn unregister(
    identifier: *mut PluginId,
    event: EventKind,
    callback: EventCallback,
) -> Result<(), RegistryError> {
    let api = host::get().map_err(|_| RegistryError::new(RegistryOp::Unregister, event, MOSQ_ERR_UNKNOWN))?;

    let rc = unsafe { (api.callback_unregister)(identifier, event.as_raw(), callback, ptr::null()) };
    crate::log_debug!(&format!("unregister {} -> {}", event.name(), status_name(rc)));
    check(RegistryOp::Unregister, event, rc)
}

pub fn register_basic_auth(
    identifier: *mut PluginId,
    runtime: &DecisionRuntime,
) -> Result<(), RegistryError> {
    register(identifier, EventKind::BasicAuth, runtime.basic_auth)
}

pub fn unregister_basic_auth(
    identifier: *mut PluginId,
    runtime: &DecisionRuntime,
) -> Result<(), RegistryError> {
    unregister(identifier, EventKind::BasicAuth, runtime.basic_auth)
}

pub fn register_acl_check(
    identifier: *mut PluginId,
    runtime: &DecisionRuntime,
) -> Result<(), RegistryError> {
    register(identifier, EventKind::AclCheck, runtime.acl_check)
}

pub fn unregister_acl_check(
    identifier: *mut PluginId,
    runtime: &DecisionRuntime,
) -> Result<(), RegistryError> {
    unregister(identifier, EventKind::AclCheck, runtime.acl_check)
}

fn status_of(result: Result<(), RegistryError>) -> c_int {
    match result {
        Ok(()) => MOSQ_ERR_SUCCESS,
        Err(e) => e.code(),
    }
}

fn raw_call(
    op: RegistryOp,
    identifier: *mut PluginId,
    event: c_int,
    callback: EventCallback,
) -> c_int {
    let api = match host::get() {
        Ok(api) => api,
        Err(_) => return MOSQ_ERR_UNKNOWN,
    };
    // Raw ids go to the broker untouched, including ones this crate has no
    // `EventKind` for.
    unsafe {
        match op {
            RegistryOp::Register => {
                (api.callback_register)(identifier, event, callback, ptr::null(), ptr::null_mut())
            }
            RegistryOp::Unregister => (api.callback_unregister)(identifier, event, callback, ptr::null()),
        }
    }
}

/// C form of [`register`] for runtimes living outside Rust. Returns the
/// broker status verbatim, or `MOSQ_ERR_INVAL` for a null callback.
///
/// # Safety
/// `identifier` must be the id the broker passed to init.
#[no_mangle]
pub unsafe extern "C" fn mosq_bridge_register_event_callback(
    identifier: *mut PluginId,
    event: c_int,
    callback: Option<EventCallback>,
) -> c_int {
    let Some(callback) = callback else {
        return MOSQ_ERR_INVAL;
    };
    match EventKind::from_raw(event) {
        Some(kind) => status_of(register(identifier, kind, callback)),
        None => raw_call(RegistryOp::Register, identifier, event, callback),
    }
}

/// C form of [`unregister`]. Returns the broker status verbatim, or
/// `MOSQ_ERR_INVAL` for a null callback.
///
/// # Safety
/// `identifier` must be the id the broker passed to init.
#[no_mangle]
pub unsafe extern "C" fn mosq_bridge_unregister_event_callback(
    identifier: *mut PluginId,
    event: c_int,
    callback: Option<EventCallback>,
) -> c_int {
    let Some(callback) = callback else {
        return MOSQ_ERR_INVAL;
    };
    match EventKind::from_raw(event) {
        Some(kind) => status_of(unregister(identifier, kind, callback)),
        None => raw_call(RegistryOp::Unregister, identifier, event, callback),
    }
}
