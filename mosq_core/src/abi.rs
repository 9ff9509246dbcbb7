//! Host ABI definitions for the Mosquitto 2.x plugin interface.
//!
//! Everything in this module mirrors `mosquitto.h`, `mosquitto_broker.h` and
//! `mosquitto_plugin.h`. The values are fixed by the broker and must not be
//! renumbered.

use std::marker::{PhantomData, PhantomPinned};

use libc::{c_char, c_int, c_void};

/// Plugin interface version this adapter speaks.
pub const MOSQ_PLUGIN_VERSION: c_int = 5;

/// Returned from version negotiation when no mutual version exists.
pub const VERSION_UNSUPPORTED: c_int = -1;

pub const MOSQ_ERR_AUTH_CONTINUE: c_int = -4;
pub const MOSQ_ERR_SUCCESS: c_int = 0;
pub const MOSQ_ERR_NOMEM: c_int = 1;
pub const MOSQ_ERR_INVAL: c_int = 3;
pub const MOSQ_ERR_NOT_FOUND: c_int = 6;
pub const MOSQ_ERR_NOT_SUPPORTED: c_int = 10;
pub const MOSQ_ERR_AUTH: c_int = 11;
pub const MOSQ_ERR_ACL_DENIED: c_int = 12;
pub const MOSQ_ERR_UNKNOWN: c_int = 13;
pub const MOSQ_ERR_PLUGIN_DEFER: c_int = 17;
pub const MOSQ_ERR_ALREADY_EXISTS: c_int = 31;

pub const MOSQ_LOG_NONE: c_int = 0;
pub const MOSQ_LOG_INFO: c_int = 1 << 0;
pub const MOSQ_LOG_NOTICE: c_int = 1 << 1;
pub const MOSQ_LOG_WARNING: c_int = 1 << 2;
pub const MOSQ_LOG_ERR: c_int = 1 << 3;
pub const MOSQ_LOG_DEBUG: c_int = 1 << 4;

/// Opaque `mosquitto_plugin_id_t`.
///
/// Only ever seen behind a raw pointer handed out by the broker. The marker
/// keeps the type `!Send`, `!Sync` and `!Unpin` so it cannot be constructed or
/// moved on the Rust side.
#[repr(C)]
pub struct PluginId {
    _data: [u8; 0],
    _marker: PhantomData<(*mut u8, PhantomPinned)>,
}

/// One `plugin_opt_<key> <value>` line from `mosquitto.conf` (`struct mosquitto_opt`).
#[repr(C)]
#[derive(Debug, Clone, Copy)]
pub struct MosquittoOpt {
    pub key: *mut c_char,
    pub value: *mut c_char,
}

/// Generic broker event callback (`MOSQ_FUNC_generic_callback`).
///
/// Arguments are the event id, the event-specific payload and the userdata
/// pointer given at registration. The return value is the broker decision.
pub type EventCallback =
    unsafe extern "C" fn(event: c_int, event_data: *mut c_void, userdata: *mut c_void) -> c_int;

/// Events a plugin can subscribe to (`enum mosquitto_plugin_event`).
#[repr(i32)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EventKind {
    Reload = 1,
    AclCheck = 2,
    BasicAuth = 3,
    ExtAuthStart = 4,
    ExtAuthContinue = 5,
    Control = 6,
    Message = 7,
    PskKey = 8,
    Tick = 9,
    Disconnect = 10,
}

impl EventKind {
    pub fn as_raw(self) -> c_int {
        self as c_int
    }

    pub fn from_raw(raw: c_int) -> Option<Self> {
        let kind = match raw {
            1 => EventKind::Reload,
            2 => EventKind::AclCheck,
            3 => EventKind::BasicAuth,
            4 => EventKind::ExtAuthStart,
            5 => EventKind::ExtAuthContinue,
            6 => EventKind::Control,
            7 => EventKind::Message,
            8 => EventKind::PskKey,
            9 => EventKind::Tick,
            10 => EventKind::Disconnect,
            _ => return None,
        };
        Some(kind)
    }

    pub fn name(self) -> &'static str {
        match self {
            EventKind::Reload => "reload",
            EventKind::AclCheck => "acl_check",
            EventKind::BasicAuth => "basic_auth",
            EventKind::ExtAuthStart => "ext_auth_start",
            EventKind::ExtAuthContinue => "ext_auth_continue",
            EventKind::Control => "control",
            EventKind::Message => "message",
            EventKind::PskKey => "psk_key",
            EventKind::Tick => "tick",
            EventKind::Disconnect => "disconnect",
        }
    }
}

/// The `void **userdata` slot handed to `mosquitto_plugin_init`.
///
/// The broker keeps the slot and later resolves it once, passing the stored
/// value to cleanup as a [`UserData`]. The two shapes are
/// distinct types; there is no conversion between them.
#[repr(transparent)]
#[derive(Debug, Clone, Copy)]
pub struct UserDataSlot(*mut *mut c_void);

impl UserDataSlot {
    pub fn from_raw(slot: *mut *mut c_void) -> Self {
        UserDataSlot(slot)
    }

    pub fn as_raw(self) -> *mut *mut c_void {
        self.0
    }

    pub fn is_null(self) -> bool {
        self.0.is_null()
    }

    /// Stores `value` into the slot so the broker returns it at cleanup.
    ///
    /// # Safety
    /// The slot must be the live pointer the broker passed to init.
    pub unsafe fn store(self, value: *mut c_void) -> bool {
        if self.0.is_null() {
            return false;
        }
        *self.0 = value;
        true
    }
}

/// The already-resolved `void *userdata` handed to `mosquitto_plugin_cleanup`.
#[repr(transparent)]
#[derive(Debug, Clone, Copy)]
pub struct UserData(*mut c_void);

impl UserData {
    pub fn from_raw(value: *mut c_void) -> Self {
        UserData(value)
    }

    pub fn as_raw(self) -> *mut c_void {
        self.0
    }

    pub fn is_null(self) -> bool {
        self.0.is_null()
    }
}

/// Human readable name for a broker status code, used in log lines.
pub fn status_name(code: c_int) -> &'static str {
    match code {
        MOSQ_ERR_AUTH_CONTINUE => "auth_continue",
        MOSQ_ERR_SUCCESS => "success",
        MOSQ_ERR_NOMEM => "nomem",
        MOSQ_ERR_INVAL => "inval",
        MOSQ_ERR_NOT_FOUND => "not_found",
        MOSQ_ERR_NOT_SUPPORTED => "not_supported",
        MOSQ_ERR_AUTH => "auth",
        MOSQ_ERR_ACL_DENIED => "acl_denied",
        MOSQ_ERR_UNKNOWN => "unknown",
        MOSQ_ERR_PLUGIN_DEFER => "plugin_defer",
        MOSQ_ERR_ALREADY_EXISTS => "already_exists",
        _ => "other",
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::ptr;

    #[test]
    fn event_kind_round_trips_through_raw_ids() {
        assert_eq!(EventKind::BasicAuth.as_raw(), 3);
        assert_eq!(EventKind::AclCheck.as_raw(), 2);
        assert_eq!(EventKind::from_raw(3), Some(EventKind::BasicAuth));
        assert_eq!(EventKind::from_raw(0), None);
        assert_eq!(EventKind::from_raw(11), None);
    }

    #[test]
    fn user_data_slot_store_writes_through_once() {
        let mut cell: *mut c_void = ptr::null_mut();
        let mut marker = 7u8;
        let slot = UserDataSlot::from_raw(&mut cell);

        assert!(unsafe { slot.store(&mut marker as *mut u8 as *mut c_void) });
        assert_eq!(cell, &mut marker as *mut u8 as *mut c_void);

        let resolved = UserData::from_raw(cell);
        assert!(!resolved.is_null());
    }

    #[test]
    fn null_slot_is_not_written() {
        let slot = UserDataSlot::from_raw(ptr::null_mut());
        assert!(slot.is_null());
        assert!(!unsafe { slot.store(ptr::null_mut()) });
    }

    #[test]
    fn handles_have_pointer_layout() {
        assert_eq!(std::mem::size_of::<UserDataSlot>(), std::mem::size_of::<*mut *mut c_void>());
        assert_eq!(std::mem::size_of::<UserData>(), std::mem::size_of::<*mut c_void>());
        assert_eq!(std::mem::size_of::<MosquittoOpt>(), 2 * std::mem::size_of::<*mut c_char>());
    }
}
