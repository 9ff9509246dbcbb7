#![allow(dead_code)]

use std::ffi::CString;
use std::ptr;

use mosq_core::abi::{EventCallback, MosquittoOpt, PluginId};
use mosq_core::host::{self, HostApi};
use mosq_core::libc::{c_int, c_void};

unsafe extern "C" fn register(
    identifier: *mut PluginId,
    event: c_int,
    callback: EventCallback,
    event_data: *const c_void,
    userdata: *mut c_void,
) -> c_int {
    mosq_test_host::fake_callback_register(identifier.cast(), event, callback, event_data, userdata)
}

unsafe extern "C" fn unregister(
    identifier: *mut PluginId,
    event: c_int,
    callback: EventCallback,
    event_data: *const c_void,
) -> c_int {
    mosq_test_host::fake_callback_unregister(identifier.cast(), event, callback, event_data)
}

/// Points the adapter at the in-process broker stand-in.
pub fn install_fake_host() {
    let _ = host::install(HostApi {
        callback_register: register,
        callback_unregister: unregister,
        log_printf: mosq_test_host::fake_log_printf,
    });
}

pub fn new_plugin_id() -> *mut PluginId {
    mosq_test_host::new_plugin_id().cast()
}

pub fn registered(id: *mut PluginId, event: c_int) -> usize {
    mosq_test_host::registered(id.cast(), event)
}

pub fn fire(id: *mut PluginId, event: c_int) -> Option<c_int> {
    mosq_test_host::fire(id.cast(), event, ptr::null_mut())
}

/// `plugin_opt_*` entries with owned strings, laid out like the broker's array.
pub struct OwnedOptions {
    _strings: Vec<CString>,
    entries: Vec<MosquittoOpt>,
}

impl OwnedOptions {
    pub fn new(pairs: &[(&str, &str)]) -> Self {
        let mut strings = Vec::new();
        let mut entries = Vec::new();
        for (key, value) in pairs {
            let key = CString::new(*key).unwrap();
            let value = CString::new(*value).unwrap();
            entries.push(MosquittoOpt {
                key: key.as_ptr() as *mut _,
                value: value.as_ptr() as *mut _,
            });
            strings.push(key);
            strings.push(value);
        }
        OwnedOptions { _strings: strings, entries }
    }

    pub fn empty() -> Self {
        Self::new(&[])
    }

    pub fn as_mut_ptr(&mut self) -> *mut MosquittoOpt {
        if self.entries.is_empty() {
            ptr::null_mut()
        } else {
            self.entries.as_mut_ptr()
        }
    }

    pub fn count(&self) -> c_int {
        self.entries.len() as c_int
    }
}
