//! Forwarding for the three broker-mandated entry points.
//!
//! The `#[no_mangle]` symbols themselves are generated by
//! [`declare_mosquitto_plugin!`](crate::declare_mosquitto_plugin); they call
//! into these functions, which hand everything to the runtime untouched and
//! return its status unchanged. Nothing here retries or recovers.

use libc::{c_int, c_void};

use crate::abi::{MosquittoOpt, PluginId, UserData, UserDataSlot, VERSION_UNSUPPORTED};
use crate::runtime::DecisionRuntime;

/// `mosquitto_plugin_version` forwarding.
///
/// The broker's list is `const int *`; the runtime signature takes `*mut` and
/// receives the same pointer reinterpreted in place. The runtime only reads it.
///
/// # Safety
/// `supported_versions` must be null or point to `supported_version_count`
/// readable ints.
pub unsafe fn negotiate_version(
    runtime: &DecisionRuntime,
    supported_version_count: c_int,
    supported_versions: *const c_int,
) -> c_int {
    if supported_versions.is_null() || supported_version_count <= 0 {
        return VERSION_UNSUPPORTED;
    }
    let version = (runtime.version)(supported_version_count, supported_versions.cast_mut());
    crate::log_debug!(&format!("negotiated plugin version {}", version));
    version
}

/// `mosquitto_plugin_init` forwarding. `userdata` is the broker's `void **`
/// slot.
///
/// # Safety
/// Arguments must be the ones the broker passed to `mosquitto_plugin_init`.
pub unsafe fn init(
    runtime: &DecisionRuntime,
    identifier: *mut PluginId,
    userdata: *mut *mut c_void,
    options: *mut MosquittoOpt,
    option_count: c_int,
) -> c_int {
    let rc = (runtime.init)(identifier, UserDataSlot::from_raw(userdata), options, option_count);
    crate::log_debug!(&format!("runtime init -> {}", crate::abi::status_name(rc)));
    rc
}

/// `mosquitto_plugin_cleanup` forwarding. `userdata` is the value the broker
/// resolved from the init slot, one level of indirection less than at init.
///
/// # Safety
/// Arguments must be the ones the broker passed to `mosquitto_plugin_cleanup`.
pub unsafe fn cleanup(
    runtime: &DecisionRuntime,
    userdata: *mut c_void,
    options: *mut MosquittoOpt,
    option_count: c_int,
) -> c_int {
    let rc = (runtime.cleanup)(UserData::from_raw(userdata), options, option_count);
    crate::log_debug!(&format!("runtime cleanup -> {}", crate::abi::status_name(rc)));
    rc
}
