use libc::{c_char, c_int, c_void};
use libloading::Library;
use once_cell::sync::OnceCell;

use crate::abi::{EventCallback, PluginId};

/// `mosquitto_callback_register(identifier, event, cb_func, event_data, userdata)`
pub type CallbackRegisterFn = unsafe extern "C" fn(
    identifier: *mut PluginId,
    event: c_int,
    cb_func: EventCallback,
    event_data: *const c_void,
    userdata: *mut c_void,
) -> c_int;

/// `mosquitto_callback_unregister(identifier, event, cb_func, event_data)`
pub type CallbackUnregisterFn = unsafe extern "C" fn(
    identifier: *mut PluginId,
    event: c_int,
    cb_func: EventCallback,
    event_data: *const c_void,
) -> c_int;

/// `mosquitto_log_printf(level, fmt, ...)`. Only ever called through
/// [`crate::log_relay`], never handed to a runtime.
pub type LogPrintfFn = unsafe extern "C" fn(level: c_int, fmt: *const c_char, ...);

const REGISTER_SYMBOL: &[u8] = b"mosquitto_callback_register\0";
const UNREGISTER_SYMBOL: &[u8] = b"mosquitto_callback_unregister\0";
const LOG_PRINTF_SYMBOL: &[u8] = b"mosquitto_log_printf\0";

/// The broker functions this adapter calls back into.
///
/// The plugin library is not linked against the broker. The table is looked up
/// in the hosting process the first time it is needed, or installed up front
/// with [`install`] when the functions come from somewhere else.
#[derive(Clone, Copy)]
pub struct HostApi {
    pub callback_register: CallbackRegisterFn,
    pub callback_unregister: CallbackUnregisterFn,
    pub log_printf: LogPrintfFn,
}

static HOST: OnceCell<HostApi> = OnceCell::new();
static LOOKUP_ERROR: OnceCell<String> = OnceCell::new();

impl HostApi {
    /// Resolves the broker functions from an already loaded library.
    pub fn resolve_from(library: &Library) -> Result<HostApi, String> {
        unsafe {
            let register = library
                .get::<CallbackRegisterFn>(REGISTER_SYMBOL)
                .map_err(|e| format!("Missing host symbol mosquitto_callback_register: {}", e))?;
            let unregister = library
                .get::<CallbackUnregisterFn>(UNREGISTER_SYMBOL)
                .map_err(|e| format!("Missing host symbol mosquitto_callback_unregister: {}", e))?;
            let log_printf = library
                .get::<LogPrintfFn>(LOG_PRINTF_SYMBOL)
                .map_err(|e| format!("Missing host symbol mosquitto_log_printf: {}", e))?;

            Ok(HostApi {
                callback_register: *register,
                callback_unregister: *unregister,
                log_printf: *log_printf,
            })
        }
    }

    /// Resolves the broker functions from the process that loaded the plugin.
    pub fn resolve_from_process() -> Result<HostApi, String> {
        let process = process_library()?;
        Self::resolve_from(&process)
    }
}

#[cfg(unix)]
fn process_library() -> Result<Library, String> {
    Ok(libloading::os::unix::Library::this().into())
}

#[cfg(windows)]
fn process_library() -> Result<Library, String> {
    libloading::os::windows::Library::this()
        .map(Into::into)
        .map_err(|e| format!("Failed to open host process: {}", e))
}

/// Installs `api` as the host table. Only the first install takes effect.
pub fn install(api: HostApi) -> Result<(), String> {
    HOST.set(api)
        .map_err(|_| "Host API already installed".to_string())
}

/// Returns the host table, resolving it from the process on first use.
///
/// A failed lookup is remembered and not retried; [`install`] still takes
/// effect afterwards.
pub fn get() -> Result<&'static HostApi, String> {
    if let Some(api) = HOST.get() {
        return Ok(api);
    }
    if let Some(err) = LOOKUP_ERROR.get() {
        return Err(err.clone());
    }
    match HostApi::resolve_from_process() {
        Ok(api) => Ok(HOST.get_or_init(|| api)),
        Err(e) => {
            let _ = LOOKUP_ERROR.set(e.clone());
            Err(e)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

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

    #[test]
    fn failed_lookup_is_cached_until_install() {
        // No broker symbols in a test binary.
        let first = get().err();
        assert!(first.is_some());
        assert_eq!(LOOKUP_ERROR.get().cloned(), first);
        assert_eq!(get().err(), first);

        install(HostApi {
            callback_register: register,
            callback_unregister: unregister,
            log_printf: mosq_test_host::fake_log_printf,
        })
        .unwrap();
        assert!(get().is_ok());
        assert!(install(HostApi {
            callback_register: register,
            callback_unregister: unregister,
            log_printf: mosq_test_host::fake_log_printf,
        })
        .is_err());
    }
}
