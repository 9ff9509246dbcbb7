/// Declares the three entry points Mosquitto looks up when it loads a plugin
/// and forwards them to a [`DecisionRuntime`](crate::runtime::DecisionRuntime).
///
/// This is the only place the broker's own symbol names are emitted. Runtime
/// functions stay unexported and are reached through the table.
///
/// ```ignore
/// const RUNTIME: DecisionRuntime = DecisionRuntime {
///     version: gate_version,
///     init: gate_init,
///     cleanup: gate_cleanup,
///     basic_auth: gate_basic_auth,
///     acl_check: gate_acl_check,
/// };
///
/// declare_mosquitto_plugin!(RUNTIME);
/// ```
#[macro_export]
macro_rules! declare_mosquitto_plugin {
    ($runtime:expr) => {
        /// # Safety
        /// Called by the broker with its supported version list.
        #[no_mangle]
        pub unsafe extern "C" fn mosquitto_plugin_version(
            supported_version_count: $crate::libc::c_int,
            supported_versions: *const $crate::libc::c_int,
        ) -> $crate::libc::c_int {
            $crate::lifecycle::negotiate_version(&$runtime, supported_version_count, supported_versions)
        }

        /// # Safety
        /// Called by the broker once the version is agreed.
        #[no_mangle]
        pub unsafe extern "C" fn mosquitto_plugin_init(
            identifier: *mut $crate::abi::PluginId,
            userdata: *mut *mut $crate::libc::c_void,
            options: *mut $crate::abi::MosquittoOpt,
            option_count: $crate::libc::c_int,
        ) -> $crate::libc::c_int {
            $crate::lifecycle::init(&$runtime, identifier, userdata, options, option_count)
        }

        /// # Safety
        /// Called by the broker at unload with the value stored at init.
        #[no_mangle]
        pub unsafe extern "C" fn mosquitto_plugin_cleanup(
            userdata: *mut $crate::libc::c_void,
            options: *mut $crate::abi::MosquittoOpt,
            option_count: $crate::libc::c_int,
        ) -> $crate::libc::c_int {
            $crate::lifecycle::cleanup(&$runtime, userdata, options, option_count)
        }
    };
}
