extern crate mosq_core;

use std::fmt;
use std::sync::RwLock;

use once_cell::sync::Lazy;
use serde::Deserialize;

use mosq_core::abi::*;
use mosq_core::libc::{c_int, c_void};
use mosq_core::options::OptionList;
use mosq_core::runtime::{self, DecisionRuntime, PluginSession};
use mosq_core::{declare_mosquitto_plugin, log_error, log_info, log_relay, log_warn, logging};

pub const PLUGIN_NAME: &str = "plugin_gatekeeper";

const SUPPORTED_VERSIONS: [c_int; 1] = [MOSQ_PLUGIN_VERSION];

/// What to answer for an event.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Policy {
    Allow,
    Deny,
    /// Leave the decision to the next plugin or the broker's own checks
    #[default]
    Defer,
}

impl Policy {
    fn answer(self, deny_code: c_int) -> c_int {
        match self {
            Policy::Allow => MOSQ_ERR_SUCCESS,
            Policy::Deny => deny_code,
            Policy::Defer => MOSQ_ERR_PLUGIN_DEFER,
        }
    }
}

impl TryFrom<String> for Policy {
    type Error = String;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        match value.trim().to_lowercase().as_str() {
            "allow" => Ok(Policy::Allow),
            "deny" => Ok(Policy::Deny),
            "defer" => Ok(Policy::Defer),
            other => Err(format!("unknown policy '{}' (expected allow, deny or defer)", other)),
        }
    }
}

impl fmt::Display for Policy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Policy::Allow => "allow",
            Policy::Deny => "deny",
            Policy::Defer => "defer",
        })
    }
}

fn deserialize_policy<'de, D>(deserializer: D) -> Result<Policy, D::Error>
where
    D: serde::Deserializer<'de>,
{
    let raw = String::deserialize(deserializer)?;
    Policy::try_from(raw).map_err(serde::de::Error::custom)
}

/// `plugin_opt_auth_policy` and `plugin_opt_acl_policy`. Logging options share
/// the same list and are ignored here.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
pub struct GateSettings {
    #[serde(default, deserialize_with = "deserialize_policy")]
    pub auth_policy: Policy,
    #[serde(default, deserialize_with = "deserialize_policy")]
    pub acl_policy: Policy,
}

static SETTINGS: Lazy<RwLock<GateSettings>> = Lazy::new(|| RwLock::new(GateSettings::default()));

static SESSION: PluginSession = PluginSession::new(RUNTIME);

/// Settings in force. A poisoned lock denies everything.
fn current_settings() -> GateSettings {
    SETTINGS.read().map(|s| *s).unwrap_or(GateSettings {
        auth_policy: Policy::Deny,
        acl_policy: Policy::Deny,
    })
}

unsafe extern "C" fn gate_version(supported_version_count: c_int, supported_versions: *mut c_int) -> c_int {
    let offered = runtime::offered_versions(supported_version_count, supported_versions.cast_const());
    runtime::negotiate(offered, &SUPPORTED_VERSIONS)
}

unsafe extern "C" fn gate_init(
    identifier: *mut PluginId,
    _userdata: UserDataSlot,
    options: *mut MosquittoOpt,
    option_count: c_int,
) -> c_int {
    let options = OptionList::from_raw(options, option_count);

    if let Err(e) = logging::init_logger(PLUGIN_NAME, &options) {
        log_relay::log_str(MOSQ_LOG_ERR, &e);
        return MOSQ_ERR_INVAL;
    }

    let settings = match options.deserialize::<GateSettings>() {
        Ok(settings) => settings,
        Err(e) => {
            log_error!(&e);
            return MOSQ_ERR_INVAL;
        }
    };
    match SETTINGS.write() {
        Ok(mut guard) => *guard = settings,
        Err(_) => return MOSQ_ERR_UNKNOWN,
    }

    if let Err(e) = SESSION.open(identifier) {
        log_error!(&e.to_string());
        return e.code();
    }

    log_info!(
        "plugin initialized",
        Some(format!("auth_policy={} acl_policy={}", settings.auth_policy, settings.acl_policy))
    );
    MOSQ_ERR_SUCCESS
}

unsafe extern "C" fn gate_cleanup(_userdata: UserData, _options: *mut MosquittoOpt, _option_count: c_int) -> c_int {
    let rc = match SESSION.close() {
        Ok(()) => MOSQ_ERR_SUCCESS,
        Err(e) => {
            log_warn!(&e.to_string());
            e.code()
        }
    };
    log_info!("plugin cleaned up");
    logging::shutdown_logger();
    rc
}

unsafe extern "C" fn gate_basic_auth(_event: c_int, _event_data: *mut c_void, _userdata: *mut c_void) -> c_int {
    current_settings().auth_policy.answer(MOSQ_ERR_AUTH)
}

unsafe extern "C" fn gate_acl_check(_event: c_int, _event_data: *mut c_void, _userdata: *mut c_void) -> c_int {
    current_settings().acl_policy.answer(MOSQ_ERR_ACL_DENIED)
}

pub const RUNTIME: DecisionRuntime = DecisionRuntime {
    version: gate_version,
    init: gate_init,
    cleanup: gate_cleanup,
    basic_auth: gate_basic_auth,
    acl_check: gate_acl_check,
};

declare_mosquitto_plugin!(RUNTIME);
