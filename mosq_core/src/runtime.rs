//! The decision runtime seen from the adapter.
//!
//! A runtime is the code that actually decides: it negotiates the version,
//! sets itself up at init, and answers basic-auth and ACL-check events. The
//! adapter reaches it only through a [`DecisionRuntime`] table, so none of
//! these functions are ever exported under the broker's own symbol names.

use std::ptr;
use std::sync::atomic::{AtomicPtr, Ordering};

use libc::c_int;

use crate::abi::{
    EventCallback, EventKind, MosquittoOpt, PluginId, UserData, UserDataSlot, MOSQ_ERR_ALREADY_EXISTS,
    VERSION_UNSUPPORTED,
};
use crate::event_registry::{self, RegistryError, RegistryOp};

/// Runtime side of version negotiation.
///
/// The pointer is typed `*mut` only because the adapter has no read-only
/// array in this calling convention. It refers to the broker's constant list:
/// implementations read it and must never write through it.
pub type VersionFn =
    unsafe extern "C" fn(supported_version_count: c_int, supported_versions: *mut c_int) -> c_int;

pub type InitFn = unsafe extern "C" fn(
    identifier: *mut PluginId,
    userdata: UserDataSlot,
    options: *mut MosquittoOpt,
    option_count: c_int,
) -> c_int;

pub type CleanupFn =
    unsafe extern "C" fn(userdata: UserData, options: *mut MosquittoOpt, option_count: c_int) -> c_int;

/// Entry points of a decision runtime.
#[repr(C)]
#[derive(Clone, Copy)]
pub struct DecisionRuntime {
    pub version: VersionFn,
    pub init: InitFn,
    pub cleanup: CleanupFn,
    pub basic_auth: EventCallback,
    pub acl_check: EventCallback,
}

/// Views the broker's offered version list without copying it.
///
/// A null pointer or a non-positive count gives an empty slice.
///
/// # Safety
/// `versions` must point to at least `count` readable `c_int`s that stay
/// valid for `'a`.
pub unsafe fn offered_versions<'a>(count: c_int, versions: *const c_int) -> &'a [c_int] {
    if versions.is_null() || count <= 0 {
        return &[];
    }
    std::slice::from_raw_parts(versions, count as usize)
}

/// Picks the first of `supported` (in the runtime's order of preference) that
/// the broker also offers, or [`VERSION_UNSUPPORTED`].
pub fn negotiate(offered: &[c_int], supported: &[c_int]) -> c_int {
    supported
        .iter()
        .copied()
        .find(|v| offered.contains(v))
        .unwrap_or(VERSION_UNSUPPORTED)
}

/// The callbacks a runtime holds registered with the broker, plus the plugin
/// identifier they were registered under.
///
/// `open` registers basic-auth then ACL-check and rolls back the first if the
/// second fails. `close` unregisters in reverse order. The cached identifier
/// is owned by the session, not by the broker's copy.
pub struct PluginSession {
    identifier: AtomicPtr<PluginId>,
    runtime: DecisionRuntime,
}

impl PluginSession {
    pub const fn new(runtime: DecisionRuntime) -> Self {
        PluginSession {
            identifier: AtomicPtr::new(ptr::null_mut()),
            runtime,
        }
    }

    pub fn identifier(&self) -> *mut PluginId {
        self.identifier.load(Ordering::Acquire)
    }

    pub fn is_open(&self) -> bool {
        !self.identifier().is_null()
    }

    #[cfg_attr(not(feature = "logging"), allow(unused_variables))]
    pub fn open(&self, identifier: *mut PluginId) -> Result<(), RegistryError> {
        if self
            .identifier
            .compare_exchange(ptr::null_mut(), identifier, Ordering::AcqRel, Ordering::Acquire)
            .is_err()
        {
            return Err(RegistryError::new(
                RegistryOp::Register,
                EventKind::BasicAuth,
                MOSQ_ERR_ALREADY_EXISTS,
            ));
        }

        if let Err(e) = event_registry::register_basic_auth(identifier, &self.runtime) {
            self.identifier.store(ptr::null_mut(), Ordering::Release);
            return Err(e);
        }
        if let Err(e) = event_registry::register_acl_check(identifier, &self.runtime) {
            if let Err(rollback) = event_registry::unregister_basic_auth(identifier, &self.runtime) {
                crate::log_warn!(&format!("basic_auth rollback failed: {}", rollback));
            }
            self.identifier.store(ptr::null_mut(), Ordering::Release);
            return Err(e);
        }
        Ok(())
    }

    /// Unregisters both callbacks. Both are attempted; the first failure is
    /// returned. Closing a session that is not open does nothing.
    pub fn close(&self) -> Result<(), RegistryError> {
        let identifier = self.identifier.swap(ptr::null_mut(), Ordering::AcqRel);
        if identifier.is_null() {
            return Ok(());
        }

        let acl = event_registry::unregister_acl_check(identifier, &self.runtime);
        let auth = event_registry::unregister_basic_auth(identifier, &self.runtime);
        acl.and(auth)
    }
}
