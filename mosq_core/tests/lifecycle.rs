mod support;

use std::ptr;

use mosq_core::abi::{
    EventKind, MosquittoOpt, PluginId, UserData, UserDataSlot, MOSQ_ERR_ACL_DENIED, MOSQ_ERR_INVAL,
    MOSQ_ERR_NOMEM, MOSQ_ERR_NOT_FOUND, MOSQ_ERR_SUCCESS, MOSQ_ERR_UNKNOWN, VERSION_UNSUPPORTED,
};
use mosq_core::libc::{c_int, c_void};
use mosq_core::lifecycle;
use mosq_core::options::OptionList;
use mosq_core::runtime::{self, DecisionRuntime, PluginSession};
use support::{fire, install_fake_host, new_plugin_id, registered, OwnedOptions};

static STATE_MARKER: u8 = 0;

fn marker() -> *mut c_void {
    &STATE_MARKER as *const u8 as *mut c_void
}

unsafe extern "C" fn gate_version(count: c_int, versions: *mut c_int) -> c_int {
    runtime::negotiate(runtime::offered_versions(count, versions.cast_const()), &[5, 6])
}

/// Stores the marker into the slot, or fails with the status named by the
/// `init_rc` option.
unsafe extern "C" fn gate_init(
    _identifier: *mut PluginId,
    userdata: UserDataSlot,
    options: *mut MosquittoOpt,
    option_count: c_int,
) -> c_int {
    let options = OptionList::from_raw(options, option_count);
    if let Some(rc) = options.get("init_rc") {
        return rc.parse().unwrap_or(MOSQ_ERR_UNKNOWN);
    }
    if !userdata.store(marker()) {
        return MOSQ_ERR_INVAL;
    }
    MOSQ_ERR_SUCCESS
}

/// Succeeds only when handed back the value stored at init.
unsafe extern "C" fn gate_cleanup(
    userdata: UserData,
    options: *mut MosquittoOpt,
    option_count: c_int,
) -> c_int {
    let options = OptionList::from_raw(options, option_count);
    if let Some(rc) = options.get("cleanup_rc") {
        return rc.parse().unwrap_or(MOSQ_ERR_UNKNOWN);
    }
    if userdata.as_raw() == marker() {
        MOSQ_ERR_SUCCESS
    } else {
        MOSQ_ERR_INVAL
    }
}

unsafe extern "C" fn gate_basic_auth(_event: c_int, _data: *mut c_void, _userdata: *mut c_void) -> c_int {
    MOSQ_ERR_SUCCESS
}

unsafe extern "C" fn gate_acl_check(_event: c_int, _data: *mut c_void, _userdata: *mut c_void) -> c_int {
    MOSQ_ERR_ACL_DENIED
}

const RUNTIME: DecisionRuntime = DecisionRuntime {
    version: gate_version,
    init: gate_init,
    cleanup: gate_cleanup,
    basic_auth: gate_basic_auth,
    acl_check: gate_acl_check,
};

mosq_core::declare_mosquitto_plugin!(RUNTIME);

unsafe extern "C" fn noop_version(_count: c_int, _versions: *mut c_int) -> c_int {
    5
}

unsafe extern "C" fn noop_init(_: *mut PluginId, _: UserDataSlot, _: *mut MosquittoOpt, _: c_int) -> c_int {
    MOSQ_ERR_SUCCESS
}

unsafe extern "C" fn noop_cleanup(_: UserData, _: *mut MosquittoOpt, _: c_int) -> c_int {
    MOSQ_ERR_SUCCESS
}

const NOOP_RUNTIME: DecisionRuntime = DecisionRuntime {
    version: noop_version,
    init: noop_init,
    cleanup: noop_cleanup,
    basic_auth: gate_basic_auth,
    acl_check: gate_acl_check,
};

#[test]
fn negotiation_picks_mutual_version() {
    let offered = [4, 5];
    assert_eq!(unsafe { mosquitto_plugin_version(2, offered.as_ptr()) }, 5);
}

#[test]
fn negotiation_fails_without_overlap() {
    let offered = [1, 2];
    assert_eq!(unsafe { mosquitto_plugin_version(2, offered.as_ptr()) }, VERSION_UNSUPPORTED);
}

#[test]
fn negotiation_rejects_null_or_empty_lists() {
    let offered = [5];
    unsafe {
        assert_eq!(mosquitto_plugin_version(1, ptr::null()), VERSION_UNSUPPORTED);
        assert_eq!(mosquitto_plugin_version(0, offered.as_ptr()), VERSION_UNSUPPORTED);
    }
}

#[test]
fn offered_versions_are_byte_identical_after_negotiation() {
    let offered: [c_int; 4] = [2, 3, 4, 5];
    let before = offered;
    let bytes_before: Vec<u8> = unsafe {
        std::slice::from_raw_parts(offered.as_ptr() as *const u8, std::mem::size_of_val(&offered)).to_vec()
    };

    let picked = unsafe { mosquitto_plugin_version(offered.len() as c_int, offered.as_ptr()) };

    let bytes_after =
        unsafe { std::slice::from_raw_parts(offered.as_ptr() as *const u8, std::mem::size_of_val(&offered)) };
    assert_eq!(picked, 5);
    assert_eq!(offered, before);
    assert_eq!(bytes_before.as_slice(), bytes_after);
}

#[test]
fn init_then_cleanup_with_noop_runtime_succeeds() {
    let id = new_plugin_id();
    let mut slot: *mut c_void = ptr::null_mut();
    let mut options = OwnedOptions::empty();

    let init_rc = unsafe { lifecycle::init(&NOOP_RUNTIME, id, &mut slot, options.as_mut_ptr(), options.count()) };
    let cleanup_rc = unsafe { lifecycle::cleanup(&NOOP_RUNTIME, slot, options.as_mut_ptr(), options.count()) };

    assert_eq!((init_rc, cleanup_rc), (MOSQ_ERR_SUCCESS, MOSQ_ERR_SUCCESS));
}

#[test]
fn userdata_slot_at_init_resolves_to_value_at_cleanup() {
    let id = new_plugin_id();
    let mut slot: *mut c_void = ptr::null_mut();
    let mut options = OwnedOptions::empty();

    unsafe {
        assert_eq!(mosquitto_plugin_init(id, &mut slot, options.as_mut_ptr(), options.count()), MOSQ_ERR_SUCCESS);
        assert_eq!(slot, marker());
        // The broker dereferences the slot once and hands over the value.
        assert_eq!(mosquitto_plugin_cleanup(slot, options.as_mut_ptr(), options.count()), MOSQ_ERR_SUCCESS);
        assert_eq!(mosquitto_plugin_cleanup(ptr::null_mut(), options.as_mut_ptr(), options.count()), MOSQ_ERR_INVAL);
    }
}

#[test]
fn runtime_status_is_returned_unchanged() {
    let id = new_plugin_id();
    let mut slot: *mut c_void = ptr::null_mut();
    let mut init_options = OwnedOptions::new(&[("init_rc", "1")]);
    let mut cleanup_options = OwnedOptions::new(&[("cleanup_rc", "12")]);

    unsafe {
        assert_eq!(
            mosquitto_plugin_init(id, &mut slot, init_options.as_mut_ptr(), init_options.count()),
            MOSQ_ERR_NOMEM
        );
        assert!(slot.is_null());
        assert_eq!(
            mosquitto_plugin_cleanup(slot, cleanup_options.as_mut_ptr(), cleanup_options.count()),
            MOSQ_ERR_ACL_DENIED
        );
    }
}

#[test]
fn session_registers_both_callbacks_and_closes_in_reverse() {
    install_fake_host();
    let session = PluginSession::new(RUNTIME);
    let id = new_plugin_id();

    session.open(id).unwrap();
    assert!(session.is_open());
    assert_eq!(session.identifier(), id);
    assert_eq!(fire(id, EventKind::BasicAuth.as_raw()), Some(MOSQ_ERR_SUCCESS));
    assert_eq!(fire(id, EventKind::AclCheck.as_raw()), Some(MOSQ_ERR_ACL_DENIED));

    session.close().unwrap();
    assert!(!session.is_open());
    assert_eq!(fire(id, EventKind::BasicAuth.as_raw()), None);
    assert_eq!(fire(id, EventKind::AclCheck.as_raw()), None);

    // Nothing left to remove.
    session.close().unwrap();
}

#[test]
fn session_rolls_back_basic_auth_when_acl_registration_fails() {
    install_fake_host();
    let session = PluginSession::new(RUNTIME);
    let id = new_plugin_id();
    mosq_test_host::fail_next_register(id.cast(), EventKind::AclCheck.as_raw(), MOSQ_ERR_NOMEM);

    let err = session.open(id).unwrap_err();

    assert_eq!(err.code(), MOSQ_ERR_NOMEM);
    assert_eq!(err.event, EventKind::AclCheck);
    assert!(!session.is_open());
    assert_eq!(registered(id, EventKind::BasicAuth.as_raw()), 0);
    assert_eq!(registered(id, EventKind::AclCheck.as_raw()), 0);
}

#[test]
fn session_refuses_a_second_open() {
    install_fake_host();
    let session = PluginSession::new(RUNTIME);
    let id = new_plugin_id();

    session.open(id).unwrap();
    assert!(session.open(new_plugin_id()).is_err());
    assert_eq!(session.identifier(), id);
    session.close().unwrap();
}

#[test]
fn session_close_reports_missing_registration() {
    install_fake_host();
    let session = PluginSession::new(RUNTIME);
    let id = new_plugin_id();

    session.open(id).unwrap();
    mosq_core::event_registry::unregister_acl_check(id, &RUNTIME).unwrap();

    let err = session.close().unwrap_err();
    assert_eq!(err.code(), MOSQ_ERR_NOT_FOUND);
    assert_eq!(registered(id, EventKind::BasicAuth.as_raw()), 0);
}

#[test]
fn failed_rollback_still_reports_the_acl_failure() {
    install_fake_host();
    let session = PluginSession::new(RUNTIME);
    let id = new_plugin_id();
    mosq_test_host::fail_next_register(id.cast(), EventKind::AclCheck.as_raw(), MOSQ_ERR_NOMEM);
    mosq_test_host::fail_next_unregister(id.cast(), EventKind::BasicAuth.as_raw(), MOSQ_ERR_NOT_FOUND);

    let err = session.open(id).unwrap_err();

    assert_eq!(err.code(), MOSQ_ERR_NOMEM);
    assert_eq!(err.event, EventKind::AclCheck);
    assert!(!session.is_open());
    // The broker kept the basic-auth callback; it is still there to see.
    assert_eq!(registered(id, EventKind::BasicAuth.as_raw()), 1);
}
