//! C ABI over the global engine registry.
//!
//! Every entry point is total: failures become status codes, the `0` handle,
//! or an empty string, and panics are caught before they reach the caller.
//! Input strings are borrowed for the duration of the call only.

use crate::config::EngineConfig;
use crate::error::OdrlError;
use crate::registry::{self, NULL_HANDLE};
use std::ffi::{c_char, c_int, CStr, CString};
use std::panic::{catch_unwind, AssertUnwindSafe};
use std::ptr;

/// Status codes shared by the `odrl_*` functions.
#[repr(C)]
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub enum OdrlStatus {
    Ok = 0,
    InvalidHandle = -1,
    MalformedQuery = -2,
    Internal = -3,
}

impl OdrlStatus {
    fn from_error(err: &OdrlError) -> Self {
        match err {
            OdrlError::InvalidHandle(_) => OdrlStatus::InvalidHandle,
            OdrlError::MalformedQuery(_) => OdrlStatus::MalformedQuery,
            _ => OdrlStatus::Internal,
        }
    }
}

static VERSION: &str = concat!(env!("CARGO_PKG_VERSION"), "\0");

/// Borrows a C string argument. Null or non-UTF-8 input is a malformed query.
///
/// # Safety
/// `ptr` must be null or point to a valid null-terminated string.
unsafe fn arg<'a>(ptr: *const c_char, name: &str) -> Result<&'a str, OdrlError> {
    if ptr.is_null() {
        return Err(OdrlError::MalformedQuery(format!("{} is null", name)));
    }
    CStr::from_ptr(ptr)
        .to_str()
        .map_err(|_| OdrlError::MalformedQuery(format!("{} is not valid UTF-8", name)))
}

fn guard<T>(fallback: T, body: impl FnOnce() -> T) -> T {
    match catch_unwind(AssertUnwindSafe(body)) {
        Ok(value) => value,
        Err(_) => {
            tracing::warn!("panic caught at the C boundary");
            fallback
        }
    }
}

fn owned_c_string(value: &str) -> *mut c_char {
    // Interior NULs cannot cross the boundary; truncate at the first one.
    let end = value.find('\0').unwrap_or(value.len());
    match CString::new(&value[..end]) {
        Ok(s) => s.into_raw(),
        Err(_) => ptr::null_mut(),
    }
}

fn empty_c_string() -> *mut c_char {
    owned_c_string("")
}

/// Loads a policy document (JSON or YAML) into a new engine.
///
/// Returns `0` when the document cannot be loaded.
///
/// # Safety
/// `document` must be null or a valid null-terminated UTF-8 string.
#[no_mangle]
pub unsafe extern "C" fn odrl_engine_create(document: *const c_char) -> u64 {
    guard(NULL_HANDLE, || {
        let created = arg(document, "document")
            .and_then(|doc| registry::global().create(doc, EngineConfig::default()));
        match created {
            Ok(handle) => handle,
            Err(err) => {
                tracing::warn!(error = %err, "engine creation failed");
                NULL_HANDLE
            }
        }
    })
}

/// Loads a policy document with a YAML or JSON engine configuration.
///
/// A null `config` uses the defaults. Returns `0` on any failure.
///
/// # Safety
/// Both arguments must be null or valid null-terminated UTF-8 strings.
#[no_mangle]
pub unsafe extern "C" fn odrl_engine_create_with_config(document: *const c_char, config: *const c_char) -> u64 {
    guard(NULL_HANDLE, || {
        let config = if config.is_null() {
            Ok(EngineConfig::default())
        } else {
            arg(config, "config").and_then(EngineConfig::from_yaml)
        };
        let created = config.and_then(|config| {
            let doc = arg(document, "document")?;
            registry::global().create(doc, config)
        });
        match created {
            Ok(handle) => handle,
            Err(err) => {
                tracing::warn!(error = %err, "engine creation failed");
                NULL_HANDLE
            }
        }
    })
}

/// Releases an engine and its world. Idempotent.
#[no_mangle]
pub extern "C" fn odrl_engine_close(handle: u64) {
    guard((), || {
        registry::global().close(handle);
    })
}

/// Answers an authorization query.
///
/// Returns `0` deny, `1` allow, `2` indeterminate, `3` conflict, or a
/// negative [`OdrlStatus`].
///
/// # Safety
/// String arguments must be null or valid null-terminated strings.
#[no_mangle]
pub unsafe extern "C" fn odrl_evaluate(
    handle: u64,
    action: *const c_char,
    target: *const c_char,
    assigner: *const c_char,
    assignee: *const c_char,
) -> c_int {
    guard(OdrlStatus::Internal as c_int, || {
        let result = registry::global().get(handle).and_then(|engine| {
            engine.evaluate(
                arg(action, "action")?,
                arg(target, "target")?,
                arg(assigner, "assigner")?,
                arg(assignee, "assignee")?,
            )
        });
        match result {
            Ok(decision) => decision.decision.code(),
            Err(err) => OdrlStatus::from_error(&err) as c_int,
        }
    })
}

/// Stores a world fact. Returns `0` or a negative [`OdrlStatus`].
///
/// # Safety
/// String arguments must be null or valid null-terminated strings.
#[no_mangle]
pub unsafe extern "C" fn odrl_world_set(handle: u64, key: *const c_char, value: *const c_char) -> c_int {
    guard(OdrlStatus::Internal as c_int, || {
        let result = registry::global()
            .get(handle)
            .and_then(|engine| engine.world_set(arg(key, "key")?, arg(value, "value")?));
        match result {
            Ok(()) => OdrlStatus::Ok as c_int,
            Err(err) => OdrlStatus::from_error(&err) as c_int,
        }
    })
}

/// Reads a world fact.
///
/// Always returns a new string to be released with [`odrl_string_free`];
/// it is empty when the key is absent or the call fails.
///
/// # Safety
/// `key` must be null or a valid null-terminated string.
#[no_mangle]
pub unsafe extern "C" fn odrl_world_get(handle: u64, key: *const c_char) -> *mut c_char {
    guard(ptr::null_mut(), || {
        let value = registry::global()
            .get(handle)
            .and_then(|engine| Ok(engine.world_get(arg(key, "key")?)));
        match value {
            Ok(Some(value)) => owned_c_string(&value),
            _ => empty_c_string(),
        }
    })
}

/// Removes a world fact. Returns `1` removed, `0` absent, or a negative [`OdrlStatus`].
///
/// # Safety
/// `key` must be null or a valid null-terminated string.
#[no_mangle]
pub unsafe extern "C" fn odrl_world_remove(handle: u64, key: *const c_char) -> c_int {
    guard(OdrlStatus::Internal as c_int, || {
        let result = registry::global()
            .get(handle)
            .and_then(|engine| Ok(engine.world_remove(arg(key, "key")?)));
        match result {
            Ok(removed) => c_int::from(removed),
            Err(err) => OdrlStatus::from_error(&err) as c_int,
        }
    })
}

/// Digest of the engine's policy document, empty for an invalid handle.
///
/// Release the result with [`odrl_string_free`].
#[no_mangle]
pub extern "C" fn odrl_engine_digest(handle: u64) -> *mut c_char {
    guard(ptr::null_mut(), || match registry::global().get(handle) {
        Ok(engine) => owned_c_string(&engine.policy().digest),
        Err(_) => empty_c_string(),
    })
}

/// Frees a string returned by this library.
///
/// # Safety
/// `s` must be null or a pointer returned by an `odrl_*` function, freed once.
#[no_mangle]
pub unsafe extern "C" fn odrl_string_free(s: *mut c_char) {
    if !s.is_null() {
        drop(CString::from_raw(s));
    }
}

/// Turns debug diagnostics on (non-zero) or off.
#[no_mangle]
pub extern "C" fn odrl_set_verbose(enabled: c_int) {
    guard((), || crate::logging::set_verbose(enabled != 0))
}

/// Library version as a static string.
#[no_mangle]
pub extern "C" fn odrl_version() -> *const c_char {
    VERSION.as_ptr() as *const c_char
}

#[cfg(test)]
mod tests {
    use super::*;

    const DOC: &str = r#"{
        "type": "Agreement", "uid": "urn:policy:ffi",
        "assigner": "urn:org:acme", "assignee": "liumazi",
        "target": "urn:asset:T",
        "permission": [{"action": "use",
            "constraint": {"leftOperand": "dateTime", "operator": "lt", "rightOperand": "2025-12-31"}}]
    }"#;

    fn c(s: &str) -> CString {
        CString::new(s).unwrap()
    }

    unsafe fn take(ptr: *mut c_char) -> String {
        assert!(!ptr.is_null());
        let value = CStr::from_ptr(ptr).to_str().unwrap().to_string();
        odrl_string_free(ptr);
        value
    }

    unsafe fn eval(handle: u64) -> c_int {
        odrl_evaluate(
            handle,
            c("use").as_ptr(),
            c("urn:asset:T").as_ptr(),
            c("urn:org:acme").as_ptr(),
            c("liumazi").as_ptr(),
        )
    }

    #[test]
    fn test_scenario_through_boundary() {
        unsafe {
            let handle = odrl_engine_create(c(DOC).as_ptr());
            assert_ne!(handle, 0);

            assert_eq!(eval(handle), 2);
            assert_eq!(odrl_world_set(handle, c("dateTime").as_ptr(), c("2024-01-01").as_ptr()), 0);
            assert_eq!(eval(handle), 1);
            assert_eq!(odrl_world_set(handle, c("dateTime").as_ptr(), c("2026-01-01").as_ptr()), 0);
            assert_eq!(eval(handle), 0);

            odrl_engine_close(handle);
        }
    }

    #[test]
    fn test_world_round_trip() {
        unsafe {
            let handle = odrl_engine_create(c(DOC).as_ptr());
            assert_eq!(odrl_world_set(handle, c("k").as_ptr(), c("v").as_ptr()), 0);
            assert_eq!(take(odrl_world_get(handle, c("k").as_ptr())), "v");
            assert_eq!(odrl_world_remove(handle, c("k").as_ptr()), 1);
            assert_eq!(take(odrl_world_get(handle, c("k").as_ptr())), "");
            assert_eq!(odrl_world_remove(handle, c("k").as_ptr()), 0);
            odrl_engine_close(handle);
        }
    }

    #[test]
    fn test_closed_handle_is_invalid() {
        unsafe {
            let handle = odrl_engine_create(c(DOC).as_ptr());
            odrl_engine_close(handle);
            odrl_engine_close(handle);

            assert_eq!(eval(handle), OdrlStatus::InvalidHandle as c_int);
            assert_eq!(
                odrl_world_set(handle, c("k").as_ptr(), c("v").as_ptr()),
                OdrlStatus::InvalidHandle as c_int
            );
            assert_eq!(odrl_world_remove(handle, c("k").as_ptr()), OdrlStatus::InvalidHandle as c_int);
            assert_eq!(take(odrl_world_get(handle, c("k").as_ptr())), "");
            assert_eq!(take(odrl_engine_digest(handle)), "");
            assert_eq!(eval(0), OdrlStatus::InvalidHandle as c_int);
        }
    }

    #[test]
    fn test_malformed_arguments() {
        unsafe {
            let handle = odrl_engine_create(c(DOC).as_ptr());
            let status = odrl_evaluate(
                handle,
                ptr::null(),
                c("urn:asset:T").as_ptr(),
                c("urn:org:acme").as_ptr(),
                c("liumazi").as_ptr(),
            );
            assert_eq!(status, OdrlStatus::MalformedQuery as c_int);
            assert_eq!(
                odrl_world_set(handle, c("").as_ptr(), c("v").as_ptr()),
                OdrlStatus::MalformedQuery as c_int
            );
            odrl_engine_close(handle);
        }
    }

    #[test]
    fn test_create_failures_return_sentinel() {
        unsafe {
            assert_eq!(odrl_engine_create(ptr::null()), 0);
            assert_eq!(odrl_engine_create(c("{ broken").as_ptr()), 0);
            assert_eq!(odrl_engine_create(c(r#"{"type": "Unknown"}"#).as_ptr()), 0);
            assert_eq!(
                odrl_engine_create_with_config(c(DOC).as_ptr(), c("max_constraint_depth: 0").as_ptr()),
                0
            );
        }
    }

    #[test]
    fn test_create_with_config_and_digest() {
        unsafe {
            let handle = odrl_engine_create_with_config(c(DOC).as_ptr(), c("max_constraint_depth: 8").as_ptr());
            assert_ne!(handle, 0);
            let digest = take(odrl_engine_digest(handle));
            assert!(digest.starts_with("p:"));
            odrl_engine_close(handle);
        }
    }

    #[test]
    fn test_version() {
        let version = unsafe { CStr::from_ptr(odrl_version()) };
        assert_eq!(version.to_str().unwrap(), env!("CARGO_PKG_VERSION"));
    }
}
