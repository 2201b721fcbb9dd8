//! C FFI bindings for divcord-core
//!
//! Everything crosses the boundary as UTF-8 JSON. Strings handed back to the
//! caller are owned by Rust and must be released with `divcord_free_string`.

use divcord_core::{assemble, pipeline, slugify, ParseOutput, ReferenceCatalog};
use serde::Serialize;
use std::ffi::{CStr, CString};
use std::os::raw::c_char;
use std::ptr;

/// Opaque handle to a loaded reference catalog
pub struct FfiCatalog {
    inner: ReferenceCatalog,
}

unsafe fn borrow_str<'a>(s: *const c_char) -> Option<&'a str> {
    if s.is_null() {
        return None;
    }
    CStr::from_ptr(s).to_str().ok()
}

fn to_c_json<T: Serialize>(value: &T) -> *mut c_char {
    serde_json::to_string(value)
        .ok()
        .and_then(|json| CString::new(json).ok())
        .map(|s| s.into_raw())
        .unwrap_or(ptr::null_mut())
}

/// Load a reference catalog from JSON
///
/// # Safety
/// - `catalog_json` must be a valid C string
/// - Returns null on error
#[no_mangle]
pub unsafe extern "C" fn divcord_catalog_load(catalog_json: *const c_char) -> *mut FfiCatalog {
    let Some(json) = borrow_str(catalog_json) else {
        return ptr::null_mut();
    };

    match ReferenceCatalog::from_json(json) {
        Ok(catalog) => Box::into_raw(Box::new(FfiCatalog { inner: catalog })),
        Err(_) => ptr::null_mut(),
    }
}

/// Free a catalog
///
/// # Safety
/// - `catalog` must be a valid pointer returned by `divcord_catalog_load` or null
#[no_mangle]
pub unsafe extern "C" fn divcord_catalog_free(catalog: *mut FfiCatalog) {
    if !catalog.is_null() {
        drop(Box::from_raw(catalog));
    }
}

/// Parse a spreadsheet payload against a loaded catalog
///
/// Returns `{"records": [...], "errors": [...]}`.
///
/// # Safety
/// - `catalog` must be a valid pointer returned by `divcord_catalog_load`
/// - `payload_json` must be a valid C string
/// - Returns null if the payload document itself is malformed
/// - Caller must free the returned string with `divcord_free_string`
#[no_mangle]
pub unsafe extern "C" fn divcord_parse(
    catalog: *const FfiCatalog,
    payload_json: *const c_char,
) -> *mut c_char {
    if catalog.is_null() {
        return ptr::null_mut();
    }
    let Some(json) = borrow_str(payload_json) else {
        return ptr::null_mut();
    };

    match pipeline::parse_payload(json) {
        Ok(payload) => {
            let output: ParseOutput = assemble(&payload, &(*catalog).inner).into();
            to_c_json(&output)
        }
        Err(_) => ptr::null_mut(),
    }
}

/// One-shot parse with the catalog given as JSON
///
/// # Safety
/// - `payload_json` and `catalog_json` must be valid C strings
/// - Returns null if either document is malformed
/// - Caller must free the returned string with `divcord_free_string`
#[no_mangle]
pub unsafe extern "C" fn divcord_parse_records(
    payload_json: *const c_char,
    catalog_json: *const c_char,
) -> *mut c_char {
    let (Some(payload), Some(catalog)) = (borrow_str(payload_json), borrow_str(catalog_json)) else {
        return ptr::null_mut();
    };

    match pipeline::parse_records(payload, catalog) {
        Ok(output) => to_c_json(&output),
        Err(_) => ptr::null_mut(),
    }
}

/// Diff two record snapshots given as JSON arrays
///
/// Returns `{"diff": {...}, "oldErrors": [...], "newErrors": [...]}`.
///
/// # Safety
/// - `old_json` and `new_json` must be valid C strings
/// - Returns null if either document is not a JSON array
/// - Caller must free the returned string with `divcord_free_string`
#[no_mangle]
pub unsafe extern "C" fn divcord_diff(old_json: *const c_char, new_json: *const c_char) -> *mut c_char {
    let (Some(old), Some(new)) = (borrow_str(old_json), borrow_str(new_json)) else {
        return ptr::null_mut();
    };

    match pipeline::diff_records_json(old, new) {
        Ok(output) => to_c_json(&output),
        Err(_) => ptr::null_mut(),
    }
}

/// Slugify a card or source name
///
/// # Safety
/// - `s` must be a valid C string
/// - Caller must free the returned string with `divcord_free_string`
#[no_mangle]
pub unsafe extern "C" fn divcord_slugify(s: *const c_char) -> *mut c_char {
    borrow_str(s)
        .and_then(|s| CString::new(slugify(s)).ok())
        .map(|s| s.into_raw())
        .unwrap_or(ptr::null_mut())
}

/// Free a string returned by other FFI functions
///
/// # Safety
/// - `s` must be a valid pointer returned by a divcord_* function or null
#[no_mangle]
pub unsafe extern "C" fn divcord_free_string(s: *mut c_char) {
    if !s.is_null() {
        drop(CString::from_raw(s));
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const CATALOG: &str = r#"{"maps": [{"name": "Port Map", "tier": 5}]}"#;

    unsafe fn take(s: *mut c_char) -> String {
        assert!(!s.is_null());
        let out = CStr::from_ptr(s).to_str().unwrap().to_string();
        divcord_free_string(s);
        out
    }

    #[test]
    fn test_parse_through_handle() {
        let catalog_json = CString::new(CATALOG).unwrap();
        let payload = CString::new(
            r#"{
                "plain": [["Rain of Chaos", "Area-specific", "", "done", "n/a", ""]],
                "sources": [[{"text": "Port Map"}]],
                "verifySources": [[]]
            }"#,
        )
        .unwrap();

        unsafe {
            let catalog = divcord_catalog_load(catalog_json.as_ptr());
            assert!(!catalog.is_null());

            let out = take(divcord_parse(catalog, payload.as_ptr()));
            let value: serde_json::Value = serde_json::from_str(&out).unwrap();
            assert_eq!(value["records"][0]["card"], "Rain of Chaos");
            assert_eq!(value["records"][0]["sources"][0]["id"], "Port Map");
            assert_eq!(value["errors"].as_array().unwrap().len(), 0);

            divcord_catalog_free(catalog);
        }
    }

    #[test]
    fn test_one_shot_parse_reports_blank_card() {
        let catalog = CString::new(CATALOG).unwrap();
        let payload = CString::new(
            r#"{"plain": [["", "", "", "done"]], "sources": [[]], "verifySources": [[]]}"#,
        )
        .unwrap();

        unsafe {
            let out = take(divcord_parse_records(payload.as_ptr(), catalog.as_ptr()));
            let value: serde_json::Value = serde_json::from_str(&out).unwrap();
            assert_eq!(value["records"].as_array().unwrap().len(), 0);
            assert_eq!(value["errors"][0]["kind"], "emptyCard");
            assert_eq!(value["errors"][0]["row"], 1);
        }
    }

    #[test]
    fn test_null_inputs() {
        unsafe {
            assert!(divcord_catalog_load(ptr::null()).is_null());
            assert!(divcord_parse(ptr::null(), ptr::null()).is_null());
            assert!(divcord_diff(ptr::null(), ptr::null()).is_null());
            divcord_catalog_free(ptr::null_mut());
            divcord_free_string(ptr::null_mut());
        }
    }

    #[test]
    fn test_diff_rejects_non_array() {
        let old = CString::new("{}").unwrap();
        let new = CString::new("[]").unwrap();
        unsafe {
            assert!(divcord_diff(old.as_ptr(), new.as_ptr()).is_null());
        }
    }

    #[test]
    fn test_slugify() {
        let s = CString::new("The Doctor's Map").unwrap();
        unsafe {
            assert_eq!(take(divcord_slugify(s.as_ptr())), "the-doctor-s-map");
        }
    }
}
