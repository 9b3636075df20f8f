//! FFI bindings for Habit Strength
//!
//! This module provides C-compatible functions for calling the engine from
//! other languages. Habits travel as JSON in the storage schema. All functions
//! use C strings (null-terminated) and return allocated memory that must be
//! freed by the caller using `strength_free_string`.

use std::cell::RefCell;
use std::ffi::{CStr, CString};
use std::os::raw::c_char;
use std::ptr;

use chrono::NaiveDate;

use crate::config::StrengthConfig;
use crate::engine::StrengthEngine;
use crate::error::StrengthError;
use crate::types::{parse_day, HabitRecord};

// Thread-local storage for the last error message
thread_local! {
    static LAST_ERROR: RefCell<Option<CString>> = const { RefCell::new(None) };
}

/// Set the last error message
fn set_last_error(msg: &str) {
    LAST_ERROR.with(|e| {
        *e.borrow_mut() = CString::new(msg).ok();
    });
}

/// Clear the last error message
fn clear_last_error() {
    LAST_ERROR.with(|e| {
        *e.borrow_mut() = None;
    });
}

/// Helper to convert C string to Rust string
unsafe fn cstr_to_string(ptr: *const c_char) -> Option<String> {
    if ptr.is_null() {
        return None;
    }
    CStr::from_ptr(ptr).to_str().ok().map(|s| s.to_string())
}

/// Helper to convert Rust string to C string (caller must free)
fn string_to_cstr(s: &str) -> *mut c_char {
    match CString::new(s) {
        Ok(cstr) => cstr.into_raw(),
        Err(_) => ptr::null_mut(),
    }
}

/// Parse an optional `YYYY-MM-DD` argument; NULL means absent
unsafe fn optional_day(ptr: *const c_char, name: &str) -> Result<Option<NaiveDate>, String> {
    if ptr.is_null() {
        return Ok(None);
    }
    let raw = cstr_to_string(ptr).ok_or_else(|| format!("Invalid {name} string pointer"))?;
    parse_day(&raw).map(Some).map_err(|e| e.to_string())
}

/// Engine for a caller-supplied period; non-positive means the default
fn engine_for(period: f64) -> Result<StrengthEngine, StrengthError> {
    if period <= 0.0 {
        Ok(StrengthEngine::new())
    } else {
        StrengthEngine::with_config(StrengthConfig { period })
    }
}

/// Shared argument handling for the JSON-returning entry points
unsafe fn run_json_call<F>(habit_json: *const c_char, today: *const c_char, call: F) -> *mut c_char
where
    F: FnOnce(&str, NaiveDate) -> Result<String, StrengthError>,
{
    clear_last_error();

    let json_str = match cstr_to_string(habit_json) {
        Some(s) => s,
        None => {
            set_last_error("Invalid JSON string pointer");
            return ptr::null_mut();
        }
    };

    let today = match optional_day(today, "today") {
        Ok(day) => day.unwrap_or_else(StrengthEngine::today),
        Err(msg) => {
            set_last_error(&msg);
            return ptr::null_mut();
        }
    };

    match call(&json_str, today) {
        Ok(result) => string_to_cstr(&result),
        Err(e) => {
            set_last_error(&e.to_string());
            ptr::null_mut()
        }
    }
}

// ============================================================================
// Strength API
// ============================================================================

/// Recalculate a habit after an edit and return the updated habit JSON.
///
/// # Safety
/// - `habit_json` must be a valid null-terminated C string.
/// - `changed_date` and `today` are `YYYY-MM-DD` C strings or NULL. NULL
///   `changed_date` means a new-day event; NULL `today` uses the local date.
/// - `period <= 0` selects the default smoothing period.
/// - Returns a newly allocated string that must be freed with `strength_free_string`.
/// - Returns NULL on error; call `strength_last_error` to get the error message.
#[no_mangle]
pub unsafe extern "C" fn strength_recalculate(
    habit_json: *const c_char,
    changed_date: *const c_char,
    today: *const c_char,
    period: f64,
) -> *mut c_char {
    clear_last_error();

    let changed = match optional_day(changed_date, "changed_date") {
        Ok(day) => day,
        Err(msg) => {
            set_last_error(&msg);
            return ptr::null_mut();
        }
    };

    run_json_call(habit_json, today, |json, today| {
        engine_for(period)?.recalculate_json(json, changed, today)
    })
}

/// Reconstruct a habit's strength history as a JSON array.
///
/// # Safety
/// - `habit_json` must be a valid null-terminated C string.
/// - `today` is a `YYYY-MM-DD` C string, or NULL for the local date.
/// - Returns a newly allocated string that must be freed with `strength_free_string`.
/// - Returns NULL on error; call `strength_last_error` to get the error message.
#[no_mangle]
pub unsafe extern "C" fn strength_history(
    habit_json: *const c_char,
    today: *const c_char,
    period: f64,
) -> *mut c_char {
    run_json_call(habit_json, today, |json, today| {
        engine_for(period)?.history_json(json, today)
    })
}

/// Recalculate every habit in a JSON array for a new-day event.
///
/// # Safety
/// - `habits_json` must be a valid null-terminated C string holding a JSON array.
/// - `today` is a `YYYY-MM-DD` C string, or NULL for the local date.
/// - Returns a newly allocated string that must be freed with `strength_free_string`.
/// - Returns NULL on error; call `strength_last_error` to get the error message.
#[no_mangle]
pub unsafe extern "C" fn strength_rollover(
    habits_json: *const c_char,
    today: *const c_char,
    period: f64,
) -> *mut c_char {
    run_json_call(habits_json, today, |json, today| {
        let habits: Vec<HabitRecord> = serde_json::from_str(json)?;
        let rolled = engine_for(period)?.rollover(&habits, today);
        Ok(serde_json::to_string(&rolled)?)
    })
}

/// Completion value (0-100) of a habit on one day.
///
/// # Safety
/// - `habit_json` and `date` must be valid null-terminated C strings.
/// - Returns a negative value on error; call `strength_last_error` for details.
#[no_mangle]
pub unsafe extern "C" fn strength_normalize(habit_json: *const c_char, date: *const c_char) -> f64 {
    clear_last_error();

    let json_str = match cstr_to_string(habit_json) {
        Some(s) => s,
        None => {
            set_last_error("Invalid JSON string pointer");
            return -1.0;
        }
    };

    let date = match optional_day(date, "date") {
        Ok(Some(day)) => day,
        Ok(None) => {
            set_last_error("Missing date");
            return -1.0;
        }
        Err(msg) => {
            set_last_error(&msg);
            return -1.0;
        }
    };

    match HabitRecord::from_json(&json_str) {
        Ok(habit) => StrengthEngine::new().normalize(&habit, date),
        Err(e) => {
            set_last_error(&e.to_string());
            -1.0
        }
    }
}

// ============================================================================
// Memory Management
// ============================================================================

/// Free a string returned by Habit Strength functions.
///
/// # Safety
/// - `ptr` must be a valid pointer returned by a Habit Strength function, or NULL.
/// - After calling this function, the pointer is invalid.
#[no_mangle]
pub unsafe extern "C" fn strength_free_string(ptr: *mut c_char) {
    if !ptr.is_null() {
        drop(CString::from_raw(ptr));
    }
}

// ============================================================================
// Error Handling
// ============================================================================

/// Get the last error message.
///
/// # Safety
/// - Returns a pointer to a thread-local error string.
/// - The returned pointer is valid until the next Habit Strength call on this thread.
/// - Do NOT free the returned pointer.
/// - Returns NULL if no error occurred.
#[no_mangle]
pub unsafe extern "C" fn strength_last_error() -> *const c_char {
    LAST_ERROR.with(|e| match &*e.borrow() {
        Some(cstr) => cstr.as_ptr(),
        None => ptr::null(),
    })
}

// ============================================================================
// Version Information
// ============================================================================

/// Get the library version.
///
/// # Safety
/// - Returns a pointer to a static string. Do NOT free.
#[no_mangle]
pub unsafe extern "C" fn strength_version() -> *const c_char {
    static VERSION: &[u8] = concat!(env!("CARGO_PKG_VERSION"), "\0").as_bytes();
    VERSION.as_ptr() as *const c_char
}
