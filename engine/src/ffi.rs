//! FFI layer for the native host.
//!
//! The Android launcher owns the window, the renderer and the preferences
//! file; it drives a [`Session`] and a stats handle through these
//! C-compatible functions. All structured data crosses the boundary as JSON.
//!
//! # Memory Management
//!
//! - Strings returned by `rover_*` functions are allocated by Rust
//! - Caller must free them with `rover_string_free`
//! - Session pointers must be freed with `rover_session_free`
//! - Stats pointers must be freed with `rover_stats_free`
//!
//! # Error Handling
//!
//! Functions return JSON with either:
//! - `{"ok": <result>}` on success
//! - `{"error": "<message>"}` on failure
//!
//! # Field Naming
//!
//! Payloads the engine defines are camelCase (`playtimeSecs`,
//! `pendingPlaytime`, `localBestScore`). Two kinds of data keep snake_case
//! because they are not the engine's to rename: [`UserRecord`] and
//! [`SyncRequest`] are the stats server's HTTP bodies and pass through
//! unchanged, and the `values` of a preferences snapshot are the storage keys
//! (`pending_playtime`, `local_best_score`, `username`).

use crate::{
    apply_login, apply_sync_success, plan_sync, save_session_results, FrameInput, GameConfig,
    LocalStats, MemoryPreferences, PreferencesSnapshot, Session, SessionResult, SyncRequest,
    UserRecord, Viewport,
};
use serde::de::DeserializeOwned;
use std::ffi::{c_char, CStr, CString};
use std::ptr;

/// Stats handle exposed to the host: local stats over in-memory preferences.
///
/// The host persists the snapshot returned by `rover_stats_export` after
/// every mutating call.
pub type FfiStats = LocalStats<MemoryPreferences>;

/// Result wrapper for FFI responses.
#[derive(serde::Serialize)]
#[serde(untagged)]
enum FfiResult<T: serde::Serialize> {
    Ok { ok: T },
    Err { error: String },
}

impl<T: serde::Serialize> FfiResult<T> {
    fn ok(value: T) -> Self {
        FfiResult::Ok { ok: value }
    }

    fn err(message: impl Into<String>) -> Self {
        FfiResult::Err {
            error: message.into(),
        }
    }

    fn to_json(&self) -> String {
        serde_json::to_string(self)
            .unwrap_or_else(|e| format!(r#"{{"error":"serialization failed: {}"}}"#, e))
    }
}

/// Convert a Rust string to a C string pointer.
/// Caller must free with `rover_string_free`.
fn to_c_string(s: String) -> *mut c_char {
    match CString::new(s) {
        Ok(cs) => cs.into_raw(),
        // String contained null bytes - return error JSON
        Err(_) => CString::new(r#"{"error":"string contained null bytes"}"#)
            .map(CString::into_raw)
            .unwrap_or(ptr::null_mut()),
    }
}

fn error_string(message: impl Into<String>) -> *mut c_char {
    to_c_string(FfiResult::<()>::err(message).to_json())
}

/// Convert a C string pointer to a Rust string.
/// Returns None if pointer is null or invalid UTF-8.
unsafe fn from_c_string(ptr: *const c_char) -> Option<String> {
    if ptr.is_null() {
        return None;
    }
    CStr::from_ptr(ptr).to_str().ok().map(|s| s.to_string())
}

/// Parse a JSON argument, naming it in the error.
unsafe fn parse_arg<T: DeserializeOwned>(ptr: *const c_char, what: &str) -> Result<T, String> {
    let json = from_c_string(ptr).ok_or_else(|| format!("invalid {} JSON", what))?;
    serde_json::from_str(&json).map_err(|e| format!("parse error in {}: {}", what, e))
}

// ============================================================================
// Session Lifecycle
// ============================================================================

/// Create a new session.
///
/// # Arguments
/// - `config_json`: JSON string of GameConfig, or null for defaults
/// - `width`, `height`: viewport size in pixels
/// - `seed`: RNG seed for obstacle spawning
///
/// # Returns
/// Pointer to Session, or null if the config could not be parsed.
///
/// # Safety
/// - `config_json` must be a valid null-terminated C string or null
/// - Caller must free the returned pointer with `rover_session_free`
#[no_mangle]
pub unsafe extern "C" fn rover_session_new(
    config_json: *const c_char,
    width: f32,
    height: f32,
    seed: u64,
) -> *mut Session {
    let config = if config_json.is_null() {
        GameConfig::default()
    } else {
        match parse_arg::<GameConfig>(config_json, "config") {
            Ok(c) => c,
            Err(_) => return ptr::null_mut(),
        }
    };

    let session = Session::new(config, Viewport::new(width, height), seed);
    Box::into_raw(Box::new(session))
}

/// Free a session.
///
/// # Safety
/// - `session` must be a valid pointer from `rover_session_new`
/// - Must not be called twice on the same pointer
#[no_mangle]
pub unsafe extern "C" fn rover_session_free(session: *mut Session) {
    if !session.is_null() {
        drop(Box::from_raw(session));
    }
}

/// Free a string allocated by the engine.
///
/// # Safety
/// - `s` must be a valid pointer from a `rover_*` function
/// - Must not be called twice on the same pointer
#[no_mangle]
pub unsafe extern "C" fn rover_string_free(s: *mut c_char) {
    if !s.is_null() {
        drop(CString::from_raw(s));
    }
}

// ============================================================================
// Session Operations
// ============================================================================

#[derive(serde::Serialize)]
#[serde(rename_all = "camelCase")]
struct StepResponse {
    event: crate::StepEvent,
    frame: crate::FrameSnapshot,
}

/// Advance a session by one frame.
///
/// # Arguments
/// - `dt`: frame time in seconds
/// - `input_json`: JSON string of FrameInput, or null for no input
///
/// # Returns
/// JSON string: `{"ok": {"event": ..., "frame": FrameSnapshot}}` or `{"error": "message"}`
///
/// # Safety
/// - `session` must be a valid pointer from `rover_session_new` or null
/// - `input_json` must be a valid null-terminated C string or null
/// - Caller must free the returned string with `rover_string_free`
#[no_mangle]
pub unsafe extern "C" fn rover_session_step(
    session: *mut Session,
    dt: f32,
    input_json: *const c_char,
) -> *mut c_char {
    let session = match session.as_mut() {
        Some(s) => s,
        None => return error_string("null session pointer"),
    };

    let input = if input_json.is_null() {
        FrameInput::default()
    } else {
        match parse_arg::<FrameInput>(input_json, "input") {
            Ok(i) => i,
            Err(e) => return error_string(e),
        }
    };

    let event = session.step(dt, input);
    let response = StepResponse {
        event,
        frame: session.frame(),
    };
    to_c_string(FfiResult::ok(response).to_json())
}

/// Take the finished run's result.
///
/// # Returns
/// JSON string: `{"ok": SessionResult}` once per finished run, otherwise `{"ok": null}`
///
/// # Safety
/// - `session` must be a valid pointer from `rover_session_new` or null
/// - Caller must free the returned string with `rover_string_free`
#[no_mangle]
pub unsafe extern "C" fn rover_session_take_results(session: *mut Session) -> *mut c_char {
    let session = match session.as_mut() {
        Some(s) => s,
        None => return error_string("null session pointer"),
    };

    to_c_string(FfiResult::ok(session.take_results()).to_json())
}

/// Restart a session.
///
/// # Safety
/// - `session` must be a valid pointer from `rover_session_new` or null
#[no_mangle]
pub unsafe extern "C" fn rover_session_restart(session: *mut Session) {
    if let Some(session) = session.as_mut() {
        session.restart();
    }
}

// ============================================================================
// Stats Lifecycle
// ============================================================================

/// Create a stats handle.
///
/// # Arguments
/// - `snapshot_json`: JSON string of PreferencesSnapshot, or null for empty
///
/// # Returns
/// Pointer to the stats handle, or null if the snapshot is invalid.
///
/// # Safety
/// - `snapshot_json` must be a valid null-terminated C string or null
/// - Caller must free the returned pointer with `rover_stats_free`
#[no_mangle]
pub unsafe extern "C" fn rover_stats_new(snapshot_json: *const c_char) -> *mut FfiStats {
    let prefs = if snapshot_json.is_null() {
        MemoryPreferences::new()
    } else {
        let json = match from_c_string(snapshot_json) {
            Some(s) => s,
            None => return ptr::null_mut(),
        };
        match PreferencesSnapshot::from_json(&json) {
            Ok(snapshot) => MemoryPreferences::from_snapshot(snapshot),
            Err(_) => return ptr::null_mut(),
        }
    };

    Box::into_raw(Box::new(LocalStats::new(prefs)))
}

/// Free a stats handle.
///
/// # Safety
/// - `stats` must be a valid pointer from `rover_stats_new`
/// - Must not be called twice on the same pointer
#[no_mangle]
pub unsafe extern "C" fn rover_stats_free(stats: *mut FfiStats) {
    if !stats.is_null() {
        drop(Box::from_raw(stats));
    }
}

// ============================================================================
// Stats Operations
// ============================================================================

/// Record a finished run.
///
/// # Arguments
/// - `result_json`: JSON string of SessionResult
///
/// # Returns
/// JSON string: `{"ok": PendingStats}` or `{"error": "message"}`
///
/// # Safety
/// - `stats` must be a valid pointer from `rover_stats_new` or null
/// - `result_json` must be a valid null-terminated C string or null
/// - Caller must free the returned string with `rover_string_free`
#[no_mangle]
pub unsafe extern "C" fn rover_stats_save_session(
    stats: *mut FfiStats,
    result_json: *const c_char,
) -> *mut c_char {
    let stats = match stats.as_mut() {
        Some(s) => s,
        None => return error_string("null stats pointer"),
    };

    let result: SessionResult = match parse_arg(result_json, "result") {
        Ok(r) => r,
        Err(e) => return error_string(e),
    };

    match save_session_results(stats, result).and_then(|()| stats.snapshot()) {
        Ok(pending) => to_c_string(FfiResult::ok(pending).to_json()),
        Err(e) => error_string(e.to_string()),
    }
}

/// Decide what a sync should carry.
///
/// # Arguments
/// - `user_json`: JSON string of the logged-in UserRecord, or null
///
/// # Returns
/// JSON string: `{"ok": {"send": SyncRequest}}`, `{"ok": {"skip": "<reason>"}}`
/// or `{"error": "message"}`
///
/// # Safety
/// - `stats` must be a valid pointer from `rover_stats_new` or null
/// - `user_json` must be a valid null-terminated C string or null
/// - Caller must free the returned string with `rover_string_free`
#[no_mangle]
pub unsafe extern "C" fn rover_stats_plan_sync(
    stats: *const FfiStats,
    user_json: *const c_char,
) -> *mut c_char {
    let stats = match stats.as_ref() {
        Some(s) => s,
        None => return error_string("null stats pointer"),
    };

    let user: Option<UserRecord> = if user_json.is_null() {
        None
    } else {
        match parse_arg(user_json, "user") {
            Ok(u) => Some(u),
            Err(e) => return error_string(e),
        }
    };

    match plan_sync(stats, user.as_ref()) {
        Ok(plan) => to_c_string(FfiResult::ok(plan).to_json()),
        Err(e) => error_string(e.to_string()),
    }
}

/// Merge a successful sync response.
///
/// # Arguments
/// - `sent_json`: JSON string of the SyncRequest that was sent
/// - `user_json`: JSON string of the UserRecord the server answered with
///
/// # Returns
/// JSON string: `{"ok": SyncOutcome}` or `{"error": "message"}`
///
/// # Safety
/// - `stats` must be a valid pointer from `rover_stats_new` or null
/// - `sent_json` and `user_json` must be valid null-terminated C strings or null
/// - Caller must free the returned string with `rover_string_free`
#[no_mangle]
pub unsafe extern "C" fn rover_stats_apply_sync_success(
    stats: *mut FfiStats,
    sent_json: *const c_char,
    user_json: *const c_char,
) -> *mut c_char {
    let stats = match stats.as_mut() {
        Some(s) => s,
        None => return error_string("null stats pointer"),
    };

    let sent: SyncRequest = match parse_arg(sent_json, "request") {
        Ok(s) => s,
        Err(e) => return error_string(e),
    };

    let user: UserRecord = match parse_arg(user_json, "user") {
        Ok(u) => u,
        Err(e) => return error_string(e),
    };

    match apply_sync_success(stats, &sent, &user) {
        Ok(outcome) => to_c_string(FfiResult::ok(outcome).to_json()),
        Err(e) => error_string(e.to_string()),
    }
}

/// Merge a freshly logged-in user.
///
/// # Returns
/// JSON string: `{"ok": PendingStats}` or `{"error": "message"}`
///
/// # Safety
/// - `stats` must be a valid pointer from `rover_stats_new` or null
/// - `user_json` must be a valid null-terminated C string or null
/// - Caller must free the returned string with `rover_string_free`
#[no_mangle]
pub unsafe extern "C" fn rover_stats_apply_login(
    stats: *mut FfiStats,
    user_json: *const c_char,
) -> *mut c_char {
    let stats = match stats.as_mut() {
        Some(s) => s,
        None => return error_string("null stats pointer"),
    };

    let user: UserRecord = match parse_arg(user_json, "user") {
        Ok(u) => u,
        Err(e) => return error_string(e),
    };

    match apply_login(stats, &user).and_then(|()| stats.snapshot()) {
        Ok(pending) => to_c_string(FfiResult::ok(pending).to_json()),
        Err(e) => error_string(e.to_string()),
    }
}

/// Export the stats preferences for the host to persist.
///
/// # Returns
/// JSON string: `{"ok": PreferencesSnapshot}` or `{"error": "message"}`
///
/// # Safety
/// - `stats` must be a valid pointer from `rover_stats_new` or null
/// - Caller must free the returned string with `rover_string_free`
#[no_mangle]
pub unsafe extern "C" fn rover_stats_export(stats: *const FfiStats) -> *mut c_char {
    let stats = match stats.as_ref() {
        Some(s) => s,
        None => return error_string("null stats pointer"),
    };

    to_c_string(FfiResult::ok(stats.prefs().snapshot()).to_json())
}

// ============================================================================
// Utility
// ============================================================================

/// Get the engine version.
///
/// # Returns
/// Static string pointer (do not free)
#[no_mangle]
pub extern "C" fn rover_version() -> *const c_char {
    static VERSION: &[u8] = concat!(env!("CARGO_PKG_VERSION"), "\0").as_bytes();
    VERSION.as_ptr() as *const c_char
}

/// Get the preferences snapshot format version.
#[no_mangle]
pub extern "C" fn rover_prefs_format_version() -> u32 {
    crate::PREFS_FORMAT_VERSION
}

#[cfg(test)]
mod tests {
    use super::*;

    unsafe fn take_json(ptr: *mut c_char) -> serde_json::Value {
        let text = CStr::from_ptr(ptr).to_str().unwrap().to_string();
        rover_string_free(ptr);
        serde_json::from_str(&text).unwrap()
    }

    #[test]
    fn ffi_session_lifecycle() {
        unsafe {
            let session = rover_session_new(ptr::null(), 1920.0, 1080.0, 1);
            assert!(!session.is_null());
            rover_session_free(session);
        }
    }

    #[test]
    fn ffi_session_rejects_bad_config() {
        unsafe {
            let config = CString::new("{not json").unwrap();
            let session = rover_session_new(config.as_ptr(), 1920.0, 1080.0, 1);
            assert!(session.is_null());
        }
    }

    #[test]
    fn ffi_session_step_and_results() {
        unsafe {
            let config = CString::new(r#"{"firstSpawnDelay": 0.0}"#).unwrap();
            let session = rover_session_new(config.as_ptr(), 1920.0, 1080.0, 5);

            let jump = CString::new(r#"{"jump": true}"#).unwrap();
            let value = take_json(rover_session_step(session, 1.0 / 60.0, jump.as_ptr()));
            assert_eq!(value["ok"]["event"], "jumped");
            assert_eq!(value["ok"]["frame"]["animation"], "jump");

            let pending = take_json(rover_session_take_results(session));
            assert!(pending["ok"].is_null());

            let mut over = false;
            for _ in 0..2000 {
                let value = take_json(rover_session_step(session, 1.0 / 60.0, ptr::null()));
                if value["ok"]["event"] == "gameOver" {
                    over = true;
                    break;
                }
            }
            assert!(over);

            let result = take_json(rover_session_take_results(session));
            assert!(result["ok"]["score"].as_u64().unwrap() > 0);

            let again = take_json(rover_session_take_results(session));
            assert!(again["ok"].is_null());

            rover_session_free(session);
        }
    }

    #[test]
    fn ffi_stats_flow() {
        unsafe {
            let stats = rover_stats_new(ptr::null());
            assert!(!stats.is_null());

            let run = CString::new(r#"{"score": 42, "playtimeSecs": 37}"#).unwrap();
            let saved = take_json(rover_stats_save_session(stats, run.as_ptr()));
            assert_eq!(saved["ok"]["pendingPlaytime"], 37);
            assert_eq!(saved["ok"]["localBestScore"], 42);
            assert!(saved["ok"].get("pending_playtime").is_none());

            let plan = take_json(rover_stats_plan_sync(stats, ptr::null()));
            assert_eq!(plan["ok"]["skip"], "noUsername");

            let user = CString::new(
                r#"{"id":1,"username":"rover","display_name":"Rover","best_score":50,"total_playtime":900}"#,
            )
            .unwrap();
            let plan = take_json(rover_stats_plan_sync(stats, user.as_ptr()));
            assert_eq!(plan["ok"]["send"]["username"], "rover");
            assert_eq!(plan["ok"]["send"]["playtime_delta"], 37);

            let sent = CString::new(plan["ok"]["send"].to_string()).unwrap();
            let outcome = take_json(rover_stats_apply_sync_success(stats, sent.as_ptr(), user.as_ptr()));
            assert_eq!(outcome["ok"]["localBestScore"], 50);
            assert_eq!(outcome["ok"]["pendingPlaytime"], 0);

            let exported = take_json(rover_stats_export(stats));
            assert_eq!(exported["ok"]["values"]["local_best_score"], 50);

            rover_stats_free(stats);
        }
    }

    #[test]
    fn ffi_stats_restore_from_snapshot() {
        unsafe {
            let snapshot =
                CString::new(r#"{"formatVersion":1,"values":{"username":"rover","pending_playtime":9}}"#)
                    .unwrap();
            let stats = rover_stats_new(snapshot.as_ptr());
            assert!(!stats.is_null());

            let plan = take_json(rover_stats_plan_sync(stats, ptr::null()));
            assert_eq!(plan["ok"]["send"]["playtime_delta"], 9);

            rover_stats_free(stats);
        }
    }

    #[test]
    fn ffi_version() {
        let version = rover_version();
        assert!(!version.is_null());
        unsafe {
            let s = CStr::from_ptr(version).to_str().unwrap();
            assert_eq!(s, env!("CARGO_PKG_VERSION"));
        }
        assert_eq!(rover_prefs_format_version(), crate::PREFS_FORMAT_VERSION);
    }

    #[test]
    fn ffi_error_handling() {
        unsafe {
            let value = take_json(rover_session_step(ptr::null_mut(), 0.016, ptr::null()));
            assert_eq!(value["error"], "null session pointer");

            let value = take_json(rover_stats_export(ptr::null()));
            assert_eq!(value["error"], "null stats pointer");

            let stats = rover_stats_new(ptr::null());
            let bad = CString::new("[]").unwrap();
            let value = take_json(rover_stats_save_session(stats, bad.as_ptr()));
            assert!(value["error"].as_str().unwrap().starts_with("parse error in result"));
            rover_stats_free(stats);
        }
    }
}
