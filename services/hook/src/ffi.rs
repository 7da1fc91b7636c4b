//! C ABI exported to the relay's hook loader.
//!
//! Symbols (see `include/relay_hook.h`):
//! - `realm_first_pkt_len`: required prefix length
//! - `realm_decide_remote_idx`: decision over a full-length buffer
//! - `realm_decide_remote_idx_len`: decision over an explicit-length buffer
//! - `realm_hook_reload`: re-read the rule file
//!
//! The engine is built on first use from environment settings. No panic
//! crosses the boundary: a panic is reported as the default peer.

use std::panic::{catch_unwind, AssertUnwindSafe};
use std::sync::OnceLock;

use tracing::{error, info, warn};

use crate::config::HookSettings;
use crate::engine::DecisionEngine;
use crate::telemetry::init_tracing;

static ENGINE: OnceLock<DecisionEngine> = OnceLock::new();

fn engine() -> &'static DecisionEngine {
    ENGINE.get_or_init(|| {
        let (settings, settings_error) = match HookSettings::from_env() {
            Ok(settings) => (settings, None),
            Err(e) => (HookSettings::default(), Some(e)),
        };

        init_tracing(&settings);
        if let Some(e) = settings_error {
            warn!(error = %format!("{e:#}"), "Invalid hook settings, using defaults");
        }

        let engine = DecisionEngine::from_settings(&settings);
        info!(
            required_prefix_len = engine.required_prefix_length(),
            rule_count = engine.rule_table().len(),
            "Relay hook initialized"
        );
        engine
    })
}

fn guard<T>(fallback: T, f: impl FnOnce() -> T) -> T {
    catch_unwind(AssertUnwindSafe(f)).unwrap_or(fallback)
}

/// Build the prefix slice for a host buffer, treating null as empty.
///
/// # Safety
///
/// `pkt` must be null or valid for reads of `len` bytes.
unsafe fn prefix<'a>(pkt: *const u8, len: usize) -> &'a [u8] {
    if pkt.is_null() || len == 0 {
        &[]
    } else {
        std::slice::from_raw_parts(pkt, len)
    }
}

/// Bytes the host buffers before calling a decide function.
#[no_mangle]
pub extern "C" fn realm_first_pkt_len() -> u32 {
    guard(0, || engine().required_prefix_length())
}

/// Decide the remote for a connection: `-1` bans it, `0` keeps the default
/// remote, `N` in `1..=max_remote_idx` selects extra remote `N`.
///
/// # Safety
///
/// `pkt` must be null or valid for reads of `realm_first_pkt_len()` bytes.
/// A client that sent fewer bytes must be zero-padded by the host.
#[no_mangle]
pub unsafe extern "C" fn realm_decide_remote_idx(max_remote_idx: i32, pkt: *const u8) -> i32 {
    guard(0, || {
        let engine = engine();
        let len = engine.required_prefix_length() as usize;
        let prefix = unsafe { prefix(pkt, len) };
        engine.decide(prefix, max_remote_idx).as_remote_idx()
    })
}

/// Same as [`realm_decide_remote_idx`] with the buffer length passed
/// explicitly. `len` larger than the required length is clamped.
///
/// # Safety
///
/// `pkt` must be null or valid for reads of `len` bytes.
#[no_mangle]
pub unsafe extern "C" fn realm_decide_remote_idx_len(
    max_remote_idx: i32,
    pkt: *const u8,
    len: u32,
) -> i32 {
    guard(0, || {
        let engine = engine();
        let len = (len as usize).min(engine.required_prefix_length() as usize);
        let prefix = unsafe { prefix(pkt, len) };
        engine.decide(prefix, max_remote_idx).as_remote_idx()
    })
}

/// Re-read the rule file. Returns 0 on success, -1 on failure (the
/// previous rules stay installed).
#[no_mangle]
pub extern "C" fn realm_hook_reload() -> i32 {
    guard(-1, || match engine().reload_from_file() {
        Ok(generation) => {
            info!(generation = generation, "Rules reloaded");
            0
        }
        Err(e) => {
            error!(error = %e, "Rule reload failed, keeping current rules");
            -1
        }
    })
}
