//! Log subscriber for the loaded hook library.
//!
//! The hook runs inside the relay's process, so it only installs a
//! subscriber when asked to and never replaces one the host already set.

use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use crate::config::HookSettings;

/// Install a stderr subscriber if logging is enabled.
///
/// Returns true if this call installed the global subscriber.
pub fn init_tracing(settings: &HookSettings) -> bool {
    if !settings.log_enabled {
        return false;
    }

    // Prefer RUST_LOG, fall back to RELAY_HOOK_LOG_LEVEL
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| settings.log_level.clone().into());
    let registry = tracing_subscriber::registry().with(filter);

    let installed = if settings.log_json {
        registry
            .with(
                tracing_subscriber::fmt::layer()
                    .json()
                    .with_writer(std::io::stderr),
            )
            .try_init()
    } else {
        registry
            .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
            .try_init()
    };

    installed.is_ok()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_disabled_installs_nothing() {
        assert!(!init_tracing(&HookSettings::default()));
    }
}
