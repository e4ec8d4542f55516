//! Shared test utilities for integration tests
//!
//! Serializes access to process-wide environment variables so configuration
//! tests can run in parallel with everything else.

use std::sync::Mutex;
use tempfile::TempDir;

/// Global mutex to serialize environment variable access across all tests
static ENV_MUTEX: Mutex<()> = Mutex::new(());

/// Variables a test may touch; all are restored afterwards
const MANAGED_VARS: &[&str] = &[
    "HOME",
    "XDG_CONFIG_HOME",
    "MINEWATCH_ENV",
    "MINEWATCH__PROVIDER__MODEL",
    "MINEWATCH__PROVIDER__API_KEY",
    "MINEWATCH__EXTRACTION__DEFAULT_INTERVAL",
    "MINEWATCH__ANALYSIS__DEFAULT_CONTEXT",
    "OPENAI_API_KEY",
];

struct EnvState {
    saved: Vec<(&'static str, Option<String>)>,
}

impl EnvState {
    fn capture() -> Self {
        Self {
            saved: MANAGED_VARS
                .iter()
                .map(|name| (*name, std::env::var(name).ok()))
                .collect(),
        }
    }

    fn restore(self) {
        for (name, value) in self.saved {
            match value {
                Some(value) => std::env::set_var(name, value),
                None => std::env::remove_var(name),
            }
        }
    }
}

/// Run `f` with an isolated home and config directory inside `test_dir` and
/// the given variables set. Every managed variable not listed is cleared.
pub fn with_env<F, R>(test_dir: &TempDir, vars: &[(&str, &str)], f: F) -> R
where
    F: FnOnce() -> R,
{
    let _guard = ENV_MUTEX.lock().unwrap_or_else(|e| e.into_inner());
    let env_state = EnvState::capture();

    for name in MANAGED_VARS {
        std::env::remove_var(name);
    }
    let home = test_dir.path().join("home");
    let config_home = test_dir.path().join("xdg");
    std::fs::create_dir_all(&home).unwrap();
    std::fs::create_dir_all(&config_home).unwrap();
    std::env::set_var("HOME", &home);
    std::env::set_var("XDG_CONFIG_HOME", &config_home);
    for (name, value) in vars {
        std::env::set_var(name, value);
    }

    let result = std::panic::catch_unwind(std::panic::AssertUnwindSafe(f));
    env_state.restore();
    match result {
        Ok(value) => value,
        Err(panic) => std::panic::resume_unwind(panic),
    }
}
