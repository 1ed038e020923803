//! Access to environment variables.
//!
//! The pipeline reads and injects variables through [`EnvStore`] so tests can
//! run against an in-memory map instead of the live process environment.

use std::collections::HashMap;
use std::sync::Mutex;

pub trait EnvStore: Send + Sync {
    fn get(&self, key: &str) -> Option<String>;

    fn set(&self, key: &str, value: &str);

    fn contains(&self, key: &str) -> bool {
        self.get(key).is_some()
    }
}

/// The live process environment.
#[derive(Debug, Default, Clone, Copy)]
pub struct ProcessEnv;

impl EnvStore for ProcessEnv {
    fn get(&self, key: &str) -> Option<String> {
        std::env::var(key).ok()
    }

    fn contains(&self, key: &str) -> bool {
        std::env::var_os(key).is_some()
    }

    fn set(&self, key: &str, value: &str) {
        // SAFETY: only called from the env-merge middleware on the single
        // dispatch thread, before any handler or telemetry task is spawned.
        unsafe { std::env::set_var(key, value) }
    }
}

/// An in-memory environment.
#[derive(Debug, Default)]
pub struct MemoryEnv {
    vars: Mutex<HashMap<String, String>>,
}

impl MemoryEnv {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_pairs<K, V>(pairs: impl IntoIterator<Item = (K, V)>) -> Self
    where
        K: Into<String>,
        V: Into<String>,
    {
        Self {
            vars: Mutex::new(
                pairs
                    .into_iter()
                    .map(|(k, v)| (k.into(), v.into()))
                    .collect(),
            ),
        }
    }
}

impl EnvStore for MemoryEnv {
    fn get(&self, key: &str) -> Option<String> {
        self.vars.lock().ok()?.get(key).cloned()
    }

    fn set(&self, key: &str, value: &str) {
        if let Ok(mut vars) = self.vars.lock() {
            vars.insert(key.to_string(), value.to_string());
        }
    }
}

/// First non-empty proxy variable, checked in the usual precedence.
pub fn proxy_from_env(env: &dyn EnvStore) -> Option<String> {
    ["https_proxy", "HTTPS_PROXY", "http_proxy", "HTTP_PROXY"]
        .iter()
        .filter_map(|key| env.get(key))
        .find(|value| !value.trim().is_empty())
}

/// True when running under a CI system.
pub fn is_ci(env: &dyn EnvStore) -> bool {
    env.get("CI")
        .map(|v| !v.is_empty() && v != "0" && !v.eq_ignore_ascii_case("false"))
        .unwrap_or(false)
}
