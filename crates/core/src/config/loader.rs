//! Config path resolution
//!
//! The runtime config file is located through the `DISPATCHQ_CONFIG`
//! environment variable; without it the built-in defaults apply.

use std::path::PathBuf;

/// Environment variable naming the runtime config file
pub const CONFIG_ENV_VAR: &str = "DISPATCHQ_CONFIG";

/// Returns the config path named by `DISPATCHQ_CONFIG`, if set and non-empty.
pub fn config_path_from_env() -> Option<PathBuf> {
    config_path_from(std::env::var_os(CONFIG_ENV_VAR))
}

fn config_path_from(value: Option<std::ffi::OsString>) -> Option<PathBuf> {
    value.filter(|v| !v.is_empty()).map(PathBuf::from)
}
