//! Connection settings with environment variable support.
//!
//! Each value is resolved with a three-tier priority:
//!
//! 1. **Parameter** - Explicitly provided value (highest priority)
//! 2. **Environment Variable** - Value from environment variable
//! 3. **Default** - Built-in default value (lowest priority)
//!
//! # Environment Variables
//!
//! | Variable | Default | Description |
//! |----------|---------|-------------|
//! | `SFTP_CONNECT_TIMEOUT_MS` | 5000ms | Handshake and sub-channel timeout |
//! | `SFTP_INACTIVITY_TIMEOUT_SECS` | 0 (disabled) | Drop the session after this much silence |
//! | `SFTP_COMPRESSION` | false | Offer zlib compression |

use std::env;
use std::time::Duration;

/// Default bound for the handshake and for opening the sub-channel
pub const DEFAULT_CONNECT_TIMEOUT_MS: u64 = 5000;

/// Environment variable name for the connect timeout in milliseconds
pub(crate) const CONNECT_TIMEOUT_ENV_VAR: &str = "SFTP_CONNECT_TIMEOUT_MS";

/// Environment variable name for the inactivity timeout in seconds
pub(crate) const INACTIVITY_TIMEOUT_ENV_VAR: &str = "SFTP_INACTIVITY_TIMEOUT_SECS";

/// Environment variable name for compression
pub(crate) const COMPRESSION_ENV_VAR: &str = "SFTP_COMPRESSION";

/// Resolve the connect timeout with priority: parameter -> env var -> default
pub fn resolve_connect_timeout(timeout_param: Option<Duration>) -> Duration {
    if let Some(timeout) = timeout_param {
        return timeout;
    }

    if let Ok(env_timeout) = env::var(CONNECT_TIMEOUT_ENV_VAR)
        && let Ok(ms) = env_timeout.parse::<u64>()
    {
        return Duration::from_millis(ms);
    }

    Duration::from_millis(DEFAULT_CONNECT_TIMEOUT_MS)
}

/// Resolve the inactivity timeout with priority: parameter -> env var -> disabled.
///
/// A value of zero disables the timeout.
pub fn resolve_inactivity_timeout(timeout_param: Option<u64>) -> Option<Duration> {
    let secs = timeout_param
        .or_else(|| {
            env::var(INACTIVITY_TIMEOUT_ENV_VAR)
                .ok()
                .and_then(|v| v.parse::<u64>().ok())
        })
        .unwrap_or(0);

    (secs > 0).then(|| Duration::from_secs(secs))
}

/// Resolve the compression setting with priority: parameter -> env var -> default (false)
pub fn resolve_compression(compress_param: Option<bool>) -> bool {
    if let Some(compress) = compress_param {
        return compress;
    }

    if let Ok(env_compress) = env::var(COMPRESSION_ENV_VAR) {
        return env_compress.eq_ignore_ascii_case("true") || env_compress == "1";
    }

    false
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex as StdMutex;

    // SAFETY: Tests are serialized via ENV_TEST_MUTEX to prevent data races
    static ENV_TEST_MUTEX: once_cell::sync::Lazy<StdMutex<()>> =
        once_cell::sync::Lazy::new(|| StdMutex::new(()));

    /// SAFETY: Must be called while holding ENV_TEST_MUTEX.
    unsafe fn set_env(key: &str, value: &str) {
        unsafe { env::set_var(key, value) };
    }

    /// SAFETY: Must be called while holding ENV_TEST_MUTEX.
    unsafe fn remove_env(key: &str) {
        unsafe { env::remove_var(key) };
    }

    mod connect_timeout {
        use super::*;

        #[test]
        fn test_uses_param_when_provided() {
            let result = resolve_connect_timeout(Some(Duration::from_millis(750)));
            assert_eq!(result, Duration::from_millis(750));
        }

        #[test]
        fn test_uses_env_var_when_no_param() {
            let _guard = ENV_TEST_MUTEX.lock().unwrap();
            // SAFETY: Holding ENV_TEST_MUTEX, no concurrent env access
            unsafe {
                set_env(CONNECT_TIMEOUT_ENV_VAR, "1200");
            }
            let result = resolve_connect_timeout(None);
            // SAFETY: Holding ENV_TEST_MUTEX, no concurrent env access
            unsafe {
                remove_env(CONNECT_TIMEOUT_ENV_VAR);
            }
            assert_eq!(result, Duration::from_millis(1200));
        }

        #[test]
        fn test_defaults_to_five_seconds() {
            let _guard = ENV_TEST_MUTEX.lock().unwrap();
            // SAFETY: Holding ENV_TEST_MUTEX, no concurrent env access
            unsafe {
                remove_env(CONNECT_TIMEOUT_ENV_VAR);
            }
            assert_eq!(resolve_connect_timeout(None), Duration::from_millis(5000));
        }

        #[test]
        fn test_ignores_invalid_env_var() {
            let _guard = ENV_TEST_MUTEX.lock().unwrap();
            // SAFETY: Holding ENV_TEST_MUTEX, no concurrent env access
            unsafe {
                set_env(CONNECT_TIMEOUT_ENV_VAR, "soon");
            }
            let result = resolve_connect_timeout(None);
            // SAFETY: Holding ENV_TEST_MUTEX, no concurrent env access
            unsafe {
                remove_env(CONNECT_TIMEOUT_ENV_VAR);
            }
            assert_eq!(result, Duration::from_millis(DEFAULT_CONNECT_TIMEOUT_MS));
        }
    }

    mod inactivity_timeout {
        use super::*;

        #[test]
        fn test_zero_disables() {
            assert_eq!(resolve_inactivity_timeout(Some(0)), None);
        }

        #[test]
        fn test_param_used() {
            assert_eq!(
                resolve_inactivity_timeout(Some(300)),
                Some(Duration::from_secs(300))
            );
        }

        #[test]
        fn test_env_var_used_when_no_param() {
            let _guard = ENV_TEST_MUTEX.lock().unwrap();
            // SAFETY: Holding ENV_TEST_MUTEX, no concurrent env access
            unsafe {
                set_env(INACTIVITY_TIMEOUT_ENV_VAR, "60");
            }
            let result = resolve_inactivity_timeout(None);
            // SAFETY: Holding ENV_TEST_MUTEX, no concurrent env access
            unsafe {
                remove_env(INACTIVITY_TIMEOUT_ENV_VAR);
            }
            assert_eq!(result, Some(Duration::from_secs(60)));
        }

        #[test]
        fn test_disabled_by_default() {
            let _guard = ENV_TEST_MUTEX.lock().unwrap();
            // SAFETY: Holding ENV_TEST_MUTEX, no concurrent env access
            unsafe {
                remove_env(INACTIVITY_TIMEOUT_ENV_VAR);
            }
            assert_eq!(resolve_inactivity_timeout(None), None);
        }
    }

    mod compression {
        use super::*;

        #[test]
        fn test_param_takes_priority_over_env() {
            let _guard = ENV_TEST_MUTEX.lock().unwrap();
            // SAFETY: Holding ENV_TEST_MUTEX, no concurrent env access
            unsafe {
                set_env(COMPRESSION_ENV_VAR, "true");
            }
            let result = resolve_compression(Some(false));
            // SAFETY: Holding ENV_TEST_MUTEX, no concurrent env access
            unsafe {
                remove_env(COMPRESSION_ENV_VAR);
            }
            assert!(!result);
        }

        #[test]
        fn test_env_var_one() {
            let _guard = ENV_TEST_MUTEX.lock().unwrap();
            // SAFETY: Holding ENV_TEST_MUTEX, no concurrent env access
            unsafe {
                set_env(COMPRESSION_ENV_VAR, "1");
            }
            let result = resolve_compression(None);
            // SAFETY: Holding ENV_TEST_MUTEX, no concurrent env access
            unsafe {
                remove_env(COMPRESSION_ENV_VAR);
            }
            assert!(result);
        }

        #[test]
        fn test_default_is_false() {
            let _guard = ENV_TEST_MUTEX.lock().unwrap();
            // SAFETY: Holding ENV_TEST_MUTEX, no concurrent env access
            unsafe {
                remove_env(COMPRESSION_ENV_VAR);
            }
            assert!(!resolve_compression(None));
        }
    }
}
