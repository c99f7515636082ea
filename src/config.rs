use std::time::Duration;

pub const TRANSPORT_ENV_VAR: &str = "CHAT_SESSION_TRANSPORT";
pub const BASE_URL_ENV_VAR: &str = "CHAT_SESSION_BASE_URL";
pub const TIMEOUT_ENV_VAR: &str = "CHAT_SESSION_TIMEOUT_SEC";
pub const SESSION_ID_ENV_VAR: &str = "CHAT_SESSION_ID";
pub const LOG_FILTER_ENV_VAR: &str = "CHAT_SESSION_LOG";

/// Startup configuration for the interactive shell, read from the
/// environment once at launch. Unset or blank variables fall back to each
/// consumer's default.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ShellConfig {
    pub transport_id: Option<String>,
    pub base_url: Option<String>,
    pub timeout: Option<Duration>,
    pub startup_identity: Option<String>,
}

pub fn shell_config_from_env() -> Result<ShellConfig, String> {
    let timeout = match env_value(TIMEOUT_ENV_VAR) {
        Some(raw) => Some(parse_timeout(&raw)?),
        None => None,
    };

    Ok(ShellConfig {
        transport_id: env_value(TRANSPORT_ENV_VAR),
        base_url: env_value(BASE_URL_ENV_VAR),
        timeout,
        startup_identity: env_value(SESSION_ID_ENV_VAR),
    })
}

fn env_value(name: &str) -> Option<String> {
    std::env::var(name)
        .ok()
        .map(|value| value.trim().to_string())
        .filter(|value| !value.is_empty())
}

fn parse_timeout(raw: &str) -> Result<Duration, String> {
    match raw.parse::<u64>() {
        Ok(seconds) if seconds > 0 => Ok(Duration::from_secs(seconds)),
        _ => Err(format!(
            "{TIMEOUT_ENV_VAR} must be a positive whole number of seconds, got '{raw}'"
        )),
    }
}

#[cfg(test)]
mod tests {
    use std::sync::{Mutex, MutexGuard, OnceLock};
    use std::time::Duration;

    use super::*;

    struct EnvVarGuard {
        name: &'static str,
        previous: Option<String>,
    }

    impl EnvVarGuard {
        fn set(name: &'static str, value: Option<&str>) -> Self {
            let previous = std::env::var(name).ok();
            match value {
                Some(value) => std::env::set_var(name, value),
                None => std::env::remove_var(name),
            }

            Self { name, previous }
        }
    }

    impl Drop for EnvVarGuard {
        fn drop(&mut self) {
            match &self.previous {
                Some(value) => std::env::set_var(self.name, value),
                None => std::env::remove_var(self.name),
            }
        }
    }

    fn env_lock() -> &'static Mutex<()> {
        static LOCK: OnceLock<Mutex<()>> = OnceLock::new();
        LOCK.get_or_init(|| Mutex::new(()))
    }

    fn lock_unpoisoned<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
        match mutex.lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        }
    }

    #[test]
    fn unset_environment_yields_empty_config() {
        let _env_serialization = lock_unpoisoned(env_lock());
        let _transport = EnvVarGuard::set(TRANSPORT_ENV_VAR, None);
        let _base_url = EnvVarGuard::set(BASE_URL_ENV_VAR, None);
        let _timeout = EnvVarGuard::set(TIMEOUT_ENV_VAR, None);
        let _session_id = EnvVarGuard::set(SESSION_ID_ENV_VAR, None);

        let config = shell_config_from_env().expect("empty environment should parse");

        assert_eq!(config, ShellConfig::default());
    }

    #[test]
    fn values_are_trimmed_and_blanks_ignored() {
        let _env_serialization = lock_unpoisoned(env_lock());
        let _transport = EnvVarGuard::set(TRANSPORT_ENV_VAR, Some("  mock  "));
        let _base_url = EnvVarGuard::set(BASE_URL_ENV_VAR, Some("   "));
        let _timeout = EnvVarGuard::set(TIMEOUT_ENV_VAR, None);
        let _session_id = EnvVarGuard::set(SESSION_ID_ENV_VAR, Some("123456"));

        let config = shell_config_from_env().expect("environment should parse");

        assert_eq!(config.transport_id.as_deref(), Some("mock"));
        assert!(config.base_url.is_none());
        assert_eq!(config.startup_identity.as_deref(), Some("123456"));
    }

    #[test]
    fn timeout_parses_whole_seconds() {
        let _env_serialization = lock_unpoisoned(env_lock());
        let _transport = EnvVarGuard::set(TRANSPORT_ENV_VAR, None);
        let _base_url = EnvVarGuard::set(BASE_URL_ENV_VAR, None);
        let _timeout = EnvVarGuard::set(TIMEOUT_ENV_VAR, Some("30"));
        let _session_id = EnvVarGuard::set(SESSION_ID_ENV_VAR, None);

        let config = shell_config_from_env().expect("environment should parse");

        assert_eq!(config.timeout, Some(Duration::from_secs(30)));
    }

    #[test]
    fn zero_or_malformed_timeout_is_rejected() {
        let _env_serialization = lock_unpoisoned(env_lock());
        let _transport = EnvVarGuard::set(TRANSPORT_ENV_VAR, None);
        let _base_url = EnvVarGuard::set(BASE_URL_ENV_VAR, None);
        let _session_id = EnvVarGuard::set(SESSION_ID_ENV_VAR, None);

        for raw in ["0", "-5", "fast"] {
            let _timeout = EnvVarGuard::set(TIMEOUT_ENV_VAR, Some(raw));
            let error = shell_config_from_env().expect_err("bad timeout should fail");
            assert!(error.contains(TIMEOUT_ENV_VAR));
        }
    }
}
