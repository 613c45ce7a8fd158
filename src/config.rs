use std::env;
use std::fmt;
use anyhow::{Context, Result, bail};

/// Which repository implementation backs the book endpoints
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StorageBackend {
    Memory,
    Spanner,
}

impl StorageBackend {
    fn parse(value: &str) -> Result<Self> {
        match value.trim().to_ascii_lowercase().as_str() {
            "memory" => Ok(StorageBackend::Memory),
            "spanner" => Ok(StorageBackend::Spanner),
            other => bail!("STORAGE_BACKEND must be one of: memory, spanner, got '{}'", other),
        }
    }
}

impl fmt::Display for StorageBackend {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            StorageBackend::Memory => f.write_str("memory"),
            StorageBackend::Spanner => f.write_str("spanner"),
        }
    }
}

/// Connection settings for the Spanner backend
#[derive(Debug, Clone)]
pub struct SpannerConfig {
    pub emulator_host: Option<String>,
    pub project: String,
    pub instance: String,
    pub database: String,
}

impl SpannerConfig {
    fn from_env() -> Result<Self> {
        let emulator_host = env::var("SPANNER_EMULATOR_HOST").ok();

        let project = env::var("SPANNER_PROJECT")
            .context("SPANNER_PROJECT environment variable is required")?;

        let instance = env::var("SPANNER_INSTANCE")
            .context("SPANNER_INSTANCE environment variable is required")?;

        let database = env::var("SPANNER_DATABASE")
            .context("SPANNER_DATABASE environment variable is required")?;

        Ok(SpannerConfig {
            emulator_host,
            project,
            instance,
            database,
        })
    }

    pub fn database_path(&self) -> String {
        format!(
            "projects/{}/instances/{}/databases/{}",
            self.project, self.instance, self.database
        )
    }
}

#[derive(Debug, Clone)]
pub struct Config {
    pub storage_backend: StorageBackend,
    /// Present only when `storage_backend` is `Spanner`
    pub spanner: Option<SpannerConfig>,
    pub service_port: u16,
    pub service_host: String,
    pub request_timeout_secs: u64,
}

impl Config {
    pub fn from_env() -> Result<Self> {
        let storage_backend = match env::var("STORAGE_BACKEND") {
            Ok(value) => StorageBackend::parse(&value)?,
            Err(_) => StorageBackend::Memory,
        };

        let spanner = match storage_backend {
            StorageBackend::Spanner => Some(SpannerConfig::from_env()?),
            StorageBackend::Memory => None,
        };

        let service_port = env::var("SERVICE_PORT")
            .unwrap_or_else(|_| "3000".to_string())
            .parse::<u16>()
            .context("SERVICE_PORT must be a valid port number (0-65535)")?;

        let service_host = env::var("SERVICE_HOST")
            .unwrap_or_else(|_| "0.0.0.0".to_string());

        let request_timeout_secs = env::var("REQUEST_TIMEOUT_SECS")
            .unwrap_or_else(|_| "30".to_string())
            .parse::<u64>()
            .ok()
            .filter(|secs| *secs > 0)
            .context("REQUEST_TIMEOUT_SECS must be a positive number of seconds")?;

        Ok(Config {
            storage_backend,
            spanner,
            service_port,
            service_host,
            request_timeout_secs,
        })
    }

    /// Config for tests and local runs: in-memory storage, default listener.
    #[cfg(test)]
    pub fn in_memory() -> Self {
        Config {
            storage_backend: StorageBackend::Memory,
            spanner: None,
            service_port: 3000,
            service_host: "0.0.0.0".to_string(),
            request_timeout_secs: 30,
        }
    }

    pub fn log_startup(&self) {
        tracing::info!("Configuration loaded:");
        tracing::info!("  Storage backend: {}", self.storage_backend);
        if let Some(spanner) = &self.spanner {
            tracing::info!("  Spanner emulator: {}",
                spanner.emulator_host.as_deref().unwrap_or("disabled (using production)"));
            tracing::info!("  Spanner project: {}", spanner.project);
            tracing::info!("  Spanner instance: {}", spanner.instance);
            tracing::info!("  Spanner database: {}", spanner.database);
        }
        tracing::info!("  Request timeout: {}s", self.request_timeout_secs);
        tracing::info!("  Service listening on: {}:{}", self.service_host, self.service_port);
    }
}

/// Serialises tests that mutate process environment variables.
#[cfg(test)]
pub(crate) static ENV_LOCK: std::sync::Mutex<()> = std::sync::Mutex::new(());

#[cfg(test)]
mod tests {
    use super::*;
    use std::env;
    use std::sync::MutexGuard;

    fn lock_env() -> MutexGuard<'static, ()> {
        ENV_LOCK.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    fn clear_env_vars() {
        unsafe {
            env::remove_var("STORAGE_BACKEND");
            env::remove_var("SPANNER_EMULATOR_HOST");
            env::remove_var("SPANNER_PROJECT");
            env::remove_var("SPANNER_INSTANCE");
            env::remove_var("SPANNER_DATABASE");
            env::remove_var("SERVICE_PORT");
            env::remove_var("SERVICE_HOST");
            env::remove_var("REQUEST_TIMEOUT_SECS");
        }
    }

    fn set_spanner_vars() {
        unsafe {
            env::set_var("STORAGE_BACKEND", "spanner");
            env::set_var("SPANNER_PROJECT", "test-project");
            env::set_var("SPANNER_INSTANCE", "test-instance");
            env::set_var("SPANNER_DATABASE", "test-database");
        }
    }

    #[test]
    fn test_config_with_defaults() {
        let _guard = lock_env();
        clear_env_vars();

        let config = Config::from_env().unwrap();

        assert_eq!(config.storage_backend, StorageBackend::Memory);
        assert!(config.spanner.is_none());
        assert_eq!(config.service_port, 3000);
        assert_eq!(config.service_host, "0.0.0.0");
        assert_eq!(config.request_timeout_secs, 30);
    }

    #[test]
    fn test_config_with_spanner_vars() {
        let _guard = lock_env();
        clear_env_vars();
        set_spanner_vars();
        unsafe {
            env::set_var("SPANNER_EMULATOR_HOST", "localhost:9010");
            env::set_var("SERVICE_PORT", "8080");
            env::set_var("SERVICE_HOST", "127.0.0.1");
            env::set_var("REQUEST_TIMEOUT_SECS", "5");
        }

        let config = Config::from_env().unwrap();
        clear_env_vars();

        assert_eq!(config.storage_backend, StorageBackend::Spanner);
        let spanner = config.spanner.expect("spanner config");
        assert_eq!(spanner.emulator_host, Some("localhost:9010".to_string()));
        assert_eq!(spanner.project, "test-project");
        assert_eq!(spanner.instance, "test-instance");
        assert_eq!(spanner.database, "test-database");
        assert_eq!(
            spanner.database_path(),
            "projects/test-project/instances/test-instance/databases/test-database"
        );
        assert_eq!(config.service_port, 8080);
        assert_eq!(config.service_host, "127.0.0.1");
        assert_eq!(config.request_timeout_secs, 5);
    }

    #[test]
    fn test_memory_backend_ignores_spanner_vars() {
        let _guard = lock_env();
        clear_env_vars();
        unsafe {
            env::set_var("STORAGE_BACKEND", "Memory");
            env::set_var("SPANNER_PROJECT", "test-project");
        }

        let config = Config::from_env().unwrap();
        clear_env_vars();

        assert_eq!(config.storage_backend, StorageBackend::Memory);
        assert!(config.spanner.is_none());
    }

    #[test]
    fn test_missing_required_spanner_var() {
        let _guard = lock_env();
        clear_env_vars();
        unsafe {
            env::set_var("STORAGE_BACKEND", "spanner");
            env::set_var("SPANNER_PROJECT", "test-project");
            env::set_var("SPANNER_INSTANCE", "test-instance");
        }
        // Missing SPANNER_DATABASE

        let result = Config::from_env();
        clear_env_vars();

        let error = result.unwrap_err();
        assert!(error.to_string().contains("SPANNER_DATABASE"));
    }

    #[test]
    fn test_unknown_backend() {
        let _guard = lock_env();
        clear_env_vars();
        unsafe {
            env::set_var("STORAGE_BACKEND", "postgres");
        }

        let result = Config::from_env();
        clear_env_vars();

        let error = result.unwrap_err();
        assert!(error.to_string().contains("STORAGE_BACKEND"));
        assert!(error.to_string().contains("postgres"));
    }

    #[test]
    fn test_invalid_port() {
        let _guard = lock_env();
        clear_env_vars();
        unsafe {
            env::set_var("SERVICE_PORT", "not-a-number");
        }

        let result = Config::from_env();
        clear_env_vars();

        let error = result.unwrap_err();
        assert!(error.to_string().contains("SERVICE_PORT"));
    }

    #[test]
    fn test_port_out_of_range() {
        let _guard = lock_env();
        clear_env_vars();
        unsafe {
            env::set_var("SERVICE_PORT", "99999");
        }

        let result = Config::from_env();
        clear_env_vars();

        assert!(result.is_err());
    }

    #[test]
    fn test_zero_timeout_rejected() {
        let _guard = lock_env();
        clear_env_vars();
        unsafe {
            env::set_var("REQUEST_TIMEOUT_SECS", "0");
        }

        let result = Config::from_env();
        clear_env_vars();

        let error = result.unwrap_err();
        assert!(error.to_string().contains("REQUEST_TIMEOUT_SECS"));
    }
}
