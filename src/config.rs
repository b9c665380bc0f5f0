/// Configuración del motor.
///
/// Valores por defecto, sobrescritos por variables de entorno y después por
/// los argumentos de línea de comandos.
use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;

use log::warn;

use crate::observation::{DEFAULT_FORGOTTEN_THRESHOLD, DEFAULT_MISS_TOLERANCE};
use crate::safety::{RootPolicy, SafetyPolicy, DEFAULT_PROTECTED_USERS};
use crate::terminate::{DEFAULT_MAX_ATTEMPTS, DEFAULT_POLL_INTERVAL};

/// Intervalo de refresco del tray (segundos)
pub const DEFAULT_REFRESH_SECS: u64 = 10;

#[derive(Debug, Clone, PartialEq)]
pub struct EngineConfig {
    /// Sondeos consecutivos que un puerto puede faltar antes de olvidarlo
    pub miss_tolerance: u32,
    pub forgotten_threshold: Duration,
    pub refresh_interval: Duration,
    pub term_poll_interval: Duration,
    pub term_max_attempts: u32,
    pub proc_root: PathBuf,
    pub protected_users: Vec<String>,
    pub root_policy: RootPolicy,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            miss_tolerance: DEFAULT_MISS_TOLERANCE,
            forgotten_threshold: DEFAULT_FORGOTTEN_THRESHOLD,
            refresh_interval: Duration::from_secs(DEFAULT_REFRESH_SECS),
            term_poll_interval: DEFAULT_POLL_INTERVAL,
            term_max_attempts: DEFAULT_MAX_ATTEMPTS,
            proc_root: PathBuf::from("/proc"),
            protected_users: DEFAULT_PROTECTED_USERS.iter().map(|u| u.to_string()).collect(),
            root_policy: RootPolicy::default(),
        }
    }
}

impl EngineConfig {
    /// Valores por defecto con las variables `PORTWATCH_*` aplicadas.
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Igual que `from_env` pero con una función de consulta inyectable.
    pub fn from_lookup<F>(lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut config = Self::default();

        if let Some(n) = parse_var::<u32, _>(&lookup, "PORTWATCH_MISS_TOLERANCE") {
            config.miss_tolerance = n;
        }
        if let Some(minutes) = parse_var::<u64, _>(&lookup, "PORTWATCH_FORGOTTEN_MINUTES") {
            config.forgotten_threshold = Duration::from_secs(minutes.saturating_mul(60));
        }
        if let Some(secs) = parse_var::<u64, _>(&lookup, "PORTWATCH_REFRESH_SECS") {
            if secs == 0 {
                warn!("PORTWATCH_REFRESH_SECS=0 ignorado");
            } else {
                config.refresh_interval = Duration::from_secs(secs);
            }
        }
        if let Some(root) = lookup("PORTWATCH_PROC_ROOT").filter(|v| !v.trim().is_empty()) {
            config.proc_root = PathBuf::from(root.trim());
        }
        if let Some(users) = lookup("PORTWATCH_PROTECTED_USERS") {
            config.protected_users = users
                .split(',')
                .map(str::trim)
                .filter(|u| !u.is_empty())
                .map(String::from)
                .collect();
        }
        if let Some(policy) = parse_var::<RootPolicy, _>(&lookup, "PORTWATCH_ROOT_POLICY") {
            config.root_policy = policy;
        }

        config
    }

    pub fn safety_policy(&self) -> SafetyPolicy {
        SafetyPolicy::new(self.protected_users.clone(), self.root_policy)
    }
}

fn parse_var<T, F>(lookup: &F, key: &str) -> Option<T>
where
    T: FromStr,
    F: Fn(&str) -> Option<String>,
{
    let raw = lookup(key)?;
    match raw.trim().parse::<T>() {
        Ok(value) => Some(value),
        Err(_) => {
            warn!("Valor inválido para {}: {:?}, se ignora", key, raw);
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup(vars: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| map.get(key).cloned()
    }

    #[test]
    fn test_defaults() {
        let config = EngineConfig::default();
        assert_eq!(config.miss_tolerance, 3);
        assert_eq!(config.forgotten_threshold, Duration::from_secs(600));
        assert_eq!(config.refresh_interval, Duration::from_secs(10));
        assert_eq!(config.term_poll_interval, Duration::from_millis(500));
        assert_eq!(config.term_max_attempts, 8);
        assert_eq!(config.root_policy, RootPolicy::Advisory);
        assert!(config.protected_users.contains(&"root".to_string()));
    }

    #[test]
    fn test_env_overrides() {
        let config = EngineConfig::from_lookup(lookup(&[
            ("PORTWATCH_MISS_TOLERANCE", "5"),
            ("PORTWATCH_FORGOTTEN_MINUTES", "30"),
            ("PORTWATCH_REFRESH_SECS", "2"),
            ("PORTWATCH_PROC_ROOT", "/tmp/fakeproc"),
            ("PORTWATCH_PROTECTED_USERS", "root, www-data ,,"),
            ("PORTWATCH_ROOT_POLICY", "block"),
        ]));

        assert_eq!(config.miss_tolerance, 5);
        assert_eq!(config.forgotten_threshold, Duration::from_secs(1800));
        assert_eq!(config.refresh_interval, Duration::from_secs(2));
        assert_eq!(config.proc_root, PathBuf::from("/tmp/fakeproc"));
        assert_eq!(config.protected_users, vec!["root", "www-data"]);
        assert_eq!(config.root_policy, RootPolicy::Block);
    }

    #[test]
    fn test_invalid_values_are_ignored() {
        let config = EngineConfig::from_lookup(lookup(&[
            ("PORTWATCH_MISS_TOLERANCE", "three"),
            ("PORTWATCH_REFRESH_SECS", "0"),
            ("PORTWATCH_ROOT_POLICY", "sometimes"),
        ]));
        assert_eq!(config, EngineConfig::default());
    }

    /// Un número de minutos enorme se satura en vez de desbordar
    #[test]
    fn test_forgotten_minutes_saturate() {
        let max = u64::MAX.to_string();
        let config =
            EngineConfig::from_lookup(lookup(&[("PORTWATCH_FORGOTTEN_MINUTES", max.as_str())]));
        assert_eq!(config.forgotten_threshold, Duration::from_secs(u64::MAX));
    }

    #[test]
    fn test_safety_policy_follows_config() {
        let config = EngineConfig {
            protected_users: vec!["deploy".to_string()],
            root_policy: RootPolicy::Block,
            ..Default::default()
        };
        let policy = config.safety_policy();
        assert!(policy.is_protected_user("deploy"));
        assert!(policy.is_protected_user("root"));
        assert_eq!(policy.root_policy, RootPolicy::Block);
    }
}
