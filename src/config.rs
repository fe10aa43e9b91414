use std::env;
use std::path::PathBuf;

use crate::generator::SEED_COUNT;

pub const DEFAULT_ADDR: &str = "127.0.0.1:3000";
pub const DEFAULT_DATA_DIR: &str = "database";

/// Runtime settings shared by the binaries.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Config {
    /// Address the web server binds to
    pub addr: String,

    /// Directory holding the persisted user blob
    pub data_dir: PathBuf,

    /// Users generated when the data directory holds nothing yet
    pub seed_count: usize,
}

impl Default for Config {
    fn default() -> Self {
        Config {
            addr: DEFAULT_ADDR.to_string(),
            data_dir: PathBuf::from(DEFAULT_DATA_DIR),
            seed_count: SEED_COUNT,
        }
    }
}

impl Config {
    /// Read `USERGRID_ADDR`, `USERGRID_DATA_DIR` and `USERGRID_SEED_COUNT`.
    pub fn from_env() -> Self {
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Build a config from any variable source; unset or unparseable values keep the default.
    pub fn from_lookup<F>(lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut config = Config::default();
        if let Some(addr) = lookup("USERGRID_ADDR").filter(|a| !a.trim().is_empty()) {
            config.addr = addr;
        }
        if let Some(dir) = lookup("USERGRID_DATA_DIR").filter(|d| !d.trim().is_empty()) {
            config.data_dir = PathBuf::from(dir);
        }
        if let Some(count) = lookup("USERGRID_SEED_COUNT").and_then(|c| c.trim().parse().ok()) {
            config.seed_count = count;
        }
        config
    }

    /// Positional overrides: `<addr> [data_dir]`. `args` excludes the program name.
    pub fn with_args(mut self, args: &[String]) -> Self {
        if let Some(addr) = args.first() {
            self.addr = addr.clone();
        }
        if let Some(dir) = args.get(1) {
            self.data_dir = PathBuf::from(dir);
        }
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    #[test]
    fn defaults_when_nothing_set() {
        let config = Config::from_lookup(|_| None);
        assert_eq!(config, Config::default());
        assert_eq!(config.seed_count, 5000);
    }

    #[test]
    fn reads_variables_and_ignores_garbage() {
        let vars: HashMap<&str, &str> = HashMap::from([
            ("USERGRID_ADDR", "0.0.0.0:8080"),
            ("USERGRID_DATA_DIR", "/tmp/users"),
            ("USERGRID_SEED_COUNT", "lots"),
        ]);
        let config = Config::from_lookup(|k| vars.get(k).map(|v| v.to_string()));
        assert_eq!(config.addr, "0.0.0.0:8080");
        assert_eq!(config.data_dir, PathBuf::from("/tmp/users"));
        assert_eq!(config.seed_count, SEED_COUNT);
    }

    #[test]
    fn args_override() {
        let config = Config::default().with_args(&["0.0.0.0:9000".to_string(), "data".to_string()]);
        assert_eq!(config.addr, "0.0.0.0:9000");
        assert_eq!(config.data_dir, PathBuf::from("data"));
    }
}
