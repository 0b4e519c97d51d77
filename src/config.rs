// Runtime configuration: where the two tables live and where the API listens

use std::env;
use std::path::{Path, PathBuf};

pub const DEFAULT_DATA_DIR: &str = ".github";
pub const DEFAULT_CALF_FILE: &str = "Cadastro_de_bezerra.csv";
pub const DEFAULT_TREATMENT_FILE: &str = "dados_bezerras_pre_registrados.csv";
pub const DEFAULT_SERVER_ADDR: &str = "127.0.0.1:3000";

pub const ENV_DATA_DIR: &str = "CALF_LEDGER_DATA_DIR";
pub const ENV_SERVER_ADDR: &str = "CALF_LEDGER_ADDR";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Config {
    pub data_dir: PathBuf,
    pub calf_file: String,
    pub treatment_file: String,
    pub server_addr: String,
}

impl Default for Config {
    fn default() -> Self {
        Config {
            data_dir: PathBuf::from(DEFAULT_DATA_DIR),
            calf_file: DEFAULT_CALF_FILE.to_string(),
            treatment_file: DEFAULT_TREATMENT_FILE.to_string(),
            server_addr: DEFAULT_SERVER_ADDR.to_string(),
        }
    }
}

impl Config {
    /// Defaults, overridden by `CALF_LEDGER_DATA_DIR` / `CALF_LEDGER_ADDR`
    pub fn from_env() -> Self {
        Self::from_lookup(|key| env::var(key).ok())
    }

    fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let mut config = Config::default();
        if let Some(dir) = lookup(ENV_DATA_DIR).filter(|v| !v.trim().is_empty()) {
            config.data_dir = PathBuf::from(dir);
        }
        if let Some(addr) = lookup(ENV_SERVER_ADDR).filter(|v| !v.trim().is_empty()) {
            config.server_addr = addr;
        }
        config
    }

    pub fn with_data_dir(mut self, data_dir: impl AsRef<Path>) -> Self {
        self.data_dir = data_dir.as_ref().to_path_buf();
        self
    }

    pub fn calf_registry_path(&self) -> PathBuf {
        self.data_dir.join(&self.calf_file)
    }

    pub fn treatment_log_path(&self) -> PathBuf {
        self.data_dir.join(&self.treatment_file)
    }
}
