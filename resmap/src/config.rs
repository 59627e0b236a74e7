use crate::info;
use crate::logger::{self, Level};
use config::{Config, ConfigError, Environment, File};
use dotenv::dotenv;
use serde::Deserialize;
use std::sync::Once;

static DOTENV_ONCE: Once = Once::new();

fn ensure_dotenv_loaded() {
    DOTENV_ONCE.call_once(|| {
        match dotenv() {
            Ok(_) => info!("Config loaded including .env file."),
            Err(_) => info!("Config loaded without .env file."),
        }
    });
}

fn default_page_size() -> u64 { 20 }
fn max_page_size() -> u64 { 100 }

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct PaginationConfig {
    #[serde(default = "default_page_size")]
    pub default_size: u64,
    #[serde(default = "max_page_size")]
    pub max_size: u64,
}

impl Default for PaginationConfig {
    fn default() -> Self {
        PaginationConfig { default_size: default_page_size(), max_size: max_page_size() }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct ResmapConfig {
    #[serde(default)]
    pub log_level: Level,
    #[serde(default)]
    pub pagination: PaginationConfig,
}

impl ResmapConfig {
    /// Reads `path` (any format the `config` crate understands) overlaid with `RESMAP__*` env vars.
    pub fn load(path: &str) -> Result<Self, ConfigError> {
        ensure_dotenv_loaded();
        let builder = Config::builder()
            .add_source(File::with_name(path).required(true))
            .add_source(Self::environment());
        Self::finish(builder.build()?)
    }

    pub fn from_env() -> Result<Self, ConfigError> {
        ensure_dotenv_loaded();
        Self::finish(Config::builder().add_source(Self::environment()).build()?)
    }

    fn environment() -> Environment {
        Environment::with_prefix("RESMAP").try_parsing(true).separator("__")
    }

    fn finish(config: Config) -> Result<Self, ConfigError> {
        let cfg = config.try_deserialize::<ResmapConfig>()?;
        cfg.validate()?;
        logger::set_level(cfg.log_level);
        info!("{:?}", cfg);
        Ok(cfg)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        let p = &self.pagination;
        if p.max_size == 0 {
            return Err(ConfigError::Message("pagination.max_size must be greater than zero".into()));
        }
        if p.default_size == 0 || p.default_size > p.max_size {
            return Err(ConfigError::Message(format!(
                "pagination.default_size must be within 1..={}, found {}",
                p.max_size, p.default_size
            )));
        }
        Ok(())
    }
}
