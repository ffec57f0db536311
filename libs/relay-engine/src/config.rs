use std::collections::HashSet;
use std::time::Duration;

use serde::Deserialize;
use serde::de::DeserializeOwned;

use crate::error::EngineError;

/// Root configuration, parsed from TOML.
#[derive(Debug, Clone, Deserialize)]
pub struct RelayConfig {
    /// Scheduler period in milliseconds.
    #[serde(default = "default_tick_ms")]
    pub tick_ms: u64,

    /// Stop the engine on the first failed tick.
    #[serde(default = "default_halt_on_error")]
    pub halt_on_error: bool,

    /// Processor definitions, ticked in this order.
    #[serde(default)]
    pub processors: Vec<ProcessorConfig>,
}

fn default_tick_ms() -> u64 {
    10
}

fn default_halt_on_error() -> bool {
    true
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct ProcessorConfig {
    pub name: String,
    /// Processor implementation, e.g. `"vision-collector"`.
    pub kind: String,
    #[serde(default)]
    pub config: Option<toml::Value>,
}

impl ProcessorConfig {
    /// Deserialize the processor-specific `config` table; absent means defaults.
    pub fn settings<C>(&self) -> Result<C, EngineError>
    where
        C: DeserializeOwned + Default,
    {
        match &self.config {
            None => Ok(C::default()),
            Some(value) => value
                .clone()
                .try_into()
                .map_err(|e| EngineError::Config(format!("processor '{}': {e}", self.name))),
        }
    }
}

impl ProcessorConfig {
    /// Deserialize settings that have no defaults; the `config` table must exist.
    pub fn require<C>(&self) -> Result<C, EngineError>
    where
        C: DeserializeOwned,
    {
        let value = self.config.clone().ok_or_else(|| {
            EngineError::Config(format!("processor '{}': missing [processors.config] table", self.name))
        })?;
        value
            .try_into()
            .map_err(|e| EngineError::Config(format!("processor '{}': {e}", self.name)))
    }
}

impl RelayConfig {
    /// Load configuration from a TOML file.
    pub fn load(path: &str) -> Result<Self, EngineError> {
        let content =
            std::fs::read_to_string(path).map_err(|e| EngineError::Config(format!("{path}: {e}")))?;
        Self::parse(&content)
    }

    /// Parse configuration from a TOML string.
    pub fn parse(toml_str: &str) -> Result<Self, EngineError> {
        let config: Self = toml::from_str(toml_str).map_err(|e| EngineError::Config(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    pub fn tick_period(&self) -> Duration {
        Duration::from_millis(self.tick_ms)
    }

    fn validate(&self) -> Result<(), EngineError> {
        if self.tick_ms == 0 {
            return Err(EngineError::Config("tick_ms must be positive".into()));
        }
        let mut names = HashSet::new();
        for proc_cfg in &self.processors {
            if !names.insert(proc_cfg.name.as_str()) {
                return Err(EngineError::Config(format!(
                    "duplicate processor name '{}'",
                    proc_cfg.name
                )));
            }
        }
        Ok(())
    }
}
