use relay_api::RelayError;

#[derive(Debug, thiserror::Error)]
pub enum BusError {
    #[error("topic '{topic}': capacity must be positive")]
    ZeroCapacity { topic: String },

    #[error("topic '{topic}' already carries a different payload type (requested {expected})")]
    TypeMismatch {
        topic: String,
        expected: &'static str,
    },
}

impl From<BusError> for RelayError {
    fn from(e: BusError) -> Self {
        RelayError::bus(e.to_string())
    }
}

#[derive(Debug, thiserror::Error)]
pub enum EngineError {
    #[error("config error: {0}")]
    Config(String),

    #[error("bus error: {0}")]
    Bus(#[from] BusError),

    #[error("processor '{name}': {source}")]
    Processor { name: String, source: RelayError },

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}

impl EngineError {
    pub fn processor(name: impl Into<String>, source: RelayError) -> Self {
        EngineError::Processor {
            name: name.into(),
            source,
        }
    }
}
