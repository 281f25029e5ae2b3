pub mod loki;
pub mod stdout;

use std::collections::HashMap;

use anyhow::{Result, bail};
use serde_yaml::Value;

pub use loki::LokiSink;
pub use stdout::StdoutSink;

use crate::types::LogBatch;

/// The sink selected at startup. One instance lives for the whole process
/// and is shared across every cycle branch.
pub enum Sink {
    Stdout(StdoutSink),
    Loki(LokiSink),
    #[cfg(test)]
    Capture(capture::CaptureSink),
}

impl Sink {
    /// Registry of known sink kinds.
    pub fn from_config(kind: &str, options: &Value) -> Result<Sink> {
        match kind {
            "stdout" => Ok(Sink::Stdout(StdoutSink)),
            "loki" => Ok(Sink::Loki(LokiSink::from_options(options)?)),
            other => bail!("unknown logger '{other}'"),
        }
    }

    pub async fn deliver(&self, batch: &LogBatch) -> Result<()> {
        match self {
            Sink::Stdout(sink) => sink.deliver(batch),
            Sink::Loki(sink) => sink.deliver(batch).await,
            #[cfg(test)]
            Sink::Capture(sink) => sink.deliver(batch),
        }
    }
}

/// Let each sink inspect the environment before the sink is constructed, so
/// that e.g. setting LOKI_URL alone is enough to select the loki sink.
pub fn apply_env_overrides(kind: &mut String, options: &mut Value, env: &HashMap<String, String>) {
    loki::apply_env(kind, options, env);
}

pub(crate) fn set_option(options: &mut Value, key: &str, value: &str) {
    if !options.is_mapping() {
        *options = Value::Mapping(serde_yaml::Mapping::new());
    }
    if let Value::Mapping(map) = options {
        map.insert(
            Value::String(key.to_string()),
            Value::String(value.to_string()),
        );
    }
}

#[cfg(test)]
pub mod capture {
    use std::collections::HashSet;
    use std::sync::{Arc, Mutex};

    use anyhow::{Result, bail};

    use crate::types::LogBatch;

    /// Test sink that records delivered batches and can be told to fail
    /// delivery for specific services.
    #[derive(Default)]
    pub struct CaptureSink {
        pub batches: Arc<Mutex<Vec<LogBatch>>>,
        pub fail_for: HashSet<String>,
    }

    impl CaptureSink {
        pub fn deliver(&self, batch: &LogBatch) -> Result<()> {
            if self.fail_for.contains(&batch.service.name) {
                bail!("simulated delivery failure for {}", batch.service.name);
            }
            self.batches.lock().unwrap().push(batch.clone());
            Ok(())
        }
    }
}
