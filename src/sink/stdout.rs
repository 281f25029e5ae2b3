use anyhow::Result;

use crate::types::LogBatch;

/// Prints every event to stdout with its batch labels, one line per event.
pub struct StdoutSink;

impl StdoutSink {
    pub fn deliver(&self, batch: &LogBatch) -> Result<()> {
        for event in &batch.events {
            println!(
                "[{} / {}] [{} {} {} {} {}] {}",
                event.created_at,
                event.created_at.timestamp_nanos_opt().unwrap_or_default(),
                batch.account_id,
                batch.role_arn,
                batch.region,
                batch.cluster,
                batch.service.name,
                event.message
            );
        }
        Ok(())
    }
}
