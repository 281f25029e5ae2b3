use anyhow::Result;
use chrono::{DateTime, Utc};

use crate::provider::EcsClient;
use crate::types::LogEvent;

/// Fetch the deployment events for one service and keep those created
/// strictly after the cycle watermark.
///
/// ECS returns the event window newest-first; the kept events are re-sorted
/// oldest-first so sinks receive them in chronological order (Loki rejects
/// out-of-order entries within a stream).
pub async fn deployment_events(
    client: &EcsClient,
    cluster: &str,
    service: &str,
    watermark: DateTime<Utc>,
) -> Result<Vec<LogEvent>> {
    let events = client.api.service_events(cluster, service).await?;
    let mut fresh: Vec<LogEvent> = events
        .into_iter()
        .filter(|event| event.created_at > watermark)
        .collect();
    fresh.sort_by_key(|event| event.created_at);
    Ok(fresh)
}
