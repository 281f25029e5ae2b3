use std::collections::{BTreeMap, HashMap};
use std::time::Duration;

use anyhow::{Context, Result, bail};
use reqwest::StatusCode;
use serde::{Deserialize, Serialize};
use serde_yaml::Value;
use tracing::warn;

use crate::types::LogBatch;

const PUSH_TIMEOUT: Duration = Duration::from_secs(30);

/// Pushes batches to a Loki HTTP endpoint, one stream per batch.
pub struct LokiSink {
    http: reqwest::Client,
    url: String,
    org_id: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct LokiOptions {
    url: String,
    org_id: String,
}

#[derive(Debug, Serialize, PartialEq)]
pub(crate) struct LokiPayload {
    pub(crate) streams: Vec<LokiStream>,
}

#[derive(Debug, Serialize, PartialEq)]
pub(crate) struct LokiStream {
    pub(crate) stream: BTreeMap<String, String>,
    pub(crate) values: Vec<[String; 2]>,
}

impl LokiSink {
    pub fn from_options(options: &Value) -> Result<LokiSink> {
        let options: LokiOptions = if options.is_null() {
            LokiOptions::default()
        } else {
            serde_yaml::from_value(options.clone()).context("parsing loki options")?
        };
        if options.url.is_empty() {
            bail!("must set a loki URL to send logs to");
        }
        if options.org_id.is_empty() {
            warn!("no loki org id set");
        }
        let http = reqwest::Client::builder()
            .timeout(PUSH_TIMEOUT)
            .build()
            .context("building http client")?;
        Ok(LokiSink {
            http,
            url: options.url,
            org_id: (!options.org_id.is_empty()).then_some(options.org_id),
        })
    }

    pub async fn deliver(&self, batch: &LogBatch) -> Result<()> {
        let mut request = self.http.post(&self.url).json(&payload(batch));
        if let Some(org_id) = &self.org_id {
            request = request.header("X-Scope-OrgID", org_id);
        }
        let response = request.send().await.context("pushing to loki")?;
        let status = response.status();
        if status != StatusCode::OK && status != StatusCode::NO_CONTENT {
            let body = response.text().await.unwrap_or_default();
            bail!("received response status {status}: {body}");
        }
        Ok(())
    }
}

pub(crate) fn apply_env(kind: &mut String, options: &mut Value, env: &HashMap<String, String>) {
    if let Some(url) = env.get("LOKI_URL") {
        *kind = "loki".to_string();
        super::set_option(options, "url", url);
    }
    if let Some(org_id) = env.get("LOKI_ORG_ID") {
        *kind = "loki".to_string();
        super::set_option(options, "org_id", org_id);
    }
}

pub(crate) fn payload(batch: &LogBatch) -> LokiPayload {
    let mut labels = BTreeMap::new();
    labels.insert("aws_account".to_string(), batch.account_id.clone());
    labels.insert("role_arn".to_string(), batch.role_arn.clone());
    labels.insert("aws_region".to_string(), batch.region.clone());
    labels.insert("ecs_cluster".to_string(), batch.cluster.clone());
    labels.insert("service_name".to_string(), batch.service.name.clone());
    for (key, value) in &batch.service.tags {
        labels.insert(prom_label(&format!("tag_{key}")), value.clone());
    }

    let values = batch
        .events
        .iter()
        .map(|event| {
            [
                event
                    .created_at
                    .timestamp_nanos_opt()
                    .unwrap_or_default()
                    .to_string(),
                event.message.clone(),
            ]
        })
        .collect();

    LokiPayload {
        streams: vec![LokiStream {
            stream: labels,
            values,
        }],
    }
}

/// Restrict a label name to the Prometheus charset `[a-zA-Z0-9_]` so tag
/// keys with dots or dashes stay queryable.
pub(crate) fn prom_label(name: &str) -> String {
    name.chars()
        .map(|c| if c.is_ascii_alphanumeric() || c == '_' { c } else { '_' })
        .collect()
}
