use std::sync::Arc;

use anyhow::Error;
use chrono::{DateTime, Utc};
use futures::stream::{self, StreamExt};
use tokio::sync::mpsc;
use tokio::task::JoinSet;
use tracing::{debug, error};

use crate::config::Config;
use crate::discovery;
use crate::events;
use crate::provider::EcsClient;
use crate::sink::Sink;
use crate::types::{EcsService, LogBatch};

/// Drives the poll loop: every cycle fans out over clients, their clusters
/// and their services, forwards new events, and collects branch errors.
pub struct Scanner {
    clients: Vec<Arc<EcsClient>>,
    config: Arc<Config>,
    sink: Arc<Sink>,
}

impl Scanner {
    pub fn new(clients: Vec<EcsClient>, config: Config, sink: Sink) -> Scanner {
        Scanner {
            clients: clients.into_iter().map(Arc::new).collect(),
            config: Arc::new(config),
            sink: Arc::new(sink),
        }
    }

    /// Run cycles forever, sleeping for the scan interval between them.
    pub async fn run(&self) {
        let interval = std::time::Duration::from_secs(self.config.scan_interval);
        loop {
            let watermark =
                Utc::now() - chrono::Duration::seconds(self.config.scan_interval as i64);
            let errors = self.run_cycle(watermark).await;
            for err in &errors {
                error!("error: {err:#}");
            }
            tokio::time::sleep(interval).await;
        }
    }

    /// One scan cycle. Every branch reports into a shared error channel and
    /// no branch failure cancels its siblings; the cycle is done when the
    /// whole branch tree has drained.
    pub async fn run_cycle(&self, watermark: DateTime<Utc>) -> Vec<Error> {
        let (err_tx, mut err_rx) = mpsc::unbounded_channel();
        let mut branches = JoinSet::new();
        for client in &self.clients {
            branches.spawn(scan_client(
                Arc::clone(client),
                Arc::clone(&self.config),
                Arc::clone(&self.sink),
                watermark,
                err_tx.clone(),
            ));
        }
        drop(err_tx);
        while branches.join_next().await.is_some() {}

        let mut errors = Vec::new();
        while let Some(err) = err_rx.recv().await {
            errors.push(err);
        }
        errors
    }
}

async fn scan_client(
    client: Arc<EcsClient>,
    config: Arc<Config>,
    sink: Arc<Sink>,
    watermark: DateTime<Utc>,
    err_tx: mpsc::UnboundedSender<Error>,
) {
    let clusters =
        match discovery::cluster_list(&client, &config.clusters, &config.cluster_tags).await {
            Ok(clusters) => clusters,
            Err(err) => {
                let _ = err_tx
                    .send(err.context(format!("discovering clusters in {}", client.region)));
                return;
            }
        };
    debug!("[{}] scanning {} clusters", client.region, clusters.len());

    stream::iter(clusters)
        .for_each_concurrent(config.max_in_flight, |cluster| {
            let client = Arc::clone(&client);
            let config = Arc::clone(&config);
            let sink = Arc::clone(&sink);
            let err_tx = err_tx.clone();
            async move {
                scan_cluster(client, config, sink, cluster, watermark, err_tx).await;
            }
        })
        .await;
}

async fn scan_cluster(
    client: Arc<EcsClient>,
    config: Arc<Config>,
    sink: Arc<Sink>,
    cluster: String,
    watermark: DateTime<Utc>,
    err_tx: mpsc::UnboundedSender<Error>,
) {
    let services =
        match discovery::service_list(&client, &cluster, &config.services, &config.service_tags)
            .await
        {
            Ok(services) => services,
            Err(err) => {
                let _ = err_tx.send(err.context(format!(
                    "discovering services in {}/{}",
                    client.region, cluster
                )));
                return;
            }
        };

    let cluster = &cluster;
    stream::iter(services)
        .for_each_concurrent(config.max_in_flight, |service| {
            let client = Arc::clone(&client);
            let sink = Arc::clone(&sink);
            let err_tx = err_tx.clone();
            async move {
                scan_service(client, sink, cluster, service, watermark, err_tx).await;
            }
        })
        .await;
}

async fn scan_service(
    client: Arc<EcsClient>,
    sink: Arc<Sink>,
    cluster: &str,
    service: EcsService,
    watermark: DateTime<Utc>,
    err_tx: mpsc::UnboundedSender<Error>,
) {
    let events =
        match events::deployment_events(&client, cluster, &service.name, watermark).await {
            Ok(events) => events,
            Err(err) => {
                let _ = err_tx.send(err.context(format!(
                    "fetching events for {}/{}/{}",
                    client.region, cluster, service.name
                )));
                return;
            }
        };
    if events.is_empty() {
        return;
    }
    debug!(
        "[{}] {}/{}: {} new events",
        client.region,
        cluster,
        service.name,
        events.len()
    );

    let batch = LogBatch {
        account_id: client.account_id.clone(),
        role_arn: client.role_arn.clone(),
        region: client.region.clone(),
        cluster: cluster.to_string(),
        service,
        events,
    };
    // A failed push is dropped, not retried - the next cycle's watermark is
    // already past these events.
    if let Err(err) = sink.deliver(&batch).await {
        let _ = err_tx.send(err.context(format!(
            "delivering batch for {}/{}/{}",
            batch.region, batch.cluster, batch.service.name
        )));
    }
}
