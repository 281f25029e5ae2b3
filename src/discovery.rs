use anyhow::Result;
use tracing::warn;

use crate::filter::matches_tag_filters;
use crate::provider::{EcsApi, EcsClient};
use crate::types::{EcsService, TagFilters};

/// DescribeServices accepts at most 10 services per call.
pub const DESCRIBE_SERVICES_BATCH: usize = 10;

/// Resolve the set of clusters to scan: the explicitly configured names, or
/// everything the account lists, narrowed by the cluster tag filters.
pub async fn cluster_list(
    client: &EcsClient,
    explicit: &[String],
    filters: &TagFilters,
) -> Result<Vec<String>> {
    let names = if explicit.is_empty() {
        list_clusters(client.api.as_ref()).await?
    } else {
        explicit.to_vec()
    };
    describe_clusters(client, &names, filters).await
}

async fn list_clusters(api: &dyn EcsApi) -> Result<Vec<String>> {
    let mut clusters = Vec::new();
    let mut token = None;
    loop {
        let page = api.list_clusters(token).await?;
        clusters.extend(page.ids);
        match page.next_token {
            Some(next) => token = Some(next),
            None => break,
        }
    }
    Ok(clusters)
}

async fn describe_clusters(
    client: &EcsClient,
    names: &[String],
    filters: &TagFilters,
) -> Result<Vec<String>> {
    if names.is_empty() {
        return Ok(Vec::new());
    }
    let output = client.api.describe_clusters(names).await?;
    for failure in &output.failures {
        warn!(
            "[{}] skipping cluster {}: {}",
            client.region, failure.arn, failure.reason
        );
    }
    Ok(output
        .records
        .into_iter()
        .filter(|record| matches_tag_filters(filters, &record.tags))
        .map(|record| record.name)
        .collect())
}

/// Resolve the services to scan within one cluster, analogous to
/// [`cluster_list`] but with description batched in chunks of 10.
pub async fn service_list(
    client: &EcsClient,
    cluster: &str,
    explicit: &[String],
    filters: &TagFilters,
) -> Result<Vec<EcsService>> {
    let names = if explicit.is_empty() {
        list_services(client.api.as_ref(), cluster).await?
    } else {
        explicit.to_vec()
    };
    describe_services(client, cluster, &names, filters).await
}

async fn list_services(api: &dyn EcsApi, cluster: &str) -> Result<Vec<String>> {
    let mut services = Vec::new();
    let mut token = None;
    loop {
        let page = api.list_services(cluster, token).await?;
        services.extend(page.ids);
        match page.next_token {
            Some(next) => token = Some(next),
            None => break,
        }
    }
    Ok(services)
}

async fn describe_services(
    client: &EcsClient,
    cluster: &str,
    names: &[String],
    filters: &TagFilters,
) -> Result<Vec<EcsService>> {
    let mut services = Vec::new();
    for chunk in names.chunks(DESCRIBE_SERVICES_BATCH) {
        let output = client.api.describe_services(cluster, chunk).await?;
        for failure in &output.failures {
            warn!(
                "[{}] skipping service {}: {}",
                client.region, failure.arn, failure.reason
            );
        }
        services.extend(
            output
                .records
                .into_iter()
                .filter(|record| matches_tag_filters(filters, &record.tags))
                .map(|record| EcsService {
                    name: record.name,
                    tags: record.tags,
                }),
        );
    }
    Ok(services)
}
