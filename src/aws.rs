use std::sync::Arc;

use anyhow::{Context, Result};
use async_trait::async_trait;
use aws_config::{BehaviorVersion, Region};
use aws_sdk_ecs::types::{ClusterField, ServiceField, Tag};
use tracing::{info, warn};

use crate::config::Config;
use crate::provider::{
    DescribeOutput, EcsApi, EcsClient, ResourceFailure, ResourcePage, ResourceRecord,
};
use crate::types::{LogEvent, TagMap};

/// Build one client per configured (role, region) pair. Individual failures
/// are logged and skipped; an empty result is fatal for the whole process.
pub async fn resolve_clients(config: &Config) -> Result<Vec<EcsClient>> {
    let mut clients = Vec::new();
    if !config.ignore_default_credentials {
        collect_clients(&mut clients, &config.regions, "").await;
    }
    for role in &config.roles {
        collect_clients(&mut clients, &role.regions, &role.role_arn).await;
    }
    anyhow::ensure!(!clients.is_empty(), "no aws credentials to use");
    Ok(clients)
}

async fn collect_clients(clients: &mut Vec<EcsClient>, regions: &[String], role_arn: &str) {
    for region in regions {
        match build_client(role_arn, region).await {
            Ok(client) => {
                info!(
                    "[{}] scanning as {} ({})",
                    client.region, client.role_arn, client.account_id
                );
                clients.push(client);
            }
            Err(err) => warn!("failed to create ecs client for region {region}: {err:#}"),
        }
    }
}

async fn build_client(role_arn: &str, region: &str) -> Result<EcsClient> {
    let sdk_region = Region::new(region.to_string());
    let mut loader = aws_config::defaults(BehaviorVersion::latest()).region(sdk_region.clone());
    if !role_arn.is_empty() {
        let provider = aws_config::sts::AssumeRoleProvider::builder(role_arn)
            .region(sdk_region)
            .session_name("ecs-event-tail")
            .build()
            .await;
        loader = loader.credentials_provider(provider);
    }
    let sdk_config = loader.load().await;

    let identity = aws_sdk_sts::Client::new(&sdk_config)
        .get_caller_identity()
        .send()
        .await
        .context("resolving caller identity")?;

    Ok(EcsClient {
        api: Arc::new(AwsEcs {
            client: aws_sdk_ecs::Client::new(&sdk_config),
        }),
        account_id: identity.account().unwrap_or_default().to_string(),
        role_arn: identity.arn().unwrap_or_default().to_string(),
        region: region.to_string(),
    })
}

/// Region from the ambient AWS configuration (env, profile, IMDS), used when
/// the config file names none.
pub async fn default_region() -> Option<String> {
    let sdk_config = aws_config::defaults(BehaviorVersion::latest()).load().await;
    sdk_config.region().map(|region| region.as_ref().to_string())
}

/// [`EcsApi`] over the AWS SDK.
struct AwsEcs {
    client: aws_sdk_ecs::Client,
}

#[async_trait]
impl EcsApi for AwsEcs {
    async fn list_clusters(&self, next_token: Option<String>) -> Result<ResourcePage> {
        let output = self
            .client
            .list_clusters()
            .set_next_token(next_token)
            .send()
            .await?;
        Ok(ResourcePage {
            ids: output.cluster_arns().to_vec(),
            next_token: output.next_token().map(str::to_string),
        })
    }

    async fn describe_clusters(&self, clusters: &[String]) -> Result<DescribeOutput> {
        let output = self
            .client
            .describe_clusters()
            .set_clusters(Some(clusters.to_vec()))
            .include(ClusterField::Tags)
            .send()
            .await?;
        Ok(DescribeOutput {
            records: output
                .clusters()
                .iter()
                .filter_map(|cluster| {
                    Some(ResourceRecord {
                        name: cluster.cluster_name()?.to_string(),
                        tags: tag_map(cluster.tags()),
                    })
                })
                .collect(),
            failures: failures(output.failures()),
        })
    }

    async fn list_services(
        &self,
        cluster: &str,
        next_token: Option<String>,
    ) -> Result<ResourcePage> {
        let output = self
            .client
            .list_services()
            .cluster(cluster)
            .set_next_token(next_token)
            .send()
            .await?;
        Ok(ResourcePage {
            ids: output.service_arns().to_vec(),
            next_token: output.next_token().map(str::to_string),
        })
    }

    async fn describe_services(
        &self,
        cluster: &str,
        services: &[String],
    ) -> Result<DescribeOutput> {
        let output = self
            .client
            .describe_services()
            .cluster(cluster)
            .set_services(Some(services.to_vec()))
            .include(ServiceField::Tags)
            .send()
            .await?;
        Ok(DescribeOutput {
            records: output
                .services()
                .iter()
                .filter_map(|service| {
                    Some(ResourceRecord {
                        name: service.service_name()?.to_string(),
                        tags: tag_map(service.tags()),
                    })
                })
                .collect(),
            failures: failures(output.failures()),
        })
    }

    async fn service_events(&self, cluster: &str, service: &str) -> Result<Vec<LogEvent>> {
        let output = self
            .client
            .describe_services()
            .cluster(cluster)
            .services(service)
            .send()
            .await?;
        let mut events = Vec::new();
        for svc in output.services() {
            for event in svc.events() {
                let (Some(message), Some(created)) = (event.message(), event.created_at()) else {
                    continue;
                };
                let Some(created_at) =
                    chrono::DateTime::from_timestamp(created.secs(), created.subsec_nanos())
                else {
                    continue;
                };
                events.push(LogEvent {
                    message: message.to_string(),
                    created_at,
                });
            }
        }
        Ok(events)
    }
}

fn tag_map(tags: &[Tag]) -> TagMap {
    tags.iter()
        .filter_map(|tag| Some((tag.key()?.to_string(), tag.value()?.to_string())))
        .collect()
}

fn failures(failures: &[aws_sdk_ecs::types::Failure]) -> Vec<ResourceFailure> {
    failures
        .iter()
        .map(|failure| ResourceFailure {
            arn: failure.arn().unwrap_or_default().to_string(),
            reason: failure.reason().unwrap_or_default().to_string(),
        })
        .collect()
}
