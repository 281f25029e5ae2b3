use std::sync::Arc;

use anyhow::Result;
use async_trait::async_trait;

use crate::types::{LogEvent, TagMap};

/// One page of a token-driven listing call.
#[derive(Debug, Default, Clone)]
pub struct ResourcePage {
    pub ids: Vec<String>,
    pub next_token: Option<String>,
}

/// Identity plus tags for a described cluster or service.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResourceRecord {
    pub name: String,
    pub tags: TagMap,
}

/// Per-resource failure reported inside an otherwise successful
/// description response.
#[derive(Debug, Clone)]
pub struct ResourceFailure {
    pub arn: String,
    pub reason: String,
}

#[derive(Debug, Default, Clone)]
pub struct DescribeOutput {
    pub records: Vec<ResourceRecord>,
    pub failures: Vec<ResourceFailure>,
}

/// The ECS API surface the scanner needs. The AWS SDK implementation lives
/// in `crate::aws`; tests substitute their own.
#[async_trait]
pub trait EcsApi: Send + Sync {
    async fn list_clusters(&self, next_token: Option<String>) -> Result<ResourcePage>;

    async fn describe_clusters(&self, clusters: &[String]) -> Result<DescribeOutput>;

    async fn list_services(
        &self,
        cluster: &str,
        next_token: Option<String>,
    ) -> Result<ResourcePage>;

    async fn describe_services(
        &self,
        cluster: &str,
        services: &[String],
    ) -> Result<DescribeOutput>;

    /// Recent deployment events for one service, unfiltered.
    async fn service_events(&self, cluster: &str, service: &str) -> Result<Vec<LogEvent>>;
}

/// A ready-to-use API handle bound to one account/role/region, shared
/// read-only across all branches of a scan cycle.
#[derive(Clone)]
pub struct EcsClient {
    pub api: Arc<dyn EcsApi>,
    pub account_id: String,
    pub role_arn: String,
    pub region: String,
}
