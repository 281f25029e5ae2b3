use std::collections::BTreeMap;

/// Tag set attached to an ECS cluster or service.
pub type TagMap = BTreeMap<String, String>;

/// Disjunction of conjunctive tag rules: a resource matches if every
/// key/value pair of at least one rule set is present in its tags.
pub type TagFilters = Vec<TagMap>;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EcsService {
    pub name: String,
    pub tags: TagMap,
}

/// One deployment event as reported by the service description.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LogEvent {
    pub message: String,
    pub created_at: chrono::DateTime<chrono::Utc>,
}

/// All new events for one service in one scan cycle, labeled with the
/// account/region/cluster it was discovered in.
#[derive(Debug, Clone)]
pub struct LogBatch {
    pub account_id: String,
    pub role_arn: String,
    pub region: String,
    pub cluster: String,
    pub service: EcsService,
    pub events: Vec<LogEvent>,
}
