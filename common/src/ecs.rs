use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use crate::report::MetadataTemplate;

/* --------- Claves de metadata en nodos task / service --------- */

pub const ECS_CLUSTER: &str = "ecs_cluster";
pub const TASK_FAMILY: &str = "ecs_task_family";
pub const TASK_VERSION: &str = "ecs_task_version";
pub const TASK_CREATED_AT: &str = "ecs_task_created_at";
pub const TASK_STARTED_BY: &str = "ecs_task_started_by";
pub const SERVICE_DESIRED_COUNT: &str = "ecs_service_desired_count";
pub const SERVICE_RUNNING_COUNT: &str = "ecs_service_running_count";

pub fn task_metadata_templates() -> Vec<MetadataTemplate> {
    vec![
        MetadataTemplate::from_latest(ECS_CLUSTER, "Cluster", 0),
        MetadataTemplate::from_latest(TASK_FAMILY, "Family", 1),
        MetadataTemplate::from_latest(TASK_VERSION, "Version", 2),
        MetadataTemplate::from_latest(TASK_CREATED_AT, "Created at", 3),
        MetadataTemplate::from_latest(TASK_STARTED_BY, "Started by", 4),
    ]
}

pub fn service_metadata_templates() -> Vec<MetadataTemplate> {
    vec![
        MetadataTemplate::from_latest(ECS_CLUSTER, "Cluster", 0),
        MetadataTemplate::from_latest(TASK_FAMILY, "Family", 1),
        MetadataTemplate::from_latest(TASK_VERSION, "Version", 2),
        MetadataTemplate::from_latest(SERVICE_DESIRED_COUNT, "Desired tasks", 3),
        MetadataTemplate::from_latest(SERVICE_RUNNING_COUNT, "Running tasks", 4),
    ]
}

/* --------- Registros que devuelve el servicio de metadata --------- */

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EcsTask {
    pub task_arn: String,
    pub task_definition_arn: String,
    #[serde(default)]
    pub created_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub started_by: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EcsService {
    pub service_name: String,
    #[serde(default)]
    pub task_definition_arn: Option<String>,
    pub desired_count: u64,
    pub running_count: u64,
}

/// Respuesta de un describe: tasks vivas, servicios vivos y a qué servicio
/// pertenece cada task. Las tasks que el orquestador ya no conoce no vienen.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct EcsInfo {
    #[serde(default)]
    pub tasks: BTreeMap<String, EcsTask>,
    #[serde(default)]
    pub services: BTreeMap<String, EcsService>,
    #[serde(default)]
    pub task_service_map: BTreeMap<String, String>,
}

impl EcsInfo {
    /// Junta la respuesta de otro lote de ARNs.
    pub fn extend(&mut self, other: EcsInfo) {
        self.tasks.extend(other.tasks);
        self.services.extend(other.services);
        self.task_service_map.extend(other.task_service_map);
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DescribeRequest {
    pub task_arns: Vec<String>,
}

/// Separa "arn:aws:ecs:region:acct:task-definition/web:3" en ("web", "3").
pub fn parse_task_definition_arn(arn: &str) -> Option<(&str, &str)> {
    let name = arn.rsplit('/').next()?;
    let (family, revision) = name.rsplit_once(':')?;
    if family.is_empty() || revision.is_empty() {
        return None;
    }
    Some((family, revision))
}
