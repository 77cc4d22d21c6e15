use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

pub mod docker;
pub mod ecs;
pub mod report;

pub use docker::ContainerObservation;
pub use ecs::{DescribeRequest, EcsInfo, EcsService, EcsTask};
pub use report::{MetadataTemplate, Node, NodeId, Report, Sets, Topology};

/* --------- Estructuras de la API HTTP del probe --------- */

/// Resultado de una pasada de tagging completa.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TagSummary {
    pub pass_id: String,
    /// Clusters fetcheados y mezclados
    pub clusters: u32,
    pub services: u32,
    pub tasks: u32,
    /// Tasks observadas localmente que el orquestador ya no conoce
    pub tasks_skipped: u32,
    pub containers_tagged: u32,
    /// Contenedores que desaparecieron entre el scan y el merge
    pub containers_missing: u32,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct TagStatus {
    pub last_summary: Option<TagSummary>,
    pub last_error: Option<String>,
    pub finished_at: Option<DateTime<Utc>>,
}
