//! Tagger de AWS ECS: relaciona contenedores locales con sus tasks y
//! servicios ECS y los escribe en el reporte como padres.

mod client;
mod merge;
mod reporter;
mod scan;

pub use client::{HttpFetcher, MetadataFetcher};
pub use merge::{merge_cluster, prune_cluster_nodes};
pub use reporter::Reporter;
pub use scan::{scan, TaskLabelInfo};

/// Labels de docker que pone el agente de ECS en cada contenedor.
pub const CLUSTER_LABEL: &str = "com.amazonaws.ecs.cluster";
pub const TASK_ARN_LABEL: &str = "com.amazonaws.ecs.task-arn";
pub const TASK_FAMILY_LABEL: &str = "com.amazonaws.ecs.task-definition-family";
