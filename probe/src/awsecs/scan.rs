use std::collections::BTreeMap;

use common::docker::label_key;
use common::{NodeId, Report};
use tracing::debug;

use super::{CLUSTER_LABEL, TASK_ARN_LABEL, TASK_FAMILY_LABEL};

/// Lo que sabemos de una task sólo mirando labels de contenedores.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TaskLabelInfo {
    pub task_arn: String,
    pub family: String,
    /// En el orden en que se vieron
    pub container_ids: Vec<NodeId>,
}

/// cluster -> task ARN -> info
pub type ClusterMap = BTreeMap<String, BTreeMap<String, TaskLabelInfo>>;

/// Recorre todos los contenedores y agrupa los que tienen los tres labels de
/// ECS por cluster y por task. Si falta cualquiera de los tres, el contenedor
/// no es de ECS y se ignora.
pub fn scan(rpt: &Report) -> ClusterMap {
    let task_arn_key = label_key(TASK_ARN_LABEL);
    let cluster_key = label_key(CLUSTER_LABEL);
    let family_key = label_key(TASK_FAMILY_LABEL);

    let mut results = ClusterMap::new();
    let mut found = 0usize;

    for (node_id, node) in &rpt.container.nodes {
        let (Some(task_arn), Some(cluster), Some(family)) = (
            node.lookup(&task_arn_key),
            node.lookup(&cluster_key),
            node.lookup(&family_key),
        ) else {
            continue;
        };

        let task = results
            .entry(cluster.to_string())
            .or_default()
            .entry(task_arn.to_string())
            .or_insert_with(|| TaskLabelInfo {
                task_arn: task_arn.to_string(),
                family: family.to_string(),
                container_ids: Vec::new(),
            });

        task.container_ids.push(node_id.clone());
        found += 1;
    }

    debug!(
        "encontrados {} contenedores ECS en {} clusters",
        found,
        results.len()
    );
    results
}
