use std::collections::BTreeMap;

use common::ecs::{
    parse_task_definition_arn, ECS_CLUSTER, SERVICE_DESIRED_COUNT, SERVICE_RUNNING_COUNT,
    TASK_CREATED_AT, TASK_FAMILY, TASK_STARTED_BY, TASK_VERSION,
};
use common::report::{make_ecs_service_node_id, make_ecs_task_node_id, ECS_SERVICE, ECS_TASK};
use common::{EcsInfo, EcsService, EcsTask, Node, Report, Sets};
use tracing::{debug, warn};

use super::TaskLabelInfo;

/// Relaciones que este tagger es dueño de escribir en los contenedores.
const ECS_RELATIONS: [&str; 2] = [ECS_TASK, ECS_SERVICE];

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct MergeStats {
    pub services: u32,
    pub tasks: u32,
    pub tasks_skipped: u32,
    pub containers_tagged: u32,
    pub containers_missing: u32,
}

/// Mezcla en el reporte la info de un cluster: crea los nodos service y task
/// y reescribe los padres ECS de cada contenedor de esas tasks.
/// No falla: lo que falta se loguea y se salta.
pub fn merge_cluster(
    rpt: &mut Report,
    cluster: &str,
    tasks: &BTreeMap<String, TaskLabelInfo>,
    info: &EcsInfo,
) -> MergeStats {
    let mut stats = MergeStats::default();

    // Primero todos los servicios, aunque ninguna task apunte a ellos
    for (service_name, service) in &info.services {
        rpt.ecs_service
            .add_node(service_node(cluster, service_name, service));
        stats.services += 1;
    }
    debug!("creados {} nodos service ECS en {}", stats.services, cluster);

    for (task_arn, task_info) in tasks {
        let Some(task) = info.tasks.get(task_arn) else {
            // la task terminó entre la observación y el fetch: no es error
            debug!("task {} ya no existe en {}, se salta", task_arn, cluster);
            stats.tasks_skipped += 1;
            continue;
        };

        let task_id = make_ecs_task_node_id(task_arn);
        rpt.ecs_task
            .add_node(task_node(&task_id, cluster, task_info, task));
        stats.tasks += 1;

        let mut parents = Sets::new().add(ECS_TASK, [task_id]);
        if let Some(service_name) = info.task_service_map.get(task_arn) {
            parents = parents.add(
                ECS_SERVICE,
                [make_ecs_service_node_id(cluster, service_name)],
            );
        }

        for container_id in &task_info.container_ids {
            match rpt.container.get_mut(container_id) {
                Some(container) => {
                    container.replace_parents(&ECS_RELATIONS, parents.clone());
                    stats.containers_tagged += 1;
                }
                None => {
                    warn!(
                        "info de task {} para el contenedor {} que ya no existe",
                        task_arn, container_id
                    );
                    stats.containers_missing += 1;
                }
            }
        }
    }

    stats
}

/// Saca los nodos task y service cuyo cluster cumple `stale`. Devuelve
/// cuántos nodos se borraron.
pub fn prune_cluster_nodes(rpt: &mut Report, stale: impl Fn(&str) -> bool) -> usize {
    let mut removed = 0;
    for topo in [&mut rpt.ecs_task, &mut rpt.ecs_service] {
        let before = topo.len();
        topo.nodes
            .retain(|_, node| !node.lookup(ECS_CLUSTER).is_some_and(&stale));
        removed += before - topo.len();
    }
    removed
}

fn task_node(task_id: &str, cluster: &str, label_info: &TaskLabelInfo, task: &EcsTask) -> Node {
    let mut node = Node::new(task_id)
        .with_latest(ECS_CLUSTER, cluster)
        .with_latest(TASK_FAMILY, label_info.family.as_str());

    if let Some((_, version)) = parse_task_definition_arn(&task.task_definition_arn) {
        node = node.with_latest(TASK_VERSION, version);
    }
    if let Some(created_at) = task.created_at {
        node = node.with_latest(TASK_CREATED_AT, created_at.to_rfc3339());
    }
    if let Some(started_by) = &task.started_by {
        node = node.with_latest(TASK_STARTED_BY, started_by.as_str());
    }
    node
}

fn service_node(cluster: &str, service_name: &str, service: &EcsService) -> Node {
    let mut node = Node::new(make_ecs_service_node_id(cluster, service_name))
        .with_latest(ECS_CLUSTER, cluster)
        .with_latest(SERVICE_DESIRED_COUNT, service.desired_count.to_string())
        .with_latest(SERVICE_RUNNING_COUNT, service.running_count.to_string());

    if let Some((family, version)) = service
        .task_definition_arn
        .as_deref()
        .and_then(parse_task_definition_arn)
    {
        node = node
            .with_latest(TASK_FAMILY, family)
            .with_latest(TASK_VERSION, version);
    }
    node
}
