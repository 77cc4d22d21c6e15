use common::{Report, TagSummary};
use tracing::{debug, info, info_span};
use uuid::Uuid;

use super::{merge_cluster, prune_cluster_nodes, scan, MetadataFetcher};
use crate::error::TagError;
use crate::tagger::Tagger;

/// Tagger de ECS: scan -> por cluster (fetch -> merge).
pub struct Reporter<F> {
    fetcher: F,
}

impl<F: MetadataFetcher> Reporter<F> {
    pub fn new(fetcher: F) -> Self {
        Self { fetcher }
    }
}

impl<F: MetadataFetcher> Tagger for Reporter<F> {
    fn name(&self) -> &'static str {
        "awsecs"
    }

    /// Los clusters se procesan de a uno. Si el fetch de un cluster falla se
    /// corta la pasada: lo ya mezclado de clusters anteriores queda en `rpt`.
    ///
    /// Los nodos ECS se rederivan: los de un cluster se borran recién cuando
    /// su fetch respondió, así un cluster no alcanzado conserva los suyos.
    /// Los de clusters sin contenedores observados se borran al empezar.
    fn tag(&self, rpt: &mut Report) -> Result<TagSummary, TagError> {
        let pass_id = Uuid::new_v4().to_string();
        let span = info_span!("tag", tagger = self.name(), pass_id = %pass_id);
        let _guard = span.enter();

        let cluster_map = scan(rpt);
        let pruned = prune_cluster_nodes(rpt, |cluster| !cluster_map.contains_key(cluster));
        if pruned > 0 {
            debug!("{} nodos ECS de clusters sin contenedores borrados", pruned);
        }

        let mut summary = TagSummary {
            pass_id,
            ..TagSummary::default()
        };

        for (cluster, task_map) in &cluster_map {
            debug!(
                "pidiendo info ECS del cluster {} con {} tasks",
                cluster,
                task_map.len()
            );

            let task_arns: Vec<String> = task_map.keys().cloned().collect();
            let ecs_info = self
                .fetcher
                .fetch_info(cluster, &task_arns)
                .map_err(|source| TagError::Fetch {
                    cluster: cluster.clone(),
                    source,
                })?;

            prune_cluster_nodes(rpt, |c| c == cluster.as_str());
            let stats = merge_cluster(rpt, cluster, task_map, &ecs_info);

            summary.clusters += 1;
            summary.services += stats.services;
            summary.tasks += stats.tasks;
            summary.tasks_skipped += stats.tasks_skipped;
            summary.containers_tagged += stats.containers_tagged;
            summary.containers_missing += stats.containers_missing;
        }

        info!(
            "pasada terminada: {} clusters, {} tasks, {} servicios, {} contenedores",
            summary.clusters, summary.tasks, summary.services, summary.containers_tagged
        );
        Ok(summary)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::awsecs::{CLUSTER_LABEL, TASK_ARN_LABEL, TASK_FAMILY_LABEL};
    use crate::error::FetchError;
    use common::docker::label_key;
    use common::ecs::TASK_FAMILY;
    use common::report::{make_ecs_service_node_id, make_ecs_task_node_id, ECS_SERVICE, ECS_TASK};
    use common::{EcsInfo, EcsService, EcsTask, Node, Sets};
    use std::collections::{BTreeMap, BTreeSet};
    use std::sync::{Arc, Mutex};

    /// Fetcher falso: responde por cluster y anota las llamadas.
    #[derive(Default)]
    struct FakeFetcher {
        responses: BTreeMap<String, EcsInfo>,
        failing: BTreeSet<String>,
        calls: Mutex<Vec<(String, Vec<String>)>>,
    }

    impl FakeFetcher {
        fn with(mut self, cluster: &str, info: EcsInfo) -> Self {
            self.responses.insert(cluster.to_string(), info);
            self
        }

        fn failing(mut self, cluster: &str) -> Self {
            self.failing.insert(cluster.to_string());
            self
        }

        fn called_clusters(&self) -> Vec<String> {
            self.calls
                .lock()
                .unwrap()
                .iter()
                .map(|(c, _)| c.clone())
                .collect()
        }
    }

    impl MetadataFetcher for FakeFetcher {
        fn fetch_info(&self, cluster: &str, task_arns: &[String]) -> Result<EcsInfo, FetchError> {
            self.calls
                .lock()
                .unwrap()
                .push((cluster.to_string(), task_arns.to_vec()));
            if self.failing.contains(cluster) {
                return Err(FetchError::Status {
                    cluster: cluster.to_string(),
                    status: 503,
                });
            }
            Ok(self.responses.get(cluster).cloned().unwrap_or_default())
        }
    }

    fn ecs_container(id: &str, cluster: &str, task_arn: &str, family: &str) -> Node {
        Node::new(id)
            .with_latest(&label_key(CLUSTER_LABEL), cluster)
            .with_latest(&label_key(TASK_ARN_LABEL), task_arn)
            .with_latest(&label_key(TASK_FAMILY_LABEL), family)
    }

    fn live(tasks: &[&str], services: &[(&str, &str)]) -> EcsInfo {
        let mut info = EcsInfo::default();
        for arn in tasks {
            info.tasks.insert(
                arn.to_string(),
                EcsTask {
                    task_arn: arn.to_string(),
                    task_definition_arn: "task-definition/web:1".into(),
                    created_at: None,
                    started_by: None,
                },
            );
        }
        for (arn, service) in services {
            info.services.insert(
                service.to_string(),
                EcsService {
                    service_name: service.to_string(),
                    task_definition_arn: None,
                    desired_count: 1,
                    running_count: 1,
                },
            );
            info.task_service_map
                .insert(arn.to_string(), service.to_string());
        }
        info
    }

    fn set(id: String) -> BTreeSet<String> {
        BTreeSet::from([id])
    }

    #[test]
    fn single_container_gets_task_and_service_parents() {
        let mut rpt = Report::new();
        rpt.container.add_node(ecs_container("c1", "prod", "t1", "web"));
        let reporter = Reporter::new(
            FakeFetcher::default().with("prod", live(&["t1"], &[("t1", "svc")])),
        );

        let summary = reporter.tag(&mut rpt).unwrap();

        let task_id = make_ecs_task_node_id("t1");
        let service_id = make_ecs_service_node_id("prod", "svc");
        assert_eq!(
            rpt.ecs_task.get(&task_id).unwrap().lookup(TASK_FAMILY),
            Some("web")
        );
        assert!(rpt.ecs_service.get(&service_id).is_some());

        let expected = Sets::new()
            .add(ECS_TASK, [task_id])
            .add(ECS_SERVICE, [service_id]);
        assert_eq!(rpt.container.get("c1").unwrap().parents, expected);

        assert_eq!(summary.clusters, 1);
        assert_eq!(summary.tasks, 1);
        assert_eq!(summary.services, 1);
        assert_eq!(summary.containers_tagged, 1);
        assert!(!summary.pass_id.is_empty());
    }

    #[test]
    fn tagging_twice_gives_the_same_report() {
        let mut rpt = Report::new();
        rpt.container.add_node(ecs_container("c1", "prod", "t1", "web"));
        rpt.container.add_node(ecs_container("c2", "prod", "t1", "web"));
        rpt.container.add_node(ecs_container("c3", "prod", "t2", "batch"));
        rpt.container.add_node(Node::new("plain"));
        let reporter = Reporter::new(
            FakeFetcher::default().with("prod", live(&["t1", "t2"], &[("t1", "svc")])),
        );

        reporter.tag(&mut rpt).unwrap();
        let first = rpt.clone();
        reporter.tag(&mut rpt).unwrap();

        assert_eq!(rpt, first);
    }

    #[test]
    fn unlabelled_container_is_left_untouched() {
        let mut rpt = Report::new();
        let mut plain = Node::new("plain").with_latest(&label_key(CLUSTER_LABEL), "prod");
        plain.parents = Sets::new().add("host", ["h1".to_string()]);
        rpt.container.add_node(plain.clone());
        rpt.container.add_node(ecs_container("c1", "prod", "t1", "web"));
        let reporter = Reporter::new(FakeFetcher::default().with("prod", live(&["t1"], &[])));

        reporter.tag(&mut rpt).unwrap();

        assert_eq!(rpt.container.get("plain").unwrap(), &plain);
    }

    #[test]
    fn fetch_receives_the_cluster_task_arns() {
        let mut rpt = Report::new();
        rpt.container.add_node(ecs_container("c1", "prod", "t2", "web"));
        rpt.container.add_node(ecs_container("c2", "prod", "t1", "web"));
        rpt.container.add_node(ecs_container("c3", "prod", "t1", "web"));
        let fetcher = Arc::new(FakeFetcher::default());
        let reporter = Reporter::new(fetcher.clone());

        reporter.tag(&mut rpt).unwrap();

        let calls = fetcher.calls.lock().unwrap();
        assert_eq!(
            *calls,
            vec![("prod".to_string(), vec!["t1".to_string(), "t2".to_string()])]
        );
    }

    #[test]
    fn dead_task_is_not_created_and_parents_stay() {
        let mut rpt = Report::new();
        let mut c1 = ecs_container("c1", "prod", "t1", "web");
        c1.parents = Sets::new().add(ECS_TASK, [make_ecs_task_node_id("t1")]);
        rpt.container.add_node(c1);
        let reporter = Reporter::new(FakeFetcher::default().with("prod", live(&[], &[])));

        let summary = reporter.tag(&mut rpt).unwrap();

        assert!(rpt.ecs_task.is_empty());
        assert_eq!(
            rpt.container.get("c1").unwrap().parents.lookup(ECS_TASK),
            Some(&set(make_ecs_task_node_id("t1")))
        );
        assert_eq!(summary.tasks_skipped, 1);
    }

    #[test]
    fn failing_cluster_aborts_but_keeps_earlier_clusters() {
        let mut rpt = Report::new();
        rpt.container.add_node(ecs_container("a1", "a-prod", "ta", "web"));
        rpt.container.add_node(ecs_container("b1", "b-prod", "tb", "web"));
        rpt.container.add_node(ecs_container("c1", "c-prod", "tc", "web"));
        let fetcher = Arc::new(
            FakeFetcher::default()
                .with("a-prod", live(&["ta"], &[("ta", "svc-a")]))
                .failing("b-prod")
                .with("c-prod", live(&["tc"], &[])),
        );
        let reporter = Reporter::new(fetcher.clone());

        let err = reporter.tag(&mut rpt).unwrap_err();

        assert_eq!(err.cluster(), Some("b-prod"));
        // a-prod quedó mezclado
        assert!(rpt.ecs_task.get(&make_ecs_task_node_id("ta")).is_some());
        assert!(rpt
            .ecs_service
            .get(&make_ecs_service_node_id("a-prod", "svc-a"))
            .is_some());
        assert_eq!(
            rpt.container.get("a1").unwrap().parents.lookup(ECS_TASK),
            Some(&set(make_ecs_task_node_id("ta")))
        );
        // nada de b-prod ni de c-prod
        assert!(rpt.ecs_task.get(&make_ecs_task_node_id("tb")).is_none());
        assert!(rpt.ecs_task.get(&make_ecs_task_node_id("tc")).is_none());
        assert!(rpt.container.get("b1").unwrap().parents.is_empty());
        assert!(rpt.container.get("c1").unwrap().parents.is_empty());
        // c-prod ni siquiera se pidió
        assert_eq!(fetcher.called_clusters(), vec!["a-prod", "b-prod"]);
    }

    #[test]
    fn task_no_longer_observed_disappears_on_next_pass() {
        let mut rpt = Report::new();
        rpt.container.add_node(ecs_container("c1", "prod", "t1", "web"));
        let reporter = Reporter::new(
            FakeFetcher::default().with("prod", live(&["t1", "t2"], &[("t1", "svc")])),
        );
        reporter.tag(&mut rpt).unwrap();
        assert!(rpt.ecs_task.get(&make_ecs_task_node_id("t1")).is_some());

        // c1 se reinicia dentro de otra task, sin servicio
        rpt.container.nodes.remove("c1");
        rpt.container.add_node(ecs_container("c1", "prod", "t2", "web"));
        let reporter = Reporter::new(FakeFetcher::default().with("prod", live(&["t2"], &[])));
        reporter.tag(&mut rpt).unwrap();

        let task_ids: Vec<&String> = rpt.ecs_task.nodes.keys().collect();
        assert_eq!(task_ids, vec![&make_ecs_task_node_id("t2")]);
        assert!(rpt.ecs_service.is_empty());
    }

    #[test]
    fn cluster_without_containers_loses_its_nodes() {
        let mut rpt = Report::new();
        rpt.container.add_node(ecs_container("c1", "prod", "t1", "web"));
        let fetcher = Arc::new(FakeFetcher::default().with("prod", live(&["t1"], &[("t1", "svc")])));
        let reporter = Reporter::new(fetcher.clone());
        reporter.tag(&mut rpt).unwrap();

        rpt.container.nodes.remove("c1");
        reporter.tag(&mut rpt).unwrap();

        assert!(rpt.ecs_task.is_empty());
        assert!(rpt.ecs_service.is_empty());
        // el segundo pase no necesitó pedir nada
        assert_eq!(fetcher.called_clusters(), vec!["prod"]);
    }

    #[test]
    fn failing_cluster_keeps_its_previous_nodes() {
        let mut rpt = Report::new();
        rpt.container.add_node(ecs_container("b1", "b-prod", "tb", "web"));
        Reporter::new(FakeFetcher::default().with("b-prod", live(&["tb"], &[])))
            .tag(&mut rpt)
            .unwrap();

        let err = Reporter::new(FakeFetcher::default().failing("b-prod"))
            .tag(&mut rpt)
            .unwrap_err();

        assert_eq!(err.cluster(), Some("b-prod"));
        assert!(rpt.ecs_task.get(&make_ecs_task_node_id("tb")).is_some());
        assert_eq!(
            rpt.container.get("b1").unwrap().parents.lookup(ECS_TASK),
            Some(&set(make_ecs_task_node_id("tb")))
        );
    }

    #[test]
    fn report_without_ecs_containers_does_not_fetch() {
        let mut rpt = Report::new();
        rpt.container.add_node(Node::new("plain"));
        let fetcher = Arc::new(FakeFetcher::default());
        let reporter = Reporter::new(fetcher.clone());

        let summary = reporter.tag(&mut rpt).unwrap();

        assert_eq!(summary.clusters, 0);
        assert!(fetcher.called_clusters().is_empty());
    }
}
