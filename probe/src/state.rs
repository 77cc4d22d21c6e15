// probe/src/state.rs

use chrono::{DateTime, Utc};
use common::{Node, Report, TagStatus, TagSummary};
use std::sync::{Arc, Mutex, MutexGuard};

use crate::tagger::Tagger;

#[derive(Clone)]
pub struct AppState {
    // reporte vivo; se copia para cada pasada y se publica al terminar
    pub report: Arc<Mutex<Report>>,
    pub tagger: Arc<dyn Tagger>,
    pub status: Arc<Mutex<TagStatus>>,
    // se toma durante toda una pasada: nunca corren dos a la vez
    pub pass_lock: Arc<tokio::sync::Mutex<()>>,
}

/// Un lock envenenado sólo significa que otro hilo paniqueó con el lock
/// tomado; los datos siguen siendo usables.
fn lock<T>(m: &Mutex<T>) -> MutexGuard<'_, T> {
    m.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}

impl AppState {
    pub fn new(tagger: Arc<dyn Tagger>) -> Self {
        Self {
            report: Arc::new(Mutex::new(Report::new())),
            tagger,
            status: Arc::new(Mutex::new(TagStatus::default())),
            pass_lock: Arc::new(tokio::sync::Mutex::new(())),
        }
    }

    pub fn report_snapshot(&self) -> Report {
        lock(&self.report).clone()
    }

    pub fn publish(&self, tagged: Report) {
        lock(&self.report).adopt_tags(tagged);
    }

    /// Inserta o actualiza un contenedor. Si ya existía se reemplazan sus
    /// atributos pero se conservan los padres de la última pasada.
    pub fn upsert_container(&self, node: Node) -> Node {
        let mut report = lock(&self.report);
        let parents = report
            .container
            .get(&node.id)
            .map(|existing| existing.parents.clone())
            .unwrap_or_default();

        let node = Node { parents, ..node };
        report.container.nodes.insert(node.id.clone(), node.clone());
        node
    }

    pub fn remove_container(&self, id: &str) -> Option<Node> {
        lock(&self.report).container.nodes.remove(id)
    }

    pub fn record_status(
        &self,
        summary: Option<TagSummary>,
        error: Option<String>,
        finished_at: DateTime<Utc>,
    ) {
        let mut status = lock(&self.status);
        // el último resumen bueno se conserva aunque la pasada falle
        if summary.is_some() {
            status.last_summary = summary;
        }
        status.last_error = error;
        status.finished_at = Some(finished_at);
    }

    pub fn status(&self) -> TagStatus {
        lock(&self.status).clone()
    }
}
