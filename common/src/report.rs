use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};

use crate::ecs::{service_metadata_templates, task_metadata_templates};

pub type NodeId = String;

/// Nombres de las topologías del reporte. También se usan como nombre de
/// relación en los parent sets de los contenedores.
pub const CONTAINER: &str = "container";
pub const ECS_TASK: &str = "ecs_task";
pub const ECS_SERVICE: &str = "ecs_service";

/* --------- Identidad de nodos ECS --------- */

/// ID determinístico de un nodo task. El ARN ya es único globalmente.
pub fn make_ecs_task_node_id(task_arn: &str) -> NodeId {
    format!("{};<{}>", task_arn, ECS_TASK)
}

/// ID determinístico de un nodo service. El nombre sólo es único dentro del
/// cluster, así que el cluster forma parte del ID.
pub fn make_ecs_service_node_id(cluster: &str, service_name: &str) -> NodeId {
    format!("{};{};<{}>", cluster, service_name, ECS_SERVICE)
}

/* --------- Parent sets --------- */

/// Relación -> conjunto de IDs de padres.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Sets(BTreeMap<String, BTreeSet<NodeId>>);

impl Sets {
    pub fn new() -> Self {
        Self::default()
    }

    /// Agrega los IDs a la relación (unión si ya existía).
    pub fn add<I>(mut self, relation: &str, ids: I) -> Self
    where
        I: IntoIterator<Item = NodeId>,
    {
        self.0.entry(relation.to_string()).or_default().extend(ids);
        self
    }

    pub fn lookup(&self, relation: &str) -> Option<&BTreeSet<NodeId>> {
        self.0.get(relation)
    }

    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.0.keys().map(String::as_str)
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Unión relación por relación.
    pub fn merge(&mut self, other: &Sets) {
        for (relation, ids) in &other.0 {
            self.0
                .entry(relation.clone())
                .or_default()
                .extend(ids.iter().cloned());
        }
    }

    fn remove(&mut self, relation: &str) {
        self.0.remove(relation);
    }

    fn insert(&mut self, relation: String, ids: BTreeSet<NodeId>) {
        self.0.insert(relation, ids);
    }
}

/* --------- Nodos y topologías --------- */

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Node {
    pub id: NodeId,
    /// Atributos del nodo (labels de docker, metadata ECS, ...)
    pub latest: BTreeMap<String, String>,
    pub parents: Sets,
}

impl Node {
    pub fn new(id: impl Into<NodeId>) -> Self {
        Self {
            id: id.into(),
            ..Self::default()
        }
    }

    pub fn with_latest(mut self, key: &str, value: impl Into<String>) -> Self {
        self.latest.insert(key.to_string(), value.into());
        self
    }

    pub fn lookup(&self, key: &str) -> Option<&str> {
        self.latest.get(key).map(String::as_str)
    }

    /// Reemplaza completas las relaciones listadas en `relations` por las de
    /// `parents`. Las demás relaciones del nodo quedan intactas.
    pub fn replace_parents(&mut self, relations: &[&str], parents: Sets) {
        for relation in relations {
            self.parents.remove(relation);
        }
        for (relation, ids) in parents.0 {
            self.parents.insert(relation, ids);
        }
    }

    /// Mezcla otro nodo con el mismo ID: los valores entrantes pisan a los
    /// existentes y los padres se unen.
    pub fn merge(&mut self, other: Node) {
        self.latest.extend(other.latest);
        self.parents.merge(&other.parents);
    }
}

/// Cómo mostrar un campo de `latest` en la UI.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MetadataTemplate {
    pub id: String,
    pub label: String,
    pub from: String,
    pub priority: u32,
}

impl MetadataTemplate {
    pub fn from_latest(id: &str, label: &str, priority: u32) -> Self {
        Self {
            id: id.to_string(),
            label: label.to_string(),
            from: "latest".to_string(),
            priority,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Topology {
    pub label: String,
    pub label_plural: String,
    pub metadata_templates: Vec<MetadataTemplate>,
    pub nodes: BTreeMap<NodeId, Node>,
}

impl Topology {
    pub fn new(label: &str, label_plural: &str) -> Self {
        Self {
            label: label.to_string(),
            label_plural: label_plural.to_string(),
            ..Self::default()
        }
    }

    pub fn with_metadata_templates(mut self, templates: Vec<MetadataTemplate>) -> Self {
        self.metadata_templates = templates;
        self
    }

    /// Inserta el nodo, o lo mezcla con el existente. Agregar dos veces el
    /// mismo nodo deja la topología igual.
    pub fn add_node(&mut self, node: Node) {
        match self.nodes.get_mut(&node.id) {
            Some(existing) => existing.merge(node),
            None => {
                self.nodes.insert(node.id.clone(), node);
            }
        }
    }

    pub fn get(&self, id: &str) -> Option<&Node> {
        self.nodes.get(id)
    }

    pub fn get_mut(&mut self, id: &str) -> Option<&mut Node> {
        self.nodes.get_mut(id)
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }
}

/* --------- Reporte completo --------- */

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Report {
    pub container: Topology,
    pub ecs_task: Topology,
    pub ecs_service: Topology,
}

impl Default for Report {
    fn default() -> Self {
        Self::new()
    }
}

impl Report {
    pub fn new() -> Self {
        Self {
            container: Topology::new("container", "containers"),
            ecs_task: Topology::new("task", "tasks")
                .with_metadata_templates(task_metadata_templates()),
            ecs_service: Topology::new("service", "services")
                .with_metadata_templates(service_metadata_templates()),
        }
    }

    pub fn topology(&self, name: &str) -> Option<&Topology> {
        match name {
            CONTAINER => Some(&self.container),
            ECS_TASK => Some(&self.ecs_task),
            ECS_SERVICE => Some(&self.ecs_service),
            _ => None,
        }
    }

    /// Publica sobre este reporte (el vivo) el resultado de una pasada de
    /// tagging hecha sobre una copia. Las topologías ECS se reemplazan; de los
    /// contenedores sólo se copian los padres, y sólo de los que siguen vivos.
    /// Lo observado mientras corría la pasada no se pierde.
    pub fn adopt_tags(&mut self, tagged: Report) {
        let Report {
            container,
            ecs_task,
            ecs_service,
        } = tagged;

        self.ecs_task = ecs_task;
        self.ecs_service = ecs_service;

        for (id, node) in self.container.nodes.iter_mut() {
            if let Some(tagged_node) = container.nodes.get(id) {
                node.parents = tagged_node.parents.clone();
            }
        }
    }
}
