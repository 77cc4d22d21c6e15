use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use crate::report::{Node, NodeId};

/// Prefijo con el que se guardan los labels de docker en `latest`.
pub const LABEL_PREFIX: &str = "docker_label_";

pub fn label_key(label: &str) -> String {
    format!("{}{}", LABEL_PREFIX, label)
}

/// Lo que un observador reporta de un contenedor local.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ContainerObservation {
    pub id: NodeId,
    #[serde(default)]
    pub labels: BTreeMap<String, String>,
}

impl ContainerObservation {
    /// Nodo container sin padres, con los labels ya prefijados.
    pub fn to_node(&self) -> Node {
        let mut node = Node::new(self.id.clone());
        for (label, value) in &self.labels {
            node.latest.insert(label_key(label), value.clone());
        }
        node
    }
}
