//! Node health.

use clusterlint_core::{Check, CheckError, Diagnostic, Kind, Objects, Severity};
use k8s_openapi::api::core::v1::Node;

use crate::group;

/// Flags nodes that do not report `Ready`.
pub struct NodeNotReady;

impl NodeNotReady {
    fn is_ready(node: &Node) -> bool {
        node.status
            .as_ref()
            .and_then(|s| s.conditions.as_ref())
            .and_then(|conditions| conditions.iter().find(|c| c.type_ == "Ready"))
            .is_some_and(|c| c.status == "True")
    }
}

impl Check for NodeNotReady {
    fn name(&self) -> &str {
        "node-not-ready"
    }

    fn groups(&self) -> &[&str] {
        &[group::NODES]
    }

    fn description(&self) -> &str {
        "Checks for nodes that are not in the Ready state"
    }

    fn run(&self, objects: &Objects) -> Result<Vec<Diagnostic>, CheckError> {
        let diagnostics = objects
            .nodes
            .iter()
            .filter(|node| !Self::is_ready(node))
            .map(|node| {
                Diagnostic::new(
                    self.name(),
                    Severity::Warning,
                    Kind::Node,
                    &node.metadata,
                    "Node is not in Ready state",
                )
            })
            .collect();
        Ok(diagnostics)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::util::fixtures::meta;
    use k8s_openapi::api::core::v1::{NodeCondition, NodeStatus};

    fn node(name: &str, ready: Option<&str>) -> Node {
        let conditions = ready.map(|status| {
            vec![
                NodeCondition {
                    type_: "MemoryPressure".to_string(),
                    status: "False".to_string(),
                    ..Default::default()
                },
                NodeCondition {
                    type_: "Ready".to_string(),
                    status: status.to_string(),
                    ..Default::default()
                },
            ]
        });
        Node {
            metadata: meta(name, ""),
            status: Some(NodeStatus {
                conditions,
                ..Default::default()
            }),
            ..Default::default()
        }
    }

    #[test]
    fn only_ready_nodes_pass() {
        let objects = Objects {
            nodes: vec![
                node("worker-1", Some("True")),
                node("worker-2", Some("False")),
                node("worker-3", Some("Unknown")),
                node("worker-4", None),
            ],
            ..Default::default()
        };

        let diagnostics = NodeNotReady.run(&objects).unwrap();
        let names: Vec<_> = diagnostics.iter().map(|d| d.object.name.as_str()).collect();
        assert_eq!(names, vec!["worker-2", "worker-3", "worker-4"]);
        assert!(diagnostics.iter().all(|d| d.object.namespace.is_none()));
    }
}
