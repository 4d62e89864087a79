use std::fmt;

use serde::{Deserialize, Serialize};

/// Identificador jerárquico de un nodo del plan.
///
/// Invariante: único dentro del árbol de un build y estable durante toda su
/// vida. Los sub-planes de across se identifican como
/// `<padre>/<substep>/<nodo>`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct PlanId(String);

impl PlanId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// ID del nodo `node` dentro del substep `substep` de este plan.
    pub fn substep_node(&self, substep: usize, node: usize) -> PlanId {
        PlanId(format!("{}/{}/{}", self.0, substep, node))
    }
}

impl fmt::Display for PlanId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for PlanId {
    fn from(value: &str) -> Self {
        Self::new(value)
    }
}

impl From<String> for PlanId {
    fn from(value: String) -> Self {
        Self(value)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn substep_node_is_hierarchical() {
        let id = PlanId::new("a1");
        assert_eq!(id.substep_node(2, 0).as_str(), "a1/2/0");
        assert_eq!(id.substep_node(2, 0).substep_node(0, 3).as_str(), "a1/2/0/0/3");
    }

    #[test]
    fn serializes_as_plain_string() {
        let json = serde_json::to_string(&PlanId::new("7/1/0")).unwrap();
        assert_eq!(json, "\"7/1/0\"");
    }
}
