//! Seam to the external optimizer.
//!
//! The optimizer sees an `EnergyGraph` and answers with one flow series per
//! edge, an optional investment scalar per edge and some meta data.

use std::collections::BTreeMap;
use std::fmt;

use serde::{Deserialize, Serialize};

use crate::graph::EnergyGraph;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EdgeKind {
    Flow,
    /// Virtual edge carrying the stored energy of a storage asset.
    Capacity,
}

/// Identifies a solver variable by the labels at both ends.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct EdgeKey {
    pub from: String,
    /// `None` for capacity edges.
    pub to: Option<String>,
    pub kind: EdgeKind,
}

impl EdgeKey {
    pub fn flow(from: impl Into<String>, to: impl Into<String>) -> Self {
        Self {
            from: from.into(),
            to: Some(to.into()),
            kind: EdgeKind::Flow,
        }
    }

    pub fn capacity(asset: impl Into<String>) -> Self {
        Self {
            from: asset.into(),
            to: None,
            kind: EdgeKind::Capacity,
        }
    }
}

impl fmt::Display for EdgeKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match (&self.to, self.kind) {
            (Some(to), EdgeKind::Flow) => write!(f, "{} -> {}", self.from, to),
            (Some(to), EdgeKind::Capacity) => write!(f, "{} -> {} (capacity)", self.from, to),
            (None, _) => write!(f, "{} -> None (capacity)", self.from),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SolveMeta {
    pub objective: f64,
    pub solve_time_s: f64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub solver: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct SolveOutput {
    pub flows: BTreeMap<EdgeKey, Vec<f64>>,
    /// Investment (added capacity) per edge. Absent for edges without
    /// capacity optimization.
    pub scalars: BTreeMap<EdgeKey, f64>,
    pub meta: SolveMeta,
}

impl SolveOutput {
    pub fn flow(&self, edge: &EdgeKey) -> Option<&[f64]> {
        self.flows.get(edge).map(Vec::as_slice)
    }

    pub fn invest(&self, edge: &EdgeKey) -> Option<f64> {
        self.scalars.get(edge).copied()
    }

    /// Flow edges of `graph` that have no series in this output.
    pub fn missing_flows(&self, graph: &EnergyGraph) -> Vec<EdgeKey> {
        graph
            .edges()
            .into_iter()
            .filter(|edge| !self.flows.contains_key(edge))
            .collect()
    }
}

/// One solver variable as stored on disk.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VariableRecord {
    pub from: String,
    #[serde(default)]
    pub to: Option<String>,
    #[serde(default = "default_kind")]
    pub kind: EdgeKind,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sequence: Option<Vec<f64>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub invest: Option<f64>,
}

fn default_kind() -> EdgeKind {
    EdgeKind::Flow
}

/// Serialized form of a `SolveOutput`: a record list keyed by edge.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SolveOutputRecord {
    pub meta: SolveMeta,
    #[serde(default)]
    pub variables: Vec<VariableRecord>,
}

impl SolveOutputRecord {
    pub fn into_output(self) -> Result<SolveOutput, SolveError> {
        let mut out = SolveOutput {
            meta: self.meta,
            ..SolveOutput::default()
        };
        for var in self.variables {
            let key = EdgeKey {
                from: var.from,
                to: var.to,
                kind: var.kind,
            };
            if let Some(seq) = var.sequence
                && out.flows.insert(key.clone(), seq).is_some()
            {
                return Err(SolveError::DuplicateVariable { edge: key });
            }
            if let Some(v) = var.invest {
                out.scalars.insert(key, v);
            }
        }
        Ok(out)
    }
}

impl From<&SolveOutput> for SolveOutputRecord {
    fn from(out: &SolveOutput) -> Self {
        let mut keys: Vec<&EdgeKey> = out.flows.keys().chain(out.scalars.keys()).collect();
        keys.sort();
        keys.dedup();
        let variables = keys
            .into_iter()
            .map(|key| VariableRecord {
                from: key.from.clone(),
                to: key.to.clone(),
                kind: key.kind,
                sequence: out.flows.get(key).cloned(),
                invest: out.scalars.get(key).copied(),
            })
            .collect();
        Self {
            meta: out.meta.clone(),
            variables,
        }
    }
}

#[derive(thiserror::Error, Debug, Clone, PartialEq)]
pub enum SolveError {
    #[error("No flow series for edge {edge}")]
    MissingFlow { edge: EdgeKey },

    #[error("Edge {edge} appears more than once in the solver output")]
    DuplicateVariable { edge: EdgeKey },

    #[error("Optimizer failed: {0}")]
    Backend(String),
}

/// Anything that can dispatch an `EnergyGraph`.
pub trait Optimizer {
    fn solve(&self, graph: &EnergyGraph) -> Result<SolveOutput, SolveError>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn record_list_roundtrip() {
        let mut out = SolveOutput::default();
        out.flows.insert(EdgeKey::flow("pv", "Electricity bus"), vec![1.0, 2.0]);
        out.scalars.insert(EdgeKey::flow("pv", "Electricity bus"), 5.0);
        out.flows.insert(EdgeKey::capacity("battery"), vec![0.0, 1.0]);
        out.meta.objective = 42.0;

        let record = SolveOutputRecord::from(&out);
        assert_eq!(record.variables.len(), 2);
        let json = serde_json::to_string(&record).unwrap();
        let back: SolveOutputRecord = serde_json::from_str(&json).unwrap();
        assert_eq!(back.into_output().unwrap(), out);
    }

    #[test]
    fn defaults_to_flow_edges() {
        let json = r#"{
            "meta": {"objective": 1.0, "solve_time_s": 0.1},
            "variables": [{"from": "Grid", "to": "Electricity bus", "sequence": [1, 2]}]
        }"#;
        let record: SolveOutputRecord = serde_json::from_str(json).unwrap();
        let out = record.into_output().unwrap();
        assert_eq!(
            out.flow(&EdgeKey::flow("Grid", "Electricity bus")),
            Some(&[1.0, 2.0][..])
        );
        assert_eq!(out.invest(&EdgeKey::flow("Grid", "Electricity bus")), None);
    }

    #[test]
    fn duplicate_sequences_are_rejected() {
        let var = VariableRecord {
            from: "a".into(),
            to: Some("b".into()),
            kind: EdgeKind::Flow,
            sequence: Some(vec![1.0]),
            invest: None,
        };
        let record = SolveOutputRecord {
            meta: SolveMeta::default(),
            variables: vec![var.clone(), var],
        };
        assert!(matches!(
            record.into_output(),
            Err(SolveError::DuplicateVariable { .. })
        ));
    }

    #[test]
    fn edge_display() {
        assert_eq!(EdgeKey::flow("a", "b").to_string(), "a -> b");
        assert_eq!(EdgeKey::capacity("bat").to_string(), "bat -> None (capacity)");
    }
}
