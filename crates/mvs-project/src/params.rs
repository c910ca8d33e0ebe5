//! Untyped parameter tree of a project document.
//!
//! The validator walks this tree rather than the typed model so that it can
//! report on every field of the file, including fields the typed model does
//! not know about.

use indexmap::IndexMap;
use mvs_core::Quantity;
use serde_json::Value as JsonValue;

use crate::{ProjectError, ProjectResult};

#[derive(Debug, Clone, PartialEq)]
pub enum ParamValue {
    Unset,
    Bool(bool),
    Int(i64),
    Number(f64),
    Text(String),
    Series(Vec<f64>),
    /// Non-numeric list, kept element by element.
    List(Vec<ParamValue>),
    Quantity {
        value: Box<ParamValue>,
        unit: Option<String>,
    },
}

impl ParamValue {
    /// Strip a `Quantity` wrapper.
    pub fn inner(&self) -> &ParamValue {
        match self {
            ParamValue::Quantity { value, .. } => value.inner(),
            other => other,
        }
    }

    pub fn unit(&self) -> Option<&str> {
        match self {
            ParamValue::Quantity { unit, .. } => unit.as_deref(),
            _ => None,
        }
    }

    pub fn as_f64(&self) -> Option<f64> {
        match self.inner() {
            ParamValue::Int(v) => Some(*v as f64),
            ParamValue::Number(v) => Some(*v),
            _ => None,
        }
    }

    /// Numeric leaves as a core `Quantity`.
    pub fn to_quantity(&self) -> Option<Quantity> {
        let unit = self.unit().unwrap_or(mvs_core::labels::NONE).to_string();
        match self.inner() {
            ParamValue::Series(vs) => Some(Quantity::series(vs.clone(), unit)),
            other => other.as_f64().map(|v| Quantity::scalar(v, unit)),
        }
    }

    pub fn type_name(&self) -> &'static str {
        match self.inner() {
            ParamValue::Unset => "unset",
            ParamValue::Bool(_) => "boolean",
            ParamValue::Int(_) => "integer",
            ParamValue::Number(_) => "number",
            ParamValue::Text(_) => "string",
            ParamValue::Series(_) => "time series",
            ParamValue::List(_) => "list",
            ParamValue::Quantity { .. } => "quantity",
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum ParamNode {
    Leaf(ParamValue),
    Group(IndexMap<String, ParamNode>),
}

impl ParamNode {
    pub fn as_leaf(&self) -> Option<&ParamValue> {
        match self {
            ParamNode::Leaf(v) => Some(v),
            ParamNode::Group(_) => None,
        }
    }

    pub fn children(&self) -> Option<&IndexMap<String, ParamNode>> {
        match self {
            ParamNode::Group(children) => Some(children),
            ParamNode::Leaf(_) => None,
        }
    }
}

/// Ordered tree of every parameter in a project document.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ParameterStore {
    root: IndexMap<String, ParamNode>,
}

impl ParameterStore {
    /// Build from a parsed document. The top level must be a mapping.
    pub fn from_json(doc: &JsonValue) -> ProjectResult<Self> {
        let JsonValue::Object(map) = doc else {
            return Err(ProjectError::Serialization(
                "project document must be a mapping at the top level".to_string(),
            ));
        };
        let root = map
            .iter()
            .map(|(k, v)| (k.clone(), node_from_json(v)))
            .collect();
        Ok(Self { root })
    }

    pub fn get(&self, path: &[&str]) -> Option<&ParamNode> {
        let (first, rest) = path.split_first()?;
        let mut node = self.root.get(*first)?;
        for key in rest {
            node = node.children()?.get(*key)?;
        }
        Some(node)
    }

    /// Leaf value at `path`, if the path ends on a leaf.
    pub fn value(&self, path: &[&str]) -> Option<&ParamValue> {
        self.get(path).and_then(ParamNode::as_leaf)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &ParamNode)> {
        self.root.iter().map(|(k, v)| (k.as_str(), v))
    }

    pub fn len(&self) -> usize {
        self.root.len()
    }

    pub fn is_empty(&self) -> bool {
        self.root.is_empty()
    }
}

fn node_from_json(value: &JsonValue) -> ParamNode {
    match value {
        JsonValue::Object(map) if is_quantity(map) => {
            let unit = map.get("unit").and_then(JsonValue::as_str).map(String::from);
            let inner = map
                .get("value")
                .map(value_from_json)
                .unwrap_or(ParamValue::Unset);
            ParamNode::Leaf(ParamValue::Quantity {
                value: Box::new(inner),
                unit,
            })
        }
        JsonValue::Object(map) => ParamNode::Group(
            map.iter()
                .map(|(k, v)| (k.clone(), node_from_json(v)))
                .collect(),
        ),
        other => ParamNode::Leaf(value_from_json(other)),
    }
}

/// `{value, unit}` with nothing else, and a value that is not itself a
/// mapping.
fn is_quantity(map: &serde_json::Map<String, JsonValue>) -> bool {
    matches!(map.get("value"), Some(v) if !v.is_object())
        && map.keys().all(|k| k == "value" || k == "unit")
}

fn value_from_json(value: &JsonValue) -> ParamValue {
    match value {
        JsonValue::Null => ParamValue::Unset,
        JsonValue::Bool(b) => ParamValue::Bool(*b),
        JsonValue::Number(n) => match n.as_i64() {
            Some(i) => ParamValue::Int(i),
            None => ParamValue::Number(n.as_f64().unwrap_or(f64::NAN)),
        },
        JsonValue::String(s) => ParamValue::Text(s.clone()),
        JsonValue::Array(items) => {
            let numbers: Option<Vec<f64>> = items.iter().map(JsonValue::as_f64).collect();
            match numbers {
                Some(vs) if !items.is_empty() => ParamValue::Series(vs),
                _ => ParamValue::List(items.iter().map(value_from_json).collect()),
            }
        }
        JsonValue::Object(_) => ParamValue::Text(value.to_string()),
    }
}
