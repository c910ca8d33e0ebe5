//! Unit-tagged values.
//!
//! A `Quantity` pairs a `Value` (scalar or time series) with a unit label.
//! Consumers ask for the shape they need; a mismatch is reported as
//! `MvsError::ShapeMismatch` instead of being coerced.

use core::fmt;

use serde::{Deserialize, Deserializer, Serialize};

use crate::{MvsError, MvsResult};

/// Shape of a `Value`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ValueKind {
    Scalar,
    Series,
}

impl fmt::Display for ValueKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ValueKind::Scalar => write!(f, "scalar"),
            ValueKind::Series => write!(f, "time series"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Value {
    Scalar(f64),
    Series(Vec<f64>),
}

impl Value {
    pub fn kind(&self) -> ValueKind {
        match self {
            Value::Scalar(_) => ValueKind::Scalar,
            Value::Series(_) => ValueKind::Series,
        }
    }

    /// Multiply every element by `factor`.
    pub fn scaled(&self, factor: f64) -> Value {
        match self {
            Value::Scalar(v) => Value::Scalar(v * factor),
            Value::Series(vs) => Value::Series(vs.iter().map(|v| v * factor).collect()),
        }
    }
}

impl From<f64> for Value {
    fn from(v: f64) -> Self {
        Value::Scalar(v)
    }
}

impl From<Vec<f64>> for Value {
    fn from(vs: Vec<f64>) -> Self {
        Value::Series(vs)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Quantity {
    pub value: Value,
    #[serde(default = "default_unit")]
    pub unit: String,
}

fn default_unit() -> String {
    crate::units::labels::NONE.to_string()
}

/// For `Option<Quantity>` fields that may be unset: a missing field, `null`
/// and `{value: null}` all read as `None`.
pub fn deserialize_unset<'de, D: Deserializer<'de>>(d: D) -> Result<Option<Quantity>, D::Error> {
    #[derive(Deserialize)]
    struct MaybeQuantity {
        value: Option<Value>,
        #[serde(default = "default_unit")]
        unit: String,
    }
    let raw = Option::<MaybeQuantity>::deserialize(d)?;
    Ok(raw.and_then(|q| q.value.map(|value| Quantity { value, unit: q.unit })))
}

/// Dimensionless zero.
impl Default for Quantity {
    fn default() -> Self {
        Self::scalar(0.0, default_unit())
    }
}

impl Quantity {
    pub fn new(value: impl Into<Value>, unit: impl Into<String>) -> Self {
        Self {
            value: value.into(),
            unit: unit.into(),
        }
    }

    pub fn scalar(value: f64, unit: impl Into<String>) -> Self {
        Self::new(Value::Scalar(value), unit)
    }

    pub fn series(values: Vec<f64>, unit: impl Into<String>) -> Self {
        Self::new(Value::Series(values), unit)
    }

    pub fn kind(&self) -> ValueKind {
        self.value.kind()
    }

    /// The scalar value, or `ShapeMismatch` naming `what`.
    pub fn as_scalar(&self, what: &str) -> MvsResult<f64> {
        match &self.value {
            Value::Scalar(v) => Ok(*v),
            Value::Series(_) => Err(MvsError::ShapeMismatch {
                what: what.to_string(),
                expected: ValueKind::Scalar,
                found: ValueKind::Series,
            }),
        }
    }

    /// The series values, or `ShapeMismatch` naming `what`.
    pub fn as_series(&self, what: &str) -> MvsResult<&[f64]> {
        match &self.value {
            Value::Series(vs) => Ok(vs),
            Value::Scalar(_) => Err(MvsError::ShapeMismatch {
                what: what.to_string(),
                expected: ValueKind::Series,
                found: ValueKind::Scalar,
            }),
        }
    }

    /// Same unit, every element multiplied by `factor`.
    pub fn scaled(&self, factor: f64) -> Quantity {
        Quantity {
            value: self.value.scaled(factor),
            unit: self.unit.clone(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn scalar_access() {
        let q = Quantity::scalar(4.0, "kW");
        assert_eq!(q.as_scalar("cap").unwrap(), 4.0);
        let err = q.as_series("cap").unwrap_err();
        assert!(matches!(
            err,
            MvsError::ShapeMismatch {
                expected: ValueKind::Series,
                found: ValueKind::Scalar,
                ..
            }
        ));
    }

    #[test]
    fn series_is_not_a_scalar() {
        let q = Quantity::series(vec![0.1, 0.2], "EUR/kWh");
        let msg = q.as_scalar("dispatch_price").unwrap_err().to_string();
        assert!(msg.contains("dispatch_price"));
        assert!(msg.contains("time series"));
    }

    #[test]
    fn scaling_keeps_shape_and_unit() {
        let q = Quantity::series(vec![1.0, 2.0], "kWh").scaled(2.0);
        assert_eq!(q.value, Value::Series(vec![2.0, 4.0]));
        assert_eq!(q.unit, "kWh");
    }

    #[test]
    fn deserializes_both_shapes() {
        let s: Quantity = serde_json::from_str(r#"{"value": 3, "unit": "year"}"#).unwrap();
        assert_eq!(s.value, Value::Scalar(3.0));
        let t: Quantity = serde_json::from_str(r#"{"value": [1, 2.5], "unit": "kW"}"#).unwrap();
        assert_eq!(t.value, Value::Series(vec![1.0, 2.5]));
        let n: Quantity = serde_json::from_str(r#"{"value": 0.5}"#).unwrap();
        assert_eq!(n.unit, "NA");
    }

    #[derive(Deserialize)]
    struct Limits {
        #[serde(default, deserialize_with = "deserialize_unset")]
        soc_initial: Option<Quantity>,
    }

    #[test]
    fn null_value_reads_as_unset() {
        let l: Limits =
            serde_json::from_str(r#"{"soc_initial": {"value": null, "unit": "factor"}}"#).unwrap();
        assert_eq!(l.soc_initial, None);
        let l: Limits = serde_json::from_str(r#"{"soc_initial": null}"#).unwrap();
        assert_eq!(l.soc_initial, None);
        let l: Limits = serde_json::from_str("{}").unwrap();
        assert_eq!(l.soc_initial, None);
        let l: Limits =
            serde_json::from_str(r#"{"soc_initial": {"value": 0.5, "unit": "factor"}}"#).unwrap();
        assert_eq!(l.soc_initial, Some(Quantity::scalar(0.5, "factor")));
    }
}
