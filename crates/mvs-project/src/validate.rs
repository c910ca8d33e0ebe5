//! Project validation logic.
//!
//! Two layers: per-field range checks over the parameter tree, which only
//! report, and structural checks over the typed model, which fail.

use std::collections::HashSet;
use std::fmt;

use indexmap::IndexMap;
use tracing::{info, warn};

use crate::params::{ParamNode, ParamValue, ParameterStore};
use crate::schema::{Asset, AssetGroup, AssetType, ProjectModel, parse_timestamp};
use crate::{ProjectError, ProjectResult};

/// Asset group, asset, field.
pub const MAX_DEPTH: usize = 3;

#[derive(thiserror::Error, Debug, Clone, PartialEq)]
pub enum ConfigError {
    #[error("Duplicate label: {label} in {context}")]
    DuplicateLabel { label: String, context: String },

    #[error("Missing reference: {id} in {context}")]
    MissingReference { id: String, context: String },

    #[error("Invalid value: {field} = {value} ({reason})")]
    InvalidValue {
        field: String,
        value: String,
        reason: String,
    },

    #[error("Asset {label} in {group} has type {type_asset}, expected {expected}")]
    AssetGroupMismatch {
        label: String,
        group: AssetGroup,
        type_asset: String,
        expected: &'static str,
    },

    #[error("Asset {label} in {group} has unknown type {type_asset}")]
    UnknownAssetType {
        label: String,
        group: AssetGroup,
        type_asset: String,
    },
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum LowerBound {
    Inclusive(f64),
    GreaterThanZero,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum UpperBound {
    Inclusive(f64),
    Unbounded,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Interval {
    pub lower: LowerBound,
    pub upper: UpperBound,
    /// `Unset` is accepted and skips the range check.
    pub allow_unset: bool,
}

impl Interval {
    const fn closed(lo: f64, hi: f64) -> Self {
        Self {
            lower: LowerBound::Inclusive(lo),
            upper: UpperBound::Inclusive(hi),
            allow_unset: false,
        }
    }

    const fn non_negative() -> Self {
        Self {
            lower: LowerBound::Inclusive(0.0),
            upper: UpperBound::Unbounded,
            allow_unset: false,
        }
    }

    const fn positive() -> Self {
        Self {
            lower: LowerBound::GreaterThanZero,
            upper: UpperBound::Unbounded,
            allow_unset: false,
        }
    }

    const fn or_unset(mut self) -> Self {
        self.allow_unset = true;
        self
    }

    fn check(&self, v: f64) -> Option<Violation> {
        match self.lower {
            LowerBound::Inclusive(lo) if v < lo => return Some(Violation::BelowMinimum { value: v, bound: lo }),
            LowerBound::GreaterThanZero if v <= 0.0 => {
                return Some(Violation::NotGreaterThanZero { value: v });
            }
            _ => {}
        }
        match self.upper {
            UpperBound::Inclusive(hi) if v > hi => Some(Violation::AboveMaximum { value: v, bound: hi }),
            _ if v.is_nan() => Some(Violation::NotANumber),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Rule {
    Text,
    Integer,
    Timestamp,
    Flag,
    Interval(Interval),
}

/// Validation rule for a project-file field name.
pub fn rule_for(name: &str) -> Option<Rule> {
    let rule = match name {
        "project_name" | "scenario_name" | "country" | "label" | "currency" | "type_asset"
        | "energy_vector" | "inflow_direction" | "outflow_direction" | "unit" | "file_name"
        | "input_power" | "output_power" | "storage_capacity" | "input_bus_name"
        | "output_bus_name" => Rule::Text,
        "evaluated_period" | "timestep" | "periods" => Rule::Integer,
        "start_date" => Rule::Timestamp,
        "optimize_cap" | "renewable_asset" | "dsm" | "overwrite" | "output_lp_file"
        | "store_results" => Rule::Flag,
        "longitude" => Rule::Interval(Interval::closed(-180.0, 180.0)),
        "latitude" => Rule::Interval(Interval::closed(-90.0, 90.0)),
        "lifetime" | "project_duration" => Rule::Interval(Interval::positive()),
        "age_installed" | "installed_cap" | "specific_costs" | "development_costs"
        | "specific_costs_om" | "dispatch_price" | "energy_price" | "feedin_tariff"
        | "timeseries" => {
            Rule::Interval(Interval::non_negative())
        }
        "maximum_cap" => Rule::Interval(Interval::non_negative().or_unset()),
        "soc_initial" => Rule::Interval(Interval::closed(0.0, 1.0).or_unset()),
        "soc_min" | "soc_max" | "c_rate" | "efficiency" | "discount_factor" | "tax"
        | "renewable_share" => Rule::Interval(Interval::closed(0.0, 1.0)),
        _ => return None,
    };
    Some(rule)
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Violation {
    WrongType {
        expected: &'static str,
        found: &'static str,
    },
    BelowMinimum {
        value: f64,
        bound: f64,
    },
    NotGreaterThanZero {
        value: f64,
    },
    AboveMaximum {
        value: f64,
        bound: f64,
    },
    NotANumber,
    InvalidTimestamp,
    NoRule,
}

/// A validation warning. Never aborts a run.
#[derive(Debug, Clone, PartialEq)]
pub struct Diagnostic {
    pub name: String,
    pub context: String,
    /// First offending element of a series.
    pub index: Option<usize>,
    pub violation: Violation,
}

impl fmt::Display for Diagnostic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.name)?;
        if let Some(i) = self.index {
            write!(f, "[{i}]")?;
        }
        if !self.context.is_empty() {
            write!(f, " of {}", self.context)?;
        }
        match self.violation {
            Violation::WrongType { expected, found } => {
                write!(f, ": expected {expected}, found {found}")
            }
            Violation::BelowMinimum { value, bound } => {
                write!(f, ": {value} is below the minimum {bound}")
            }
            Violation::NotGreaterThanZero { value } => {
                write!(f, ": {value} must be greater than zero")
            }
            Violation::AboveMaximum { value, bound } => {
                write!(f, ": {value} is above the maximum {bound}")
            }
            Violation::NotANumber => write!(f, ": value is not a number"),
            Violation::InvalidTimestamp => write!(f, ": not a valid timestamp"),
            Violation::NoRule => write!(f, ": no validation rule defined"),
        }
    }
}

/// Check one field against the rule table.
pub fn validate(name: &str, value: &ParamValue, context: &str) -> Vec<Diagnostic> {
    let diag = |index, violation| Diagnostic {
        name: name.to_string(),
        context: context.to_string(),
        index,
        violation,
    };
    let wrong_type = |expected| {
        vec![diag(
            None,
            Violation::WrongType {
                expected,
                found: value.type_name(),
            },
        )]
    };

    let Some(rule) = rule_for(name) else {
        return vec![diag(None, Violation::NoRule)];
    };

    let inner = value.inner();
    match rule {
        Rule::Text => match inner {
            ParamValue::Text(_) => Vec::new(),
            _ => wrong_type("string"),
        },
        Rule::Integer => match inner {
            ParamValue::Int(_) => Vec::new(),
            ParamValue::Number(v) if v.fract() == 0.0 => Vec::new(),
            _ => wrong_type("integer"),
        },
        Rule::Timestamp => match inner {
            ParamValue::Text(s) if parse_timestamp(s).is_some() => Vec::new(),
            ParamValue::Text(_) => vec![diag(None, Violation::InvalidTimestamp)],
            _ => wrong_type("timestamp"),
        },
        Rule::Flag => match inner {
            ParamValue::Bool(_) => Vec::new(),
            _ => wrong_type("boolean"),
        },
        Rule::Interval(interval) => match inner {
            ParamValue::Unset if interval.allow_unset => Vec::new(),
            ParamValue::Series(vs) => vs
                .iter()
                .enumerate()
                .find_map(|(i, v)| interval.check(*v).map(|viol| diag(Some(i), viol)))
                .into_iter()
                .collect(),
            other => match other.as_f64() {
                Some(v) => interval.check(v).map(|viol| diag(None, viol)).into_iter().collect(),
                None => wrong_type("number"),
            },
        },
    }
}

/// Check every leaf of the store. A group below the maximum depth is fatal.
pub fn validate_store(store: &ParameterStore) -> ProjectResult<Vec<Diagnostic>> {
    let mut diagnostics = Vec::new();
    let mut path = Vec::with_capacity(MAX_DEPTH);
    for (name, node) in store.iter() {
        walk(name, node, 1, &mut path, &mut diagnostics)?;
    }
    for d in &diagnostics {
        warn!("VALIDATION FAILED: {d}");
    }
    info!(
        warnings = diagnostics.len(),
        "Input values have been verified"
    );
    Ok(diagnostics)
}

fn walk<'a>(
    name: &'a str,
    node: &'a ParamNode,
    depth: usize,
    path: &mut Vec<&'a str>,
    out: &mut Vec<Diagnostic>,
) -> ProjectResult<()> {
    match node {
        ParamNode::Leaf(value) => {
            out.extend(validate(name, value, &path.join("/")));
            Ok(())
        }
        ParamNode::Group(children) => {
            if depth >= MAX_DEPTH {
                let mut full = path.clone();
                full.push(name);
                return Err(ProjectError::NestingTooDeep {
                    path: full.join("/"),
                });
            }
            path.push(name);
            for (child, node) in children {
                walk(child, node, depth + 1, path, out)?;
            }
            path.pop();
            Ok(())
        }
    }
}

/// Structural checks over the typed model. Run before normalization.
pub fn validate_project(project: &ProjectModel) -> Result<(), ConfigError> {
    let econ = &project.economic_data;
    let duration = econ
        .project_duration
        .as_scalar("project_duration")
        .map_err(|e| invalid("project_duration", "series", &e.to_string()))?;
    if !(duration > 0.0) {
        return Err(invalid(
            "project_duration",
            &duration.to_string(),
            "must be greater than zero",
        ));
    }

    let sim = &project.simulation_settings;
    for (field, q) in [
        ("evaluated_period", &sim.evaluated_period),
        ("timestep", &sim.timestep),
    ] {
        let v = q
            .as_scalar(field)
            .map_err(|e| invalid(field, "series", &e.to_string()))?;
        if !(v > 0.0) {
            return Err(invalid(field, &v.to_string(), "must be greater than zero"));
        }
    }
    if parse_timestamp(&sim.start_date).is_none() {
        return Err(invalid("start_date", &sim.start_date, "not a valid timestamp"));
    }

    for group in [
        AssetGroup::Conversion,
        AssetGroup::Production,
        AssetGroup::Consumption,
    ] {
        if let Some(assets) = project.group(group) {
            check_labels(assets.iter().map(|(k, a)| label_of(k, &a.label)), group.key())?;
            for (key, asset) in assets {
                check_type(group, label_of(key, &asset.label), &asset.type_asset)?;
            }
        }
    }
    check_labels(
        project.fix_cost.iter().map(|(k, a)| label_of(k, &a.label)),
        AssetGroup::FixCost.key(),
    )?;
    check_labels(
        project
            .energy_providers
            .iter()
            .map(|(k, p)| label_of(k, &p.label)),
        AssetGroup::Providers.key(),
    )?;

    check_labels(
        project
            .energy_storage
            .iter()
            .map(|(k, s)| label_of(k, &s.label)),
        AssetGroup::Storage.key(),
    )?;
    for (key, storage) in &project.energy_storage {
        let label = label_of(key, &storage.label);
        check_type(AssetGroup::Storage, label, &storage.type_asset)?;
        if storage.components.is_some() {
            continue;
        }
        for reference in [
            &storage.input_power,
            &storage.output_power,
            &storage.storage_capacity,
        ] {
            if !contains_label(&project.storage_components, reference) {
                return Err(ConfigError::MissingReference {
                    id: reference.clone(),
                    context: format!("storage_components (referenced by {label})"),
                });
            }
        }
    }
    check_labels(table_labels(project), "project")?;
    Ok(())
}

/// Labels that become rows of the result tables or assets of the graph.
/// They must be unique across groups, not only within one.
fn table_labels(project: &ProjectModel) -> impl Iterator<Item = &str> {
    let plain = [
        &project.energy_conversion,
        &project.energy_production,
        &project.energy_consumption,
        &project.fix_cost,
        &project.storage_components,
    ]
    .into_iter()
    .flat_map(|g| g.iter().map(|(k, a)| label_of(k, &a.label)));
    let storage = project.energy_storage.iter().flat_map(|(k, s)| {
        let resolved = s.components.iter().flat_map(|c| c.iter().map(|a| a.label.as_str()));
        std::iter::once(label_of(k, &s.label)).chain(resolved)
    });
    plain.chain(storage)
}

fn invalid(field: &str, value: &str, reason: &str) -> ConfigError {
    ConfigError::InvalidValue {
        field: field.to_string(),
        value: value.to_string(),
        reason: reason.to_string(),
    }
}

pub(crate) fn label_of<'a>(key: &'a str, label: &'a str) -> &'a str {
    if label.is_empty() { key } else { label }
}

pub(crate) fn contains_label(records: &IndexMap<String, Asset>, label: &str) -> bool {
    records.contains_key(label) || records.values().any(|a| a.label == label)
}

fn check_labels<'a>(labels: impl Iterator<Item = &'a str>, context: &str) -> Result<(), ConfigError> {
    let mut seen = HashSet::new();
    for label in labels {
        if !seen.insert(label) {
            return Err(ConfigError::DuplicateLabel {
                label: label.to_string(),
                context: context.to_string(),
            });
        }
    }
    Ok(())
}

fn check_type(group: AssetGroup, label: &str, tag: &str) -> Result<(), ConfigError> {
    let Some(expected) = group.accepted_type() else {
        return Ok(());
    };
    match AssetType::parse(tag) {
        Some(ty) if ty == expected => Ok(()),
        Some(_) => Err(ConfigError::AssetGroupMismatch {
            label: label.to_string(),
            group,
            type_asset: tag.to_string(),
            expected: expected.as_str(),
        }),
        None => Err(ConfigError::UnknownAssetType {
            label: label.to_string(),
            group,
            type_asset: tag.to_string(),
        }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn quantity(v: ParamValue) -> ParamValue {
        ParamValue::Quantity {
            value: Box::new(v),
            unit: Some("factor".to_string()),
        }
    }

    #[test]
    fn soc_initial_may_be_unset() {
        let diags = validate("soc_initial", &quantity(ParamValue::Unset), "battery");
        assert!(diags.is_empty());
        let diags = validate("soc_initial", &ParamValue::Unset, "battery");
        assert!(diags.is_empty());
    }

    #[test]
    fn soc_initial_out_of_range_warns_once() {
        let diags = validate("soc_initial", &quantity(ParamValue::Number(1.5)), "battery");
        assert_eq!(diags.len(), 1);
        assert_eq!(
            diags[0].violation,
            Violation::AboveMaximum {
                value: 1.5,
                bound: 1.0
            }
        );
        assert_eq!(diags[0].context, "battery");
    }

    #[test]
    fn soc_min_may_not_be_unset() {
        let diags = validate("soc_min", &ParamValue::Unset, "battery");
        assert!(matches!(diags[0].violation, Violation::WrongType { .. }));
    }

    #[test]
    fn lifetime_must_be_positive() {
        assert!(validate("lifetime", &ParamValue::Int(20), "pv").is_empty());
        let diags = validate("lifetime", &ParamValue::Int(0), "pv");
        assert_eq!(
            diags[0].violation,
            Violation::NotGreaterThanZero { value: 0.0 }
        );
    }

    #[test]
    fn series_report_first_offending_index() {
        let value = ParamValue::Series(vec![0.1, 0.2, -1.0, -2.0]);
        let diags = validate("dispatch_price", &value, "grid");
        assert_eq!(diags.len(), 1);
        assert_eq!(diags[0].index, Some(2));
    }

    #[test]
    fn unknown_field_is_a_warning() {
        let diags = validate("colour", &ParamValue::Text("red".into()), "pv");
        assert_eq!(diags[0].violation, Violation::NoRule);
        assert!(diags[0].to_string().contains("no validation rule"));
    }

    #[test]
    fn kinds() {
        assert!(validate("evaluated_period", &ParamValue::Int(365), "").is_empty());
        assert!(validate("evaluated_period", &ParamValue::Number(365.0), "").is_empty());
        assert_eq!(validate("evaluated_period", &ParamValue::Number(0.5), "").len(), 1);
        assert!(validate("start_date", &ParamValue::Text("2020-01-01 00:00".into()), "").is_empty());
        assert_eq!(
            validate("start_date", &ParamValue::Text("soon".into()), "")[0].violation,
            Violation::InvalidTimestamp
        );
        assert!(validate("optimize_cap", &ParamValue::Bool(true), "").is_empty());
        assert_eq!(validate("optimize_cap", &ParamValue::Int(1), "").len(), 1);
        assert_eq!(validate("currency", &ParamValue::Int(1), "").len(), 1);
        assert_eq!(validate("longitude", &ParamValue::Number(-181.0), "").len(), 1);
    }

    #[test]
    fn store_walk_bounds_depth() {
        let doc = serde_json::json!({
            "energy_storage": {
                "battery": {
                    "soc_initial": {"value": null, "unit": "factor"},
                    "soc_max": {"value": 1.2, "unit": "factor"}
                }
            }
        });
        let store = ParameterStore::from_json(&doc).unwrap();
        let diags = validate_store(&store).unwrap();
        assert_eq!(diags.len(), 1);
        assert_eq!(diags[0].context, "energy_storage/battery");

        let deep = serde_json::json!({
            "energy_storage": {"battery": {"input_power": {"costs": {"value": 1}}}}
        });
        let store = ParameterStore::from_json(&deep).unwrap();
        let err = validate_store(&store).unwrap_err();
        match err {
            ProjectError::NestingTooDeep { path } => {
                assert_eq!(path, "energy_storage/battery/input_power")
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[test]
    fn labels_are_unique_across_groups() {
        let mut project: ProjectModel = serde_yaml::from_str(
            r#"
project_data: {project_name: p, scenario_name: s}
economic_data:
  currency: EUR
  discount_factor: {value: 0.05, unit: factor}
  project_duration: {value: 20, unit: year}
simulation_settings:
  start_date: "2020-01-01 00:00"
  evaluated_period: {value: 1, unit: day}
  timestep: {value: 60, unit: minute}
energy_conversion:
  pv: {type_asset: transformer}
"#,
        )
        .unwrap();
        assert!(validate_project(&project).is_ok());

        project.fix_cost.insert("pv".into(), Asset::default());
        match validate_project(&project) {
            Err(ConfigError::DuplicateLabel { label, context }) => {
                assert_eq!(label, "pv");
                assert_eq!(context, "project");
            }
            other => panic!("expected duplicate label, got {other:?}"),
        }
    }

    #[test]
    fn type_must_match_group() {
        assert!(check_type(AssetGroup::Conversion, "chp", "transformer").is_ok());
        assert!(matches!(
            check_type(AssetGroup::Conversion, "chp", "sink"),
            Err(ConfigError::AssetGroupMismatch { .. })
        ));
        assert!(matches!(
            check_type(AssetGroup::Production, "pv", "photovoltaic"),
            Err(ConfigError::UnknownAssetType { .. })
        ));
    }
}
