//! Result data types.

use indexmap::IndexMap;
use mvs_graph::SolveMeta;
use mvs_project::ProjectModel;
use serde::{Deserialize, Serialize};

use crate::tables::ResultTable;

pub type RunId = String;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RunManifest {
    pub run_id: RunId,
    pub project_name: String,
    pub scenario_name: String,
    pub timestamp: String,
    pub tool_version: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub objective: Option<f64>,
}

/// Balance of one bus over the simulated periods. Flows into the bus are
/// positive, flows out of it negative; one column per asset.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BusBalance {
    pub bus: String,
    pub columns: IndexMap<String, Vec<f64>>,
}

impl BusBalance {
    /// Net flow into the bus per period.
    pub fn net(&self) -> Vec<f64> {
        let len = self.columns.values().map(Vec::len).max().unwrap_or(0);
        let mut net = vec![0.0; len];
        for series in self.columns.values() {
            for (n, v) in net.iter_mut().zip(series) {
                *n += v;
            }
        }
        net
    }
}

/// Energy use and origin of one sector.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SectorKpis {
    pub renewable_generation: f64,
    pub non_renewable_generation: f64,
    /// Provider supply counted by the provider's renewable share.
    pub renewable_supply: f64,
    pub non_renewable_supply: f64,
    pub total_demand: f64,
    pub total_feedin: f64,
    pub total_renewable_energy_use: f64,
    pub total_non_renewable_energy_use: f64,
    #[serde(with = "nan_as_null")]
    pub renewable_share: f64,
}

/// Sector-coupled totals in electricity equivalent.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ProjectKpis {
    pub total_renewable_generation_eleq: f64,
    pub total_non_renewable_generation_eleq: f64,
    pub total_renewable_energy_use_eleq: f64,
    pub total_non_renewable_energy_use_eleq: f64,
    #[serde(with = "nan_as_null")]
    pub renewable_share: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct KpiReport {
    pub cost_matrix: ResultTable,
    pub scalar_matrix: ResultTable,
    /// Column totals of the cost matrix.
    pub scalars: IndexMap<String, f64>,
    pub sector_kpis: IndexMap<String, SectorKpis>,
    pub project_kpis: ProjectKpis,
    /// Annuity per unit of yearly generation, per production asset.
    #[serde(with = "nan_as_null::map")]
    pub levelized_costs: IndexMap<String, f64>,
}

/// Everything persisted for one evaluation.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EvaluationRecord {
    pub meta: SolveMeta,
    pub report: KpiReport,
    pub project: ProjectModel,
}

/// Undefined ratios are NaN in memory and `null` in JSON.
mod nan_as_null {
    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(value: &f64, s: S) -> Result<S::Ok, S::Error> {
        if value.is_nan() {
            s.serialize_none()
        } else {
            s.serialize_f64(*value)
        }
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(d: D) -> Result<f64, D::Error> {
        Ok(Option::<f64>::deserialize(d)?.unwrap_or(f64::NAN))
    }

    pub mod map {
        use indexmap::IndexMap;
        use serde::{Deserialize, Deserializer, Serialize, Serializer};

        pub fn serialize<S: Serializer>(values: &IndexMap<String, f64>, s: S) -> Result<S::Ok, S::Error> {
            let values: IndexMap<&String, Option<f64>> = values
                .iter()
                .map(|(k, v)| (k, (!v.is_nan()).then_some(*v)))
                .collect();
            values.serialize(s)
        }

        pub fn deserialize<'de, D: Deserializer<'de>>(d: D) -> Result<IndexMap<String, f64>, D::Error> {
            let values = IndexMap::<String, Option<f64>>::deserialize(d)?;
            Ok(values
                .into_iter()
                .map(|(k, v)| (k, v.unwrap_or(f64::NAN)))
                .collect())
        }
    }
}
