//! Project schema definitions.
//!
//! Records are keyed by label inside each asset group. Everything under
//! `derived` is produced by later pipeline stages and is optional in the
//! input file.

use chrono::NaiveDateTime;
use indexmap::IndexMap;
use mvs_core::Quantity;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ProjectModel {
    pub project_data: ProjectData,
    pub economic_data: EconomicData,
    pub simulation_settings: SimulationSettings,
    #[serde(default)]
    pub energy_conversion: IndexMap<String, Asset>,
    #[serde(default)]
    pub energy_production: IndexMap<String, Asset>,
    #[serde(default)]
    pub energy_consumption: IndexMap<String, Asset>,
    #[serde(default)]
    pub energy_storage: IndexMap<String, StorageAsset>,
    #[serde(default, skip_serializing_if = "IndexMap::is_empty")]
    pub storage_components: IndexMap<String, Asset>,
    #[serde(default)]
    pub energy_providers: IndexMap<String, EnergyProvider>,
    #[serde(default)]
    pub fix_cost: IndexMap<String, Asset>,
}

impl ProjectModel {
    /// Assets of a plain asset group. Storage and providers have their own
    /// record types and return `None`.
    pub fn group(&self, group: AssetGroup) -> Option<&IndexMap<String, Asset>> {
        match group {
            AssetGroup::Conversion => Some(&self.energy_conversion),
            AssetGroup::Production => Some(&self.energy_production),
            AssetGroup::Consumption => Some(&self.energy_consumption),
            AssetGroup::FixCost => Some(&self.fix_cost),
            AssetGroup::Storage | AssetGroup::Providers => None,
        }
    }

    pub fn group_mut(&mut self, group: AssetGroup) -> Option<&mut IndexMap<String, Asset>> {
        match group {
            AssetGroup::Conversion => Some(&mut self.energy_conversion),
            AssetGroup::Production => Some(&mut self.energy_production),
            AssetGroup::Consumption => Some(&mut self.energy_consumption),
            AssetGroup::FixCost => Some(&mut self.fix_cost),
            AssetGroup::Storage | AssetGroup::Providers => None,
        }
    }

    /// Evaluated period in days.
    pub fn evaluated_days(&self) -> mvs_core::MvsResult<f64> {
        self.simulation_settings
            .evaluated_period
            .as_scalar("evaluated_period")
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ProjectData {
    pub project_name: String,
    pub scenario_name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub country: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub latitude: Option<Quantity>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub longitude: Option<Quantity>,
    /// Energy vectors in order of first appearance. Filled by normalization.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub sectors: Vec<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct EconomicData {
    pub currency: String,
    pub discount_factor: Quantity,
    pub project_duration: Quantity,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tax: Option<Quantity>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct SimulationSettings {
    pub start_date: String,
    /// Days.
    pub evaluated_period: Quantity,
    /// Minutes.
    pub timestep: Quantity,
    #[serde(default)]
    pub output_lp_file: bool,
    #[serde(default)]
    pub store_results: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub horizon: Option<SimulationHorizon>,
}

/// Time index derived from the simulation settings.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct SimulationHorizon {
    pub start: NaiveDateTime,
    pub end: NaiveDateTime,
    pub periods: usize,
    pub timestep_minutes: i64,
}

impl SimulationHorizon {
    pub fn time_index(&self) -> Vec<NaiveDateTime> {
        let step = chrono::Duration::minutes(self.timestep_minutes);
        (0..self.periods)
            .scan(self.start, |t, _| {
                let current = *t;
                *t += step;
                Some(current)
            })
            .collect()
    }
}

/// Accepted timestamp layouts for `start_date`.
pub fn parse_timestamp(text: &str) -> Option<NaiveDateTime> {
    const FORMATS: [&str; 3] = ["%Y-%m-%d %H:%M:%S", "%Y-%m-%dT%H:%M:%S", "%Y-%m-%d %H:%M"];
    let text = text.trim();
    for format in FORMATS {
        if let Ok(ts) = NaiveDateTime::parse_from_str(text, format) {
            return Some(ts);
        }
    }
    chrono::NaiveDate::parse_from_str(text, "%Y-%m-%d")
        .ok()
        .and_then(|d| d.and_hms_opt(0, 0, 0))
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AssetGroup {
    Conversion,
    Storage,
    Production,
    Consumption,
    Providers,
    FixCost,
}

impl AssetGroup {
    pub const ALL: [AssetGroup; 6] = [
        AssetGroup::Conversion,
        AssetGroup::Storage,
        AssetGroup::Production,
        AssetGroup::Consumption,
        AssetGroup::Providers,
        AssetGroup::FixCost,
    ];

    /// Key of the group in the project document.
    pub fn key(self) -> &'static str {
        match self {
            AssetGroup::Conversion => "energy_conversion",
            AssetGroup::Storage => "energy_storage",
            AssetGroup::Production => "energy_production",
            AssetGroup::Consumption => "energy_consumption",
            AssetGroup::Providers => "energy_providers",
            AssetGroup::FixCost => "fix_cost",
        }
    }

    /// The asset type a group admits into the graph. Providers and fix
    /// costs never enter the graph directly.
    pub fn accepted_type(self) -> Option<AssetType> {
        match self {
            AssetGroup::Conversion => Some(AssetType::Transformer),
            AssetGroup::Storage => Some(AssetType::Storage),
            AssetGroup::Production => Some(AssetType::Source),
            AssetGroup::Consumption => Some(AssetType::Sink),
            AssetGroup::Providers | AssetGroup::FixCost => None,
        }
    }
}

impl std::fmt::Display for AssetGroup {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.key())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AssetType {
    Transformer,
    Storage,
    Source,
    Sink,
}

impl AssetType {
    pub fn parse(tag: &str) -> Option<Self> {
        match tag {
            "transformer" => Some(AssetType::Transformer),
            "storage" => Some(AssetType::Storage),
            "source" => Some(AssetType::Source),
            "sink" => Some(AssetType::Sink),
            _ => None,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            AssetType::Transformer => "transformer",
            AssetType::Storage => "storage",
            AssetType::Source => "source",
            AssetType::Sink => "sink",
        }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct Asset {
    #[serde(default)]
    pub label: String,
    #[serde(default)]
    pub type_asset: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub energy_vector: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub inflow_direction: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub outflow_direction: Option<String>,
    /// Filled from `inflow_direction` by normalization unless given.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub input_bus_name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub output_bus_name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub unit: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub optimize_cap: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub renewable_asset: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub lifetime: Option<Quantity>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub age_installed: Option<Quantity>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub installed_cap: Option<Quantity>,
    #[serde(
        default,
        deserialize_with = "mvs_core::quantity::deserialize_unset",
        skip_serializing_if = "Option::is_none"
    )]
    pub maximum_cap: Option<Quantity>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub specific_costs: Option<Quantity>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub development_costs: Option<Quantity>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub specific_costs_om: Option<Quantity>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub dispatch_price: Option<Quantity>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub efficiency: Option<Quantity>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub timeseries: Option<Quantity>,
    #[serde(default, skip_serializing_if = "DerivedFields::is_empty")]
    pub derived: DerivedFields,
}

impl Asset {
    pub fn new(label: impl Into<String>, type_asset: AssetType) -> Self {
        Self {
            label: label.into(),
            type_asset: type_asset.as_str().to_string(),
            ..Self::default()
        }
    }

    pub fn asset_type(&self) -> Option<AssetType> {
        AssetType::parse(&self.type_asset)
    }

    pub fn optimizes_capacity(&self) -> bool {
        self.optimize_cap.unwrap_or(false)
    }

    pub fn is_renewable(&self) -> bool {
        self.renewable_asset.unwrap_or(false)
    }
}

/// Figures attached to an asset by the economic and result stages.
/// Every stage overwrites its own fields.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct DerivedFields {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub lifetime_specific_cost: Option<Quantity>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub lifetime_specific_cost_om: Option<Quantity>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub lifetime_price_dispatch: Option<Quantity>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub annuity_specific_investment_om: Option<Quantity>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub simulation_annuity: Option<Quantity>,
    /// Peak of the raw production profile.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub timeseries_peak: Option<Quantity>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub timeseries_normalized: Option<Quantity>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub optimized_add_cap: Option<Quantity>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub input_flow: Option<Quantity>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub output_flow: Option<Quantity>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub flow: Option<Quantity>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub total_flow: Option<Quantity>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub annual_total_flow: Option<Quantity>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub peak_flow: Option<Quantity>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub average_flow: Option<Quantity>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub costs: Option<CostBreakdown>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub levelized_cost: Option<Quantity>,
}

impl DerivedFields {
    pub fn is_empty(&self) -> bool {
        *self == DerivedFields::default()
    }

    /// Clear everything the result mapper writes.
    pub fn clear_results(&mut self) {
        self.optimized_add_cap = None;
        self.input_flow = None;
        self.output_flow = None;
        self.flow = None;
        self.total_flow = None;
        self.annual_total_flow = None;
        self.peak_flow = None;
        self.average_flow = None;
    }
}

/// Per-asset cost terms. Terms whose inputs were absent stay `None`.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct CostBreakdown {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub costs_investment: Option<Quantity>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub costs_upfront: Option<Quantity>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub costs_dispatch: Option<Quantity>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub costs_om_fix: Option<Quantity>,
    pub costs_total: Quantity,
    pub costs_om_total: Quantity,
    pub annuity_total: Quantity,
    pub annuity_om: Quantity,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct StorageAsset {
    #[serde(default)]
    pub label: String,
    #[serde(default = "default_storage_type")]
    pub type_asset: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub energy_vector: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub inflow_direction: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub outflow_direction: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub input_bus_name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub output_bus_name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub optimize_cap: Option<bool>,
    /// `None` means the optimizer picks the initial state of charge.
    #[serde(
        default,
        deserialize_with = "mvs_core::quantity::deserialize_unset",
        skip_serializing_if = "Option::is_none"
    )]
    pub soc_initial: Option<Quantity>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub soc_min: Option<Quantity>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub soc_max: Option<Quantity>,
    /// Labels of the sub-records in `storage_components`.
    pub input_power: String,
    pub output_power: String,
    pub storage_capacity: String,
    /// Resolved sub-records. Filled by normalization.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub components: Option<StorageComponents>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub timeseries_soc: Option<Quantity>,
}

fn default_storage_type() -> String {
    AssetType::Storage.as_str().to_string()
}

impl StorageAsset {
    pub fn optimizes_capacity(&self) -> bool {
        self.optimize_cap.unwrap_or(false)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct StorageComponents {
    pub input_power: Asset,
    pub output_power: Asset,
    pub storage_capacity: Asset,
}

impl StorageComponents {
    pub fn iter(&self) -> impl Iterator<Item = &Asset> {
        [&self.input_power, &self.output_power, &self.storage_capacity].into_iter()
    }

    pub fn iter_mut(&mut self) -> impl Iterator<Item = &mut Asset> {
        [
            &mut self.input_power,
            &mut self.output_power,
            &mut self.storage_capacity,
        ]
        .into_iter()
    }
}

/// Grid connection (DSO). Expanded into a consumption source and a feed-in
/// sink during normalization.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct EnergyProvider {
    #[serde(default)]
    pub label: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub energy_vector: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub inflow_direction: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub outflow_direction: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub optimize_cap: Option<bool>,
    pub energy_price: Quantity,
    pub feedin_tariff: Quantity,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub renewable_share: Option<Quantity>,
    /// Labels of the generated consumption sources.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub connected_consumption_sources: Vec<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub connected_feedin_sinks: Vec<String>,
}
