//! Electricity-equivalent weights of energy carriers.

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

use crate::{ResultsError, ResultsResult};

/// Conversion factor of one carrier into kWh electricity equivalent.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SectorWeight {
    pub value: f64,
    pub unit: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WeightTable {
    weights: IndexMap<String, SectorWeight>,
}

impl Default for WeightTable {
    fn default() -> Self {
        let entries = [
            ("Electricity", 1.0, "kWh_eleq/kWh_el"),
            ("Heat", 1.0, "kWh_eleq/kWh_therm"),
            ("H2", 32.87, "kWh_eleq/kgH2"),
            ("Diesel", 8.20, "kWh_eleq/l"),
            ("Gas", 5.38, "kWh_eleq/m3"),
        ];
        let weights = entries
            .into_iter()
            .map(|(sector, value, unit)| {
                (
                    sector.to_string(),
                    SectorWeight {
                        value,
                        unit: unit.to_string(),
                    },
                )
            })
            .collect();
        Self { weights }
    }
}

impl WeightTable {
    pub fn weight(&self, sector: &str) -> ResultsResult<f64> {
        self.weights
            .get(sector)
            .map(|w| w.value)
            .ok_or_else(|| ResultsError::MissingSectorWeight {
                sector: sector.to_string(),
            })
    }

    pub fn insert(&mut self, sector: impl Into<String>, value: f64, unit: impl Into<String>) {
        self.weights.insert(
            sector.into(),
            SectorWeight {
                value,
                unit: unit.into(),
            },
        );
    }

    pub fn sectors(&self) -> impl Iterator<Item = &str> {
        self.weights.keys().map(String::as_str)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_carriers() {
        let table = WeightTable::default();
        assert_eq!(table.weight("Electricity").unwrap(), 1.0);
        assert_eq!(table.weight("H2").unwrap(), 32.87);
        assert_eq!(table.sectors().count(), 5);
    }

    #[test]
    fn unknown_sector() {
        let err = WeightTable::default().weight("Steam").unwrap_err();
        assert!(matches!(err, ResultsError::MissingSectorWeight { ref sector } if sector == "Steam"));
    }
}
