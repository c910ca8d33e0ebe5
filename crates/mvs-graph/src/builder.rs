//! Incremental graph builder.

use std::collections::HashMap;

use mvs_core::{AssetId, BusId, PortId};
use mvs_project::{AssetGroup, AssetType};

use crate::error::GraphResult;
use crate::graph::{AssetComponent, Bus, EnergyGraph, Port, PortKind};
use crate::validate;

/// Builder for constructing an `EnergyGraph` incrementally.
///
/// Add busses first, then assets attached to them, then call `build()` to
/// validate and freeze the graph.
#[derive(Debug, Default)]
pub struct GraphBuilder {
    busses: Vec<Bus>,
    assets: Vec<AssetComponent>,
    ports: Vec<Port>,
}

/// What `add_asset` needs to know about an asset.
#[derive(Debug, Clone)]
pub struct AssetSpec {
    pub label: String,
    pub group: AssetGroup,
    pub asset_type: AssetType,
    pub optimize_cap: bool,
}

impl GraphBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_bus(&mut self, label: impl Into<String>) -> BusId {
        let id = BusId::from_index(self.busses.len() as u32);
        self.busses.push(Bus {
            id,
            label: label.into(),
        });
        id
    }

    /// Bus with this label, if already added.
    pub fn find_bus(&self, label: &str) -> Option<BusId> {
        self.busses.iter().find(|b| b.label == label).map(|b| b.id)
    }

    /// Add an asset and one port per given bus.
    pub fn add_asset(
        &mut self,
        spec: AssetSpec,
        input_bus: Option<BusId>,
        output_bus: Option<BusId>,
    ) -> AssetId {
        let asset = AssetId::from_index(self.assets.len() as u32);
        let inlet = input_bus.map(|bus| self.push_port(asset, bus, PortKind::Inlet));
        let outlet = output_bus.map(|bus| self.push_port(asset, bus, PortKind::Outlet));
        self.assets.push(AssetComponent {
            id: asset,
            label: spec.label,
            group: spec.group,
            asset_type: spec.asset_type,
            inlet,
            outlet,
            optimize_cap: spec.optimize_cap,
        });
        asset
    }

    fn push_port(&mut self, asset: AssetId, bus: BusId, kind: PortKind) -> PortId {
        let id = PortId::from_index(self.ports.len() as u32);
        self.ports.push(Port {
            id,
            asset,
            bus,
            kind,
        });
        id
    }

    /// Validate and build compact adjacency lists.
    pub fn build(self) -> GraphResult<EnergyGraph> {
        validate::validate_structure(&self.busses, &self.assets, &self.ports)?;

        let (bus_port_offsets, bus_ports) = Self::build_adjacency(&self.busses, &self.ports);

        validate::validate_adjacency(&self.busses, &self.ports, &bus_port_offsets, &bus_ports)?;

        let bus_by_label = self
            .busses
            .iter()
            .map(|b| (b.label.clone(), b.id))
            .collect();
        let asset_by_label = self
            .assets
            .iter()
            .map(|a| (a.label.clone(), a.id))
            .collect();

        Ok(EnergyGraph {
            busses: self.busses,
            assets: self.assets,
            ports: self.ports,
            bus_port_offsets,
            bus_ports,
            bus_by_label,
            asset_by_label,
        })
    }

    fn build_adjacency(busses: &[Bus], ports: &[Port]) -> (Vec<usize>, Vec<PortId>) {
        let mut by_bus: HashMap<BusId, Vec<PortId>> = HashMap::new();
        for port in ports {
            by_bus.entry(port.bus).or_default().push(port.id);
        }
        for list in by_bus.values_mut() {
            list.sort_by_key(|p| p.index());
        }

        let mut offsets = Vec::with_capacity(busses.len() + 1);
        let mut flat = Vec::with_capacity(ports.len());
        offsets.push(0);
        for bus in busses {
            if let Some(list) = by_bus.get(&bus.id) {
                flat.extend_from_slice(list);
            }
            offsets.push(flat.len());
        }
        (offsets, flat)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::GraphError;

    fn spec(label: &str, group: AssetGroup, asset_type: AssetType) -> AssetSpec {
        AssetSpec {
            label: label.into(),
            group,
            asset_type,
            optimize_cap: false,
        }
    }

    #[test]
    fn builder_basic() {
        let mut builder = GraphBuilder::new();
        let el = builder.add_bus("Electricity bus");
        let heat = builder.add_bus("Heat bus");
        let hp = builder.add_asset(
            spec("heat pump", AssetGroup::Conversion, AssetType::Transformer),
            Some(el),
            Some(heat),
        );
        assert_eq!(el.index(), 0);
        assert_eq!(heat.index(), 1);
        assert_eq!(hp.index(), 0);
        assert_eq!(builder.ports.len(), 2);
        assert_eq!(builder.find_bus("Heat bus"), Some(heat));
        assert_eq!(builder.find_bus("Gas bus"), None);
    }

    #[test]
    fn source_has_single_port() {
        let mut builder = GraphBuilder::new();
        let el = builder.add_bus("Electricity bus");
        let pv = builder.add_asset(
            spec("pv", AssetGroup::Production, AssetType::Source),
            None,
            Some(el),
        );
        let graph = builder.build().unwrap();
        let pv = graph.asset(pv).unwrap();
        assert!(pv.inlet.is_none());
        assert!(pv.outlet.is_some());
        assert_eq!(graph.bus_ports(el).len(), 1);
    }

    #[test]
    fn asset_without_busses_is_rejected() {
        let mut builder = GraphBuilder::new();
        builder.add_asset(
            spec("floating", AssetGroup::Production, AssetType::Source),
            None,
            None,
        );
        assert_eq!(
            builder.build().unwrap_err(),
            GraphError::MissingBusDirection {
                asset: "floating".into()
            }
        );
    }

    #[test]
    fn duplicate_labels_are_rejected() {
        let mut builder = GraphBuilder::new();
        builder.add_bus("Electricity bus");
        builder.add_bus("Electricity bus");
        assert!(matches!(
            builder.build(),
            Err(GraphError::DuplicateBus { .. })
        ));
    }
}
