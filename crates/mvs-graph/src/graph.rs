//! Core graph data structures.

use std::collections::HashMap;

use mvs_core::{AssetId, BusId, PortId};
use mvs_project::{AssetGroup, AssetType};

use crate::solve::EdgeKey;

/// Direction of a port as seen from the asset.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PortKind {
    /// Energy flows from the bus into the asset.
    Inlet,
    /// Energy flows from the asset into the bus.
    Outlet,
}

/// A connection point of one energy carrier.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Bus {
    pub id: BusId,
    pub label: String,
}

/// Attaches an asset to a bus.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Port {
    pub id: PortId,
    pub asset: AssetId,
    pub bus: BusId,
    pub kind: PortKind,
}

/// An asset as the optimizer sees it. Sources have only an outlet, sinks
/// only an inlet.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AssetComponent {
    pub id: AssetId,
    pub label: String,
    pub group: AssetGroup,
    pub asset_type: AssetType,
    pub inlet: Option<PortId>,
    pub outlet: Option<PortId>,
    pub optimize_cap: bool,
}

impl AssetComponent {
    /// Storage assets carry a virtual capacity edge.
    pub fn has_capacity_edge(&self) -> bool {
        self.asset_type == AssetType::Storage
    }
}

/// Edges of one asset, in solver terms.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AssetEdges {
    pub input: Option<EdgeKey>,
    pub output: Option<EdgeKey>,
    pub capacity: Option<EdgeKey>,
}

impl AssetEdges {
    pub fn iter(&self) -> impl Iterator<Item = &EdgeKey> {
        [&self.input, &self.output, &self.capacity]
            .into_iter()
            .flatten()
    }
}

/// A validated, immutable bus/asset graph.
///
/// Busses, assets and ports live in vectors indexed by their IDs. For each
/// bus the incident ports are stored in one flat list with offsets.
#[derive(Debug, Clone)]
pub struct EnergyGraph {
    pub(crate) busses: Vec<Bus>,
    pub(crate) assets: Vec<AssetComponent>,
    pub(crate) ports: Vec<Port>,

    /// Bus i's ports are in bus_ports[bus_port_offsets[i]..bus_port_offsets[i+1]].
    pub(crate) bus_port_offsets: Vec<usize>,
    pub(crate) bus_ports: Vec<PortId>,

    pub(crate) bus_by_label: HashMap<String, BusId>,
    pub(crate) asset_by_label: HashMap<String, AssetId>,
}

impl EnergyGraph {
    pub fn busses(&self) -> &[Bus] {
        &self.busses
    }

    pub fn assets(&self) -> &[AssetComponent] {
        &self.assets
    }

    pub fn ports(&self) -> &[Port] {
        &self.ports
    }

    pub fn bus(&self, id: BusId) -> Option<&Bus> {
        self.busses.get(id.index() as usize)
    }

    pub fn asset(&self, id: AssetId) -> Option<&AssetComponent> {
        self.assets.get(id.index() as usize)
    }

    pub fn port(&self, id: PortId) -> Option<&Port> {
        self.ports.get(id.index() as usize)
    }

    pub fn bus_id(&self, label: &str) -> Option<BusId> {
        self.bus_by_label.get(label).copied()
    }

    pub fn asset_id(&self, label: &str) -> Option<AssetId> {
        self.asset_by_label.get(label).copied()
    }

    /// Ports incident to a bus, in port order.
    pub fn bus_ports(&self, bus: BusId) -> &[PortId] {
        let idx = bus.index() as usize;
        if idx >= self.busses.len() {
            return &[];
        }
        let start = self.bus_port_offsets[idx];
        let end = self.bus_port_offsets[idx + 1];
        &self.bus_ports[start..end]
    }

    pub fn asset_input_bus(&self, asset: AssetId) -> Option<BusId> {
        let port = self.asset(asset)?.inlet?;
        Some(self.port(port)?.bus)
    }

    pub fn asset_output_bus(&self, asset: AssetId) -> Option<BusId> {
        let port = self.asset(asset)?.outlet?;
        Some(self.port(port)?.bus)
    }

    /// Flow edges `(input bus -> asset)`, `(asset -> output bus)` and, for
    /// storage, the capacity edge.
    pub fn asset_edges(&self, asset: AssetId) -> AssetEdges {
        let Some(component) = self.asset(asset) else {
            return AssetEdges::default();
        };
        let bus_label = |bus: Option<BusId>| bus.and_then(|b| self.bus(b)).map(|b| b.label.clone());
        AssetEdges {
            input: bus_label(self.asset_input_bus(asset))
                .map(|bus| EdgeKey::flow(bus, component.label.clone())),
            output: bus_label(self.asset_output_bus(asset))
                .map(|bus| EdgeKey::flow(component.label.clone(), bus)),
            capacity: component
                .has_capacity_edge()
                .then(|| EdgeKey::capacity(component.label.clone())),
        }
    }

    /// Every edge of the graph in asset order.
    pub fn edges(&self) -> Vec<EdgeKey> {
        self.assets
            .iter()
            .flat_map(|a| {
                let edges = self.asset_edges(a.id);
                edges.iter().cloned().collect::<Vec<_>>()
            })
            .collect()
    }

    /// Assets feeding into and drawing from a bus, each with its edge.
    pub fn bus_edges(&self, bus: BusId) -> Vec<(PortKind, &AssetComponent, EdgeKey)> {
        let Some(bus_label) = self.bus(bus).map(|b| b.label.as_str()) else {
            return Vec::new();
        };
        self.bus_ports(bus)
            .iter()
            .filter_map(|&pid| self.port(pid))
            .filter_map(|port| {
                let asset = self.asset(port.asset)?;
                let edge = match port.kind {
                    PortKind::Outlet => EdgeKey::flow(asset.label.clone(), bus_label),
                    PortKind::Inlet => EdgeKey::flow(bus_label, asset.label.clone()),
                };
                Some((port.kind, asset, edge))
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use mvs_core::Id;

    #[test]
    fn port_kind_equality() {
        assert_eq!(PortKind::Inlet, PortKind::Inlet);
        assert_ne!(PortKind::Inlet, PortKind::Outlet);
    }

    #[test]
    fn only_storage_has_capacity_edge() {
        let mut asset = AssetComponent {
            id: Id::from_index(0),
            label: "battery".into(),
            group: AssetGroup::Storage,
            asset_type: AssetType::Storage,
            inlet: Some(Id::from_index(0)),
            outlet: Some(Id::from_index(1)),
            optimize_cap: true,
        };
        assert!(asset.has_capacity_edge());
        asset.asset_type = AssetType::Transformer;
        assert!(!asset.has_capacity_edge());
    }
}
