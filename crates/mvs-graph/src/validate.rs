//! Graph validation logic.

use std::collections::HashSet;

use mvs_core::PortId;

use crate::error::{GraphError, GraphResult};
use crate::graph::{AssetComponent, Bus, Port, PortKind};

/// All references exist, labels are unique and every asset is attached to
/// at least one bus.
pub(crate) fn validate_structure(
    busses: &[Bus],
    assets: &[AssetComponent],
    ports: &[Port],
) -> GraphResult<()> {
    let mut labels = HashSet::new();
    for bus in busses {
        if !labels.insert(bus.label.as_str()) {
            return Err(GraphError::DuplicateBus {
                label: bus.label.clone(),
            });
        }
    }
    let mut labels = HashSet::new();
    for asset in assets {
        if !labels.insert(asset.label.as_str()) {
            return Err(GraphError::DuplicateAsset {
                label: asset.label.clone(),
            });
        }
    }

    for (i, port) in ports.iter().enumerate() {
        if port.id.index() as usize != i {
            return Err(GraphError::InconsistentAdjacency {
                port: port.id,
                bus: port.bus,
            });
        }
        if port.bus.index() as usize >= busses.len() {
            return Err(GraphError::InvalidBusRef {
                port: port.id,
                bus: port.bus,
            });
        }
        if port.asset.index() as usize >= assets.len() {
            return Err(GraphError::InvalidAssetRef {
                port: port.id,
                asset: port.asset,
            });
        }
    }

    for asset in assets {
        if asset.inlet.is_none() && asset.outlet.is_none() {
            return Err(GraphError::MissingBusDirection {
                asset: asset.label.clone(),
            });
        }
        let slots = [(asset.inlet, PortKind::Inlet), (asset.outlet, PortKind::Outlet)];
        for (slot, kind) in slots {
            let Some(port_id) = slot else { continue };
            let Some(port) = ports.get(port_id.index() as usize) else {
                return Err(GraphError::InvalidAssetRef {
                    port: port_id,
                    asset: asset.id,
                });
            };
            if port.asset != asset.id {
                return Err(GraphError::PortAssetMismatch {
                    port: port_id,
                    expected: asset.id,
                    actual: port.asset,
                });
            }
            if port.kind != kind {
                return Err(GraphError::PortKindMismatch {
                    port: port_id,
                    asset: asset.id,
                });
            }
        }
    }

    Ok(())
}

/// Every port appears in exactly one bus list, the one of its own bus.
pub(crate) fn validate_adjacency(
    busses: &[Bus],
    ports: &[Port],
    bus_port_offsets: &[usize],
    bus_ports: &[PortId],
) -> GraphResult<()> {
    if bus_port_offsets.len() != busses.len() + 1 {
        return Err(GraphError::InconsistentAdjacency {
            port: PortId::from_index(0),
            bus: busses.first().map_or(PortId::from_index(0), |b| b.id),
        });
    }

    for bus in busses {
        let idx = bus.id.index() as usize;
        let start = bus_port_offsets[idx];
        let end = bus_port_offsets[idx + 1];
        for &port_id in &bus_ports[start..end] {
            let Some(port) = ports.get(port_id.index() as usize) else {
                return Err(GraphError::InconsistentAdjacency {
                    port: port_id,
                    bus: bus.id,
                });
            };
            if port.bus != bus.id {
                return Err(GraphError::InconsistentAdjacency {
                    port: port_id,
                    bus: bus.id,
                });
            }
        }
    }

    let mut seen: HashSet<PortId> = HashSet::new();
    for &port_id in bus_ports {
        if !seen.insert(port_id) {
            let bus = ports
                .get(port_id.index() as usize)
                .map_or(PortId::from_index(0), |p| p.bus);
            return Err(GraphError::InconsistentAdjacency { port: port_id, bus });
        }
    }
    for port in ports {
        if !seen.contains(&port.id) {
            return Err(GraphError::InconsistentAdjacency {
                port: port.id,
                bus: port.bus,
            });
        }
    }

    Ok(())
}
