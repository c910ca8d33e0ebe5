//! Assemble the optimizer graph from a normalized project.

use mvs_project::{Asset, AssetGroup, AssetType, ProjectModel};
use tracing::{debug, info};

use crate::builder::{AssetSpec, GraphBuilder};
use crate::error::{GraphError, GraphResult};
use crate::graph::EnergyGraph;

/// Busses first, in order of first reference, then assets group by group:
/// conversion, storage, production, consumption. Fix-cost items never enter
/// the graph; providers take part through their expanded assets.
pub fn assemble_graph(model: &ProjectModel) -> GraphResult<EnergyGraph> {
    let mut builder = GraphBuilder::new();

    let bus_refs = model
        .energy_conversion
        .values()
        .map(|a| (&a.input_bus_name, &a.output_bus_name))
        .chain(
            model
                .energy_storage
                .values()
                .map(|s| (&s.input_bus_name, &s.output_bus_name)),
        )
        .chain(
            model
                .energy_production
                .values()
                .chain(model.energy_consumption.values())
                .map(|a| (&a.input_bus_name, &a.output_bus_name)),
        );
    for (input, output) in bus_refs {
        for label in [input, output].into_iter().flatten() {
            if builder.find_bus(label).is_none() {
                builder.add_bus(label.clone());
            }
        }
    }

    for group in [AssetGroup::Conversion, AssetGroup::Production, AssetGroup::Consumption] {
        let assets = model.group(group).into_iter().flat_map(|g| g.values());
        for asset in assets {
            let asset_type = check_type(group, &asset.label, &asset.type_asset)?;
            add(&mut builder, asset, group, asset_type)?;
        }
        if group == AssetGroup::Conversion {
            add_storages(&mut builder, model)?;
        }
    }

    let graph = builder.build()?;
    info!(
        busses = graph.busses().len(),
        assets = graph.assets().len(),
        "Energy system graph assembled"
    );
    Ok(graph)
}

fn add(
    builder: &mut GraphBuilder,
    asset: &Asset,
    group: AssetGroup,
    asset_type: AssetType,
) -> GraphResult<()> {
    let input = lookup_bus(builder, asset.input_bus_name.as_deref());
    let output = lookup_bus(builder, asset.output_bus_name.as_deref());
    if input.is_none() && output.is_none() {
        return Err(GraphError::MissingBusDirection {
            asset: asset.label.clone(),
        });
    }
    debug!(asset = %asset.label, %group, "Adding asset to graph");
    builder.add_asset(
        AssetSpec {
            label: asset.label.clone(),
            group,
            asset_type,
            optimize_cap: asset.optimizes_capacity(),
        },
        input,
        output,
    );
    Ok(())
}

fn add_storages(builder: &mut GraphBuilder, model: &ProjectModel) -> GraphResult<()> {
    for storage in model.energy_storage.values() {
        let asset_type = check_type(AssetGroup::Storage, &storage.label, &storage.type_asset)?;
        if storage.components.is_none() {
            return Err(GraphError::UnresolvedStorage {
                label: storage.label.clone(),
            });
        }
        let input = lookup_bus(builder, storage.input_bus_name.as_deref());
        let output = lookup_bus(builder, storage.output_bus_name.as_deref());
        if input.is_none() || output.is_none() {
            return Err(GraphError::MissingBusDirection {
                asset: storage.label.clone(),
            });
        }
        builder.add_asset(
            AssetSpec {
                label: storage.label.clone(),
                group: AssetGroup::Storage,
                asset_type,
                optimize_cap: storage.optimizes_capacity(),
            },
            input,
            output,
        );
    }
    Ok(())
}

fn lookup_bus(builder: &GraphBuilder, label: Option<&str>) -> Option<mvs_core::BusId> {
    label.and_then(|l| builder.find_bus(l))
}

/// The type tag must parse and be the one the group admits.
pub fn check_type(group: AssetGroup, label: &str, tag: &str) -> GraphResult<AssetType> {
    let parsed = AssetType::parse(tag).ok_or_else(|| GraphError::UnknownAssetType {
        label: label.to_string(),
        group,
        type_asset: tag.to_string(),
    })?;
    match group.accepted_type() {
        Some(expected) if expected != parsed => Err(GraphError::AssetGroupMismatch {
            label: label.to_string(),
            group,
            type_asset: tag.to_string(),
            expected: expected.as_str(),
        }),
        _ => Ok(parsed),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unknown_tag() {
        assert!(matches!(
            check_type(AssetGroup::Production, "pv", "solar"),
            Err(GraphError::UnknownAssetType { .. })
        ));
    }

    #[test]
    fn wrong_group() {
        let err = check_type(AssetGroup::Consumption, "demand", "source").unwrap_err();
        assert!(err.to_string().contains("only sink is allowed"));
    }

    #[test]
    fn accepted_tag() {
        assert_eq!(
            check_type(AssetGroup::Storage, "battery", "storage").unwrap(),
            AssetType::Storage
        );
    }
}
