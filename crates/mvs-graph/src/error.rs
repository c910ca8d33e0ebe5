//! Graph-specific error types.

use mvs_core::{AssetId, BusId, PortId};
use mvs_project::AssetGroup;

pub type GraphResult<T> = Result<T, GraphError>;

/// Graph assembly and validation errors. All of them are fatal and raised
/// before anything is handed to the optimizer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum GraphError {
    /// A port refers to a bus that doesn't exist.
    InvalidBusRef { port: PortId, bus: BusId },

    /// A port refers to an asset that doesn't exist.
    InvalidAssetRef { port: PortId, asset: AssetId },

    /// A port's asset field doesn't match the asset holding it.
    PortAssetMismatch {
        port: PortId,
        expected: AssetId,
        actual: AssetId,
    },

    /// An inlet slot holds an outlet port or the other way round.
    PortKindMismatch { port: PortId, asset: AssetId },

    /// Port in a bus adjacency list that doesn't reference that bus.
    InconsistentAdjacency { port: PortId, bus: BusId },

    DuplicateBus { label: String },

    DuplicateAsset { label: String },

    /// Neither an input nor an output bus.
    MissingBusDirection { asset: String },

    UnknownAssetType {
        label: String,
        group: AssetGroup,
        type_asset: String,
    },

    AssetGroupMismatch {
        label: String,
        group: AssetGroup,
        type_asset: String,
        expected: &'static str,
    },

    /// Storage sub-records were never resolved by normalization.
    UnresolvedStorage { label: String },
}

impl std::fmt::Display for GraphError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            GraphError::InvalidBusRef { port, bus } => {
                write!(f, "Port {} refers to non-existent bus {}", port, bus)
            }
            GraphError::InvalidAssetRef { port, asset } => {
                write!(f, "Port {} refers to non-existent asset {}", port, asset)
            }
            GraphError::PortAssetMismatch {
                port,
                expected,
                actual,
            } => {
                write!(
                    f,
                    "Port {} should belong to asset {} but references {}",
                    port, expected, actual
                )
            }
            GraphError::PortKindMismatch { port, asset } => {
                write!(f, "Port {} sits in the wrong slot of asset {}", port, asset)
            }
            GraphError::InconsistentAdjacency { port, bus } => {
                write!(
                    f,
                    "Port {} in bus {}'s adjacency list but doesn't reference that bus",
                    port, bus
                )
            }
            GraphError::DuplicateBus { label } => write!(f, "Duplicate bus {}", label),
            GraphError::DuplicateAsset { label } => write!(f, "Duplicate asset {}", label),
            GraphError::MissingBusDirection { asset } => {
                write!(f, "Asset {} has neither an input nor an output bus", asset)
            }
            GraphError::UnknownAssetType {
                label,
                group,
                type_asset,
            } => {
                write!(
                    f,
                    "Asset {} in {} has unknown type {}",
                    label, group, type_asset
                )
            }
            GraphError::AssetGroupMismatch {
                label,
                group,
                type_asset,
                expected,
            } => {
                write!(
                    f,
                    "Asset {} in {} has type {}, only {} is allowed there",
                    label, group, type_asset, expected
                )
            }
            GraphError::UnresolvedStorage { label } => {
                write!(f, "Storage {} has unresolved sub-records", label)
            }
        }
    }
}

impl std::error::Error for GraphError {}
