//! mvs-graph: bus/asset graph handed to the optimizer.
//!
//! Provides:
//! - Core graph data structures (Bus, AssetComponent, Port)
//! - Incremental graph builder with validation
//! - Assembly from a normalized project model
//! - The optimizer seam (edge keys, solver output, `Optimizer` trait)
//!
//! # Example
//!
//! ```
//! use mvs_graph::{AssetSpec, GraphBuilder};
//! use mvs_project::{AssetGroup, AssetType};
//!
//! let mut builder = GraphBuilder::new();
//! let el = builder.add_bus("Electricity bus");
//! builder.add_asset(
//!     AssetSpec {
//!         label: "pv".into(),
//!         group: AssetGroup::Production,
//!         asset_type: AssetType::Source,
//!         optimize_cap: true,
//!     },
//!     None,
//!     Some(el),
//! );
//! let graph = builder.build().unwrap();
//!
//! assert_eq!(graph.busses().len(), 1);
//! assert_eq!(graph.edges().len(), 1);
//! ```

pub mod assemble;
pub mod builder;
pub mod error;
pub mod graph;
pub mod solve;
pub(crate) mod validate;

pub use assemble::assemble_graph;
pub use builder::{AssetSpec, GraphBuilder};
pub use error::{GraphError, GraphResult};
pub use graph::{AssetComponent, AssetEdges, Bus, EnergyGraph, Port, PortKind};
pub use solve::{
    EdgeKey, EdgeKind, Optimizer, SolveError, SolveMeta, SolveOutput, SolveOutputRecord,
    VariableRecord,
};
