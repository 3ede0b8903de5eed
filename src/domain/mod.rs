// Domain layer: entities and structural rules
pub mod chart;
pub mod node;
pub mod policy;
pub mod role;

pub use chart::{ChartMode, ChartNode};
pub use node::{DepartmentSubtype, HierarchyNode, NodeType};
pub use policy::{DepthExceeded, HierarchyPolicy, DEFAULT_MAX_LEVELS};
pub use role::Role;
