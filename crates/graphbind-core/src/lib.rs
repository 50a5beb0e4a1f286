pub mod id;
pub mod error;
pub mod handle_table;
pub mod registry;
pub mod attr;
pub mod subgraph;
pub mod graph;
pub mod teardown;
pub mod layout;
pub mod session;

// Re-export commonly used types
pub use id::{EdgeId, EdgeRef, GraphId, GraphRef, Handle, NodeId, NodeRef, ObjectKind, RootId};
pub use error::CoreError;
pub use attr::{AttrKind, AttributeNamespace, EDGE_KEY};
pub use graph::{AttrTarget, GraphHierarchy, GraphKind};
pub use layout::{LayoutConfig, LayoutEngine, LayoutOutcome, LayoutRegistry, NopMode, Point};
pub use registry::{CommandBinder, CommandTable, Registries};
pub use session::Session;
pub use teardown::{TeardownPlan, TeardownReport};
