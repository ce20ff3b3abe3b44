//! Shipmate Tools
//!
//! The tool layer: the `Tool` trait and `ToolRegistry`, the result size
//! guard, the cluster catalog, the collaborator traits for the external
//! query/document/work-item backends, and the built-in tool set.

pub mod backends;
pub mod builtin;
pub mod clusters;
pub mod context;
pub mod paging;
pub mod size_guard;
pub mod trait_def;

pub use backends::{DocumentStore, QueryExecutor, QueryOptions, WorkItemClient, WorkItemRequest};
pub use builtin::{builtin_tools, BuiltinToolDeps};
pub use clusters::{ClusterCatalog, ClusterConfig};
pub use context::ToolInvocationContext;
pub use size_guard::ChunkPolicy;
pub use trait_def::{FunctionTool, Tool, ToolRegistry, ToolResult};
