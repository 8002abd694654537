//! Business Services
//!
//! The object-graph mapping layer proper:
//!
//! - `GraphStore` - owns the session, creates models
//! - `Model` - node class per label: creation, finds, removal
//! - `Node` - save and relation operations on one node
//! - `ProvisionReport` - outcome of constraint/index provisioning
//!
//! Every operation returns `Result<_, OgmError>`.

pub mod error;
pub mod model;
pub mod node;
pub mod provision;
pub mod store;

pub use error::OgmError;
pub use model::Model;
pub use node::{Node, NodeData, Relationship};
pub use provision::ProvisionReport;
pub use store::GraphStore;
