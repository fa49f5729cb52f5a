//! Kubernetes side of the gateway: custom resources, generated manifests and the client used by
//! the reconciliation loop.

pub mod client;
pub mod error;
pub mod labels;
pub mod manifests;
pub mod resources;
