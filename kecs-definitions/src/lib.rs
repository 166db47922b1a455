//! Data model and shared plumbing for the kecs control plane.
//!
//! This crate has no Kubernetes or HTTP dependency of its own: it owns the
//! ECS-shaped entities, their ARNs, the validation/merge rules that apply to
//! them, and the small HTTP client every integration uses to reach the
//! co-deployed AWS emulation backend. `kecs-server` builds on top of this.

pub mod arn;
pub mod client;
pub mod config;
pub mod error;
pub mod math;
pub mod merge;
pub mod pagination;
pub mod states;
pub mod structs;

pub use arn::Arn;
pub use error::{ApiError, Result};
pub use states::{ClusterStatus, ServiceStatus, TaskLifecycle};
