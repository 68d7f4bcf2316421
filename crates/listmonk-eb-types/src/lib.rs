//! listmonk-eb Types - Provisioning descriptors
//!
//! The plan for a listmonk deployment is a set of declared resources wired
//! together by references. This crate holds the vocabulary those resources
//! are written in; the builders that produce them live in `listmonk-eb-plan`.
//!
//! ## Key Concepts
//!
//! - **LogicalId**: Stable, path-derived identifier of a declared resource
//! - **Value / Property**: Configuration values, including references to
//!   other resources and dynamic references to secret fields
//! - **Resource**: One declared resource with its dependency edges
//! - **OptionSettings**: Namespaced environment options, each set once
//! - **StackParameters**: Operator inputs, resolved once before any builder runs

#![deny(unsafe_code)]
#![cfg_attr(feature = "strict-docs", warn(missing_docs))]
#![cfg_attr(not(feature = "strict-docs"), allow(missing_docs))]

pub mod ids;
pub mod network;
pub mod options;
pub mod params;
pub mod resource;
pub mod value;

// Re-export main types
pub use ids::LogicalId;
pub use network::{CidrError, IngressRule, Ipv4Cidr, Peer, Port, SubnetType};
pub use options::{DuplicateOption, OptionSetting, OptionSettings};
pub use params::{
    NetworkSettings, ParameterError, Partition, ResolvedParameters, StackParameters,
    DEFAULT_IMAGE_TAG, REGION,
};
pub use resource::{Component, DeletionPolicy, Resource, ResourceKind};
pub use value::{Properties, Property, Value};
