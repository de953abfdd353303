//! Provider-facing descriptors (data) and strategies (behavior).
//!
//! `descriptor` exposes validated endpoint metadata (`ProviderDescriptor`) for the identity
//! provider's authorize, token, and identity endpoints. `strategy` defines
//! [`ProviderStrategy`], an HTTP-client-agnostic hook that maps token endpoint failures into
//! the session error taxonomy.

pub mod descriptor;
pub mod strategy;

pub use descriptor::*;
pub use strategy::*;
