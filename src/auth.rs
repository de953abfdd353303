//! Session-domain identifiers, token handles, and persisted session records.

pub mod id;
pub mod record;
pub mod token;

pub use id::*;
pub use record::*;
pub use token::*;
