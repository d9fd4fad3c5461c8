//! Low-level helper utilities.

pub mod caller;
pub mod diff;
pub mod json_path;
pub mod natural;
pub mod registry;
pub mod report;
pub mod serializer;
pub mod store;
pub mod symbols;
