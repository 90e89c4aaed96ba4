//! Thin HTTP adapter (component H, §10) around the drift-detection core.
//! Split into a library target so integration tests can build the router
//! directly instead of shelling out to the binary.

pub mod error;
pub mod routes;
pub mod state;
