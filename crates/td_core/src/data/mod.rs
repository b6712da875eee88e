//! Data structures for map configuration.
//!
//! Maps are plain data designed to be deserialized from RON. Parsing from a
//! string lives here; reading files is left to the binaries.

mod map_data;

pub use map_data::{MapCatalog, MapData, DEFAULT_MAP};
