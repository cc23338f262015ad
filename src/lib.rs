//! Object-file differencing engine for binary kernel hot-patches.
//!
//! Given a base and a patched relocatable object file compiled from two
//! versions of the same translation unit, [`pipeline::run`] produces a
//! third relocatable object containing only the functions that changed,
//! together with the minimal transitive closure of data, relocations
//! and symbol/string-table entries required for that reduced object to
//! link against the original image.

pub mod cli;
pub mod closure;
pub mod compare;
pub mod config;
pub mod correlate;
pub mod elfio;
pub mod emit;
pub mod error;
pub mod inventory;
pub mod loader;
pub mod logging;
pub mod model;
pub mod pipeline;
pub mod substitute;
pub mod synthesize;
pub mod validate;
