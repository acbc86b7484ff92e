//! Core types: outcome model, error taxonomy, schemas, encoding rules and
//! the capability definition shape. Nothing here performs I/O.

pub mod content;
pub mod encoding;
pub mod error;
pub mod schema;
pub mod tool;
