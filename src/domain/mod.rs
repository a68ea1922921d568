//! Domain types for Tokengate.

mod principal;

pub use principal::*;
