//! Command-line front end for the `pagecheck` library.
//!
//! The binary lives in `main.rs`; everything it dispatches to is here so the
//! integration tests can drive the same code paths.

pub mod check;
pub mod cli;
pub mod error;
pub mod inspect;
pub mod logger;
pub mod output;
pub mod settings;
pub mod zipalign;
