//! The hostlink command line interface (CLI) crate.
//!
//! This crate implements the `hostlink` command line tool, which loads a
//! WebAssembly module into the standard host environment and calls its
//! exports.

#![deny(missing_docs)]

pub mod commands;

pub(crate) mod common;
