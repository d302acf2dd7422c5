//! Rule card compiler.
//!
//! This crate provides:
//! - Schema validation of raw rule card YAML with suggestions
//! - Selector resolution confined to a trusted source root
//! - Safe YAML loading that strips tags instead of constructing objects
//! - Scope filtering, detection hook aggregation and SHA-256 source digests
//! - A driver that builds one JSON package per manifest agent

pub mod digest;
pub mod driver;
pub mod hooks;
pub mod loader;
pub mod resolver;
pub mod schema;
pub mod scope;

pub use driver::{Compiler, CompileReport};
