//! Headless playground for type-inference and subtyping engines.
//!
//! The inference logic itself lives in an external command-style engine
//! module. This crate shapes requests for it, normalizes what it prints,
//! and models the interactive side: derivation forests addressed by
//! positional paths, a selection machine shared by a tree view and a
//! linear view, and a comparison grid over algorithms and expressions.

pub mod api;
pub mod runtime;
