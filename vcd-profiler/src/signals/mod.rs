//! Signal directory built from the dump's declaration section
//!
//! VCD dumps are self-describing: the header's `$scope`/`$var` commands are
//! the signal definitions. This module contains the builder that consumes
//! those declarations and the queryable symbol table it produces.

pub mod header;
pub mod table;

// Re-export key types for convenience
pub use table::{Scope, ScopeId, Signal, SignalKind, SignalTable, TableStats};
