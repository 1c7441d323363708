//! The signal symbol table
//!
//! An arena of signals and scope nodes addressed by plain indices. The scope
//! hierarchy keeps parent/child links as indices, so there are no reference
//! cycles and no runtime recursion anywhere in the lookup paths.

use crate::types::SignalId;
use std::collections::HashMap;

/// Index of a scope node in the arena
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ScopeId(pub(crate) usize);

/// Value domain of a declared signal
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SignalKind {
    /// Four-state bit vector (`wire`, `reg`, `integer`, ...)
    BitVector,
    /// Floating-point signal (`real`, `realtime`)
    Real,
}

/// A declared signal; immutable once the header is parsed
#[derive(Debug, Clone)]
pub struct Signal {
    /// Arena index of this signal
    pub id: SignalId,
    /// Identifier code as written in the dump
    pub code: String,
    /// Declared name
    pub name: String,
    /// Scope names from the root down to the declaring scope
    pub path: Vec<String>,
    /// Declared bit width; 1 for scalars and reals
    pub width: u32,
    /// Value domain derived from the `$var` type keyword
    pub kind: SignalKind,
    /// `$var` type keyword as written (`wire`, `reg`, `real`, ...)
    pub var_type: String,
    /// Declaring scope; `None` for signals declared outside any scope
    pub scope: Option<ScopeId>,
}

impl Signal {
    /// Dotted hierarchical name, e.g. `top.alu.acc`
    pub fn full_name(&self) -> String {
        if self.path.is_empty() {
            self.name.clone()
        } else {
            format!("{}.{}", self.path.join("."), self.name)
        }
    }
}

/// A node of the scope hierarchy
#[derive(Debug, Clone)]
pub struct Scope {
    /// Scope name; may be empty for anonymous scopes
    pub name: String,
    /// `$scope` kind keyword (`module`, `begin`, ...)
    pub kind: String,
    pub parent: Option<ScopeId>,
    pub children: Vec<ScopeId>,
    pub signals: Vec<SignalId>,
}

/// The queryable signal directory
///
/// Built once during the header parse; the body loop resolves identifier
/// codes through `signal_by_code` and configuration resolves human names
/// through `resolve`.
#[derive(Debug)]
pub struct SignalTable {
    signals: Vec<Signal>,
    scopes: Vec<Scope>,
    roots: Vec<ScopeId>,
    by_code: HashMap<String, SignalId>,
    by_name: HashMap<String, Vec<SignalId>>,
    by_path: HashMap<String, Vec<SignalId>>,
}

impl SignalTable {
    /// Create an empty table
    pub fn new() -> Self {
        Self {
            signals: Vec::new(),
            scopes: Vec::new(),
            roots: Vec::new(),
            by_code: HashMap::new(),
            by_name: HashMap::new(),
            by_path: HashMap::new(),
        }
    }

    /// Append a scope node under `parent` (or as a new root)
    pub(crate) fn add_scope(
        &mut self,
        name: String,
        kind: String,
        parent: Option<ScopeId>,
    ) -> ScopeId {
        let id = ScopeId(self.scopes.len());
        self.scopes.push(Scope {
            name,
            kind,
            parent,
            children: Vec::new(),
            signals: Vec::new(),
        });
        match parent {
            Some(ScopeId(p)) => self.scopes[p].children.push(id),
            None => self.roots.push(id),
        }
        id
    }

    /// Append a signal and index it by code, leaf name and dotted path
    pub(crate) fn add_signal(
        &mut self,
        code: String,
        name: String,
        path: Vec<String>,
        width: u32,
        kind: SignalKind,
        var_type: String,
        scope: Option<ScopeId>,
    ) -> SignalId {
        let id = SignalId(self.signals.len());
        let signal = Signal {
            id,
            code: code.clone(),
            name,
            path,
            width,
            kind,
            var_type,
            scope,
        };
        self.by_code.insert(code, id);
        self.by_name
            .entry(signal.name.clone())
            .or_default()
            .push(id);
        self.by_path.entry(signal.full_name()).or_default().push(id);
        if let Some(ScopeId(s)) = scope {
            self.scopes[s].signals.push(id);
        }
        self.signals.push(signal);
        id
    }

    /// Index an additional name for an already-declared signal (a `$var`
    /// that reuses an earlier identifier code at the same width)
    pub(crate) fn add_alias(&mut self, name: String, path: &[String], target: SignalId) {
        let full = if path.is_empty() {
            name.clone()
        } else {
            format!("{}.{}", path.join("."), name)
        };
        self.by_name.entry(name).or_default().push(target);
        self.by_path.entry(full).or_default().push(target);
    }

    /// Signal by arena index
    pub fn signal(&self, id: SignalId) -> &Signal {
        &self.signals[id.0]
    }

    /// Scope by arena index
    pub fn scope(&self, id: ScopeId) -> &Scope {
        &self.scopes[id.0]
    }

    /// Resolve an identifier code from the dump body
    pub fn signal_by_code(&self, code: &str) -> Option<SignalId> {
        self.by_code.get(code).copied()
    }

    /// Resolve a configured signal name
    ///
    /// Exact dotted-path matches win; otherwise every signal with that leaf
    /// name matches. The returned list is in declaration order.
    pub fn resolve(&self, name: &str) -> Vec<SignalId> {
        let mut ids = self
            .by_path
            .get(name)
            .cloned()
            .or_else(|| self.by_name.get(name).cloned())
            .unwrap_or_default();
        ids.sort_unstable();
        ids.dedup();
        ids
    }

    /// All signals, in declaration order
    pub fn iter(&self) -> impl Iterator<Item = &Signal> {
        self.signals.iter()
    }

    /// All signal ids, in declaration order
    pub fn all_ids(&self) -> Vec<SignalId> {
        (0..self.signals.len()).map(SignalId).collect()
    }

    /// Root scopes, in declaration order
    pub fn root_scopes(&self) -> &[ScopeId] {
        &self.roots
    }

    /// Number of declared signals (aliases resolve to their target and do
    /// not count)
    pub fn len(&self) -> usize {
        self.signals.len()
    }

    pub fn is_empty(&self) -> bool {
        self.signals.is_empty()
    }

    /// Summary statistics for logs and run summaries
    pub fn stats(&self) -> TableStats {
        TableStats {
            num_signals: self.signals.len(),
            num_scopes: self.scopes.len(),
            max_width: self.signals.iter().map(|s| s.width).max().unwrap_or(0),
        }
    }
}

impl Default for SignalTable {
    fn default() -> Self {
        Self::new()
    }
}

/// Symbol table statistics
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TableStats {
    /// Number of distinct signals
    pub num_signals: usize,
    /// Number of scope nodes
    pub num_scopes: usize,
    /// Widest declared signal, in bits
    pub max_width: u32,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_table() -> SignalTable {
        let mut table = SignalTable::new();
        let top = table.add_scope("top".to_string(), "module".to_string(), None);
        let alu = table.add_scope("alu".to_string(), "module".to_string(), Some(top));
        table.add_signal(
            "!".to_string(),
            "clk".to_string(),
            vec!["top".to_string()],
            1,
            SignalKind::BitVector,
            "wire".to_string(),
            Some(top),
        );
        table.add_signal(
            "\"".to_string(),
            "acc".to_string(),
            vec!["top".to_string(), "alu".to_string()],
            8,
            SignalKind::BitVector,
            "reg".to_string(),
            Some(alu),
        );
        table
    }

    #[test]
    fn test_empty_table() {
        let table = SignalTable::new();
        let stats = table.stats();
        assert_eq!(stats.num_signals, 0);
        assert_eq!(stats.num_scopes, 0);
        assert!(table.is_empty());
    }

    #[test]
    fn test_lookup_by_code_and_name() {
        let table = sample_table();
        let acc = table.signal_by_code("\"").unwrap();
        assert_eq!(table.signal(acc).full_name(), "top.alu.acc");
        assert_eq!(table.signal(acc).width, 8);

        assert_eq!(table.resolve("acc"), vec![acc]);
        assert_eq!(table.resolve("top.alu.acc"), vec![acc]);
        assert!(table.resolve("nonexistent").is_empty());
    }

    #[test]
    fn test_scope_tree_links() {
        let table = sample_table();
        assert_eq!(table.root_scopes().len(), 1);
        let top = table.root_scopes()[0];
        assert_eq!(table.scope(top).children.len(), 1);
        let alu = table.scope(top).children[0];
        assert_eq!(table.scope(alu).parent, Some(top));
        assert_eq!(table.scope(alu).signals.len(), 1);
    }

    #[test]
    fn test_alias_resolves_to_target() {
        let mut table = sample_table();
        let acc = table.signal_by_code("\"").unwrap();
        table.add_alias(
            "acc_shadow".to_string(),
            &["top".to_string()],
            acc,
        );
        assert_eq!(table.resolve("acc_shadow"), vec![acc]);
        assert_eq!(table.resolve("top.acc_shadow"), vec![acc]);
        // aliases do not add signals
        assert_eq!(table.stats().num_signals, 2);
    }

    #[test]
    fn test_stats() {
        let table = sample_table();
        let stats = table.stats();
        assert_eq!(stats.num_signals, 2);
        assert_eq!(stats.num_scopes, 2);
        assert_eq!(stats.max_width, 8);
    }
}
