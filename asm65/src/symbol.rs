//! Scoped symbol table for labels and identifiers
//!
//! Namespaces form a tree rooted at the global scope. They live in an arena
//! and refer to each other by index; the chain of open `.proc` scopes is a
//! stack of indices with the innermost scope on top.

use std::collections::HashMap;

/// Maximum lexical nesting, the global scope included.
pub const LEVEL_LIMIT: usize = 16;

const GLOBAL: ScopeId = 0;

type ScopeId = usize;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SymbolKind {
    /// A name bound by `name = expr`, or seen but not yet bound.
    Identifier,
    /// An address: `name:`, a `.proc` name, or an assignment of a
    /// relocatable value.
    Label,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Symbol {
    pub kind: SymbolKind,
    pub value: Option<i32>,
}

impl Symbol {
    pub fn identifier(value: Option<i32>) -> Self {
        Self {
            kind: SymbolKind::Identifier,
            value,
        }
    }

    pub fn label(value: Option<i32>) -> Self {
        Self {
            kind: SymbolKind::Label,
            value,
        }
    }

    pub fn is_defined(&self) -> bool {
        self.value.is_some()
    }
}

#[derive(Debug)]
struct Namespace {
    name: String,
    symbols: HashMap<String, Symbol>,
    children: HashMap<String, ScopeId>,
}

impl Namespace {
    fn new(name: &str) -> Self {
        Self {
            name: name.to_string(),
            symbols: HashMap::new(),
            children: HashMap::new(),
        }
    }
}

#[derive(Debug)]
pub struct SymbolTable {
    scopes: Vec<Namespace>,
    chain: Vec<ScopeId>,
}

impl SymbolTable {
    pub fn new() -> Self {
        Self {
            scopes: vec![Namespace::new("global")],
            chain: vec![GLOBAL],
        }
    }

    /// Drops every namespace and symbol, leaving an empty global scope.
    pub fn clear(&mut self) {
        *self = Self::new();
    }

    /// Nesting depth of the current scope; the global scope is level 0.
    pub fn depth(&self) -> usize {
        self.chain.len() - 1
    }

    /// Returns to the global scope without touching any symbol.
    pub fn rewind(&mut self) {
        self.chain.truncate(1);
    }

    fn current(&self) -> ScopeId {
        self.chain[self.chain.len() - 1]
    }

    // ===== Lookup =====

    /// Finds `name` walking the scope chain from the innermost scope outwards.
    pub fn lookup(&self, name: &str) -> Option<Symbol> {
        self.chain
            .iter()
            .rev()
            .find_map(|&id| self.scopes[id].symbols.get(name).copied())
    }

    /// Looks at the current scope only.
    pub fn lookup_local(&self, name: &str) -> Option<Symbol> {
        self.scopes[self.current()].symbols.get(name).copied()
    }

    /// Nearest binding of `name` in the scope chain that carries a value.
    ///
    /// Unbound placeholders left behind by forward references are skipped,
    /// so an inner scope's pending reference does not hide an outer label.
    pub fn resolve_defined(&self, name: &str) -> Option<Symbol> {
        self.chain.iter().rev().find_map(|&id| {
            self.scopes[id]
                .symbols
                .get(name)
                .filter(|symbol| symbol.is_defined())
                .copied()
        })
    }

    // ===== Mutation =====

    pub fn insert(&mut self, name: impl Into<String>, symbol: Symbol) {
        let current = self.current();
        self.scopes[current].symbols.insert(name.into(), symbol);
    }

    /// Removes `name` from the current scope.
    pub fn remove(&mut self, name: &str) -> Option<Symbol> {
        let current = self.current();
        self.scopes[current].symbols.remove(name)
    }

    /// Removes `name` from every namespace of the tree, returning how many
    /// bindings were dropped.
    pub fn remove_everywhere(&mut self, name: &str) -> usize {
        self.scopes
            .iter_mut()
            .filter_map(|scope| scope.symbols.remove(name))
            .count()
    }

    // ===== Scopes =====

    /// Enters the child scope `name`, creating it on first use.
    ///
    /// Returns `false` when the nesting limit would be exceeded.
    pub fn step_into(&mut self, name: &str) -> bool {
        if self.chain.len() >= LEVEL_LIMIT {
            return false;
        }
        let current = self.current();
        let child = match self.scopes[current].children.get(name) {
            Some(&id) => id,
            None => {
                let id = self.scopes.len();
                self.scopes.push(Namespace::new(name));
                self.scopes[current].children.insert(name.to_string(), id);
                id
            }
        };
        self.chain.push(child);
        true
    }

    /// Leaves the current scope. Returns `false` at the global scope.
    pub fn step_out(&mut self) -> bool {
        if self.chain.len() > 1 {
            self.chain.pop();
            true
        } else {
            false
        }
    }

    /// Dotted path of the open scopes, e.g. `main.loop`; empty at global scope.
    pub fn scope_path(&self) -> String {
        self.chain[1..]
            .iter()
            .map(|&id| self.scopes[id].name.as_str())
            .collect::<Vec<_>>()
            .join(".")
    }

    /// Every bound symbol of the tree with its scope-qualified name, sorted
    /// by name.
    pub fn entries(&self) -> Vec<(String, Symbol)> {
        let mut out = Vec::new();
        let mut pending = vec![(GLOBAL, String::new())];
        while let Some((id, prefix)) = pending.pop() {
            let scope = &self.scopes[id];
            for (name, symbol) in &scope.symbols {
                if symbol.is_defined() {
                    out.push((format!("{prefix}{name}"), *symbol));
                }
            }
            for (name, &child) in &scope.children {
                pending.push((child, format!("{prefix}{name}.")));
            }
        }
        out.sort_by(|a, b| a.0.cmp(&b.0));
        out
    }
}

impl Default for SymbolTable {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_lookup_walks_outwards() {
        let mut table = SymbolTable::new();
        table.insert("screen", Symbol::label(Some(0x0400)));
        assert!(table.step_into("main"));
        table.insert("count", Symbol::identifier(Some(3)));

        assert_eq!(table.lookup("screen"), Some(Symbol::label(Some(0x0400))));
        assert_eq!(table.lookup("count"), Some(Symbol::identifier(Some(3))));
        assert_eq!(table.lookup_local("screen"), None);

        assert!(table.step_out());
        assert_eq!(table.lookup("count"), None);
    }

    #[test]
    fn test_inner_scope_shadows_outer() {
        let mut table = SymbolTable::new();
        table.insert("loop", Symbol::label(Some(0x1000)));
        table.step_into("inner");
        table.insert("loop", Symbol::label(Some(0x2000)));
        assert_eq!(table.lookup("loop").and_then(|s| s.value), Some(0x2000));
    }

    #[test]
    fn test_step_into_reuses_namespace() {
        let mut table = SymbolTable::new();
        table.step_into("sub");
        table.insert("local", Symbol::label(Some(0x1234)));
        table.step_out();

        table.step_into("sub");
        assert_eq!(table.lookup("local").and_then(|s| s.value), Some(0x1234));
        assert_eq!(table.scope_path(), "sub");
    }

    #[test]
    fn test_step_out_of_global_is_rejected() {
        let mut table = SymbolTable::new();
        assert!(!table.step_out());
        assert_eq!(table.depth(), 0);
    }

    #[test]
    fn test_nesting_limit() {
        let mut table = SymbolTable::new();
        for level in 1..LEVEL_LIMIT {
            assert!(table.step_into(&format!("p{level}")));
        }
        assert_eq!(table.depth(), LEVEL_LIMIT - 1);
        assert!(!table.step_into("too_deep"));
    }

    #[test]
    fn test_resolve_defined_skips_placeholders() {
        let mut table = SymbolTable::new();
        table.insert("target", Symbol::label(Some(0x1080)));
        table.step_into("proc");
        table.insert("target", Symbol::identifier(None));

        assert_eq!(table.lookup("target"), Some(Symbol::identifier(None)));
        assert_eq!(table.resolve_defined("target"), Some(Symbol::label(Some(0x1080))));
    }

    #[test]
    fn test_remove_everywhere() {
        let mut table = SymbolTable::new();
        table.insert("tmp", Symbol::identifier(Some(1)));
        table.step_into("a");
        table.insert("tmp", Symbol::identifier(Some(2)));
        table.step_out();
        table.step_into("b");
        table.insert("keep", Symbol::identifier(Some(3)));

        assert_eq!(table.remove_everywhere("tmp"), 2);
        assert_eq!(table.lookup("keep"), Some(Symbol::identifier(Some(3))));
        table.rewind();
        assert_eq!(table.lookup("tmp"), None);
    }

    #[test]
    fn test_entries_are_qualified() {
        let mut table = SymbolTable::new();
        table.insert("start", Symbol::label(Some(0x1000)));
        table.insert("pending", Symbol::identifier(None));
        table.step_into("main");
        table.insert("loop", Symbol::label(Some(0x1002)));

        let names: Vec<String> = table.entries().into_iter().map(|(n, _)| n).collect();
        assert_eq!(names, vec!["main.loop".to_string(), "start".to_string()]);
    }
}
