//! Bijective string<->id symbol table, persisted as a JSON side file.
//!
//! Reads never block a concurrent `intern`: the id table lives behind an
//! `ArcSwap`, so a reader holds a cheap `Arc` snapshot of the current
//! generation while a writer builds the next one and swaps it in.

use std::path::Path;
use std::sync::Arc;

use arc_swap::ArcSwap;
use serde::{Deserialize, Serialize};

use crate::error::Result;

/// On-disk shape, exactly spec.md §6's dictionary side-file:
/// `{ "symbols": [[<name>, <id>], ...], "nextId": <u32> }`.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
struct SymbolTableWire {
    symbols: Vec<(String, u32)>,
    #[serde(rename = "nextId")]
    next_id: u32,
}

#[derive(Debug, Clone, Default)]
struct SymbolTable {
    /// `names[id]` is the name that id was assigned. Ids are dense,
    /// assigned in interning order starting at 0.
    names: Vec<String>,
}

impl From<SymbolTableWire> for SymbolTable {
    fn from(wire: SymbolTableWire) -> Self {
        let mut names = vec![String::new(); wire.next_id as usize];
        for (name, id) in wire.symbols {
            if (id as usize) < names.len() {
                names[id as usize] = name;
            }
        }
        SymbolTable { names }
    }
}

impl From<&SymbolTable> for SymbolTableWire {
    fn from(table: &SymbolTable) -> Self {
        SymbolTableWire {
            symbols: table.names.iter().cloned().enumerate().map(|(id, name)| (name, id as u32)).collect(),
            next_id: table.names.len() as u32,
        }
    }
}

pub struct SymbolDictionary {
    table: ArcSwap<SymbolTable>,
}

impl SymbolDictionary {
    pub fn new() -> Self {
        SymbolDictionary { table: ArcSwap::from_pointee(SymbolTable::default()) }
    }

    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let bytes = std::fs::read(path)?;
        let wire: SymbolTableWire = serde_json::from_slice(&bytes)?;
        Ok(SymbolDictionary { table: ArcSwap::from_pointee(SymbolTable::from(wire)) })
    }

    pub fn save<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let snapshot = self.table.load();
        let wire = SymbolTableWire::from(&**snapshot);
        let bytes = serde_json::to_vec_pretty(&wire)?;
        std::fs::write(path, bytes)?;
        Ok(())
    }

    pub fn id_of(&self, name: &str) -> Option<u32> {
        self.table.load().names.iter().position(|n| n == name).map(|i| i as u32)
    }

    pub fn name_of(&self, id: u32) -> Option<String> {
        self.table.load().names.get(id as usize).cloned()
    }

    pub fn len(&self) -> usize {
        self.table.load().names.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// The only way a name enters the dictionary: returns the existing id
    /// if already interned, otherwise assigns the next dense id. Safe under
    /// concurrent callers -- `ArcSwap::rcu` retries the whole read-modify
    /// step if another `intern` swapped in a newer generation first.
    pub fn intern(&self, name: &str) -> u32 {
        let mut assigned = 0u32;
        self.table.rcu(|current| {
            if let Some(pos) = current.names.iter().position(|n| n == name) {
                assigned = pos as u32;
                return Arc::clone(current);
            }
            let mut next = (**current).clone();
            assigned = next.names.len() as u32;
            next.names.push(name.to_string());
            Arc::new(next)
        });
        assigned
    }
}

impl Default for SymbolDictionary {
    fn default() -> Self {
        SymbolDictionary::new()
    }
}
