//! Symbols and the session-wide symbol table.
//!
//! Every IR reference goes through a [`SymbolId`]. A symbol is created unbound
//! the first time its signature is referenced and bound exactly once when its
//! owning declaration is materialized. Symbols for `expect` signatures are
//! delegating: they carry a [`OnceCell`] that the actualization pass sets to
//! the paired actual symbol, after which [`SymbolTable::target`] forwards to it.

use crate::arena::Arena;
use crate::ids::{DeclId, FileId, SymbolId};
use crate::signature::Signature;
use serde::{Deserialize, Serialize};
use sigil_common::{InternalError, SigilResult};
use std::cell::OnceCell;
use std::collections::HashMap;
use std::fmt;

/// The kind of declaration a symbol stands for.
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Debug, Serialize, Deserialize)]
pub enum SymbolKind {
    /// A class, interface or object.
    Class,
    /// A class constructor.
    Constructor,
    /// A function or property accessor.
    Function,
    /// A property.
    Property,
    /// A backing field.
    Field,
    /// An enum entry.
    EnumEntry,
    /// A type alias.
    TypeAlias,
    /// A type parameter.
    TypeParameter,
    /// A value parameter.
    ValueParameter,
    /// A local variable.
    Variable,
    /// A file.
    File,
}

impl SymbolKind {
    /// Returns `true` for kinds that own an executable body.
    pub fn is_function_like(self) -> bool {
        matches!(self, SymbolKind::Function | SymbolKind::Constructor)
    }
}

impl fmt::Display for SymbolKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            SymbolKind::Class => "class",
            SymbolKind::Constructor => "constructor",
            SymbolKind::Function => "function",
            SymbolKind::Property => "property",
            SymbolKind::Field => "field",
            SymbolKind::EnumEntry => "enum entry",
            SymbolKind::TypeAlias => "type alias",
            SymbolKind::TypeParameter => "type parameter",
            SymbolKind::ValueParameter => "value parameter",
            SymbolKind::Variable => "variable",
            SymbolKind::File => "file",
        };
        f.write_str(name)
    }
}

/// What a bound symbol points at.
#[derive(Clone, Copy, PartialEq, Eq, Hash, Debug)]
pub enum SymbolOwner {
    /// A declaration.
    Decl(DeclId),
    /// A file (for file signatures).
    File(FileId),
}

/// How a symbol came to exist.
#[derive(Clone, Copy, PartialEq, Eq, Hash, Debug)]
pub enum SymbolOrigin {
    /// Created by a reference or declaration during linking.
    Linked,
    /// Substituted for a reference whose kind did not match.
    KindSubstitute,
    /// Points at a generated stub declaration.
    Stub,
}

/// Per-symbol storage.
#[derive(Debug)]
pub struct SymbolData {
    /// The declaration kind this symbol stands for.
    pub kind: SymbolKind,
    /// The signature this symbol was created for, if any.
    pub signature: Option<Signature>,
    /// How the symbol came to exist.
    pub origin: SymbolOrigin,
    owner: Option<SymbolOwner>,
    delegate: Option<OnceCell<SymbolId>>,
}

impl SymbolData {
    /// Returns the symbol's own binding, ignoring any delegate.
    pub fn owner(&self) -> Option<SymbolOwner> {
        self.owner
    }

    /// Returns `true` if the symbol is bound to an owner.
    pub fn is_bound(&self) -> bool {
        self.owner.is_some()
    }

    /// Returns `true` if this symbol forwards through a delegate cell.
    pub fn is_delegating(&self) -> bool {
        self.delegate.is_some()
    }
}

/// The kinds involved when an existing symbol is claimed with another kind.
#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub struct KindConflict {
    /// The symbol already registered for the signature.
    pub existing: SymbolId,
    /// Its kind.
    pub found: SymbolKind,
    /// The kind that was asked for.
    pub expected: SymbolKind,
}

/// Session-wide map from signatures to symbols.
///
/// Public signatures are globally unique, so one table serves every module.
/// Local signatures are keyed by the file-level resolvers in the linker and
/// only use [`new_symbol`](Self::new_symbol).
#[derive(Debug, Default)]
pub struct SymbolTable {
    symbols: Arena<SymbolId, SymbolData>,
    by_signature: HashMap<Signature, SymbolId>,
    substitutes: HashMap<(Signature, SymbolKind), SymbolId>,
}

impl SymbolTable {
    /// Creates an empty table.
    pub fn new() -> Self {
        Self::default()
    }

    /// Allocates a fresh unbound symbol that is not registered by signature.
    pub fn new_symbol(&mut self, kind: SymbolKind, signature: Option<Signature>) -> SymbolId {
        let delegate = signature
            .as_ref()
            .filter(|s| s.is_expect())
            .map(|_| OnceCell::new());
        self.symbols.alloc(SymbolData {
            kind,
            signature,
            origin: SymbolOrigin::Linked,
            owner: None,
            delegate,
        })
    }

    /// Returns the symbol registered for `signature`.
    pub fn lookup(&self, signature: &Signature) -> Option<SymbolId> {
        self.by_signature.get(signature).copied()
    }

    /// Returns the symbol registered for `signature`, creating an unbound
    /// one of `kind` if none exists. The existing symbol is returned even if
    /// its kind differs; callers check kinds at the use site.
    pub fn reference(&mut self, signature: &Signature, kind: SymbolKind) -> SymbolId {
        if let Some(existing) = self.lookup(signature) {
            return existing;
        }
        let id = self.new_symbol(kind, Some(signature.clone()));
        self.by_signature.insert(signature.clone(), id);
        id
    }

    /// Returns the symbol a declaration of `kind` should bind for `signature`.
    pub fn declare(&mut self, signature: &Signature, kind: SymbolKind) -> Result<SymbolId, KindConflict> {
        let id = self.reference(signature, kind);
        let found = self.symbols[id].kind;
        if found != kind {
            return Err(KindConflict {
                existing: id,
                found,
                expected: kind,
            });
        }
        Ok(id)
    }

    /// Makes the `kind` symbol of `signature` the registered one, for a
    /// declaration whose kind differs from the first reference.
    ///
    /// The cached substitute of `kind` is reused if references made one, so
    /// every use of `signature` as a `kind` ends up on the declared symbol
    /// whichever reference came first. The previously registered symbol
    /// becomes the substitute for its own kind and keeps its references.
    pub fn promote(&mut self, signature: &Signature, kind: SymbolKind) -> SymbolId {
        let id = match self.substitutes.remove(&(signature.clone(), kind)) {
            Some(id) => {
                self.symbols[id].origin = SymbolOrigin::Linked;
                id
            }
            None => self.new_symbol(kind, Some(signature.clone())),
        };
        if let Some(previous) = self.by_signature.insert(signature.clone(), id) {
            if previous != id {
                let demoted = &mut self.symbols[previous];
                if demoted.origin == SymbolOrigin::Linked {
                    demoted.origin = SymbolOrigin::KindSubstitute;
                }
                self.substitutes.entry((signature.clone(), demoted.kind)).or_insert(previous);
            }
        }
        id
    }

    /// Returns the cached substitute of `kind` for `signature`, creating it
    /// on first use. Substitutes stay unbound and are never registered by
    /// signature.
    pub fn substitute(&mut self, signature: &Signature, kind: SymbolKind) -> SymbolId {
        let key = (signature.clone(), kind);
        if let Some(&id) = self.substitutes.get(&key) {
            return id;
        }
        let id = self.new_symbol(kind, Some(signature.clone()));
        self.symbols[id].origin = SymbolOrigin::KindSubstitute;
        self.substitutes.insert(key, id);
        id
    }

    /// Binds `symbol` to its owner.
    pub fn bind(&mut self, symbol: SymbolId, owner: SymbolOwner) -> SigilResult<()> {
        let data = &mut self.symbols[symbol];
        if let Some(previous) = data.owner {
            return Err(InternalError::new(format!(
                "symbol {} already bound to {previous:?}",
                describe(data)
            )));
        }
        data.owner = Some(owner);
        Ok(())
    }

    /// Marks a symbol as pointing at a generated stub.
    pub fn mark_stub(&mut self, symbol: SymbolId) {
        self.symbols[symbol].origin = SymbolOrigin::Stub;
    }

    /// Sets the delegate of an `expect` symbol. Fails if the symbol is not
    /// delegating or was already retargeted.
    pub fn retarget(&mut self, symbol: SymbolId, target: SymbolId) -> SigilResult<()> {
        let data = &self.symbols[symbol];
        let cell = data.delegate.as_ref().ok_or_else(|| {
            InternalError::new(format!("symbol {} is not delegating", describe(data)))
        })?;
        cell.set(target).map_err(|_| {
            InternalError::new(format!("symbol {} retargeted twice", describe(data)))
        })
    }

    /// Follows delegate cells to the symbol that finally provides storage.
    pub fn target(&self, mut symbol: SymbolId) -> SymbolId {
        // Bounded so a delegate cycle cannot hang the caller.
        for _ in 0..self.symbols.len() {
            match self.symbols[symbol].delegate.as_ref().and_then(|c| c.get()) {
                Some(&next) if next != symbol => symbol = next,
                _ => break,
            }
        }
        symbol
    }

    /// Returns the owner of the symbol after following delegates.
    pub fn resolved_owner(&self, symbol: SymbolId) -> Option<SymbolOwner> {
        self.symbols[self.target(symbol)].owner
    }

    /// Returns `true` if the symbol is bound after following delegates.
    pub fn is_bound(&self, symbol: SymbolId) -> bool {
        self.resolved_owner(symbol).is_some()
    }

    /// Returns `true` if `symbol` was created by this table.
    pub fn contains(&self, symbol: SymbolId) -> bool {
        self.symbols.contains(symbol)
    }

    /// Returns the symbol's storage.
    pub fn get(&self, symbol: SymbolId) -> &SymbolData {
        &self.symbols[symbol]
    }

    /// Returns every symbol whose own binding is still missing, in creation order.
    pub fn unbound(&self) -> Vec<SymbolId> {
        self.symbols
            .iter()
            .filter(|(_, data)| data.owner.is_none() && data.kind != SymbolKind::File)
            .map(|(id, _)| id)
            .collect()
    }

    /// Iterates over all symbols in creation order.
    pub fn iter(&self) -> impl Iterator<Item = (SymbolId, &SymbolData)> {
        self.symbols.iter()
    }

    /// Number of symbols.
    pub fn len(&self) -> usize {
        self.symbols.len()
    }

    /// Returns `true` if no symbol exists.
    pub fn is_empty(&self) -> bool {
        self.symbols.is_empty()
    }
}

fn describe(data: &SymbolData) -> String {
    match &data.signature {
        Some(sig) => format!("`{sig}`"),
        None => format!("<local {}>", data.kind),
    }
}
