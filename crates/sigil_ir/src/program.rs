//! The program store holding everything the linker has materialized.

use crate::arena::Arena;
use crate::decl::Declaration;
use crate::expr::Loop;
use crate::ids::{DeclId, FileId, LoopId, ModuleId, SymbolId};
use crate::symbol::{SymbolOwner, SymbolTable};

/// A linked module.
#[derive(Clone, Debug)]
pub struct IrModule {
    /// Module name.
    pub name: String,
    /// Files of the module that took part in linking.
    pub files: Vec<FileId>,
}

/// A linked file.
#[derive(Clone, Debug)]
pub struct IrFile {
    /// File name as recorded in the archive.
    pub name: String,
    /// Package of the file.
    pub package: String,
    /// Owning module.
    pub module: ModuleId,
    /// Top-level declarations, in the order they were bound.
    pub declarations: Vec<DeclId>,
}

/// Everything materialized during one linking session.
///
/// Only reachable declarations are ever stored here. Each file's
/// `declarations` lists its top levels in binding order, which depends on
/// discovery order and is not meaningful to consumers.
#[derive(Debug, Default)]
pub struct Program {
    /// Signature-to-symbol map and symbol storage.
    pub symbols: SymbolTable,
    /// All declarations, top-level and nested.
    pub decls: Arena<DeclId, Declaration>,
    /// All loops.
    pub loops: Arena<LoopId, Loop>,
    /// All files.
    pub files: Arena<FileId, IrFile>,
    /// All modules.
    pub modules: Arena<ModuleId, IrModule>,
    /// Stub declarations generated for unlinked symbols.
    pub stubs: Vec<DeclId>,
}

impl Program {
    /// Creates an empty program.
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers a module.
    pub fn add_module(&mut self, name: impl Into<String>) -> ModuleId {
        self.modules.alloc(IrModule {
            name: name.into(),
            files: Vec::new(),
        })
    }

    /// Registers a file in a module.
    pub fn add_file(
        &mut self,
        module: ModuleId,
        name: impl Into<String>,
        package: impl Into<String>,
    ) -> FileId {
        let id = self.files.alloc(IrFile {
            name: name.into(),
            package: package.into(),
            module,
            declarations: Vec::new(),
        });
        self.modules[module].files.push(id);
        id
    }

    /// Stores a declaration and binds its symbol to it.
    pub fn add_declaration(&mut self, decl: Declaration) -> sigil_common::SigilResult<DeclId> {
        let symbol = decl.symbol;
        let id = self.decls.alloc(decl);
        self.symbols.bind(symbol, SymbolOwner::Decl(id))?;
        Ok(id)
    }

    /// Stores a declaration and lists it as a top level of `file`.
    pub fn add_top_level(
        &mut self,
        file: FileId,
        mut decl: Declaration,
    ) -> sigil_common::SigilResult<DeclId> {
        decl.file = Some(file);
        decl.parent = None;
        let id = self.add_declaration(decl)?;
        self.files[file].declarations.push(id);
        Ok(id)
    }

    /// Returns the declaration a symbol finally resolves to.
    pub fn declaration_of(&self, symbol: SymbolId) -> Option<&Declaration> {
        match self.symbols.resolved_owner(symbol)? {
            SymbolOwner::Decl(id) => Some(&self.decls[id]),
            SymbolOwner::File(_) => None,
        }
    }

    /// Returns the declaration id a symbol finally resolves to.
    pub fn declaration_id_of(&self, symbol: SymbolId) -> Option<DeclId> {
        match self.symbols.resolved_owner(symbol)? {
            SymbolOwner::Decl(id) => Some(id),
            SymbolOwner::File(_) => None,
        }
    }

    /// Looks up a module by name.
    pub fn module_by_name(&self, name: &str) -> Option<ModuleId> {
        self.modules
            .iter()
            .find(|(_, m)| m.name == name)
            .map(|(id, _)| id)
    }

    /// Number of top-level declarations across all files.
    pub fn top_level_count(&self) -> usize {
        self.files.values().map(|f| f.declarations.len()).sum()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::decl::{DeclKind, DeclOrigin};
    use crate::signature::Signature;
    use crate::symbol::SymbolKind;
    use crate::types::IrType;
    use sigil_common::Interner;

    #[test]
    fn top_level_binds_symbol_and_lists_in_file() {
        let interner = Interner::new();
        let mut program = Program::new();
        let module = program.add_module("lib");
        let file = program.add_file(module, "a.kt", "pkg");

        let sig = Signature::public("pkg", "Alias");
        let sym = program.symbols.reference(&sig, SymbolKind::TypeAlias);
        let decl = Declaration::new(
            sym,
            interner.get_or_intern("Alias"),
            DeclKind::TypeAlias {
                type_parameters: Vec::new(),
                expanded: IrType::Dynamic,
            },
            DeclOrigin::Deserialized,
        );
        let id = program.add_top_level(file, decl).unwrap();

        assert_eq!(program.declaration_id_of(sym), Some(id));
        assert_eq!(program.decls[id].file, Some(file));
        assert_eq!(program.files[file].declarations, vec![id]);
        assert_eq!(program.module_by_name("lib"), Some(module));
        assert_eq!(program.top_level_count(), 1);
    }
}
