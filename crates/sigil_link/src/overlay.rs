//! The incremental overlay: recompiled files replacing their archive copies.

use crate::context::LinkContext;
use crate::error::{LinkError, LinkResult};
use crate::module::ModuleDeserializer;
use sigil_diagnostics::Origin;
use sigil_ir::ids::{DeclId, ModuleId, SymbolId};
use sigil_ir::signature::Signature;
use sigil_ir::symbol::SymbolKind;
use sigil_ir::visit;
use std::collections::{HashMap, HashSet, VecDeque};

/// A file recompiled in this session, with the declarations the front end
/// built for it. The declarations must already be stored in the program.
#[derive(Clone, Debug)]
pub struct DirtyFile {
    /// File name, matching the file's name in the archive.
    pub name: String,
    /// Top-level declarations of the file.
    pub declarations: Vec<DeclId>,
}

/// Wraps a module so dirty files are served from memory.
///
/// The archive's copy of a dirty file is hidden entirely, the in-memory
/// declarations are claimed instead and always reachable, and whatever they
/// reference enters the reachability work-set.
pub struct IncrementalOverlay {
    inner: Box<dyn ModuleDeserializer>,
    dirty: Vec<DirtyFile>,
    claimed: HashMap<Signature, usize>,
    pending: VecDeque<DeclId>,
    requested: HashSet<Signature>,
    id: Option<ModuleId>,
}

impl IncrementalOverlay {
    /// Wraps `inner` with the given dirty files.
    pub fn new(inner: Box<dyn ModuleDeserializer>, dirty: Vec<DirtyFile>) -> Self {
        Self {
            inner,
            dirty,
            claimed: HashMap::new(),
            pending: VecDeque::new(),
            requested: HashSet::new(),
            id: None,
        }
    }

    fn scan(&mut self, cx: &mut LinkContext, module: ModuleId, decl: DeclId) {
        let file = cx.program.decls[decl].file;
        let origin = match file {
            Some(file) => Origin::module(self.inner.name()).with_file(cx.program.files[file].name.clone()),
            None => Origin::module(self.inner.name()),
        };
        for symbol in visit::referenced_symbols(&cx.program, decl) {
            let Some(signature) = cx.program.symbols.get(symbol).signature.clone() else {
                continue;
            };
            if signature.is_local() {
                continue;
            }
            cx.note_expect(&signature, &origin);
            let top = signature.top_level();
            if self.claimed.contains_key(&top) {
                continue;
            }
            if self.requested.insert(top.clone()) {
                cx.request(&top, module);
            }
        }
    }
}

impl ModuleDeserializer for IncrementalOverlay {
    fn name(&self) -> &str {
        self.inner.name()
    }

    fn init(&mut self, id: ModuleId, cx: &mut LinkContext) -> LinkResult<()> {
        self.id = Some(id);
        for dirty in &self.dirty {
            if !self.inner.hide_file(&dirty.name) {
                tracing::debug!(module = %self.inner.name(), file = %dirty.name, "dirty file is new");
            }
        }
        self.inner.init(id, cx)?;

        for (index, dirty) in self.dirty.iter().enumerate() {
            let package = dirty
                .declarations
                .first()
                .and_then(|&d| cx.program.symbols.get(cx.program.decls[d].symbol).signature.clone())
                .and_then(|s| s.package().map(str::to_string))
                .unwrap_or_default();
            let file = cx.program.add_file(id, dirty.name.clone(), package);
            for &decl in &dirty.declarations {
                let symbol = cx.program.decls[decl].symbol;
                let Some(signature) = cx.program.symbols.get(symbol).signature.clone() else {
                    return Err(LinkError::Usage(format!(
                        "dirty declaration in `{}` has no signature",
                        dirty.name
                    )));
                };
                if !signature.is_top_level() {
                    return Err(LinkError::Usage(format!(
                        "dirty declaration `{signature}` in `{}` is not a top level",
                        dirty.name
                    )));
                }
                cx.program.decls[decl].file = Some(file);
                cx.program.decls[decl].parent = None;
                cx.program.files[file].declarations.push(decl);
                self.claimed.insert(signature, index);
                self.pending.push_back(decl);
            }
        }
        tracing::info!(
            module = %self.inner.name(),
            dirty_files = self.dirty.len(),
            declarations = self.claimed.len(),
            "incremental overlay installed"
        );
        Ok(())
    }

    fn contains(&mut self, signature: &Signature) -> LinkResult<bool> {
        if self.claimed.contains_key(signature) {
            return Ok(true);
        }
        self.inner.contains(signature)
    }

    fn enqueue(&mut self, signature: &Signature) -> bool {
        if self.claimed.contains_key(signature) {
            // Dirty declarations are queued at initialization.
            return false;
        }
        self.inner.enqueue(signature)
    }

    fn has_pending(&self) -> bool {
        !self.pending.is_empty() || self.inner.has_pending()
    }

    fn queued(&self) -> Vec<Signature> {
        self.inner.queued()
    }

    fn drain(&mut self, cx: &mut LinkContext) -> LinkResult<()> {
        let module = self.id.ok_or_else(|| {
            LinkError::Usage(format!("module `{}` used before registration", self.inner.name()))
        })?;
        while let Some(decl) = self.pending.pop_front() {
            self.scan(cx, module, decl);
        }
        self.inner.drain(cx)
    }

    fn file_of(&self, signature: &Signature) -> Option<String> {
        match self.claimed.get(signature) {
            Some(&index) => Some(self.dirty[index].name.clone()),
            None => self.inner.file_of(signature),
        }
    }

    fn hide_file(&mut self, name: &str) -> bool {
        self.inner.hide_file(name)
    }

    fn reference_local(
        &mut self,
        cx: &mut LinkContext,
        file: &str,
        signature: &Signature,
        kind: SymbolKind,
    ) -> LinkResult<Option<SymbolId>> {
        if self.dirty.iter().any(|d| d.name == file) {
            return Ok(None);
        }
        self.inner.reference_local(cx, file, signature, kind)
    }
}
