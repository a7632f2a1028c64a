//! Module deserializers: the per-library units the linker routes signatures to.

use crate::context::LinkContext;
use crate::decoder;
use crate::error::{LinkError, LinkResult};
use crate::file::FileState;
use crate::strategy::StrategyResolver;
use sigil_archive::Archive;
use sigil_ir::ids::{ModuleId, SymbolId};
use sigil_ir::signature::Signature;
use sigil_ir::symbol::SymbolKind;
use std::collections::HashMap;

/// A source of top-level declarations taking part in linking.
///
/// The linker asks [`contains`](Self::contains) to route a reachable top
/// level, [`enqueue`](Self::enqueue)s it on the claiming module and calls
/// [`drain`](Self::drain) until no module has pending work. Decoding pushes
/// newly reachable signatures into the context; the linker routes them.
pub trait ModuleDeserializer {
    /// Module name, unique within a linking session.
    fn name(&self) -> &str;

    /// Called once when the module is registered. Queues the top levels
    /// that load without being referenced.
    fn init(&mut self, id: ModuleId, cx: &mut LinkContext) -> LinkResult<()>;

    /// Returns `true` if this module supplies top level `signature`.
    fn contains(&mut self, signature: &Signature) -> LinkResult<bool>;

    /// Queues top level `signature`. Returns `false` if it is not supplied
    /// here or was queued before.
    fn enqueue(&mut self, signature: &Signature) -> bool;

    /// Returns `true` if queued top levels are waiting.
    fn has_pending(&self) -> bool;

    /// Top levels queued but not yet materialized.
    fn queued(&self) -> Vec<Signature> {
        Vec::new()
    }

    /// Materializes every queued top level.
    fn drain(&mut self, cx: &mut LinkContext) -> LinkResult<()>;

    /// Name of the file supplying `signature`, if known.
    fn file_of(&self, signature: &Signature) -> Option<String>;

    /// Stops supplying the signatures of file `name`. Returns `false` if the
    /// module has no such file.
    fn hide_file(&mut self, _name: &str) -> bool {
        false
    }

    /// Resolves a file-local `signature` through file `file`'s resolver.
    /// `Ok(None)` if the module has no such file or the signature is public.
    fn reference_local(
        &mut self,
        _cx: &mut LinkContext,
        _file: &str,
        _signature: &Signature,
        _kind: SymbolKind,
    ) -> LinkResult<Option<SymbolId>> {
        Ok(None)
    }
}

/// A module backed by a library archive.
pub struct ArchiveModule {
    archive: Archive,
    files: Vec<FileState>,
    index: HashMap<Signature, usize>,
    id: Option<ModuleId>,
}

impl ArchiveModule {
    /// Creates the module; `strategy` picks the strategy of each file by name.
    pub fn new(archive: Archive, strategy: &StrategyResolver) -> Self {
        let files = archive
            .files
            .iter()
            .enumerate()
            .map(|(index, file)| FileState::new(index, file.name.clone(), strategy(&file.name)))
            .collect();
        Self {
            archive,
            files,
            index: HashMap::new(),
            id: None,
        }
    }

    /// The backing archive.
    pub fn archive(&self) -> &Archive {
        &self.archive
    }

    /// Linking state of every file.
    pub fn files(&self) -> &[FileState] {
        &self.files
    }

    fn module_id(&self) -> LinkResult<ModuleId> {
        self.id.ok_or_else(|| {
            LinkError::Usage(format!("module `{}` used before registration", self.archive.name))
        })
    }

    fn index_file(&mut self, i: usize) -> LinkResult<()> {
        let state = &mut self.files[i];
        if state.indexed || state.hidden {
            return Ok(());
        }
        state
            .index(&self.archive.files[i])
            .map_err(|e| e.in_file(&state.name).in_module(&self.archive.name))?;
        for signature in &state.order {
            self.index.entry(signature.clone()).or_insert(i);
        }
        Ok(())
    }

    fn file_named(&self, name: &str) -> Option<usize> {
        self.files.iter().position(|f| f.name == name)
    }
}

impl ModuleDeserializer for ArchiveModule {
    fn name(&self) -> &str {
        &self.archive.name
    }

    fn init(&mut self, id: ModuleId, _cx: &mut LinkContext) -> LinkResult<()> {
        self.id = Some(id);
        for i in 0..self.files.len() {
            if self.files[i].strategy.on_demand() {
                continue;
            }
            self.index_file(i)?;
            self.files[i].enqueue_initial();
        }
        tracing::info!(
            module = %self.archive.name,
            files = self.files.len(),
            top_levels = self.index.len(),
            "module registered"
        );
        Ok(())
    }

    fn contains(&mut self, signature: &Signature) -> LinkResult<bool> {
        if self.index.contains_key(signature) {
            return Ok(true);
        }
        for i in 0..self.files.len() {
            if self.files[i].indexed || self.files[i].hidden {
                continue;
            }
            self.index_file(i)?;
            tracing::debug!(module = %self.archive.name, file = %self.files[i].name, "on-demand file indexed");
            if self.index.contains_key(signature) {
                return Ok(true);
            }
        }
        Ok(false)
    }

    fn enqueue(&mut self, signature: &Signature) -> bool {
        match self.index.get(signature) {
            Some(&i) => self.files[i].enqueue(signature),
            None => false,
        }
    }

    fn has_pending(&self) -> bool {
        self.files.iter().any(FileState::has_pending)
    }

    fn queued(&self) -> Vec<Signature> {
        self.files.iter().flat_map(|file| file.pending()).cloned().collect()
    }

    fn drain(&mut self, cx: &mut LinkContext) -> LinkResult<()> {
        let module = self.module_id()?;
        while self.has_pending() {
            for i in 0..self.files.len() {
                while let Some(signature) = self.files[i].front_pending() {
                    decoder::materialize(&self.archive.files[i], &mut self.files[i], cx, module, &signature)?;
                    self.files[i].complete_pending(&signature);
                }
            }
        }
        Ok(())
    }

    fn file_of(&self, signature: &Signature) -> Option<String> {
        self.index.get(signature).map(|&i| self.files[i].name.clone())
    }

    fn hide_file(&mut self, name: &str) -> bool {
        let Some(i) = self.file_named(name) else {
            return false;
        };
        self.files[i].hide();
        self.index.retain(|_, file| *file != i);
        tracing::debug!(module = %self.archive.name, file = name, "file hidden");
        true
    }

    fn reference_local(
        &mut self,
        cx: &mut LinkContext,
        file: &str,
        signature: &Signature,
        kind: SymbolKind,
    ) -> LinkResult<Option<SymbolId>> {
        if !signature.is_local() {
            return Ok(None);
        }
        let Some(i) = self.file_named(file) else {
            return Ok(None);
        };
        let module = self.module_id()?;
        self.index_file(i)?;
        if !self.files[i].declares(&signature.top_level()) {
            return Err(LinkError::Usage(format!(
                "`{signature}` is not local to file `{file}` of module `{}`",
                self.archive.name
            )));
        }
        let symbol = decoder::resolve_local(
            &self.archive.files[i],
            &mut self.files[i],
            cx,
            module,
            signature,
            kind,
        )?;
        Ok(Some(symbol))
    }
}
