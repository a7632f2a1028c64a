//! The module graph linker.
//!
//! Owns every module deserializer of a compilation, routes reachable
//! signatures to the module that supplies them and drains the global work
//! set to a fixed point. Routing searches the requesting module first, then
//! its dependency closure in declaration order; actuals, which sit above
//! their expects in the graph, are searched in every module.
//!
//! A top level declared by more than one module is supplied by the earliest
//! registered of them, for every requester, so the linked program does not
//! depend on which module happened to drain first.

use crate::actualize::actualize;
use crate::builtins::FunctionTypeModule;
use crate::context::{LinkContext, Request, RequestScope};
use crate::error::{duplicate_signature_code, LinkError, LinkResult};
use crate::module::{ArchiveModule, ModuleDeserializer};
use crate::options::LinkOptions;
use crate::overlay::{DirtyFile, IncrementalOverlay};
use crate::partial::generate_stubs;
use crate::strategy::{self, StrategyResolver};
use sigil_archive::Archive;
use sigil_common::Interner;
use sigil_diagnostics::{Diagnostic, DiagnosticSink, Origin};
use sigil_ir::ids::{DeclId, ModuleId, SymbolId};
use sigil_ir::program::Program;
use sigil_ir::signature::Signature;
use sigil_ir::symbol::SymbolKind;
use std::collections::{HashMap, HashSet};

struct ModuleEntry {
    id: ModuleId,
    name: String,
    deserializer: Box<dyn ModuleDeserializer>,
    /// Transitive dependencies, nearest first.
    dependencies: Vec<usize>,
}

/// Counts reported by [`Linker::finish`].
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct LinkReport {
    /// Registered modules.
    pub modules: usize,
    /// Bound top-level declarations.
    pub top_levels: usize,
    /// All bound declarations, nested ones and stubs included.
    pub declarations: usize,
    /// Generated stubs.
    pub stubs: usize,
    /// Retargeted expect/actual pairs.
    pub actualized: usize,
}

/// Links a graph of modules into one [`Program`].
///
/// A session registers modules in dependency order, seeds reachability
/// with [`resolve_by_signature`](Self::resolve_by_signature) (modules also
/// seed themselves according to their strategies), runs
/// [`link`](Self::link) and finally [`finish`](Self::finish).
pub struct Linker {
    cx: LinkContext,
    modules: Vec<ModuleEntry>,
    by_id: HashMap<ModuleId, usize>,
    routed: HashSet<(Option<ModuleId>, Signature)>,
    clashes: HashSet<Signature>,
    pairs: Vec<(Signature, Signature)>,
    tried: HashSet<SymbolId>,
}

impl Linker {
    /// Creates a linker with no modules.
    pub fn new(options: LinkOptions) -> Self {
        Self {
            cx: LinkContext::new(options),
            modules: Vec::new(),
            by_id: HashMap::new(),
            routed: HashSet::new(),
            clashes: HashSet::new(),
            pairs: Vec::new(),
            tried: HashSet::new(),
        }
    }

    /// The linked program.
    pub fn program(&self) -> &Program {
        &self.cx.program
    }

    /// Mutable access to the program, for front ends storing in-memory
    /// declarations before an [`IncrementalOverlay`] is registered.
    pub fn program_mut(&mut self) -> &mut Program {
        &mut self.cx.program
    }

    /// The name interner.
    pub fn interner(&self) -> &Interner {
        &self.cx.interner
    }

    /// Diagnostics reported so far.
    pub fn diagnostics(&self) -> &DiagnosticSink {
        &self.cx.sink
    }

    /// Session options.
    pub fn options(&self) -> &LinkOptions {
        &self.cx.options
    }

    /// Names of registered modules in registration order.
    pub fn module_names(&self) -> Vec<String> {
        self.modules.iter().map(|m| m.name.clone()).collect()
    }

    /// Returns the id of module `name`.
    pub fn module_id(&self, name: &str) -> Option<ModuleId> {
        self.modules.iter().find(|m| m.name == name).map(|m| m.id)
    }

    fn entry_named(&self, name: &str, signature: Option<&Signature>) -> LinkResult<usize> {
        self.modules
            .iter()
            .position(|m| m.name == name)
            .ok_or_else(|| LinkError::NoDeserializerForModule {
                module: name.to_string(),
                signature: signature.map(ToString::to_string),
            })
    }

    /// Registers a module. Its dependencies must already be registered.
    pub fn add_module(
        &mut self,
        mut deserializer: Box<dyn ModuleDeserializer>,
        dependencies: &[&str],
    ) -> LinkResult<ModuleId> {
        let name = deserializer.name().to_string();
        if self.modules.iter().any(|m| m.name == name) {
            return Err(LinkError::DuplicateModule(name));
        }
        let mut closure = Vec::new();
        for dependency in dependencies {
            let index = self.entry_named(dependency, None)?;
            for i in std::iter::once(index).chain(self.modules[index].dependencies.iter().copied()) {
                if !closure.contains(&i) {
                    closure.push(i);
                }
            }
        }
        let id = self.cx.program.add_module(name.clone());
        deserializer.init(id, &mut self.cx).map_err(|e| e.in_module(&name))?;
        tracing::debug!(module = %name, dependencies = closure.len(), "module added");
        let index = self.modules.len();
        self.by_id.insert(id, index);
        let queued = deserializer.queued();
        self.modules.push(ModuleEntry {
            id,
            name,
            deserializer,
            dependencies: closure,
        });
        for signature in &queued {
            self.supply(signature, index)?;
        }
        Ok(id)
    }

    /// Registers an archive. `builtins` wraps it with the function-type
    /// virtual module.
    pub fn add_archive(
        &mut self,
        archive: Archive,
        dependencies: &[&str],
        strategy: &StrategyResolver,
        builtins: bool,
    ) -> LinkResult<ModuleId> {
        let module: Box<dyn ModuleDeserializer> = Box::new(ArchiveModule::new(archive, strategy));
        let module = if builtins {
            Box::new(FunctionTypeModule::new(module))
        } else {
            module
        };
        self.add_module(module, dependencies)
    }

    /// Registers an archive whose `dirty` files were recompiled in this
    /// session. Their declarations must already be in the program.
    pub fn add_incremental_archive(
        &mut self,
        archive: Archive,
        dependencies: &[&str],
        dirty: Vec<DirtyFile>,
        builtins: bool,
    ) -> LinkResult<ModuleId> {
        let names = dirty.iter().map(|d| d.name.clone()).collect();
        let module: Box<dyn ModuleDeserializer> =
            Box::new(ArchiveModule::new(archive, &strategy::dirty_files(names)));
        let module: Box<dyn ModuleDeserializer> = if builtins {
            Box::new(FunctionTypeModule::new(module))
        } else {
            module
        };
        self.add_module(Box::new(IncrementalOverlay::new(module, dirty)), dependencies)
    }

    /// Pairs an expect signature with its actual. Must be called before the
    /// fixed point runs for the actual to load with the expect.
    pub fn register_expect_actual(&mut self, expect: Signature, actual: Signature) -> LinkResult<()> {
        if !expect.is_expect() {
            return Err(LinkError::Usage(format!(
                "`{expect}` is not an expect signature"
            )));
        }
        if actual.is_expect() || actual.is_local() {
            return Err(LinkError::Usage(format!(
                "`{actual}` cannot be the actual of `{expect}`"
            )));
        }
        match self.cx.expect_to_actual.get(&expect) {
            Some(existing) if *existing == actual => return Ok(()),
            Some(existing) => {
                return Err(LinkError::Usage(format!(
                    "`{expect}` already actualized by `{existing}`"
                )))
            }
            None => {}
        }
        self.cx.expect_to_actual.insert(expect.clone(), actual.clone());
        if self.cx.program.symbols.lookup(&expect).is_some() {
            self.cx.note_expect(&expect, &Origin::default());
        }
        self.pairs.push((expect, actual));
        Ok(())
    }

    /// Requests top level `signature` from module `module` and returns its
    /// symbol. The declaration is bound once [`link`](Self::link) runs.
    pub fn resolve_by_signature(
        &mut self,
        signature: &Signature,
        kind: SymbolKind,
        module: &str,
    ) -> LinkResult<SymbolId> {
        let index = self.entry_named(module, Some(signature))?;
        if !signature.is_top_level() || signature.is_local() {
            return Err(LinkError::Usage(format!(
                "`{signature}` is not a public top-level signature"
            )));
        }
        let entry = &mut self.modules[index];
        if !entry.deserializer.contains(signature)? {
            return Err(LinkError::SignatureNotFound {
                signature: signature.to_string(),
                module: module.to_string(),
                loaded: self.module_names(),
            });
        }
        let symbol = self.cx.reference(signature, kind, &Origin::module(module))?;
        self.supply(signature, index)?;
        Ok(symbol)
    }

    /// Makes top level `signature` reachable from whichever module supplies
    /// it first, in registration order. Used for configured entry points,
    /// whose kind and module are not known up front.
    pub fn resolve_entry(&mut self, signature: &Signature) -> LinkResult<ModuleId> {
        if !signature.is_top_level() || signature.is_local() {
            return Err(LinkError::Usage(format!(
                "entry `{signature}` is not a public top-level signature"
            )));
        }
        for index in 0..self.modules.len() {
            let entry = &mut self.modules[index];
            if !entry.deserializer.contains(signature).map_err(|e| e.in_module(&entry.name))? {
                continue;
            }
            let id = self.supply(signature, index)?;
            tracing::debug!(%signature, module = %self.modules[index].name, "entry point");
            return Ok(id);
        }
        Err(LinkError::SignatureNotFound {
            signature: signature.to_string(),
            module: "<entry>".to_string(),
            loaded: self.module_names(),
        })
    }

    /// Resolves a file-local signature of `file` in `module`.
    pub fn reference_local(
        &mut self,
        module: &str,
        file: &str,
        signature: &Signature,
        kind: SymbolKind,
    ) -> LinkResult<Option<SymbolId>> {
        let index = self.entry_named(module, Some(signature))?;
        self.modules[index]
            .deserializer
            .reference_local(&mut self.cx, file, signature, kind)
    }

    /// Materializes the declaration of `symbol` if it is not bound yet.
    /// Each symbol is looked for at most once per session.
    pub fn get_declaration(&mut self, symbol: SymbolId) -> LinkResult<Option<DeclId>> {
        if !self.cx.program.symbols.contains(symbol) {
            return Err(LinkError::Usage(format!(
                "symbol {} does not belong to this session",
                symbol.as_raw()
            )));
        }
        if let Some(id) = self.cx.program.declaration_id_of(symbol) {
            return Ok(Some(id));
        }
        if !self.tried.insert(symbol) {
            return Ok(None);
        }
        let Some(signature) = self.cx.program.symbols.get(symbol).signature.clone() else {
            return Ok(None);
        };
        if signature.is_local() {
            return Ok(None);
        }
        let Some(origin) = self.modules.first().map(|m| m.id) else {
            return Ok(None);
        };
        self.route(Request {
            signature: signature.top_level(),
            origin,
            scope: RequestScope::Global,
        })?;
        self.link()?;
        Ok(self.cx.program.declaration_id_of(symbol))
    }

    /// Drains the global work set to a fixed point.
    pub fn link(&mut self) -> LinkResult<()> {
        self.drain_with(|_| 0)
    }

    /// Drains the global work set, letting `pick` choose which of the
    /// modules with pending work (indices in registration order) runs next.
    pub fn drain_with(&mut self, mut pick: impl FnMut(&[usize]) -> usize) -> LinkResult<()> {
        loop {
            self.route_requests()?;
            let ready: Vec<usize> = self
                .modules
                .iter()
                .enumerate()
                .filter(|(_, m)| m.deserializer.has_pending())
                .map(|(i, _)| i)
                .collect();
            if ready.is_empty() {
                return Ok(());
            }
            let index = ready[pick(&ready) % ready.len()];
            let entry = &mut self.modules[index];
            entry
                .deserializer
                .drain(&mut self.cx)
                .map_err(|e| e.in_module(&entry.name))?;
        }
    }

    fn route_requests(&mut self) -> LinkResult<()> {
        for request in self.cx.take_requests() {
            self.route(request)?;
        }
        Ok(())
    }

    fn route(&mut self, request: Request) -> LinkResult<()> {
        let origin = self.by_id.get(&request.origin).copied();
        let scope = match origin {
            Some(_) => request.scope,
            None => RequestScope::Global,
        };
        let key_module = match scope {
            RequestScope::Dependencies => Some(request.origin),
            RequestScope::Global => None,
        };
        if !self.routed.insert((key_module, request.signature.clone())) {
            return Ok(());
        }
        let signature = request.signature;
        let order: Vec<usize> = match (scope, origin) {
            (RequestScope::Dependencies, Some(index)) => std::iter::once(index)
                .chain(self.modules[index].dependencies.iter().copied())
                .collect(),
            _ => (0..self.modules.len()).collect(),
        };
        for index in order {
            let entry = &mut self.modules[index];
            if !entry.deserializer.contains(&signature).map_err(|e| e.in_module(&entry.name))? {
                continue;
            }
            tracing::trace!(%signature, module = %entry.name, "routed");
            self.supply(&signature, index)?;
            return Ok(());
        }

        let requester = origin
            .map(|i| self.modules[i].name.clone())
            .unwrap_or_else(|| "<session>".to_string());
        if scope == RequestScope::Global {
            tracing::debug!(%signature, "no module supplies globally requested signature");
            return Ok(());
        }
        if self.cx.options.partial_linkage {
            tracing::warn!(%signature, module = %requester, "no module supplies signature, leaving a stand-in");
            return Ok(());
        }
        Err(LinkError::SignatureNotFound {
            signature: signature.to_string(),
            module: requester,
            loaded: self.module_names(),
        })
    }

    /// Returns the index of the module supplying `signature` for the whole
    /// session: the earliest registered module that declares it. `found`
    /// is a module known to declare it.
    fn owner(&mut self, signature: &Signature, found: usize) -> LinkResult<usize> {
        if let Some(&index) = self.cx.owners.get(signature).and_then(|id| self.by_id.get(id)) {
            return Ok(index);
        }
        let mut owner = found;
        for index in 0..found {
            let entry = &mut self.modules[index];
            if entry.deserializer.contains(signature).map_err(|e| e.in_module(&entry.name))? {
                owner = index;
                break;
            }
        }
        self.cx.owners.insert(signature.clone(), self.modules[owner].id);
        Ok(owner)
    }

    /// Queues `signature` in its owner. `found` declares it as well; if it
    /// is not the owner the clash is reported once per signature.
    fn supply(&mut self, signature: &Signature, found: usize) -> LinkResult<ModuleId> {
        let owner = self.owner(signature, found)?;
        if owner != found && self.clashes.insert(signature.clone()) {
            let name = &self.modules[owner].name;
            tracing::warn!(%signature, module = %name, "top level declared by more than one module");
            self.cx.sink.emit(
                Diagnostic::warning(
                    duplicate_signature_code(),
                    format!("`{signature}` is declared by more than one module; linking the copy in `{name}`"),
                )
                .with_origin(Origin::module(name.clone())),
            );
        }
        let entry = &mut self.modules[owner];
        entry.deserializer.enqueue(signature);
        Ok(entry.id)
    }

    /// Runs the end-of-link passes: actualization, then either stub
    /// generation (partial linkage) or a check that every symbol is bound.
    pub fn finish(&mut self) -> LinkResult<LinkReport> {
        self.link()?;
        let actualized = actualize(&mut self.cx, &self.pairs)?;
        let stubs = if self.cx.options.partial_linkage {
            generate_stubs(&mut self.cx)?
        } else {
            self.check_bound()?;
            0
        };
        let report = LinkReport {
            modules: self.modules.len(),
            top_levels: self.cx.program.top_level_count(),
            declarations: self.cx.program.decls.len(),
            stubs,
            actualized,
        };
        let counts = self.cx.sink.counts();
        tracing::info!(
            modules = report.modules,
            top_levels = report.top_levels,
            stubs = report.stubs,
            actualized = report.actualized,
            warnings = counts.warnings,
            errors = counts.errors,
            "link finished"
        );
        Ok(report)
    }

    fn check_bound(&self) -> LinkResult<()> {
        let symbols = &self.cx.program.symbols;
        let Some(unbound) = symbols.unbound().into_iter().find(|&s| !symbols.is_bound(s)) else {
            return Ok(());
        };
        let data = symbols.get(unbound);
        let location = data
            .signature
            .as_ref()
            .and_then(|s| self.cx.owners.get(&s.top_level()))
            .map(|&module| Origin::module(self.cx.module_name(module)))
            .unwrap_or_default();
        Err(LinkError::Unbound {
            signature: data
                .signature
                .as_ref()
                .map(ToString::to_string)
                .unwrap_or_else(|| format!("<local {}>", data.kind)),
            location,
        })
    }

    /// Drops every module and everything linked so far, keeping the options.
    pub fn clear(&mut self) {
        let options = self.cx.options.clone();
        *self = Linker::new(options);
    }
}
