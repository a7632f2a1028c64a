//! State shared by every module deserializer during one linking session.

use crate::error::{kind_substituted_code, LinkError, LinkResult};
use crate::options::LinkOptions;
use sigil_common::Interner;
use sigil_diagnostics::{Diagnostic, DiagnosticCode, DiagnosticSink, Origin};
use sigil_ir::ids::{ModuleId, SymbolId};
use sigil_ir::program::Program;
use sigil_ir::signature::Signature;
use sigil_ir::symbol::SymbolKind;
use std::collections::{HashMap, HashSet};

/// Where a reachability request is routed.
#[derive(Clone, Copy, PartialEq, Eq, Hash, Debug)]
pub enum RequestScope {
    /// The requesting module, then its dependency closure.
    Dependencies,
    /// Any registered module. Used for actuals, which live above their
    /// expects in the dependency graph.
    Global,
}

/// A top-level signature that became reachable.
#[derive(Clone, PartialEq, Eq, Hash, Debug)]
pub struct Request {
    /// The top-level signature.
    pub signature: Signature,
    /// Module whose code needs it.
    pub origin: ModuleId,
    /// Routing scope.
    pub scope: RequestScope,
}

/// Mutable state threaded through decoding and resolution.
pub struct LinkContext {
    /// Everything materialized so far.
    pub program: Program,
    /// Interner for declaration names.
    pub interner: Interner,
    /// Session options.
    pub options: LinkOptions,
    /// Collected diagnostics.
    pub sink: DiagnosticSink,
    pub(crate) requests: Vec<Request>,
    pub(crate) expect_to_actual: HashMap<Signature, Signature>,
    /// Module that supplies each routed or self-queued top level. Only this
    /// module materializes it, even if others declare it too.
    pub(crate) owners: HashMap<Signature, ModuleId>,
    requested_actuals: HashSet<Signature>,
}

impl LinkContext {
    /// Creates an empty context.
    pub fn new(options: LinkOptions) -> Self {
        Self {
            program: Program::new(),
            interner: Interner::new(),
            options,
            sink: DiagnosticSink::new(),
            requests: Vec::new(),
            expect_to_actual: HashMap::new(),
            owners: HashMap::new(),
            requested_actuals: HashSet::new(),
        }
    }

    /// Name of a registered module.
    pub fn module_name(&self, module: ModuleId) -> &str {
        &self.program.modules[module].name
    }

    /// Queues a reachability request for the top level of `signature`.
    pub(crate) fn request(&mut self, signature: &Signature, origin: ModuleId) {
        self.requests.push(Request {
            signature: signature.top_level(),
            origin,
            scope: RequestScope::Dependencies,
        });
    }

    /// Returns the symbol a use site of `kind` should reference for a
    /// non-local `signature`, applying the kind-mismatch policy.
    pub(crate) fn reference(
        &mut self,
        signature: &Signature,
        kind: SymbolKind,
        origin: &Origin,
    ) -> LinkResult<SymbolId> {
        let id = self.program.symbols.reference(signature, kind);
        let found = self.program.symbols.get(id).kind;
        let id = if found == kind {
            id
        } else {
            self.kind_mismatch(signature, kind, found, origin)?
        };
        self.note_expect(signature, origin);
        Ok(id)
    }

    /// Returns the symbol a declaration of `kind` binds for a non-local
    /// `signature`. Under partial linkage a conflicting registration is
    /// demoted to a substitute that stays unbound and is stubbed later, and
    /// the declaration binds the symbol earlier uses of its own kind got.
    pub(crate) fn declare(
        &mut self,
        signature: &Signature,
        kind: SymbolKind,
        origin: &Origin,
    ) -> LinkResult<SymbolId> {
        let id = match self.program.symbols.declare(signature, kind) {
            Ok(id) => id,
            Err(conflict) => {
                if !self.options.partial_linkage {
                    return Err(LinkError::KindMismatch {
                        signature: signature.to_string(),
                        expected: conflict.expected,
                        found: conflict.found,
                        location: origin.clone(),
                    });
                }
                self.report_partial(
                    kind_substituted_code(),
                    format!(
                        "`{signature}` declared as a {} but referenced as a {}; references keep a stub",
                        conflict.expected, conflict.found
                    ),
                    origin,
                );
                self.program.symbols.promote(signature, kind)
            }
        };
        self.note_expect(signature, origin);
        Ok(id)
    }

    fn kind_mismatch(
        &mut self,
        signature: &Signature,
        expected: SymbolKind,
        found: SymbolKind,
        origin: &Origin,
    ) -> LinkResult<SymbolId> {
        if !self.options.partial_linkage {
            return Err(LinkError::KindMismatch {
                signature: signature.to_string(),
                expected,
                found,
                location: origin.clone(),
            });
        }
        let before = self.program.symbols.len();
        let id = self.program.symbols.substitute(signature, expected);
        if self.program.symbols.len() > before {
            self.report_partial(
                kind_substituted_code(),
                format!("`{signature}` is a {found}, but a {expected} was expected; substituting"),
                origin,
            );
        }
        Ok(id)
    }

    /// Returns `true` if another module was chosen to supply `signature`.
    pub(crate) fn supplied_elsewhere(&self, signature: &Signature, module: ModuleId) -> bool {
        self.owners.get(signature).is_some_and(|&owner| owner != module)
    }

    /// Queues the actual paired with an expect signature, once.
    pub(crate) fn note_expect(&mut self, signature: &Signature, origin: &Origin) {
        let Some(actual) = self.expect_to_actual.get(signature) else {
            return;
        };
        let top = actual.top_level();
        if !self.requested_actuals.insert(top.clone()) {
            return;
        }
        tracing::debug!(expect = %signature, actual = %actual, "actual requested");
        let module = origin
            .module
            .as_deref()
            .and_then(|name| self.program.module_by_name(name))
            .unwrap_or_else(|| ModuleId::from_raw(0));
        self.requests.push(Request {
            signature: top,
            origin: module,
            scope: RequestScope::Global,
        });
    }

    /// Emits a partial-linkage diagnostic at the configured severity.
    pub(crate) fn report_partial(&self, code: DiagnosticCode, message: String, origin: &Origin) {
        let Some(severity) = self.options.partial_linkage_severity() else {
            return;
        };
        tracing::warn!(code = %code, "{message}");
        self.sink
            .emit(Diagnostic::new(severity, code, message).with_origin(origin.clone()));
    }

    /// Takes all pending requests.
    pub(crate) fn take_requests(&mut self) -> Vec<Request> {
        std::mem::take(&mut self.requests)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use sigil_diagnostics::Severity;
    use sigil_ir::signature::{PublicSignature, SignatureFlags};

    fn partial() -> LinkContext {
        LinkContext::new(LinkOptions {
            partial_linkage: true,
            ..Default::default()
        })
    }

    #[test]
    fn mismatch_without_partial_linkage_is_fatal() {
        let mut cx = LinkContext::new(LinkOptions::default());
        let sig = Signature::public("pkg", "C");
        cx.reference(&sig, SymbolKind::Class, &Origin::default()).unwrap();
        let err = cx
            .reference(&sig, SymbolKind::Function, &Origin::module("app"))
            .unwrap_err();
        assert!(matches!(err, LinkError::KindMismatch { .. }));
    }

    #[test]
    fn mismatch_substitute_is_stable_and_reported_once() {
        let mut cx = partial();
        let sig = Signature::public("pkg", "C");
        let class = cx.reference(&sig, SymbolKind::Class, &Origin::default()).unwrap();
        let a = cx.reference(&sig, SymbolKind::Function, &Origin::default()).unwrap();
        let b = cx.reference(&sig, SymbolKind::Function, &Origin::default()).unwrap();
        assert_eq!(a, b);
        assert_ne!(a, class);
        assert_eq!(cx.program.symbols.get(a).kind, SymbolKind::Function);
        let diags = cx.sink.diagnostics();
        assert_eq!(diags.len(), 1);
        assert_eq!(diags[0].severity, Severity::Warning);
        assert_eq!(diags[0].code.to_string(), "W301");
    }

    #[test]
    fn conflicting_declaration_is_promoted_under_partial_linkage() {
        let mut cx = partial();
        let sig = Signature::public("pkg", "x");
        let referenced = cx.reference(&sig, SymbolKind::Function, &Origin::default()).unwrap();
        let declared = cx.declare(&sig, SymbolKind::Property, &Origin::default()).unwrap();
        assert_ne!(referenced, declared);
        assert_eq!(cx.program.symbols.lookup(&sig), Some(declared));
    }

    #[test]
    fn declaration_binds_the_symbol_of_matching_uses_in_either_order() {
        let sig = Signature::public("lib", "C");
        let origin = Origin::default();

        let mut function_first = partial();
        let stale = function_first.reference(&sig, SymbolKind::Function, &origin).unwrap();
        let as_class = function_first.reference(&sig, SymbolKind::Class, &origin).unwrap();
        let declared = function_first.declare(&sig, SymbolKind::Class, &origin).unwrap();
        assert_eq!(declared, as_class);
        let again = function_first.reference(&sig, SymbolKind::Function, &origin).unwrap();
        assert_eq!(again, stale);

        let mut class_first = partial();
        let as_class = class_first.reference(&sig, SymbolKind::Class, &origin).unwrap();
        let stale = class_first.reference(&sig, SymbolKind::Function, &origin).unwrap();
        let declared = class_first.declare(&sig, SymbolKind::Class, &origin).unwrap();
        assert_eq!(declared, as_class);
        assert_ne!(stale, declared);

        for cx in [&function_first, &class_first] {
            let symbols = &cx.program.symbols;
            let function_uses = symbols
                .iter()
                .filter(|(_, data)| data.kind == SymbolKind::Function)
                .count();
            assert_eq!(function_uses, 1);
        }
    }

    #[test]
    fn expect_reference_requests_actual_once() {
        let mut cx = LinkContext::new(LinkOptions::default());
        let expect = Signature::Public(
            PublicSignature::new("common", "now").with_flags(SignatureFlags::EXPECT),
        );
        let actual = Signature::public("jvm", "now");
        cx.expect_to_actual.insert(expect.clone(), actual.clone());
        cx.reference(&expect, SymbolKind::Function, &Origin::default()).unwrap();
        cx.reference(&expect, SymbolKind::Function, &Origin::default()).unwrap();
        let requests = cx.take_requests();
        assert_eq!(requests.len(), 1);
        assert_eq!(requests[0].signature, actual);
        assert_eq!(requests[0].scope, RequestScope::Global);
    }

    #[test]
    fn silent_log_emits_nothing() {
        let mut cx = LinkContext::new(LinkOptions {
            partial_linkage: true,
            partial_linkage_log: sigil_config::PartialLinkageLog::Silent,
            ..Default::default()
        });
        let sig = Signature::public("pkg", "C");
        cx.reference(&sig, SymbolKind::Class, &Origin::default()).unwrap();
        cx.reference(&sig, SymbolKind::Function, &Origin::default()).unwrap();
        assert!(cx.sink.diagnostics().is_empty());
    }
}
