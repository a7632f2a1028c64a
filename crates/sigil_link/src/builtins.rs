//! The function-type virtual module.
//!
//! Function types of every arity are synthesized when first reachable
//! instead of being stored in the standard library archive. The module wraps
//! the library's real deserializer and answers its own signature family
//! before the wrapped module is consulted.

use crate::context::LinkContext;
use crate::error::{LinkError, LinkResult};
use crate::module::ModuleDeserializer;
use sigil_diagnostics::Origin;
use sigil_ir::decl::{ClassDecl, ClassKind, DeclKind, DeclOrigin, Declaration, FunctionDecl};
use sigil_ir::ids::{DeclId, FileId, ModuleId, SymbolId};
use sigil_ir::signature::{PublicSignature, Signature};
use sigil_ir::symbol::SymbolKind;
use sigil_ir::types::{IrType, TypeArgument, Variance};
use std::collections::{HashSet, VecDeque};

/// Name of the synthesized file holding function types.
pub const FUNCTION_TYPES_FILE: &str = "<function-types>";

/// Largest synthesized arity.
pub const MAX_ARITY: u32 = 255;

/// One of the four function type families.
#[derive(Clone, Copy, PartialEq, Eq, Hash, Debug)]
pub enum FunctionFamily {
    /// `builtins/FunctionN`
    Function,
    /// `builtins.coroutines/SuspendFunctionN`
    SuspendFunction,
    /// `builtins.reflect/KFunctionN`
    KFunction,
    /// `builtins.reflect/KSuspendFunctionN`
    KSuspendFunction,
}

impl FunctionFamily {
    const ALL: [FunctionFamily; 4] = [
        FunctionFamily::Function,
        FunctionFamily::SuspendFunction,
        FunctionFamily::KFunction,
        FunctionFamily::KSuspendFunction,
    ];

    fn package(self) -> &'static str {
        match self {
            FunctionFamily::Function => "builtins",
            FunctionFamily::SuspendFunction => "builtins.coroutines",
            FunctionFamily::KFunction | FunctionFamily::KSuspendFunction => "builtins.reflect",
        }
    }

    fn prefix(self) -> &'static str {
        match self {
            FunctionFamily::Function => "Function",
            FunctionFamily::SuspendFunction => "SuspendFunction",
            FunctionFamily::KFunction => "KFunction",
            FunctionFamily::KSuspendFunction => "KSuspendFunction",
        }
    }

    fn is_suspend(self) -> bool {
        matches!(self, FunctionFamily::SuspendFunction | FunctionFamily::KSuspendFunction)
    }

    /// The non-reflective family a reflective one extends.
    fn base(self) -> Option<FunctionFamily> {
        match self {
            FunctionFamily::KFunction => Some(FunctionFamily::Function),
            FunctionFamily::KSuspendFunction => Some(FunctionFamily::SuspendFunction),
            FunctionFamily::Function | FunctionFamily::SuspendFunction => None,
        }
    }

    /// The class signature of arity `arity`.
    pub fn signature(self, arity: u32) -> Signature {
        Signature::public(self.package(), format!("{}{arity}", self.prefix()))
    }

    /// Recognizes a function type class signature.
    pub fn parse(signature: &Signature) -> Option<(FunctionFamily, u32)> {
        let public = signature.as_public()?;
        if public.id.is_some() || !public.flags.is_empty() || !public.is_top_level() {
            return None;
        }
        FunctionFamily::ALL.into_iter().find_map(|family| {
            if public.package != family.package() {
                return None;
            }
            let digits = public.declaration.strip_prefix(family.prefix())?;
            if digits.is_empty() || !digits.bytes().all(|b| b.is_ascii_digit()) {
                return None;
            }
            if digits.len() > 1 && digits.starts_with('0') {
                return None;
            }
            let arity = digits.parse().ok()?;
            (arity <= MAX_ARITY).then_some((family, arity))
        })
    }
}

/// Wraps a module and synthesizes function types on demand.
pub struct FunctionTypeModule {
    inner: Box<dyn ModuleDeserializer>,
    id: Option<ModuleId>,
    file: Option<FileId>,
    pending: VecDeque<(FunctionFamily, u32)>,
    scheduled: HashSet<(FunctionFamily, u32)>,
}

impl FunctionTypeModule {
    /// Wraps `inner`.
    pub fn new(inner: Box<dyn ModuleDeserializer>) -> Self {
        Self {
            inner,
            id: None,
            file: None,
            pending: VecDeque::new(),
            scheduled: HashSet::new(),
        }
    }

    fn synthesize(&mut self, cx: &mut LinkContext, family: FunctionFamily, arity: u32) -> LinkResult<()> {
        let module = self.id.ok_or_else(|| {
            LinkError::Usage(format!("module `{}` used before registration", self.inner.name()))
        })?;
        let class_sig = family.signature(arity);
        if let Some(existing) = cx.program.symbols.lookup(&class_sig) {
            if cx.program.symbols.get(existing).is_bound() {
                return Ok(());
            }
        }
        let origin = Origin::module(self.inner.name()).with_file(FUNCTION_TYPES_FILE);
        let file = *self
            .file
            .get_or_insert_with(|| cx.program.add_file(module, FUNCTION_TYPES_FILE, "builtins"));
        let class_name = format!("{}{arity}", family.prefix());

        let class_symbol = cx.declare(&class_sig, SymbolKind::Class, &origin)?;
        let mut type_parameters = Vec::with_capacity(arity as usize + 1);
        let mut type_symbols = Vec::with_capacity(arity as usize + 1);
        for index in 0..=arity {
            let (name, variance) = if index == arity {
                ("R".to_string(), Variance::Out)
            } else {
                (format!("P{}", index + 1), Variance::In)
            };
            let signature = Signature::Composite {
                container: Box::new(class_sig.clone()),
                inner: Box::new(Signature::ScopedLocal(index)),
            };
            let symbol = cx.declare(&signature, SymbolKind::TypeParameter, &origin)?;
            let kind = DeclKind::TypeParameter {
                index,
                variance,
                bounds: Vec::new(),
            };
            type_parameters.push(add(cx, symbol, &name, kind, file)?);
            type_symbols.push(symbol);
        }

        let invoke = self.invoke(cx, family, &class_sig, &type_symbols, file, &origin)?;

        let mut supertypes = Vec::new();
        if let Some(base) = family.base() {
            let base_sig = base.signature(arity);
            let base_symbol = cx.reference(&base_sig, SymbolKind::Class, &origin)?;
            if !cx.program.symbols.get(base_symbol).is_bound() {
                cx.request(&base_sig, module);
            }
            supertypes.push(IrType::Simple {
                classifier: base_symbol,
                arguments: type_symbols
                    .iter()
                    .map(|&s| TypeArgument::Projection {
                        variance: Variance::Invariant,
                        ty: IrType::simple(s),
                    })
                    .collect(),
                nullable: false,
            });
        }

        let kind = DeclKind::Class(ClassDecl {
            class_kind: ClassKind::Interface,
            type_parameters: type_parameters.clone(),
            supertypes,
            members: vec![invoke],
            is_expect: false,
        });
        let class = add(cx, class_symbol, &class_name, kind, file)?;
        for child in type_parameters.into_iter().chain([invoke]) {
            cx.program.decls[child].parent = Some(class);
        }
        cx.program.files[file].declarations.push(class);
        tracing::debug!(signature = %class_sig, "function type synthesized");
        Ok(())
    }

    fn invoke(
        &self,
        cx: &mut LinkContext,
        family: FunctionFamily,
        class_sig: &Signature,
        type_symbols: &[SymbolId],
        file: FileId,
        origin: &Origin,
    ) -> LinkResult<DeclId> {
        let Some(class) = class_sig.as_public() else {
            return Err(LinkError::Usage(format!("`{class_sig}` is not a public signature")));
        };
        let signature = Signature::Public(PublicSignature::new(
            class.package.clone(),
            format!("{}.invoke", class.declaration),
        ));
        let symbol = cx.declare(&signature, SymbolKind::Function, origin)?;
        let Some((&result, parameters)) = type_symbols.split_last() else {
            return Err(LinkError::Usage(format!("`{class_sig}` has no result type")));
        };
        let mut value_parameters = Vec::with_capacity(parameters.len());
        for (index, &ty) in (0u32..).zip(parameters) {
            let parameter_sig = Signature::Composite {
                container: Box::new(signature.clone()),
                inner: Box::new(Signature::ScopedLocal(index)),
            };
            let parameter = cx.declare(&parameter_sig, SymbolKind::ValueParameter, origin)?;
            let kind = DeclKind::ValueParameter {
                index,
                ty: IrType::simple(ty),
                default_value: None,
                is_vararg: false,
            };
            value_parameters.push(add(cx, parameter, &format!("p{}", index + 1), kind, file)?);
        }
        let kind = DeclKind::Function(FunctionDecl {
            type_parameters: Vec::new(),
            value_parameters: value_parameters.clone(),
            return_type: IrType::simple(result),
            body: None,
            is_inline: false,
            is_suspend: family.is_suspend(),
            is_expect: false,
        });
        let id = add(cx, symbol, "invoke", kind, file)?;
        for parameter in value_parameters {
            cx.program.decls[parameter].parent = Some(id);
        }
        Ok(id)
    }
}

fn add(cx: &mut LinkContext, symbol: SymbolId, name: &str, kind: DeclKind, file: FileId) -> LinkResult<DeclId> {
    let mut decl = Declaration::new(symbol, cx.interner.get_or_intern(name), kind, DeclOrigin::Synthesized);
    decl.file = Some(file);
    Ok(cx.program.add_declaration(decl)?)
}

impl ModuleDeserializer for FunctionTypeModule {
    fn name(&self) -> &str {
        self.inner.name()
    }

    fn init(&mut self, id: ModuleId, cx: &mut LinkContext) -> LinkResult<()> {
        self.id = Some(id);
        self.inner.init(id, cx)
    }

    fn contains(&mut self, signature: &Signature) -> LinkResult<bool> {
        if FunctionFamily::parse(signature).is_some() {
            return Ok(true);
        }
        self.inner.contains(signature)
    }

    fn enqueue(&mut self, signature: &Signature) -> bool {
        match FunctionFamily::parse(signature) {
            Some(key) => {
                if !self.scheduled.insert(key) {
                    return false;
                }
                self.pending.push_back(key);
                true
            }
            None => self.inner.enqueue(signature),
        }
    }

    fn has_pending(&self) -> bool {
        !self.pending.is_empty() || self.inner.has_pending()
    }

    fn queued(&self) -> Vec<Signature> {
        self.inner.queued()
    }

    fn drain(&mut self, cx: &mut LinkContext) -> LinkResult<()> {
        while let Some((family, arity)) = self.pending.pop_front() {
            self.synthesize(cx, family, arity)?;
        }
        self.inner.drain(cx)
    }

    fn file_of(&self, signature: &Signature) -> Option<String> {
        match FunctionFamily::parse(signature) {
            Some(_) => Some(FUNCTION_TYPES_FILE.to_string()),
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
        self.inner.reference_local(cx, file, signature, kind)
    }
}
