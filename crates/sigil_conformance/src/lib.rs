//! Conformance test helpers for the Sigil IR linker.
//!
//! Provides a small fixture language for building library archives out of
//! functions and classes that call each other, plus accessors that inspect a
//! linked program by signature so integration tests never depend on arena
//! indices or discovery order.

#![warn(missing_docs)]

use sigil_archive::records::{
    BodyRecord, ConstRecord, DeclKindRecord, DeclRecord, ExprRecord, FunctionRecord,
    OperationRecord, StatementRecord, TypeRecord,
};
use sigil_archive::{Archive, ArchiveBuilder, FileBuilder};
use sigil_ir::visit::referenced_symbols;
use sigil_ir::{
    ClassKind, ConstValue, DeclKind, ExprKind, IrDumper, PublicSignature, Signature,
    SignatureFlags, SymbolId, SymbolKind, SymbolOrigin,
};
use sigil_link::strategy::uniform;
use sigil_link::{DeserializationStrategy, Linker, StrategyResolver};

/// Builder for one archive file.
pub struct FileFixture {
    builder: FileBuilder,
    package: String,
}

impl FileFixture {
    /// Starts a file called `name` in `package`.
    pub fn new(name: &str, package: &str) -> Self {
        Self {
            builder: FileBuilder::new(name, package),
            package: package.to_string(),
        }
    }

    /// Enables the debug-info table; declarations get a debug name.
    pub fn with_debug_info(mut self) -> Self {
        self.builder = self.builder.with_debug_info();
        self
    }

    /// Public signature of `declaration` in this file's package.
    pub fn sig(&self, declaration: &str) -> Signature {
        Signature::public(self.package.as_str(), declaration)
    }

    fn call(&mut self, callee: &Signature) -> ExprRecord {
        let callee = self.builder.symbol(SymbolKind::Function, callee);
        let ty = self.builder.type_record(TypeRecord::Dynamic);
        ExprRecord {
            ty,
            start: 0,
            end: 0,
            operation: OperationRecord::Call {
                callee,
                receiver: None,
                type_arguments: Vec::new(),
                arguments: Vec::new(),
            },
        }
    }

    fn int(&mut self, value: i32) -> u32 {
        let ty = self.builder.type_record(TypeRecord::Dynamic);
        self.builder.body(&BodyRecord::Expression(ExprRecord {
            ty,
            start: 0,
            end: 0,
            operation: OperationRecord::Const(ConstRecord::Int(value)),
        }))
    }

    fn function_record(
        &mut self,
        signature: &Signature,
        calls: &[Signature],
        is_inline: bool,
        default: Option<Option<i32>>,
    ) -> DeclRecord {
        let name = short_name(signature);
        let body = if signature.is_expect() {
            None
        } else {
            let statements = calls
                .iter()
                .map(|callee| StatementRecord::Expr(self.call(callee)))
                .collect();
            Some(self.builder.body(&BodyRecord::Block(statements)))
        };
        let value_parameters = match default {
            Some(default) => {
                let parameter = Signature::Composite {
                    container: Box::new(signature.clone()),
                    inner: Box::new(Signature::ScopedLocal(0)),
                };
                let ty = self.builder.type_record(TypeRecord::Dynamic);
                let default_value = default.map(|v| self.int(v));
                vec![DeclRecord {
                    symbol: self.builder.symbol(SymbolKind::ValueParameter, &parameter),
                    name: self.builder.string("x"),
                    start: 0,
                    end: 0,
                    debug_info: None,
                    kind: DeclKindRecord::ValueParameter {
                        index: 0,
                        ty,
                        default_value,
                        is_vararg: false,
                    },
                }]
            }
            None => Vec::new(),
        };
        let return_type = self.builder.type_record(TypeRecord::Dynamic);
        let debug_info = self.builder.debug_info(&format!("debug:{name}"));
        DeclRecord {
            symbol: self.builder.symbol(SymbolKind::Function, signature),
            name: self.builder.string(&name),
            start: 0,
            end: 0,
            debug_info,
            kind: DeclKindRecord::Function(FunctionRecord {
                type_parameters: Vec::new(),
                value_parameters,
                return_type,
                body,
                is_inline,
                is_suspend: false,
                is_expect: signature.is_expect(),
            }),
        }
    }

    /// A top-level function whose block body calls each of `calls`.
    pub fn function(self, name: &str, calls: &[Signature]) -> Self {
        let signature = self.sig(name);
        self.top_level_function(&signature, calls, false, None)
    }

    /// An inline top-level function.
    pub fn inline_function(self, name: &str, calls: &[Signature]) -> Self {
        let signature = self.sig(name);
        self.top_level_function(&signature, calls, true, None)
    }

    /// A top-level function with one parameter and an optional default.
    pub fn function_with_default(self, name: &str, default: Option<i32>, calls: &[Signature]) -> Self {
        let signature = self.sig(name);
        self.top_level_function(&signature, calls, false, Some(default))
    }

    /// A bodiless expect function with one parameter and an optional default.
    pub fn expect_function(self, name: &str, default: Option<i32>) -> Self {
        let signature = expect_sig(&self.package, name);
        self.top_level_function(&signature, &[], false, Some(default))
    }

    fn top_level_function(
        mut self,
        signature: &Signature,
        calls: &[Signature],
        is_inline: bool,
        default: Option<Option<i32>>,
    ) -> Self {
        let record = self.function_record(signature, calls, is_inline, default);
        self.builder.declare(&record);
        self
    }

    /// A top-level function without parameters returning class `class`.
    pub fn function_returning(mut self, name: &str, class: &Signature) -> Self {
        let signature = self.sig(name);
        let mut record = self.function_record(&signature, &[], false, None);
        if let DeclKindRecord::Function(function) = &mut record.kind {
            function.return_type = self.builder.class_type(class);
        }
        self.builder.declare(&record);
        self
    }

    /// A top-level class whose methods (`Name.method`) call the listed signatures.
    pub fn class(mut self, name: &str, methods: &[(&str, &[Signature])]) -> Self {
        let signature = self.sig(name);
        let members = methods
            .iter()
            .map(|(method, calls)| {
                let method = self.sig(&format!("{name}.{method}"));
                self.function_record(&method, calls, false, None)
            })
            .collect();
        let record = DeclRecord {
            symbol: self.builder.symbol(SymbolKind::Class, &signature),
            name: self.builder.string(name),
            start: 0,
            end: 0,
            debug_info: None,
            kind: DeclKindRecord::Class {
                class_kind: ClassKind::Class,
                type_parameters: Vec::new(),
                supertypes: Vec::new(),
                members,
                is_expect: false,
            },
        };
        self.builder.declare(&record);
        self
    }

    /// Marks top level `name` as explicitly exported.
    pub fn export(mut self, name: &str) -> Self {
        let signature = self.sig(name);
        self.builder.export(&signature);
        self
    }
}

fn short_name(signature: &Signature) -> String {
    signature
        .as_public()
        .map(|p| p.short_name().to_string())
        .unwrap_or_else(|| signature.to_string())
}

/// An expect-flagged public signature.
pub fn expect_sig(package: &str, declaration: &str) -> Signature {
    Signature::Public(PublicSignature::new(package, declaration).with_flags(SignatureFlags::EXPECT))
}

/// Builds an archive named `name` from file fixtures.
pub fn archive(name: &str, files: Vec<FileFixture>) -> Archive {
    files
        .into_iter()
        .fold(ArchiveBuilder::new(name), |builder, file| builder.file(file.builder))
        .build()
        .expect("fixture archive encodes")
}

/// Every file loads referenced top levels with bodies.
pub fn referenced() -> StrategyResolver {
    uniform(DeserializationStrategy::OnlyReferenced)
}

/// The symbol registered for `signature`, if any.
pub fn symbol(linker: &Linker, signature: &Signature) -> Option<SymbolId> {
    linker.program().symbols.lookup(signature)
}

/// Returns `true` if `signature` is bound, following delegates.
pub fn is_bound(linker: &Linker, signature: &Signature) -> bool {
    symbol(linker, signature).is_some_and(|s| linker.program().symbols.is_bound(s))
}

/// Name of the module whose file holds the declaration bound to `signature`.
pub fn supplying_module(linker: &Linker, signature: &Signature) -> Option<String> {
    let program = linker.program();
    let file = program.declaration_of(symbol(linker, signature)?)?.file?;
    Some(program.modules[program.files[file].module].name.clone())
}

/// Function symbols called from the declaration of `signature`.
pub fn callees(linker: &Linker, signature: &Signature) -> Vec<SymbolId> {
    let program = linker.program();
    let Some(decl) = symbol(linker, signature).and_then(|s| program.declaration_id_of(s)) else {
        return Vec::new();
    };
    referenced_symbols(program, decl)
        .into_iter()
        .filter(|&s| program.symbols.get(s).kind == SymbolKind::Function)
        .collect()
}

/// Returns `true` if `symbol` is a generated stub.
pub fn is_stub(linker: &Linker, symbol: SymbolId) -> bool {
    linker.program().symbols.get(symbol).origin == SymbolOrigin::Stub
}

/// Whether the function bound to `signature` has a body.
pub fn has_body(linker: &Linker, signature: &Signature) -> bool {
    symbol(linker, signature)
        .and_then(|s| linker.program().declaration_of(s))
        .and_then(|d| d.kind.as_function())
        .is_some_and(|f| f.body.is_some())
}

/// Integer default of the first parameter of the function bound to `signature`.
pub fn default_of(linker: &Linker, signature: &Signature) -> Option<i32> {
    let program = linker.program();
    let function = program.declaration_of(symbol(linker, signature)?)?.kind.as_function()?;
    let parameter = *function.value_parameters.first()?;
    match &program.decls[parameter].kind {
        DeclKind::ValueParameter {
            default_value: Some(expr),
            ..
        } => match expr.kind {
            ExprKind::Const(ConstValue::Int(v)) => Some(v),
            _ => None,
        },
        _ => None,
    }
}

/// Diagnostic codes reported so far, in order.
pub fn codes(linker: &Linker) -> Vec<String> {
    linker
        .diagnostics()
        .diagnostics()
        .iter()
        .map(|d| d.code.to_string())
        .collect()
}

/// Dump of the declaration bound to `signature`.
pub fn dump_of(linker: &Linker, signature: &Signature) -> Option<String> {
    let program = linker.program();
    let decl = program.declaration_id_of(symbol(linker, signature)?)?;
    Some(IrDumper::new(program, linker.interner()).dump_declaration(decl))
}

/// Deterministic dump of the linked program.
pub fn dump(linker: &Linker) -> String {
    IrDumper::new(linker.program(), linker.interner()).dump_program()
}
