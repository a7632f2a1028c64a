//! Partial linkage: replacing unlinked symbols with stub declarations.

use crate::context::LinkContext;
use crate::error::{stubbed_code, LinkResult};
use sigil_diagnostics::Origin;
use sigil_ir::decl::{
    Body, ClassDecl, ClassKind, DeclKind, DeclOrigin, Declaration, FieldDecl, FunctionDecl,
    PropertyDecl,
};
use sigil_ir::expr::{Expr, ExprKind};
use sigil_ir::ids::SymbolId;
use sigil_ir::signature::Signature;
use sigil_ir::symbol::{SymbolKind, SymbolOrigin};
use sigil_ir::types::{IrType, Variance};
use sigil_ir::visit;
use std::collections::HashMap;

/// Why a symbol could not be linked.
fn reason(cx: &LinkContext, symbol: SymbolId) -> String {
    let data = cx.program.symbols.get(symbol);
    if data.origin == SymbolOrigin::KindSubstitute {
        let found = data
            .signature
            .as_ref()
            .and_then(|s| cx.program.symbols.lookup(s))
            .map(|registered| cx.program.symbols.get(registered).kind);
        if let Some(found) = found {
            return format!("expected {}, found {found}", data.kind);
        }
    }
    "no declaration found".to_string()
}

fn stub_kind(kind: SymbolKind, message: &str) -> Option<DeclKind> {
    let function = || FunctionDecl {
        type_parameters: Vec::new(),
        value_parameters: Vec::new(),
        return_type: IrType::Error,
        body: Some(Body::Expression(Expr::new(
            IrType::Error,
            ExprKind::LinkageError(message.to_string()),
        ))),
        is_inline: false,
        is_suspend: false,
        is_expect: false,
    };
    let decl = match kind {
        SymbolKind::Function => DeclKind::Function(function()),
        SymbolKind::Constructor => DeclKind::Constructor(function()),
        SymbolKind::Class => DeclKind::Class(ClassDecl {
            class_kind: ClassKind::Class,
            type_parameters: Vec::new(),
            supertypes: Vec::new(),
            members: Vec::new(),
            is_expect: false,
        }),
        SymbolKind::Property => DeclKind::Property(PropertyDecl {
            getter: None,
            setter: None,
            backing_field: None,
            is_var: false,
            is_expect: false,
        }),
        SymbolKind::Field => DeclKind::Field(FieldDecl {
            ty: IrType::Error,
            initializer: None,
        }),
        SymbolKind::EnumEntry => DeclKind::EnumEntry { initializer: None },
        SymbolKind::TypeAlias => DeclKind::TypeAlias {
            type_parameters: Vec::new(),
            expanded: IrType::Error,
        },
        SymbolKind::TypeParameter => DeclKind::TypeParameter {
            index: 0,
            variance: Variance::Invariant,
            bounds: Vec::new(),
        },
        SymbolKind::ValueParameter => DeclKind::ValueParameter {
            index: 0,
            ty: IrType::Error,
            default_value: None,
            is_vararg: false,
        },
        SymbolKind::Variable => DeclKind::Variable {
            ty: IrType::Error,
            initializer: None,
            is_var: false,
        },
        SymbolKind::File => return None,
    };
    Some(decl)
}

/// Binds every symbol that is still unlinked to a fresh stub and points all
/// references at the stub. Returns the number of generated stubs.
pub(crate) fn generate_stubs(cx: &mut LinkContext) -> LinkResult<usize> {
    let unlinked: Vec<SymbolId> = cx
        .program
        .symbols
        .unbound()
        .into_iter()
        .filter(|&s| !cx.program.symbols.is_bound(s))
        .collect();
    let mut remap = HashMap::with_capacity(unlinked.len());
    for old in unlinked {
        let data = cx.program.symbols.get(old);
        let kind = data.kind;
        let signature = data.signature.clone();
        let label = match &signature {
            Some(sig) => sig.to_string(),
            None => format!("<local {kind}>"),
        };
        let message = format!("unlinked symbol {label}: {}", reason(cx, old));
        let Some(decl_kind) = stub_kind(kind, &message) else {
            continue;
        };

        let name = signature
            .as_ref()
            .and_then(Signature::as_public)
            .map(|p| p.short_name().to_string())
            .unwrap_or_else(|| "<unlinked>".to_string());
        let stub = cx.program.symbols.new_symbol(kind, signature.clone());
        cx.program.symbols.mark_stub(stub);
        let decl = Declaration::new(
            stub,
            cx.interner.get_or_intern(&name),
            decl_kind,
            DeclOrigin::UnlinkedStub,
        );
        let id = cx.program.add_declaration(decl)?;
        cx.program.stubs.push(id);
        remap.insert(old, stub);

        let origin = signature
            .as_ref()
            .and_then(|s| cx.owners.get(&s.top_level()))
            .map(|&module| Origin::module(cx.module_name(module)))
            .unwrap_or_default();
        cx.report_partial(stubbed_code(), message, &origin);
    }
    let rewritten = visit::remap_symbols(&mut cx.program, &remap);
    if !remap.is_empty() {
        tracing::info!(stubs = remap.len(), references = rewritten, "unlinked symbols stubbed");
    }
    Ok(remap.len())
}
