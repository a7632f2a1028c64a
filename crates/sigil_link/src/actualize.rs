//! Expect/actual actualization.
//!
//! Runs once after the global fixed point. Each pair whose expect and actual
//! declarations are both bound has its expect symbol retargeted to the
//! actual one; default argument values that only the expect side declares
//! move to the actual's parameters first.

use crate::context::LinkContext;
use crate::error::{expect_actual_skipped_code, LinkResult};
use sigil_diagnostics::Diagnostic;
use sigil_ir::decl::DeclKind;
use sigil_ir::ids::{DeclId, SymbolId};
use sigil_ir::program::Program;
use sigil_ir::signature::Signature;
use sigil_ir::symbol::SymbolOwner;
use sigil_ir::visit;
use std::collections::HashMap;

/// Actualizes every registered pair. Returns the number of retargeted pairs.
pub(crate) fn actualize(cx: &mut LinkContext, pairs: &[(Signature, Signature)]) -> LinkResult<usize> {
    let mut actualized = 0;
    for (expect, actual) in pairs {
        let Some(e) = cx.program.symbols.lookup(expect) else {
            tracing::debug!(%expect, "expect never referenced, nothing to actualize");
            continue;
        };
        let expect_decl = own_decl(&cx.program, e);
        let actual_decl = cx
            .program
            .symbols
            .lookup(actual)
            .and_then(|a| own_decl(&cx.program, a).map(|d| (a, d)));
        let (Some(expect_decl), Some((a, actual_decl))) = (expect_decl, actual_decl) else {
            let missing = if expect_decl.is_none() { expect } else { actual };
            let message = format!("`{expect}` not actualized by `{actual}`: `{missing}` is not bound");
            tracing::warn!("{message}");
            cx.sink
                .emit(Diagnostic::warning(expect_actual_skipped_code(), message));
            continue;
        };
        let moved = merge_defaults(&mut cx.program, expect_decl, actual_decl);
        cx.program.symbols.retarget(e, a)?;
        tracing::debug!(%expect, %actual, moved_defaults = moved, "actualized");
        actualized += 1;
    }
    Ok(actualized)
}

fn own_decl(program: &Program, symbol: SymbolId) -> Option<DeclId> {
    match program.symbols.get(symbol).owner()? {
        SymbolOwner::Decl(id) => Some(id),
        SymbolOwner::File(_) => None,
    }
}

/// Moves default values present only on the expect side onto the actual's
/// matching parameters. Returns the number of moved defaults.
///
/// A moved default that reads another parameter or names a type parameter
/// is rewritten to the actual's counterpart.
fn merge_defaults(program: &mut Program, expect: DeclId, actual: DeclId) -> usize {
    let (Some(expect_fn), Some(actual_fn)) = (
        program.decls[expect].kind.as_function(),
        program.decls[actual].kind.as_function(),
    ) else {
        return 0;
    };
    let pairs: Vec<(DeclId, DeclId)> = expect_fn
        .value_parameters
        .iter()
        .copied()
        .zip(actual_fn.value_parameters.iter().copied())
        .collect();
    let parameters: HashMap<SymbolId, SymbolId> = expect_fn
        .type_parameters
        .iter()
        .zip(&actual_fn.type_parameters)
        .chain(pairs.iter().map(|(from, to)| (from, to)))
        .map(|(&from, &to)| (program.decls[from].symbol, program.decls[to].symbol))
        .collect();
    let mut moved = 0;
    for (from, to) in pairs {
        let target_empty = matches!(
            program.decls[to].kind,
            DeclKind::ValueParameter {
                default_value: None,
                ..
            }
        );
        if !target_empty {
            continue;
        }
        let taken = match &mut program.decls[from].kind {
            DeclKind::ValueParameter { default_value, .. } => default_value.take(),
            _ => None,
        };
        let Some(mut value) = taken else { continue };
        visit::remap_expr(program, &mut value, &parameters);
        if let DeclKind::ValueParameter { default_value, .. } = &mut program.decls[to].kind {
            *default_value = Some(value);
            moved += 1;
        }
    }
    moved
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::options::LinkOptions;
    use sigil_ir::const_value::ConstValue;
    use sigil_ir::decl::{DeclOrigin, Declaration, FunctionDecl};
    use sigil_ir::expr::{Expr, ExprKind};
    use sigil_ir::signature::{PublicSignature, SignatureFlags};
    use sigil_ir::symbol::SymbolKind;
    use sigil_ir::types::IrType;

    fn expect_sig(name: &str) -> Signature {
        Signature::Public(PublicSignature::new("common", name).with_flags(SignatureFlags::EXPECT))
    }

    fn declare_function(cx: &mut LinkContext, signature: &Signature, default: Option<i32>) -> DeclId {
        let parameter_sig = Signature::Composite {
            container: Box::new(signature.clone()),
            inner: Box::new(Signature::ScopedLocal(0)),
        };
        let parameter_symbol = cx.program.symbols.reference(&parameter_sig, SymbolKind::ValueParameter);
        let parameter = cx
            .program
            .add_declaration(Declaration::new(
                parameter_symbol,
                cx.interner.get_or_intern("x"),
                DeclKind::ValueParameter {
                    index: 0,
                    ty: IrType::Dynamic,
                    default_value: default.map(|v| Expr::new(IrType::Dynamic, ExprKind::Const(ConstValue::Int(v)))),
                    is_vararg: false,
                },
                DeclOrigin::Deserialized,
            ))
            .unwrap();
        let symbol = cx.program.symbols.reference(signature, SymbolKind::Function);
        cx.program
            .add_declaration(Declaration::new(
                symbol,
                cx.interner.get_or_intern("now"),
                DeclKind::Function(FunctionDecl {
                    type_parameters: Vec::new(),
                    value_parameters: vec![parameter],
                    return_type: IrType::Dynamic,
                    body: None,
                    is_inline: false,
                    is_suspend: false,
                    is_expect: signature.is_expect(),
                }),
                DeclOrigin::Deserialized,
            ))
            .unwrap()
    }

    fn default_of(program: &Program, function: DeclId) -> Option<Expr> {
        let parameter = program.decls[function].kind.as_function().unwrap().value_parameters[0];
        match &program.decls[parameter].kind {
            DeclKind::ValueParameter { default_value, .. } => default_value.clone(),
            _ => None,
        }
    }

    #[test]
    fn retargets_and_moves_missing_defaults() {
        let mut cx = LinkContext::new(LinkOptions::default());
        let expect = expect_sig("now");
        let actual = Signature::public("jvm", "now");
        let e_decl = declare_function(&mut cx, &expect, Some(5));
        let a_decl = declare_function(&mut cx, &actual, None);

        let count = actualize(&mut cx, &[(expect.clone(), actual.clone())]).unwrap();
        assert_eq!(count, 1);
        let e = cx.program.symbols.lookup(&expect).unwrap();
        assert_eq!(cx.program.declaration_id_of(e), Some(a_decl));
        assert!(default_of(&cx.program, e_decl).is_none());
        assert_eq!(
            default_of(&cx.program, a_decl).map(|e| e.kind),
            Some(ExprKind::Const(ConstValue::Int(5)))
        );
    }

    #[test]
    fn actual_default_wins() {
        let mut cx = LinkContext::new(LinkOptions::default());
        let expect = expect_sig("now");
        let actual = Signature::public("jvm", "now");
        let e_decl = declare_function(&mut cx, &expect, Some(5));
        let a_decl = declare_function(&mut cx, &actual, Some(7));

        actualize(&mut cx, &[(expect, actual)]).unwrap();
        assert!(default_of(&cx.program, e_decl).is_some());
        assert_eq!(
            default_of(&cx.program, a_decl).map(|e| e.kind),
            Some(ExprKind::Const(ConstValue::Int(7)))
        );
    }

    /// `f(a, b = a)` when `reads_first`, `f(a, b)` otherwise.
    fn declare_pair_function(
        cx: &mut LinkContext,
        signature: &Signature,
        reads_first: bool,
    ) -> (DeclId, Vec<SymbolId>) {
        let mut parameters = Vec::new();
        let mut symbols = Vec::new();
        for (index, name) in ["a", "b"].into_iter().enumerate() {
            let parameter_sig = Signature::Composite {
                container: Box::new(signature.clone()),
                inner: Box::new(Signature::ScopedLocal(index as u32)),
            };
            let symbol = cx.program.symbols.reference(&parameter_sig, SymbolKind::ValueParameter);
            symbols.push(symbol);
            let default_value = (index == 1 && reads_first)
                .then(|| Expr::new(IrType::Dynamic, ExprKind::GetValue(symbols[0])));
            let parameter = cx
                .program
                .add_declaration(Declaration::new(
                    symbol,
                    cx.interner.get_or_intern(name),
                    DeclKind::ValueParameter {
                        index: index as u32,
                        ty: IrType::Dynamic,
                        default_value,
                        is_vararg: false,
                    },
                    DeclOrigin::Deserialized,
                ))
                .unwrap();
            parameters.push(parameter);
        }
        let symbol = cx.program.symbols.reference(signature, SymbolKind::Function);
        let decl = cx
            .program
            .add_declaration(Declaration::new(
                symbol,
                cx.interner.get_or_intern("pick"),
                DeclKind::Function(FunctionDecl {
                    type_parameters: Vec::new(),
                    value_parameters: parameters,
                    return_type: IrType::Dynamic,
                    body: None,
                    is_inline: false,
                    is_suspend: false,
                    is_expect: signature.is_expect(),
                }),
                DeclOrigin::Deserialized,
            ))
            .unwrap();
        (decl, symbols)
    }

    #[test]
    fn moved_default_reads_actual_parameter() {
        let mut cx = LinkContext::new(LinkOptions::default());
        let expect = expect_sig("pick");
        let actual = Signature::public("jvm", "pick");
        let (_, expect_params) = declare_pair_function(&mut cx, &expect, true);
        let (a_decl, actual_params) = declare_pair_function(&mut cx, &actual, false);

        actualize(&mut cx, &[(expect, actual)]).unwrap();
        let b = cx.program.decls[a_decl].kind.as_function().unwrap().value_parameters[1];
        let DeclKind::ValueParameter { default_value: Some(value), .. } = &cx.program.decls[b].kind else {
            panic!("default was not moved");
        };
        assert_eq!(value.kind, ExprKind::GetValue(actual_params[0]));
        assert_ne!(value.kind, ExprKind::GetValue(expect_params[0]));
    }

    #[test]
    fn unbound_actual_is_skipped_with_warning() {
        let mut cx = LinkContext::new(LinkOptions::default());
        let expect = expect_sig("now");
        declare_function(&mut cx, &expect, None);

        let count = actualize(&mut cx, &[(expect, Signature::public("jvm", "now"))]).unwrap();
        assert_eq!(count, 0);
        let diags = cx.sink.diagnostics();
        assert_eq!(diags.len(), 1);
        assert_eq!(diags[0].code.to_string(), "W302");
    }
}
