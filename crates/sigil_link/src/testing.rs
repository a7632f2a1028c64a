//! Record builders shared by the unit tests of this crate.

use sigil_archive::records::{
    BodyRecord, DeclKindRecord, DeclRecord, ExprRecord, FunctionRecord, OperationRecord,
    StatementRecord, TypeRecord,
};
use sigil_archive::{Archive, ArchiveBuilder, FileBuilder};
use sigil_ir::decl::ClassKind;
use sigil_ir::signature::Signature;
use sigil_ir::symbol::SymbolKind;

fn short_name(signature: &Signature) -> String {
    match signature.as_public() {
        Some(public) => public.short_name().to_string(),
        None => signature.to_string(),
    }
}

pub(crate) fn dynamic(fb: &mut FileBuilder) -> u32 {
    fb.type_record(TypeRecord::Dynamic)
}

pub(crate) fn expr(fb: &mut FileBuilder, operation: OperationRecord) -> ExprRecord {
    ExprRecord {
        ty: dynamic(fb),
        start: 0,
        end: 0,
        operation,
    }
}

pub(crate) fn call(fb: &mut FileBuilder, callee: &Signature) -> ExprRecord {
    let callee = fb.symbol(SymbolKind::Function, callee);
    expr(
        fb,
        OperationRecord::Call {
            callee,
            receiver: None,
            type_arguments: Vec::new(),
            arguments: Vec::new(),
        },
    )
}

pub(crate) fn function_with_body(fb: &mut FileBuilder, signature: &Signature, body: BodyRecord) -> DeclRecord {
    let body = fb.body(&body);
    let return_type = dynamic(fb);
    DeclRecord {
        symbol: fb.symbol(SymbolKind::Function, signature),
        name: fb.string(&short_name(signature)),
        start: 0,
        end: 0,
        debug_info: None,
        kind: DeclKindRecord::Function(FunctionRecord {
            type_parameters: Vec::new(),
            value_parameters: Vec::new(),
            return_type,
            body: Some(body),
            is_inline: false,
            is_suspend: false,
            is_expect: false,
        }),
    }
}

/// A function whose block body calls each of `calls` in order.
pub(crate) fn function(fb: &mut FileBuilder, signature: &Signature, calls: &[&Signature]) -> DeclRecord {
    let statements = calls
        .iter()
        .map(|callee| StatementRecord::Expr(call(fb, callee)))
        .collect();
    function_with_body(fb, signature, BodyRecord::Block(statements))
}

pub(crate) fn class(fb: &mut FileBuilder, signature: &Signature, members: Vec<DeclRecord>) -> DeclRecord {
    DeclRecord {
        symbol: fb.symbol(SymbolKind::Class, signature),
        name: fb.string(&short_name(signature)),
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
    }
}

/// A one-file archive of functions, each calling the listed signatures.
pub(crate) fn archive(name: &str, package: &str, functions: &[(&Signature, &[&Signature])]) -> Archive {
    let mut fb = FileBuilder::new(format!("{name}.kt"), package);
    for (signature, calls) in functions {
        let record = function(&mut fb, signature, calls);
        fb.declare(&record);
    }
    ArchiveBuilder::new(name).file(fb).build().unwrap()
}
