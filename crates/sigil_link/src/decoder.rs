//! Materializing declaration records into the program.
//!
//! A [`Decoder`] lives for one top-level declaration. It walks the record
//! tree depth-first, creating a symbol for every signature it meets:
//!
//! - scoped-local signatures resolve inside the top level being decoded,
//! - file-local signatures resolve in the file and may queue a sibling top
//!   level of the same file,
//! - everything else goes through the session symbol table, and unbound
//!   symbols become reachability requests for their top level.

use crate::context::LinkContext;
use crate::error::{LinkError, LinkResult};
use crate::file::FileState;
use sigil_archive::records::{
    BodyRecord, ConstRecord, DeclKindRecord, DeclRecord, ExprRecord, FunctionRecord,
    OperationRecord, StatementRecord, SymbolRef, TypeArgumentRecord, TypeRecord,
};
use sigil_archive::ArchiveFile;
use sigil_diagnostics::Origin;
use sigil_ir::const_value::ConstValue;
use sigil_ir::decl::{
    Body, ClassDecl, DeclKind, DeclOrigin, Declaration, FieldDecl, FunctionDecl, PropertyDecl,
};
use sigil_ir::expr::{Branch, Catch, Coordinates, Expr, ExprKind, Loop, Statement};
use sigil_ir::ids::{DeclId, FileId, LoopId, ModuleId, SymbolId};
use sigil_ir::signature::Signature;
use sigil_ir::symbol::SymbolKind;
use sigil_ir::types::{IrType, TypeArgument};
use std::borrow::Cow;
use std::collections::HashMap;

/// Materializes top level `signature` of `file` if it is not bound yet.
///
/// Returns the new declaration, or `None` when the signature is already
/// bound or another module supplies it.
pub(crate) fn materialize(
    file: &ArchiveFile,
    state: &mut FileState,
    cx: &mut LinkContext,
    module: ModuleId,
    signature: &Signature,
) -> LinkResult<Option<DeclId>> {
    let Some(&record_index) = state.top_levels.get(signature) else {
        return Ok(None);
    };
    if let Some(existing) = cx.program.symbols.lookup(signature) {
        if cx.program.symbols.get(existing).is_bound() {
            tracing::debug!(%signature, file = %state.name, "top level already bound, skipping");
            return Ok(None);
        }
    }
    if cx.supplied_elsewhere(signature, module) {
        tracing::debug!(%signature, file = %state.name, "top level supplied by another module, skipping");
        return Ok(None);
    }
    state.requested.insert(signature.clone());
    let origin = Origin::module(cx.module_name(module)).with_file(state.name.clone());
    let file_id = state.file_id(cx, module, &file.package);
    let record = file
        .declaration_record(record_index)
        .map_err(|e| LinkError::from(e).in_file(&state.name))?;
    let id = {
        let mut decoder = Decoder::new(file, state, cx, module, file_id, origin.clone());
        decoder.declaration(&record)
    };
    let id = id.map_err(|e| locate(e, &origin))?;
    cx.program.files[file_id].declarations.push(id);
    tracing::debug!(%signature, file = %state.name, "top level materialized");
    Ok(Some(id))
}

/// Resolves a local signature of `file` for a caller outside any declaration.
pub(crate) fn resolve_local(
    file: &ArchiveFile,
    state: &mut FileState,
    cx: &mut LinkContext,
    module: ModuleId,
    signature: &Signature,
    kind: SymbolKind,
) -> LinkResult<SymbolId> {
    let origin = Origin::module(cx.module_name(module)).with_file(state.name.clone());
    let file_id = state.file_id(cx, module, &file.package);
    let mut decoder = Decoder::new(file, state, cx, module, file_id, origin.clone());
    decoder.resolve(signature, kind).map_err(|e| locate(e, &origin))
}

fn locate(error: LinkError, origin: &Origin) -> LinkError {
    let error = match &origin.file {
        Some(file) => error.in_file(file),
        None => error,
    };
    match &origin.module {
        Some(module) => error.in_module(module),
        None => error,
    }
}

/// Decodes one top-level declaration record tree.
pub(crate) struct Decoder<'a> {
    file: &'a ArchiveFile,
    state: &'a mut FileState,
    cx: &'a mut LinkContext,
    module: ModuleId,
    file_id: FileId,
    origin: Origin,
    scoped: HashMap<u32, SymbolId>,
    touched_scoped: bool,
    depth: usize,
}

impl<'a> Decoder<'a> {
    pub(crate) fn new(
        file: &'a ArchiveFile,
        state: &'a mut FileState,
        cx: &'a mut LinkContext,
        module: ModuleId,
        file_id: FileId,
        origin: Origin,
    ) -> Self {
        Self {
            file,
            state,
            cx,
            module,
            file_id,
            origin,
            scoped: HashMap::new(),
            touched_scoped: false,
            depth: 0,
        }
    }

    fn enter(&mut self) -> LinkResult<()> {
        self.depth += 1;
        if self.depth > self.cx.options.max_depth {
            return Err(LinkError::format(format!(
                "recursion depth exceeded (limit {})",
                self.cx.options.max_depth
            )));
        }
        Ok(())
    }

    fn leave(&mut self) {
        self.depth -= 1;
    }

    fn string(&self, index: u32) -> LinkResult<Cow<'a, str>> {
        Ok(self.file.string(index)?)
    }

    // ---- symbols ----

    fn signature(&mut self, index: u32) -> LinkResult<Signature> {
        self.state.codec.decode(self.file, index)
    }

    fn reference(&mut self, symbol: SymbolRef) -> LinkResult<SymbolId> {
        let signature = self.signature(symbol.signature)?;
        self.resolve(&signature, symbol.kind)
    }

    /// Returns the symbol a use of `signature` as a `kind` refers to.
    pub(crate) fn resolve(&mut self, signature: &Signature, kind: SymbolKind) -> LinkResult<SymbolId> {
        match signature {
            Signature::ScopedLocal(local) => {
                self.touched_scoped = true;
                let symbols = &mut self.cx.program.symbols;
                let id = *self
                    .scoped
                    .entry(*local)
                    .or_insert_with(|| symbols.new_symbol(kind, Some(signature.clone())));
                self.check_local_kind(signature, id, kind)?;
                Ok(id)
            }
            _ if signature.is_local() => {
                let id = self.file_local(signature, kind);
                self.check_local_kind(signature, id, kind)?;
                self.state.enqueue(&signature.top_level());
                Ok(id)
            }
            _ => {
                let id = self.cx.reference(signature, kind, &self.origin)?;
                // Requested even when already bound, so routing sees the same
                // requests whatever module bound it first.
                let top = signature.top_level();
                if self.state.requested.insert(top.clone()) {
                    tracing::trace!(signature = %top, file = %self.state.name, "reachable");
                    self.cx.request(&top, self.module);
                }
                Ok(id)
            }
        }
    }

    fn file_local(&mut self, signature: &Signature, kind: SymbolKind) -> SymbolId {
        let symbols = &mut self.cx.program.symbols;
        *self
            .state
            .locals
            .entry(signature.clone())
            .or_insert_with(|| symbols.new_symbol(kind, Some(signature.clone())))
    }

    fn check_local_kind(&self, signature: &Signature, id: SymbolId, kind: SymbolKind) -> LinkResult<()> {
        let found = self.cx.program.symbols.get(id).kind;
        if found != kind {
            return Err(LinkError::format(format!(
                "local signature `{signature}` used as both {found} and {kind}"
            )));
        }
        Ok(())
    }

    /// Returns the symbol a declaration record binds.
    fn declare(&mut self, symbol: SymbolRef) -> LinkResult<SymbolId> {
        let signature = self.signature(symbol.signature)?;
        if !signature.is_local() {
            return self.cx.declare(&signature, symbol.kind, &self.origin);
        }
        let id = self.resolve(&signature, symbol.kind)?;
        if self.cx.program.symbols.get(id).is_bound() {
            return Err(LinkError::format(format!(
                "local signature `{signature}` declared twice"
            )));
        }
        Ok(id)
    }

    // ---- declarations ----

    /// Decodes a declaration record and everything nested in it.
    pub(crate) fn declaration(&mut self, record: &DeclRecord) -> LinkResult<DeclId> {
        self.enter()?;
        let symbol = self.declare(record.symbol)?;
        let name = self.cx.interner.get_or_intern(&self.string(record.name)?);
        let debug_name = match record.debug_info {
            Some(index) => self.file.debug_string(index)?.map(Cow::into_owned),
            None => None,
        };
        let mut children = Vec::new();
        let kind = self.decl_kind(&record.kind, &mut children)?;

        let mut decl = Declaration::new(symbol, name, kind, DeclOrigin::Deserialized);
        decl.file = Some(self.file_id);
        decl.coordinates = Coordinates::new(record.start, record.end);
        decl.debug_name = debug_name;
        let id = self.cx.program.add_declaration(decl)?;
        for child in children {
            self.cx.program.decls[child].parent = Some(id);
        }
        self.leave();
        Ok(id)
    }

    fn nested(&mut self, records: &[DeclRecord], children: &mut Vec<DeclId>) -> LinkResult<Vec<DeclId>> {
        let mut ids = Vec::with_capacity(records.len());
        for record in records {
            let id = self.declaration(record)?;
            children.push(id);
            ids.push(id);
        }
        Ok(ids)
    }

    fn nested_one(
        &mut self,
        record: Option<&DeclRecord>,
        children: &mut Vec<DeclId>,
    ) -> LinkResult<Option<DeclId>> {
        let Some(record) = record else {
            return Ok(None);
        };
        let id = self.declaration(record)?;
        children.push(id);
        Ok(Some(id))
    }

    fn decl_kind(&mut self, kind: &DeclKindRecord, children: &mut Vec<DeclId>) -> LinkResult<DeclKind> {
        let decoded = match kind {
            DeclKindRecord::Class {
                class_kind,
                type_parameters,
                supertypes,
                members,
                is_expect,
            } => DeclKind::Class(ClassDecl {
                class_kind: *class_kind,
                type_parameters: self.nested(type_parameters, children)?,
                supertypes: self.types(supertypes)?,
                members: self.nested(members, children)?,
                is_expect: *is_expect,
            }),
            DeclKindRecord::Function(function) => DeclKind::Function(self.function(function, children)?),
            DeclKindRecord::Constructor(function) => {
                DeclKind::Constructor(self.function(function, children)?)
            }
            DeclKindRecord::Property {
                getter,
                setter,
                backing_field,
                is_var,
                is_expect,
            } => DeclKind::Property(PropertyDecl {
                getter: self.nested_one(getter.as_deref(), children)?,
                setter: self.nested_one(setter.as_deref(), children)?,
                backing_field: self.nested_one(backing_field.as_deref(), children)?,
                is_var: *is_var,
                is_expect: *is_expect,
            }),
            DeclKindRecord::Field { ty, initializer } => DeclKind::Field(FieldDecl {
                ty: self.ty(*ty)?,
                initializer: self.initializer(*initializer)?,
            }),
            DeclKindRecord::EnumEntry { initializer } => DeclKind::EnumEntry {
                initializer: self.initializer(*initializer)?,
            },
            DeclKindRecord::TypeAlias {
                type_parameters,
                expanded,
            } => DeclKind::TypeAlias {
                type_parameters: self.nested(type_parameters, children)?,
                expanded: self.ty(*expanded)?,
            },
            DeclKindRecord::TypeParameter {
                index,
                variance,
                bounds,
            } => DeclKind::TypeParameter {
                index: *index,
                variance: *variance,
                bounds: self.types(bounds)?,
            },
            DeclKindRecord::ValueParameter {
                index,
                ty,
                default_value,
                is_vararg,
            } => DeclKind::ValueParameter {
                index: *index,
                ty: self.ty(*ty)?,
                default_value: default_value.map(|body| self.body_expr(body)).transpose()?,
                is_vararg: *is_vararg,
            },
            DeclKindRecord::Variable {
                ty,
                initializer,
                is_var,
            } => DeclKind::Variable {
                ty: self.ty(*ty)?,
                initializer: initializer.as_deref().map(|e| self.expr(e)).transpose()?,
                is_var: *is_var,
            },
            DeclKindRecord::Unset => return Err(LinkError::format("declaration kind is unset")),
        };
        Ok(decoded)
    }

    fn function(&mut self, record: &FunctionRecord, children: &mut Vec<DeclId>) -> LinkResult<FunctionDecl> {
        let type_parameters = self.nested(&record.type_parameters, children)?;
        let value_parameters = self.nested(&record.value_parameters, children)?;
        let return_type = self.ty(record.return_type)?;
        let body = match record.body {
            Some(body) if self.state.strategy.loads_body(record.is_inline) => Some(self.body(body)?),
            _ => None,
        };
        Ok(FunctionDecl {
            type_parameters,
            value_parameters,
            return_type,
            body,
            is_inline: record.is_inline,
            is_suspend: record.is_suspend,
            is_expect: record.is_expect,
        })
    }

    fn initializer(&mut self, body: Option<u32>) -> LinkResult<Option<Expr>> {
        match body {
            Some(body) if self.state.strategy.need_bodies() => Ok(Some(self.body_expr(body)?)),
            _ => Ok(None),
        }
    }

    // ---- bodies ----

    fn body(&mut self, index: u32) -> LinkResult<Body> {
        match self.file.body_record(index)? {
            BodyRecord::Expression(expr) => Ok(Body::Expression(self.expr(&expr)?)),
            BodyRecord::Block(statements) => Ok(Body::Block(self.statements(&statements)?)),
            BodyRecord::Unset => Err(LinkError::format(format!("body {index} is unset"))),
        }
    }

    fn body_expr(&mut self, index: u32) -> LinkResult<Expr> {
        match self.file.body_record(index)? {
            BodyRecord::Expression(expr) => self.expr(&expr),
            BodyRecord::Block(_) => Err(LinkError::format(format!(
                "body {index} is a block where an expression is expected"
            ))),
            BodyRecord::Unset => Err(LinkError::format(format!("body {index} is unset"))),
        }
    }

    fn statements(&mut self, records: &[StatementRecord]) -> LinkResult<Vec<Statement>> {
        records
            .iter()
            .map(|record| match record {
                StatementRecord::Expr(expr) => Ok(Statement::Expr(self.expr(expr)?)),
                StatementRecord::Decl(decl) => Ok(Statement::Decl(self.declaration(decl)?)),
                StatementRecord::Unset => Err(LinkError::format("statement is unset")),
            })
            .collect()
    }

    fn exprs(&mut self, records: &[ExprRecord]) -> LinkResult<Vec<Expr>> {
        records.iter().map(|e| self.expr(e)).collect()
    }

    fn boxed(&mut self, record: &ExprRecord) -> LinkResult<Box<Expr>> {
        Ok(Box::new(self.expr(record)?))
    }

    fn optional(&mut self, record: Option<&ExprRecord>) -> LinkResult<Option<Box<Expr>>> {
        record.map(|e| self.boxed(e)).transpose()
    }

    fn arguments(&mut self, records: &[Option<ExprRecord>]) -> LinkResult<Vec<Option<Expr>>> {
        records
            .iter()
            .map(|arg| arg.as_ref().map(|e| self.expr(e)).transpose())
            .collect()
    }

    fn expr(&mut self, record: &ExprRecord) -> LinkResult<Expr> {
        self.enter()?;
        let ty = self.ty(record.ty)?;
        let kind = self.operation(&record.operation)?;
        self.leave();
        Ok(Expr {
            ty,
            coordinates: Coordinates::new(record.start, record.end),
            kind,
        })
    }

    fn operation(&mut self, operation: &OperationRecord) -> LinkResult<ExprKind> {
        let kind = match operation {
            OperationRecord::Const(value) => ExprKind::Const(self.constant(value)?),
            OperationRecord::Block(statements) => ExprKind::Block(self.statements(statements)?),
            OperationRecord::Call {
                callee,
                receiver,
                type_arguments,
                arguments,
            } => ExprKind::Call {
                callee: self.reference(*callee)?,
                receiver: self.optional(receiver.as_deref())?,
                type_arguments: self.types(type_arguments)?,
                arguments: self.arguments(arguments)?,
            },
            OperationRecord::ConstructorCall {
                constructor,
                type_arguments,
                arguments,
            } => ExprKind::ConstructorCall {
                constructor: self.reference(*constructor)?,
                type_arguments: self.types(type_arguments)?,
                arguments: self.arguments(arguments)?,
            },
            OperationRecord::FunctionReference {
                target,
                type_arguments,
            } => ExprKind::FunctionReference {
                target: self.reference(*target)?,
                type_arguments: self.types(type_arguments)?,
            },
            OperationRecord::PropertyReference { target } => ExprKind::PropertyReference {
                target: self.reference(*target)?,
            },
            OperationRecord::GetValue { symbol } => ExprKind::GetValue(self.reference(*symbol)?),
            OperationRecord::SetValue { symbol, value } => ExprKind::SetValue {
                target: self.reference(*symbol)?,
                value: self.boxed(value)?,
            },
            OperationRecord::GetField { field, receiver } => ExprKind::GetField {
                field: self.reference(*field)?,
                receiver: self.optional(receiver.as_deref())?,
            },
            OperationRecord::SetField {
                field,
                receiver,
                value,
            } => ExprKind::SetField {
                field: self.reference(*field)?,
                receiver: self.optional(receiver.as_deref())?,
                value: self.boxed(value)?,
            },
            OperationRecord::GetObject { symbol } => ExprKind::GetObject(self.reference(*symbol)?),
            OperationRecord::GetEnumValue { symbol } => {
                ExprKind::GetEnumValue(self.reference(*symbol)?)
            }
            OperationRecord::Return { target, value } => ExprKind::Return {
                target: self.reference(*target)?,
                value: self.boxed(value)?,
            },
            OperationRecord::When { branches } => {
                let mut decoded = Vec::with_capacity(branches.len());
                for branch in branches {
                    decoded.push(Branch {
                        condition: self.expr(&branch.condition)?,
                        result: self.expr(&branch.result)?,
                    });
                }
                ExprKind::When(decoded)
            }
            OperationRecord::Loop {
                loop_id,
                kind,
                label,
                condition,
                body,
            } => {
                if self.state.loops.contains_key(loop_id) {
                    return Err(LinkError::format(format!("loop {loop_id} declared twice")));
                }
                let label = label
                    .map(|l| self.string(l).map(Cow::into_owned))
                    .transpose()?;
                let id = self.cx.program.loops.alloc(Loop {
                    kind: *kind,
                    label,
                    condition: None,
                    body: None,
                });
                self.state.loops.insert(*loop_id, id);
                let condition = self.expr(condition)?;
                let body = body.as_deref().map(|b| self.expr(b)).transpose()?;
                let header = &mut self.cx.program.loops[id];
                header.condition = Some(condition);
                header.body = body;
                ExprKind::Loop(id)
            }
            OperationRecord::Break { loop_id } => ExprKind::Break(self.loop_header(*loop_id)?),
            OperationRecord::Continue { loop_id } => ExprKind::Continue(self.loop_header(*loop_id)?),
            OperationRecord::Throw { value } => ExprKind::Throw(self.boxed(value)?),
            OperationRecord::TypeOp {
                operator,
                operand,
                argument,
            } => ExprKind::TypeOp {
                operator: *operator,
                operand: self.ty(*operand)?,
                argument: self.boxed(argument)?,
            },
            OperationRecord::StringConcat { parts } => ExprKind::StringConcat(self.exprs(parts)?),
            OperationRecord::Try {
                body,
                catches,
                finally,
            } => {
                let body = self.boxed(body)?;
                let mut decoded = Vec::with_capacity(catches.len());
                for catch in catches {
                    decoded.push(Catch {
                        parameter: self.declaration(&catch.parameter)?,
                        result: self.expr(&catch.result)?,
                    });
                }
                ExprKind::Try {
                    body,
                    catches: decoded,
                    finally: self.optional(finally.as_deref())?,
                }
            }
            OperationRecord::Vararg { elements } => ExprKind::Vararg(self.exprs(elements)?),
            OperationRecord::Unset => return Err(LinkError::format("expression operation is unset")),
        };
        Ok(kind)
    }

    fn loop_header(&self, loop_id: i32) -> LinkResult<LoopId> {
        self.state
            .loops
            .get(&loop_id)
            .copied()
            .ok_or_else(|| LinkError::format(format!("exit jump before loop header {loop_id}")))
    }

    fn constant(&self, value: &ConstRecord) -> LinkResult<ConstValue> {
        let value = match value {
            ConstRecord::Null => ConstValue::Null,
            ConstRecord::Boolean(v) => ConstValue::Boolean(*v),
            ConstRecord::Char(unit) => {
                ConstValue::Char(char::from_u32(u32::from(*unit)).unwrap_or(char::REPLACEMENT_CHARACTER))
            }
            ConstRecord::Byte(v) => ConstValue::Byte(*v),
            ConstRecord::Short(v) => ConstValue::Short(*v),
            ConstRecord::Int(v) => ConstValue::Int(*v),
            ConstRecord::Long(v) => ConstValue::Long(*v),
            ConstRecord::Float(bits) => ConstValue::Float(f32::from_bits(*bits)),
            ConstRecord::Double(bits) => ConstValue::Double(f64::from_bits(*bits)),
            ConstRecord::String(index) => ConstValue::String(self.string(*index)?.into_owned()),
            ConstRecord::Unset => return Err(LinkError::format("constant is unset")),
        };
        Ok(value)
    }

    // ---- types ----

    fn types(&mut self, indices: &[u32]) -> LinkResult<Vec<IrType>> {
        indices.iter().map(|&i| self.ty(i)).collect()
    }

    /// Decodes type `index`. Types that mention no scoped local are the
    /// same everywhere in the file and are cached.
    fn ty(&mut self, index: u32) -> LinkResult<IrType> {
        if let Some(ty) = self.state.types.get(&index) {
            return Ok(ty.clone());
        }
        let outer = std::mem::replace(&mut self.touched_scoped, false);
        self.enter()?;
        let ty = self.decode_type(index)?;
        self.leave();
        if !self.touched_scoped {
            self.state.types.insert(index, ty.clone());
        }
        self.touched_scoped |= outer;
        Ok(ty)
    }

    fn decode_type(&mut self, index: u32) -> LinkResult<IrType> {
        let ty = match self.file.type_record(index)? {
            TypeRecord::Simple {
                classifier,
                arguments,
                nullable,
            } => {
                let classifier = self.reference(classifier)?;
                let mut decoded = Vec::with_capacity(arguments.len());
                for argument in arguments {
                    decoded.push(match argument {
                        TypeArgumentRecord::Star => TypeArgument::Star,
                        TypeArgumentRecord::Projection { variance, ty } => TypeArgument::Projection {
                            variance,
                            ty: self.ty(ty)?,
                        },
                    });
                }
                IrType::Simple {
                    classifier,
                    arguments: decoded,
                    nullable,
                }
            }
            TypeRecord::Dynamic => IrType::Dynamic,
            TypeRecord::Error => IrType::Error,
            TypeRecord::Unset => return Err(LinkError::format(format!("type {index} is unset"))),
        };
        Ok(ty)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::context::LinkContext;
    use crate::options::LinkOptions;
    use crate::strategy::DeserializationStrategy;
    use crate::testing::{call, class, dynamic, expr, function, function_with_body};
    use sigil_archive::records::{encode_record, BodyRecord};
    use sigil_archive::{FileBuilder, TableKind};
    use sigil_ir::expr::LoopKind;

    struct Fixture {
        file: ArchiveFile,
        state: FileState,
        cx: LinkContext,
        module: ModuleId,
    }

    impl Fixture {
        fn new(file: ArchiveFile, strategy: DeserializationStrategy) -> Self {
            Self::with_options(file, strategy, LinkOptions::default())
        }

        fn with_options(file: ArchiveFile, strategy: DeserializationStrategy, options: LinkOptions) -> Self {
            let mut cx = LinkContext::new(options);
            let module = cx.program.add_module("lib");
            let mut state = FileState::new(0, file.name.clone(), strategy);
            state.index(&file).unwrap();
            Self {
                file,
                state,
                cx,
                module,
            }
        }

        fn materialize(&mut self, signature: &Signature) -> LinkResult<Option<DeclId>> {
            materialize(&self.file, &mut self.state, &mut self.cx, self.module, signature)
        }
    }

    #[test]
    fn call_creates_unbound_symbol_and_request() {
        let f = Signature::public("pkg", "f");
        let g = Signature::public("pkg", "g");
        let mut fb = FileBuilder::new("a.kt", "pkg");
        let record = function(&mut fb, &f, &[&g]);
        fb.declare(&record);
        let mut fx = Fixture::new(fb.finish().unwrap(), DeserializationStrategy::OnlyReferenced);

        let id = fx.materialize(&f).unwrap().unwrap();
        let decl = &fx.cx.program.decls[id];
        let body = decl.kind.as_function().unwrap().body.as_ref().unwrap();
        let Body::Block(statements) = body else {
            panic!("expected block body");
        };
        assert_eq!(statements.len(), 1);
        let file = decl.file.unwrap();

        let g_symbol = fx.cx.program.symbols.lookup(&g).unwrap();
        assert!(!fx.cx.program.symbols.is_bound(g_symbol));
        let requests = fx.cx.take_requests();
        assert_eq!(requests.len(), 1);
        assert_eq!(requests[0].signature, g);
        assert_eq!(fx.cx.program.files[file].declarations, vec![id]);
    }

    #[test]
    fn headers_strategy_skips_bodies_and_initializers() {
        let f = Signature::public("pkg", "f");
        let g = Signature::public("pkg", "g");
        let mut fb = FileBuilder::new("a.kt", "pkg");
        let record = function(&mut fb, &f, &[&g]);
        fb.declare(&record);
        let mut fx = Fixture::new(fb.finish().unwrap(), DeserializationStrategy::OnlyDeclarationHeaders);

        let id = fx.materialize(&f).unwrap().unwrap();
        assert!(fx.cx.program.decls[id].kind.as_function().unwrap().body.is_none());
        assert!(fx.cx.take_requests().is_empty());
        assert_eq!(fx.cx.program.symbols.lookup(&g), None);
    }

    #[test]
    fn nested_members_get_parent_and_class_binds_once() {
        let c = Signature::public("pkg", "C");
        let m = Signature::public("pkg", "C.m");
        let mut fb = FileBuilder::new("a.kt", "pkg");
        let member = function(&mut fb, &m, &[]);
        let record = class(&mut fb, &c, vec![member]);
        fb.declare(&record);
        let mut fx = Fixture::new(fb.finish().unwrap(), DeserializationStrategy::OnlyReferenced);

        let id = fx.materialize(&c).unwrap().unwrap();
        let member_symbol = fx.cx.program.symbols.lookup(&m).unwrap();
        let member_decl = fx.cx.program.declaration_id_of(member_symbol).unwrap();
        assert_eq!(fx.cx.program.decls[member_decl].parent, Some(id));
        assert_eq!(fx.cx.program.decls[id].parent, None);
        assert_eq!(fx.materialize(&c).unwrap(), None);
    }

    #[test]
    fn file_local_reference_queues_sibling_top_level() {
        let f = Signature::public("pkg", "f");
        let helper_top = Signature::public("pkg", "helpers");
        let local = Signature::FileLocal {
            container: Box::new(helper_top.clone()),
            id: 3,
        };
        let mut fb = FileBuilder::new("a.kt", "pkg");
        let helpers = class(&mut fb, &helper_top, Vec::new());
        fb.declare(&helpers);
        let record = function(&mut fb, &f, &[&local]);
        fb.declare(&record);
        let mut fx = Fixture::new(fb.finish().unwrap(), DeserializationStrategy::OnlyReferenced);

        fx.materialize(&f).unwrap();
        assert!(fx.cx.take_requests().is_empty());
        assert_eq!(fx.state.front_pending(), Some(helper_top));
    }

    #[test]
    fn loop_and_exit_jump_link_to_same_header() {
        let f = Signature::public("pkg", "f");
        let mut fb = FileBuilder::new("a.kt", "pkg");
        let condition = expr(&mut fb, OperationRecord::Const(ConstRecord::Boolean(true)));
        let jump = expr(&mut fb, OperationRecord::Break { loop_id: 4 });
        let looped = expr(
            &mut fb,
            OperationRecord::Loop {
                loop_id: 4,
                kind: LoopKind::While,
                label: None,
                condition: Box::new(condition),
                body: Some(Box::new(jump)),
            },
        );
        let record = function_with_body(&mut fb, &f, BodyRecord::Expression(looped));
        fb.declare(&record);
        let mut fx = Fixture::new(fb.finish().unwrap(), DeserializationStrategy::OnlyReferenced);

        let id = fx.materialize(&f).unwrap().unwrap();
        let Some(Body::Expression(body)) = &fx.cx.program.decls[id].kind.as_function().unwrap().body
        else {
            panic!("expected expression body");
        };
        let ExprKind::Loop(loop_id) = body.kind else {
            panic!("expected loop");
        };
        let header = &fx.cx.program.loops[loop_id];
        assert_eq!(header.body.as_ref().unwrap().kind, ExprKind::Break(loop_id));
    }

    #[test]
    fn exit_jump_before_header_is_format_error() {
        let f = Signature::public("pkg", "f");
        let mut fb = FileBuilder::new("a.kt", "pkg");
        let jump = expr(&mut fb, OperationRecord::Continue { loop_id: 9 });
        let record = function_with_body(&mut fb, &f, BodyRecord::Expression(jump));
        fb.declare(&record);
        let mut fx = Fixture::new(fb.finish().unwrap(), DeserializationStrategy::OnlyReferenced);

        let err = fx.materialize(&f).unwrap_err();
        assert!(matches!(err, LinkError::Format { .. }));
        assert!(err.to_string().contains("exit jump before loop header"));
        assert!(err.to_string().contains("file `a.kt`"));
    }

    #[test]
    fn deep_nesting_exceeds_depth_limit() {
        let f = Signature::public("pkg", "f");
        let mut fb = FileBuilder::new("a.kt", "pkg");
        let mut e = expr(&mut fb, OperationRecord::Const(ConstRecord::Int(0)));
        for _ in 0..20 {
            e = expr(&mut fb, OperationRecord::Throw { value: Box::new(e) });
        }
        let record = function_with_body(&mut fb, &f, BodyRecord::Expression(e));
        fb.declare(&record);
        let options = LinkOptions {
            max_depth: 8,
            ..Default::default()
        };
        let mut fx = Fixture::with_options(fb.finish().unwrap(), DeserializationStrategy::OnlyReferenced, options);

        let err = fx.materialize(&f).unwrap_err();
        assert!(err.to_string().contains("recursion depth exceeded"));
    }

    #[test]
    fn unset_body_and_block_initializer_are_rejected() {
        let f = Signature::public("pkg", "f");
        let mut fb = FileBuilder::new("a.kt", "pkg");
        let bytes = encode_record(&BodyRecord::Unset).unwrap();
        let unset = fb.raw_record(TableKind::Bodies, &bytes);
        let mut record = function(&mut fb, &f, &[]);
        if let DeclKindRecord::Function(function) = &mut record.kind {
            function.body = Some(unset);
        }
        fb.declare(&record);

        let x = Signature::public("pkg", "x");
        let block = fb.body(&BodyRecord::Block(Vec::new()));
        let ty = dynamic(&mut fb);
        let field = DeclRecord {
            symbol: fb.symbol(SymbolKind::Field, &x),
            name: fb.string("x"),
            start: 0,
            end: 0,
            debug_info: None,
            kind: DeclKindRecord::Field {
                ty,
                initializer: Some(block),
            },
        };
        fb.declare(&field);
        let mut fx = Fixture::new(fb.finish().unwrap(), DeserializationStrategy::OnlyReferenced);

        assert!(fx.materialize(&f).unwrap_err().to_string().contains("unset"));
        let err = fx.materialize(&x).unwrap_err();
        assert!(err.to_string().contains("block where an expression is expected"));
    }

    #[test]
    fn lossy_char_and_string_constants() {
        let f = Signature::public("pkg", "f");
        let mut fb = FileBuilder::new("a.kt", "pkg");
        let bad = fb.raw_string(&[b'o', b'k', 0xff]);
        let text = expr(&mut fb, OperationRecord::Const(ConstRecord::String(bad)));
        let surrogate = expr(&mut fb, OperationRecord::Const(ConstRecord::Char(0xd800)));
        let concat = expr(
            &mut fb,
            OperationRecord::StringConcat {
                parts: vec![text, surrogate],
            },
        );
        let record = function_with_body(&mut fb, &f, BodyRecord::Expression(concat));
        fb.declare(&record);
        let mut fx = Fixture::new(fb.finish().unwrap(), DeserializationStrategy::OnlyReferenced);

        let id = fx.materialize(&f).unwrap().unwrap();
        let Some(Body::Expression(body)) = &fx.cx.program.decls[id].kind.as_function().unwrap().body
        else {
            panic!("expected expression body");
        };
        let ExprKind::StringConcat(parts) = &body.kind else {
            panic!("expected concatenation");
        };
        assert_eq!(parts[0].kind, ExprKind::Const(ConstValue::String("ok\u{fffd}".into())));
        assert_eq!(parts[1].kind, ExprKind::Const(ConstValue::Char('\u{fffd}')));
    }

    #[test]
    fn kind_mismatch_on_call_is_fatal_without_partial_linkage() {
        let f = Signature::public("pkg", "f");
        let c = Signature::public("pkg", "C");
        let mut fb = FileBuilder::new("a.kt", "pkg");
        let ty = fb.class_type(&c);
        let bad_call = call(&mut fb, &c);
        let mut record = function_with_body(&mut fb, &f, BodyRecord::Expression(bad_call));
        if let DeclKindRecord::Function(function) = &mut record.kind {
            function.return_type = ty;
        }
        fb.declare(&record);
        let mut fx = Fixture::new(fb.finish().unwrap(), DeserializationStrategy::OnlyReferenced);

        let err = fx.materialize(&f).unwrap_err();
        assert!(matches!(err, LinkError::KindMismatch { .. }));
    }
}
