//! Walking the symbol references held by declarations, expressions and types.
//!
//! Declarations and loops live in flat arenas, so rewriting every reference
//! in a program is a linear pass over both arenas. Collecting the references
//! of a single declaration follows nested declaration and loop ids instead.

use crate::decl::{Body, DeclKind};
use crate::expr::{Expr, ExprKind, Statement};
use crate::ids::{DeclId, LoopId, SymbolId};
use crate::program::Program;
use crate::types::{IrType, TypeArgument};
use std::collections::HashMap;

/// Rewrites every symbol reference in `program` found in `map`. The symbol a
/// declaration binds is left alone. Returns the number of rewritten references.
pub fn remap_symbols(program: &mut Program, map: &HashMap<SymbolId, SymbolId>) -> usize {
    let mut count = 0;
    let mut rewrite = |sym: &mut SymbolId| {
        if let Some(&to) = map.get(sym) {
            *sym = to;
            count += 1;
        }
    };
    for (_, decl) in program.decls.iter_mut() {
        decl_kind_mut(&mut decl.kind, &mut rewrite);
    }
    for (_, lp) in program.loops.iter_mut() {
        if let Some(cond) = lp.condition.as_mut() {
            expr_mut(cond, &mut rewrite);
        }
        if let Some(body) = lp.body.as_mut() {
            expr_mut(body, &mut rewrite);
        }
    }
    count
}

/// Rewrites the symbol references of a detached expression tree, plus the
/// declarations and loops it reaches through the program's arenas.
pub fn remap_expr(program: &mut Program, expr: &mut Expr, map: &HashMap<SymbolId, SymbolId>) -> usize {
    let (decls, loops) = {
        let mut collector = Collector::new(program);
        collector.expr(expr);
        (collector.decls, collector.loops)
    };
    let mut count = 0;
    let mut rewrite = |sym: &mut SymbolId| {
        if let Some(&to) = map.get(sym) {
            *sym = to;
            count += 1;
        }
    };
    expr_mut(expr, &mut rewrite);
    for id in decls {
        decl_kind_mut(&mut program.decls[id].kind, &mut rewrite);
    }
    for id in loops {
        let lp = &mut program.loops[id];
        if let Some(cond) = lp.condition.as_mut() {
            expr_mut(cond, &mut rewrite);
        }
        if let Some(body) = lp.body.as_mut() {
            expr_mut(body, &mut rewrite);
        }
    }
    count
}

/// Collects the symbols referenced anywhere inside `decl`, including its
/// nested declarations and loops, in first-seen order without duplicates.
pub fn referenced_symbols(program: &Program, decl: DeclId) -> Vec<SymbolId> {
    let mut collector = Collector::new(program);
    collector.decl(decl);
    collector.seen
}

struct Collector<'a> {
    program: &'a Program,
    seen: Vec<SymbolId>,
    decls: Vec<DeclId>,
    loops: Vec<LoopId>,
}

impl<'a> Collector<'a> {
    fn new(program: &'a Program) -> Self {
        Self {
            program,
            seen: Vec::new(),
            decls: Vec::new(),
            loops: Vec::new(),
        }
    }

    fn symbol(&mut self, sym: SymbolId) {
        if !self.seen.contains(&sym) {
            self.seen.push(sym);
        }
    }

    fn decl(&mut self, id: DeclId) {
        self.decls.push(id);
        let program = self.program;
        match &program.decls[id].kind {
            DeclKind::Class(class) => {
                class.type_parameters.iter().for_each(|&d| self.decl(d));
                class.supertypes.iter().for_each(|t| self.ty(t));
                class.members.iter().for_each(|&d| self.decl(d));
            }
            DeclKind::Function(f) | DeclKind::Constructor(f) => {
                f.type_parameters.iter().for_each(|&d| self.decl(d));
                f.value_parameters.iter().for_each(|&d| self.decl(d));
                self.ty(&f.return_type);
                match &f.body {
                    Some(Body::Expression(e)) => self.expr(e),
                    Some(Body::Block(stmts)) => stmts.iter().for_each(|s| self.statement(s)),
                    None => {}
                }
            }
            DeclKind::Property(p) => {
                [p.getter, p.setter, p.backing_field]
                    .into_iter()
                    .flatten()
                    .for_each(|d| self.decl(d));
            }
            DeclKind::Field(field) => {
                self.ty(&field.ty);
                if let Some(init) = &field.initializer {
                    self.expr(init);
                }
            }
            DeclKind::EnumEntry { initializer } => {
                if let Some(init) = initializer {
                    self.expr(init);
                }
            }
            DeclKind::TypeAlias {
                type_parameters,
                expanded,
            } => {
                type_parameters.iter().for_each(|&d| self.decl(d));
                self.ty(expanded);
            }
            DeclKind::TypeParameter { bounds, .. } => bounds.iter().for_each(|t| self.ty(t)),
            DeclKind::ValueParameter {
                ty, default_value, ..
            } => {
                self.ty(ty);
                if let Some(default) = default_value {
                    self.expr(default);
                }
            }
            DeclKind::Variable {
                ty, initializer, ..
            } => {
                self.ty(ty);
                if let Some(init) = initializer {
                    self.expr(init);
                }
            }
        }
    }

    fn statement(&mut self, stmt: &Statement) {
        match stmt {
            Statement::Expr(e) => self.expr(e),
            Statement::Decl(d) => self.decl(*d),
        }
    }

    fn ty(&mut self, ty: &IrType) {
        if let IrType::Simple {
            classifier,
            arguments,
            ..
        } = ty
        {
            self.symbol(*classifier);
            for arg in arguments {
                if let TypeArgument::Projection { ty, .. } = arg {
                    self.ty(ty);
                }
            }
        }
    }

    fn loop_(&mut self, id: LoopId) {
        if self.loops.contains(&id) {
            return;
        }
        self.loops.push(id);
        let program = self.program;
        let lp = &program.loops[id];
        if let Some(cond) = &lp.condition {
            self.expr(cond);
        }
        if let Some(body) = &lp.body {
            self.expr(body);
        }
    }

    fn expr(&mut self, expr: &Expr) {
        self.ty(&expr.ty);
        match &expr.kind {
            ExprKind::Const(_) | ExprKind::LinkageError(_) => {}
            ExprKind::Block(stmts) => stmts.iter().for_each(|s| self.statement(s)),
            ExprKind::Call {
                callee,
                receiver,
                type_arguments,
                arguments,
            } => {
                self.symbol(*callee);
                if let Some(r) = receiver {
                    self.expr(r);
                }
                type_arguments.iter().for_each(|t| self.ty(t));
                arguments.iter().flatten().for_each(|a| self.expr(a));
            }
            ExprKind::ConstructorCall {
                constructor,
                type_arguments,
                arguments,
            } => {
                self.symbol(*constructor);
                type_arguments.iter().for_each(|t| self.ty(t));
                arguments.iter().flatten().for_each(|a| self.expr(a));
            }
            ExprKind::FunctionReference {
                target,
                type_arguments,
            } => {
                self.symbol(*target);
                type_arguments.iter().for_each(|t| self.ty(t));
            }
            ExprKind::PropertyReference { target }
            | ExprKind::GetValue(target)
            | ExprKind::GetObject(target)
            | ExprKind::GetEnumValue(target) => self.symbol(*target),
            ExprKind::SetValue { target, value } => {
                self.symbol(*target);
                self.expr(value);
            }
            ExprKind::GetField { field, receiver } => {
                self.symbol(*field);
                if let Some(r) = receiver {
                    self.expr(r);
                }
            }
            ExprKind::SetField {
                field,
                receiver,
                value,
            } => {
                self.symbol(*field);
                if let Some(r) = receiver {
                    self.expr(r);
                }
                self.expr(value);
            }
            ExprKind::Return { target, value } => {
                self.symbol(*target);
                self.expr(value);
            }
            ExprKind::When(branches) => {
                for b in branches {
                    self.expr(&b.condition);
                    self.expr(&b.result);
                }
            }
            ExprKind::Loop(id) | ExprKind::Break(id) | ExprKind::Continue(id) => self.loop_(*id),
            ExprKind::Throw(e) => self.expr(e),
            ExprKind::TypeOp {
                operand, argument, ..
            } => {
                self.ty(operand);
                self.expr(argument);
            }
            ExprKind::StringConcat(parts) | ExprKind::Vararg(parts) => {
                parts.iter().for_each(|p| self.expr(p))
            }
            ExprKind::Try {
                body,
                catches,
                finally,
            } => {
                self.expr(body);
                for c in catches {
                    self.decl(c.parameter);
                    self.expr(&c.result);
                }
                if let Some(f) = finally {
                    self.expr(f);
                }
            }
        }
    }
}

fn decl_kind_mut(kind: &mut DeclKind, f: &mut dyn FnMut(&mut SymbolId)) {
    match kind {
        DeclKind::Class(class) => class.supertypes.iter_mut().for_each(|t| ty_mut(t, f)),
        DeclKind::Function(func) | DeclKind::Constructor(func) => {
            ty_mut(&mut func.return_type, f);
            match &mut func.body {
                Some(Body::Expression(e)) => expr_mut(e, f),
                Some(Body::Block(stmts)) => stmts.iter_mut().for_each(|s| statement_mut(s, f)),
                None => {}
            }
        }
        DeclKind::Property(_) => {}
        DeclKind::Field(field) => {
            ty_mut(&mut field.ty, f);
            if let Some(init) = field.initializer.as_mut() {
                expr_mut(init, f);
            }
        }
        DeclKind::EnumEntry { initializer } => {
            if let Some(init) = initializer.as_mut() {
                expr_mut(init, f);
            }
        }
        DeclKind::TypeAlias { expanded, .. } => ty_mut(expanded, f),
        DeclKind::TypeParameter { bounds, .. } => bounds.iter_mut().for_each(|t| ty_mut(t, f)),
        DeclKind::ValueParameter {
            ty, default_value, ..
        } => {
            ty_mut(ty, f);
            if let Some(d) = default_value.as_mut() {
                expr_mut(d, f);
            }
        }
        DeclKind::Variable {
            ty, initializer, ..
        } => {
            ty_mut(ty, f);
            if let Some(init) = initializer.as_mut() {
                expr_mut(init, f);
            }
        }
    }
}

fn statement_mut(stmt: &mut Statement, f: &mut dyn FnMut(&mut SymbolId)) {
    if let Statement::Expr(e) = stmt {
        expr_mut(e, f);
    }
}

fn ty_mut(ty: &mut IrType, f: &mut dyn FnMut(&mut SymbolId)) {
    if let IrType::Simple {
        classifier,
        arguments,
        ..
    } = ty
    {
        f(classifier);
        for arg in arguments {
            if let TypeArgument::Projection { ty, .. } = arg {
                ty_mut(ty, f);
            }
        }
    }
}

fn opt_expr_mut(expr: &mut Option<Box<Expr>>, f: &mut dyn FnMut(&mut SymbolId)) {
    if let Some(e) = expr.as_mut() {
        expr_mut(e, f);
    }
}

fn expr_mut(expr: &mut Expr, f: &mut dyn FnMut(&mut SymbolId)) {
    ty_mut(&mut expr.ty, f);
    match &mut expr.kind {
        ExprKind::Const(_)
        | ExprKind::LinkageError(_)
        | ExprKind::Loop(_)
        | ExprKind::Break(_)
        | ExprKind::Continue(_) => {}
        ExprKind::Block(stmts) => stmts.iter_mut().for_each(|s| statement_mut(s, f)),
        ExprKind::Call {
            callee,
            receiver,
            type_arguments,
            arguments,
        } => {
            f(callee);
            opt_expr_mut(receiver, f);
            type_arguments.iter_mut().for_each(|t| ty_mut(t, f));
            arguments.iter_mut().flatten().for_each(|a| expr_mut(a, f));
        }
        ExprKind::ConstructorCall {
            constructor,
            type_arguments,
            arguments,
        } => {
            f(constructor);
            type_arguments.iter_mut().for_each(|t| ty_mut(t, f));
            arguments.iter_mut().flatten().for_each(|a| expr_mut(a, f));
        }
        ExprKind::FunctionReference {
            target,
            type_arguments,
        } => {
            f(target);
            type_arguments.iter_mut().for_each(|t| ty_mut(t, f));
        }
        ExprKind::PropertyReference { target }
        | ExprKind::GetValue(target)
        | ExprKind::GetObject(target)
        | ExprKind::GetEnumValue(target) => f(target),
        ExprKind::SetValue { target, value } | ExprKind::Return { target, value } => {
            f(target);
            expr_mut(value, f);
        }
        ExprKind::GetField { field, receiver } => {
            f(field);
            opt_expr_mut(receiver, f);
        }
        ExprKind::SetField {
            field,
            receiver,
            value,
        } => {
            f(field);
            opt_expr_mut(receiver, f);
            expr_mut(value, f);
        }
        ExprKind::When(branches) => {
            for b in branches {
                expr_mut(&mut b.condition, f);
                expr_mut(&mut b.result, f);
            }
        }
        ExprKind::Throw(e) => expr_mut(e, f),
        ExprKind::TypeOp {
            operand, argument, ..
        } => {
            ty_mut(operand, f);
            expr_mut(argument, f);
        }
        ExprKind::StringConcat(parts) | ExprKind::Vararg(parts) => {
            parts.iter_mut().for_each(|p| expr_mut(p, f))
        }
        ExprKind::Try {
            body,
            catches,
            finally,
        } => {
            expr_mut(body, f);
            for c in catches {
                expr_mut(&mut c.result, f);
            }
            opt_expr_mut(finally, f);
        }
    }
}
