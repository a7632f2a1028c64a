//! Deterministic textual rendering of a linked program.
//!
//! Symbols are printed by signature rather than arena index, files are
//! sorted by name and the top levels of each file by signature, so two links
//! that bound the same declarations render identically regardless of
//! discovery order.

use crate::decl::{Body, DeclKind, DeclOrigin};
use crate::expr::{Expr, ExprKind, Statement};
use crate::ids::{DeclId, FileId, LoopId, SymbolId};
use crate::program::Program;
use crate::types::{IrType, TypeArgument, Variance};
use sigil_common::Interner;
use std::collections::HashMap;
use std::fmt::Write;

/// Renders a [`Program`] or parts of it as text.
pub struct IrDumper<'a> {
    program: &'a Program,
    interner: &'a Interner,
    loops: HashMap<LoopId, usize>,
}

impl<'a> IrDumper<'a> {
    /// Creates a dumper.
    pub fn new(program: &'a Program, interner: &'a Interner) -> Self {
        Self {
            program,
            interner,
            loops: HashMap::new(),
        }
    }

    /// Renders every module, file and top-level declaration, then the stubs.
    pub fn dump_program(&mut self) -> String {
        let program = self.program;
        let mut out = String::new();
        for (_, module) in program.modules.iter() {
            let _ = writeln!(out, "module {}", module.name);
            let mut files = module.files.clone();
            files.sort_by(|&a, &b| program.files[a].name.cmp(&program.files[b].name));
            for file in files {
                out.push_str(&self.dump_file(file));
            }
        }
        if !program.stubs.is_empty() {
            let _ = writeln!(out, "stubs");
            let mut stubs: Vec<(String, DeclId)> = program
                .stubs
                .iter()
                .map(|&d| (self.symbol(program.decls[d].symbol), d))
                .collect();
            stubs.sort();
            for (_, d) in stubs {
                self.decl(&mut out, d, 1);
            }
        }
        out
    }

    /// Renders one file with its top levels sorted by signature.
    pub fn dump_file(&mut self, file: FileId) -> String {
        let program = self.program;
        let data = &program.files[file];
        let mut out = String::new();
        let _ = writeln!(out, "  file {} (package {})", data.name, data.package);
        let mut decls: Vec<(String, DeclId)> = data
            .declarations
            .iter()
            .map(|&d| (self.symbol(program.decls[d].symbol), d))
            .collect();
        decls.sort();
        for (_, d) in decls {
            self.decl(&mut out, d, 2);
        }
        out
    }

    /// Renders one declaration and everything nested in it.
    pub fn dump_declaration(&mut self, decl: DeclId) -> String {
        let mut out = String::new();
        self.decl(&mut out, decl, 0);
        out
    }

    fn symbol(&self, sym: SymbolId) -> String {
        let data = self.program.symbols.get(sym);
        match &data.signature {
            Some(sig) => sig.to_string(),
            None => format!("<{}>", data.kind),
        }
    }

    fn name(&self, decl: DeclId) -> String {
        let d = &self.program.decls[decl];
        format!("{} {}", self.interner.resolve(d.name), self.symbol(d.symbol))
    }

    fn decl(&mut self, out: &mut String, id: DeclId, depth: usize) {
        let program = self.program;
        let decl = &program.decls[id];
        let pad = "  ".repeat(depth);
        let stub = if decl.origin == DeclOrigin::UnlinkedStub {
            "stub "
        } else {
            ""
        };
        match &decl.kind {
            DeclKind::Class(class) => {
                let supers: Vec<String> = class.supertypes.iter().map(|t| self.ty(t)).collect();
                let _ = writeln!(
                    out,
                    "{pad}{stub}{:?} {}{} : [{}]",
                    class.class_kind,
                    self.name(id),
                    self.type_params(&class.type_parameters),
                    supers.join(", ")
                );
                for &member in &class.members {
                    self.decl(out, member, depth + 1);
                }
            }
            DeclKind::Function(f) | DeclKind::Constructor(f) => {
                let keyword = if matches!(decl.kind, DeclKind::Constructor(_)) {
                    "constructor"
                } else {
                    "fun"
                };
                let params: Vec<String> =
                    f.value_parameters.iter().map(|&p| self.param(p)).collect();
                let mut mods = String::new();
                if f.is_inline {
                    mods.push_str("inline ");
                }
                if f.is_suspend {
                    mods.push_str("suspend ");
                }
                if f.is_expect {
                    mods.push_str("expect ");
                }
                let _ = write!(
                    out,
                    "{pad}{stub}{mods}{keyword} {}{}({}): {}",
                    self.name(id),
                    self.type_params(&f.type_parameters),
                    params.join(", "),
                    self.ty(&f.return_type)
                );
                match &f.body {
                    Some(Body::Expression(e)) => {
                        let _ = writeln!(out, " = {}", self.expr(e));
                    }
                    Some(Body::Block(stmts)) => {
                        let _ = writeln!(out, " {}", self.block(stmts));
                    }
                    None => out.push('\n'),
                }
            }
            DeclKind::Property(p) => {
                let keyword = if p.is_var { "var" } else { "val" };
                let _ = writeln!(out, "{pad}{stub}{keyword} {}", self.name(id));
                for part in [p.backing_field, p.getter, p.setter].into_iter().flatten() {
                    self.decl(out, part, depth + 1);
                }
            }
            DeclKind::Field(field) => {
                let init = field
                    .initializer
                    .as_ref()
                    .map(|e| format!(" = {}", self.expr(e)))
                    .unwrap_or_default();
                let _ = writeln!(out, "{pad}{stub}field {}: {}{init}", self.name(id), self.ty(&field.ty));
            }
            DeclKind::EnumEntry { initializer } => {
                let init = initializer
                    .as_ref()
                    .map(|e| format!(" = {}", self.expr(e)))
                    .unwrap_or_default();
                let _ = writeln!(out, "{pad}{stub}entry {}{init}", self.name(id));
            }
            DeclKind::TypeAlias {
                type_parameters,
                expanded,
            } => {
                let _ = writeln!(
                    out,
                    "{pad}{stub}typealias {}{} = {}",
                    self.name(id),
                    self.type_params(type_parameters),
                    self.ty(expanded)
                );
            }
            DeclKind::TypeParameter { .. } | DeclKind::ValueParameter { .. } => {
                let _ = writeln!(out, "{pad}{}", self.param(id));
            }
            DeclKind::Variable { .. } => {
                let _ = writeln!(out, "{pad}{}", self.local(id));
            }
        }
    }

    fn type_params(&self, params: &[DeclId]) -> String {
        if params.is_empty() {
            return String::new();
        }
        let rendered: Vec<String> = params.iter().map(|&p| self.param(p)).collect();
        format!("<{}>", rendered.join(", "))
    }

    fn param(&self, id: DeclId) -> String {
        let decl = &self.program.decls[id];
        let name = self.interner.resolve(decl.name);
        match &decl.kind {
            DeclKind::TypeParameter {
                variance, bounds, ..
            } => {
                let var = match variance {
                    Variance::Invariant => "",
                    Variance::In => "in ",
                    Variance::Out => "out ",
                };
                let bounds: Vec<String> = bounds.iter().map(|b| self.ty(b)).collect();
                if bounds.is_empty() {
                    format!("{var}{name}")
                } else {
                    format!("{var}{name}: {}", bounds.join(" & "))
                }
            }
            DeclKind::ValueParameter {
                ty,
                default_value,
                is_vararg,
                ..
            } => {
                let vararg = if *is_vararg { "vararg " } else { "" };
                let default = default_value
                    .as_ref()
                    .map(|d| format!(" = {}", self.expr_ro(d)))
                    .unwrap_or_default();
                format!("{vararg}{name}: {}{default}", self.ty(ty))
            }
            _ => self.name(id),
        }
    }

    fn local(&self, id: DeclId) -> String {
        let decl = &self.program.decls[id];
        match &decl.kind {
            DeclKind::Variable {
                ty,
                initializer,
                is_var,
            } => {
                let keyword = if *is_var { "var" } else { "val" };
                let init = initializer
                    .as_ref()
                    .map(|e| format!(" = {}", self.expr_ro(e)))
                    .unwrap_or_default();
                format!(
                    "{keyword} {}: {}{init}",
                    self.interner.resolve(decl.name),
                    self.ty(ty)
                )
            }
            _ => self.name(id),
        }
    }

    fn ty(&self, ty: &IrType) -> String {
        match ty {
            IrType::Simple {
                classifier,
                arguments,
                nullable,
            } => {
                let mut s = self.symbol(*classifier);
                if !arguments.is_empty() {
                    let args: Vec<String> = arguments
                        .iter()
                        .map(|a| match a {
                            TypeArgument::Star => "*".to_string(),
                            TypeArgument::Projection { variance, ty } => match variance {
                                Variance::Invariant => self.ty(ty),
                                Variance::In => format!("in {}", self.ty(ty)),
                                Variance::Out => format!("out {}", self.ty(ty)),
                            },
                        })
                        .collect();
                    s.push_str(&format!("<{}>", args.join(", ")));
                }
                if *nullable {
                    s.push('?');
                }
                s
            }
            IrType::Dynamic => "dynamic".to_string(),
            IrType::Error => "<error>".to_string(),
        }
    }

    // Renders through a shared borrow; loop labels assigned here are dropped.
    fn expr_ro(&self, expr: &Expr) -> String {
        let mut scratch = IrDumper {
            program: self.program,
            interner: self.interner,
            loops: self.loops.clone(),
        };
        scratch.expr(expr)
    }

    fn block(&mut self, stmts: &[Statement]) -> String {
        let parts: Vec<String> = stmts
            .iter()
            .map(|s| match s {
                Statement::Expr(e) => self.expr(e),
                Statement::Decl(d) => self.local(*d),
            })
            .collect();
        format!("{{ {} }}", parts.join("; "))
    }

    fn args(&mut self, args: &[Option<Expr>]) -> String {
        let parts: Vec<String> = args
            .iter()
            .map(|a| match a {
                Some(e) => self.expr(e),
                None => "_".to_string(),
            })
            .collect();
        parts.join(", ")
    }

    fn loop_label(&mut self, id: LoopId) -> usize {
        let next = self.loops.len();
        *self.loops.entry(id).or_insert(next)
    }

    fn expr(&mut self, expr: &Expr) -> String {
        match &expr.kind {
            ExprKind::Const(c) => c.to_string(),
            ExprKind::Block(stmts) => self.block(stmts),
            ExprKind::Call {
                callee,
                receiver,
                arguments,
                ..
            } => {
                let recv = receiver
                    .as_ref()
                    .map(|r| format!("{}.", self.expr(r)))
                    .unwrap_or_default();
                format!("{recv}call {}({})", self.symbol(*callee), self.args(arguments))
            }
            ExprKind::ConstructorCall {
                constructor,
                arguments,
                ..
            } => format!("new {}({})", self.symbol(*constructor), self.args(arguments)),
            ExprKind::FunctionReference { target, .. } => format!("::{}", self.symbol(*target)),
            ExprKind::PropertyReference { target } => format!("::{}", self.symbol(*target)),
            ExprKind::GetValue(s) => format!("get {}", self.symbol(*s)),
            ExprKind::SetValue { target, value } => {
                format!("set {} = {}", self.symbol(*target), self.expr(value))
            }
            ExprKind::GetField { field, receiver } => {
                let recv = receiver
                    .as_ref()
                    .map(|r| format!("{}.", self.expr(r)))
                    .unwrap_or_default();
                format!("{recv}field {}", self.symbol(*field))
            }
            ExprKind::SetField {
                field,
                receiver,
                value,
            } => {
                let recv = receiver
                    .as_ref()
                    .map(|r| format!("{}.", self.expr(r)))
                    .unwrap_or_default();
                format!("{recv}field {} = {}", self.symbol(*field), self.expr(value))
            }
            ExprKind::GetObject(s) => format!("object {}", self.symbol(*s)),
            ExprKind::GetEnumValue(s) => format!("enum {}", self.symbol(*s)),
            ExprKind::Return { target, value } => {
                format!("return@{} {}", self.symbol(*target), self.expr(value))
            }
            ExprKind::When(branches) => {
                let parts: Vec<String> = branches
                    .iter()
                    .map(|b| format!("{} -> {}", self.expr(&b.condition), self.expr(&b.result)))
                    .collect();
                format!("when {{ {} }}", parts.join("; "))
            }
            ExprKind::Loop(id) => {
                let label = self.loop_label(*id);
                let program = self.program;
                let lp = &program.loops[*id];
                let cond = lp
                    .condition
                    .as_ref()
                    .map(|c| self.expr(c))
                    .unwrap_or_default();
                let body = lp.body.as_ref().map(|b| self.expr(b)).unwrap_or_default();
                format!("L{label}: {:?}({cond}) {body}", lp.kind)
            }
            ExprKind::Break(id) => format!("break@L{}", self.loop_label(*id)),
            ExprKind::Continue(id) => format!("continue@L{}", self.loop_label(*id)),
            ExprKind::Throw(e) => format!("throw {}", self.expr(e)),
            ExprKind::TypeOp {
                operator,
                operand,
                argument,
            } => format!("{:?}<{}>({})", operator, self.ty(operand), self.expr(argument)),
            ExprKind::StringConcat(parts) => {
                let parts: Vec<String> = parts.iter().map(|p| self.expr(p)).collect();
                format!("concat({})", parts.join(", "))
            }
            ExprKind::Try {
                body,
                catches,
                finally,
            } => {
                let mut s = format!("try {}", self.expr(body));
                for c in catches {
                    let param = self.local(c.parameter);
                    s.push_str(&format!(" catch({param}) {}", self.expr(&c.result)));
                }
                if let Some(f) = finally {
                    s.push_str(&format!(" finally {}", self.expr(f)));
                }
                s
            }
            ExprKind::Vararg(parts) => {
                let parts: Vec<String> = parts.iter().map(|p| self.expr(p)).collect();
                format!("vararg({})", parts.join(", "))
            }
            ExprKind::LinkageError(message) => format!("linkage-error({message:?})"),
        }
    }
}
