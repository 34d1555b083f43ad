//! Pseudo-source rendering of IR, used for internal error context and in
//! tests. The output is deterministic for a given module.

use std::fmt::Write;

use crate::ids::DeclId;
use crate::ir::decl::{Annotation, DeclKind, Declaration, Param};
use crate::ir::expr::{CallTarget, Const, Expr, ExprKind};
use crate::ir::module::{ContainerKind, Module};
use crate::types::Ty;

pub fn dump_ty(module: &Module, ty: Ty) -> String {
    module.types.render(ty, &module.interner, &|p| {
        module.str(module.type_param_name(p))
    })
}

fn dump_param(module: &Module, param: &Param) -> String {
    let mut out = format!("{}: {}", module.str(param.name), dump_ty(module, param.ty));
    if let Some(default) = &param.default {
        let _ = write!(out, " = {}", dump_expr(module, default));
    }
    out
}

/// One-line signature: `@Composable fun Foo.bar(x: Int): Unit`.
pub fn dump_signature(module: &Module, id: DeclId) -> String {
    let decl = module.decl(id);
    let mut out = String::new();
    for annotation in &decl.annotations {
        match annotation {
            Annotation::Composable => out.push_str("@Composable "),
            Annotation::Decoy {
                target_name,
                signature,
            } => {
                let _ = write!(out, "@Decoy({:?}, {:?}) ", target_name, signature);
            }
            Annotation::DecoyImplementation { name } => {
                let _ = write!(out, "@DecoyImplementation({:?}) ", name);
            }
            Annotation::LinkName(name) => {
                let _ = write!(out, "@LinkName({:?}) ", name);
            }
            Annotation::Other(name) => {
                let _ = write!(out, "@{} ", module.str(*name));
            }
        }
    }
    if decl.flags.is_inline {
        out.push_str("inline ");
    }
    if decl.flags.is_expect {
        out.push_str("expect ");
    }
    out.push_str(match decl.kind {
        DeclKind::Function | DeclKind::ExternalSource => "fun ",
        DeclKind::Getter { .. } => "get ",
        DeclKind::Setter { .. } => "set ",
        DeclKind::Constructor => "constructor ",
    });
    if !decl.type_params.is_empty() {
        let names: Vec<_> = decl
            .type_params
            .iter()
            .map(|tp| module.str(tp.name))
            .collect();
        let _ = write!(out, "<{}> ", names.join(", "));
    }
    if let Some(receiver) = &decl.extension_receiver {
        let _ = write!(out, "{}.", dump_ty(module, receiver.ty));
    }
    out.push_str(&module.str(decl.name));
    let params: Vec<_> = decl.params.iter().map(|p| dump_param(module, p)).collect();
    let _ = write!(out, "({}): {}", params.join(", "), dump_ty(module, decl.return_ty));
    out
}

/// Signature and body.
pub fn dump_decl(module: &Module, id: DeclId) -> String {
    let mut out = dump_signature(module, id);
    if let Some(body) = &module.decl(id).body {
        out.push(' ');
        write_expr(module, body, 0, &mut out);
    }
    out
}

pub fn dump_expr(module: &Module, expr: &Expr) -> String {
    let mut out = String::new();
    write_expr(module, expr, 0, &mut out);
    out
}

/// The whole module, one container per block.
pub fn dump_module(module: &Module) -> String {
    let mut out = String::new();
    for container in module.containers_in_order() {
        let c = module.container(container);
        match &c.kind {
            ContainerKind::File { package } => {
                let _ = writeln!(out, "// file {}", if package.is_empty() { "<root>" } else { package });
            }
            ContainerKind::Class { .. } => {
                let path: Vec<_> = module
                    .class_path(container)
                    .into_iter()
                    .map(|n| module.str(n))
                    .collect();
                let _ = writeln!(out, "// class {}", path.join("."));
            }
        }
        for &member in &c.members {
            let _ = writeln!(out, "{}", dump_decl(module, member));
        }
    }
    out
}

fn indent(level: usize, out: &mut String) {
    for _ in 0..level {
        out.push_str("    ");
    }
}

fn write_const(c: &Const, out: &mut String) {
    let _ = match c {
        Const::Null => write!(out, "null"),
        Const::Bool(b) => write!(out, "{}", b),
        Const::Byte(v) => write!(out, "{}", v),
        Const::Short(v) => write!(out, "{}", v),
        Const::Int(v) => write!(out, "{}", v),
        Const::Long(v) => write!(out, "{}L", v),
        Const::Float(v) => write!(out, "{:?}f", v),
        Const::Double(v) => write!(out, "{:?}", v),
        Const::Char(v) => write!(out, "{:?}", v),
        Const::String(s) => write!(out, "{:?}", s),
    };
}

fn write_nested(module: &Module, decl: &Declaration, level: usize, out: &mut String) {
    out.push_str("{ ");
    let params: Vec<_> = decl.params.iter().map(|p| module.str(p.name)).collect();
    if !params.is_empty() {
        let _ = write!(out, "{} -> ", params.join(", "));
    }
    match &decl.body {
        Some(body) => write_expr(module, body, level, out),
        None => out.push_str("..."),
    }
    out.push_str(" }");
}

fn write_expr(module: &Module, expr: &Expr, level: usize, out: &mut String) {
    match &expr.kind {
        ExprKind::Const(c) => write_const(c, out),
        ExprKind::GetValue(v) => out.push_str(&module.str(module.value_name(*v))),
        ExprKind::SetValue { value, expr } => {
            let _ = write!(out, "{} = ", module.str(module.value_name(*value)));
            write_expr(module, expr, level, out);
        }
        ExprKind::Let { value, init } => {
            let _ = write!(out, "val {} = ", module.str(module.value_name(*value)));
            write_expr(module, init, level, out);
        }
        ExprKind::Block(stmts) => {
            out.push_str("{\n");
            for stmt in stmts {
                indent(level + 1, out);
                write_expr(module, stmt, level + 1, out);
                out.push('\n');
            }
            indent(level, out);
            out.push('}');
        }
        ExprKind::If {
            cond,
            then_branch,
            else_branch,
        } => {
            out.push_str("if (");
            write_expr(module, cond, level, out);
            out.push_str(") ");
            write_expr(module, then_branch, level, out);
            if let Some(e) = else_branch {
                out.push_str(" else ");
                write_expr(module, e, level, out);
            }
        }
        ExprKind::Call(call) => {
            if let Some(receiver) = call.dispatch_receiver.as_ref().or(call.extension_receiver.as_ref()) {
                write_expr(module, receiver, level, out);
                out.push('.');
            }
            match call.target {
                CallTarget::Decl(target) => out.push_str(&module.decl_name(target)),
                CallTarget::Invoke { arity } => {
                    let _ = write!(out, "invoke/{}", arity);
                }
                CallTarget::Intrinsic(intrinsic) => out.push_str(intrinsic.name()),
            }
            out.push('(');
            for (i, arg) in call.args.iter().enumerate() {
                if i > 0 {
                    out.push_str(", ");
                }
                match arg {
                    Some(arg) => write_expr(module, arg, level, out),
                    None => out.push('_'),
                }
            }
            out.push(')');
        }
        ExprKind::Return { target, value } => {
            let _ = write!(out, "return@{} ", module.decl_name(*target));
            write_expr(module, value, level, out);
        }
        ExprKind::Function(decl) => write_nested(module, module.decl(*decl), level, out),
        ExprKind::Composite { stmts, .. } => {
            if expr.is_default_placeholder() {
                out.push_str("default ");
            }
            for (i, stmt) in stmts.iter().enumerate() {
                if i > 0 {
                    out.push_str("; ");
                }
                write_expr(module, stmt, level, out);
            }
        }
        ExprKind::Vararg(elems) => {
            out.push_str("vararg(");
            for (i, elem) in elems.iter().enumerate() {
                if i > 0 {
                    out.push_str(", ");
                }
                write_expr(module, elem, level, out);
            }
            out.push(')');
        }
        ExprKind::InlineClassNew(inner) => {
            let _ = write!(out, "{}(", dump_ty(module, expr.ty));
            write_expr(module, inner, level, out);
            out.push(')');
        }
        ExprKind::MaskBit { mask, bit } => {
            let _ = write!(
                out,
                "{} and 0b1 shl {} != 0",
                module.str(module.value_name(*mask)),
                bit
            );
        }
    }
}
