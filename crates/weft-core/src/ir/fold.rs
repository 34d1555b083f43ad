//! Expression traversal.
//!
//! [`ExprFolder`] consumes an expression and returns a new one; every pass
//! that changes structure is written as a folder. Nested functions are not
//! entered by [`fold_children`]: it calls [`ExprFolder::fold_nested`] with
//! the declaration id and each folder decides whether to descend.

use crate::error::LowerResult;
use crate::ids::DeclId;
use crate::ir::expr::{Call, Expr, ExprKind};
use crate::ir::module::DeclExprs;

pub trait ExprFolder {
    fn fold_expr(&mut self, expr: Expr) -> LowerResult<Expr> {
        fold_children(self, expr)
    }

    /// Called for every [`ExprKind::Function`]. Returns the id the
    /// expression should refer to afterwards.
    fn fold_nested(&mut self, decl: DeclId) -> LowerResult<DeclId> {
        Ok(decl)
    }
}

fn fold_box<F: ExprFolder + ?Sized>(folder: &mut F, expr: Box<Expr>) -> LowerResult<Box<Expr>> {
    Ok(Box::new(folder.fold_expr(*expr)?))
}

fn fold_opt<F: ExprFolder + ?Sized>(folder: &mut F, expr: Option<Expr>) -> LowerResult<Option<Expr>> {
    expr.map(|e| folder.fold_expr(e)).transpose()
}

fn fold_vec<F: ExprFolder + ?Sized>(folder: &mut F, exprs: Vec<Expr>) -> LowerResult<Vec<Expr>> {
    exprs.into_iter().map(|e| folder.fold_expr(e)).collect()
}

/// Fold the receivers and arguments of a call.
pub fn fold_call_children<F: ExprFolder + ?Sized>(folder: &mut F, call: Call) -> LowerResult<Call> {
    Ok(Call {
        target: call.target,
        dispatch_receiver: fold_opt(folder, call.dispatch_receiver)?,
        extension_receiver: fold_opt(folder, call.extension_receiver)?,
        type_args: call.type_args,
        args: call
            .args
            .into_iter()
            .map(|arg| fold_opt(folder, arg))
            .collect::<LowerResult<_>>()?,
        is_composable_call: call.is_composable_call,
    })
}

/// Rebuild `expr` with every direct child folded.
pub fn fold_children<F: ExprFolder + ?Sized>(folder: &mut F, expr: Expr) -> LowerResult<Expr> {
    let Expr { kind, ty } = expr;
    let kind = match kind {
        ExprKind::Const(_) | ExprKind::GetValue(_) | ExprKind::MaskBit { .. } => kind,
        ExprKind::SetValue { value, expr } => ExprKind::SetValue {
            value,
            expr: fold_box(folder, expr)?,
        },
        ExprKind::Let { value, init } => ExprKind::Let {
            value,
            init: fold_box(folder, init)?,
        },
        ExprKind::Block(stmts) => ExprKind::Block(fold_vec(folder, stmts)?),
        ExprKind::If {
            cond,
            then_branch,
            else_branch,
        } => ExprKind::If {
            cond: fold_box(folder, cond)?,
            then_branch: fold_box(folder, then_branch)?,
            else_branch: else_branch.map(|e| fold_box(folder, e)).transpose()?,
        },
        ExprKind::Call(call) => ExprKind::Call(Box::new(fold_call_children(folder, *call)?)),
        ExprKind::Return { target, value } => ExprKind::Return {
            target,
            value: fold_box(folder, value)?,
        },
        ExprKind::Function(decl) => ExprKind::Function(folder.fold_nested(decl)?),
        ExprKind::Composite { origin, stmts } => ExprKind::Composite {
            origin,
            stmts: fold_vec(folder, stmts)?,
        },
        ExprKind::Vararg(elems) => ExprKind::Vararg(fold_vec(folder, elems)?),
        ExprKind::InlineClassNew(inner) => ExprKind::InlineClassNew(fold_box(folder, inner)?),
    };
    Ok(Expr { kind, ty })
}

/// Fold every expression a declaration owns.
pub fn fold_decl_exprs<F: ExprFolder + ?Sized>(folder: &mut F, exprs: DeclExprs) -> LowerResult<DeclExprs> {
    Ok(DeclExprs {
        defaults: exprs
            .defaults
            .into_iter()
            .map(|d| fold_opt(folder, d))
            .collect::<LowerResult<_>>()?,
        body: fold_opt(folder, exprs.body)?,
    })
}

/// Visit `expr` and its descendants in pre-order. Does not enter nested
/// functions.
pub fn walk_expr<'e>(expr: &'e Expr, f: &mut dyn FnMut(&'e Expr)) {
    f(expr);
    match &expr.kind {
        ExprKind::Const(_)
        | ExprKind::GetValue(_)
        | ExprKind::MaskBit { .. }
        | ExprKind::Function(_) => {}
        ExprKind::SetValue { expr, .. } => walk_expr(expr, f),
        ExprKind::Let { init, .. } => walk_expr(init, f),
        ExprKind::Block(stmts)
        | ExprKind::Composite { stmts, .. }
        | ExprKind::Vararg(stmts) => {
            for stmt in stmts {
                walk_expr(stmt, f);
            }
        }
        ExprKind::If {
            cond,
            then_branch,
            else_branch,
        } => {
            walk_expr(cond, f);
            walk_expr(then_branch, f);
            if let Some(e) = else_branch {
                walk_expr(e, f);
            }
        }
        ExprKind::Call(call) => {
            for receiver in call.dispatch_receiver.iter().chain(call.extension_receiver.iter()) {
                walk_expr(receiver, f);
            }
            for arg in call.args.iter().flatten() {
                walk_expr(arg, f);
            }
        }
        ExprKind::Return { value, .. } => walk_expr(value, f),
        ExprKind::InlineClassNew(inner) => walk_expr(inner, f),
    }
}

/// Ids of the functions nested directly in `expr`.
pub fn nested_functions(expr: &Expr) -> Vec<DeclId> {
    let mut nested = Vec::new();
    walk_expr(expr, &mut |e| {
        if let ExprKind::Function(decl) = e.kind {
            nested.push(decl);
        }
    });
    nested
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ids::ValueId;
    use crate::types::Ty;

    struct Bump;

    impl ExprFolder for Bump {
        fn fold_expr(&mut self, expr: Expr) -> LowerResult<Expr> {
            match expr.kind {
                ExprKind::GetValue(v) => Ok(Expr::get(ValueId(v.0 + 10), expr.ty)),
                _ => fold_children(self, expr),
            }
        }

        fn fold_nested(&mut self, decl: DeclId) -> LowerResult<DeclId> {
            Ok(DeclId(decl.0 + 100))
        }
    }

    #[test]
    fn test_fold_rebuilds_children() {
        let expr = Expr::block(
            vec![
                Expr::call(
                    Call::decl(DeclId(0), vec![Some(Expr::get(ValueId(1), Ty::INT)), None]),
                    Ty::UNIT,
                ),
                Expr::new(ExprKind::Function(DeclId(2)), Ty::ANY),
            ],
            Ty::ANY,
        );

        let folded = Bump.fold_expr(expr).unwrap();
        let ExprKind::Block(stmts) = &folded.kind else {
            panic!("expected block");
        };
        let call = stmts[0].as_call().unwrap();
        assert_eq!(call.args[0], Some(Expr::get(ValueId(11), Ty::INT)));
        assert_eq!(call.args[1], None);
        assert_eq!(stmts[1].kind, ExprKind::Function(DeclId(102)));
    }

    #[test]
    fn test_walk_skips_nested_bodies() {
        let expr = Expr::block(
            vec![
                Expr::new(ExprKind::Function(DeclId(4)), Ty::ANY),
                Expr::ret(DeclId(0), Expr::new(ExprKind::Function(DeclId(5)), Ty::ANY)),
            ],
            Ty::NOTHING,
        );
        assert_eq!(nested_functions(&expr), vec![DeclId(4), DeclId(5)]);
    }
}
