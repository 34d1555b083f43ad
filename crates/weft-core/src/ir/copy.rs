//! Deep copy of a declaration with symbol remapping.
//!
//! The copy gets fresh ids for itself, every nested function, every
//! parameter and local, and every type parameter. References inside the
//! copied tree (returns, value reads, calls to nested functions, types
//! mentioning copied type parameters) are remapped to the fresh ids;
//! references leaving the tree are kept.

use std::collections::HashMap;

use crate::error::LowerResult;
use crate::ids::{DeclId, TypeParamId, ValueId};
use crate::ir::decl::{Param, Parent};
use crate::ir::expr::{CallTarget, Expr, ExprKind};
use crate::ir::fold::{fold_call_children, fold_children, fold_decl_exprs, ExprFolder};
use crate::ir::module::{DeclExprs, Module};
use crate::types::Ty;

/// Copy `decl` and everything nested in it. The copy is detached.
pub fn deep_copy_decl(module: &mut Module, decl: DeclId) -> LowerResult<DeclId> {
    DeepCopier::new(module).copy_decl(decl)
}

struct DeepCopier<'m> {
    module: &'m mut Module,
    decls: HashMap<DeclId, DeclId>,
    values: HashMap<ValueId, ValueId>,
    type_params: HashMap<TypeParamId, TypeParamId>,
}

impl<'m> DeepCopier<'m> {
    fn new(module: &'m mut Module) -> Self {
        Self {
            module,
            decls: HashMap::new(),
            values: HashMap::new(),
            type_params: HashMap::new(),
        }
    }

    fn ty(&mut self, ty: Ty) -> Ty {
        self.module.types.remap_type_params(ty, &self.type_params)
    }

    fn value(&self, value: ValueId) -> ValueId {
        self.values.get(&value).copied().unwrap_or(value)
    }

    fn copy_param(&mut self, param: &mut Param) {
        let value = self.module.new_value(param.name);
        self.values.insert(param.value, value);
        param.value = value;
        param.ty = self.ty(param.ty);
        param.vararg_elem = param.vararg_elem.map(|t| self.ty(t));
    }

    fn copy_decl(&mut self, old: DeclId) -> LowerResult<DeclId> {
        let mut decl = self.module.decl(old).clone();
        let exprs = DeclExprs {
            defaults: decl.params.iter_mut().map(|p| p.default.take()).collect(),
            body: decl.body.take(),
        };

        for tp in &mut decl.type_params {
            let id = self.module.new_type_param(tp.name);
            self.type_params.insert(tp.id, id);
            tp.id = id;
        }
        if let Some(receiver) = &mut decl.dispatch_receiver {
            self.copy_param(receiver);
        }
        if let Some(receiver) = &mut decl.extension_receiver {
            self.copy_param(receiver);
        }
        for param in &mut decl.params {
            self.copy_param(param);
        }
        decl.return_ty = self.ty(decl.return_ty);
        decl.inline_argument = decl.inline_argument.map(|t| self.ty(t));
        decl.parent = Parent::Detached;

        let new = self.module.alloc_decl(decl);
        self.decls.insert(old, new);

        let exprs = fold_decl_exprs(self, exprs)?;
        self.module.put_exprs(new, exprs);
        Ok(new)
    }
}

impl ExprFolder for DeepCopier<'_> {
    fn fold_expr(&mut self, expr: Expr) -> LowerResult<Expr> {
        let Expr { kind, ty } = expr;
        let ty = self.ty(ty);
        let kind = match kind {
            ExprKind::GetValue(value) => ExprKind::GetValue(self.value(value)),
            ExprKind::SetValue { value, expr } => ExprKind::SetValue {
                value: self.value(value),
                expr: Box::new(self.fold_expr(*expr)?),
            },
            ExprKind::Let { value, init } => {
                let init = Box::new(self.fold_expr(*init)?);
                let name = self.module.value_name(value);
                let fresh = self.module.new_value(name);
                self.values.insert(value, fresh);
                ExprKind::Let { value: fresh, init }
            }
            ExprKind::MaskBit { mask, bit } => ExprKind::MaskBit {
                mask: self.value(mask),
                bit,
            },
            ExprKind::Return { target, value } => ExprKind::Return {
                target: self.decls.get(&target).copied().unwrap_or(target),
                value: Box::new(self.fold_expr(*value)?),
            },
            ExprKind::Call(call) => {
                let mut call = fold_call_children(self, *call)?;
                if let CallTarget::Decl(target) = call.target {
                    if let Some(&copy) = self.decls.get(&target) {
                        call.target = CallTarget::Decl(copy);
                    }
                }
                call.type_args = call.type_args.into_iter().map(|t| self.ty(t)).collect();
                ExprKind::Call(Box::new(call))
            }
            kind => return fold_children(self, Expr::new(kind, ty)),
        };
        Ok(Expr::new(kind, ty))
    }

    fn fold_nested(&mut self, decl: DeclId) -> LowerResult<DeclId> {
        self.copy_decl(decl)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ir::builder::ModuleBuilder;
    use crate::ir::fold::nested_functions;

    #[test]
    fn test_copy_remaps_internal_references() {
        let mut mb = ModuleBuilder::new("app");
        let file = mb.file("");
        let mut fb = mb.function(file, "Wrap");
        let t = fb.type_param("T");
        let t_ty = fb.module().types.type_param(t);
        let x = fb.param("x", t_ty);
        fb.returns(t_ty);
        let outer = fb.id();
        let lambda = fb.lambda(Ty::ANY, |lb| {
            let early = Expr::ret(outer, Expr::get(x, t_ty));
            lb.body(early);
        });
        let ret = fb.ret(Expr::get(x, t_ty));
        fb.body(Expr::block(vec![lambda, ret], Ty::NOTHING));
        let wrap = fb.finish();
        let mut module = mb.finish();

        let copy = deep_copy_decl(&mut module, wrap).unwrap();
        let c = module.decl(copy).clone();
        assert_ne!(c.params[0].value, x);
        assert_ne!(c.type_params[0].id, t);
        let new_t = module.types.type_param(c.type_params[0].id);
        assert_eq!(c.return_ty, new_t);
        assert_eq!(module.decl(copy).parent, Parent::Detached);

        let body = c.body.as_ref().unwrap();
        let nested = nested_functions(body);
        assert_eq!(nested.len(), 1);
        assert_ne!(nested[0], module.nested_decls(wrap)[0]);

        // The nested non-local return now targets the copy.
        let nested_body = module.decl(nested[0]).body.clone().unwrap();
        assert_eq!(
            nested_body,
            Expr::ret(copy, Expr::get(c.params[0].value, new_t))
        );
        let ExprKind::Block(stmts) = &body.kind else {
            panic!("expected block");
        };
        assert_eq!(stmts[1], Expr::ret(copy, Expr::get(c.params[0].value, new_t)));
    }
}
