//! Points calls and overrides at decoy implementations instead of stubs.

use std::collections::HashMap;

use tracing::{debug, trace};

use crate::context::LowerContext;
use crate::error::LowerResult;
use crate::ids::DeclId;
use crate::ir::{
    fold_call_children, fold_children, fold_decl_exprs, CallTarget, Expr, ExprFolder, ExprKind,
    Module,
};

use super::implementation_for;

pub struct SubstituteDecoyCalls<'a> {
    ctx: &'a LowerContext,
    /// Stub to implementation, filled lazily.
    cache: HashMap<DeclId, DeclId>,
    substituted: usize,
}

impl<'a> SubstituteDecoyCalls<'a> {
    pub fn new(ctx: &'a LowerContext) -> Self {
        Self {
            ctx,
            cache: HashMap::new(),
            substituted: 0,
        }
    }

    /// Calls and override edges retargeted so far.
    pub fn substituted(&self) -> usize {
        self.substituted
    }

    pub fn lower(&mut self, module: &mut Module) -> LowerResult<()> {
        for decl in module.reachable_decls() {
            // Stubs keep linking against stubs.
            if module.decl(decl).is_decoy() {
                continue;
            }

            let overrides = module.decl(decl).overrides.clone();
            let mut remapped = Vec::with_capacity(overrides.len());
            for o in overrides {
                remapped.push(self.implementation(module, o)?);
            }
            module.decl_mut(decl).overrides = remapped;

            let exprs = module.take_exprs(decl);
            let result = fold_decl_exprs(
                &mut CallRetargeter {
                    pass: &mut *self,
                    module: &*module,
                },
                exprs,
            );
            module.put_exprs(decl, result?);
        }

        debug!(substituted = self.substituted, "decoy calls substituted");
        Ok(())
    }

    /// The implementation for `decl` if it is a decoy, else `decl`.
    fn implementation(&mut self, module: &Module, decl: DeclId) -> LowerResult<DeclId> {
        if !module.decl(decl).is_decoy() {
            return Ok(decl);
        }
        let implementation = match self.cache.get(&decl) {
            Some(&implementation) => implementation,
            None => {
                let implementation = implementation_for(self.ctx, module, decl)?;
                self.cache.insert(decl, implementation);
                implementation
            }
        };
        self.substituted += 1;
        trace!(stub = %decl, %implementation, "substituting decoy");
        Ok(implementation)
    }
}

struct CallRetargeter<'p, 'a, 'm> {
    pass: &'p mut SubstituteDecoyCalls<'a>,
    module: &'m Module,
}

impl ExprFolder for CallRetargeter<'_, '_, '_> {
    fn fold_expr(&mut self, expr: Expr) -> LowerResult<Expr> {
        let Expr { kind, ty } = expr;
        match kind {
            ExprKind::Call(call) => {
                let mut call = fold_call_children(self, *call)?;
                if let CallTarget::Decl(target) = call.target {
                    call.target = CallTarget::Decl(self.pass.implementation(self.module, target)?);
                }
                Ok(Expr::call(call, ty))
            }
            kind => fold_children(self, Expr::new(kind, ty)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::LowerError;
    use crate::ir::{Annotation, ModuleBuilder};
    use crate::lower::decoys::CreateDecoys;
    use crate::options::{LowerOptions, Platform};

    fn decoy_ctx() -> LowerContext {
        LowerContext::new(LowerOptions::for_platform(Platform::Native))
    }

    #[test]
    fn test_calls_and_overrides_retargeted() {
        let mut mb = ModuleBuilder::new("app");
        let file = mb.file("");
        let mut fb = mb.function(file, "Icon");
        fb.composable();
        fb.body(Expr::unit());
        let icon = fb.finish();

        let call = mb.call(icon, vec![]);
        let mut fb = mb.function(file, "Toolbar");
        fb.composable();
        fb.body(call);
        let toolbar = fb.finish();

        let base = mb.class(file, "Base");
        let mut fb = mb.function(base, "Content");
        fb.composable();
        fb.body(Expr::unit());
        let base_content = fb.finish();
        let derived = mb.class(file, "Derived");
        let mut fb = mb.function(derived, "Content");
        fb.composable().overrides(base_content);
        fb.body(Expr::unit());
        fb.finish();
        let mut module = mb.finish();

        let ctx = decoy_ctx();
        CreateDecoys::new(&ctx).lower(&mut module).unwrap();
        let mut pass = SubstituteDecoyCalls::new(&ctx);
        pass.lower(&mut module).unwrap();

        let members = module.container(file).members.clone();
        let icon_impl = members[2];
        let toolbar_impl = members[3];
        assert_eq!(module.decl_name(icon_impl), "Icon$composable");

        let body = module.decl(toolbar_impl).body.clone().unwrap();
        assert_eq!(body.as_call().unwrap().target, CallTarget::Decl(icon_impl));
        // The stub's own body is left alone.
        assert!(module.decl(toolbar).body.as_ref().unwrap().as_call().is_none());

        let base_impl = module.container(base).members[1];
        let derived_impl = module.container(derived).members[1];
        assert_eq!(module.decl(derived_impl).overrides, vec![base_impl]);
        assert_eq!(pass.substituted(), 2);
    }

    #[test]
    fn test_missing_implementation() {
        let mut mb = ModuleBuilder::new("app");
        let file = mb.file("");
        let mut fb = mb.function(file, "Orphan");
        fb.annotate(Annotation::Decoy {
            target_name: "Orphan$composable".into(),
            signature: Vec::new(),
        });
        let orphan = fb.finish();
        let call = mb.call(orphan, vec![]);
        let mut fb = mb.function(file, "Caller");
        fb.body(call);
        fb.finish();
        let mut module = mb.finish();

        let ctx = decoy_ctx();
        let err = SubstituteDecoyCalls::new(&ctx).lower(&mut module).unwrap_err();
        assert!(matches!(
            err,
            LowerError::MissingDecoyImplementation { ref target, .. } if target == "Orphan$composable"
        ));
    }
}
