//! Splits eligible declarations into a decoy stub and an implementation.

use std::collections::HashSet;

use tracing::{debug, trace};

use crate::context::LowerContext;
use crate::error::LowerResult;
use crate::ids::{ContainerId, DeclId};
use crate::ir::{
    deep_copy_decl, Annotation, Call, CallTarget, DeclKind, DeclOrigin, Expr, Intrinsic, Module,
};
use crate::lower::dex_safe_name;
use crate::types::Ty;

use super::{should_be_remapped, DECOY_IMPL_SUFFIX};

pub struct CreateDecoys<'a> {
    ctx: &'a LowerContext,
    /// Implementations waiting to be appended to their container.
    pending: Vec<(ContainerId, DeclId)>,
    /// Implementation names handed out, per container.
    claimed: HashSet<(ContainerId, String)>,
}

impl<'a> CreateDecoys<'a> {
    pub fn new(ctx: &'a LowerContext) -> Self {
        Self {
            ctx,
            pending: Vec::new(),
            claimed: HashSet::new(),
        }
    }

    /// Number of decoys created so far.
    pub fn created(&self) -> usize {
        self.claimed.len()
    }

    /// Create decoys for every eligible container member. Implementations
    /// are added after the walk so it never sees them.
    pub fn lower(&mut self, module: &mut Module) -> LowerResult<()> {
        for container in module.containers_in_order() {
            let members = module.container(container).members.clone();
            for member in members {
                let kind = module.decl(member).kind;
                if kind == DeclKind::ExternalSource || module.decl(member).is_decoy() {
                    continue;
                }
                if should_be_remapped(self.ctx, module, member) {
                    self.create_decoy(module, container, member)?;
                }
            }
        }

        for (container, implementation) in self.pending.drain(..) {
            module.add_member(container, implementation);
        }
        module.patch_parents();

        debug!(decoys = self.claimed.len(), "decoys created");
        Ok(())
    }

    /// `name$composable`, or with the first free numeric suffix when that
    /// is taken in `container`.
    fn implementation_name(&self, module: &Module, container: ContainerId, decl: DeclId) -> String {
        let base = format!("{}{}", dex_safe_name(&module.decl_name(decl)), DECOY_IMPL_SUFFIX);
        let existing = module.names_in(container);
        let is_free = |candidate: &str| {
            !self.claimed.contains(&(container, candidate.to_string()))
                && module
                    .interner
                    .get(candidate)
                    .map_or(true, |name| !existing.contains(&name))
        };

        if is_free(&base) {
            return base;
        }
        (0..)
            .map(|i| format!("{}{}", base, i))
            .find(|candidate| is_free(candidate))
            .unwrap_or(base)
    }

    fn create_decoy(
        &mut self,
        module: &mut Module,
        container: ContainerId,
        decl: DeclId,
    ) -> LowerResult<()> {
        let name = self.implementation_name(module, container, decl);
        self.claimed.insert((container, name.clone()));

        let implementation = deep_copy_decl(module, decl)?;
        let interned = module.intern(&name);
        let param_names: Vec<_> = module
            .decl(implementation)
            .params
            .iter()
            .map(|p| {
                let safe = dex_safe_name(&module.str(p.name));
                module.intern(safe.trim_start_matches('$'))
            })
            .collect();
        {
            let copy = module.decl_mut(implementation);
            copy.name = interned;
            copy.origin = DeclOrigin::Defined;
            if copy.kind.is_accessor() {
                copy.kind = DeclKind::Function;
            }
            for (param, name) in copy.params.iter_mut().zip(param_names) {
                param.name = name;
            }
            copy.annotations.push(Annotation::DecoyImplementation { name: name.clone() });
        }

        let original_name = module.decl_name(decl);
        let stub = module.decl_mut(decl);
        stub.annotations = vec![Annotation::Decoy {
            target_name: name.clone(),
            signature: Vec::new(),
        }];
        let is_constructor = stub.kind == DeclKind::Constructor;
        if !is_constructor {
            for param in &mut stub.params {
                param.default = None;
            }
        }
        if stub.body.is_some() || is_constructor {
            stub.body = Some(decoy_stub_body(decl, original_name));
        }

        trace!(%decl, %implementation, "decoy {}", name);
        self.pending.push((container, implementation));
        Ok(())
    }
}

/// `return decoy("<name>")`
fn decoy_stub_body(decl: DeclId, name: String) -> Expr {
    let throw = Expr::call(
        Call::new(CallTarget::Intrinsic(Intrinsic::Decoy), vec![Some(Expr::string(name))]),
        Ty::NOTHING,
    );
    Expr::block(vec![Expr::ret(decl, throw)], Ty::NOTHING)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ir::{dump_decl, Const, ExprKind, ModuleBuilder, Visibility};
    use crate::options::{LowerOptions, Platform};

    fn decoy_ctx() -> LowerContext {
        LowerContext::new(LowerOptions::for_platform(Platform::Js))
    }

    #[test]
    fn test_stub_and_implementation() {
        let mut mb = ModuleBuilder::new("app");
        let file = mb.file("com.example");
        let mut fb = mb.function(file, "Button");
        fb.composable();
        let label = fb.param_default("label", Ty::STRING, Expr::string("OK"));
        fb.param("$$content", Ty::INT);
        fb.body(Expr::get(label, Ty::STRING));
        let button = fb.finish();
        let mut module = mb.finish();

        let ctx = decoy_ctx();
        let mut pass = CreateDecoys::new(&ctx);
        pass.lower(&mut module).unwrap();
        assert_eq!(pass.created(), 1);

        let members = module.container(file).members.clone();
        assert_eq!(members.len(), 2);
        assert_eq!(members[0], button);
        let implementation = members[1];

        let stub = module.decl(button);
        assert_eq!(stub.decoy(), Some(("Button$composable", &[][..])));
        assert!(!stub.has_composable_annotation());
        assert!(!stub.has_default_values());
        let body = stub.body.as_ref().unwrap();
        let ExprKind::Block(stmts) = &body.kind else {
            panic!("expected block");
        };
        let ExprKind::Return { target, value } = &stmts[0].kind else {
            panic!("expected return");
        };
        assert_eq!(*target, button);
        let call = value.as_call().unwrap();
        assert_eq!(call.target, CallTarget::Intrinsic(Intrinsic::Decoy));
        assert_eq!(call.args[0], Some(Expr::string("Button")));

        let copy = module.decl(implementation);
        assert_eq!(module.str(copy.name), "Button$composable");
        assert_eq!(copy.decoy_implementation_name(), Some("Button$composable"));
        assert!(copy.has_composable_annotation());
        assert!(copy.has_default_values());
        assert_eq!(copy.body, Some(Expr::get(copy.params[0].value, Ty::STRING)));
        assert!(dump_decl(&module, implementation).contains("label: String = \"OK\""));
        assert_eq!(module.str(copy.params[1].name), "content");
        assert_eq!(module.str(module.decl(button).params[1].name), "$$content");
    }

    #[test]
    fn test_name_collisions_get_suffix() {
        let mut mb = ModuleBuilder::new("app");
        let file = mb.file("");
        mb.function(file, "Card$composable").finish();
        let mut fb = mb.function(file, "Card");
        fb.composable();
        fb.finish();
        let mut fb = mb.function(file, "Card");
        fb.composable();
        fb.param("elevation", Ty::INT);
        fb.finish();
        let mut module = mb.finish();

        let ctx = decoy_ctx();
        CreateDecoys::new(&ctx).lower(&mut module).unwrap();

        let names: Vec<_> = module
            .container(file)
            .members
            .iter()
            .map(|&m| module.decl_name(m))
            .collect();
        assert_eq!(
            names,
            vec![
                "Card$composable",
                "Card",
                "Card",
                "Card$composable0",
                "Card$composable1"
            ]
        );
    }

    #[test]
    fn test_accessor_and_constructor() {
        let mut mb = ModuleBuilder::new("app");
        let file = mb.file("");
        let class = mb.class(file, "Theme");
        let mut getter = mb.getter(class, "colors");
        getter.composable().returns(Ty::ANY);
        getter.body(Expr::unit());
        let getter = getter.finish();
        let content = mb.module_mut().types.composable_function(vec![], Ty::UNIT);
        let mut ctor = mb.constructor(class);
        let null = Expr::new(ExprKind::Const(Const::Null), content);
        ctor.param_default("content", content, null);
        let ctor = ctor.finish();
        let mut module = mb.finish();

        let ctx = decoy_ctx();
        CreateDecoys::new(&ctx).lower(&mut module).unwrap();

        let members = module.container(class).members.clone();
        assert_eq!(members.len(), 4);
        let getter_impl = module.decl(members[2]);
        assert_eq!(module.str(getter_impl.name), "<get-colors>$composable");
        assert_eq!(getter_impl.kind, DeclKind::Function);

        // Constructors keep their defaults and are always stubbed.
        let stub = module.decl(ctor);
        assert!(stub.is_decoy());
        assert!(stub.has_default_values());
        assert!(stub.body.is_some());
        assert!(module.decl(getter).is_decoy());
    }

    #[test]
    fn test_local_and_plain_functions_skipped() {
        let mut mb = ModuleBuilder::new("app");
        let file = mb.file("");
        let mut fb = mb.function(file, "Screen");
        fb.composable();
        let lambda = fb.lambda(Ty::ANY, |lb| {
            lb.composable();
        });
        fb.body(lambda);
        fb.finish();
        let mut fb = mb.function(file, "helper");
        fb.visibility(Visibility::Private);
        fb.finish();
        let mut module = mb.finish();

        let ctx = decoy_ctx();
        let mut pass = CreateDecoys::new(&ctx);
        pass.lower(&mut module).unwrap();
        assert_eq!(pass.created(), 1);
        assert_eq!(module.container(file).members.len(), 3);
    }
}
