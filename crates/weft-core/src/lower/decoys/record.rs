//! Writes the implementation's public signature onto each exported stub.

use tracing::{debug, trace};

use crate::context::LowerContext;
use crate::error::{LowerError, LowerResult};
use crate::ir::{dump_signature, Annotation, Module};

use super::implementation_for;

pub struct RecordDecoySignatures<'a> {
    ctx: &'a LowerContext,
    recorded: usize,
}

impl<'a> RecordDecoySignatures<'a> {
    pub fn new(ctx: &'a LowerContext) -> Self {
        Self { ctx, recorded: 0 }
    }

    pub fn recorded(&self) -> usize {
        self.recorded
    }

    /// Runs after the composer-parameter rewrite, so the signature is the
    /// one of the rewritten implementation.
    pub fn lower(&mut self, module: &mut Module) -> LowerResult<()> {
        for decl in module.reachable_decls() {
            if !module.decl(decl).is_decoy() || !self.ctx.mangler.is_exported(module, decl) {
                continue;
            }

            let implementation = implementation_for(self.ctx, module, decl)?;
            let signature = self
                .ctx
                .mangler
                .public_signature(module, implementation)
                .ok_or_else(|| LowerError::UnsupportedSignature {
                    decl: dump_signature(module, implementation),
                })?;
            trace!(stub = %decl, %implementation, ?signature, "recording decoy signature");

            let parts = signature.to_parts();
            for annotation in &mut module.decl_mut(decl).annotations {
                if let Annotation::Decoy { signature, .. } = annotation {
                    *signature = parts.clone();
                }
            }
            self.recorded += 1;
        }

        debug!(recorded = self.recorded, "decoy signatures recorded");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ir::{Expr, ModuleBuilder, Visibility};
    use crate::link::{IdSignature, SymbolTable};
    use crate::lower::decoys::CreateDecoys;
    use crate::lower::ComposerParamTransformer;
    use crate::options::{LowerOptions, Platform};
    use crate::types::Ty;

    fn run(module: &mut Module, ctx: &LowerContext) -> usize {
        CreateDecoys::new(ctx).lower(module).unwrap();
        ComposerParamTransformer::new(ctx).lower(module).unwrap();
        let mut pass = RecordDecoySignatures::new(ctx);
        pass.lower(module).unwrap();
        pass.recorded()
    }

    #[test]
    fn test_records_rewritten_signature() {
        let mut mb = ModuleBuilder::new("app");
        let file = mb.file("com.example");
        let mut fb = mb.function(file, "Badge");
        fb.composable();
        fb.param("count", Ty::INT);
        fb.body(Expr::unit());
        let badge = fb.finish();
        let mut fb = mb.function(file, "Hidden");
        fb.composable().visibility(Visibility::Private);
        fb.body(Expr::unit());
        let hidden = fb.finish();
        let mut module = mb.finish();

        let ctx = LowerContext::new(LowerOptions::for_platform(Platform::Js));
        assert_eq!(run(&mut module, &ctx), 1);

        let (_, parts) = module.decl(badge).decoy().unwrap();
        let signature = IdSignature::from_parts(parts).unwrap();
        assert_eq!(signature.package_path, "com.example");
        assert_eq!(signature.declaration_path, "Badge$composable");
        assert!(signature.id.is_some());

        let implementation = implementation_for(&ctx, &module, badge).unwrap();
        assert_eq!(module.decl(implementation).params.len(), 3);
        assert_eq!(
            ctx.mangler.public_signature(&module, implementation),
            Some(signature)
        );

        // Private stubs are not exported and keep an empty signature.
        let (_, parts) = module.decl(hidden).decoy().unwrap();
        assert!(parts.is_empty());
    }

    #[test]
    fn test_signature_resolves_across_modules() {
        let ctx = LowerContext::new(LowerOptions::for_platform(Platform::Native));

        let mut mb = ModuleBuilder::new("lib");
        let file = mb.file("lib.ui");
        let mut fb = mb.function(file, "Chip");
        fb.composable();
        fb.body(Expr::unit());
        let chip = fb.finish();
        let mut library = mb.finish();
        run(&mut library, &ctx);

        let mut table = SymbolTable::new();
        table.index_module(&library, ctx.mangler.as_ref());
        let parts = library.decl(chip).decoy().unwrap().1.to_vec();
        let signature = IdSignature::from_parts(&parts).unwrap();
        let expected = implementation_for(&ctx, &library, chip).unwrap();
        let ctx = ctx.with_resolver(table);

        // A stub seen from another module: detached, so only the signature
        // can find the implementation.
        let mut mb = ModuleBuilder::from_module(library);
        let mut fb = mb.external("Chip");
        fb.annotate(Annotation::Decoy {
            target_name: "Chip$composable".into(),
            signature: signature.to_parts(),
        });
        let external = fb.finish();
        let module = mb.finish();

        assert_eq!(implementation_for(&ctx, &module, external), Ok(expected));
    }

    #[test]
    fn test_malformed_signature() {
        let mut mb = ModuleBuilder::new("app");
        let mut fb = mb.external("Broken");
        fb.annotate(Annotation::Decoy {
            target_name: "Broken$composable".into(),
            signature: vec!["pkg".into(), "Broken$composable".into()],
        });
        let broken = fb.finish();
        let module = mb.finish();

        let ctx = LowerContext::default();
        assert!(matches!(
            implementation_for(&ctx, &module, broken),
            Err(LowerError::MalformedDecoySignature { parts: 2, .. })
        ));
    }
}
