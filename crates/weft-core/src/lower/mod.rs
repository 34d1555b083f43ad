//! Lowering passes and the pipeline driver.
//!
//! With decoys enabled the passes run as
//!
//! ```text
//! create decoys → substitute decoy calls → composer params → record signatures
//! ```
//!
//! Each pass finishes a full walk of the module and patches parents before
//! the next one starts.

pub mod composer_param;
pub mod decoys;
pub mod synthetic;

use serde::Serialize;
use tracing::debug;

use crate::context::LowerContext;
use crate::error::LowerResult;
use crate::ir::Module;

pub use composer_param::{zero_value, ComposerParamTransformer, RewriteStats};
pub use decoys::{CreateDecoys, RecordDecoySignatures, SubstituteDecoyCalls};
pub use synthetic::{
    bit_mask, changed_word_count, default_word_count, synthetic_param_count, synthetic_params,
    SyntheticParam, BITS_PER_WORD,
};

/// What one `lower_module` call did.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct LowerStats {
    pub decoys_created: usize,
    pub decoy_calls_substituted: usize,
    pub declarations_rewritten: usize,
    pub calls_rewritten: usize,
    pub signatures_recorded: usize,
}

/// Lower one module in place.
///
/// On error the module is left partially lowered and must be discarded.
pub fn lower_module(module: &mut Module, ctx: &LowerContext) -> LowerResult<LowerStats> {
    let decoys = ctx.options.decoys_enabled();
    debug!(
        module = %module.str(module.name),
        platform = ?ctx.options.platform,
        decoys,
        "lowering module"
    );

    let mut stats = LowerStats::default();
    if decoys {
        let mut create = CreateDecoys::new(ctx);
        create.lower(module)?;
        stats.decoys_created = create.created();

        let mut substitute = SubstituteDecoyCalls::new(ctx);
        substitute.lower(module)?;
        stats.decoy_calls_substituted = substitute.substituted();
    }

    let mut composer = ComposerParamTransformer::new(ctx);
    composer.lower(module)?;
    let rewrite = composer.stats();
    stats.declarations_rewritten = rewrite.declarations;
    stats.calls_rewritten = rewrite.calls;

    if decoys {
        let mut record = RecordDecoySignatures::new(ctx);
        record.lower(module)?;
        stats.signatures_recorded = record.recorded();
    }

    debug!(?stats, "module lowered");
    Ok(stats)
}

/// Make synthetic special names like `<anonymous parameter 0>` safe for
/// platform linkage.
pub(crate) fn dex_safe_name(name: &str) -> String {
    if name.starts_with('<') && name.contains(' ') {
        name.replace([' ', '<', '>'], "$")
    } else {
        name.to_string()
    }
}

/// Uppercase the first ASCII letter.
pub(crate) fn capitalize(s: &str) -> String {
    let mut chars = s.chars();
    match chars.next() {
        Some(first) => first.to_ascii_uppercase().to_string() + chars.as_str(),
        None => String::new(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ids::DeclId;
    use crate::ir::{Annotation, Call, CallTarget, Const, Expr, ExprKind, ModuleBuilder};
    use crate::link::{IdSignature, SymbolTable};
    use crate::lower::decoys::implementation_for;
    use crate::options::{LowerOptions, Platform};
    use crate::types::Ty;

    fn sample() -> (Module, DeclId, DeclId) {
        let mut mb = ModuleBuilder::new("app");
        let file = mb.file("com.example");
        let mut fb = mb.function(file, "Button");
        fb.composable();
        let yes = Expr::new(ExprKind::Const(Const::Bool(true)), Ty::BOOL);
        fb.param_default("enabled", Ty::BOOL, yes);
        fb.body(Expr::unit());
        let button = fb.finish();

        let mut fb = mb.function(file, "Screen");
        fb.composable();
        fb.body(Expr::call(Call::decl(button, vec![None]), Ty::UNIT));
        let screen = fb.finish();
        (mb.finish(), button, screen)
    }

    #[test]
    fn test_lower_without_decoys() {
        let (mut module, _, _) = sample();
        let ctx = LowerContext::default();
        let stats = lower_module(&mut module, &ctx).unwrap();
        assert_eq!(
            stats,
            LowerStats {
                declarations_rewritten: 2,
                calls_rewritten: 1,
                ..LowerStats::default()
            }
        );
    }

    #[test]
    fn test_lower_with_decoys() {
        let (mut module, button, screen) = sample();
        let ctx = LowerContext::new(LowerOptions::for_platform(Platform::Js));
        let stats = lower_module(&mut module, &ctx).unwrap();
        assert_eq!(stats.decoys_created, 2);
        assert_eq!(stats.decoy_calls_substituted, 1);
        assert_eq!(stats.declarations_rewritten, 2);
        assert_eq!(stats.calls_rewritten, 1);
        assert_eq!(stats.signatures_recorded, 2);

        let file = module.files[0];
        let members = module.container(file).members.clone();
        assert_eq!(members.len(), 4);
        assert_eq!(&members[..2], &[button, screen]);
        let button_impl = members[2];
        let screen_impl = members[3];

        // Stubs keep their shape; implementations carry the composer.
        assert_eq!(module.decl(button).params.len(), 1);
        assert_eq!(module.decl(button_impl).params.len(), 4);
        let body = module.decl(screen_impl).body.clone().unwrap();
        let call = body.as_call().unwrap();
        assert_eq!(call.target, CallTarget::Decl(button_impl));
        assert_eq!(call.args.len(), 4);

        let (_, parts) = module.decl(screen).decoy().unwrap();
        let signature = IdSignature::from_parts(parts).unwrap();
        assert_eq!(signature.declaration_path, "Screen$composable");
        assert_eq!(ctx.mangler.public_signature(&module, screen_impl), Some(signature));
    }

    #[test]
    fn test_call_to_decoy_from_another_unit() {
        let library_ctx = LowerContext::new(LowerOptions::for_platform(Platform::Js));
        let mut mb = ModuleBuilder::new("lib");
        let file = mb.file("lib.ui");
        let mut fb = mb.function(file, "Chip");
        fb.composable();
        fb.body(Expr::unit());
        let chip = fb.finish();
        let mut library = mb.finish();
        lower_module(&mut library, &library_ctx).unwrap();

        let mut table = SymbolTable::new();
        table.index_module(&library, library_ctx.mangler.as_ref());
        let parts = library.decl(chip).decoy().unwrap().1.to_vec();
        let chip_impl = implementation_for(&library_ctx, &library, chip).unwrap();
        assert_eq!(library.decl(chip_impl).params.len(), 2);

        // The library's declarations stay in the arena but are no longer
        // part of the unit being lowered.
        let mut mb = ModuleBuilder::from_module(library);
        mb.module_mut().files.clear();
        let mut fb = mb.external("Chip");
        fb.annotate(Annotation::Decoy {
            target_name: "Chip$composable".into(),
            signature: parts,
        });
        let external = fb.finish();
        let file = mb.file("app");
        let mut fb = mb.function(file, "Screen");
        fb.composable();
        fb.body(Expr::call(Call::decl(external, vec![]), Ty::UNIT));
        fb.finish();
        let mut module = mb.finish();

        let ctx = LowerContext::new(LowerOptions::for_platform(Platform::Js)).with_resolver(table);
        let stats = lower_module(&mut module, &ctx).unwrap();
        assert_eq!(stats.decoy_calls_substituted, 1);
        // Only Screen$composable. The lowered Chip$composable is reused as is.
        assert_eq!(stats.declarations_rewritten, 1);
        assert_eq!(module.decl(chip_impl).params.len(), 2);

        let screen_impl = module.container(file).members[1];
        let body = module.decl(screen_impl).body.clone().unwrap();
        let call = body.as_call().unwrap();
        assert_eq!(call.target, CallTarget::Decl(chip_impl));
        assert_eq!(call.args.len(), 2);
        assert!(call.is_composable_call);
    }

    #[test]
    fn test_decoys_forced_on_jvm() {
        let (mut module, _, _) = sample();
        let ctx = LowerContext::new(LowerOptions::default().with_decoys(true));
        let stats = lower_module(&mut module, &ctx).unwrap();
        assert_eq!(stats.decoys_created, 2);
    }

    #[test]
    fn test_dex_safe_name() {
        assert_eq!(dex_safe_name("<anonymous parameter 0>"), "$anonymous$parameter$0$");
        assert_eq!(dex_safe_name("<this>"), "<this>");
        assert_eq!(dex_safe_name("modifier"), "modifier");
        assert_eq!(capitalize("title"), "Title");
        assert_eq!(capitalize(""), "");
    }
}
