//! Decoys: binary-compatible stubs for rewritten declarations.
//!
//! A declaration whose rewritten shape would no longer match what other
//! compilation units linked against is split in two. The original keeps
//! its signature and becomes a stub whose body throws; a renamed copy
//! (`name$composable`) carries the real body and goes through the
//! composer-parameter rewrite. Both carry annotations naming each other,
//! and after the rewrite the stub also records the implementation's public
//! signature.

mod create;
mod record;
mod substitute;

pub use create::CreateDecoys;
pub use record::RecordDecoySignatures;
pub use substitute::SubstituteDecoyCalls;

use crate::context::LowerContext;
use crate::error::{LowerError, LowerResult};
use crate::ids::DeclId;
use crate::ir::{dump_signature, Module};
use crate::link::IdSignature;

/// Appended to the implementation's name.
pub const DECOY_IMPL_SUFFIX: &str = "$composable";

/// Whether `decl` gets a decoy: it is not local, and it is composable or
/// takes a composable parameter.
pub fn should_be_remapped(ctx: &LowerContext, module: &Module, decl: DeclId) -> bool {
    !is_local_function(ctx, module, decl)
        && (ctx.is_composable(module, decl) || has_composable_param(ctx, module, decl))
}

fn is_local_function(ctx: &LowerContext, module: &Module, decl: DeclId) -> bool {
    let d = module.decl(decl);
    d.is_lambda()
        || (d.is_local()
            && !d.overrides.iter().any(|&o| {
                module.decl(o).is_decoy() || should_be_remapped(ctx, module, o)
            }))
}

fn has_composable_param(ctx: &LowerContext, module: &Module, decl: DeclId) -> bool {
    let d = module.decl(decl);
    d.params
        .iter()
        .chain(d.extension_receiver.iter())
        .any(|p| ctx.has_composable_type(module, p.ty))
}

/// The implementation paired with the decoy stub `decl`.
///
/// Looks for a sibling carrying the matching implementation name first.
/// Otherwise the recorded signature is resolved: top-level declarations
/// through the cross-module resolver, members among their siblings.
pub fn implementation_for(
    ctx: &LowerContext,
    module: &Module,
    decl: DeclId,
) -> LowerResult<DeclId> {
    let d = module.decl(decl);
    let Some((target_name, signature)) = d.decoy() else {
        return Err(LowerError::MissingDecoyImplementation {
            decl: dump_signature(module, decl),
            target: String::new(),
        });
    };
    let missing = || LowerError::MissingDecoyImplementation {
        decl: dump_signature(module, decl),
        target: target_name.to_string(),
    };

    let container = module.container_of(decl);
    if let Some(container) = container {
        let local = module
            .container(container)
            .members
            .iter()
            .copied()
            .find(|&m| module.decl(m).decoy_implementation_name() == Some(target_name));
        if let Some(implementation) = local {
            return Ok(implementation);
        }
    }

    if signature.is_empty() {
        return Err(missing());
    }
    let signature =
        IdSignature::from_parts(signature).ok_or_else(|| LowerError::MalformedDecoySignature {
            decl: dump_signature(module, decl),
            parts: signature.len(),
        })?;

    let found = match container {
        Some(container) if !module.class_path(container).is_empty() => module
            .container(container)
            .members
            .iter()
            .copied()
            .find(|&m| ctx.mangler.public_signature(module, m).as_ref() == Some(&signature)),
        _ => ctx.resolver.resolve(&signature),
    };
    found.ok_or_else(missing)
}
