//! Lowering invariants over randomly generated modules.

use std::collections::HashSet;

use arbitrary::{Arbitrary, Unstructured};
use weft_core::ir::{walk_expr, CallTarget, DeclKind, Expr, ExprKind, ParamOrigin};
use weft_core::lower::decoys::implementation_for;
use weft_core::lower::synthetic_param_count;
use weft_core::{
    lower_module, DeclId, IdSignature, LowerContext, LowerOptions, Module, Platform,
    SymbolResolver, SymbolTable,
};
use weft_smith::{seed_bytes, GeneratedModule};

const SEEDS: u64 = 64;

fn lowered(seed: u64, platform: Platform) -> Option<(Module, LowerContext)> {
    let data = seed_bytes(seed);
    let mut u = Unstructured::new(&data);
    let mut generated = GeneratedModule::arbitrary(&mut u).ok()?;
    let ctx = LowerContext::new(LowerOptions::for_platform(platform));
    if let Err(e) = lower_module(&mut generated.module, &ctx) {
        panic!("seed {} ({:?}) failed: {}\n{}", seed, platform, e, generated.dump());
    }
    Some((generated.module, ctx))
}

/// Every expression a declaration owns, outside nested functions.
fn exprs_of(module: &Module, decl: DeclId) -> Vec<&Expr> {
    let d = module.decl(decl);
    let mut out = Vec::new();
    for root in d.params.iter().filter_map(|p| p.default.as_ref()).chain(d.body.iter()) {
        walk_expr(root, &mut |e| out.push(e));
    }
    out
}

fn for_each_lowered(check: impl Fn(u64, &Module, &LowerContext)) {
    for seed in 0..SEEDS {
        for platform in [Platform::Jvm, Platform::Js] {
            if let Some((module, ctx)) = lowered(seed, platform) {
                check(seed, &module, &ctx);
            }
        }
    }
}

#[test]
fn test_synthetic_counts_match_calculator() {
    for_each_lowered(|seed, module, _| {
        for decl in module.reachable_decls() {
            let d = module.decl(decl);
            if !d.params.iter().any(|p| p.origin == ParamOrigin::Composer) {
                continue;
            }
            let real = d.real_params().count();
            let has_default = d.params.iter().any(|p| p.origin == ParamOrigin::DefaultMask);
            let synthetic = d.params.iter().filter(|p| p.origin.is_synthetic()).count();
            assert_eq!(
                synthetic,
                synthetic_param_count(real, d.receiver_slots(), has_default),
                "seed {}: {}",
                seed,
                module.decl_name(decl)
            );
            if d.has_default_values() && d.kind != DeclKind::Constructor {
                assert!(has_default, "seed {}: defaults without mask", seed);
            }
        }
    });
}

#[test]
fn test_rewritten_calls_fill_every_slot() {
    for_each_lowered(|seed, module, _| {
        for decl in module.reachable_decls() {
            for expr in exprs_of(module, decl) {
                let Some(call) = expr.as_call() else { continue };
                if !call.is_composable_call {
                    continue;
                }
                match call.target {
                    CallTarget::Decl(target) => {
                        assert!(module.is_attached(target), "seed {}: call to detached", seed);
                        assert_eq!(call.args.len(), module.decl(target).params.len(), "seed {}", seed);
                    }
                    CallTarget::Invoke { arity } => assert_eq!(call.args.len(), arity),
                    CallTarget::Intrinsic(_) => panic!("seed {}: rewritten intrinsic", seed),
                }
            }
        }
    });
}

#[test]
fn test_returns_target_attached_declarations() {
    for_each_lowered(|seed, module, _| {
        for decl in module.reachable_decls() {
            for expr in exprs_of(module, decl) {
                if let ExprKind::Return { target, .. } = expr.kind {
                    assert!(
                        module.is_attached(target),
                        "seed {}: return to detached {} in {}",
                        seed,
                        target,
                        module.decl_name(decl)
                    );
                }
            }
        }
    });
}

#[test]
fn test_decoy_names_unique_per_container() {
    for_each_lowered(|seed, module, _| {
        for container in module.containers_in_order() {
            let mut seen = HashSet::new();
            for &member in &module.container(container).members {
                if let Some(name) = module.decl(member).decoy_implementation_name() {
                    assert!(seen.insert(name.to_string()), "seed {}: duplicate {}", seed, name);
                }
            }
        }
    });
}

#[test]
fn test_recorded_signatures_resolve() {
    for_each_lowered(|seed, module, ctx| {
        let mut table = SymbolTable::new();
        table.index_module(module, ctx.mangler.as_ref());

        for decl in module.reachable_decls() {
            let Some((_, parts)) = module.decl(decl).decoy() else { continue };
            if parts.is_empty() {
                continue;
            }
            let signature = IdSignature::from_parts(parts).expect("four parts");
            let implementation = implementation_for(ctx, module, decl).unwrap();
            assert_eq!(
                table.resolve(&signature),
                Some(implementation),
                "seed {}: {}",
                seed,
                module.decl_name(decl)
            );
        }
    });
}
