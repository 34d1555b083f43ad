//! Composer parameter lowering.
//!
//! Transforms `@Composable fun foo(params): R` into
//! `fun foo(params, $composer: Composer?, $changed: Int[, $default: Int]): R`
//! and rewrites every composable call inside rewritten bodies to pass the
//! new arguments.
//!
//! Rewritten declarations are clones with fresh ids. The original stays in
//! the arena, the clone takes its place in the container, and
//! `patch_parents` runs once at the end.

use std::collections::{HashMap, HashSet};

use tracing::{debug, trace};

use crate::context::LowerContext;
use crate::error::{LowerError, LowerResult};
use crate::ids::{DeclId, ValueId};
use crate::ir::{
    dump_expr, dump_signature, fold_call_children, fold_children, fold_decl_exprs, Annotation,
    Call, CallTarget, CompositeOrigin, Const, DeclKind, Expr, ExprFolder, ExprKind, Module, Param,
    ParamOrigin,
};
use crate::types::{Ty, TyKind};

use super::synthetic::{
    bit_mask, changed_word_count, default_word_count, synthetic_param_count, synthetic_params,
    SyntheticParam, BITS_PER_WORD, COMPOSER_PARAM,
};
use super::{capitalize, dex_safe_name};

/// Counters reported after the pass.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RewriteStats {
    pub declarations: usize,
    pub calls: usize,
}

/// The composer-parameter pass. One instance per module lowering; it owns
/// the rewrite map.
pub struct ComposerParamTransformer<'a> {
    ctx: &'a LowerContext,
    /// Original to rewritten.
    rewritten: HashMap<DeclId, DeclId>,
    /// Every declaration produced by this pass.
    rewritten_set: HashSet<DeclId>,
    stats: RewriteStats,
}

impl<'a> ComposerParamTransformer<'a> {
    pub fn new(ctx: &'a LowerContext) -> Self {
        Self {
            ctx,
            rewritten: HashMap::new(),
            rewritten_set: HashSet::new(),
            stats: RewriteStats::default(),
        }
    }

    pub fn stats(&self) -> RewriteStats {
        self.stats
    }

    /// The rewritten counterpart of `decl`, if it has one.
    pub fn rewritten(&self, decl: DeclId) -> Option<DeclId> {
        self.rewritten.get(&decl).copied()
    }

    pub fn is_rewritten(&self, decl: DeclId) -> bool {
        self.rewritten_set.contains(&decl)
    }

    /// Rewrite every declaration in the module.
    pub fn lower(&mut self, module: &mut Module) -> LowerResult<()> {
        for container in module.containers_in_order() {
            let members = module.container(container).members.clone();
            for member in members {
                let new = self.visit_decl(module, member)?;
                if new != member {
                    module.replace_member(container, member, new);
                }
            }
        }
        module.patch_parents();

        debug!(
            declarations = self.stats.declarations,
            calls = self.stats.calls,
            "composer parameters added"
        );
        Ok(())
    }

    /// Rewrite `decl` if needed, then the functions nested in it.
    fn visit_decl(&mut self, module: &mut Module, decl: DeclId) -> LowerResult<DeclId> {
        let decl = self.rewrite(module, decl)?;
        let exprs = module.take_exprs(decl);
        let exprs = fold_decl_exprs(
            &mut NestedVisitor {
                transformer: &mut *self,
                module: &mut *module,
            },
            exprs,
        )?;
        module.put_exprs(decl, exprs);
        Ok(decl)
    }

    /// The declaration with composer parameters, or `decl` itself when it
    /// is not rewritten. Memoized.
    pub fn rewrite(&mut self, module: &mut Module, decl: DeclId) -> LowerResult<DeclId> {
        if self.rewritten_set.contains(&decl) {
            return Ok(decl);
        }
        if !self.ctx.is_composable(module, decl) {
            return Ok(decl);
        }
        if self.is_non_composable_inlined_lambda(module, decl) {
            return Ok(decl);
        }
        // Expect declarations only exist for resolution.
        if module.decl(decl).flags.is_expect {
            return Ok(decl);
        }
        if let Some(&done) = self.rewritten.get(&decl) {
            return Ok(done);
        }
        // Lowered in an earlier unit, e.g. a decoy implementation found
        // through the resolver. It is its own rewritten form.
        if module
            .decl(decl)
            .params
            .iter()
            .any(|p| p.origin == ParamOrigin::Composer)
        {
            trace!(%decl, "already lowered");
            self.rewritten_set.insert(decl);
            return Ok(decl);
        }
        self.copy_with_composer_param(module, decl)
    }

    /// A lambda passed to a non-composable inline parameter. It is inlined
    /// into its caller and shares the caller's composer.
    fn is_non_composable_inlined_lambda(&self, module: &Module, decl: DeclId) -> bool {
        let d = module.decl(decl);
        match d.inline_argument {
            Some(ty) if d.is_lambda() => !self.ctx.is_composable_type(module, ty),
            _ => false,
        }
    }

    fn requires_default_mask(&self, module: &Module, decl: DeclId) -> bool {
        let d = module.decl(decl);
        d.kind != DeclKind::Constructor
            && (d.has_default_values()
                || d.overrides
                    .iter()
                    .any(|&o| self.requires_default_mask(module, o)))
    }

    fn copy_with_composer_param(&mut self, module: &mut Module, old: DeclId) -> LowerResult<DeclId> {
        let composer_name = module.intern(COMPOSER_PARAM);
        if module
            .decl(old)
            .explicit_params()
            .any(|p| p.origin.is_synthetic() || p.name == composer_name)
        {
            return Err(LowerError::AlreadyRewritten {
                decl: dump_signature(module, old),
            });
        }
        let requires_default = self.requires_default_mask(module, old);

        let mut clone = module.decl(old).clone();
        let body = clone.body.take();
        let mut defaults = Vec::with_capacity(clone.params.len());

        // Fresh symbols for every explicit parameter.
        let mut values = HashMap::new();
        for receiver in clone
            .dispatch_receiver
            .iter_mut()
            .chain(clone.extension_receiver.iter_mut())
        {
            let value = module.new_value(receiver.name);
            values.insert(receiver.value, value);
            receiver.value = value;
        }
        for param in &mut clone.params {
            let name = module.intern(&dex_safe_name(&module.str(param.name)));
            let value = module.new_value(name);
            values.insert(param.value, value);
            param.value = value;
            param.name = name;
            param.is_assignable = param.default.is_some();
            if param.default.is_some() {
                param.ty = default_parameter_type(module, param.ty);
            }
            defaults.push(param.default.take());
        }

        if clone.link_name().is_none() {
            match clone.kind {
                DeclKind::Getter { property } => {
                    let name = getter_name(&module.str(property));
                    clone.annotations.push(Annotation::LinkName(name));
                }
                DeclKind::Setter { property } => {
                    let name = setter_name(&module.str(property));
                    clone.annotations.push(Annotation::LinkName(name));
                }
                _ => {}
            }
        }

        let real_params = clone.params.len();
        let receivers = clone.receiver_slots();
        let mut composer = ValueId::INVALID;
        let mut default_words = Vec::new();
        for synthetic in synthetic_params(real_params, receivers, requires_default) {
            let name = module.intern(&synthetic.name());
            let value = module.new_value(name);
            let ty = match synthetic {
                SyntheticParam::Composer => {
                    composer = value;
                    module.types.make_nullable(Ty::COMPOSER)
                }
                SyntheticParam::Changed(_) => Ty::INT,
                SyntheticParam::Default(_) => {
                    default_words.push(value);
                    Ty::INT
                }
            };
            let mut param = Param::new(value, name, ty);
            param.origin = synthetic.origin();
            param.is_assignable = synthetic == SyntheticParam::Composer;
            clone.params.push(param);
            defaults.push(None);
        }

        let overrides = std::mem::take(&mut clone.overrides);
        let new = module.alloc_decl(clone);

        // Registered before anything below can recurse back into `old`.
        self.rewritten_set.insert(new);
        self.rewritten.insert(old, new);
        self.stats.declarations += 1;
        trace!(%old, %new, "rewriting {}", module.decl_name(old));

        let overrides = overrides
            .into_iter()
            .map(|o| self.rewrite(module, o))
            .collect::<LowerResult<Vec<_>>>()?;
        module.decl_mut(new).overrides = overrides;

        let mut folder = BodyRewriter {
            transformer: &mut *self,
            module: &mut *module,
            old,
            new,
            values,
            composer,
            nested: false,
        };
        let exprs = fold_decl_exprs(
            &mut folder,
            crate::ir::DeclExprs {
                defaults,
                body,
            },
        )?;

        let body = match exprs.body {
            Some(body) if self.ctx.options.default_prologue && !default_words.is_empty() => {
                Some(default_prologue(module, new, &exprs.defaults, &default_words, body))
            }
            body => body,
        };
        module.put_exprs(
            new,
            crate::ir::DeclExprs {
                defaults: exprs.defaults,
                body,
            },
        );
        Ok(new)
    }

    /// Rewrite a call to pass the composer and mask words. `composer` is
    /// the enclosing rewritten declaration's composer parameter.
    pub fn rewrite_call(
        &mut self,
        module: &mut Module,
        call: Call,
        composer: ValueId,
    ) -> LowerResult<Call> {
        if call.is_composable_call {
            return Ok(call);
        }
        let is_composable_lambda = matches!(call.target, CallTarget::Invoke { .. })
            && call
                .dispatch_receiver
                .as_ref()
                .is_some_and(|r| self.ctx.is_composable_type(module, r.ty));

        let real_params = call.args.len();
        let (target, owner_params, receivers, has_defaults) = match call.target {
            CallTarget::Invoke { arity } if is_composable_lambda => {
                let extra = synthetic_param_count(arity, 0, false);
                (CallTarget::Invoke { arity: arity + extra }, arity + extra, 0, false)
            }
            CallTarget::Decl(target) => {
                if !self.ctx.is_composable(module, target) {
                    return Ok(call);
                }
                let owner = self.rewrite(module, target)?;
                if !self.rewritten_set.contains(&owner) {
                    return Ok(call);
                }
                let o = module.decl(owner);
                (CallTarget::Decl(owner), o.params.len(), o.receiver_slots(), true)
            }
            _ => return Ok(call),
        };

        let mut missing = Vec::with_capacity(real_params);
        let mut args = Vec::with_capacity(owner_params);
        for (i, arg) in call.args.iter().enumerate() {
            missing.push(arg.is_none());
            let arg = match (arg, target) {
                (Some(arg), _) => Some(arg.clone()),
                (None, CallTarget::Decl(owner)) => {
                    match module.decl(owner).params.get(i).cloned() {
                        Some(param) => default_argument_for(module, &param),
                        None => None,
                    }
                }
                (None, _) => None,
            };
            args.push(arg);
        }

        let composer_ty = module.types.make_nullable(Ty::COMPOSER);
        args.push(Some(Expr::get(composer, composer_ty)));

        for _ in 0..changed_word_count(real_params, receivers) {
            if args.len() >= owner_params {
                return Err(slot_mismatch(module, &call, args.len() + 1, owner_params));
            }
            args.push(Some(Expr::int(0)));
        }

        if has_defaults {
            for word in 0..default_word_count(real_params) {
                let start = word * BITS_PER_WORD;
                let end = (start + BITS_PER_WORD).min(real_params);
                if args.len() < owner_params {
                    args.push(Some(Expr::int(bit_mask(&missing[start..end]))));
                } else if missing.iter().any(|&m| m) {
                    return Err(slot_mismatch(module, &call, args.len() + 1, owner_params));
                }
            }
        }

        if args.len() != owner_params {
            return Err(slot_mismatch(module, &call, args.len(), owner_params));
        }

        self.stats.calls += 1;
        let rewritten = Call {
            target,
            dispatch_receiver: call.dispatch_receiver,
            extension_receiver: call.extension_receiver,
            type_args: call.type_args,
            args,
            is_composable_call: true,
        };
        trace!(
            call = %dump_expr(module, &Expr::call(rewritten.clone(), Ty::UNIT)),
            "composable call"
        );
        Ok(rewritten)
    }
}

fn slot_mismatch(module: &Module, call: &Call, needed: usize, available: usize) -> LowerError {
    LowerError::SlotCountMismatch {
        call: dump_expr(module, &Expr::call(call.clone(), Ty::UNIT)),
        needed,
        available,
    }
}

/// Walks a declaration after its own rewrite, rewriting the functions
/// nested in it and updating references to them.
struct NestedVisitor<'t, 'a, 'm> {
    transformer: &'t mut ComposerParamTransformer<'a>,
    module: &'m mut Module,
}

impl ExprFolder for NestedVisitor<'_, '_, '_> {
    fn fold_nested(&mut self, decl: DeclId) -> LowerResult<DeclId> {
        self.transformer.visit_decl(self.module, decl)
    }
}

/// Rewrites the body of a freshly cloned declaration.
struct BodyRewriter<'t, 'a, 'm> {
    transformer: &'t mut ComposerParamTransformer<'a>,
    module: &'m mut Module,
    old: DeclId,
    new: DeclId,
    /// Old parameter symbols to the clone's.
    values: HashMap<ValueId, ValueId>,
    composer: ValueId,
    /// Inside a nested function that is not inlined into this body.
    nested: bool,
}

impl ExprFolder for BodyRewriter<'_, '_, '_> {
    fn fold_expr(&mut self, expr: Expr) -> LowerResult<Expr> {
        let Expr { kind, ty } = expr;
        match kind {
            ExprKind::GetValue(value) => {
                let value = self.values.get(&value).copied().unwrap_or(value);
                Ok(Expr::get(value, ty))
            }
            ExprKind::SetValue { value, expr } => {
                let value = self.values.get(&value).copied().unwrap_or(value);
                let expr = Box::new(self.fold_expr(*expr)?);
                Ok(Expr::new(ExprKind::SetValue { value, expr }, ty))
            }
            ExprKind::Return { target, value } => {
                // Otherwise it would read as a non-local return.
                let target = if target == self.old { self.new } else { target };
                let value = Box::new(self.fold_expr(*value)?);
                Ok(Expr::new(ExprKind::Return { target, value }, ty))
            }
            ExprKind::Call(call) => {
                let call = fold_call_children(self, *call)?;
                let call = if self.nested {
                    call
                } else {
                    self.transformer
                        .rewrite_call(self.module, call, self.composer)?
                };
                Ok(Expr::call(call, ty))
            }
            kind => fold_children(self, Expr::new(kind, ty)),
        }
    }

    fn fold_nested(&mut self, decl: DeclId) -> LowerResult<DeclId> {
        let was_nested = self.nested;
        // Composable calls in nested scopes get their own composer, unless
        // the scope is inlined here.
        self.nested = if self
            .transformer
            .is_non_composable_inlined_lambda(self.module, decl)
        {
            was_nested
        } else {
            true
        };
        let exprs = self.module.take_exprs(decl);
        let result = fold_decl_exprs(self, exprs);
        self.nested = was_nested;
        self.module.put_exprs(decl, result?);
        Ok(decl)
    }
}

/// Defaulted parameters become nullable so the callee can tell "omitted"
/// apart, unless the type is primitive or an inline class.
fn default_parameter_type(module: &mut Module, ty: Ty) -> Ty {
    if module.types.is_primitive(ty) || module.types.is_inline_class(ty) {
        ty
    } else {
        module.types.make_nullable(ty)
    }
}

/// `if ($default has bit i) p_i = <default>` for every defaulted parameter,
/// followed by the original body.
fn default_prologue(
    module: &Module,
    decl: DeclId,
    defaults: &[Option<Expr>],
    words: &[ValueId],
    body: Expr,
) -> Expr {
    let d = module.decl(decl);
    let mut stmts = Vec::new();
    for (i, (param, default)) in d.real_params().zip(defaults).enumerate() {
        let Some(default) = default else { continue };
        let cond = Expr::new(
            ExprKind::MaskBit {
                mask: words[i / BITS_PER_WORD],
                bit: (i % BITS_PER_WORD) as u32,
            },
            Ty::BOOL,
        );
        let assign = Expr::new(
            ExprKind::SetValue {
                value: param.value,
                expr: Box::new(default.clone()),
            },
            Ty::UNIT,
        );
        stmts.push(Expr::new(
            ExprKind::If {
                cond: Box::new(cond),
                then_branch: Box::new(assign),
                else_branch: None,
            },
            Ty::UNIT,
        ));
    }
    let ty = body.ty;
    match body.kind {
        ExprKind::Block(inner) => {
            stmts.extend(inner);
            Expr::block(stmts, ty)
        }
        kind => {
            stmts.push(Expr::new(kind, ty));
            Expr::block(stmts, ty)
        }
    }
}

/// The placeholder passed for an omitted argument. Vararg parameters stay
/// omitted.
fn default_argument_for(module: &mut Module, param: &Param) -> Option<Expr> {
    if param.vararg_elem.is_some() {
        return None;
    }
    let value = zero_value(module, param.ty);
    Some(Expr::new(
        ExprKind::Composite {
            origin: CompositeOrigin::DefaultValue,
            stmts: vec![value],
        },
        param.ty,
    ))
}

/// The zero value of `ty`: `0` for primitives, `null` for references, and
/// a construction around the underlying zero for non-null inline classes.
pub fn zero_value(module: &mut Module, ty: Ty) -> Expr {
    let data = module.types.data(ty);
    if data.nullable {
        return Expr::new(ExprKind::Const(Const::Null), ty);
    }
    let c = match &data.kind {
        TyKind::Bool => Const::Bool(false),
        TyKind::Byte => Const::Byte(0),
        TyKind::Short => Const::Short(0),
        TyKind::Int => Const::Int(0),
        TyKind::Long => Const::Long(0),
        TyKind::Float => Const::Float(0.0),
        TyKind::Double => Const::Double(0.0),
        TyKind::Char => Const::Char('\0'),
        TyKind::Class {
            underlying: Some(underlying),
            ..
        } => {
            let inner = zero_value(module, *underlying);
            return Expr::new(ExprKind::InlineClassNew(Box::new(inner)), ty);
        }
        _ => Const::Null,
    };
    Expr::new(ExprKind::Const(c), ty)
}

/// Platform getter name: `color` -> `getColor`, `isEnabled` stays.
fn getter_name(property: &str) -> String {
    if starts_with_is_prefix(property) {
        property.to_string()
    } else {
        format!("get{}", capitalize(property))
    }
}

/// Platform setter name: `color` -> `setColor`, `isEnabled` -> `setEnabled`.
fn setter_name(property: &str) -> String {
    let stem = if starts_with_is_prefix(property) {
        &property[2..]
    } else {
        property
    };
    format!("set{}", capitalize(stem))
}

fn starts_with_is_prefix(name: &str) -> bool {
    name.strip_prefix("is")
        .and_then(|rest| rest.chars().next())
        .is_some_and(|c| !c.is_ascii_lowercase())
}
