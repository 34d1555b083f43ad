//! weft-smith: Random weft IR module generator for fuzzing
//!
//! This crate generates random but **well-formed** IR modules using the
//! `arbitrary` crate. Generated modules are built through `ModuleBuilder`,
//! so every call passes one argument slot per callee parameter, omitted
//! arguments only appear where the callee has a default, and every return
//! targets an enclosing declaration. That lets fuzzers skip straight to the
//! lowering passes.
//!
//! # Architecture
//!
//! The generator maintains state to ensure validity:
//! - Track callable declarations and their parameter shapes
//! - Track class methods so later classes can override them
//! - Generate argument values that match the parameter types
//!
//! # Usage
//!
//! ```rust,ignore
//! use arbitrary::Unstructured;
//! use weft_smith::GeneratedModule;
//!
//! let data: &[u8] = /* from fuzzer */;
//! let mut u = Unstructured::new(data);
//! let generated: GeneratedModule = u.arbitrary()?;
//! println!("{}", generated.dump());
//! ```

use arbitrary::{Arbitrary, Result, Unstructured};
use weft_core::ir::{
    dump_module, Call, Const, Expr, ExprKind, FunctionBuilder, Modality, ModuleBuilder,
    Visibility,
};
use weft_core::{ContainerId, DeclId, Module, Ty, TyKind};

/// Configuration for the generator.
#[derive(Debug, Clone)]
pub struct Config {
    /// Maximum number of files.
    pub max_files: usize,
    /// Maximum number of classes per file.
    pub max_classes: usize,
    /// Maximum number of functions per container.
    pub max_functions: usize,
    /// Maximum number of value parameters per function.
    pub max_params: usize,
    /// Maximum number of statements per body.
    pub max_statements: usize,
    /// Maximum depth of nested lambdas and local functions.
    pub max_nesting: usize,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            max_files: 2,
            max_classes: 2,
            max_functions: 4,
            max_params: 4,
            max_statements: 4,
            max_nesting: 2,
        }
    }
}

/// A generated module.
pub struct GeneratedModule {
    pub module: Module,
}

impl GeneratedModule {
    /// Generate a module with the given configuration.
    pub fn arbitrary_with_config(u: &mut Unstructured, config: &Config) -> Result<Self> {
        let mut mb = ModuleBuilder::new("smith");
        let mut ctx = GenerationContext::new(config.clone(), &mut mb);

        let num_files: usize = u.int_in_range(1..=config.max_files)?;
        for _ in 0..num_files {
            let package = if u.arbitrary()? {
                format!("smith.{}", ctx.fresh_name("pkg"))
            } else {
                String::new()
            };
            let file = mb.file(&package);

            let num_functions: usize = u.int_in_range(1..=config.max_functions)?;
            for _ in 0..num_functions {
                ctx.arbitrary_function(u, &mut mb, file, None)?;
            }

            let num_classes: usize = u.int_in_range(0..=config.max_classes)?;
            for _ in 0..num_classes {
                ctx.arbitrary_class(u, &mut mb, file)?;
            }
        }

        Ok(GeneratedModule {
            module: mb.finish(),
        })
    }

    /// Render the module as pseudo-source.
    pub fn dump(&self) -> String {
        dump_module(&self.module)
    }
}

impl<'a> Arbitrary<'a> for GeneratedModule {
    fn arbitrary(u: &mut Unstructured<'a>) -> Result<Self> {
        Self::arbitrary_with_config(u, &Config::default())
    }
}

/// Pseudo-random bytes from a seed (a simple LCG).
pub fn seed_bytes(seed: u64) -> Vec<u8> {
    let mut state = seed;
    let mut data = Vec::with_capacity(4096);
    for _ in 0..4096 {
        state = state.wrapping_mul(6364136223846793005).wrapping_add(1);
        data.push((state >> 33) as u8);
    }
    data
}

// ============================================================================
// Generation Context
// ============================================================================

#[derive(Debug, Clone)]
struct ParamShape {
    ty: Ty,
    has_default: bool,
}

/// Something generated code can call.
#[derive(Debug, Clone)]
struct Callee {
    decl: DeclId,
    name: String,
    composable: bool,
    params: Vec<ParamShape>,
    return_ty: Ty,
    dispatch_receiver: Option<Ty>,
    extension_receiver: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum LambdaKind {
    /// Stored and called later: calls inside keep their own scope.
    Deferred,
    /// Passed to an inline function: shares the enclosing composer.
    Inlined,
    Composable,
}

struct GenerationContext {
    config: Config,
    /// Top-level functions and class members, in creation order.
    callees: Vec<Callee>,
    /// Members of earlier classes, candidates for overriding.
    class_methods: Vec<Callee>,
    /// `@Composable () -> Unit`
    content_ty: Ty,
    /// `() -> Unit`
    action_ty: Ty,
    nullable_string: Ty,
    float_ty: Ty,
    /// An inline class over `Float`.
    dp_ty: Ty,
    /// Counter for unique names.
    name_counter: usize,
}

impl GenerationContext {
    fn new(config: Config, mb: &mut ModuleBuilder) -> Self {
        let dp = mb.module().intern("Dp");
        let types = &mut mb.module_mut().types;
        let float_ty = types.intern_kind(TyKind::Float);
        Self {
            config,
            callees: Vec::new(),
            class_methods: Vec::new(),
            content_ty: types.composable_function(vec![], Ty::UNIT),
            action_ty: types.function(vec![], Ty::UNIT),
            nullable_string: types.make_nullable(Ty::STRING),
            float_ty,
            dp_ty: types.inline_class(dp, float_ty),
            name_counter: 0,
        }
    }

    fn fresh_name(&mut self, prefix: &str) -> String {
        self.name_counter += 1;
        format!("{}{}", prefix, self.name_counter)
    }

    fn arbitrary_class(
        &mut self,
        u: &mut Unstructured,
        mb: &mut ModuleBuilder,
        file: ContainerId,
    ) -> Result<()> {
        let name = self.fresh_name("Widget");
        let class = mb.class(file, &name);
        let class_ty = {
            let name = mb.module().intern(&name);
            mb.module_mut().types.class(name, vec![])
        };

        // A constructor taking composable content is a decoy candidate.
        if u.ratio(1, 3)? {
            let mut fb = mb.constructor(class);
            if u.arbitrary()? {
                let content = self.content_ty;
                let default = empty_lambda(&mut fb, content);
                fb.param_default("content", content, default);
            } else {
                fb.param("content", self.content_ty);
            }
            fb.finish();
        }

        if u.ratio(1, 3)? {
            let property = self.fresh_name("state");
            let mut fb = mb.getter(class, &property);
            fb.composable().returns(Ty::ANY);
            fb.dispatch_receiver(class_ty);
            fb.body(Expr::unit());
            let decl = fb.finish();
            self.callees.push(Callee {
                decl,
                name: format!("<get-{}>", property),
                composable: true,
                params: Vec::new(),
                return_ty: Ty::ANY,
                dispatch_receiver: Some(class_ty),
                extension_receiver: false,
            });
        }

        let mut members = Vec::new();
        if !self.class_methods.is_empty() && u.ratio(1, 2)? {
            members.push(self.arbitrary_override(u, mb, class, class_ty)?);
        }
        let num_functions: usize = u.int_in_range(0..=self.config.max_functions)?;
        for _ in 0..num_functions {
            members.push(self.arbitrary_function(u, mb, class, Some(class_ty))?);
        }
        self.class_methods.extend(members);
        Ok(())
    }

    /// Override a method of an earlier class with the same shape.
    fn arbitrary_override(
        &mut self,
        u: &mut Unstructured,
        mb: &mut ModuleBuilder,
        class: ContainerId,
        class_ty: Ty,
    ) -> Result<Callee> {
        let index = u.int_in_range(0..=self.class_methods.len() - 1)?;
        let base = self.class_methods[index].clone();
        mb.module_mut().decl_mut(base.decl).modality = Modality::Open;

        let mut fb = mb.function(class, &base.name);
        if base.composable {
            fb.composable();
        }
        fb.overrides(base.decl).returns(base.return_ty);
        fb.dispatch_receiver(class_ty);
        if base.extension_receiver {
            fb.extension_receiver(Ty::STRING);
        }
        let params: Vec<_> = base
            .params
            .iter()
            .map(|p| ParamShape {
                ty: p.ty,
                has_default: false,
            })
            .collect();
        for (i, param) in params.iter().enumerate() {
            fb.param(&format!("p{}", i), param.ty);
        }
        let outer = fb.id();
        let body = self.arbitrary_body(u, &mut fb, outer, 0)?;
        fb.body(body);

        Ok(Callee {
            decl: fb.finish(),
            name: base.name,
            composable: base.composable,
            // Callers may still omit what the base declares as defaulted.
            params: base.params,
            return_ty: base.return_ty,
            dispatch_receiver: Some(class_ty),
            extension_receiver: base.extension_receiver,
        })
    }

    fn arbitrary_function(
        &mut self,
        u: &mut Unstructured,
        mb: &mut ModuleBuilder,
        container: ContainerId,
        dispatch_receiver: Option<Ty>,
    ) -> Result<Callee> {
        let composable: bool = u.arbitrary()?;
        let name = self.fresh_name(if composable { "Content" } else { "helper" });
        let mut fb = mb.function(container, &name);
        if composable {
            fb.composable();
        }
        if u.ratio(1, 5)? {
            fb.visibility(Visibility::Private);
        }
        if let Some(receiver) = dispatch_receiver {
            fb.dispatch_receiver(receiver);
        }
        let extension_receiver = u.ratio(1, 5)?;
        if extension_receiver {
            fb.extension_receiver(Ty::STRING);
        }

        let num_params: usize = u.int_in_range(0..=self.config.max_params)?;
        let mut params = Vec::with_capacity(num_params);
        for i in 0..num_params {
            let ty = self.arbitrary_param_ty(u)?;
            let has_default = u.ratio(1, 3)?;
            let name = format!("p{}", i);
            if has_default {
                let default = self.arbitrary_value(u, &mut fb, ty, self.config.max_nesting)?;
                fb.param_default(&name, ty, default);
            } else {
                fb.param(&name, ty);
            }
            params.push(ParamShape { ty, has_default });
        }

        let callee = Callee {
            decl: fb.id(),
            name,
            composable,
            params,
            return_ty: Ty::UNIT,
            dispatch_receiver,
            extension_receiver,
        };
        // Registered before the body so it can call itself.
        self.callees.push(callee.clone());

        let outer = fb.id();
        let body = self.arbitrary_body(u, &mut fb, outer, 0)?;
        fb.body(body);
        fb.finish();
        Ok(callee)
    }

    fn arbitrary_param_ty(&self, u: &mut Unstructured) -> Result<Ty> {
        let choice: u8 = u.int_in_range(0..=5)?;
        Ok(match choice {
            0 => Ty::INT,
            1 => Ty::BOOL,
            2 => Ty::STRING,
            3 => self.nullable_string,
            4 => self.content_ty,
            _ => self.dp_ty,
        })
    }

    /// A value of type `ty`. Function-typed values become lambdas.
    fn arbitrary_value(
        &mut self,
        u: &mut Unstructured,
        fb: &mut FunctionBuilder<'_>,
        ty: Ty,
        depth: usize,
    ) -> Result<Expr> {
        if ty == self.content_ty {
            let own = fb.id();
            return if depth < self.config.max_nesting {
                self.arbitrary_lambda(u, fb, LambdaKind::Composable, own, depth)
            } else {
                Ok(empty_lambda(fb, ty))
            };
        }
        if ty == self.dp_ty {
            let value: u8 = u.int_in_range(0..=16)?;
            let float = Expr::new(ExprKind::Const(Const::Float(f32::from(value))), self.float_ty);
            return Ok(Expr::new(ExprKind::InlineClassNew(Box::new(float)), ty));
        }
        if ty == self.nullable_string && u.arbitrary()? {
            return Ok(Expr::new(ExprKind::Const(Const::Null), ty));
        }
        Ok(match ty {
            Ty::INT => Expr::int(u.int_in_range(0..=100)?),
            Ty::BOOL => Expr::new(ExprKind::Const(Const::Bool(u.arbitrary()?)), Ty::BOOL),
            _ => Expr::new(ExprKind::Const(Const::String(self.fresh_name("s"))), ty),
        })
    }

    /// A block of statements. `outer` is the declaration a trailing return
    /// targets: the builder's own declaration, or an enclosing one for
    /// inlined lambdas.
    fn arbitrary_body(
        &mut self,
        u: &mut Unstructured,
        fb: &mut FunctionBuilder<'_>,
        outer: DeclId,
        depth: usize,
    ) -> Result<Expr> {
        let nest = depth < self.config.max_nesting;
        let num_statements: usize = u.int_in_range(0..=self.config.max_statements)?;
        let mut stmts = Vec::with_capacity(num_statements + 1);
        for _ in 0..num_statements {
            let choice: u8 = u.int_in_range(0..=7)?;
            let stmt = match choice {
                0..=2 if !self.callees.is_empty() => self.arbitrary_call(u, fb, depth)?,
                3 if nest => self.arbitrary_lambda(u, fb, LambdaKind::Deferred, outer, depth)?,
                4 if nest => self.arbitrary_lambda(u, fb, LambdaKind::Inlined, outer, depth)?,
                5 if nest => self.arbitrary_lambda(u, fb, LambdaKind::Composable, outer, depth)?,
                6 if nest => {
                    let lambda =
                        self.arbitrary_lambda(u, fb, LambdaKind::Composable, outer, depth)?;
                    Expr::call(Call::invoke(lambda, vec![]), Ty::UNIT)
                }
                7 if nest => self.arbitrary_local_function(u, fb, depth)?,
                _ => Expr::unit(),
            };
            stmts.push(stmt);
        }
        if u.ratio(1, 4)? {
            stmts.push(Expr::ret(outer, Expr::unit()));
        }
        Ok(Expr::block(stmts, Ty::UNIT))
    }

    fn arbitrary_call(
        &mut self,
        u: &mut Unstructured,
        fb: &mut FunctionBuilder<'_>,
        depth: usize,
    ) -> Result<Expr> {
        let index = u.int_in_range(0..=self.callees.len() - 1)?;
        let callee = self.callees[index].clone();

        let mut args = Vec::with_capacity(callee.params.len());
        for param in &callee.params {
            if param.has_default && u.arbitrary()? {
                args.push(None);
            } else {
                args.push(Some(self.arbitrary_value(u, fb, param.ty, depth + 1)?));
            }
        }

        let mut call = Call::decl(callee.decl, args);
        if let Some(receiver) = callee.dispatch_receiver {
            call.dispatch_receiver = Some(Expr::new(ExprKind::Const(Const::Null), receiver));
        }
        if callee.extension_receiver {
            call.extension_receiver = Some(Expr::new(
                ExprKind::Const(Const::String(self.fresh_name("ext"))),
                Ty::STRING,
            ));
        }
        Ok(Expr::call(call, callee.return_ty))
    }

    fn arbitrary_lambda(
        &mut self,
        u: &mut Unstructured,
        fb: &mut FunctionBuilder<'_>,
        kind: LambdaKind,
        outer: DeclId,
        depth: usize,
    ) -> Result<Expr> {
        let ty = match kind {
            LambdaKind::Composable => self.content_ty,
            LambdaKind::Deferred | LambdaKind::Inlined => self.action_ty,
        };
        let action_ty = self.action_ty;
        let mut result = Ok(());
        let lambda = fb.lambda(ty, |lb| {
            match kind {
                LambdaKind::Composable => {
                    lb.composable();
                }
                LambdaKind::Inlined => {
                    lb.inline_argument(action_ty);
                }
                LambdaKind::Deferred => {}
            }
            // Only an inlined lambda may return from an enclosing function.
            let target = if kind == LambdaKind::Inlined { outer } else { lb.id() };
            match self.arbitrary_body(u, lb, target, depth + 1) {
                Ok(body) => {
                    lb.body(body);
                }
                Err(e) => result = Err(e),
            }
        });
        result?;
        Ok(lambda)
    }

    fn arbitrary_local_function(
        &mut self,
        u: &mut Unstructured,
        fb: &mut FunctionBuilder<'_>,
        depth: usize,
    ) -> Result<Expr> {
        let name = self.fresh_name("local");
        let composable: bool = u.arbitrary()?;
        let mut result = Ok(());
        let local = fb.local_function(&name, |lf| {
            if composable {
                lf.composable();
            }
            let target = lf.id();
            match self.arbitrary_body(u, lf, target, depth + 1) {
                Ok(body) => {
                    lf.body(body);
                }
                Err(e) => result = Err(e),
            }
        });
        result?;
        Ok(local)
    }
}

/// `@Composable {}`
fn empty_lambda(fb: &mut FunctionBuilder<'_>, ty: Ty) -> Expr {
    fb.lambda(ty, |lb| {
        lb.composable().body(Expr::unit());
    })
}
