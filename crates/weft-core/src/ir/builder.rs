//! Builders for well-formed modules.
//!
//! ```ignore
//! let mut mb = ModuleBuilder::new("app");
//! let file = mb.file("com.example");
//! let mut text = mb.function(file, "Text");
//! text.composable();
//! let value = text.param("value", Ty::STRING);
//! let text = text.finish();
//! ```

use crate::ids::{ContainerId, DeclId, TypeParamId, ValueId};
use crate::ir::decl::{
    Annotation, DeclKind, DeclOrigin, Declaration, Modality, Param, ParamOrigin, Parent,
    TypeParam, Visibility,
};
use crate::ir::expr::{Call, Expr, ExprKind};
use crate::ir::module::Module;
use crate::types::Ty;

pub struct ModuleBuilder {
    module: Module,
}

impl ModuleBuilder {
    pub fn new(name: &str) -> Self {
        Self {
            module: Module::new(name),
        }
    }

    pub fn from_module(module: Module) -> Self {
        Self { module }
    }

    pub fn module(&self) -> &Module {
        &self.module
    }

    pub fn module_mut(&mut self) -> &mut Module {
        &mut self.module
    }

    pub fn file(&mut self, package: &str) -> ContainerId {
        self.module.add_file(package)
    }

    pub fn class(&mut self, parent: ContainerId, name: &str) -> ContainerId {
        self.module.add_class(parent, name)
    }

    pub fn function(&mut self, container: ContainerId, name: &str) -> FunctionBuilder<'_> {
        FunctionBuilder::member(&mut self.module, container, name, DeclKind::Function)
    }

    pub fn constructor(&mut self, container: ContainerId) -> FunctionBuilder<'_> {
        let mut fb =
            FunctionBuilder::member(&mut self.module, container, "<init>", DeclKind::Constructor);
        fb.body(Expr::unit());
        fb
    }

    pub fn getter(&mut self, container: ContainerId, property: &str) -> FunctionBuilder<'_> {
        let kind = DeclKind::Getter {
            property: self.module.intern(property),
        };
        FunctionBuilder::member(&mut self.module, container, &format!("<get-{}>", property), kind)
    }

    pub fn setter(&mut self, container: ContainerId, property: &str) -> FunctionBuilder<'_> {
        let kind = DeclKind::Setter {
            property: self.module.intern(property),
        };
        let mut fb =
            FunctionBuilder::member(&mut self.module, container, &format!("<set-{}>", property), kind);
        fb.returns(Ty::UNIT);
        fb
    }

    /// A declaration from a compiled dependency. Not placed in any
    /// container and has no body.
    pub fn external(&mut self, name: &str) -> FunctionBuilder<'_> {
        let mut fb = FunctionBuilder::detached(&mut self.module, name, DeclKind::ExternalSource);
        fb.origin(DeclOrigin::External);
        fb.module.decls[fb.id].flags.is_external = true;
        fb
    }

    /// `target(args)` typed with the target's return type.
    pub fn call(&self, target: DeclId, args: Vec<Option<Expr>>) -> Expr {
        Expr::call(Call::decl(target, args), self.module.decl(target).return_ty)
    }

    pub fn finish(mut self) -> Module {
        self.module.patch_parents();
        self.module
    }
}

/// Builds one declaration in place. The declaration is allocated up front
/// so its id can be used in its own body (returns, recursion).
pub struct FunctionBuilder<'m> {
    module: &'m mut Module,
    id: DeclId,
}

impl<'m> FunctionBuilder<'m> {
    fn detached(module: &'m mut Module, name: &str, kind: DeclKind) -> Self {
        let name = module.intern(name);
        let id = module.alloc_decl(Declaration::new(name, kind, Ty::UNIT));
        Self { module, id }
    }

    fn member(module: &'m mut Module, container: ContainerId, name: &str, kind: DeclKind) -> Self {
        let mut fb = Self::detached(module, name, kind);
        fb.module.add_member(container, fb.id);
        fb
    }

    fn decl(&mut self) -> &mut Declaration {
        &mut self.module.decls[self.id]
    }

    pub fn id(&self) -> DeclId {
        self.id
    }

    pub fn module(&mut self) -> &mut Module {
        &mut *self.module
    }

    pub fn composable(&mut self) -> &mut Self {
        self.annotate(Annotation::Composable)
    }

    pub fn annotate(&mut self, annotation: Annotation) -> &mut Self {
        self.decl().annotations.push(annotation);
        self
    }

    pub fn visibility(&mut self, visibility: Visibility) -> &mut Self {
        self.decl().visibility = visibility;
        self
    }

    pub fn modality(&mut self, modality: Modality) -> &mut Self {
        self.decl().modality = modality;
        self
    }

    pub fn origin(&mut self, origin: DeclOrigin) -> &mut Self {
        self.decl().origin = origin;
        self
    }

    pub fn inline(&mut self) -> &mut Self {
        self.decl().flags.is_inline = true;
        self
    }

    pub fn expect(&mut self) -> &mut Self {
        self.decl().flags.is_expect = true;
        self
    }

    pub fn overrides(&mut self, decl: DeclId) -> &mut Self {
        self.decl().overrides.push(decl);
        self
    }

    pub fn returns(&mut self, ty: Ty) -> &mut Self {
        self.decl().return_ty = ty;
        self
    }

    /// Mark a lambda as passed to an inline parameter of type `ty`.
    pub fn inline_argument(&mut self, ty: Ty) -> &mut Self {
        self.decl().inline_argument = Some(ty);
        self
    }

    pub fn type_param(&mut self, name: &str) -> TypeParamId {
        let name = self.module.intern(name);
        let id = self.module.new_type_param(name);
        self.decl().type_params.push(TypeParam { id, name });
        id
    }

    fn new_param(&mut self, name: &str, ty: Ty) -> Param {
        let name = self.module.intern(name);
        let value = self.module.new_value(name);
        Param::new(value, name, ty)
    }

    pub fn param(&mut self, name: &str, ty: Ty) -> ValueId {
        self.param_with(name, ty, |_| {})
    }

    pub fn param_default(&mut self, name: &str, ty: Ty, default: Expr) -> ValueId {
        self.param_with(name, ty, |p| p.default = Some(default))
    }

    /// Add a parameter and adjust it before it is stored.
    pub fn param_with(&mut self, name: &str, ty: Ty, f: impl FnOnce(&mut Param)) -> ValueId {
        let mut param = self.new_param(name, ty);
        f(&mut param);
        let value = param.value;
        self.decl().params.push(param);
        value
    }

    pub fn dispatch_receiver(&mut self, ty: Ty) -> ValueId {
        let mut param = self.new_param("<this>", ty);
        param.origin = ParamOrigin::Receiver;
        let value = param.value;
        self.decl().dispatch_receiver = Some(param);
        value
    }

    pub fn extension_receiver(&mut self, ty: Ty) -> ValueId {
        let mut param = self.new_param("<this>", ty);
        param.origin = ParamOrigin::Receiver;
        let value = param.value;
        self.decl().extension_receiver = Some(param);
        value
    }

    /// A fresh local for a `Let`.
    pub fn local(&mut self, name: &str) -> ValueId {
        let name = self.module.intern(name);
        self.module.new_value(name)
    }

    pub fn body(&mut self, body: Expr) -> &mut Self {
        self.decl().body = Some(body);
        self
    }

    /// `return@self value`
    pub fn ret(&self, value: Expr) -> Expr {
        Expr::ret(self.id, value)
    }

    /// Build a lambda nested in this declaration. Returns the function
    /// expression, typed `ty`.
    pub fn lambda(&mut self, ty: Ty, build: impl FnOnce(&mut FunctionBuilder<'_>)) -> Expr {
        self.nested("<anonymous>", DeclOrigin::LocalFunctionForLambda, ty, build)
    }

    /// Build a local function nested in this declaration.
    pub fn local_function(
        &mut self,
        name: &str,
        build: impl FnOnce(&mut FunctionBuilder<'_>),
    ) -> Expr {
        self.nested(name, DeclOrigin::Defined, Ty::ANY, build)
    }

    fn nested(
        &mut self,
        name: &str,
        origin: DeclOrigin,
        ty: Ty,
        build: impl FnOnce(&mut FunctionBuilder<'_>),
    ) -> Expr {
        let outer = self.id;
        let mut fb = FunctionBuilder::detached(&mut *self.module, name, DeclKind::Function);
        fb.origin(origin).visibility(Visibility::Local);
        fb.decl().parent = Parent::Decl(outer);
        build(&mut fb);
        Expr::new(ExprKind::Function(fb.finish()), ty)
    }

    pub fn finish(self) -> DeclId {
        self.id
    }
}
