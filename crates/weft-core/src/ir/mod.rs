//! Arena IR consumed and produced by the lowering passes.

pub mod builder;
pub mod copy;
pub mod decl;
pub mod dump;
pub mod expr;
pub mod fold;
pub mod module;

pub use builder::{FunctionBuilder, ModuleBuilder};
pub use copy::deep_copy_decl;
pub use decl::{
    Annotation, DeclFlags, DeclKind, DeclOrigin, Declaration, Modality, Param, ParamOrigin,
    Parent, TypeParam, Visibility,
};
pub use dump::{dump_decl, dump_expr, dump_module, dump_signature, dump_ty};
pub use expr::{Call, CallTarget, CompositeOrigin, Const, Expr, ExprKind, Intrinsic};
pub use fold::{
    fold_call_children, fold_children, fold_decl_exprs, nested_functions, walk_expr, ExprFolder,
};
pub use module::{Container, ContainerKind, DeclExprs, Module};
