//! Lowering context.

use crate::ids::DeclId;
use crate::ir::Module;
use crate::link::{Mangler, StableMangler, SymbolResolver, SymbolTable};
use crate::options::LowerOptions;
use crate::types::Ty;

/// Answers "does this carry the composable marker".
pub trait ComposableOracle {
    fn is_composable(&self, module: &Module, decl: DeclId) -> bool;

    fn is_composable_type(&self, module: &Module, ty: Ty) -> bool;
}

/// Reads the `Composable` annotation and the type marker flag.
#[derive(Debug, Clone, Copy, Default)]
pub struct MarkerOracle;

impl ComposableOracle for MarkerOracle {
    fn is_composable(&self, module: &Module, decl: DeclId) -> bool {
        module.decl(decl).has_composable_annotation()
    }

    fn is_composable_type(&self, module: &Module, ty: Ty) -> bool {
        module.types.data(ty).composable
    }
}

/// Options and collaborator services shared by every pass of one module
/// lowering.
///
/// Per-module mutable state (rewrite maps, pending decoys) lives on the
/// pass objects, not here.
pub struct LowerContext {
    pub options: LowerOptions,
    pub oracle: Box<dyn ComposableOracle>,
    pub mangler: Box<dyn Mangler>,
    /// Declarations from other compilation units.
    pub resolver: Box<dyn SymbolResolver>,
}

impl Default for LowerContext {
    fn default() -> Self {
        Self::new(LowerOptions::default())
    }
}

impl LowerContext {
    /// Create with the default services for `options.platform`.
    pub fn new(options: LowerOptions) -> Self {
        let mangler = StableMangler::new(options.platform);
        Self {
            options,
            oracle: Box::new(MarkerOracle),
            mangler: Box::new(mangler),
            resolver: Box::new(SymbolTable::new()),
        }
    }

    pub fn with_resolver(mut self, resolver: impl SymbolResolver + 'static) -> Self {
        self.resolver = Box::new(resolver);
        self
    }

    pub fn with_oracle(mut self, oracle: impl ComposableOracle + 'static) -> Self {
        self.oracle = Box::new(oracle);
        self
    }

    // ========================================================================
    // Oracle shorthands
    // ========================================================================

    pub fn is_composable(&self, module: &Module, decl: DeclId) -> bool {
        self.oracle.is_composable(module, decl)
    }

    pub fn is_composable_type(&self, module: &Module, ty: Ty) -> bool {
        self.oracle.is_composable_type(module, ty)
    }

    /// Whether the type or any of its type arguments is composable.
    pub fn has_composable_type(&self, module: &Module, ty: Ty) -> bool {
        use crate::types::TyKind;

        if self.is_composable_type(module, ty) {
            return true;
        }
        match module.types.kind(ty) {
            TyKind::Class { args, .. } => args.iter().any(|&a| self.has_composable_type(module, a)),
            TyKind::Function { params, ret } => {
                params.iter().any(|&p| self.has_composable_type(module, p))
                    || self.has_composable_type(module, *ret)
            }
            _ => false,
        }
    }
}
