//! Linkage signatures, the platform mangler and cross-module symbol lookup.
//!
//! A public signature identifies a declaration across compilation units by
//! four parts: package path, declaration path, a numeric id hashed from the
//! mangled declaration shape, and a flag mask. Decoy stubs carry the
//! signature of their implementation so other units can link the pair
//! without seeing this module's IR.

use std::collections::HashMap;
use std::fmt::Write;

use serde::{Deserialize, Serialize};
use tracing::trace;

use crate::ids::{DeclId, TypeParamId};
use crate::interner::Name;
use crate::ir::{Declaration, Module, Visibility};
use crate::options::Platform;
use crate::types::Ty;

/// Mask bit for `expect` declarations.
pub const MASK_EXPECT: u64 = 1;

/// A four-part public linkage signature.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct IdSignature {
    pub package_path: String,
    pub declaration_path: String,
    pub id: Option<u64>,
    pub mask: u64,
}

impl IdSignature {
    /// The annotation payload: `[package, declaration, id, mask]`. A missing
    /// id is written as `null`.
    pub fn to_parts(&self) -> Vec<String> {
        vec![
            self.package_path.clone(),
            self.declaration_path.clone(),
            self.id.map_or_else(|| "null".to_string(), |id| id.to_string()),
            self.mask.to_string(),
        ]
    }

    /// Parse an annotation payload. Returns `None` unless there are exactly
    /// four parts with a numeric mask.
    pub fn from_parts(parts: &[String]) -> Option<IdSignature> {
        let [package_path, declaration_path, id, mask] = parts else {
            return None;
        };
        Some(IdSignature {
            package_path: package_path.clone(),
            declaration_path: declaration_path.clone(),
            id: id.parse().ok(),
            mask: mask.parse().ok()?,
        })
    }
}

/// Platform name mangling and export checking.
pub trait Mangler {
    /// Whether other compilation units can link against `decl`.
    fn is_exported(&self, module: &Module, decl: DeclId) -> bool;

    /// The stable public signature of `decl`, or `None` when it has none
    /// (not exported, or not attached to a container).
    fn public_signature(&self, module: &Module, decl: DeclId) -> Option<IdSignature>;
}

/// Read-only lookup of already loaded declarations by signature.
pub trait SymbolResolver {
    fn resolve(&self, signature: &IdSignature) -> Option<DeclId>;
}

/// The default mangler.
///
/// The mangled string is
/// `[<N>][Receiver.]name(Param;Param)[:Return]`, where `<N>` is the type
/// parameter count and type parameters render by position (`#0`, `#1`).
/// JS signatures omit the return type.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StableMangler {
    pub platform: Platform,
}

impl StableMangler {
    pub fn new(platform: Platform) -> Self {
        Self { platform }
    }

    fn render_ty(&self, module: &Module, decl: &Declaration, ty: Ty) -> String {
        let positional = |param: TypeParamId| match decl.type_params.iter().position(|tp| tp.id == param) {
            Some(index) => format!("#{}", index),
            None => format!("^{}", module.str(module.type_param_name(param))),
        };
        module.types.render(ty, &module.interner, &positional)
    }

    /// The mangled shape of `decl`.
    pub fn mangle(&self, module: &Module, id: DeclId) -> String {
        let decl = module.decl(id);
        let mut out = String::new();
        if !decl.type_params.is_empty() {
            let _ = write!(out, "<{}>", decl.type_params.len());
        }
        if let Some(receiver) = &decl.extension_receiver {
            let _ = write!(out, "{}.", self.render_ty(module, decl, receiver.ty));
        }
        out.push_str(&module.str(decl.name));
        let params: Vec<_> = decl
            .params
            .iter()
            .map(|p| match p.vararg_elem {
                Some(elem) => format!("vararg {}", self.render_ty(module, decl, elem)),
                None => self.render_ty(module, decl, p.ty),
            })
            .collect();
        let _ = write!(out, "({})", params.join(";"));
        if self.platform != Platform::Js {
            let _ = write!(out, ":{}", self.render_ty(module, decl, decl.return_ty));
        }
        out
    }

    fn hash(mangled: &str) -> u64 {
        let digest = blake3::hash(mangled.as_bytes());
        let mut bytes = [0u8; 8];
        bytes.copy_from_slice(&digest.as_bytes()[..8]);
        u64::from_le_bytes(bytes)
    }
}

impl Mangler for StableMangler {
    fn is_exported(&self, module: &Module, decl: DeclId) -> bool {
        let d = module.decl(decl);
        if d.is_local() || matches!(d.visibility, Visibility::Private | Visibility::Local) {
            return false;
        }
        module.container_of(decl).is_some()
    }

    fn public_signature(&self, module: &Module, decl: DeclId) -> Option<IdSignature> {
        if !self.is_exported(module, decl) {
            return None;
        }
        let container = module.container_of(decl)?;
        let d = module.decl(decl);

        let mut path: Vec<Name> = module.class_path(container);
        path.push(d.name);
        let declaration_path = path
            .into_iter()
            .map(|n| module.str(n))
            .collect::<Vec<_>>()
            .join(".");

        let mangled = self.mangle(module, decl);
        let signature = IdSignature {
            package_path: module.package_of(container),
            declaration_path,
            id: Some(Self::hash(&mangled)),
            mask: if d.flags.is_expect { MASK_EXPECT } else { 0 },
        };
        trace!(%decl, %mangled, ?signature, "public signature");
        Some(signature)
    }
}

/// In-memory symbol table.
#[derive(Debug, Clone, Default)]
pub struct SymbolTable {
    symbols: HashMap<IdSignature, DeclId>,
}

impl SymbolTable {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, signature: IdSignature, decl: DeclId) {
        self.symbols.insert(signature, decl);
    }

    /// Register every exported declaration of `module`.
    pub fn index_module(&mut self, module: &Module, mangler: &dyn Mangler) {
        for decl in module.reachable_decls() {
            if let Some(signature) = mangler.public_signature(module, decl) {
                self.insert(signature, decl);
            }
        }
    }

    pub fn len(&self) -> usize {
        self.symbols.len()
    }

    pub fn is_empty(&self) -> bool {
        self.symbols.is_empty()
    }
}

impl SymbolResolver for SymbolTable {
    fn resolve(&self, signature: &IdSignature) -> Option<DeclId> {
        self.symbols.get(signature).copied()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ir::ModuleBuilder;

    #[test]
    fn test_parts_round_trip() {
        let sig = IdSignature {
            package_path: "com.example".to_string(),
            declaration_path: "Screen.Title".to_string(),
            id: Some(42),
            mask: MASK_EXPECT,
        };
        let parts = sig.to_parts();
        assert_eq!(parts, vec!["com.example", "Screen.Title", "42", "1"]);
        assert_eq!(IdSignature::from_parts(&parts), Some(sig));
        assert!(IdSignature::from_parts(&parts[..3]).is_none());

        let no_id: Vec<String> = ["", "f", "null", "0"].iter().map(|s| s.to_string()).collect();
        assert_eq!(IdSignature::from_parts(&no_id).unwrap().id, None);
    }

    #[test]
    fn test_mangle_shapes() {
        let mut mb = ModuleBuilder::new("app");
        let file = mb.file("com.example");
        let mut fb = mb.function(file, "Row");
        let t = fb.type_param("T");
        let t_ty = fb.module().types.type_param(t);
        fb.param("item", t_ty);
        fb.param("count", Ty::INT);
        let row = fb.finish();
        let module = mb.finish();

        assert_eq!(
            StableMangler::new(Platform::Jvm).mangle(&module, row),
            "<1>Row(#0;Int):Unit"
        );
        assert_eq!(
            StableMangler::new(Platform::Js).mangle(&module, row),
            "<1>Row(#0;Int)"
        );
    }

    #[test]
    fn test_private_and_local_are_not_exported() {
        let mut mb = ModuleBuilder::new("app");
        let file = mb.file("");
        let public = mb.function(file, "Shown").finish();
        let mut fb = mb.function(file, "Hidden");
        fb.visibility(Visibility::Private);
        let hidden = fb.finish();
        let module = mb.finish();

        let mangler = StableMangler::new(Platform::Native);
        assert!(mangler.is_exported(&module, public));
        assert!(!mangler.is_exported(&module, hidden));
        assert!(mangler.public_signature(&module, hidden).is_none());

        let mut table = SymbolTable::new();
        table.index_module(&module, &mangler);
        assert_eq!(table.len(), 1);
        let sig = mangler.public_signature(&module, public).unwrap();
        assert_eq!(sig.declaration_path, "Shown");
        assert_eq!(table.resolve(&sig), Some(public));
    }
}
