//! Declarations, parameters and annotations.

use serde::Serialize;

use crate::ids::{ContainerId, DeclId, TypeParamId, ValueId};
use crate::interner::Name;
use crate::ir::expr::Expr;
use crate::types::Ty;

/// What kind of callable a declaration is. Resolved once when the
/// declaration is built and copied as-is by every rewrite.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum DeclKind {
    Function,
    Getter { property: Name },
    Setter { property: Name },
    Constructor,
    /// Deserialized from a compiled dependency; only the signature is known.
    ExternalSource,
}

impl DeclKind {
    pub fn is_accessor(self) -> bool {
        matches!(self, DeclKind::Getter { .. } | DeclKind::Setter { .. })
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize)]
pub enum DeclOrigin {
    #[default]
    Defined,
    /// The function behind a lambda expression.
    LocalFunctionForLambda,
    External,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize)]
pub enum Visibility {
    #[default]
    Public,
    Protected,
    Internal,
    Private,
    Local,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize)]
pub enum Modality {
    #[default]
    Final,
    Open,
    Abstract,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
pub struct DeclFlags {
    pub is_inline: bool,
    pub is_expect: bool,
    pub is_external: bool,
}

/// Where a declaration currently hangs in the tree.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Parent {
    /// Not reachable from any container. Replaced declarations end up here
    /// after `patch_parents`.
    #[default]
    Detached,
    Container(ContainerId),
    /// Nested function inside another declaration's body.
    Decl(DeclId),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TypeParam {
    pub id: TypeParamId,
    pub name: Name,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum ParamOrigin {
    #[default]
    Defined,
    Receiver,
    /// `$composer`
    Composer,
    /// `$changed`, `$changed1`, ...
    Changed,
    /// `$default`, `$default1`, ...
    DefaultMask,
}

impl ParamOrigin {
    pub fn is_synthetic(self) -> bool {
        matches!(
            self,
            ParamOrigin::Composer | ParamOrigin::Changed | ParamOrigin::DefaultMask
        )
    }
}

/// A value parameter or receiver.
#[derive(Debug, Clone, PartialEq)]
pub struct Param {
    pub value: ValueId,
    pub name: Name,
    pub ty: Ty,
    pub default: Option<Expr>,
    pub vararg_elem: Option<Ty>,
    pub is_crossinline: bool,
    pub is_noinline: bool,
    pub is_assignable: bool,
    pub origin: ParamOrigin,
}

impl Param {
    pub fn new(value: ValueId, name: Name, ty: Ty) -> Self {
        Self {
            value,
            name,
            ty,
            default: None,
            vararg_elem: None,
            is_crossinline: false,
            is_noinline: false,
            is_assignable: false,
            origin: ParamOrigin::Defined,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Annotation {
    /// Eligibility marker for the composer-parameter rewrite.
    Composable,
    /// On a stub left behind for binary compatibility. `signature` is empty
    /// until the recorder fills in the four parts.
    Decoy {
        target_name: String,
        signature: Vec<String>,
    },
    /// On the renamed copy that carries the real body.
    DecoyImplementation { name: String },
    /// Overrides the platform linkage name.
    LinkName(String),
    Other(Name),
}

/// A callable declaration.
#[derive(Debug, Clone, PartialEq)]
pub struct Declaration {
    pub name: Name,
    pub kind: DeclKind,
    pub origin: DeclOrigin,
    pub visibility: Visibility,
    pub modality: Modality,
    pub flags: DeclFlags,
    pub parent: Parent,
    pub type_params: Vec<TypeParam>,
    pub dispatch_receiver: Option<Param>,
    pub extension_receiver: Option<Param>,
    pub params: Vec<Param>,
    pub return_ty: Ty,
    pub body: Option<Expr>,
    pub overrides: Vec<DeclId>,
    pub annotations: Vec<Annotation>,
    /// For a lambda passed straight to an inline function: the type of the
    /// parameter it was passed to.
    pub inline_argument: Option<Ty>,
}

impl Declaration {
    pub fn new(name: Name, kind: DeclKind, return_ty: Ty) -> Self {
        Self {
            name,
            kind,
            origin: DeclOrigin::Defined,
            visibility: Visibility::Public,
            modality: Modality::Final,
            flags: DeclFlags::default(),
            parent: Parent::Detached,
            type_params: Vec::new(),
            dispatch_receiver: None,
            extension_receiver: None,
            params: Vec::new(),
            return_ty,
            body: None,
            overrides: Vec::new(),
            annotations: Vec::new(),
            inline_argument: None,
        }
    }

    pub fn has_composable_annotation(&self) -> bool {
        self.annotations
            .iter()
            .any(|a| matches!(a, Annotation::Composable))
    }

    /// `(target_name, signature)` of the decoy annotation, if any.
    pub fn decoy(&self) -> Option<(&str, &[String])> {
        self.annotations.iter().find_map(|a| match a {
            Annotation::Decoy {
                target_name,
                signature,
            } => Some((target_name.as_str(), signature.as_slice())),
            _ => None,
        })
    }

    pub fn is_decoy(&self) -> bool {
        self.decoy().is_some()
    }

    pub fn decoy_implementation_name(&self) -> Option<&str> {
        self.annotations.iter().find_map(|a| match a {
            Annotation::DecoyImplementation { name } => Some(name.as_str()),
            _ => None,
        })
    }

    pub fn link_name(&self) -> Option<&str> {
        self.annotations.iter().find_map(|a| match a {
            Annotation::LinkName(name) => Some(name.as_str()),
            _ => None,
        })
    }

    /// Dispatch and extension receivers, in that order.
    pub fn receivers(&self) -> impl Iterator<Item = &Param> {
        self.dispatch_receiver
            .iter()
            .chain(self.extension_receiver.iter())
    }

    /// Receivers followed by value parameters.
    pub fn explicit_params(&self) -> impl Iterator<Item = &Param> {
        self.receivers().chain(self.params.iter())
    }

    /// Number of receiver slots (0, 1 or 2) counted by the change words.
    pub fn receiver_slots(&self) -> usize {
        self.receivers().count()
    }

    pub fn has_default_values(&self) -> bool {
        self.params.iter().any(|p| p.default.is_some())
    }

    /// Local functions and lambdas.
    pub fn is_local(&self) -> bool {
        self.visibility == Visibility::Local || self.origin == DeclOrigin::LocalFunctionForLambda
    }

    pub fn is_lambda(&self) -> bool {
        self.origin == DeclOrigin::LocalFunctionForLambda
    }

    /// Value parameters that were there before the rewrite.
    pub fn real_params(&self) -> impl Iterator<Item = &Param> {
        self.params.iter().filter(|p| !p.origin.is_synthetic())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::interner::Interner;

    #[test]
    fn test_annotation_queries() {
        let interner = Interner::new();
        let mut decl = Declaration::new(interner.intern("Text"), DeclKind::Function, Ty::UNIT);
        assert!(!decl.has_composable_annotation());
        assert!(!decl.is_decoy());

        decl.annotations.push(Annotation::Composable);
        decl.annotations.push(Annotation::Decoy {
            target_name: "Text$composable".to_string(),
            signature: Vec::new(),
        });
        assert!(decl.has_composable_annotation());
        assert_eq!(decl.decoy(), Some(("Text$composable", &[][..])));
        assert_eq!(decl.link_name(), None);
    }

    #[test]
    fn test_receiver_slots() {
        let interner = Interner::new();
        let mut decl = Declaration::new(interner.intern("draw"), DeclKind::Function, Ty::UNIT);
        assert_eq!(decl.receiver_slots(), 0);

        decl.dispatch_receiver = Some(Param::new(ValueId(0), interner.intern("<this>"), Ty::ANY));
        decl.extension_receiver = Some(Param::new(ValueId(1), interner.intern("<this>"), Ty::INT));
        decl.params.push(Param::new(ValueId(2), interner.intern("x"), Ty::INT));
        assert_eq!(decl.receiver_slots(), 2);
        assert_eq!(decl.explicit_params().count(), 3);
    }
}
