//! Type interner.
//!
//! Types are interned into [`Ty`] handles so equality is a `u32` compare.
//! Nullability and the composable marker are part of the interned data: a
//! nullable `Int` and a plain `Int` are distinct handles.

use crate::ids::TypeParamId;
use crate::interner::{Interner, Name};
use serde::Serialize;
use std::collections::HashMap;
use std::fmt;

/// An interned type handle.
#[derive(Clone, Copy, PartialEq, Eq, Hash, Default, Serialize)]
pub struct Ty(pub u32);

impl Ty {
    pub const UNIT: Ty = Ty(0);
    pub const NOTHING: Ty = Ty(1);
    pub const ANY: Ty = Ty(2);
    pub const BOOL: Ty = Ty(3);
    pub const INT: Ty = Ty(4);
    pub const LONG: Ty = Ty(5);
    pub const STRING: Ty = Ty(6);
    /// The non-null composer type.
    pub const COMPOSER: Ty = Ty(7);

    pub fn index(self) -> usize {
        self.0 as usize
    }
}

impl fmt::Debug for Ty {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Ty({})", self.0)
    }
}

impl fmt::Display for Ty {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "ty#{}", self.0)
    }
}

/// Structural shape of a type.
#[derive(Clone, PartialEq, Eq, Hash, Debug, Serialize)]
pub enum TyKind {
    Unit,
    Nothing,
    Any,

    // Primitives
    Bool,
    Byte,
    Short,
    Int,
    Long,
    Float,
    Double,
    Char,

    String,
    /// The runtime composer threaded through rewritten calls.
    Composer,

    /// A named class. `underlying` is set for inline (value) classes.
    Class {
        name: Name,
        args: Vec<Ty>,
        underlying: Option<Ty>,
    },
    /// A function type `(params) -> ret`.
    Function { params: Vec<Ty>, ret: Ty },
    /// Reference to a declaration's type parameter.
    Param(TypeParamId),
}

impl TyKind {
    pub fn is_primitive(&self) -> bool {
        matches!(
            self,
            TyKind::Bool
                | TyKind::Byte
                | TyKind::Short
                | TyKind::Int
                | TyKind::Long
                | TyKind::Float
                | TyKind::Double
                | TyKind::Char
        )
    }
}

/// Interned type data.
#[derive(Clone, PartialEq, Eq, Hash, Debug, Serialize)]
pub struct TyData {
    pub kind: TyKind,
    pub nullable: bool,
    /// Carries the composable eligibility marker.
    pub composable: bool,
}

impl TyData {
    pub fn plain(kind: TyKind) -> Self {
        Self {
            kind,
            nullable: false,
            composable: false,
        }
    }
}

/// Deduplicating type storage.
#[derive(Debug, Clone)]
pub struct TypeInterner {
    cache: HashMap<TyData, Ty>,
    types: Vec<TyData>,
}

impl Default for TypeInterner {
    fn default() -> Self {
        Self::new()
    }
}

impl TypeInterner {
    /// Create an interner with the common types at their fixed handles.
    pub fn new() -> Self {
        let mut interner = Self {
            cache: HashMap::new(),
            types: Vec::new(),
        };

        // Must match the Ty::* constants.
        assert_eq!(interner.intern_kind(TyKind::Unit), Ty::UNIT);
        assert_eq!(interner.intern_kind(TyKind::Nothing), Ty::NOTHING);
        assert_eq!(interner.intern_kind(TyKind::Any), Ty::ANY);
        assert_eq!(interner.intern_kind(TyKind::Bool), Ty::BOOL);
        assert_eq!(interner.intern_kind(TyKind::Int), Ty::INT);
        assert_eq!(interner.intern_kind(TyKind::Long), Ty::LONG);
        assert_eq!(interner.intern_kind(TyKind::String), Ty::STRING);
        assert_eq!(interner.intern_kind(TyKind::Composer), Ty::COMPOSER);

        interner
    }

    pub fn intern(&mut self, data: TyData) -> Ty {
        if let Some(&ty) = self.cache.get(&data) {
            return ty;
        }
        let ty = Ty(self.types.len() as u32);
        self.types.push(data.clone());
        self.cache.insert(data, ty);
        ty
    }

    /// Intern a non-null, unmarked type.
    pub fn intern_kind(&mut self, kind: TyKind) -> Ty {
        self.intern(TyData::plain(kind))
    }

    pub fn data(&self, ty: Ty) -> &TyData {
        &self.types[ty.index()]
    }

    pub fn kind(&self, ty: Ty) -> &TyKind {
        &self.types[ty.index()].kind
    }

    pub fn class(&mut self, name: Name, args: Vec<Ty>) -> Ty {
        self.intern_kind(TyKind::Class {
            name,
            args,
            underlying: None,
        })
    }

    pub fn inline_class(&mut self, name: Name, underlying: Ty) -> Ty {
        self.intern_kind(TyKind::Class {
            name,
            args: Vec::new(),
            underlying: Some(underlying),
        })
    }

    pub fn function(&mut self, params: Vec<Ty>, ret: Ty) -> Ty {
        self.intern_kind(TyKind::Function { params, ret })
    }

    /// A function type carrying the composable marker.
    pub fn composable_function(&mut self, params: Vec<Ty>, ret: Ty) -> Ty {
        let ty = self.function(params, ret);
        self.make_composable(ty)
    }

    pub fn type_param(&mut self, param: TypeParamId) -> Ty {
        self.intern_kind(TyKind::Param(param))
    }

    pub fn make_nullable(&mut self, ty: Ty) -> Ty {
        let data = self.data(ty);
        if data.nullable {
            return ty;
        }
        let data = TyData {
            nullable: true,
            ..data.clone()
        };
        self.intern(data)
    }

    pub fn make_composable(&mut self, ty: Ty) -> Ty {
        let data = self.data(ty);
        if data.composable {
            return ty;
        }
        let data = TyData {
            composable: true,
            ..data.clone()
        };
        self.intern(data)
    }

    pub fn is_nullable(&self, ty: Ty) -> bool {
        self.data(ty).nullable
    }

    /// Non-null primitive.
    pub fn is_primitive(&self, ty: Ty) -> bool {
        let data = self.data(ty);
        !data.nullable && data.kind.is_primitive()
    }

    /// Inline (value) class, nullable or not.
    pub fn is_inline_class(&self, ty: Ty) -> bool {
        matches!(
            self.kind(ty),
            TyKind::Class {
                underlying: Some(_),
                ..
            }
        )
    }

    pub fn is_function(&self, ty: Ty) -> bool {
        matches!(self.kind(ty), TyKind::Function { .. })
    }

    /// Whether the type or any of its type arguments carries the marker.
    pub fn has_composable(&self, ty: Ty) -> bool {
        let data = self.data(ty);
        if data.composable {
            return true;
        }
        match &data.kind {
            TyKind::Class { args, .. } => args.iter().any(|&arg| self.has_composable(arg)),
            TyKind::Function { params, ret } => {
                params.iter().any(|&p| self.has_composable(p)) || self.has_composable(*ret)
            }
            _ => false,
        }
    }

    /// Substitute type-parameter references according to `map`.
    pub fn remap_type_params(&mut self, ty: Ty, map: &HashMap<TypeParamId, TypeParamId>) -> Ty {
        if map.is_empty() {
            return ty;
        }
        let data = self.data(ty).clone();
        let kind = match data.kind {
            TyKind::Param(param) => match map.get(&param) {
                Some(&target) => TyKind::Param(target),
                None => return ty,
            },
            TyKind::Class {
                name,
                args,
                underlying,
            } => TyKind::Class {
                name,
                args: args
                    .into_iter()
                    .map(|arg| self.remap_type_params(arg, map))
                    .collect(),
                underlying,
            },
            TyKind::Function { params, ret } => TyKind::Function {
                params: params
                    .into_iter()
                    .map(|p| self.remap_type_params(p, map))
                    .collect(),
                ret: self.remap_type_params(ret, map),
            },
            _ => return ty,
        };
        self.intern(TyData { kind, ..data })
    }

    /// Render a type as source text.
    ///
    /// `param_name` decides how type-parameter references print, so the
    /// mangler can use positional names while dumps use declared ones.
    pub fn render(
        &self,
        ty: Ty,
        names: &Interner,
        param_name: &dyn Fn(TypeParamId) -> String,
    ) -> String {
        let data = self.data(ty);
        let mut out = String::new();
        if data.composable {
            out.push_str("@Composable ");
        }
        let body = match &data.kind {
            TyKind::Unit => "Unit".to_string(),
            TyKind::Nothing => "Nothing".to_string(),
            TyKind::Any => "Any".to_string(),
            TyKind::Bool => "Boolean".to_string(),
            TyKind::Byte => "Byte".to_string(),
            TyKind::Short => "Short".to_string(),
            TyKind::Int => "Int".to_string(),
            TyKind::Long => "Long".to_string(),
            TyKind::Float => "Float".to_string(),
            TyKind::Double => "Double".to_string(),
            TyKind::Char => "Char".to_string(),
            TyKind::String => "String".to_string(),
            TyKind::Composer => "Composer".to_string(),
            TyKind::Class { name, args, .. } => {
                let mut s = names.str(*name).to_string();
                if !args.is_empty() {
                    let args: Vec<_> = args
                        .iter()
                        .map(|&arg| self.render(arg, names, param_name))
                        .collect();
                    s.push('<');
                    s.push_str(&args.join(", "));
                    s.push('>');
                }
                s
            }
            TyKind::Function { params, ret } => {
                let params: Vec<_> = params
                    .iter()
                    .map(|&p| self.render(p, names, param_name))
                    .collect();
                format!(
                    "({}) -> {}",
                    params.join(", "),
                    self.render(*ret, names, param_name)
                )
            }
            TyKind::Param(param) => param_name(*param),
        };
        if data.nullable && matches!(data.kind, TyKind::Function { .. }) {
            out.push('(');
            out.push_str(&body);
            out.push_str(")?");
        } else {
            out.push_str(&body);
            if data.nullable {
                out.push('?');
            }
        }
        out
    }

    pub fn len(&self) -> usize {
        self.types.len()
    }

    pub fn is_empty(&self) -> bool {
        self.types.is_empty()
    }
}
