//! IR expressions.

use crate::ids::{DeclId, ValueId};
use crate::types::Ty;

/// A typed expression.
#[derive(Debug, Clone, PartialEq)]
pub struct Expr {
    /// The kind of expression.
    pub kind: ExprKind,
    /// The type of this expression.
    pub ty: Ty,
}

impl Expr {
    pub fn new(kind: ExprKind, ty: Ty) -> Self {
        Self { kind, ty }
    }

    pub fn unit() -> Self {
        Self::new(ExprKind::Block(Vec::new()), Ty::UNIT)
    }

    pub fn int(value: i32) -> Self {
        Self::new(ExprKind::Const(Const::Int(value)), Ty::INT)
    }

    pub fn string(value: impl Into<String>) -> Self {
        Self::new(ExprKind::Const(Const::String(value.into())), Ty::STRING)
    }

    pub fn get(value: ValueId, ty: Ty) -> Self {
        Self::new(ExprKind::GetValue(value), ty)
    }

    pub fn call(call: Call, ty: Ty) -> Self {
        Self::new(ExprKind::Call(Box::new(call)), ty)
    }

    pub fn ret(target: DeclId, value: Expr) -> Self {
        Self::new(
            ExprKind::Return {
                target,
                value: Box::new(value),
            },
            Ty::NOTHING,
        )
    }

    pub fn block(stmts: Vec<Expr>, ty: Ty) -> Self {
        Self::new(ExprKind::Block(stmts), ty)
    }

    pub fn as_call(&self) -> Option<&Call> {
        match &self.kind {
            ExprKind::Call(call) => Some(call),
            _ => None,
        }
    }

    pub fn is_default_placeholder(&self) -> bool {
        matches!(
            self.kind,
            ExprKind::Composite {
                origin: CompositeOrigin::DefaultValue,
                ..
            }
        )
    }
}

/// Kind of expression.
#[derive(Debug, Clone, PartialEq)]
pub enum ExprKind {
    /// Literal value.
    Const(Const),
    /// Read of a parameter, receiver or local.
    GetValue(ValueId),
    /// Assignment to an assignable parameter or a local.
    SetValue { value: ValueId, expr: Box<Expr> },
    /// Local variable declaration.
    Let { value: ValueId, init: Box<Expr> },
    /// Statement sequence; the last expression is the value.
    Block(Vec<Expr>),
    If {
        cond: Box<Expr>,
        then_branch: Box<Expr>,
        else_branch: Option<Box<Expr>>,
    },
    Call(Box<Call>),
    /// Return from `target`. A target other than the innermost function is
    /// a non-local return out of an inlined lambda.
    Return { target: DeclId, value: Box<Expr> },
    /// A nested function: lambda or local function. The declaration lives in
    /// the module arena.
    Function(DeclId),
    /// A group of statements tagged with an origin.
    Composite {
        origin: CompositeOrigin,
        stmts: Vec<Expr>,
    },
    /// Vararg argument list.
    Vararg(Vec<Expr>),
    /// Construct the inline class `ty` around its underlying value.
    InlineClassNew(Box<Expr>),
    /// `mask & (1 << bit) != 0`
    MaskBit { mask: ValueId, bit: u32 },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CompositeOrigin {
    /// Placeholder for an argument the caller omitted.
    DefaultValue,
    Statements,
}

/// Literal value.
#[derive(Debug, Clone, PartialEq)]
pub enum Const {
    Null,
    Bool(bool),
    Byte(i8),
    Short(i16),
    Int(i32),
    Long(i64),
    Float(f32),
    Double(f64),
    Char(char),
    String(String),
}

/// A call.
#[derive(Debug, Clone, PartialEq)]
pub struct Call {
    pub target: CallTarget,
    pub dispatch_receiver: Option<Expr>,
    pub extension_receiver: Option<Expr>,
    pub type_args: Vec<Ty>,
    /// Positional value arguments. `None` means the caller omitted it.
    pub args: Vec<Option<Expr>>,
    /// Set on calls produced by the composer-parameter rewrite.
    pub is_composable_call: bool,
}

impl Call {
    pub fn new(target: CallTarget, args: Vec<Option<Expr>>) -> Self {
        Self {
            target,
            dispatch_receiver: None,
            extension_receiver: None,
            type_args: Vec::new(),
            args,
            is_composable_call: false,
        }
    }

    pub fn decl(target: DeclId, args: Vec<Option<Expr>>) -> Self {
        Self::new(CallTarget::Decl(target), args)
    }

    /// `receiver.invoke(args)` on a function value.
    pub fn invoke(receiver: Expr, args: Vec<Expr>) -> Self {
        let mut call = Self::new(
            CallTarget::Invoke { arity: args.len() },
            args.into_iter().map(Some).collect(),
        );
        call.dispatch_receiver = Some(receiver);
        call
    }

    pub fn target_decl(&self) -> Option<DeclId> {
        match self.target {
            CallTarget::Decl(decl) => Some(decl),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CallTarget {
    Decl(DeclId),
    /// `FunctionN.invoke` on a function-typed receiver.
    Invoke { arity: usize },
    Intrinsic(Intrinsic),
}

/// Runtime functions the lowering emits calls to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Intrinsic {
    /// `decoy(name)`: throws "should have been replaced by the compiler".
    Decoy,
}

impl Intrinsic {
    pub fn name(self) -> &'static str {
        match self {
            Intrinsic::Decoy => "decoy",
        }
    }
}
