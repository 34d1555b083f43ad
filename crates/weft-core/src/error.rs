//! Internal consistency errors raised by the lowering passes.
//!
//! Every variant signals a bug in the transform itself, never a user error:
//! user-facing validity checks run upstream. Errors abort lowering of the
//! whole module and carry enough context (rendered declaration, counts) to
//! be reported as an internal compiler error.

use thiserror::Error;

/// Lowering error.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum LowerError {
    /// The callee's synthetic parameters cannot hold the words a call site
    /// wants to pass.
    #[error("synthetic slot count mismatch at call `{call}`: need {needed} parameters, callee has {available}")]
    SlotCountMismatch {
        call: String,
        needed: usize,
        available: usize,
    },

    #[error("declaration already carries synthetic parameters: {decl}")]
    AlreadyRewritten { decl: String },

    #[error("could not find decoy implementation `{target}` for {decl}")]
    MissingDecoyImplementation { decl: String, target: String },

    #[error("malformed decoy signature on {decl}: expected 4 parts, found {parts}")]
    MalformedDecoySignature { decl: String, parts: usize },

    #[error("decoy implementation has no public signature: {decl}")]
    UnsupportedSignature { decl: String },
}

/// Result type for the lowering passes.
pub type LowerResult<T> = Result<T, LowerError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_messages_carry_context() {
        let err = LowerError::SlotCountMismatch {
            call: "foo(1)".to_string(),
            needed: 4,
            available: 3,
        };
        assert_eq!(
            err.to_string(),
            "synthetic slot count mismatch at call `foo(1)`: need 4 parameters, callee has 3"
        );

        let err = LowerError::MalformedDecoySignature {
            decl: "fun Text()".to_string(),
            parts: 2,
        };
        assert!(err.to_string().contains("found 2"));
    }
}
