//! Weft Lowering
//!
//! This crate lowers composable declarations to the composer calling
//! convention:
//! - Every composable function gains `$composer`, `$changed` words and,
//!   when it has default values, `$default` words
//! - Every composable call passes the enclosing composer and the masks
//! - On platforms without stable linkage, rewritten declarations are split
//!   into a decoy stub and a `$composable` implementation
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                              LowerContext                               │
//! │  ┌───────────┐  ┌───────────┐  ┌───────────┐  ┌───────────┐             │
//! │  │  Options  │  │  Oracle   │  │  Mangler  │  │ Resolver  │             │
//! │  │(platform) │  │(composable│  │(signature)│  │ (other    │             │
//! │  │           │  │  marker)  │  │           │  │  modules) │             │
//! │  └───────────┘  └───────────┘  └───────────┘  └───────────┘             │
//! └─────────────────────────────────────────────────────────────────────────┘
//!         ↑              ↑              ↑              ↑
//!    ┌────┴────┐    ┌────┴─────┐   ┌────┴─────┐   ┌────┴────┐
//!    │ Create  │ →  │Substitute│ → │ Composer │ → │ Record  │
//!    │ decoys  │    │  calls   │   │  params  │   │  sigs   │
//!    └─────────┘    └──────────┘   └──────────┘   └─────────┘
//!                      all passes rewrite one ir::Module in place
//! ```

// Core modules
pub mod context;
pub mod error;
pub mod ids;
pub mod index_vec;
pub mod interner;
pub mod link;
pub mod options;
pub mod types;

// IR and passes
pub mod ir;
pub mod lower;

// Re-exports
pub use context::{ComposableOracle, LowerContext, MarkerOracle};
pub use error::{LowerError, LowerResult};
pub use ids::{ContainerId, DeclId, TypeParamId, ValueId};
pub use index_vec::{Idx, IndexVec};
pub use interner::{Interner, Name};
pub use ir::{Module, ModuleBuilder};
pub use link::{IdSignature, Mangler, StableMangler, SymbolResolver, SymbolTable};
pub use lower::{lower_module, LowerStats};
pub use options::{LowerOptions, Platform};
pub use types::{Ty, TyKind, TypeInterner};
