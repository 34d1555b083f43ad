//! Lowering configuration.

use serde::{Deserialize, Serialize};

/// Target platform. Decides the mangling scheme and whether decoys are
/// generated by default.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Platform {
    #[default]
    Jvm,
    Js,
    Native,
}

impl Platform {
    /// Decoys preserve binary signatures for klib-style linkage; the JVM
    /// backend resolves by name and does not need them.
    pub fn decoys_by_default(self) -> bool {
        !matches!(self, Platform::Jvm)
    }
}

/// Options for [`lower_module`](crate::lower::lower_module).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct LowerOptions {
    pub platform: Platform,
    /// Overrides the platform default for decoy generation.
    pub decoys: Option<bool>,
    /// Emit `if ($default has bit i) p_i = <default>` at the top of
    /// rewritten bodies.
    pub default_prologue: bool,
}

impl Default for LowerOptions {
    fn default() -> Self {
        Self {
            platform: Platform::Jvm,
            decoys: None,
            default_prologue: true,
        }
    }
}

impl LowerOptions {
    pub fn for_platform(platform: Platform) -> Self {
        Self {
            platform,
            ..Self::default()
        }
    }

    pub fn with_decoys(mut self, enabled: bool) -> Self {
        self.decoys = Some(enabled);
        self
    }

    pub fn decoys_enabled(&self) -> bool {
        self.decoys
            .unwrap_or_else(|| self.platform.decoys_by_default())
    }
}
