use std::sync::atomic::{AtomicBool, Ordering};

use serde::Deserialize;

/// Cursor settings, usually read from the `[cursor]` TOML table.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct CursorConfig {
    /// Allow `get_array`/`get_struct`/`get_map`.
    #[serde(default)]
    pub complex_datatype_support: bool,

    /// Allow results that describe volume file transfers.
    #[serde(default)]
    pub enable_volume_operations: bool,

    /// Row limit for preview tooling; the cursor itself ignores it.
    #[serde(default)]
    pub max_rows_preview: Option<usize>,
}

/// Feature switches read by the cursor on each complex accessor call.
pub trait FeatureFlags: Send + Sync {
    fn complex_types_enabled(&self) -> bool;
}

impl FeatureFlags for CursorConfig {
    fn complex_types_enabled(&self) -> bool {
        self.complex_datatype_support
    }
}

/// Flag that can be flipped while cursors are alive.
#[derive(Debug, Default)]
pub struct SharedFlags {
    complex_types: AtomicBool,
}

impl SharedFlags {
    pub fn new(complex_types: bool) -> Self {
        Self { complex_types: AtomicBool::new(complex_types) }
    }

    pub fn set_complex_types(&self, enabled: bool) {
        self.complex_types.store(enabled, Ordering::Relaxed);
    }
}

impl FeatureFlags for SharedFlags {
    fn complex_types_enabled(&self) -> bool {
        self.complex_types.load(Ordering::Relaxed)
    }
}
