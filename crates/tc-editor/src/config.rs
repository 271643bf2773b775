//! Canvas configuration.
//!
//! Every section has defaults, so hosts only pass the fields they want to
//! override: `{"persist": {"debounceMs": 250}}`.

use crate::drag::DragConfig;
use crate::persist::PersistConfig;
use serde::{Deserialize, Serialize};
use tc_core::export::ExportConfig;
use tc_core::layout::LayoutConfig;

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct CanvasConfig {
    pub layout: LayoutConfig,
    pub drag: DragConfig,
    pub persist: PersistConfig,
    pub export: ExportConfig,
}

impl CanvasConfig {
    /// Parse overrides; an empty string yields the defaults.
    pub fn from_json(json: &str) -> Result<Self, serde_json::Error> {
        if json.trim().is_empty() {
            return Ok(Self::default());
        }
        serde_json::from_str(json)
    }
}
