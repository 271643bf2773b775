pub mod export;
pub mod expr;
pub mod id;
pub mod layout;
pub mod model;
pub mod registry;
pub mod snapshot;
pub mod validate;

pub use export::{ExportConfig, ExportEnvelope, ExportFile, ExportFormat, can_export, encode_export};
pub use id::ToolId;
pub use layout::{LayoutConfig, PlacementMode, Viewport, calculate_new_tool_position};
pub use model::*;
pub use registry::ToolRegistry;
pub use snapshot::{SnapshotError, decode_snapshot, encode_snapshot};
pub use validate::{InputType, ValidationResult, infer_input_type, validate_input, validate_param};
