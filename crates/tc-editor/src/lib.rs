//! Tool Canvas editor engine: the tool store, persistence pipeline, drag
//! controller, parameter editing and the `ToolCanvas` controller that
//! wires them together. Host-agnostic; `tc-wasm` binds it to the DOM.

pub mod canvas;
pub mod config;
pub mod drag;
pub mod input;
pub mod params;
pub mod persist;
pub mod shortcuts;
pub mod store;

pub use canvas::{ExportError, ToolCanvas};
pub use config::CanvasConfig;
pub use drag::{DragConfig, DragEffects, DragMode, DragUpdate, NoEffects};
pub use input::{InputEvent, Modifiers, PointerTarget};
pub use params::ParameterEditor;
pub use persist::{MemoryStorage, PersistConfig, PersistenceAdapter, Schedule, Storage, StorageError};
pub use store::{ToolMutation, ToolStore};
