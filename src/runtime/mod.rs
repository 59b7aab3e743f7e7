pub mod comparison;
pub mod config;
pub mod engine;
pub mod fallback;
pub mod forest;
pub mod logging;
pub mod module;
pub mod normalize;
pub mod render;
pub mod selection;
pub mod session;
pub mod share;
pub mod store;
pub mod syntax;

pub use comparison::{ComparisonCell, ComparisonGrid};
pub use config::PlaygroundConfig;
pub use engine::EngineClient;
pub use module::{ProcessLoader, ProcessModule};
pub use render::{ExpansionPolicy, TreeView, ViewMode};
pub use selection::{Selection, SelectionEvent};
pub use session::{Debouncer, Playground, ResultState};
pub use store::PreferenceStore;
