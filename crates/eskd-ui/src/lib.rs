//! ESKD 用户界面
//!
//! 基于egui的属性面板、样式编辑器和工具栏。

pub mod layers_panel;
pub mod main_menu;
pub mod palette;
pub mod state;
pub mod style_editor;
pub mod toolbar;

pub use palette::{PaletteEdit, PaletteState};
pub use state::{Tool, UiState};
pub use style_editor::{StyleAction, StyleEditorContext, StyleEditorState};
