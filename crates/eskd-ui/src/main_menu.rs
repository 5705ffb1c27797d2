//! 主菜单

use crate::state::{Tool, UiState};
use eskd_core::registry::EntityKind;

/// 需要应用程序执行的菜单命令
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MenuCommand {
    SaveStyles,
    SaveSettings,
    Undo,
    DeleteSelected,
    SelectAll,
    Exit,
}

/// 渲染主菜单
pub fn show_main_menu(ctx: &egui::Context, ui_state: &mut UiState) -> Option<MenuCommand> {
    let mut command = None;

    egui::TopBottomPanel::top("menu_bar").show(ctx, |ui| {
        #[allow(deprecated)]
        egui::menu::bar(ui, |ui| {
            // 文件菜单
            ui.menu_button("File", |ui| {
                if ui.button("Save styles").clicked() {
                    command = Some(MenuCommand::SaveStyles);
                    ui.close();
                }
                if ui.button("Save settings").clicked() {
                    command = Some(MenuCommand::SaveSettings);
                    ui.close();
                }
                ui.separator();
                if ui.button("Exit            Alt+F4").clicked() {
                    command = Some(MenuCommand::Exit);
                    ui.close();
                }
            });

            // 编辑菜单
            ui.menu_button("Edit", |ui| {
                if ui.button("Undo            Ctrl+Z").clicked() {
                    command = Some(MenuCommand::Undo);
                    ui.close();
                }
                if ui.button("Delete          Del").clicked() {
                    command = Some(MenuCommand::DeleteSelected);
                    ui.close();
                }
                ui.separator();
                if ui.button("Select All      Ctrl+A").clicked() {
                    command = Some(MenuCommand::SelectAll);
                    ui.close();
                }
            });

            // 视图菜单
            ui.menu_button("View", |ui| {
                if ui.checkbox(&mut ui_state.show_palette, "Properties").clicked() {
                    ui.close();
                }
                if ui.checkbox(&mut ui_state.show_style_editor, "Styles").clicked() {
                    ui.close();
                }
            });

            // 绘图菜单
            ui.menu_button("Draw", |ui| {
                for kind in EntityKind::ALL {
                    let tool = Tool::Place(kind);
                    let label = format!("{:<16}{}", kind.name(), tool.shortcut().unwrap_or_default());
                    if ui.button(label).clicked() {
                        ui_state.set_tool(tool);
                        ui.close();
                    }
                }
            });
        });
    });

    command
}
