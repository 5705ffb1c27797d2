//! 工具栏

use crate::state::{Tool, UiState};
use eskd_core::registry::EntityKind;

/// 渲染工具栏
pub fn show_toolbar(ctx: &egui::Context, ui_state: &mut UiState) {
    egui::TopBottomPanel::top("toolbar").show(ctx, |ui| {
        ui.horizontal(|ui| {
            ui.spacing_mut().item_spacing.x = 4.0;

            tool_button(ui, ui_state, Tool::Select, "⬚", "Select (Space)");

            ui.separator();

            // 智能实体
            tool_button(ui, ui_state, Tool::Place(EntityKind::Axis), "⊕ Axis", "Axis (A)");
            tool_button(ui, ui_state, Tool::Place(EntityKind::BreakLine), "⌇ Break", "Break line (B)");
            tool_button(ui, ui_state, Tool::Place(EntityKind::GroundLine), "⫽ Ground", "Ground line (G)");

            ui.separator();

            if ui
                .button(if ui_state.show_palette { "☰ ON" } else { "☰ OFF" })
                .on_hover_text("Properties palette")
                .clicked()
            {
                ui_state.show_palette = !ui_state.show_palette;
            }

            if ui
                .button("🎨 Styles")
                .on_hover_text("Style editor")
                .clicked()
            {
                ui_state.show_style_editor = !ui_state.show_style_editor;
            }
        });
    });
}

fn tool_button(ui: &mut egui::Ui, ui_state: &mut UiState, tool: Tool, icon: &str, tooltip: &str) {
    let selected = ui_state.current_tool == tool;

    let button = egui::Button::new(icon).selected(selected);

    if ui.add(button).on_hover_text(tooltip).clicked() {
        ui_state.set_tool(tool);
    }
}
