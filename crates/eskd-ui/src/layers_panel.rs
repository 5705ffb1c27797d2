//! 图层面板

use eskd_core::drawing::Drawing;

/// 渲染图层面板
pub fn show_layers_panel(ctx: &egui::Context, drawing: &mut Drawing, show: &mut bool) {
    let mut toggle_lock: Option<(String, bool)> = None;
    let mut toggle_visible: Option<(String, bool)> = None;
    let mut make_current: Option<String> = None;

    egui::SidePanel::right("layers_panel")
        .resizable(true)
        .default_width(200.0)
        .show_animated(ctx, *show, |ui| {
            ui.heading("Layers");
            ui.separator();

            egui::ScrollArea::vertical().show(ui, |ui| {
                let current_layer_name = drawing.layers.current_layer().name.clone();

                for layer in drawing.layers.all_layers() {
                    let is_current = layer.name == current_layer_name;

                    ui.horizontal(|ui| {
                        let visibility_icon = if layer.visible { "👁" } else { "👁‍🗨" };
                        if ui.small_button(visibility_icon).clicked() {
                            toggle_visible = Some((layer.name.clone(), !layer.visible));
                        }

                        let lock_icon = if layer.locked { "🔒" } else { "🔓" };
                        if ui.small_button(lock_icon).clicked() {
                            toggle_lock = Some((layer.name.clone(), !layer.locked));
                        }

                        // 颜色指示器
                        let color = egui::Color32::from_rgb(layer.color.r, layer.color.g, layer.color.b);
                        let (rect, _response) =
                            ui.allocate_exact_size(egui::vec2(16.0, 16.0), egui::Sense::hover());
                        ui.painter().rect_filled(rect, 2.0, color);

                        let text = if is_current {
                            egui::RichText::new(&layer.name).strong()
                        } else {
                            egui::RichText::new(&layer.name)
                        };

                        if ui.selectable_label(is_current, text).clicked() {
                            make_current = Some(layer.name.clone());
                        }
                        ui.label(egui::RichText::new(&layer.line_type).weak());
                    });
                }
            });
        });

    if let Some((name, locked)) = toggle_lock {
        if let Err(e) = drawing.set_layer_locked(&name, locked) {
            tracing::warn!("Cannot change lock of layer {}: {}", name, e);
        }
    }
    if let Some((name, visible)) = toggle_visible {
        if let Some(layer) = drawing.layers.get_layer_mut(&name) {
            layer.visible = visible;
        }
    }
    if let Some(name) = make_current {
        drawing.layers.set_current_layer(&name);
    }
}
