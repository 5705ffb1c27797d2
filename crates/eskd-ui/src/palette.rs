//! 属性面板
//!
//! 显示选择集的汇总属性，按实体类型分组、按类别排序。界面只收集编辑，
//! 面板绘制结束后再统一写入汇总器。

use eskd_core::context::EditContext;
use eskd_core::drawing::Drawing;
use eskd_core::enum_converter::enum_label;
use eskd_core::handle::EntityHandle;
use eskd_core::localization::{keys, Localizer};
use eskd_core::metadata::{PropertyCategory, PropertyMetadata};
use eskd_core::registry::EntityKind;
use eskd_core::scale::AnnotationScale;
use eskd_core::settings::UserSettings;
use eskd_core::style_store::StyleStore;
use eskd_core::summary::{BatchOutcome, SummaryAggregator, SummaryValue};
use eskd_core::value::{PropertyValue, ValueKind};
use std::collections::HashMap;

/// 面板中产生的一次编辑
#[derive(Debug, Clone, PartialEq)]
pub enum PaletteEdit {
    /// 已经是类型化的值（下拉框、复选框、拖动）
    Value {
        kind: EntityKind,
        name: &'static str,
        value: PropertyValue,
    },
    /// 文本输入，由汇总器按属性类型解析
    Text {
        kind: EntityKind,
        name: &'static str,
        text: String,
    },
}

/// 面板状态
#[derive(Debug, Default)]
pub struct PaletteState {
    aggregator: Option<SummaryAggregator>,
    too_many: bool,
    /// 正在输入的文本
    buffers: HashMap<(EntityKind, &'static str), String>,
}

impl PaletteState {
    pub fn new() -> Self {
        Self::default()
    }

    /// 按新的选择集重建汇总，超过上限时不建立汇总
    pub fn rebuild(
        &mut self,
        selection: &[EntityHandle],
        drawing: &Drawing,
        styles: &StyleStore,
        settings: &UserSettings,
    ) {
        self.buffers.clear();
        self.too_many = !settings.selection_allowed(selection.len());
        self.aggregator = if self.too_many || selection.is_empty() {
            None
        } else {
            Some(SummaryAggregator::new(selection, drawing, styles))
        };
        tracing::debug!(
            "Palette rebuilt for {} objects (too many: {})",
            selection.len(),
            self.too_many
        );
    }

    pub fn aggregator(&self) -> Option<&SummaryAggregator> {
        self.aggregator.as_ref()
    }

    pub fn is_too_many(&self) -> bool {
        self.too_many
    }

    /// 处理图纸的外部修改
    pub fn sync(&mut self, drawing: &mut Drawing, styles: &StyleStore) -> bool {
        let Some(aggregator) = self.aggregator.as_mut() else {
            drawing.take_events();
            return false;
        };
        let touched = aggregator.sync_external(drawing, styles);
        if touched {
            self.buffers.clear();
        }
        touched
    }

    /// 把收集到的编辑写入汇总器
    pub fn apply(&mut self, edits: Vec<PaletteEdit>, ctx: &mut EditContext<'_>) -> Vec<BatchOutcome> {
        let Some(aggregator) = self.aggregator.as_mut() else {
            return Vec::new();
        };
        edits
            .into_iter()
            .filter_map(|edit| match edit {
                PaletteEdit::Value { kind, name, value } => {
                    Some(aggregator.set_summary_value(kind, name, value, ctx))
                }
                PaletteEdit::Text { kind, name, text } => {
                    match aggregator.set_from_display(kind, name, &text, ctx) {
                        Ok(outcome) => Some(outcome),
                        Err(e) => {
                            ctx.reporter.report("Palette input", &e);
                            None
                        }
                    }
                }
            })
            .collect()
    }
}

/// 一行属性
struct Row {
    kind: EntityKind,
    metadata: &'static PropertyMetadata,
    value_kind: ValueKind,
}

/// 渲染属性面板并应用其中的编辑
pub fn show_palette(
    ctx: &egui::Context,
    state: &mut PaletteState,
    edit: &mut EditContext<'_>,
    show: &mut bool,
) {
    let mut edits = Vec::new();

    egui::SidePanel::left("palette")
        .resizable(true)
        .default_width(280.0)
        .show_animated(ctx, *show, |ui| {
            ui.heading("Properties");
            ui.separator();

            if state.too_many {
                ui.label(edit.localizer.get(keys::TOO_MANY_OBJECTS));
                return;
            }
            let Some(aggregator) = state.aggregator.as_mut() else {
                ui.label("No selection");
                return;
            };
            if aggregator.is_empty() {
                ui.label("No intelligent objects selected");
                return;
            }

            let groups: Vec<(EntityKind, usize, Vec<Row>)> = aggregator
                .groups()
                .iter()
                .map(|group| {
                    let count = aggregator
                        .providers()
                        .iter()
                        .filter(|p| p.kind() == Some(group.kind))
                        .count();
                    let rows = group
                        .properties
                        .iter()
                        .map(|p| Row {
                            kind: group.kind,
                            metadata: p.metadata(),
                            value_kind: p.key().value_kind,
                        })
                        .collect();
                    (group.kind, count, rows)
                })
                .collect();

            egui::ScrollArea::vertical().show(ui, |ui| {
                for (kind, count, rows) in groups {
                    let title = format!("{} ({})", edit.localizer.get(kind.display_key()), count);
                    egui::CollapsingHeader::new(title)
                        .id_salt(kind.name())
                        .default_open(true)
                        .show(ui, |ui| {
                            egui::Grid::new(("palette_grid", kind.name()))
                                .num_columns(2)
                                .spacing([10.0, 4.0])
                                .striped(true)
                                .show(ui, |ui| {
                                    let mut category: Option<PropertyCategory> = None;
                                    for row in &rows {
                                        if category != Some(row.metadata.category) {
                                            category = Some(row.metadata.category);
                                            ui.label(
                                                egui::RichText::new(
                                                    edit.localizer.get(row.metadata.category.display_key()),
                                                )
                                                .strong(),
                                            );
                                            ui.end_row();
                                        }
                                        ui.label(edit.localizer.get(row.metadata.display_name_key))
                                            .on_hover_text(edit.localizer.get(row.metadata.description_key));
                                        property_editor(
                                            ui,
                                            row,
                                            aggregator,
                                            &mut state.buffers,
                                            edit,
                                            &mut edits,
                                        );
                                        ui.end_row();
                                    }
                                });
                        });
                }
            });
        });

    if !edits.is_empty() {
        for outcome in state.apply(edits, edit) {
            tracing::debug!("Palette edit: {:?}", outcome);
        }
    }
}

fn property_editor(
    ui: &mut egui::Ui,
    row: &Row,
    aggregator: &mut SummaryAggregator,
    buffers: &mut HashMap<(EntityKind, &'static str), String>,
    edit: &EditContext<'_>,
    edits: &mut Vec<PaletteEdit>,
) {
    let (kind, name) = (row.kind, row.metadata.name);
    let summary = aggregator.summary_value(kind, name);
    if summary == SummaryValue::Undefined {
        ui.label(edit.localizer.get(keys::UNDEFINED));
        return;
    }
    let display = aggregator.display_value(kind, name, edit.localizer);
    let id = (kind.name(), name);

    match row.value_kind {
        ValueKind::Bool => {
            let current = aggregator.summary_bool(kind, name);
            let mut checked = current.unwrap_or(false);
            let checkbox = egui::Checkbox::new(&mut checked, "").indeterminate(current.is_none());
            if ui.add(checkbox).changed() {
                edits.push(PaletteEdit::Value {
                    kind,
                    name,
                    value: PropertyValue::Bool(checked),
                });
            }
        }
        ValueKind::Int => match aggregator.summary_int(kind, name) {
            Some(current) => {
                let (min, max) = aggregator.range(kind, name);
                let mut value = current;
                let drag = egui::DragValue::new(&mut value).range(
                    min.map_or(i32::MIN, |m| m.ceil() as i32)..=max.map_or(i32::MAX, |m| m.floor() as i32),
                );
                if ui.add(drag).changed() && value != current {
                    edits.push(PaletteEdit::Value {
                        kind,
                        name,
                        value: PropertyValue::Int(value),
                    });
                }
            }
            None => text_editor(ui, kind, name, String::new(), &display, buffers, edits),
        },
        ValueKind::Double => match aggregator.summary_double(kind, name) {
            Some(current) => {
                let (min, max) = aggregator.range(kind, name);
                let mut value = current;
                let drag = egui::DragValue::new(&mut value)
                    .speed(0.1)
                    .range(min.unwrap_or(f64::MIN)..=max.unwrap_or(f64::MAX));
                if ui.add(drag).changed() && value != current {
                    edits.push(PaletteEdit::Value {
                        kind,
                        name,
                        value: PropertyValue::Double(value),
                    });
                }
            }
            None => text_editor(ui, kind, name, String::new(), &display, buffers, edits),
        },
        ValueKind::Enum => {
            let PropertyValue::Enum(default) = &row.metadata.default_value else {
                ui.label(display);
                return;
            };
            egui::ComboBox::from_id_salt(id)
                .selected_text(display.as_str())
                .show_ui(ui, |ui| {
                    for option in default.enum_type().values() {
                        let label = enum_label(&option, edit.localizer);
                        if ui.selectable_label(label == display, label).clicked() {
                            edits.push(PaletteEdit::Value {
                                kind,
                                name,
                                value: PropertyValue::Enum(option),
                            });
                        }
                    }
                });
        }
        ValueKind::Scale => {
            egui::ComboBox::from_id_salt(id)
                .selected_text(display.as_str())
                .show_ui(ui, |ui| {
                    for scale in AnnotationScale::standard() {
                        if ui.selectable_label(scale.name() == display, scale.name()).clicked() {
                            edits.push(PaletteEdit::Value {
                                kind,
                                name,
                                value: PropertyValue::Scale(scale),
                            });
                        }
                    }
                });
        }
        ValueKind::String => {
            let options = string_options(kind, name, edit);
            match options {
                Some(options) => {
                    egui::ComboBox::from_id_salt(id)
                        .selected_text(display.as_str())
                        .show_ui(ui, |ui| {
                            for option in options {
                                if ui.selectable_label(option == display, option.as_str()).clicked() {
                                    edits.push(PaletteEdit::Value {
                                        kind,
                                        name,
                                        value: PropertyValue::String(option),
                                    });
                                }
                            }
                        });
                }
                None => {
                    let initial = match summary {
                        SummaryValue::Value(_) => display.clone(),
                        _ => String::new(),
                    };
                    text_editor(ui, kind, name, initial, &display, buffers, edits);
                }
            }
        }
    }
}

/// 取值来自图纸表或样式库的字符串属性
fn string_options(kind: EntityKind, name: &str, edit: &EditContext<'_>) -> Option<Vec<String>> {
    let options = match name {
        "Style" => edit.styles.styles(kind).map(|s| s.name.clone()).collect(),
        "LayerName" => edit
            .drawing
            .layers
            .all_layers()
            .iter()
            .map(|l| l.name.clone())
            .collect(),
        "LineType" => edit.drawing.line_types().iter().map(|l| l.name.clone()).collect(),
        "TextStyle" => edit.drawing.text_styles().iter().map(|t| t.name.clone()).collect(),
        _ => return None,
    };
    Some(options)
}

/// 文本输入，失去焦点时提交
fn text_editor(
    ui: &mut egui::Ui,
    kind: EntityKind,
    name: &'static str,
    initial: String,
    hint: &str,
    buffers: &mut HashMap<(EntityKind, &'static str), String>,
    edits: &mut Vec<PaletteEdit>,
) {
    let key = (kind, name);
    let mut text = buffers.get(&key).cloned().unwrap_or_else(|| initial.clone());
    let response = ui.add(egui::TextEdit::singleline(&mut text).hint_text(hint));
    if response.has_focus() {
        buffers.insert(key, text);
    } else if response.lost_focus() {
        buffers.remove(&key);
        if text != initial && !text.trim().is_empty() {
            edits.push(PaletteEdit::Text { kind, name, text });
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use eskd_core::entities::SmartEntity;
    use eskd_core::localization::BuiltinLocalizer;
    use eskd_core::math::Point2;
    use eskd_core::reader::{read_entity, write_entity};
    use eskd_core::report::RecordingReporter;

    fn place(drawing: &mut Drawing, kind: EntityKind) -> EntityHandle {
        let mut entity = SmartEntity::new(kind, Point2::origin());
        entity.set_end_point(Point2::new(60.0, 0.0));
        entity.update_geometry(&mut RecordingReporter::new());
        write_entity(drawing, &mut entity).unwrap()
    }

    #[test]
    fn test_too_many_objects_hides_summary() {
        let loc = BuiltinLocalizer::english();
        let mut drawing = Drawing::new();
        let styles = StyleStore::new(&loc);
        let settings = UserSettings {
            max_selected_objects: 2,
            ..Default::default()
        };
        let handles: Vec<_> = (0..3).map(|_| place(&mut drawing, EntityKind::Axis)).collect();

        let mut state = PaletteState::new();
        state.rebuild(&handles, &drawing, &styles, &settings);
        assert!(state.is_too_many());
        assert!(state.aggregator().is_none());

        state.rebuild(&handles[..2], &drawing, &styles, &settings);
        assert!(!state.is_too_many());
        assert_eq!(state.aggregator().map(|a| a.providers().len()), Some(2));
    }

    #[test]
    fn test_apply_text_and_value_edits() {
        let loc = BuiltinLocalizer::english();
        let mut drawing = Drawing::new();
        let styles = StyleStore::new(&loc);
        let settings = UserSettings::default();
        let mut reporter = RecordingReporter::new();
        let a = place(&mut drawing, EntityKind::GroundLine);
        let b = place(&mut drawing, EntityKind::GroundLine);

        let mut state = PaletteState::new();
        state.rebuild(&[a, b], &drawing, &styles, &settings);
        let edits = vec![
            PaletteEdit::Text {
                kind: EntityKind::GroundLine,
                name: "Space",
                text: "14".to_string(),
            },
            PaletteEdit::Value {
                kind: EntityKind::GroundLine,
                name: "StrokeAngle",
                value: PropertyValue::Int(45),
            },
            PaletteEdit::Text {
                kind: EntityKind::GroundLine,
                name: "StrokeLength",
                text: "long".to_string(),
            },
        ];
        let mut ctx = EditContext::new(&mut drawing, &styles, &settings, &loc, &mut reporter);
        let outcomes = state.apply(edits, &mut ctx);

        assert_eq!(outcomes.len(), 2);
        assert!(outcomes.iter().all(|o| o.applied == 2));
        assert_eq!(reporter.errors.len(), 1);
        for handle in [a, b] {
            let entity = read_entity(&drawing, handle).unwrap();
            assert_eq!(entity.get("Space"), Some(PropertyValue::Int(14)));
            assert_eq!(entity.get("StrokeAngle"), Some(PropertyValue::Int(45)));
        }
    }

    #[test]
    fn test_string_options_come_from_drawing() {
        let loc = BuiltinLocalizer::english();
        let mut drawing = Drawing::new();
        let styles = StyleStore::new(&loc);
        let settings = UserSettings::default();
        let mut reporter = RecordingReporter::new();
        let ctx = EditContext::new(&mut drawing, &styles, &settings, &loc, &mut reporter);

        let layers = string_options(EntityKind::Axis, "LayerName", &ctx).unwrap();
        assert_eq!(layers, vec!["0".to_string()]);
        let styles = string_options(EntityKind::Axis, "Style", &ctx).unwrap();
        assert_eq!(styles, vec!["Basic".to_string()]);
        assert!(string_options(EntityKind::Axis, "FirstText", &ctx).is_none());
    }
}
