//! 样式编辑器
//!
//! 按实体类型列出系统样式和用户样式，支持新建、复制、重命名、删除、
//! 设为当前、编辑参数以及保存到样式文件。系统样式只读。

use eskd_core::drawing::Drawing;
use eskd_core::enum_converter::enum_label;
use eskd_core::handle::EntityHandle;
use eskd_core::localization::{keys, Localizer};
use eskd_core::metadata::PropertyMetadata;
use eskd_core::reader::read_entity;
use eskd_core::registry::EntityKind;
use eskd_core::report::ErrorReporter;
use eskd_core::scale::AnnotationScale;
use eskd_core::settings::UserSettings;
use eskd_core::style::{Style, StyleError};
use eskd_core::style_store::{StyleRepository, StyleStore};
use eskd_core::value::PropertyValue;
use uuid::Uuid;

/// 样式编辑器中的操作
#[derive(Debug, Clone, PartialEq)]
pub enum StyleAction {
    Create,
    /// 以选中的实体参数新建
    CreateFromSelection,
    Copy(Uuid),
    Rename(Uuid, String),
    Delete(Uuid),
    SetCurrent(Uuid),
    SetValue {
        guid: Uuid,
        name: &'static str,
        value: PropertyValue,
    },
    Save,
    Reload,
}

/// 样式编辑器状态
#[derive(Debug)]
pub struct StyleEditorState {
    pub kind: EntityKind,
    pub selected: Uuid,
    rename_buffer: String,
    /// 有未保存的修改
    pub dirty: bool,
}

impl Default for StyleEditorState {
    fn default() -> Self {
        Self {
            kind: EntityKind::Axis,
            selected: Uuid::nil(),
            rename_buffer: String::new(),
            dirty: false,
        }
    }
}

/// 执行样式操作需要的协作者
pub struct StyleEditorContext<'a> {
    pub styles: &'a mut StyleStore,
    pub settings: &'a mut UserSettings,
    pub repository: &'a dyn StyleRepository,
    pub drawing: &'a Drawing,
    pub selection: &'a [EntityHandle],
    pub localizer: &'a dyn Localizer,
    pub reporter: &'a mut dyn ErrorReporter,
}

/// 渲染样式编辑器窗口，返回用户的操作
pub fn show_style_editor(
    ctx: &egui::Context,
    state: &mut StyleEditorState,
    styles: &StyleStore,
    settings: &UserSettings,
    localizer: &dyn Localizer,
    open: &mut bool,
) -> Vec<StyleAction> {
    let mut actions = Vec::new();

    egui::Window::new("Styles")
        .open(open)
        .default_width(420.0)
        .show(ctx, |ui| {
            ui.horizontal(|ui| {
                for kind in EntityKind::ALL {
                    if ui
                        .selectable_label(state.kind == kind, localizer.get(kind.display_key()))
                        .clicked()
                    {
                        state.kind = kind;
                        state.selected = Uuid::nil();
                        state.rename_buffer.clear();
                    }
                }
            });
            ui.separator();

            let kind = state.kind;
            let current = styles.current_style(kind, settings).guid;

            ui.columns(2, |columns| {
                egui::ScrollArea::vertical()
                    .id_salt("style_list")
                    .show(&mut columns[0], |ui| {
                        for style in styles.styles(kind) {
                            let mut text = egui::RichText::new(&style.name);
                            if style.guid == current {
                                text = text.strong();
                            }
                            if ui.selectable_label(state.selected == style.guid, text).clicked() {
                                state.selected = style.guid;
                                state.rename_buffer = style.name.clone();
                            }
                        }
                    });

                let ui = &mut columns[1];
                let Some(style) = styles.find(kind, state.selected) else {
                    return;
                };
                style_details(ui, state, style, current, localizer, &mut actions);
            });

            ui.separator();
            ui.horizontal(|ui| {
                if ui.button("➕ New").clicked() {
                    actions.push(StyleAction::Create);
                }
                if ui.button("From selection").clicked() {
                    actions.push(StyleAction::CreateFromSelection);
                }
                if ui.button("⎘ Copy").clicked() {
                    actions.push(StyleAction::Copy(state.selected));
                }
                let user = !state.selected.is_nil();
                if ui.add_enabled(user, egui::Button::new("➖ Delete")).clicked() {
                    actions.push(StyleAction::Delete(state.selected));
                }
                ui.separator();
                let save = if state.dirty { "💾 Save*" } else { "💾 Save" };
                if ui.button(save).clicked() {
                    actions.push(StyleAction::Save);
                }
                if ui.button("Reload").clicked() {
                    actions.push(StyleAction::Reload);
                }
            });
        });

    actions
}

fn style_details(
    ui: &mut egui::Ui,
    state: &mut StyleEditorState,
    style: &Style,
    current: Uuid,
    localizer: &dyn Localizer,
    actions: &mut Vec<StyleAction>,
) {
    let read_only = style.is_system();

    ui.horizontal(|ui| {
        let response = ui.add_enabled(!read_only, egui::TextEdit::singleline(&mut state.rename_buffer));
        if response.lost_focus() && state.rename_buffer != style.name && !state.rename_buffer.trim().is_empty() {
            actions.push(StyleAction::Rename(style.guid, state.rename_buffer.trim().to_string()));
        }
    });
    if style.guid != current && ui.button("Set current").clicked() {
        actions.push(StyleAction::SetCurrent(style.guid));
    }
    if let Some(layer) = &style.layer {
        ui.label(format!("Layer: {} ({})", layer.name, layer.line_type));
    }
    ui.separator();

    egui::Grid::new(("style_grid", style.guid))
        .num_columns(2)
        .spacing([10.0, 4.0])
        .striped(true)
        .show(ui, |ui| {
            for instance in &style.properties {
                let meta = instance.metadata();
                if !meta.scope.in_style_editor() {
                    continue;
                }
                ui.label(localizer.get(meta.display_name_key))
                    .on_hover_text(localizer.get(meta.description_key));
                ui.add_enabled_ui(!read_only, |ui| {
                    if let Some(value) = value_editor(ui, style.guid, meta.name, instance.value(), meta, localizer) {
                        actions.push(StyleAction::SetValue {
                            guid: style.guid,
                            name: meta.name,
                            value,
                        });
                    }
                });
                ui.end_row();
            }
        });
}

/// 单个参数的编辑控件，返回修改后的值
fn value_editor(
    ui: &mut egui::Ui,
    guid: Uuid,
    name: &'static str,
    value: &PropertyValue,
    meta: &PropertyMetadata,
    localizer: &dyn Localizer,
) -> Option<PropertyValue> {
    let min = meta.minimum.unwrap_or(f64::MIN);
    let max = meta.maximum.unwrap_or(f64::MAX);
    match value {
        PropertyValue::Bool(b) => {
            let mut b = *b;
            ui.checkbox(&mut b, "").changed().then_some(PropertyValue::Bool(b))
        }
        PropertyValue::Int(i) => {
            let mut i = *i;
            ui.add(egui::DragValue::new(&mut i).range(min.ceil() as i32..=max.floor() as i32))
                .changed()
                .then_some(PropertyValue::Int(i))
        }
        PropertyValue::Double(d) => {
            let mut d = *d;
            ui.add(egui::DragValue::new(&mut d).speed(0.1).range(min..=max))
                .changed()
                .then_some(PropertyValue::Double(d))
        }
        PropertyValue::Enum(e) => {
            let mut chosen = None;
            egui::ComboBox::from_id_salt((guid, name))
                .selected_text(enum_label(e, localizer))
                .show_ui(ui, |ui| {
                    for option in e.enum_type().values() {
                        if ui
                            .selectable_label(option == *e, enum_label(&option, localizer))
                            .clicked()
                        {
                            chosen = Some(PropertyValue::Enum(option));
                        }
                    }
                });
            chosen
        }
        PropertyValue::Scale(s) => {
            let mut chosen = None;
            egui::ComboBox::from_id_salt((guid, name))
                .selected_text(s.name())
                .show_ui(ui, |ui| {
                    for scale in AnnotationScale::standard() {
                        if ui.selectable_label(scale.name() == s.name(), scale.name()).clicked() {
                            chosen = Some(PropertyValue::Scale(scale));
                        }
                    }
                });
            chosen
        }
        PropertyValue::String(s) => {
            let mut text = s.clone();
            let response = ui.text_edit_singleline(&mut text);
            (response.changed() && text != *s).then_some(PropertyValue::String(text))
        }
    }
}

/// 执行样式操作
///
/// 返回是否修改了样式库或设置。
pub fn apply_style_actions(
    actions: Vec<StyleAction>,
    state: &mut StyleEditorState,
    ctx: &mut StyleEditorContext<'_>,
) -> bool {
    let kind = state.kind;
    let mut changed = false;
    for action in actions {
        let result = match action {
            StyleAction::Create => {
                let name = unique_name(ctx.styles, kind, "New style");
                state.selected = ctx.styles.create(kind, &name, ctx.localizer);
                state.rename_buffer = name;
                Ok(())
            }
            StyleAction::CreateFromSelection => create_from_selection(state, ctx),
            StyleAction::Copy(guid) => ctx.styles.copy(kind, guid).map(|copy| {
                state.selected = copy;
            }),
            StyleAction::Rename(guid, name) => ctx.styles.rename(kind, guid, &name),
            StyleAction::Delete(guid) => ctx.styles.delete(kind, guid, ctx.settings).map(|removed| {
                tracing::info!("Deleted style {}", removed.name);
                state.selected = Uuid::nil();
            }),
            StyleAction::SetCurrent(guid) => ctx.styles.set_current(kind, guid, ctx.settings),
            StyleAction::SetValue { guid, name, value } => ctx
                .styles
                .style_mut(kind, guid)
                .and_then(|style| style.set_value(name, value))
                .map(|_| ()),
            StyleAction::Save => match ctx.styles.save_to(kind, ctx.repository) {
                Ok(()) => {
                    state.dirty = false;
                    continue;
                }
                Err(StyleError::DuplicateNames { names, .. }) => {
                    let message = format!("{}: {}", ctx.localizer.get(keys::DUPLICATE_STYLE_NAMES), names.join(", "));
                    ctx.reporter.warn_user(&message);
                    continue;
                }
                Err(e) => Err(e),
            },
            StyleAction::Reload => match ctx.styles.reload(kind, ctx.repository, ctx.localizer) {
                Ok(count) => {
                    tracing::info!("Reloaded {} styles for {}", count, kind);
                    state.selected = Uuid::nil();
                    state.dirty = false;
                    changed = true;
                    continue;
                }
                Err(e) => Err(e),
            },
        };
        match result {
            Ok(()) => {
                changed = true;
                state.dirty = true;
            }
            Err(e) => ctx.reporter.report("Style editor", &e),
        }
    }
    changed
}

fn create_from_selection(state: &mut StyleEditorState, ctx: &mut StyleEditorContext<'_>) -> Result<(), StyleError> {
    let kind = state.kind;
    let entity = ctx
        .selection
        .iter()
        .filter_map(|handle| read_entity(ctx.drawing, *handle).ok())
        .find(|entity| entity.kind() == kind);
    let Some(entity) = entity else {
        ctx.reporter.warn_user(&format!("No {} selected", ctx.localizer.get(kind.display_key())));
        return Ok(());
    };
    let name = unique_name(ctx.styles, kind, "From selection");
    state.selected = ctx.styles.create_from_entity(&entity, &name, ctx.drawing, ctx.localizer);
    state.rename_buffer = name;
    Ok(())
}

/// 在基础名称后加序号，直到不与现有样式重名
fn unique_name(styles: &StyleStore, kind: EntityKind, base: &str) -> String {
    if styles.find_by_name(kind, base).is_none() {
        return base.to_string();
    }
    (2..)
        .map(|n| format!("{} {}", base, n))
        .find(|name| styles.find_by_name(kind, name).is_none())
        .unwrap_or_else(|| base.to_string())
}
