//! ESKD 主应用程序入口
//! 使用 eframe 作为应用框架，在画布上放置和编辑智能实体

use anyhow::Result;
use eframe::egui;
use tracing::{error, info, warn, Level};
use tracing_subscriber::FmtSubscriber;

use eskd_core::context::EditContext;
use eskd_core::drawing::{Drawing, HostBlock};
use eskd_core::entities::SmartEntity;
use eskd_core::handle::EntityHandle;
use eskd_core::layer::{Color, Layer};
use eskd_core::localization::BuiltinLocalizer;
use eskd_core::math::{BoundingBox2, Point2};
use eskd_core::placement::Placement;
use eskd_core::primitive::{bounds_of, Primitive};
use eskd_core::reader::{list_entities, write_entity};
use eskd_core::registry::EntityKind;
use eskd_core::report::RecordingReporter;
use eskd_core::settings::UserSettings;
use eskd_core::style_store::{apply_style, StyleStore};
use eskd_core::value::PropertyValue;
use eskd_file::{load_settings, save_settings, DataDir, XmlStyleRepository};
use eskd_ui::layers_panel::show_layers_panel;
use eskd_ui::main_menu::{show_main_menu, MenuCommand};
use eskd_ui::palette::show_palette;
use eskd_ui::style_editor::{apply_style_actions, show_style_editor};
use eskd_ui::toolbar::show_toolbar;
use eskd_ui::{PaletteState, StyleEditorContext, StyleEditorState, Tool, UiState};

/// 选择拾取半径（像素）
const PICK_RADIUS: f64 = 5.0;

/// ESKD 应用程序
struct EskdApp {
    data_dir: DataDir,
    repository: XmlStyleRepository,

    drawing: Drawing,
    styles: StyleStore,
    settings: UserSettings,
    localizer: BuiltinLocalizer,
    reporter: RecordingReporter,

    ui_state: UiState,
    palette: PaletteState,
    style_editor: StyleEditorState,
    show_layers: bool,

    /// 进行中的放置
    placement: Option<Placement>,

    // 视图状态
    camera_center: Point2,
    camera_zoom: f64,
}

impl EskdApp {
    fn new(data_dir: DataDir) -> Self {
        let localizer = BuiltinLocalizer::english();
        let repository = XmlStyleRepository::new(data_dir.styles_dir());

        let settings = load_settings(&data_dir.settings_path()).unwrap_or_else(|e| {
            error!("Cannot read settings: {}", e);
            UserSettings::default()
        });

        let mut styles = StyleStore::new(&localizer);
        for kind in EntityKind::ALL {
            if let Err(e) = styles.load_from(kind, &repository, &localizer) {
                error!("Cannot load styles for {}: {}", kind, e);
            }
        }

        let mut app = Self {
            data_dir,
            repository,
            drawing: Drawing::new(),
            styles,
            settings,
            localizer,
            reporter: RecordingReporter::new(),
            ui_state: UiState::default(),
            palette: PaletteState::new(),
            style_editor: StyleEditorState::default(),
            show_layers: true,
            placement: None,
            camera_center: Point2::new(60.0, 50.0),
            camera_zoom: 3.0,
        };
        if let Err(e) = app.create_demo_content() {
            error!("Cannot create demo content: {}", e);
        }
        app
    }

    fn create_demo_content(&mut self) -> Result<()> {
        self.drawing.load_line_type("CENTER")?;
        self.drawing
            .add_layer(Layer::new("Axes").with_color(Color::RED).with_line_type("CENTER"))?;

        let mut demo: Vec<SmartEntity> = Vec::new();
        for (i, label) in ["1", "2", "3"].into_iter().enumerate() {
            let x = i as f64 * 60.0;
            let mut axis = SmartEntity::new(EntityKind::Axis, Point2::new(x, 0.0));
            axis.set_end_point(Point2::new(x, 100.0));
            axis.set("FirstText", &PropertyValue::from(label))?;
            axis.base_mut().layer_name = "Axes".to_string();
            demo.push(axis);
        }
        let mut break_line = SmartEntity::new(EntityKind::BreakLine, Point2::new(-20.0, 120.0));
        break_line.set_end_point(Point2::new(140.0, 120.0));
        demo.push(break_line);
        let mut ground_line = SmartEntity::new(EntityKind::GroundLine, Point2::new(-20.0, -15.0));
        ground_line.set_end_point(Point2::new(140.0, -15.0));
        demo.push(ground_line);

        let (styles, settings, localizer, reporter) =
            (&self.styles, &self.settings, &self.localizer, &mut self.reporter);
        self.drawing.transaction("Demo content", |d| {
            for mut entity in demo {
                let layer = entity.base().layer_name.clone();
                let style = styles.current_style(entity.kind(), settings);
                apply_style(&mut entity, style, true, d, settings, localizer);
                entity.base_mut().layer_name = layer;
                entity.update_geometry(reporter);
                write_entity(d, &mut entity)?;
            }
            Ok::<_, anyhow::Error>(())
        })?;
        self.drawing.take_events();
        info!("Created {} demo entities", list_entities(&self.drawing).len());
        Ok(())
    }

    /// 世界坐标转屏幕坐标
    fn world_to_screen(&self, point: Point2, rect: &egui::Rect) -> egui::Pos2 {
        let center = rect.center();
        let x = center.x + ((point.x - self.camera_center.x) * self.camera_zoom) as f32;
        let y = center.y - ((point.y - self.camera_center.y) * self.camera_zoom) as f32; // Y轴翻转
        egui::Pos2::new(x, y)
    }

    /// 屏幕坐标转世界坐标
    fn screen_to_world(&self, pos: egui::Pos2, rect: &egui::Rect) -> Point2 {
        let center = rect.center();
        let x = self.camera_center.x + ((pos.x - center.x) as f64 / self.camera_zoom);
        let y = self.camera_center.y - ((pos.y - center.y) as f64 / self.camera_zoom); // Y轴翻转
        Point2::new(x, y)
    }

    /// 线型的划线和间隔长度（屏幕像素），实线返回 `None`
    fn dash_pattern(&self, line_type: &str, line_type_scale: f64) -> Option<(Vec<f32>, Vec<f32>)> {
        let definition = self.drawing.line_type(line_type)?;
        if definition.is_continuous() {
            return None;
        }
        let scale = line_type_scale * self.camera_zoom;
        let dashes = definition
            .pattern
            .iter()
            .filter(|v| **v > 0.0)
            .map(|v| (v * scale).max(1.0) as f32)
            .collect();
        let gaps = definition
            .pattern
            .iter()
            .filter(|v| **v < 0.0)
            .map(|v| (-v * scale).max(1.0) as f32)
            .collect();
        Some((dashes, gaps))
    }

    /// 绘制一组图元
    fn draw_primitives(
        &self,
        painter: &egui::Painter,
        rect: &egui::Rect,
        primitives: &[Primitive],
        dashes: Option<&(Vec<f32>, Vec<f32>)>,
        color: egui::Color32,
    ) {
        let stroke = egui::Stroke::new(1.5, color);
        let path = |points: Vec<egui::Pos2>, solid: bool| match dashes {
            Some((dash, gap)) if !solid && !dash.is_empty() && dash.len() == gap.len() => {
                painter.extend(egui::Shape::dashed_line_with_offset(&points, stroke, dash, gap, 0.0));
            }
            _ => {
                painter.add(egui::Shape::line(points, stroke));
            }
        };

        for primitive in primitives {
            match primitive {
                Primitive::Line(line) => {
                    let points = vec![self.world_to_screen(line.start, rect), self.world_to_screen(line.end, rect)];
                    path(points, line.solid);
                }
                Primitive::Polyline(polyline) => {
                    let mut points: Vec<_> = polyline
                        .vertices
                        .iter()
                        .map(|v| self.world_to_screen(*v, rect))
                        .collect();
                    if polyline.closed {
                        if let Some(first) = points.first().copied() {
                            points.push(first);
                        }
                    }
                    path(points, false);
                }
                Primitive::Circle(circle) => {
                    let center = self.world_to_screen(circle.center, rect);
                    let radius = (circle.radius * self.camera_zoom) as f32;
                    painter.circle_stroke(center, radius, stroke);
                }
                Primitive::Text(text) => {
                    let screen_pos = self.world_to_screen(text.position, rect);
                    let screen_height = (text.height * self.camera_zoom) as f32;
                    // 太小时不显示
                    if screen_height < 4.0 {
                        continue;
                    }
                    painter.text(
                        screen_pos,
                        egui::Align2::CENTER_CENTER,
                        &text.content,
                        egui::FontId::proportional(screen_height.clamp(8.0, 200.0)),
                        color,
                    );
                }
            }
        }
    }

    fn block_color(&self, block: &HostBlock) -> egui::Color32 {
        if self.ui_state.selected_entities.contains(&block.handle) {
            return egui::Color32::from_rgb(0, 255, 0);
        }
        let color = self
            .drawing
            .layers
            .get_layer(&block.layer)
            .map(|l| l.color)
            .unwrap_or(Color::WHITE);
        egui::Color32::from_rgb(color.r, color.g, color.b)
    }

    /// 拾取点附近的实体
    fn pick(&self, point: Point2) -> Option<EntityHandle> {
        let tolerance = PICK_RADIUS / self.camera_zoom;
        self.drawing
            .blocks()
            .filter(|block| Some(block.handle) != self.placement.as_ref().map(Placement::handle))
            .filter(|block| self.drawing.layers.is_displayed(&block.layer))
            .find(|block| {
                bounds_of(&block.primitives).is_some_and(|b| {
                    BoundingBox2::new(
                        Point2::new(b.min.x - tolerance, b.min.y - tolerance),
                        Point2::new(b.max.x + tolerance, b.max.y + tolerance),
                    )
                    .contains(&point)
                })
            })
            .map(|block| block.handle)
    }

    fn handle_left_click(&mut self, toggle: bool) {
        let world_pos = self.ui_state.mouse_world_pos;

        match self.ui_state.current_tool {
            Tool::Select => match self.pick(world_pos) {
                Some(handle) if toggle => self.ui_state.toggle_selection(handle),
                Some(handle) => {
                    self.ui_state.clear_selection();
                    self.ui_state.add_to_selection(handle);
                }
                None if !toggle => self.ui_state.clear_selection(),
                None => {}
            },
            Tool::Place(kind) => {
                match self.placement.take() {
                    None => match Placement::begin_with_reload(
                        kind,
                        world_pos,
                        &mut self.styles,
                        &self.repository,
                        &mut self.drawing,
                        &self.settings,
                        &self.localizer,
                        &mut self.reporter,
                    ) {
                        Ok(placement) => {
                            self.placement = Some(placement);
                            self.ui_state.status_message = format!("{}: specify second point", kind);
                        }
                        Err(e) => self.ui_state.notify(format!("Cannot place {}: {}", kind, e)),
                    },
                    Some(mut placement) => {
                        let mut ctx = EditContext::new(
                            &mut self.drawing,
                            &self.styles,
                            &self.settings,
                            &self.localizer,
                            &mut self.reporter,
                        );
                        match placement.finish(world_pos, &mut ctx) {
                            Ok(handle) => {
                                self.ui_state.clear_selection();
                                self.ui_state.add_to_selection(handle);
                                self.ui_state.status_message = format!("{} created", kind);
                            }
                            Err(e) => {
                                self.ui_state.notify(format!("Cannot finish {}: {}", kind, e));
                                self.placement = Some(placement);
                            }
                        }
                    }
                }
            }
        }
    }

    /// 取消放置，删除占位块
    fn cancel_placement(&mut self) {
        if let Some(mut placement) = self.placement.take() {
            let mut ctx = EditContext::new(
                &mut self.drawing,
                &self.styles,
                &self.settings,
                &self.localizer,
                &mut self.reporter,
            );
            if let Err(e) = placement.cancel(&mut ctx) {
                warn!("Cancel placement failed: {}", e);
            }
        }
        self.ui_state.cancel();
    }

    fn delete_selected(&mut self) {
        let handles = std::mem::take(&mut self.ui_state.selected_entities);
        self.ui_state.selection_changed = true;
        let result = self.drawing.transaction("Delete", |d| {
            handles.iter().try_for_each(|handle| d.erase(*handle))
        });
        if let Err(e) = result {
            self.ui_state.notify(format!("Delete failed: {}", e));
        }
    }

    fn save_styles(&mut self) {
        for kind in EntityKind::ALL {
            if let Err(e) = self.styles.save_to(kind, &self.repository) {
                self.ui_state.notify(format!("Styles for {} not saved: {}", kind, e));
            }
        }
    }

    fn save_settings(&mut self) {
        if let Err(e) = save_settings(&self.data_dir.settings_path(), &self.settings) {
            self.ui_state.notify(format!("Settings not saved: {}", e));
        }
    }

    fn run_menu_command(&mut self, ctx: &egui::Context, command: MenuCommand) {
        match command {
            MenuCommand::SaveStyles => self.save_styles(),
            MenuCommand::SaveSettings => self.save_settings(),
            MenuCommand::Undo => match self.drawing.undo() {
                Ok(description) => self.ui_state.status_message = format!("Undo: {}", description),
                Err(e) => self.ui_state.status_message = e.to_string(),
            },
            MenuCommand::DeleteSelected => self.delete_selected(),
            MenuCommand::SelectAll => {
                self.ui_state.clear_selection();
                for (handle, _) in list_entities(&self.drawing) {
                    self.ui_state.add_to_selection(handle);
                }
            }
            MenuCommand::Exit => ctx.send_viewport_cmd(egui::ViewportCommand::Close),
        }
    }

    /// 同步图纸事件、选择集和用户提示
    fn sync_state(&mut self) {
        self.palette.sync(&mut self.drawing, &self.styles);

        let drawing = &self.drawing;
        let before = self.ui_state.selected_entities.len();
        self.ui_state
            .selected_entities
            .retain(|handle| drawing.validate(*handle).is_ok());
        if before != self.ui_state.selected_entities.len() {
            self.ui_state.selection_changed = true;
        }

        if self.ui_state.take_selection_changed() {
            self.palette.rebuild(
                &self.ui_state.selected_entities,
                &self.drawing,
                &self.styles,
                &self.settings,
            );
        }

        for warning in self.reporter.take_warnings() {
            self.ui_state.notify(warning);
        }
        for message in std::mem::take(&mut self.reporter.errors) {
            self.ui_state.status_message = message;
        }
    }
}

impl eframe::App for EskdApp {
    fn update(&mut self, ctx: &egui::Context, _frame: &mut eframe::Frame) {
        // 深色主题
        ctx.set_visuals(egui::Visuals::dark());

        self.sync_state();

        // ===== 菜单与工具栏 =====
        if let Some(command) = show_main_menu(ctx, &mut self.ui_state) {
            self.run_menu_command(ctx, command);
        }
        let tool_before = self.ui_state.current_tool;
        show_toolbar(ctx, &mut self.ui_state);
        if tool_before != self.ui_state.current_tool && self.placement.is_some() {
            let tool = self.ui_state.current_tool;
            self.cancel_placement();
            self.ui_state.set_tool(tool);
        }

        // ===== 状态栏 =====
        let entity_count = list_entities(&self.drawing).len();
        egui::TopBottomPanel::bottom("status").show(ctx, |ui| {
            ui.horizontal(|ui| {
                ui.label(&self.ui_state.status_message);
                ui.with_layout(egui::Layout::right_to_left(egui::Align::Center), |ui| {
                    let pos = self.ui_state.mouse_world_pos;
                    ui.label(format!("X:{:>8.2} Y:{:>8.2}", pos.x, pos.y));
                    ui.separator();
                    ui.label(format!("Objects: {}", entity_count));
                    if !self.ui_state.selected_entities.is_empty() {
                        ui.separator();
                        ui.label(format!("Selected: {}", self.ui_state.selected_entities.len()));
                    }
                    ui.separator();
                    ui.label(format!("Undo: {}", self.drawing.undo_count()));
                });
            });
        });

        // ===== 侧边面板 =====
        show_layers_panel(ctx, &mut self.drawing, &mut self.show_layers);
        {
            let mut edit = EditContext::new(
                &mut self.drawing,
                &self.styles,
                &self.settings,
                &self.localizer,
                &mut self.reporter,
            );
            show_palette(ctx, &mut self.palette, &mut edit, &mut self.ui_state.show_palette);
        }

        // ===== 样式编辑器 =====
        let actions = show_style_editor(
            ctx,
            &mut self.style_editor,
            &self.styles,
            &self.settings,
            &self.localizer,
            &mut self.ui_state.show_style_editor,
        );
        if !actions.is_empty() {
            let mut editor = StyleEditorContext {
                styles: &mut self.styles,
                settings: &mut self.settings,
                repository: &self.repository,
                drawing: &self.drawing,
                selection: &self.ui_state.selected_entities,
                localizer: &self.localizer,
                reporter: &mut self.reporter,
            };
            if apply_style_actions(actions, &mut self.style_editor, &mut editor) {
                self.save_settings();
                self.ui_state.selection_changed = true;
            }
        }

        // ===== 中央绘图区域 =====
        egui::CentralPanel::default()
            .frame(egui::Frame::NONE.fill(egui::Color32::from_rgb(30, 30, 46)))
            .show(ctx, |ui| {
                let available_rect = ui.available_rect_before_wrap();
                let (response, painter) = ui.allocate_painter(available_rect.size(), egui::Sense::click_and_drag());
                let rect = response.rect;

                // 处理鼠标位置
                if let Some(hover_pos) = response.hover_pos() {
                    self.ui_state.mouse_world_pos = self.screen_to_world(hover_pos, &rect);
                    if let Some(placement) = self.placement.as_mut() {
                        let mut edit = EditContext::new(
                            &mut self.drawing,
                            &self.styles,
                            &self.settings,
                            &self.localizer,
                            &mut self.reporter,
                        );
                        placement.preview(self.ui_state.mouse_world_pos, &mut edit);
                    }
                }

                // 处理滚轮缩放
                let scroll_delta = ui.input(|i| i.raw_scroll_delta);
                if scroll_delta.y.abs() > 0.0 && response.hovered() {
                    let zoom_factor = if scroll_delta.y > 0.0 { 1.1 } else { 0.9 };

                    // 缩放时保持鼠标位置不变
                    if let Some(hover_pos) = response.hover_pos() {
                        let world_before = self.screen_to_world(hover_pos, &rect);
                        self.camera_zoom = (self.camera_zoom * zoom_factor).clamp(0.01, 100.0);
                        let world_after = self.screen_to_world(hover_pos, &rect);
                        self.camera_center.x += world_before.x - world_after.x;
                        self.camera_center.y += world_before.y - world_after.y;
                    }
                }

                // 处理中键平移
                if response.dragged_by(egui::PointerButton::Middle) {
                    let delta = response.drag_delta();
                    self.camera_center.x -= (delta.x as f64) / self.camera_zoom;
                    self.camera_center.y += (delta.y as f64) / self.camera_zoom;
                }

                if response.clicked_by(egui::PointerButton::Primary) {
                    let toggle = ui.input(|i| i.modifiers.shift);
                    self.handle_left_click(toggle);
                }
                if response.clicked_by(egui::PointerButton::Secondary) {
                    self.cancel_placement();
                }

                // 处理键盘快捷键（仅在没有文本输入时）
                if !ctx.wants_keyboard_input() {
                    let (escape, delete, select_all, undo, tool) = ui.input(|i| {
                        let tool = if i.key_pressed(egui::Key::Space) {
                            Some(Tool::Select)
                        } else if i.key_pressed(egui::Key::A) && !i.modifiers.command {
                            Some(Tool::Place(EntityKind::Axis))
                        } else if i.key_pressed(egui::Key::B) {
                            Some(Tool::Place(EntityKind::BreakLine))
                        } else if i.key_pressed(egui::Key::G) {
                            Some(Tool::Place(EntityKind::GroundLine))
                        } else {
                            None
                        };
                        (
                            i.key_pressed(egui::Key::Escape),
                            i.key_pressed(egui::Key::Delete),
                            i.modifiers.command && i.key_pressed(egui::Key::A),
                            i.modifiers.command && i.key_pressed(egui::Key::Z),
                            tool,
                        )
                    });
                    if escape {
                        self.cancel_placement();
                    }
                    if delete {
                        self.delete_selected();
                    }
                    if select_all {
                        self.run_menu_command(ctx, MenuCommand::SelectAll);
                    }
                    if undo {
                        self.run_menu_command(ctx, MenuCommand::Undo);
                    }
                    if let Some(tool) = tool {
                        self.cancel_placement();
                        self.ui_state.set_tool(tool);
                    }
                }

                // ===== 绘制 =====
                let placing = self.placement.as_ref().map(Placement::handle);
                for block in self.drawing.blocks() {
                    if Some(block.handle) == placing || !self.drawing.layers.is_displayed(&block.layer) {
                        continue;
                    }
                    let dashes = self.dash_pattern(&block.line_type, block.line_type_scale);
                    let color = self.block_color(block);
                    self.draw_primitives(&painter, &rect, &block.primitives, dashes.as_ref(), color);
                }

                // 绘制放置预览
                if let Some(placement) = &self.placement {
                    let base = placement.entity().base();
                    let dashes = self.dash_pattern(&base.line_type, base.line_type_scale);
                    self.draw_primitives(
                        &painter,
                        &rect,
                        &base.primitives,
                        dashes.as_ref(),
                        egui::Color32::from_rgb(255, 255, 0),
                    );
                }
            });
    }
}

fn main() -> Result<()> {
    // 初始化日志
    tracing::subscriber::set_global_default(FmtSubscriber::builder().with_max_level(Level::INFO).finish())?;

    let data_dir = DataDir::discover();
    info!("Starting ESKD with data directory {}", data_dir.root().display());

    let native_options = eframe::NativeOptions {
        viewport: egui::ViewportBuilder::default()
            .with_inner_size([1400.0, 900.0])
            .with_title("ESKD"),
        ..Default::default()
    };

    eframe::run_native(
        "ESKD",
        native_options,
        Box::new(|_cc| Ok(Box::new(EskdApp::new(data_dir)))),
    )
    .map_err(|e| anyhow::anyhow!("eframe error: {}", e))?;

    Ok(())
}
