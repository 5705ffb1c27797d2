//! 实体放置
//!
//! 放置分两步：给出插入点后立即创建宿主块并以占位图形显示，随光标移动预览，
//! 给出定义点后完成。取消时删除已创建的块，不留下无效的占位对象。

use crate::context::EditContext;
use crate::drawing::{Drawing, HostError};
use crate::entities::SmartEntity;
use crate::handle::EntityHandle;
use crate::localization::Localizer;
use crate::math::Point2;
use crate::reader::write_entity;
use crate::registry::EntityKind;
use crate::report::ErrorReporter;
use crate::settings::UserSettings;
use crate::style_store::{apply_style, StyleRepository, StyleStore};

/// 放置状态
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PlacementState {
    /// 等待定义点
    Dragging,
    Finished,
    Cancelled,
}

/// 一次进行中的放置
#[derive(Debug, Clone)]
pub struct Placement {
    entity: SmartEntity,
    handle: EntityHandle,
    state: PlacementState,
}

impl Placement {
    /// 在插入点创建实体，应用当前样式并写入占位图形
    pub fn begin(kind: EntityKind, insertion_point: Point2, ctx: &mut EditContext<'_>) -> Result<Self, HostError> {
        let mut entity = SmartEntity::new(kind, insertion_point);
        entity.base_mut().layer_name = ctx.drawing.layers.current_layer().name.clone();

        let style = ctx.styles.current_style(kind, ctx.settings);
        let (settings, localizer) = (ctx.settings, ctx.localizer);
        let reporter = &mut *ctx.reporter;
        let handle = ctx.drawing.transaction(&format!("Place {}", kind), |drawing| {
            let report = apply_style(&mut entity, style, true, drawing, settings, localizer);
            if !report.skipped.is_empty() {
                tracing::debug!("Placement of {}: skipped {:?}", kind, report.skipped);
            }
            entity.update_geometry(reporter);
            write_entity(drawing, &mut entity)
        })?;
        tracing::info!("Placing {} as {}", kind, handle);
        Ok(Self {
            entity,
            handle,
            state: PlacementState::Dragging,
        })
    }

    /// 先从仓库重新加载该类型的样式，再以当前样式开始放置
    ///
    /// 样式文件可能已被其他会话修改；读取失败时使用内存中的样式。
    #[allow(clippy::too_many_arguments)]
    pub fn begin_with_reload(
        kind: EntityKind,
        insertion_point: Point2,
        styles: &mut StyleStore,
        repository: &dyn StyleRepository,
        drawing: &mut Drawing,
        settings: &UserSettings,
        localizer: &dyn Localizer,
        reporter: &mut dyn ErrorReporter,
    ) -> Result<Self, HostError> {
        let style = styles.resolve_current_style(kind, settings, repository, localizer);
        tracing::debug!("Current {} style: {} ({})", kind, style.name, style.guid);
        let mut ctx = EditContext::new(drawing, styles, settings, localizer, reporter);
        Self::begin(kind, insertion_point, &mut ctx)
    }

    pub fn entity(&self) -> &SmartEntity {
        &self.entity
    }

    pub fn handle(&self) -> EntityHandle {
        self.handle
    }

    pub fn state(&self) -> PlacementState {
        self.state
    }

    /// 随光标更新预览图形，不写入图纸
    pub fn preview(&mut self, cursor: Point2, ctx: &mut EditContext<'_>) {
        if self.state != PlacementState::Dragging {
            return;
        }
        self.entity.set_end_point(cursor);
        self.entity.update_geometry(ctx.reporter);
    }

    /// 以定义点完成放置
    pub fn finish(&mut self, point: Point2, ctx: &mut EditContext<'_>) -> Result<EntityHandle, HostError> {
        self.entity.set_end_point(point);
        self.entity.update_geometry(ctx.reporter);
        let entity = &mut self.entity;
        ctx.drawing
            .transaction("Finish placement", |drawing| write_entity(drawing, entity))?;
        self.state = PlacementState::Finished;
        Ok(self.handle)
    }

    /// 取消放置并删除已创建的块
    pub fn cancel(&mut self, ctx: &mut EditContext<'_>) -> Result<(), HostError> {
        if self.state == PlacementState::Dragging {
            let handle = self.handle;
            ctx.drawing
                .transaction("Cancel placement", |drawing| drawing.erase(handle))?;
            self.state = PlacementState::Cancelled;
            tracing::info!("Placement of {} cancelled", self.handle);
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::drawing::Drawing;
    use crate::entities::ReconstructionState;
    use crate::localization::BuiltinLocalizer;
    use crate::reader::{list_entities, read_entity};
    use crate::report::RecordingReporter;
    use crate::settings::UserSettings;
    use crate::style_store::StyleStore;
    use crate::value::PropertyValue;

    #[test]
    fn test_begin_preview_finish() {
        let loc = BuiltinLocalizer::english();
        let mut drawing = Drawing::new();
        let mut styles = StyleStore::new(&loc);
        let mut settings = UserSettings::default();
        let mut reporter = RecordingReporter::new();

        let guid = styles.create(EntityKind::BreakLine, "Tall", &loc);
        styles
            .style_mut(EntityKind::BreakLine, guid)
            .unwrap()
            .set_value("BreakHeight", PropertyValue::Int(12))
            .unwrap();
        styles.set_current(EntityKind::BreakLine, guid, &mut settings).unwrap();

        let mut ctx = EditContext::new(&mut drawing, &styles, &settings, &loc, &mut reporter);
        let mut placement = Placement::begin(EntityKind::BreakLine, Point2::origin(), &mut ctx).unwrap();
        assert_eq!(placement.entity().state(), ReconstructionState::AwaitingFirstPoint);
        assert!(!ctx.drawing.block(placement.handle()).unwrap().primitives.is_empty());

        placement.preview(Point2::new(40.0, 0.0), &mut ctx);
        assert_eq!(placement.entity().state(), ReconstructionState::Placed);

        let handle = placement.finish(Point2::new(80.0, 0.0), &mut ctx).unwrap();
        assert_eq!(placement.state(), PlacementState::Finished);

        let stored = read_entity(ctx.drawing, handle).unwrap();
        assert_eq!(stored.get("BreakHeight"), Some(PropertyValue::Int(12)));
        assert_eq!(stored.base().style_guid, guid);
        assert_eq!(stored.base().end_point, Some(Point2::new(80.0, 0.0)));
    }

    #[test]
    fn test_cancel_erases_placeholder() {
        let loc = BuiltinLocalizer::english();
        let mut drawing = Drawing::new();
        let styles = StyleStore::new(&loc);
        let settings = UserSettings::default();
        let mut reporter = RecordingReporter::new();
        let mut ctx = EditContext::new(&mut drawing, &styles, &settings, &loc, &mut reporter);

        let mut placement = Placement::begin(EntityKind::Axis, Point2::origin(), &mut ctx).unwrap();
        assert_eq!(list_entities(ctx.drawing).len(), 1);
        placement.cancel(&mut ctx).unwrap();
        assert_eq!(placement.state(), PlacementState::Cancelled);
        assert!(list_entities(ctx.drawing).is_empty());
    }

    #[test]
    fn test_placement_uses_reloaded_current_style() {
        use crate::style_store::{style_to_record, StyleRecord};
        use std::cell::RefCell;

        struct SharedFile(RefCell<Vec<StyleRecord>>);

        impl StyleRepository for SharedFile {
            fn load(&self, _kind: EntityKind) -> Result<Vec<StyleRecord>, crate::style::StyleError> {
                Ok(self.0.borrow().clone())
            }

            fn save(&self, _kind: EntityKind, records: &[StyleRecord]) -> Result<(), crate::style::StyleError> {
                *self.0.borrow_mut() = records.to_vec();
                Ok(())
            }
        }

        let loc = BuiltinLocalizer::english();
        let mut drawing = Drawing::new();
        let mut styles = StyleStore::new(&loc);
        let mut settings = UserSettings::default();
        let mut reporter = RecordingReporter::new();
        let file = SharedFile(RefCell::new(Vec::new()));

        let guid = styles.create(EntityKind::BreakLine, "Shared", &loc);
        styles.set_current(EntityKind::BreakLine, guid, &mut settings).unwrap();
        styles.save_to(EntityKind::BreakLine, &file).unwrap();

        let first = Placement::begin_with_reload(
            EntityKind::BreakLine,
            Point2::origin(),
            &mut styles,
            &file,
            &mut drawing,
            &settings,
            &loc,
            &mut reporter,
        )
        .unwrap();
        assert_eq!(first.entity().get("BreakHeight"), Some(PropertyValue::Int(10)));

        // 两次放置之间样式文件被修改
        let mut edited = style_to_record(styles.find(EntityKind::BreakLine, guid).unwrap());
        for (name, value) in &mut edited.properties {
            if name == "BreakHeight" {
                *value = "12".to_string();
            }
        }
        file.save(EntityKind::BreakLine, &[edited]).unwrap();

        let second = Placement::begin_with_reload(
            EntityKind::BreakLine,
            Point2::new(0.0, 50.0),
            &mut styles,
            &file,
            &mut drawing,
            &settings,
            &loc,
            &mut reporter,
        )
        .unwrap();
        assert_eq!(second.entity().get("BreakHeight"), Some(PropertyValue::Int(12)));
        assert_eq!(second.entity().base().style_guid, guid);
        assert_eq!(
            read_entity(&drawing, second.handle()).unwrap().get("BreakHeight"),
            Some(PropertyValue::Int(12))
        );
    }
}
