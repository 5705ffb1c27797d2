//! 实体属性提供器
//!
//! 为一个已放置的实体生成面板可见的属性实例，并在两个方向之间同步：
//!
//! - 界面编辑：新值写回实体，重建几何，重新编码扩展数据记录并写回块；
//! - 外部修改（撤销、拖动）：重新读取实体，只更新属性实例，不触发写回。
//!
//! 外部修改期间提供器处于 [`SyncState::ApplyingExternalUpdate`]，此时来自界面的
//! 写入一律被拒绝。

use crate::context::EditContext;
use crate::drawing::{Drawing, HostError, HostEvent};
use crate::entities::SmartEntity;
use crate::handle::EntityHandle;
use crate::instance::PropertyInstance;
use crate::metadata::PropertyMetadata;
use crate::reader::{read_entity, write_entity};
use crate::registry::EntityKind;
use crate::style_store::{apply_style, StyleStore};
use crate::value::PropertyValue;

/// 同步状态
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SyncState {
    Idle,
    ApplyingExternalUpdate,
}

/// 一次编辑的结果
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EditOutcome {
    /// 新值与当前值相同
    Unchanged,
    Applied,
    /// 实体所在图层锁定，未修改
    LayerLocked,
    /// 正在应用外部修改，写入被拒绝
    Suppressed,
    /// 值无效或提供器无效，错误已报告
    Rejected,
}

/// 实体属性提供器
#[derive(Debug, Clone)]
pub struct EntityPropertyProvider {
    handle: EntityHandle,
    entity: Option<SmartEntity>,
    properties: Vec<PropertyInstance>,
    state: SyncState,
}

impl EntityPropertyProvider {
    /// 读取实体并生成属性实例；句柄无效时得到一个无效的提供器
    pub fn new(handle: EntityHandle, drawing: &Drawing, styles: &StyleStore) -> Self {
        let mut provider = Self {
            handle,
            entity: None,
            properties: Vec::new(),
            state: SyncState::Idle,
        };
        match read_entity(drawing, handle) {
            Ok(entity) => {
                provider.properties = build_instances(&entity, handle, styles);
                provider.entity = Some(entity);
            }
            Err(e) => tracing::warn!("Provider for {} is invalid: {}", handle, e),
        }
        provider
    }

    pub fn is_valid(&self) -> bool {
        self.entity.is_some()
    }

    pub fn handle(&self) -> EntityHandle {
        self.handle
    }

    pub fn kind(&self) -> Option<EntityKind> {
        self.entity.as_ref().map(SmartEntity::kind)
    }

    pub fn entity(&self) -> Option<&SmartEntity> {
        self.entity.as_ref()
    }

    pub fn state(&self) -> SyncState {
        self.state
    }

    /// 面板可见的属性实例，按元数据声明顺序
    pub fn properties(&self) -> &[PropertyInstance] {
        &self.properties
    }

    pub fn property(&self, name: &str) -> Option<&PropertyInstance> {
        self.properties.iter().find(|p| p.name() == name)
    }

    /// 是否因所在图层锁定而无法修改
    pub fn is_on_locked_layer(&self, drawing: &Drawing) -> bool {
        self.entity
            .as_ref()
            .map(|e| drawing.layers.is_locked(&e.base().layer_name))
            .unwrap_or(false)
    }

    /// 界面编辑：写回实体、重建几何、写回块
    pub fn set_value(&mut self, name: &str, value: PropertyValue, ctx: &mut EditContext<'_>) -> EditOutcome {
        if self.state == SyncState::ApplyingExternalUpdate {
            tracing::debug!("{}: write of {} suppressed during external update", self.handle, name);
            return EditOutcome::Suppressed;
        }
        let Some(current) = self.entity.as_ref() else {
            return EditOutcome::Rejected;
        };
        let Some(instance) = self.properties.iter().find(|p| p.name() == name) else {
            tracing::warn!("{}: no visible property {}", self.handle, name);
            return EditOutcome::Rejected;
        };
        let meta: &'static PropertyMetadata = instance.metadata();
        if !meta.accepts(&value) {
            tracing::warn!("{}: {} rejects {:?}", self.handle, name, value);
            return EditOutcome::Rejected;
        }
        let value = meta.clamp(value);
        if instance.value() == &value {
            return EditOutcome::Unchanged;
        }
        if ctx.drawing.layers.is_locked(&current.base().layer_name) {
            return EditOutcome::LayerLocked;
        }

        let mut entity = current.clone();
        if meta.name == "Style" {
            let style_name = value.as_str().unwrap_or_default();
            let Some(style) = ctx.styles.find_by_name(entity.kind(), style_name) else {
                tracing::warn!("{}: style {} not found", self.handle, style_name);
                return EditOutcome::Rejected;
            };
            apply_style(&mut entity, style, false, ctx.drawing, ctx.settings, ctx.localizer);
        } else if let Err(e) = entity.set(meta.name, &value) {
            ctx.reporter.report("Property edit", &e);
            return EditOutcome::Rejected;
        }

        entity.update_geometry(ctx.reporter);
        let description = format!("Set {}", name);
        match ctx.drawing.transaction(&description, |d| write_entity(d, &mut entity)) {
            Ok(_) => {}
            Err(HostError::LayerLocked(layer)) => {
                tracing::warn!("{}: layer {} is locked", self.handle, layer);
                return EditOutcome::LayerLocked;
            }
            Err(e) => {
                ctx.reporter.report("Write entity", &e);
                return EditOutcome::Rejected;
            }
        }

        self.properties = build_instances(&entity, self.handle, ctx.styles);
        self.entity = Some(entity);
        // 自己写入产生的事件不需要再回读
        ctx.drawing.discard_events_for(self.handle);
        EditOutcome::Applied
    }

    /// 进入外部修改状态
    pub fn begin_external_update(&mut self) {
        self.state = SyncState::ApplyingExternalUpdate;
    }

    /// 退出外部修改状态
    pub fn end_external_update(&mut self) {
        self.state = SyncState::Idle;
    }

    /// 外部修改后重新读取实体，只更新属性实例
    ///
    /// 返回发生变化的属性名称。实体已被删除时提供器变为无效。
    pub fn apply_external_update(&mut self, drawing: &Drawing, styles: &StyleStore) -> Vec<&'static str> {
        self.begin_external_update();
        let changed = self.reread(drawing, styles);
        self.end_external_update();
        changed
    }

    fn reread(&mut self, drawing: &Drawing, styles: &StyleStore) -> Vec<&'static str> {
        let entity = match read_entity(drawing, self.handle) {
            Ok(entity) => entity,
            Err(e) => {
                tracing::debug!("{} invalidated: {}", self.handle, e);
                self.entity = None;
                self.properties.clear();
                return Vec::new();
            }
        };

        let mut changed = Vec::new();
        for (meta, value) in visible_values(&entity, styles) {
            if let Some(instance) = self.properties.iter_mut().find(|p| p.name() == meta.name) {
                match instance.set_value(value) {
                    Ok(true) => changed.push(meta.name),
                    Ok(false) => {}
                    Err(e) => tracing::warn!("{}: {} not refreshed: {}", self.handle, meta.name, e),
                }
            }
        }
        self.entity = Some(entity);
        changed
    }

    /// 处理宿主事件，返回是否与本提供器相关
    pub fn handle_event(&mut self, event: &HostEvent, drawing: &Drawing, styles: &StyleStore) -> bool {
        if event.handle() != self.handle {
            return false;
        }
        match event {
            HostEvent::Erased(_) => {
                self.entity = None;
                self.properties.clear();
            }
            HostEvent::Added(_) | HostEvent::Modified(_) => {
                self.apply_external_update(drawing, styles);
            }
        }
        true
    }
}

/// 面板可见属性的当前值；"Style" 的值是样式名称
fn visible_values(entity: &SmartEntity, styles: &StyleStore) -> Vec<(&'static PropertyMetadata, PropertyValue)> {
    let kind = entity.kind();
    kind.metadata()
        .iter()
        .filter(|m| m.scope.in_palette())
        .filter_map(|meta| {
            let value = if meta.name == "Style" {
                let style = styles
                    .find(kind, entity.base().style_guid)
                    .unwrap_or_else(|| styles.system_style(kind));
                PropertyValue::String(style.name.clone())
            } else {
                entity.get(meta.name)?
            };
            Some((meta, value))
        })
        .collect()
}

fn build_instances(entity: &SmartEntity, handle: EntityHandle, styles: &StyleStore) -> Vec<PropertyInstance> {
    let kind = entity.kind();
    visible_values(entity, styles)
        .into_iter()
        .filter_map(|(meta, value)| match PropertyInstance::new(meta, kind, value, Some(handle)) {
            Ok(instance) => Some(instance),
            Err(e) => {
                tracing::warn!("{}: {} skipped: {}", handle, meta.name, e);
                None
            }
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::drawing::HostBlock;
    use crate::layer::Layer;
    use crate::localization::BuiltinLocalizer;
    use crate::math::Point2;
    use crate::report::RecordingReporter;
    use crate::settings::UserSettings;

    struct Fixture {
        drawing: Drawing,
        styles: StyleStore,
        settings: UserSettings,
        localizer: BuiltinLocalizer,
        reporter: RecordingReporter,
    }

    impl Fixture {
        fn new() -> Self {
            let localizer = BuiltinLocalizer::english();
            Self {
                drawing: Drawing::new(),
                styles: StyleStore::new(&localizer),
                settings: UserSettings::default(),
                localizer,
                reporter: RecordingReporter::new(),
            }
        }

        fn place(&mut self, kind: EntityKind) -> EntityHandle {
            let mut entity = SmartEntity::new(kind, Point2::origin());
            entity.set_end_point(Point2::new(100.0, 0.0));
            entity.update_geometry(&mut self.reporter);
            write_entity(&mut self.drawing, &mut entity).unwrap()
        }

        fn ctx(&mut self) -> EditContext<'_> {
            EditContext::new(
                &mut self.drawing,
                &self.styles,
                &self.settings,
                &self.localizer,
                &mut self.reporter,
            )
        }
    }

    #[test]
    fn test_provider_exposes_palette_properties() {
        let mut fx = Fixture::new();
        let handle = fx.place(EntityKind::Axis);
        let provider = EntityPropertyProvider::new(handle, &fx.drawing, &fx.styles);

        assert!(provider.is_valid());
        assert_eq!(provider.property("Style").unwrap().value(), &PropertyValue::from("Basic"));
        assert!(provider.property("FirstText").is_some());
        assert!(provider.property("AxisStep").is_none());
        assert!(provider.properties().iter().all(|p| p.owner() == Some(handle)));
    }

    #[test]
    fn test_invalid_handle_gives_invalid_provider() {
        let mut fx = Fixture::new();
        let plain = HostBlock::new(EntityHandle::new(), Point2::origin());
        let handle = plain.handle;
        fx.drawing.write_block(plain).unwrap();

        let provider = EntityPropertyProvider::new(handle, &fx.drawing, &fx.styles);
        assert!(!provider.is_valid());
        assert!(provider.properties().is_empty());

        let mut provider = EntityPropertyProvider::new(EntityHandle::NULL, &fx.drawing, &fx.styles);
        assert_eq!(provider.set_value("Scale", PropertyValue::Int(1), &mut fx.ctx()), EditOutcome::Rejected);
    }

    #[test]
    fn test_edit_writes_back_and_rebuilds() {
        let mut fx = Fixture::new();
        let handle = fx.place(EntityKind::BreakLine);
        let mut provider = EntityPropertyProvider::new(handle, &fx.drawing, &fx.styles);
        let before = fx.drawing.block(handle).unwrap().primitives.clone();

        let outcome = provider.set_value("Overhang", PropertyValue::Int(8), &mut fx.ctx());
        assert_eq!(outcome, EditOutcome::Applied);
        assert_eq!(provider.property("Overhang").unwrap().int_value(), Some(8));

        let stored = read_entity(&fx.drawing, handle).unwrap();
        assert_eq!(stored.get("Overhang"), Some(PropertyValue::Int(8)));
        assert_ne!(fx.drawing.block(handle).unwrap().primitives, before);

        assert_eq!(
            provider.set_value("Overhang", PropertyValue::Int(8), &mut fx.ctx()),
            EditOutcome::Unchanged
        );
    }

    #[test]
    fn test_locked_layer_refuses_edit() {
        let mut fx = Fixture::new();
        let handle = fx.place(EntityKind::GroundLine);
        fx.drawing.add_layer(Layer::new("L")).unwrap();
        let mut block = fx.drawing.block(handle).unwrap().clone();
        block.layer = "L".to_string();
        fx.drawing.write_block(block).unwrap();
        fx.drawing.set_layer_locked("L", true).unwrap();

        let mut provider = EntityPropertyProvider::new(handle, &fx.drawing, &fx.styles);
        assert_eq!(
            provider.set_value("Space", PropertyValue::Int(5), &mut fx.ctx()),
            EditOutcome::LayerLocked
        );
        assert_eq!(provider.property("Space").unwrap().int_value(), Some(10));
    }

    #[test]
    fn test_external_update_does_not_write_back() {
        let mut fx = Fixture::new();
        let handle = fx.place(EntityKind::BreakLine);
        let mut provider = EntityPropertyProvider::new(handle, &fx.drawing, &fx.styles);
        provider.set_value("BreakWidth", PropertyValue::Int(9), &mut fx.ctx());
        let undo_depth = fx.drawing.undo_count();

        fx.drawing.undo().unwrap();
        for event in fx.drawing.take_events() {
            provider.handle_event(&event, &fx.drawing, &fx.styles);
        }
        assert_eq!(provider.property("BreakWidth").unwrap().int_value(), Some(5));
        assert_eq!(provider.state(), SyncState::Idle);
        assert_eq!(fx.drawing.undo_count(), undo_depth - 1);

        provider.begin_external_update();
        assert_eq!(
            provider.set_value("BreakWidth", PropertyValue::Int(3), &mut fx.ctx()),
            EditOutcome::Suppressed
        );
        provider.end_external_update();
    }

    #[test]
    fn test_style_property_applies_style_by_name() {
        let mut fx = Fixture::new();
        let handle = fx.place(EntityKind::BreakLine);
        let guid = fx.styles.create(EntityKind::BreakLine, "Wide", &fx.localizer);
        fx.styles
            .style_mut(EntityKind::BreakLine, guid)
            .unwrap()
            .set_value("BreakWidth", PropertyValue::Int(10))
            .unwrap();

        let mut provider = EntityPropertyProvider::new(handle, &fx.drawing, &fx.styles);
        let outcome = provider.set_value("Style", PropertyValue::from("Wide"), &mut fx.ctx());
        assert_eq!(outcome, EditOutcome::Applied);
        assert_eq!(provider.property("Style").unwrap().value(), &PropertyValue::from("Wide"));
        assert_eq!(provider.property("BreakWidth").unwrap().int_value(), Some(10));
        assert_eq!(provider.entity().unwrap().base().style_guid, guid);

        assert_eq!(
            provider.set_value("Style", PropertyValue::from("Missing"), &mut fx.ctx()),
            EditOutcome::Rejected
        );
    }

    #[test]
    fn test_erase_invalidates_provider() {
        let mut fx = Fixture::new();
        let handle = fx.place(EntityKind::Axis);
        let mut provider = EntityPropertyProvider::new(handle, &fx.drawing, &fx.styles);
        fx.drawing.take_events();
        fx.drawing.erase(handle).unwrap();
        for event in fx.drawing.take_events() {
            assert!(provider.handle_event(&event, &fx.drawing, &fx.styles));
        }
        assert!(!provider.is_valid());
    }
}
