//! 多选汇总
//!
//! 把多个提供器中同一实体类型、同名、同值类型、同类别的属性实例合并为一个
//! 汇总属性。不同实体类型各自成组，不会互相合并。
//!
//! 汇总值的规则：
//! - 没有成员：[`SummaryValue::Undefined`]；
//! - 所有成员相等（实数差不超过 1e-6，比例按名称比较）：该值；
//! - 否则：[`SummaryValue::Different`]。整数/实数/布尔的类型化视图在不同时返回 `None`。
//!
//! 写入汇总值时先把数值限制在所有成员范围的交集内，再写给每个成员。
//! 有成员因图层锁定未写入时，整批写入结束后只提示一次并刷新全部提供器。

use crate::context::EditContext;
use crate::drawing::Drawing;
use crate::enum_converter::EnumConverter;
use crate::handle::EntityHandle;
use crate::instance::PropertyError;
use crate::localization::{keys, Localizer};
use crate::math::values_close;
use crate::metadata::{PropertyCategory, PropertyMetadata};
use crate::provider::{EditOutcome, EntityPropertyProvider};
use crate::registry::EntityKind;
use crate::scale::AnnotationScale;
use crate::style_store::StyleStore;
use crate::value::{PropertyValue, ValueKind};

/// 分组键
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SummaryKey {
    pub category: PropertyCategory,
    pub kind: EntityKind,
    pub name: &'static str,
    pub value_kind: ValueKind,
}

/// 汇总值
#[derive(Debug, Clone, PartialEq)]
pub enum SummaryValue {
    Undefined,
    Different,
    Value(PropertyValue),
}

impl SummaryValue {
    pub fn value(&self) -> Option<&PropertyValue> {
        match self {
            SummaryValue::Value(v) => Some(v),
            _ => None,
        }
    }
}

/// 汇总属性
#[derive(Debug, Clone)]
pub struct SummaryProperty {
    key: SummaryKey,
    metadata: &'static PropertyMetadata,
    /// 成员提供器的下标
    members: Vec<usize>,
    converter: EnumConverter,
}

impl SummaryProperty {
    pub fn key(&self) -> &SummaryKey {
        &self.key
    }

    pub fn metadata(&self) -> &'static PropertyMetadata {
        self.metadata
    }

    pub fn name(&self) -> &'static str {
        self.key.name
    }

    pub fn member_count(&self) -> usize {
        self.members.len()
    }
}

/// 同一实体类型的汇总属性，按类别和顺序排列
#[derive(Debug, Clone)]
pub struct SummaryGroup {
    pub kind: EntityKind,
    pub properties: Vec<SummaryProperty>,
}

impl SummaryGroup {
    pub fn find(&self, name: &str) -> Option<&SummaryProperty> {
        self.properties.iter().find(|p| p.key.name == name)
    }
}

/// 一批写入的结果
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct BatchOutcome {
    pub applied: usize,
    pub unchanged: usize,
    pub locked: usize,
    pub rejected: usize,
    /// 因锁定图层刷新了全部提供器
    pub refreshed: bool,
}

/// 多选汇总器
#[derive(Debug, Clone, Default)]
pub struct SummaryAggregator {
    providers: Vec<EntityPropertyProvider>,
    groups: Vec<SummaryGroup>,
}

impl SummaryAggregator {
    /// 为选中的实体创建汇总，无效的实体被忽略
    pub fn new(handles: &[EntityHandle], drawing: &Drawing, styles: &StyleStore) -> Self {
        let providers = handles
            .iter()
            .map(|h| EntityPropertyProvider::new(*h, drawing, styles))
            .collect();
        Self::from_providers(providers)
    }

    pub fn from_providers(providers: Vec<EntityPropertyProvider>) -> Self {
        let mut aggregator = Self {
            providers: providers.into_iter().filter(|p| p.is_valid()).collect(),
            groups: Vec::new(),
        };
        aggregator.rebuild_groups();
        aggregator
    }

    fn rebuild_groups(&mut self) {
        self.providers.retain(|p| p.is_valid());
        self.groups.clear();

        for kind in EntityKind::ALL {
            let member_idx: Vec<usize> = self
                .providers
                .iter()
                .enumerate()
                .filter(|(_, p)| p.kind() == Some(kind))
                .map(|(i, _)| i)
                .collect();
            if member_idx.is_empty() {
                continue;
            }

            let mut properties: Vec<SummaryProperty> = Vec::new();
            for &i in &member_idx {
                for instance in self.providers[i].properties() {
                    let meta = instance.metadata();
                    let key = SummaryKey {
                        category: meta.category,
                        kind,
                        name: meta.name,
                        value_kind: instance.value().kind(),
                    };
                    match properties.iter_mut().find(|p| p.key == key) {
                        Some(existing) => existing.members.push(i),
                        None => properties.push(SummaryProperty {
                            key,
                            metadata: meta,
                            members: vec![i],
                            converter: EnumConverter::new(),
                        }),
                    }
                }
            }
            properties.sort_by_key(|p| (p.key.category, p.metadata.order_index));
            self.groups.push(SummaryGroup { kind, properties });
        }
    }

    pub fn groups(&self) -> &[SummaryGroup] {
        &self.groups
    }

    pub fn providers(&self) -> &[EntityPropertyProvider] {
        &self.providers
    }

    pub fn is_empty(&self) -> bool {
        self.providers.is_empty()
    }

    pub fn find(&self, kind: EntityKind, name: &str) -> Option<&SummaryProperty> {
        self.groups
            .iter()
            .find(|g| g.kind == kind)
            .and_then(|g| g.find(name))
    }

    fn find_mut(&mut self, kind: EntityKind, name: &str) -> Option<&mut SummaryProperty> {
        self.groups
            .iter_mut()
            .find(|g| g.kind == kind)
            .and_then(|g| g.properties.iter_mut().find(|p| p.key.name == name))
    }

    fn member_values<'a>(&'a self, property: &SummaryProperty) -> Vec<&'a PropertyValue> {
        property
            .members
            .iter()
            .filter_map(|&i| self.providers.get(i))
            .filter_map(|p| p.property(property.key.name))
            .map(|instance| instance.value())
            .collect()
    }

    /// 汇总值
    pub fn summary_value(&self, kind: EntityKind, name: &str) -> SummaryValue {
        let Some(property) = self.find(kind, name) else {
            return SummaryValue::Undefined;
        };
        let values = self.member_values(property);
        let Some(first) = values.first() else {
            return SummaryValue::Undefined;
        };
        let doubles: Vec<f64> = values.iter().filter_map(|v| v.as_double()).collect();
        let agreed = if doubles.len() == values.len() && matches!(first, PropertyValue::Double(_)) {
            let min = doubles.iter().copied().fold(f64::INFINITY, f64::min);
            let max = doubles.iter().copied().fold(f64::NEG_INFINITY, f64::max);
            values_close(min, max)
        } else {
            values.iter().all(|v| same_value(first, v))
        };
        if agreed {
            SummaryValue::Value((*first).clone())
        } else {
            SummaryValue::Different
        }
    }

    /// 实数视图，值不同或无成员时为 `None`
    pub fn summary_double(&self, kind: EntityKind, name: &str) -> Option<f64> {
        self.summary_value(kind, name).value().and_then(PropertyValue::as_double)
    }

    /// 整数视图，值不同或无成员时为 `None`
    pub fn summary_int(&self, kind: EntityKind, name: &str) -> Option<i32> {
        self.summary_value(kind, name).value().and_then(PropertyValue::as_int)
    }

    /// 布尔视图，三态复选框在 `None` 时显示为不确定
    pub fn summary_bool(&self, kind: EntityKind, name: &str) -> Option<bool> {
        self.summary_value(kind, name).value().and_then(PropertyValue::as_bool)
    }

    /// 所有成员范围的交集
    pub fn range(&self, kind: EntityKind, name: &str) -> (Option<f64>, Option<f64>) {
        let Some(property) = self.find(kind, name) else {
            return (None, None);
        };
        let metas = property
            .members
            .iter()
            .filter_map(|&i| self.providers.get(i))
            .filter_map(|p| p.property(name))
            .map(|instance| instance.metadata());

        let mut minimum: Option<f64> = None;
        let mut maximum: Option<f64> = None;
        for meta in metas {
            if let Some(min) = meta.minimum {
                minimum = Some(minimum.map_or(min, |m| m.max(min)));
            }
            if let Some(max) = meta.maximum {
                maximum = Some(maximum.map_or(max, |m| m.min(max)));
            }
        }
        (minimum, maximum)
    }

    /// 面板显示文本
    pub fn display_value(&mut self, kind: EntityKind, name: &str, localizer: &dyn Localizer) -> String {
        let value = self.summary_value(kind, name);
        let Some(property) = self.find_mut(kind, name) else {
            return localizer.get(keys::UNDEFINED);
        };
        match value {
            SummaryValue::Undefined => localizer.get(keys::UNDEFINED),
            SummaryValue::Different => localizer.get(keys::DIFFERENT),
            SummaryValue::Value(PropertyValue::Enum(e)) => property.converter.to_display(&e, localizer),
            SummaryValue::Value(v) => v.to_storage_string(),
        }
    }

    /// 把新值写给每个成员
    pub fn set_summary_value(
        &mut self,
        kind: EntityKind,
        name: &str,
        value: PropertyValue,
        ctx: &mut EditContext<'_>,
    ) -> BatchOutcome {
        let Some(property) = self.find(kind, name) else {
            return BatchOutcome::default();
        };
        if value.kind() != property.key.value_kind {
            tracing::warn!("Summary {}.{} rejects {:?}", kind, name, value);
            return BatchOutcome {
                rejected: property.members.len(),
                ..Default::default()
            };
        }

        let value = clamp_to(value, self.range(kind, name));
        let members = property.members.clone();
        let providers = &mut self.providers;
        let description = format!("Set {} on {} objects", name, members.len());
        // 整批写入是一个撤销步骤，没有任何成员被修改时不提交
        let batch = ctx.drawing.transaction(&description, |drawing| {
            let mut inner = EditContext::new(drawing, ctx.styles, ctx.settings, ctx.localizer, &mut *ctx.reporter);
            let mut outcome = BatchOutcome::default();
            for i in members {
                let Some(provider) = providers.get_mut(i) else {
                    continue;
                };
                match provider.set_value(name, value.clone(), &mut inner) {
                    EditOutcome::Applied => outcome.applied += 1,
                    EditOutcome::Unchanged => outcome.unchanged += 1,
                    EditOutcome::LayerLocked => outcome.locked += 1,
                    EditOutcome::Suppressed | EditOutcome::Rejected => outcome.rejected += 1,
                }
            }
            if outcome.applied > 0 {
                Ok(outcome)
            } else {
                Err(outcome)
            }
        });
        let mut outcome = batch.unwrap_or_else(|outcome| outcome);

        if outcome.locked > 0 {
            ctx.reporter.warn_user(&ctx.localizer.get(keys::LAYER_LOCKED));
            self.refresh(ctx.drawing, ctx.styles);
            outcome.refreshed = true;
        }
        tracing::debug!("Summary {}.{} written: {:?}", kind, name, outcome);
        outcome
    }

    /// 由显示文本写入：比例按名称解析，枚举通过本组的转换器解析
    pub fn set_from_display(
        &mut self,
        kind: EntityKind,
        name: &str,
        text: &str,
        ctx: &mut EditContext<'_>,
    ) -> Result<BatchOutcome, PropertyError> {
        let property = self.find(kind, name).ok_or_else(|| PropertyError::UnknownProperty {
            kind,
            name: name.to_string(),
        })?;
        let invalid = || PropertyError::InvalidValue {
            name: name.to_string(),
            value: text.to_string(),
        };

        let value = match property.key.value_kind {
            ValueKind::Scale => PropertyValue::Scale(AnnotationScale::parse(text).map_err(|_| invalid())?),
            ValueKind::Enum => PropertyValue::Enum(property.converter.from_display(text, ctx.localizer)?),
            _ => property
                .metadata
                .default_value
                .parse_same_kind(text)
                .ok_or_else(invalid)?,
        };
        Ok(self.set_summary_value(kind, name, value, ctx))
    }

    /// 重新读取全部提供器，去掉已失效的实体
    pub fn refresh(&mut self, drawing: &Drawing, styles: &StyleStore) {
        for provider in &mut self.providers {
            provider.apply_external_update(drawing, styles);
        }
        self.rebuild_groups();
    }

    /// 处理宿主的外部修改事件，返回是否有提供器受影响
    pub fn sync_external(&mut self, drawing: &mut Drawing, styles: &StyleStore) -> bool {
        let events = drawing.take_events();
        let mut touched = false;
        for event in &events {
            for provider in &mut self.providers {
                touched |= provider.handle_event(event, drawing, styles);
            }
        }
        if self.providers.iter().any(|p| !p.is_valid()) {
            self.rebuild_groups();
        }
        touched
    }
}

fn same_value(a: &PropertyValue, b: &PropertyValue) -> bool {
    match (a, b) {
        (PropertyValue::Double(x), PropertyValue::Double(y)) => values_close(*x, *y),
        (PropertyValue::Scale(x), PropertyValue::Scale(y)) => x.name() == y.name(),
        _ => a == b,
    }
}

fn clamp_to(value: PropertyValue, (minimum, maximum): (Option<f64>, Option<f64>)) -> PropertyValue {
    let bound = |mut v: f64| {
        if let Some(min) = minimum {
            v = v.max(min);
        }
        if let Some(max) = maximum {
            v = v.min(max);
        }
        v
    };
    match value {
        PropertyValue::Int(v) => PropertyValue::Int(bound(f64::from(v)).round() as i32),
        PropertyValue::Double(v) => PropertyValue::Double(bound(v)),
        other => other,
    }
}
