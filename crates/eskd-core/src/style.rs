//! 样式
//!
//! 样式是某一实体类型的一组命名参数模板。每种实体类型总有一个系统样式，
//! 其 guid 固定为全零，参数取元数据默认值，不可修改、重命名或删除。
//! 用户样式可以附带图层和文字样式的描述，用于在图纸中缺少这些资源时创建它们。

use crate::drawing::{Drawing, TextStyle};
use crate::entities::SmartEntity;
use crate::instance::{PropertyError, PropertyInstance};
use crate::layer::Layer;
use crate::localization::{keys, Localizer};
use crate::metadata::PropertyMetadata;
use crate::registry::EntityKind;
use crate::value::PropertyValue;
use uuid::Uuid;

/// 样式类型
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum StyleType {
    System,
    User,
}

/// 样式操作错误
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum StyleError {
    #[error("Style not found: {0}")]
    NotFound(Uuid),

    #[error("System style cannot be modified")]
    SystemStyleReadOnly,

    #[error("Duplicate style names for {kind}: {names:?}")]
    DuplicateNames { kind: EntityKind, names: Vec<String> },

    #[error("Property error: {0}")]
    Property(#[from] PropertyError),

    #[error("Style storage error: {0}")]
    Storage(String),
}

/// 样式
#[derive(Debug, Clone)]
pub struct Style {
    pub guid: Uuid,
    pub name: String,
    pub description: String,
    pub style_type: StyleType,
    pub kind: EntityKind,
    /// 按元数据顺序排列，所属者均为空
    pub properties: Vec<PropertyInstance>,
    /// 附带的图层描述
    pub layer: Option<Layer>,
    /// 附带的文字样式描述
    pub text_style: Option<TextStyle>,
}

/// 样式中 "LayerName" 的默认值：本地化的"默认图层"
pub fn default_layer_label(localizer: &dyn Localizer) -> String {
    localizer.get(keys::DEFAULT_LAYER)
}

fn style_default(meta: &PropertyMetadata, localizer: &dyn Localizer) -> PropertyValue {
    match (meta.name, &meta.default_value) {
        ("LayerName", PropertyValue::String(s)) if s.is_empty() => {
            PropertyValue::String(default_layer_label(localizer))
        }
        _ => meta.default_value.clone(),
    }
}

/// 参与样式的元数据
pub fn style_metadata(kind: EntityKind) -> impl Iterator<Item = &'static PropertyMetadata> {
    kind.metadata().iter().filter(|m| m.in_style())
}

impl Style {
    /// 实体类型的系统样式
    pub fn system(kind: EntityKind, localizer: &dyn Localizer) -> Self {
        let mut style = Self {
            guid: Uuid::nil(),
            name: localizer.get(keys::SYSTEM_STYLE),
            description: String::new(),
            style_type: StyleType::System,
            kind,
            properties: Vec::new(),
            layer: None,
            text_style: None,
        };
        style.fill_defaults(localizer);
        style
    }

    /// 以默认值创建用户样式
    pub fn new_user(kind: EntityKind, name: impl Into<String>, localizer: &dyn Localizer) -> Self {
        let mut style = Self {
            guid: Uuid::new_v4(),
            name: name.into(),
            description: String::new(),
            style_type: StyleType::User,
            kind,
            properties: Vec::new(),
            layer: None,
            text_style: None,
        };
        style.fill_defaults(localizer);
        style
    }

    /// 以实体当前参数创建用户样式，并附带实体所在图层和文字样式的描述
    pub fn from_entity(
        entity: &SmartEntity,
        name: impl Into<String>,
        drawing: &Drawing,
        localizer: &dyn Localizer,
    ) -> Self {
        let kind = entity.kind();
        let mut style = Self::new_user(kind, name, localizer);
        for instance in &mut style.properties {
            if let Some(value) = entity.get(instance.name()) {
                if let Err(e) = instance.set_value(value) {
                    tracing::warn!("Style from entity: {} skipped: {}", instance.name(), e);
                }
            }
        }

        style.layer = drawing.layers.get_layer(&entity.base().layer_name).cloned();
        style.text_style = entity
            .get("TextStyle")
            .and_then(|v| v.as_str().map(str::to_string))
            .and_then(|name| drawing.text_styles().iter().find(|t| t.name == name).cloned());
        style
    }

    /// 复制为新的用户样式
    pub fn duplicate(&self, name: impl Into<String>) -> Self {
        Self {
            guid: Uuid::new_v4(),
            name: name.into(),
            style_type: StyleType::User,
            ..self.clone()
        }
    }

    pub fn is_system(&self) -> bool {
        self.style_type == StyleType::System
    }

    /// 重新以默认值填充全部参数
    pub fn fill_defaults(&mut self, localizer: &dyn Localizer) {
        let kind = self.kind;
        self.properties = style_metadata(kind)
            .map(|meta| {
                let mut instance = PropertyInstance::with_default(meta, kind, None);
                // 类型与默认值一致，不会失败
                let _ = instance.set_value(style_default(meta, localizer));
                instance
            })
            .collect();
    }

    /// 补齐缺少的参数，去掉不再参与样式的参数，并按元数据顺序重新排列
    ///
    /// 返回补齐的参数名称。
    pub fn check_missed_properties(&mut self, localizer: &dyn Localizer) -> Vec<&'static str> {
        let kind = self.kind;
        let mut existing = std::mem::take(&mut self.properties);
        let mut added = Vec::new();

        for meta in style_metadata(kind) {
            match existing.iter().position(|p| p.name() == meta.name) {
                Some(idx) => self.properties.push(existing.swap_remove(idx)),
                None => {
                    let mut instance = PropertyInstance::with_default(meta, kind, None);
                    let _ = instance.set_value(style_default(meta, localizer));
                    self.properties.push(instance);
                    added.push(meta.name);
                }
            }
        }

        for dropped in &existing {
            tracing::debug!("Style {}: dropped property {}", self.name, dropped.name());
        }
        if !added.is_empty() {
            tracing::debug!("Style {}: added missing properties {:?}", self.name, added);
        }
        added
    }

    pub fn property(&self, name: &str) -> Option<&PropertyInstance> {
        self.properties.iter().find(|p| p.name() == name)
    }

    pub fn value(&self, name: &str) -> Option<&PropertyValue> {
        self.property(name).map(PropertyInstance::value)
    }

    /// 修改参数，数值限制在元数据范围内；系统样式不可修改
    pub fn set_value(&mut self, name: &str, value: PropertyValue) -> Result<bool, StyleError> {
        if self.is_system() {
            return Err(StyleError::SystemStyleReadOnly);
        }
        let kind = self.kind;
        let instance = self
            .properties
            .iter_mut()
            .find(|p| p.name() == name)
            .ok_or_else(|| PropertyError::UnknownProperty {
                kind,
                name: name.to_string(),
            })?;
        let value = instance.metadata().clamp(value);
        Ok(instance.set_value(value)?)
    }

    /// 样式中的图层名称；默认图层返回 `None`
    pub fn layer_name(&self, localizer: &dyn Localizer) -> Option<&str> {
        self.value("LayerName")
            .and_then(PropertyValue::as_str)
            .filter(|name| !name.is_empty() && *name != default_layer_label(localizer))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::localization::BuiltinLocalizer;
    use crate::math::Point2;

    #[test]
    fn test_system_style_uses_defaults() {
        let loc = BuiltinLocalizer::english();
        let style = Style::system(EntityKind::Axis, &loc);

        assert!(style.guid.is_nil());
        assert!(style.is_system());
        assert!(style.property("Style").is_none());
        assert!(style.property("FirstText").is_none(), "palette-only");
        assert!(style.property("AxisStep").is_none(), "hidden");
        assert_eq!(style.value("Fracture"), Some(&PropertyValue::Int(5)));
        assert_eq!(style.value("Scale").and_then(|v| v.as_scale()).map(|s| s.name()), Some("1:1"));
        assert_eq!(style.value("LayerName"), Some(&PropertyValue::from("By default")));
        assert_eq!(style.layer_name(&loc), None);
    }

    #[test]
    fn test_system_style_is_read_only() {
        let loc = BuiltinLocalizer::english();
        let mut style = Style::system(EntityKind::BreakLine, &loc);
        assert_eq!(
            style.set_value("Overhang", PropertyValue::Int(3)),
            Err(StyleError::SystemStyleReadOnly)
        );
    }

    #[test]
    fn test_set_value_clamps() {
        let loc = BuiltinLocalizer::english();
        let mut style = Style::new_user(EntityKind::BreakLine, "Mine", &loc);
        assert_eq!(style.set_value("Overhang", PropertyValue::Int(50)), Ok(true));
        assert_eq!(style.value("Overhang"), Some(&PropertyValue::Int(10)));
        assert!(style.set_value("Overhang", PropertyValue::from("x")).is_err());
    }

    #[test]
    fn test_check_missed_properties_restores_order() {
        let loc = BuiltinLocalizer::english();
        let mut style = Style::new_user(EntityKind::GroundLine, "Old", &loc);
        style.set_value("Space", PropertyValue::Int(15)).unwrap();
        style.properties.retain(|p| p.name() != "StrokeAngle");
        style.properties.reverse();

        let added = style.check_missed_properties(&loc);
        assert_eq!(added, vec!["StrokeAngle"]);
        let names: Vec<_> = style.properties.iter().map(|p| p.name()).collect();
        let expected: Vec<_> = style_metadata(EntityKind::GroundLine).map(|m| m.name).collect();
        assert_eq!(names, expected);
        assert_eq!(style.value("Space"), Some(&PropertyValue::Int(15)));
        assert_eq!(style.value("StrokeAngle"), Some(&PropertyValue::Int(60)));
    }

    #[test]
    fn test_from_entity_copies_parameters_and_layer() {
        let loc = BuiltinLocalizer::english();
        let mut drawing = Drawing::new();
        drawing.add_layer(Layer::new("Axes")).unwrap();

        let mut entity = SmartEntity::new(EntityKind::Axis, Point2::origin());
        entity.set("MarkersCount", &PropertyValue::Int(2)).unwrap();
        entity.base_mut().layer_name = "Axes".to_string();

        let style = Style::from_entity(&entity, "From axis", &drawing, &loc);
        assert_eq!(style.style_type, StyleType::User);
        assert_eq!(style.value("MarkersCount"), Some(&PropertyValue::Int(2)));
        assert_eq!(style.layer_name(&loc), Some("Axes"));
        assert_eq!(style.layer.as_ref().map(|l| l.name.as_str()), Some("Axes"));
        assert_eq!(style.text_style.as_ref().map(|t| t.name.as_str()), Some("Standard"));
    }
}
