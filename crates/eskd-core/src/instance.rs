//! 属性实例
//!
//! 属性实例把一条元数据与一个具体值绑定。所属者为空时表示实例属于样式。
//! 赋值返回是否发生变化，调用方据此决定是否回写实体。

use crate::enum_converter::{enum_from_label, ConverterError};
use crate::handle::EntityHandle;
use crate::localization::Localizer;
use crate::metadata::PropertyMetadata;
use crate::registry::EntityKind;
use crate::value::{PropertyValue, ValueKind};

/// 属性操作错误
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum PropertyError {
    #[error("Property {name} expects {expected:?} but got {found:?}")]
    TypeMismatch {
        name: &'static str,
        expected: ValueKind,
        found: ValueKind,
    },

    #[error("Unknown property {name} for {kind}")]
    UnknownProperty { kind: EntityKind, name: String },

    #[error("Invalid value for {name}: {value}")]
    InvalidValue { name: String, value: String },

    #[error(transparent)]
    Enum(#[from] ConverterError),
}

/// 属性实例
#[derive(Debug, Clone)]
pub struct PropertyInstance {
    metadata: &'static PropertyMetadata,
    entity_kind: EntityKind,
    owner: Option<EntityHandle>,
    value: PropertyValue,
}

impl PropertyInstance {
    /// 创建实例，值类型必须与元数据默认值一致
    pub fn new(
        metadata: &'static PropertyMetadata,
        entity_kind: EntityKind,
        value: PropertyValue,
        owner: Option<EntityHandle>,
    ) -> Result<Self, PropertyError> {
        check_type(metadata, &value)?;
        Ok(Self {
            metadata,
            entity_kind,
            owner,
            value,
        })
    }

    /// 以元数据默认值创建实例
    pub fn with_default(
        metadata: &'static PropertyMetadata,
        entity_kind: EntityKind,
        owner: Option<EntityHandle>,
    ) -> Self {
        Self {
            metadata,
            entity_kind,
            owner,
            value: metadata.default_value.clone(),
        }
    }

    /// 由本地化文本创建枚举属性实例
    pub fn from_enum_label(
        metadata: &'static PropertyMetadata,
        entity_kind: EntityKind,
        label: &str,
        owner: Option<EntityHandle>,
        localizer: &dyn Localizer,
    ) -> Result<Self, PropertyError> {
        let ty = metadata
            .default_value
            .as_enum()
            .map(|v| v.enum_type())
            .ok_or(PropertyError::TypeMismatch {
                name: metadata.name,
                expected: metadata.value_kind(),
                found: ValueKind::String,
            })?;
        let value = enum_from_label(ty, label, localizer)?;
        Self::new(metadata, entity_kind, PropertyValue::Enum(value), owner)
    }

    pub fn metadata(&self) -> &'static PropertyMetadata {
        self.metadata
    }

    pub fn name(&self) -> &'static str {
        self.metadata.name
    }

    pub fn entity_kind(&self) -> EntityKind {
        self.entity_kind
    }

    /// 所属实体，样式中的实例为 `None`
    pub fn owner(&self) -> Option<EntityHandle> {
        self.owner
    }

    pub fn value(&self) -> &PropertyValue {
        &self.value
    }

    /// 赋值，返回值是否发生变化（精确比较）
    pub fn set_value(&mut self, value: PropertyValue) -> Result<bool, PropertyError> {
        check_type(self.metadata, &value)?;
        if self.value == value {
            return Ok(false);
        }
        self.value = value;
        Ok(true)
    }

    /// 整数视图
    pub fn int_value(&self) -> Option<i32> {
        self.value.as_int()
    }

    /// 通过整数视图赋值，与 `set_value` 等价
    pub fn set_int_value(&mut self, value: i32) -> Result<bool, PropertyError> {
        self.set_value(PropertyValue::Int(value))
    }

    /// 实数视图
    pub fn double_value(&self) -> Option<f64> {
        self.value.as_double()
    }

    /// 通过实数视图赋值，与 `set_value` 等价
    pub fn set_double_value(&mut self, value: f64) -> Result<bool, PropertyError> {
        self.set_value(PropertyValue::Double(value))
    }
}

fn check_type(metadata: &PropertyMetadata, value: &PropertyValue) -> Result<(), PropertyError> {
    if metadata.accepts(value) {
        Ok(())
    } else {
        Err(PropertyError::TypeMismatch {
            name: metadata.name,
            expected: metadata.value_kind(),
            found: value.kind(),
        })
    }
}
