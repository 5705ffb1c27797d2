//! 属性元数据
//!
//! 每个实体类型的每个可编辑参数都有一条不可变的元数据描述：
//! 类别、排序、名称、本地化键、默认值、范围和可见范围。

use crate::value::{PropertyValue, ValueKind};
use serde::{Deserialize, Serialize};

/// 属性类别（按面板中的显示顺序排列）
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum PropertyCategory {
    General,
    Geometry,
    Content,
    Misc,
}

impl PropertyCategory {
    pub fn display_key(&self) -> &'static str {
        match self {
            PropertyCategory::General => "category.General",
            PropertyCategory::Geometry => "category.Geometry",
            PropertyCategory::Content => "category.Content",
            PropertyCategory::Misc => "category.Misc",
        }
    }
}

/// 属性的可见范围
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum PropertyScope {
    /// 不在任何地方显示
    Hidden,
    /// 仅属性面板
    PaletteOnly,
    /// 仅样式编辑器
    StyleEditorOnly,
    /// 属性面板和样式编辑器
    PaletteAndStyleEditor,
    /// 不参与显示和样式
    None,
}

impl PropertyScope {
    /// 是否在属性面板中显示
    pub fn in_palette(&self) -> bool {
        matches!(
            self,
            PropertyScope::PaletteOnly | PropertyScope::PaletteAndStyleEditor
        )
    }

    /// 是否在样式编辑器中显示
    pub fn in_style_editor(&self) -> bool {
        matches!(
            self,
            PropertyScope::StyleEditorOnly | PropertyScope::PaletteAndStyleEditor
        )
    }
}

/// 属性值的存放位置
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum PropertyStorage {
    /// 扩展数据记录
    Record,
    /// 宿主块自身的属性（图层、线型、线型比例）
    HostBlock,
    /// 样式引用，记录中以样式 guid 保存
    StyleReference,
}

/// 属性元数据
#[derive(Debug, Clone)]
pub struct PropertyMetadata {
    pub category: PropertyCategory,
    /// 类别内的排序
    pub order_index: u32,
    /// 稳定的属性名称，也是样式文件中的键
    pub name: &'static str,
    pub display_name_key: &'static str,
    pub description_key: &'static str,
    pub default_value: PropertyValue,
    /// 最小值（仅数值属性）
    pub minimum: Option<f64>,
    /// 最大值（仅数值属性）
    pub maximum: Option<f64>,
    pub scope: PropertyScope,
    pub storage: PropertyStorage,
}

impl PropertyMetadata {
    /// 创建元数据，可见范围默认为面板和样式编辑器，存放在扩展数据记录中
    pub fn new(
        category: PropertyCategory,
        order_index: u32,
        name: &'static str,
        default_value: impl Into<PropertyValue>,
    ) -> Self {
        Self {
            category,
            order_index,
            name,
            display_name_key: name,
            description_key: name,
            default_value: default_value.into(),
            minimum: None,
            maximum: None,
            scope: PropertyScope::PaletteAndStyleEditor,
            storage: PropertyStorage::Record,
        }
    }

    /// 设置本地化键
    pub fn keys(mut self, display_name_key: &'static str, description_key: &'static str) -> Self {
        self.display_name_key = display_name_key;
        self.description_key = description_key;
        self
    }

    /// 设置数值范围
    pub fn range(mut self, minimum: f64, maximum: f64) -> Self {
        self.minimum = Some(minimum);
        self.maximum = Some(maximum);
        self
    }

    /// 设置可见范围
    pub fn scope(mut self, scope: PropertyScope) -> Self {
        self.scope = scope;
        self
    }

    /// 设置存放位置
    pub fn storage(mut self, storage: PropertyStorage) -> Self {
        self.storage = storage;
        self
    }

    /// 值类型
    pub fn value_kind(&self) -> ValueKind {
        self.default_value.kind()
    }

    /// 值是否与默认值类型兼容
    pub fn accepts(&self, value: &PropertyValue) -> bool {
        self.default_value.same_type(value)
    }

    /// 是否参与样式
    pub fn in_style(&self) -> bool {
        self.scope == PropertyScope::PaletteAndStyleEditor && self.name != "Style"
    }

    /// 将数值限制在声明范围内，非数值原样返回
    pub fn clamp(&self, value: PropertyValue) -> PropertyValue {
        match value {
            PropertyValue::Int(v) => {
                let mut v = f64::from(v);
                if let Some(min) = self.minimum {
                    v = v.max(min);
                }
                if let Some(max) = self.maximum {
                    v = v.min(max);
                }
                PropertyValue::Int(v.round() as i32)
            }
            PropertyValue::Double(mut v) => {
                if let Some(min) = self.minimum {
                    v = v.max(min);
                }
                if let Some(max) = self.maximum {
                    v = v.min(max);
                }
                PropertyValue::Double(v)
            }
            other => other,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_builder_defaults() {
        let meta = PropertyMetadata::new(PropertyCategory::Geometry, 3, "Overhang", 2);
        assert_eq!(meta.value_kind(), ValueKind::Int);
        assert_eq!(meta.scope, PropertyScope::PaletteAndStyleEditor);
        assert_eq!(meta.storage, PropertyStorage::Record);
        assert!(meta.in_style());
        assert!(meta.accepts(&PropertyValue::Int(9)));
        assert!(!meta.accepts(&PropertyValue::Double(9.0)));
    }

    #[test]
    fn test_clamp_numeric() {
        let meta = PropertyMetadata::new(PropertyCategory::Geometry, 0, "Width", 5).range(1.0, 10.0);
        assert_eq!(meta.clamp(PropertyValue::Int(-3)), PropertyValue::Int(1));
        assert_eq!(meta.clamp(PropertyValue::Int(30)), PropertyValue::Int(10));

        let meta = PropertyMetadata::new(PropertyCategory::Content, 0, "Height", 3.5).range(0.5, 50.0);
        assert_eq!(meta.clamp(PropertyValue::Double(0.1)), PropertyValue::Double(0.5));
        assert_eq!(
            meta.clamp(PropertyValue::String("x".into())),
            PropertyValue::String("x".into())
        );
    }

    #[test]
    fn test_scope_flags() {
        assert!(PropertyScope::PaletteOnly.in_palette());
        assert!(!PropertyScope::PaletteOnly.in_style_editor());
        assert!(PropertyScope::StyleEditorOnly.in_style_editor());
        assert!(!PropertyScope::Hidden.in_palette());
        assert!(!PropertyScope::None.in_style_editor());
    }

    #[test]
    fn test_category_order() {
        assert!(PropertyCategory::General < PropertyCategory::Geometry);
        assert!(PropertyCategory::Geometry < PropertyCategory::Content);
    }
}
