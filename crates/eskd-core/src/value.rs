//! 属性值
//!
//! 属性值是一个带标签的联合类型。实例创建后值的类型不再改变，
//! 枚举值总是携带其枚举类型，因此反向转换不依赖调用顺序。

use crate::scale::AnnotationScale;
use std::fmt;

/// 属性值的运行时类型
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum ValueKind {
    String,
    Int,
    Double,
    Bool,
    Enum,
    Scale,
}

impl ValueKind {
    /// 是否为数值类型
    pub fn is_numeric(&self) -> bool {
        matches!(self, ValueKind::Int | ValueKind::Double)
    }
}

/// 枚举成员描述
#[derive(Debug)]
pub struct EnumVariant {
    /// 成员名称（持久化形式）
    pub name: &'static str,
    /// 本地化键
    pub display_key: &'static str,
}

/// 枚举类型描述
#[derive(Debug)]
pub struct EnumType {
    pub name: &'static str,
    pub variants: &'static [EnumVariant],
}

impl EnumType {
    /// 按索引取值
    pub fn value(&'static self, index: usize) -> Option<EnumValue> {
        (index < self.variants.len()).then_some(EnumValue { ty: self, index })
    }

    /// 按成员名称取值
    pub fn value_by_name(&'static self, name: &str) -> Option<EnumValue> {
        self.variants
            .iter()
            .position(|v| v.name == name)
            .map(|index| EnumValue { ty: self, index })
    }

    /// 全部成员
    pub fn values(&'static self) -> impl Iterator<Item = EnumValue> {
        (0..self.variants.len()).map(move |index| EnumValue { ty: self, index })
    }
}

/// 枚举值：枚举类型 + 成员索引
#[derive(Clone, Copy)]
pub struct EnumValue {
    ty: &'static EnumType,
    index: usize,
}

impl EnumValue {
    pub fn enum_type(&self) -> &'static EnumType {
        self.ty
    }

    pub fn index(&self) -> usize {
        self.index
    }

    pub fn name(&self) -> &'static str {
        self.ty.variants[self.index].name
    }

    pub fn display_key(&self) -> &'static str {
        self.ty.variants[self.index].display_key
    }

    /// 是否属于同一个枚举类型
    pub fn same_type(&self, other: &EnumValue) -> bool {
        self.ty.name == other.ty.name
    }
}

impl PartialEq for EnumValue {
    fn eq(&self, other: &Self) -> bool {
        self.same_type(other) && self.index == other.index
    }
}

impl fmt::Debug for EnumValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}::{}", self.ty.name, self.name())
    }
}

/// 声明一个可用作属性值的枚举
///
/// 生成 Rust 枚举、对应的静态 [`EnumType`] 描述，以及二者之间的转换。
#[macro_export]
macro_rules! property_enum {
    (
        $(#[$meta:meta])*
        $vis:vis enum $name:ident : $descriptor:ident {
            $( $(#[$vmeta:meta])* $variant:ident => $key:literal ),+ $(,)?
        }
    ) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
        $vis enum $name {
            $( $(#[$vmeta])* $variant ),+
        }

        $vis static $descriptor: $crate::value::EnumType = $crate::value::EnumType {
            name: stringify!($name),
            variants: &[
                $( $crate::value::EnumVariant { name: stringify!($variant), display_key: $key } ),+
            ],
        };

        impl $name {
            const ALL: &'static [$name] = &[$( $name::$variant ),+];

            pub fn to_value(self) -> $crate::value::EnumValue {
                let index = self as usize;
                match $descriptor.value(index) {
                    Some(value) => value,
                    None => unreachable!("variant index is always in range"),
                }
            }

            pub fn from_value(value: &$crate::value::EnumValue) -> Option<Self> {
                if value.enum_type().name != $descriptor.name {
                    return None;
                }
                Self::ALL.get(value.index()).copied()
            }
        }

        impl From<$name> for $crate::value::PropertyValue {
            fn from(value: $name) -> Self {
                $crate::value::PropertyValue::Enum(value.to_value())
            }
        }
    };
}

/// 属性值
#[derive(Debug, Clone, PartialEq)]
pub enum PropertyValue {
    String(String),
    Int(i32),
    Double(f64),
    Bool(bool),
    Enum(EnumValue),
    Scale(AnnotationScale),
}

impl PropertyValue {
    /// 运行时类型
    pub fn kind(&self) -> ValueKind {
        match self {
            PropertyValue::String(_) => ValueKind::String,
            PropertyValue::Int(_) => ValueKind::Int,
            PropertyValue::Double(_) => ValueKind::Double,
            PropertyValue::Bool(_) => ValueKind::Bool,
            PropertyValue::Enum(_) => ValueKind::Enum,
            PropertyValue::Scale(_) => ValueKind::Scale,
        }
    }

    /// 类型是否相同（枚举还要求同一枚举类型）
    pub fn same_type(&self, other: &PropertyValue) -> bool {
        match (self, other) {
            (PropertyValue::Enum(a), PropertyValue::Enum(b)) => a.same_type(b),
            _ => self.kind() == other.kind(),
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            PropertyValue::String(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_int(&self) -> Option<i32> {
        match self {
            PropertyValue::Int(v) => Some(*v),
            _ => None,
        }
    }

    pub fn as_double(&self) -> Option<f64> {
        match self {
            PropertyValue::Double(v) => Some(*v),
            _ => None,
        }
    }

    /// 数值视图（整数提升为实数）
    pub fn as_number(&self) -> Option<f64> {
        match self {
            PropertyValue::Int(v) => Some(f64::from(*v)),
            PropertyValue::Double(v) => Some(*v),
            _ => None,
        }
    }

    pub fn as_bool(&self) -> Option<bool> {
        match self {
            PropertyValue::Bool(v) => Some(*v),
            _ => None,
        }
    }

    pub fn as_enum(&self) -> Option<EnumValue> {
        match self {
            PropertyValue::Enum(v) => Some(*v),
            _ => None,
        }
    }

    pub fn as_scale(&self) -> Option<&AnnotationScale> {
        match self {
            PropertyValue::Scale(v) => Some(v),
            _ => None,
        }
    }

    /// 持久化用的文本形式（枚举和比例使用名称，不使用数值）
    pub fn to_storage_string(&self) -> String {
        match self {
            PropertyValue::String(s) => s.clone(),
            PropertyValue::Int(v) => v.to_string(),
            PropertyValue::Double(v) => v.to_string(),
            PropertyValue::Bool(v) => v.to_string(),
            PropertyValue::Enum(v) => v.name().to_string(),
            PropertyValue::Scale(v) => v.name().to_string(),
        }
    }

    /// 以当前值的类型解析文本
    ///
    /// 解析失败返回 `None`，由调用方决定回退值。
    pub fn parse_same_kind(&self, text: &str) -> Option<PropertyValue> {
        let trimmed = text.trim();
        match self {
            PropertyValue::String(_) => Some(PropertyValue::String(text.to_string())),
            PropertyValue::Int(_) => trimmed.parse().ok().map(PropertyValue::Int),
            PropertyValue::Double(_) => trimmed
                .replace(',', ".")
                .parse::<f64>()
                .ok()
                .filter(|v| v.is_finite())
                .map(PropertyValue::Double),
            PropertyValue::Bool(_) => match trimmed.to_ascii_lowercase().as_str() {
                "true" | "1" => Some(PropertyValue::Bool(true)),
                "false" | "0" => Some(PropertyValue::Bool(false)),
                _ => None,
            },
            PropertyValue::Enum(v) => v
                .enum_type()
                .value_by_name(trimmed)
                .map(PropertyValue::Enum),
            PropertyValue::Scale(_) => AnnotationScale::parse(trimmed)
                .ok()
                .map(PropertyValue::Scale),
        }
    }
}

impl fmt::Display for PropertyValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_storage_string())
    }
}

impl From<i32> for PropertyValue {
    fn from(v: i32) -> Self {
        PropertyValue::Int(v)
    }
}

impl From<f64> for PropertyValue {
    fn from(v: f64) -> Self {
        PropertyValue::Double(v)
    }
}

impl From<bool> for PropertyValue {
    fn from(v: bool) -> Self {
        PropertyValue::Bool(v)
    }
}

impl From<&str> for PropertyValue {
    fn from(v: &str) -> Self {
        PropertyValue::String(v.to_string())
    }
}

impl From<String> for PropertyValue {
    fn from(v: String) -> Self {
        PropertyValue::String(v)
    }
}

impl From<EnumValue> for PropertyValue {
    fn from(v: EnumValue) -> Self {
        PropertyValue::Enum(v)
    }
}

impl From<AnnotationScale> for PropertyValue {
    fn from(v: AnnotationScale) -> Self {
        PropertyValue::Scale(v)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    crate::property_enum! {
        enum Shade: SHADE {
            Light => "shade.light",
            Dark => "shade.dark",
        }
    }

    crate::property_enum! {
        enum Other: OTHER {
            Light => "other.light",
        }
    }

    #[test]
    fn test_enum_round_trip_through_value() {
        let value = Shade::Dark.to_value();
        assert_eq!(value.name(), "Dark");
        assert_eq!(value.display_key(), "shade.dark");
        assert_eq!(Shade::from_value(&value), Some(Shade::Dark));
        assert_eq!(Other::from_value(&value), None);
    }

    #[test]
    fn test_enum_equality_respects_type() {
        assert_ne!(Shade::Light.to_value(), Other::Light.to_value());
        assert_eq!(SHADE.value_by_name("Light"), Some(Shade::Light.to_value()));
        assert_eq!(SHADE.values().count(), 2);
    }

    #[test]
    fn test_parse_same_kind() {
        assert_eq!(
            PropertyValue::Int(0).parse_same_kind(" 7 "),
            Some(PropertyValue::Int(7))
        );
        assert_eq!(PropertyValue::Int(0).parse_same_kind("oops"), None);
        assert_eq!(
            PropertyValue::Double(0.0).parse_same_kind("2,5"),
            Some(PropertyValue::Double(2.5))
        );
        assert_eq!(
            PropertyValue::Bool(false).parse_same_kind("True"),
            Some(PropertyValue::Bool(true))
        );
        assert_eq!(
            PropertyValue::from(Shade::Light).parse_same_kind("Dark"),
            Some(PropertyValue::from(Shade::Dark))
        );
        assert_eq!(
            PropertyValue::Scale(AnnotationScale::default()).parse_same_kind("1:50"),
            Some(PropertyValue::Scale(AnnotationScale::parse("1:50").unwrap()))
        );
    }

    #[test]
    fn test_storage_string_uses_names() {
        assert_eq!(PropertyValue::from(Shade::Dark).to_storage_string(), "Dark");
        assert_eq!(
            PropertyValue::Scale(AnnotationScale::parse("1:20").unwrap()).to_storage_string(),
            "1:20"
        );
        assert_eq!(PropertyValue::Double(3.5).to_storage_string(), "3.5");
    }

    #[test]
    fn test_same_type() {
        assert!(PropertyValue::Int(1).same_type(&PropertyValue::Int(2)));
        assert!(!PropertyValue::Int(1).same_type(&PropertyValue::Double(1.0)));
        assert!(!PropertyValue::from(Shade::Light).same_type(&PropertyValue::from(Other::Light)));
    }
}
