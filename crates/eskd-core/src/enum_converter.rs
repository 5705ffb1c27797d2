//! 枚举值与本地化文本之间的转换
//!
//! 推荐使用携带枚举类型的 [`enum_from_label`]。[`EnumConverter`] 保留了
//! "记住上一次转换的枚举类型"的行为，供只拿得到文本的显示路径使用：
//! 在调用 [`EnumConverter::from_display`] 之前必须至少调用过一次
//! [`EnumConverter::to_display`]，否则返回 [`ConverterError::NoEnumTypeSeen`]。

use crate::localization::Localizer;
use crate::value::{EnumType, EnumValue};

/// 枚举转换错误
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum ConverterError {
    #[error("Enum converter has not converted any value yet")]
    NoEnumTypeSeen,

    #[error("No member of {enum_name} is labelled \"{label}\"")]
    UnknownLabel { enum_name: &'static str, label: String },
}

/// 枚举值的本地化文本
pub fn enum_label(value: &EnumValue, localizer: &dyn Localizer) -> String {
    localizer.get(value.display_key())
}

/// 在指定枚举类型中按本地化文本查找成员（也接受成员名称）
pub fn enum_from_label(
    ty: &'static EnumType,
    label: &str,
    localizer: &dyn Localizer,
) -> Result<EnumValue, ConverterError> {
    ty.values()
        .find(|v| enum_label(v, localizer) == label)
        .or_else(|| ty.value_by_name(label))
        .ok_or_else(|| ConverterError::UnknownLabel {
            enum_name: ty.name,
            label: label.to_string(),
        })
}

/// 有状态的枚举转换器，每个属性组一个实例
#[derive(Debug, Default, Clone)]
pub struct EnumConverter {
    last_type: Option<&'static EnumType>,
}

impl EnumConverter {
    pub fn new() -> Self {
        Self::default()
    }

    /// 枚举值 → 本地化文本，并记住枚举类型
    pub fn to_display(&mut self, value: &EnumValue, localizer: &dyn Localizer) -> String {
        self.last_type = Some(value.enum_type());
        enum_label(value, localizer)
    }

    /// 本地化文本 → 枚举值，使用最近一次 `to_display` 的枚举类型
    pub fn from_display(
        &self,
        label: &str,
        localizer: &dyn Localizer,
    ) -> Result<EnumValue, ConverterError> {
        let ty = self.last_type.ok_or(ConverterError::NoEnumTypeSeen)?;
        enum_from_label(ty, label, localizer)
    }

    /// 最近一次转换的枚举类型
    pub fn last_type(&self) -> Option<&'static EnumType> {
        self.last_type
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::entities::break_line::BreakLineType;
    use crate::localization::BuiltinLocalizer;

    #[test]
    fn test_label_round_trip() {
        let loc = BuiltinLocalizer::english();
        let mut converter = EnumConverter::new();

        let label = converter.to_display(&BreakLineType::Cylindrical.to_value(), &loc);
        assert_eq!(label, "Cylindrical");
        assert_eq!(
            converter.from_display("Curvilinear", &loc),
            Ok(BreakLineType::Curvilinear.to_value())
        );
    }

    #[test]
    fn test_from_display_before_to_display_is_an_error() {
        let loc = BuiltinLocalizer::english();
        let converter = EnumConverter::new();
        assert_eq!(
            converter.from_display("Linear", &loc),
            Err(ConverterError::NoEnumTypeSeen)
        );
    }

    #[test]
    fn test_typed_lookup_accepts_member_name() {
        let loc = BuiltinLocalizer::english();
        let ty = BreakLineType::Linear.to_value().enum_type();
        assert_eq!(
            enum_from_label(ty, "Cylindrical", &loc),
            Ok(BreakLineType::Cylindrical.to_value())
        );
        assert!(matches!(
            enum_from_label(ty, "Wavy", &loc),
            Err(ConverterError::UnknownLabel { .. })
        ));
    }
}
