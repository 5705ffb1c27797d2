//! 注释比例
//!
//! 比例以 `"图纸单位:图形单位"` 的形式命名，例如 `1:100`。
//! 实体的所有尺寸参数以图纸毫米为单位，乘以比例因子后得到图形中的尺寸。

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// 常用比例列表
const STANDARD_SCALES: &[&str] = &[
    "1:1", "1:2", "1:5", "1:10", "1:20", "1:25", "1:50", "1:100", "1:200", "1:500", "1:1000",
    "2:1", "5:1", "10:1",
];

/// 注释比例
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AnnotationScale {
    name: String,
    paper_units: f64,
    drawing_units: f64,
}

/// 比例解析错误
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum ScaleParseError {
    #[error("Scale must have the form \"paper:drawing\": {0}")]
    Malformed(String),

    #[error("Scale units must be positive: {0}")]
    NonPositive(String),
}

impl AnnotationScale {
    /// 根据图纸单位和图形单位创建比例
    pub fn new(paper_units: f64, drawing_units: f64) -> Self {
        Self {
            name: format!("{}:{}", format_units(paper_units), format_units(drawing_units)),
            paper_units,
            drawing_units,
        }
    }

    /// 1:1 比例
    pub fn one_to_one() -> Self {
        Self::new(1.0, 1.0)
    }

    /// 解析 `"paper:drawing"` 形式的比例
    pub fn parse(text: &str) -> Result<Self, ScaleParseError> {
        let (paper, drawing) = text
            .split_once(':')
            .ok_or_else(|| ScaleParseError::Malformed(text.to_string()))?;

        let paper: f64 = paper
            .trim()
            .parse()
            .map_err(|_| ScaleParseError::Malformed(text.to_string()))?;
        let drawing: f64 = drawing
            .trim()
            .parse()
            .map_err(|_| ScaleParseError::Malformed(text.to_string()))?;

        if !(paper > 0.0 && drawing > 0.0) || !paper.is_finite() || !drawing.is_finite() {
            return Err(ScaleParseError::NonPositive(text.to_string()));
        }

        Ok(Self::new(paper, drawing))
    }

    /// 比例名称（也是持久化形式）
    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn paper_units(&self) -> f64 {
        self.paper_units
    }

    pub fn drawing_units(&self) -> f64 {
        self.drawing_units
    }

    /// 比例因子：图形单位 / 图纸单位
    pub fn factor(&self) -> f64 {
        self.drawing_units / self.paper_units
    }

    /// 常用比例
    pub fn standard() -> Vec<AnnotationScale> {
        STANDARD_SCALES
            .iter()
            .filter_map(|s| Self::parse(s).ok())
            .collect()
    }
}

impl Default for AnnotationScale {
    fn default() -> Self {
        Self::one_to_one()
    }
}

impl fmt::Display for AnnotationScale {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.name)
    }
}

impl FromStr for AnnotationScale {
    type Err = ScaleParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

fn format_units(value: f64) -> String {
    if value.fract() == 0.0 && value.abs() < 1e15 {
        format!("{}", value as i64)
    } else {
        format!("{}", value)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_ratio() {
        let scale = AnnotationScale::parse("1:100").unwrap();
        assert_eq!(scale.name(), "1:100");
        assert_eq!(scale.factor(), 100.0);

        let enlarged: AnnotationScale = " 5 : 1 ".parse().unwrap();
        assert_eq!(enlarged.name(), "5:1");
        assert_eq!(enlarged.factor(), 0.2);
    }

    #[test]
    fn test_parse_rejects_garbage() {
        assert!(matches!(
            AnnotationScale::parse("100"),
            Err(ScaleParseError::Malformed(_))
        ));
        assert!(matches!(
            AnnotationScale::parse("0:1"),
            Err(ScaleParseError::NonPositive(_))
        ));
    }

    #[test]
    fn test_fractional_units_keep_name() {
        assert_eq!(AnnotationScale::new(1.0, 2.5).name(), "1:2.5");
    }

    #[test]
    fn test_standard_list() {
        let list = AnnotationScale::standard();
        assert_eq!(list.len(), STANDARD_SCALES.len());
        assert_eq!(list[0], AnnotationScale::default());
    }
}
