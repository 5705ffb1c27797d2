//! 轴线
//!
//! 点划线主线，两端带实线段（"折断"），可在一端或两端绘制编号圆圈。

use super::{double_of, enum_of, int_of, string_of, EntityBase, Frame, GeometryError};
use crate::instance::PropertyError;
use crate::math::{Point2, Vector2};
use crate::metadata::{PropertyCategory, PropertyMetadata, PropertyScope};
use crate::primitive::{Circle, Primitive, Segment, Text};
use crate::registry::common_properties;
use crate::value::PropertyValue;

crate::property_enum! {
    /// 编号圆圈的位置
    pub enum AxisMarkersPosition : AXIS_MARKERS_POSITION {
        Both => "amp.Both",
        Top => "amp.Top",
        Bottom => "amp.Bottom",
    }
}

pub(crate) fn metadata() -> Vec<PropertyMetadata> {
    let mut props = common_properties("CENTER");
    props.extend([
        PropertyMetadata::new(PropertyCategory::Geometry, 0, "Fracture", 5)
            .keys("p.Fracture", "d.Fracture")
            .range(1.0, 10.0),
        PropertyMetadata::new(PropertyCategory::Geometry, 1, "BottomFractureOffset", 0)
            .keys("p.BottomFractureOffset", "d.BottomFractureOffset")
            .range(0.0, 30.0),
        PropertyMetadata::new(PropertyCategory::Geometry, 2, "TopFractureOffset", 0)
            .keys("p.TopFractureOffset", "d.TopFractureOffset")
            .range(0.0, 30.0),
        PropertyMetadata::new(PropertyCategory::Geometry, 3, "MarkersPosition", AxisMarkersPosition::Bottom)
            .keys("p.MarkersPosition", "d.MarkersPosition"),
        PropertyMetadata::new(PropertyCategory::Geometry, 4, "MarkersDiameter", 10)
            .keys("p.MarkersDiameter", "d.MarkersDiameter")
            .range(6.0, 12.0),
        PropertyMetadata::new(PropertyCategory::Geometry, 5, "MarkersCount", 1)
            .keys("p.MarkersCount", "d.MarkersCount")
            .range(1.0, 3.0),
        PropertyMetadata::new(PropertyCategory::Content, 0, "TextStyle", "Standard")
            .keys("p.TextStyle", "d.TextStyle"),
        PropertyMetadata::new(PropertyCategory::Content, 1, "TextHeight", 3.5)
            .keys("p.TextHeight", "d.TextHeight")
            .range(0.5, 50.0),
        PropertyMetadata::new(PropertyCategory::Content, 2, "FirstTextPrefix", "")
            .keys("p.FirstTextPrefix", "d.FirstTextPrefix")
            .scope(PropertyScope::PaletteOnly),
        PropertyMetadata::new(PropertyCategory::Content, 3, "FirstText", "")
            .keys("p.FirstText", "d.FirstText")
            .scope(PropertyScope::PaletteOnly),
        PropertyMetadata::new(PropertyCategory::Content, 4, "FirstTextSuffix", "")
            .keys("p.FirstTextSuffix", "d.FirstTextSuffix")
            .scope(PropertyScope::PaletteOnly),
        PropertyMetadata::new(PropertyCategory::Content, 5, "SecondText", "")
            .keys("p.SecondText", "d.SecondText")
            .scope(PropertyScope::PaletteOnly),
        PropertyMetadata::new(PropertyCategory::Content, 6, "ThirdText", "")
            .keys("p.ThirdText", "d.ThirdText")
            .scope(PropertyScope::PaletteOnly),
        PropertyMetadata::new(PropertyCategory::Misc, 0, "AxisStep", 6000.0)
            .keys("p.AxisStep", "d.AxisStep")
            .scope(PropertyScope::Hidden),
    ]);
    props
}

/// 轴线
#[derive(Debug, Clone, PartialEq)]
pub struct Axis {
    pub base: EntityBase,
    pub fracture: i32,
    pub bottom_fracture_offset: i32,
    pub top_fracture_offset: i32,
    pub markers_position: AxisMarkersPosition,
    pub markers_diameter: i32,
    pub markers_count: i32,
    pub text_style: String,
    pub text_height: f64,
    pub first_text_prefix: String,
    pub first_text: String,
    pub first_text_suffix: String,
    pub second_text: String,
    pub third_text: String,
    pub axis_step: f64,
}

impl Axis {
    pub(crate) fn new(base: EntityBase) -> Self {
        Self {
            base,
            fracture: 5,
            bottom_fracture_offset: 0,
            top_fracture_offset: 0,
            markers_position: AxisMarkersPosition::Bottom,
            markers_diameter: 10,
            markers_count: 1,
            text_style: "Standard".to_string(),
            text_height: 3.5,
            first_text_prefix: String::new(),
            first_text: String::new(),
            first_text_suffix: String::new(),
            second_text: String::new(),
            third_text: String::new(),
            axis_step: 6000.0,
        }
    }

    pub(crate) fn get_own(&self, name: &str) -> Option<PropertyValue> {
        let value = match name {
            "Fracture" => PropertyValue::Int(self.fracture),
            "BottomFractureOffset" => PropertyValue::Int(self.bottom_fracture_offset),
            "TopFractureOffset" => PropertyValue::Int(self.top_fracture_offset),
            "MarkersPosition" => self.markers_position.into(),
            "MarkersDiameter" => PropertyValue::Int(self.markers_diameter),
            "MarkersCount" => PropertyValue::Int(self.markers_count),
            "TextStyle" => PropertyValue::String(self.text_style.clone()),
            "TextHeight" => PropertyValue::Double(self.text_height),
            "FirstTextPrefix" => PropertyValue::String(self.first_text_prefix.clone()),
            "FirstText" => PropertyValue::String(self.first_text.clone()),
            "FirstTextSuffix" => PropertyValue::String(self.first_text_suffix.clone()),
            "SecondText" => PropertyValue::String(self.second_text.clone()),
            "ThirdText" => PropertyValue::String(self.third_text.clone()),
            "AxisStep" => PropertyValue::Double(self.axis_step),
            _ => return None,
        };
        Some(value)
    }

    pub(crate) fn set_own(&mut self, name: &'static str, value: &PropertyValue) -> Result<bool, PropertyError> {
        match name {
            "Fracture" => self.fracture = int_of(name, value)?,
            "BottomFractureOffset" => self.bottom_fracture_offset = int_of(name, value)?,
            "TopFractureOffset" => self.top_fracture_offset = int_of(name, value)?,
            "MarkersPosition" => {
                self.markers_position = enum_of(name, value, AxisMarkersPosition::from_value)?
            }
            "MarkersDiameter" => self.markers_diameter = int_of(name, value)?,
            "MarkersCount" => self.markers_count = int_of(name, value)?,
            "TextStyle" => self.text_style = string_of(name, value)?,
            "TextHeight" => self.text_height = double_of(name, value)?,
            "FirstTextPrefix" => self.first_text_prefix = string_of(name, value)?,
            "FirstText" => self.first_text = string_of(name, value)?,
            "FirstTextSuffix" => self.first_text_suffix = string_of(name, value)?,
            "SecondText" => self.second_text = string_of(name, value)?,
            "ThirdText" => self.third_text = string_of(name, value)?,
            "AxisStep" => self.axis_step = double_of(name, value)?,
            _ => return Ok(false),
        }
        Ok(true)
    }

    /// 编号圆圈中依次显示的文字
    pub fn marker_texts(&self) -> [String; 3] {
        let first = if self.first_text.is_empty() {
            String::new()
        } else {
            format!("{}{}{}", self.first_text_prefix, self.first_text, self.first_text_suffix)
        };
        [first, self.second_text.clone(), self.third_text.clone()]
    }

    pub(crate) fn reconstruct(&self, frame: &Frame) -> Result<Vec<Primitive>, GeometryError> {
        let s = frame.factor;
        let fracture = f64::from(self.fracture) * s;
        let bottom = frame.at(-f64::from(self.bottom_fracture_offset) * s, 0.0);
        let top = frame.at(frame.length + f64::from(self.top_fracture_offset) * s, 0.0);

        let mut primitives = vec![
            Primitive::Line(Segment::new(bottom, top)),
            Primitive::Line(Segment::solid(bottom, bottom + frame.dir * fracture)),
            Primitive::Line(Segment::solid(top - frame.dir * fracture, top)),
        ];

        let radius = f64::from(self.markers_diameter) * s / 2.0;
        let ends: Vec<(Point2, Vector2)> = match self.markers_position {
            AxisMarkersPosition::Both => vec![(bottom, -frame.dir), (top, frame.dir)],
            AxisMarkersPosition::Top => vec![(top, frame.dir)],
            AxisMarkersPosition::Bottom => vec![(bottom, -frame.dir)],
        };
        let count = self.markers_count.clamp(1, 3) as usize;
        let texts = self.marker_texts();

        for (anchor, outward) in ends {
            for (i, text) in texts.iter().enumerate().take(count) {
                let center = anchor + outward * (radius * (2 * i + 1) as f64);
                primitives.push(Primitive::Circle(Circle::new(center, radius)));
                if !text.is_empty() {
                    primitives.push(Primitive::Text(Text::new(
                        center,
                        text.clone(),
                        self.text_height * s,
                        self.text_style.clone(),
                    )));
                }
            }
        }
        Ok(primitives)
    }
}

#[cfg(test)]
mod tests {
    use crate::entities::SmartEntity;
    use crate::math::{approx_eq, Point2};
    use crate::primitive::Primitive;
    use crate::registry::EntityKind;
    use crate::value::PropertyValue;

    use super::AxisMarkersPosition;

    fn placed_axis() -> SmartEntity {
        let mut entity = SmartEntity::new(EntityKind::Axis, Point2::origin());
        entity.set_end_point(Point2::new(0.0, 100.0));
        entity
    }

    fn circles(primitives: &[Primitive]) -> usize {
        primitives.iter().filter(|p| matches!(p, Primitive::Circle(_))).count()
    }

    #[test]
    fn test_default_axis_has_one_bottom_marker() {
        let primitives = placed_axis().reconstruct().unwrap();
        assert_eq!(circles(&primitives), 1);
        match primitives.iter().find(|p| matches!(p, Primitive::Circle(_))) {
            Some(Primitive::Circle(c)) => {
                assert!(approx_eq(c.radius, 5.0));
                assert!(approx_eq(c.center.y, -5.0));
            }
            _ => unreachable!(),
        }
    }

    #[test]
    fn test_markers_on_both_ends() {
        let mut entity = placed_axis();
        entity
            .set("MarkersPosition", &AxisMarkersPosition::Both.into())
            .unwrap();
        entity.set("MarkersCount", &PropertyValue::Int(3)).unwrap();
        assert_eq!(circles(&entity.reconstruct().unwrap()), 6);
    }

    #[test]
    fn test_fracture_offsets_extend_main_line() {
        let mut entity = placed_axis();
        entity.set("TopFractureOffset", &PropertyValue::Int(20)).unwrap();
        let primitives = entity.reconstruct().unwrap();
        match &primitives[0] {
            Primitive::Line(line) => {
                assert!(!line.solid);
                assert!(approx_eq(line.end.y, 120.0));
            }
            other => panic!("unexpected {:?}", other),
        }
    }

    #[test]
    fn test_marker_text_is_composed() {
        let mut entity = placed_axis();
        entity.set("FirstTextPrefix", &PropertyValue::from("(")).unwrap();
        entity.set("FirstText", &PropertyValue::from("A")).unwrap();
        entity.set("FirstTextSuffix", &PropertyValue::from(")")).unwrap();
        let texts: Vec<_> = entity
            .reconstruct()
            .unwrap()
            .into_iter()
            .filter_map(|p| match p {
                Primitive::Text(t) => Some(t.content),
                _ => None,
            })
            .collect();
        assert_eq!(texts, vec!["(A)".to_string()]);
    }
}
