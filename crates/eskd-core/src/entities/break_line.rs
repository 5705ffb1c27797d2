//! 断开线

use super::{enum_of, int_of, EntityBase, Frame, GeometryError};
use crate::instance::PropertyError;
use crate::metadata::{PropertyCategory, PropertyMetadata};
use crate::primitive::{Polyline, Primitive, Segment};
use crate::registry::common_properties;
use crate::value::PropertyValue;
use std::f64::consts::PI;

/// 曲线形断开的采样点数
const CURVE_SAMPLES: usize = 32;

crate::property_enum! {
    /// 断开的形状
    pub enum BreakLineType : BREAK_LINE_TYPE {
        Linear => "blt.Linear",
        Curvilinear => "blt.Curvilinear",
        Cylindrical => "blt.Cylindrical",
    }
}

pub(crate) fn metadata() -> Vec<PropertyMetadata> {
    let mut props = common_properties("Continuous");
    props.extend([
        PropertyMetadata::new(PropertyCategory::Geometry, 0, "Overhang", 2)
            .keys("p.Overhang", "d.Overhang")
            .range(0.0, 10.0),
        PropertyMetadata::new(PropertyCategory::Geometry, 1, "BreakHeight", 10)
            .keys("p.BreakHeight", "d.BreakHeight")
            .range(1.0, 13.0),
        PropertyMetadata::new(PropertyCategory::Geometry, 2, "BreakWidth", 5)
            .keys("p.BreakWidth", "d.BreakWidth")
            .range(1.0, 10.0),
        PropertyMetadata::new(PropertyCategory::Geometry, 3, "BreakLineType", BreakLineType::Linear)
            .keys("p.BreakLineType", "d.BreakLineType"),
    ]);
    props
}

#[derive(Debug, Clone, PartialEq)]
pub struct BreakLine {
    pub base: EntityBase,
    pub overhang: i32,
    pub break_height: i32,
    pub break_width: i32,
    pub break_line_type: BreakLineType,
}

impl BreakLine {
    pub(crate) fn new(base: EntityBase) -> Self {
        Self {
            base,
            overhang: 2,
            break_height: 10,
            break_width: 5,
            break_line_type: BreakLineType::Linear,
        }
    }

    pub(crate) fn get_own(&self, name: &str) -> Option<PropertyValue> {
        match name {
            "Overhang" => Some(PropertyValue::Int(self.overhang)),
            "BreakHeight" => Some(PropertyValue::Int(self.break_height)),
            "BreakWidth" => Some(PropertyValue::Int(self.break_width)),
            "BreakLineType" => Some(self.break_line_type.into()),
            _ => None,
        }
    }

    pub(crate) fn set_own(&mut self, name: &'static str, value: &PropertyValue) -> Result<bool, PropertyError> {
        match name {
            "Overhang" => self.overhang = int_of(name, value)?,
            "BreakHeight" => self.break_height = int_of(name, value)?,
            "BreakWidth" => self.break_width = int_of(name, value)?,
            "BreakLineType" => self.break_line_type = enum_of(name, value, BreakLineType::from_value)?,
            _ => return Ok(false),
        }
        Ok(true)
    }

    pub(crate) fn reconstruct(&self, frame: &Frame) -> Result<Vec<Primitive>, GeometryError> {
        let s = frame.factor;
        let overhang = f64::from(self.overhang) * s;
        let height = f64::from(self.break_height) * s;
        let width = f64::from(self.break_width) * s;
        let len = frame.length;

        let primitives = match self.break_line_type {
            BreakLineType::Linear => {
                let mid = len / 2.0;
                vec![Primitive::Polyline(Polyline::new(vec![
                    frame.at(-overhang, 0.0),
                    frame.at(mid - width / 2.0, 0.0),
                    frame.at(mid - width / 4.0, height / 2.0),
                    frame.at(mid + width / 4.0, -height / 2.0),
                    frame.at(mid + width / 2.0, 0.0),
                    frame.at(len + overhang, 0.0),
                ]))]
            }
            BreakLineType::Curvilinear => {
                let mut vertices = Vec::with_capacity(CURVE_SAMPLES + 3);
                vertices.push(frame.at(-overhang, 0.0));
                for k in 0..=CURVE_SAMPLES {
                    let t = k as f64 / CURVE_SAMPLES as f64;
                    vertices.push(frame.at(t * len, (2.0 * PI * t).sin() * height / 2.0));
                }
                vertices.push(frame.at(len + overhang, 0.0));
                vec![Primitive::Polyline(Polyline::new(vertices))]
            }
            BreakLineType::Cylindrical => {
                let half = height / 2.0;
                let arc = |along: f64, bulge: f64| {
                    let vertices = (0..=CURVE_SAMPLES)
                        .map(|k| {
                            let theta = PI * k as f64 / CURVE_SAMPLES as f64;
                            frame.at(along + bulge * theta.sin(), -half * theta.cos())
                        })
                        .collect();
                    Primitive::Polyline(Polyline::new(vertices))
                };
                vec![
                    arc(0.0, -width / 2.0),
                    arc(0.0, width / 4.0),
                    arc(len, width / 2.0),
                    arc(len, -width / 4.0),
                    Primitive::Line(Segment::new(frame.at(-overhang, half), frame.at(len + overhang, half))),
                    Primitive::Line(Segment::new(frame.at(-overhang, -half), frame.at(len + overhang, -half))),
                ]
            }
        };
        Ok(primitives)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::entities::SmartEntity;
    use crate::math::{points_approx_eq, Point2};
    use crate::registry::EntityKind;

    fn placed(kind: BreakLineType) -> SmartEntity {
        let mut entity = SmartEntity::new(EntityKind::BreakLine, Point2::origin());
        entity.set_end_point(Point2::new(100.0, 0.0));
        entity.set("BreakLineType", &kind.into()).unwrap();
        entity
    }

    #[test]
    fn test_linear_break_shape() {
        let primitives = placed(BreakLineType::Linear).reconstruct().unwrap();
        assert_eq!(primitives.len(), 1);
        match &primitives[0] {
            Primitive::Polyline(p) => {
                assert_eq!(p.vertex_count(), 6);
                assert!(points_approx_eq(&p.vertices[0], &Point2::new(-2.0, 0.0)));
                assert!(points_approx_eq(&p.vertices[5], &Point2::new(102.0, 0.0)));
                assert!(points_approx_eq(&p.vertices[2], &Point2::new(48.75, 5.0)));
            }
            other => panic!("unexpected {:?}", other),
        }
    }

    #[test]
    fn test_curvilinear_break_samples() {
        let primitives = placed(BreakLineType::Curvilinear).reconstruct().unwrap();
        match &primitives[0] {
            Primitive::Polyline(p) => assert_eq!(p.vertex_count(), CURVE_SAMPLES + 3),
            other => panic!("unexpected {:?}", other),
        }
    }

    #[test]
    fn test_cylindrical_break_has_edges_and_loops() {
        let primitives = placed(BreakLineType::Cylindrical).reconstruct().unwrap();
        let polylines = primitives.iter().filter(|p| matches!(p, Primitive::Polyline(_))).count();
        let lines = primitives.iter().filter(|p| matches!(p, Primitive::Line(_))).count();
        assert_eq!((polylines, lines), (4, 2));
    }

    #[test]
    fn test_scale_multiplies_dimensions() {
        let mut entity = placed(BreakLineType::Linear);
        entity
            .set("Scale", &PropertyValue::Scale(crate::scale::AnnotationScale::parse("1:2").unwrap()))
            .unwrap();
        match &entity.reconstruct().unwrap()[0] {
            Primitive::Polyline(p) => assert!(points_approx_eq(&p.vertices[0], &Point2::new(-4.0, 0.0))),
            other => panic!("unexpected {:?}", other),
        }
    }
}
