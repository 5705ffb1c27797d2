//! 地面线
//!
//! 主线下方按组绘制斜短线，每组三条。

use super::{enum_of, int_of, EntityBase, Frame, GeometryError, MAX_PRIMITIVES};
use crate::instance::PropertyError;
use crate::math::rotate;
use crate::metadata::{PropertyCategory, PropertyMetadata};
use crate::primitive::{Primitive, Segment};
use crate::registry::common_properties;
use crate::value::PropertyValue;
use std::f64::consts::PI;

/// 每组短线数量
pub const STROKES_PER_GROUP: usize = 3;

crate::property_enum! {
    /// 第一组短线相对起点的偏移方式
    pub enum FirstStrokeOffset : FIRST_STROKE_OFFSET {
        ByHalfSpace => "fso.ByHalfSpace",
        BySpace => "fso.BySpace",
        ByHalfStrokeOffset => "fso.ByHalfStrokeOffset",
        ByStrokeOffset => "fso.ByStrokeOffset",
    }
}

pub(crate) fn metadata() -> Vec<PropertyMetadata> {
    let mut props = common_properties("Continuous");
    props.extend([
        PropertyMetadata::new(PropertyCategory::Geometry, 0, "FirstStrokeOffset", FirstStrokeOffset::ByHalfSpace)
            .keys("p.FirstStrokeOffset", "d.FirstStrokeOffset"),
        PropertyMetadata::new(PropertyCategory::Geometry, 1, "StrokeLength", 8)
            .keys("p.StrokeLength", "d.StrokeLength")
            .range(1.0, 10.0),
        PropertyMetadata::new(PropertyCategory::Geometry, 2, "StrokeOffset", 4)
            .keys("p.StrokeOffset", "d.StrokeOffset")
            .range(1.0, 10.0),
        PropertyMetadata::new(PropertyCategory::Geometry, 3, "StrokeAngle", 60)
            .keys("p.StrokeAngle", "d.StrokeAngle")
            .range(30.0, 90.0),
        PropertyMetadata::new(PropertyCategory::Geometry, 4, "Space", 10)
            .keys("p.Space", "d.Space")
            .range(1.0, 20.0),
    ]);
    props
}

#[derive(Debug, Clone, PartialEq)]
pub struct GroundLine {
    pub base: EntityBase,
    pub first_stroke_offset: FirstStrokeOffset,
    pub stroke_length: i32,
    pub stroke_offset: i32,
    /// 度
    pub stroke_angle: i32,
    pub space: i32,
}

impl GroundLine {
    pub(crate) fn new(base: EntityBase) -> Self {
        Self {
            base,
            first_stroke_offset: FirstStrokeOffset::ByHalfSpace,
            stroke_length: 8,
            stroke_offset: 4,
            stroke_angle: 60,
            space: 10,
        }
    }

    pub(crate) fn get_own(&self, name: &str) -> Option<PropertyValue> {
        match name {
            "FirstStrokeOffset" => Some(self.first_stroke_offset.into()),
            "StrokeLength" => Some(PropertyValue::Int(self.stroke_length)),
            "StrokeOffset" => Some(PropertyValue::Int(self.stroke_offset)),
            "StrokeAngle" => Some(PropertyValue::Int(self.stroke_angle)),
            "Space" => Some(PropertyValue::Int(self.space)),
            _ => None,
        }
    }

    pub(crate) fn set_own(&mut self, name: &'static str, value: &PropertyValue) -> Result<bool, PropertyError> {
        match name {
            "FirstStrokeOffset" => {
                self.first_stroke_offset = enum_of(name, value, FirstStrokeOffset::from_value)?
            }
            "StrokeLength" => self.stroke_length = int_of(name, value)?,
            "StrokeOffset" => self.stroke_offset = int_of(name, value)?,
            "StrokeAngle" => self.stroke_angle = int_of(name, value)?,
            "Space" => self.space = int_of(name, value)?,
            _ => return Ok(false),
        }
        Ok(true)
    }

    pub(crate) fn reconstruct(&self, frame: &Frame) -> Result<Vec<Primitive>, GeometryError> {
        let s = frame.factor;
        let stroke_length = f64::from(self.stroke_length) * s;
        let stroke_offset = f64::from(self.stroke_offset) * s;
        let space = f64::from(self.space) * s;
        let first = match self.first_stroke_offset {
            FirstStrokeOffset::ByHalfSpace => space / 2.0,
            FirstStrokeOffset::BySpace => space,
            FirstStrokeOffset::ByHalfStrokeOffset => stroke_offset / 2.0,
            FirstStrokeOffset::ByStrokeOffset => stroke_offset,
        };

        let group_step = stroke_offset * (STROKES_PER_GROUP - 1) as f64 + space;
        if group_step <= 0.0 {
            return Err(GeometryError::Degenerate(format!("stroke group step {}", group_step)));
        }

        let stroke = rotate(&frame.dir, PI + f64::from(self.stroke_angle).to_radians()) * stroke_length;
        let mut primitives = vec![Primitive::Line(Segment::new(frame.start, frame.end))];

        let mut position = first;
        'groups: while position <= frame.length {
            for j in 0..STROKES_PER_GROUP {
                let along = position + stroke_offset * j as f64;
                if along > frame.length {
                    break 'groups;
                }
                if primitives.len() >= MAX_PRIMITIVES {
                    return Err(GeometryError::TooManyPrimitives(MAX_PRIMITIVES));
                }
                let p = frame.at(along, 0.0);
                primitives.push(Primitive::Line(Segment::solid(p, p + stroke)));
            }
            position += group_step;
        }
        Ok(primitives)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::entities::SmartEntity;
    use crate::math::{approx_eq, Point2};
    use crate::registry::EntityKind;

    fn strokes(entity: &SmartEntity) -> Vec<Segment> {
        entity
            .reconstruct()
            .unwrap()
            .into_iter()
            .filter_map(|p| match p {
                Primitive::Line(l) if l.solid => Some(l),
                _ => None,
            })
            .collect()
    }

    #[test]
    fn test_stroke_groups_along_line() {
        let mut entity = SmartEntity::new(EntityKind::GroundLine, Point2::origin());
        entity.set_end_point(Point2::new(50.0, 0.0));
        // 组距 4*2+10 = 18，起点偏移 5：5,9,13 / 23,27,31 / 41,45,49
        let strokes = strokes(&entity);
        assert_eq!(strokes.len(), 9);
        assert!(approx_eq(strokes[0].start.x, 5.0));
        assert!(approx_eq(strokes[8].start.x, 49.0));
    }

    #[test]
    fn test_strokes_keep_length_and_angle() {
        let mut entity = SmartEntity::new(EntityKind::GroundLine, Point2::origin());
        entity.set_end_point(Point2::new(50.0, 0.0));
        entity.set("StrokeAngle", &PropertyValue::Int(90)).unwrap();
        for stroke in strokes(&entity) {
            assert!(approx_eq(stroke.length(), 8.0));
            assert!(approx_eq(stroke.end.x, stroke.start.x));
            assert!(stroke.end.y < 0.0);
        }
    }

    #[test]
    fn test_first_offset_by_stroke_offset() {
        let mut entity = SmartEntity::new(EntityKind::GroundLine, Point2::origin());
        entity.set_end_point(Point2::new(50.0, 0.0));
        entity
            .set("FirstStrokeOffset", &FirstStrokeOffset::ByStrokeOffset.into())
            .unwrap();
        assert!(approx_eq(strokes(&entity)[0].start.x, 4.0));
    }

    #[test]
    fn test_long_line_exceeds_primitive_limit() {
        let mut entity = SmartEntity::new(EntityKind::GroundLine, Point2::origin());
        entity.set_end_point(Point2::new(1.0e6, 0.0));
        assert_eq!(
            entity.reconstruct(),
            Err(GeometryError::TooManyPrimitives(MAX_PRIMITIVES))
        );
    }
}
