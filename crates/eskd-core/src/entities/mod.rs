//! 智能实体
//!
//! 每种实体由公共部分 [`EntityBase`] 和自身参数组成。几何图元完全由
//! 参数和两个锚点（插入点、终点）计算得出：
//!
//! - 终点尚未给出时（[`ReconstructionState::AwaitingFirstPoint`]），按最小长度
//!   绘制占位图形，使实体在拖动过程中可见；
//! - 给出的终点过近时，跨度被拉长到最小长度，而不是拒绝输入；
//! - 重建是纯函数，同样的输入总是得到同样的图元；
//! - 重建失败时报告错误并保留上一次成功的图元。

pub mod axis;
pub mod break_line;
pub mod ground_line;

use crate::handle::EntityHandle;
use crate::instance::PropertyError;
use crate::math::{left_normal, Point2, Vector2, EPSILON};
use crate::metadata::PropertyStorage;
use crate::primitive::Primitive;
use crate::registry::EntityKind;
use crate::report::ErrorReporter;
use crate::scale::AnnotationScale;
use crate::value::{EnumValue, PropertyValue, ValueKind};
use uuid::Uuid;

pub use axis::Axis;
pub use break_line::BreakLine;
pub use ground_line::GroundLine;

/// 单次重建允许生成的最大图元数量
pub(crate) const MAX_PRIMITIVES: usize = 10_000;

/// 重建错误
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum GeometryError {
    #[error("Degenerate geometry: {0}")]
    Degenerate(String),

    #[error("Too many primitives generated: more than {0}")]
    TooManyPrimitives(usize),

    #[error("Geometry contains non-finite coordinates")]
    NonFinite,
}

/// 重建状态
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReconstructionState {
    /// 终点尚未给出
    AwaitingFirstPoint,
    /// 两个锚点都已确定
    Placed,
}

/// 所有实体共有的数据
#[derive(Debug, Clone, PartialEq)]
pub struct EntityBase {
    /// 宿主块句柄，放置前为 `None`
    pub handle: Option<EntityHandle>,
    pub insertion_point: Point2,
    pub end_point: Option<Point2>,
    pub style_guid: Uuid,
    pub scale: AnnotationScale,
    pub layer_name: String,
    pub line_type: String,
    pub line_type_scale: f64,
    /// 上一次成功重建的图元
    pub primitives: Vec<Primitive>,
}

impl EntityBase {
    pub fn new(insertion_point: Point2) -> Self {
        Self {
            handle: None,
            insertion_point,
            end_point: None,
            style_guid: Uuid::nil(),
            scale: AnnotationScale::default(),
            layer_name: "0".to_string(),
            line_type: "Continuous".to_string(),
            line_type_scale: 1.0,
            primitives: Vec::new(),
        }
    }

    fn get(&self, name: &str) -> Option<PropertyValue> {
        match name {
            "Scale" => Some(PropertyValue::Scale(self.scale.clone())),
            "LayerName" => Some(PropertyValue::String(self.layer_name.clone())),
            "LineType" => Some(PropertyValue::String(self.line_type.clone())),
            "LineTypeScale" => Some(PropertyValue::Double(self.line_type_scale)),
            _ => None,
        }
    }

    fn set(&mut self, name: &'static str, value: &PropertyValue) -> Result<bool, PropertyError> {
        match name {
            "Scale" => {
                self.scale = value
                    .as_scale()
                    .cloned()
                    .ok_or_else(|| mismatch(name, ValueKind::Scale, value))?;
            }
            "LayerName" => self.layer_name = string_of(name, value)?,
            "LineType" => self.line_type = string_of(name, value)?,
            "LineTypeScale" => self.line_type_scale = double_of(name, value)?,
            _ => return Ok(false),
        }
        Ok(true)
    }
}

/// 智能实体
#[derive(Debug, Clone, PartialEq)]
pub enum SmartEntity {
    Axis(Axis),
    BreakLine(BreakLine),
    GroundLine(GroundLine),
}

impl SmartEntity {
    /// 以元数据默认值创建实体
    pub fn new(kind: EntityKind, insertion_point: Point2) -> Self {
        let base = EntityBase::new(insertion_point);
        let mut entity = match kind {
            EntityKind::Axis => SmartEntity::Axis(Axis::new(base)),
            EntityKind::BreakLine => SmartEntity::BreakLine(BreakLine::new(base)),
            EntityKind::GroundLine => SmartEntity::GroundLine(GroundLine::new(base)),
        };

        for meta in kind.metadata() {
            if meta.storage == PropertyStorage::StyleReference || meta.name == "LayerName" {
                continue;
            }
            if let Err(e) = entity.set(meta.name, &meta.default_value) {
                tracing::error!("Default of {}.{} rejected: {}", kind, meta.name, e);
            }
        }
        entity
    }

    pub fn kind(&self) -> EntityKind {
        match self {
            SmartEntity::Axis(_) => EntityKind::Axis,
            SmartEntity::BreakLine(_) => EntityKind::BreakLine,
            SmartEntity::GroundLine(_) => EntityKind::GroundLine,
        }
    }

    pub fn base(&self) -> &EntityBase {
        match self {
            SmartEntity::Axis(e) => &e.base,
            SmartEntity::BreakLine(e) => &e.base,
            SmartEntity::GroundLine(e) => &e.base,
        }
    }

    pub fn base_mut(&mut self) -> &mut EntityBase {
        match self {
            SmartEntity::Axis(e) => &mut e.base,
            SmartEntity::BreakLine(e) => &mut e.base,
            SmartEntity::GroundLine(e) => &mut e.base,
        }
    }

    /// 读取参数的当前值，"Style" 由调用方根据 guid 解析
    pub fn get(&self, name: &str) -> Option<PropertyValue> {
        self.base().get(name).or_else(|| match self {
            SmartEntity::Axis(e) => e.get_own(name),
            SmartEntity::BreakLine(e) => e.get_own(name),
            SmartEntity::GroundLine(e) => e.get_own(name),
        })
    }

    /// 设置参数，数值被限制在元数据声明的范围内
    pub fn set(&mut self, name: &str, value: &PropertyValue) -> Result<(), PropertyError> {
        let kind = self.kind();
        let meta = kind
            .find_metadata(name)
            .filter(|m| m.storage != PropertyStorage::StyleReference)
            .ok_or_else(|| PropertyError::UnknownProperty {
                kind,
                name: name.to_string(),
            })?;

        if !meta.accepts(value) {
            return Err(mismatch(meta.name, meta.value_kind(), value));
        }
        let value = meta.clamp(value.clone());

        if self.base_mut().set(meta.name, &value)? {
            return Ok(());
        }
        let known = match self {
            SmartEntity::Axis(e) => e.set_own(meta.name, &value)?,
            SmartEntity::BreakLine(e) => e.set_own(meta.name, &value)?,
            SmartEntity::GroundLine(e) => e.set_own(meta.name, &value)?,
        };
        if known {
            Ok(())
        } else {
            Err(PropertyError::UnknownProperty {
                kind,
                name: name.to_string(),
            })
        }
    }

    /// 重建状态
    pub fn state(&self) -> ReconstructionState {
        match self.base().end_point {
            Some(_) => ReconstructionState::Placed,
            None => ReconstructionState::AwaitingFirstPoint,
        }
    }

    /// 最小跨度（图形单位）
    pub fn min_span(&self) -> f64 {
        self.kind().min_length() * self.base().scale.factor()
    }

    /// 给出定义点，跨度不足最小长度时沿同一方向拉长
    pub fn set_end_point(&mut self, point: Point2) {
        let min = self.min_span();
        let base = self.base_mut();
        base.end_point = Some(clamp_span(base.insertion_point, point, min));
    }

    /// 重建时实际使用的终点
    pub fn effective_end(&self) -> Point2 {
        let base = self.base();
        let min = self.min_span();
        match base.end_point {
            Some(end) => clamp_span(base.insertion_point, end, min),
            None => base.insertion_point + Vector2::new(min, 0.0),
        }
    }

    /// 终点相对插入点的偏移
    pub fn end_offset(&self) -> Option<Vector2> {
        let base = self.base();
        base.end_point.map(|e| e - base.insertion_point)
    }

    /// 根据当前参数计算图元
    pub fn reconstruct(&self) -> Result<Vec<Primitive>, GeometryError> {
        let frame = Frame::new(self.base().insertion_point, self.effective_end(), self.base().scale.factor())?;
        let primitives = match self {
            SmartEntity::Axis(e) => e.reconstruct(&frame)?,
            SmartEntity::BreakLine(e) => e.reconstruct(&frame)?,
            SmartEntity::GroundLine(e) => e.reconstruct(&frame)?,
        };
        if primitives.len() > MAX_PRIMITIVES {
            return Err(GeometryError::TooManyPrimitives(MAX_PRIMITIVES));
        }
        if !primitives.iter().all(Primitive::is_finite) {
            return Err(GeometryError::NonFinite);
        }
        Ok(primitives)
    }

    /// 重建图元；失败时报告并保留上一次成功的图元
    pub fn update_geometry(&mut self, reporter: &mut dyn ErrorReporter) -> bool {
        match self.reconstruct() {
            Ok(primitives) => {
                self.base_mut().primitives = primitives;
                true
            }
            Err(e) => {
                reporter.report(&format!("Reconstruction of {} failed", self.kind()), &e);
                false
            }
        }
    }
}

/// 重建用的局部坐标系
#[derive(Debug, Clone, Copy)]
pub(crate) struct Frame {
    pub start: Point2,
    pub end: Point2,
    /// 起点指向终点的单位向量
    pub dir: Vector2,
    /// 左手法向量
    pub normal: Vector2,
    pub length: f64,
    /// 比例因子
    pub factor: f64,
}

impl Frame {
    fn new(start: Point2, end: Point2, factor: f64) -> Result<Self, GeometryError> {
        let v = end - start;
        let length = v.norm();
        if !length.is_finite() || !factor.is_finite() {
            return Err(GeometryError::NonFinite);
        }
        if length < EPSILON || factor <= 0.0 {
            return Err(GeometryError::Degenerate(format!(
                "span {} with scale factor {}",
                length, factor
            )));
        }
        let dir = v / length;
        Ok(Self {
            start,
            end,
            dir,
            normal: left_normal(&dir),
            length,
            factor,
        })
    }

    /// 起点沿方向偏移 `along`、沿法向偏移 `across` 的点
    pub fn at(&self, along: f64, across: f64) -> Point2 {
        self.start + self.dir * along + self.normal * across
    }
}

fn clamp_span(start: Point2, end: Point2, min: f64) -> Point2 {
    let v = end - start;
    let len = v.norm();
    if !len.is_finite() || len >= min {
        return end;
    }
    let dir = if len > EPSILON {
        v / len
    } else {
        Vector2::new(1.0, 0.0)
    };
    start + dir * min
}

pub(crate) fn mismatch(name: &'static str, expected: ValueKind, value: &PropertyValue) -> PropertyError {
    PropertyError::TypeMismatch {
        name,
        expected,
        found: value.kind(),
    }
}

pub(crate) fn int_of(name: &'static str, value: &PropertyValue) -> Result<i32, PropertyError> {
    value.as_int().ok_or_else(|| mismatch(name, ValueKind::Int, value))
}

pub(crate) fn double_of(name: &'static str, value: &PropertyValue) -> Result<f64, PropertyError> {
    value
        .as_double()
        .ok_or_else(|| mismatch(name, ValueKind::Double, value))
}

pub(crate) fn string_of(name: &'static str, value: &PropertyValue) -> Result<String, PropertyError> {
    value
        .as_str()
        .map(str::to_string)
        .ok_or_else(|| mismatch(name, ValueKind::String, value))
}

pub(crate) fn enum_of<T>(
    name: &'static str,
    value: &PropertyValue,
    convert: fn(&EnumValue) -> Option<T>,
) -> Result<T, PropertyError> {
    value
        .as_enum()
        .and_then(|e| convert(&e))
        .ok_or_else(|| mismatch(name, ValueKind::Enum, value))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::math::points_approx_eq;
    use crate::report::RecordingReporter;

    #[test]
    fn test_new_entity_matches_metadata_defaults() {
        for kind in EntityKind::ALL {
            let entity = SmartEntity::new(kind, Point2::origin());
            for meta in kind.metadata() {
                if meta.storage == PropertyStorage::StyleReference || meta.name == "LayerName" {
                    continue;
                }
                assert_eq!(entity.get(meta.name).as_ref(), Some(&meta.default_value), "{}.{}", kind, meta.name);
            }
            assert_eq!(entity.base().layer_name, "0");
        }
    }

    #[test]
    fn test_placeholder_while_awaiting_first_point() {
        let entity = SmartEntity::new(EntityKind::BreakLine, Point2::new(5.0, 5.0));
        assert_eq!(entity.state(), ReconstructionState::AwaitingFirstPoint);
        assert!(points_approx_eq(&entity.effective_end(), &Point2::new(20.0, 5.0)));
        assert!(!entity.reconstruct().unwrap().is_empty());
    }

    #[test]
    fn test_short_span_is_clamped_not_rejected() {
        let mut entity = SmartEntity::new(EntityKind::GroundLine, Point2::origin());
        entity.set_end_point(Point2::new(0.0, 3.0));
        assert_eq!(entity.state(), ReconstructionState::Placed);
        assert!(points_approx_eq(&entity.base().end_point.unwrap(), &Point2::new(0.0, 20.0)));

        // 与插入点重合时沿 X 轴拉长
        entity.set_end_point(Point2::origin());
        assert!(points_approx_eq(&entity.effective_end(), &Point2::new(20.0, 0.0)));
    }

    #[test]
    fn test_min_span_follows_scale() {
        let mut entity = SmartEntity::new(EntityKind::BreakLine, Point2::origin());
        entity
            .set("Scale", &PropertyValue::Scale(AnnotationScale::parse("1:10").unwrap()))
            .unwrap();
        assert_eq!(entity.min_span(), 150.0);
    }

    #[test]
    fn test_reconstruction_is_idempotent() {
        for kind in EntityKind::ALL {
            let mut entity = SmartEntity::new(kind, Point2::new(1.0, 2.0));
            entity.set_end_point(Point2::new(137.0, 58.0));
            let first = entity.reconstruct().unwrap();
            let second = entity.reconstruct().unwrap();
            assert_eq!(first, second, "{}", kind);
        }
    }

    #[test]
    fn test_set_clamps_and_type_checks() {
        let mut entity = SmartEntity::new(EntityKind::BreakLine, Point2::origin());
        entity.set("Overhang", &PropertyValue::Int(99)).unwrap();
        assert_eq!(entity.get("Overhang"), Some(PropertyValue::Int(10)));

        assert!(matches!(
            entity.set("Overhang", &PropertyValue::Double(1.0)),
            Err(PropertyError::TypeMismatch { .. })
        ));
        assert!(matches!(
            entity.set("Nope", &PropertyValue::Int(1)),
            Err(PropertyError::UnknownProperty { .. })
        ));
        assert!(entity.set("Style", &PropertyValue::from("x")).is_err());
    }

    #[test]
    fn test_failed_reconstruction_keeps_last_good_geometry() {
        let mut entity = SmartEntity::new(EntityKind::Axis, Point2::origin());
        entity.set_end_point(Point2::new(100.0, 0.0));
        let mut reporter = RecordingReporter::new();
        assert!(entity.update_geometry(&mut reporter));
        let good = entity.base().primitives.clone();

        entity.base_mut().end_point = Some(Point2::new(f64::NAN, 0.0));
        assert!(!entity.update_geometry(&mut reporter));
        assert_eq!(entity.base().primitives, good);
        assert_eq!(reporter.errors.len(), 1);
    }
}
