//! 绘图图元
//!
//! 智能实体重建后生成的派生图元。宿主块只保存这些图元用于显示，
//! 参数本身保存在扩展数据记录中。

use crate::math::{BoundingBox2, Point2};
use serde::{Deserialize, Serialize};

/// 图元类型枚举
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Primitive {
    Line(Segment),
    Polyline(Polyline),
    Circle(Circle),
    Text(Text),
}

impl Primitive {
    /// 获取图元的包围盒
    pub fn bounding_box(&self) -> BoundingBox2 {
        match self {
            Primitive::Line(l) => l.bounding_box(),
            Primitive::Polyline(pl) => pl.bounding_box(),
            Primitive::Circle(c) => c.bounding_box(),
            Primitive::Text(t) => t.bounding_box(),
        }
    }

    /// 所有坐标是否为有限值
    pub fn is_finite(&self) -> bool {
        let finite = |p: &Point2| p.x.is_finite() && p.y.is_finite();
        match self {
            Primitive::Line(l) => finite(&l.start) && finite(&l.end),
            Primitive::Polyline(pl) => pl.vertices.iter().all(finite),
            Primitive::Circle(c) => finite(&c.center) && c.radius.is_finite(),
            Primitive::Text(t) => finite(&t.position) && t.height.is_finite(),
        }
    }
}

/// 线段
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Segment {
    pub start: Point2,
    pub end: Point2,
    /// 是否强制实线（忽略块的线型）
    pub solid: bool,
}

impl Segment {
    pub fn new(start: Point2, end: Point2) -> Self {
        Self {
            start,
            end,
            solid: false,
        }
    }

    pub fn solid(start: Point2, end: Point2) -> Self {
        Self {
            start,
            end,
            solid: true,
        }
    }

    /// 计算线段长度
    pub fn length(&self) -> f64 {
        (self.end - self.start).norm()
    }

    pub fn bounding_box(&self) -> BoundingBox2 {
        BoundingBox2::from_points([self.start, self.end])
    }
}

/// 多段线
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Polyline {
    pub vertices: Vec<Point2>,
    pub closed: bool,
}

impl Polyline {
    pub fn new(vertices: Vec<Point2>) -> Self {
        Self {
            vertices,
            closed: false,
        }
    }

    pub fn vertex_count(&self) -> usize {
        self.vertices.len()
    }

    /// 计算总长度
    pub fn length(&self) -> f64 {
        self.vertices
            .windows(2)
            .map(|w| (w[1] - w[0]).norm())
            .sum()
    }

    pub fn bounding_box(&self) -> BoundingBox2 {
        BoundingBox2::from_points(self.vertices.iter().copied())
    }
}

/// 圆
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Circle {
    pub center: Point2,
    pub radius: f64,
}

impl Circle {
    pub fn new(center: Point2, radius: f64) -> Self {
        Self { center, radius }
    }

    pub fn bounding_box(&self) -> BoundingBox2 {
        BoundingBox2::new(
            Point2::new(self.center.x - self.radius, self.center.y - self.radius),
            Point2::new(self.center.x + self.radius, self.center.y + self.radius),
        )
    }
}

/// 居中文本
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Text {
    /// 对齐点（文本中心）
    pub position: Point2,
    pub content: String,
    pub height: f64,
    /// 文字样式名称
    pub style: String,
}

impl Text {
    pub fn new(position: Point2, content: impl Into<String>, height: f64, style: impl Into<String>) -> Self {
        Self {
            position,
            content: content.into(),
            height,
            style: style.into(),
        }
    }

    /// 近似包围盒（按字符宽度 0.7 倍字高估算）
    pub fn bounding_box(&self) -> BoundingBox2 {
        let half_width = self.content.chars().count() as f64 * self.height * 0.35;
        let half_height = self.height / 2.0;
        BoundingBox2::new(
            Point2::new(self.position.x - half_width, self.position.y - half_height),
            Point2::new(self.position.x + half_width, self.position.y + half_height),
        )
    }
}

/// 计算一组图元的总包围盒
pub fn bounds_of(primitives: &[Primitive]) -> Option<BoundingBox2> {
    let mut iter = primitives.iter();
    let first = iter.next()?.bounding_box();
    Some(iter.fold(first, |acc, p| acc.union(&p.bounding_box())))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_polyline_length() {
        let pl = Polyline::new(vec![
            Point2::new(0.0, 0.0),
            Point2::new(3.0, 0.0),
            Point2::new(3.0, 4.0),
        ]);
        assert!((pl.length() - 7.0).abs() < 1e-12);
    }

    #[test]
    fn test_bounds_of_primitives() {
        let prims = vec![
            Primitive::Line(Segment::new(Point2::new(0.0, 0.0), Point2::new(10.0, 0.0))),
            Primitive::Circle(Circle::new(Point2::new(10.0, 0.0), 2.0)),
        ];
        let bbox = bounds_of(&prims).unwrap();
        assert_eq!(bbox.max.x, 12.0);
        assert_eq!(bbox.min.y, -2.0);
        assert!(bounds_of(&[]).is_none());
    }

    #[test]
    fn test_non_finite_detection() {
        let bad = Primitive::Circle(Circle::new(Point2::new(f64::NAN, 0.0), 1.0));
        assert!(!bad.is_finite());
    }
}
