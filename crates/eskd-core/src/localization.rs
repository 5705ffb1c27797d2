//! 本地化
//!
//! 属性元数据和枚举成员只保存本地化键，显示文本由 [`Localizer`] 提供。
//! 未知的键原样返回。

use std::collections::HashMap;

/// 核心使用的固定键
pub mod keys {
    /// 汇总属性没有成员
    pub const UNDEFINED: &str = "summary.undefined";
    /// 汇总属性成员的值不同
    pub const DIFFERENT: &str = "summary.different";
    /// 样式中的"默认图层"占位
    pub const DEFAULT_LAYER: &str = "layer.default";
    /// 对象位于锁定图层，无法修改
    pub const LAYER_LOCKED: &str = "warning.layerLocked";
    /// 同一实体类型下存在重名样式
    pub const DUPLICATE_STYLE_NAMES: &str = "error.duplicateStyleNames";
    /// 系统样式名称
    pub const SYSTEM_STYLE: &str = "style.system";
    /// 选择对象过多
    pub const TOO_MANY_OBJECTS: &str = "warning.tooManyObjects";
}

/// 本地化服务
pub trait Localizer {
    /// 查找键对应的文本
    fn lookup(&self, key: &str) -> Option<&str>;

    /// 获取键对应的文本，找不到时返回键本身
    fn get(&self, key: &str) -> String {
        self.lookup(key).unwrap_or(key).to_string()
    }
}

/// 内置英文字符串表
#[derive(Debug, Clone)]
pub struct BuiltinLocalizer {
    table: HashMap<&'static str, &'static str>,
}

const ENGLISH: &[(&str, &str)] = &[
    (keys::UNDEFINED, "*undefined*"),
    (keys::DIFFERENT, "*varies*"),
    (keys::DEFAULT_LAYER, "By default"),
    (keys::LAYER_LOCKED, "Some objects are on a locked layer and were not changed"),
    (keys::DUPLICATE_STYLE_NAMES, "Styles with duplicate names found"),
    (keys::SYSTEM_STYLE, "Basic"),
    (keys::TOO_MANY_OBJECTS, "Too many objects selected"),
    // 类别
    ("category.General", "General"),
    ("category.Geometry", "Geometry"),
    ("category.Content", "Content"),
    ("category.Misc", "Misc"),
    // 实体类型
    ("entity.Axis", "Axis"),
    ("entity.BreakLine", "Break line"),
    ("entity.GroundLine", "Ground line"),
    // 公共属性
    ("p.Style", "Style"),
    ("d.Style", "Entity style"),
    ("p.Scale", "Scale"),
    ("d.Scale", "Annotation scale of the entity"),
    ("p.LayerName", "Layer"),
    ("d.LayerName", "Layer of the entity"),
    ("p.LineType", "Line type"),
    ("d.LineType", "Line type of the entity"),
    ("p.LineTypeScale", "Line type scale"),
    ("d.LineTypeScale", "Line type scale of the entity"),
    ("p.TextStyle", "Text style"),
    ("d.TextStyle", "Text style of the entity texts"),
    ("p.TextHeight", "Text height"),
    ("d.TextHeight", "Height of the entity texts"),
    // 轴线
    ("p.Fracture", "Fracture"),
    ("d.Fracture", "Length of the solid end segments"),
    ("p.BottomFractureOffset", "Bottom fracture offset"),
    ("d.BottomFractureOffset", "Extension of the axis below the start point"),
    ("p.TopFractureOffset", "Top fracture offset"),
    ("d.TopFractureOffset", "Extension of the axis beyond the end point"),
    ("p.MarkersPosition", "Markers position"),
    ("d.MarkersPosition", "Ends of the axis that carry markers"),
    ("p.MarkersDiameter", "Markers diameter"),
    ("d.MarkersDiameter", "Diameter of the marker circles"),
    ("p.MarkersCount", "Markers count"),
    ("d.MarkersCount", "Number of markers at each marked end"),
    ("p.FirstTextPrefix", "First text prefix"),
    ("d.FirstTextPrefix", "Prefix of the first marker text"),
    ("p.FirstText", "First text"),
    ("d.FirstText", "Text of the first marker"),
    ("p.FirstTextSuffix", "First text suffix"),
    ("d.FirstTextSuffix", "Suffix of the first marker text"),
    ("p.SecondText", "Second text"),
    ("d.SecondText", "Text of the second marker"),
    ("p.ThirdText", "Third text"),
    ("d.ThirdText", "Text of the third marker"),
    ("p.AxisStep", "Axis step"),
    ("d.AxisStep", "Offset of the next axis when copying"),
    ("amp.Both", "Both"),
    ("amp.Top", "Top"),
    ("amp.Bottom", "Bottom"),
    // 断开线
    ("p.Overhang", "Overhang"),
    ("d.Overhang", "Extension of the break line beyond its points"),
    ("p.BreakHeight", "Break height"),
    ("d.BreakHeight", "Height of the break"),
    ("p.BreakWidth", "Break width"),
    ("d.BreakWidth", "Width of the break"),
    ("p.BreakLineType", "Break line type"),
    ("d.BreakLineType", "Shape of the break"),
    ("blt.Linear", "Linear"),
    ("blt.Curvilinear", "Curvilinear"),
    ("blt.Cylindrical", "Cylindrical"),
    // 地面线
    ("p.FirstStrokeOffset", "First stroke offset"),
    ("d.FirstStrokeOffset", "Offset of the first stroke group from the start"),
    ("p.StrokeLength", "Stroke length"),
    ("d.StrokeLength", "Length of a single stroke"),
    ("p.StrokeOffset", "Stroke offset"),
    ("d.StrokeOffset", "Distance between strokes in a group"),
    ("p.StrokeAngle", "Stroke angle"),
    ("d.StrokeAngle", "Angle of the strokes to the ground line"),
    ("p.Space", "Space"),
    ("d.Space", "Distance between stroke groups"),
    ("fso.ByHalfSpace", "Half of space"),
    ("fso.BySpace", "Space"),
    ("fso.ByHalfStrokeOffset", "Half of stroke offset"),
    ("fso.ByStrokeOffset", "Stroke offset"),
];

impl BuiltinLocalizer {
    /// 英文字符串表
    pub fn english() -> Self {
        Self {
            table: ENGLISH.iter().copied().collect(),
        }
    }

    /// 覆盖或添加一条字符串
    pub fn insert(&mut self, key: &'static str, text: &'static str) {
        self.table.insert(key, text);
    }
}

impl Default for BuiltinLocalizer {
    fn default() -> Self {
        Self::english()
    }
}

impl Localizer for BuiltinLocalizer {
    fn lookup(&self, key: &str) -> Option<&str> {
        self.table.get(key).copied()
    }
}
