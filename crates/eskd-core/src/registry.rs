//! 实体类型与属性元数据注册表
//!
//! 每个实体类型对应一个按声明顺序排列的元数据列表。声明顺序就是
//! 扩展数据记录中各字段的顺序，新增属性只能追加在末尾。

use crate::metadata::{PropertyCategory, PropertyMetadata, PropertyScope, PropertyStorage};
use crate::scale::AnnotationScale;
use serde::{Deserialize, Serialize};
use std::collections::{HashMap, HashSet};
use std::fmt;
use std::sync::OnceLock;

/// 智能实体类型
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum EntityKind {
    Axis,
    BreakLine,
    GroundLine,
}

impl EntityKind {
    /// 所有实体类型
    pub const ALL: [EntityKind; 3] = [EntityKind::Axis, EntityKind::BreakLine, EntityKind::GroundLine];

    /// 在 [`EntityKind::ALL`] 中的位置
    pub fn index(&self) -> usize {
        *self as usize
    }

    /// 扩展数据记录中的类型标识
    pub fn type_tag(&self) -> &'static str {
        match self {
            EntityKind::Axis => "mpAxis",
            EntityKind::BreakLine => "mpBreakLine",
            EntityKind::GroundLine => "mpGroundLine",
        }
    }

    /// 由类型标识识别实体类型
    pub fn from_type_tag(tag: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|k| k.type_tag() == tag)
    }

    /// 类型名称
    pub fn name(&self) -> &'static str {
        match self {
            EntityKind::Axis => "Axis",
            EntityKind::BreakLine => "BreakLine",
            EntityKind::GroundLine => "GroundLine",
        }
    }

    pub fn display_key(&self) -> &'static str {
        match self {
            EntityKind::Axis => "entity.Axis",
            EntityKind::BreakLine => "entity.BreakLine",
            EntityKind::GroundLine => "entity.GroundLine",
        }
    }

    /// 最小长度（图纸单位，乘以比例因子后使用）
    pub fn min_length(&self) -> f64 {
        match self {
            EntityKind::Axis => 1.0,
            EntityKind::BreakLine => 15.0,
            EntityKind::GroundLine => 20.0,
        }
    }

    /// 按声明顺序排列的元数据
    pub fn metadata(&self) -> &'static [PropertyMetadata] {
        MetadataRegistry::global().properties(*self)
    }

    /// 查找元数据
    pub fn find_metadata(&self, name: &str) -> Option<&'static PropertyMetadata> {
        self.metadata().iter().find(|m| m.name == name)
    }
}

impl fmt::Display for EntityKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// 注册表错误
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum RegistryError {
    #[error("Duplicate property {name} in {kind}")]
    DuplicateProperty { kind: EntityKind, name: &'static str },

    #[error("Entity type already registered: {0}")]
    AlreadyRegistered(EntityKind),
}

/// 元数据注册表
#[derive(Debug, Default)]
pub struct MetadataRegistry {
    entries: HashMap<EntityKind, Vec<PropertyMetadata>>,
}

static GLOBAL: OnceLock<MetadataRegistry> = OnceLock::new();

impl MetadataRegistry {
    /// 空注册表
    pub fn new() -> Self {
        Self::default()
    }

    /// 包含全部内置实体类型的注册表
    pub fn standard() -> Self {
        let mut registry = Self::new();
        let declarations = [
            (EntityKind::Axis, crate::entities::axis::metadata()),
            (EntityKind::BreakLine, crate::entities::break_line::metadata()),
            (EntityKind::GroundLine, crate::entities::ground_line::metadata()),
        ];
        for (kind, properties) in declarations {
            if let Err(e) = registry.register(kind, properties) {
                tracing::error!("Failed to register {}: {}", kind, e);
            }
        }
        registry
    }

    /// 进程级注册表，首次访问时构建
    pub fn global() -> &'static MetadataRegistry {
        GLOBAL.get_or_init(Self::standard)
    }

    /// 注册一个实体类型的元数据
    pub fn register(
        &mut self,
        kind: EntityKind,
        properties: Vec<PropertyMetadata>,
    ) -> Result<(), RegistryError> {
        if self.entries.contains_key(&kind) {
            return Err(RegistryError::AlreadyRegistered(kind));
        }

        let mut seen = HashSet::new();
        for meta in &properties {
            if !seen.insert(meta.name) {
                return Err(RegistryError::DuplicateProperty {
                    kind,
                    name: meta.name,
                });
            }
        }

        self.entries.insert(kind, properties);
        Ok(())
    }

    /// 按声明顺序获取元数据
    pub fn properties(&self, kind: EntityKind) -> &[PropertyMetadata] {
        self.entries.get(&kind).map(Vec::as_slice).unwrap_or(&[])
    }

    /// 查找元数据
    pub fn find(&self, kind: EntityKind, name: &str) -> Option<&PropertyMetadata> {
        self.properties(kind).iter().find(|m| m.name == name)
    }

    /// 属性面板中显示的属性，按类别和排序号排列
    pub fn palette_properties(&self, kind: EntityKind) -> Vec<&PropertyMetadata> {
        let mut list: Vec<_> = self
            .properties(kind)
            .iter()
            .filter(|m| m.scope.in_palette())
            .collect();
        list.sort_by_key(|m| (m.category, m.order_index));
        list
    }

    /// 已注册的实体类型数量
    pub fn count(&self) -> usize {
        self.entries.len()
    }
}

/// 所有实体共有的属性：样式、比例、图层、线型、线型比例
pub(crate) fn common_properties(default_line_type: &'static str) -> Vec<PropertyMetadata> {
    vec![
        PropertyMetadata::new(PropertyCategory::General, 0, "Style", "")
            .keys("p.Style", "d.Style")
            .scope(PropertyScope::PaletteOnly)
            .storage(PropertyStorage::StyleReference),
        PropertyMetadata::new(
            PropertyCategory::General,
            1,
            "Scale",
            AnnotationScale::parse("1:1").unwrap_or_default(),
        )
        .keys("p.Scale", "d.Scale"),
        PropertyMetadata::new(PropertyCategory::General, 2, "LayerName", "")
            .keys("p.LayerName", "d.LayerName")
            .storage(PropertyStorage::HostBlock),
        PropertyMetadata::new(PropertyCategory::General, 3, "LineType", default_line_type)
            .keys("p.LineType", "d.LineType")
            .storage(PropertyStorage::HostBlock),
        PropertyMetadata::new(PropertyCategory::General, 4, "LineTypeScale", 1.0)
            .keys("p.LineTypeScale", "d.LineTypeScale")
            .range(0.0001, 1000.0)
            .storage(PropertyStorage::HostBlock),
    ]
}
