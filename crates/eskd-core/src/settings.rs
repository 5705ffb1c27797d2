//! 用户设置
//!
//! 核心只读取设置，持久化由 `eskd-file` 负责。

use crate::registry::EntityKind;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use uuid::Uuid;

/// 默认允许同时处理的选中对象数量
pub const DEFAULT_MAX_SELECTED_OBJECTS: usize = 100;

/// 用户设置
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct UserSettings {
    /// 每种实体类型的当前样式，键为实体类型名称
    pub current_styles: BTreeMap<String, Uuid>,

    /// 创建实体时使用样式中的比例，否则使用图纸当前比例
    pub use_scale_from_style: bool,

    /// 创建实体时使用样式中的图层，否则使用当前图层
    pub use_layer_from_style: bool,

    /// 创建实体时使用样式中的文字样式
    pub use_text_style_from_style: bool,

    /// 图层不存在时根据样式附带的描述创建
    pub create_missing_layers: bool,

    /// 文字样式不存在时根据样式附带的描述创建
    pub create_missing_text_styles: bool,

    /// 选中对象超过此数量时不显示属性面板
    pub max_selected_objects: usize,
}

impl Default for UserSettings {
    fn default() -> Self {
        Self {
            current_styles: BTreeMap::new(),
            use_scale_from_style: false,
            use_layer_from_style: true,
            use_text_style_from_style: true,
            create_missing_layers: true,
            create_missing_text_styles: true,
            max_selected_objects: DEFAULT_MAX_SELECTED_OBJECTS,
        }
    }
}

impl UserSettings {
    /// 当前样式 guid，未设置时为 `None`
    pub fn current_style(&self, kind: EntityKind) -> Option<Uuid> {
        self.current_styles.get(kind.name()).copied()
    }

    pub fn set_current_style(&mut self, kind: EntityKind, guid: Uuid) {
        self.current_styles.insert(kind.name().to_string(), guid);
    }

    /// 选择集大小是否在允许范围内
    pub fn selection_allowed(&self, count: usize) -> bool {
        count <= self.max_selected_objects
    }
}
