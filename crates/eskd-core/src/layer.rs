//! 图层表
//!
//! 样式可以附带图层描述，应用样式时按需在图纸中创建该图层。

use serde::{Deserialize, Serialize};

/// RGB颜色
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Color {
    pub r: u8,
    pub g: u8,
    pub b: u8,
}

impl Color {
    pub const WHITE: Color = Color::new(255, 255, 255);
    pub const RED: Color = Color::new(255, 0, 0);

    pub const fn new(r: u8, g: u8, b: u8) -> Self {
        Self { r, g, b }
    }

    /// 从十六进制值创建（如 0xFF0000 表示红色）
    pub const fn from_hex(hex: u32) -> Self {
        Self {
            r: ((hex >> 16) & 0xFF) as u8,
            g: ((hex >> 8) & 0xFF) as u8,
            b: (hex & 0xFF) as u8,
        }
    }

    pub fn to_hex(&self) -> u32 {
        (u32::from(self.r) << 16) | (u32::from(self.g) << 8) | u32::from(self.b)
    }
}

impl Default for Color {
    fn default() -> Self {
        Color::WHITE
    }
}

/// 图层定义
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Layer {
    /// 图层名称
    pub name: String,

    /// 图层颜色
    pub color: Color,

    /// 图层线型
    pub line_type: String,

    /// 是否可见
    pub visible: bool,

    /// 是否锁定
    pub locked: bool,

    /// 是否冻结
    pub frozen: bool,

    /// 描述
    pub description: String,
}

impl Layer {
    /// 创建新图层
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            color: Color::WHITE,
            line_type: "Continuous".to_string(),
            visible: true,
            locked: false,
            frozen: false,
            description: String::new(),
        }
    }

    /// 默认图层（0层）
    pub fn default_layer() -> Self {
        Self {
            description: "Default layer".to_string(),
            ..Self::new("0")
        }
    }

    /// 设置颜色
    pub fn with_color(mut self, color: Color) -> Self {
        self.color = color;
        self
    }

    /// 设置线型
    pub fn with_line_type(mut self, line_type: impl Into<String>) -> Self {
        self.line_type = line_type.into();
        self
    }

    /// 检查图层上的实体是否应该显示
    pub fn should_display(&self) -> bool {
        self.visible && !self.frozen
    }
}

/// 图层表
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LayerTable {
    /// 所有图层
    layers: Vec<Layer>,

    /// 当前图层的索引
    current_layer_index: usize,
}

impl LayerTable {
    pub fn new() -> Self {
        Self {
            layers: vec![Layer::default_layer()],
            current_layer_index: 0,
        }
    }

    /// 获取当前图层
    pub fn current_layer(&self) -> &Layer {
        // 0层不可删除，索引总是有效
        &self.layers[self.current_layer_index.min(self.layers.len() - 1)]
    }

    /// 设置当前图层
    pub fn set_current_layer(&mut self, name: &str) -> bool {
        if let Some(idx) = self.layers.iter().position(|l| l.name == name) {
            self.current_layer_index = idx;
            true
        } else {
            false
        }
    }

    /// 添加图层，同名图层已存在时返回错误
    pub fn add_layer(&mut self, layer: Layer) -> Result<(), LayerError> {
        if self.contains(&layer.name) {
            return Err(LayerError::LayerAlreadyExists(layer.name));
        }
        self.layers.push(layer);
        Ok(())
    }

    pub fn contains(&self, name: &str) -> bool {
        self.layers.iter().any(|l| l.name == name)
    }

    /// 获取图层（按名称）
    pub fn get_layer(&self, name: &str) -> Option<&Layer> {
        self.layers.iter().find(|l| l.name == name)
    }

    /// 获取图层（可变，按名称）
    pub fn get_layer_mut(&mut self, name: &str) -> Option<&mut Layer> {
        self.layers.iter_mut().find(|l| l.name == name)
    }

    /// 获取所有图层
    pub fn all_layers(&self) -> &[Layer] {
        &self.layers
    }

    /// 图层是否锁定，不存在的图层视为未锁定
    pub fn is_locked(&self, name: &str) -> bool {
        self.get_layer(name).map(|l| l.locked).unwrap_or(false)
    }

    /// 图层上的实体是否显示，不存在的图层视为显示
    pub fn is_displayed(&self, name: &str) -> bool {
        self.get_layer(name).map_or(true, Layer::should_display)
    }

    /// 图层数量
    pub fn count(&self) -> usize {
        self.layers.len()
    }
}

impl Default for LayerTable {
    fn default() -> Self {
        Self::new()
    }
}

/// 图层操作错误
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum LayerError {
    #[error("Layer not found: {0}")]
    LayerNotFound(String),

    #[error("Layer already exists: {0}")]
    LayerAlreadyExists(String),
}
