//! 宿主图纸
//!
//! 智能实体所在的宿主文档：块、图层表、线型表、文字样式表、事务和撤销记录。
//! 块保存渲染好的图元和扩展数据记录；对块的所有写操作都在事务中进行，
//! 事务失败时整体回滚。外部修改（撤销、拖动）通过事件队列通知调用方。

use crate::handle::EntityHandle;
use crate::layer::{Layer, LayerError, LayerTable};
use crate::math::Point2;
use crate::primitive::Primitive;
use crate::scale::AnnotationScale;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// 宿主块
#[derive(Debug, Clone, PartialEq)]
pub struct HostBlock {
    pub handle: EntityHandle,
    pub position: Point2,
    pub layer: String,
    pub line_type: String,
    pub line_type_scale: f64,
    /// 扩展数据记录
    pub xdata: Vec<u8>,
    pub primitives: Vec<Primitive>,
    pub erased: bool,
}

impl HostBlock {
    pub fn new(handle: EntityHandle, position: Point2) -> Self {
        Self {
            handle,
            position,
            layer: "0".to_string(),
            line_type: "Continuous".to_string(),
            line_type_scale: 1.0,
            xdata: Vec::new(),
            primitives: Vec::new(),
            erased: false,
        }
    }
}

/// 线型定义
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LineTypeDefinition {
    pub name: String,
    pub description: String,
    /// 划线长度，负数表示间隔；空表示实线
    pub pattern: Vec<f64>,
}

impl LineTypeDefinition {
    fn new(name: &str, description: &str, pattern: &[f64]) -> Self {
        Self {
            name: name.to_string(),
            description: description.to_string(),
            pattern: pattern.to_vec(),
        }
    }

    pub fn is_continuous(&self) -> bool {
        self.pattern.is_empty()
    }
}

/// 标准线型库
pub fn standard_line_types() -> Vec<LineTypeDefinition> {
    vec![
        LineTypeDefinition::new("Continuous", "Solid line", &[]),
        LineTypeDefinition::new("CENTER", "Center ____ _ ____ _", &[12.0, -3.0, 2.0, -3.0]),
        LineTypeDefinition::new("DASHED", "Dashed __ __ __", &[6.0, -3.0]),
        LineTypeDefinition::new("HIDDEN", "Hidden _ _ _ _", &[3.0, -1.5]),
        LineTypeDefinition::new("PHANTOM", "Phantom _____ _ _ _____", &[12.0, -2.0, 2.0, -2.0, 2.0, -2.0]),
    ]
}

/// 文字样式
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TextStyle {
    pub name: String,
    pub font: String,
    /// 0 表示高度不固定
    pub height: f64,
    pub width_factor: f64,
}

impl TextStyle {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            font: "GOST 2.304".to_string(),
            height: 0.0,
            width_factor: 1.0,
        }
    }
}

/// 外部修改事件
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HostEvent {
    Added(EntityHandle),
    Modified(EntityHandle),
    Erased(EntityHandle),
}

impl HostEvent {
    pub fn handle(&self) -> EntityHandle {
        match self {
            HostEvent::Added(h) | HostEvent::Modified(h) | HostEvent::Erased(h) => *h,
        }
    }
}

/// 宿主操作错误
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum HostError {
    #[error("Layer {0} is locked")]
    LayerLocked(String),

    #[error("Block not found: {0}")]
    BlockNotFound(EntityHandle),

    #[error("Block {0} is erased")]
    BlockErased(EntityHandle),

    #[error("Block {0} does not hold an intelligent entity")]
    NotIntelligentEntity(EntityHandle),

    #[error("Line type not found in library: {0}")]
    LineTypeNotFound(String),

    #[error("Nothing to undo")]
    NothingToUndo,

    #[error("Layer error: {0}")]
    Layer(#[from] LayerError),

    #[error("Record error: {0}")]
    Codec(String),
}

#[derive(Debug, Clone)]
struct Snapshot {
    blocks: BTreeMap<EntityHandle, HostBlock>,
    layers: LayerTable,
    line_types: Vec<LineTypeDefinition>,
    text_styles: Vec<TextStyle>,
}

/// 撤销记录
#[derive(Debug, Clone)]
struct UndoEntry {
    description: String,
    before: Snapshot,
}

/// 图纸
#[derive(Debug)]
pub struct Drawing {
    pub layers: LayerTable,
    line_types: Vec<LineTypeDefinition>,
    line_type_library: Vec<LineTypeDefinition>,
    text_styles: Vec<TextStyle>,
    blocks: BTreeMap<EntityHandle, HostBlock>,
    /// 当前注释比例
    pub current_scale: AnnotationScale,
    transaction: Option<Snapshot>,
    transaction_events: usize,
    undo_stack: Vec<UndoEntry>,
    events: Vec<HostEvent>,
}

impl Drawing {
    pub fn new() -> Self {
        let library = standard_line_types();
        Self {
            layers: LayerTable::new(),
            line_types: library.iter().filter(|l| l.is_continuous()).cloned().collect(),
            line_type_library: library,
            text_styles: vec![TextStyle::new("Standard")],
            blocks: BTreeMap::new(),
            current_scale: AnnotationScale::default(),
            transaction: None,
            transaction_events: 0,
            undo_stack: Vec::new(),
            events: Vec::new(),
        }
    }

    fn snapshot(&self) -> Snapshot {
        Snapshot {
            blocks: self.blocks.clone(),
            layers: self.layers.clone(),
            line_types: self.line_types.clone(),
            text_styles: self.text_styles.clone(),
        }
    }

    fn restore(&mut self, snapshot: Snapshot) {
        self.blocks = snapshot.blocks;
        self.layers = snapshot.layers;
        self.line_types = snapshot.line_types;
        self.text_styles = snapshot.text_styles;
    }

    /// 在事务中执行写操作，返回错误时回滚全部修改
    ///
    /// 已处于事务中时直接执行，由外层事务统一提交或回滚。
    pub fn transaction<T, E>(
        &mut self,
        description: &str,
        f: impl FnOnce(&mut Drawing) -> Result<T, E>,
    ) -> Result<T, E> {
        if self.transaction.is_some() {
            return f(self);
        }

        self.transaction = Some(self.snapshot());
        self.transaction_events = self.events.len();
        let result = f(self);
        let before = self.transaction.take();

        match (&result, before) {
            (Ok(_), Some(before)) => {
                tracing::debug!("Commit transaction: {}", description);
                self.undo_stack.push(UndoEntry {
                    description: description.to_string(),
                    before,
                });
            }
            (Err(_), Some(before)) => {
                tracing::debug!("Abort transaction: {}", description);
                self.restore(before);
                self.events.truncate(self.transaction_events);
            }
            (_, None) => {}
        }
        result
    }

    /// 撤销最近一次事务，受影响的块以外部修改事件通知
    pub fn undo(&mut self) -> Result<String, HostError> {
        let entry = self.undo_stack.pop().ok_or(HostError::NothingToUndo)?;
        let current = std::mem::take(&mut self.blocks);

        for (handle, block) in &entry.before.blocks {
            match current.get(handle) {
                None => self.events.push(HostEvent::Added(*handle)),
                Some(now) if now != block => self.events.push(HostEvent::Modified(*handle)),
                Some(_) => {}
            }
        }
        for handle in current.keys() {
            if !entry.before.blocks.contains_key(handle) {
                self.events.push(HostEvent::Erased(*handle));
            }
        }

        self.restore(entry.before);
        tracing::info!("Undo: {}", entry.description);
        Ok(entry.description)
    }

    pub fn undo_count(&self) -> usize {
        self.undo_stack.len()
    }

    /// 取出所有待处理的外部修改事件
    pub fn take_events(&mut self) -> Vec<HostEvent> {
        std::mem::take(&mut self.events)
    }

    /// 丢弃某个块的待处理事件
    pub fn discard_events_for(&mut self, handle: EntityHandle) {
        self.events.retain(|e| e.handle() != handle);
    }

    // ========== 块 ==========

    pub fn block(&self, handle: EntityHandle) -> Option<&HostBlock> {
        self.blocks.get(&handle)
    }

    /// 所有未删除的块
    pub fn blocks(&self) -> impl Iterator<Item = &HostBlock> {
        self.blocks.values().filter(|b| !b.erased)
    }

    /// 检查句柄指向一个有效的块
    pub fn validate(&self, handle: EntityHandle) -> Result<&HostBlock, HostError> {
        if handle.is_null() {
            return Err(HostError::BlockNotFound(handle));
        }
        let block = self.blocks.get(&handle).ok_or(HostError::BlockNotFound(handle))?;
        if block.erased {
            return Err(HostError::BlockErased(handle));
        }
        Ok(block)
    }

    /// 写入块，目标图层或原图层锁定时拒绝
    pub fn write_block(&mut self, block: HostBlock) -> Result<(), HostError> {
        self.transaction("Write block", |d| {
            if d.layers.is_locked(&block.layer) {
                return Err(HostError::LayerLocked(block.layer.clone()));
            }
            let handle = block.handle;
            let event = match d.blocks.get(&handle) {
                Some(old) if d.layers.is_locked(&old.layer) => {
                    return Err(HostError::LayerLocked(old.layer.clone()));
                }
                Some(_) => HostEvent::Modified(handle),
                None => HostEvent::Added(handle),
            };
            d.blocks.insert(handle, block);
            d.events.push(event);
            Ok(())
        })
    }

    /// 删除块
    pub fn erase(&mut self, handle: EntityHandle) -> Result<(), HostError> {
        self.transaction("Erase block", |d| {
            let block = d.blocks.get_mut(&handle).ok_or(HostError::BlockNotFound(handle))?;
            if block.erased {
                return Ok(());
            }
            if d.layers.is_locked(&block.layer) {
                return Err(HostError::LayerLocked(block.layer.clone()));
            }
            block.erased = true;
            d.events.push(HostEvent::Erased(handle));
            Ok(())
        })
    }

    // ========== 图层 ==========

    pub fn layer_exists(&self, name: &str) -> bool {
        self.layers.contains(name)
    }

    pub fn add_layer(&mut self, layer: Layer) -> Result<(), HostError> {
        self.transaction("Add layer", |d| {
            tracing::info!("Create layer {}", layer.name);
            d.layers.add_layer(layer).map_err(HostError::from)
        })
    }

    pub fn set_layer_locked(&mut self, name: &str, locked: bool) -> Result<(), HostError> {
        let layer = self
            .layers
            .get_layer_mut(name)
            .ok_or_else(|| HostError::Layer(LayerError::LayerNotFound(name.to_string())))?;
        layer.locked = locked;
        Ok(())
    }

    // ========== 线型 ==========

    /// 图纸中已加载的线型
    pub fn line_types(&self) -> &[LineTypeDefinition] {
        &self.line_types
    }

    pub fn line_type_exists(&self, name: &str) -> bool {
        self.line_types.iter().any(|l| l.name.eq_ignore_ascii_case(name))
    }

    /// 线型库中的全部线型
    pub fn line_type_library(&self) -> &[LineTypeDefinition] {
        &self.line_type_library
    }

    /// 从线型库加载线型，已加载时直接返回
    pub fn load_line_type(&mut self, name: &str) -> Result<(), HostError> {
        if self.line_type_exists(name) {
            return Ok(());
        }
        let definition = self
            .line_type_library
            .iter()
            .find(|l| l.name.eq_ignore_ascii_case(name))
            .cloned()
            .ok_or_else(|| HostError::LineTypeNotFound(name.to_string()))?;
        self.transaction("Load line type", |d| {
            tracing::info!("Load line type {}", definition.name);
            d.line_types.push(definition);
            Ok(())
        })
    }

    pub fn line_type(&self, name: &str) -> Option<&LineTypeDefinition> {
        self.line_types.iter().find(|l| l.name.eq_ignore_ascii_case(name))
    }

    // ========== 文字样式 ==========

    pub fn text_styles(&self) -> &[TextStyle] {
        &self.text_styles
    }

    pub fn text_style_exists(&self, name: &str) -> bool {
        self.text_styles.iter().any(|t| t.name == name)
    }

    pub fn add_text_style(&mut self, style: TextStyle) -> Result<(), HostError> {
        if self.text_style_exists(&style.name) {
            return Ok(());
        }
        self.transaction("Add text style", |d| {
            tracing::info!("Create text style {}", style.name);
            d.text_styles.push(style);
            Ok(())
        })
    }
}

impl Default for Drawing {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn block_on(layer: &str) -> HostBlock {
        let mut block = HostBlock::new(EntityHandle::new(), Point2::origin());
        block.layer = layer.to_string();
        block
    }

    #[test]
    fn test_write_and_erase_emit_events() {
        let mut drawing = Drawing::new();
        let block = block_on("0");
        let handle = block.handle;

        drawing.write_block(block.clone()).unwrap();
        drawing.write_block(block).unwrap();
        drawing.erase(handle).unwrap();

        assert_eq!(
            drawing.take_events(),
            vec![HostEvent::Added(handle), HostEvent::Modified(handle), HostEvent::Erased(handle)]
        );
        assert!(drawing.take_events().is_empty());
        assert_eq!(drawing.validate(handle), Err(HostError::BlockErased(handle)));
        assert_eq!(drawing.blocks().count(), 0);
    }

    #[test]
    fn test_locked_layer_refuses_writes() {
        let mut drawing = Drawing::new();
        drawing.add_layer(Layer::new("Frozen")).unwrap();
        let block = block_on("Frozen");
        let handle = block.handle;
        drawing.write_block(block.clone()).unwrap();

        drawing.set_layer_locked("Frozen", true).unwrap();
        assert_eq!(
            drawing.write_block(block),
            Err(HostError::LayerLocked("Frozen".to_string()))
        );
        assert!(matches!(drawing.erase(handle), Err(HostError::LayerLocked(_))));
    }

    #[test]
    fn test_failed_transaction_rolls_back() {
        let mut drawing = Drawing::new();
        let block = block_on("0");
        let handle = block.handle;
        drawing.take_events();

        let result: Result<(), HostError> = drawing.transaction("Batch", |d| {
            d.write_block(block)?;
            d.add_layer(Layer::new("Temp"))?;
            Err(HostError::NothingToUndo)
        });

        assert!(result.is_err());
        assert!(drawing.block(handle).is_none());
        assert!(!drawing.layer_exists("Temp"));
        assert!(drawing.take_events().is_empty());
    }

    #[test]
    fn test_undo_reports_modified_blocks() {
        let mut drawing = Drawing::new();
        let mut block = block_on("0");
        let handle = block.handle;
        drawing.write_block(block.clone()).unwrap();

        block.position = Point2::new(10.0, 0.0);
        drawing.write_block(block).unwrap();
        drawing.take_events();

        drawing.undo().unwrap();
        assert_eq!(drawing.take_events(), vec![HostEvent::Modified(handle)]);
        assert_eq!(drawing.block(handle).unwrap().position, Point2::origin());

        drawing.undo().unwrap();
        assert_eq!(drawing.take_events(), vec![HostEvent::Erased(handle)]);
        assert_eq!(drawing.undo(), Err(HostError::NothingToUndo));
    }

    #[test]
    fn test_line_type_loaded_from_library() {
        let mut drawing = Drawing::new();
        assert!(!drawing.line_type_exists("CENTER"));
        drawing.load_line_type("center").unwrap();
        assert!(drawing.line_type_exists("CENTER"));
        assert!(matches!(
            drawing.load_line_type("WAVY"),
            Err(HostError::LineTypeNotFound(_))
        ));
    }
}
