//! UI状态管理

use eskd_core::handle::EntityHandle;
use eskd_core::math::Point2;
use eskd_core::registry::EntityKind;

/// 当前工具
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Tool {
    Select,
    /// 放置一种智能实体
    Place(EntityKind),
}

impl Tool {
    pub fn name(&self) -> &'static str {
        match self {
            Tool::Select => "Select",
            Tool::Place(kind) => kind.name(),
        }
    }

    pub fn shortcut(&self) -> Option<&'static str> {
        match self {
            Tool::Select => Some("Space"),
            Tool::Place(EntityKind::Axis) => Some("A"),
            Tool::Place(EntityKind::BreakLine) => Some("B"),
            Tool::Place(EntityKind::GroundLine) => Some("G"),
        }
    }
}

/// UI状态
#[derive(Debug)]
pub struct UiState {
    /// 当前工具
    pub current_tool: Tool,

    /// 选中的实体
    pub selected_entities: Vec<EntityHandle>,

    /// 鼠标在世界坐标中的位置
    pub mouse_world_pos: Point2,

    /// 状态栏消息
    pub status_message: String,

    /// 未读的用户提示
    pub notices: Vec<String>,

    /// 是否显示属性面板
    pub show_palette: bool,

    /// 是否显示样式编辑器
    pub show_style_editor: bool,

    /// 选择集变化后需要重建汇总
    pub selection_changed: bool,
}

impl Default for UiState {
    fn default() -> Self {
        Self {
            current_tool: Tool::Select,
            selected_entities: Vec::new(),
            mouse_world_pos: Point2::origin(),
            status_message: "Ready".to_string(),
            notices: Vec::new(),
            show_palette: true,
            show_style_editor: false,
            selection_changed: false,
        }
    }
}

impl UiState {
    /// 设置当前工具
    pub fn set_tool(&mut self, tool: Tool) {
        self.current_tool = tool;
        self.status_message = format!("{} tool selected", tool.name());
    }

    /// 取消当前操作
    pub fn cancel(&mut self) {
        self.current_tool = Tool::Select;
        self.status_message = "Cancelled".to_string();
    }

    /// 清空选择
    pub fn clear_selection(&mut self) {
        if !self.selected_entities.is_empty() {
            self.selected_entities.clear();
            self.selection_changed = true;
        }
    }

    /// 添加到选择
    pub fn add_to_selection(&mut self, handle: EntityHandle) {
        if !self.selected_entities.contains(&handle) {
            self.selected_entities.push(handle);
            self.selection_changed = true;
        }
    }

    /// 从选择中移除
    pub fn remove_from_selection(&mut self, handle: &EntityHandle) {
        let before = self.selected_entities.len();
        self.selected_entities.retain(|h| h != handle);
        self.selection_changed |= before != self.selected_entities.len();
    }

    /// 切换选择状态
    pub fn toggle_selection(&mut self, handle: EntityHandle) {
        if self.selected_entities.contains(&handle) {
            self.remove_from_selection(&handle);
        } else {
            self.add_to_selection(handle);
        }
    }

    /// 取走选择变化标记
    pub fn take_selection_changed(&mut self) -> bool {
        std::mem::take(&mut self.selection_changed)
    }

    /// 记录一条用户提示，同时显示在状态栏
    pub fn notify(&mut self, message: impl Into<String>) {
        let message = message.into();
        self.status_message = message.clone();
        self.notices.push(message);
    }
}
