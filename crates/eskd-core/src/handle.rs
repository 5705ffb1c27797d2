//! 宿主对象句柄
//!
//! 采用生成式ID设计，撤销后恢复的块沿用原句柄。

use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};

/// 全局句柄生成器
static HANDLE_COUNTER: AtomicU64 = AtomicU64::new(1);

/// 图纸中块参照的唯一标识符
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct EntityHandle {
    /// 唯一ID
    pub id: u64,
    /// 代数（同一ID被删除后重新分配时递增）
    pub generation: u32,
}

impl EntityHandle {
    /// 分配新的句柄
    pub fn new() -> Self {
        Self {
            id: HANDLE_COUNTER.fetch_add(1, Ordering::Relaxed),
            generation: 0,
        }
    }

    /// 从指定值创建
    pub fn from_raw(id: u64, generation: u32) -> Self {
        Self { id, generation }
    }

    /// 空句柄（无效）
    pub const NULL: EntityHandle = EntityHandle {
        id: 0,
        generation: 0,
    };

    /// 检查是否为空句柄
    pub fn is_null(&self) -> bool {
        self.id == 0
    }
}

impl Default for EntityHandle {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for EntityHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:X}", self.id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_handles_are_unique() {
        let a = EntityHandle::new();
        let b = EntityHandle::new();
        assert_ne!(a, b);
        assert!(!a.is_null());
        assert!(EntityHandle::NULL.is_null());
    }
}
