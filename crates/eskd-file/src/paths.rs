//! 数据目录
//!
//! 优先使用环境变量 `ESKD_DATA_DIR`，否则使用当前目录下的 `eskd-data`。

use eskd_core::registry::EntityKind;
use std::path::{Path, PathBuf};

/// 数据目录环境变量
pub const DATA_DIR_ENV: &str = "ESKD_DATA_DIR";

const DEFAULT_DATA_DIR: &str = "eskd-data";
const SETTINGS_FILE: &str = "settings.json";

/// 数据目录布局
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DataDir {
    root: PathBuf,
}

impl DataDir {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    /// 按环境变量或默认位置确定数据目录
    pub fn discover() -> Self {
        match std::env::var_os(DATA_DIR_ENV) {
            Some(dir) if !dir.is_empty() => Self::new(dir),
            _ => Self::new(DEFAULT_DATA_DIR),
        }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// 样式文件目录
    pub fn styles_dir(&self) -> PathBuf {
        self.root.join("Styles")
    }

    /// 某一实体类型的样式文件
    pub fn style_file(&self, kind: EntityKind) -> PathBuf {
        style_file_in(&self.styles_dir(), kind)
    }

    pub fn settings_path(&self) -> PathBuf {
        self.root.join(SETTINGS_FILE)
    }
}

/// 目录中某一实体类型的样式文件
pub fn style_file_in(dir: &Path, kind: EntityKind) -> PathBuf {
    dir.join(format!("{}Styles.xml", kind.name()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_layout() {
        let dir = DataDir::new("/data");
        assert_eq!(dir.style_file(EntityKind::BreakLine), PathBuf::from("/data/Styles/BreakLineStyles.xml"));
        assert_eq!(dir.settings_path(), PathBuf::from("/data/settings.json"));
    }
}
