//! 用户设置文件（JSON）

use crate::error::FileError;
use eskd_core::settings::UserSettings;
use std::path::Path;

/// 读取设置，文件不存在时返回默认设置
pub fn load_settings(path: &Path) -> Result<UserSettings, FileError> {
    if !path.exists() {
        tracing::info!("Settings file {} not found, using defaults", path.display());
        return Ok(UserSettings::default());
    }
    let text = std::fs::read_to_string(path)?;
    Ok(serde_json::from_str(&text)?)
}

/// 保存设置
pub fn save_settings(path: &Path, settings: &UserSettings) -> Result<(), FileError> {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)?;
    }
    let json = serde_json::to_string_pretty(settings)?;
    std::fs::write(path, json)?;
    tracing::debug!("Settings saved to {}", path.display());
    Ok(())
}
