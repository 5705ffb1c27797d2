//! ESKD 文件处理
//!
//! - 每种实体类型一个用户样式 XML 文件
//! - 用户设置 JSON 文件
//! - 数据目录定位

pub mod error;
pub mod paths;
pub mod settings_file;
pub mod style_file;

pub use error::FileError;
pub use paths::DataDir;
pub use settings_file::{load_settings, save_settings};
pub use style_file::XmlStyleRepository;
