//! ESKD 智能实体核心
//!
//! 参数化注释对象（轴线、断开线、地面线）的属性引擎：
//!
//! - 属性元数据注册表和带类型的属性值；
//! - 样式与样式库（系统样式、用户样式、迁移和应用策略）；
//! - 单个实体的属性提供器与多选汇总；
//! - 扩展数据记录的按位置编码；
//! - 由参数重建几何图元。
//!
//! # 示例
//!
//! ```rust
//! use eskd_core::prelude::*;
//!
//! let mut axis = SmartEntity::new(EntityKind::Axis, Point2::origin());
//! axis.set_end_point(Point2::new(0.0, 100.0));
//! axis.set("MarkersCount", &PropertyValue::Int(2)).unwrap();
//!
//! let primitives = axis.reconstruct().unwrap();
//! assert!(!primitives.is_empty());
//! ```

pub mod codec;
pub mod context;
pub mod drawing;
pub mod entities;
pub mod enum_converter;
pub mod handle;
pub mod instance;
pub mod layer;
pub mod localization;
pub mod math;
pub mod metadata;
pub mod persistence;
pub mod placement;
pub mod primitive;
pub mod provider;
pub mod reader;
pub mod registry;
pub mod report;
pub mod scale;
pub mod settings;
pub mod style;
pub mod style_store;
pub mod summary;
pub mod value;

pub mod prelude {
    //! 常用类型的便捷导入
    pub use crate::context::EditContext;
    pub use crate::drawing::{Drawing, HostBlock, HostError, HostEvent, TextStyle};
    pub use crate::entities::{GeometryError, ReconstructionState, SmartEntity};
    pub use crate::handle::EntityHandle;
    pub use crate::instance::{PropertyError, PropertyInstance};
    pub use crate::layer::{Color, Layer};
    pub use crate::localization::{BuiltinLocalizer, Localizer};
    pub use crate::math::{Point2, Vector2};
    pub use crate::metadata::{PropertyCategory, PropertyMetadata, PropertyScope};
    pub use crate::placement::Placement;
    pub use crate::primitive::Primitive;
    pub use crate::provider::{EditOutcome, EntityPropertyProvider};
    pub use crate::registry::{EntityKind, MetadataRegistry};
    pub use crate::report::{ErrorReporter, RecordingReporter, TracingReporter};
    pub use crate::scale::AnnotationScale;
    pub use crate::settings::UserSettings;
    pub use crate::style::{Style, StyleError, StyleType};
    pub use crate::style_store::{StyleRecord, StyleRepository, StyleStore};
    pub use crate::summary::{SummaryAggregator, SummaryValue};
    pub use crate::value::{PropertyValue, ValueKind};
}
