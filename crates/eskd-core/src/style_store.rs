//! 样式库
//!
//! 按实体类型保存样式列表：系统样式在创建时由元数据生成，用户样式通过
//! [`StyleRepository`] 加载和保存。文件格式与核心无关，仓库只交换未解析的
//! [`StyleRecord`]，逐字段解析和回退由样式库完成。

use crate::drawing::{Drawing, TextStyle};
use crate::entities::SmartEntity;
use crate::layer::Layer;
use crate::localization::Localizer;
use crate::registry::EntityKind;
use crate::settings::UserSettings;
use crate::style::{style_metadata, Style, StyleError, StyleType};
use crate::value::PropertyValue;
use std::collections::BTreeMap;
use uuid::Uuid;

/// 存储中的一个用户样式
#[derive(Debug, Clone, Default, PartialEq)]
pub struct StyleRecord {
    pub name: String,
    pub description: String,
    /// 缺失时加载时生成新的 guid
    pub guid: Option<String>,
    /// (名称, 文本值)
    pub properties: Vec<(String, String)>,
    pub layer: Option<Layer>,
    pub text_style: Option<TextStyle>,
}

/// 用户样式的持久化
pub trait StyleRepository {
    /// 读取某一实体类型的全部用户样式，文件不存在时返回空列表
    fn load(&self, kind: EntityKind) -> Result<Vec<StyleRecord>, StyleError>;

    /// 以给定内容整体覆盖某一实体类型的样式文件
    fn save(&self, kind: EntityKind, records: &[StyleRecord]) -> Result<(), StyleError>;
}

/// 由存储记录构建样式，无法解析的值回退到默认值
pub fn style_from_record(kind: EntityKind, record: &StyleRecord, localizer: &dyn Localizer) -> Style {
    let guid = match record.guid.as_deref().map(Uuid::parse_str) {
        Some(Ok(guid)) if guid.is_nil() => {
            tracing::warn!("Style {}: nil guid is reserved for the system style, generating a new one", record.name);
            Uuid::new_v4()
        }
        Some(Ok(guid)) => guid,
        Some(Err(e)) => {
            tracing::warn!("Style {}: invalid guid ({}), generating a new one", record.name, e);
            Uuid::new_v4()
        }
        None => Uuid::new_v4(),
    };

    let mut style = Style::new_user(kind, record.name.clone(), localizer);
    style.guid = guid;
    style.description = record.description.clone();
    style.layer = record.layer.clone();
    style.text_style = record.text_style.clone();

    for instance in &mut style.properties {
        let meta = instance.metadata();
        let Some((_, text)) = record.properties.iter().find(|(name, _)| name == meta.name) else {
            continue;
        };
        match meta.default_value.parse_same_kind(text) {
            Some(value) => {
                let value = meta.clamp(value);
                if let Err(e) = instance.set_value(value) {
                    tracing::warn!("Style {}: {} ignored: {}", record.name, meta.name, e);
                }
            }
            None => {
                tracing::warn!(
                    "Style {}: cannot parse {}=\"{}\", using default",
                    record.name,
                    meta.name,
                    text
                );
            }
        }
    }

    // 文件中没有的参数保持默认值
    style.check_missed_properties(localizer);
    style
}

/// 样式转为存储记录
pub fn style_to_record(style: &Style) -> StyleRecord {
    StyleRecord {
        name: style.name.clone(),
        description: style.description.clone(),
        guid: Some(style.guid.to_string()),
        properties: style
            .properties
            .iter()
            .map(|p| (p.name().to_string(), p.value().to_storage_string()))
            .collect(),
        layer: style.layer.clone(),
        text_style: style.text_style.clone(),
    }
}

/// 样式库
#[derive(Debug, Clone)]
pub struct StyleStore {
    /// 按 [`EntityKind::index`] 排列
    system: Vec<Style>,
    user: Vec<Style>,
}

impl StyleStore {
    /// 生成全部系统样式
    pub fn new(localizer: &dyn Localizer) -> Self {
        Self {
            system: EntityKind::ALL
                .iter()
                .map(|kind| Style::system(*kind, localizer))
                .collect(),
            user: Vec::new(),
        }
    }

    /// 某一实体类型的全部样式，系统样式在前
    pub fn styles(&self, kind: EntityKind) -> impl Iterator<Item = &Style> {
        self.system
            .iter()
            .filter(move |s| s.kind == kind)
            .chain(self.user.iter().filter(move |s| s.kind == kind))
    }

    pub fn system_style(&self, kind: EntityKind) -> &Style {
        &self.system[kind.index()]
    }

    pub fn find(&self, kind: EntityKind, guid: Uuid) -> Option<&Style> {
        self.styles(kind).find(|s| s.guid == guid)
    }

    /// 按名称查找（名称可能重复，返回第一个）
    pub fn find_by_name(&self, kind: EntityKind, name: &str) -> Option<&Style> {
        self.styles(kind).find(|s| s.name == name)
    }

    fn user_mut(&mut self, kind: EntityKind, guid: Uuid) -> Result<&mut Style, StyleError> {
        if guid.is_nil() {
            return Err(StyleError::SystemStyleReadOnly);
        }
        self.user
            .iter_mut()
            .find(|s| s.kind == kind && s.guid == guid)
            .ok_or(StyleError::NotFound(guid))
    }

    /// 用户样式（可修改）
    pub fn style_mut(&mut self, kind: EntityKind, guid: Uuid) -> Result<&mut Style, StyleError> {
        self.user_mut(kind, guid)
    }

    /// 从仓库加载用户样式，已存在的同 guid 样式被跳过
    ///
    /// 返回新加入的样式数量。
    pub fn load_from(
        &mut self,
        kind: EntityKind,
        repository: &dyn StyleRepository,
        localizer: &dyn Localizer,
    ) -> Result<usize, StyleError> {
        let records = repository.load(kind)?;
        let added = self.insert_records(kind, &records, localizer);
        tracing::info!("Loaded {} user styles for {}", added, kind);
        Ok(added)
    }

    fn insert_records(&mut self, kind: EntityKind, records: &[StyleRecord], localizer: &dyn Localizer) -> usize {
        let mut added = 0;
        for record in records {
            let style = style_from_record(kind, record, localizer);
            let duplicate = self
                .styles(kind)
                .any(|s| s.style_type == style.style_type && s.guid == style.guid);
            if duplicate {
                tracing::debug!("Style {} ({}) already loaded", style.name, style.guid);
                continue;
            }
            self.user.push(style);
            added += 1;
        }
        added
    }

    /// 以仓库内容替换某一实体类型的用户样式
    ///
    /// 仓库读取失败时内存中的样式保持不变。
    pub fn reload(
        &mut self,
        kind: EntityKind,
        repository: &dyn StyleRepository,
        localizer: &dyn Localizer,
    ) -> Result<usize, StyleError> {
        let records = repository.load(kind)?;
        self.user.retain(|s| s.kind != kind);
        let count = self.insert_records(kind, &records, localizer);
        tracing::info!("Reloaded {} user styles for {}", count, kind);
        Ok(count)
    }

    /// 重名的用户样式名称（含与系统样式重名）
    pub fn duplicate_names(&self, kind: EntityKind) -> Vec<String> {
        let mut counts: BTreeMap<&str, usize> = BTreeMap::new();
        for style in self.styles(kind) {
            *counts.entry(style.name.as_str()).or_default() += 1;
        }
        counts
            .into_iter()
            .filter(|(_, n)| *n > 1)
            .map(|(name, _)| name.to_string())
            .collect()
    }

    /// 检查重名，存在重名时返回错误
    pub fn validate(&self, kind: EntityKind) -> Result<(), StyleError> {
        let names = self.duplicate_names(kind);
        if names.is_empty() {
            Ok(())
        } else {
            Err(StyleError::DuplicateNames { kind, names })
        }
    }

    /// 把某一实体类型的全部用户样式写入仓库，存在重名时拒绝保存
    pub fn save_to(&self, kind: EntityKind, repository: &dyn StyleRepository) -> Result<(), StyleError> {
        self.validate(kind)?;
        let records: Vec<StyleRecord> = self
            .styles(kind)
            .filter(|s| s.style_type == StyleType::User)
            .map(style_to_record)
            .collect();
        repository.save(kind, &records)?;
        tracing::info!("Saved {} user styles for {}", records.len(), kind);
        Ok(())
    }

    /// 当前样式；设置中的 guid 找不到时使用系统样式
    pub fn current_style(&self, kind: EntityKind, settings: &UserSettings) -> &Style {
        settings
            .current_style(kind)
            .and_then(|guid| self.find(kind, guid))
            .unwrap_or_else(|| self.system_style(kind))
    }

    /// 重新加载后返回当前样式；加载失败时记录日志并使用内存中的样式
    pub fn resolve_current_style(
        &mut self,
        kind: EntityKind,
        settings: &UserSettings,
        repository: &dyn StyleRepository,
        localizer: &dyn Localizer,
    ) -> &Style {
        if let Err(e) = self.reload(kind, repository, localizer) {
            tracing::error!("Reload styles for {} failed: {}", kind, e);
        }
        self.current_style(kind, settings)
    }

    /// 设置当前样式
    pub fn set_current(
        &self,
        kind: EntityKind,
        guid: Uuid,
        settings: &mut UserSettings,
    ) -> Result<(), StyleError> {
        self.find(kind, guid).ok_or(StyleError::NotFound(guid))?;
        settings.set_current_style(kind, guid);
        Ok(())
    }

    /// 添加用户样式
    pub fn add(&mut self, style: Style) -> Uuid {
        let guid = style.guid;
        tracing::debug!("Add style {} for {}", style.name, style.kind);
        self.user.push(style);
        guid
    }

    /// 以默认值新建用户样式
    pub fn create(&mut self, kind: EntityKind, name: &str, localizer: &dyn Localizer) -> Uuid {
        self.add(Style::new_user(kind, name, localizer))
    }

    /// 以实体参数新建用户样式
    pub fn create_from_entity(
        &mut self,
        entity: &SmartEntity,
        name: &str,
        drawing: &Drawing,
        localizer: &dyn Localizer,
    ) -> Uuid {
        self.add(Style::from_entity(entity, name, drawing, localizer))
    }

    /// 复制样式，系统样式也可以复制
    pub fn copy(&mut self, kind: EntityKind, guid: Uuid) -> Result<Uuid, StyleError> {
        let source = self.find(kind, guid).ok_or(StyleError::NotFound(guid))?;
        let copy = source.duplicate(format!("{} (copy)", source.name));
        Ok(self.add(copy))
    }

    pub fn rename(&mut self, kind: EntityKind, guid: Uuid, name: &str) -> Result<(), StyleError> {
        self.user_mut(kind, guid)?.name = name.to_string();
        Ok(())
    }

    /// 删除用户样式；若是当前样式则当前样式回到系统样式
    pub fn delete(
        &mut self,
        kind: EntityKind,
        guid: Uuid,
        settings: &mut UserSettings,
    ) -> Result<Style, StyleError> {
        if guid.is_nil() {
            return Err(StyleError::SystemStyleReadOnly);
        }
        let idx = self
            .user
            .iter()
            .position(|s| s.kind == kind && s.guid == guid)
            .ok_or(StyleError::NotFound(guid))?;
        if settings.current_style(kind) == Some(guid) {
            settings.set_current_style(kind, Uuid::nil());
        }
        Ok(self.user.remove(idx))
    }
}

/// 样式应用结果
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ApplyReport {
    pub applied: Vec<&'static str>,
    /// (参数名称, 原因)
    pub skipped: Vec<(&'static str, String)>,
}

impl ApplyReport {
    fn skip(&mut self, name: &'static str, reason: impl Into<String>) {
        let reason = reason.into();
        tracing::warn!("Style property {} skipped: {}", name, reason);
        self.skipped.push((name, reason));
    }
}

/// 把样式参数逐个应用到实体
///
/// 一个参数失败不影响其余参数。`on_creation` 为真时比例、图层和文字样式
/// 受用户设置控制，否则总是使用样式中的值。
pub fn apply_style(
    entity: &mut SmartEntity,
    style: &Style,
    on_creation: bool,
    drawing: &mut Drawing,
    settings: &UserSettings,
    localizer: &dyn Localizer,
) -> ApplyReport {
    let mut report = ApplyReport::default();
    let kind = entity.kind();

    for meta in style_metadata(kind) {
        let name = meta.name;
        let Some(style_value) = style.value(name) else {
            continue;
        };

        let value = match name {
            "Scale" if on_creation && !settings.use_scale_from_style => {
                PropertyValue::Scale(drawing.current_scale.clone())
            }
            "LayerName" => {
                let entity_layer = entity.base().layer_name.clone();
                match resolve_layer(style, &entity_layer, on_creation, drawing, settings, localizer) {
                    Ok(layer) => PropertyValue::String(layer),
                    Err(reason) => {
                        report.skip(name, reason);
                        continue;
                    }
                }
            }
            "LineType" => {
                let line_type = style_value.as_str().unwrap_or_default();
                if let Err(e) = drawing.load_line_type(line_type) {
                    report.skip(name, e.to_string());
                    continue;
                }
                style_value.clone()
            }
            "TextStyle" => {
                if on_creation && !settings.use_text_style_from_style {
                    continue;
                }
                let text_style = style_value.as_str().unwrap_or_default();
                if let Err(reason) = ensure_text_style(text_style, style, drawing, settings) {
                    report.skip(name, reason);
                    continue;
                }
                style_value.clone()
            }
            _ => style_value.clone(),
        };

        match entity.set(name, &value) {
            Ok(()) => report.applied.push(name),
            Err(e) => report.skip(name, e.to_string()),
        }
    }

    entity.base_mut().style_guid = style.guid;
    report
}

/// 样式指定的图层；样式使用默认图层时，新建实体放在当前图层，已有实体保留原图层
fn resolve_layer(
    style: &Style,
    entity_layer: &str,
    on_creation: bool,
    drawing: &mut Drawing,
    settings: &UserSettings,
    localizer: &dyn Localizer,
) -> Result<String, String> {
    let current = drawing.layers.current_layer().name.clone();
    if on_creation && !settings.use_layer_from_style {
        return Ok(current);
    }
    let Some(name) = style.layer_name(localizer) else {
        if on_creation || !drawing.layer_exists(entity_layer) {
            return Ok(current);
        }
        return Ok(entity_layer.to_string());
    };
    if drawing.layer_exists(name) {
        return Ok(name.to_string());
    }
    if !settings.create_missing_layers {
        return Err(format!("layer {} does not exist", name));
    }

    let layer = style
        .layer
        .clone()
        .filter(|l| l.name == name)
        .unwrap_or_else(|| Layer::new(name));
    drawing.add_layer(layer).map_err(|e| e.to_string())?;
    Ok(name.to_string())
}

fn ensure_text_style(
    name: &str,
    style: &Style,
    drawing: &mut Drawing,
    settings: &UserSettings,
) -> Result<(), String> {
    if drawing.text_style_exists(name) {
        return Ok(());
    }
    if !settings.create_missing_text_styles {
        return Err(format!("text style {} does not exist", name));
    }
    let text_style = style
        .text_style
        .clone()
        .filter(|t| t.name == name)
        .unwrap_or_else(|| TextStyle::new(name));
    drawing.add_text_style(text_style).map_err(|e| e.to_string())
}
