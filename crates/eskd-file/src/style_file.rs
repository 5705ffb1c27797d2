//! 用户样式文件（XML）
//!
//! 每种实体类型一个文件，每次保存整体重写：
//!
//! ```xml
//! <Styles>
//!   <UserStyle Name="..." Description="..." Guid="...">
//!     <Property Name="Fracture" Value="5"/>
//!     <LayerTableRecord Name="Axes" Color="FF0000" LineType="CENTER" .../>
//!     <TextStyleTableRecord Name="Standard" Font="..." Height="0" WidthFactor="1"/>
//!   </UserStyle>
//! </Styles>
//! ```

use crate::error::FileError;
use crate::paths::style_file_in;
use eskd_core::drawing::TextStyle;
use eskd_core::layer::{Color, Layer};
use eskd_core::registry::EntityKind;
use eskd_core::style::StyleError;
use eskd_core::style_store::{StyleRecord, StyleRepository};
use quick_xml::events::{BytesDecl, BytesEnd, BytesStart, Event};
use quick_xml::{Reader, Writer};
use std::collections::HashMap;
use std::path::{Path, PathBuf};

/// 目录中的 XML 样式文件
#[derive(Debug, Clone)]
pub struct XmlStyleRepository {
    dir: PathBuf,
}

impl XmlStyleRepository {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    pub fn path(&self, kind: EntityKind) -> PathBuf {
        style_file_in(&self.dir, kind)
    }

    /// 读取样式文件，文件不存在时返回空列表
    pub fn read(&self, kind: EntityKind) -> Result<Vec<StyleRecord>, FileError> {
        let path = self.path(kind);
        if !path.exists() {
            return Ok(Vec::new());
        }
        let xml = std::fs::read_to_string(&path)?;
        read_styles(&xml)
    }

    /// 整体重写样式文件
    pub fn write(&self, kind: EntityKind, records: &[StyleRecord]) -> Result<(), FileError> {
        std::fs::create_dir_all(&self.dir)?;
        let xml = write_styles(records)?;
        std::fs::write(self.path(kind), xml)?;
        Ok(())
    }
}

impl StyleRepository for XmlStyleRepository {
    fn load(&self, kind: EntityKind) -> Result<Vec<StyleRecord>, StyleError> {
        Ok(self.read(kind)?)
    }

    fn save(&self, kind: EntityKind, records: &[StyleRecord]) -> Result<(), StyleError> {
        Ok(self.write(kind, records)?)
    }
}

/// 元素的全部属性
fn attributes(e: &BytesStart) -> Result<HashMap<String, String>, FileError> {
    let mut map = HashMap::new();
    for attr in e.attributes() {
        let attr = attr?;
        let key = String::from_utf8_lossy(attr.key.as_ref()).to_string();
        let value = attr.unescape_value()?.to_string();
        map.insert(key, value);
    }
    Ok(map)
}

fn take(attrs: &mut HashMap<String, String>, key: &str) -> Option<String> {
    attrs.remove(key)
}

fn parse_or<T: std::str::FromStr>(attrs: &HashMap<String, String>, key: &str, default: T) -> T {
    attrs
        .get(key)
        .and_then(|v| v.trim().parse().ok())
        .unwrap_or(default)
}

fn parse_layer(mut attrs: HashMap<String, String>) -> Option<Layer> {
    let name = take(&mut attrs, "Name").filter(|n| !n.is_empty())?;
    let mut layer = Layer::new(name);
    if let Some(color) = attrs.get("Color").and_then(|c| u32::from_str_radix(c.trim(), 16).ok()) {
        layer.color = Color::from_hex(color);
    }
    if let Some(line_type) = take(&mut attrs, "LineType") {
        layer.line_type = line_type;
    }
    layer.locked = parse_or(&attrs, "Locked", false);
    layer.frozen = parse_or(&attrs, "Frozen", false);
    layer.visible = parse_or(&attrs, "Visible", true);
    layer.description = take(&mut attrs, "Description").unwrap_or_default();
    Some(layer)
}

fn parse_text_style(mut attrs: HashMap<String, String>) -> Option<TextStyle> {
    let name = take(&mut attrs, "Name").filter(|n| !n.is_empty())?;
    let mut style = TextStyle::new(name);
    if let Some(font) = take(&mut attrs, "Font") {
        style.font = font;
    }
    style.height = parse_or(&attrs, "Height", 0.0);
    style.width_factor = parse_or(&attrs, "WidthFactor", 1.0);
    Some(style)
}

/// 处理 `UserStyle` 内的空元素
fn apply_child(record: &mut StyleRecord, e: &BytesStart) -> Result<(), FileError> {
    let mut attrs = attributes(e)?;
    match e.name().as_ref() {
        b"Property" => match (take(&mut attrs, "Name"), take(&mut attrs, "Value")) {
            (Some(name), Some(value)) => record.properties.push((name, value)),
            (name, _) => tracing::warn!("Style {}: incomplete property {:?}", record.name, name),
        },
        b"LayerTableRecord" => record.layer = parse_layer(attrs),
        b"TextStyleTableRecord" => record.text_style = parse_text_style(attrs),
        other => tracing::debug!("Ignoring element {}", String::from_utf8_lossy(other)),
    }
    Ok(())
}

/// 解析样式文件内容
pub fn read_styles(xml: &str) -> Result<Vec<StyleRecord>, FileError> {
    let mut reader = Reader::from_str(xml);
    reader.trim_text(true);

    let mut records = Vec::new();
    let mut current: Option<StyleRecord> = None;
    let mut in_styles = false;
    let mut buf = Vec::new();

    loop {
        match reader.read_event_into(&mut buf) {
            Ok(Event::Start(ref e)) => match e.name().as_ref() {
                b"Styles" => in_styles = true,
                b"UserStyle" if in_styles => {
                    let mut attrs = attributes(e)?;
                    current = Some(StyleRecord {
                        name: take(&mut attrs, "Name").unwrap_or_default(),
                        description: take(&mut attrs, "Description").unwrap_or_default(),
                        guid: take(&mut attrs, "Guid").filter(|g| !g.trim().is_empty()),
                        ..Default::default()
                    });
                }
                _ => {}
            },
            Ok(Event::Empty(ref e)) => match e.name().as_ref() {
                b"UserStyle" if in_styles => {
                    let mut attrs = attributes(e)?;
                    records.push(StyleRecord {
                        name: take(&mut attrs, "Name").unwrap_or_default(),
                        description: take(&mut attrs, "Description").unwrap_or_default(),
                        guid: take(&mut attrs, "Guid").filter(|g| !g.trim().is_empty()),
                        ..Default::default()
                    });
                }
                _ => {
                    if let Some(record) = current.as_mut() {
                        apply_child(record, e)?;
                    }
                }
            },
            Ok(Event::End(ref e)) => match e.name().as_ref() {
                b"UserStyle" => {
                    if let Some(record) = current.take() {
                        records.push(record);
                    }
                }
                b"Styles" => in_styles = false,
                _ => {}
            },
            Ok(Event::Eof) => break,
            Err(e) => {
                let pos = reader.buffer_position();
                return Err(FileError::InvalidFormat(format!(
                    "XML parse error at byte {}: {}",
                    pos, e
                )));
            }
            _ => {}
        }
        buf.clear();
    }

    Ok(records)
}

/// 生成样式文件内容
pub fn write_styles(records: &[StyleRecord]) -> Result<String, FileError> {
    let mut writer = Writer::new_with_indent(Vec::new(), b' ', 2);
    writer.write_event(Event::Decl(BytesDecl::new("1.0", Some("utf-8"), None)))?;
    writer.write_event(Event::Start(BytesStart::new("Styles")))?;

    for record in records {
        let mut style = BytesStart::new("UserStyle");
        style.push_attribute(("Name", record.name.as_str()));
        style.push_attribute(("Description", record.description.as_str()));
        style.push_attribute(("Guid", record.guid.as_deref().unwrap_or_default()));
        writer.write_event(Event::Start(style))?;

        for (name, value) in &record.properties {
            let mut property = BytesStart::new("Property");
            property.push_attribute(("Name", name.as_str()));
            property.push_attribute(("Value", value.as_str()));
            writer.write_event(Event::Empty(property))?;
        }

        if let Some(layer) = &record.layer {
            let color = format!("{:06X}", layer.color.to_hex());
            let locked = layer.locked.to_string();
            let frozen = layer.frozen.to_string();
            let visible = layer.visible.to_string();
            let mut elem = BytesStart::new("LayerTableRecord");
            elem.push_attribute(("Name", layer.name.as_str()));
            elem.push_attribute(("Color", color.as_str()));
            elem.push_attribute(("LineType", layer.line_type.as_str()));
            elem.push_attribute(("Locked", locked.as_str()));
            elem.push_attribute(("Frozen", frozen.as_str()));
            elem.push_attribute(("Visible", visible.as_str()));
            elem.push_attribute(("Description", layer.description.as_str()));
            writer.write_event(Event::Empty(elem))?;
        }

        if let Some(text_style) = &record.text_style {
            let height = text_style.height.to_string();
            let width_factor = text_style.width_factor.to_string();
            let mut elem = BytesStart::new("TextStyleTableRecord");
            elem.push_attribute(("Name", text_style.name.as_str()));
            elem.push_attribute(("Font", text_style.font.as_str()));
            elem.push_attribute(("Height", height.as_str()));
            elem.push_attribute(("WidthFactor", width_factor.as_str()));
            writer.write_event(Event::Empty(elem))?;
        }

        writer.write_event(Event::End(BytesEnd::new("UserStyle")))?;
    }

    writer.write_event(Event::End(BytesEnd::new("Styles")))?;
    String::from_utf8(writer.into_inner())
        .map_err(|e| FileError::InvalidFormat(format!("Non UTF-8 output: {}", e)))
}
