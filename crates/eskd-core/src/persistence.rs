//! 参数集与扩展数据记录之间的映射
//!
//! 按元数据声明顺序遍历存放在记录中的属性，把每个值放入对应的流：
//! 字符串、枚举（成员名称）、比例（名称）和样式 guid 进入字符串流，
//! 整数和布尔进入整数流，实数进入实数流。解码时以同样的顺序逐个读取，
//! 任何缺失或无法解析的字段回退到元数据默认值。

use crate::codec::WireRecord;
use crate::math::Vector2;
use crate::metadata::{PropertyMetadata, PropertyStorage};
use crate::scale::AnnotationScale;
use crate::value::{PropertyValue, ValueKind};
use uuid::Uuid;

/// 解码结果
#[derive(Debug, Clone)]
pub struct DecodedRecord<'a> {
    /// 样式 guid，缺失或无法解析时为 `None`
    pub style_guid: Option<Uuid>,
    pub primary: Option<Vector2>,
    /// 按声明顺序排列的值
    pub values: Vec<(&'a PropertyMetadata, PropertyValue)>,
    /// 回退到默认值的属性
    pub fallbacks: Vec<&'static str>,
}

impl<'a> DecodedRecord<'a> {
    /// 按名称取值
    pub fn value(&self, name: &str) -> Option<&PropertyValue> {
        self.values
            .iter()
            .find(|(m, _)| m.name == name)
            .map(|(_, v)| v)
    }
}

/// 按元数据顺序编码
///
/// `value_of` 返回属性的当前值；返回 `None` 或类型不符时写入默认值。
pub fn encode_record<F>(
    type_tag: &str,
    schema: &[PropertyMetadata],
    style_guid: Uuid,
    primary: Option<Vector2>,
    value_of: F,
) -> WireRecord
where
    F: Fn(&PropertyMetadata) -> Option<PropertyValue>,
{
    let mut record = WireRecord::new(type_tag);
    record.primary = primary;

    for meta in schema {
        match meta.storage {
            PropertyStorage::HostBlock => continue,
            PropertyStorage::StyleReference => {
                record.strings.push(style_guid.to_string());
                continue;
            }
            PropertyStorage::Record => {}
        }

        let value = match value_of(meta) {
            Some(v) if meta.accepts(&v) => v,
            Some(v) => {
                tracing::warn!(
                    "Property {} has {:?} value, writing default instead",
                    meta.name,
                    v.kind()
                );
                meta.default_value.clone()
            }
            None => meta.default_value.clone(),
        };

        match value {
            PropertyValue::String(s) => record.strings.push(s),
            PropertyValue::Enum(e) => record.strings.push(e.name().to_string()),
            PropertyValue::Scale(s) => record.strings.push(s.name().to_string()),
            PropertyValue::Int(v) => record.ints.push(v),
            PropertyValue::Bool(v) => record.ints.push(i32::from(v)),
            PropertyValue::Double(v) => record.doubles.push(v),
        }
    }

    record
}

/// 按元数据顺序解码
pub fn decode_record<'a>(record: &WireRecord, schema: &'a [PropertyMetadata]) -> DecodedRecord<'a> {
    let mut cursor = record.cursor();
    let mut decoded = DecodedRecord {
        style_guid: None,
        primary: record.primary,
        values: Vec::with_capacity(schema.len()),
        fallbacks: Vec::new(),
    };

    for meta in schema {
        match meta.storage {
            PropertyStorage::HostBlock => continue,
            PropertyStorage::StyleReference => {
                decoded.style_guid = cursor.next_string().and_then(|s| Uuid::parse_str(s).ok());
                continue;
            }
            PropertyStorage::Record => {}
        }

        let parsed = match meta.value_kind() {
            ValueKind::String => cursor
                .next_string()
                .map(|s| PropertyValue::String(s.to_string())),
            ValueKind::Enum => cursor.next_string().and_then(|s| {
                meta.default_value
                    .as_enum()
                    .and_then(|e| e.enum_type().value_by_name(s))
                    .map(PropertyValue::Enum)
            }),
            ValueKind::Scale => cursor
                .next_string()
                .and_then(|s| AnnotationScale::parse(s).ok())
                .map(PropertyValue::Scale),
            ValueKind::Int => cursor.next_int().map(PropertyValue::Int),
            ValueKind::Bool => cursor.next_int().map(|v| PropertyValue::Bool(v != 0)),
            ValueKind::Double => cursor
                .next_double()
                .filter(|v| v.is_finite())
                .map(PropertyValue::Double),
        };

        let value = match parsed {
            Some(v) => v,
            None => {
                tracing::debug!(
                    "Field {} of {} missing or invalid, using default",
                    meta.name,
                    record.type_tag
                );
                decoded.fallbacks.push(meta.name);
                meta.default_value.clone()
            }
        };
        decoded.values.push((meta, value));
    }

    let (strings, ints, doubles) = cursor.remaining();
    if strings + ints + doubles > 0 {
        tracing::debug!(
            "Record {} has {} unread trailing fields",
            record.type_tag,
            strings + ints + doubles
        );
    }

    decoded
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::metadata::PropertyCategory;
    use crate::registry::EntityKind;

    fn defaults_of(meta: &PropertyMetadata) -> Option<PropertyValue> {
        Some(meta.default_value.clone())
    }

    #[test]
    fn test_defaults_round_trip_for_every_entity_type() {
        for kind in EntityKind::ALL {
            let schema = kind.metadata();
            let guid = Uuid::new_v4();
            let record = encode_record(kind.type_tag(), schema, guid, None, defaults_of);
            let bytes = record.to_bytes().unwrap();
            let decoded_record = WireRecord::from_bytes(&bytes).unwrap();
            let decoded = decode_record(&decoded_record, schema);

            assert_eq!(decoded.style_guid, Some(guid));
            assert!(decoded.fallbacks.is_empty(), "{:?}", decoded.fallbacks);
            for (meta, value) in &decoded.values {
                assert_eq!(value, &meta.default_value, "{}.{}", kind, meta.name);
            }
        }
    }

    #[test]
    fn test_enums_and_scales_are_encoded_as_names() {
        let schema = EntityKind::BreakLine.metadata();
        let record = encode_record("mpBreakLine", schema, Uuid::nil(), None, defaults_of);
        assert!(record.strings.contains(&"Linear".to_string()));
        assert!(record.strings.contains(&"1:1".to_string()));
        assert_eq!(record.strings[0], Uuid::nil().to_string());
    }

    #[test]
    fn test_host_block_properties_are_not_recorded() {
        let schema = EntityKind::GroundLine.metadata();
        let record = encode_record("mpGroundLine", schema, Uuid::nil(), None, defaults_of);
        assert!(record.doubles.is_empty(), "LineTypeScale belongs to the host block");
    }

    #[test]
    fn test_new_trailing_property_decodes_to_default() {
        let old_schema = vec![
            PropertyMetadata::new(PropertyCategory::Geometry, 0, "Width", 5),
            PropertyMetadata::new(PropertyCategory::Content, 1, "Label", "A"),
        ];
        let mut new_schema = old_schema.clone();
        new_schema.push(PropertyMetadata::new(PropertyCategory::Geometry, 2, "Depth", 7));
        new_schema.push(PropertyMetadata::new(PropertyCategory::Geometry, 3, "Ratio", 0.25));

        let record = encode_record("mpTest", &old_schema, Uuid::nil(), None, |m| match m.name {
            "Width" => Some(PropertyValue::Int(9)),
            "Label" => Some(PropertyValue::from("B")),
            _ => None,
        });
        let decoded = decode_record(&record, &new_schema);

        assert_eq!(decoded.value("Width"), Some(&PropertyValue::Int(9)));
        assert_eq!(decoded.value("Label"), Some(&PropertyValue::from("B")));
        assert_eq!(decoded.value("Depth"), Some(&PropertyValue::Int(7)));
        assert_eq!(decoded.value("Ratio"), Some(&PropertyValue::Double(0.25)));
        assert_eq!(decoded.fallbacks, vec!["Depth", "Ratio"]);
    }

    #[test]
    fn test_unparsable_slot_falls_back_per_field() {
        let schema = EntityKind::BreakLine.metadata();
        let mut record = encode_record("mpBreakLine", schema, Uuid::nil(), None, defaults_of);
        // 比例和枚举都写成无法识别的文本
        for s in record.strings.iter_mut().skip(1) {
            *s = "garbage".to_string();
        }
        record.ints[0] = 7;

        let decoded = decode_record(&record, schema);
        assert_eq!(decoded.value("Overhang"), Some(&PropertyValue::Int(7)));
        assert!(decoded.fallbacks.contains(&"Scale"));
        assert!(decoded.fallbacks.contains(&"BreakLineType"));
    }

    #[test]
    fn test_corrupt_text_falls_back_to_default() {
        let schema = vec![
            PropertyMetadata::new(PropertyCategory::Content, 0, "Label", "A"),
            PropertyMetadata::new(PropertyCategory::Content, 1, "Code", "X"),
        ];
        let record = encode_record("mpTest", &schema, Uuid::nil(), None, |m| match m.name {
            "Label" => Some(PropertyValue::from("label-b")),
            _ => Some(PropertyValue::from("Y")),
        });
        let mut bytes = record.to_bytes().unwrap();
        let at = bytes.windows(7).position(|w| w == b"label-b").unwrap();
        bytes[at + 6] = 0xC3;

        let decoded = decode_record(&WireRecord::from_bytes(&bytes).unwrap(), &schema);
        assert_eq!(decoded.value("Label"), Some(&PropertyValue::from("A")));
        assert_eq!(decoded.value("Code"), Some(&PropertyValue::from("Y")));
        assert_eq!(decoded.fallbacks, vec!["Label"]);
    }

    #[test]
    fn test_wrong_typed_value_is_replaced_by_default() {
        let schema = vec![PropertyMetadata::new(PropertyCategory::Geometry, 0, "Width", 5)];
        let record = encode_record("mpTest", &schema, Uuid::nil(), None, |_| {
            Some(PropertyValue::Double(1.0))
        });
        assert_eq!(record.ints, vec![5]);
    }
}
