//! 智能实体与宿主块之间的读写
//!
//! 块的扩展数据记录的第一个字符串是实体类型标识，据此识别块中保存的实体类型。

use crate::codec::WireRecord;
use crate::drawing::{Drawing, HostBlock, HostError};
use crate::entities::SmartEntity;
use crate::handle::EntityHandle;
use crate::metadata::PropertyStorage;
use crate::persistence::{decode_record, encode_record};
use crate::registry::EntityKind;

/// 识别块中保存的实体类型
pub fn recognize(block: &HostBlock) -> Option<EntityKind> {
    WireRecord::peek_type_tag(&block.xdata).and_then(|tag| EntityKind::from_type_tag(&tag))
}

/// 图纸中所有智能实体的句柄和类型
pub fn list_entities(drawing: &Drawing) -> Vec<(EntityHandle, EntityKind)> {
    drawing
        .blocks()
        .filter_map(|b| recognize(b).map(|kind| (b.handle, kind)))
        .collect()
}

/// 从块读取实体
///
/// 单个字段无法解析时使用默认值，不会导致整个读取失败。
pub fn read_entity(drawing: &Drawing, handle: EntityHandle) -> Result<SmartEntity, HostError> {
    let block = drawing.validate(handle)?;
    let record = WireRecord::from_bytes(&block.xdata).map_err(|e| HostError::Codec(e.to_string()))?;
    let kind = EntityKind::from_type_tag(&record.type_tag).ok_or(HostError::NotIntelligentEntity(handle))?;

    let decoded = decode_record(&record, kind.metadata());
    if !decoded.fallbacks.is_empty() {
        tracing::debug!("{} read with defaults for {:?}", handle, decoded.fallbacks);
    }

    let mut entity = SmartEntity::new(kind, block.position);
    for (meta, value) in &decoded.values {
        if let Err(e) = entity.set(meta.name, value) {
            tracing::warn!("{}: {} ignored: {}", handle, meta.name, e);
        }
    }

    let base = entity.base_mut();
    base.handle = Some(handle);
    base.style_guid = decoded.style_guid.unwrap_or_default();
    base.end_point = decoded.primary.map(|offset| block.position + offset);
    base.layer_name = block.layer.clone();
    base.line_type = block.line_type.clone();
    base.line_type_scale = block.line_type_scale;
    base.primitives = block.primitives.clone();
    Ok(entity)
}

/// 编码实体的扩展数据记录
pub fn encode_entity(entity: &SmartEntity) -> Result<Vec<u8>, HostError> {
    let kind = entity.kind();
    let record = encode_record(
        kind.type_tag(),
        kind.metadata(),
        entity.base().style_guid,
        entity.end_offset(),
        |meta| match meta.storage {
            PropertyStorage::Record => entity.get(meta.name),
            _ => None,
        },
    );
    record.to_bytes().map_err(|e| HostError::Codec(e.to_string()))
}

/// 把实体写回块，没有句柄时分配新句柄
///
/// 写入的是实体上一次成功重建的图元。
pub fn write_entity(drawing: &mut Drawing, entity: &mut SmartEntity) -> Result<EntityHandle, HostError> {
    let xdata = encode_entity(entity)?;
    let base = entity.base();
    let handle = base.handle.unwrap_or_else(EntityHandle::new);

    let block = HostBlock {
        handle,
        position: base.insertion_point,
        layer: base.layer_name.clone(),
        line_type: base.line_type.clone(),
        line_type_scale: base.line_type_scale,
        xdata,
        primitives: base.primitives.clone(),
        erased: false,
    };
    drawing.write_block(block)?;
    entity.base_mut().handle = Some(handle);
    Ok(handle)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::math::Point2;
    use crate::report::RecordingReporter;
    use crate::value::PropertyValue;
    use uuid::Uuid;

    #[test]
    fn test_entity_round_trip_through_block() {
        let mut drawing = Drawing::new();
        let mut entity = SmartEntity::new(EntityKind::Axis, Point2::new(10.0, 20.0));
        entity.set_end_point(Point2::new(10.0, 220.0));
        entity.set("FirstText", &PropertyValue::from("A")).unwrap();
        entity.set("Fracture", &PropertyValue::Int(7)).unwrap();
        entity.base_mut().style_guid = Uuid::new_v4();
        entity.update_geometry(&mut RecordingReporter::new());

        let handle = write_entity(&mut drawing, &mut entity).unwrap();
        let read = read_entity(&drawing, handle).unwrap();
        assert_eq!(read, entity);
    }

    #[test]
    fn test_recognize_by_type_tag() {
        let mut drawing = Drawing::new();
        let mut ground = SmartEntity::new(EntityKind::GroundLine, Point2::origin());
        write_entity(&mut drawing, &mut ground).unwrap();
        drawing
            .write_block(HostBlock::new(EntityHandle::new(), Point2::origin()))
            .unwrap();

        let entities = list_entities(&drawing);
        assert_eq!(entities.len(), 1);
        assert_eq!(entities[0].1, EntityKind::GroundLine);
    }

    #[test]
    fn test_plain_block_is_not_an_entity() {
        let mut drawing = Drawing::new();
        let block = HostBlock::new(EntityHandle::new(), Point2::origin());
        let handle = block.handle;
        drawing.write_block(block).unwrap();
        assert!(read_entity(&drawing, handle).is_err());
        assert_eq!(
            read_entity(&drawing, EntityHandle::NULL),
            Err(HostError::BlockNotFound(EntityHandle::NULL))
        );
    }
}
