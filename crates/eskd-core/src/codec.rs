//! 扩展数据记录编解码
//!
//! 记录由一个类型标识、一个可选的主几何向量，以及字符串、整数、实数
//! 三个有序流组成。字段按位置而不是按名称定位，各流内部的顺序由使用方
//! 决定，编解码器本身不理解字段含义。
//!
//! 字节布局（小端）：
//!
//! ```text
//! u8   格式版本
//! str  类型标识                (u16 长度 + UTF-8)
//! u8   是否有主几何, [f64 x, f64 y]
//! u16  字符串数量, str...
//! u16  整数数量,   i32...
//! u16  实数数量,   f64...
//! ```
//!
//! 解码时只有版本和类型标识是必需的；之后任何位置被截断，已读出的
//! 字段照常返回，缺失的字段由使用方回退到默认值。

use crate::math::Vector2;
use byteorder::{LittleEndian, ReadBytesExt, WriteBytesExt};
use std::io::{self, Cursor, Read, Write};

/// 当前记录格式版本
pub const RECORD_FORMAT_VERSION: u8 = 1;

/// 单个流的最大字段数
const MAX_FIELDS: usize = u16::MAX as usize;

/// 编解码错误
#[derive(Debug, thiserror::Error)]
pub enum CodecError {
    #[error("IO error: {0}")]
    Io(#[from] io::Error),

    #[error("Record is empty or has no type tag")]
    MissingTypeTag,

    #[error("Unsupported record version: {0}")]
    UnsupportedVersion(u8),

    #[error("Too many fields in one stream: {0}")]
    TooManyFields(usize),
}

/// 扩展数据记录
#[derive(Debug, Clone, PartialEq, Default)]
pub struct WireRecord {
    pub type_tag: String,
    /// 主几何，例如终点相对插入点的偏移
    pub primary: Option<Vector2>,
    pub strings: Vec<String>,
    pub ints: Vec<i32>,
    pub doubles: Vec<f64>,
    /// 解码时数据在某个流中被截断
    pub truncated: bool,
    /// 不是合法 UTF-8 的字符串字段位置，读取时视为缺失
    pub invalid_strings: Vec<usize>,
}

impl WireRecord {
    pub fn new(type_tag: impl Into<String>) -> Self {
        Self {
            type_tag: type_tag.into(),
            ..Default::default()
        }
    }

    /// 编码为字节
    pub fn to_bytes(&self) -> Result<Vec<u8>, CodecError> {
        let mut out = Vec::new();
        out.write_u8(RECORD_FORMAT_VERSION)?;
        write_str(&mut out, &self.type_tag)?;

        match self.primary {
            Some(v) => {
                out.write_u8(1)?;
                out.write_f64::<LittleEndian>(v.x)?;
                out.write_f64::<LittleEndian>(v.y)?;
            }
            None => out.write_u8(0)?,
        }

        write_len(&mut out, self.strings.len())?;
        for s in &self.strings {
            write_str(&mut out, s)?;
        }

        write_len(&mut out, self.ints.len())?;
        for v in &self.ints {
            out.write_i32::<LittleEndian>(*v)?;
        }

        write_len(&mut out, self.doubles.len())?;
        for v in &self.doubles {
            out.write_f64::<LittleEndian>(*v)?;
        }

        Ok(out)
    }

    /// 从字节解码
    pub fn from_bytes(bytes: &[u8]) -> Result<Self, CodecError> {
        let mut cursor = Cursor::new(bytes);

        let version = cursor.read_u8().map_err(|_| CodecError::MissingTypeTag)?;
        if version == 0 || version > RECORD_FORMAT_VERSION {
            return Err(CodecError::UnsupportedVersion(version));
        }
        let type_tag = read_str(&mut cursor)
            .ok()
            .and_then(Result::ok)
            .ok_or(CodecError::MissingTypeTag)?;
        if type_tag.is_empty() {
            return Err(CodecError::MissingTypeTag);
        }

        let mut record = WireRecord::new(type_tag);
        if let Err(e) = read_streams(&mut cursor, &mut record) {
            if e.kind() != io::ErrorKind::UnexpectedEof {
                return Err(e.into());
            }
            tracing::warn!(
                "Truncated record {}: {} strings, {} ints, {} doubles recovered",
                record.type_tag,
                record.strings.len(),
                record.ints.len(),
                record.doubles.len()
            );
            record.truncated = true;
        }

        Ok(record)
    }

    /// 只读取类型标识，用于识别宿主块承载的实体类型
    pub fn peek_type_tag(bytes: &[u8]) -> Option<String> {
        let mut cursor = Cursor::new(bytes);
        let version = cursor.read_u8().ok()?;
        if version == 0 || version > RECORD_FORMAT_VERSION {
            return None;
        }
        read_str(&mut cursor).ok()?.ok().filter(|t| !t.is_empty())
    }

    /// 十六进制转储，用于日志
    pub fn hex_dump(&self) -> String {
        match self.to_bytes() {
            Ok(bytes) => hex::encode(bytes),
            Err(e) => format!("<unencodable: {}>", e),
        }
    }

    /// 按位置读取的游标
    pub fn cursor(&self) -> FieldCursor<'_> {
        FieldCursor {
            record: self,
            string_pos: 0,
            int_pos: 0,
            double_pos: 0,
        }
    }
}

/// 按位置依次读取三个流的游标
#[derive(Debug)]
pub struct FieldCursor<'a> {
    record: &'a WireRecord,
    string_pos: usize,
    int_pos: usize,
    double_pos: usize,
}

impl<'a> FieldCursor<'a> {
    /// 下一个字符串字段，流已耗尽或字段无效时返回 `None`
    pub fn next_string(&mut self) -> Option<&'a str> {
        let pos = self.string_pos;
        let value = self.record.strings.get(pos)?;
        self.string_pos += 1;
        if self.record.invalid_strings.contains(&pos) {
            return None;
        }
        Some(value.as_str())
    }

    pub fn next_int(&mut self) -> Option<i32> {
        let value = *self.record.ints.get(self.int_pos)?;
        self.int_pos += 1;
        Some(value)
    }

    pub fn next_double(&mut self) -> Option<f64> {
        let value = *self.record.doubles.get(self.double_pos)?;
        self.double_pos += 1;
        Some(value)
    }

    /// 各流中尚未读取的字段数（字符串, 整数, 实数）
    pub fn remaining(&self) -> (usize, usize, usize) {
        (
            self.record.strings.len().saturating_sub(self.string_pos),
            self.record.ints.len().saturating_sub(self.int_pos),
            self.record.doubles.len().saturating_sub(self.double_pos),
        )
    }
}

fn read_streams(cursor: &mut Cursor<&[u8]>, record: &mut WireRecord) -> io::Result<()> {
    if cursor.read_u8()? != 0 {
        let x = cursor.read_f64::<LittleEndian>()?;
        let y = cursor.read_f64::<LittleEndian>()?;
        record.primary = Some(Vector2::new(x, y));
    }

    let count = cursor.read_u16::<LittleEndian>()?;
    for pos in 0..count as usize {
        match read_str(cursor)? {
            Ok(s) => record.strings.push(s),
            Err(lossy) => {
                tracing::warn!(
                    "Record {}: string field {} is not valid UTF-8, using default",
                    record.type_tag,
                    pos
                );
                record.invalid_strings.push(pos);
                record.strings.push(lossy);
            }
        }
    }

    let count = cursor.read_u16::<LittleEndian>()?;
    for _ in 0..count {
        let v = cursor.read_i32::<LittleEndian>()?;
        record.ints.push(v);
    }

    let count = cursor.read_u16::<LittleEndian>()?;
    for _ in 0..count {
        let v = cursor.read_f64::<LittleEndian>()?;
        record.doubles.push(v);
    }

    Ok(())
}

fn write_len<W: Write>(out: &mut W, len: usize) -> Result<(), CodecError> {
    if len > MAX_FIELDS {
        return Err(CodecError::TooManyFields(len));
    }
    out.write_u16::<LittleEndian>(len as u16)?;
    Ok(())
}

fn write_str<W: Write>(out: &mut W, s: &str) -> Result<(), CodecError> {
    let bytes = s.as_bytes();
    if bytes.len() > MAX_FIELDS {
        return Err(CodecError::TooManyFields(bytes.len()));
    }
    out.write_u16::<LittleEndian>(bytes.len() as u16)?;
    out.write_all(bytes)?;
    Ok(())
}

/// 读取一个字符串；内容不是合法 UTF-8 时以 `Err` 返回替换后的文本
fn read_str<R: Read>(input: &mut R) -> io::Result<Result<String, String>> {
    let len = input.read_u16::<LittleEndian>()? as usize;
    let mut buf = vec![0u8; len];
    input.read_exact(&mut buf)?;
    Ok(String::from_utf8(buf).map_err(|e| String::from_utf8_lossy(e.as_bytes()).into_owned()))
}
