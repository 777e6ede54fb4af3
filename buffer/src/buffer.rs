use byteorder::{LittleEndian, WriteBytesExt};

use ilp_common::config::ProtocolVersion;
use ilp_common::{CResult, Error};

use crate::array::{self, ArrayElement};
use crate::decimal;
use crate::escape::{escape_quoted, escape_unquoted};
use crate::time::TimeUnit;
use crate::validator::{self, NameKind};

const ENTITY_TAG_FLOAT: u8 = 16;
const ENTITY_TAG_ARRAY: u8 = 14;
const ARRAY_TYPE_NULL: u8 = 33;
const ARRAY_TYPE_DOUBLE: u8 = 10;
const ENTITY_TAG_DECIMAL: u8 = 23;

/// The line-protocol wire-format generation a `Buffer` encodes to. Unlike
/// `ilp_common::config::ProtocolVersion` this has no `Auto` member — by the
/// time a `Buffer` exists the version has already been resolved.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EncoderVersion {
    V1,
    V2,
    V3,
}

impl EncoderVersion {
    fn supports_arrays(self) -> bool {
        matches!(self, EncoderVersion::V2 | EncoderVersion::V3)
    }

    fn supports_decimals(self) -> bool {
        matches!(self, EncoderVersion::V3)
    }

    fn binary_floats(self) -> bool {
        matches!(self, EncoderVersion::V2 | EncoderVersion::V3)
    }
}

impl TryFrom<ProtocolVersion> for EncoderVersion {
    type Error = Error;

    fn try_from(value: ProtocolVersion) -> Result<Self, Self::Error> {
        match value {
            ProtocolVersion::V1 => Ok(EncoderVersion::V1),
            ProtocolVersion::V2 => Ok(EncoderVersion::V2),
            ProtocolVersion::V3 => Ok(EncoderVersion::V3),
            ProtocolVersion::Auto => {
                Err(Error::configuration("protocol version must be resolved before building a Buffer"))
            }
        }
    }
}

#[derive(Debug, Clone, Default)]
struct RowState {
    table_written: bool,
    any_field_written: bool,
    symbols_allowed: bool,
}

/// Grow-on-demand byte buffer that serializes rows into the line protocol
/// under the ordering rules, escaping policies and row-boundary bookkeeping
/// in spec.md §3–§4.2.
#[derive(Debug)]
pub struct Buffer {
    version: EncoderVersion,
    data: Vec<u8>,
    buffer_size: usize,
    max_buffer_size: usize,
    max_name_len: usize,
    end_of_last_row: usize,
    row: RowState,
}

impl Buffer {
    pub fn new(version: EncoderVersion) -> Self {
        Self::with_capacity(version, 64 * 1024, 100 * 1024 * 1024, 127)
    }

    pub fn with_capacity(
        version: EncoderVersion,
        init_buf_size: usize,
        max_buffer_size: usize,
        max_name_len: usize,
    ) -> Self {
        Buffer {
            version,
            data: Vec::with_capacity(init_buf_size),
            buffer_size: init_buf_size.max(1),
            max_buffer_size,
            max_name_len,
            end_of_last_row: 0,
            row: RowState::default(),
        }
    }

    pub fn version(&self) -> EncoderVersion {
        self.version
    }

    pub fn current_position(&self) -> usize {
        self.data.len()
    }

    fn grow_for(&mut self, additional: usize) -> CResult<()> {
        let required = self.data.len() + additional;
        if required > self.max_buffer_size {
            return Err(Error::capacity(format!(
                "writing {additional} more bytes would bring the buffer to {required} bytes, \
                 exceeding max_buf_size ({})",
                self.max_buffer_size
            )));
        }
        while self.buffer_size < required {
            self.buffer_size = self.buffer_size.saturating_mul(2).min(self.max_buffer_size);
        }
        if self.data.capacity() < self.buffer_size {
            self.data.reserve(self.buffer_size - self.data.capacity());
        }
        Ok(())
    }

    /// Appends exactly the bytes of one already-encoded call. Callers build
    /// the full encoding for a method in a scratch `Vec` first, so either
    /// the whole call lands or (on a capacity error) none of it does.
    fn append(&mut self, bytes: &[u8]) -> CResult<()> {
        self.grow_for(bytes.len())?;
        self.data.extend_from_slice(bytes);
        Ok(())
    }

    pub fn table(&mut self, name: &str) -> CResult<&mut Self> {
        if self.row.table_written {
            return Err(Error::validation("table() may only be called once per row"));
        }
        validator::validate(NameKind::Table, name, self.max_name_len)?;
        let mut encoded = Vec::new();
        escape_unquoted(name, &mut encoded);
        self.append(&encoded)?;
        self.row.table_written = true;
        self.row.symbols_allowed = true;
        Ok(self)
    }

    pub fn symbol(&mut self, name: &str, value: &str) -> CResult<&mut Self> {
        self.require_table_written()?;
        if !self.row.symbols_allowed {
            return Err(Error::validation("symbol() must be called before any column in the row"));
        }
        validator::validate(NameKind::Column, name, self.max_name_len)?;
        let mut encoded = vec![b','];
        escape_unquoted(name, &mut encoded);
        encoded.push(b'=');
        escape_unquoted(value, &mut encoded);
        self.append(&encoded)?;
        self.row.any_field_written = true;
        Ok(self)
    }

    /// Validates the column name and writes the `<sep><name>=` prefix
    /// shared by every typed column method; returns the scratch buffer for
    /// the caller to append the value encoding to.
    fn begin_column(&mut self, name: &str) -> CResult<Vec<u8>> {
        self.require_table_written()?;
        validator::validate(NameKind::Column, name, self.max_name_len)?;
        let mut encoded = Vec::new();
        encoded.push(if self.row.symbols_allowed { b' ' } else { b',' });
        self.row.symbols_allowed = false;
        escape_unquoted(name, &mut encoded);
        encoded.push(b'=');
        Ok(encoded)
    }

    pub fn string_column(&mut self, name: &str, value: &str) -> CResult<&mut Self> {
        let mut encoded = self.begin_column(name)?;
        escape_quoted(value, &mut encoded);
        self.append(&encoded)?;
        self.row.any_field_written = true;
        Ok(self)
    }

    pub fn boolean_column(&mut self, name: &str, value: bool) -> CResult<&mut Self> {
        let mut encoded = self.begin_column(name)?;
        encoded.push(if value { b't' } else { b'f' });
        self.append(&encoded)?;
        self.row.any_field_written = true;
        Ok(self)
    }

    pub fn int_column(&mut self, name: &str, value: i64) -> CResult<&mut Self> {
        let mut encoded = self.begin_column(name)?;
        encoded.extend_from_slice(value.to_string().as_bytes());
        encoded.push(b'i');
        self.append(&encoded)?;
        self.row.any_field_written = true;
        Ok(self)
    }

    pub fn timestamp_column(&mut self, name: &str, value: i64, unit: TimeUnit) -> CResult<&mut Self> {
        let mut encoded = self.begin_column(name)?;
        encoded.extend_from_slice(unit.to_micros(value).to_string().as_bytes());
        encoded.push(b't');
        self.append(&encoded)?;
        self.row.any_field_written = true;
        Ok(self)
    }

    pub fn float_column(&mut self, name: &str, value: f64) -> CResult<&mut Self> {
        let mut encoded = self.begin_column(name)?;
        if self.version.binary_floats() {
            encoded.push(ENTITY_TAG_FLOAT);
            encoded.write_f64::<LittleEndian>(value)?;
        } else {
            encoded.extend_from_slice(format!("{value}").as_bytes());
        }
        self.append(&encoded)?;
        self.row.any_field_written = true;
        Ok(self)
    }

    pub fn array_column(&mut self, name: &str, value: &ArrayElement) -> CResult<&mut Self> {
        if !self.version.supports_arrays() {
            return Err(Error::validation("array columns require protocol version 2 or 3"));
        }
        let (dims, flat) = array::validate_and_flatten(value)?;
        let mut encoded = self.begin_column(name)?;
        encoded.push(ENTITY_TAG_ARRAY);
        encoded.push(ARRAY_TYPE_DOUBLE);
        encoded.push(dims.len() as u8);
        for d in &dims {
            encoded.write_u32::<LittleEndian>(*d)?;
        }
        for v in &flat {
            encoded.write_f64::<LittleEndian>(*v)?;
        }
        self.append(&encoded)?;
        self.row.any_field_written = true;
        Ok(self)
    }

    /// Writes a NULL array column (entity tag 14, type tag 33, no dims).
    pub fn null_array_column(&mut self, name: &str) -> CResult<&mut Self> {
        if !self.version.supports_arrays() {
            return Err(Error::validation("array columns require protocol version 2 or 3"));
        }
        let mut encoded = self.begin_column(name)?;
        encoded.push(ENTITY_TAG_ARRAY);
        encoded.push(ARRAY_TYPE_NULL);
        self.append(&encoded)?;
        self.row.any_field_written = true;
        Ok(self)
    }

    pub fn decimal_column_text(&mut self, name: &str, value: &str) -> CResult<&mut Self> {
        if !self.version.supports_decimals() {
            return Err(Error::validation("decimal columns require protocol version 3"));
        }
        decimal::validate_decimal_text(value)?;
        let mut encoded = self.begin_column(name)?;
        encoded.extend_from_slice(value.as_bytes());
        encoded.push(b'd');
        self.append(&encoded)?;
        self.row.any_field_written = true;
        Ok(self)
    }

    pub fn decimal_column(&mut self, name: &str, unscaled: &[u8], scale: u8) -> CResult<&mut Self> {
        if !self.version.supports_decimals() {
            return Err(Error::validation("decimal columns require protocol version 3"));
        }
        decimal::validate_decimal_binary(unscaled, scale)?;
        let mut encoded = self.begin_column(name)?;
        encoded.push(ENTITY_TAG_DECIMAL);
        encoded.push(scale);
        encoded.push(unscaled.len() as u8);
        encoded.extend_from_slice(unscaled);
        self.append(&encoded)?;
        self.row.any_field_written = true;
        Ok(self)
    }

    pub fn at(&mut self, timestamp: i64, unit: TimeUnit) -> CResult<()> {
        self.require_row_closable()?;
        let nanos = unit.to_nanos(timestamp);
        let mut encoded = vec![b' '];
        encoded.extend_from_slice(nanos.to_string().as_bytes());
        encoded.push(b'\n');
        self.append(&encoded)?;
        self.close_row();
        Ok(())
    }

    pub fn at_now(&mut self) -> CResult<()> {
        self.require_row_closable()?;
        self.append(b"\n")?;
        self.close_row();
        Ok(())
    }

    fn require_table_written(&self) -> CResult<()> {
        if !self.row.table_written {
            return Err(Error::validation("table() must be called before symbol()/column methods"));
        }
        Ok(())
    }

    fn require_row_closable(&self) -> CResult<()> {
        self.require_table_written()?;
        if !self.row.any_field_written {
            return Err(Error::validation(
                "a row must have at least one symbol or column before at()/at_now()",
            ));
        }
        Ok(())
    }

    fn close_row(&mut self) {
        self.row = RowState::default();
        self.end_of_last_row = self.data.len();
    }

    /// Discards everything: position, end-of-last-row and any in-progress
    /// row.
    pub fn reset(&mut self) -> &mut Self {
        self.data.clear();
        self.end_of_last_row = 0;
        self.row = RowState::default();
        self
    }

    /// Copies out all fully terminated rows and compacts the buffer,
    /// retaining any partial trailing row (spec.md §4.2, "Drain").
    pub fn drain(&mut self) -> Option<Vec<u8>> {
        if self.end_of_last_row == 0 {
            return None;
        }
        let drained = self.data[..self.end_of_last_row].to_vec();
        self.data.drain(..self.end_of_last_row);
        self.end_of_last_row = 0;
        Some(drained)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn buf(version: EncoderVersion) -> Buffer {
        Buffer::new(version)
    }

    #[test]
    fn encodes_scenario_one_v1() {
        let mut b = buf(EncoderVersion::V1);
        b.table("t").unwrap().symbol("s", "x").unwrap().float_column("f", 1.5).unwrap();
        b.at(1_700_000_000_000_000_000, TimeUnit::Ns).unwrap();
        let out = b.drain().unwrap();
        assert_eq!(out, b"t,s=x f=1.5 1700000000000000000\n");
    }

    #[test]
    fn encodes_scenario_two_boolean_and_quoted_string() {
        let mut b = buf(EncoderVersion::V1);
        b.table("t").unwrap().boolean_column("b", true).unwrap();
        b.at_now().unwrap();
        assert_eq!(b.drain().unwrap(), b"t b=t\n");

        b.table("t").unwrap().string_column("s", "a b,c=d").unwrap();
        b.at_now().unwrap();
        assert_eq!(b.drain().unwrap(), b"t s=\"a b,c=d\"\n");
    }

    #[test]
    fn second_table_call_fails() {
        let mut b = buf(EncoderVersion::V1);
        b.table("t").unwrap();
        assert!(b.table("t2").is_err());
    }

    #[test]
    fn column_before_table_fails() {
        let mut b = buf(EncoderVersion::V1);
        assert!(b.int_column("x", 1).is_err());
    }

    #[test]
    fn symbol_after_column_fails() {
        let mut b = buf(EncoderVersion::V1);
        b.table("t").unwrap().int_column("x", 1).unwrap();
        assert!(b.symbol("s", "v").is_err());
    }

    #[test]
    fn closing_empty_row_fails() {
        let mut b = buf(EncoderVersion::V1);
        b.table("t").unwrap();
        assert!(b.at(0, TimeUnit::Us).is_err());
        assert!(b.drain().is_none());
    }

    #[test]
    fn drain_twice_returns_none_second_time() {
        let mut b = buf(EncoderVersion::V1);
        b.table("t").unwrap().int_column("x", 1).unwrap();
        b.at_now().unwrap();
        assert!(b.drain().is_some());
        assert!(b.drain().is_none());
    }

    #[test]
    fn drain_keeps_partial_trailing_row() {
        let mut b = buf(EncoderVersion::V1);
        b.table("t").unwrap().int_column("x", 1).unwrap();
        b.at_now().unwrap();
        b.table("t2").unwrap().int_column("y", 2).unwrap();
        let first = b.drain().unwrap();
        assert_eq!(first, b"t x=1i\n");
        assert_eq!(b.current_position(), b"t2,y=2i".len());
        b.at_now().unwrap();
        let second = b.drain().unwrap();
        assert_eq!(second, b"t2,y=2i\n");
    }

    #[test]
    fn v2_float_is_binary() {
        let mut b = buf(EncoderVersion::V2);
        b.table("t").unwrap().symbol("s", "x").unwrap().float_column("f", 1.5).unwrap();
        b.at(1_700_000_000_000_000_000, TimeUnit::Ns).unwrap();
        let out = b.drain().unwrap();
        let mut expected = Vec::new();
        expected.extend_from_slice(b"t,s=x f=");
        expected.push(16);
        expected.write_f64::<LittleEndian>(1.5).unwrap();
        expected.extend_from_slice(b" 1700000000000000000\n");
        assert_eq!(out, expected);
    }

    #[test]
    fn v1_rejects_array_column() {
        let mut b = buf(EncoderVersion::V1);
        b.table("t").unwrap();
        let arr: ArrayElement = vec![1.0, 2.0].into();
        assert!(b.array_column("a", &arr).is_err());
    }

    #[test]
    fn v2_array_column_encodes_shape_and_elements() {
        let mut b = buf(EncoderVersion::V2);
        b.table("t").unwrap();
        let arr: ArrayElement = vec![1.0, 2.0, 3.0].into();
        b.array_column("a", &arr).unwrap();
        b.at_now().unwrap();
        let out = b.drain().unwrap();
        let mut expected = Vec::new();
        expected.extend_from_slice(b"t a=");
        expected.push(14); // entity tag array
        expected.push(10); // type tag double
        expected.push(1); // ndims
        expected.write_u32::<LittleEndian>(3).unwrap();
        for v in [1.0, 2.0, 3.0] {
            expected.write_f64::<LittleEndian>(v).unwrap();
        }
        expected.push(b'\n');
        assert_eq!(out, expected);
    }

    #[test]
    fn v3_decimal_text_and_binary() {
        let mut b = buf(EncoderVersion::V3);
        b.table("t").unwrap().decimal_column_text("d", "12.34").unwrap();
        b.at_now().unwrap();
        assert_eq!(b.drain().unwrap(), b"t d=12.34d\n");

        b.table("t").unwrap().decimal_column("d", &[0x04, 0xD2], 2).unwrap();
        b.at_now().unwrap();
        let out = b.drain().unwrap();
        let mut expected = Vec::new();
        expected.extend_from_slice(b"t d=");
        expected.push(23);
        expected.push(2);
        expected.push(2);
        expected.extend_from_slice(&[0x04, 0xD2]);
        expected.push(b'\n');
        assert_eq!(out, expected);
    }

    #[test]
    fn v2_rejects_decimal_column() {
        let mut b = buf(EncoderVersion::V2);
        b.table("t").unwrap();
        assert!(b.decimal_column_text("d", "1.0").is_err());
    }

    #[test]
    fn capacity_error_leaves_buffer_unchanged() {
        let mut b = Buffer::with_capacity(EncoderVersion::V1, 64, 128, 127);
        b.table("t").unwrap();
        let before = b.current_position();
        let long_value = "x".repeat(200);
        let result = b.string_column("s", &long_value);
        assert!(result.is_err());
        assert_eq!(b.current_position(), before);
    }
}
