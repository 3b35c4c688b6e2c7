use crate::sys::{CDataType, SqlLen};
use bytes::{Buf, BufMut, BytesMut};
use uuid::Uuid;

pub const GUID_LEN: usize = 16;

/// Column-major storage for one bound column: `stride` bytes per row plus
/// one indicator per row.
#[derive(Debug, Clone)]
pub struct NativeColumnBuffer {
    ordinal: usize,
    c_type: CDataType,
    stride: usize,
    data: BytesMut,
    indicators: Vec<SqlLen>,
}

impl NativeColumnBuffer {
    pub(crate) fn zeroed(ordinal: usize, c_type: CDataType, stride: usize, rows: usize) -> Self {
        Self {
            ordinal,
            c_type,
            stride,
            data: BytesMut::zeroed(stride * rows),
            indicators: vec![0; rows],
        }
    }

    pub fn ordinal(&self) -> usize {
        self.ordinal
    }

    pub fn c_type(&self) -> CDataType {
        self.c_type
    }

    pub fn stride(&self) -> usize {
        self.stride
    }

    pub fn rows(&self) -> usize {
        self.indicators.len()
    }

    pub fn data(&self) -> &[u8] {
        &self.data
    }

    pub fn indicators(&self) -> &[SqlLen] {
        &self.indicators
    }

    pub fn cell(&self, row: usize) -> &[u8] {
        &self.data[row * self.stride..(row + 1) * self.stride]
    }

    pub(crate) fn cell_mut(&mut self, row: usize) -> &mut [u8] {
        let stride = self.stride;
        &mut self.data[row * stride..(row + 1) * stride]
    }

    pub(crate) fn set_indicator(&mut self, row: usize, indicator: SqlLen) {
        self.indicators[row] = indicator;
    }

    /// Borrowed view handed to the driver; it must not outlive `self`.
    pub fn view(&self) -> ColumnView<'_> {
        ColumnView {
            column_number: (self.ordinal + 1) as u16,
            c_type: self.c_type,
            stride: self.stride,
            data: &self.data,
            indicators: &self.indicators,
        }
    }
}

#[derive(Debug, Clone, Copy)]
pub struct ColumnView<'a> {
    /// 1-based, as `SQLBindCol` expects.
    pub column_number: u16,
    pub c_type: CDataType,
    pub stride: usize,
    pub data: &'a [u8],
    pub indicators: &'a [SqlLen],
}

impl<'a> ColumnView<'a> {
    pub fn rows(&self) -> usize {
        self.indicators.len()
    }

    pub fn cell(&self, row: usize) -> &'a [u8] {
        &self.data[row * self.stride..(row + 1) * self.stride]
    }
}

/// One input parameter as handed to `SQLBindParameter`.
#[derive(Debug, Clone, Copy)]
pub struct ParameterView<'a> {
    /// 1-based.
    pub number: u16,
    pub c_type: CDataType,
    pub sql_type: i16,
    pub column_size: usize,
    pub decimal_digits: i16,
    pub data: &'a [u8],
    pub indicator: SqlLen,
}

/// Payload length of a NUL-terminated cell; the whole cell when no
/// terminator fits.
pub fn terminated_len(cell: &[u8], terminator: usize) -> usize {
    if terminator == 0 {
        return cell.len();
    }
    cell.chunks_exact(terminator)
        .position(|unit| unit.iter().all(|b| *b == 0))
        .map_or(cell.len() - cell.len() % terminator, |idx| idx * terminator)
}

/// `SQLGUID` layout: three native-order integers then eight raw bytes.
pub fn encode_guid(value: &Uuid) -> [u8; GUID_LEN] {
    let (d1, d2, d3, d4) = value.as_fields();
    let mut out = [0u8; GUID_LEN];
    let mut buf = &mut out[..];
    buf.put_u32_ne(d1);
    buf.put_u16_ne(d2);
    buf.put_u16_ne(d3);
    buf.put_slice(d4);
    out
}

pub fn decode_guid(bytes: &[u8]) -> Option<Uuid> {
    if bytes.len() < GUID_LEN {
        return None;
    }
    let mut buf = bytes;
    let d1 = buf.get_u32_ne();
    let d2 = buf.get_u16_ne();
    let d3 = buf.get_u16_ne();
    let mut d4 = [0u8; 8];
    buf.copy_to_slice(&mut d4);
    Some(Uuid::from_fields(d1, d2, d3, &d4))
}

/// UTF-16 code units in native byte order, no terminator. Embedded NULs
/// are kept as-is.
pub fn encode_wide(text: &str) -> Vec<u8> {
    let mut out = Vec::with_capacity(text.len() * 2);
    for unit in text.encode_utf16() {
        out.put_u16_ne(unit);
    }
    out
}

pub fn decode_wide(bytes: &[u8]) -> Result<String, std::string::FromUtf16Error> {
    let units: Vec<u16> = bytes
        .chunks_exact(2)
        .map(|pair| u16::from_ne_bytes([pair[0], pair[1]]))
        .collect();
    String::from_utf16(&units)
}
