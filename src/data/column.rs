//! Column storage: typed numeric arrays or generic values.

use std::ops::Range;

use bytemuck::{Pod, Zeroable};

use super::schema::NumericType;
use crate::error::{FramescopeError, Result};
use crate::value::Value;

/// Element of a typed numeric column.
pub trait Scalar: Pod + PartialEq + std::fmt::Debug {
    /// Widen to `f64`.
    fn to_f64(self) -> f64;
    /// Narrow from `f64` (saturating for integers).
    fn from_f64(v: f64) -> Self;
    /// Exact for every integer type up to 64 bits (`u64` above
    /// `i64::MAX` wraps); truncating for floats.
    fn to_i64(self) -> i64;
    /// Narrow from `i64` without passing through a float.
    fn from_i64(v: i64) -> Self;
    /// Decode one little-endian element from exactly `size_of::<Self>()`
    /// bytes.
    fn read_le(chunk: &[u8]) -> Self;
    /// Append the little-endian bytes of `self`.
    fn write_le(self, out: &mut Vec<u8>);
}

macro_rules! impl_scalar {
    ($($t:ty),* $(,)?) => {
        $(
            impl Scalar for $t {
                fn to_f64(self) -> f64 {
                    self as f64
                }

                fn from_f64(v: f64) -> Self {
                    v as $t
                }

                #[allow(trivial_numeric_casts)]
                fn to_i64(self) -> i64 {
                    self as i64
                }

                #[allow(trivial_numeric_casts)]
                fn from_i64(v: i64) -> Self {
                    v as $t
                }

                fn read_le(chunk: &[u8]) -> Self {
                    let mut buf = [0u8; size_of::<$t>()];
                    buf.copy_from_slice(chunk);
                    <$t>::from_le_bytes(buf)
                }

                fn write_le(self, out: &mut Vec<u8>) {
                    out.extend_from_slice(&self.to_le_bytes());
                }
            }
        )*
    };
}

impl_scalar!(i8, i16, i32, i64, u8, u16, u32, u64, f32);

impl Scalar for f64 {
    fn to_f64(self) -> f64 {
        self
    }

    fn from_f64(v: f64) -> Self {
        v
    }

    fn to_i64(self) -> i64 {
        self as i64
    }

    fn from_i64(v: i64) -> Self {
        v as Self
    }

    fn read_le(chunk: &[u8]) -> Self {
        let mut buf = [0u8; 8];
        buf.copy_from_slice(chunk);
        Self::from_le_bytes(buf)
    }

    fn write_le(self, out: &mut Vec<u8>) {
        out.extend_from_slice(&self.to_le_bytes());
    }
}

/// A typed numeric array.
#[derive(Debug, Clone, PartialEq)]
pub enum NumericColumn {
    /// `i1`
    I8(Vec<i8>),
    /// `i2`
    I16(Vec<i16>),
    /// `i4`
    I32(Vec<i32>),
    /// `i8`
    I64(Vec<i64>),
    /// `u1`
    U8(Vec<u8>),
    /// `u2`
    U16(Vec<u16>),
    /// `u4`
    U32(Vec<u32>),
    /// `u8`
    U64(Vec<u64>),
    /// `f4`
    F32(Vec<f32>),
    /// `f8`
    F64(Vec<f64>),
}

/// Run `$body` with `$v` bound to the inner vector of any variant.
macro_rules! each_variant {
    ($col:expr, $v:ident => $body:expr) => {
        match $col {
            NumericColumn::I8($v) => $body,
            NumericColumn::I16($v) => $body,
            NumericColumn::I32($v) => $body,
            NumericColumn::I64($v) => $body,
            NumericColumn::U8($v) => $body,
            NumericColumn::U16($v) => $body,
            NumericColumn::U32($v) => $body,
            NumericColumn::U64($v) => $body,
            NumericColumn::F32($v) => $body,
            NumericColumn::F64($v) => $body,
        }
    };
}

/// Build a column of type `$ty` from an expression generic over `$t`.
macro_rules! for_type {
    ($ty:expr, $t:ident => $body:expr) => {
        match $ty {
            NumericType::I8 => { type $t = i8; NumericColumn::I8($body) }
            NumericType::I16 => { type $t = i16; NumericColumn::I16($body) }
            NumericType::I32 => { type $t = i32; NumericColumn::I32($body) }
            NumericType::I64 => { type $t = i64; NumericColumn::I64($body) }
            NumericType::U8 => { type $t = u8; NumericColumn::U8($body) }
            NumericType::U16 => { type $t = u16; NumericColumn::U16($body) }
            NumericType::U32 => { type $t = u32; NumericColumn::U32($body) }
            NumericType::U64 => { type $t = u64; NumericColumn::U64($body) }
            NumericType::F32 => { type $t = f32; NumericColumn::F32($body) }
            NumericType::F64 => { type $t = f64; NumericColumn::F64($body) }
        }
    };
}

impl NumericColumn {
    /// Zero-filled column of `len` elements.
    #[must_use]
    pub fn zeros(ty: NumericType, len: usize) -> Self {
        for_type!(ty, T => vec![T::zeroed(); len])
    }

    /// Column of `ty` holding `values` (narrowed per element).
    #[must_use]
    pub fn from_f64s(ty: NumericType, values: &[f64]) -> Self {
        for_type!(ty, T => values.iter().map(|&v| T::from_f64(v)).collect())
    }

    /// Column of `ty` holding integer `values`, converted without a float
    /// round trip.
    #[must_use]
    pub fn from_i64s(ty: NumericType, values: &[i64]) -> Self {
        for_type!(ty, T => values.iter().map(|&v| T::from_i64(v)).collect())
    }

    /// Element type.
    #[must_use]
    pub fn numeric_type(&self) -> NumericType {
        match self {
            Self::I8(_) => NumericType::I8,
            Self::I16(_) => NumericType::I16,
            Self::I32(_) => NumericType::I32,
            Self::I64(_) => NumericType::I64,
            Self::U8(_) => NumericType::U8,
            Self::U16(_) => NumericType::U16,
            Self::U32(_) => NumericType::U32,
            Self::U64(_) => NumericType::U64,
            Self::F32(_) => NumericType::F32,
            Self::F64(_) => NumericType::F64,
        }
    }

    /// Number of elements.
    #[must_use]
    pub fn len(&self) -> usize {
        each_variant!(self, v => v.len())
    }

    /// Whether the column is empty.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Element `i` widened to `f64`.
    #[must_use]
    pub fn get_f64(&self, i: usize) -> Option<f64> {
        each_variant!(self, v => v.get(i).map(|x| x.to_f64()))
    }

    /// Overwrite element `i`. Out-of-range indices are ignored.
    pub fn set_f64(&mut self, i: usize, value: f64) {
        each_variant!(self, v => {
            if let Some(slot) = v.get_mut(i) {
                *slot = Scalar::from_f64(value);
            }
        });
    }

    /// Every element widened to `f64`.
    #[must_use]
    pub fn to_f64_vec(&self) -> Vec<f64> {
        each_variant!(self, v => v.iter().map(|x| x.to_f64()).collect())
    }

    /// Every element as `i64`; exact for integer columns.
    #[must_use]
    pub fn to_i64_vec(&self) -> Vec<i64> {
        each_variant!(self, v => v.iter().map(|x| x.to_i64()).collect())
    }

    /// Little-endian bytes of the whole column.
    #[must_use]
    pub fn to_le_bytes(&self) -> Vec<u8> {
        if cfg!(target_endian = "little") {
            each_variant!(self, v => bytemuck::cast_slice::<_, u8>(v.as_slice()).to_vec())
        } else {
            each_variant!(self, v => {
                let mut out = Vec::with_capacity(size_of_val(v.as_slice()));
                for &x in v {
                    x.write_le(&mut out);
                }
                out
            })
        }
    }

    /// Decode by copying the whole byte buffer into a typed allocation.
    /// Only valid on little-endian hosts; elsewhere this defers to
    /// [`from_le_bytes_each`](Self::from_le_bytes_each).
    ///
    /// # Errors
    ///
    /// [`FramescopeError::Decode`] when the byte count is not a multiple
    /// of the element width.
    pub fn from_le_bytes_bulk(ty: NumericType, bytes: &[u8]) -> Result<Self> {
        if !cfg!(target_endian = "little") {
            return Self::from_le_bytes_each(ty, bytes);
        }
        let len = element_count(ty, bytes)?;
        Ok(for_type!(ty, T => {
            let mut out = vec![T::zeroed(); len];
            bytemuck::cast_slice_mut::<T, u8>(&mut out).copy_from_slice(bytes);
            out
        }))
    }

    /// Decode element by element with `from_le_bytes`.
    ///
    /// # Errors
    ///
    /// [`FramescopeError::Decode`] when the byte count is not a multiple
    /// of the element width.
    pub fn from_le_bytes_each(ty: NumericType, bytes: &[u8]) -> Result<Self> {
        let _ = element_count(ty, bytes)?;
        Ok(for_type!(ty, T => {
            bytes
                .chunks_exact(size_of::<T>())
                .map(T::read_le)
                .collect()
        }))
    }
}

fn element_count(ty: NumericType, bytes: &[u8]) -> Result<usize> {
    if bytes.len() % ty.width() != 0 {
        return Err(FramescopeError::Decode(format!(
            "{} bytes is not a whole number of {} elements",
            bytes.len(),
            ty.code()
        )));
    }
    Ok(bytes.len() / ty.width())
}

/// Storage of one field.
#[derive(Debug, Clone, PartialEq)]
pub enum Column {
    /// Typed numeric array.
    Numeric(NumericColumn),
    /// Arbitrary values.
    Values(Vec<Value>),
}

impl Column {
    /// Number of stored elements (flattened for nested fields).
    #[must_use]
    pub fn len(&self) -> usize {
        match self {
            Self::Numeric(c) => c.len(),
            Self::Values(v) => v.len(),
        }
    }

    /// Whether nothing is stored.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Element `i` as a [`Value`]; `Null` when out of range.
    #[must_use]
    pub fn value(&self, i: usize) -> Value {
        match self {
            Self::Numeric(c) => c.get_f64(i).map_or(Value::Null, Value::Number),
            Self::Values(v) => v.get(i).cloned().unwrap_or_default(),
        }
    }

    /// Elements in `range` as a list value.
    #[must_use]
    pub fn slice(&self, range: Range<usize>) -> Value {
        Value::List(range.map(|i| self.value(i)).collect())
    }

    /// Numeric view, if typed.
    #[must_use]
    pub fn as_numeric(&self) -> Option<&NumericColumn> {
        match self {
            Self::Numeric(c) => Some(c),
            Self::Values(_) => None,
        }
    }

    /// Mutable numeric view, if typed.
    pub fn as_numeric_mut(&mut self) -> Option<&mut NumericColumn> {
        match self {
            Self::Numeric(c) => Some(c),
            Self::Values(_) => None,
        }
    }

    /// Generic value view, if untyped.
    #[must_use]
    pub fn as_values(&self) -> Option<&[Value]> {
        match self {
            Self::Values(v) => Some(v),
            Self::Numeric(_) => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn bulk_and_per_element_decoding_agree() {
        let cases = [
            NumericColumn::F32(vec![1.5, -0.25, f32::MAX, 3.0e-7]),
            NumericColumn::I32(vec![i32::MIN, -1, 0, 7, i32::MAX]),
            NumericColumn::U16(vec![0, 1, 65_535]),
            NumericColumn::F64(vec![std::f64::consts::PI, -2.0]),
            NumericColumn::I8(vec![-128, 0, 127]),
        ];
        for col in cases {
            let bytes = col.to_le_bytes();
            let ty = col.numeric_type();
            let bulk = NumericColumn::from_le_bytes_bulk(ty, &bytes).unwrap();
            let each = NumericColumn::from_le_bytes_each(ty, &bytes).unwrap();
            assert_eq!(bulk.to_le_bytes(), each.to_le_bytes());
            assert_eq!(bulk, col);
        }
    }

    #[test]
    fn bulk_decoding_handles_unaligned_input() {
        let col = NumericColumn::U32(vec![1, 2, 3]);
        let mut padded = vec![0u8];
        padded.extend(col.to_le_bytes());
        let decoded =
            NumericColumn::from_le_bytes_bulk(NumericType::U32, &padded[1..]).unwrap();
        assert_eq!(decoded, col);
    }

    #[test]
    fn ragged_byte_counts_are_rejected() {
        assert!(NumericColumn::from_le_bytes_each(NumericType::I32, &[0, 1, 2]).is_err());
        assert!(NumericColumn::from_le_bytes_bulk(NumericType::F64, &[0; 9]).is_err());
    }

    #[test]
    fn integer_conversion_skips_floats() {
        let big = (1_i64 << 53) + 1;
        let col = NumericColumn::from_i64s(NumericType::U64, &[0, big, i64::MAX]);
        assert_eq!(col, NumericColumn::U64(vec![0, big as u64, i64::MAX as u64]));
        assert_eq!(col.to_i64_vec(), vec![0, big, i64::MAX]);
        let signed = NumericColumn::from_i64s(NumericType::I16, &[-300, 7]);
        assert_eq!(signed.to_i64_vec(), vec![-300, 7]);
    }

    #[test]
    fn values_read_as_dynamic_values() {
        let mut col = Column::Numeric(NumericColumn::zeros(NumericType::F32, 3));
        if let Some(n) = col.as_numeric_mut() {
            n.set_f64(1, 2.5);
        }
        assert_eq!(col.value(1), Value::Number(2.5));
        assert_eq!(col.value(9), Value::Null);
        assert_eq!(
            col.slice(0..2),
            Value::List(vec![Value::Number(0.0), Value::Number(2.5)])
        );
    }
}
