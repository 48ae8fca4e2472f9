//! Field layout of a [`ColumnarData`](super::ColumnarData) table.

use crate::error::{FramescopeError, Result};

/// Element type of a typed numeric column, addressed on the wire by a
/// compact code (`i4`, `f4`, ...).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum NumericType {
    /// `i1`
    I8,
    /// `i2`
    I16,
    /// `i4`
    I32,
    /// `i8`
    I64,
    /// `u1`
    U8,
    /// `u2`
    U16,
    /// `u4`
    U32,
    /// `u8`
    U64,
    /// `f4`
    F32,
    /// `f8`
    F64,
}

impl NumericType {
    /// Integer codes accepted for ID arrays and nested integer columns.
    pub const INTEGER_CODES: [&'static str; 8] =
        ["i1", "i2", "i4", "i8", "u1", "u2", "u4", "u8"];

    /// Compact type code.
    #[must_use]
    pub fn code(self) -> &'static str {
        match self {
            Self::I8 => "i1",
            Self::I16 => "i2",
            Self::I32 => "i4",
            Self::I64 => "i8",
            Self::U8 => "u1",
            Self::U16 => "u2",
            Self::U32 => "u4",
            Self::U64 => "u8",
            Self::F32 => "f4",
            Self::F64 => "f8",
        }
    }

    /// Parse a compact type code. A leading byte-order mark (`<`, `|`) is
    /// accepted.
    ///
    /// # Errors
    ///
    /// [`FramescopeError::UnknownTypeCode`] for anything else.
    pub fn from_code(code: &str) -> Result<Self> {
        let bare = code.trim_start_matches(['<', '|', '=']);
        Ok(match bare {
            "i1" => Self::I8,
            "i2" => Self::I16,
            "i4" => Self::I32,
            "i8" => Self::I64,
            "u1" => Self::U8,
            "u2" => Self::U16,
            "u4" => Self::U32,
            "u8" => Self::U64,
            "f4" => Self::F32,
            "f8" => Self::F64,
            _ => return Err(FramescopeError::UnknownTypeCode(code.to_owned())),
        })
    }

    /// Bytes per element.
    #[must_use]
    pub fn width(self) -> usize {
        match self {
            Self::I8 | Self::U8 => 1,
            Self::I16 | Self::U16 => 2,
            Self::I32 | Self::U32 | Self::F32 => 4,
            Self::I64 | Self::U64 | Self::F64 => 8,
        }
    }

    /// Whether the type is one of the integer types.
    #[must_use]
    pub fn is_integer(self) -> bool {
        !matches!(self, Self::F32 | Self::F64)
    }

    /// Smallest integer type holding every value in `values`. Unsigned
    /// types are preferred when nothing is negative.
    #[must_use]
    pub fn smallest_for(values: &[i64]) -> Self {
        let min = values.iter().copied().min().unwrap_or(0);
        let max = values.iter().copied().max().unwrap_or(0);
        if min >= 0 {
            match max {
                m if m <= i64::from(u8::MAX) => Self::U8,
                m if m <= i64::from(u16::MAX) => Self::U16,
                m if m <= i64::from(u32::MAX) => Self::U32,
                _ => Self::U64,
            }
        } else {
            let fits = |lo: i64, hi: i64| min >= lo && max <= hi;
            if fits(i64::from(i8::MIN), i64::from(i8::MAX)) {
                Self::I8
            } else if fits(i64::from(i16::MIN), i64::from(i16::MAX)) {
                Self::I16
            } else if fits(i64::from(i32::MIN), i64::from(i32::MAX)) {
                Self::I32
            } else {
                Self::I64
            }
        }
    }
}

/// Storage kind of one field.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FieldKind {
    /// Typed numeric column.
    Numeric(NumericType),
    /// Column of arbitrary [`Value`](crate::value::Value)s.
    Values,
}

/// One named field of a schema.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FieldSpec {
    name: String,
    kind: FieldKind,
    nested: bool,
    source: Option<String>,
}

impl FieldSpec {
    /// Typed numeric field.
    #[must_use]
    pub fn numeric(name: &str, ty: NumericType) -> Self {
        Self {
            name: name.to_owned(),
            kind: FieldKind::Numeric(ty),
            nested: false,
            source: None,
        }
    }

    /// Generic value field.
    #[must_use]
    pub fn values(name: &str) -> Self {
        Self {
            name: name.to_owned(),
            kind: FieldKind::Values,
            nested: false,
            source: None,
        }
    }

    /// Mark the field as holding a list per row.
    #[must_use]
    pub fn nested(mut self) -> Self {
        self.nested = true;
        self
    }

    /// Read the field from `source` in input records instead of its own
    /// name.
    #[must_use]
    pub fn from_field(mut self, source: &str) -> Self {
        self.source = Some(source.to_owned());
        self
    }

    /// Column name.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Storage kind.
    #[must_use]
    pub fn kind(&self) -> FieldKind {
        self.kind
    }

    /// Whether rows hold lists.
    #[must_use]
    pub fn is_nested(&self) -> bool {
        self.nested
    }

    /// Key read from input records.
    #[must_use]
    pub fn source_key(&self) -> &str {
        self.source.as_deref().unwrap_or(&self.name)
    }
}

/// Ordered set of fields.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Schema {
    fields: Vec<FieldSpec>,
}

impl Schema {
    /// Schema over `fields`, in order.
    #[must_use]
    pub fn new(fields: Vec<FieldSpec>) -> Self {
        Self { fields }
    }

    /// Append a field.
    #[must_use]
    pub fn with(mut self, field: FieldSpec) -> Self {
        self.fields.push(field);
        self
    }

    /// All fields, in declaration order.
    #[must_use]
    pub fn fields(&self) -> &[FieldSpec] {
        &self.fields
    }

    /// Field by column name.
    #[must_use]
    pub fn field(&self, name: &str) -> Option<&FieldSpec> {
        self.fields.iter().find(|f| f.name == name)
    }

    /// Whether a column named `name` exists.
    #[must_use]
    pub fn contains(&self, name: &str) -> bool {
        self.field(name).is_some()
    }
}
