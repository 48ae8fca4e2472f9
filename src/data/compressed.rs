//! Compressed JSON form of a [`ColumnarData`] table.
//!
//! ```text
//! { "_format": "compressed", "_length": n, "_idtype": "u2",
//!   "ids":   { "values": <base64> },
//!   "<field>": { "values": <base64>, "positions": <base64> | "interval": k } }
//! ```
//!
//! Numeric payloads are little-endian typed arrays. `positions` holds
//! little-endian `i32` cumulative end offsets; `interval` is a fixed row
//! stride. Nested integer columns are stored with `_idtype`; generic
//! value columns are the base64 of a JSON array.

use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine as _;
use serde_json::{json, Map};

use super::column::{Column, NumericColumn};
use super::columnar::ColumnarData;
use super::schema::{FieldKind, FieldSpec, NumericType, Schema};
use crate::error::{FramescopeError, Result};
use crate::marks::PointId;
use crate::value::Value;

/// Value of the `_format` key.
pub const COMPRESSED_FORMAT: &str = "compressed";

/// How typed payloads are turned into columns.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum DecodePath {
    /// Copy the whole buffer into a typed allocation.
    #[default]
    Bulk,
    /// Decode one element at a time.
    PerElement,
}

/// Whether `json` carries the compressed marker.
#[must_use]
pub fn is_compressed(json: &serde_json::Value) -> bool {
    json.get("_format").and_then(serde_json::Value::as_str)
        == Some(COMPRESSED_FORMAT)
}

/// Decode with the default [`DecodePath`].
///
/// # Errors
///
/// See [`decode_with`].
pub fn decode(schema: Schema, json: &serde_json::Value) -> Result<ColumnarData> {
    decode_with(schema, json, DecodePath::default())
}

/// Decode a compressed table.
///
/// # Errors
///
/// [`FramescopeError::Decode`] for missing keys, bad base64, ragged
/// payloads or length mismatches; [`FramescopeError::UnknownTypeCode`]
/// for an unsupported `_idtype`.
pub fn decode_with(
    schema: Schema,
    json: &serde_json::Value,
    path: DecodePath,
) -> Result<ColumnarData> {
    let id_type = NumericType::from_code(required_str(json, "_idtype")?)?;
    if !id_type.is_integer() {
        return Err(FramescopeError::UnknownTypeCode(id_type.code().to_owned()));
    }
    let length = json
        .get("_length")
        .and_then(serde_json::Value::as_u64)
        .ok_or_else(|| missing("_length"))? as usize;

    let ids_field = json.get("ids").ok_or_else(|| missing("ids"))?;
    let ids: Vec<PointId> = decode_numeric(ids_field, id_type, path)?.to_i64_vec();
    if ids.len() != length {
        return Err(FramescopeError::Decode(format!(
            "_length is {length} but {} ids were decoded",
            ids.len()
        )));
    }

    let mut columns = Vec::with_capacity(schema.fields().len());
    let mut offsets = Vec::with_capacity(schema.fields().len());
    for field in schema.fields() {
        let entry = json
            .get(field.name())
            .ok_or_else(|| missing(field.name()))?;
        let column = match field.kind() {
            FieldKind::Numeric(ty) if field.is_nested() && ty.is_integer() => {
                let raw = decode_numeric(entry, id_type, path)?;
                if raw.numeric_type() == ty {
                    Column::Numeric(raw)
                } else {
                    let exact = NumericColumn::from_i64s(ty, &raw.to_i64_vec());
                    Column::Numeric(exact)
                }
            }
            FieldKind::Numeric(ty) => {
                Column::Numeric(decode_numeric(entry, ty, path)?)
            }
            FieldKind::Values => Column::Values(decode_values(entry)?),
        };
        offsets.push(nested_offsets(field, entry, length)?);
        columns.push(column);
    }

    ColumnarData::from_parts(schema, ids, columns, offsets)
}

/// Encode a table. IDs and nested integer columns share the smallest
/// integer type that holds all of them.
///
/// # Errors
///
/// JSON serialization failures of generic-value columns.
pub fn encode(data: &ColumnarData) -> Result<serde_json::Value> {
    let mut id_like = data.ids().to_vec();
    for (field, column, _) in data.columns() {
        if let Some(nested) = nested_integers(field, column) {
            id_like.extend(nested.to_i64_vec());
        }
    }
    let id_type = NumericType::smallest_for(&id_like);

    let mut out = Map::new();
    let _ = out.insert("_format".to_owned(), json!(COMPRESSED_FORMAT));
    let _ = out.insert("_length".to_owned(), json!(data.len()));
    let _ = out.insert("_idtype".to_owned(), json!(id_type.code()));
    let _ = out.insert(
        "ids".to_owned(),
        json!({
            "values": BASE64
                .encode(NumericColumn::from_i64s(id_type, data.ids()).to_le_bytes())
        }),
    );

    for (field, column, ends) in data.columns() {
        let mut entry = Map::new();
        let values = match (nested_integers(field, column), column) {
            (Some(c), _) => {
                NumericColumn::from_i64s(id_type, &c.to_i64_vec()).to_le_bytes()
            }
            (None, Column::Numeric(c)) => c.to_le_bytes(),
            (None, Column::Values(v)) => serde_json::to_vec(v)?,
        };
        let _ =
            entry.insert("values".to_owned(), json!(BASE64.encode(values)));
        if let Some(ends) = ends {
            let positions = NumericColumn::I32(ends.to_vec()).to_le_bytes();
            let _ = entry
                .insert("positions".to_owned(), json!(BASE64.encode(positions)));
        }
        let _ = out
            .insert(field.name().to_owned(), serde_json::Value::Object(entry));
    }

    Ok(serde_json::Value::Object(out))
}

fn nested_integers<'a>(
    field: &FieldSpec,
    column: &'a Column,
) -> Option<&'a NumericColumn> {
    column
        .as_numeric()
        .filter(|c| field.is_nested() && c.numeric_type().is_integer())
}

fn decode_numeric(
    entry: &serde_json::Value,
    ty: NumericType,
    path: DecodePath,
) -> Result<NumericColumn> {
    let bytes = BASE64.decode(required_str(entry, "values")?)?;
    match path {
        DecodePath::Bulk => NumericColumn::from_le_bytes_bulk(ty, &bytes),
        DecodePath::PerElement => NumericColumn::from_le_bytes_each(ty, &bytes),
    }
}

fn decode_values(entry: &serde_json::Value) -> Result<Vec<Value>> {
    let bytes = BASE64.decode(required_str(entry, "values")?)?;
    Ok(serde_json::from_slice(&bytes)?)
}

fn nested_offsets(
    field: &FieldSpec,
    entry: &serde_json::Value,
    length: usize,
) -> Result<Option<Vec<i32>>> {
    if !field.is_nested() {
        return Ok(None);
    }
    if let Some(positions) = entry.get("positions").and_then(serde_json::Value::as_str) {
        let bytes = BASE64.decode(positions)?;
        return match NumericColumn::from_le_bytes_each(NumericType::I32, &bytes)? {
            NumericColumn::I32(ends) => Ok(Some(ends)),
            _ => Err(FramescopeError::Decode("positions are not i32".to_owned())),
        };
    }
    if let Some(interval) = entry.get("interval").and_then(serde_json::Value::as_u64) {
        let ends = (1..=length).map(|i| (i as u64 * interval) as i32).collect();
        return Ok(Some(ends));
    }
    Err(FramescopeError::Decode(format!(
        "nested field '{}' has neither positions nor interval",
        field.name()
    )))
}

fn required_str<'a>(json: &'a serde_json::Value, key: &str) -> Result<&'a str> {
    json.get(key)
        .and_then(serde_json::Value::as_str)
        .ok_or_else(|| missing(key))
}

fn missing(key: &str) -> FramescopeError {
    FramescopeError::Decode(format!("missing or malformed '{key}'"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::frame::frame_schema;

    fn frame_data() -> ColumnarData {
        let records = (0..5).map(|i| {
            let json = serde_json::json!({
                "x": f64::from(i) * 1.25,
                "y": -f64::from(i),
                "alpha": 1.0,
                "r": 1.0,
                "color": format!("c{i}"),
                "highlight": (0..i).collect::<Vec<_>>(),
                "visible": true,
            });
            (PointId::from(i) * 100, serde_json::from_value(json).unwrap())
        });
        ColumnarData::from_records(frame_schema(), records).unwrap()
    }

    #[test]
    fn round_trip_preserves_columns_and_offsets() {
        let data = frame_data();
        let json = data.to_compressed().unwrap();
        assert_eq!(json["_idtype"], "u2");
        assert!(is_compressed(&json));

        let decoded = decode(frame_schema(), &json).unwrap();
        assert_eq!(decoded.ids(), data.ids());
        assert_eq!(
            decoded.nested_offsets("highlightIndexes"),
            data.nested_offsets("highlightIndexes")
        );
        for field in ["x", "y", "highlightIndexes", "color", "visible"] {
            assert_eq!(decoded.column(field), data.column(field), "{field}");
        }
    }

    #[test]
    fn decode_paths_agree() {
        let json = frame_data().to_compressed().unwrap();
        let bulk = decode_with(frame_schema(), &json, DecodePath::Bulk).unwrap();
        let each =
            decode_with(frame_schema(), &json, DecodePath::PerElement).unwrap();
        for field in frame_schema().fields() {
            assert_eq!(bulk.column(field.name()), each.column(field.name()));
        }
    }

    #[test]
    fn large_ids_and_nested_values_stay_exact() {
        let big: PointId = (1 << 53) + 1;
        let schema = Schema::new(vec![
            FieldSpec::numeric("x", NumericType::F32),
            FieldSpec::numeric("neighbors", NumericType::I64).nested(),
        ]);
        let data = ColumnarData::from_parts(
            schema.clone(),
            vec![0, big],
            vec![
                Column::Numeric(NumericColumn::F32(vec![1.0, 2.0])),
                Column::Numeric(NumericColumn::I64(vec![big, 0, i64::MAX])),
            ],
            vec![None, Some(vec![1, 3])],
        )
        .unwrap();

        let json = encode(&data).unwrap();
        assert_eq!(json["_idtype"], "u8");
        let decoded = decode(schema, &json).unwrap();
        assert_eq!(decoded.ids(), &[0, big][..]);
        assert_eq!(
            decoded.column("neighbors"),
            Some(&Column::Numeric(NumericColumn::I64(vec![big, 0, i64::MAX])))
        );
    }

    #[test]
    fn interval_offsets_are_a_regular_stride() {
        let schema = Schema::new(vec![
            FieldSpec::numeric("neighbors", NumericType::I32).nested(),
        ]);
        let ids = NumericColumn::U8(vec![4, 5]).to_le_bytes();
        let neighbors = NumericColumn::U8(vec![5, 4, 4, 5]).to_le_bytes();
        let json = serde_json::json!({
            "_format": "compressed",
            "_length": 2,
            "_idtype": "u1",
            "ids": { "values": BASE64.encode(ids) },
            "neighbors": { "values": BASE64.encode(neighbors), "interval": 2 },
        });
        let data = decode(schema, &json).unwrap();
        assert_eq!(data.nested_offsets("neighbors"), Some(&[2, 4][..]));
        assert_eq!(data.nested_ids(5, "neighbors"), vec![4, 5]);
    }

    #[test]
    fn bad_payloads_are_errors() {
        let schema = Schema::new(vec![FieldSpec::numeric("x", NumericType::F32)]);
        let json = serde_json::json!({
            "_format": "compressed",
            "_length": 1,
            "_idtype": "q9",
            "ids": { "values": "AA==" },
            "x": { "values": "AAAAAA==" },
        });
        assert!(matches!(
            decode(schema.clone(), &json),
            Err(FramescopeError::UnknownTypeCode(_))
        ));

        let mut short = json;
        short["_idtype"] = serde_json::json!("u1");
        short["x"]["values"] = serde_json::json!("AAA=");
        assert!(decode(schema, &short).is_err());
    }
}
