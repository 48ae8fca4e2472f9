//! Struct-of-arrays table keyed by point ID.

use std::cell::RefCell;
use std::collections::BTreeMap;
use std::fmt;
use std::rc::Rc;

use rustc_hash::FxHashMap;

use super::column::{Column, NumericColumn};
use super::schema::{FieldKind, FieldSpec, Schema};
use crate::error::{FramescopeError, Result};
use crate::marks::PointId;
use crate::value::Value;

/// Per-ID value function behind a computed or linked field.
pub type ComputedFn = Rc<dyn Fn(PointId) -> Value>;

/// Shared handle used as the target of [`ColumnarData::link_field`] and
/// [`ColumnarData::link_data`]. Links read through it on every access.
pub type SharedData = Rc<RefCell<ColumnarData>>;

/// Fixed set of points stored column by column.
///
/// Rows are ordered by ascending point ID. Nested fields keep one
/// flattened column plus cumulative end offsets: row `i` spans
/// `offsets[i - 1] (or 0) .. offsets[i]`.
pub struct ColumnarData {
    schema: Schema,
    ids: Vec<PointId>,
    rows: FxHashMap<PointId, usize>,
    columns: Vec<Column>,
    offsets: Vec<Option<Vec<i32>>>,
    computed: FxHashMap<String, ComputedFn>,
}

impl ColumnarData {
    /// Table with no rows.
    #[must_use]
    pub fn empty(schema: Schema) -> Self {
        let columns = schema.fields().iter().map(|f| empty_column(f, 0)).collect();
        let offsets = schema
            .fields()
            .iter()
            .map(|f| f.is_nested().then(Vec::new))
            .collect();
        Self {
            schema,
            ids: Vec::new(),
            rows: FxHashMap::default(),
            columns,
            offsets,
            computed: FxHashMap::default(),
        }
    }

    /// Build from per-point records. Each record is read by the schema's
    /// source keys; missing numeric values are stored as NaN (zero for
    /// integer columns), missing nested values as empty lists.
    ///
    /// # Errors
    ///
    /// [`FramescopeError::FrameFormat`] when a nested field holds
    /// something other than a list.
    pub fn from_records<I>(schema: Schema, records: I) -> Result<Self>
    where
        I: IntoIterator<Item = (PointId, Value)>,
    {
        let sorted: BTreeMap<PointId, Value> = records.into_iter().collect();
        let ids: Vec<PointId> = sorted.keys().copied().collect();

        let mut columns = Vec::with_capacity(schema.fields().len());
        let mut offsets = Vec::with_capacity(schema.fields().len());
        for field in schema.fields() {
            let key = field.source_key();
            if field.is_nested() {
                let mut flat = Vec::new();
                let mut ends = Vec::with_capacity(ids.len());
                for (id, record) in &sorted {
                    match record.field(key) {
                        None | Some(Value::Null) => {}
                        Some(Value::List(items)) => flat.extend(items.iter().cloned()),
                        Some(other) => {
                            return Err(FramescopeError::FrameFormat(format!(
                                "point {id}: nested field '{key}' is not a list: {other:?}"
                            )))
                        }
                    }
                    ends.push(flat.len() as i32);
                }
                columns.push(column_from_values(field, flat));
                offsets.push(Some(ends));
            } else {
                let values = sorted
                    .values()
                    .map(|record| record.field(key).cloned().unwrap_or_default())
                    .collect();
                columns.push(column_from_values(field, values));
                offsets.push(None);
            }
        }

        Ok(Self::assemble(schema, ids, columns, offsets))
    }

    /// Build from JSON: either the compressed encoding or an object keyed
    /// by point ID.
    ///
    /// # Errors
    ///
    /// Decode failures of the compressed form, non-integer keys, or
    /// malformed records.
    pub fn from_json(schema: Schema, json: &serde_json::Value) -> Result<Self> {
        if super::compressed::is_compressed(json) {
            return super::compressed::decode(schema, json);
        }
        let object = json.as_object().ok_or_else(|| {
            FramescopeError::FrameFormat("expected an object keyed by point ID".to_owned())
        })?;
        let records = object
            .iter()
            .map(|(key, record)| {
                Ok((parse_id(key)?, serde_json::from_value(record.clone())?))
            })
            .collect::<Result<Vec<(PointId, Value)>>>()?;
        Self::from_records(schema, records)
    }

    /// Assemble from decoded parts. Nested offsets are clamped to be
    /// non-decreasing and to end at the flattened length; mismatches are
    /// logged.
    pub(crate) fn from_parts(
        schema: Schema,
        ids: Vec<PointId>,
        columns: Vec<Column>,
        offsets: Vec<Option<Vec<i32>>>,
    ) -> Result<Self> {
        let mut offsets = offsets;
        for ((field, column), ends) in
            schema.fields().iter().zip(&columns).zip(offsets.iter_mut())
        {
            match ends {
                Some(ends) => {
                    if ends.len() != ids.len() {
                        return Err(FramescopeError::Decode(format!(
                            "field '{}' has {} offsets for {} ids",
                            field.name(),
                            ends.len(),
                            ids.len()
                        )));
                    }
                    clamp_offsets(field.name(), ends, column.len());
                }
                None if column.len() != ids.len() => {
                    return Err(FramescopeError::Decode(format!(
                        "field '{}' has {} values for {} ids",
                        field.name(),
                        column.len(),
                        ids.len()
                    )));
                }
                None => {}
            }
        }
        Ok(Self::assemble(schema, ids, columns, offsets))
    }

    fn assemble(
        schema: Schema,
        ids: Vec<PointId>,
        columns: Vec<Column>,
        offsets: Vec<Option<Vec<i32>>>,
    ) -> Self {
        let rows = ids.iter().enumerate().map(|(i, &id)| (id, i)).collect();
        Self {
            schema,
            ids,
            rows,
            columns,
            offsets,
            computed: FxHashMap::default(),
        }
    }

    /// Field layout.
    #[must_use]
    pub fn schema(&self) -> &Schema {
        &self.schema
    }

    /// Whether a row exists for `id`.
    #[must_use]
    pub fn has(&self, id: PointId) -> bool {
        self.rows.contains_key(&id)
    }

    /// Row index of `id`.
    #[must_use]
    pub fn row(&self, id: PointId) -> Option<usize> {
        self.rows.get(&id).copied()
    }

    /// Point IDs in row order.
    #[must_use]
    pub fn ids(&self) -> &[PointId] {
        &self.ids
    }

    /// Number of rows.
    #[must_use]
    pub fn len(&self) -> usize {
        self.ids.len()
    }

    /// Whether there are no rows.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.ids.is_empty()
    }

    /// Stored column for `field` (flattened when nested).
    #[must_use]
    pub fn column(&self, field: &str) -> Option<&Column> {
        self.field_index(field).map(|i| &self.columns[i])
    }

    pub(crate) fn numeric_column_mut(&mut self, field: &str) -> Option<&mut NumericColumn> {
        let i = self.field_index(field)?;
        self.columns[i].as_numeric_mut()
    }

    /// Cumulative end offsets of a nested field.
    #[must_use]
    pub fn nested_offsets(&self, field: &str) -> Option<&[i32]> {
        self.field_index(field)
            .and_then(|i| self.offsets[i].as_deref())
    }

    /// Value of `field` for `id`, or `fallback` when the ID is unknown or
    /// the field is neither stored nor computed.
    #[must_use]
    pub fn get(&self, id: PointId, field: &str, fallback: Value) -> Value {
        self.value(id, field).unwrap_or(fallback)
    }

    /// Value of `field` for `id`. Computed fields are evaluated on every
    /// call.
    #[must_use]
    pub fn value(&self, id: PointId, field: &str) -> Option<Value> {
        let row = self.row(id)?;
        match self.field_index(field) {
            Some(i) => Some(self.stored(i, row)),
            None => self.computed.get(field).map(|f| f(id)),
        }
    }

    /// Numeric stored value without building a [`Value`].
    #[must_use]
    pub fn number(&self, id: PointId, field: &str) -> Option<f64> {
        let row = self.row(id)?;
        let i = self.field_index(field)?;
        if self.offsets[i].is_some() {
            return None;
        }
        match &self.columns[i] {
            Column::Numeric(c) => c.get_f64(row),
            Column::Values(v) => v.get(row).and_then(Value::as_f64),
        }
    }

    /// Nested stored list as point IDs. Empty for unknown IDs and
    /// non-nested fields.
    #[must_use]
    pub fn nested_ids(&self, id: PointId, field: &str) -> Vec<PointId> {
        let Some(row) = self.row(id) else {
            return Vec::new();
        };
        let Some(i) = self.field_index(field) else {
            return Vec::new();
        };
        let Some(ends) = &self.offsets[i] else {
            return Vec::new();
        };
        let (start, end) = span(ends, row);
        let column = &self.columns[i];
        (start..end)
            .filter_map(|j| column.value(j).as_f64())
            .map(|n| n as PointId)
            .collect()
    }

    /// Full row including computed fields; `None` for unknown IDs.
    #[must_use]
    pub fn by_id(&self, id: PointId) -> Option<Value> {
        let row = self.row(id)?;
        let mut record: BTreeMap<String, Value> = self
            .schema
            .fields()
            .iter()
            .enumerate()
            .map(|(i, f)| (f.name().to_owned(), self.stored(i, row)))
            .collect();
        for (name, f) in &self.computed {
            let _ = record.insert(name.clone(), f(id));
        }
        Some(Value::Record(record))
    }

    /// Visit every row in order.
    pub fn for_each(&self, mut f: impl FnMut(PointId, Value)) {
        for &id in &self.ids {
            if let Some(row) = self.by_id(id) {
                f(id, row);
            }
        }
    }

    /// Map every row in order.
    pub fn map<T>(&self, mut f: impl FnMut(PointId, Value) -> T) -> Vec<T> {
        self.ids
            .iter()
            .filter_map(|&id| self.by_id(id).map(|row| f(id, row)))
            .collect()
    }

    /// Register a virtual field evaluated per read.
    ///
    /// # Errors
    ///
    /// [`FramescopeError::Schema`] if `name` is a stored column.
    pub fn set_computed_field(
        &mut self,
        name: &str,
        f: impl Fn(PointId) -> Value + 'static,
    ) -> Result<()> {
        if self.schema.contains(name) {
            return Err(FramescopeError::Schema(format!(
                "computed field '{name}' would shadow a stored column"
            )));
        }
        let _ = self.computed.insert(name.to_owned(), Rc::new(f));
        Ok(())
    }

    /// Drop a virtual field. Returns whether it existed.
    pub fn remove_computed_field(&mut self, name: &str) -> bool {
        self.computed.remove(name).is_some()
    }

    /// Whether `name` is a registered virtual field.
    #[must_use]
    pub fn has_computed_field(&self, name: &str) -> bool {
        self.computed.contains_key(name)
    }

    /// Serve `field` from `other_field` (default: same name) of `data`'s
    /// row with the same ID.
    ///
    /// # Errors
    ///
    /// [`FramescopeError::Schema`] if `field` is a stored column.
    pub fn link_field(
        &mut self,
        field: &str,
        data: &SharedData,
        other_field: Option<&str>,
    ) -> Result<()> {
        let data = Rc::clone(data);
        let source = other_field.unwrap_or(field).to_owned();
        self.set_computed_field(field, move |id| {
            data.borrow().get(id, &source, Value::Null)
        })
    }

    /// Serve `field` as the whole row of `data` with the same ID.
    ///
    /// # Errors
    ///
    /// [`FramescopeError::Schema`] if `field` is a stored column.
    pub fn link_data(&mut self, field: &str, data: &SharedData) -> Result<()> {
        let data = Rc::clone(data);
        self.set_computed_field(field, move |id| {
            data.borrow().by_id(id).unwrap_or_default()
        })
    }

    /// Encode into the compressed JSON form.
    ///
    /// # Errors
    ///
    /// Serialization failures of generic-value columns.
    pub fn to_compressed(&self) -> Result<serde_json::Value> {
        super::compressed::encode(self)
    }

    pub(crate) fn columns(&self) -> impl Iterator<Item = (&FieldSpec, &Column, Option<&[i32]>)> {
        self.schema
            .fields()
            .iter()
            .zip(&self.columns)
            .zip(&self.offsets)
            .map(|((f, c), o)| (f, c, o.as_deref()))
    }

    fn field_index(&self, field: &str) -> Option<usize> {
        self.schema.fields().iter().position(|f| f.name() == field)
    }

    fn stored(&self, i: usize, row: usize) -> Value {
        let column = &self.columns[i];
        match &self.offsets[i] {
            Some(ends) => {
                let (start, end) = span(ends, row);
                column.slice(start..end)
            }
            None => column.value(row),
        }
    }
}

impl fmt::Debug for ColumnarData {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut computed: Vec<&String> = self.computed.keys().collect();
        computed.sort();
        f.debug_struct("ColumnarData")
            .field("schema", &self.schema)
            .field("len", &self.ids.len())
            .field("computed", &computed)
            .finish_non_exhaustive()
    }
}

/// Parse a record key into a point ID.
///
/// # Errors
///
/// [`FramescopeError::FrameFormat`] for non-integer keys.
pub fn parse_id(key: &str) -> Result<PointId> {
    key.trim()
        .parse()
        .map_err(|_| FramescopeError::FrameFormat(format!("point ID '{key}' is not an integer")))
}

fn span(ends: &[i32], row: usize) -> (usize, usize) {
    let start = if row == 0 { 0 } else { ends[row - 1].max(0) as usize };
    let end = ends[row].max(0) as usize;
    (start, end.max(start))
}

fn clamp_offsets(name: &str, ends: &mut [i32], flat_len: usize) {
    let limit = flat_len as i32;
    let mut prev = 0;
    let mut adjusted = false;
    for end in ends.iter_mut() {
        let clamped = (*end).clamp(prev, limit);
        adjusted |= clamped != *end;
        *end = clamped;
        prev = clamped;
    }
    if ends.last().is_some_and(|&last| last != limit) {
        adjusted = true;
    }
    if adjusted {
        log::warn!(
            "nested field '{name}': offsets do not match {flat_len} flattened values; clamped"
        );
    }
}

fn empty_column(field: &FieldSpec, len: usize) -> Column {
    match field.kind() {
        FieldKind::Numeric(ty) => Column::Numeric(NumericColumn::zeros(ty, len)),
        FieldKind::Values => Column::Values(vec![Value::Null; len]),
    }
}

fn column_from_values(field: &FieldSpec, values: Vec<Value>) -> Column {
    match field.kind() {
        FieldKind::Numeric(ty) => {
            let numbers: Vec<f64> = values.iter().map(numeric_cell).collect();
            Column::Numeric(NumericColumn::from_f64s(ty, &numbers))
        }
        FieldKind::Values => Column::Values(values),
    }
}

fn numeric_cell(value: &Value) -> f64 {
    match value {
        Value::Number(n) => *n,
        Value::Bool(b) => f64::from(u8::from(*b)),
        Value::Text(s) => s.trim().parse().unwrap_or(f64::NAN),
        _ => f64::NAN,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::schema::NumericType;

    fn schema() -> Schema {
        Schema::new(vec![
            FieldSpec::numeric("x", NumericType::F32),
            FieldSpec::values("color"),
            FieldSpec::numeric("neighbors", NumericType::I32)
                .nested()
                .from_field("highlight"),
        ])
    }

    fn record(x: f64, color: &str, highlight: &[i64]) -> Value {
        let json = serde_json::json!({ "x": x, "color": color, "highlight": highlight });
        serde_json::from_value(json).unwrap()
    }

    fn table() -> ColumnarData {
        ColumnarData::from_records(
            schema(),
            vec![
                (7, record(3.0, "blue", &[1])),
                (1, record(1.0, "red", &[7, 3])),
                (3, record(2.0, "green", &[])),
            ],
        )
        .unwrap()
    }

    #[test]
    fn rows_follow_ascending_ids() {
        let data = table();
        assert_eq!(data.ids(), &[1, 3, 7]);
        assert_eq!(data.nested_offsets("neighbors"), Some(&[2, 2, 3][..]));
        assert_eq!(data.number(3, "x"), Some(2.0));
    }

    #[test]
    fn get_falls_back_for_unknown_ids_and_fields() {
        let data = table();
        assert_eq!(data.get(1, "color", Value::Null), Value::from("red"));
        assert_eq!(data.get(99, "color", Value::from("none")), Value::from("none"));
        assert_eq!(data.get(1, "nope", Value::from(-1.0)), Value::from(-1.0));
        assert_eq!(
            data.get(1, "neighbors", Value::Null),
            Value::List(vec![Value::from(7.0), Value::from(3.0)])
        );
        assert_eq!(data.nested_ids(7, "neighbors"), vec![1]);
        assert!(data.nested_ids(3, "neighbors").is_empty());
    }

    #[test]
    fn computed_fields_are_evaluated_and_cannot_shadow_columns() {
        let mut data = table();
        data.set_computed_field("double", |id| Value::from(id as f64 * 2.0))
            .unwrap();
        assert_eq!(data.get(3, "double", Value::Null), Value::from(6.0));
        assert_eq!(data.by_id(7).unwrap().field("double"), Some(&Value::from(14.0)));
        assert!(data.set_computed_field("x", |_| Value::Null).is_err());
        assert!(data.remove_computed_field("double"));
        assert_eq!(data.get(3, "double", Value::Null), Value::Null);
    }

    #[test]
    fn links_reread_the_target_on_every_access() {
        let labels = Rc::new(RefCell::new(
            ColumnarData::from_records(
                Schema::new(vec![FieldSpec::values("text")]),
                vec![(1, serde_json::from_str(r#"{"text": "one"}"#).unwrap())],
            )
            .unwrap(),
        ));
        let mut data = table();
        data.link_field("name", &labels, Some("text")).unwrap();
        data.link_data("label", &labels).unwrap();
        assert_eq!(data.get(1, "name", Value::Null), Value::from("one"));
        assert_eq!(
            data.get(1, "label", Value::Null).field("text"),
            Some(&Value::from("one"))
        );

        labels
            .borrow_mut()
            .set_computed_field("extra", |_| Value::from(true))
            .unwrap();
        assert_eq!(
            data.get(1, "label", Value::Null).field("extra"),
            Some(&Value::Bool(true))
        );
        assert_eq!(data.get(3, "name", Value::Null), Value::Null);
    }

    #[test]
    fn json_objects_parse_string_keys() {
        let json = serde_json::json!({
            "10": { "x": 1.5, "color": 2, "highlight": [] },
            "2": { "x": 0.5, "color": 1, "highlight": [10] },
        });
        let data = ColumnarData::from_json(schema(), &json).unwrap();
        assert_eq!(data.ids(), &[2, 10]);
        assert!(ColumnarData::from_json(schema(), &serde_json::json!({ "a": {} })).is_err());
    }

    #[test]
    fn offsets_are_clamped_on_assembly() {
        let schema = Schema::new(vec![FieldSpec::numeric("n", NumericType::I32).nested()]);
        let data = ColumnarData::from_parts(
            schema,
            vec![1, 2],
            vec![Column::Numeric(NumericColumn::I32(vec![5, 6, 7]))],
            vec![Some(vec![2, 9])],
        )
        .unwrap();
        assert_eq!(data.nested_offsets("n"), Some(&[2, 3][..]));
        assert_eq!(data.nested_ids(2, "n"), vec![7]);
    }
}
