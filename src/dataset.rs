//! A set of frames over one point population, with frame alignment,
//! preview selection and thumbnail metadata.

use std::cell::{OnceCell, RefCell};
use std::collections::BTreeMap;
use std::rc::Rc;

use rustc_hash::{FxHashMap, FxHashSet};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

use crate::data::{
    frame_schema, parse_id, AffineMatrix, ColumnarData, ColumnarFrame, FieldSpec, Schema,
    SharedData,
};
use crate::error::{FramescopeError, Result};
use crate::marks::PointId;
use crate::options::PreviewOptions;
use crate::preview::{
    FramePreview, NeighborPreview, NoPreview, PrecomputedPreview, PreviewComponent,
    ProjectionPreview,
};
use crate::value::Value;

/// Color key meaning "every point gets color 0".
pub const CONSTANT_COLOR: &str = "constant";
/// Field that thumbnail rows are linked under on every frame.
pub const LABEL_FIELD: &str = "label";

/// Which strategy scores previews.
#[derive(
    Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash, Default, JsonSchema,
)]
pub enum PreviewMode {
    /// Compare 2D neighbors in each frame.
    #[default]
    #[serde(rename = "projectionNeighborSimilarity", alias = "projection_similarity")]
    ProjectionSimilarity,
    /// Compare the high-dimensional neighbors attached to each frame.
    #[serde(rename = "neighborSimilarity", alias = "neighbor_similarity")]
    NeighborSimilarity,
    /// Use externally computed components.
    #[serde(rename = "precomputed")]
    Precomputed,
}

/// Range of the color column across all frames.
#[derive(Debug, Clone, PartialEq)]
pub enum ColorExtent {
    /// `(min, max)` over numeric colors.
    Continuous(f64, f64),
    /// Distinct color values, sorted by their text form.
    Categorical(Vec<Value>),
}

type PreviewTable = FxHashMap<(usize, usize), Vec<PreviewComponent>>;

/// Frames of one point population.
#[derive(Debug)]
pub struct Dataset {
    frames: Vec<ColumnarFrame>,
    frame_labels: Vec<String>,
    transforms: Vec<AffineMatrix>,
    color_key: String,
    ids: Vec<PointId>,
    previews: Option<PreviewTable>,
    preview_mode: PreviewMode,
    preview_parameters: FxHashMap<String, f64>,
    shuffle_seed: Option<u64>,
    x_extent: OnceCell<(f64, f64)>,
    y_extent: OnceCell<(f64, f64)>,
    preview_cache: RefCell<FxHashMap<(usize, usize), Rc<FramePreview>>>,
    thumbnails: Option<SharedData>,
    spritesheets: Option<serde_json::Value>,
}

impl Dataset {
    /// Parse a dataset. Accepts either an array of frames or an object
    /// `{data, previews?, frameLabels?, previewMode?}`. Each frame is an
    /// object keyed by point ID, or a table in compressed form.
    ///
    /// `color_key` names the record key read as each point's color;
    /// [`CONSTANT_COLOR`] gives every point color 0.
    ///
    /// # Errors
    ///
    /// [`FramescopeError::FrameFormat`] when the shape is wrong, plus
    /// decode errors of compressed frames.
    pub fn from_json(raw: &serde_json::Value, color_key: &str) -> Result<Self> {
        let (frame_source, labels, previews, mode) = match raw {
            serde_json::Value::Array(frames) => (frames.as_slice(), None, None, None),
            serde_json::Value::Object(obj) => {
                let frames = obj
                    .get("data")
                    .and_then(serde_json::Value::as_array)
                    .ok_or_else(|| {
                        FramescopeError::FrameFormat("dataset has no 'data' array".to_owned())
                    })?;
                let labels = obj
                    .get("frameLabels")
                    .map(|l| serde_json::from_value::<Vec<String>>(l.clone()))
                    .transpose()?;
                let previews = obj
                    .get("previews")
                    .filter(|p| !p.is_null())
                    .map(parse_previews)
                    .transpose()?;
                let mode = obj
                    .get("previewMode")
                    .filter(|m| !m.is_null())
                    .map(|m| serde_json::from_value::<PreviewMode>(m.clone()))
                    .transpose()?;
                (frames.as_slice(), labels, previews, mode)
            }
            _ => {
                return Err(FramescopeError::FrameFormat(
                    "dataset must be an array of frames or an object".to_owned(),
                ))
            }
        };

        let frame_labels: Vec<String> = (0..frame_source.len())
            .map(|f| {
                labels
                    .as_ref()
                    .and_then(|l| l.get(f).cloned())
                    .unwrap_or_else(|| format!("Frame {}", f + 1))
            })
            .collect();

        let frames = frame_source
            .iter()
            .zip(&frame_labels)
            .map(|(frame, label)| {
                let data = if crate::data::compressed::is_compressed(frame) {
                    ColumnarData::from_json(frame_schema(), frame)?
                } else {
                    normalized_frame(frame, color_key)?
                };
                Ok(ColumnarFrame::new(data, label.clone()))
            })
            .collect::<Result<Vec<_>>>()?;

        let mut seen = FxHashSet::default();
        let ids = frames
            .iter()
            .flat_map(|f| f.data().ids().iter().copied())
            .filter(|id| seen.insert(*id))
            .collect();

        log::debug!(
            "dataset: {} frames, {} points, color key '{color_key}'",
            frames.len(),
            seen.len()
        );

        Ok(Self {
            transforms: vec![AffineMatrix::IDENTITY; frames.len()],
            frames,
            frame_labels,
            color_key: color_key.to_owned(),
            ids,
            previews,
            preview_mode: mode.unwrap_or_default(),
            preview_parameters: FxHashMap::default(),
            shuffle_seed: None,
            x_extent: OnceCell::new(),
            y_extent: OnceCell::new(),
            preview_cache: RefCell::new(FxHashMap::default()),
            thumbnails: None,
            spritesheets: None,
        })
    }

    /// Parse from JSON text.
    ///
    /// # Errors
    ///
    /// See [`from_json`](Self::from_json).
    pub fn from_json_str(text: &str, color_key: &str) -> Result<Self> {
        let raw: serde_json::Value = serde_json::from_str(text)?;
        Self::from_json(&raw, color_key)
    }

    /// Number of frames.
    #[must_use]
    pub fn frame_count(&self) -> usize {
        self.frames.len()
    }

    /// Number of distinct points across all frames.
    #[must_use]
    pub fn len(&self) -> usize {
        self.ids.len()
    }

    /// Whether no frame has any point.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.ids.is_empty()
    }

    /// Union of point IDs, in first-seen order.
    #[must_use]
    pub fn ids(&self) -> &[PointId] {
        &self.ids
    }

    /// Frame titles.
    #[must_use]
    pub fn frame_labels(&self) -> &[String] {
        &self.frame_labels
    }

    /// Record key colors were read from.
    #[must_use]
    pub fn color_key(&self) -> &str {
        &self.color_key
    }

    /// Frame by number.
    #[must_use]
    pub fn frame(&self, frame: usize) -> Option<&ColumnarFrame> {
        self.frames.get(frame)
    }

    /// All frames.
    #[must_use]
    pub fn frames(&self) -> &[ColumnarFrame] {
        &self.frames
    }

    /// Row of `id` in one frame.
    #[must_use]
    pub fn at_frame(&self, id: PointId, frame: usize) -> Option<Value> {
        self.frames.get(frame)?.data().by_id(id)
    }

    /// `{id, <field>: {<frame>: value}}` over every frame containing `id`.
    #[must_use]
    pub fn by_id(&self, id: PointId) -> Value {
        let mut fields: BTreeMap<String, BTreeMap<String, Value>> = BTreeMap::new();
        for (f, frame) in self.frames.iter().enumerate() {
            let Some(Value::Record(row)) = frame.data().by_id(id) else {
                continue;
            };
            for (name, value) in row {
                let _ = fields.entry(name).or_default().insert(f.to_string(), value);
            }
        }
        let mut record: BTreeMap<String, Value> = fields
            .into_iter()
            .map(|(name, per_frame)| (name, Value::Record(per_frame)))
            .collect();
        let _ = record.insert("id".to_owned(), Value::from(id));
        Value::Record(record)
    }

    /// `(min, max)` of `x` over all frames.
    #[must_use]
    pub fn x_extent(&self) -> (f64, f64) {
        *self.x_extent.get_or_init(|| self.extent("x"))
    }

    /// `(min, max)` of `y` over all frames.
    #[must_use]
    pub fn y_extent(&self) -> (f64, f64) {
        *self.y_extent.get_or_init(|| self.extent("y"))
    }

    fn extent(&self, field: &str) -> (f64, f64) {
        self.frames
            .iter()
            .flat_map(|f| {
                f.data()
                    .column(field)
                    .and_then(|c| c.as_numeric())
                    .map(crate::data::NumericColumn::to_f64_vec)
                    .unwrap_or_default()
            })
            .filter(|v| v.is_finite())
            .fold((f64::INFINITY, f64::NEG_INFINITY), |(lo, hi), v| {
                (lo.min(v), hi.max(v))
            })
    }

    /// Range of colors across all frames.
    #[must_use]
    pub fn color_extent(&self, categorical: bool) -> ColorExtent {
        let colors = self.frames.iter().flat_map(|f| {
            f.data()
                .column("color")
                .and_then(|c| c.as_values())
                .unwrap_or_default()
                .iter()
        });
        if categorical {
            let mut keyed: BTreeMap<String, Value> = BTreeMap::new();
            for color in colors {
                let _ = keyed.entry(text_key(color)).or_insert_with(|| color.clone());
            }
            ColorExtent::Categorical(keyed.into_values().collect())
        } else {
            let (lo, hi) = colors
                .filter_map(Value::as_f64)
                .fold((f64::INFINITY, f64::NEG_INFINITY), |(lo, hi), v| {
                    (lo.min(v), hi.max(v))
                });
            ColorExtent::Continuous(lo, hi)
        }
    }

    /// Whether precomputed preview components were supplied.
    #[must_use]
    pub fn has_previews(&self) -> bool {
        self.previews.is_some()
    }

    /// Current preview strategy.
    #[must_use]
    pub fn preview_mode(&self) -> PreviewMode {
        self.preview_mode
    }

    /// Switch preview strategy.
    pub fn set_preview_mode(&mut self, mode: PreviewMode) {
        if mode != self.preview_mode {
            self.preview_mode = mode;
            self.preview_cache.get_mut().clear();
        }
    }

    /// Override a preview parameter (`k`, `similarityThreshold`).
    pub fn set_preview_parameter(&mut self, name: &str, value: f64) {
        let _ = self.preview_parameters.insert(name.to_owned(), value);
        self.preview_cache.get_mut().clear();
    }

    /// Preview parameter, falling back to `k` = 10 and
    /// `similarityThreshold` = 0.5.
    #[must_use]
    pub fn preview_parameter(&self, name: &str) -> Option<f64> {
        self.preview_parameters
            .get(name)
            .copied()
            .or(match name {
                "k" => Some(10.0),
                "similarityThreshold" => Some(0.5),
                _ => None,
            })
    }

    /// Fix the tie-break shuffle of every future preview.
    pub fn set_shuffle_seed(&mut self, seed: Option<u64>) {
        self.shuffle_seed = seed;
        self.preview_cache.get_mut().clear();
    }

    /// Apply the preview section of the options.
    pub fn apply_preview_options(&mut self, options: &PreviewOptions) {
        self.set_preview_mode(options.mode);
        self.set_preview_parameter("k", options.k as f64);
        self.set_preview_parameter("similarityThreshold", options.similarity_threshold);
        self.set_shuffle_seed(options.shuffle_seed);
    }

    /// Preview from `frame` toward `preview`, computed on first request
    /// and cached until the mode, parameters or transforms change.
    /// `None` when either frame number is out of range.
    #[must_use]
    pub fn preview_info(&self, frame: usize, preview: usize) -> Option<Rc<FramePreview>> {
        if let Some(cached) = self.preview_cache.borrow().get(&(frame, preview)) {
            return Some(Rc::clone(cached));
        }
        let base = self.frames.get(frame)?;
        let target = self.frames.get(preview)?;

        let k = self.preview_parameter("k").unwrap_or(10.0).max(0.0) as usize;
        let threshold = self.preview_parameter("similarityThreshold").unwrap_or(0.5);
        let components = self
            .previews
            .as_ref()
            .and_then(|table| table.get(&(frame, preview)));

        let computed = match (self.preview_mode, components) {
            (PreviewMode::Precomputed, Some(components)) => {
                let (x0, x1) = self.x_extent();
                let (y0, y1) = self.y_extent();
                let scale = ((x1 - x0) + (y1 - y0)) / 2.0;
                let strategy = PrecomputedPreview::new(components.clone(), scale);
                FramePreview::compute(base, target, &strategy)
            }
            (PreviewMode::ProjectionSimilarity, _) => FramePreview::compute(
                base,
                target,
                &ProjectionPreview {
                    k,
                    similarity_threshold: threshold,
                },
            ),
            (PreviewMode::NeighborSimilarity, _) => FramePreview::compute(
                base,
                target,
                &NeighborPreview {
                    k,
                    similarity_threshold: threshold,
                },
            ),
            (PreviewMode::Precomputed, None) => FramePreview::compute(base, target, &NoPreview),
        };
        let computed = Rc::new(match self.shuffle_seed {
            Some(seed) => computed.with_shuffle_seed(seed),
            None => computed,
        });
        let _ = self
            .preview_cache
            .borrow_mut()
            .insert((frame, preview), Rc::clone(&computed));
        Some(computed)
    }

    /// Transforms currently applied to each frame.
    #[must_use]
    pub fn frame_transforms(&self) -> &[AffineMatrix] {
        &self.transforms
    }

    /// Re-align frames so frame `f` ends up under `transforms[f]` relative
    /// to its source coordinates. The previously applied transform is
    /// undone in the same pass. Frames beyond `transforms` keep theirs.
    ///
    /// # Errors
    ///
    /// [`FramescopeError::SingularTransform`] if a previous transform
    /// cannot be inverted; no frame is modified in that case.
    pub fn transform(&mut self, transforms: &[AffineMatrix]) -> Result<()> {
        let steps = transforms
            .iter()
            .zip(&self.transforms)
            .enumerate()
            .map(|(f, (new, old))| {
                old.inverse()
                    .map(|inv| new.compose(&inv))
                    .ok_or(FramescopeError::SingularTransform(f))
            })
            .collect::<Result<Vec<_>>>()?;

        for ((frame, step), (current, new)) in self
            .frames
            .iter_mut()
            .zip(&steps)
            .zip(self.transforms.iter_mut().zip(transforms))
        {
            frame.transform(step);
            *current = *new;
        }

        self.x_extent = OnceCell::new();
        self.y_extent = OnceCell::new();
        self.preview_cache.get_mut().clear();
        Ok(())
    }

    /// Attach thumbnail metadata (`{items?, spritesheets?}`) and link it
    /// as the [`LABEL_FIELD`] of every frame.
    ///
    /// # Errors
    ///
    /// [`FramescopeError::FrameFormat`] for non-integer item keys.
    pub fn add_thumbnails(&mut self, thumbnails: &serde_json::Value) -> Result<()> {
        if thumbnails.is_null() {
            return Ok(());
        }

        let mut rows: BTreeMap<PointId, BTreeMap<String, Value>> = BTreeMap::new();
        if let Some(items) = thumbnails.get("items").and_then(serde_json::Value::as_object) {
            for (key, item) in items {
                let row = rows.entry(parse_id(key)?).or_default();
                let _ = row.insert("text".to_owned(), json_field(item, "name"));
                let _ = row.insert("description".to_owned(), json_field(item, "description"));
            }
        }

        let sheets = thumbnails
            .get("spritesheets")
            .and_then(serde_json::Value::as_object);
        let mut schema = Schema::default();
        if let Some(sheets) = sheets {
            for (sheet, spec) in sheets {
                let textures = spec
                    .pointer("/spec/frames")
                    .and_then(serde_json::Value::as_object);
                for key in textures.into_iter().flat_map(|t| t.keys()) {
                    let row = rows.entry(parse_id(key)?).or_default();
                    let _ = row.insert("sheet".to_owned(), Value::from(sheet.as_str()));
                    let _ = row.insert("texture".to_owned(), Value::from(key.as_str()));
                }
            }
            schema = schema
                .with(FieldSpec::values("sheet"))
                .with(FieldSpec::values("texture"));
        }
        schema = schema
            .with(FieldSpec::values("text"))
            .with(FieldSpec::values("description"));

        let data = ColumnarData::from_records(
            schema,
            rows.into_iter().map(|(id, row)| (id, Value::Record(row))),
        )?;
        let shared: SharedData = Rc::new(RefCell::new(data));
        for frame in &mut self.frames {
            frame.data_mut().link_data(LABEL_FIELD, &shared)?;
        }
        self.spritesheets = sheets.map(|s| serde_json::Value::Object(s.clone()));
        self.thumbnails = Some(shared);
        Ok(())
    }

    /// Drop thumbnail metadata and unlink it from every frame.
    pub fn remove_thumbnails(&mut self) {
        self.thumbnails = None;
        self.spritesheets = None;
        for frame in &mut self.frames {
            let _ = frame.data_mut().remove_computed_field(LABEL_FIELD);
        }
    }

    /// Thumbnail table, if attached.
    #[must_use]
    pub fn thumbnails(&self) -> Option<&SharedData> {
        self.thumbnails.as_ref()
    }

    /// Raw spritesheet descriptions, if attached.
    #[must_use]
    pub fn spritesheets(&self) -> Option<&serde_json::Value> {
        self.spritesheets.as_ref()
    }

    /// Encode one frame in the compressed format.
    ///
    /// # Errors
    ///
    /// Serialization failures; [`FramescopeError::FrameFormat`] for an
    /// unknown frame.
    pub fn compressed_frame(&self, frame: usize) -> Result<serde_json::Value> {
        let frame = self.frames.get(frame).ok_or_else(|| {
            FramescopeError::FrameFormat(format!("no frame {frame}"))
        })?;
        frame.data().to_compressed()
    }
}

/// Turn a raw `{id: record}` frame into the frame layout.
fn normalized_frame(frame: &serde_json::Value, color_key: &str) -> Result<ColumnarData> {
    let points = frame.as_object().ok_or_else(|| {
        FramescopeError::FrameFormat("frame must be an object keyed by point ID".to_owned())
    })?;
    let records = points
        .iter()
        .map(|(key, raw)| {
            let id = parse_id(key)?;
            Ok((id, normalized_point(raw, color_key)))
        })
        .collect::<Result<Vec<_>>>()?;
    ColumnarData::from_records(frame_schema(), records)
}

fn normalized_point(raw: &serde_json::Value, color_key: &str) -> Value {
    let number = |key: &str| raw.get(key).and_then(serde_json::Value::as_f64);
    let color = if color_key == CONSTANT_COLOR {
        Value::from(0.0)
    } else {
        match raw.get(color_key) {
            Some(serde_json::Value::Number(n)) if n.as_f64() != Some(0.0) => {
                Value::Number(n.as_f64().unwrap_or(0.0))
            }
            Some(serde_json::Value::String(s)) if !s.is_empty() => Value::from(s.as_str()),
            _ => Value::from(0.0),
        }
    };
    let highlight: Vec<Value> = raw
        .get("highlight")
        .and_then(serde_json::Value::as_array)
        .map(|items| {
            items
                .iter()
                .filter_map(|h| match h {
                    serde_json::Value::Number(n) => n.as_i64(),
                    serde_json::Value::String(s) => s.trim().parse().ok(),
                    _ => None,
                })
                .map(Value::from)
                .collect()
        })
        .unwrap_or_default();

    let record: BTreeMap<String, Value> = [
        ("x", Value::from(number("x").unwrap_or(f64::NAN))),
        ("y", Value::from(number("y").unwrap_or(f64::NAN))),
        ("color", color),
        ("alpha", Value::from(number("alpha").unwrap_or(1.0))),
        ("highlight", Value::List(highlight)),
        ("r", Value::from(1.0)),
        ("visible", Value::from(true)),
    ]
    .into_iter()
    .map(|(k, v)| (k.to_owned(), v))
    .collect();
    Value::Record(record)
}

fn parse_previews(raw: &serde_json::Value) -> Result<PreviewTable> {
    let mut table = PreviewTable::default();
    for (frame, row) in indexed_entries(raw)? {
        for (preview, components) in indexed_entries(row)? {
            if components.is_null() {
                continue;
            }
            let components: Vec<PreviewComponent> = serde_json::from_value(components.clone())?;
            let _ = table.insert((frame, preview), components);
        }
    }
    Ok(table)
}

/// Entries of an array, or of an object keyed by frame number.
fn indexed_entries(raw: &serde_json::Value) -> Result<Vec<(usize, &serde_json::Value)>> {
    match raw {
        serde_json::Value::Array(items) => Ok(items.iter().enumerate().collect()),
        serde_json::Value::Object(map) => map
            .iter()
            .map(|(k, v)| {
                k.parse::<usize>().map(|i| (i, v)).map_err(|_| {
                    FramescopeError::FrameFormat(format!("preview key '{k}' is not a frame number"))
                })
            })
            .collect(),
        _ => Err(FramescopeError::FrameFormat(
            "previews must be indexed by frame".to_owned(),
        )),
    }
}

fn json_field(item: &serde_json::Value, key: &str) -> Value {
    item.get(key)
        .cloned()
        .and_then(|v| serde_json::from_value(v).ok())
        .unwrap_or_default()
}

fn text_key(value: &Value) -> String {
    match value {
        Value::Text(s) => s.clone(),
        Value::Number(n) => n.to_string(),
        other => serde_json::to_string(other).unwrap_or_default(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn raw() -> serde_json::Value {
        json!({
            "data": [
                {
                    "1": { "x": 0.0, "y": 0.0, "label": 2, "highlight": ["2"] },
                    "2": { "x": 4.0, "y": 2.0, "label": 5, "alpha": 0.5, "highlight": ["1"] },
                },
                {
                    "2": { "x": -2.0, "y": 8.0, "label": 3, "highlight": [] },
                    "3": { "x": 1.0, "y": 1.0, "label": 0, "highlight": ["2"] },
                },
            ],
            "frameLabels": ["before", "after"],
            "previewMode": "precomputed",
            "previews": {
                "0": { "1": [ { "component": [2], "distance": 0.8 } ] },
            },
        })
    }

    fn dataset() -> Dataset {
        Dataset::from_json(&raw(), "label").unwrap()
    }

    #[test]
    fn parses_frames_labels_and_id_union() {
        let d = dataset();
        assert_eq!(d.frame_count(), 2);
        assert_eq!(d.frame_labels(), &["before", "after"]);
        assert_eq!(d.frame(1).unwrap().title(), "after");
        assert_eq!(d.ids(), &[1, 2, 3]);
        assert_eq!(d.preview_mode(), PreviewMode::Precomputed);
        assert!(d.has_previews());
    }

    #[test]
    fn legacy_arrays_get_default_labels() {
        let legacy = json!([{ "5": { "x": 1, "y": 2, "highlight": [] } }]);
        let d = Dataset::from_json(&legacy, CONSTANT_COLOR).unwrap();
        assert_eq!(d.frame_labels(), &["Frame 1"]);
        assert_eq!(d.preview_mode(), PreviewMode::ProjectionSimilarity);
        let row = d.at_frame(5, 0).unwrap();
        assert_eq!(row.field("color"), Some(&Value::from(0.0)));
        assert_eq!(row.field("alpha"), Some(&Value::from(1.0)));
        assert_eq!(row.field("visible"), Some(&Value::from(true)));
    }

    #[test]
    fn records_are_normalized() {
        let d = dataset();
        let row = d.at_frame(2, 0).unwrap();
        assert_eq!(row.field("color"), Some(&Value::from(5.0)));
        assert_eq!(row.field("alpha"), Some(&Value::from(0.5)));
        assert_eq!(row.field("r"), Some(&Value::from(1.0)));
        assert_eq!(
            row.field("highlightIndexes"),
            Some(&Value::List(vec![Value::from(1.0)]))
        );
        // A zero color falls back like a missing one.
        assert_eq!(d.at_frame(3, 1).unwrap().field("color"), Some(&Value::from(0.0)));
    }

    #[test]
    fn by_id_groups_values_by_frame() {
        let d = dataset();
        let row = d.by_id(2);
        assert_eq!(row.field("id"), Some(&Value::from(2_i64)));
        let xs = row.field("x").unwrap();
        assert_eq!(xs.field("0"), Some(&Value::from(4.0)));
        assert_eq!(xs.field("1"), Some(&Value::from(-2.0)));
        assert!(d.by_id(1).field("x").unwrap().field("1").is_none());
    }

    #[test]
    fn extents_span_all_frames() {
        let d = dataset();
        assert_eq!(d.x_extent(), (-2.0, 4.0));
        assert_eq!(d.y_extent(), (0.0, 8.0));
        assert_eq!(d.color_extent(false), ColorExtent::Continuous(0.0, 5.0));
        assert_eq!(
            d.color_extent(true),
            ColorExtent::Categorical(
                [0.0, 2.0, 3.0, 5.0].into_iter().map(Value::from).collect()
            )
        );
    }

    #[test]
    fn preview_parameters_default_and_override() {
        let mut d = dataset();
        assert_eq!(d.preview_parameter("k"), Some(10.0));
        assert_eq!(d.preview_parameter("similarityThreshold"), Some(0.5));
        assert_eq!(d.preview_parameter("other"), None);
        d.set_preview_parameter("k", 3.0);
        assert_eq!(d.preview_parameter("k"), Some(3.0));
    }

    #[test]
    fn precomputed_previews_need_data_for_the_pair() {
        let d = dataset();
        let preview = d.preview_info(0, 1).unwrap();
        let hit = preview.get(2);
        assert!((hit.line_alpha - 0.8).abs() < 1e-6);
        // scale = mean of x and y extent widths = (6 + 8) / 2 = 7.
        let moved = 6.0_f64.hypot(6.0);
        assert!((hit.line_width - 10.0 * (moved / 7.0 + 0.2)).abs() < 1e-4);
        assert!(Rc::ptr_eq(&preview, &d.preview_info(0, 1).unwrap()));

        let reverse = d.preview_info(1, 0).unwrap();
        assert_eq!(reverse.get(2), crate::preview::Intensity::ZERO);
        assert!(d.preview_info(0, 9).is_none());
    }

    #[test]
    fn transform_replaces_the_previous_alignment() {
        let mut d = dataset();
        let shift = AffineMatrix::scale_translate(1.0, 10.0, 0.0);
        d.transform(&[shift]).unwrap();
        assert_eq!(d.frame(0).unwrap().position(2), Some((14.0, 2.0)));
        assert_eq!(d.x_extent(), (-2.0, 14.0));

        let double = AffineMatrix::scale_translate(2.0, 0.0, 0.0);
        d.transform(&[double, AffineMatrix::IDENTITY]).unwrap();
        assert_eq!(d.frame(0).unwrap().position(2), Some((8.0, 4.0)));
        assert_eq!(d.frame(1).unwrap().position(2), Some((-2.0, 8.0)));
        assert_eq!(d.frame_transforms()[0], double);

        let flat = AffineMatrix::scale_translate(0.0, 0.0, 0.0);
        d.transform(&[flat]).unwrap();
        assert!(matches!(
            d.transform(&[AffineMatrix::IDENTITY]),
            Err(FramescopeError::SingularTransform(0))
        ));
    }

    #[test]
    fn thumbnails_link_a_label_row() {
        let mut d = dataset();
        d.add_thumbnails(&json!({
            "items": { "1": { "name": "first", "description": "the first" } },
            "spritesheets": {
                "sheet0": { "spec": { "frames": { "2": {} } } },
            },
        }))
        .unwrap();
        let label = d.frame(0).unwrap().data().get(1, LABEL_FIELD, Value::Null);
        assert_eq!(label.field("text"), Some(&Value::from("first")));
        let sprite = d.frame(0).unwrap().data().get(2, LABEL_FIELD, Value::Null);
        assert_eq!(sprite.field("sheet"), Some(&Value::from("sheet0")));
        assert!(d.spritesheets().is_some());

        d.remove_thumbnails();
        assert_eq!(
            d.frame(0).unwrap().data().get(1, LABEL_FIELD, Value::Null),
            Value::Null
        );
        assert!(d.thumbnails().is_none());
    }
}
