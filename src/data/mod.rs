//! Columnar point data: typed columns, the compressed wire form, and
//! 2D frames with spatial queries.

pub mod affine;
pub mod column;
pub mod columnar;
pub mod compressed;
pub mod frame;
pub mod schema;

pub use affine::AffineMatrix;
pub use column::{Column, NumericColumn, Scalar};
pub use columnar::{parse_id, ColumnarData, ComputedFn, SharedData};
pub use compressed::{DecodePath, COMPRESSED_FORMAT};
pub use frame::{frame_schema, ColumnarFrame};
pub use schema::{FieldKind, FieldSpec, NumericType, Schema};
