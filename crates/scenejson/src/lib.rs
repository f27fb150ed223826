//! Scene JSON: the viewer's scene exchange format.
//!
//! A scene document is a single JSON object with these top-level keys:
//!   objects    : array of drawable objects (index = implicit object id)
//!   colourmaps : array of colour maps (control points + range + logscale)
//!   views      : array of views; view 0 is the canonical camera/bbox
//!   properties : global display properties (opacity, clip planes, ...)
//!   exported   : bool, payload is an incremental state sync, not a model
//!   reload     : bool, exported payload also requires a geometry reload
//!
//! Each object owns geometry blocks keyed by family (`points`, `triangles`,
//! `lines`, `volume`). A block attribute is `{ "data": <array|string>,
//! "minimum"?, "maximum"? }` where a string datum is a base64 blob of
//! little-endian f32 (u32 for `colours`/`indices`) and an array datum is a
//! literal number list.
//!
//! Decoding is per-object recoverable: a malformed block drops that
//! object's geometry and logs it, the rest of the scene still loads.

pub mod colour;
pub mod decode;
pub mod merge;
pub mod model;

pub use colour::{Colour, ColourMap, ControlPoint, Palette, PALETTE_SIZE};
pub use decode::Geometry;
pub use model::{Attrib, AttribData, Family, GeometryBlock, Properties, Scene, SceneObject, View};

use thiserror::Error;

/// Errors that abort a whole scene load. The previous scene should be
/// kept when one of these is returned.
#[derive(Debug, Error)]
pub enum LoadError {
    #[error("scene JSON parse failed: {0}")]
    Parse(#[from] serde_json::Error),
    #[error("exported state received but no scene is loaded")]
    NoScene,
}

/// Errors local to one geometry block of one object. The object's
/// contribution is skipped, remaining objects still load.
#[derive(Debug, Error)]
pub enum DecodeError {
    #[error("base64 decode failed: {0}")]
    Base64(#[from] base64::DecodeError),
    #[error("binary blob length {0} is not a multiple of 4")]
    Truncated(usize),
    #[error("{attr} length {got} inconsistent with {expect} vertices")]
    LengthMismatch {
        attr: &'static str,
        got: usize,
        expect: usize,
    },
    #[error("index {index} out of range for {vertices} vertices")]
    IndexRange { index: u32, vertices: usize },
    #[error("geometry block has no vertices")]
    NoVertices,
    #[error("triangle grid block missing width/height and indices")]
    NoGridDims,
}
