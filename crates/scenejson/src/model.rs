//! Serde mirror of the scene JSON document.
//!
//! Unknown keys are carried through `extra` maps so an incremental state
//! merge or an export never drops fields this library does not interpret.

use crate::colour::{Colour, ColourMap};
use crate::decode::Geometry;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// A geometry attribute: the data plus optional cached range.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Attrib {
    pub data: AttribData,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub minimum: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub maximum: Option<f64>,
    /// "integer" marks raw values that are pre-packed colours.
    #[serde(default, rename = "type", skip_serializing_if = "Option::is_none")]
    pub kind: Option<String>,
}

/// The two wire representations of a numeric array. Detected by JSON
/// type: a string is a base64 little-endian blob, anything else is a
/// literal list.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(untagged)]
pub enum AttribData {
    Encoded(String),
    Literal(Vec<f64>),
}

impl Attrib {
    pub fn integer_typed(&self) -> bool {
        self.kind.as_deref() == Some("integer")
    }
}

/// One geometry block of an object. Raw attributes persist for
/// round-tripping; `geom` is filled by [`crate::decode`].
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct GeometryBlock {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub vertices: Option<Attrib>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub normals: Option<Attrib>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub values: Option<Attrib>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub colours: Option<Attrib>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sizes: Option<Attrib>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub texcoords: Option<Attrib>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub indices: Option<Attrib>,
    /// Grid dimensions for surface blocks; also flags cross-sections,
    /// which never depth-sort.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub width: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub height: Option<u32>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,

    #[serde(skip)]
    pub geom: Option<Geometry>,
}

/// A named drawable unit owning zero or more geometry blocks per family.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct SceneObject {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub colour: Option<Colour>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub opacity: Option<f32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub visible: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cullface: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub wireframe: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub pointsize: Option<f32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub pointtype: Option<i32>,
    /// Index into the scene's colourmaps, negative for none.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub colourmap: Option<i64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub min: Option<[f32; 3]>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max: Option<[f32; 3]>,

    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub points: Vec<GeometryBlock>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub triangles: Vec<GeometryBlock>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub lines: Vec<GeometryBlock>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub volume: Vec<GeometryBlock>,

    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl SceneObject {
    pub fn is_visible(&self) -> bool {
        self.visible != Some(false)
    }

    pub fn opacity(&self) -> f32 {
        self.opacity.unwrap_or(1.0)
    }

    pub fn blocks(&self, family: Family) -> &[GeometryBlock] {
        match family {
            Family::Points => &self.points,
            Family::Triangles => &self.triangles,
            Family::Lines => &self.lines,
            Family::Volume => &self.volume,
        }
    }

    pub fn blocks_mut(&mut self, family: Family) -> &mut Vec<GeometryBlock> {
        match family {
            Family::Points => &mut self.points,
            Family::Triangles => &mut self.triangles,
            Family::Lines => &mut self.lines,
            Family::Volume => &mut self.volume,
        }
    }
}

/// The primitive families a geometry block can belong to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Family {
    Points,
    Triangles,
    Lines,
    Volume,
}

impl Family {
    pub const ALL: [Family; 4] = [
        Family::Points,
        Family::Triangles,
        Family::Lines,
        Family::Volume,
    ];

    pub fn key(self) -> &'static str {
        match self {
            Family::Points => "points",
            Family::Triangles => "triangles",
            Family::Lines => "lines",
            Family::Volume => "volume",
        }
    }
}

/// Camera and bounding-box state for one view.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct View {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub min: Option<[f32; 3]>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max: Option<[f32; 3]>,
    /// Euler degrees (3 entries) or a quaternion (4 entries).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub rotate: Option<Vec<f32>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub translate: Option<[f32; 3]>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub focus: Option<[f32; 3]>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub scale: Option<[f32; 3]>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub near: Option<f32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub far: Option<f32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub orientation: Option<f32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub border: Option<i32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub axis: Option<bool>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

/// Global display properties.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct Properties {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub opacity: Option<f32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub brightness: Option<f32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub contrast: Option<f32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub saturation: Option<f32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ambient: Option<f32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub diffuse: Option<f32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub specular: Option<f32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub xmin: Option<f32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub xmax: Option<f32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ymin: Option<f32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ymax: Option<f32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub zmin: Option<f32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub zmax: Option<f32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub scalepoints: Option<f32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub pointtype: Option<i32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub background: Option<Colour>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub resolution: Option<[u32; 2]>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl Properties {
    /// Fractional clip-box bounds, defaulted to the full unit box.
    pub fn clip_fractions(&self) -> ([f32; 3], [f32; 3]) {
        (
            [
                self.xmin.unwrap_or(0.0),
                self.ymin.unwrap_or(0.0),
                self.zmin.unwrap_or(0.0),
            ],
            [
                self.xmax.unwrap_or(1.0),
                self.ymax.unwrap_or(1.0),
                self.zmax.unwrap_or(1.0),
            ],
        )
    }
}

/// The root scene document.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct Scene {
    #[serde(default)]
    pub objects: Vec<SceneObject>,
    #[serde(default)]
    pub colourmaps: Vec<ColourMap>,
    #[serde(default)]
    pub views: Vec<View>,
    #[serde(default)]
    pub properties: Properties,
    #[serde(default, skip_serializing_if = "std::ops::Not::not")]
    pub exported: bool,
    #[serde(default, skip_serializing_if = "std::ops::Not::not")]
    pub reload: bool,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl Scene {
    /// The canonical view, created on demand.
    pub fn view(&mut self) -> &mut View {
        if self.views.is_empty() {
            self.views.push(View::default());
        }
        &mut self.views[0]
    }

    /// World bounding box of the canonical view; falls back to object
    /// bounds when the view does not carry one.
    pub fn bounding_box(&self) -> ([f32; 3], [f32; 3]) {
        if let Some(view) = self.views.first() {
            if let (Some(min), Some(max)) = (view.min, view.max) {
                return (min, max);
            }
        }
        let mut min = [f32::MAX; 3];
        let mut max = [f32::MIN; 3];
        for obj in &self.objects {
            for bound in [obj.min, obj.max].into_iter().flatten() {
                for i in 0..3 {
                    min[i] = min[i].min(bound[i]);
                    max[i] = max[i].max(bound[i]);
                }
            }
        }
        if min[0] > max[0] {
            return ([0.0; 3], [1.0; 3]);
        }
        (min, max)
    }
}
