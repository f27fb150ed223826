//! Per-vertex colour resolution.
//!
//! Priority per vertex: explicit packed colours beat a colour-mapped
//! value, which beats integer-typed raw values, which beat the object's
//! base colour. Shorter attribute arrays are resampled across the
//! vertex range; the final alpha is scaled by object opacity.

use glam::Vec3;
use scenejson::{Colour, ColourMap, Geometry, Palette, PALETTE_SIZE};

const MAX_INDEX: usize = PALETTE_SIZE - 1;

pub struct ColourLookup<'a> {
    geom: &'a Geometry,
    palette: Option<&'a Palette>,
    logscale: bool,
    min: f32,
    max: f32,
    base: u32,
    opacity: f32,
}

impl<'a> ColourLookup<'a> {
    pub fn new(
        geom: &'a Geometry,
        map: Option<(&'a ColourMap, &'a Palette)>,
        base: Colour,
        opacity: f32,
    ) -> Self {
        let mut min = geom.values_min;
        let mut max = geom.values_max;
        let (palette, logscale) = match map {
            Some((cmap, palette)) => {
                // A well-formed map range overrides the data range
                if let Some(range) = cmap.range {
                    if range[0] < range[1] {
                        min = range[0] as f32;
                        max = range[1] as f32;
                    }
                }
                (Some(palette), cmap.logscale)
            }
            None => (None, false),
        };
        Self {
            geom,
            palette,
            logscale,
            min,
            max,
            base: base.to_packed(),
            opacity,
        }
    }

    /// Packed RGBA for one vertex.
    pub fn colour(&self, vertex: usize) -> u32 {
        let vcount = self.geom.vertex_count();
        let mut colour = self.base;

        if let (Some(palette), Some(values)) = (self.palette, self.geom.values.as_ref()) {
            if !values.is_empty() {
                let idx = resample(vertex, vcount, values.len());
                colour = palette.lookup(self.value_index(values[idx]));
            }
        } else if let Some(packed) = self.geom.values_packed.as_ref() {
            // Integer-typed values are already packed colours
            if !packed.is_empty() {
                colour = packed[resample(vertex, vcount, packed.len())];
            }
        }

        if let Some(colours) = self.geom.colours.as_ref() {
            if !colours.is_empty() {
                colour = colours[resample(vertex, vcount, colours.len())];
            }
        }

        if self.opacity < 1.0 {
            let mut c = Colour::from_packed(colour);
            c.alpha *= self.opacity;
            colour = c.to_packed();
        }
        colour
    }

    /// Palette index for a scalar. Out-of-range values clamp to the
    /// lookup-table ends; non-finite values land mid-table.
    fn value_index(&self, value: f32) -> usize {
        if !value.is_finite() {
            return MAX_INDEX / 2;
        }
        if value <= self.min {
            return 0;
        }
        if value >= self.max {
            return MAX_INDEX;
        }
        let (v, lo, hi) = if self.logscale {
            (safe_log10(value), safe_log10(self.min), safe_log10(self.max))
        } else {
            (value, self.min, self.max)
        };
        let scaled = (v - lo) / (hi - lo);
        (MAX_INDEX as f32 * scaled).round() as usize
    }
}

/// log10 guarded against zero and denormals.
fn safe_log10(value: f32) -> f32 {
    value.max(f32::MIN_POSITIVE).log10()
}

/// Maps a vertex index into a shorter attribute array, clamped to the
/// last entry.
fn resample(vertex: usize, vertex_count: usize, len: usize) -> usize {
    let colrange = vertex_count as f32 / len as f32;
    let idx = (vertex as f32 / colrange) as usize;
    idx.min(len - 1)
}

/// Centroid of each triangle, for the depth sort. Cross-section blocks
/// get an empty list; their quads always draw last.
pub fn triangle_centroids(geom: &Geometry) -> Vec<[f32; 3]> {
    if geom.is_cross_section() {
        return Vec::new();
    }
    let verts = &geom.vertices;
    geom.indices
        .chunks_exact(3)
        .map(|tri| {
            let sum: Vec3 = tri
                .iter()
                .map(|&i| {
                    let i3 = i as usize * 3;
                    Vec3::new(verts[i3], verts[i3 + 1], verts[i3 + 2])
                })
                .sum();
            (sum / 3.0).into()
        })
        .collect()
}
