//! Colour parsing and colour-map palettes.
//!
//! Colours arrive in several JSON spellings: `"#rrggbb"`, `"rgb(r,g,b)"`,
//! `"rgba(r,g,b,a)"`, a packed AABBGGRR integer, or a `[r,g,b,a?]` array.
//! A colour map's control points are baked into a fixed 2048-entry RGBA
//! lookup table so per-vertex mapping is a single indexed read.

use serde::de::Error as _;
use serde::{Deserialize, Deserializer, Serialize, Serializer};

/// Number of entries in a baked palette lookup table.
pub const PALETTE_SIZE: usize = 2048;

/// An RGBA colour. Channels are 0-255, alpha is kept as a real in [0,1]
/// so object opacity can scale it without rounding twice.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Colour {
    pub red: u8,
    pub green: u8,
    pub blue: u8,
    pub alpha: f32,
}

impl Default for Colour {
    fn default() -> Self {
        Colour::from_rgba(255, 255, 255, 1.0)
    }
}

impl Colour {
    pub fn from_rgba(red: u8, green: u8, blue: u8, alpha: f32) -> Self {
        Self {
            red,
            green,
            blue,
            alpha,
        }
    }

    /// Unpacks a little-endian AABBGGRR integer.
    pub fn from_packed(packed: u32) -> Self {
        Self {
            red: (packed & 0xff) as u8,
            green: ((packed >> 8) & 0xff) as u8,
            blue: ((packed >> 16) & 0xff) as u8,
            alpha: ((packed >> 24) & 0xff) as f32 / 255.0,
        }
    }

    /// Packs to the little-endian AABBGGRR integer written into vertex
    /// buffers.
    pub fn to_packed(self) -> u32 {
        let a = (self.alpha.clamp(0.0, 1.0) * 255.0).round() as u32;
        (self.red as u32) | ((self.green as u32) << 8) | ((self.blue as u32) << 16) | (a << 24)
    }

    /// Parses the string forms: `#rrggbb`, `rgb(...)`, `rgba(...)`, or a
    /// bare integer.
    pub fn parse(text: &str) -> Option<Self> {
        let text = text.trim();
        if let Some(hex) = text.strip_prefix('#') {
            if hex.len() < 6 {
                return None;
            }
            let red = u8::from_str_radix(&hex[0..2], 16).ok()?;
            let green = u8::from_str_radix(&hex[2..4], 16).ok()?;
            let blue = u8::from_str_radix(&hex[4..6], 16).ok()?;
            return Some(Self::from_rgba(red, green, blue, 1.0));
        }
        if let Some(body) = text
            .strip_prefix("rgba(")
            .or_else(|| text.strip_prefix("rgb("))
        {
            let body = body.strip_suffix(')')?;
            let mut parts = body.split(',').map(str::trim);
            let red = parts.next()?.parse::<f32>().ok()?;
            let green = parts.next()?.parse::<f32>().ok()?;
            let blue = parts.next()?.parse::<f32>().ok()?;
            // Alpha may be a [0,1] real or a 0-255 byte in old palettes.
            let alpha = match parts.next() {
                Some(a) => {
                    let a = a.parse::<f32>().ok()?;
                    if a > 1.0 {
                        a / 255.0
                    } else {
                        a
                    }
                }
                None => 1.0,
            };
            return Some(Self::from_rgba(
                red.round() as u8,
                green.round() as u8,
                blue.round() as u8,
                alpha.clamp(0.0, 1.0),
            ));
        }
        text.parse::<i64>().ok().map(|v| Self::from_packed(v as u32))
    }

    pub fn html(self) -> String {
        format!(
            "rgba({},{},{},{:.2})",
            self.red, self.green, self.blue, self.alpha
        )
    }

    /// Normalized [0,1] channels for shader uniforms.
    pub fn rgba_f32(self) -> [f32; 4] {
        [
            self.red as f32 / 255.0,
            self.green as f32 / 255.0,
            self.blue as f32 / 255.0,
            self.alpha,
        ]
    }

    fn lerp(self, other: Colour, t: f32) -> Colour {
        let mix = |a: u8, b: u8| (a as f32 + (b as f32 - a as f32) * t).round() as u8;
        Colour {
            red: mix(self.red, other.red),
            green: mix(self.green, other.green),
            blue: mix(self.blue, other.blue),
            alpha: self.alpha + (other.alpha - self.alpha) * t,
        }
    }
}

// Serialized as the rgba(...) string form the original emitted.
impl Serialize for Colour {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.html())
    }
}

impl<'de> Deserialize<'de> for Colour {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        #[derive(Deserialize)]
        #[serde(untagged)]
        enum Repr {
            Text(String),
            Packed(i64),
            Channels(Vec<f64>),
        }
        match Repr::deserialize(deserializer)? {
            Repr::Text(s) => {
                Colour::parse(&s).ok_or_else(|| D::Error::custom(format!("bad colour: {s:?}")))
            }
            Repr::Packed(v) => Ok(Colour::from_packed(v as u32)),
            Repr::Channels(ch) => {
                if ch.len() < 3 {
                    return Err(D::Error::custom("colour array needs 3 components"));
                }
                let (mut r, mut g, mut b) = (ch[0], ch[1], ch[2]);
                // JSON array colours may be [0,1] reals
                if r <= 1.0 && g <= 1.0 && b <= 1.0 {
                    r *= 255.0;
                    g *= 255.0;
                    b *= 255.0;
                }
                let a = ch.get(3).copied().unwrap_or(1.0) as f32;
                Ok(Colour::from_rgba(
                    r.round() as u8,
                    g.round() as u8,
                    b.round() as u8,
                    a.clamp(0.0, 1.0),
                ))
            }
        }
    }
}

/// One colour-map control point at a normalized position in [0,1].
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct ControlPoint {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub position: Option<f32>,
    pub colour: Colour,
}

/// A colour map as found in the scene JSON.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct ColourMap {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(default, deserialize_with = "bool_from_any")]
    pub logscale: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub range: Option<[f64; 2]>,
    #[serde(default)]
    pub colours: Vec<ControlPoint>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub background: Option<Colour>,
}

impl ColourMap {
    /// Bakes this map's control points into a palette. Call again after
    /// any control-point change; the cache is rebuilt whole, never
    /// patched.
    pub fn palette(&self) -> Palette {
        Palette::new(&self.colours, self.background)
    }
}

// logscale appears as 0/1 in scene files but also as a bool.
fn bool_from_any<'de, D: Deserializer<'de>>(deserializer: D) -> Result<bool, D::Error> {
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Repr {
        Flag(bool),
        Num(f64),
    }
    Ok(match Repr::deserialize(deserializer)? {
        Repr::Flag(b) => b,
        Repr::Num(n) => n != 0.0,
    })
}

/// A baked palette: sorted control points plus the lookup cache.
#[derive(Debug, Clone)]
pub struct Palette {
    pub background: Colour,
    pub colours: Vec<(f32, Colour)>,
    cache: Vec<u32>,
}

impl Palette {
    pub fn new(points: &[ControlPoint], background: Option<Colour>) -> Self {
        let mut colours: Vec<(f32, Colour)> = Vec::with_capacity(points.len().max(2));
        let missing = points.iter().any(|p| p.position.is_none());
        for (j, p) in points.iter().enumerate() {
            // Spread control points evenly when any position is absent
            let position = if missing {
                j as f32 / (points.len() - 1).max(1) as f32
            } else {
                p.position.unwrap_or(0.0)
            };
            let mut colour = p.colour;
            colour.alpha = colour.alpha.min(1.0);
            colours.push((position.clamp(0.0, 1.0), colour));
        }
        if colours.is_empty() {
            colours.push((0.0, Colour::from_rgba(0, 0, 0, 1.0)));
            colours.push((1.0, Colour::default()));
        }
        colours.sort_by(|a, b| a.0.total_cmp(&b.0));

        // An all-transparent palette renders nothing; force it opaque
        if colours.iter().all(|(_, c)| c.alpha <= 0.0) {
            for (_, c) in colours.iter_mut() {
                c.alpha = 1.0;
            }
        }

        let cache = bake_cache(&colours);
        Self {
            background: background.unwrap_or(Colour::from_rgba(0, 0, 0, 0.0)),
            colours,
            cache,
        }
    }

    /// Packed RGBA at a cache index. Out-of-range indices clamp to the
    /// table ends.
    #[inline]
    pub fn lookup(&self, index: usize) -> u32 {
        self.cache[index.min(PALETTE_SIZE - 1)]
    }

    /// Control points and background in exportable form.
    pub fn control_points(&self) -> Vec<ControlPoint> {
        self.colours
            .iter()
            .map(|&(position, colour)| ControlPoint {
                position: Some(position),
                colour,
            })
            .collect()
    }
}

fn bake_cache(colours: &[(f32, Colour)]) -> Vec<u32> {
    let mut cache = Vec::with_capacity(PALETTE_SIZE);
    for i in 0..PALETTE_SIZE {
        let pos = i as f32 / (PALETTE_SIZE - 1) as f32;
        cache.push(sample(colours, pos).to_packed());
    }
    cache
}

fn sample(colours: &[(f32, Colour)], pos: f32) -> Colour {
    let first = colours[0];
    let last = colours[colours.len() - 1];
    if pos <= first.0 {
        return first.1;
    }
    if pos >= last.0 {
        return last.1;
    }
    for pair in colours.windows(2) {
        let (p0, c0) = pair[0];
        let (p1, c1) = pair[1];
        if pos <= p1 {
            if p1 <= p0 {
                return c1;
            }
            return c0.lerp(c1, (pos - p0) / (p1 - p0));
        }
    }
    last.1
}

/// The stock colour maps appended after a full load when a scene carries
/// fewer than five of its own.
pub fn default_colour_maps() -> Vec<ColourMap> {
    let map = |name: &str, specs: &[&str]| ColourMap {
        name: Some(name.to_string()),
        logscale: false,
        range: None,
        colours: specs
            .iter()
            .filter_map(|s| Colour::parse(s))
            .map(|colour| ControlPoint {
                position: None,
                colour,
            })
            .collect(),
        background: None,
    };
    vec![
        map("Grayscale", &["rgba(0,0,0,255)", "rgba(255,255,255,1)"]),
        map(
            "Topology",
            &[
                "#66bb33", "#00ff00", "#3333ff", "#00ffff", "#ffff77", "#ff8800", "#ff0000",
                "#000000",
            ],
        ),
        map(
            "Rainbow",
            &[
                "#a020f0", "#0000ff", "#00ff00", "#ffff00", "#ffa500", "#ff0000", "#000000",
            ],
        ),
        map("Heat", &["#000000", "#ff0000", "#ffff00", "#ffffff"]),
        map(
            "Bluered",
            &[
                "#0000ff", "#1e90ff", "#00ced1", "#ffe4c4", "#ffa500", "#b22222",
            ],
        ),
    ]
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_hex_and_rgba() {
        let c = Colour::parse("#ff8800").unwrap();
        assert_eq!((c.red, c.green, c.blue), (255, 136, 0));
        assert_eq!(c.alpha, 1.0);

        let c = Colour::parse("rgba(10,20,30,0.5)").unwrap();
        assert_eq!((c.red, c.green, c.blue), (10, 20, 30));
        assert!((c.alpha - 0.5).abs() < 1e-6);

        // Byte-valued alpha from old palettes normalizes
        let c = Colour::parse("rgba(0,0,0,255)").unwrap();
        assert_eq!(c.alpha, 1.0);
    }

    #[test]
    fn packed_round_trip() {
        let c = Colour::from_rgba(1, 2, 3, 1.0);
        assert_eq!(Colour::from_packed(c.to_packed()), c);
        assert_eq!(c.to_packed() & 0xff, 1);
        assert_eq!((c.to_packed() >> 24) & 0xff, 255);
    }

    #[test]
    fn palette_endpoints() {
        let points = [
            ControlPoint {
                position: Some(0.0),
                colour: Colour::from_rgba(0, 0, 0, 1.0),
            },
            ControlPoint {
                position: Some(1.0),
                colour: Colour::from_rgba(255, 255, 255, 1.0),
            },
        ];
        let palette = Palette::new(&points, None);
        assert_eq!(palette.lookup(0), Colour::from_rgba(0, 0, 0, 1.0).to_packed());
        assert_eq!(
            palette.lookup(PALETTE_SIZE - 1),
            Colour::from_rgba(255, 255, 255, 1.0).to_packed()
        );
        // Past-the-end indices clamp
        assert_eq!(palette.lookup(PALETTE_SIZE + 10), palette.lookup(PALETTE_SIZE - 1));
    }

    #[test]
    fn palette_default_positions_and_transparent_fix() {
        let points: Vec<ControlPoint> = ["#000000", "#808080", "#ffffff"]
            .iter()
            .map(|s| {
                let mut colour = Colour::parse(s).unwrap();
                colour.alpha = 0.0;
                ControlPoint {
                    position: None,
                    colour,
                }
            })
            .collect();
        let palette = Palette::new(&points, None);
        assert_eq!(palette.colours[1].0, 0.5);
        assert!(palette.colours.iter().all(|(_, c)| c.alpha == 1.0));
    }

    #[test]
    fn default_maps_present() {
        let maps = default_colour_maps();
        assert_eq!(maps.len(), 5);
        assert_eq!(maps[0].name.as_deref(), Some("Grayscale"));
        assert_eq!(maps[2].colours.len(), 7);
    }
}
