//! Full scene loads, incremental state merges, and export.
//!
//! A payload flagged `exported` is a state sync from a companion
//! process: it is merged recursively into the current document and
//! carries no geometry. Anything else replaces the scene wholesale.

use crate::colour::default_colour_maps;
use crate::decode::decode_scene;
use crate::model::{Family, Scene};
use crate::LoadError;
use serde_json::Value;

/// Recursive JSON merge: objects merge key-wise, arrays element-wise
/// with extra source elements appended, scalars overwrite.
pub fn merge_value(dst: &mut Value, src: &Value) {
    match (dst, src) {
        (Value::Object(d), Value::Object(s)) => {
            for (key, value) in s {
                match d.get_mut(key) {
                    Some(existing) => merge_value(existing, value),
                    None => {
                        d.insert(key.clone(), value.clone());
                    }
                }
            }
        }
        (Value::Array(d), Value::Array(s)) => {
            for (i, value) in s.iter().enumerate() {
                if i < d.len() {
                    merge_value(&mut d[i], value);
                } else {
                    d.push(value.clone());
                }
            }
        }
        (d, s) => *d = s.clone(),
    }
}

impl Scene {
    /// Parses and decodes a full scene document. A parse failure leaves
    /// the caller's current scene untouched.
    pub fn from_json(text: &str) -> Result<Scene, LoadError> {
        let mut scene: Scene = serde_json::from_str(text)?;
        scene.post_load();
        Ok(scene)
    }

    /// Post-parse fixups shared by full loads and merges.
    fn post_load(&mut self) {
        // Opacity omitted or zero means fully opaque
        for obj in &mut self.objects {
            if obj.opacity.unwrap_or(0.0) == 0.0 {
                obj.opacity = Some(1.0);
            }
        }

        // Stock maps, unless the scene carries a real set of its own
        if self.colourmaps.len() < 5 {
            self.colourmaps.extend(default_colour_maps());
        }

        decode_scene(self);

        // Materialize a bounding box from object bounds when the view
        // has none
        let bbox = self.bounding_box();
        let view = self.view();
        if view.min.is_none() || view.max.is_none() {
            view.min = Some(bbox.0);
            view.max = Some(bbox.1);
        }
    }

    /// Applies an `exported` state payload on top of this scene.
    /// Returns the payload's `reload` flag: whether geometry buffers
    /// must be rebuilt.
    pub fn apply_exported(&mut self, text: &str) -> Result<bool, LoadError> {
        let incoming: Value = serde_json::from_str(text)?;
        if self.views.is_empty() {
            return Err(LoadError::NoScene);
        }

        let mut doc = serde_json::to_value(&*self)?;

        // Rotation is replaced wholesale, not merged element-wise, so a
        // 3-angle rotation cannot bleed into a stale quaternion
        if let Some(rotate) = incoming
            .get("views")
            .and_then(|v| v.get(0))
            .and_then(|v| v.get("rotate"))
        {
            if let Some(view) = doc
                .get_mut("views")
                .and_then(|v| v.get_mut(0))
                .and_then(Value::as_object_mut)
            {
                view.insert("rotate".to_string(), rotate.clone());
            }
        }

        merge_value(&mut doc, &incoming);
        let mut merged: Scene = serde_json::from_value(doc)?;
        let reload = merged.reload;
        merged.exported = false;
        merged.reload = false;
        decode_scene(&mut merged);
        *self = merged;
        Ok(reload)
    }

    /// Serializes the scene as an `exported` state payload: objects
    /// without their geometry blocks, colour maps from their baked
    /// palettes, views and properties as-is.
    pub fn export_value(&self, nocam: bool, reload: bool) -> Result<Value, LoadError> {
        let mut doc = serde_json::to_value(self)?;

        if let Some(objects) = doc.get_mut("objects").and_then(Value::as_array_mut) {
            for obj in objects.iter_mut().filter_map(Value::as_object_mut) {
                for family in Family::ALL {
                    obj.remove(family.key());
                }
            }
        }

        // Re-derive colour maps from their palettes so edited control
        // points export in sorted, position-explicit form
        let cmaps: Vec<Value> = self
            .colourmaps
            .iter()
            .map(|cmap| {
                let palette = cmap.palette();
                let mut out = serde_json::to_value(cmap).unwrap_or(Value::Null);
                if let Some(map) = out.as_object_mut() {
                    map.insert(
                        "colours".to_string(),
                        serde_json::to_value(palette.control_points()).unwrap_or(Value::Null),
                    );
                    map.insert(
                        "background".to_string(),
                        Value::String(palette.background.html()),
                    );
                }
                out
            })
            .collect();
        doc["colourmaps"] = Value::Array(cmaps);

        if nocam {
            if let Some(view) = doc
                .get_mut("views")
                .and_then(|v| v.get_mut(0))
                .and_then(Value::as_object_mut)
            {
                for key in ["rotate", "translate", "focus", "scale"] {
                    view.remove(key);
                }
            }
        }

        doc["exported"] = Value::Bool(true);
        doc["reload"] = Value::Bool(reload);
        Ok(doc)
    }

    pub fn export_string(&self, nocam: bool, reload: bool) -> Result<String, LoadError> {
        let doc = self.export_value(nocam, reload)?;
        // Compact for the wire, indented for files
        if nocam {
            Ok(serde_json::to_string(&doc)?)
        } else {
            Ok(serde_json::to_string_pretty(&doc)?)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    const SCENE: &str = r##"{
        "objects": [
            {"name": "tris", "colour": "#ff0000", "custom_tag": 7,
             "triangles": [{"vertices": {"data": [0,0,0, 1,0,0, 0,1,0]},
                            "indices": {"data": [0,1,2]}}]}
        ],
        "colourmaps": [],
        "views": [{"min": [0,0,0], "max": [1,1,1], "rotate": [0,0,0,1]}],
        "properties": {"opacity": 0.5}
    }"##;

    #[test]
    fn full_load_decodes_and_adds_defaults() {
        let scene = Scene::from_json(SCENE).unwrap();
        assert_eq!(scene.colourmaps.len(), 5);
        assert_eq!(scene.objects[0].opacity, Some(1.0));
        let geom = scene.objects[0].triangles[0].geom.as_ref().unwrap();
        assert_eq!(geom.triangle_count(), 1);
    }

    #[test]
    fn merge_preserves_unrelated_keys() {
        let mut scene = Scene::from_json(SCENE).unwrap();
        let patch = json!({
            "exported": true,
            "reload": false,
            "objects": [{"opacity": 0.25}],
            "properties": {"brightness": 0.1}
        });
        let reload = scene.apply_exported(&patch.to_string()).unwrap();
        assert!(!reload);
        assert_eq!(scene.objects[0].opacity, Some(0.25));
        assert_eq!(scene.objects[0].name.as_deref(), Some("tris"));
        assert_eq!(scene.objects[0].extra["custom_tag"], json!(7));
        assert_eq!(scene.properties.brightness, Some(0.1));
        assert_eq!(scene.properties.opacity, Some(0.5));
        // Geometry survives a no-reload merge
        assert!(scene.objects[0].triangles[0].geom.is_some());
    }

    #[test]
    fn merge_replaces_rotation_wholesale() {
        let mut scene = Scene::from_json(SCENE).unwrap();
        let patch = json!({
            "exported": true,
            "views": [{"rotate": [10.0, 20.0, 30.0]}]
        });
        scene.apply_exported(&patch.to_string()).unwrap();
        assert_eq!(scene.views[0].rotate, Some(vec![10.0, 20.0, 30.0]));
    }

    #[test]
    fn export_strips_geometry_and_flags() {
        let scene = Scene::from_json(SCENE).unwrap();
        let doc = scene.export_value(false, true).unwrap();
        assert_eq!(doc["exported"], json!(true));
        assert_eq!(doc["reload"], json!(true));
        assert!(doc["objects"][0].get("triangles").is_none());
        assert_eq!(doc["objects"][0]["custom_tag"], json!(7));
        // Palette-derived colours carry explicit positions
        assert!(doc["colourmaps"][0]["colours"][0]["position"].is_number());
    }

    #[test]
    fn export_nocam_drops_camera() {
        let scene = Scene::from_json(SCENE).unwrap();
        let doc = scene.export_value(true, false).unwrap();
        assert!(doc["views"][0].get("rotate").is_none());
        assert!(doc["views"][0].get("min").is_some());
    }

    #[test]
    fn parse_error_is_loud() {
        assert!(Scene::from_json("not json").is_err());
    }
}
