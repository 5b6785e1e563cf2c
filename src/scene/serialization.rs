use crate::scene::params::{ParamError, ParamValue, ParameterStore};
use crate::scene::{Emblem, EmblemCatalog};
use std::collections::BTreeMap;
use std::path::Path;

#[derive(Debug, thiserror::Error)]
pub enum SerializationError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

pub type Result<T> = std::result::Result<T, SerializationError>;

/// Saved parameter values for one emblem.
#[derive(Debug, Clone, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct Preset {
    pub emblem: String,
    pub base_facing: bool,
    pub values: BTreeMap<String, BTreeMap<String, ParamValue>>,
}

impl Preset {
    pub fn capture(emblem: &Emblem) -> Self {
        Self {
            emblem: emblem.name().to_string(),
            base_facing: emblem.orientation().state().base_facing,
            values: emblem.store().snapshot(),
        }
    }
}

pub fn save_catalog_to_file(catalog: &EmblemCatalog, path: &Path) -> Result<()> {
    let json = serde_json::to_string_pretty(catalog)?;
    std::fs::write(path, json)?;
    Ok(())
}

pub fn load_catalog_from_file(path: &Path) -> Result<EmblemCatalog> {
    let json = std::fs::read_to_string(path)?;
    let catalog: EmblemCatalog = serde_json::from_str(&json)?;
    Ok(catalog)
}

pub fn save_preset_to_file(preset: &Preset, path: &Path) -> Result<()> {
    let json = serde_json::to_string_pretty(preset)?;
    std::fs::write(path, json)?;
    Ok(())
}

pub fn load_preset_from_file(path: &Path) -> Result<Preset> {
    let json = std::fs::read_to_string(path)?;
    let preset: Preset = serde_json::from_str(&json)?;
    Ok(preset)
}

/// Writes every preset value through `ParameterStore::set`, reading each
/// one as its parameter's kind first. Values the store rejects are skipped
/// and returned; the rest are applied.
pub fn apply_preset(store: &mut ParameterStore, preset: &Preset) -> Vec<ParamError> {
    let mut rejected = Vec::new();
    for (group, values) in &preset.values {
        for (key, value) in values {
            let decoded = match store.spec(group, key) {
                Some(spec) => spec.decode(value.clone()),
                None => Ok(value.clone()),
            };
            if let Err(err) = decoded.and_then(|value| store.set(group, key, value)) {
                rejected.push(err);
            }
        }
    }
    rejected
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::render::orientation::OrientationSettings;
    use crate::scene::params::{ParamSpec, ParameterGroup, Rgb};
    use crate::scene::presets::{builtin_catalog, logo_three};
    use crate::scene::{EmblemDefinition, SceneState};
    use crate::ui::tests::RecordingBackend;
    use crate::ui::PanelRegistry;

    fn temp_path(tag: &str) -> std::path::PathBuf {
        let mut path = std::env::temp_dir();
        let nonce = std::time::SystemTime::now()
            .duration_since(std::time::UNIX_EPOCH)
            .unwrap()
            .as_nanos();
        path.push(format!(
            "emblem_studio_{}_{}_{}.json",
            tag,
            std::process::id(),
            nonce
        ));
        path
    }

    #[test]
    fn catalog_survives_file_round_trip() {
        let catalog = builtin_catalog();
        let path = temp_path("catalog");
        save_catalog_to_file(&catalog, &path).unwrap();
        let loaded = load_catalog_from_file(&path).unwrap();
        assert_eq!(loaded, catalog);
        let _ = std::fs::remove_file(path);
    }

    #[test]
    fn catalog_json_is_hand_editable() {
        let json = r##"{
            "emblems": [{
                "name": "pin",
                "title": "PIN",
                "groups": [{
                    "name": "cushion",
                    "title": "Cushion",
                    "entries": [
                        { "spec": { "key": "color", "label": "Color", "kind": "color" }, "value": "#fff" },
                        { "spec": { "key": "envMapIntensity", "label": "Env Map Intensity", "kind": "percent2_float" }, "value": 1.5 },
                        { "spec": { "key": "envMapImage", "label": "Reflected Image", "kind": "enum", "choices": ["/a.png", "/b.png"] }, "value": "/b.png" }
                    ]
                }]
            }]
        }"##;
        let catalog: EmblemCatalog = serde_json::from_str(json).unwrap();
        let definition = &catalog.emblems[0];
        assert!(definition.base_facing);
        let store = ParameterStore::new(definition.groups.clone()).unwrap();
        assert_eq!(
            store.get("cushion", "color"),
            Some(&ParamValue::Color(Rgb([255, 255, 255])))
        );
        assert_eq!(store.spec("cushion", "envMapIntensity").unwrap().step, 0.01);
    }

    fn swatch_definition() -> EmblemDefinition {
        EmblemDefinition {
            name: "swatches".to_string(),
            title: "SWATCHES".to_string(),
            base_facing: true,
            groups: vec![ParameterGroup::new("tint", "Tint")
                .with(
                    ParamSpec::choice("swatch", "Swatch", &["#fff", "#000"]),
                    ParamValue::Choice("#fff".to_string()),
                )
                .with(
                    ParamSpec::color("color", "Color"),
                    ParamValue::Color(Rgb([0xe4, 0xe3, 0xe3])),
                )],
        }
    }

    #[test]
    fn hex_like_choices_survive_catalog_round_trip() {
        let catalog = EmblemCatalog {
            emblems: vec![swatch_definition()],
        };
        let path = temp_path("swatch_catalog");
        save_catalog_to_file(&catalog, &path).unwrap();
        let loaded = load_catalog_from_file(&path).unwrap();
        assert_eq!(loaded, catalog);
        let store = ParameterStore::new(loaded.emblems[0].groups.clone()).unwrap();
        assert_eq!(
            store.get("tint", "swatch"),
            Some(&ParamValue::Choice("#fff".to_string()))
        );
        let _ = std::fs::remove_file(path);
    }

    #[test]
    fn hex_like_choices_survive_preset_round_trip() {
        let mut store = ParameterStore::new(swatch_definition().groups).unwrap();
        store
            .set("tint", "swatch", ParamValue::Choice("#000".to_string()))
            .unwrap();
        store
            .set("tint", "color", ParamValue::Color(Rgb([1, 2, 3])))
            .unwrap();
        let preset = Preset {
            emblem: "swatches".to_string(),
            base_facing: true,
            values: store.snapshot(),
        };
        let path = temp_path("swatch_preset");
        save_preset_to_file(&preset, &path).unwrap();

        let mut fresh = ParameterStore::new(swatch_definition().groups).unwrap();
        let loaded = load_preset_from_file(&path).unwrap();
        assert!(apply_preset(&mut fresh, &loaded).is_empty());
        assert_eq!(
            fresh.get("tint", "swatch"),
            Some(&ParamValue::Choice("#000".to_string()))
        );
        assert_eq!(
            fresh.get("tint", "color"),
            Some(&ParamValue::Color(Rgb([1, 2, 3])))
        );
        let _ = std::fs::remove_file(path);
    }

    #[test]
    fn missing_file_is_an_io_error() {
        let path = temp_path("missing");
        assert!(matches!(
            load_preset_from_file(&path),
            Err(SerializationError::Io(_))
        ));
    }

    #[test]
    fn preset_round_trip_restores_values() {
        let mut panels = PanelRegistry::new(RecordingBackend::default());
        let mut scene = SceneState::new(OrientationSettings::default());
        let id = scene.mount(&logo_three(), &mut panels).unwrap();
        let emblem = scene.emblem_mut(id).unwrap();
        emblem
            .store_mut()
            .set("cushion", "roughness", ParamValue::Float(0.75))
            .unwrap();
        let preset = Preset::capture(emblem);

        let path = temp_path("preset");
        save_preset_to_file(&preset, &path).unwrap();
        emblem
            .store_mut()
            .set("cushion", "roughness", ParamValue::Float(0.1))
            .unwrap();

        let loaded = load_preset_from_file(&path).unwrap();
        assert!(apply_preset(emblem.store_mut(), &loaded).is_empty());
        assert_eq!(
            emblem.store().get("cushion", "roughness"),
            Some(&ParamValue::Float(0.75))
        );
        let _ = std::fs::remove_file(path);
    }

    #[test]
    fn preset_with_bad_values_applies_the_rest() {
        let mut store = ParameterStore::new(logo_three().groups).unwrap();
        let mut values = BTreeMap::new();
        values.insert(
            "cushion".to_string(),
            BTreeMap::from([
                ("opacity".to_string(), ParamValue::Float(5.0)),
                ("roughness".to_string(), ParamValue::Float(0.4)),
                ("sheen".to_string(), ParamValue::Float(0.4)),
            ]),
        );
        let preset = Preset {
            emblem: "logo-three".to_string(),
            base_facing: true,
            values,
        };
        let rejected = apply_preset(&mut store, &preset);
        assert_eq!(rejected.len(), 2);
        assert_eq!(store.get("cushion", "opacity"), Some(&ParamValue::Float(1.0)));
        assert_eq!(store.get("cushion", "roughness"), Some(&ParamValue::Float(0.4)));
    }
}
