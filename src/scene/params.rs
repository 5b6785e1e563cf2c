//! Material parameter store.
//!
//! Every emblem owns one `ParameterStore`: an ordered set of named groups
//! (text, sphere, cushion, ...) whose keys and value kinds are fixed when the
//! store is built. The renderer reads it every frame; only the control panel
//! and the preset loader write to it, and every write goes through `set`.

use std::collections::{BTreeMap, HashSet};
use std::fmt;

#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum ParamError {
    #[error("unknown parameter group '{0}'")]
    UnknownGroup(String),
    #[error("unknown parameter '{group}.{key}'")]
    UnknownKey { group: String, key: String },
    #[error("duplicate parameter group '{0}'")]
    DuplicateGroup(String),
    #[error("duplicate parameter '{group}.{key}'")]
    DuplicateKey { group: String, key: String },
    #[error("'{group}.{key}' expects a {expected} value")]
    KindMismatch {
        group: String,
        key: String,
        expected: &'static str,
    },
    #[error("'{group}.{key}' = {value} is outside [{min}, {max}]")]
    OutOfRange {
        group: String,
        key: String,
        value: f32,
        min: f32,
        max: f32,
    },
    #[error("'{group}.{key}' has no choice '{value}'")]
    UnknownChoice {
        group: String,
        key: String,
        value: String,
    },
    #[error("invalid color '{0}'")]
    InvalidColor(String),
}

/// Packed 8-bit RGB colour, written as `#rrggbb`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Rgb(pub [u8; 3]);

impl Rgb {
    pub fn from_hex(text: &str) -> Result<Self, ParamError> {
        let invalid = || ParamError::InvalidColor(text.to_string());
        let digits = text.trim().strip_prefix('#').ok_or_else(invalid)?;
        if !digits.chars().all(|c| c.is_ascii_hexdigit()) {
            return Err(invalid());
        }
        let nibble = |c: u8| -> u8 {
            match c {
                b'0'..=b'9' => c - b'0',
                b'a'..=b'f' => c - b'a' + 10,
                _ => c - b'A' + 10,
            }
        };
        let bytes = digits.as_bytes();
        match bytes.len() {
            3 => {
                let mut rgb = [0u8; 3];
                for (channel, &c) in rgb.iter_mut().zip(bytes) {
                    *channel = nibble(c) * 17;
                }
                Ok(Self(rgb))
            }
            6 => {
                let mut rgb = [0u8; 3];
                for (channel, pair) in rgb.iter_mut().zip(bytes.chunks(2)) {
                    *channel = (nibble(pair[0]) << 4) | nibble(pair[1]);
                }
                Ok(Self(rgb))
            }
            _ => Err(invalid()),
        }
    }

    pub fn to_hex(&self) -> String {
        format!("#{:02x}{:02x}{:02x}", self.0[0], self.0[1], self.0[2])
    }

    /// Linear-ish float triple for shader uniforms.
    pub fn to_unit_rgb(&self) -> [f32; 3] {
        [
            self.0[0] as f32 / 255.0,
            self.0[1] as f32 / 255.0,
            self.0[2] as f32 / 255.0,
        ]
    }
}

impl fmt::Display for Rgb {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_hex())
    }
}

impl serde::Serialize for Rgb {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.to_hex())
    }
}

impl<'de> serde::Deserialize<'de> for Rgb {
    fn deserialize<D: serde::Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let text = String::deserialize(deserializer)?;
        Rgb::from_hex(&text).map_err(serde::de::Error::custom)
    }
}

/// Value domain of one parameter, fixed when its group is defined.
#[derive(Debug, Clone, PartialEq, serde::Serialize, serde::Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ParamKind {
    Color,
    UnitFloat,
    Percent2Float,
    Enum { choices: Vec<String> },
}

impl ParamKind {
    pub fn range(&self) -> Option<(f32, f32)> {
        match self {
            ParamKind::UnitFloat => Some((0.0, 1.0)),
            ParamKind::Percent2Float => Some((0.0, 2.0)),
            ParamKind::Color | ParamKind::Enum { .. } => None,
        }
    }

    fn expected(&self) -> &'static str {
        match self {
            ParamKind::Color => "color",
            ParamKind::UnitFloat | ParamKind::Percent2Float => "numeric",
            ParamKind::Enum { .. } => "choice",
        }
    }
}

#[derive(Debug, Clone, PartialEq, serde::Serialize)]
#[serde(untagged)]
pub enum ParamValue {
    Float(f32),
    Color(Rgb),
    Choice(String),
}

impl ParamValue {
    pub fn as_float(&self) -> Option<f32> {
        match self {
            ParamValue::Float(value) => Some(*value),
            _ => None,
        }
    }

    pub fn as_color(&self) -> Option<Rgb> {
        match self {
            ParamValue::Color(value) => Some(*value),
            _ => None,
        }
    }

    #[cfg(test)]
    pub fn as_choice(&self) -> Option<&str> {
        match self {
            ParamValue::Choice(value) => Some(value),
            _ => None,
        }
    }
}

impl<'de> serde::Deserialize<'de> for ParamValue {
    /// Colours and choices are both plain strings on disk, so text stays a
    /// `Choice` until `ParamSpec::decode` reads it against the declared kind.
    fn deserialize<D: serde::Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        #[derive(serde::Deserialize)]
        #[serde(untagged)]
        enum Raw {
            Float(f32),
            Text(String),
        }
        Ok(match Raw::deserialize(deserializer)? {
            Raw::Float(value) => ParamValue::Float(value),
            Raw::Text(text) => ParamValue::Choice(text),
        })
    }
}

impl fmt::Display for ParamValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ParamValue::Float(value) => write!(f, "{value:.3}"),
            ParamValue::Color(value) => write!(f, "{value}"),
            ParamValue::Choice(value) => f.write_str(value),
        }
    }
}

fn default_step() -> f32 {
    0.01
}

#[derive(Debug, Clone, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct ParamSpec {
    pub key: String,
    pub label: String,
    #[serde(flatten)]
    pub kind: ParamKind,
    #[serde(default = "default_step")]
    pub step: f32,
}

impl ParamSpec {
    pub fn color(key: &str, label: &str) -> Self {
        Self::new(key, label, ParamKind::Color)
    }

    pub fn unit(key: &str, label: &str) -> Self {
        Self::new(key, label, ParamKind::UnitFloat)
    }

    pub fn percent2(key: &str, label: &str) -> Self {
        Self::new(key, label, ParamKind::Percent2Float)
    }

    pub fn choice(key: &str, label: &str, choices: &[&str]) -> Self {
        Self::new(
            key,
            label,
            ParamKind::Enum {
                choices: choices.iter().map(|choice| choice.to_string()).collect(),
            },
        )
    }

    fn new(key: &str, label: &str, kind: ParamKind) -> Self {
        Self {
            key: key.to_string(),
            label: label.to_string(),
            kind,
            step: default_step(),
        }
    }

    /// Reads a freshly deserialized value as this parameter's kind: hex text
    /// becomes a colour for colour parameters, everything else passes through.
    pub fn decode(&self, value: ParamValue) -> Result<ParamValue, ParamError> {
        match (&self.kind, value) {
            (ParamKind::Color, ParamValue::Choice(text)) => {
                Rgb::from_hex(&text).map(ParamValue::Color)
            }
            (_, value) => Ok(value),
        }
    }

    /// Checks `value` against this parameter's domain.
    pub fn validate(&self, group: &str, value: &ParamValue) -> Result<(), ParamError> {
        let mismatch = || ParamError::KindMismatch {
            group: group.to_string(),
            key: self.key.clone(),
            expected: self.kind.expected(),
        };
        match (&self.kind, value) {
            (ParamKind::Color, ParamValue::Color(_)) => Ok(()),
            (ParamKind::UnitFloat | ParamKind::Percent2Float, ParamValue::Float(number)) => {
                let (min, max) = self.kind.range().ok_or_else(mismatch)?;
                if number.is_finite() && (min..=max).contains(number) {
                    Ok(())
                } else {
                    Err(ParamError::OutOfRange {
                        group: group.to_string(),
                        key: self.key.clone(),
                        value: *number,
                        min,
                        max,
                    })
                }
            }
            (ParamKind::Enum { choices }, ParamValue::Choice(choice)) => {
                if choices.iter().any(|candidate| candidate == choice) {
                    Ok(())
                } else {
                    Err(ParamError::UnknownChoice {
                        group: group.to_string(),
                        key: self.key.clone(),
                        value: choice.clone(),
                    })
                }
            }
            _ => Err(mismatch()),
        }
    }
}

#[derive(Debug, Clone, PartialEq, serde::Serialize)]
pub struct ParamEntry {
    pub spec: ParamSpec,
    pub value: ParamValue,
}

impl<'de> serde::Deserialize<'de> for ParamEntry {
    fn deserialize<D: serde::Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        #[derive(serde::Deserialize)]
        struct Raw {
            spec: ParamSpec,
            value: ParamValue,
        }
        let raw = Raw::deserialize(deserializer)?;
        let value = raw
            .spec
            .decode(raw.value)
            .map_err(serde::de::Error::custom)?;
        Ok(Self {
            spec: raw.spec,
            value,
        })
    }
}

#[derive(Debug, Clone, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct ParameterGroup {
    pub name: String,
    pub title: String,
    pub entries: Vec<ParamEntry>,
}

impl ParameterGroup {
    pub fn new(name: &str, title: &str) -> Self {
        Self {
            name: name.to_string(),
            title: title.to_string(),
            entries: Vec::new(),
        }
    }

    pub fn with(mut self, spec: ParamSpec, value: ParamValue) -> Self {
        self.entries.push(ParamEntry { spec, value });
        self
    }

    pub fn entry(&self, key: &str) -> Option<&ParamEntry> {
        self.entries.iter().find(|entry| entry.spec.key == key)
    }
}

/// Owned copy of every value, keyed group -> key.
pub type StoreSnapshot = BTreeMap<String, BTreeMap<String, ParamValue>>;

#[derive(Debug, Clone)]
pub struct ParameterStore {
    groups: Vec<ParameterGroup>,
    revision: u64,
}

impl ParameterStore {
    pub fn new(groups: Vec<ParameterGroup>) -> Result<Self, ParamError> {
        let mut names = HashSet::new();
        for group in &groups {
            if !names.insert(group.name.as_str()) {
                return Err(ParamError::DuplicateGroup(group.name.clone()));
            }
            let mut keys = HashSet::new();
            for entry in &group.entries {
                if !keys.insert(entry.spec.key.as_str()) {
                    return Err(ParamError::DuplicateKey {
                        group: group.name.clone(),
                        key: entry.spec.key.clone(),
                    });
                }
                entry.spec.validate(&group.name, &entry.value)?;
            }
        }
        Ok(Self {
            groups,
            revision: 0,
        })
    }

    pub fn groups(&self) -> &[ParameterGroup] {
        &self.groups
    }

    pub fn group(&self, name: &str) -> Option<&ParameterGroup> {
        self.groups.iter().find(|group| group.name == name)
    }

    pub fn get(&self, group: &str, key: &str) -> Option<&ParamValue> {
        self.group(group)?.entry(key).map(|entry| &entry.value)
    }

    pub fn spec(&self, group: &str, key: &str) -> Option<&ParamSpec> {
        self.group(group)?.entry(key).map(|entry| &entry.spec)
    }

    /// Replaces one value after validating it. The key set never changes and
    /// a rejected value leaves the previous one in place.
    pub fn set(&mut self, group: &str, key: &str, value: ParamValue) -> Result<(), ParamError> {
        let group_entry = self
            .groups
            .iter_mut()
            .find(|candidate| candidate.name == group)
            .ok_or_else(|| ParamError::UnknownGroup(group.to_string()))?;
        let entry = group_entry
            .entries
            .iter_mut()
            .find(|entry| entry.spec.key == key)
            .ok_or_else(|| ParamError::UnknownKey {
                group: group.to_string(),
                key: key.to_string(),
            })?;
        entry.spec.validate(group, &value)?;
        if entry.value != value {
            log::trace!("{}.{} = {}", group, key, value);
            entry.value = value;
            self.revision += 1;
        }
        Ok(())
    }

    /// Bumped on every accepted change that alters a value.
    pub fn revision(&self) -> u64 {
        self.revision
    }

    pub fn snapshot(&self) -> StoreSnapshot {
        self.groups
            .iter()
            .map(|group| {
                let values = group
                    .entries
                    .iter()
                    .map(|entry| (entry.spec.key.clone(), entry.value.clone()))
                    .collect();
                (group.name.clone(), values)
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn cushion_store() -> ParameterStore {
        ParameterStore::new(vec![ParameterGroup::new("cushion", "Cushion")
            .with(
                ParamSpec::color("color", "Color"),
                ParamValue::Color(Rgb([0, 0, 0])),
            )
            .with(ParamSpec::unit("opacity", "Opacity"), ParamValue::Float(1.0))
            .with(
                ParamSpec::percent2("envMapIntensity", "Env Map Intensity"),
                ParamValue::Float(1.0),
            )
            .with(
                ParamSpec::choice("envMapImage", "Reflected Image", &["/a.png", "/b.png"]),
                ParamValue::Choice("/a.png".to_string()),
            )])
        .unwrap()
    }

    #[test]
    fn hex_colors_parse_short_and_long_forms() {
        assert_eq!(Rgb::from_hex("#fff").unwrap(), Rgb([255, 255, 255]));
        assert_eq!(Rgb::from_hex("#C0c0C0").unwrap(), Rgb([192, 192, 192]));
        assert_eq!(Rgb::from_hex("#4dff29").unwrap().to_hex(), "#4dff29");
        assert!(Rgb::from_hex("fff").is_err());
        assert!(Rgb::from_hex("#ggg").is_err());
        assert!(Rgb::from_hex("#12345").is_err());
    }

    #[test]
    fn out_of_range_opacity_is_rejected_and_value_kept() {
        let mut store = cushion_store();
        let err = store
            .set("cushion", "opacity", ParamValue::Float(5.0))
            .unwrap_err();
        assert!(matches!(err, ParamError::OutOfRange { .. }));
        assert_eq!(store.get("cushion", "opacity"), Some(&ParamValue::Float(1.0)));
        assert_eq!(store.revision(), 0);
    }

    #[test]
    fn percent2_accepts_up_to_two() {
        let mut store = cushion_store();
        store
            .set("cushion", "envMapIntensity", ParamValue::Float(2.0))
            .unwrap();
        assert!(store
            .set("cushion", "envMapIntensity", ParamValue::Float(2.01))
            .is_err());
        assert_eq!(
            store.get("cushion", "envMapIntensity"),
            Some(&ParamValue::Float(2.0))
        );
    }

    #[test]
    fn non_finite_numbers_are_rejected() {
        let mut store = cushion_store();
        assert!(store
            .set("cushion", "opacity", ParamValue::Float(f32::NAN))
            .is_err());
        assert_eq!(store.get("cushion", "opacity"), Some(&ParamValue::Float(1.0)));
    }

    #[test]
    fn enum_rejects_unknown_choice() {
        let mut store = cushion_store();
        let err = store
            .set("cushion", "envMapImage", ParamValue::Choice("/c.png".into()))
            .unwrap_err();
        assert!(matches!(err, ParamError::UnknownChoice { .. }));
        store
            .set("cushion", "envMapImage", ParamValue::Choice("/b.png".into()))
            .unwrap();
        assert_eq!(
            store.get("cushion", "envMapImage").and_then(ParamValue::as_choice),
            Some("/b.png")
        );
    }

    #[test]
    fn set_never_adds_keys_or_groups() {
        let mut store = cushion_store();
        assert!(matches!(
            store.set("cushion", "sheen", ParamValue::Float(0.5)),
            Err(ParamError::UnknownKey { .. })
        ));
        assert!(matches!(
            store.set("text", "opacity", ParamValue::Float(0.5)),
            Err(ParamError::UnknownGroup(_))
        ));
        assert_eq!(store.groups().len(), 1);
        assert_eq!(store.groups()[0].entries.len(), 4);
    }

    #[test]
    fn kind_mismatch_is_rejected() {
        let mut store = cushion_store();
        assert!(matches!(
            store.set("cushion", "color", ParamValue::Float(0.5)),
            Err(ParamError::KindMismatch { .. })
        ));
    }

    #[test]
    fn revision_only_moves_on_real_changes() {
        let mut store = cushion_store();
        store.set("cushion", "opacity", ParamValue::Float(1.0)).unwrap();
        assert_eq!(store.revision(), 0);
        store.set("cushion", "opacity", ParamValue::Float(0.3)).unwrap();
        assert_eq!(store.revision(), 1);
    }

    #[test]
    fn construction_rejects_duplicates_and_bad_defaults() {
        let group = ParameterGroup::new("text", "Text")
            .with(ParamSpec::unit("opacity", "Opacity"), ParamValue::Float(1.0));
        assert!(matches!(
            ParameterStore::new(vec![group.clone(), group.clone()]),
            Err(ParamError::DuplicateGroup(_))
        ));
        let doubled = group
            .clone()
            .with(ParamSpec::unit("opacity", "Opacity"), ParamValue::Float(0.5));
        assert!(matches!(
            ParameterStore::new(vec![doubled]),
            Err(ParamError::DuplicateKey { .. })
        ));
        let bad = ParameterGroup::new("text", "Text")
            .with(ParamSpec::unit("opacity", "Opacity"), ParamValue::Float(1.5));
        assert!(ParameterStore::new(vec![bad]).is_err());
    }

    #[test]
    fn param_values_deserialize_from_plain_json() {
        let value: ParamValue = serde_json::from_str("0.25").unwrap();
        assert_eq!(value, ParamValue::Float(0.25));
        let value: ParamValue = serde_json::from_str("\"/images/bw_1.png\"").unwrap();
        assert_eq!(value, ParamValue::Choice("/images/bw_1.png".to_string()));
    }

    #[test]
    fn hex_text_is_read_by_declared_kind() {
        let color = ParamSpec::color("color", "Color");
        let swatch = ParamSpec::choice("swatch", "Swatch", &["#fff", "#000"]);
        let text: ParamValue = serde_json::from_str("\"#fff\"").unwrap();
        assert_eq!(
            color.decode(text.clone()).unwrap(),
            ParamValue::Color(Rgb([255, 255, 255]))
        );
        assert_eq!(
            swatch.decode(text).unwrap(),
            ParamValue::Choice("#fff".to_string())
        );
        assert!(matches!(
            color.decode(ParamValue::Choice("/a.png".to_string())),
            Err(ParamError::InvalidColor(_))
        ));
    }

    #[test]
    fn entries_decode_values_against_their_spec() {
        let json = r##"[
            { "spec": { "key": "color", "label": "Color", "kind": "color" }, "value": "#e4e3e3" },
            { "spec": { "key": "swatch", "label": "Swatch", "kind": "enum", "choices": ["#fff", "#000"] }, "value": "#000" }
        ]"##;
        let entries: Vec<ParamEntry> = serde_json::from_str(json).unwrap();
        assert_eq!(entries[0].value, ParamValue::Color(Rgb([0xe4, 0xe3, 0xe3])));
        assert_eq!(entries[1].value, ParamValue::Choice("#000".to_string()));

        let bad = r#"{ "spec": { "key": "color", "label": "Color", "kind": "color" }, "value": "teal" }"#;
        assert!(serde_json::from_str::<ParamEntry>(bad).is_err());
    }
}
