//! Built-in emblems, used when no catalog file is configured.

use super::params::{ParamSpec, ParamValue, ParameterGroup, Rgb};
use super::{EmblemCatalog, EmblemDefinition};

/// Candidate reflection maps for the cushion's environment map.
pub const REFLECTION_MAPS: &[&str] = &[
    "/images/bw_1.png",
    "/images/bw_2.png",
    "/images/bw_3.png",
    "/images/silver_1.jpg",
    "/images/silver_2.jpg",
    "/images/silver_3.jpg",
    "/images/silver_4.jpg",
    "/images/silver_5.jpg",
];

const WHITE: Rgb = Rgb([0xff, 0xff, 0xff]);
const BLACK: Rgb = Rgb([0x00, 0x00, 0x00]);
const SILVER: Rgb = Rgb([0xc0, 0xc0, 0xc0]);
const LIME: Rgb = Rgb([0x4d, 0xff, 0x29]);
const GREEN: Rgb = Rgb([0x1d, 0xf8, 0x00]);
const PEWTER: Rgb = Rgb([0x9c, 0x9b, 0x9d]);
const COVER_GREY: Rgb = Rgb([0xe4, 0xe3, 0xe3]);

fn color(rgb: Rgb) -> ParamValue {
    ParamValue::Color(rgb)
}

fn float(value: f32) -> ParamValue {
    ParamValue::Float(value)
}

struct Surface {
    color: Rgb,
    metalness: f32,
    roughness: f32,
    opacity: f32,
    emissive: Option<(Rgb, f32)>,
}

fn matte_group(name: &str, title: &str, surface: Surface) -> ParameterGroup {
    let group = ParameterGroup::new(name, title)
        .with(ParamSpec::color("color", "Color"), color(surface.color))
        .with(ParamSpec::unit("metalness", "Metalness"), float(surface.metalness))
        .with(ParamSpec::unit("roughness", "Roughness"), float(surface.roughness))
        .with(ParamSpec::unit("opacity", "Opacity"), float(surface.opacity));
    match surface.emissive {
        Some((emissive, intensity)) => group
            .with(ParamSpec::color("emissive", "Emissive"), color(emissive))
            .with(
                ParamSpec::unit("emissiveIntensity", "Emissive Intensity"),
                float(intensity),
            ),
        None => group,
    }
}

fn polished_text(name: &str, title: &str) -> ParameterGroup {
    ParameterGroup::new(name, title)
        .with(ParamSpec::color("color", "Color"), color(SILVER))
        .with(ParamSpec::unit("metalness", "Metalness"), float(1.0))
        .with(ParamSpec::unit("roughness", "Roughness"), float(0.15))
        .with(ParamSpec::unit("reflectivity", "Reflectivity"), float(1.0))
        .with(ParamSpec::unit("clearcoat", "Clearcoat"), float(1.0))
        .with(
            ParamSpec::unit("clearcoatRoughness", "Clearcoat Roughness"),
            float(0.1),
        )
        .with(ParamSpec::unit("opacity", "Opacity"), float(1.0))
}

struct Cushion {
    color: Rgb,
    opacity: f32,
    roughness: f32,
    metalness: f32,
    env_map: Option<(f32, &'static str)>,
    emissive: Option<(Rgb, f32)>,
}

fn cushion_group(cushion: Cushion) -> ParameterGroup {
    let mut group = ParameterGroup::new("cushion", "Cushion");
    if let Some((_, image)) = cushion.env_map {
        group = group.with(
            ParamSpec::choice("envMapImage", "Reflected Image", REFLECTION_MAPS),
            ParamValue::Choice(image.to_string()),
        );
    }
    group = group
        .with(ParamSpec::color("color", "Color"), color(cushion.color))
        .with(ParamSpec::unit("opacity", "Opacity"), float(cushion.opacity))
        .with(ParamSpec::unit("roughness", "Roughness"), float(cushion.roughness))
        .with(ParamSpec::unit("metalness", "Metalness"), float(cushion.metalness));
    if let Some((intensity, _)) = cushion.env_map {
        group = group.with(
            ParamSpec::percent2("envMapIntensity", "Env Map Intensity"),
            float(intensity),
        );
    }
    if let Some((emissive, intensity)) = cushion.emissive {
        group = group
            .with(ParamSpec::color("emissive", "Emissive"), color(emissive))
            .with(
                ParamSpec::unit("emissiveIntensity", "Emissive Intensity"),
                float(intensity),
            );
    }
    group
}

fn cushion_cover() -> ParameterGroup {
    ParameterGroup::new("cushionCover", "Cushion Cover")
        .with(ParamSpec::color("color", "Color"), color(COVER_GREY))
        .with(ParamSpec::unit("opacity", "Opacity"), float(0.3))
}

fn glowing_text(name: &str, title: &str) -> ParameterGroup {
    matte_group(
        name,
        title,
        Surface {
            color: WHITE,
            metalness: 0.0,
            roughness: 1.0,
            opacity: 1.0,
            emissive: Some((WHITE, 0.4)),
        },
    )
}

fn dark_text(name: &str, title: &str) -> ParameterGroup {
    matte_group(
        name,
        title,
        Surface {
            color: BLACK,
            metalness: 1.0,
            roughness: 0.0,
            opacity: 1.0,
            emissive: None,
        },
    )
}

pub fn logo_one() -> EmblemDefinition {
    EmblemDefinition {
        name: "logo-one".to_string(),
        title: "LEFT - FIRST FROM THE TOP".to_string(),
        base_facing: true,
        groups: vec![
            glowing_text("textBold", "Text Bold"),
            glowing_text("textLight", "Text Light"),
            matte_group(
                "sphere",
                "Sphere",
                Surface {
                    color: LIME,
                    metalness: 0.0,
                    roughness: 1.0,
                    opacity: 1.0,
                    emissive: Some((LIME, 0.2)),
                },
            ),
            cushion_group(Cushion {
                color: WHITE,
                opacity: 1.0,
                roughness: 0.0,
                metalness: 1.0,
                env_map: Some((1.0, "/images/silver_5.jpg")),
                emissive: Some((WHITE, 0.0)),
            }),
            cushion_cover(),
        ],
    }
}

pub fn logo_three() -> EmblemDefinition {
    EmblemDefinition {
        name: "logo-three".to_string(),
        title: "LEFT - SECOND FROM THE TOP".to_string(),
        base_facing: true,
        groups: vec![
            polished_text("text", "Text"),
            cushion_group(Cushion {
                color: BLACK,
                opacity: 1.0,
                roughness: 0.0,
                metalness: 0.0,
                env_map: Some((1.0, "/images/bw_1.png")),
                emissive: Some((WHITE, 0.01)),
            }),
            cushion_cover(),
        ],
    }
}

pub fn logo_four() -> EmblemDefinition {
    EmblemDefinition {
        name: "logo-four".to_string(),
        title: "RIGHT - SECOND FROM THE TOP".to_string(),
        base_facing: true,
        groups: vec![
            polished_text("textBold", "Text Bold"),
            matte_group(
                "sphere",
                "Sphere",
                Surface {
                    color: GREEN,
                    metalness: 0.0,
                    roughness: 1.0,
                    opacity: 1.0,
                    emissive: None,
                },
            ),
            cushion_group(Cushion {
                color: PEWTER,
                opacity: 1.0,
                roughness: 0.5,
                metalness: 0.8,
                env_map: None,
                emissive: None,
            }),
        ],
    }
}

pub fn logo_five() -> EmblemDefinition {
    EmblemDefinition {
        name: "logo-five".to_string(),
        title: "BOTTOM LEFT PIN".to_string(),
        base_facing: true,
        groups: vec![
            dark_text("textBold", "Text Bold"),
            dark_text("textLight", "Text Light"),
            matte_group(
                "sphere",
                "Sphere",
                Surface {
                    color: LIME,
                    metalness: 0.0,
                    roughness: 1.0,
                    opacity: 1.0,
                    emissive: None,
                },
            ),
            cushion_group(Cushion {
                color: WHITE,
                opacity: 1.0,
                roughness: 0.0,
                metalness: 1.0,
                env_map: Some((1.0, "/images/silver_5.jpg")),
                emissive: Some((WHITE, 0.3)),
            }),
        ],
    }
}

pub fn builtin_catalog() -> EmblemCatalog {
    EmblemCatalog {
        emblems: vec![logo_one(), logo_three(), logo_four(), logo_five()],
    }
}
