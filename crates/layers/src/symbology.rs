//! Per-hazard overlay styling.
//!
//! Colours follow each hazard's scale (flood blue/cyan, landslide
//! brown/orange, fire red, seismic by magnitude band, weather fixed blue).
//! Only fill opacity is ever animated.

use std::fmt;

use feeds::{HazardKind, HIGH_MAGNITUDE, LIGHT_MAGNITUDE, MEDIUM_MAGNITUDE};
use formats::{GeometryKind, HazardFeature, RiskLevel};
use foundation::LatLng;
use runtime::AnimationPhase;

#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash)]
pub struct Color(pub u8, pub u8, pub u8);

impl Color {
    pub const fn rgb(r: u8, g: u8, b: u8) -> Self {
        Self(r, g, b)
    }
}

impl fmt::Display for Color {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{:02X}{:02X}{:02X}", self.0, self.1, self.2)
    }
}

pub const FLOOD_LOW: Color = Color::rgb(0x4D, 0xD0, 0xE1);
pub const FLOOD_MEDIUM: Color = Color::rgb(0x1E, 0x88, 0xE5);
pub const FLOOD_HIGH: Color = Color::rgb(0x0D, 0x47, 0xA1);
pub const FLOOD_CRITICAL: Color = Color::rgb(0x00, 0x1F, 0x54);

pub const LANDSLIDE_LOW: Color = Color::rgb(0xDE, 0xB8, 0x87);
pub const LANDSLIDE_MEDIUM: Color = Color::rgb(0xD2, 0x69, 0x1E);
pub const LANDSLIDE_HIGH: Color = Color::rgb(0x8B, 0x45, 0x13);
pub const LANDSLIDE_CRITICAL: Color = Color::rgb(0x5C, 0x2E, 0x0B);

pub const FIRE_LOW: Color = Color::rgb(0xFF, 0xA0, 0x7A);
pub const FIRE_MEDIUM: Color = Color::rgb(0xFF, 0x63, 0x47);
pub const FIRE_HIGH: Color = Color::rgb(0xDC, 0x14, 0x3C);
pub const FIRE_CRITICAL: Color = Color::rgb(0x8B, 0x00, 0x00);

pub const SEISMIC_STRONG: Color = Color::rgb(0xFF, 0x00, 0x00);
pub const SEISMIC_MODERATE: Color = Color::rgb(0xFF, 0xA5, 0x00);
pub const SEISMIC_LIGHT: Color = Color::rgb(0xFF, 0xD7, 0x00);
pub const SEISMIC_MINOR: Color = Color::rgb(0x00, 0xC8, 0x53);

pub const WEATHER_STATION: Color = Color::rgb(0x21, 0x96, 0xF3);
pub const INDICATOR: Color = Color::rgb(0x37, 0x41, 0x51);

pub const WEATHER_RADIUS_PX: f64 = 6.0;

/// Pulse curve `base + amplitude * sin(phase * k)`.
#[derive(Debug, Copy, Clone, PartialEq)]
pub struct PulseSpec {
    pub base: f64,
    pub amplitude: f64,
}

impl PulseSpec {
    pub const K: f64 = 0.5;

    pub const fn new(base: f64, amplitude: f64) -> Self {
        Self { base, amplitude }
    }

    pub fn opacity(self, phase: AnimationPhase) -> f64 {
        (self.base + self.amplitude * phase.angle(Self::K).sin()).clamp(0.0, 1.0)
    }
}

pub const FLOOD_PULSE: PulseSpec = PulseSpec::new(0.4, 0.2);
pub const ZONE_PULSE: PulseSpec = PulseSpec::new(0.35, 0.1);

#[derive(Debug, Clone, PartialEq)]
pub struct OverlayStyle {
    pub fill_color: Color,
    pub fill_opacity: f64,
    pub stroke_color: Color,
    pub stroke_weight: f64,
    /// Circle radius for point overlays.
    pub radius_px: Option<f64>,
    pub z_index: i32,
    pub pulse: Option<PulseSpec>,
}

/// Geometry handed to the render backend.
#[derive(Debug, Clone, PartialEq)]
pub enum OverlayShape {
    Point(LatLng),
    Polygon(Vec<LatLng>),
}

pub fn style_for(kind: HazardKind, feature: &HazardFeature) -> OverlayStyle {
    let level = feature.risk_level;
    match kind {
        HazardKind::Flood => zone_style(
            scale(level, [FLOOD_LOW, FLOOD_MEDIUM, FLOOD_HIGH, FLOOD_CRITICAL]),
            level,
            FLOOD_PULSE,
        ),
        HazardKind::Landslide => zone_style(
            scale(
                level,
                [LANDSLIDE_LOW, LANDSLIDE_MEDIUM, LANDSLIDE_HIGH, LANDSLIDE_CRITICAL],
            ),
            level,
            ZONE_PULSE,
        ),
        HazardKind::Fire => zone_style(
            scale(level, [FIRE_LOW, FIRE_MEDIUM, FIRE_HIGH, FIRE_CRITICAL]),
            level,
            ZONE_PULSE,
        ),
        HazardKind::Seismic => {
            let magnitude = feature.risk_score.max(0.0);
            let color = seismic_color(magnitude);
            OverlayStyle {
                fill_color: color,
                fill_opacity: 0.6,
                stroke_color: color,
                stroke_weight: 1.0,
                radius_px: Some(4.0 + 2.0 * magnitude),
                z_index: 3,
                pulse: None,
            }
        }
        HazardKind::Weather => OverlayStyle {
            fill_color: WEATHER_STATION,
            fill_opacity: 0.8,
            stroke_color: WEATHER_STATION,
            stroke_weight: 1.0,
            radius_px: Some(WEATHER_RADIUS_PX),
            z_index: 2,
            pulse: None,
        },
    }
}

/// Landslide and fire points are drawn as diamond zones sized by level.
pub fn shape_for(kind: HazardKind, feature: &HazardFeature) -> OverlayShape {
    match (feature.geometry_kind, kind) {
        (GeometryKind::Polygon, _) => OverlayShape::Polygon(feature.coordinates.clone()),
        (GeometryKind::Point, HazardKind::Landslide | HazardKind::Fire) => {
            OverlayShape::Polygon(diamond(feature.anchor(), diamond_half_size(feature.risk_level)))
        }
        (GeometryKind::Point, _) => OverlayShape::Point(feature.anchor()),
    }
}

pub fn indicator_style() -> OverlayStyle {
    OverlayStyle {
        fill_color: INDICATOR,
        fill_opacity: 1.0,
        stroke_color: Color::rgb(0xFF, 0xFF, 0xFF),
        stroke_weight: 2.0,
        radius_px: Some(8.0),
        z_index: 10,
        pulse: None,
    }
}

pub fn diamond_half_size(level: RiskLevel) -> f64 {
    match level {
        RiskLevel::Low => 0.004,
        RiskLevel::Medium => 0.006,
        RiskLevel::High => 0.008,
        RiskLevel::Critical => 0.010,
    }
}

/// North, east, south, west vertices around `center`, `s` degrees out.
pub fn diamond(center: LatLng, s: f64) -> Vec<LatLng> {
    vec![
        LatLng::new(center.lat + s, center.lng),
        LatLng::new(center.lat, center.lng + s),
        LatLng::new(center.lat - s, center.lng),
        LatLng::new(center.lat, center.lng - s),
    ]
}

pub fn seismic_color(magnitude: f64) -> Color {
    if magnitude >= HIGH_MAGNITUDE {
        SEISMIC_STRONG
    } else if magnitude >= MEDIUM_MAGNITUDE {
        SEISMIC_MODERATE
    } else if magnitude >= LIGHT_MAGNITUDE {
        SEISMIC_LIGHT
    } else {
        SEISMIC_MINOR
    }
}

fn scale(level: RiskLevel, colors: [Color; 4]) -> Color {
    match level {
        RiskLevel::Low => colors[0],
        RiskLevel::Medium => colors[1],
        RiskLevel::High => colors[2],
        RiskLevel::Critical => colors[3],
    }
}

fn zone_style(color: Color, level: RiskLevel, pulse: PulseSpec) -> OverlayStyle {
    OverlayStyle {
        fill_color: color,
        fill_opacity: level_opacity(level),
        stroke_color: color,
        stroke_weight: 2.0,
        radius_px: None,
        z_index: 1,
        pulse: Some(pulse),
    }
}

fn level_opacity(level: RiskLevel) -> f64 {
    match level {
        RiskLevel::Low => 0.3,
        RiskLevel::Medium => 0.5,
        RiskLevel::High => 0.7,
        RiskLevel::Critical => 0.8,
    }
}
