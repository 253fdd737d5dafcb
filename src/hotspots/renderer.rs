use std::{fmt, slice};

use chrono::Local;
use serde::Serialize;

use crate::geolocation::Coordinates;

use super::normalizer::NormalizedHotspot;

/// Hotspots below this confidence are left off the map entirely.
pub const VISIBILITY_THRESHOLD: f64 = 0.35;

const MIN_RADIUS_PX: f64 = 10.0;
const RADIUS_SPAN_PX: f64 = 20.0;
const MIN_FILL_OPACITY: f64 = 0.25;
const FILL_OPACITY_SPAN: f64 = 0.5;
const MIN_STROKE_ALPHA: f64 = 0.4;
const STROKE_ALPHA_SPAN: f64 = 0.5;

const STROKE_RGB: (u8, u8, u8) = (220, 38, 38);
const FILL_RGB: (u8, u8, u8) = (239, 68, 68);

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct Rgba {
    pub r: u8,
    pub g: u8,
    pub b: u8,
    pub a: f64,
}

impl Rgba {
    fn from_rgb((r, g, b): (u8, u8, u8), a: f64) -> Self {
        Self { r, g, b, a }
    }
}

impl fmt::Display for Rgba {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "rgba({}, {}, {}, {})", self.r, self.g, self.b, self.a)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum ConfidenceLevel {
    VeryLow,
    Low,
    Medium,
    High,
}

impl ConfidenceLevel {
    /// Display bucket. Shares the 0.35 edge with visibility but is computed separately,
    /// so hidden hotspots still get a label.
    pub fn from_confidence(confidence: f64) -> Self {
        if confidence < 0.35 {
            ConfidenceLevel::VeryLow
        } else if confidence < 0.6 {
            ConfidenceLevel::Low
        } else if confidence < 0.85 {
            ConfidenceLevel::Medium
        } else {
            ConfidenceLevel::High
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            ConfidenceLevel::VeryLow => "Very Low",
            ConfidenceLevel::Low => "Low",
            ConfidenceLevel::Medium => "Medium",
            ConfidenceLevel::High => "High",
        }
    }
}

impl fmt::Display for ConfidenceLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

fn unit(confidence: f64) -> f64 {
    confidence.clamp(0.0, 1.0)
}

pub fn is_visible(confidence: f64) -> bool {
    confidence >= VISIBILITY_THRESHOLD
}

pub fn radius_px(confidence: f64) -> f64 {
    MIN_RADIUS_PX + unit(confidence) * RADIUS_SPAN_PX
}

pub fn fill_opacity(confidence: f64) -> f64 {
    MIN_FILL_OPACITY + unit(confidence) * FILL_OPACITY_SPAN
}

pub fn stroke_alpha(confidence: f64) -> f64 {
    (MIN_STROKE_ALPHA + unit(confidence) * STROKE_ALPHA_SPAN).min(1.0)
}

/// Circle-marker parameters for one hotspot.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct VisualHotspot {
    pub position: Coordinates,
    pub radius_px: f64,
    pub stroke_color: Rgba,
    pub fill_color: Rgba,
    pub fill_opacity: f64,
    pub visible: bool,
    pub level: ConfidenceLevel,
}

impl VisualHotspot {
    pub fn from_hotspot(hotspot: &NormalizedHotspot) -> Self {
        let confidence = hotspot.confidence;
        let fill_opacity = fill_opacity(confidence);
        Self {
            position: Coordinates::new(hotspot.lat, hotspot.lng),
            radius_px: radius_px(confidence),
            stroke_color: Rgba::from_rgb(STROKE_RGB, stroke_alpha(confidence)),
            fill_color: Rgba::from_rgb(FILL_RGB, fill_opacity),
            fill_opacity,
            visible: is_visible(confidence),
            level: ConfidenceLevel::from_confidence(confidence),
        }
    }
}

/// Visible hotspots of one fetch, computed lazily. Clone it to walk the set again.
#[derive(Clone)]
pub struct RenderedHotspots<'a> {
    inner: slice::Iter<'a, NormalizedHotspot>,
}

impl<'a> Iterator for RenderedHotspots<'a> {
    type Item = VisualHotspot;

    fn next(&mut self) -> Option<Self::Item> {
        self.next_visible().map(VisualHotspot::from_hotspot)
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        (0, self.inner.size_hint().1)
    }
}

impl<'a> RenderedHotspots<'a> {
    fn next_visible(&mut self) -> Option<&'a NormalizedHotspot> {
        self.inner
            .by_ref()
            .find(|hotspot| is_visible(hotspot.confidence))
    }

    /// Same circles, each paired with its popup text.
    pub fn with_popups(mut self) -> impl Iterator<Item = (VisualHotspot, HotspotPopup)> + 'a {
        std::iter::from_fn(move || {
            self.next_visible().map(|hotspot| {
                (
                    VisualHotspot::from_hotspot(hotspot),
                    HotspotPopup::for_hotspot(hotspot),
                )
            })
        })
    }
}

pub fn render(hotspots: &[NormalizedHotspot]) -> RenderedHotspots<'_> {
    RenderedHotspots {
        inner: hotspots.iter(),
    }
}

/// Text for the marker popup.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct HotspotPopup {
    pub level: &'static str,
    pub confidence: String,
    pub hazard_type: Option<String>,
    pub status: Option<String>,
    pub reported_at: Option<String>,
}

impl HotspotPopup {
    pub fn for_hotspot(hotspot: &NormalizedHotspot) -> Self {
        let confidence = unit(hotspot.confidence);
        Self {
            level: ConfidenceLevel::from_confidence(confidence).label(),
            confidence: format!("{:.0}%", confidence * 100.0),
            hazard_type: hotspot.hazard_type.clone(),
            status: hotspot.status.clone(),
            reported_at: hotspot.created_at.map(|created_at| {
                created_at
                    .with_timezone(&Local)
                    .format("%Y-%m-%d %H:%M")
                    .to_string()
            }),
        }
    }
}

/// The map widget hotspots are drawn onto.
pub trait MapCanvas {
    fn draw_circle(&mut self, hotspot: &VisualHotspot, popup: &HotspotPopup);
}

/// Draws every visible hotspot and returns how many were drawn.
pub fn draw_hotspots(hotspots: &[NormalizedHotspot], canvas: &mut dyn MapCanvas) -> usize {
    let mut drawn = 0;
    for (visual, popup) in render(hotspots).with_popups() {
        canvas.draw_circle(&visual, &popup);
        drawn += 1;
    }
    drawn
}
