pub mod normalizer;
pub mod renderer;

pub use normalizer::{normalize, normalize_all, NormalizedHotspot, RawHotspot};
pub use renderer::{
    draw_hotspots, render, ConfidenceLevel, HotspotPopup, MapCanvas, RenderedHotspots, Rgba,
    VisualHotspot, VISIBILITY_THRESHOLD,
};
