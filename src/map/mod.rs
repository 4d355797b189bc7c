mod geometry;
mod projection;
mod renderer;

pub use projection::Viewport;
pub use renderer::{Lod, MapLayers, MapRenderer, Marker};
