//! Frame buffers, clip rasterization, media decoding and layer compositing.

pub mod compositor;
pub(crate) mod decode;
pub mod frame;
pub(crate) mod raster;
pub mod surface;
