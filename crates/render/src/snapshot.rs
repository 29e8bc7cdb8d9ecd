//! PNG output of a [`Raster`].
//!
//! Feature-gated behind `png` (default on) so the raster can be used
//! without pulling in the `image` crate.

use crate::raster::Raster;
use flowfield_core::FlowError;
use std::path::Path;

/// Writes the raster as an RGBA PNG.
///
/// Returns `FlowError::InvalidDimensions` if a side overflows `u32`, or
/// `FlowError::Io` on encode or write failure.
pub fn write_png(raster: &Raster, path: &Path) -> Result<(), FlowError> {
    let w = u32::try_from(raster.width()).map_err(|_| FlowError::InvalidDimensions)?;
    let h = u32::try_from(raster.height()).map_err(|_| FlowError::InvalidDimensions)?;
    let img = image::RgbaImage::from_raw(w, h, raster.to_rgba8())
        .ok_or_else(|| FlowError::Io("RGBA buffer size mismatch".into()))?;
    img.save(path)
        .map_err(|e| FlowError::Io(format!("{}: {e}", path.display())))?;
    tracing::debug!(path = %path.display(), width = w, height = h, "wrote snapshot");
    Ok(())
}
