//! Surface export to PNG bytes and data URLs.

use base64::Engine;

use crate::error::{RenderError, RenderResult};
use crate::surface::Surface;

/// Encode a surface as PNG.
///
/// # Errors
///
/// Returns [`RenderError::Export`] if encoding fails.
pub fn to_png(surface: &Surface) -> RenderResult<Vec<u8>> {
    surface
        .pixmap()
        .encode_png()
        .map_err(|e| RenderError::Export(format!("PNG encoding failed: {e}")))
}

/// Encode a surface as a `data:image/png;base64,...` URL.
///
/// # Errors
///
/// Returns [`RenderError::Export`] if encoding fails.
pub fn to_data_url(surface: &Surface) -> RenderResult<String> {
    let png = to_png(surface)?;
    let encoded = base64::engine::general_purpose::STANDARD.encode(png);
    Ok(format!("data:image/png;base64,{encoded}"))
}
