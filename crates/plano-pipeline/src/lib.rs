//! plano-pipeline: Pure document scanning pipeline (sans-IO).
//!
//! Extracts a document-shaped region from a photographed scene and
//! rectifies it into a flat, enhanced scan:
//! downscale -> edge map -> contour tracing -> quadrilateral
//! selection -> corner ordering -> perspective warp -> enhancement.
//!
//! This crate has **no I/O dependencies** -- it operates on in-memory
//! image buffers and returns structured data. Decoding uploaded bytes
//! into buffers and encoding results back out belong to callers.
//!
//! The low-level primitives (bilinear [`resample`], Gaussian [`blur`],
//! Bresenham [`raster`]) are also exposed standalone for simple
//! effects and diagnostic overlays.

pub mod blur;
pub mod detect;
pub mod diagnostics;
pub mod effects;
pub mod enhance;
pub mod morph;
pub mod preprocess;
pub mod raster;
pub mod rectify;
pub mod resample;
pub mod simplify;
pub mod types;

pub use effects::Effect;
pub use enhance::EnhancePolicy;
pub use types::{
    Dimensions, GrayImage, PipelineError, Point, Polygon, Quad, RgbImage, ScanConfig, ScanResult,
    StagedScan,
};

/// Run the full scanning pipeline: detect the document boundary,
/// rectify it, and apply scan cleanup.
///
/// # Errors
///
/// Returns [`PipelineError::InvalidImage`] for a zero-dimension input,
/// [`PipelineError::DocumentNotFound`] when no traced contour
/// simplifies to a quadrilateral, and
/// [`PipelineError::DegenerateGeometry`] when the detected
/// quadrilateral cannot be rectified.
pub fn process(image: &RgbImage, config: &ScanConfig) -> Result<ScanResult, PipelineError> {
    let staged = process_staged(image, config)?;
    Ok(ScanResult {
        scan: staged.scan,
        quad: staged.quad,
        dimensions: staged.dimensions,
    })
}

/// Run the full pipeline, preserving every intermediate stage output.
///
/// # Errors
///
/// Fails under the same conditions as [`process`].
pub fn process_staged(image: &RgbImage, config: &ScanConfig) -> Result<StagedScan, PipelineError> {
    diagnostics::process_staged_with_diagnostics(image, config, &diagnostics::NullClock)
        .map(|(staged, _)| staged)
}

/// Detect the document boundary quadrilateral in original image
/// coordinates, without rectifying.
///
/// # Errors
///
/// Returns [`PipelineError::InvalidImage`] for a zero-dimension input
/// and [`PipelineError::DocumentNotFound`] when no traced contour
/// simplifies to a quadrilateral.
pub fn detect_document(image: &RgbImage, config: &ScanConfig) -> Result<Quad, PipelineError> {
    if image.width() == 0 || image.height() == 0 {
        return Err(PipelineError::InvalidImage);
    }
    let (working, ratio) = resample::resize_to_height(image, config.working_height)?;
    let edges = preprocess::edge_map(&working, config)?;
    let contours = detect::trace_contours(&edges);
    let corners = detect::select_document(&contours, config.approx_ratio)
        .ok_or(PipelineError::DocumentNotFound)?;
    Ok(rectify::order_points(corners.map(|p| p.scaled(ratio))))
}

/// Detect the document boundary and warp it onto an axis-aligned
/// rectangle, without enhancement.
///
/// # Errors
///
/// Fails under the same conditions as [`process`].
pub fn detect_and_rectify(
    image: &RgbImage,
    config: &ScanConfig,
) -> Result<RgbImage, PipelineError> {
    let quad = detect_document(image, config)?;
    rectify::warp_quad(image, quad)
}
