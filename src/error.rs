use thiserror::Error;

/// Top-level error type for the Gravure engraving kernel.
#[derive(Debug, Error)]
pub enum GravureError {
    #[error(transparent)]
    Asset(#[from] AssetError),

    #[error(transparent)]
    Trace(#[from] TraceError),

    #[error(transparent)]
    Extrude(#[from] ExtrudeError),

    #[error(transparent)]
    Boolean(#[from] BooleanError),

    #[error(transparent)]
    Raycast(#[from] RaycastError),
}

/// Errors related to uploaded payloads and font data.
#[derive(Debug, Error)]
pub enum AssetError {
    #[error("unsupported file type: {declared}")]
    UnsupportedFileType { declared: String },

    #[error("asset could not be decoded: {0}")]
    LoadFailure(String),

    #[error("font data could not be parsed")]
    FontLoadFailure,
}

/// Errors related to raster-to-vector tracing and vector parsing.
#[derive(Debug, Error)]
pub enum TraceError {
    #[error("pixel buffer has {actual} bytes, expected {expected} for {width}x{height} RGBA")]
    DimensionMismatch {
        width: u32,
        height: u32,
        expected: usize,
        actual: usize,
    },

    #[error("vector trace produced no closed contours")]
    EmptyTraceResult,

    #[error("SVG path data could not be parsed: {0}")]
    SvgParse(String),
}

/// Errors related to path extrusion.
#[derive(Debug, Error)]
pub enum ExtrudeError {
    #[error("cannot extrude an empty path set")]
    EmptyPathSet,

    #[error("extrusion depth must be positive, got {0}")]
    InvalidDepth(f64),

    #[error("degenerate path: {0}")]
    DegeneratePath(String),

    #[error("cap triangulation failed: {0}")]
    Triangulation(String),
}

/// Errors related to boolean evaluation.
///
/// Any of these means the prior base solid must be retained by the caller;
/// partial results are never returned.
#[derive(Debug, Error)]
pub enum BooleanError {
    #[error("tool solid has zero surface area")]
    ZeroAreaTool,

    #[error("tool solid is degenerate: {0}")]
    DegenerateTool(String),

    #[error("boolean evaluation produced a non-manifold result")]
    NonManifoldResult,

    #[error("boolean evaluation failed: {0}")]
    EvaluationFailure(String),
}

/// Errors related to pointer raycasting.
#[derive(Debug, Error)]
pub enum RaycastError {
    #[error("camera view-projection matrix is not invertible")]
    NonInvertibleCamera,
}

/// Convenience type alias for results using [`GravureError`].
pub type Result<T> = std::result::Result<T, GravureError>;
