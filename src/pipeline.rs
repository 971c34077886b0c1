use tracing::{debug, warn};

use crate::asset::{decode_rgba, MimeType};
use crate::boolean::{BooleanBackend, BooleanOp, BspEvaluator};
use crate::error::{AssetError, GravureError, Result};
use crate::extrude::{
    center_on_face, ExtrudePaths, PlacementParams, TypesetText, LOGO_MAX_SIZE, TEXT_MAX_SIZE,
};
use crate::path::Path;
use crate::solid::Solid;
use crate::trace::{ParseSvgPaths, TraceParams, TraceRaster};

/// Engraving depth cut into the target face.
pub const ENGRAVE_DEPTH: f64 = 0.3;

/// Default offset of the engraved face along Y (the underside of the
/// standard blank).
pub const FACE_OFFSET: f64 = -0.7;

/// Em size text is laid out at before placement rescales it.
const TEXT_EM_SIZE: f64 = 1.0;

/// What gets engraved.
#[derive(Debug, Clone)]
pub enum EngravingPayload {
    /// A single line of text, typeset with the configured font.
    Text(String),
    /// Logo bytes with their validated type.
    Logo { bytes: Vec<u8>, mime: MimeType },
}

/// Monotonic ticket identifying one engraving request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub struct RequestId(u64);

/// An engraving request issued by [`EngravingTarget::begin`].
#[derive(Debug, Clone)]
pub struct EngravingRequest {
    pub id: RequestId,
    pub payload: EngravingPayload,
    pub depth: f64,
}

/// Result of running one request through the pipeline.
#[derive(Debug)]
pub enum EngravingOutcome {
    /// The engraved solid, ready to replace the displayed mesh.
    Applied(Solid),
    /// The payload produced no usable cut; show the plain base.
    FallbackBase,
}

/// Vectorize → extrude → place → subtract, with the fallback policy
/// applied: geometry failures degrade to the plain base, payload failures
/// surface as errors so the caller keeps its previous state.
pub struct EngravingPipeline {
    trace: TraceParams,
    backend: Box<dyn BooleanBackend>,
}

impl Default for EngravingPipeline {
    fn default() -> Self {
        Self {
            trace: TraceParams::default(),
            backend: Box::new(BspEvaluator),
        }
    }
}

impl EngravingPipeline {
    #[must_use]
    pub fn new(trace: TraceParams, backend: Box<dyn BooleanBackend>) -> Self {
        Self { trace, backend }
    }

    /// Runs one request against `base`.
    ///
    /// # Errors
    ///
    /// Returns asset and font errors (undecodable payloads, missing or
    /// unparsable fonts). Geometry failures do not error; they come back as
    /// [`EngravingOutcome::FallbackBase`].
    pub fn generate(
        &self,
        base: &Solid,
        request: &EngravingRequest,
        font: Option<&[u8]>,
    ) -> Result<EngravingOutcome> {
        let (paths, max_size) = match &request.payload {
            EngravingPayload::Text(text) => {
                let font = font.ok_or(AssetError::FontLoadFailure)?;
                let paths = TypesetText::new(text, font, TEXT_EM_SIZE).execute()?;
                (paths, TEXT_MAX_SIZE)
            }
            EngravingPayload::Logo { bytes, mime } => {
                (self.logo_paths(bytes, *mime)?, LOGO_MAX_SIZE)
            }
        };

        if paths.is_empty() {
            debug!("payload produced no outlines, showing plain base");
            return Ok(EngravingOutcome::FallbackBase);
        }

        let placement = PlacementParams {
            max_size,
            face_offset: FACE_OFFSET,
        };
        match self.cut(base, paths, request.depth, &placement) {
            Ok(solid) => Ok(EngravingOutcome::Applied(solid)),
            Err(GravureError::Boolean(e)) => {
                warn!(error = %e, "boolean evaluation failed, showing plain base");
                Ok(EngravingOutcome::FallbackBase)
            }
            Err(GravureError::Extrude(e)) => {
                warn!(error = %e, "extrusion failed, showing plain base");
                Ok(EngravingOutcome::FallbackBase)
            }
            Err(e) => Err(e),
        }
    }

    /// Vectorizes a logo payload: SVG outlines are parsed directly, raster
    /// formats are decoded and traced.
    fn logo_paths(&self, bytes: &[u8], mime: MimeType) -> Result<Vec<Path>> {
        if mime.is_vector() {
            let svg = std::str::from_utf8(bytes)
                .map_err(|e| AssetError::LoadFailure(format!("svg is not valid utf-8: {e}")))?;
            return ParseSvgPaths::new(svg, self.trace.tolerance).execute();
        }
        let (width, height, pixels) = decode_rgba(bytes, mime)?;
        TraceRaster::new(&pixels, width, height, self.trace).execute()
    }

    fn cut(
        &self,
        base: &Solid,
        paths: Vec<Path>,
        depth: f64,
        placement: &PlacementParams,
    ) -> Result<Solid> {
        let mut tool = ExtrudePaths::new(paths, depth).execute()?;
        center_on_face(&mut tool, placement);
        let result = self
            .backend
            .evaluate(base, &tool, BooleanOp::Subtraction)?;
        Ok(result)
    }
}

/// How a completed request affected the target.
#[derive(Debug)]
pub enum Completion {
    /// The engraved solid was installed; `replaced` is the mesh it
    /// displaced, handed back so its GPU resources can be released.
    Applied { replaced: Option<Solid> },
    /// The plain base is showing again.
    FallbackBase { replaced: Option<Solid> },
    /// A newer request superseded this one; its result was dropped.
    Discarded,
    /// The request failed; the previous visual state is untouched.
    Failed(GravureError),
}

/// Visual state of an engraving target.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TargetState {
    /// No request has ever been issued; plain base.
    Idle,
    /// The latest request is still in flight.
    Generating,
    /// An engraved solid is displayed.
    Applied,
    /// The latest request degraded to the plain base.
    FallbackBase,
}

/// The engraving target: owns the base solid, the currently applied result,
/// and the request ticketing that keeps stale results from clobbering newer
/// ones.
#[derive(Debug)]
pub struct EngravingTarget {
    base: Solid,
    applied: Option<Solid>,
    next_id: u64,
    latest: Option<RequestId>,
    state: TargetState,
}

impl EngravingTarget {
    #[must_use]
    pub fn new(base: Solid) -> Self {
        Self {
            base,
            applied: None,
            next_id: 0,
            latest: None,
            state: TargetState::Idle,
        }
    }

    #[must_use]
    pub fn state(&self) -> TargetState {
        self.state
    }

    #[must_use]
    pub fn base(&self) -> &Solid {
        &self.base
    }

    /// The mesh to render right now.
    #[must_use]
    pub fn displayed(&self) -> &Solid {
        self.applied.as_ref().unwrap_or(&self.base)
    }

    /// Issues a ticket for a new engraving request. Each call supersedes
    /// all earlier tickets.
    pub fn begin(&mut self, payload: EngravingPayload, depth: f64) -> EngravingRequest {
        let id = RequestId(self.next_id);
        self.next_id += 1;
        self.latest = Some(id);
        self.state = TargetState::Generating;
        EngravingRequest { id, payload, depth }
    }

    /// Applies the result of a finished request. Last request wins: results
    /// for superseded tickets are discarded regardless of outcome.
    pub fn complete(&mut self, id: RequestId, result: Result<EngravingOutcome>) -> Completion {
        if self.latest != Some(id) {
            debug!(?id, "stale engraving result discarded");
            return Completion::Discarded;
        }
        match result {
            Ok(EngravingOutcome::Applied(solid)) => {
                self.state = TargetState::Applied;
                Completion::Applied {
                    replaced: self.applied.replace(solid),
                }
            }
            Ok(EngravingOutcome::FallbackBase) => {
                self.state = TargetState::FallbackBase;
                Completion::FallbackBase {
                    replaced: self.applied.take(),
                }
            }
            Err(e) => {
                // Prior visual state stays in place.
                self.state = if self.applied.is_some() {
                    TargetState::Applied
                } else {
                    TargetState::Idle
                };
                Completion::Failed(e)
            }
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::creation::MakePrism;

    fn prism() -> Solid {
        MakePrism::new(2.1, 1.4, 6).execute().unwrap()
    }

    /// Captures pipeline log output in the test harness.
    fn init_tracing() {
        let _ = tracing_subscriber::fmt().with_test_writer().try_init();
    }

    /// Encodes a PNG: a black square centered on a white field.
    fn black_square_png() -> Vec<u8> {
        let mut img = image::RgbaImage::from_pixel(32, 32, image::Rgba([255, 255, 255, 255]));
        for y in 8..24 {
            for x in 8..24 {
                img.put_pixel(x, y, image::Rgba([0, 0, 0, 255]));
            }
        }
        let mut bytes = std::io::Cursor::new(Vec::new());
        img.write_to(&mut bytes, image::ImageFormat::Png).unwrap();
        bytes.into_inner()
    }

    fn logo_request(target: &mut EngravingTarget) -> EngravingRequest {
        target.begin(
            EngravingPayload::Logo {
                bytes: black_square_png(),
                mime: MimeType::Png,
            },
            ENGRAVE_DEPTH,
        )
    }

    #[test]
    fn logo_engraving_end_to_end() {
        let pipeline = EngravingPipeline::default();
        let mut target = EngravingTarget::new(prism());
        let request = logo_request(&mut target);

        let outcome = pipeline.generate(target.base(), &request, None).unwrap();
        let EngravingOutcome::Applied(engraved) = outcome else {
            panic!("expected an applied engraving");
        };
        assert!(engraved.is_watertight());
        assert!(engraved.volume() < target.base().volume());

        let completion = target.complete(request.id, Ok(EngravingOutcome::Applied(engraved)));
        assert!(matches!(completion, Completion::Applied { replaced: None }));
        assert!(target.displayed().volume() < target.base().volume());
    }

    #[test]
    fn empty_text_falls_back_to_base() {
        init_tracing();
        let pipeline = EngravingPipeline::default();
        let font = crate::extrude::metrics_only_font();
        let mut target = EngravingTarget::new(prism());
        let request = target.begin(EngravingPayload::Text(String::new()), ENGRAVE_DEPTH);

        let outcome = pipeline
            .generate(target.base(), &request, Some(&font))
            .unwrap();
        assert!(matches!(outcome, EngravingOutcome::FallbackBase));

        let completion = target.complete(request.id, Ok(outcome));
        assert!(matches!(completion, Completion::FallbackBase { .. }));
        assert_eq!(target.state(), TargetState::FallbackBase);
    }

    #[test]
    fn blank_image_falls_back_to_base() {
        init_tracing();
        let pipeline = EngravingPipeline::default();
        let mut img = std::io::Cursor::new(Vec::new());
        image::RgbaImage::from_pixel(16, 16, image::Rgba([255, 255, 255, 255]))
            .write_to(&mut img, image::ImageFormat::Png)
            .unwrap();

        let mut target = EngravingTarget::new(prism());
        let request = target.begin(
            EngravingPayload::Logo {
                bytes: img.into_inner(),
                mime: MimeType::Png,
            },
            ENGRAVE_DEPTH,
        );
        let outcome = pipeline.generate(target.base(), &request, None).unwrap();
        assert!(matches!(outcome, EngravingOutcome::FallbackBase));
    }

    #[test]
    fn text_without_font_is_an_error() {
        let pipeline = EngravingPipeline::default();
        let target = EngravingTarget::new(prism());
        let request = EngravingRequest {
            id: RequestId(0),
            payload: EngravingPayload::Text("hello".into()),
            depth: ENGRAVE_DEPTH,
        };
        assert!(pipeline.generate(target.base(), &request, None).is_err());
    }

    #[test]
    fn undecodable_logo_is_an_error() {
        let pipeline = EngravingPipeline::default();
        let target = EngravingTarget::new(prism());
        let request = EngravingRequest {
            id: RequestId(0),
            payload: EngravingPayload::Logo {
                bytes: b"not an image".to_vec(),
                mime: MimeType::Png,
            },
            depth: ENGRAVE_DEPTH,
        };
        assert!(pipeline.generate(target.base(), &request, None).is_err());
    }

    #[test]
    fn svg_logo_is_parsed_without_tracing() {
        let pipeline = EngravingPipeline::default();
        let target = EngravingTarget::new(prism());
        let svg = r#"<svg><path d="M0 0 L40 0 L40 40 L0 40 Z"/></svg>"#;
        let request = EngravingRequest {
            id: RequestId(0),
            payload: EngravingPayload::Logo {
                bytes: svg.as_bytes().to_vec(),
                mime: MimeType::Svg,
            },
            depth: ENGRAVE_DEPTH,
        };
        let outcome = pipeline.generate(target.base(), &request, None).unwrap();
        assert!(matches!(outcome, EngravingOutcome::Applied(_)));
    }

    #[test]
    fn stale_completion_is_discarded() {
        let mut target = EngravingTarget::new(prism());
        let first = logo_request(&mut target);
        let second = logo_request(&mut target);

        // First result arrives after the second request was issued.
        let stale = target.complete(first.id, Ok(EngravingOutcome::FallbackBase));
        assert!(matches!(stale, Completion::Discarded));

        let current = target.complete(second.id, Ok(EngravingOutcome::FallbackBase));
        assert!(matches!(current, Completion::FallbackBase { .. }));
    }

    #[test]
    fn fallback_after_applied_returns_old_mesh_for_disposal() {
        let mut target = EngravingTarget::new(prism());
        let first = logo_request(&mut target);
        let completion = target.complete(first.id, Ok(EngravingOutcome::Applied(prism())));
        assert!(matches!(completion, Completion::Applied { replaced: None }));

        let second = logo_request(&mut target);
        let completion = target.complete(second.id, Ok(EngravingOutcome::FallbackBase));
        let Completion::FallbackBase { replaced } = completion else {
            panic!("expected fallback");
        };
        assert!(replaced.is_some(), "old engraving handed back for disposal");
        assert_eq!(
            target.displayed().indices.len(),
            target.base().indices.len()
        );
    }

    #[test]
    fn state_machine_transitions() {
        let mut target = EngravingTarget::new(prism());
        assert_eq!(target.state(), TargetState::Idle);

        let request = logo_request(&mut target);
        assert_eq!(target.state(), TargetState::Generating);

        target.complete(request.id, Ok(EngravingOutcome::Applied(prism())));
        assert_eq!(target.state(), TargetState::Applied);

        let request = logo_request(&mut target);
        target.complete(request.id, Ok(EngravingOutcome::FallbackBase));
        assert_eq!(target.state(), TargetState::FallbackBase);
    }

    #[test]
    fn failed_request_keeps_previous_state() {
        let mut target = EngravingTarget::new(prism());
        let first = logo_request(&mut target);
        target.complete(first.id, Ok(EngravingOutcome::Applied(prism())));

        let second = logo_request(&mut target);
        let completion = target.complete(
            second.id,
            Err(AssetError::FontLoadFailure.into()),
        );
        assert!(matches!(completion, Completion::Failed(_)));
        assert!(!target.displayed().is_empty());
    }
}
