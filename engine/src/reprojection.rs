use std::mem;

use glam::{Mat4, UVec3, Vec4};
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::api::CloudError;
use crate::buffer::ColorBuffer;
use crate::compute::{ComputeDevice, DispatchGrid};
use crate::march::PIXEL_WORKGROUP;
use crate::params::{ParamKind, ParameterSink};

/// Length of the jitter cycle driven by the frame index.
pub const REPROJECTION_CYCLE: u32 = 16;
pub const MAX_HISTORY_BLEND: f32 = 0.95;

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ReprojectionParams {
    pub enabled: bool,
    /// Weight of the previous composite in the blended output.
    pub history_blend: f32,
}

impl Default for ReprojectionParams {
    fn default() -> Self {
        Self { enabled: true, history_blend: 0.75 }
    }
}

impl ReprojectionParams {
    pub fn sanitized(&self) -> Self {
        Self { history_blend: self.history_blend.clamp(0.0, MAX_HISTORY_BLEND), ..*self }
    }

    pub fn validate(&self) -> Result<(), CloudError> {
        if !(0.0..=MAX_HISTORY_BLEND).contains(&self.history_blend) {
            return Err(CloudError::InvalidConfig(format!(
                "reprojection.history_blend must be within [0, {MAX_HISTORY_BLEND}], got {}",
                self.history_blend
            )));
        }
        Ok(())
    }

    pub fn push(&self, sink: &mut dyn ParameterSink) -> Result<(), CloudError> {
        sink.set_bool("useReprojection", self.enabled)?;
        sink.set_scalar("historyWeight", self.history_blend)?;
        Ok(())
    }
}

const COMPOSITE_PARAMETERS: &[(&str, ParamKind)] =
    &[("useReprojection", ParamKind::Bool), ("historyWeight", ParamKind::Scalar)];

/// Parameter block of the full-screen composite pass.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CompositeUniforms {
    pub use_reprojection: bool,
    pub history_weight: f32,
}

impl Default for CompositeUniforms {
    fn default() -> Self {
        let params = ReprojectionParams::default();
        Self { use_reprojection: params.enabled, history_weight: params.history_blend }
    }
}

impl ParameterSink for CompositeUniforms {
    fn program(&self) -> &'static str {
        "composite"
    }

    fn declared(&self) -> &'static [(&'static str, ParamKind)] {
        COMPOSITE_PARAMETERS
    }

    fn set_scalar(&mut self, name: &str, value: f32) -> Result<(), CloudError> {
        match name {
            "historyWeight" => self.history_weight = value,
            _ => return Err(self.reject(name, ParamKind::Scalar)),
        }
        Ok(())
    }

    fn set_bool(&mut self, name: &str, value: bool) -> Result<(), CloudError> {
        match name {
            "useReprojection" => self.use_reprojection = value,
            _ => return Err(self.reject(name, ParamKind::Bool)),
        }
        Ok(())
    }
}

/// Frame index and previous composite of the temporal accumulation.
///
/// `history` is only ever replaced as a whole by [`ReprojectionState::composite`],
/// so it always holds exactly the last presented composite.
#[derive(Debug)]
pub struct ReprojectionState {
    index: u32,
    history: ColorBuffer,
    scratch: ColorBuffer,
    history_valid: bool,
    last_view_projection: Option<Mat4>,
    composites: u64,
}

impl ReprojectionState {
    pub fn new(width: u32, height: u32) -> Self {
        Self {
            index: 0,
            history: ColorBuffer::new(width, height, Vec4::ZERO),
            scratch: ColorBuffer::new(width, height, Vec4::ZERO),
            history_valid: false,
            last_view_projection: None,
            composites: 0,
        }
    }

    pub fn index(&self) -> u32 {
        self.index
    }

    pub fn history(&self) -> &ColorBuffer {
        &self.history
    }

    pub fn history_valid(&self) -> bool {
        self.history_valid
    }

    pub fn composites(&self) -> u64 {
        self.composites
    }

    /// Moves to the next frame of the jitter cycle.
    pub fn advance(&mut self) {
        self.index = (self.index + 1) % REPROJECTION_CYCLE;
    }

    /// Pushes the per-frame jitter state to the ray-march program.
    pub fn push_frame(&self, sink: &mut dyn ParameterSink, enabled: bool) -> Result<(), CloudError> {
        sink.set_int("reprojIdx", self.index as i32)?;
        sink.set_bool("useReprojection", enabled)?;
        Ok(())
    }

    pub fn invalidate(&mut self, reason: &str) {
        if self.history_valid {
            debug!(reason, "reprojection history discarded");
        }
        self.history_valid = false;
    }

    /// History without motion vectors is only reusable while the camera holds still.
    pub fn observe_view_projection(&mut self, view_projection: Mat4) {
        if self.last_view_projection != Some(view_projection) {
            if self.last_view_projection.is_some() {
                self.invalidate("camera moved");
            }
            self.last_view_projection = Some(view_projection);
        }
    }

    pub fn resize(&mut self, width: u32, height: u32) {
        if self.history.resize(width, height, Vec4::ZERO) {
            info!(width, height, "reprojection target resized");
            self.invalidate("resized");
        }
        self.scratch.resize(width, height, Vec4::ZERO);
    }

    /// Frame presented without accumulation; the next composite starts over.
    pub fn bypass(&mut self) {
        self.invalidate("reprojection disabled");
    }

    /// Blends `fresh` over the stored history on `device` and makes the result the
    /// new history. Without valid history the fresh frame passes through as is.
    pub fn composite<D: ComputeDevice>(
        &mut self,
        device: &D,
        fresh: &ColorBuffer,
        uniforms: &CompositeUniforms,
    ) -> Result<&ColorBuffer, CloudError> {
        if fresh.size() != self.history.size() {
            self.resize(fresh.width(), fresh.height());
        }
        let weight = if self.history_valid && uniforms.use_reprojection {
            uniforms.history_weight.clamp(0.0, MAX_HISTORY_BLEND)
        } else {
            0.0
        };
        let width = fresh.width() as usize;
        let extent = UVec3::new(fresh.width(), fresh.height(), 1);
        let previous = &self.history.pixels;
        let current = &fresh.pixels;
        device
            .dispatch(DispatchGrid::covering(extent, PIXEL_WORKGROUP), extent, &mut self.scratch.pixels, |id| {
                let i = id.y as usize * width + id.x as usize;
                current[i] * (1.0 - weight) + previous[i] * weight
            })?
            .barrier();
        mem::swap(&mut self.history, &mut self.scratch);
        self.history_valid = true;
        self.composites += 1;
        Ok(&self.history)
    }
}
