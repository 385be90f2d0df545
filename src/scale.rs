//! Preview scale derived from an observed container width

use crate::LOGICAL_WIDTH;

/// Scale used before the container has been laid out.
///
/// Only ever shown in the interactive preview; capture never reads it.
pub const DEFAULT_PREVIEW_SCALE: f64 = 0.25;

/// `container_width / LOGICAL_WIDTH`, or [`DEFAULT_PREVIEW_SCALE`] when the
/// width is zero, negative or not a number.
pub fn scale_for_width(container_width: f64) -> f64 {
    if container_width.is_finite() && container_width > 0.0 {
        container_width / LOGICAL_WIDTH as f64
    } else {
        DEFAULT_PREVIEW_SCALE
    }
}

/// Holds the last observed container width and derives the scale on demand.
///
/// The layout layer calls [`observe`](Self::observe) once at mount and again
/// from its resize callback; the scale is pulled, never cached.
#[derive(Debug, Clone, Default)]
pub struct ScaleCalculator {
    observed_width: Option<f64>,
}

impl ScaleCalculator {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record the container's current width and return the resulting scale.
    pub fn observe(&mut self, container_width: f64) -> f64 {
        self.observed_width = Some(container_width);
        self.scale()
    }

    pub fn observed_width(&self) -> Option<f64> {
        self.observed_width
    }

    pub fn scale(&self) -> f64 {
        scale_for_width(self.observed_width.unwrap_or(0.0))
    }
}
