//=========================================================================
// Coverage Scanner
//=========================================================================
//
// Decides when enough of a raster surface has been erased.
//
// Architecture:
//   stroke → disk stamps along the segment → bitset diff → running count
//
// The scanner never rescans the surface: it keeps a bitset of erased
// pixels and a running count, incremented only for pixels that flip
// from covered to erased. Cost per stroke is proportional to stroke
// length × brush area, independent of surface size.
//
//=========================================================================

//=== External Dependencies ===============================================

use log::{debug, warn};

//=== Internal Dependencies ===============================================

use crate::core::error::{ConfigError, ConfigResult};

//=== StrokeSegment =======================================================

/// One erase stroke: a line segment in surface coordinates.
///
/// A point stroke is a segment whose endpoints coincide.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct StrokeSegment {
    pub x0: f32,
    pub y0: f32,
    pub x1: f32,
    pub y1: f32,
}

impl StrokeSegment {
    /// Builds a segment from two points.
    pub fn new(x0: f32, y0: f32, x1: f32, y1: f32) -> Self {
        Self { x0, y0, x1, y1 }
    }

    /// Builds a point stroke.
    pub fn point(x: f32, y: f32) -> Self {
        Self::new(x, y, x, y)
    }

    fn length(&self) -> f32 {
        let dx = self.x1 - self.x0;
        let dy = self.y1 - self.y0;
        (dx * dx + dy * dy).sqrt()
    }

    fn is_finite(&self) -> bool {
        self.x0.is_finite() && self.y0.is_finite() && self.x1.is_finite() && self.y1.is_finite()
    }
}

//=== CoverageConfig ======================================================

/// Configuration for a coverage-reveal surface.
#[derive(Debug, Clone, Copy)]
pub struct CoverageConfig {
    /// Logical surface width in pixels.
    pub width: u32,

    /// Logical surface height in pixels.
    pub height: u32,

    /// Fraction of the surface that must be revealed. In (0, 1).
    pub threshold: f32,
}

impl CoverageConfig {
    /// Creates a config with the reference threshold of 60%.
    pub fn new(width: u32, height: u32) -> Self {
        Self {
            width,
            height,
            threshold: 0.60,
        }
    }

    /// Overrides the completion threshold.
    pub fn with_threshold(mut self, threshold: f32) -> Self {
        self.threshold = threshold;
        self
    }

    /// Rejects invalid configurations.
    pub fn validate(&self) -> ConfigResult<()> {
        if self.width == 0 || self.height == 0 {
            return Err(ConfigError::EmptySurface {
                width: self.width,
                height: self.height,
            });
        }
        if !(self.threshold.is_finite() && self.threshold > 0.0 && self.threshold < 1.0) {
            return Err(ConfigError::InvalidThreshold {
                value: self.threshold,
                range: "(0, 1)",
            });
        }
        Ok(())
    }
}

//=== Events ==============================================================

/// Events emitted by the scanner.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum CoverageEvent {
    /// Updated revealed fraction in [0, 1]. Non-decreasing.
    Revealed(f32),

    /// The fraction first exceeded the threshold. Emitted exactly once.
    Completed,
}

//=== CoverageScanner =====================================================

/// Tracks erase strokes over a raster surface and fires once past a
/// configured revealed threshold.
///
/// `revealed_fraction` is monotonically non-decreasing for the lifetime
/// of one scanner instance: strokes only erase, never restore. Strokes
/// after completion keep erasing (the fraction keeps growing) but never
/// re-fire [`CoverageEvent::Completed`].
pub struct CoverageScanner {
    config: CoverageConfig,
    erased: Vec<u64>,
    erased_count: usize,
    total: usize,
    completed: bool,
}

impl CoverageScanner {
    //--- Construction -----------------------------------------------------

    /// Creates a fully covered scanner, rejecting invalid configuration.
    pub fn new(config: CoverageConfig) -> ConfigResult<Self> {
        config.validate()?;
        let total = config.width as usize * config.height as usize;
        Ok(Self {
            config,
            erased: vec![0u64; total.div_ceil(64)],
            erased_count: 0,
            total,
            completed: false,
        })
    }

    //--- Strokes ----------------------------------------------------------

    /// Records one erase stroke with the given brush radius.
    ///
    /// Stamps disks along the segment at half-radius spacing, counting
    /// only pixels that flip from covered to erased. A non-positive or
    /// non-finite radius, or a segment with a non-finite endpoint,
    /// erases nothing.
    pub fn record_stroke(&mut self, segment: StrokeSegment, brush_radius: f32) -> Vec<CoverageEvent> {
        if !(brush_radius.is_finite() && brush_radius > 0.0) {
            warn!("Ignoring stroke with malformed brush radius {:?}", brush_radius);
            return Vec::new();
        }
        if !segment.is_finite() {
            warn!("Ignoring stroke with non-finite endpoint {:?}", segment);
            return Vec::new();
        }

        // A segment no longer than the surface diagonal needs at most
        // this many stamps; anything asking for more is malformed input
        // and gets stamped at coarser spacing instead of hanging the
        // tick.
        let spacing = brush_radius * 0.5;
        let diagonal = ((self.config.width as f32).powi(2)
            + (self.config.height as f32).powi(2))
        .sqrt();
        let max_steps = ((diagonal / spacing).ceil().max(1.0) as usize).saturating_mul(4);
        let mut steps = (segment.length() / spacing).ceil().max(1.0) as usize;
        if steps > max_steps {
            warn!(
                "Clamping oversized stroke ({} stamps) to {}",
                steps, max_steps
            );
            steps = max_steps;
        }
        for i in 0..=steps {
            let t = i as f32 / steps as f32;
            let cx = segment.x0 + (segment.x1 - segment.x0) * t;
            let cy = segment.y0 + (segment.y1 - segment.y0) * t;
            self.stamp_disk(cx, cy, brush_radius);
        }

        let fraction = self.revealed_fraction();
        let mut out = vec![CoverageEvent::Revealed(fraction)];
        if !self.completed && fraction > self.config.threshold {
            debug!(
                "Coverage threshold crossed: {:.3} > {:.3}",
                fraction, self.config.threshold
            );
            self.completed = true;
            out.push(CoverageEvent::Completed);
        }
        out
    }

    //--- Queries ----------------------------------------------------------

    /// Fraction of the surface revealed so far, in [0, 1].
    pub fn revealed_fraction(&self) -> f32 {
        self.erased_count as f32 / self.total as f32
    }

    /// True once the threshold has been crossed.
    pub fn is_complete(&self) -> bool {
        self.completed
    }

    //--- Internal Helpers -------------------------------------------------

    fn stamp_disk(&mut self, cx: f32, cy: f32, radius: f32) {
        let width = self.config.width as i64;
        let height = self.config.height as i64;
        let r_sq = radius * radius;

        let x_min = ((cx - radius).floor() as i64).max(0);
        let x_max = ((cx + radius).ceil() as i64).min(width - 1);
        let y_min = ((cy - radius).floor() as i64).max(0);
        let y_max = ((cy + radius).ceil() as i64).min(height - 1);

        for y in y_min..=y_max {
            for x in x_min..=x_max {
                // Distance test against the pixel center.
                let dx = (x as f32 + 0.5) - cx;
                let dy = (y as f32 + 0.5) - cy;
                if dx * dx + dy * dy <= r_sq {
                    self.erase_pixel(x as usize, y as usize);
                }
            }
        }
    }

    fn erase_pixel(&mut self, x: usize, y: usize) {
        let index = y * self.config.width as usize + x;
        let word = index / 64;
        let mask = 1u64 << (index % 64);
        if self.erased[word] & mask == 0 {
            self.erased[word] |= mask;
            self.erased_count += 1;
        }
    }
}

// The bitset itself is omitted; the revealed fraction summarizes it.
impl std::fmt::Debug for CoverageScanner {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CoverageScanner")
            .field("width", &self.config.width)
            .field("height", &self.config.height)
            .field("threshold", &self.config.threshold)
            .field("revealed", &self.revealed_fraction())
            .field("completed", &self.completed)
            .finish()
    }
}

//=========================================================================
// Tests
//=========================================================================

#[cfg(test)]
mod tests {
    use super::*;

    fn scanner(width: u32, height: u32, threshold: f32) -> CoverageScanner {
        CoverageScanner::new(CoverageConfig::new(width, height).with_threshold(threshold)).unwrap()
    }

    //--- Config Validation Tests ------------------------------------------

    #[test]
    fn rejects_empty_surface() {
        let err = CoverageScanner::new(CoverageConfig::new(0, 100)).unwrap_err();
        assert_eq!(
            err,
            ConfigError::EmptySurface {
                width: 0,
                height: 100
            }
        );
    }

    #[test]
    fn rejects_out_of_range_threshold() {
        for bad in [0.0, 1.0, -0.2] {
            let cfg = CoverageConfig::new(10, 10).with_threshold(bad);
            assert!(matches!(
                CoverageScanner::new(cfg),
                Err(ConfigError::InvalidThreshold { .. })
            ));
        }
    }

    //--- Stroke Tests -----------------------------------------------------

    #[test]
    fn fresh_surface_is_fully_covered() {
        let s = scanner(10, 10, 0.6);
        assert_eq!(s.revealed_fraction(), 0.0);
        assert!(!s.is_complete());
    }

    #[test]
    fn point_stroke_erases_a_disk() {
        let mut s = scanner(100, 100, 0.99);
        let events = s.record_stroke(StrokeSegment::point(50.0, 50.0), 10.0);

        // A radius-10 disk is roughly 314 of 10000 pixels.
        let fraction = s.revealed_fraction();
        assert!(fraction > 0.025 && fraction < 0.04, "fraction {}", fraction);
        assert_eq!(events.len(), 1);
        assert!(matches!(events[0], CoverageEvent::Revealed(_)));
    }

    #[test]
    fn restroking_the_same_area_adds_nothing() {
        let mut s = scanner(100, 100, 0.99);
        s.record_stroke(StrokeSegment::point(50.0, 50.0), 10.0);
        let once = s.revealed_fraction();

        s.record_stroke(StrokeSegment::point(50.0, 50.0), 10.0);
        assert_eq!(s.revealed_fraction(), once);
    }

    #[test]
    fn fraction_is_monotonically_non_decreasing() {
        let mut s = scanner(100, 100, 0.95);
        let mut last = 0.0f32;
        for i in 0..20 {
            let x = (i * 13 % 100) as f32;
            let y = (i * 29 % 100) as f32;
            s.record_stroke(StrokeSegment::new(x, y, x + 15.0, y + 5.0), 8.0);
            let fraction = s.revealed_fraction();
            assert!(fraction >= last);
            last = fraction;
        }
    }

    #[test]
    fn malformed_radius_is_ignored() {
        let mut s = scanner(50, 50, 0.6);
        for radius in [0.0, -3.0, f32::NAN] {
            assert!(s.record_stroke(StrokeSegment::point(25.0, 25.0), radius).is_empty());
        }
        assert_eq!(s.revealed_fraction(), 0.0);
    }

    #[test]
    fn non_finite_endpoint_is_ignored() {
        let mut s = scanner(100, 100, 0.6);
        for seg in [
            StrokeSegment::new(0.0, 0.0, f32::INFINITY, 0.0),
            StrokeSegment::new(f32::NEG_INFINITY, 50.0, 50.0, 50.0),
            StrokeSegment::new(0.0, f32::NAN, 10.0, 10.0),
        ] {
            assert!(s.record_stroke(seg, 10.0).is_empty());
        }
        assert_eq!(s.revealed_fraction(), 0.0);
    }

    #[test]
    fn oversized_stroke_terminates_and_erases_its_onsurface_part() {
        let mut s = scanner(100, 100, 0.99);
        // Finite but absurdly long; must return promptly instead of
        // stamping once per half-radius along the whole length.
        let events = s.record_stroke(StrokeSegment::new(50.0, 50.0, 1.0e9, 50.0), 10.0);
        assert_eq!(events.len(), 1);
        assert!(s.revealed_fraction() > 0.0);
    }

    #[test]
    fn debug_output_summarizes_state() {
        let mut s = scanner(40, 40, 0.30);
        s.record_stroke(StrokeSegment::new(0.0, 20.0, 40.0, 20.0), 15.0);

        let text = format!("{:?}", s);
        assert!(text.contains("CoverageScanner"));
        assert!(text.contains("completed: true"));
    }

    #[test]
    fn completion_fires_exactly_once_at_first_crossing() {
        // 100×100 surface, radius 10, threshold 0.60. Horizontal band
        // strokes at y = 10, 30, 50, 70, 90 each reveal a disjoint
        // 20-row band (20% apiece): 60% after three strokes is not a
        // crossing (strictly greater required), the fourth stroke is.
        let mut s = scanner(100, 100, 0.60);
        let mut completions_per_stroke = Vec::new();

        for cy in [10.0, 30.0, 50.0, 70.0, 90.0] {
            let events = s.record_stroke(StrokeSegment::new(0.0, cy, 100.0, cy), 10.0);
            let fired = events
                .iter()
                .filter(|e| matches!(e, CoverageEvent::Completed))
                .count();
            completions_per_stroke.push((s.revealed_fraction(), fired));
        }

        let total_fired: usize = completions_per_stroke.iter().map(|(_, n)| n).sum();
        assert_eq!(total_fired, 1, "events: {:?}", completions_per_stroke);

        // The single completion happened at the first stroke whose
        // fraction strictly exceeds the threshold, not at the last.
        let first_crossing = completions_per_stroke
            .iter()
            .position(|(fraction, _)| *fraction > 0.60)
            .expect("threshold was crossed");
        assert_eq!(completions_per_stroke[first_crossing].1, 1);
        assert!(completions_per_stroke[4].1 == 0 || first_crossing == 4);
        assert!(s.is_complete());
        assert_eq!(s.revealed_fraction(), 1.0);
    }

    #[test]
    fn strokes_after_completion_keep_erasing_without_refiring() {
        let mut s = scanner(40, 40, 0.30);
        let events = s.record_stroke(StrokeSegment::new(0.0, 20.0, 40.0, 20.0), 15.0);
        assert!(events.contains(&CoverageEvent::Completed));
        let at_completion = s.revealed_fraction();

        let events = s.record_stroke(StrokeSegment::new(0.0, 2.0, 40.0, 2.0), 10.0);
        assert!(!events.contains(&CoverageEvent::Completed));
        assert!(s.revealed_fraction() > at_completion);
    }
}
