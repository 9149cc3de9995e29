//! Pixel-statistics analyzer for stamp, signature and date regions.
//!
//! Two passes over the stamp region:
//! 1. a sampled pass (every `sample_stride` pixels) measuring ink, blue and
//!    black densities and the largest connected ink blob;
//! 2. a full-resolution pass measuring dark-pen densities and the stroke
//!    ratio, which separates thin handwriting from solid print.
//!
//! The date region only gets the sampled ink-density measurement.

use tracing::debug;

use crate::models::config::{RegionConfig, RegionOfInterest};

use super::{FeatureStatus, OverallStatus, RasterBuffer, RegionMeasurements, RegionVerification};

/// Pixel rectangle, half-open on the right and bottom.
#[derive(Debug, Clone, Copy)]
struct Bounds {
    x0: u32,
    y0: u32,
    x1: u32,
    y1: u32,
}

impl Bounds {
    fn from_roi(roi: &RegionOfInterest, width: u32, height: u32) -> Self {
        let x0 = ((roi.x * width as f32) as u32).min(width);
        let y0 = ((roi.y * height as f32) as u32).min(height);
        let x1 = (((roi.x + roi.width) * width as f32) as u32).clamp(x0, width);
        let y1 = (((roi.y + roi.height) * height as f32) as u32).clamp(y0, height);
        Self { x0, y0, x1, y1 }
    }

    fn area(&self) -> u64 {
        u64::from(self.x1 - self.x0) * u64::from(self.y1 - self.y0)
    }
}

/// Heuristic stamp/signature/date analyzer.
#[derive(Debug, Clone)]
pub struct RegionAnalyzer {
    config: RegionConfig,
}

impl RegionAnalyzer {
    pub fn new(config: RegionConfig) -> Self {
        Self { config }
    }

    /// Verify one page raster.
    pub fn analyze(&self, raster: &dyn RasterBuffer) -> RegionVerification {
        let width = raster.width();
        let height = raster.height();

        let stamp_bounds = Bounds::from_roi(&self.config.stamp_region, width, height);
        let date_bounds = Bounds::from_roi(&self.config.date_region, width, height);

        let mut measurements = RegionMeasurements::default();
        self.sampled_pass(raster, stamp_bounds, &mut measurements);
        self.stroke_pass(raster, stamp_bounds, &mut measurements);
        measurements.date_ink_density = self.sampled_ink_density(raster, date_bounds);

        let stamp = self.stamp_status(&measurements);
        let signature = self.signature_status(&measurements);
        let date = self.date_status(&measurements);
        let overall = decide_overall(stamp, signature, date);

        debug!(
            ?stamp,
            ?signature,
            ?date,
            ?overall,
            blue_density = measurements.blue_density,
            dark_density = measurements.dark_density,
            stroke_ratio = measurements.stroke_ratio,
            "region analysis finished"
        );

        RegionVerification {
            stamp,
            signature,
            date,
            overall,
            measurements,
        }
    }

    /// Sampled color-density pass plus connected-component search over the
    /// sampled ink mask.
    fn sampled_pass(
        &self,
        raster: &dyn RasterBuffer,
        bounds: Bounds,
        measurements: &mut RegionMeasurements,
    ) {
        let stride = self.config.sample_stride.max(1);
        let cols = sample_count(bounds.x0, bounds.x1, stride);
        let rows = sample_count(bounds.y0, bounds.y1, stride);
        if cols == 0 || rows == 0 {
            return;
        }

        let mut ink_mask = vec![false; cols * rows];
        let mut ink = 0u64;
        let mut blue = 0u64;
        let mut black = 0u64;

        for row in 0..rows {
            let y = bounds.y0 + row as u32 * stride;
            for col in 0..cols {
                let x = bounds.x0 + col as u32 * stride;
                let [r, g, b] = raster.pixel(x, y);

                if !self.is_ink(r, g, b) {
                    continue;
                }
                ink += 1;
                ink_mask[row * cols + col] = true;

                if self.is_blue(r, g, b) {
                    blue += 1;
                } else if self.is_black(r, g, b) {
                    black += 1;
                }
            }
        }

        let total = (cols * rows) as f64;
        measurements.ink_density = ink as f64 / total;
        measurements.blue_density = blue as f64 / total;
        measurements.black_density = black as f64 / total;
        measurements.largest_component = largest_component(&ink_mask, cols, rows);
    }

    /// Full-resolution darkness and edge pass over the stamp region.
    fn stroke_pass(
        &self,
        raster: &dyn RasterBuffer,
        bounds: Bounds,
        measurements: &mut RegionMeasurements,
    ) {
        let area = bounds.area();
        if area == 0 {
            return;
        }

        let mut dark = 0u64;
        let mut very_dark = 0u64;
        let mut edges = 0u64;

        for y in bounds.y0..bounds.y1 {
            for x in bounds.x0..bounds.x1 {
                let [r, g, b] = raster.pixel(x, y);
                let luma = luminance(r, g, b);

                // Blueish pixels belong to the stamp, not the pen.
                let blueish = b > r.saturating_add(self.config.blue_margin);
                if !blueish {
                    if luma < self.config.dark_luma {
                        dark += 1;
                    }
                    if luma < self.config.very_dark_luma {
                        very_dark += 1;
                    }
                }

                let gradient_right = if x + 1 < bounds.x1 {
                    let [nr, ng, nb] = raster.pixel(x + 1, y);
                    luma.abs_diff(luminance(nr, ng, nb))
                } else {
                    0
                };
                let gradient_down = if y + 1 < bounds.y1 {
                    let [nr, ng, nb] = raster.pixel(x, y + 1);
                    luma.abs_diff(luminance(nr, ng, nb))
                } else {
                    0
                };
                if gradient_right > self.config.edge_gradient
                    || gradient_down > self.config.edge_gradient
                {
                    edges += 1;
                }
            }
        }

        measurements.dark_density = dark as f64 / area as f64;
        measurements.very_dark_density = very_dark as f64 / area as f64;
        measurements.stroke_ratio = if dark > 0 {
            edges as f64 / dark as f64
        } else {
            0.0
        };
    }

    fn sampled_ink_density(&self, raster: &dyn RasterBuffer, bounds: Bounds) -> f64 {
        let stride = self.config.sample_stride.max(1);
        let cols = sample_count(bounds.x0, bounds.x1, stride);
        let rows = sample_count(bounds.y0, bounds.y1, stride);
        if cols == 0 || rows == 0 {
            return 0.0;
        }

        let mut ink = 0u64;
        for row in 0..rows {
            let y = bounds.y0 + row as u32 * stride;
            for col in 0..cols {
                let x = bounds.x0 + col as u32 * stride;
                let [r, g, b] = raster.pixel(x, y);
                if self.is_ink(r, g, b) {
                    ink += 1;
                }
            }
        }
        ink as f64 / (cols * rows) as f64
    }

    fn is_ink(&self, r: u8, g: u8, b: u8) -> bool {
        let dr = f32::from(255 - r);
        let dg = f32::from(255 - g);
        let db = f32::from(255 - b);
        (dr * dr + dg * dg + db * db).sqrt() > self.config.white_distance_threshold
    }

    fn is_blue(&self, r: u8, g: u8, b: u8) -> bool {
        b >= self.config.blue_min
            && b > r.saturating_add(self.config.blue_margin)
            && b > g.saturating_add(self.config.blue_margin)
    }

    fn is_black(&self, r: u8, g: u8, b: u8) -> bool {
        r < self.config.black_max && g < self.config.black_max && b < self.config.black_max
    }

    fn stamp_status(&self, m: &RegionMeasurements) -> FeatureStatus {
        let threshold = self.config.stamp_blue_density;
        if m.blue_density >= threshold {
            FeatureStatus::Present
        } else if m.blue_density >= threshold * 0.5 {
            FeatureStatus::Uncertain
        } else {
            FeatureStatus::Missing
        }
    }

    /// Signature rules, strongest first:
    /// 1. enough very dark pen ink: present;
    /// 2. enough dark ink with a stroke-like edge profile: present;
    /// 3. half the dark-ink threshold reached: uncertain;
    /// 4. otherwise missing.
    fn signature_status(&self, m: &RegionMeasurements) -> FeatureStatus {
        if m.very_dark_density >= self.config.signature_very_dark_density {
            return FeatureStatus::Present;
        }
        if m.dark_density >= self.config.signature_dark_density
            && m.stroke_ratio >= self.config.signature_stroke_ratio
        {
            return FeatureStatus::Present;
        }
        if m.dark_density >= self.config.signature_dark_density * 0.5 {
            return FeatureStatus::Uncertain;
        }
        FeatureStatus::Missing
    }

    fn date_status(&self, m: &RegionMeasurements) -> FeatureStatus {
        let threshold = self.config.date_ink_density;
        if m.date_ink_density >= threshold {
            FeatureStatus::Present
        } else if m.date_ink_density >= threshold * 0.5 {
            FeatureStatus::Uncertain
        } else {
            FeatureStatus::Missing
        }
    }
}

/// Decision table combining the three feature verdicts.
fn decide_overall(
    stamp: FeatureStatus,
    signature: FeatureStatus,
    date: FeatureStatus,
) -> OverallStatus {
    use FeatureStatus::{Missing, Present, Uncertain};

    match (stamp, signature) {
        (Uncertain, _) | (_, Uncertain) => OverallStatus::NeedsReview,
        (Present, Present) => match date {
            Present => OverallStatus::Complete,
            Uncertain => OverallStatus::NeedsReview,
            Missing => OverallStatus::DateMissing,
        },
        (Missing, Missing) => OverallStatus::BothMissing,
        (Present, Missing) => OverallStatus::SignatureMissing,
        (Missing, Present) => OverallStatus::StampMissing,
    }
}

fn sample_count(from: u32, to: u32, stride: u32) -> usize {
    if to <= from {
        0
    } else {
        ((to - from + stride - 1) / stride) as usize
    }
}

fn luminance(r: u8, g: u8, b: u8) -> u8 {
    (0.299 * f32::from(r) + 0.587 * f32::from(g) + 0.114 * f32::from(b)) as u8
}

/// Size of the largest 4-connected component in the mask.
fn largest_component(mask: &[bool], cols: usize, rows: usize) -> usize {
    let mut visited = vec![false; mask.len()];
    let mut largest = 0usize;
    let mut stack = Vec::new();

    for start in 0..mask.len() {
        if !mask[start] || visited[start] {
            continue;
        }
        let mut size = 0usize;
        visited[start] = true;
        stack.push(start);

        while let Some(idx) = stack.pop() {
            size += 1;
            let row = idx / cols;
            let col = idx % cols;

            let mut push = |r: usize, c: usize| {
                let n = r * cols + c;
                if mask[n] && !visited[n] {
                    visited[n] = true;
                    stack.push(n);
                }
            };

            if col > 0 {
                push(row, col - 1);
            }
            if col + 1 < cols {
                push(row, col + 1);
            }
            if row > 0 {
                push(row - 1, col);
            }
            if row + 1 < rows {
                push(row + 1, col);
            }
        }

        largest = largest.max(size);
    }

    largest
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::{Rgb, RgbImage};

    const BLUE: Rgb<u8> = Rgb([30, 60, 200]);
    const BLACK: Rgb<u8> = Rgb([20, 20, 20]);
    const GRAY: Rgb<u8> = Rgb([90, 90, 90]);

    fn white_page() -> RgbImage {
        RgbImage::from_pixel(300, 300, Rgb([255, 255, 255]))
    }

    fn fill(img: &mut RgbImage, x0: u32, y0: u32, w: u32, h: u32, color: Rgb<u8>) {
        for y in y0..y0 + h {
            for x in x0..x0 + w {
                img.put_pixel(x, y, color);
            }
        }
    }

    fn analyzer() -> RegionAnalyzer {
        RegionAnalyzer::new(RegionConfig::default())
    }

    #[test]
    fn test_blank_page_both_missing() {
        let page = white_page();
        let result = analyzer().analyze(&page);
        assert_eq!(result.stamp, FeatureStatus::Missing);
        assert_eq!(result.signature, FeatureStatus::Missing);
        assert_eq!(result.date, FeatureStatus::Missing);
        assert_eq!(result.overall, OverallStatus::BothMissing);
        assert_eq!(result.measurements.largest_component, 0);
    }

    #[test]
    fn test_blue_stamp_without_signature() {
        let mut page = white_page();
        // Solid blue stamp body in the bottom-right quadrant.
        fill(&mut page, 200, 220, 60, 50, BLUE);

        let result = analyzer().analyze(&page);
        assert_eq!(result.stamp, FeatureStatus::Present);
        // Blue ink does not count toward the pen-stroke signature.
        assert_eq!(result.signature, FeatureStatus::Missing);
        assert_eq!(result.overall, OverallStatus::SignatureMissing);
        assert!(result.measurements.blue_density > 0.1);
        assert!(result.measurements.largest_component >= 250);
    }

    #[test]
    fn test_black_signature_without_stamp() {
        let mut page = white_page();
        // Thick dark pen stroke.
        fill(&mut page, 160, 250, 100, 2, BLACK);

        let result = analyzer().analyze(&page);
        assert_eq!(result.stamp, FeatureStatus::Missing);
        assert_eq!(result.signature, FeatureStatus::Present);
        assert_eq!(result.overall, OverallStatus::StampMissing);
        assert!(result.measurements.very_dark_density > 0.01);
    }

    #[test]
    fn test_gray_strokes_trigger_stroke_rule() {
        let mut page = white_page();
        // Isolated gray dots: dark but not very dark, all edge pixels.
        for i in 0..200u32 {
            let x = 160 + (i % 40) * 2;
            let y = 200 + (i / 40) * 4;
            page.put_pixel(x, y, GRAY);
        }

        let result = analyzer().analyze(&page);
        assert_eq!(result.signature, FeatureStatus::Present);
        assert!(result.measurements.very_dark_density < 0.003);
        assert!(result.measurements.stroke_ratio >= 0.35);
    }

    #[test]
    fn test_complete_page() {
        let mut page = white_page();
        fill(&mut page, 200, 220, 60, 50, BLUE);
        fill(&mut page, 160, 280, 100, 2, BLACK);
        // Handwritten date in the bottom-left region.
        fill(&mut page, 20, 240, 60, 2, BLACK);

        let result = analyzer().analyze(&page);
        assert_eq!(result.stamp, FeatureStatus::Present);
        assert_eq!(result.signature, FeatureStatus::Present);
        assert_eq!(result.date, FeatureStatus::Present);
        assert_eq!(result.overall, OverallStatus::Complete);
    }

    #[test]
    fn test_date_missing() {
        let mut page = white_page();
        fill(&mut page, 200, 220, 60, 50, BLUE);
        fill(&mut page, 160, 280, 100, 2, BLACK);

        let result = analyzer().analyze(&page);
        assert_eq!(result.date, FeatureStatus::Missing);
        assert_eq!(result.overall, OverallStatus::DateMissing);
    }

    #[test]
    fn test_faint_stamp_needs_review() {
        let mut page = white_page();
        // Blue blob small enough to land in the uncertain band.
        fill(&mut page, 180, 210, 12, 12, BLUE);

        let result = analyzer().analyze(&page);
        assert_eq!(result.stamp, FeatureStatus::Uncertain);
        assert_eq!(result.overall, OverallStatus::NeedsReview);
    }

    #[test]
    fn test_ink_outside_regions_ignored() {
        let mut page = white_page();
        // Printed header in the top half must not influence any verdict.
        fill(&mut page, 10, 10, 280, 40, BLACK);

        let result = analyzer().analyze(&page);
        assert_eq!(result.overall, OverallStatus::BothMissing);
    }

    #[test]
    fn test_largest_component_splits_blobs() {
        let mut page = white_page();
        fill(&mut page, 160, 200, 30, 30, BLUE);
        fill(&mut page, 250, 250, 12, 12, BLUE);

        let result = analyzer().analyze(&page);
        let m = &result.measurements;
        // The big blob dominates; the small one is a separate component.
        assert!(m.largest_component >= 80);
        assert!(m.largest_component < 130);
    }
}
