//! Shared lookup atlas that color ramps and RGB curves are baked into.
//!
//! Rows use a bottom-up convention: row 0 is the bottom of the texture. The
//! first baked curve lands in the top row (`size - 1`) and each later claim
//! moves one row down. The atlas lives for a whole export run and is flushed
//! once after the last material.

use std::path::Path;

use anyhow::{Context, Result};
use image::{ImageBuffer, Rgba};

use super::error::CompileError;
use crate::dsl::{ColorRampDSL, CurveMappingDSL};

pub const CURVE_ATLAS_NAME: &str = "blender_curves";
/// File the atlas is flushed to, relative to the output directory.
pub const CURVE_ATLAS_FILE: &str = "curves.exr";
/// Largest accepted atlas edge. At 8192 the RGBA32F pixels already take 1 GiB.
pub const MAX_CURVE_ATLAS_SIZE: u32 = 8192;

#[derive(Debug, Clone)]
pub struct CurveAtlas {
    size: u32,
    claimed: u32,
    pixels: Vec<[f32; 4]>,
}

impl CurveAtlas {
    pub fn new(size: u32) -> Result<Self, CompileError> {
        let invalid = CompileError::InvalidCurveAtlasSize {
            size,
            max: MAX_CURVE_ATLAS_SIZE,
        };
        if size == 0 || size > MAX_CURVE_ATLAS_SIZE {
            return Err(invalid);
        }
        let len = (size as usize).checked_mul(size as usize).ok_or(invalid)?;
        Ok(Self {
            size,
            claimed: 0,
            pixels: vec![[0.0; 4]; len],
        })
    }

    pub fn size(&self) -> u32 {
        self.size
    }

    pub fn claimed(&self) -> u32 {
        self.claimed
    }

    pub fn is_empty(&self) -> bool {
        self.claimed == 0
    }

    /// Storage row for the `index`-th claim.
    pub fn row_for(&self, index: u32) -> u32 {
        self.size - index - 1
    }

    pub fn row(&self, row: u32) -> &[[f32; 4]] {
        let start = row as usize * self.size as usize;
        &self.pixels[start..start + self.size as usize]
    }

    /// Claim the next free row and fill it with `sample(x)` for
    /// `x = i / size`. Returns the claim index.
    pub fn claim(&mut self, mut sample: impl FnMut(f32) -> [f32; 4]) -> Result<u32, CompileError> {
        if self.claimed >= self.size {
            return Err(CompileError::CurveAtlasFull {
                capacity: self.size,
            });
        }
        let index = self.claimed;
        self.claimed += 1;

        let size = self.size as usize;
        let start = self.row_for(index) as usize * size;
        let factor = self.size as f32;
        for (i, px) in self.pixels[start..start + size].iter_mut().enumerate() {
            *px = sample(i as f32 / factor);
        }
        log::info!("baked curve {index} into atlas row {}", self.row_for(index));
        Ok(index)
    }

    pub fn bake_color_ramp(&mut self, ramp: &ColorRampDSL) -> Result<u32, CompileError> {
        self.claim(|x| evaluate_color_ramp(ramp, x))
    }

    pub fn bake_curve_mapping(&mut self, mapping: &CurveMappingDSL) -> Result<u32, CompileError> {
        self.claim(|x| {
            [
                evaluate_curve(&mapping.curves[0], x),
                evaluate_curve(&mapping.curves[1], x),
                evaluate_curve(&mapping.curves[2], x),
                evaluate_curve(&mapping.curves[3], x),
            ]
        })
    }

    /// Write the atlas as 32-bit float OpenEXR. Image rows run top-down, so
    /// storage rows are flipped on the way out.
    pub fn save_exr(&self, path: impl AsRef<Path>) -> Result<()> {
        let path = path.as_ref();
        let size = self.size;
        let img: ImageBuffer<Rgba<f32>, Vec<f32>> = ImageBuffer::from_fn(size, size, |x, y| {
            let row = size - 1 - y;
            Rgba(self.pixels[row as usize * size as usize + x as usize])
        });
        image::DynamicImage::ImageRgba32F(img)
            .save(path)
            .with_context(|| format!("failed to write curve atlas to {}", path.display()))
    }
}

pub fn evaluate_color_ramp(ramp: &ColorRampDSL, x: f32) -> [f32; 4] {
    let mut elements = ramp.elements.clone();
    elements.sort_by(|a, b| a.position.total_cmp(&b.position));

    let (Some(first), Some(last)) = (elements.first(), elements.last()) else {
        return [0.0, 0.0, 0.0, 1.0];
    };
    if x <= first.position {
        return first.color;
    }
    if x >= last.position {
        return last.color;
    }

    for pair in elements.windows(2) {
        let (a, b) = (pair[0], pair[1]);
        if x < a.position || x > b.position {
            continue;
        }
        if ramp.interpolation == "CONSTANT" {
            return a.color;
        }
        let span = b.position - a.position;
        let mut t = if span > 0.0 { (x - a.position) / span } else { 0.0 };
        if ramp.interpolation == "EASE" {
            t = t * t * (3.0 - 2.0 * t);
        }
        return lerp4(a.color, b.color, t);
    }
    last.color
}

/// Piecewise-linear curve through `points` with horizontal extension past
/// both ends. An empty curve is the identity.
pub fn evaluate_curve(points: &[[f32; 2]], x: f32) -> f32 {
    let mut pts = points.to_vec();
    pts.sort_by(|a, b| a[0].total_cmp(&b[0]));

    let (Some(first), Some(last)) = (pts.first(), pts.last()) else {
        return x;
    };
    if x <= first[0] {
        return first[1];
    }
    if x >= last[0] {
        return last[1];
    }
    for pair in pts.windows(2) {
        let (a, b) = (pair[0], pair[1]);
        if x >= a[0] && x <= b[0] {
            let span = b[0] - a[0];
            if span <= 0.0 {
                return b[1];
            }
            let t = (x - a[0]) / span;
            return a[1] + (b[1] - a[1]) * t;
        }
    }
    last[1]
}

fn lerp4(a: [f32; 4], b: [f32; 4], t: f32) -> [f32; 4] {
    [
        a[0] + (b[0] - a[0]) * t,
        a[1] + (b[1] - a[1]) * t,
        a[2] + (b[2] - a[2]) * t,
        a[3] + (b[3] - a[3]) * t,
    ]
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dsl::ColorRampElement;

    fn ramp(interpolation: &str) -> ColorRampDSL {
        ColorRampDSL {
            interpolation: interpolation.to_string(),
            elements: vec![
                ColorRampElement {
                    position: 0.0,
                    color: [0.0, 0.0, 0.0, 1.0],
                },
                ColorRampElement {
                    position: 1.0,
                    color: [1.0, 1.0, 1.0, 1.0],
                },
            ],
        }
    }

    #[test]
    fn claims_fill_rows_top_down() {
        let mut atlas = CurveAtlas::new(8).unwrap();
        assert_eq!(atlas.claim(|_| [1.0; 4]).unwrap(), 0);
        assert_eq!(atlas.claim(|_| [2.0; 4]).unwrap(), 1);
        assert_eq!(atlas.row(7)[0], [1.0; 4]);
        assert_eq!(atlas.row(6)[3], [2.0; 4]);
        assert_eq!(atlas.row(5)[0], [0.0; 4]);
        assert_eq!(atlas.claimed(), 2);
    }

    #[test]
    fn overflow_is_reported() {
        let mut atlas = CurveAtlas::new(2).unwrap();
        atlas.claim(|_| [0.0; 4]).unwrap();
        atlas.claim(|_| [0.0; 4]).unwrap();
        let err = atlas.claim(|_| [0.0; 4]).unwrap_err();
        assert_eq!(err, CompileError::CurveAtlasFull { capacity: 2 });
    }

    #[test]
    fn out_of_range_sizes_are_rejected() {
        for size in [0, MAX_CURVE_ATLAS_SIZE + 1, u32::MAX] {
            let err = CurveAtlas::new(size).unwrap_err();
            assert_eq!(
                err,
                CompileError::InvalidCurveAtlasSize {
                    size,
                    max: MAX_CURVE_ATLAS_SIZE
                }
            );
        }
        assert_eq!(CurveAtlas::new(16).unwrap().size(), 16);
    }

    #[test]
    fn ramp_samples_at_even_positions() {
        let mut atlas = CurveAtlas::new(4).unwrap();
        atlas.bake_color_ramp(&ramp("LINEAR")).unwrap();
        let row = atlas.row(3);
        assert_eq!(row[0][0], 0.0);
        assert!((row[2][0] - 0.5).abs() < 1e-6);
        assert!((row[3][0] - 0.75).abs() < 1e-6);
    }

    #[test]
    fn constant_ramp_holds_left_color() {
        let r = ramp("CONSTANT");
        assert_eq!(evaluate_color_ramp(&r, 0.9)[0], 0.0);
        assert_eq!(evaluate_color_ramp(&r, 1.0)[0], 1.0);
    }

    #[test]
    fn ease_ramp_is_symmetric_at_midpoint() {
        let r = ramp("EASE");
        assert!((evaluate_color_ramp(&r, 0.5)[0] - 0.5).abs() < 1e-6);
        assert!(evaluate_color_ramp(&r, 0.25)[0] < 0.25);
    }

    #[test]
    fn curve_extends_horizontally() {
        let pts = [[0.2, 0.1], [0.8, 0.9]];
        assert_eq!(evaluate_curve(&pts, 0.0), 0.1);
        assert_eq!(evaluate_curve(&pts, 1.0), 0.9);
        assert!((evaluate_curve(&pts, 0.5) - 0.5).abs() < 1e-6);
        assert_eq!(evaluate_curve(&[], 0.3), 0.3);
    }
}
