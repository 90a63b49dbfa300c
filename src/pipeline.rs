//! Seagrass coverage pipeline.
//!
//! Classifies quadrat photo pixels into seagrass and white sand using HSV
//! thresholds, cleans the masks with morphological open/close, and derives a
//! blue-carbon mass estimate from the seagrass cover fraction. Channel
//! scaling follows the OpenCV convention (H in 0..=179, S and V in 0..=255)
//! so the threshold constants match the field-calibrated values.

use crate::config::AnalysisConfig;
use crate::error::AnalysisError;
use base64::{engine::general_purpose, Engine as _};
use image::{imageops, GrayImage, Luma, Rgb, RgbImage};
use serde::{Deserialize, Serialize};
use std::io::Cursor;

type Result<T> = std::result::Result<T, AnalysisError>;

/// Outcome of one analysis run, serialized as the /analyze response body.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AnalysisResult {
    pub seagrass_pct: f64,
    pub white_pct: f64,
    pub blue_carbon_g: f64,
    pub overlay_seagrass_b64: String,
    pub overlay_white_b64: String,
}

// Seagrass: greenish hue with enough saturation and brightness.
const SEAGRASS_HUE: (u8, u8) = (35, 95);
const SEAGRASS_SAT: (u8, u8) = (50, 255);
const SEAGRASS_VAL: (u8, u8) = (35, 255);

// White sand: any hue, low saturation, high value.
const WHITE_SAT: (u8, u8) = (0, 60);
const WHITE_VAL: (u8, u8) = (185, 255);

// Overlay tints (RGB) and blend strengths.
const SEAGRASS_TINT: Rgb<u8> = Rgb([120, 255, 0]);
const SEAGRASS_ALPHA: f32 = 0.45;
const WHITE_TINT: Rgb<u8> = Rgb([255, 255, 255]);
const WHITE_ALPHA: f32 = 0.35;

/// Run the full pipeline on raw encoded image bytes.
pub fn analyze_image(bytes: &[u8], cfg: &AnalysisConfig) -> Result<AnalysisResult> {
    let decoded =
        image::load_from_memory(bytes).map_err(|_| AnalysisError::UnreadableImage)?;
    let img = resize_max(decoded.to_rgb8(), cfg.max_side);
    let img = suppress_glints(&img);

    let hsv = HsvPlanes::from_rgb(&img);
    let mut mask_seagrass = hsv.in_range(SEAGRASS_HUE, SEAGRASS_SAT, SEAGRASS_VAL);
    let mut mask_white = hsv.in_range((0, 180), WHITE_SAT, WHITE_VAL);

    mask_seagrass = morph_cleanup(&mask_seagrass, 5, 7);
    mask_white = morph_cleanup(&mask_white, 3, 5);

    // Pixels matching both classes count as seagrass only
    subtract_mask(&mut mask_white, &mask_seagrass);

    let total_pixels = (img.width() * img.height()) as f64;
    let seagrass_area = mask_area(&mask_seagrass) as f64;
    let white_area = mask_area(&mask_white) as f64;

    let seagrass_pct = 100.0 * seagrass_area / total_pixels;
    let white_pct = 100.0 * white_area / total_pixels;

    // Placeholder carbon model: cover fraction scaled by quadrat area and
    // an assumed carbon density for full cover
    let blue_carbon_g =
        (seagrass_pct / 100.0) * cfg.quadrat_area_m2 * cfg.carbon_density_g_per_m2;

    let overlay_sea = blend_overlay(&img, &mask_seagrass, SEAGRASS_TINT, SEAGRASS_ALPHA);
    let overlay_wh = blend_overlay(&img, &mask_white, WHITE_TINT, WHITE_ALPHA);

    Ok(AnalysisResult {
        seagrass_pct: round2(seagrass_pct),
        white_pct: round2(white_pct),
        blue_carbon_g,
        overlay_seagrass_b64: png_base64(&overlay_sea)?,
        overlay_white_b64: png_base64(&overlay_wh)?,
    })
}

fn round2(x: f64) -> f64 {
    (x * 100.0).round() / 100.0
}

/// Downscale so the longer side is at most `max_side`; never upscales.
pub fn resize_max(img: RgbImage, max_side: u32) -> RgbImage {
    let (w, h) = img.dimensions();
    let longest = w.max(h);
    if longest <= max_side {
        return img;
    }
    let scale = max_side as f64 / longest as f64;
    let nw = ((w as f64 * scale).round() as u32).max(1);
    let nh = ((h as f64 * scale).round() as u32).max(1);
    imageops::resize(&img, nw, nh, imageops::FilterType::Triangle)
}

/// Reduce specular highlights: clamp each pixel's V channel to the median
/// of its 5x5 neighborhood, leaving hue and saturation untouched.
fn suppress_glints(img: &RgbImage) -> RgbImage {
    let hsv = HsvPlanes::from_rgb(img);
    let v_blur = median_blur(&hsv.v, img.width(), img.height(), 2);

    let mut out = RgbImage::new(img.width(), img.height());
    for (i, px) in out.pixels_mut().enumerate() {
        let v = hsv.v[i].min(v_blur[i]);
        *px = hsv_to_rgb(hsv.h[i], hsv.s[i], v);
    }
    out
}

/// Per-channel HSV planes of an RGB image, OpenCV scaling.
pub struct HsvPlanes {
    pub h: Vec<u8>,
    pub s: Vec<u8>,
    pub v: Vec<u8>,
    width: u32,
    height: u32,
}

impl HsvPlanes {
    pub fn from_rgb(img: &RgbImage) -> Self {
        let n = (img.width() * img.height()) as usize;
        let mut h = Vec::with_capacity(n);
        let mut s = Vec::with_capacity(n);
        let mut v = Vec::with_capacity(n);
        for px in img.pixels() {
            let (ph, ps, pv) = rgb_to_hsv(*px);
            h.push(ph);
            s.push(ps);
            v.push(pv);
        }
        Self {
            h,
            s,
            v,
            width: img.width(),
            height: img.height(),
        }
    }

    /// Inclusive range test per channel, 255 where all three pass.
    pub fn in_range(&self, h: (u8, u8), s: (u8, u8), v: (u8, u8)) -> GrayImage {
        let mut mask = GrayImage::new(self.width, self.height);
        for (i, px) in mask.pixels_mut().enumerate() {
            let hit = self.h[i] >= h.0
                && self.h[i] <= h.1
                && self.s[i] >= s.0
                && self.s[i] <= s.1
                && self.v[i] >= v.0
                && self.v[i] <= v.1;
            *px = Luma([if hit { 255 } else { 0 }]);
        }
        mask
    }
}

/// RGB to HSV with OpenCV channel scaling: H halved into 0..=179,
/// S and V in 0..=255.
pub fn rgb_to_hsv(px: Rgb<u8>) -> (u8, u8, u8) {
    let r = px[0] as f32;
    let g = px[1] as f32;
    let b = px[2] as f32;
    let maxc = r.max(g).max(b);
    let minc = r.min(g).min(b);
    let delta = maxc - minc;

    let v = maxc;
    let s = if maxc > 0.0 { 255.0 * delta / maxc } else { 0.0 };
    let mut hue = if delta == 0.0 {
        0.0
    } else if maxc == r {
        60.0 * (g - b) / delta
    } else if maxc == g {
        120.0 + 60.0 * (b - r) / delta
    } else {
        240.0 + 60.0 * (r - g) / delta
    };
    if hue < 0.0 {
        hue += 360.0;
    }
    ((hue / 2.0).round() as u8, s.round() as u8, v.round() as u8)
}

/// Inverse of [`rgb_to_hsv`], same scaling.
pub fn hsv_to_rgb(h: u8, s: u8, v: u8) -> Rgb<u8> {
    let hue = h as f32 * 2.0;
    let s = s as f32 / 255.0;
    let v = v as f32;

    let c = v * s;
    let x = c * (1.0 - ((hue / 60.0) % 2.0 - 1.0).abs());
    let m = v - c;

    let (r, g, b) = match (hue / 60.0) as u32 {
        0 => (c, x, 0.0),
        1 => (x, c, 0.0),
        2 => (0.0, c, x),
        3 => (0.0, x, c),
        4 => (x, 0.0, c),
        _ => (c, 0.0, x),
    };
    Rgb([
        (r + m).round() as u8,
        (g + m).round() as u8,
        (b + m).round() as u8,
    ])
}

/// Median filter over a (2*radius+1)² window with replicated borders.
fn median_blur(plane: &[u8], width: u32, height: u32, radius: i64) -> Vec<u8> {
    let w = width as i64;
    let h = height as i64;
    let mut out = Vec::with_capacity(plane.len());
    let mut window = Vec::with_capacity(((2 * radius + 1) * (2 * radius + 1)) as usize);
    for y in 0..h {
        for x in 0..w {
            window.clear();
            for dy in -radius..=radius {
                for dx in -radius..=radius {
                    let sx = (x + dx).clamp(0, w - 1);
                    let sy = (y + dy).clamp(0, h - 1);
                    window.push(plane[(sy * w + sx) as usize]);
                }
            }
            window.sort_unstable();
            out.push(window[window.len() / 2]);
        }
    }
    out
}

/// Offsets of an elliptical structuring element of the given diameter.
fn ellipse_kernel(diameter: u32) -> Vec<(i64, i64)> {
    let d = diameter.max(1) as i64;
    let r = (d - 1) / 2;
    if r == 0 {
        return vec![(0, 0)];
    }
    let r2 = (r * r) as f64;
    let mut offsets = Vec::new();
    for dy in -r..=r {
        for dx in -r..=r {
            if ((dx * dx + dy * dy) as f64) <= r2 + f64::EPSILON {
                offsets.push((dx, dy));
            }
        }
    }
    offsets
}

fn erode(mask: &GrayImage, kernel: &[(i64, i64)]) -> GrayImage {
    morph(mask, kernel, true)
}

fn dilate(mask: &GrayImage, kernel: &[(i64, i64)]) -> GrayImage {
    morph(mask, kernel, false)
}

fn morph(mask: &GrayImage, kernel: &[(i64, i64)], all: bool) -> GrayImage {
    let w = mask.width() as i64;
    let h = mask.height() as i64;
    let mut out = GrayImage::new(mask.width(), mask.height());
    for y in 0..h {
        for x in 0..w {
            let mut hit = all;
            for &(dx, dy) in kernel {
                let sx = (x + dx).clamp(0, w - 1) as u32;
                let sy = (y + dy).clamp(0, h - 1) as u32;
                let set = mask.get_pixel(sx, sy)[0] > 0;
                if all {
                    if !set {
                        hit = false;
                        break;
                    }
                } else if set {
                    hit = true;
                    break;
                }
            }
            out.put_pixel(x as u32, y as u32, Luma([if hit { 255 } else { 0 }]));
        }
    }
    out
}

/// Open (drop specks) then close (fill pinholes) with elliptical kernels.
pub fn morph_cleanup(mask: &GrayImage, open_k: u32, close_k: u32) -> GrayImage {
    let k1 = ellipse_kernel(open_k.max(1));
    let k2 = ellipse_kernel(close_k.max(1));
    let opened = dilate(&erode(mask, &k1), &k1);
    erode(&dilate(&opened, &k2), &k2)
}

/// Clear every pixel of `mask` that is set in `other`.
fn subtract_mask(mask: &mut GrayImage, other: &GrayImage) {
    for (dst, src) in mask.pixels_mut().zip(other.pixels()) {
        if src[0] > 0 {
            *dst = Luma([0]);
        }
    }
}

fn mask_area(mask: &GrayImage) -> u64 {
    mask.pixels().filter(|p| p[0] > 0).count() as u64
}

/// Alpha-blend `tint` over the image wherever the mask is set.
fn blend_overlay(img: &RgbImage, mask: &GrayImage, tint: Rgb<u8>, alpha: f32) -> RgbImage {
    let mut out = img.clone();
    for (dst, m) in out.pixels_mut().zip(mask.pixels()) {
        if m[0] > 0 {
            for c in 0..3 {
                dst[c] =
                    (alpha * tint[c] as f32 + (1.0 - alpha) * dst[c] as f32).round() as u8;
            }
        }
    }
    out
}

/// PNG-encode and base64 the overlay for inline transport.
fn png_base64(img: &RgbImage) -> Result<String> {
    let mut buf = Vec::new();
    img.write_to(&mut Cursor::new(&mut buf), image::ImageFormat::Png)
        .map_err(|e| AnalysisError::Pipeline(format!("PNG encode failed: {}", e)))?;
    Ok(general_purpose::STANDARD.encode(&buf))
}
