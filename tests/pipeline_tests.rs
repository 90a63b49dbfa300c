use bluecarbon_node::config::AnalysisConfig;
use bluecarbon_node::pipeline::{analyze_image, hsv_to_rgb};
use base64::{engine::general_purpose, Engine as _};
use image::{Rgb, RgbImage};
use std::io::Cursor;

fn png_bytes(img: &RgbImage) -> Vec<u8> {
    let mut buf = Vec::new();
    img.write_to(&mut Cursor::new(&mut buf), image::ImageFormat::Png)
        .unwrap();
    buf
}

fn solid(width: u32, height: u32, color: Rgb<u8>) -> RgbImage {
    RgbImage::from_pixel(width, height, color)
}

fn decode_overlay(b64: &str) -> image::DynamicImage {
    let bytes = general_purpose::STANDARD.decode(b64).unwrap();
    image::load_from_memory(&bytes).unwrap()
}

#[test]
fn test_all_green_frame_is_full_seagrass() {
    let bytes = png_bytes(&solid(64, 64, Rgb([0, 200, 0])));
    let result = analyze_image(&bytes, &AnalysisConfig::default()).unwrap();

    assert_eq!(result.seagrass_pct, 100.0);
    assert_eq!(result.white_pct, 0.0);
    // Full cover over a 0.25 m² quadrat at 100 g/m²
    assert!((result.blue_carbon_g - 25.0).abs() < 1e-9);

    let overlay = decode_overlay(&result.overlay_seagrass_b64);
    assert_eq!((overlay.width(), overlay.height()), (64, 64));
    let overlay = decode_overlay(&result.overlay_white_b64);
    assert_eq!((overlay.width(), overlay.height()), (64, 64));
}

#[test]
fn test_all_white_frame_is_full_sand() {
    let bytes = png_bytes(&solid(64, 64, Rgb([255, 255, 255])));
    let result = analyze_image(&bytes, &AnalysisConfig::default()).unwrap();

    assert_eq!(result.white_pct, 100.0);
    assert_eq!(result.seagrass_pct, 0.0);
    assert_eq!(result.blue_carbon_g, 0.0);
}

#[test]
fn test_split_frame_divides_evenly() {
    let mut img = RgbImage::new(64, 64);
    for (x, _, px) in img.enumerate_pixels_mut() {
        *px = if x < 32 {
            Rgb([0, 200, 0])
        } else {
            Rgb([255, 255, 255])
        };
    }
    let result = analyze_image(&png_bytes(&img), &AnalysisConfig::default()).unwrap();

    assert!(
        (result.seagrass_pct - 50.0).abs() <= 2.0,
        "seagrass_pct = {}",
        result.seagrass_pct
    );
    assert!(
        (result.white_pct - 50.0).abs() <= 2.0,
        "white_pct = {}",
        result.white_pct
    );
}

#[test]
fn test_ambiguous_pixels_count_as_seagrass_only() {
    // Saturation 55 and value 200 sit inside both threshold windows; the
    // overlap rule must hand every such pixel to the seagrass class
    let color = hsv_to_rgb(60, 55, 200);
    let bytes = png_bytes(&solid(48, 48, color));
    let result = analyze_image(&bytes, &AnalysisConfig::default()).unwrap();

    assert_eq!(result.seagrass_pct, 100.0);
    assert_eq!(result.white_pct, 0.0);
}

#[test]
fn test_undecodable_bytes_are_rejected() {
    let err = analyze_image(b"definitely not a png", &AnalysisConfig::default()).unwrap_err();
    assert_eq!(err.to_string(), "Cannot read image");
}

#[test]
fn test_oversized_input_is_downscaled() {
    let bytes = png_bytes(&solid(2600, 1000, Rgb([0, 200, 0])));
    let result = analyze_image(&bytes, &AnalysisConfig::default()).unwrap();

    let overlay = decode_overlay(&result.overlay_seagrass_b64);
    assert_eq!((overlay.width(), overlay.height()), (1280, 492));
    assert_eq!(result.seagrass_pct, 100.0);
}

#[test]
fn test_carbon_estimate_tracks_config() {
    let cfg = AnalysisConfig {
        quadrat_area_m2: 1.0,
        carbon_density_g_per_m2: 50.0,
        ..AnalysisConfig::default()
    };
    let bytes = png_bytes(&solid(32, 32, Rgb([0, 200, 0])));
    let result = analyze_image(&bytes, &cfg).unwrap();
    assert!((result.blue_carbon_g - 50.0).abs() < 1e-9);
}
