//! End-to-end behaviour on synthetic pages.

#![allow(clippy::unwrap_used)]

use std::io::Cursor;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

use image::{DynamicImage, GrayImage, ImageFormat, Luma, Rgb, RgbImage};
use pagesift_pipeline::{
    AnalysisConfig, Analyzer, LanguageModel, RawImage, RecognitionError, SessionCache,
    Transcription, classify_diagram, extract_edges, find_table_regions, preprocess,
};

const WHITE: Luma<u8> = Luma([255]);
const BLACK: Luma<u8> = Luma([0]);

fn white_page(width: u32, height: u32) -> DynamicImage {
    DynamicImage::ImageLuma8(GrayImage::from_pixel(width, height, WHITE))
}

/// A 50x40 filled black rectangle (area 2000) on a 200x150 white page.
fn rectangle_page() -> DynamicImage {
    DynamicImage::ImageLuma8(GrayImage::from_fn(200, 150, |x, y| {
        if (60..110).contains(&x) && (50..90).contains(&y) {
            BLACK
        } else {
            WHITE
        }
    }))
}

/// 2-pixel black lines every 8 pixels in both directions.
fn grid_page() -> DynamicImage {
    DynamicImage::ImageLuma8(GrayImage::from_fn(96, 96, |x, y| {
        if x % 8 < 2 || y % 8 < 2 { BLACK } else { WHITE }
    }))
}

#[test]
fn preprocess_is_deterministic() {
    let config = AnalysisConfig::default();
    let page = rectangle_page();
    let first = preprocess(Some(&page), &config).unwrap();
    let second = preprocess(Some(&page), &config).unwrap();
    assert_eq!(first.as_raw(), second.as_raw());
}

#[test]
fn cleaned_page_is_binary() {
    let page = DynamicImage::ImageRgb8(RgbImage::from_fn(64, 48, |x, y| {
        let v = u8::try_from((x * 3 + y * 2) % 256).unwrap();
        Rgb([v, v / 2, 255 - v])
    }));
    let cleaned = preprocess(Some(&page), &AnalysisConfig::default()).unwrap();
    assert_eq!(cleaned.dimensions(), (64, 48));
    assert!(cleaned.pixels().all(|p| p.0[0] == 0 || p.0[0] == 255));
}

#[test]
fn all_white_page_is_not_a_diagram() {
    let config = AnalysisConfig::default();
    let edges = extract_edges(Some(&white_page(120, 80)), &config);
    let verdict = classify_diagram(&edges, &config);
    assert!(verdict.edge_density.abs() < f64::EPSILON);
    assert!(!verdict.is_diagram);
    assert!(find_table_regions(&edges, &config).is_empty());
}

#[test]
fn filled_rectangle_is_one_table_candidate() {
    let config = AnalysisConfig::default();
    let edges = extract_edges(Some(&rectangle_page()), &config);
    let tables = find_table_regions(&edges, &config);

    assert_eq!(tables.len(), 1);
    let relative_error = (tables[0].area - 2000.0).abs() / 2000.0;
    assert!(relative_error < 0.1, "area {}", tables[0].area);
    assert!(tables[0].contour.len() >= 4);

    let verdict = classify_diagram(&edges, &config);
    assert_eq!(
        verdict.is_diagram,
        verdict.edge_density > config.diagram_density_threshold
    );
    assert!(!verdict.is_diagram);
}

#[test]
fn rectangle_outline_is_one_pixel_wide() {
    let config = AnalysisConfig::default();
    let edges = extract_edges(Some(&rectangle_page()), &config);
    let map = edges.as_image();

    let row: Vec<u32> = (0..200).filter(|&x| map.get_pixel(x, 70).0[0] > 0).collect();
    assert_eq!(row, vec![59, 109]);
    let column: Vec<u32> = (0..150).filter(|&y| map.get_pixel(85, y).0[0] > 0).collect();
    assert_eq!(column, vec![49, 89]);

    // About one pixel per unit of the 180-pixel perimeter.
    let count = edges.edge_pixel_count();
    assert!((150..=230).contains(&count), "{count} edge pixels");
}

#[test]
fn widely_spaced_bands_are_not_a_diagram() {
    // One edge per 12-pixel band boundary keeps the density near 0.07.
    let bands = DynamicImage::ImageLuma8(GrayImage::from_fn(96, 96, |x, _| {
        if (x / 12) % 2 == 0 { BLACK } else { WHITE }
    }));
    let config = AnalysisConfig::default();
    let edges = extract_edges(Some(&bands), &config);
    let verdict = classify_diagram(&edges, &config);
    assert!(verdict.edge_density < 0.09, "density {}", verdict.edge_density);
    assert!(!verdict.is_diagram);
}

#[test]
fn diagram_verdict_ignores_rectangle_area() {
    // Moving the threshold across the measured density flips the verdict
    // while the rectangle stays the same.
    let config = AnalysisConfig::default();
    let edges = extract_edges(Some(&rectangle_page()), &config);
    let density = classify_diagram(&edges, &config).edge_density;

    let just_below = AnalysisConfig {
        diagram_density_threshold: density - 1e-6,
        ..AnalysisConfig::default()
    };
    assert!(classify_diagram(&edges, &just_below).is_diagram);
}

#[test]
fn dense_grid_is_a_diagram() {
    let config = AnalysisConfig::default();
    let edges = extract_edges(Some(&grid_page()), &config);
    let verdict = classify_diagram(&edges, &config);
    assert!(verdict.edge_density > 0.1, "density {}", verdict.edge_density);
    assert!(verdict.is_diagram);
}

#[test]
fn absent_image_yields_absent_results() {
    let config = AnalysisConfig::default();
    assert!(preprocess(None, &config).is_none());
    let edges = extract_edges(None, &config);
    assert!(edges.is_empty());
    assert!(find_table_regions(&edges, &config).is_empty());
    assert!(!classify_diagram(&edges, &config).is_diagram);
}

#[test]
fn raw_bitmap_matches_decoded_file() {
    let page = rectangle_page();
    let gray = page.to_luma8();
    let raw = RawImage {
        width: gray.width(),
        height: gray.height(),
        channels: 1,
        pixels: gray.as_raw(),
    }
    .to_dynamic()
    .unwrap();

    let mut png = Vec::new();
    page.write_to(&mut Cursor::new(&mut png), ImageFormat::Png)
        .unwrap();

    let config = AnalysisConfig::default();
    let from_file = pagesift_pipeline::analyze(&png, &config).unwrap();
    let from_raw = Analyzer::new(config).unwrap().analyze(Some(&raw));
    assert_eq!(from_file.tables, from_raw.tables);
    assert_eq!(from_file.cleaned, from_raw.cleaned);
}

#[test]
fn undecodable_bytes_are_no_image() {
    assert!(pagesift_pipeline::raster::load(b"not an image").is_none());
    assert!(pagesift_pipeline::raster::load(&[]).is_none());
    assert!(pagesift_pipeline::analyze(b"not an image", &AnalysisConfig::default()).is_err());
}

#[test]
fn shared_cache_computes_each_page_once_across_threads() {
    let cache = Arc::new(SessionCache::new());
    let page = grid_page();
    let calls = AtomicUsize::new(0);
    let recognizer = |image: &GrayImage, _: &LanguageModel| -> Result<String, RecognitionError> {
        calls.fetch_add(1, Ordering::SeqCst);
        Ok(format!("{} px", image.len()))
    };

    std::thread::scope(|scope| {
        for _ in 0..4 {
            scope.spawn(|| {
                let analyzer =
                    Analyzer::with_cache(AnalysisConfig::default(), Arc::clone(&cache)).unwrap();
                let analysis = analyzer.analyze(Some(&page));
                assert!(analysis.diagram.is_diagram);
                let text = analyzer
                    .transcribe(Some(&page), &recognizer, &LanguageModel::default())
                    .unwrap();
                assert_eq!(text, Transcription::Text(String::from("9216 px")));
            });
        }
    });

    assert_eq!(cache.cleaned.len(), 1);
    assert_eq!(cache.edges.len(), 1);
    assert_eq!(calls.load(Ordering::SeqCst), 4);
}
