//! Diagnostic snapshot analysis
//!
//! Screenshots are taken purely for operability. Their only use is to flag a
//! render that painted (almost) nothing but white.

use image::GenericImageView;

/// Below this share of inked pixels a snapshot is reported as blank
pub const BLANK_INK_RATIO: f64 = 0.001;

/// Channel value above which a pixel counts as paper white
const WHITE_LEVEL: u8 = 250;

/// Share of pixels in a PNG snapshot that are not (near) white
pub fn ink_ratio(png: &[u8]) -> Result<f64, image::ImageError> {
    let img = image::load_from_memory(png)?;
    let (width, height) = img.dimensions();
    let total = width as u64 * height as u64;
    if total == 0 {
        return Ok(0.0);
    }

    let inked = img
        .to_rgba8()
        .pixels()
        .filter(|p| {
            let [r, g, b, a] = p.0;
            a > 0 && (r < WHITE_LEVEL || g < WHITE_LEVEL || b < WHITE_LEVEL)
        })
        .count() as u64;

    Ok(inked as f64 / total as f64)
}

/// Log what a diagnostic snapshot shows; never fails the caller
pub fn report_snapshot(label: &str, png: &[u8]) {
    match ink_ratio(png) {
        Ok(ratio) if ratio < BLANK_INK_RATIO => {
            tracing::warn!(
                "{} snapshot looks blank ({} bytes, {:.4}% inked)",
                label,
                png.len(),
                ratio * 100.0
            );
        }
        Ok(ratio) => {
            tracing::debug!(
                "{} snapshot: {} bytes, {:.2}% inked",
                label,
                png.len(),
                ratio * 100.0
            );
        }
        Err(e) => tracing::warn!("{} snapshot could not be decoded: {}", label, e),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;

    fn png(img: image::RgbaImage) -> Vec<u8> {
        let mut buffer = Vec::new();
        img.write_to(&mut Cursor::new(&mut buffer), image::ImageFormat::Png)
            .unwrap();
        buffer
    }

    #[test]
    fn test_blank_snapshot() {
        let white = image::RgbaImage::from_pixel(10, 10, image::Rgba([255, 255, 255, 255]));
        assert_eq!(ink_ratio(&png(white)).unwrap(), 0.0);
    }

    #[test]
    fn test_partially_inked_snapshot() {
        let img = image::RgbaImage::from_fn(10, 10, |x, _| {
            if x < 3 {
                image::Rgba([20, 20, 20, 255])
            } else {
                image::Rgba([255, 255, 255, 255])
            }
        });
        let ratio = ink_ratio(&png(img)).unwrap();
        assert!((ratio - 0.3).abs() < 1e-9);
    }

    #[test]
    fn test_transparent_pixels_are_not_ink() {
        let clear = image::RgbaImage::from_pixel(4, 4, image::Rgba([0, 0, 0, 0]));
        assert_eq!(ink_ratio(&png(clear)).unwrap(), 0.0);
    }

    #[test]
    fn test_garbage_is_an_error() {
        assert!(ink_ratio(b"not a png").is_err());
    }
}
