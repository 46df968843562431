use image::{GrayImage, Luma, RgbaImage};

use crate::config::RelativeRect;

/// Crops a sub-region from an image using relative coordinates.
///
/// Converts the relative rect (0.0–1.0) to absolute pixel coordinates,
/// clamps to image bounds, and returns the cropped sub-image.
pub fn crop_region(img: &RgbaImage, region: &RelativeRect) -> RgbaImage {
    let (w, h) = img.dimensions();

    let x0 = ((region.x * w as f32) as u32).min(w);
    let y0 = ((region.y * h as f32) as u32).min(h);
    let rw = ((region.width * w as f32) as u32).min(w - x0);
    let rh = ((region.height * h as f32) as u32).min(h - y0);

    image::imageops::crop_imm(img, x0, y0, rw, rh).to_image()
}

/// Computes Otsu's threshold for a grayscale image.
///
/// Picks the level that maximizes between-class variance of the histogram.
pub fn otsu_level(img: &GrayImage) -> u8 {
    let mut histogram = [0u64; 256];
    for pixel in img.pixels() {
        histogram[pixel[0] as usize] += 1;
    }

    let total: u64 = histogram.iter().sum();
    if total == 0 {
        return 0;
    }
    let weighted_total: f64 = histogram
        .iter()
        .enumerate()
        .map(|(level, &count)| level as f64 * count as f64)
        .sum();

    let mut best_level = 0u8;
    let mut best_variance = 0.0f64;
    let mut background_count = 0u64;
    let mut background_sum = 0.0f64;

    for (level, &count) in histogram.iter().enumerate() {
        background_count += count;
        if background_count == 0 {
            continue;
        }
        let foreground_count = total - background_count;
        if foreground_count == 0 {
            break;
        }

        background_sum += level as f64 * count as f64;
        let background_mean = background_sum / background_count as f64;
        let foreground_mean = (weighted_total - background_sum) / foreground_count as f64;

        let diff = background_mean - foreground_mean;
        let variance = background_count as f64 * foreground_count as f64 * diff * diff;
        if variance > best_variance {
            best_variance = variance;
            best_level = level as u8;
        }
    }

    best_level
}

/// Converts a slot crop to a black-and-white image for OCR.
///
/// Grayscale, then Otsu binarization. Pixels above the threshold become white.
pub fn binarize_otsu(img: &RgbaImage) -> GrayImage {
    let gray = image::imageops::grayscale(img);
    let level = otsu_level(&gray);

    let mut output = GrayImage::new(gray.width(), gray.height());
    for (x, y, pixel) in gray.enumerate_pixels() {
        let value = if pixel[0] > level { 255u8 } else { 0u8 };
        output.put_pixel(x, y, Luma([value]));
    }
    output
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::Rgba;

    #[test]
    fn test_crop_region() {
        // 100x200 image
        let img = RgbaImage::from_fn(100, 200, |x, y| Rgba([x as u8, y as u8, 0, 255]));

        let region = RelativeRect { x: 0.1, y: 0.25, width: 0.5, height: 0.1 };
        let cropped = crop_region(&img, &region);

        assert_eq!(cropped.dimensions(), (50, 20));
        assert_eq!(cropped.get_pixel(0, 0)[0], 10);
        assert_eq!(cropped.get_pixel(0, 0)[1], 50);
    }

    #[test]
    fn test_crop_slot_band() {
        let img = RgbaImage::new(1280, 720);
        let cropped = crop_region(&img, &RelativeRect::band(0.40, 0.60));
        assert_eq!(cropped.width(), 1280);
        assert!((143..=144).contains(&cropped.height()));
    }

    #[test]
    fn test_otsu_splits_two_levels() {
        let img = GrayImage::from_fn(10, 10, |x, _| if x < 5 { Luma([40]) } else { Luma([210]) });
        let level = otsu_level(&img);
        assert!((40..210).contains(&level));
    }

    #[test]
    fn test_otsu_uniform_image() {
        let img = GrayImage::from_pixel(4, 4, Luma([128]));
        assert_eq!(otsu_level(&img), 0);
    }

    #[test]
    fn test_binarize_otsu() {
        let img = RgbaImage::from_fn(4, 1, |x, _| {
            if x < 2 {
                Rgba([20, 20, 20, 255])
            } else {
                Rgba([240, 240, 240, 255])
            }
        });
        let result = binarize_otsu(&img);

        assert_eq!(result.get_pixel(0, 0)[0], 0, "Dark pixel should become black");
        assert_eq!(result.get_pixel(3, 0)[0], 255, "Bright pixel should become white");
    }
}
