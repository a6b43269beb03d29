use image::{ GrayImage, RgbImage };
use image::imageops;
use imageproc::contrast;

/// Binary image handed to the recognizer: every pixel is 0 or 255, and the
/// background is whichever value covered the majority after thresholding.
pub type BinaryImage = GrayImage;

/// Turns a colour plate crop into a binary image, light background and dark text.
pub fn binarize(crop: &RgbImage) -> BinaryImage {
    let (width, height) = crop.dimensions();
    if width == 0 || height == 0 {
        return GrayImage::new(width, height);
    }
    let gray = imageops::grayscale(crop);
    let level = contrast::otsu_level(&gray);
    let thresholded = contrast::threshold(&gray, level);
    resolve_polarity(thresholded)
}

pub fn white_ratio(image: &GrayImage) -> f64 {
    let total = image.as_raw().len();
    if total == 0 {
        return 0.0;
    }
    let white = image.as_raw().iter().filter(|v| **v == 255).count();
    white as f64 / total as f64
}

/// Keeps the image when white is the strict majority, inverts it otherwise.
pub fn resolve_polarity(mut image: GrayImage) -> BinaryImage {
    if white_ratio(&image) <= 0.5 {
        imageops::invert(&mut image);
    }
    image
}


#[cfg(test)]
mod test {

    use image::{ GrayImage, Luma, Rgb, RgbImage };

    use super::{ binarize, resolve_polarity, white_ratio };

    // 20x10 plate, a 4x10 glyph stripe in the middle of the plate
    fn plate(background: u8, text: u8) -> RgbImage {
        RgbImage::from_fn(20, 10, |x, _| {
            if (8..12).contains(&x) {
                Rgb([text, text, text])
            } else {
                Rgb([background, background, background])
            }
        })
    }

    #[test]
    fn light_plate_keeps_polarity() {
        let binary = binarize(&plate(200, 30));
        assert_eq!(binary.dimensions(), (20, 10));
        assert_eq!(binary.get_pixel(0, 0), &Luma([255]));
        assert_eq!(binary.get_pixel(9, 3), &Luma([0]));
        assert!((white_ratio(&binary) - 0.8).abs() < 1e-9);
    }

    #[test]
    fn dark_plate_is_inverted() {
        let binary = binarize(&plate(30, 200));
        assert_eq!(binary.get_pixel(0, 0), &Luma([255]));
        assert_eq!(binary.get_pixel(9, 3), &Luma([0]));
    }

    #[test]
    fn output_is_strictly_binary() {
        let crop = RgbImage::from_fn(16, 16, |x, y| Rgb([(x * 16) as u8, (y * 16) as u8, 90]));
        let binary = binarize(&crop);
        assert!(binary.as_raw().iter().all(|v| *v == 0 || *v == 255));
        assert!(white_ratio(&binary) >= 0.5);
    }

    #[test]
    fn half_white_is_inverted() {
        let image = GrayImage::from_fn(4, 2, |x, _| if x < 2 { Luma([255]) } else { Luma([0]) });
        let resolved = resolve_polarity(image);
        assert_eq!(resolved.get_pixel(0, 0), &Luma([0]));
        assert_eq!(resolved.get_pixel(3, 1), &Luma([255]));
    }

    #[test]
    fn majority_white_is_kept() {
        let image = GrayImage::from_fn(3, 1, |x, _| if x < 2 { Luma([255]) } else { Luma([0]) });
        let resolved = resolve_polarity(image.clone());
        assert_eq!(resolved, image);
    }

    #[test]
    fn empty_crop_stays_empty() {
        let binary = binarize(&RgbImage::new(0, 7));
        assert_eq!(binary.dimensions(), (0, 7));
    }
}
