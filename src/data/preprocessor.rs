// ============================================================
// Layer 4 — Image Preprocessor
// ============================================================
// Fits a decoded image of arbitrary size onto the fixed
// training canvas, then normalises it into f32 values.
//
// Two fitting modes:
//
//   Letterbox (default)
//     ┌───────────────┐   scale so the LARGER side fits exactly,
//     │▓▓▓▓▓▓▓▓▓▓▓▓▓▓▓│   keep the aspect ratio, centre the result
//     │   image       │   on a black canvas
//     │▓▓▓▓▓▓▓▓▓▓▓▓▓▓▓│
//     └───────────────┘
//
//   CenterCrop
//     scale so the SMALLER side fits exactly, then cut the
//     centred target-sized window out of the scaled image
//
// Scaled sizes are computed with integer arithmetic so the
// fitted side always lands on the target size exactly.
//
// Normalisation divides every byte by 255 and lays the values
// out channel-major ([C, H, W]), the layout Burn's conv layers use.
//
// Reference: image crate documentation (imageops)

use anyhow::{bail, Result};
use image::{imageops, imageops::FilterType, DynamicImage, ImageBuffer, Pixel};

use crate::domain::image_spec::{Depth, ImageGeometry, ResizeMode};

/// Where a scaled source image goes relative to the canvas.
///
/// For letterboxing the offsets are the paste position on the canvas;
/// for cropping they are the crop origin inside the scaled image.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Placement {
    pub width:    u32,
    pub height:   u32,
    pub offset_x: u32,
    pub offset_y: u32,
}

/// Aspect-preserving size that fits inside `dst`, centred.
pub fn letterbox_placement(src: (u32, u32), dst: (u32, u32)) -> Placement {
    let (sw, sh) = (src.0.max(1) as u64, src.1.max(1) as u64);
    let (dw, dh) = (dst.0 as u64, dst.1 as u64);

    // Width-bound when the source is relatively wider than the canvas
    let (w, h) = if sw * dh >= sh * dw {
        (dw, (sh * dw / sw).clamp(1, dh))
    } else {
        ((sw * dh / sh).clamp(1, dw), dh)
    };

    Placement {
        width:    w as u32,
        height:   h as u32,
        offset_x: ((dw - w) / 2) as u32,
        offset_y: ((dh - h) / 2) as u32,
    }
}

/// Aspect-preserving size that covers `dst`, with the centred crop origin.
pub fn crop_placement(src: (u32, u32), dst: (u32, u32)) -> Placement {
    let (sw, sh) = (src.0.max(1) as u64, src.1.max(1) as u64);
    let (dw, dh) = (dst.0 as u64, dst.1 as u64);

    let (w, h) = if sw * dh >= sh * dw {
        ((sw * dh / sh).max(dw), dh)
    } else {
        (dw, (sh * dw / sw).max(dh))
    };

    Placement {
        width:    w as u32,
        height:   h as u32,
        offset_x: ((w - dw) / 2) as u32,
        offset_y: ((h - dh) / 2) as u32,
    }
}

/// Fits and normalises images for one canvas geometry.
#[derive(Debug, Clone)]
pub struct Preprocessor {
    geometry: ImageGeometry,
    mode:     ResizeMode,
}

impl Preprocessor {
    pub fn new(geometry: ImageGeometry, mode: ResizeMode) -> Self {
        Self { geometry, mode }
    }

    pub fn geometry(&self) -> ImageGeometry { self.geometry }

    /// Fit `img` onto the canvas, converting it to the canvas depth.
    pub fn fit(&self, img: &DynamicImage) -> DynamicImage {
        match self.geometry.depth {
            Depth::Grayscale => DynamicImage::ImageLuma8(self.fit_buffer(&img.to_luma8())),
            Depth::Rgb       => DynamicImage::ImageRgb8(self.fit_buffer(&img.to_rgb8())),
        }
    }

    fn fit_buffer<P>(&self, src: &ImageBuffer<P, Vec<u8>>) -> ImageBuffer<P, Vec<u8>>
    where
        P: Pixel<Subpixel = u8> + 'static,
    {
        let dst = (self.geometry.width, self.geometry.height);

        match self.mode {
            ResizeMode::Letterbox => {
                let p       = letterbox_placement(src.dimensions(), dst);
                let resized = imageops::resize(src, p.width, p.height, FilterType::Triangle);
                // A fresh buffer is zero-filled, i.e. black
                let mut canvas = ImageBuffer::new(dst.0, dst.1);
                imageops::replace(&mut canvas, &resized, p.offset_x as i64, p.offset_y as i64);
                canvas
            }
            ResizeMode::CenterCrop => {
                let p       = crop_placement(src.dimensions(), dst);
                let resized = imageops::resize(src, p.width, p.height, FilterType::Triangle);
                imageops::crop_imm(&resized, p.offset_x, p.offset_y, dst.0, dst.1).to_image()
            }
        }
    }

    /// Returns true when `img` already has the exact canvas size.
    pub fn fits_canvas(&self, img: &DynamicImage) -> bool {
        img.width() == self.geometry.width && img.height() == self.geometry.height
    }

    /// Convert a fitted image into channel-major values in [0, 1].
    pub fn normalize(&self, img: &DynamicImage) -> Result<Vec<f32>> {
        if !self.fits_canvas(img) {
            bail!(
                "Image is {}x{}, expected {}x{}",
                img.width(), img.height(), self.geometry.width, self.geometry.height
            );
        }

        let raw: &[u8] = match (self.geometry.depth, img) {
            (Depth::Grayscale, DynamicImage::ImageLuma8(buf)) => buf.as_raw(),
            (Depth::Rgb,       DynamicImage::ImageRgb8(buf))  => buf.as_raw(),
            (depth, other) => bail!("Expected {:?} pixels, got {:?}", depth, other.color()),
        };

        let channels = self.geometry.channels();
        let plane    = self.geometry.width as usize * self.geometry.height as usize;
        let mut out  = vec![0.0f32; self.geometry.values_per_sample()];

        // Interleaved HWC bytes → planar CHW floats
        for (i, px) in raw.chunks_exact(channels).enumerate() {
            for (c, &v) in px.iter().enumerate() {
                out[c * plane + i] = v as f32 / 255.0;
            }
        }
        Ok(out)
    }
}

// ─── Unit Tests ───────────────────────────────────────────────────────────────
#[cfg(test)]
mod tests {
    use super::*;
    use image::{GrayImage, Luma, Rgb, RgbImage};

    fn gray_preprocessor(w: u32, h: u32, mode: ResizeMode) -> Preprocessor {
        Preprocessor::new(ImageGeometry::new(w, h, 1).unwrap(), mode)
    }

    #[test]
    fn test_letterbox_wide_source() {
        let p = letterbox_placement((200, 100), (256, 256));
        assert_eq!(p, Placement { width: 256, height: 128, offset_x: 0, offset_y: 64 });
    }

    #[test]
    fn test_letterbox_tall_source_on_wide_canvas() {
        let p = letterbox_placement((30, 90), (300, 150));
        assert_eq!((p.width, p.height), (50, 150));
        assert_eq!((p.offset_x, p.offset_y), (125, 0));
    }

    #[test]
    fn test_letterbox_preserves_aspect_ratio() {
        for (w, h) in [(640, 480), (123, 457), (1000, 3), (256, 256), (17, 17)] {
            let p = letterbox_placement((w, h), (256, 256));
            assert!(p.width <= 256 && p.height <= 256);
            assert!(p.width == 256 || p.height == 256);

            // Truncation may only cost the short side one source-scaled pixel
            let cross_a = p.width as u64 * h as u64;
            let cross_b = p.height as u64 * w as u64;
            assert!(cross_a.abs_diff(cross_b) < w.max(h) as u64, "{w}x{h} → {}x{}", p.width, p.height);
        }
    }

    #[test]
    fn test_letterbox_is_centred_within_one_pixel() {
        for (w, h) in [(201, 100), (100, 201), (7, 3)] {
            let p        = letterbox_placement((w, h), (256, 256));
            let left     = p.offset_x;
            let right    = 256 - p.width - p.offset_x;
            let top      = p.offset_y;
            let bottom   = 256 - p.height - p.offset_y;
            assert!(left.abs_diff(right) <= 1);
            assert!(top.abs_diff(bottom) <= 1);
        }
    }

    #[test]
    fn test_degenerate_source_keeps_one_pixel() {
        let p = letterbox_placement((5000, 1), (256, 256));
        assert_eq!((p.width, p.height), (256, 1));
    }

    #[test]
    fn test_letterbox_pads_with_black() {
        let pre = gray_preprocessor(64, 64, ResizeMode::Letterbox);
        let img = DynamicImage::ImageLuma8(GrayImage::from_pixel(100, 50, Luma([255])));

        let fitted = pre.fit(&img);
        assert_eq!((fitted.width(), fitted.height()), (64, 64));

        let buf = fitted.as_luma8().unwrap();
        // 100x50 → 64x32 placed at y = 16
        assert_eq!(buf.get_pixel(32, 0)[0], 0);
        assert_eq!(buf.get_pixel(32, 15)[0], 0);
        assert!(buf.get_pixel(32, 32)[0] >= 250);
        assert_eq!(buf.get_pixel(32, 63)[0], 0);
    }

    #[test]
    fn test_center_crop_fills_canvas() {
        let pre = gray_preprocessor(32, 32, ResizeMode::CenterCrop);
        let img = DynamicImage::ImageLuma8(GrayImage::from_pixel(90, 30, Luma([200])));

        let fitted = pre.fit(&img);
        assert_eq!((fitted.width(), fitted.height()), (32, 32));
        assert!(fitted.as_luma8().unwrap().pixels().all(|p| p[0] >= 195));
    }

    #[test]
    fn test_crop_placement_centres_window() {
        let p = crop_placement((300, 100), (64, 64));
        assert_eq!((p.width, p.height), (192, 64));
        assert_eq!((p.offset_x, p.offset_y), (64, 0));
    }

    #[test]
    fn test_normalize_is_channel_major() {
        let pre = Preprocessor::new(ImageGeometry::new(2, 1, 3).unwrap(), ResizeMode::Letterbox);
        let mut img = RgbImage::new(2, 1);
        img.put_pixel(0, 0, Rgb([255, 0, 51]));
        img.put_pixel(1, 0, Rgb([0, 255, 102]));

        let values = pre.normalize(&DynamicImage::ImageRgb8(img)).unwrap();
        assert_eq!(values, vec![1.0, 0.0, 0.0, 1.0, 0.2, 0.4]);
    }

    #[test]
    fn test_normalize_rejects_wrong_size_and_depth() {
        let pre = gray_preprocessor(4, 4, ResizeMode::Letterbox);
        let small = DynamicImage::ImageLuma8(GrayImage::new(3, 4));
        assert!(pre.normalize(&small).is_err());

        let rgb = DynamicImage::ImageRgb8(RgbImage::new(4, 4));
        assert!(pre.normalize(&rgb).is_err());
    }
}
