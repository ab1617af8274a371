//! Image primitives and utilities.
//!
//! The pipeline uses a lightweight owned RGB image type (`OwnedImage`) that is
//! optimized for repeated cropping/resizing of screenshot regions.
//!
//! For most operations we borrow a view (`Image<'a>`) instead of copying
//! pixels. Slot matching walks hundreds of cell/template pairs per screenshot,
//! so views keep that loop allocation-free until a copy is actually needed.

use anyhow::{Context, Result};

/// Owned RGB image (no alpha).
#[derive(Clone, Debug)]
pub struct OwnedImage {
    width: u32,
    height: u32,
    data: Vec<Color>,
}

impl OwnedImage {
    /// Build an `OwnedImage` from RGBA bytes (alpha is discarded).
    ///
    /// The buffer is expected to be tightly packed: `width * height * 4` bytes.
    pub fn from_rgba(width: usize, bytes: &[u8]) -> Self {
        let height = bytes.len() / width / 4;
        let data = bytes
            .chunks_exact(4)
            .map(|v| Color::new(v[0], v[1], v[2]))
            .collect::<Vec<_>>();

        Self {
            width: width as u32,
            height: height as u32,
            data,
        }
    }

    /// Build an image from a pre-assembled pixel vector (row-major).
    pub fn from_pixels(width: u32, height: u32, data: Vec<Color>) -> Self {
        debug_assert_eq!(data.len(), (width * height) as usize);
        Self {
            width,
            height,
            data,
        }
    }

    /// A uniform image of the given color.
    pub fn filled(width: u32, height: u32, color: Color) -> Self {
        Self {
            width,
            height,
            data: vec![color; (width * height) as usize],
        }
    }

    /// Decode an encoded image (PNG, WebP, ...) from memory.
    pub fn decode(bytes: &[u8]) -> Result<Self> {
        let img = image::load_from_memory(bytes)
            .context("decode image")?
            .to_rgb8();
        let (width, height) = img.dimensions();
        let data = img
            .pixels()
            .map(|p| Color::new(p.0[0], p.0[1], p.0[2]))
            .collect();

        Ok(Self {
            width,
            height,
            data,
        })
    }

    /// Load and decode an image file.
    pub fn from_file(path: impl AsRef<std::path::Path>) -> Result<Self> {
        let path = path.as_ref();
        let bytes =
            std::fs::read(path).with_context(|| format!("read image {}", path.display()))?;
        Self::decode(&bytes).with_context(|| format!("decode image {}", path.display()))
    }

    #[inline(always)]
    pub fn width(&self) -> u32 {
        self.width
    }

    #[inline(always)]
    pub fn height(&self) -> u32 {
        self.height
    }

    /// Resize this image to exactly `width` x `height`.
    ///
    /// Uses `fast_image_resize` (SIMD-optimized) and keeps output in `Vec<Color>`.
    pub fn resize_to(&mut self, width: u32, height: u32) {
        if self.width == width && self.height == height {
            return;
        }

        let width = width.max(1);
        let height = height.max(1);

        // SAFETY: `Color` is `#[repr(C)]` with 3 x `u8`, so it is layout-compatible
        // with `fast_image_resize::pixels::U8x3` (alignment 1).
        let src_pixels = unsafe {
            std::slice::from_raw_parts(
                self.data.as_ptr() as *const fast_image_resize::pixels::U8x3,
                self.data.len(),
            )
        };

        let src =
            fast_image_resize::images::ImageRef::from_pixels(self.width, self.height, src_pixels)
                .expect("fast_image_resize: ImageRef::from_pixels failed");

        let mut dst =
            fast_image_resize::images::Image::new(width, height, fast_image_resize::PixelType::U8x3);

        let mut resizer = fast_image_resize::Resizer::new();
        let options = fast_image_resize::ResizeOptions::new().resize_alg(
            fast_image_resize::ResizeAlg::Interpolation(fast_image_resize::FilterType::CatmullRom),
        );

        resizer
            .resize(&src, &mut dst, &Some(options))
            .expect("fast_image_resize: resize failed");

        let bytes: Vec<u8> = dst.into_vec();
        let mut data = Vec::with_capacity((width * height) as usize);
        for px in bytes.chunks_exact(3) {
            data.push(Color::new(px[0], px[1], px[2]));
        }

        self.width = width;
        self.height = height;
        self.data = data;
    }

    #[inline]
    pub fn resized_to(mut self, width: u32, height: u32) -> Self {
        self.resize_to(width, height);
        self
    }

    /// Copy `src` into this image with its top-left corner at (x, y).
    ///
    /// Out-of-bounds parts of `src` are dropped. Mostly useful for composing
    /// synthetic screenshots in tests and debug tooling.
    pub fn blit(&mut self, x: u32, y: u32, src: Image) {
        for sy in 0..src.height() {
            let dy = y + sy;
            if dy >= self.height {
                break;
            }
            for sx in 0..src.width() {
                let dx = x + sx;
                if dx >= self.width {
                    break;
                }
                self.data[(dx + dy * self.width) as usize] = src.pixel(sx, sy);
            }
        }
    }

    /// Create a borrowed view of this entire image.
    pub fn as_image<'a>(&'a self) -> Image<'a> {
        Image {
            x1: 0,
            y1: 0,
            x2: self.width,
            y2: self.height,
            true_width: self.width,
            data: &self.data,
        }
    }

    /// Convert to a grayscale `GrayImage` (luma).
    pub fn to_gray_image(&self) -> image::GrayImage {
        use image::{GrayImage, Luma};
        let mut out = GrayImage::new(self.width, self.height);
        for y in 0..self.height {
            for x in 0..self.width {
                let c = self.data[(x + y * self.width) as usize];
                out.put_pixel(x, y, Luma([c.luma()]));
            }
        }
        out
    }
}

// ----------

/// Borrowed image view into an `OwnedImage`.
#[derive(Clone, Copy)]
pub struct Image<'a> {
    x1: u32,
    y1: u32,
    x2: u32,
    y2: u32,
    true_width: u32,
    data: &'a [Color],
}

impl<'a> Image<'a> {
    #[inline(always)]
    pub fn width(&self) -> u32 {
        self.x2 - self.x1
    }

    #[inline(always)]
    pub fn height(&self) -> u32 {
        self.y2 - self.y1
    }

    #[inline(always)]
    pub fn pixel(&self, x: u32, y: u32) -> Color {
        self.data[(self.x1 + x + (self.y1 + y) * self.true_width) as usize]
    }

    /// Row-major iterator over the view's pixels.
    pub fn pixels(&self) -> impl Iterator<Item = Color> + 'a {
        let Image {
            x1,
            y1,
            x2,
            y2,
            true_width,
            data,
        } = *self;
        (y1..y2).flat_map(move |y| (x1..x2).map(move |x| data[(x + y * true_width) as usize]))
    }

    pub fn to_owned_image(self) -> OwnedImage {
        OwnedImage {
            width: self.width(),
            height: self.height(),
            data: self.pixels().collect(),
        }
    }

    pub fn get_bytes(&self) -> Vec<u8> {
        let mut bytes = Vec::with_capacity((self.width() * self.height() * 3) as usize);
        for clr in self.pixels() {
            bytes.push(clr.r);
            bytes.push(clr.g);
            bytes.push(clr.b);
        }
        bytes
    }

    pub fn save_png<P: AsRef<std::path::Path>>(&self, path: P) -> Result<()> {
        let bytes = self.get_bytes();
        let img = image::RgbImage::from_raw(self.width(), self.height(), bytes)
            .context("RgbImage::from_raw failed")?;
        img.save_with_format(path, image::ImageFormat::Png)
            .context("save png")?;
        Ok(())
    }

    /// Create an arbitrary subimage (relative coordinates).
    pub fn sub_image(&self, x: u32, y: u32, width: u32, height: u32) -> Self {
        let x = x.min(self.width());
        let y = y.min(self.height());
        let width = width.min(self.width() - x);
        let height = height.min(self.height() - y);

        Self {
            x1: self.x1 + x,
            y1: self.y1 + y,
            x2: self.x1 + x + width,
            y2: self.y1 + y + height,
            true_width: self.true_width,
            data: self.data,
        }
    }

    pub fn average_color(&self) -> Color {
        let mut r = 0u32;
        let mut g = 0u32;
        let mut b = 0u32;

        for clr in self.pixels() {
            r += clr.r as u32;
            g += clr.g as u32;
            b += clr.b as u32;
        }

        let count = self.width() * self.height();
        if count == 0 {
            return Color::BLACK;
        }
        Color {
            r: (r / count) as u8,
            g: (g / count) as u8,
            b: (b / count) as u8,
        }
    }

    /// Grayscale reduction: unweighted (R+G+B)/3 per pixel, full resolution.
    ///
    /// The similarity metrics all consume this representation.
    pub fn gray_values(&self) -> Vec<f32> {
        self.pixels()
            .map(|c| (c.r as f32 + c.g as f32 + c.b as f32) / 3.0)
            .collect()
    }
}

// ----------

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, serde::Deserialize, serde::Serialize)]
#[repr(C)]
pub struct Color {
    pub r: u8,
    pub g: u8,
    pub b: u8,
}

impl Color {
    pub const WHITE: Self = Self::new(255, 255, 255);
    pub const BLACK: Self = Self::new(0, 0, 0);

    #[inline]
    pub const fn new(r: u8, g: u8, b: u8) -> Self {
        Self { r, g, b }
    }

    /// Euclidean distance in RGB space.
    pub fn distance(&self, other: Color) -> f32 {
        let dr = self.r as f32 - other.r as f32;
        let dg = self.g as f32 - other.g as f32;
        let db = self.b as f32 - other.b as f32;
        (dr * dr + dg * dg + db * db).sqrt()
    }

    /// Compute luma (grayscale intensity).
    pub fn luma(&self) -> u8 {
        let r = self.r as u32;
        let g = self.g as u32;
        let b = self.b as u32;
        ((299 * r + 587 * g + 114 * b) / 1000) as u8
    }
}
