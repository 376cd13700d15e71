use std::cell::RefCell;
use std::path::{Path, PathBuf};

use tiny_skia as sk;

use crate::dna::{Genome, Polygon};
use crate::error::RenderError;

/// premultiplied RGBA8 image, row-major, 4 bytes per pixel
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Raster {
    pub width: u32,
    pub height: u32,
    pub data: Vec<u8>,
}

impl Raster {
    /// solid raster from an un-premultiplied color
    pub fn filled(width: u32, height: u32, rgba: [u8; 4]) -> Self {
        let px = premultiply(&rgba);
        let data = px.iter().copied().cycle().take(width as usize * height as usize * 4).collect();
        Self { width, height, data }
    }

    /// wrap un-premultiplied RGBA8 bytes (what image decoders hand out)
    pub fn from_rgba_unpremul(width: u32, height: u32, rgba: &[u8]) -> Result<Self, RenderError> {
        if rgba.len() != width as usize * height as usize * 4 {
            return Err(RenderError::BufferSize { width, height, len: rgba.len() });
        }
        Ok(Self { width, height, data: premultiply(rgba) })
    }

    pub fn num_pixels(&self) -> usize {
        self.width as usize * self.height as usize
    }

    /// un-premultiplied copy for encoders
    pub fn to_rgba_image(&self) -> image::RgbaImage {
        let unpremul = unpremultiply(&self.data);
        // length always matches the dimensions
        image::RgbaImage::from_raw(self.width, self.height, unpremul)
            .unwrap_or_else(|| image::RgbaImage::new(self.width, self.height))
    }

    pub fn save_png(&self, path: impl AsRef<Path>) -> Result<(), RenderError> {
        let path = path.as_ref();
        self.to_rgba_image()
            .save_with_format(path, image::ImageFormat::Png)
            .map_err(|source| RenderError::Save { path: path.to_path_buf(), source })
    }
}

/// decode a reference image, optionally resize it to a `working_size` square, premultiply
pub fn load_reference(path: impl AsRef<Path>, working_size: Option<u32>) -> Result<Raster, RenderError> {
    profiling::scope!("load_reference");
    let path = path.as_ref();
    let img = image::open(path)
        .map_err(|source| RenderError::Load { path: PathBuf::from(path), source })?;
    let mut rgba8 = img.to_rgba8();

    if let Some(size) = working_size {
        if rgba8.width() != size || rgba8.height() != size {
            rgba8 = image::imageops::resize(&rgba8, size, size, image::imageops::FilterType::CatmullRom);
        }
    }

    let (w, h) = rgba8.dimensions();
    Raster::from_rgba_unpremul(w, h, rgba8.as_raw())
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct RenderConfig {
    /// anti-aliased edges; off gives hard pixel-center coverage
    pub antialias: bool,
}

impl Default for RenderConfig {
    fn default() -> Self {
        Self { antialias: false }
    }
}

// one scratch pixmap per thread: every worker owns its own renderer state,
// so concurrent renders never contend or share pixels.
thread_local! {
    static SCRATCH_PIX: RefCell<Option<sk::Pixmap>> = const { RefCell::new(None) };
}

/// software polygon renderer (painter's algorithm, source-over blending).
/// identical genome + config always produce identical bytes.
#[derive(Clone, Copy, Debug, Default)]
pub struct CpuRenderer {
    cfg: RenderConfig,
}

impl CpuRenderer {
    pub fn new(cfg: RenderConfig) -> Self {
        Self { cfg }
    }

    /// full-frame render to premultiplied RGBA
    pub fn render(&self, genome: &Genome) -> Result<Raster, RenderError> {
        profiling::scope!("render");
        let (w, h) = (genome.width, genome.height);

        SCRATCH_PIX.with(|cell| {
            let mut slot = cell.borrow_mut();
            let need_new = match slot.as_ref() {
                Some(pm) => pm.width() != w || pm.height() != h,
                None => true,
            };
            if need_new {
                *slot = Some(sk::Pixmap::new(w, h).ok_or(RenderError::Pixmap { width: w, height: h })?);
            }
            let pix = slot.as_mut().ok_or(RenderError::Pixmap { width: w, height: h })?;

            match genome.background {
                Some([r, g, b, a]) => pix.fill(sk::Color::from_rgba8(r, g, b, a)),
                None => pix.fill(sk::Color::TRANSPARENT),
            }

            for poly in &genome.polys {
                draw_polygon(pix, poly, self.cfg.antialias);
            }

            Ok(Raster { width: w, height: h, data: pix.data().to_vec() })
        })
    }
}

fn draw_polygon(pix: &mut sk::Pixmap, poly: &Polygon, antialias: bool) {
    profiling::scope!("draw_polygon");
    let Some((&first, rest)) = poly.points.split_first() else {
        return;
    };

    // quick reject: bbox fully outside the pixmap
    let (w, h) = (pix.width() as i32, pix.height() as i32);
    let (mut min_x, mut min_y, mut max_x, mut max_y) = (first.0, first.1, first.0, first.1);
    for &(x, y) in rest {
        min_x = min_x.min(x);
        min_y = min_y.min(y);
        max_x = max_x.max(x);
        max_y = max_y.max(y);
    }
    if max_x < 0 || max_y < 0 || min_x >= w || min_y >= h {
        return;
    }

    let mut pb = sk::PathBuilder::new();
    pb.move_to(first.0 as f32, first.1 as f32);
    for &(x, y) in rest {
        pb.line_to(x as f32, y as f32);
    }
    pb.close();
    // degenerate rings (a single point) don't build a path
    let Some(path) = pb.finish() else {
        return;
    };

    let [r, g, b, a] = poly.rgba;
    let mut paint = sk::Paint::default();
    paint.set_color_rgba8(r, g, b, a);
    paint.anti_alias = antialias;

    pix.fill_path(&path, &paint, sk::FillRule::Winding, sk::Transform::identity(), None);
}

/// premultiply RGBA
#[inline]
pub fn premultiply(p: &[u8]) -> Vec<u8> {
    profiling::scope!("premultiply");
    let mut out = vec![0u8; p.len()];
    for (src, dst) in p.chunks_exact(4).zip(out.chunks_exact_mut(4)) {
        let a = src[3] as u16;
        // (x * a + 127) / 255 is a rounded divide-by-255
        dst[0] = ((src[0] as u16 * a + 127) / 255) as u8;
        dst[1] = ((src[1] as u16 * a + 127) / 255) as u8;
        dst[2] = ((src[2] as u16 * a + 127) / 255) as u8;
        dst[3] = a as u8;
    }
    out
}

/// inverse of `premultiply` (lossy for low alpha)
#[inline]
pub fn unpremultiply(p: &[u8]) -> Vec<u8> {
    let mut out = vec![0u8; p.len()];
    for (src, dst) in p.chunks_exact(4).zip(out.chunks_exact_mut(4)) {
        let a = src[3] as u16;
        if a == 0 {
            continue;
        }
        dst[0] = ((src[0] as u16 * 255 + a / 2) / a).min(255) as u8;
        dst[1] = ((src[1] as u16 * 255 + a / 2) / a).min(255) as u8;
        dst[2] = ((src[2] as u16 * 255 + a / 2) / a).min(255) as u8;
        dst[3] = a as u8;
    }
    out
}
