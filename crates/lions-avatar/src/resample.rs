use image::RgbImage;

/// Square region of the source image.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CropRect {
    pub x: u32,
    pub y: u32,
    pub side: u32,
}

/// Largest centred square that fits a `width`×`height` image.
pub fn center_square(width: u32, height: u32) -> CropRect {
    let side = width.min(height);
    CropRect {
        x: (width - side) / 2,
        y: (height - side) / 2,
        side,
    }
}

/// Source coordinate sampled for destination coordinate `d` along one axis:
/// `origin + d * side / out`, integer division, no interpolation.
pub fn source_coord(origin: u32, side: u32, d: u32, out: u32) -> u32 {
    origin + (u64::from(d) * u64::from(side) / u64::from(out)) as u32
}

/// Centre-crop `src` to a square and nearest-neighbour sample it down (or up)
/// to `out`×`out`.
pub fn resample(src: &RgbImage, out: u32) -> RgbImage {
    let crop = center_square(src.width(), src.height());
    RgbImage::from_fn(out, out, |x, y| {
        let sx = source_coord(crop.x, crop.side, x, out);
        let sy = source_coord(crop.y, crop.side, y, out);
        *src.get_pixel(sx, sy)
    })
}
