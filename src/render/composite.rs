use image::{RgbaImage, imageops};

use crate::foundation::{
    core::{CanvasSize, FitPolicy, Rect},
    error::{FlipbookError, FlipbookResult},
};

/// Destination rectangle of a `src`-sized image fitted onto a `dst`-sized canvas.
///
/// May extend past the canvas for [`FitPolicy::Cover`].
pub fn fit_rect(src: CanvasSize, dst: CanvasSize, fit: FitPolicy) -> Rect {
    let (sw, sh) = (f64::from(src.width), f64::from(src.height));
    let (dw, dh) = (f64::from(dst.width), f64::from(dst.height));
    if src.is_empty() || dst.is_empty() {
        return Rect::ZERO;
    }

    let scale = match fit {
        FitPolicy::Stretch => return Rect::new(0.0, 0.0, dw, dh),
        FitPolicy::Contain => (dw / sw).min(dh / sh),
        FitPolicy::Cover => (dw / sw).max(dh / sh),
    };
    let (w, h) = (sw * scale, sh * scale);
    let x0 = (dw - w) / 2.0;
    let y0 = (dh - h) / 2.0;
    Rect::new(x0, y0, x0 + w, y0 + h)
}

/// Paint `background` over the whole surface, then draw `src` fitted per `fit`.
///
/// Pure in its inputs: the previous contents of `surface` never leak into the result.
pub fn composite_into(
    surface: &mut RgbaImage,
    src: &RgbaImage,
    fit: FitPolicy,
    background: [u8; 4],
) -> FlipbookResult<()> {
    let src_size = CanvasSize::new(src.width(), src.height());
    let dst_size = CanvasSize::new(surface.width(), surface.height());
    if src_size.is_empty() {
        return Err(FlipbookError::validation("cannot composite an empty image"));
    }
    if dst_size.is_empty() {
        return Err(FlipbookError::validation("cannot composite onto an empty surface"));
    }

    let bg = image::Rgba([background[0], background[1], background[2], 255]);
    for px in surface.pixels_mut() {
        *px = bg;
    }

    let rect = fit_rect(src_size, dst_size, fit);
    let canvas = Rect::new(0.0, 0.0, f64::from(dst_size.width), f64::from(dst_size.height));
    let visible = rect.intersect(canvas);
    if visible.area() <= 0.0 {
        return Ok(());
    }

    // Only resample the source pixels that reach the canvas; cover can overshoot a lot.
    // The crop is widened to whole source pixels, so it keeps the exact fit scale and is placed
    // at its own origin, which may lie off-canvas.
    let sx = rect.width() / f64::from(src_size.width);
    let sy = rect.height() / f64::from(src_size.height);
    let (crop_x0, crop_x1) =
        crop_span(visible.x0 - rect.x0, visible.x1 - rect.x0, sx, src.width());
    let (crop_y0, crop_y1) =
        crop_span(visible.y0 - rect.y0, visible.y1 - rect.y0, sy, src.height());

    let left = (rect.x0 + f64::from(crop_x0) * sx).round() as i64;
    let right = (rect.x0 + f64::from(crop_x1) * sx).round() as i64;
    let top = (rect.y0 + f64::from(crop_y0) * sy).round() as i64;
    let bottom = (rect.y0 + f64::from(crop_y1) * sy).round() as i64;
    let scaled_w = u32::try_from((right - left).max(1)).unwrap_or(u32::MAX);
    let scaled_h = u32::try_from((bottom - top).max(1)).unwrap_or(u32::MAX);

    let (crop_w, crop_h) = (crop_x1 - crop_x0, crop_y1 - crop_y0);
    let cropped = imageops::crop_imm(src, crop_x0, crop_y0, crop_w, crop_h).to_image();
    if (crop_w, crop_h) == (scaled_w, scaled_h) {
        blend_over_opaque(surface, &cropped, left, top);
    } else {
        let filter = imageops::FilterType::Triangle;
        let scaled = imageops::resize(&cropped, scaled_w, scaled_h, filter);
        blend_over_opaque(surface, &scaled, left, top);
    }
    Ok(())
}

/// Source pixel range `[start, end)` covering the destination span `[from, to)`, both measured
/// from the fitted rect's origin, at `scale` destination pixels per source pixel.
fn crop_span(from: f64, to: f64, scale: f64, len: u32) -> (u32, u32) {
    let start = ((from / scale).floor().max(0.0) as u32).min(len - 1);
    let end = ((to / scale).ceil() as u32).clamp(start + 1, len);
    (start, end)
}

/// Mix an already-composited `previous` frame over `surface` at `opacity`.
///
/// Used for the onion-skin preview; never part of export output.
pub fn onion_skin(
    surface: &mut RgbaImage,
    previous: &RgbaImage,
    opacity: f32,
) -> FlipbookResult<()> {
    if surface.dimensions() != previous.dimensions() {
        return Err(FlipbookError::validation(format!(
            "onion skin expects equal sizes, got {:?} and {:?}",
            surface.dimensions(),
            previous.dimensions()
        )));
    }
    let t = opacity.clamp(0.0, 1.0);
    let tt = ((t * 255.0).round() as i32).clamp(0, 255) as u16;
    let it = 255u16 - tt;
    for (d, p) in surface.pixels_mut().zip(previous.pixels()) {
        for i in 0..4 {
            let cur = mul_div255(u16::from(d.0[i]), it);
            let prev = mul_div255(u16::from(p.0[i]), tt);
            d.0[i] = cur.saturating_add(prev);
        }
    }
    Ok(())
}

/// Source-over onto an opaque `dst` with `src`'s top-left at `(x, y)`; clipped to `dst`.
fn blend_over_opaque(dst: &mut RgbaImage, src: &RgbaImage, x: i64, y: i64) {
    let (dw, dh) = (i64::from(dst.width()), i64::from(dst.height()));
    let col0 = (-x).clamp(0, i64::from(src.width())) as u32;
    let row0 = (-y).clamp(0, i64::from(src.height())) as u32;
    let col1 = (dw - x).clamp(0, i64::from(src.width())) as u32;
    let row1 = (dh - y).clamp(0, i64::from(src.height())) as u32;

    for row in row0..row1 {
        for col in col0..col1 {
            let s = src.get_pixel(col, row).0;
            let d = dst.get_pixel_mut((x + i64::from(col)) as u32, (y + i64::from(row)) as u32);
            let a = u16::from(s[3]);
            let inv = 255 - a;
            for i in 0..3 {
                let sv = mul_div255(u16::from(s[i]), a);
                let dv = mul_div255(u16::from(d.0[i]), inv);
                d.0[i] = sv.saturating_add(dv);
            }
            d.0[3] = 255;
        }
    }
}

fn mul_div255(x: u16, y: u16) -> u8 {
    (((u32::from(x) * u32::from(y)) + 127) / 255) as u8
}
