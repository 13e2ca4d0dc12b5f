use ndarray::{Array3, Array4, ArrayView3, Axis};

use super::error::ClassifierError;
use crate::config::InputSize;

pub const MAX_PIXEL_VALUE: f32 = 255.0;
pub const MEAN: [f32; 3] = [0.485, 0.456, 0.406];
pub const STD: [f32; 3] = [0.229, 0.224, 0.225];

/// Turns an `(height, width, 3)` RGB grid into the `(1, 3, height, width)`
/// tensor the network expects.
///
/// Scales to `[0, 1]`, resizes bilinearly to `size`, moves channels first and
/// normalizes with the ImageNet mean/std. The input view is only read.
pub fn preprocess(image: ArrayView3<u8>, size: InputSize) -> Result<Array4<f32>, ClassifierError> {
    let (height, width, channels) = image.dim();
    if channels != 3 {
        return Err(ClassifierError::Preprocess(format!(
            "expected 3 channels, got {}",
            channels
        )));
    }
    if height == 0 || width == 0 {
        return Err(ClassifierError::Preprocess("image has no pixels".into()));
    }
    if size.width == 0 || size.height == 0 {
        return Err(ClassifierError::Preprocess(format!(
            "invalid target size {}x{}",
            size.width, size.height
        )));
    }

    // Resize reads the u8 grid directly; the /255 scale commutes with the
    // interpolation, so only the target-sized buffer is ever f32.
    let resized = resize_bilinear(image, size.width, size.height);

    let mut chw = resized.permuted_axes([2, 0, 1]).as_standard_layout().into_owned();
    for (c, mut channel) in chw.axis_iter_mut(Axis(0)).enumerate() {
        let (m, s) = (MEAN[c], STD[c]);
        channel.mapv_inplace(|v| (v / MAX_PIXEL_VALUE - m) / s);
    }

    Ok(chw.insert_axis(Axis(0)))
}

/// Source index and weight of the right/bottom neighbour for each output
/// coordinate, using half-pixel centres and edge clamping.
fn sample_grid(src_len: usize, dst_len: usize) -> Vec<(usize, usize, f32)> {
    let scale = src_len as f32 / dst_len as f32;
    (0..dst_len)
        .map(|d| {
            let pos = (d as f32 + 0.5) * scale - 0.5;
            let mut lo = pos.floor();
            let mut frac = pos - lo;
            if lo < 0.0 {
                lo = 0.0;
                frac = 0.0;
            }
            let mut lo = lo as usize;
            if lo >= src_len - 1 {
                lo = src_len - 1;
                frac = 0.0;
            }
            let hi = (lo + 1).min(src_len - 1);
            (lo, hi, frac)
        })
        .collect()
}

fn resize_bilinear<A>(image: ArrayView3<A>, new_w: usize, new_h: usize) -> Array3<f32>
where
    A: Copy + Into<f32>,
{
    let (orig_h, orig_w, channels) = image.dim();
    if orig_h == new_h && orig_w == new_w {
        return image.mapv(Into::into);
    }

    let xs = sample_grid(orig_w, new_w);
    let ys = sample_grid(orig_h, new_h);
    let mut resized = Array3::<f32>::zeros((new_h, new_w, channels));

    for (y, &(y0, y1, fy)) in ys.iter().enumerate() {
        for (x, &(x0, x1, fx)) in xs.iter().enumerate() {
            for c in 0..channels {
                let px = |yy: usize, xx: usize| -> f32 { image[[yy, xx, c]].into() };
                let top = px(y0, x0) * (1.0 - fx) + px(y0, x1) * fx;
                let bottom = px(y1, x0) * (1.0 - fx) + px(y1, x1) * fx;
                resized[[y, x, c]] = top * (1.0 - fy) + bottom * fy;
            }
        }
    }

    resized
}
