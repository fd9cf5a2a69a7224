//! 掩码内灰度统计与两种灰度梯度.
//!
//! 统计一律只看非零灰度像素; 梯度在整幅原图上取中心差分,
//! 用裁剪块的偏移把局部坐标换算回原图坐标.

use ndarray::ArrayView2;

use crate::grid::{Bitmap, Patch};
use crate::MetricError;

/// 掩码内的五项灰度统计.
#[derive(Debug, Clone, PartialEq)]
pub struct IntensityMetrics {
    /// 灰度均值.
    pub mean: f64,
    /// 灰度标准差 (总体口径).
    pub std: f64,
    /// 灰度最大值.
    pub max: f64,
    /// 灰度最小值.
    pub min: f64,
    /// 最大值与最小值之差.
    pub range: f64,
}

/// 对裁剪块中的非零灰度像素求五项统计.
///
/// 掩码内全部像素灰度为零时无统计可做, 返回
/// [`MetricError::EmptyRegion`].
pub fn intensity_metrics(patch: &Patch) -> Result<IntensityMetrics, MetricError> {
    let values: Vec<f64> = patch
        .array_view()
        .iter()
        .filter(|&&v| v > 0)
        .map(|&v| f64::from(v))
        .collect();
    if values.is_empty() {
        return Err(MetricError::EmptyRegion);
    }
    let max = values.iter().copied().fold(f64::NEG_INFINITY, f64::max);
    let min = values.iter().copied().fold(f64::INFINITY, f64::min);
    Ok(IntensityMetrics {
        mean: crate::stats::mean(&values),
        std: crate::stats::std(&values),
        max,
        min,
        range: max - min,
    })
}

/// 逐像素梯度的平均幅值与平均方向 (度).
#[derive(Debug, Clone, PartialEq)]
pub struct PixelGradient {
    /// 梯度幅值 (L2) 的平均.
    pub magnitude: f64,
    /// 梯度方向 (atan2, 角度制) 的平均.
    pub orientation: f64,
}

/// 逐像素梯度: 对裁剪块中 4-邻域全为非零灰度的内部像素,
/// 在 **原图** 的对应位置取中心差分, 幅值与方向分别求和后
/// 除以裁剪块的非零像素总数.
///
/// 原图必须完整覆盖裁剪块, 否则返回 [`MetricError::ShapeMismatch`].
pub fn pixel_gradient(
    image: ArrayView2<u8>,
    patch: &Patch,
) -> Result<PixelGradient, MetricError> {
    let &[ih, iw] = image.shape() else {
        unreachable!()
    };
    let (ph, pw) = patch.shape();
    let (oh, ow) = patch.origin();
    if oh + ph > ih || ow + pw > iw {
        return Err(MetricError::ShapeMismatch((ih, iw), (oh + ph, ow + pw)));
    }

    let nonzero = patch.count_set();
    if nonzero == 0 {
        return Err(MetricError::EmptyRegion);
    }

    let mut magnitude = 0.0;
    let mut orientation = 0.0;
    for h in 1..ph.saturating_sub(1) {
        for w in 1..pw.saturating_sub(1) {
            let all_set = patch.is_set((h, w))
                && crate::grid::neighbour4((h, w))
                    .into_iter()
                    .all(|n| patch.is_set(n));
            if !all_set {
                continue;
            }
            let (gh, gw) = (oh + h, ow + w);
            let dh = i32::from(image[(gh + 1, gw)]) - i32::from(image[(gh - 1, gw)]);
            let dw = i32::from(image[(gh, gw + 1)]) - i32::from(image[(gh, gw - 1)]);
            magnitude += f64::from(dh * dh + dw * dw).sqrt();
            orientation += f64::from(dw).atan2(f64::from(dh)).to_degrees();
        }
    }
    Ok(PixelGradient {
        magnitude: magnitude / nonzero as f64,
        orientation: orientation / nonzero as f64,
    })
}

/// 逐层剥离梯度: 反复剥去当前最外层 (4-邻域含零灰度或贴着
/// 裁剪块边缘的像素), 记录每层的灰度均值, 返回层均值序列与
/// 相邻层均值差的绝对值之和.
pub fn layer_gradient(patch: &Patch) -> (Vec<f64>, f64) {
    let (height, width) = patch.shape();
    let mut occupied = patch.array_view().map(|&v| v > 0);

    let mut layer_means = Vec::new();
    loop {
        let mut removed = Vec::new();
        for h in 0..height {
            for w in 0..width {
                if !occupied[(h, w)] {
                    continue;
                }
                let interior = h > 0
                    && h + 1 < height
                    && w > 0
                    && w + 1 < width
                    && occupied[(h - 1, w)]
                    && occupied[(h + 1, w)]
                    && occupied[(h, w - 1)]
                    && occupied[(h, w + 1)];
                if !interior {
                    removed.push((h, w));
                }
            }
        }
        if removed.is_empty() {
            break;
        }
        let values: Vec<f64> = removed.iter().map(|&p| f64::from(patch[p])).collect();
        layer_means.push(crate::stats::mean(&values));
        for p in removed {
            occupied[p] = false;
        }
    }

    let gradient = layer_means
        .windows(2)
        .map(|pair| (pair[1] - pair[0]).abs())
        .sum();
    (layer_means, gradient)
}
