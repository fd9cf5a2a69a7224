//! 形状描述符套件.
//!
//! 所有函数都接受上游已经算好的原料 (遍历, 凸包, 面积, 周长等),
//! 自己不重复做几何; 分母退化时返回
//! [`MetricError::DegenerateMetric`], 参数为对应的特征名.

use std::collections::HashMap;

use ordered_float::OrderedFloat;

use crate::consts::key;
use crate::grid::Bitmap;
use crate::hull::BoundingBox;
use crate::trace::BorderTrace;
use crate::{Idx2d, MetricError};

/// 沿遍历累加周长: 直走一步计 1, 斜走一步计 √2.
///
/// 遍历按闭合回路计, 末点回到起点补一步; 回溯造成的非相邻跳跃
/// 不计入长度.
pub fn perimeter_traversal(trace: &BorderTrace) -> f64 {
    let step = |a: Idx2d, b: Idx2d| {
        let dh = a.0.abs_diff(b.0);
        let dw = a.1.abs_diff(b.1);
        match (dh, dw) {
            (0, 1) | (1, 0) => 1.0,
            (1, 1) => 2.0f64.sqrt(),
            _ => 0.0,
        }
    };
    let open: f64 = trace
        .points
        .windows(2)
        .map(|pair| step(pair[0], pair[1]))
        .sum();
    if trace.len() >= 2 {
        open + step(trace.points[trace.len() - 1], trace.points[0])
    } else {
        open
    }
}

/// 遍历序上各边界点到中心的欧氏距离.
pub fn radial_distances(trace: &BorderTrace, center: Idx2d) -> Vec<f64> {
    trace
        .points
        .iter()
        .map(|&p| crate::mask::dist(center, p))
        .collect()
}

/// 径向距离除以其最大值, 归一化到 (0, 1].
///
/// 全零距离 (中心即唯一边界点) 无法归一化.
pub fn normalize_radial(dists: &[f64]) -> Result<Vec<f64>, MetricError> {
    let max = dists.iter().copied().fold(0.0f64, f64::max);
    if max == 0.0 {
        return Err(MetricError::DegenerateMetric(key::MEAN_RADIAL_DISTANCE));
    }
    Ok(dists.iter().map(|d| d / max).collect())
}

/// 伸长率 I/L: 最小面积外接矩形的短边与长边之比.
pub fn elongation(bbox: &BoundingBox) -> f64 {
    let [tl, tr, bl, _] = bbox.corners;
    let top = ((tr.0 - tl.0).powi(2) + (tr.1 - tl.1).powi(2)).sqrt();
    let side = ((bl.0 - tl.0).powi(2) + (bl.1 - tl.1).powi(2)).sqrt();
    top.min(side) / top.max(side)
}

/// 紧凑度 (1): P²/A.
pub fn compactness_one(perimeter: f64, area: f64) -> Result<f64, MetricError> {
    if area == 0.0 {
        return Err(MetricError::DegenerateMetric(key::COMPACTNESS_1));
    }
    Ok(perimeter * perimeter / area)
}

/// 紧凑度 (2): 前景像素到中心的平方距离总和除以面积的平方.
pub fn compactness_two<B: Bitmap>(
    grid: &B,
    center: Idx2d,
    area: f64,
) -> Result<f64, MetricError> {
    if area == 0.0 {
        return Err(MetricError::DegenerateMetric(key::COMPACTNESS_2));
    }
    let sum: f64 = grid
        .pos_iter()
        .filter(|&p| grid.is_set(p))
        .map(|(h, w)| {
            let dh = h as f64 - center.0 as f64;
            let dw = w as f64 - center.1 as f64;
            dh * dh + dw * dw
        })
        .sum();
    Ok(sum / (area * area))
}

/// 圆度 (1): 4πA/P².
pub fn circularity_one(area: f64, perimeter: f64) -> Result<f64, MetricError> {
    if perimeter == 0.0 {
        return Err(MetricError::DegenerateMetric(key::CIRCULARITY_1));
    }
    Ok(4.0 * std::f64::consts::PI * area / (perimeter * perimeter))
}

/// 圆度 (2): 4πA/Pc², Pc 为凸包周长.
pub fn circularity_two(area: f64, hull_perimeter: f64) -> Result<f64, MetricError> {
    if hull_perimeter == 0.0 {
        return Err(MetricError::DegenerateMetric(key::CIRCULARITY_2));
    }
    Ok(4.0 * std::f64::consts::PI * area / (hull_perimeter * hull_perimeter))
}

/// 圆度 (3): P²/A. 与紧凑度 (1) 同式, 作为独立条目保留.
pub fn circularity_three(perimeter: f64, area: f64) -> Result<f64, MetricError> {
    if area == 0.0 {
        return Err(MetricError::DegenerateMetric(key::CIRCULARITY_3));
    }
    Ok(perimeter * perimeter / area)
}

/// 圆度 (4): 归一化径向距离的均值与标准差之比.
pub fn circularity_four(normalized: &[f64]) -> Result<f64, MetricError> {
    let std = crate::stats::std(normalized);
    if std == 0.0 {
        return Err(MetricError::DegenerateMetric(key::CIRCULARITY_4));
    }
    Ok(crate::stats::mean(normalized) / std)
}

/// 凸度 (1): A/Ac.
pub fn convexity_one(area: f64, hull_area: f64) -> Result<f64, MetricError> {
    if hull_area == 0.0 {
        return Err(MetricError::DegenerateMetric(key::CONVEXITY_1));
    }
    Ok(area / hull_area)
}

/// 凸度 (2): Pc/P.
pub fn convexity_two(perimeter: f64, hull_perimeter: f64) -> Result<f64, MetricError> {
    if perimeter == 0.0 {
        return Err(MetricError::DegenerateMetric(key::CONVEXITY_2));
    }
    Ok(hull_perimeter / perimeter)
}

/// 粗糙度 (1): P/Pc.
pub fn roughness_one(perimeter: f64, hull_perimeter: f64) -> Result<f64, MetricError> {
    if hull_perimeter == 0.0 {
        return Err(MetricError::DegenerateMetric(key::ROUGHNESS_1));
    }
    Ok(perimeter / hull_perimeter)
}

/// 粗糙度 (2): 归一化径向距离按角向分段后, 段内相邻差的绝对值
/// 之和的段均值. 段数取 ⌊n/3⌋, 段长取 ⌊n/段数⌋.
pub fn roughness_two(normalized: &[f64]) -> Result<f64, MetricError> {
    let n = normalized.len();
    let intervals = n / 3;
    if intervals == 0 {
        return Err(MetricError::DegenerateMetric(key::ROUGHNESS_2));
    }
    let size = n / intervals;

    let mut total = 0.0;
    for i in 0..intervals {
        for j in i * size..(i + 1) * size {
            if j + 2 < n {
                total += (normalized[j] - normalized[j + 1]).abs();
            }
        }
    }
    Ok(total / intervals as f64)
}

/// 粗糙度 (3): 拥有多个边界点的视角占全部视角的比例.
///
/// 视角按 `atan2` 的精确浮点值分桶, 不做量化.
pub fn roughness_three(border: &[Idx2d], center: Idx2d) -> Result<f64, MetricError> {
    if border.is_empty() {
        return Err(MetricError::EmptyRegion);
    }
    let mut angles: HashMap<OrderedFloat<f64>, usize> = HashMap::new();
    for &(h, w) in border {
        let angle = (w as f64 - center.1 as f64).atan2(h as f64 - center.0 as f64);
        *angles.entry(OrderedFloat(angle)).or_insert(0) += 1;
    }
    let multiple = angles.values().filter(|&&count| count > 1).count();
    Ok(multiple as f64 / angles.len() as f64)
}

/// 归一化径向距离均值.
#[inline]
pub fn mean_radial_distance(normalized: &[f64]) -> f64 {
    crate::stats::mean(normalized)
}

/// 归一化径向距离标准差 (总体口径).
#[inline]
pub fn std_radial_distance(normalized: &[f64]) -> f64 {
    crate::stats::std(normalized)
}

/// 归一化径向距离的熵: 100 个等宽半开区间 `[i/100, (i+1)/100)` 上的
/// 经验分布取 -Σ p·log₂p. 恰好等于 1.0 的距离不落入任何区间.
pub fn radial_entropy(normalized: &[f64]) -> f64 {
    const INTERVALS: usize = 100;
    if normalized.is_empty() {
        return 0.0;
    }
    let mut counts = [0usize; INTERVALS];
    for &d in normalized {
        for (i, slot) in counts.iter_mut().enumerate() {
            let lo = i as f64 / INTERVALS as f64;
            let hi = (i + 1) as f64 / INTERVALS as f64;
            if d >= lo && d < hi {
                *slot += 1;
                break;
            }
        }
    }
    let n = normalized.len() as f64;
    counts
        .iter()
        .filter(|&&c| c > 0)
        .map(|&c| {
            let p = c as f64 / n;
            -p * p.log2()
        })
        .sum()
}

/// 遍历序的原始径向距离穿越其均值的次数.
pub fn mean_crossings(dists: &[f64]) -> usize {
    let mean = crate::stats::mean(dists);
    dists
        .windows(2)
        .filter(|pair| {
            (pair[0] > mean && pair[1] < mean) || (pair[0] < mean && pair[1] > mean)
        })
        .count()
}

/// 尖刺度: P/A. 周长相对面积越大形状越尖.
pub fn spikiness(perimeter: f64, area: f64) -> Result<f64, MetricError> {
    if area == 0.0 {
        return Err(MetricError::DegenerateMetric(key::SPIKINESS));
    }
    Ok(perimeter / area)
}
