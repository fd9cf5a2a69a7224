//! 长轴, 短轴与偏心率.
//!
//! 边缘像素由离散 Laplacian 给出; 长轴是边缘像素间的最远点对,
//! 短轴从计数平衡中心沿长轴法向射线步进求得. 短轴属于实验性
//! 算法, 不进入默认特征流水线.

use crate::grid::Bitmap;
use crate::mask::crop_bounds;
use crate::trace::balance_center;
use crate::{Idx2d, Idx2dF, MetricError};

/// 默认边缘响应阈值: 只保留稀疏的单层边缘.
pub const EDGE_CUTOFF: u32 = 1;

/// 离散 Laplacian 边缘检测.
///
/// 在非零区域的最小外接窗口内做 3×3 卷积 (核
/// `[[1,1,1],[1,-8,1],[1,1,1]]`, 窗口外按 0 填充), 保留响应绝对值
/// 超过 `cutoff` 的像素, 坐标映射回整幅网格. `cutoff` 为 0 时
/// 边缘为多像素厚, 为 1 时近似单层.
pub fn find_edges<B: Bitmap>(grid: &B, cutoff: u32) -> Result<Vec<Idx2d>, MetricError> {
    let ((top, left), (bottom, right)) = crop_bounds(grid)?;
    let in_crop = |h: isize, w: isize| {
        h >= top as isize
            && h <= bottom as isize
            && w >= left as isize
            && w <= right as isize
            && grid.is_set((h as usize, w as usize))
    };

    let mut edges = Vec::new();
    for h in top..=bottom {
        for w in left..=right {
            let mut response: i32 = 0;
            for dh in -1isize..=1 {
                for dw in -1isize..=1 {
                    let weight = if dh == 0 && dw == 0 { -8 } else { 1 };
                    if in_crop(h as isize + dh, w as isize + dw) {
                        response += weight;
                    }
                }
            }
            if response.unsigned_abs() > cutoff {
                edges.push((h, w));
            }
        }
    }
    Ok(edges)
}

/// 一条轴: 两个端点像素与欧氏长度.
#[derive(Debug, Clone, PartialEq)]
pub struct Axis {
    /// 轴的两个端点.
    pub endpoints: (Idx2d, Idx2d),

    /// 端点间的欧氏距离.
    pub length: f64,
}

/// 长轴: 边缘像素 (阈值 [`EDGE_CUTOFF`]) 中的最远点对.
/// 全对距离的朴素 O(n²) 扫描; 单像素掩码给出长度为零的退化轴.
pub fn major_axis<B: Bitmap>(grid: &B) -> Result<Axis, MetricError> {
    let edges = find_edges(grid, EDGE_CUTOFF)?;
    if edges.is_empty() {
        return Err(MetricError::EmptyRegion);
    }

    let mut best = (edges[0], edges[0]);
    let mut best_dist = 0.0f64;
    for (i, &a) in edges.iter().enumerate() {
        for &b in &edges[i..] {
            let d = crate::mask::dist(a, b);
            if d > best_dist {
                best = (a, b);
                best_dist = d;
            }
        }
    }
    Ok(Axis {
        endpoints: best,
        length: best_dist,
    })
}

/// 像素是否落在掩码边缘: 前景且 8-邻域 (越界按背景计) 含背景.
fn is_edge<B: Bitmap>(grid: &B, p: Idx2dF) -> bool {
    if p.0 < 0.0 || p.1 < 0.0 {
        return false;
    }
    let p = (p.0 as usize, p.1 as usize);
    if !grid.is_set(p) {
        return false;
    }
    crate::grid::neighbour8(p)
        .into_iter()
        .any(|n| !grid.is_set(n))
}

/// 短轴: 从计数平衡中心出发, 沿长轴法向的单位向量向两侧步进,
/// 直到两个端点都落在掩码边缘上; 端点越过边缘落入背景时向回
/// 修正一步. 步数超过与网格尺寸成正比的上限时返回
/// [`MetricError::NoConvergence`].
pub fn minor_axis<B: Bitmap>(grid: &B, major: &Axis) -> Result<Axis, MetricError> {
    let (height, width) = grid.shape();
    let (a, b) = major.endpoints;
    let normal = (-(b.1 as f64 - a.1 as f64), b.0 as f64 - a.0 as f64);
    let norm = ((normal.0 + 1e-5).powi(2) + (normal.1 + 1e-5).powi(2)).sqrt();
    let mut unit = (normal.0 / norm, normal.1 / norm);
    if unit == (0.0, 0.0) {
        unit = (1.0, 1.0);
    }

    let center = balance_center(grid)?;
    let center = (center.0 as f64, center.1 as f64);
    let mut tips: [Idx2dF; 2] = [
        (center.0 + unit.0, center.1 + unit.1),
        (center.0 - unit.0, center.1 - unit.1),
    ];

    let in_bounds = |p: Idx2dF| {
        p.0 > 0.0 && p.1 > 0.0 && p.0 <= (height - 1) as f64 && p.1 <= (width - 1) as f64
    };

    let max_steps = 4 * (height + width);
    let mut steps = 0usize;
    while !(is_edge(grid, tips[0]) && is_edge(grid, tips[1]))
        && tips.iter().all(|&p| in_bounds(p))
    {
        if steps >= max_steps {
            return Err(MetricError::NoConvergence);
        }
        steps += 1;

        for i in 0..2 {
            let tip = tips[i];
            if is_edge(grid, tip) || !in_bounds(tip) {
                continue;
            }
            let outward = if i == 1 { (-unit.0, -unit.1) } else { unit };
            let inside = grid.is_set((tip.0 as usize, tip.1 as usize));
            if inside {
                tips[i] = (tip.0 + outward.0, tip.1 + outward.1);
            } else {
                tips[i] = (tip.0 - outward.0, tip.1 - outward.1);
            }
        }
    }

    let length =
        ((tips[0].0 - tips[1].0).powi(2) + (tips[0].1 - tips[1].1).powi(2)).sqrt();
    Ok(Axis {
        endpoints: (
            (tips[0].0 as usize, tips[0].1 as usize),
            (tips[1].0 as usize, tips[1].1 as usize),
        ),
        length,
    })
}

/// 偏心率公式的两种口径.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum EccentricityFormula {
    /// 沿用历史行为: 短轴长除以自身, 非退化输入下恒为 1.0.
    #[default]
    AsImplemented,

    /// 文档口径: 短轴长 / 长轴长.
    Documented,
}

/// 按所选口径计算偏心率.
pub fn eccentricity(
    formula: EccentricityFormula,
    minor_length: f64,
    major_length: f64,
) -> Result<f64, MetricError> {
    match formula {
        // 短轴自比: 零长度时传播 NaN, 其余恒为 1.0.
        EccentricityFormula::AsImplemented => {
            if minor_length == 0.0 {
                Ok(f64::NAN)
            } else {
                Ok(1.0)
            }
        }
        EccentricityFormula::Documented => {
            if major_length == 0.0 {
                Err(MetricError::DegenerateMetric("Eccentricity"))
            } else {
                Ok(minor_length / major_length)
            }
        }
    }
}
