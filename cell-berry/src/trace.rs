//! 中心估计与顺时针边界遍历.
//!
//! 不规则形状下没有任何一种中心定义是权威的, 因此这里并列保留四种
//! 互为备选的启发式; 主流水线默认使用 [`best_center`].

use std::collections::HashSet;

use ordered_float::OrderedFloat;

use crate::grid::Bitmap;
use crate::mask::{border_points, dist};
use crate::stats;
use crate::{Idx2d, MetricError};

/// 遍历回溯窗口: 死角处最多回看这么多个已访问点.
const BACKTRACK_WINDOW: usize = 20;

/// 顺时针探测次序: 北, 东北, 东, 东南, 南, 西南, 西, 西北.
#[inline]
fn clockwise8((h, w): Idx2d) -> [Idx2d; 8] {
    [
        (h.wrapping_sub(1), w),
        (h.wrapping_sub(1), w.saturating_add(1)),
        (h, w.saturating_add(1)),
        (h.saturating_add(1), w.saturating_add(1)),
        (h.saturating_add(1), w),
        (h.saturating_add(1), w.wrapping_sub(1)),
        (h, w.wrapping_sub(1)),
        (h.wrapping_sub(1), w.wrapping_sub(1)),
    ]
}

/// 顺时针边界遍历的结果.
///
/// `complete` 为 `false` 时, 回溯窗口耗尽前未能访问全部边界点,
/// `points` 只覆盖了边界的一部分. 单连通且非退化的掩码下
/// `points.len()` 等于边界点集的基数.
#[derive(Debug, Clone)]
pub struct BorderTrace {
    /// 按遍历顺序排列的边界点.
    pub points: Vec<Idx2d>,

    /// 遍历是否覆盖了全部边界点?
    pub complete: bool,
}

impl BorderTrace {
    /// 遍历到的边界点个数.
    #[inline]
    pub fn len(&self) -> usize {
        self.points.len()
    }

    /// 遍历是否为空?
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }
}

/// 顺时针遍历边界点集.
///
/// 从列坐标最小的边界点出发, 每步按固定顺时针次序探测 8-邻域中
/// 未访问的边界点. 无路可走时最多回看 [`BACKTRACK_WINDOW`] 个
/// 此前访问过的点寻找新出口; 窗口耗尽则提前终止, 并通过
/// [`BorderTrace::complete`] 上报覆盖不完整.
pub fn clockwise_trace(border: &[Idx2d]) -> BorderTrace {
    let Some(start) = border.iter().copied().min_by_key(|&(_, w)| w) else {
        return BorderTrace {
            points: vec![],
            complete: true,
        };
    };
    let border_set: HashSet<Idx2d> = border.iter().copied().collect();
    let mut visited: HashSet<Idx2d> = HashSet::with_capacity(border.len());
    visited.insert(start);
    let mut points = vec![start];

    let mut current = start;
    'outer: loop {
        let step = clockwise8(current)
            .into_iter()
            .find(|p| border_set.contains(p) && !visited.contains(p));

        if let Some(next) = step {
            visited.insert(next);
            points.push(next);
            current = next;
            continue;
        }

        if points.len() == border_set.len() {
            break;
        }

        // 死角: 在最近 BACKTRACK_WINDOW 个点中寻找新出口.
        for back in 1..=BACKTRACK_WINDOW.min(points.len()) {
            let anchor = points[points.len() - back];
            let step = clockwise8(anchor)
                .into_iter()
                .find(|p| border_set.contains(p) && !visited.contains(p));
            if let Some(next) = step {
                visited.insert(next);
                points.push(next);
                current = next;
                continue 'outer;
            }
        }
        break; // 回溯窗口耗尽, 提前终止.
    }

    let complete = points.len() == border_set.len();
    BorderTrace { points, complete }
}

/// Incenter: 到任意边界像素的最大距离最小的前景像素
/// (近似 Chebyshev 中心). O(N_mask × N_border).
pub fn incenter<B: Bitmap>(grid: &B) -> Result<Idx2d, MetricError> {
    let border = border_points(grid);
    if border.is_empty() {
        return Err(MetricError::EmptyRegion);
    }
    grid.pos_iter()
        .filter(|&p| grid.is_set(p))
        .min_by_key(|&p| {
            OrderedFloat(
                border
                    .iter()
                    .map(|&b| dist(p, b))
                    .fold(0.0f64, f64::max),
            )
        })
        .ok_or(MetricError::EmptyRegion)
}

/// 逐层剥离中心: 反复腐蚀一圈 (去掉 4-邻域不全为前景的像素)
/// 直到不能再缩, 取最后一层的质心, 并吸附到原图中最近的前景像素.
///
/// 每轮腐蚀严格缩小有限集合, 故必然终止; 给定掩码结果确定.
pub fn peel_center<B: Bitmap>(grid: &B) -> Result<Idx2d, MetricError> {
    let mut layer = grid.set_positions();
    if layer.is_empty() {
        return Err(MetricError::EmptyRegion);
    }

    loop {
        let occupied: HashSet<Idx2d> = layer.iter().copied().collect();
        let next: Vec<Idx2d> = layer
            .iter()
            .copied()
            .filter(|&p| {
                !grid.is_at_border(p)
                    && crate::grid::neighbour4(p)
                        .into_iter()
                        .all(|n| occupied.contains(&n))
            })
            .collect();
        if next.is_empty() {
            break;
        }
        layer = next;
    }

    if layer.len() == 1 {
        return Ok(layer[0]);
    }

    // 多像素层: 质心吸附到原图最近的前景像素.
    let n = layer.len() as f64;
    let ch = layer.iter().map(|&(h, _)| h as f64).sum::<f64>() / n;
    let cw = layer.iter().map(|&(_, w)| w as f64).sum::<f64>() / n;
    grid.pos_iter()
        .filter(|&p| grid.is_set(p))
        .min_by_key(|&(h, w)| {
            let dh = h as f64 - ch;
            let dw = w as f64 - cw;
            OrderedFloat(dh * dh + dw * dw)
        })
        .ok_or(MetricError::EmptyRegion)
}

/// 最小方差中心: 到全体遍历边界点距离方差最小的前景像素.
/// 主流水线的默认中心. O(N_mask × N_border).
pub fn best_center<B: Bitmap>(grid: &B, trace: &BorderTrace) -> Result<Idx2d, MetricError> {
    if trace.is_empty() {
        return Err(MetricError::EmptyRegion);
    }
    grid.pos_iter()
        .filter(|&p| grid.is_set(p))
        .min_by_key(|&p| {
            let dists: Vec<f64> = trace.points.iter().map(|&b| dist(p, b)).collect();
            OrderedFloat(stats::variance(&dists))
        })
        .ok_or(MetricError::EmptyRegion)
}

/// 计数平衡中心: 上下/左右前景像素计数之差的绝对值之和最小的
/// 前景像素. 短轴射线步进使用该中心.
pub fn balance_center<B: Bitmap>(grid: &B) -> Result<Idx2d, MetricError> {
    let (height, width) = grid.shape();
    // 行/列前景计数的前缀和, 把每个候选的评估降到 O(1).
    let mut row_counts = vec![0usize; height + 1];
    let mut col_counts = vec![0usize; width + 1];
    for (h, w) in grid.pos_iter().filter(|&p| grid.is_set(p)) {
        row_counts[h + 1] += 1;
        col_counts[w + 1] += 1;
    }
    for h in 0..height {
        row_counts[h + 1] += row_counts[h];
    }
    for w in 0..width {
        col_counts[w + 1] += col_counts[w];
    }
    let total = row_counts[height];

    grid.pos_iter()
        .filter(|&p| grid.is_set(p))
        .min_by_key(|&(h, w)| {
            let above = row_counts[h];
            let below = total - above;
            let left = col_counts[w];
            let right = total - left;
            above.abs_diff(below) + left.abs_diff(right)
        })
        .ok_or(MetricError::EmptyRegion)
}
