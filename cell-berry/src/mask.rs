//! 掩码基元: 边界提取, 最小外接裁剪, 邻居计数与邻接细胞统计.
//!
//! [`border_points`] 给出的 4-邻接边界定义是所有周长变体的参考定义.

use crate::grid::{neighbour8, Bitmap, CellMask, SegmentGrid};
use crate::{Area2d, Idx2d, MetricError};

/// 收集所有边界像素: 前景且 4-邻域含背景 (或越界).
///
/// 朴素的 O(W·H) 全图扫描.
pub fn border_points<B: Bitmap>(grid: &B) -> Area2d {
    grid.pos_iter()
        .filter(|&p| grid.is_set(p) && grid.has_background_n4(p))
        .collect()
}

/// 计算非零像素的最小外接矩形, 返回 `(左上角, 右下角)` (闭区间).
///
/// 全背景时返回 [`MetricError::EmptyRegion`].
pub fn crop_bounds<B: Bitmap>(grid: &B) -> Result<(Idx2d, Idx2d), MetricError> {
    let mut bounds: Option<(Idx2d, Idx2d)> = None;
    for (h, w) in grid.pos_iter().filter(|&p| grid.is_set(p)) {
        bounds = Some(match bounds {
            None => ((h, w), (h, w)),
            Some(((top, left), (bottom, right))) => (
                (top.min(h), left.min(w)),
                (bottom.max(h), right.max(w)),
            ),
        });
    }
    bounds.ok_or(MetricError::EmptyRegion)
}

/// 按边界计数法计算周长: 每个边界像素贡献 `4 - 前景 4-邻居数`.
///
/// 这是 [`crate::shape::perimeter_traversal`] 之外的另一种周长定义.
pub fn perimeter_by_border<B: Bitmap>(grid: &B) -> u32 {
    grid.pos_iter()
        .filter(|&p| grid.is_set(p) && grid.has_background_n4(p))
        .map(|p| 4 - u32::from(grid.n4_count(p)))
        .sum()
}

/// 掩码按 8-邻接膨胀一圈, 得到紧贴掩码的 **外部** 像素环.
pub fn exterior_ring(mask: &CellMask) -> Area2d {
    mask.pos_iter()
        .filter(|&p| !mask.is_set(p) && neighbour8(p).into_iter().any(|n| mask.is_set(n)))
        .collect()
}

/// 统计与掩码相邻的细胞个数: 外部像素环与分割网格求交,
/// 数出环上出现的不同非背景标签.
///
/// 掩码与分割网格形状不一致时返回 [`MetricError::ShapeMismatch`].
pub fn surrounding_cells(seg: &SegmentGrid, mask: &CellMask) -> Result<usize, MetricError> {
    if seg.shape() != mask.shape() {
        return Err(MetricError::ShapeMismatch(seg.shape(), mask.shape()));
    }
    let mut labels: Vec<u32> = exterior_ring(mask)
        .into_iter()
        .map(|p| seg[p])
        .filter(|&v| v != crate::consts::BACKGROUND)
        .collect();
    labels.sort_unstable();
    labels.dedup();
    Ok(labels.len())
}

/// 从 incenter 出发的内切/外接圆半径: 到边界像素的最近与最远欧氏距离.
pub fn bounding_radii(mask: &CellMask) -> Result<(f64, f64), MetricError> {
    let center = crate::trace::incenter(mask)?;
    let border = border_points(mask);
    let mut min = f64::INFINITY;
    let mut max = 0.0f64;
    for p in border {
        let d = dist(center, p);
        min = min.min(d);
        max = max.max(d);
    }
    Ok((min, max))
}

/// 径向轮廓: 以 incenter 为原点, 所有边界像素按 atan2 角度升序排列的
/// `(角度, 距离)` 序列.
pub fn radial_profile(mask: &CellMask) -> Result<(Vec<f64>, Vec<f64>), MetricError> {
    let center = crate::trace::incenter(mask)?;
    let mut pairs: Vec<(f64, f64)> = border_points(mask)
        .into_iter()
        .map(|(h, w)| {
            let dh = h as f64 - center.0 as f64;
            let dw = w as f64 - center.1 as f64;
            (dh.atan2(dw), (dh * dh + dw * dw).sqrt())
        })
        .collect();
    pairs.sort_by(|a, b| a.0.total_cmp(&b.0));
    Ok(pairs.into_iter().unzip())
}

/// 两个像素索引之间的欧氏距离.
#[inline]
pub(crate) fn dist(a: Idx2d, b: Idx2d) -> f64 {
    let dh = a.0 as f64 - b.0 as f64;
    let dw = a.1 as f64 - b.1 as f64;
    (dh * dh + dw * dw).sqrt()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::grid::CellMask;
    use ndarray::{array, Array2};

    fn square_mask(n: usize) -> CellMask {
        CellMask::new(Array2::ones((n, n))).unwrap()
    }

    /// 5×5 实心方块: 内部 3×3 不属于边界, 边界计数周长为 16.
    #[test]
    fn test_border_and_perimeter_by_border() {
        let mask = square_mask(5);
        let border = border_points(&mask);
        assert_eq!(border.len(), 16);
        assert!(!border.contains(&(2, 2)));

        // 4 个角贡献 2, 其余 12 个边界像素贡献 1.
        assert_eq!(perimeter_by_border(&mask), 4 * 2 + 12);
    }

    /// 测试最小外接矩形与空区域错误.
    #[test]
    fn test_crop_bounds() {
        let mask =
            CellMask::new(array![[0, 0, 0, 0], [0, 1, 1, 0], [0, 0, 1, 0], [0, 0, 0, 0]])
                .unwrap();
        assert_eq!(crop_bounds(&mask).unwrap(), ((1, 1), (2, 2)));

        let seg = SegmentGrid::new(array![[0u32, 0], [0, 0]]);
        assert_eq!(seg.cell_mask(1).unwrap_err(), MetricError::EmptyRegion);
    }

    /// 被两个细胞夹住的细胞, 邻接计数必须为 2.
    #[test]
    fn test_surrounding_cells() {
        let seg = SegmentGrid::new(array![
            [1, 1, 2, 2, 3, 3],
            [1, 1, 2, 2, 3, 3],
            [1, 1, 2, 2, 3, 3],
        ]);
        let mid = seg.cell_mask(2).unwrap();
        assert_eq!(surrounding_cells(&seg, &mid).unwrap(), 2);

        let left = seg.cell_mask(1).unwrap();
        assert_eq!(surrounding_cells(&seg, &left).unwrap(), 1);
    }

    /// 正方形的内切/外接半径: 中心到边中点与到角点的距离.
    #[test]
    fn test_bounding_radii() {
        let mask = square_mask(5);
        let (min, max) = bounding_radii(&mask).unwrap();
        assert!((min - 2.0).abs() < 1e-9);
        assert!((max - 8.0f64.sqrt()).abs() < 1e-9);
    }

    /// 径向轮廓角度必须单调不减.
    #[test]
    fn test_radial_profile_sorted() {
        let mask = square_mask(5);
        let (angles, dists) = radial_profile(&mask).unwrap();
        assert_eq!(angles.len(), dists.len());
        assert!(angles.windows(2).all(|w| w[0] <= w[1]));
    }
}
