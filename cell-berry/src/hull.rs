//! 凸包与最小外接矩形.
//!
//! 凸包采用 Andrew 单调链算法, 最小外接矩形采用旋转卡壳:
//! 逐条凸包边对齐坐标轴, 取对齐后轴对齐包围盒的最小者.

use crate::{Idx2d, Idx2dF, MetricError};

/// 旋转卡壳前给像素坐标加的安全边距 (像素).
const MARGIN: usize = 40;

/// 三点叉积, 判定转向. 正为逆时针.
#[inline]
fn cross(p1: Idx2d, p2: Idx2d, p3: Idx2d) -> i64 {
    let (x1, y1) = (p1.0 as i64, p1.1 as i64);
    let (x2, y2) = (p2.0 as i64, p2.1 as i64);
    let (x3, y3) = (p3.0 as i64, p3.1 as i64);
    (x2 - x1) * (y3 - y1) - (y2 - y1) * (x3 - x1)
}

/// 像素点集的凸包.
#[derive(Debug, Clone)]
pub struct ConvexHull {
    /// 凸包顶点, 沿边界依次排列. 少于 2 个输入点时为空.
    pub vertices: Vec<Idx2d>,
}

impl ConvexHull {
    /// 凸包的有向边序列 (首尾相接).
    pub fn edges(&self) -> Vec<(Idx2d, Idx2d)> {
        let n = self.vertices.len();
        (0..n)
            .map(|i| (self.vertices[i], self.vertices[(i + 1) % n]))
            .collect()
    }

    /// 鞋带公式求凸包面积.
    pub fn area(&self) -> f64 {
        let signed: i64 = self
            .edges()
            .iter()
            .map(|&((x1, y1), (x2, y2))| {
                x1 as i64 * y2 as i64 - x2 as i64 * y1 as i64
            })
            .sum();
        signed.unsigned_abs() as f64 / 2.0
    }

    /// 凸包各边长之和.
    pub fn perimeter(&self) -> f64 {
        self.edges()
            .iter()
            .map(|&(a, b)| crate::mask::dist(a, b))
            .sum()
    }
}

/// Andrew 单调链求凸包.
///
/// 输入为任意顺序的边界像素; 共线点不保留. 退化输入
/// (0 或 1 个点) 给出空凸包.
pub fn convex_hull(border: &[Idx2d]) -> ConvexHull {
    let mut points = border.to_vec();
    points.sort_unstable();
    points.dedup();

    let mut lower: Vec<Idx2d> = Vec::new();
    for &p in &points {
        while lower.len() >= 2 && cross(lower[lower.len() - 2], lower[lower.len() - 1], p) <= 0 {
            lower.pop();
        }
        lower.push(p);
    }

    let mut upper: Vec<Idx2d> = Vec::new();
    for &p in points.iter().rev() {
        while upper.len() >= 2 && cross(upper[upper.len() - 2], upper[upper.len() - 1], p) <= 0 {
            upper.pop();
        }
        upper.push(p);
    }

    lower.pop();
    upper.pop();
    lower.extend(upper);
    ConvexHull { vertices: lower }
}

/// 一条凸包边对应的候选外接矩形.
#[derive(Debug, Clone)]
pub struct BoundingBox {
    /// 四个角点 (边距坐标系, 已取整): 左上, 右上, 左下, 右下.
    pub corners: [Idx2dF; 4],

    /// 矩形面积.
    pub area: f64,

    /// 矩形周长.
    pub perimeter: f64,
}

/// 旋转卡壳的两个赢家.
#[derive(Debug, Clone)]
pub struct MinBoundingBoxes {
    /// 面积最小的外接矩形.
    pub by_area: BoundingBox,

    /// 周长最小的外接矩形.
    pub by_perimeter: BoundingBox,
}

#[inline]
fn rotate((x, y): Idx2dF, angle: f64) -> Idx2dF {
    let (sin, cos) = angle.sin_cos();
    (cos * x - sin * y, sin * x + cos * y)
}

/// 旋转卡壳求最小外接矩形.
///
/// 所有像素坐标先平移 [`MARGIN`], 随后对每条凸包边: 把凸包顶点旋转到
/// 该边与横轴对齐的坐标系, 取轴对齐包围盒, 角点旋回原系并取整.
/// 同时追踪面积最小与周长最小的两个矩形. 凸包不足一条边
/// (边界点少于 2 个) 时返回 [`MetricError::EmptyRegion`].
pub fn min_bounding_box(border: &[Idx2d]) -> Result<MinBoundingBoxes, MetricError> {
    let padded: Vec<Idx2d> = border
        .iter()
        .map(|&(h, w)| (h + MARGIN, w + MARGIN))
        .collect();
    let hull = convex_hull(&padded);
    let vertices: Vec<Idx2dF> = hull
        .vertices
        .iter()
        .map(|&(h, w)| (h as f64, w as f64))
        .collect();

    let mut by_area: Option<BoundingBox> = None;
    let mut by_perimeter: Option<BoundingBox> = None;
    for ((h1, w1), (h2, w2)) in hull.edges() {
        let dh = h2 as f64 - h1 as f64;
        let dw = w2 as f64 - w1 as f64;
        let norm = (dh * dh + dw * dw).sqrt();
        let angle = (dw / norm).atan2(dh / norm);

        let rotated: Vec<Idx2dF> = vertices.iter().map(|&v| rotate(v, angle)).collect();
        let min_x = rotated.iter().map(|r| r.0).fold(f64::INFINITY, f64::min);
        let max_x = rotated.iter().map(|r| r.0).fold(f64::NEG_INFINITY, f64::max);
        let min_y = rotated.iter().map(|r| r.1).fold(f64::INFINITY, f64::min);
        let max_y = rotated.iter().map(|r| r.1).fold(f64::NEG_INFINITY, f64::max);

        let back = |p: Idx2dF| {
            let (x, y) = rotate(p, -angle);
            (x.round(), y.round())
        };
        let top_left = back((min_x, min_y));
        let top_right = back((min_x, max_y));
        let bottom_left = back((max_x, min_y));
        let bottom_right = back((max_x, max_y));

        let top = ((top_right.0 - top_left.0).powi(2) + (top_right.1 - top_left.1).powi(2)).sqrt();
        let side = ((bottom_right.0 - top_right.0).powi(2)
            + (bottom_right.1 - top_right.1).powi(2))
        .sqrt();
        let candidate = BoundingBox {
            corners: [top_left, top_right, bottom_left, bottom_right],
            area: top * side,
            perimeter: 2.0 * (top + side),
        };

        if by_area.as_ref().map_or(true, |b| candidate.area < b.area) {
            by_area = Some(candidate.clone());
        }
        if by_perimeter
            .as_ref()
            .map_or(true, |b| candidate.perimeter < b.perimeter)
        {
            by_perimeter = Some(candidate);
        }
    }

    match (by_area, by_perimeter) {
        (Some(by_area), Some(by_perimeter)) => Ok(MinBoundingBoxes {
            by_area,
            by_perimeter,
        }),
        _ => Err(MetricError::EmptyRegion),
    }
}
