//! 单图像特征提取流水线.
//!
//! [`cell_metrics`] 对一个细胞算出完整的特征表;
//! [`extract_image`] 对分割网格中的全部标签跑一遍, 丢弃退化
//! 细胞, 并附带逐特征均值. 输入网格只读, 各细胞之间没有共享
//! 可变状态, 启用 `rayon` 后按标签并行.

use ndarray::ArrayView2;

use crate::consts::key;
use crate::grid::{Patch, SegmentGrid};
use crate::hull::{convex_hull, min_bounding_box};
use crate::mask::{border_points, bounding_radii, surrounding_cells};
use crate::shape;
use crate::texture::{flatten_haralick, TextureSource};
use crate::trace::{best_center, clockwise_trace};
use crate::MetricError;

/// 一个细胞的特征表: 名字到标量值, 保持插入顺序.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Metrics {
    entries: Vec<(String, f64)>,
}

impl Metrics {
    /// 空特征表.
    #[inline]
    pub fn new() -> Self {
        Self::default()
    }

    /// 追加一项特征. 不检查重名.
    #[inline]
    pub fn insert(&mut self, name: impl Into<String>, value: f64) {
        self.entries.push((name.into(), value));
    }

    /// 按名字查找特征值.
    pub fn get(&self, name: &str) -> Option<f64> {
        self.entries
            .iter()
            .find(|(k, _)| k == name)
            .map(|&(_, v)| v)
    }

    /// 按插入顺序迭代 `(名字, 值)`.
    #[inline]
    pub fn iter(&self) -> impl Iterator<Item = (&str, f64)> {
        self.entries.iter().map(|(k, v)| (k.as_str(), *v))
    }

    /// 特征个数.
    #[inline]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// 是否为空表?
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

#[cfg(feature = "serde")]
impl serde::Serialize for Metrics {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        use serde::ser::SerializeMap;
        let mut map = serializer.serialize_map(Some(self.entries.len()))?;
        for (name, value) in &self.entries {
            map.serialize_entry(name, value)?;
        }
        map.end()
    }
}

/// 一个细胞的提取结果: 标签与特征表.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize))]
pub struct CellRecord {
    /// 细胞在分割网格中的标签.
    #[cfg_attr(feature = "serde", serde(rename = "Cell Index"))]
    pub cell_index: u32,

    /// 该细胞的特征表.
    #[cfg_attr(feature = "serde", serde(rename = "Metrics"))]
    pub metrics: Metrics,
}

/// 单幅图像的提取结果: 全体合格细胞与逐特征均值.
#[derive(Debug, Clone, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize))]
pub struct ImageDataset {
    /// 合格细胞逐特征的算术均值. 没有合格细胞时为空表.
    #[cfg_attr(feature = "serde", serde(rename = "Average Data"))]
    pub average: Metrics,

    /// 全体合格细胞的提取结果, 按标签升序.
    #[cfg_attr(feature = "serde", serde(rename = "Full Dataset"))]
    pub cells: Vec<CellRecord>,

    /// 提取失败而被跳过的标签及原因. 不参与持久化.
    #[cfg_attr(feature = "serde", serde(skip))]
    pub skipped: Vec<(u32, MetricError)>,
}

/// 对分割网格中标签为 `label` 的细胞计算完整特征表.
///
/// 形状与灰度特征按固定目录顺序写入; `texture` 产出 Haralick
/// 矩阵时按方向展开追加在表尾. 任何一步退化 (空掩码, 零分母,
/// 常数径向距离等) 都整体失败.
pub fn cell_metrics<T: TextureSource>(
    image: ArrayView2<u8>,
    seg: &SegmentGrid,
    label: u32,
    texture: &T,
) -> Result<Metrics, MetricError> {
    let mask = seg.cell_mask(label)?;
    let patch = Patch::from_mask(image, &mask)?;

    let border = border_points(&patch);
    let trace = clockwise_trace(&border);
    let perimeter = shape::perimeter_traversal(&trace);
    let center = best_center(&patch, &trace)?;
    let area = mask.area() as f64;

    let dists = shape::radial_distances(&trace, center);
    let normalized = shape::normalize_radial(&dists)?;

    let hull = convex_hull(&border);
    let hull_area = hull.area();
    let hull_perimeter = hull.perimeter();
    let boxes = min_bounding_box(&border)?;
    let (radius_min, radius_max) = bounding_radii(&mask)?;
    let surrounding = surrounding_cells(seg, &mask)?;
    let intensity = crate::intensity::intensity_metrics(&patch)?;
    let (_, layer_metric) = crate::intensity::layer_gradient(&patch);

    let mut metrics = Metrics::new();
    metrics.insert(key::PERIMETER, perimeter);
    metrics.insert(key::AREA, area);
    metrics.insert(key::CONVEX_HULL_AREA, hull_area);
    metrics.insert(key::CONVEX_HULL_PERIMETER, hull_perimeter);
    metrics.insert(key::MIN_BOUNDING_RADIUS, radius_min);
    metrics.insert(key::MAX_BOUNDING_RADIUS, radius_max);
    metrics.insert(key::SURROUNDING_CELLS, surrounding as f64);
    metrics.insert(key::SPIKINESS, shape::spikiness(perimeter, area)?);
    metrics.insert(key::ELONGATION, shape::elongation(&boxes.by_area));
    metrics.insert(key::COMPACTNESS_1, shape::compactness_one(perimeter, area)?);
    metrics.insert(
        key::COMPACTNESS_2,
        shape::compactness_two(&patch, center, area)?,
    );
    metrics.insert(key::CIRCULARITY_1, shape::circularity_one(area, perimeter)?);
    metrics.insert(
        key::CIRCULARITY_2,
        shape::circularity_two(area, hull_perimeter)?,
    );
    metrics.insert(
        key::CIRCULARITY_3,
        shape::circularity_three(perimeter, area)?,
    );
    metrics.insert(key::CIRCULARITY_4, shape::circularity_four(&normalized)?);
    metrics.insert(key::CONVEXITY_1, shape::convexity_one(area, hull_area)?);
    metrics.insert(
        key::CONVEXITY_2,
        shape::convexity_two(perimeter, hull_perimeter)?,
    );
    metrics.insert(
        key::ROUGHNESS_1,
        shape::roughness_one(perimeter, hull_perimeter)?,
    );
    metrics.insert(key::ROUGHNESS_2, shape::roughness_two(&normalized)?);
    metrics.insert(
        key::ROUGHNESS_3,
        shape::roughness_three(&border, center)?,
    );
    metrics.insert(
        key::MEAN_RADIAL_DISTANCE,
        shape::mean_radial_distance(&normalized),
    );
    metrics.insert(
        key::MEAN_RADIAL_CROSSINGS,
        shape::mean_crossings(&dists) as f64,
    );
    metrics.insert(
        key::STD_RADIAL_DISTANCE,
        shape::std_radial_distance(&normalized),
    );
    metrics.insert(key::RADIAL_ENTROPY, shape::radial_entropy(&normalized));
    metrics.insert(key::MEAN_INTENSITY, intensity.mean);
    metrics.insert(key::STD_INTENSITY, intensity.std);
    metrics.insert(key::MAX_INTENSITY, intensity.max);
    metrics.insert(key::MIN_INTENSITY, intensity.min);
    metrics.insert(key::INTENSITY_RANGE, intensity.range);
    metrics.insert(key::INTENSITY_GRADIENT, layer_metric);

    if let Some(matrix) = texture.haralick(&patch) {
        for (name, value) in flatten_haralick(&matrix) {
            metrics.insert(name, value);
        }
    }
    Ok(metrics)
}

/// 退化细胞过滤: 面积, 凸包面积/周长, 遍历周长为零, 伸长率无穷,
/// 或径向距离标准差为零的细胞不进入数据集.
fn is_degenerate(metrics: &Metrics) -> bool {
    let zero = |name| metrics.get(name) == Some(0.0);
    zero(key::AREA)
        || zero(key::CONVEX_HULL_AREA)
        || zero(key::PERIMETER)
        || zero(key::CONVEX_HULL_PERIMETER)
        || zero(key::STD_RADIAL_DISTANCE)
        || metrics.get(key::ELONGATION) == Some(f64::INFINITY)
}

/// 逐特征均值, 特征顺序沿用首条记录.
fn mean_metrics(cells: &[CellRecord]) -> Metrics {
    let mut average = Metrics::new();
    let Some(first) = cells.first() else {
        return average;
    };
    for (name, _) in first.metrics.iter() {
        let sum: f64 = cells
            .iter()
            .filter_map(|cell| cell.metrics.get(name))
            .sum();
        average.insert(name, sum / cells.len() as f64);
    }
    average
}

/// 提取一幅图像中的全部细胞.
///
/// 遍历网格中出现的全部非背景标签; 提取失败的标签连同原因记入
/// [`ImageDataset::skipped`], 判为退化的细胞静默丢弃, 两者都不
/// 影响其余细胞. 启用 `rayon` 时按标签并行提取.
pub fn extract_image<T: TextureSource + Sync>(
    image: ArrayView2<u8>,
    seg: &SegmentGrid,
    texture: &T,
) -> ImageDataset {
    let labels = seg.labels();

    cfg_if::cfg_if! {
        if #[cfg(feature = "rayon")] {
            use rayon::prelude::*;
            let results: Vec<(u32, Result<Metrics, MetricError>)> = labels
                .par_iter()
                .map(|&label| (label, cell_metrics(image, seg, label, texture)))
                .collect();
        } else {
            let results: Vec<(u32, Result<Metrics, MetricError>)> = labels
                .iter()
                .map(|&label| (label, cell_metrics(image, seg, label, texture)))
                .collect();
        }
    }

    let mut cells = Vec::new();
    let mut skipped = Vec::new();
    for (label, outcome) in results {
        match outcome {
            Ok(metrics) if !is_degenerate(&metrics) => cells.push(CellRecord {
                cell_index: label,
                metrics,
            }),
            Ok(_) => {} // 退化细胞静默丢弃.
            Err(err) => skipped.push((label, err)),
        }
    }

    let average = mean_metrics(&cells);
    ImageDataset {
        average,
        cells,
        skipped,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::consts::SHAPE_KEYS;
    use crate::texture::{HaralickMatrix, NoTexture};
    use ndarray::Array2;

    fn float_eq(a: f64, b: f64) -> bool {
        (a - b).abs() < 1e-9
    }

    /// 8×8 图像, 左上 5×5 为细胞 1, 远处角落单像素为细胞 2.
    fn sample_scene() -> (Array2<u8>, SegmentGrid) {
        let image = Array2::from_shape_fn((8, 8), |(h, w)| (h * 8 + w + 10) as u8);
        let mut labels = Array2::<u32>::zeros((8, 8));
        for h in 1..=5 {
            for w in 1..=5 {
                labels[(h, w)] = 1;
            }
        }
        labels[(7, 7)] = 2;
        (image, SegmentGrid::new(labels))
    }

    /// 半径为 `radius` 的实心圆盘场景, 标签 1, 灰度恒定.
    fn disk_scene(radius: usize) -> (Array2<u8>, SegmentGrid) {
        let size = 2 * radius + 5;
        let c = (size / 2) as isize;
        let image = Array2::from_elem((size, size), 60u8);
        let labels = Array2::from_shape_fn((size, size), |(h, w)| {
            let dh = h as isize - c;
            let dw = w as isize - c;
            u32::from(dh * dh + dw * dw <= (radius * radius) as isize)
        });
        (image, SegmentGrid::new(labels))
    }

    /// 圆盘越大圆度越接近 1: 凸包口径的圆度 (2) 单调逼近,
    /// 遍历周长口径的圆度 (1) 受离散斜步影响, 稳定在 1 略下方.
    #[test]
    fn test_disk_circularity_approaches_one() {
        let (image, seg) = disk_scene(10);
        let small = cell_metrics(image.view(), &seg, 1, &NoTexture).unwrap();
        let (image, seg) = disk_scene(30);
        let large = cell_metrics(image.view(), &seg, 1, &NoTexture).unwrap();

        let c2_small = small.get("Circularity (2)").unwrap();
        let c2_large = large.get("Circularity (2)").unwrap();
        assert!((c2_small - 1.0).abs() < 0.05);
        assert!((c2_large - 1.0).abs() < 0.02);
        assert!((c2_large - 1.0).abs() < (c2_small - 1.0).abs());

        let c1 = large.get("Circularity (1)").unwrap();
        assert!(c1 > 0.85 && c1 < 1.0);
    }

    /// 完整流水线: 形状/灰度特征齐全且按目录顺序排列.
    #[test]
    fn test_cell_metrics_catalog_order() {
        let (image, seg) = sample_scene();
        let metrics = cell_metrics(image.view(), &seg, 1, &NoTexture).unwrap();

        assert_eq!(metrics.len(), SHAPE_KEYS.len());
        let names: Vec<&str> = metrics.iter().map(|(name, _)| name).collect();
        assert_eq!(names, SHAPE_KEYS.to_vec());

        assert!(float_eq(metrics.get("Area").unwrap(), 25.0));
        assert!(float_eq(metrics.get("Perimeter").unwrap(), 16.0));
        assert!(float_eq(metrics.get("Elongation").unwrap(), 1.0));
        assert!(float_eq(
            metrics.get("Number of Surrounding Cells").unwrap(),
            0.0
        ));
        assert!(metrics.get("STD Radial Distance").unwrap() > 0.0);
    }

    /// 注入纹理提供方后目录扩展 70 个 Haralick 条目.
    #[test]
    fn test_cell_metrics_with_texture() {
        struct Flat;
        impl TextureSource for Flat {
            fn haralick(&self, _patch: &Patch) -> Option<HaralickMatrix> {
                Some([[1.5; 14]; 4])
            }
        }

        let (image, seg) = sample_scene();
        let metrics = cell_metrics(image.view(), &seg, 1, &Flat).unwrap();
        assert_eq!(metrics.len(), SHAPE_KEYS.len() + 70);
        assert!(float_eq(
            metrics.get("Haralick - Entropy (Direction 2)").unwrap(),
            1.5
        ));
        assert!(float_eq(
            metrics.get("Haralick - Entropy (Mean)").unwrap(),
            1.5
        ));
    }

    /// 单像素细胞提取失败, 记入跳过列表而不进入数据集.
    #[test]
    fn test_extract_image_filters_degenerate() {
        let (image, seg) = sample_scene();
        let dataset = extract_image(image.view(), &seg, &NoTexture);

        assert_eq!(dataset.cells.len(), 1);
        assert_eq!(dataset.cells[0].cell_index, 1);
        assert_eq!(dataset.skipped.len(), 1);
        assert_eq!(dataset.skipped[0].0, 2);

        // 只有一条记录时均值就是它自己.
        for (name, value) in dataset.average.iter() {
            assert!(float_eq(dataset.cells[0].metrics.get(name).unwrap(), value));
        }
    }

    /// 不存在的标签报空区域错误.
    #[test]
    fn test_missing_label() {
        let (image, seg) = sample_scene();
        assert_eq!(
            cell_metrics(image.view(), &seg, 9, &NoTexture).unwrap_err(),
            MetricError::EmptyRegion
        );
    }

    /// 持久化形状: 顶层两个键, 记录含 Cell Index 与 Metrics.
    #[cfg(feature = "serde")]
    #[test]
    fn test_dataset_wire_shape() {
        let (image, seg) = sample_scene();
        let dataset = extract_image(image.view(), &seg, &NoTexture);
        let value = serde_json::to_value(&dataset).unwrap();

        assert!(value.get("Average Data").is_some());
        let full = value.get("Full Dataset").unwrap().as_array().unwrap();
        assert_eq!(full.len(), 1);
        assert_eq!(full[0].get("Cell Index").unwrap(), 1);
        assert!(full[0]
            .get("Metrics")
            .unwrap()
            .get("Mean Intensity")
            .is_some());
    }
}
