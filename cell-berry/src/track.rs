//! 跨图像统计: 归一化, 特征排名, 离群细胞, 项目统计表与主成分.
//!
//! 输入是按时间排好的图像观测序列 ([`ImageSample`]); 图像内
//! 统计由 [`crate::extract`] 产出. 序列级归一化用带符号的最大
//! 绝对值做除数, 单图像归一化沿用普通最大值, 两者口径不同.

use itertools::Itertools;

use crate::extract::{ImageDataset, Metrics};
use crate::linalg::EighSolver;
use crate::stats;
use crate::MetricError;

/// 时间轴上的一个观测: 采集时间戳 (秒) 与该图像的提取结果.
#[derive(Debug, Clone)]
pub struct ImageSample {
    /// 图像采集时刻, Unix 时间戳 (秒).
    pub timestamp: f64,

    /// 该图像的提取结果.
    pub dataset: ImageDataset,
}

/// 特征排名条件.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RankCondition {
    /// 归一化序列方差最大.
    MaxVariance,
    /// 归一化序列方差最小.
    MinVariance,
    /// 归一化序列极差最大.
    MaxRange,
    /// 归一化序列极差最小.
    MinRange,
    /// 原始序列与时间戳的 Pearson 相关绝对值最大.
    MaxTimeCorrelation,
    /// 原始序列与时间戳的 Pearson 相关绝对值最小.
    MinTimeCorrelation,
}

impl RankCondition {
    /// 条件是否取最大者?
    fn descending(self) -> bool {
        matches!(
            self,
            Self::MaxVariance | Self::MaxRange | Self::MaxTimeCorrelation
        )
    }
}

/// 跨图像排名时返回的特征个数.
pub const RANKED_METRICS_IMAGE_SET: usize = 3;

/// 单图像排名时返回的特征个数.
pub const RANKED_METRICS_SINGLE_IMAGE: usize = 4;

/// 按带符号的最大绝对值归一化一列数值.
///
/// 除数取绝对值最大的 **原值** (保留符号); 全零列原样返回.
fn normalize_by_max_abs(values: &[f64]) -> Vec<f64> {
    let divisor = values
        .iter()
        .copied()
        .fold(0.0f64, |acc, v| if v.abs() > acc.abs() { v } else { acc });
    if divisor == 0.0 {
        return values.to_vec();
    }
    values.iter().map(|v| v / divisor).collect()
}

/// 按普通最大值归一化一列数值. 全零列原样返回.
fn normalize_by_max(values: &[f64]) -> Vec<f64> {
    let max = values.iter().copied().fold(f64::NEG_INFINITY, f64::max);
    if max == 0.0 {
        return values.to_vec();
    }
    values.iter().map(|v| v / max).collect()
}

/// 某个特征在全部观测的平均表中的取值序列, 按观测顺序.
fn average_series(samples: &[ImageSample], name: &str) -> Vec<f64> {
    samples
        .iter()
        .filter_map(|s| s.dataset.average.get(name))
        .collect()
}

/// 跨图像特征排名: 对每个特征求归一化均值序列的方差与极差,
/// 以及原始序列对时间戳的 Pearson 相关绝对值, 按条件排序后
/// 取前 [`RANKED_METRICS_IMAGE_SET`] 个特征名.
///
/// 相关系数无定义 (常数序列或观测不足) 的特征一律排在序尾.
pub fn rank_metrics(
    samples: &[ImageSample],
    condition: RankCondition,
) -> Result<Vec<String>, MetricError> {
    let Some(first) = samples.first() else {
        return Err(MetricError::TooFewSamples(0, 1));
    };
    let timestamps: Vec<f64> = samples.iter().map(|s| s.timestamp).collect();

    let mut scored: Vec<(String, f64)> = first
        .dataset
        .average
        .iter()
        .map(|(name, _)| {
            let raw = average_series(samples, name);
            let normalized = normalize_by_max_abs(&raw);
            let score = match condition {
                RankCondition::MaxVariance | RankCondition::MinVariance => {
                    stats::variance(&normalized)
                }
                RankCondition::MaxRange | RankCondition::MinRange => range(&normalized),
                RankCondition::MaxTimeCorrelation | RankCondition::MinTimeCorrelation => {
                    stats::pearson(&raw, &timestamps)
                        .map(f64::abs)
                        .unwrap_or(f64::NAN)
                }
            };
            (name.to_string(), score)
        })
        .collect();

    sort_scored(&mut scored, condition);
    Ok(scored
        .into_iter()
        .map(|(name, _)| name)
        .take(RANKED_METRICS_IMAGE_SET)
        .collect())
}

/// 单图像特征排名: 对每个特征求归一化细胞值序列的方差或极差,
/// 取前 [`RANKED_METRICS_SINGLE_IMAGE`] 个特征名.
///
/// 时间相关条件对单图像无定义, 返回
/// [`MetricError::UnsupportedCondition`].
pub fn rank_metrics_single_image(
    dataset: &ImageDataset,
    condition: RankCondition,
) -> Result<Vec<String>, MetricError> {
    if matches!(
        condition,
        RankCondition::MaxTimeCorrelation | RankCondition::MinTimeCorrelation
    ) {
        return Err(MetricError::UnsupportedCondition);
    }
    let Some(first) = dataset.cells.first() else {
        return Err(MetricError::TooFewSamples(0, 1));
    };

    let mut scored: Vec<(String, f64)> = first
        .metrics
        .iter()
        .map(|(name, _)| {
            let column = metric_column(dataset, name);
            let normalized = normalize_by_max(&column);
            let score = match condition {
                RankCondition::MaxVariance | RankCondition::MinVariance => {
                    stats::variance(&normalized)
                }
                _ => range(&normalized),
            };
            (name.to_string(), score)
        })
        .collect();

    sort_scored(&mut scored, condition);
    Ok(scored
        .into_iter()
        .map(|(name, _)| name)
        .take(RANKED_METRICS_SINGLE_IMAGE)
        .collect())
}

fn range(values: &[f64]) -> f64 {
    let max = values.iter().copied().fold(f64::NEG_INFINITY, f64::max);
    let min = values.iter().copied().fold(f64::INFINITY, f64::min);
    max - min
}

/// 按分数排序, 同分保持目录顺序; NaN 分数无论方向都压到序尾.
fn sort_scored(scored: &mut [(String, f64)], condition: RankCondition) {
    use std::cmp::Ordering;

    let descending = condition.descending();
    scored.sort_by(|a, b| match (a.1.is_nan(), b.1.is_nan()) {
        (true, true) => Ordering::Equal,
        (true, false) => Ordering::Greater,
        (false, true) => Ordering::Less,
        (false, false) if descending => b.1.total_cmp(&a.1),
        (false, false) => a.1.total_cmp(&b.1),
    });
}

/// 一个特征在单幅图像全部细胞上的取值列, 按记录顺序.
fn metric_column(dataset: &ImageDataset, name: &str) -> Vec<f64> {
    dataset
        .cells
        .iter()
        .filter_map(|cell| cell.metrics.get(name))
        .collect()
}

/// z 分数绝对值超过 3 的下标. 标准差为零时无离群可言.
fn z_outliers(values: &[f64]) -> Vec<usize> {
    let mean = stats::mean(values);
    let std = stats::std(values);
    if std == 0.0 {
        return Vec::new();
    }
    values
        .iter()
        .enumerate()
        .filter(|(_, &v)| ((v - mean) / std).abs() > 3.0)
        .map(|(i, _)| i)
        .collect()
}

/// 单图像离群细胞: 给定若干特征, 取各特征 z 分数离群下标的并集,
/// 升序去重. 下标指向 [`ImageDataset::cells`] 中的位置.
pub fn outlier_cells(dataset: &ImageDataset, metrics: &[String]) -> Vec<usize> {
    metrics
        .iter()
        .flat_map(|name| z_outliers(&metric_column(dataset, name)))
        .sorted_unstable()
        .dedup()
        .collect()
}

/// 跨图像离群细胞: 对每幅图像分别求给定特征的离群细胞并集.
pub fn outlier_cells_per_image(samples: &[ImageSample], metrics: &[String]) -> Vec<Vec<usize>> {
    samples
        .iter()
        .map(|sample| outlier_cells(&sample.dataset, metrics))
        .collect()
}

/// 项目统计表: 每个特征一行, 每幅图像依次给出均值, 中位数,
/// 标准差, 极差与四分位距.
#[derive(Debug, Clone)]
#[cfg_attr(feature = "serde", derive(serde::Serialize))]
pub struct ProjectStatistics {
    /// 列标题: 对每种统计量, 依次列出每个观测的时间戳.
    pub columns: Vec<String>,

    /// 每个特征一行: 特征名与按列标题顺序排列的统计值.
    pub rows: Vec<(String, Vec<f64>)>,
}

/// 生成项目统计表. 特征目录取第一幅图像第一条记录的顺序;
/// 列标题中的时间戳四舍五入到整秒, 与浮点打印精度无关;
/// 没有合格细胞的图像在所有统计列上给出 NaN.
pub fn project_statistics(samples: &[ImageSample]) -> Result<ProjectStatistics, MetricError> {
    let catalog: Vec<String> = samples
        .iter()
        .find_map(|s| s.dataset.cells.first())
        .map(|cell| cell.metrics.iter().map(|(name, _)| name.to_string()).collect())
        .ok_or(MetricError::TooFewSamples(0, 1))?;

    const STATISTICS: [&str; 5] = ["Mean", "Median", "STD", "Range", "IQR"];
    let columns = STATISTICS
        .iter()
        .cartesian_product(samples.iter())
        .map(|(stat, sample)| format!("{} ({stat})", sample.timestamp.round() as i64))
        .collect();

    let rows = catalog
        .iter()
        .map(|name| {
            let per_image: Vec<Vec<f64>> = samples
                .iter()
                .map(|sample| metric_column(&sample.dataset, name))
                .collect();
            let mut cells = Vec::with_capacity(STATISTICS.len() * samples.len());
            for stat in STATISTICS {
                for column in &per_image {
                    cells.push(if column.is_empty() {
                        f64::NAN
                    } else {
                        match stat {
                            "Mean" => stats::mean(column),
                            "Median" => stats::median(column),
                            "STD" => stats::std(column),
                            "Range" => range(column),
                            _ => stats::percentile(column, 75.0) - stats::percentile(column, 25.0),
                        }
                    });
                }
            }
            (name.clone(), cells)
        })
        .collect();

    Ok(ProjectStatistics { columns, rows })
}

/// 主成分投影结果.
#[derive(Debug, Clone)]
#[cfg_attr(feature = "serde", derive(serde::Serialize))]
pub struct PcaProjection {
    /// 成分名: `Principal Component 1` 起, 按解释方差降序.
    pub names: Vec<String>,

    /// 每个成分一行: 保留记录在该成分上的投影, 与 `kept` 对齐.
    pub scores: Vec<Vec<f64>>,

    /// 各成分的协方差特征值 (解释方差), 与 `names` 对齐, 降序.
    pub explained: Vec<f64>,

    /// 参与分析的记录在输入序列中的下标 (含 NaN 特征的记录被剔除).
    pub kept: Vec<usize>,
}

/// 主成分分析核心.
///
/// 流程: 剔除含 NaN 特征的记录; 逐特征标准化 (标准差为零的列
/// 置零); 以特征为行求样本协方差 (除以 n-1); 对称特征分解后取
/// 特征值最大的 `top` 个特征向量, 把每条标准化记录投影上去.
/// 可用记录不足 2 条时返回 [`MetricError::TooFewSamples`].
pub fn principal_components<S: EighSolver>(
    records: &[&Metrics],
    top: usize,
    solver: &S,
) -> Result<PcaProjection, MetricError> {
    let kept: Vec<usize> = records
        .iter()
        .enumerate()
        .filter(|(_, m)| m.iter().all(|(_, v)| !v.is_nan()))
        .map(|(i, _)| i)
        .collect();
    if kept.len() < 2 {
        return Err(MetricError::TooFewSamples(kept.len(), 2));
    }

    let catalog: Vec<String> = records[kept[0]]
        .iter()
        .map(|(name, _)| name.to_string())
        .collect();
    let n = kept.len();
    let d = catalog.len();

    // 标准化: 每个特征一行.
    let mut standardized = ndarray::Array2::<f64>::zeros((d, n));
    for (row, name) in catalog.iter().enumerate() {
        let column: Vec<f64> = kept
            .iter()
            .filter_map(|&i| records[i].get(name))
            .collect();
        let mean = stats::mean(&column);
        let std = stats::std(&column);
        if std == 0.0 {
            continue; // 常数特征不携带信息, 置零.
        }
        for (col, &v) in column.iter().enumerate() {
            standardized[(row, col)] = (v - mean) / std;
        }
    }

    // 样本协方差 (除以 n-1). 标准化后各行均值为零.
    let mut covariance = ndarray::Array2::<f64>::zeros((d, d));
    for i in 0..d {
        for j in i..d {
            let dot = (0..n)
                .map(|k| standardized[(i, k)] * standardized[(j, k)])
                .sum::<f64>()
                / (n - 1) as f64;
            covariance[(i, j)] = dot;
            covariance[(j, i)] = dot;
        }
    }

    let (values, vectors) = solver.eigh(&covariance)?;

    let top = top.min(d);
    let mut names = Vec::with_capacity(top);
    let mut scores = Vec::with_capacity(top);
    let mut explained = Vec::with_capacity(top);
    for component in 1..=top {
        // 升序分解下, 第 component 大的特征向量位于列 d - component.
        let axis = vectors.column(d - component);
        let projection: Vec<f64> = (0..n)
            .map(|k| (0..d).map(|row| axis[row] * standardized[(row, k)]).sum())
            .collect();
        names.push(format!("Principal Component {component}"));
        scores.push(projection);
        explained.push(values[d - component]);
    }
    Ok(PcaProjection {
        names,
        scores,
        explained,
        kept,
    })
}

/// 图像集全体细胞的主成分 (前 [`RANKED_METRICS_IMAGE_SET`] 个).
pub fn pca_image_set<S: EighSolver>(
    samples: &[ImageSample],
    solver: &S,
) -> Result<PcaProjection, MetricError> {
    let records: Vec<&Metrics> = samples
        .iter()
        .flat_map(|s| s.dataset.cells.iter().map(|cell| &cell.metrics))
        .collect();
    principal_components(&records, RANKED_METRICS_IMAGE_SET, solver)
}

/// 图像集平均表序列的主成分 (前 [`RANKED_METRICS_IMAGE_SET`] 个).
pub fn pca_averages<S: EighSolver>(
    samples: &[ImageSample],
    solver: &S,
) -> Result<PcaProjection, MetricError> {
    let records: Vec<&Metrics> = samples.iter().map(|s| &s.dataset.average).collect();
    principal_components(&records, RANKED_METRICS_IMAGE_SET, solver)
}

/// 单图像全体细胞的主成分 (前 [`RANKED_METRICS_SINGLE_IMAGE`] 个).
pub fn pca_single_image<S: EighSolver>(
    dataset: &ImageDataset,
    solver: &S,
) -> Result<PcaProjection, MetricError> {
    let records: Vec<&Metrics> = dataset.cells.iter().map(|cell| &cell.metrics).collect();
    principal_components(&records, RANKED_METRICS_SINGLE_IMAGE, solver)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::extract::CellRecord;
    use crate::linalg::DenseEigh;

    fn float_eq(a: f64, b: f64) -> bool {
        (a - b).abs() < 1e-9
    }

    fn metrics_of(pairs: &[(&str, f64)]) -> Metrics {
        let mut m = Metrics::new();
        for &(name, value) in pairs {
            m.insert(name, value);
        }
        m
    }

    fn dataset_of(cells: &[&[(&str, f64)]]) -> ImageDataset {
        let cells: Vec<CellRecord> = cells
            .iter()
            .enumerate()
            .map(|(i, pairs)| CellRecord {
                cell_index: i as u32 + 1,
                metrics: metrics_of(pairs),
            })
            .collect();
        let mut average = Metrics::new();
        if let Some(first) = cells.first() {
            for (name, _) in first.metrics.iter() {
                let sum: f64 = cells.iter().filter_map(|c| c.metrics.get(name)).sum();
                average.insert(name, sum / cells.len() as f64);
            }
        }
        ImageDataset {
            average,
            cells,
            skipped: Vec::new(),
        }
    }

    fn sample(timestamp: f64, average: &[(&str, f64)]) -> ImageSample {
        ImageSample {
            timestamp,
            dataset: ImageDataset {
                average: metrics_of(average),
                cells: Vec::new(),
                skipped: Vec::new(),
            },
        }
    }

    /// 归一化除数保留符号: 绝对值最大的是 -4, 所以 -4 归一化为 1.
    #[test]
    fn test_normalize_keeps_sign() {
        let normalized = normalize_by_max_abs(&[2.0, -4.0, 1.0]);
        assert!(float_eq(normalized[0], -0.5));
        assert!(float_eq(normalized[1], 1.0));

        // 全零列原样保留.
        assert_eq!(normalize_by_max_abs(&[0.0, 0.0]), vec![0.0, 0.0]);
    }

    /// 方差条件: 常数特征排在波动特征之后 (Max) 或之前 (Min).
    #[test]
    fn test_rank_metrics_variance() {
        let samples = vec![
            sample(100.0, &[("Area", 10.0), ("Perimeter", 5.0), ("Spikiness", 1.0)]),
            sample(200.0, &[("Area", 30.0), ("Perimeter", 5.0), ("Spikiness", 1.1)]),
            sample(300.0, &[("Area", 20.0), ("Perimeter", 5.0), ("Spikiness", 0.9)]),
        ];

        let top = rank_metrics(&samples, RankCondition::MaxVariance).unwrap();
        assert_eq!(top[0], "Area");
        assert_eq!(top.len(), RANKED_METRICS_IMAGE_SET);

        let bottom = rank_metrics(&samples, RankCondition::MinVariance).unwrap();
        assert_eq!(bottom[0], "Perimeter");
    }

    /// 时间相关条件: 与时间线性同步的特征排第一, 常数特征垫底.
    #[test]
    fn test_rank_metrics_time_correlation() {
        let samples = vec![
            sample(100.0, &[("Area", 1.0), ("Perimeter", 7.0), ("Spikiness", 3.0)]),
            sample(200.0, &[("Area", 2.0), ("Perimeter", 7.0), ("Spikiness", -1.0)]),
            sample(300.0, &[("Area", 3.0), ("Perimeter", 7.0), ("Spikiness", 2.5)]),
        ];

        let top = rank_metrics(&samples, RankCondition::MaxTimeCorrelation).unwrap();
        assert_eq!(top[0], "Area");
        // 常数特征的相关系数无定义, 压到序尾.
        assert_eq!(top[2], "Perimeter");
    }

    /// 单图像排名不支持时间相关条件.
    #[test]
    fn test_single_image_rejects_time_correlation() {
        let dataset = dataset_of(&[&[("Area", 1.0)], &[("Area", 2.0)]]);
        assert_eq!(
            rank_metrics_single_image(&dataset, RankCondition::MaxTimeCorrelation).unwrap_err(),
            MetricError::UnsupportedCondition
        );

        let top = rank_metrics_single_image(&dataset, RankCondition::MaxRange).unwrap();
        assert_eq!(top, vec!["Area".to_string()]);
    }

    /// 离群判定: 一个远端值把其余值拉不动, |z| > 3 才报.
    #[test]
    fn test_outlier_cells() {
        // 12 个 1.0 加一个 1000.0: 远端值 z 分数超过 3.
        let mut rows: Vec<Vec<(&str, f64)>> = vec![vec![("Area", 1.0)]; 12];
        rows.push(vec![("Area", 1000.0)]);
        let refs: Vec<&[(&str, f64)]> = rows.iter().map(|r| r.as_slice()).collect();
        let dataset = dataset_of(&refs);

        let outliers = outlier_cells(&dataset, &["Area".to_string()]);
        assert_eq!(outliers, vec![12]);

        // 常数列没有离群.
        let flat = dataset_of(&[&[("Area", 2.0)], &[("Area", 2.0)], &[("Area", 2.0)]]);
        assert!(outlier_cells(&flat, &["Area".to_string()]).is_empty());
    }

    /// 项目统计表: 单特征双图像, 列序为统计量外层, 图像内层;
    /// 列标题里的时间戳取整秒.
    #[test]
    fn test_project_statistics() {
        let mut first = sample(100.0, &[]);
        first.dataset = dataset_of(&[&[("Area", 1.0)], &[("Area", 3.0)]]);
        let mut second = sample(200.6, &[]);
        second.dataset = dataset_of(&[&[("Area", 5.0)], &[("Area", 9.0)]]);

        let table = project_statistics(&[first, second]).unwrap();
        assert_eq!(table.columns.len(), 10);
        assert_eq!(table.columns[0], "100 (Mean)");
        assert_eq!(table.columns[1], "201 (Mean)");
        assert_eq!(table.rows.len(), 1);

        let (name, cells) = &table.rows[0];
        assert_eq!(name, "Area");
        assert!(float_eq(cells[0], 2.0)); // 图像 1 均值
        assert!(float_eq(cells[1], 7.0)); // 图像 2 均值
        assert!(float_eq(cells[2], 2.0)); // 图像 1 中位数
        assert!(float_eq(cells[6], 2.0)); // 图像 1 极差
        assert!(float_eq(cells[9], 2.0)); // 图像 2 四分位距
    }

    /// 主成分: 双特征完全相关时第一成分解释全部方差,
    /// 两条记录的投影关于零对称.
    #[test]
    fn test_principal_components_correlated() {
        let records = [
            metrics_of(&[("Area", 1.0), ("Perimeter", 10.0)]),
            metrics_of(&[("Area", 2.0), ("Perimeter", 20.0)]),
            metrics_of(&[("Area", 3.0), ("Perimeter", 30.0)]),
        ];
        let refs: Vec<&Metrics> = records.iter().collect();

        let pca = principal_components(&refs, 2, &DenseEigh).unwrap();
        assert_eq!(pca.names[0], "Principal Component 1");
        assert_eq!(pca.kept, vec![0, 1, 2]);

        // 第一成分: 两端投影反号, 中点为零.
        assert!(float_eq(pca.scores[0][1], 0.0));
        assert!(float_eq(pca.scores[0][0] + pca.scores[0][2], 0.0));
        assert!(pca.scores[0][0].abs() > 1.0);

        // 完全相关时第一成分解释全部方差, 特征值降序且非负.
        assert!(float_eq(pca.explained[0], 3.0));
        assert!(pca.explained[1].abs() < 1e-9);
        assert!(pca.scores[1].iter().all(|&v| v.abs() < 1e-9));
    }

    /// 含 NaN 特征的记录被剔除, 剩余不足两条时报样本不足.
    #[test]
    fn test_principal_components_nan_removal() {
        let records = [
            metrics_of(&[("Area", 1.0)]),
            metrics_of(&[("Area", f64::NAN)]),
            metrics_of(&[("Area", 3.0)]),
        ];
        let refs: Vec<&Metrics> = records.iter().collect();
        let pca = principal_components(&refs, 1, &DenseEigh).unwrap();
        assert_eq!(pca.kept, vec![0, 2]);

        let short = [metrics_of(&[("Area", f64::NAN)]), metrics_of(&[("Area", 1.0)])];
        let refs: Vec<&Metrics> = short.iter().collect();
        assert_eq!(
            principal_components(&refs, 1, &DenseEigh).unwrap_err(),
            MetricError::TooFewSamples(1, 2)
        );
    }
}
