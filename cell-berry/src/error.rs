//! 运行时错误.

use crate::Idx2d;
use std::fmt;

/// 特征提取与统计归约的运行时错误.
#[derive(Debug, Clone, PartialEq)]
pub enum MetricError {
    /// 请求的掩码/裁剪区域没有任何前景像素 (标签不存在或全背景).
    EmptyRegion,

    /// 某个分母量 (面积, 凸包面积, 径向距离标准差等) 为零,
    /// 参数为对应特征名.
    DegenerateMetric(&'static str),

    /// 灰度图与分割网格形状不一致. 参数为 `(图像形状, 分割形状)`.
    ShapeMismatch(Idx2d, Idx2d),

    /// 样本不足以做实际统计工作.
    ///
    /// 第一个参数代表目前已有的样本数, 第二个参数代表所需的最少样本数.
    TooFewSamples(usize, usize),

    /// 单图像排名不支持所请求的条件 (如时间相关性).
    UnsupportedCondition,

    /// 短轴射线步进在迭代上限内未命中边缘像素.
    NoConvergence,
}

impl fmt::Display for MetricError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::EmptyRegion => write!(f, "requested region has no foreground pixel"),
            Self::DegenerateMetric(name) => {
                write!(f, "degenerate denominator while computing `{name}`")
            }
            Self::ShapeMismatch(img, seg) => write!(
                f,
                "image shape {img:?} does not match segmentation shape {seg:?}"
            ),
            Self::TooFewSamples(got, need) => {
                write!(f, "got {got} samples, need at least {need}")
            }
            Self::UnsupportedCondition => {
                write!(f, "ranking condition is not defined for a single image")
            }
            Self::NoConvergence => write!(f, "minor-axis ray march did not converge"),
        }
    }
}

impl std::error::Error for MetricError {}
