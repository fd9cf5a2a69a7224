//! 对称矩阵特征分解的可插拔入口.
//!
//! 主成分分析只依赖 [`EighSolver`] 这一个 trait; 默认实现
//! [`DenseEigh`] 走稠密分解, 测试可以注入桩实现.

use nalgebra::DMatrix;
use ndarray::Array2;

use crate::MetricError;

/// 对称实矩阵的特征分解.
pub trait EighSolver {
    /// 分解对称矩阵, 返回升序特征值与对应特征向量.
    ///
    /// 返回矩阵的第 `i` 列是第 `i` 个特征值的单位特征向量.
    /// 输入不是方阵时返回 [`MetricError::ShapeMismatch`].
    fn eigh(&self, matrix: &Array2<f64>) -> Result<(Vec<f64>, Array2<f64>), MetricError>;
}

/// 默认的稠密分解实现.
#[derive(Debug, Clone, Copy, Default)]
pub struct DenseEigh;

impl EighSolver for DenseEigh {
    fn eigh(&self, matrix: &Array2<f64>) -> Result<(Vec<f64>, Array2<f64>), MetricError> {
        let (rows, cols) = matrix.dim();
        if rows != cols {
            return Err(MetricError::ShapeMismatch((rows, cols), (rows, rows)));
        }
        if rows == 0 {
            return Err(MetricError::EmptyRegion);
        }

        let dense = DMatrix::from_fn(rows, cols, |r, c| matrix[(r, c)]);
        let eigen = dense.symmetric_eigen();

        let mut order: Vec<usize> = (0..rows).collect();
        order.sort_by(|&a, &b| eigen.eigenvalues[a].total_cmp(&eigen.eigenvalues[b]));

        let values = order.iter().map(|&i| eigen.eigenvalues[i]).collect();
        let vectors =
            Array2::from_shape_fn((rows, rows), |(r, c)| eigen.eigenvectors[(r, order[c])]);
        Ok((values, vectors))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::array;

    fn float_eq(a: f64, b: f64) -> bool {
        (a - b).abs() < 1e-9
    }

    /// 对角矩阵: 特征值升序, 特征向量为坐标轴 (至多差一个符号).
    #[test]
    fn test_diagonal_matrix() {
        let (values, vectors) = DenseEigh.eigh(&array![[2.0, 0.0], [0.0, 1.0]]).unwrap();
        assert!(float_eq(values[0], 1.0));
        assert!(float_eq(values[1], 2.0));

        // 特征值 1 对应第 0 列, 指向第二个坐标轴.
        assert!(float_eq(vectors[(0, 0)].abs(), 0.0));
        assert!(float_eq(vectors[(1, 0)].abs(), 1.0));
        assert!(float_eq(vectors[(0, 1)].abs(), 1.0));
        assert!(float_eq(vectors[(1, 1)].abs(), 0.0));
    }

    /// 非平凡对称矩阵: [[0,1],[1,0]] 的特征值为 ±1.
    #[test]
    fn test_symmetric_offdiagonal() {
        let (values, vectors) = DenseEigh.eigh(&array![[0.0, 1.0], [1.0, 0.0]]).unwrap();
        assert!(float_eq(values[0], -1.0));
        assert!(float_eq(values[1], 1.0));

        // 两个特征向量都是 (1, ±1)/√2.
        let inv_sqrt2 = std::f64::consts::FRAC_1_SQRT_2;
        assert!(float_eq(vectors[(0, 1)].abs(), inv_sqrt2));
        assert!(float_eq(vectors[(1, 1)].abs(), inv_sqrt2));
    }

    /// 协方差型矩阵下, 前 k 大特征值占总和的比例落在 [0, 1],
    /// 且随 k 单调不减, k 取满时恰为 1.
    #[test]
    fn test_topk_eigenvalue_ratio_monotone() {
        let (values, _) = DenseEigh
            .eigh(&array![[2.0, 1.0, 0.0], [1.0, 2.0, 0.0], [0.0, 0.0, 1.0]])
            .unwrap();
        assert!(values.windows(2).all(|w| w[0] <= w[1]));
        assert!(values.iter().all(|&v| v >= 0.0));

        let total: f64 = values.iter().sum();
        let mut previous = 0.0;
        for k in 1..=values.len() {
            let top: f64 = values.iter().rev().take(k).sum();
            let ratio = top / total;
            assert!(ratio >= previous && ratio <= 1.0 + 1e-9);
            previous = ratio;
        }
        assert!(float_eq(previous, 1.0));
    }

    /// 非方阵直接拒绝.
    #[test]
    fn test_rejects_non_square() {
        let err = DenseEigh.eigh(&Array2::zeros((2, 3))).unwrap_err();
        assert_eq!(err, MetricError::ShapeMismatch((2, 3), (2, 2)));
    }
}
