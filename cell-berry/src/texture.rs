//! 纹理特征接入点.
//!
//! Haralick 共生矩阵特征的具体实现由调用方通过 [`TextureSource`]
//! 注入; 本 crate 只约定矩阵形状 (4 方向 × 14 特征) 与展开后的
//! 特征命名.

use crate::consts::{HARALICK_DIRECTIONS, HARALICK_FEATURES, HARALICK_FEATURE_NAMES};
use crate::grid::Patch;

/// Haralick 纹理矩阵: 每行一个方向, 每列一个特征.
pub type HaralickMatrix = [[f64; HARALICK_FEATURES]; HARALICK_DIRECTIONS];

/// 纹理特征提供方.
///
/// 返回 `None` 表示该提供方不产出纹理特征, 提取流水线会跳过
/// 全部 Haralick 条目.
pub trait TextureSource {
    /// 对灰度裁剪块计算 Haralick 矩阵.
    fn haralick(&self, patch: &Patch) -> Option<HaralickMatrix>;
}

/// 不产出纹理特征的空提供方.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoTexture;

impl TextureSource for NoTexture {
    #[inline]
    fn haralick(&self, _patch: &Patch) -> Option<HaralickMatrix> {
        None
    }
}

/// 将 Haralick 矩阵展开为带名称的标量序列:
/// 先按方向逐特征展开为 `Haralick - <特征> (Direction <k>)`,
/// 再追加跨方向均值 `Haralick - <特征> (Mean)`.
pub fn flatten_haralick(matrix: &HaralickMatrix) -> Vec<(String, f64)> {
    let mut flat = Vec::with_capacity((HARALICK_DIRECTIONS + 1) * HARALICK_FEATURES);
    for (dir, row) in matrix.iter().enumerate() {
        for (name, &value) in HARALICK_FEATURE_NAMES.iter().zip(row) {
            flat.push((format!("Haralick - {name} (Direction {})", dir + 1), value));
        }
    }
    for (feat, name) in HARALICK_FEATURE_NAMES.iter().enumerate() {
        let mean = matrix.iter().map(|row| row[feat]).sum::<f64>() / HARALICK_DIRECTIONS as f64;
        flat.push((format!("Haralick - {name} (Mean)"), mean));
    }
    flat
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::array;

    /// 展开后共 70 项, 命名与方向序号一致, 均值列在最后.
    #[test]
    fn test_flatten_haralick() {
        let mut matrix = [[0.0; HARALICK_FEATURES]; HARALICK_DIRECTIONS];
        for (dir, row) in matrix.iter_mut().enumerate() {
            for (feat, v) in row.iter_mut().enumerate() {
                *v = (dir * 100 + feat) as f64;
            }
        }

        let flat = flatten_haralick(&matrix);
        assert_eq!(flat.len(), 70);
        assert_eq!(flat[0].0, "Haralick - Angular Second Moment (Direction 1)");
        assert_eq!(flat[0].1, 0.0);
        assert_eq!(flat[43].0, "Haralick - Contrast (Direction 4)");
        assert_eq!(flat[43].1, 301.0);

        // 跨方向均值: (1 + 101 + 201 + 301) / 4.
        let (name, value) = &flat[57];
        assert_eq!(name, "Haralick - Contrast (Mean)");
        assert_eq!(*value, 151.0);
    }

    /// 空提供方不产出任何纹理.
    #[test]
    fn test_no_texture() {
        let patch = Patch::from_raw(array![[1u8]]).unwrap();
        assert!(NoTexture.haralick(&patch).is_none());
    }
}
