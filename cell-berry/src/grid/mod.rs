//! 网格基础数据结构: 分割标签网格, 二值掩码与灰度裁剪块.

use std::ops::Index;

use ndarray::{Array2, ArrayView2};

use crate::consts::{BACKGROUND, FOREGROUND};
use crate::{Area2d, Idx2d, MetricError};

/// 获得 `(h, w)` 的 4-邻居索引. 不检查越界.
#[inline]
pub(crate) fn neighbour4((h, w): Idx2d) -> [Idx2d; 4] {
    [
        (h.wrapping_sub(1), w),
        (h.saturating_add(1), w),
        (h, w.wrapping_sub(1)),
        (h, w.saturating_add(1)),
    ]
}

/// 获得 `(h, w)` 的 8-邻居索引. 不检查越界.
#[inline]
pub(crate) fn neighbour8((h, w): Idx2d) -> [Idx2d; 8] {
    [
        (h.wrapping_sub(1), w.wrapping_sub(1)),
        (h.wrapping_sub(1), w),
        (h.wrapping_sub(1), w.saturating_add(1)),
        (h, w.wrapping_sub(1)),
        (h, w.saturating_add(1)),
        (h.saturating_add(1), w.wrapping_sub(1)),
        (h.saturating_add(1), w),
        (h.saturating_add(1), w.saturating_add(1)),
    ]
}

/// 二值占据视图. 为掩码与灰度裁剪块提供统一的形状/邻域操作,
/// 所有几何算法都以该 trait 为输入.
///
/// 约定: 越界索引视为背景.
pub trait Bitmap {
    /// 图像的分辨率 (高, 宽).
    fn shape(&self) -> Idx2d;

    /// 给定位置是否为前景像素? 越界时返回 `false`.
    fn is_set(&self, pos: Idx2d) -> bool;

    /// 获得图像的高.
    #[inline]
    fn height(&self) -> usize {
        self.shape().0
    }

    /// 获得图像的宽.
    #[inline]
    fn width(&self) -> usize {
        self.shape().1
    }

    /// 图像的像素个数.
    #[inline]
    fn size(&self) -> usize {
        let (h, w) = self.shape();
        h * w
    }

    /// 判断一个索引是否合法 (未越界).
    #[inline]
    fn check(&self, (h, w): Idx2d) -> bool {
        let (h_len, w_len) = self.shape();
        h < h_len && w < w_len
    }

    /// 判断一个索引是否位于图像的边缘.
    #[inline]
    fn is_at_border(&self, (h, w): Idx2d) -> bool {
        h == 0
            || h.saturating_add(1) == self.height()
            || w == 0
            || w.saturating_add(1) == self.width()
    }

    /// 按行优先顺序迭代所有索引.
    fn pos_iter(&self) -> PosIter {
        PosIter {
            shape: self.shape(),
            next: 0,
        }
    }

    /// 收集所有前景像素的索引.
    fn set_positions(&self) -> Area2d {
        self.pos_iter().filter(|&p| self.is_set(p)).collect()
    }

    /// 统计前景像素总个数.
    fn count_set(&self) -> usize {
        self.pos_iter().filter(|&p| self.is_set(p)).count()
    }

    /// 统计 `pos` 的 4-邻域中前景像素的个数 (0 到 4).
    fn n4_count(&self, pos: Idx2d) -> u8 {
        neighbour4(pos)
            .into_iter()
            .filter(|&p| self.is_set(p))
            .count() as u8
    }

    /// `pos` 的 4-邻域是否含有背景像素 (越界视为背景)?
    fn has_background_n4(&self, pos: Idx2d) -> bool {
        neighbour4(pos).into_iter().any(|p| !self.is_set(p))
    }

    /// `pos` 是否为内部前景像素 (本身与 4-邻域全为前景)?
    #[inline]
    fn is_interior(&self, pos: Idx2d) -> bool {
        self.is_set(pos) && !self.has_background_n4(pos)
    }
}

/// [`Bitmap::pos_iter`] 的迭代器类型.
pub struct PosIter {
    shape: Idx2d,
    next: usize,
}

impl Iterator for PosIter {
    type Item = Idx2d;

    #[inline]
    fn next(&mut self) -> Option<Idx2d> {
        let (h, w) = self.shape;
        if w == 0 || self.next >= h * w {
            return None;
        }
        let pos = (self.next / w, self.next % w);
        self.next += 1;
        Some(pos)
    }
}

/// 分割标签网格. 每个像素保存非负标签, `0` 为背景, `k` 为第 `k` 个细胞.
#[derive(Debug, Clone)]
pub struct SegmentGrid {
    data: Array2<u32>,
}

impl Index<Idx2d> for SegmentGrid {
    type Output = u32;

    #[inline]
    fn index(&self, index: Idx2d) -> &Self::Output {
        &self.data[index]
    }
}

impl SegmentGrid {
    /// 直接由标签矩阵初始化.
    #[inline]
    pub fn new(data: Array2<u32>) -> Self {
        Self { data }
    }

    /// 获得 **底层** 数据的一份不可变 shallow copy.
    #[inline]
    pub fn array_view(&self) -> ArrayView2<u32> {
        self.data.view()
    }

    /// 网格的分辨率 (高, 宽).
    #[inline]
    pub fn shape(&self) -> Idx2d {
        let &[h, w] = self.data.shape() else {
            unreachable!()
        };
        (h, w)
    }

    /// 获取给定位置的标签值. 越界时返回 `None`.
    #[inline]
    pub fn get(&self, pos: Idx2d) -> Option<&u32> {
        self.data.get(pos)
    }

    /// 网格中出现的最大标签值.
    pub fn max_label(&self) -> u32 {
        self.data.iter().copied().max().unwrap_or(BACKGROUND)
    }

    /// 收集网格中出现过的所有非背景标签, 升序去重.
    pub fn labels(&self) -> Vec<u32> {
        let mut labels: Vec<u32> = self
            .data
            .iter()
            .copied()
            .filter(|&v| v != BACKGROUND)
            .collect();
        labels.sort_unstable();
        labels.dedup();
        labels
    }

    /// 选取标签 `label` 得到二值掩码.
    ///
    /// 如果该标签在网格中不存在 (掩码为空), 返回
    /// [`MetricError::EmptyRegion`].
    pub fn cell_mask(&self, label: u32) -> Result<CellMask, MetricError> {
        let data = self.data.map(|&v| if v == label { FOREGROUND } else { 0 });
        if data.iter().all(|&v| v == 0) {
            return Err(MetricError::EmptyRegion);
        }
        Ok(CellMask { data })
    }
}

/// 单个细胞的二值掩码. 不变式: 至少含有一个前景像素, 创建后不再修改.
#[derive(Debug, Clone)]
pub struct CellMask {
    data: Array2<u8>,
}

impl Index<Idx2d> for CellMask {
    type Output = u8;

    #[inline]
    fn index(&self, index: Idx2d) -> &Self::Output {
        &self.data[index]
    }
}

impl Bitmap for CellMask {
    #[inline]
    fn shape(&self) -> Idx2d {
        let &[h, w] = self.data.shape() else {
            unreachable!()
        };
        (h, w)
    }

    #[inline]
    fn is_set(&self, pos: Idx2d) -> bool {
        matches!(self.data.get(pos), Some(&v) if v > 0)
    }
}

impl CellMask {
    /// 由 0/1 矩阵初始化. 全零矩阵返回 [`MetricError::EmptyRegion`].
    pub fn new(data: Array2<u8>) -> Result<Self, MetricError> {
        if data.iter().all(|&v| v == 0) {
            return Err(MetricError::EmptyRegion);
        }
        Ok(Self { data })
    }

    /// 获得 **底层** 数据的一份不可变 shallow copy.
    #[inline]
    pub fn array_view(&self) -> ArrayView2<u8> {
        self.data.view()
    }

    /// 掩码面积, 即前景像素个数.
    #[inline]
    pub fn area(&self) -> usize {
        self.data.iter().filter(|&&v| v > 0).count()
    }
}

/// 灰度裁剪块: 灰度图按掩码相乘后, 裁剪到掩码最小外接矩形的结果.
/// 背景像素为 0, `origin` 记录裁剪块在原图中的左上角偏移.
#[derive(Debug, Clone)]
pub struct Patch {
    data: Array2<u8>,
    origin: Idx2d,
}

impl Index<Idx2d> for Patch {
    type Output = u8;

    #[inline]
    fn index(&self, index: Idx2d) -> &Self::Output {
        &self.data[index]
    }
}

impl Bitmap for Patch {
    #[inline]
    fn shape(&self) -> Idx2d {
        let &[h, w] = self.data.shape() else {
            unreachable!()
        };
        (h, w)
    }

    #[inline]
    fn is_set(&self, pos: Idx2d) -> bool {
        matches!(self.data.get(pos), Some(&v) if v > 0)
    }
}

impl Patch {
    /// 将灰度图按掩码相乘, 并裁剪到掩码的最小外接矩形.
    ///
    /// 灰度图与掩码形状不一致时返回 [`MetricError::ShapeMismatch`];
    /// 掩码为空时返回 [`MetricError::EmptyRegion`].
    pub fn from_mask(image: ArrayView2<u8>, mask: &CellMask) -> Result<Self, MetricError> {
        let &[ih, iw] = image.shape() else {
            unreachable!()
        };
        if (ih, iw) != mask.shape() {
            return Err(MetricError::ShapeMismatch((ih, iw), mask.shape()));
        }

        let ((top, left), (bottom, right)) = crate::mask::crop_bounds(mask)?;
        let mut data = Array2::<u8>::zeros((bottom - top + 1, right - left + 1));
        for h in top..=bottom {
            for w in left..=right {
                if mask.is_set((h, w)) {
                    data[(h - top, w - left)] = image[(h, w)];
                }
            }
        }
        Ok(Self {
            data,
            origin: (top, left),
        })
    }

    /// 由既有矩阵直接构造, 偏移记为 `(0, 0)`. 主要供测试使用.
    pub fn from_raw(data: Array2<u8>) -> Result<Self, MetricError> {
        if data.iter().all(|&v| v == 0) {
            return Err(MetricError::EmptyRegion);
        }
        Ok(Self {
            data,
            origin: (0, 0),
        })
    }

    /// 获得 **底层** 数据的一份不可变 shallow copy.
    #[inline]
    pub fn array_view(&self) -> ArrayView2<u8> {
        self.data.view()
    }

    /// 裁剪块在原图中的左上角偏移.
    #[inline]
    pub fn origin(&self) -> Idx2d {
        self.origin
    }

    /// 获取给定位置的灰度值. 越界时返回 `None`.
    #[inline]
    pub fn get(&self, pos: Idx2d) -> Option<&u8> {
        self.data.get(pos)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::array;

    /// 测试标签选取与空掩码错误.
    #[test]
    fn test_cell_mask_selection() {
        let seg = SegmentGrid::new(array![[0, 1, 1], [0, 2, 1], [0, 0, 0]]);
        let mask = seg.cell_mask(1).unwrap();
        assert_eq!(mask.area(), 3);
        assert!(mask.is_set((0, 1)));
        assert!(!mask.is_set((1, 1)));

        assert_eq!(seg.cell_mask(7).unwrap_err(), MetricError::EmptyRegion);
        assert_eq!(seg.labels(), vec![1, 2]);
        assert_eq!(seg.max_label(), 2);
    }

    /// 测试裁剪块的偏移与掩码相乘语义.
    #[test]
    fn test_patch_from_mask() {
        let seg = SegmentGrid::new(array![[0, 0, 0, 0], [0, 3, 3, 0], [0, 0, 3, 0]]);
        let image = array![[9, 9, 9, 9], [9, 10, 20, 9], [9, 9, 30, 9]];
        let mask = seg.cell_mask(3).unwrap();
        let patch = Patch::from_mask(image.view(), &mask).unwrap();

        assert_eq!(patch.shape(), (2, 2));
        assert_eq!(patch.origin(), (1, 1));
        assert_eq!(patch[(0, 0)], 10);
        assert_eq!(patch[(0, 1)], 20);
        assert_eq!(patch[(1, 0)], 0); // 掩码外像素置零
        assert_eq!(patch[(1, 1)], 30);
    }

    /// 测试越界索引视为背景的约定.
    #[test]
    fn test_bitmap_out_of_bounds() {
        let mask = CellMask::new(array![[1u8]]).unwrap();
        assert!(mask.is_set((0, 0)));
        assert!(!mask.is_set((0, 1)));
        assert!(mask.has_background_n4((0, 0)));
        assert_eq!(mask.n4_count((0, 0)), 0);
    }
}
