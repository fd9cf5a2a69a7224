#![warn(missing_docs)] // <= 合适时移除它.

//! 核心库. 面向时间序列显微图像, 提供单细胞分割掩码的形态学/纹理/灰度
//! 特征提取, 以及跨图像的统计归约 (归一化, 排名, 离群检测, PCA 降维).
//!
//! 该 crate 只做纯计算: 输入为对齐的灰度图与分割标签网格, 输出为
//! 可序列化的特征向量与统计结果. 图像解码, 文件布局与 HTTP 服务
//! 均由外部协作者负责.
//!
//! # 注意
//!
//! 1. 掩码假定为单连通. 多连通或分叉掩码下, 边界遍历采用启发式回溯,
//!    其覆盖完整性通过 [`BorderTrace::complete`] 显式上报, 不做静默截断.
//! 2. 在非期望情况下, 程序返回 `Err` 而不是 panic; 单个细胞的失败不会
//!    影响整张图像的数据集.
//!
//! # 功能总览
//!
//! ### 掩码基元 ✅
//!
//! 边界提取, 最小外接裁剪, 4-邻居计数. 实现位于 `cell-berry/src/mask.rs`.
//!
//! ### 中心估计与顺时针边界遍历 ✅
//!
//! 四种互为备选的中心启发式 (incenter, 逐层剥离, 最小方差, 计数平衡),
//! 以及带有限回溯 (窗口 20) 的顺时针边界遍历.
//! 实现位于 `cell-berry/src/trace.rs`.
//!
//! ### 凸几何 ✅
//!
//! Andrew 单调链凸包, 鞋带公式面积, 旋转卡壳最小外接矩形 (按面积与
//! 按周长分别记录). 实现位于 `cell-berry/src/hull.rs`.
//!
//! ### 长短轴与偏心率 ✅
//!
//! 离散 Laplacian 稀疏边缘 + 全对搜索求长轴; 短轴射线步进为实验性功能.
//! 实现位于 `cell-berry/src/axis.rs`.
//!
//! ### 形状描述子族 ✅
//!
//! 两种周长, 伸长率, 两种紧凑度, 四种圆度, 两种凸度, 三种粗糙度,
//! 径向距离统计与熵, 尖刺度. 实现位于 `cell-berry/src/shape.rs`.
//!
//! ### 灰度与纹理 ✅
//!
//! 掩码内灰度统计, 逐像素梯度, 逐层剥离梯度; Haralick 纹理特征
//! 通过 [`TextureSource`] 能力接口注入. 实现位于
//! `cell-berry/src/{intensity, texture}.rs`.
//!
//! ### 单图编排与跨图统计 ✅
//!
//! 按固定顺序为每个细胞组装特征向量, 过滤退化细胞, 计算图像均值向量;
//! 跨图像归一化/排名/离群检测/描述统计导出/PCA.
//! 实现位于 `cell-berry/src/{extract, track}.rs`.

/// 二维索引, 同时也可一定程度上用作非负整数向量.
pub type Idx2d = (usize, usize);

/// 高精度通用索引 / 向量.
pub type Idx2dF = (f64, f64);

type Area2d = Vec<Idx2d>;

pub mod consts;

mod error;
pub use error::MetricError;

mod grid;
pub use grid::{Bitmap, CellMask, Patch, SegmentGrid};

pub mod mask;

mod trace;
pub use trace::{
    balance_center, best_center, clockwise_trace, incenter, peel_center, BorderTrace,
};

pub mod hull;
pub use hull::{convex_hull, min_bounding_box, BoundingBox, ConvexHull, MinBoundingBoxes};

pub mod axis;
pub use axis::EccentricityFormula;

pub mod shape;
pub mod intensity;

mod texture;
pub use texture::{flatten_haralick, HaralickMatrix, NoTexture, TextureSource};

mod linalg;
pub use linalg::{DenseEigh, EighSolver};

mod extract;
pub use extract::{cell_metrics, extract_image, CellRecord, ImageDataset, Metrics};

pub mod track;

mod stats;

pub mod prelude;
