//! 通用常量: 标签约定与特征目录.

use once_cell::sync::Lazy;

/// 分割网格中背景的标签值.
pub const BACKGROUND: u32 = 0;

/// 掩码中属于细胞的像素值.
pub const FOREGROUND: u8 = 1;

/// 特征名常量. 与持久化 JSON 中的键一一对应.
pub mod key {
    /// 顺时针遍历周长.
    pub const PERIMETER: &str = "Perimeter";
    /// 像素面积.
    pub const AREA: &str = "Area";
    /// 凸包面积.
    pub const CONVEX_HULL_AREA: &str = "Convex Hull Area";
    /// 凸包周长.
    pub const CONVEX_HULL_PERIMETER: &str = "Convex Hull Perimeter";
    /// 内切圆半径 (incenter 到边界最近距离).
    pub const MIN_BOUNDING_RADIUS: &str = "Min Bounding Radius";
    /// 外接圆半径 (incenter 到边界最远距离).
    pub const MAX_BOUNDING_RADIUS: &str = "Max Bounding Radius";
    /// 邻接细胞个数.
    pub const SURROUNDING_CELLS: &str = "Number of Surrounding Cells";
    /// 尖刺度 P/A.
    pub const SPIKINESS: &str = "Spikiness";
    /// 伸长率 I/L.
    pub const ELONGATION: &str = "Elongation";
    /// 紧凑度 P²/A.
    pub const COMPACTNESS_1: &str = "Compactness (1)";
    /// 紧凑度: 到中心均方距离 / A².
    pub const COMPACTNESS_2: &str = "Compactness (2)";
    /// 圆度 4πA/P².
    pub const CIRCULARITY_1: &str = "Circularity (1)";
    /// 圆度 4πA/Pc².
    pub const CIRCULARITY_2: &str = "Circularity (2)";
    /// 圆度 P²/A.
    pub const CIRCULARITY_3: &str = "Circularity (3)";
    /// 圆度 mean(r̂)/std(r̂).
    pub const CIRCULARITY_4: &str = "Circularity (4)";
    /// 凸度 A/Ac.
    pub const CONVEXITY_1: &str = "Convexity (1)";
    /// 凸度 Pc/P.
    pub const CONVEXITY_2: &str = "Convexity (2)";
    /// 粗糙度 P/Pc.
    pub const ROUGHNESS_1: &str = "Roughness (1)";
    /// 粗糙度: 角向分段 |Δr̂| 均值.
    pub const ROUGHNESS_2: &str = "Roughness (2)";
    /// 粗糙度: 多点角占比.
    pub const ROUGHNESS_3: &str = "Roughness (3)";
    /// 归一化径向距离均值.
    pub const MEAN_RADIAL_DISTANCE: &str = "Mean Radial Distance";
    /// 径向距离穿越均值次数.
    pub const MEAN_RADIAL_CROSSINGS: &str = "Mean Radial Distance Crossings";
    /// 归一化径向距离标准差.
    pub const STD_RADIAL_DISTANCE: &str = "STD Radial Distance";
    /// 归一化径向距离熵 (100 bin).
    pub const RADIAL_ENTROPY: &str = "Entropy of Radial Distance";
    /// 掩码内灰度均值.
    pub const MEAN_INTENSITY: &str = "Mean Intensity";
    /// 掩码内灰度标准差.
    pub const STD_INTENSITY: &str = "STD_Intensity";
    /// 掩码内灰度最大值.
    pub const MAX_INTENSITY: &str = "Max Intensity";
    /// 掩码内灰度最小值.
    pub const MIN_INTENSITY: &str = "Min Intensity";
    /// 掩码内灰度范围.
    pub const INTENSITY_RANGE: &str = "Intensity Range";
    /// 逐层剥离梯度指标.
    pub const INTENSITY_GRADIENT: &str = "Intensity Gradient Metric";
}

/// Haralick 纹理特征方向个数.
pub const HARALICK_DIRECTIONS: usize = 4;

/// 每个方向的 Haralick 特征个数.
pub const HARALICK_FEATURES: usize = 14;

/// Haralick 特征的规范名称, 按照特征序号排列.
pub const HARALICK_FEATURE_NAMES: [&str; HARALICK_FEATURES] = [
    "Angular Second Moment",
    "Contrast",
    "Correlation",
    "Sum of Squares: Variance",
    "Inverse Difference Moment",
    "Sum Average",
    "Sum Variance",
    "Sum Entropy",
    "Entropy",
    "Difference Variance",
    "Difference Entropy",
    "Information Measure Correlation 1",
    "Information Measure Correlation 2",
    "Maximal Correlation Coefficient",
];

/// 形状与灰度特征目录 (不含 Haralick 展开项), 按固定求值顺序排列.
pub const SHAPE_KEYS: [&str; 30] = [
    key::PERIMETER,
    key::AREA,
    key::CONVEX_HULL_AREA,
    key::CONVEX_HULL_PERIMETER,
    key::MIN_BOUNDING_RADIUS,
    key::MAX_BOUNDING_RADIUS,
    key::SURROUNDING_CELLS,
    key::SPIKINESS,
    key::ELONGATION,
    key::COMPACTNESS_1,
    key::COMPACTNESS_2,
    key::CIRCULARITY_1,
    key::CIRCULARITY_2,
    key::CIRCULARITY_3,
    key::CIRCULARITY_4,
    key::CONVEXITY_1,
    key::CONVEXITY_2,
    key::ROUGHNESS_1,
    key::ROUGHNESS_2,
    key::ROUGHNESS_3,
    key::MEAN_RADIAL_DISTANCE,
    key::MEAN_RADIAL_CROSSINGS,
    key::STD_RADIAL_DISTANCE,
    key::RADIAL_ENTROPY,
    key::MEAN_INTENSITY,
    key::STD_INTENSITY,
    key::MAX_INTENSITY,
    key::MIN_INTENSITY,
    key::INTENSITY_RANGE,
    key::INTENSITY_GRADIENT,
];

/// 完整特征目录: 形状/灰度特征 + Haralick 按方向展开 + Haralick 均值.
pub static METRIC_CATALOG: Lazy<Vec<String>> = Lazy::new(|| {
    let mut names: Vec<String> = SHAPE_KEYS.iter().map(|s| s.to_string()).collect();
    for dir in 1..=HARALICK_DIRECTIONS {
        for feat in HARALICK_FEATURE_NAMES.iter() {
            names.push(format!("Haralick - {feat} (Direction {dir})"));
        }
    }
    for feat in HARALICK_FEATURE_NAMES.iter() {
        names.push(format!("Haralick - {feat} (Mean)"));
    }
    names
});
