//! 标量序列的描述统计.
//!
//! 方差与标准差一律取总体口径 (除以 n), 分位数采用线性插值.

/// 均值. 空切片返回 0.0.
pub fn mean(xs: &[f64]) -> f64 {
    if xs.is_empty() {
        return 0.0;
    }
    xs.iter().sum::<f64>() / xs.len() as f64
}

/// 总体方差 (除以 n). 空切片返回 0.0.
pub fn variance(xs: &[f64]) -> f64 {
    if xs.is_empty() {
        return 0.0;
    }
    let m = mean(xs);
    xs.iter().map(|&x| (x - m) * (x - m)).sum::<f64>() / xs.len() as f64
}

/// 总体标准差.
#[inline]
pub fn std(xs: &[f64]) -> f64 {
    variance(xs).sqrt()
}

/// 线性插值分位数, `q` 取 [0, 100]. 空切片返回 0.0.
pub fn percentile(xs: &[f64], q: f64) -> f64 {
    if xs.is_empty() {
        return 0.0;
    }
    let mut sorted = xs.to_vec();
    sorted.sort_by(f64::total_cmp);
    let rank = q / 100.0 * (sorted.len() - 1) as f64;
    let lo = rank.floor() as usize;
    let hi = rank.ceil() as usize;
    if lo == hi {
        sorted[lo]
    } else {
        let frac = rank - lo as f64;
        sorted[lo] * (1.0 - frac) + sorted[hi] * frac
    }
}

/// 中位数.
#[inline]
pub fn median(xs: &[f64]) -> f64 {
    percentile(xs, 50.0)
}

/// Pearson 相关系数. 任一侧方差为零或长度不一致时返回 `None`.
pub fn pearson(xs: &[f64], ys: &[f64]) -> Option<f64> {
    if xs.len() != ys.len() || xs.len() < 2 {
        return None;
    }
    let (mx, my) = (mean(xs), mean(ys));
    let mut cov = 0.0;
    let mut vx = 0.0;
    let mut vy = 0.0;
    for (&x, &y) in xs.iter().zip(ys) {
        cov += (x - mx) * (y - my);
        vx += (x - mx) * (x - mx);
        vy += (y - my) * (y - my);
    }
    if vx == 0.0 || vy == 0.0 {
        return None;
    }
    Some(cov / (vx * vy).sqrt())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn float_eq(a: f64, b: f64) -> bool {
        (a - b).abs() < 1e-9
    }

    #[test]
    fn test_basic_moments() {
        let xs = [1.0, 2.0, 3.0, 4.0];
        assert!(float_eq(mean(&xs), 2.5));
        assert!(float_eq(variance(&xs), 1.25));
        assert!(float_eq(std(&xs), 1.25f64.sqrt()));
    }

    /// 分位数与 numpy 的线性插值口径对齐.
    #[test]
    fn test_percentile_interpolation() {
        let xs = [1.0, 2.0, 3.0, 4.0];
        assert!(float_eq(percentile(&xs, 0.0), 1.0));
        assert!(float_eq(percentile(&xs, 25.0), 1.75));
        assert!(float_eq(percentile(&xs, 50.0), 2.5));
        assert!(float_eq(percentile(&xs, 100.0), 4.0));
        assert!(float_eq(median(&[3.0, 1.0, 2.0]), 2.0));
    }

    #[test]
    fn test_pearson() {
        let xs = [1.0, 2.0, 3.0];
        let ys = [2.0, 4.0, 6.0];
        assert!(float_eq(pearson(&xs, &ys).unwrap(), 1.0));
        assert!(float_eq(pearson(&xs, &[6.0, 4.0, 2.0]).unwrap(), -1.0));

        // 常数序列没有定义相关系数.
        assert!(pearson(&xs, &[5.0, 5.0, 5.0]).is_none());
    }
}
