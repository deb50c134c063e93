// ─────────────────────────────────────────────
// 序列統計輔助函數
// ─────────────────────────────────────────────

/// 中位數；偶數個元素時取中間兩者的平均（與 pandas 相同）。
///
/// 空序列回傳 `None`。
pub fn median(values: &[f64]) -> Option<f64> {
    if values.is_empty() {
        return None;
    }
    let mut sorted = values.to_vec();
    sorted.sort_by(|a, b| a.total_cmp(b));
    let mid = sorted.len() / 2;
    if sorted.len() % 2 == 0 {
        Some((sorted[mid - 1] + sorted[mid]) / 2.0)
    } else {
        Some(sorted[mid])
    }
}

/// 一維中位數濾波，邊界採 `reflect` 模式：
///
///   d c b a | a b c d | d c b a
///
/// 視窗以 `i - size/2` 為起點，`size == 1` 時為恆等映射。
pub fn median_filter(values: &[f64], size: usize) -> Vec<f64> {
    let n = values.len();
    if size <= 1 || n == 0 {
        return values.to_vec();
    }
    let half = (size / 2) as isize;
    let mut window = Vec::with_capacity(size);
    (0..n)
        .map(|i| {
            window.clear();
            for k in 0..size as isize {
                let j = reflect_index(i as isize - half + k, n);
                window.push(values[j]);
            }
            median(&window).unwrap_or(f64::NAN)
        })
        .collect()
}

fn reflect_index(mut j: isize, n: usize) -> usize {
    let n = n as isize;
    let period = 2 * n;
    j = j.rem_euclid(period);
    if j >= n {
        j = period - 1 - j;
    }
    j as usize
}

/// Min-max 正規化到 [0, 1]，NaN 不參與極值計算。
///
/// 常數序列（max == min）全部映射到 0。
pub fn min_max_normalize(values: &[f64]) -> Vec<f64> {
    let (min, max) = values
        .iter()
        .filter(|v| !v.is_nan())
        .fold((f64::INFINITY, f64::NEG_INFINITY), |(lo, hi), &v| (lo.min(v), hi.max(v)));
    let range = max - min;
    values
        .iter()
        .map(|&v| {
            if v.is_nan() {
                f64::NAN
            } else if range > 0.0 && range.is_finite() {
                (v - min) / range
            } else {
                0.0
            }
        })
        .collect()
}

/// 一階差分的絕對值，第 0 個元素固定為 NaN。
pub fn abs_diff(values: &[f64]) -> Vec<f64> {
    std::iter::once(f64::NAN)
        .chain(values.windows(2).map(|w| (w[1] - w[0]).abs()))
        .take(values.len())
        .collect()
}

/// NaN 或大於絕對容差時視為「不接近 0」。
pub fn not_close_to_zero(value: f64, tolerance: f64) -> bool {
    value.is_nan() || value > tolerance
}
