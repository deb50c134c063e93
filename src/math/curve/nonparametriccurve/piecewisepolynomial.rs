use nalgebra::{
    DMatrix,
    DVector
};
use serde::Deserialize;

use crate::math::curve::curve::Curve;
use crate::math::curve::nonparametriccurve::nonparametriccurve::{
    NonparametricCurve,
    Point2D
};
use crate::readererror::{
    ReaderError,
    Result
};

// ─────────────────────────────────────────────
// Subpolynomial
// ─────────────────────────────────────────────

#[derive(Debug, Clone)]
struct Subpolynomial {
    coefs: Vec<f64>,
    deriv_coefs: Vec<f64>,
    lhs_x: f64,
}

impl Subpolynomial {
    pub fn new(coefs: Vec<f64>, lhs_x: f64) -> Subpolynomial {
        let deriv_coefs = Self::compute_deriv_coefs(&coefs);
        Subpolynomial { coefs, deriv_coefs, lhs_x }
    }

    fn compute_deriv_coefs(coefs: &[f64]) -> Vec<f64> {
        let order = coefs.len() - 1;
        if order == 0 {
            vec![0.0]
        } else {
            (0..order)
                .map(|i| (order - i) as f64 * coefs[i])
                .collect()
        }
    }

    pub fn value(&self, x: f64) -> f64 {
        self.evaluate(&self.coefs, x)
    }

    pub fn derivative(&self, x: f64) -> f64 {
        self.evaluate(&self.deriv_coefs, x)
    }

    /// 導函數的實根（即極值點），以 x 表示，未排序。
    fn critical_points(&self) -> Vec<f64> {
        let roots = match self.deriv_coefs.as_slice() {
            [p, q, r] => quadratic_roots(*p, *q, *r),
            [q, r] if *q != 0.0 => vec![-r / q],
            _ => Vec::new(),
        };
        roots.into_iter().map(|d| self.lhs_x + d).collect()
    }

    fn evaluate(&self, coefs: &[f64], x: f64) -> f64 {
        let x_diff = x - self.lhs_x;
        let mut result = coefs[0];
        for &beta in &coefs[1..] {
            result = f64::mul_add(result, x_diff, beta);
        }
        result
    }
}

/// p*d^2 + q*d + r = 0 的實根
fn quadratic_roots(p: f64, q: f64, r: f64) -> Vec<f64> {
    if p == 0.0 {
        return if q != 0.0 { vec![-r / q] } else { Vec::new() };
    }
    let disc = q * q - 4.0 * p * r;
    if disc < 0.0 {
        return Vec::new();
    }
    // 避免相減抵銷
    let k = -0.5 * (q + q.signum() * disc.sqrt());
    if k == 0.0 {
        return vec![0.0];
    }
    vec![k / p, r / k]
}

// ─────────────────────────────────────────────
// Linear
// ─────────────────────────────────────────────

fn generate_linear_coef_list(points: &[Point2D]) -> Vec<Vec<f64>> {
    (0..(points.len() - 1))
        .map(|i| vec![
            Point2D::slope(&points[i], &points[i + 1]),
            points[i].y(),
        ])
        .collect()
}

// ─────────────────────────────────────────────
// 共用輔助函數
// ─────────────────────────────────────────────

/// 從各節點的二階導數（moments）m[0..=n] 計算各區間的三次多項式係數。
///
/// 每段多項式以 Horner 形式存成 [d, c, b, a]，對應：
///   S_i(x) = a + b*(x-x_i) + c*(x-x_i)^2 + d*(x-x_i)^3
fn cubic_coefs_from_moments(points: &[Point2D], h: &[f64], m: &[f64]) -> Vec<Vec<f64>> {
    (0..h.len())
        .map(|i| {
            let d = (m[i + 1] - m[i]) / (6.0 * h[i]);
            let c = m[i] / 2.0;
            let b = (points[i + 1].y() - points[i].y()) / h[i]
                  - h[i] * (2.0 * m[i] + m[i + 1]) / 6.0;
            let a = points[i].y();
            vec![d, c, b, a]
        })
        .collect()
}

fn interval_widths(points: &[Point2D]) -> Vec<f64> {
    points.windows(2).map(|w| w[1].x() - w[0].x()).collect()
}

// ─────────────────────────────────────────────
// CubicSpline（Natural / NotAKnot）
// ─────────────────────────────────────────────
//
// 建立 (n+1)×(n+1) 的聯立方程組，求解各節點的二階導數 m[0..=n]，
// 內部方程式由 C² 連續性導出：
//   h[i-1]*m[i-1] + 2*(h[i-1]+h[i])*m[i] + h[i]*m[i+1]
//     = 6*( (y[i+1]-y[i])/h[i] - (y[i]-y[i-1])/h[i-1] )
// 第 0 列與第 n 列依邊界條件設定。

fn build_interior_system(points: &[Point2D], h: &[f64]) -> (DMatrix<f64>, DVector<f64>) {
    let n = h.len();
    let mut mat = DMatrix::<f64>::zeros(n + 1, n + 1);
    let mut rhs = DVector::<f64>::zeros(n + 1);

    for i in 1..n {
        mat[(i, i - 1)] = h[i - 1];
        mat[(i, i)]     = 2.0 * (h[i - 1] + h[i]);
        mat[(i, i + 1)] = h[i];
        rhs[i] = 6.0 * (
            (points[i + 1].y() - points[i].y()) / h[i]
          - (points[i].y()     - points[i - 1].y()) / h[i - 1]
        );
    }
    (mat, rhs)
}

fn solve_moments(mat: DMatrix<f64>, rhs: DVector<f64>, label: &str) -> Result<Vec<f64>> {
    mat.lu()
        .solve(&rhs)
        .map(|m| m.iter().copied().collect())
        .ok_or_else(|| ReaderError::invalid_input(format!("{}: singular spline system", label)))
}

/// Natural：端點的二階導數為 0（m[0] = m[n] = 0）
fn generate_natural_cubic_coef_list(points: &[Point2D]) -> Result<Vec<Vec<f64>>> {
    let h = interval_widths(points);
    let n = h.len();

    let (mut mat, rhs) = build_interior_system(points, &h);
    mat[(0, 0)] = 1.0;   // m[0] = 0
    mat[(n, n)] = 1.0;   // m[n] = 0

    let m = solve_moments(mat, rhs, "NaturalCubic")?;
    Ok(cubic_coefs_from_moments(points, &h, &m))
}

/// Not-a-knot：第三導數在 x[1] 與 x[n-1] 處連續，
/// 等價於相鄰兩段的三次係數相等：
///
///   在 x[1]：(m[1]-m[0])/h[0] = (m[2]-m[1])/h[1]
///     → -h[1]*m[0] + (h[0]+h[1])*m[1] - h[0]*m[2] = 0
///   在 x[n-1]：(m[n-1]-m[n-2])/h[n-2] = (m[n]-m[n-1])/h[n-1]
///     → -h[n-1]*m[n-2] + (h[n-2]+h[n-1])*m[n-1] - h[n-2]*m[n] = 0
///
/// 這正是 FITPACK 三次插值樣條（內部節點去掉 x[1] 與 x[n-1]）的解。
/// 點數不足時退化：3 點為唯一的插值拋物線，2 點為直線。
fn generate_not_a_knot_cubic_coef_list(points: &[Point2D]) -> Result<Vec<Vec<f64>>> {
    let h = interval_widths(points);
    let n = h.len();

    let m = match n {
        1 => vec![0.0, 0.0],
        2 => {
            // 拋物線的二階導數為常數 2*f[x0,x1,x2]
            let s0 = (points[1].y() - points[0].y()) / h[0];
            let s1 = (points[2].y() - points[1].y()) / h[1];
            let second = 2.0 * (s1 - s0) / (h[0] + h[1]);
            vec![second; 3]
        }
        _ => {
            let (mut mat, rhs) = build_interior_system(points, &h);

            mat[(0, 0)] =  -h[1];
            mat[(0, 1)] =   h[0] + h[1];
            mat[(0, 2)] =  -h[0];

            mat[(n, n - 2)] = -h[n - 1];
            mat[(n, n - 1)] =  h[n - 2] + h[n - 1];
            mat[(n, n)]     = -h[n - 2];

            solve_moments(mat, rhs, "NotAKnotCubic")?
        }
    };
    Ok(cubic_coefs_from_moments(points, &h, &m))
}

// ─────────────────────────────────────────────
// PolynomialType
// ─────────────────────────────────────────────

#[derive(Debug, PartialEq, Eq, Clone, Copy, Default, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PolynomialType {
    Linear,
    NaturalCubic,
    /// 與 scipy `InterpolatedUnivariateSpline(k=3)` 相同的插值樣條
    #[default]
    NotAKnotCubic,
}

// ─────────────────────────────────────────────
// PiecewisePolynomial
// ─────────────────────────────────────────────

/// 通過每個節點的分段多項式插值。
///
/// # 外插
/// 定義域 [min_x, max_x] 之外沿用最左／最右段的多項式（scipy 的 `ext=0`），
/// 不做截斷也不回傳錯誤。
#[derive(Debug, Clone)]
pub struct PiecewisePolynomial {
    max_x: f64,
    max_y: f64,
    polynomial_type: PolynomialType,
    subpolynomial_list: Vec<Subpolynomial>,
}

impl PiecewisePolynomial {
    pub fn new(
        polynomial_type: PolynomialType,
        points: Vec<Point2D>,
    ) -> Result<PiecewisePolynomial> {
        if points.len() < 2 {
            return Err(ReaderError::invalid_input(format!(
                "interpolation needs at least 2 points, got {}",
                points.len()
            )));
        }
        if points.iter().any(|pt| !pt.x().is_finite()) {
            return Err(ReaderError::invalid_input("interpolation nodes must be finite"));
        }
        if points.windows(2).any(|w| w[1].x() <= w[0].x()) {
            return Err(ReaderError::invalid_input(
                "interpolation nodes must be strictly increasing",
            ));
        }

        let coef_list = match polynomial_type {
            PolynomialType::Linear        => generate_linear_coef_list(&points),
            PolynomialType::NaturalCubic  => generate_natural_cubic_coef_list(&points)?,
            PolynomialType::NotAKnotCubic => generate_not_a_knot_cubic_coef_list(&points)?,
        };

        let subpolynomial_list = coef_list
            .into_iter()
            .zip(points.iter())
            .map(|(coefs, pt)| Subpolynomial::new(coefs, pt.x()))
            .collect();

        let last = points[points.len() - 1];
        Ok(PiecewisePolynomial {
            subpolynomial_list,
            max_x: last.x(),
            max_y: last.y(),
            polynomial_type,
        })
    }

    pub fn polynomial_type(&self) -> PolynomialType {
        self.polynomial_type
    }

    /// 把 [lo, hi] 切成曲線在其上單調的小區間，回傳排序後的切點
    /// （含 lo、hi、其間的節點與各段多項式的極值點）。
    pub fn monotone_breakpoints(&self, lo: f64, hi: f64) -> Vec<f64> {
        let last = self.subpolynomial_list.len() - 1;
        let mut breakpoints = vec![lo, hi];
        for (i, sub) in self.subpolynomial_list.iter().enumerate() {
            // 首段向左、末段向右延伸到外插區
            let start = if i == 0 { f64::NEG_INFINITY } else { sub.lhs_x };
            let end = if i == last { f64::INFINITY } else { self.subpolynomial_list[i + 1].lhs_x };
            if i > 0 && sub.lhs_x > lo && sub.lhs_x < hi {
                breakpoints.push(sub.lhs_x);
            }
            breakpoints.extend(
                sub.critical_points()
                    .into_iter()
                    .filter(|x| x.is_finite() && *x > start.max(lo) && *x < end.min(hi)),
            );
        }
        breakpoints.sort_by(f64::total_cmp);
        breakpoints.dedup();
        breakpoints
    }

    fn find_segment(&self, x: f64) -> usize {
        if x <= self.min_x() {
            0
        } else if x >= self.max_x {
            self.subpolynomial_list.len() - 1
        } else {
            self.subpolynomial_list
                .partition_point(|s| s.lhs_x <= x) - 1
        }
    }
}

// ─────────────────────────────────────────────
// Trait 實作
// ─────────────────────────────────────────────

impl NonparametricCurve for PiecewisePolynomial {
    fn points(&self) -> Vec<Point2D> {
        let mut pts: Vec<Point2D> = self
            .subpolynomial_list
            .iter()
            .map(|s| Point2D::new(s.lhs_x, s.coefs[s.coefs.len() - 1]))
            .collect();
        pts.push(Point2D::new(self.max_x, self.max_y));
        pts
    }

    fn min_x(&self) -> f64 {
        self.subpolynomial_list[0].lhs_x
    }

    fn max_x(&self) -> f64 {
        self.max_x
    }
}

impl Curve for PiecewisePolynomial {
    fn value(&self, x: f64) -> f64 {
        // 右端點直接回傳節點值，避免最後一段的捨入誤差
        if x == self.max_x {
            return self.max_y;
        }
        let i = self.find_segment(x);
        self.subpolynomial_list[i].value(x)
    }

    fn derivative(&self, x: f64) -> f64 {
        let i = self.find_segment(x);
        self.subpolynomial_list[i].derivative(x)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn points_of(xs: &[f64], f: impl Fn(f64) -> f64) -> Vec<Point2D> {
        xs.iter().map(|&x| Point2D::new(x, f(x))).collect()
    }

    #[test]
    fn not_a_knot_passes_through_nodes() {
        let xs = [0.0, 0.5, 1.5, 2.0, 3.5, 4.0];
        let ys = [1.0, -0.5, 2.0, 0.25, 3.0, 1.0];
        let pts: Vec<Point2D> = xs.iter().zip(ys.iter()).map(|(&x, &y)| Point2D::new(x, y)).collect();
        let spline = PiecewisePolynomial::new(PolynomialType::NotAKnotCubic, pts).unwrap();
        for (&x, &y) in xs.iter().zip(ys.iter()) {
            let v = spline.value(x);
            assert!((v - y).abs() < 1e-12, "at x={x}: expected {y}, got {v}");
        }
    }

    #[test]
    fn not_a_knot_reproduces_cubic_including_extrapolation() {
        let f = |x: f64| x * x * x - 2.0 * x + 1.0;
        let df = |x: f64| 3.0 * x * x - 2.0;
        let pts = points_of(&[0.0, 1.0, 2.5, 3.0, 4.0], f);
        let spline = PiecewisePolynomial::new(PolynomialType::NotAKnotCubic, pts).unwrap();
        for &x in &[0.3, 1.7, 2.9, 3.6, -1.0, 5.0] {
            assert!((spline.value(x) - f(x)).abs() < 1e-9, "value at x={x}");
            assert!((spline.derivative(x) - df(x)).abs() < 1e-9, "derivative at x={x}");
        }
    }

    #[test]
    fn not_a_knot_with_three_points_is_parabola() {
        let f = |x: f64| 2.0 * x * x - x + 3.0;
        let pts = points_of(&[0.0, 1.0, 3.0], f);
        let spline = PiecewisePolynomial::new(PolynomialType::NotAKnotCubic, pts).unwrap();
        for &x in &[0.5, 2.0, 4.0, -2.0] {
            assert!((spline.value(x) - f(x)).abs() < 1e-12, "at x={x}");
        }
    }

    #[test]
    fn two_points_degrade_to_line() {
        let pts = vec![Point2D::new(0.0, 1.0), Point2D::new(2.0, 5.0)];
        let spline = PiecewisePolynomial::new(PolynomialType::NotAKnotCubic, pts).unwrap();
        assert!((spline.value(1.0) - 3.0).abs() < 1e-12);
        assert!((spline.value(3.0) - 7.0).abs() < 1e-12);
        assert!((spline.derivative(0.5) - 2.0).abs() < 1e-12);
    }

    #[test]
    fn natural_cubic_has_zero_end_curvature() {
        let pts = points_of(&[0.0, 1.0, 2.0, 3.0], |x| (x * 1.3).sin());
        let spline = PiecewisePolynomial::new(PolynomialType::NaturalCubic, pts).unwrap();
        // 兩端點附近的斜率差分趨近 0 曲率
        let eps = 1e-6;
        let curvature = (spline.derivative(eps) - spline.derivative(0.0)) / eps;
        assert!(curvature.abs() < 1e-4);
    }

    #[test]
    fn linear_extrapolates_end_segments() {
        let pts = points_of(&[0.0, 1.0, 2.0], |x| if x < 1.5 { x } else { 0.0 });
        let spline = PiecewisePolynomial::new(PolynomialType::Linear, pts).unwrap();
        assert!((spline.value(-1.0) + 1.0).abs() < 1e-12);
        assert!((spline.value(3.0) + 1.0).abs() < 1e-12);
    }

    #[test]
    fn rejects_unsorted_or_short_input() {
        let pts = vec![Point2D::new(1.0, 0.0), Point2D::new(0.0, 1.0)];
        assert!(matches!(
            PiecewisePolynomial::new(PolynomialType::Linear, pts),
            Err(ReaderError::InvalidInput(_))
        ));
        let pts = vec![Point2D::new(1.0, 0.0)];
        assert!(PiecewisePolynomial::new(PolynomialType::NotAKnotCubic, pts).is_err());
    }

    #[test]
    fn monotone_breakpoints_include_interior_extremum() {
        let xs: Vec<f64> = (0..11).map(|i| i as f64 * 0.1).collect();
        let curve = PiecewisePolynomial::new(
            PolynomialType::NotAKnotCubic,
            points_of(&xs, |x| (3.0 * x).sin()),
        )
        .unwrap();
        let breakpoints = curve.monotone_breakpoints(-1.0, 2.0);
        assert_eq!(breakpoints[0], -1.0);
        assert_eq!(*breakpoints.last().unwrap(), 2.0);
        assert!(breakpoints.windows(2).all(|w| w[0] < w[1]));
        // sin(3x) 在 pi/6 有極大值
        let peak = breakpoints
            .iter()
            .copied()
            .find(|x| (x - std::f64::consts::PI / 6.0).abs() < 5e-3);
        assert!(peak.is_some());
        assert!(curve.derivative(peak.unwrap()).abs() < 1e-9);
        // 每個小區間內導數不變號
        for w in breakpoints.windows(2) {
            let slopes: Vec<f64> = [0.25, 0.5, 0.75]
                .iter()
                .map(|s| curve.derivative(w[0] + s * (w[1] - w[0])))
                .collect();
            assert!(slopes.windows(2).all(|d| d[0] * d[1] >= 0.0));
        }
    }

    #[test]
    fn quadratic_roots_handle_degenerate_leading_coefficient() {
        let mut roots = quadratic_roots(1.0, -3.0, 2.0);
        roots.sort_by(f64::total_cmp);
        assert_eq!(roots, vec![1.0, 2.0]);
        assert_eq!(quadratic_roots(0.0, 2.0, -1.0), vec![0.5]);
        assert!(quadratic_roots(1.0, 0.0, 1.0).is_empty());
        assert!(quadratic_roots(0.0, 0.0, 1.0).is_empty());
    }

    #[test]
    fn points_round_trip_nodes() {
        let pts = points_of(&[0.0, 1.0, 2.0, 4.0], |x| x * 0.5);
        let spline = PiecewisePolynomial::new(PolynomialType::NotAKnotCubic, pts.clone()).unwrap();
        assert_eq!(spline.points(), pts);
        assert_eq!(spline.min_x(), 0.0);
        assert_eq!(spline.max_x(), 4.0);
    }
}
