//! 贝塞尔曲线
//!
//! 用作步态曲线（贴地系数、抬腿偏移）的一种来源

use glam::Vec2;

/// 一维曲线查找
///
/// 输入通常为 [0, 1) 的步态相位。
pub trait Curve {
    fn value(&self, v: f32) -> f32;
}

impl<F> Curve for F
where
    F: Fn(f32) -> f32,
{
    #[inline]
    fn value(&self, v: f32) -> f32 {
        self(v)
    }
}

/// 三次贝塞尔曲线（端点固定为 (0,0) 与 (1,1)）
#[derive(Debug, Clone, PartialEq)]
pub struct BezierCurve {
    /// 预计算的曲线采样点
    points: Vec<Vec2>,
}

impl BezierCurve {
    const P0: Vec2 = Vec2::ZERO;
    const P1: Vec2 = Vec2::ONE;

    /// 创建新的贝塞尔曲线
    ///
    /// # 参数
    /// - `c0`: 控制点1 (归一化到 0-1 范围)
    /// - `c1`: 控制点2 (归一化到 0-1 范围)
    /// - `interval`: 采样间隔数
    pub fn new(c0: Vec2, c1: Vec2, interval: u32) -> Self {
        let interval = interval.max(1);
        let mut points = Vec::with_capacity((interval + 1) as usize);
        let interval_f = interval as f32;

        for i in 0..=interval {
            let t = i as f32 / interval_f;
            let it = 1.0 - t;
            // 三次贝塞尔曲线公式: B(t) = (1-t)³P₀ + 3(1-t)²tP₁ + 3(1-t)t²P₂ + t³P₃
            let point = Self::P0 * it.powi(3)
                + c0 * 3.0 * it.powi(2) * t
                + c1 * 3.0 * it * t.powi(2)
                + Self::P1 * t.powi(3);
            points.push(point);
        }

        // 按 X 排序以便查找
        points.sort_unstable_by(|a, b| a.x.total_cmp(&b.x));

        Self { points }
    }
}

impl Curve for BezierCurve {
    /// 使用预计算的采样点进行线性插值查找
    fn value(&self, v: f32) -> f32 {
        let mut n = (self.points[0], self.points[1]);
        for point in &self.points[2..] {
            if n.1.x > v {
                break;
            }
            n = (n.1, *point);
        }
        if n.0.x == n.1.x {
            n.0.y
        } else {
            n.0.y + (v - n.0.x) * (n.1.y - n.0.y) / (n.1.x - n.0.x)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_linear_curve() {
        let curve = BezierCurve::new(Vec2::new(0.25, 0.25), Vec2::new(0.75, 0.75), 100);

        // 线性曲线应该近似 y = x
        assert!((curve.value(0.0) - 0.0).abs() < 0.01);
        assert!((curve.value(0.5) - 0.5).abs() < 0.05);
        assert!((curve.value(1.0) - 1.0).abs() < 0.01);
    }

    #[test]
    fn test_ease_in_curve() {
        let curve = BezierCurve::new(Vec2::new(0.42, 0.0), Vec2::new(1.0, 1.0), 100);

        // Ease-in 在开始时较慢
        assert!(curve.value(0.25) < 0.25);
    }

    #[test]
    fn test_closure_curve() {
        let half = |v: f32| v * 0.5;
        assert!((Curve::value(&half, 0.5) - 0.25).abs() < 1e-6);
    }
}
