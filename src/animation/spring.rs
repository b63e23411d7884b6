//! 弹簧插值器 - 二阶阻尼弹簧，RK4 积分
//!
//! 加速度 a = k·(target − x) − c·v，其中 c = 2·√k·ζ（临界阻尼公式，质量为 1）。
//! ζ < 1 欠阻尼（会有过冲），ζ = 1 临界阻尼（单调逼近）。

use glam::Vec3;

/// 单个积分子步的最大时长（刚度较高时还会更短）
const MAX_SUBSTEP: f32 = 1.0 / 60.0;

/// 单次更新最多子步数（超出部分的时间被丢弃）
const MAX_SUBSTEPS: u32 = 64;

/// 运动判定阈值
const MOTION_EPSILON: f32 = 1.0e-3;

/// 矢量弹簧插值器
#[derive(Clone, Debug)]
pub struct SpringInterpolator {
    position: Vec3,
    velocity: Vec3,
    stiffness: f32,
    damping_ratio: f32,
    initialized: bool,
    in_motion: bool,
}

impl Default for SpringInterpolator {
    fn default() -> Self {
        Self::new(0.9, 0.25)
    }
}

impl SpringInterpolator {
    pub fn new(stiffness: f32, damping_ratio: f32) -> Self {
        let mut spring = Self {
            position: Vec3::ZERO,
            velocity: Vec3::ZERO,
            stiffness: 0.0,
            damping_ratio: 0.0,
            initialized: false,
            in_motion: false,
        };
        spring.set_default_spring_constants(stiffness, damping_ratio);
        spring
    }

    /// 设置弹簧常数（负值按 0 处理）
    pub fn set_default_spring_constants(&mut self, stiffness: f32, damping_ratio: f32) {
        self.stiffness = stiffness.max(0.0);
        self.damping_ratio = damping_ratio.max(0.0);
    }

    /// 重置到给定位置，速度清零
    pub fn reset(&mut self, position: Vec3) {
        self.position = position;
        self.velocity = Vec3::ZERO;
        self.initialized = true;
        self.in_motion = false;
    }

    /// 清除状态，下一次 update 直接吸附到目标
    pub fn clear(&mut self) {
        self.position = Vec3::ZERO;
        self.velocity = Vec3::ZERO;
        self.initialized = false;
        self.in_motion = false;
    }

    #[inline]
    pub fn position(&self) -> Vec3 {
        self.position
    }

    #[inline]
    pub fn is_in_motion(&self) -> bool {
        self.in_motion
    }

    /// 朝目标推进 `delta_time` 秒，返回新位置
    ///
    /// 首次调用直接吸附到目标。`delta_time <= 0` 或输入非有限值时保持原位。
    pub fn update(&mut self, target: Vec3, delta_time: f32) -> Vec3 {
        if !target.is_finite() {
            return self.position;
        }
        if !self.initialized {
            self.reset(target);
            return self.position;
        }
        if delta_time <= 0.0 || !delta_time.is_finite() {
            self.refresh_motion(target);
            return self.position;
        }

        let omega = self.stiffness.sqrt();
        let damping = 2.0 * omega * self.damping_ratio;

        // 子步长受最快特征频率约束（ω·h ≤ 1），保证 RK4 稳定
        let zeta = self.damping_ratio;
        let fastest = omega * (zeta + (zeta * zeta - 1.0).max(0.0).sqrt()).max(1.0);
        let max_substep = if fastest > 0.0 {
            MAX_SUBSTEP.min(1.0 / fastest)
        } else {
            MAX_SUBSTEP
        };

        let steps = ((delta_time / max_substep).ceil() as u32).clamp(1, MAX_SUBSTEPS);
        let h = (delta_time / steps as f32).min(max_substep);

        for _ in 0..steps {
            self.integrate(target, damping, h);
        }

        self.refresh_motion(target);
        self.position
    }

    /// 一个 RK4 子步
    fn integrate(&mut self, target: Vec3, damping: f32, h: f32) {
        let k = self.stiffness;
        let accel = |x: Vec3, v: Vec3| k * (target - x) - damping * v;

        let x0 = self.position;
        let v0 = self.velocity;

        let k1_x = v0;
        let k1_v = accel(x0, v0);

        let k2_x = v0 + k1_v * (h * 0.5);
        let k2_v = accel(x0 + k1_x * (h * 0.5), k2_x);

        let k3_x = v0 + k2_v * (h * 0.5);
        let k3_v = accel(x0 + k2_x * (h * 0.5), k3_x);

        let k4_x = v0 + k3_v * h;
        let k4_v = accel(x0 + k3_x * h, k4_x);

        self.position = x0 + (k1_x + 2.0 * k2_x + 2.0 * k3_x + k4_x) * (h / 6.0);
        self.velocity = v0 + (k1_v + 2.0 * k2_v + 2.0 * k3_v + k4_v) * (h / 6.0);
    }

    fn refresh_motion(&mut self, target: Vec3) {
        let eps_sq = MOTION_EPSILON * MOTION_EPSILON;
        self.in_motion = self.velocity.length_squared() > eps_sq
            || (target - self.position).length_squared() > eps_sq;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_first_update_snaps() {
        let mut spring = SpringInterpolator::default();
        let p = spring.update(Vec3::new(1.0, 2.0, 3.0), 0.1);
        assert_eq!(p, Vec3::new(1.0, 2.0, 3.0));
        assert!(!spring.is_in_motion());
    }

    #[test]
    fn test_critically_damped_is_monotonic() {
        let mut spring = SpringInterpolator::new(0.9, 1.0);
        spring.reset(Vec3::ZERO);
        let target = Vec3::new(10.0, 0.0, 0.0);

        let mut last = 0.0;
        for _ in 0..500 {
            let p = spring.update(target, 0.1);
            assert!(p.x >= last - 1e-5);
            assert!(p.x <= target.x + 1e-4);
            last = p.x;
        }
        assert!((last - target.x).abs() < 0.01);
    }

    #[test]
    fn test_default_overshoot_is_bounded() {
        let mut spring = SpringInterpolator::default();
        spring.reset(Vec3::ZERO);
        let target = Vec3::new(0.0, 0.0, 10.0);

        let zeta: f32 = 0.25;
        let bound = (-std::f32::consts::PI * zeta / (1.0 - zeta * zeta).sqrt()).exp();

        let mut max_z: f32 = 0.0;
        for _ in 0..1000 {
            max_z = max_z.max(spring.update(target, 0.1).z);
        }
        assert!(max_z <= target.z * (1.0 + bound + 0.02));
        assert!((spring.position().z - target.z).abs() < 0.01);
        assert!(!spring.is_in_motion());
    }

    #[test]
    fn test_zero_delta_time_is_stable() {
        let mut spring = SpringInterpolator::default();
        spring.reset(Vec3::ZERO);
        let target = Vec3::new(5.0, 0.0, 0.0);

        assert_eq!(spring.update(target, 0.0), Vec3::ZERO);
        assert!(spring.is_in_motion());

        for _ in 0..1000 {
            let p = spring.update(target, 1.0e-7);
            assert!(p.is_finite());
            assert!(p.x.abs() < 1e-3);
        }
    }

    #[test]
    fn test_huge_delta_time_does_not_diverge() {
        let mut spring = SpringInterpolator::new(500.0, 0.25);
        spring.reset(Vec3::ZERO);
        let p = spring.update(Vec3::splat(1.0), 30.0);
        assert!(p.is_finite());
        assert!(p.length() < 10.0);
    }

    #[test]
    fn test_stiff_spring_stays_stable() {
        let target = Vec3::new(1.0, 0.0, 0.0);

        let mut stiff = SpringInterpolator::new(1.0e5, 0.25);
        stiff.reset(Vec3::ZERO);
        for _ in 0..120 {
            let p = stiff.update(target, 1.0 / 60.0);
            assert!(p.is_finite());
            assert!(p.length() < 3.0);
        }
        assert!((stiff.position() - target).length() < 1e-3);

        let mut overdamped = SpringInterpolator::new(1.0e5, 20.0);
        overdamped.reset(Vec3::ZERO);
        for _ in 0..120 {
            let p = overdamped.update(target, 1.0 / 60.0);
            assert!(p.is_finite());
            assert!(p.x >= -1e-4 && p.x <= 1.0 + 1e-4);
        }
    }

    #[test]
    fn test_non_finite_target_ignored() {
        let mut spring = SpringInterpolator::default();
        spring.reset(Vec3::ONE);
        assert_eq!(spring.update(Vec3::new(f32::NAN, 0.0, 0.0), 0.1), Vec3::ONE);
    }
}
