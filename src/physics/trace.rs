//! 腿部地面探测
//!
//! 第一段：从抬高的脊柱原点指向落脚点猜测的方向上，覆盖猜测点前后一段距离做球体扫掠。
//! 第二段（攀边）：第一段未命中时，从第一段终点扫回脊柱根部。

use glam::Vec3;

use super::config::RigConfig;
use super::world::{IgnoreSet, WorldQuery};

/// 地面探测器
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct LegTracer {
    /// 探测原点相对脊柱的抬高量
    pub origin_height: f32,
    /// 起点在猜测点之前的距离
    pub inward: f32,
    /// 终点在猜测点之后的距离
    pub outward: f32,
    /// 探测球半径
    pub radius: f32,
    /// 是否启用攀边回探
    pub ledge_trace: bool,
}

impl Default for LegTracer {
    fn default() -> Self {
        Self::from_config(&RigConfig::default())
    }
}

impl LegTracer {
    pub fn from_config(config: &RigConfig) -> Self {
        Self {
            origin_height: config.trace_origin_height,
            inward: config.trace_inward,
            outward: config.trace_outward,
            radius: config.trace_radius,
            ledge_trace: config.ledge_trace,
        }
    }

    /// 探测落脚点
    ///
    /// 返回 (是否命中, 位置)。两段都未命中时返回原猜测点。
    pub fn trace(
        &self,
        guess: Vec3,
        spine_root: Vec3,
        up: Vec3,
        ignore: &IgnoreSet,
        world: &dyn WorldQuery,
    ) -> (bool, Vec3) {
        if !guess.is_finite() || !spine_root.is_finite() {
            return (false, guess);
        }

        let up = up.normalize_or_zero();
        let origin = spine_root + up * self.origin_height;
        let mut dir = (guess - origin).normalize_or_zero();
        if dir == Vec3::ZERO {
            dir = if up == Vec3::ZERO { -Vec3::Z } else { -up };
        }

        let start = guess - dir * self.inward;
        let end = guess + dir * self.outward;
        if let Some(hit) = world.sweep_sphere(start, end, self.radius, ignore) {
            return (true, hit);
        }

        if self.ledge_trace {
            if let Some(hit) = world.sweep_sphere(end, spine_root, self.radius, ignore) {
                log::trace!("[SpiderRig] 攀边命中: {:?}", hit);
                return (true, hit);
            }
        }

        (false, guess)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::physics::FlatGround;

    #[test]
    fn test_flat_plane_hit_within_radius() {
        let tracer = LegTracer::default();
        let ground = FlatGround::new(0.0);
        let (hit, pos) = tracer.trace(
            Vec3::new(40.0, 10.0, 3.0),
            Vec3::new(0.0, 0.0, 15.0),
            Vec3::Z,
            &IgnoreSet::new(),
            &ground,
        );
        assert!(hit);
        assert!(pos.z >= 0.0);
        assert!(pos.z <= tracer.radius + 1e-4);
    }

    #[test]
    fn test_miss_keeps_guess() {
        let tracer = LegTracer::default();
        let ground = FlatGround::new(-500.0);
        let guess = Vec3::new(40.0, 0.0, 0.0);
        let spine = Vec3::new(0.0, 0.0, 15.0);
        let (hit, pos) = tracer.trace(guess, spine, Vec3::Z, &IgnoreSet::new(), &ground);
        assert!(!hit);
        assert_eq!(pos, guess);
    }

    #[test]
    fn test_ledge_fallback() {
        let tracer = LegTracer::default();
        let spine = Vec3::new(0.0, 0.0, 15.0);
        let ledge_point = Vec3::new(20.0, 0.0, 2.0);
        // 只响应从脊柱外下方往回扫的探测
        let cliff = move |origin: Vec3, end: Vec3, _radius: f32, _ignore: &IgnoreSet| {
            if end == spine && origin.x > ledge_point.x {
                Some(ledge_point)
            } else {
                None
            }
        };

        let guess = Vec3::new(40.0, 0.0, -5.0);
        let (hit, pos) = tracer.trace(guess, spine, Vec3::Z, &IgnoreSet::new(), &cliff);
        assert!(hit);
        assert_eq!(pos, ledge_point);

        let no_ledge = LegTracer { ledge_trace: false, ..tracer };
        let (hit, _) = no_ledge.trace(guess, spine, Vec3::Z, &IgnoreSet::new(), &cliff);
        assert!(!hit);
    }

    #[test]
    fn test_self_is_ignored() {
        let tracer = LegTracer::default();
        let body = FlatGround { height: 0.0, body_id: 42 };
        let guess = Vec3::new(30.0, 0.0, 1.0);
        let spine = Vec3::new(0.0, 0.0, 15.0);
        let (hit, pos) = tracer.trace(guess, spine, Vec3::Z, &IgnoreSet::single(42), &body);
        assert!(!hit);
        assert_eq!(pos, guess);
    }
}
