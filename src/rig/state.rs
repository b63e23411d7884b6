//! Rig 运行时状态
//!
//! 每条腿一个 LegRuntime（配置时分配，之后不再改变大小），
//! 以及整个 rig 共用的步态时钟 LocomotionState。

use bitflags::bitflags;
use glam::Vec3;

use crate::physics::RigConfig;

bitflags! {
    /// 腿部状态标志
    #[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
    pub struct LegFlags: u8 {
        /// 本帧探测到地面
        const GROUNDED = 1 << 0;
        /// 已有记忆位置（首帧直接吸附）
        const INITIALIZED = 1 << 1;
    }
}

/// 单腿运行时状态
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct LegRuntime {
    /// 平滑后的世界空间落脚点
    pub remembered_world: Vec3,
    /// 最近一次写入 IK 控制点的全局位置（rig 空间）
    pub target_global: Vec3,
    pub flags: LegFlags,
}

impl LegRuntime {
    #[inline]
    pub fn is_grounded(&self) -> bool {
        self.flags.contains(LegFlags::GROUNDED)
    }

    /// 以 `rate`（1/秒）向目标靠拢，首次调用直接吸附
    pub fn follow(&mut self, target: Vec3, rate: f32, delta_time: f32) {
        if !target.is_finite() {
            return;
        }
        if !self.flags.contains(LegFlags::INITIALIZED) {
            self.remembered_world = target;
            self.flags.insert(LegFlags::INITIALIZED);
            return;
        }
        let alpha = (rate.max(0.0) * delta_time).clamp(0.0, 1.0);
        self.remembered_world = self.remembered_world.lerp(target, alpha);
    }
}

/// 单帧移动采样
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct LocomotionSample {
    /// rig 空间速度
    pub local_velocity: Vec3,
    /// 水平速度
    pub horizontal_speed: f32,
    /// 水平速度比 [0, 1]
    pub speed_ratio: f32,
    /// 垂直速度（rig 空间 Z）
    pub vertical_speed: f32,
    /// 移动/静止混合系数：1 = 移动中，0 = 静止
    pub moving_blend: f32,
}

/// 步态时钟与下落状态
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct LocomotionState {
    /// 累计时间
    pub elapsed: f32,
    /// 最近一次移动的时间戳
    pub last_moved: f32,
    /// 滞后的水平速度比
    pub lagged_speed: f32,
    /// 步态相位 [0, 1)
    pub motor_phase: f32,
    /// 上一帧是否处于下落
    pub falling: bool,
    /// 开始下落时的高度
    pub fall_start_height: f32,
}

impl Default for LocomotionState {
    fn default() -> Self {
        Self {
            elapsed: 0.0,
            last_moved: f32::NEG_INFINITY,
            lagged_speed: 0.0,
            motor_phase: 0.0,
            falling: false,
            fall_start_height: 0.0,
        }
    }
}

impl LocomotionState {
    /// 推进一帧
    pub fn advance(
        &mut self,
        config: &RigConfig,
        delta_time: f32,
        local_velocity: Vec3,
        max_speed: f32,
    ) -> LocomotionSample {
        self.elapsed += delta_time;

        let horizontal_speed = Vec3::new(local_velocity.x, local_velocity.y, 0.0).length();
        let speed_ratio = if max_speed > 0.0 {
            (horizontal_speed / max_speed).clamp(0.0, 1.0)
        } else {
            0.0
        };

        let moving = horizontal_speed > config.move_speed_threshold;
        if moving {
            self.last_moved = self.elapsed;
        }
        let moving_blend = if config.stall_duration > 0.0 {
            1.0 - ((self.elapsed - self.last_moved) / config.stall_duration).clamp(0.0, 1.0)
        } else if moving {
            1.0
        } else {
            0.0
        };

        let lag = (delta_time * config.speed_lag).clamp(0.0, 1.0);
        self.lagged_speed += (speed_ratio - self.lagged_speed) * lag;

        let phase_step = horizontal_speed * delta_time * config.throttle;
        self.motor_phase = (self.motor_phase + phase_step).rem_euclid(1.0);

        LocomotionSample {
            local_velocity,
            horizontal_speed,
            speed_ratio,
            vertical_speed: local_velocity.z,
            moving_blend,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_stall_blend_decays() {
        let config = RigConfig::default();
        let mut state = LocomotionState::default();

        let idle = state.advance(&config, 0.1, Vec3::ZERO, 160.0);
        assert_eq!(idle.moving_blend, 0.0);

        let moving = state.advance(&config, 0.1, Vec3::new(80.0, 0.0, 0.0), 160.0);
        assert_eq!(moving.moving_blend, 1.0);
        assert!((moving.speed_ratio - 0.5).abs() < 1e-6);

        let after = state.advance(&config, 0.25, Vec3::ZERO, 160.0);
        assert!((after.moving_blend - 0.5).abs() < 1e-4);
        let stalled = state.advance(&config, 0.5, Vec3::ZERO, 160.0);
        assert_eq!(stalled.moving_blend, 0.0);
    }

    #[test]
    fn test_motor_phase_wraps() {
        let config = RigConfig { throttle: 1.0, ..RigConfig::default() };
        let mut state = LocomotionState::default();
        state.advance(&config, 1.0, Vec3::new(2.5, 0.0, -40.0), 10.0);
        assert!((state.motor_phase - 0.5).abs() < 1e-5);
        assert!((0.0..1.0).contains(&state.motor_phase));
    }

    #[test]
    fn test_zero_max_speed() {
        let config = RigConfig::default();
        let mut state = LocomotionState::default();
        let sample = state.advance(&config, 0.1, Vec3::new(50.0, 0.0, -3.0), 0.0);
        assert_eq!(sample.speed_ratio, 0.0);
        assert_eq!(sample.vertical_speed, -3.0);
    }

    #[test]
    fn test_leg_follow_snaps_then_lerps() {
        let mut leg = LegRuntime::default();
        leg.follow(Vec3::new(10.0, 0.0, 0.0), 2.0, 0.1);
        assert_eq!(leg.remembered_world, Vec3::new(10.0, 0.0, 0.0));

        leg.follow(Vec3::ZERO, 2.0, 0.1);
        assert!((leg.remembered_world.x - 8.0).abs() < 1e-5);

        leg.follow(Vec3::ZERO, 100.0, 0.1);
        assert_eq!(leg.remembered_world, Vec3::ZERO);
    }
}
