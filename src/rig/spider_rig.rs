//! 多足 rig 逐帧更新
//!
//! 每帧流程：
//! 1. 步态时钟（速度比、移动/静止混合、相位）
//! 2. 下落分支：张开并抬起腿，脊柱按水平速度倾斜
//! 3. 着地分支：落地冲击通知，逐腿探测地面并按步态曲线抬腿，计算脊柱高度
//! 4. 脊柱弹簧 -> 写回脊柱骨骼
//! 5. 逐腿写 IK 控制点并用 CCD 求解骨骼链

use glam::{Quat, Vec3};

use crate::animation::{Curve, SpringInterpolator};
use crate::physics::{get_config, BodyId, IgnoreSet, LegTracer, RigConfig, WorldQuery};
use crate::skeleton::{solve_ccd, BoneTransform, CcdSettings, ChainLink, RigHierarchy};
use crate::Result;

use super::definition::{resolve, LegDef, ResolvedIndices, RigVariant, SpineDef};
use super::effects::{EffectsSink, ImpactEvent};
use super::state::{LegFlags, LegRuntime, LocomotionSample, LocomotionState};

/// 写回判定阈值（位置与角度）
const POSE_EPSILON: f32 = 1.0e-4;

/// 角色运动学状态（宿主每帧提供）
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct CharacterState {
    /// 角色世界变换（rig 空间 -> 世界空间）
    pub transform: BoneTransform,
    /// 世界空间速度
    pub velocity: Vec3,
    /// 最大步行速度
    pub max_speed: f32,
    pub is_falling: bool,
    /// 探测时需要忽略的自身物体
    pub body_id: Option<BodyId>,
}

impl Default for CharacterState {
    fn default() -> Self {
        Self {
            transform: BoneTransform::IDENTITY,
            velocity: Vec3::ZERO,
            max_speed: 160.0,
            is_falling: false,
            body_id: None,
        }
    }
}

impl CharacterState {
    #[inline]
    pub fn position(&self) -> Vec3 {
        self.transform.translation
    }
}

/// 每帧借用的外部协作者
pub struct RigContext<'a> {
    pub hierarchy: &'a mut dyn RigHierarchy,
    pub world: &'a dyn WorldQuery,
    pub character: &'a CharacterState,
    /// 贴地系数曲线（相位 -> [0, 1]）
    pub stick_curve: &'a dyn Curve,
    /// 抬腿偏移曲线（相位 -> 抬腿高度倍数）
    pub offset_curve: &'a dyn Curve,
    pub effects: Option<&'a dyn EffectsSink>,
}

/// 多足 rig
pub struct SpiderRig {
    config: RigConfig,
    variant: RigVariant,
    tracer: LegTracer,
    /// Some 表示已就绪
    indices: Option<ResolvedIndices>,

    spine_spring: SpringInterpolator,
    /// 脊柱倾斜（x = 横滚，y = 俯仰，弧度）
    tilt_spring: SpringInterpolator,
    legs: Vec<LegRuntime>,
    motion: LocomotionState,

    // --- 复用缓冲区（只增不减） ---
    chain: Vec<ChainLink>,
    limits: Vec<f32>,
    ignore: IgnoreSet,
}

impl Default for SpiderRig {
    fn default() -> Self {
        Self::new()
    }
}

impl SpiderRig {
    /// 使用全局默认配置创建
    pub fn new() -> Self {
        Self::with_config(get_config())
    }

    pub fn with_config(config: RigConfig) -> Self {
        let config = config.sanitized();
        Self {
            tracer: LegTracer::from_config(&config),
            spine_spring: SpringInterpolator::new(
                config.spine_spring_stiffness,
                config.spine_spring_damping_ratio,
            ),
            tilt_spring: SpringInterpolator::new(
                config.spine_spring_stiffness,
                config.spine_spring_damping_ratio,
            ),
            config,
            variant: RigVariant::Full,
            indices: None,
            legs: Vec::new(),
            motion: LocomotionState::default(),
            chain: Vec::new(),
            limits: Vec::new(),
            ignore: IgnoreSet::new(),
        }
    }

    pub fn with_variant(mut self, variant: RigVariant) -> Self {
        self.variant = variant;
        self.indices = None;
        self
    }

    #[inline]
    pub fn is_ready(&self) -> bool {
        self.indices.is_some()
    }

    pub fn config(&self) -> &RigConfig {
        &self.config
    }

    /// 每条腿的运行时状态
    pub fn legs(&self) -> &[LegRuntime] {
        &self.legs
    }

    /// 脊柱弹簧当前位置（rig 空间）
    pub fn spine_position(&self) -> Vec3 {
        self.spine_spring.position()
    }

    pub fn motor_phase(&self) -> f32 {
        self.motion.motor_phase
    }

    pub fn is_falling(&self) -> bool {
        self.motion.falling
    }

    /// 解析定义并重置所有运行时状态
    ///
    /// 失败时 rig 保持未就绪，之后的 tick 全部为空操作。
    pub fn configure(
        &mut self,
        hierarchy: &dyn RigHierarchy,
        spine: &SpineDef,
        legs: &[LegDef],
    ) -> Result<()> {
        self.indices = None;
        self.legs.clear();
        self.motion = LocomotionState::default();
        self.spine_spring.clear();
        self.tilt_spring.clear();

        let resolved = resolve(hierarchy, spine, legs, self.variant)?;

        self.legs = vec![LegRuntime::default(); resolved.leg_count()];
        let max_chain = resolved.max_chain_len();
        if self.chain.len() < max_chain {
            self.chain.resize(max_chain, ChainLink::default());
            self.limits.resize(max_chain, 0.0);
        }

        log::info!(
            "[SpiderRig] 配置完成: {} 条腿, 每条腿骨骼数 {:?}, 脊柱偏移 {:?}",
            resolved.leg_count(),
            resolved.legs().map(|(_, bones)| bones.len()).collect::<Vec<_>>(),
            resolved.spine_ik_offset
        );

        self.indices = Some(resolved);
        Ok(())
    }

    /// 推进一帧，返回是否执行
    pub fn tick(&mut self, delta_time: f32, ctx: &mut RigContext<'_>) -> bool {
        let indices = match self.indices.take() {
            Some(indices) => indices,
            None => return false,
        };
        let delta_time = if delta_time.is_finite() { delta_time.max(0.0) } else { 0.0 };

        self.execute(&indices, delta_time, ctx);
        self.indices = Some(indices);
        true
    }

    fn execute(&mut self, indices: &ResolvedIndices, dt: f32, ctx: &mut RigContext<'_>) {
        let character = ctx.character;
        let actor = character.transform;
        let up = (actor.rotation * Vec3::Z).normalize_or_zero();

        self.ignore.clear();
        if let Some(id) = character.body_id {
            self.ignore.insert(id);
        }

        let local_velocity = actor.rotation.inverse() * character.velocity;
        let sample = self.motion.advance(&self.config, dt, local_velocity, character.max_speed);

        let spine_ik = ctx.hierarchy.global_transform(indices.spine_ik);
        let mut spine_height = spine_ik.translation.z;
        let tilt_target;
        let spring_rate;

        if character.is_falling {
            if !self.motion.falling {
                self.motion.falling = true;
                self.motion.fall_start_height = actor.translation.z;
                log::debug!("[SpiderRig] 开始下落: 高度={:.2}", self.motion.fall_start_height);
            }
            self.update_falling_legs(indices, &sample, dt, ctx);
            tilt_target = self.fall_tilt(&sample);
            spring_rate = self.config.falling_spine_spring_rate;
        } else {
            let landed = self.motion.falling;
            self.motion.falling = false;

            let max_rise = self.update_grounded_legs(indices, &sample, dt, ctx, up);
            spine_height += max_rise * sample.moving_blend;

            if landed {
                self.notify_landing(actor.translation, ctx.effects);
            }
            tilt_target = Vec3::ZERO;
            spring_rate = self.config.spine_spring_rate;
        }

        self.solve_spine(
            indices,
            spine_ik,
            spine_height,
            tilt_target,
            dt * spring_rate,
            ctx.hierarchy,
        );

        for (leg_index, (ik, bones)) in indices.legs().enumerate() {
            let target = match self.legs.get(leg_index) {
                Some(leg) => leg.target_global,
                None => continue,
            };
            self.solve_leg(ik, bones, target, ctx.hierarchy);
        }

        if self.config.debug_log {
            log::debug!(
                "[SpiderRig] dt={:.4} 速度比={:.3} 混合={:.3} 相位={:.3} 下落={}",
                dt,
                sample.speed_ratio,
                sample.moving_blend,
                self.motion.motor_phase,
                self.motion.falling
            );
        }
    }

    // ========================================================================
    // 下落
    // ========================================================================

    fn update_falling_legs(
        &mut self,
        indices: &ResolvedIndices,
        sample: &LocomotionSample,
        dt: f32,
        ctx: &RigContext<'_>,
    ) {
        let config = &self.config;
        let actor = ctx.character.transform;
        let spread = (sample.vertical_speed.abs() * config.fall_spread_factor)
            .clamp(0.0, config.max_fall_spread);
        let lift = (-sample.vertical_speed * config.fall_lift_factor)
            .clamp(-config.max_fall_lift, config.max_fall_lift);
        let spine_rest = ctx.hierarchy.initial_global_transform(indices.spine_ik).translation;

        for (leg, (ik, _)) in self.legs.iter_mut().zip(indices.legs()) {
            let rest = ctx.hierarchy.initial_global_transform(ik).translation;
            let outward =
                Vec3::new(rest.x - spine_rest.x, rest.y - spine_rest.y, 0.0).normalize_or_zero();
            let target = rest + outward * spread + Vec3::Z * lift;

            leg.follow(actor.transform_point(target), config.falling_leg_lag, dt);
            leg.flags.remove(LegFlags::GROUNDED);
            leg.target_global = actor.inverse_transform_point(leg.remembered_world);
        }
    }

    /// 下落时的脊柱倾斜：前后速度 -> 俯仰，左右速度 -> 横滚
    fn fall_tilt(&self, sample: &LocomotionSample) -> Vec3 {
        let max_tilt = self.config.max_fall_tilt_degrees.to_radians();
        let factor = self.config.fall_tilt_factor;
        let pitch = (sample.local_velocity.x * factor).clamp(-max_tilt, max_tilt);
        let roll = (-sample.local_velocity.y * factor).clamp(-max_tilt, max_tilt);
        Vec3::new(roll, pitch, 0.0)
    }

    // ========================================================================
    // 着地
    // ========================================================================

    /// 返回腿部目标相对静止姿态的最大抬升量（不小于 0）
    fn update_grounded_legs(
        &mut self,
        indices: &ResolvedIndices,
        sample: &LocomotionSample,
        dt: f32,
        ctx: &RigContext<'_>,
        up: Vec3,
    ) -> f32 {
        let config = &self.config;
        let actor = ctx.character.transform;
        let leg_count = self.legs.len().max(1) as f32;
        let horizontal = Vec3::new(sample.local_velocity.x, sample.local_velocity.y, 0.0);
        let lead = horizontal * config.stride_lead_time;
        let spine_local = ctx.hierarchy.global_transform(indices.spine_bone).translation;
        let spine_root = actor.transform_point(spine_local);

        let mut max_rise = 0.0f32;
        for (leg_index, (leg, (ik, _))) in self.legs.iter_mut().zip(indices.legs()).enumerate() {
            let rest = ctx.hierarchy.initial_global_transform(ik).translation;
            let guess = actor.transform_point(rest + lead);
            let (hit, ground) = self.tracer.trace(guess, spine_root, up, &self.ignore, ctx.world);

            let phase = (leg_index as f32 / leg_count + self.motion.motor_phase).rem_euclid(1.0);
            let stick_curve = ctx.stick_curve.value(phase).clamp(0.0, 1.0);
            let stick = 1.0 + (stick_curve - 1.0) * sample.moving_blend;
            let offset =
                ctx.offset_curve.value(phase) * sample.moving_blend * self.motion.lagged_speed;

            let target = ground + up * (offset * config.lift_height);
            let rate =
                config.lifted_leg_lag + (config.stuck_leg_lag - config.lifted_leg_lag) * stick;
            leg.follow(target, rate, dt);
            leg.flags.set(LegFlags::GROUNDED, hit);

            leg.target_global = actor.inverse_transform_point(leg.remembered_world);
            // 抬升量相对该腿 IK 控制点的静止高度
            max_rise = max_rise.max(leg.target_global.z - rest.z);
        }
        max_rise
    }

    fn notify_landing(&self, position: Vec3, effects: Option<&dyn EffectsSink>) {
        let impact = (self.motion.fall_start_height - position.z).abs();
        log::debug!("[SpiderRig] 落地: 冲击={:.2}", impact);

        if impact < self.config.min_impact_height {
            return;
        }
        let Some(effects) = effects else {
            return;
        };

        effects.notify_impact(ImpactEvent { position, magnitude: impact, is_leg: false });
        if self.config.notify_leg_impacts {
            for leg in self.legs.iter().filter(|leg| leg.is_grounded()) {
                effects.notify_impact(ImpactEvent {
                    position: leg.remembered_world,
                    magnitude: impact,
                    is_leg: true,
                });
            }
        }
    }

    // ========================================================================
    // 求解
    // ========================================================================

    fn solve_spine(
        &mut self,
        indices: &ResolvedIndices,
        spine_ik: BoneTransform,
        height: f32,
        tilt_target: Vec3,
        spring_dt: f32,
        hierarchy: &mut dyn RigHierarchy,
    ) {
        let target = Vec3::new(spine_ik.translation.x, spine_ik.translation.y, height)
            + indices.spine_ik_offset;
        let position = self.spine_spring.update(target, spring_dt);
        let tilt = self.tilt_spring.update(tilt_target, spring_dt);
        let tilt_rotation = Quat::from_rotation_y(tilt.y) * Quat::from_rotation_x(tilt.x);

        let desired = BoneTransform {
            translation: position,
            rotation: (spine_ik.rotation * tilt_rotation).normalize(),
            scale: spine_ik.scale,
        };
        let current = hierarchy.global_transform(indices.spine_bone);
        let moved = current.translation.distance_squared(desired.translation)
            > POSE_EPSILON * POSE_EPSILON
            || current.rotation.angle_between(desired.rotation) > POSE_EPSILON;

        if self.spine_spring.is_in_motion() || self.tilt_spring.is_in_motion() || moved {
            hierarchy.set_global_transform(indices.spine_bone, desired, true);
        }
    }

    fn solve_leg(
        &mut self,
        ik: usize,
        bones: &[usize],
        target: Vec3,
        hierarchy: &mut dyn RigHierarchy,
    ) {
        let mut ik_transform = hierarchy.global_transform(ik);
        if ik_transform.translation.distance_squared(target) > POSE_EPSILON * POSE_EPSILON {
            ik_transform.translation = target;
            hierarchy.set_global_transform(ik, ik_transform, false);
        }

        let length = bones.len();
        if self.chain.len() < length {
            self.chain.resize(length, ChainLink::default());
            self.limits.resize(length, 0.0);
        }

        for (i, &bone) in bones.iter().enumerate() {
            self.chain[i] =
                ChainLink::new(hierarchy.global_transform(bone), hierarchy.local_transform(bone));
            self.limits[i] = self.config.leg_rotation_limit_degrees;
        }

        let settings = CcdSettings {
            precision: self.config.ccd_precision,
            max_iterations: self.config.ccd_max_iterations,
            start_from_tail: self.config.ccd_start_from_tail,
            enable_rotation_limit: self.config.ccd_enable_rotation_limit,
        };
        if !solve_ccd(&mut self.chain[..length], target, &settings, &self.limits[..length]) {
            return;
        }

        for (link, &bone) in self.chain[..length].iter().zip(bones) {
            hierarchy.set_global_transform(bone, link.transform, true);
        }
    }
}
