//! IK 求解器 - 循环坐标下降 (CCD)
//!
//! 设计原则：
//! - 使用迭代求解方式，距离比较一律使用平方
//! - 每个关节每次迭代的旋转量受角度限制（度）约束
//! - 可选累积角度限制
//! - 求解失败不是错误：返回尽力而为的姿态

use glam::{Quat, Vec3};

use super::BoneTransform;

/// 旋转角阈值（弧度），低于此值视为无需旋转
const KINDA_SMALL_ANGLE: f32 = 1.0e-4;

/// 退化距离阈值
const DEGENERATE_LENGTH: f32 = 1.0e-5;

/// 末端与目标方向相反时的最大旋转角（175°）
const ANTIPARALLEL_MAX_ANGLE: f32 = std::f32::consts::PI * 35.0 / 36.0;

// ============================================================================
// IK 链节点
// ============================================================================

/// IK 链节点（求解器工作状态）
#[derive(Clone, Copy, Debug, Default)]
pub struct ChainLink {
    /// 全局变换
    pub transform: BoneTransform,
    /// 相对链上前一节点的本地变换
    pub local_transform: BoneTransform,
    /// 累积旋转量（弧度，仅在启用累积限制时使用）
    pub current_angle_delta: f32,
}

impl ChainLink {
    pub fn new(transform: BoneTransform, local_transform: BoneTransform) -> Self {
        Self {
            transform,
            local_transform,
            current_angle_delta: 0.0,
        }
    }

    #[inline]
    pub fn location(&self) -> Vec3 {
        self.transform.translation
    }
}

/// 求解参数
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct CcdSettings {
    /// 末端到目标的容差距离
    pub precision: f32,
    /// 最大迭代次数
    pub max_iterations: u32,
    /// true: 从末端向根部遍历；false: 从根部向末端
    pub start_from_tail: bool,
    /// 启用累积角度限制（每个关节整个求解过程的总旋转量不超过限制）
    pub enable_rotation_limit: bool,
}

impl Default for CcdSettings {
    fn default() -> Self {
        Self {
            precision: 1.0,
            max_iterations: 10,
            start_from_tail: true,
            enable_rotation_limit: false,
        }
    }
}

// ============================================================================
// 求解
// ============================================================================

/// CCD 求解
///
/// `chain` 从根到末端排列，最后一个节点为末端执行器。
/// `limits_degrees[i]` 为第 i 个关节单次迭代的最大旋转角，0 表示固定该关节；
/// 缺省项视为不限制。
///
/// 返回是否有任何关节被修改。返回 false 时调用方应跳过写回。
pub fn solve_ccd(
    chain: &mut [ChainLink],
    target: Vec3,
    settings: &CcdSettings,
    limits_degrees: &[f32],
) -> bool {
    let n = chain.len();
    if n < 2 {
        return false;
    }

    let total_length: f32 = chain
        .windows(2)
        .map(|w| w[0].location().distance(w[1].location()))
        .sum();
    if total_length <= DEGENERATE_LENGTH {
        return false;
    }
    if chain[0].location().distance_squared(target) <= DEGENERATE_LENGTH * DEGENERATE_LENGTH {
        return false;
    }

    // 以链自身为准重建本地变换
    chain[0].current_angle_delta = 0.0;
    for i in 1..n {
        chain[i].local_transform = chain[i].transform.relative_to(&chain[i - 1].transform);
        chain[i].current_angle_delta = 0.0;
    }

    let precision_sq = settings.precision * settings.precision;
    let mut distance_sq = chain[n - 1].location().distance_squared(target);
    let mut updated = false;
    let mut iteration = 0;

    while distance_sq > precision_sq && iteration < settings.max_iterations {
        iteration += 1;

        if settings.start_from_tail {
            for link_index in (0..n - 1).rev() {
                updated |= update_chain_link(chain, link_index, target, settings, limits_degrees);
            }
        } else {
            for link_index in 0..n - 1 {
                updated |= update_chain_link(chain, link_index, target, settings, limits_degrees);
            }
        }

        distance_sq = chain[n - 1].location().distance_squared(target);
    }

    if updated {
        log::trace!(
            "[CCD] {} 次迭代，剩余距离 {:.4}",
            iteration,
            distance_sq.sqrt()
        );
    }
    updated
}

/// 单个关节：旋转使末端朝向目标
fn update_chain_link(
    chain: &mut [ChainLink],
    link_index: usize,
    target: Vec3,
    settings: &CcdSettings,
    limits_degrees: &[f32],
) -> bool {
    let tip_index = chain.len() - 1;
    let tip_pos = chain[tip_index].location();
    let link_pos = chain[link_index].location();

    let to_end = (tip_pos - link_pos).normalize_or_zero();
    let to_target = (target - link_pos).normalize_or_zero();
    if to_end == Vec3::ZERO || to_target == Vec3::ZERO {
        return false;
    }

    let limit = limits_degrees
        .get(link_index)
        .copied()
        .unwrap_or(180.0)
        .max(0.0)
        .to_radians();
    let cos_angle = to_end.dot(to_target).clamp(-1.0, 1.0);
    let mut angle = cos_angle.acos().min(limit);

    let mut axis = to_end.cross(to_target);
    if axis.length_squared() <= f32::EPSILON * f32::EPSILON {
        if cos_angle >= 0.0 {
            return false;
        }
        // 反向共线：任取垂直轴，不转满半圈，否则链会对折成另一条共线链
        axis = to_end.any_orthonormal_vector();
        angle = angle.min(ANTIPARALLEL_MAX_ANGLE);
    }

    let current_delta = chain[link_index].current_angle_delta;
    let can_rotate = angle > KINDA_SMALL_ANGLE
        && (!settings.enable_rotation_limit || limit > current_delta);
    if !can_rotate {
        return false;
    }

    if settings.enable_rotation_limit {
        if limit < current_delta + angle {
            angle = limit - current_delta;
            if angle <= KINDA_SMALL_ANGLE {
                return false;
            }
        }
        chain[link_index].current_angle_delta += angle;
    }

    let delta_rotation = Quat::from_axis_angle(axis.normalize(), angle);
    let link = &mut chain[link_index].transform;
    link.rotation = (delta_rotation * link.rotation).normalize();

    if link_index > 0 {
        chain[link_index].local_transform =
            chain[link_index].transform.relative_to(&chain[link_index - 1].transform);
    }

    // 向下更新子节点
    let mut parent = chain[link_index].transform;
    for child in chain.iter_mut().skip(link_index + 1) {
        child.transform = parent.mul_transform(&child.local_transform);
        parent = child.transform;
    }
    true
}

#[cfg(test)]
mod tests {
    use super::*;

    /// 由全局位置构造一条无旋转的链
    fn chain_from_points(points: &[Vec3]) -> Vec<ChainLink> {
        let mut chain: Vec<ChainLink> = points
            .iter()
            .map(|p| ChainLink::new(BoneTransform::from_translation(*p), BoneTransform::IDENTITY))
            .collect();
        for i in 1..chain.len() {
            chain[i].local_transform = chain[i].transform.relative_to(&chain[i - 1].transform);
        }
        chain
    }

    fn segment_lengths(chain: &[ChainLink]) -> Vec<f32> {
        chain
            .windows(2)
            .map(|w| w[0].location().distance(w[1].location()))
            .collect()
    }

    #[test]
    fn test_reachable_target_converges() {
        let mut chain = chain_from_points(&[
            Vec3::ZERO,
            Vec3::new(1.0, 0.0, 0.0),
            Vec3::new(2.0, 0.0, 0.0),
            Vec3::new(3.0, 0.0, 0.0),
        ]);
        let target = Vec3::new(1.5, 1.5, 0.0);
        let settings = CcdSettings {
            precision: 0.01,
            max_iterations: 100,
            ..CcdSettings::default()
        };

        let changed = solve_ccd(&mut chain, target, &settings, &[90.0; 4]);

        assert!(changed);
        assert!(chain[3].location().distance(target) <= 0.01);
        // 根不动，骨长不变
        assert!(chain[0].location().length() < 1e-5);
        for len in segment_lengths(&chain) {
            assert!((len - 1.0).abs() < 1e-3);
        }
    }

    #[test]
    fn test_antiparallel_target_converges() {
        let mut chain = chain_from_points(&[
            Vec3::ZERO,
            Vec3::new(1.0, 0.0, 0.0),
            Vec3::new(2.0, 0.0, 0.0),
            Vec3::new(3.0, 0.0, 0.0),
        ]);
        // 目标在根后方，与链正好反向
        let target = Vec3::new(-1.5, 0.0, 0.0);
        let settings = CcdSettings {
            precision: 0.01,
            max_iterations: 100,
            ..CcdSettings::default()
        };

        let changed = solve_ccd(&mut chain, target, &settings, &[180.0; 4]);

        assert!(changed);
        assert!(chain[3].location().distance(target) <= 0.01);
        for len in segment_lengths(&chain) {
            assert!((len - 1.0).abs() < 1e-3);
        }
    }

    #[test]
    fn test_unreachable_target_stretches() {
        let mut chain = chain_from_points(&[
            Vec3::ZERO,
            Vec3::new(1.0, 0.0, 0.0),
            Vec3::new(1.0, 1.0, 0.0),
        ]);
        let target = Vec3::new(0.0, 5.0, 0.0);
        let settings = CcdSettings {
            precision: 0.01,
            max_iterations: 200,
            ..CcdSettings::default()
        };

        solve_ccd(&mut chain, target, &settings, &[180.0; 3]);

        let tip = chain[2].location();
        assert!(tip.length() <= 2.0 + 1e-3);
        assert!(tip.length() > 2.0 - 1e-2);
        assert!(tip.normalize().dot(Vec3::Y) > 0.999);
    }

    #[test]
    fn test_zero_limits_pin_every_joint() {
        let mut chain = chain_from_points(&[
            Vec3::ZERO,
            Vec3::new(0.0, 0.0, 1.0),
            Vec3::new(1.0, 0.0, 1.0),
        ]);
        let before: Vec<Vec3> = chain.iter().map(|l| l.location()).collect();

        let changed = solve_ccd(
            &mut chain,
            Vec3::new(0.5, 0.5, 0.0),
            &CcdSettings { precision: 0.01, ..CcdSettings::default() },
            &[0.0; 3],
        );

        assert!(!changed);
        for (link, pos) in chain.iter().zip(before) {
            assert_eq!(link.location(), pos);
        }
    }

    #[test]
    fn test_degenerate_inputs_are_noops() {
        // 单节点
        let mut single = chain_from_points(&[Vec3::ZERO]);
        assert!(!solve_ccd(&mut single, Vec3::X, &CcdSettings::default(), &[30.0]));

        // 零长度链
        let mut collapsed = chain_from_points(&[Vec3::ONE, Vec3::ONE, Vec3::ONE]);
        assert!(!solve_ccd(&mut collapsed, Vec3::ZERO, &CcdSettings::default(), &[30.0; 3]));

        // 目标与根重合
        let mut chain = chain_from_points(&[Vec3::ZERO, Vec3::X, Vec3::new(2.0, 0.0, 0.0)]);
        assert!(!solve_ccd(&mut chain, Vec3::ZERO, &CcdSettings::default(), &[30.0; 3]));
        assert!(chain[2].location().is_finite());
    }

    #[test]
    fn test_already_within_precision() {
        let mut chain = chain_from_points(&[Vec3::ZERO, Vec3::new(0.0, 0.0, 10.0)]);
        let changed = solve_ccd(
            &mut chain,
            Vec3::new(0.5, 0.0, 10.0),
            &CcdSettings::default(),
            &[30.0; 2],
        );
        assert!(!changed);
    }

    #[test]
    fn test_cumulative_rotation_limit() {
        let mut chain = chain_from_points(&[Vec3::ZERO, Vec3::new(1.0, 0.0, 0.0)]);
        let settings = CcdSettings {
            precision: 0.001,
            max_iterations: 50,
            start_from_tail: true,
            enable_rotation_limit: true,
        };

        let changed = solve_ccd(&mut chain, Vec3::new(0.0, 1.0, 0.0), &settings, &[10.0; 2]);

        assert!(changed);
        let swung = chain[1].location().normalize().dot(Vec3::X).clamp(-1.0, 1.0).acos();
        assert!(swung <= 10f32.to_radians() + 1e-4);
        assert!(swung > 9f32.to_radians());
    }

    #[test]
    fn test_head_first_order_also_converges() {
        let mut chain = chain_from_points(&[
            Vec3::ZERO,
            Vec3::new(0.0, 0.0, 2.0),
            Vec3::new(0.0, 0.0, 4.0),
        ]);
        let target = Vec3::new(2.0, 0.0, 1.0);
        let settings = CcdSettings {
            precision: 0.05,
            max_iterations: 100,
            start_from_tail: false,
            enable_rotation_limit: false,
        };

        assert!(solve_ccd(&mut chain, target, &settings, &[45.0; 3]));
        assert!(chain[2].location().distance(target) <= 0.05);
    }
}
