//! 骨骼系统
//!
//! 核心设计思想：
//! - RigHierarchy: 宿主拥有的骨骼层次，rig 只按索引读写全局变换
//! - BoneLink / BoneSet: 数组实现的层次（测试替身、Demo 使用）
//! - ik_solver: CCD IK 链求解器

mod bone_link;
mod bone_set;
mod ik_solver;

pub use bone_link::{BoneFlags, BoneLink};
pub use bone_set::BoneSet;
pub use ik_solver::{solve_ccd, CcdSettings, ChainLink};

use glam::{Quat, Vec3};

// ============================================================================
// 公共类型定义
// ============================================================================

/// 骨骼变换数据（平移 + 旋转 + 缩放）
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct BoneTransform {
    pub translation: Vec3,
    pub rotation: Quat,
    pub scale: Vec3,
}

impl Default for BoneTransform {
    fn default() -> Self {
        Self::IDENTITY
    }
}

impl BoneTransform {
    pub const IDENTITY: Self = Self {
        translation: Vec3::ZERO,
        rotation: Quat::IDENTITY,
        scale: Vec3::ONE,
    };

    #[inline]
    pub fn from_translation(translation: Vec3) -> Self {
        Self { translation, ..Self::IDENTITY }
    }

    #[inline]
    pub fn from_rotation_translation(rotation: Quat, translation: Vec3) -> Self {
        Self { translation, rotation, scale: Vec3::ONE }
    }

    /// 把点从本空间变换到父空间
    #[inline]
    pub fn transform_point(&self, point: Vec3) -> Vec3 {
        self.translation + self.rotation * (self.scale * point)
    }

    /// 逆变换一个点（父空间 -> 本空间）
    #[inline]
    pub fn inverse_transform_point(&self, point: Vec3) -> Vec3 {
        (self.rotation.inverse() * (point - self.translation)) / safe_scale(self.scale)
    }

    /// 组合：self 为父变换，`local` 为相对父的变换，返回全局变换
    #[inline]
    pub fn mul_transform(&self, local: &BoneTransform) -> BoneTransform {
        BoneTransform {
            translation: self.transform_point(local.translation),
            rotation: (self.rotation * local.rotation).normalize(),
            scale: self.scale * local.scale,
        }
    }

    /// 计算相对 `parent` 的本地变换，满足 parent.mul_transform(result) == self
    #[inline]
    pub fn relative_to(&self, parent: &BoneTransform) -> BoneTransform {
        let inv_rot = parent.rotation.inverse();
        BoneTransform {
            translation: parent.inverse_transform_point(self.translation),
            rotation: (inv_rot * self.rotation).normalize(),
            scale: self.scale / safe_scale(parent.scale),
        }
    }
}

/// 避免零缩放导致除零
#[inline]
fn safe_scale(scale: Vec3) -> Vec3 {
    Vec3::new(
        if scale.x.abs() > f32::EPSILON { scale.x } else { 1.0 },
        if scale.y.abs() > f32::EPSILON { scale.y } else { 1.0 },
        if scale.z.abs() > f32::EPSILON { scale.z } else { 1.0 },
    )
}

// ============================================================================
// 层次接口
// ============================================================================

/// 宿主拥有的骨骼层次
///
/// rig 只借用层次，从不修改拓扑。索引在层次生命周期内保持有效。
pub trait RigHierarchy {
    /// 元素数量
    fn len(&self) -> usize;

    fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// 名称 -> 索引
    fn index_of(&self, name: &str) -> Option<usize>;

    /// 当前全局变换（相对 rig 根）
    fn global_transform(&self, index: usize) -> BoneTransform;

    /// 当前本地变换（相对父元素）
    fn local_transform(&self, index: usize) -> BoneTransform;

    /// 初始（绑定姿态）全局变换
    fn initial_global_transform(&self, index: usize) -> BoneTransform;

    /// 写入全局变换；`propagate` 为 true 时子元素跟随移动
    fn set_global_transform(&mut self, index: usize, transform: BoneTransform, propagate: bool);
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_relative_roundtrip_with_rotation() {
        let parent = BoneTransform::from_rotation_translation(
            Quat::from_rotation_z(0.7),
            Vec3::new(1.0, 2.0, 3.0),
        );
        let global = BoneTransform::from_rotation_translation(
            Quat::from_rotation_x(0.3),
            Vec3::new(-4.0, 0.5, 1.0),
        );
        let local = global.relative_to(&parent);
        let back = parent.mul_transform(&local);
        assert!((back.translation - global.translation).length() < 1e-4);
        assert!(back.rotation.angle_between(global.rotation) < 1e-4);
    }

    #[test]
    fn test_inverse_transform_point() {
        let t = BoneTransform::from_rotation_translation(
            Quat::from_rotation_z(std::f32::consts::FRAC_PI_2),
            Vec3::new(10.0, 0.0, 0.0),
        );
        let p = Vec3::new(1.0, 2.0, 3.0);
        let world = t.transform_point(p);
        assert!((t.inverse_transform_point(world) - p).length() < 1e-4);
    }
}
