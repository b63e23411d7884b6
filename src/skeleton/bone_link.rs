//! 骨骼节点
//!
//! BoneLink 是 BoneSet 的核心单元，每个 BoneLink 代表层次中的一个元素
//! （变形骨骼或 IK 控制点）。

use glam::Vec3;
use bitflags::bitflags;

use super::BoneTransform;

// ============================================================================
// 元素标志
// ============================================================================

bitflags! {
    /// 元素标志位
    #[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
    pub struct BoneFlags: u32 {
        /// 变形骨骼
        const BONE = 1 << 0;
        /// IK 控制点（不参与蒙皮）
        const CONTROL = 1 << 1;
        /// 本帧被 rig 写入过
        const WRITTEN = 1 << 2;
    }
}

// ============================================================================
// 骨骼节点
// ============================================================================

/// 层次元素
///
/// - 静态数据：名称、父子关系、初始姿态
/// - 动态数据：每帧更新的变换状态
/// - 变换计算：local_to_world = parent.local_to_world * local_to_parent
#[derive(Clone, Debug)]
pub struct BoneLink {
    // ========================================
    // 静态数据（初始化后不变）
    // ========================================

    /// 元素名称
    pub name: String,

    /// 父元素索引 (-1 表示根)
    pub parent_index: i32,

    /// 元素标志
    pub flags: BoneFlags,

    /// 初始全局变换（绑定姿态）
    pub initial_to_world: BoneTransform,

    // ========================================
    // 动态数据（每帧更新）
    // ========================================

    /// 本地变换 (local_to_parent)
    pub local_to_parent: BoneTransform,

    /// 全局变换 (local_to_world)
    pub local_to_world: BoneTransform,
}

impl BoneLink {
    /// 创建新元素
    pub fn new(name: String) -> Self {
        Self {
            name,
            parent_index: -1,
            flags: BoneFlags::BONE,
            initial_to_world: BoneTransform::IDENTITY,
            local_to_parent: BoneTransform::IDENTITY,
            local_to_world: BoneTransform::IDENTITY,
        }
    }

    /// 父元素索引
    #[inline]
    pub fn parent_id(&self) -> Option<usize> {
        if self.parent_index >= 0 {
            Some(self.parent_index as usize)
        } else {
            None
        }
    }

    #[inline]
    pub fn is_control(&self) -> bool {
        self.flags.contains(BoneFlags::CONTROL)
    }

    /// 获取全局位置
    #[inline]
    pub fn position(&self) -> Vec3 {
        self.local_to_world.translation
    }

    /// 恢复绑定姿态（本地变换需由 BoneSet 重新推导）
    #[inline]
    pub fn reset_pose(&mut self) {
        self.local_to_world = self.initial_to_world;
        self.flags.remove(BoneFlags::WRITTEN);
    }
}

impl Default for BoneLink {
    fn default() -> Self {
        Self::new(String::new())
    }
}
