//! 骨骼集合 - 数组实现的骨骼层次
//!
//! 元素按添加顺序存储，父元素必须先于子元素添加。

use std::collections::HashMap;

use glam::Vec3;

use super::bone_link::{BoneFlags, BoneLink};
use super::{BoneTransform, RigHierarchy};

/// 骨骼集合
#[derive(Clone, Debug, Default)]
pub struct BoneSet {
    bones: Vec<BoneLink>,
    name_to_index: HashMap<String, usize>,
    /// 子元素缓存（添加时维护）
    children_cache: Vec<Vec<usize>>,
}

impl BoneSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// 添加变形骨骼，`global` 为绑定姿态下的全局变换
    pub fn add_bone(&mut self, name: &str, parent: Option<usize>, global: BoneTransform) -> usize {
        self.add_element(name, parent, global, BoneFlags::BONE)
    }

    /// 添加 IK 控制点
    pub fn add_control(
        &mut self,
        name: &str,
        parent: Option<usize>,
        global: BoneTransform,
    ) -> usize {
        self.add_element(name, parent, global, BoneFlags::CONTROL)
    }

    fn add_element(
        &mut self,
        name: &str,
        parent: Option<usize>,
        global: BoneTransform,
        flags: BoneFlags,
    ) -> usize {
        let index = self.bones.len();
        let parent = match parent {
            Some(p) if p < index => Some(p),
            Some(p) => {
                log::warn!("[BoneSet] '{}' 的父元素 {} 不存在，作为根元素添加", name, p);
                None
            }
            None => None,
        };

        let mut link = BoneLink::new(name.to_string());
        link.flags = flags;
        link.initial_to_world = global;
        link.local_to_world = global;
        link.local_to_parent = match parent {
            Some(p) => global.relative_to(&self.bones[p].local_to_world),
            None => global,
        };
        link.parent_index = parent.map_or(-1, |p| p as i32);

        if let Some(p) = parent {
            self.children_cache[p].push(index);
        }
        if self.name_to_index.contains_key(name) {
            log::warn!("[BoneSet] 重名元素 '{}'，按名称查找时返回先添加者", name);
        } else {
            self.name_to_index.insert(name.to_string(), index);
        }

        self.bones.push(link);
        self.children_cache.push(Vec::new());
        index
    }

    /// 便捷方法：全局位置
    #[inline]
    pub fn position(&self, index: usize) -> Vec3 {
        self.global_transform(index).translation
    }

    /// 变形骨骼数量（不含控制点）
    pub fn bone_count(&self) -> usize {
        self.bones.iter().filter(|b| !b.is_control()).count()
    }

    /// 本帧被写入过的元素索引
    pub fn written_indices(&self) -> Vec<usize> {
        self.bones
            .iter()
            .enumerate()
            .filter(|(_, b)| b.flags.contains(BoneFlags::WRITTEN))
            .map(|(i, _)| i)
            .collect()
    }

    /// 清除写入标记
    pub fn clear_written(&mut self) {
        for bone in &mut self.bones {
            bone.flags.remove(BoneFlags::WRITTEN);
        }
    }

    /// 恢复整套绑定姿态
    pub fn reset_pose(&mut self) {
        for bone in &mut self.bones {
            bone.reset_pose();
        }
        for idx in 0..self.bones.len() {
            self.bones[idx].local_to_parent = match self.bones[idx].parent_id() {
                Some(p) => self.bones[idx]
                    .local_to_world
                    .relative_to(&self.bones[p].local_to_world),
                None => self.bones[idx].local_to_world,
            };
        }
    }

    /// 递归更新子元素的全局变换
    fn update_children_recursive(&mut self, idx: usize) {
        let parent_world = self.bones[idx].local_to_world;
        // 子元素列表在添加后不变，克隆索引避免借用冲突
        let children = self.children_cache[idx].clone();
        for child in children {
            let local = self.bones[child].local_to_parent;
            self.bones[child].local_to_world = parent_world.mul_transform(&local);
            self.update_children_recursive(child);
        }
    }

    /// 子元素保持全局变换不动，重新推导其本地变换
    fn rebase_children(&mut self, idx: usize) {
        let parent_world = self.bones[idx].local_to_world;
        for &child in &self.children_cache[idx] {
            let world = self.bones[child].local_to_world;
            self.bones[child].local_to_parent = world.relative_to(&parent_world);
        }
    }
}

impl RigHierarchy for BoneSet {
    fn len(&self) -> usize {
        self.bones.len()
    }

    fn index_of(&self, name: &str) -> Option<usize> {
        self.name_to_index.get(name).copied()
    }

    fn global_transform(&self, index: usize) -> BoneTransform {
        self.bones
            .get(index)
            .map_or(BoneTransform::IDENTITY, |b| b.local_to_world)
    }

    fn local_transform(&self, index: usize) -> BoneTransform {
        self.bones
            .get(index)
            .map_or(BoneTransform::IDENTITY, |b| b.local_to_parent)
    }

    fn initial_global_transform(&self, index: usize) -> BoneTransform {
        self.bones
            .get(index)
            .map_or(BoneTransform::IDENTITY, |b| b.initial_to_world)
    }

    fn set_global_transform(&mut self, index: usize, transform: BoneTransform, propagate: bool) {
        if index >= self.bones.len() {
            return;
        }

        let local = match self.bones[index].parent_id() {
            Some(p) => transform.relative_to(&self.bones[p].local_to_world),
            None => transform,
        };
        let bone = &mut self.bones[index];
        bone.local_to_world = transform;
        bone.local_to_parent = local;
        bone.flags.insert(BoneFlags::WRITTEN);

        if propagate {
            self.update_children_recursive(index);
        } else {
            self.rebase_children(index);
        }
    }
}
