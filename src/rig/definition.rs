//! Rig 定义与索引缓存
//!
//! 配置时一次性把名称解析为索引，之后每帧只按索引访问层次。

use glam::Vec3;

use crate::skeleton::RigHierarchy;
use crate::{ConfigError, Result};

/// 腿部定义：一个 IK 控制点 + 从根到末端的骨骼链
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct LegDef {
    pub ik: String,
    pub bones: Vec<String>,
}

impl LegDef {
    pub fn new<I, S>(ik: impl Into<String>, bones: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            ik: ik.into(),
            bones: bones.into_iter().map(Into::into).collect(),
        }
    }
}

/// 脊柱定义：一个 IK 控制点 + 一根脊柱骨骼
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct SpineDef {
    pub ik: String,
    pub bone: String,
}

impl SpineDef {
    pub fn new(ik: impl Into<String>, bone: impl Into<String>) -> Self {
        Self { ik: ik.into(), bone: bone.into() }
    }
}

/// Rig 变体（决定最少腿数）
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum RigVariant {
    /// 完整多足 rig，至少两条腿
    #[default]
    Full,
    /// 单腿演示 rig
    SingleLeg,
}

impl RigVariant {
    pub fn min_legs(self) -> usize {
        match self {
            RigVariant::Full => 2,
            RigVariant::SingleLeg => 1,
        }
    }
}

/// 解析后的索引
///
/// 腿部索引扁平存储：每条腿依次为 `[ik, 链长, bone_0, .., bone_n]`，
/// `leg_starts[i]` 指向第 i 条腿的 ik 项。
#[derive(Clone, Debug, PartialEq)]
pub struct ResolvedIndices {
    pub spine_ik: usize,
    pub spine_bone: usize,
    /// 脊柱骨骼相对 IK 控制点的初始偏移（配置时计算一次）
    pub spine_ik_offset: Vec3,
    leg_indices: Vec<usize>,
    leg_starts: Vec<usize>,
}

impl ResolvedIndices {
    #[inline]
    pub fn leg_count(&self) -> usize {
        self.leg_starts.len()
    }

    /// 第 i 条腿的 (IK 索引, 骨骼索引)
    pub fn leg(&self, leg: usize) -> Option<(usize, &[usize])> {
        let start = *self.leg_starts.get(leg)?;
        let ik = *self.leg_indices.get(start)?;
        let len = *self.leg_indices.get(start + 1)?;
        let bones = self.leg_indices.get(start + 2..start + 2 + len)?;
        Some((ik, bones))
    }

    pub fn legs(&self) -> impl Iterator<Item = (usize, &[usize])> + '_ {
        (0..self.leg_count()).filter_map(move |i| self.leg(i))
    }

    /// 最长的腿部骨骼链长度
    pub fn max_chain_len(&self) -> usize {
        self.legs().map(|(_, bones)| bones.len()).max().unwrap_or(0)
    }
}

fn resolve_name(hierarchy: &dyn RigHierarchy, role: String, name: &str) -> Result<usize> {
    if name.is_empty() {
        log::error!("[SpiderRig] {} 名称为空", role);
        return Err(ConfigError::EmptyName { role });
    }
    hierarchy.index_of(name).ok_or_else(|| {
        log::error!("[SpiderRig] {} '{}' 在层次中不存在", role, name);
        ConfigError::UnknownElement { role, name: name.to_string() }
    })
}

/// 校验并解析定义
///
/// 任何一项失败都直接返回错误，不产生部分结果。
pub fn resolve(
    hierarchy: &dyn RigHierarchy,
    spine: &SpineDef,
    legs: &[LegDef],
    variant: RigVariant,
) -> Result<ResolvedIndices> {
    let spine_ik = resolve_name(hierarchy, "spine IK".to_string(), &spine.ik)?;
    let spine_bone = resolve_name(hierarchy, "spine bone".to_string(), &spine.bone)?;

    let required = variant.min_legs();
    if legs.len() < required {
        log::error!("[SpiderRig] 腿数不足: {} < {}", legs.len(), required);
        return Err(ConfigError::NotEnoughLegs { found: legs.len(), required });
    }

    let mut leg_indices = Vec::with_capacity(legs.iter().map(|l| l.bones.len() + 2).sum());
    let mut leg_starts = Vec::with_capacity(legs.len());

    for (i, leg) in legs.iter().enumerate() {
        let ik = resolve_name(hierarchy, format!("leg {} IK", i), &leg.ik)?;
        if leg.bones.is_empty() {
            log::error!("[SpiderRig] 腿 {} ('{}') 没有骨骼", i, leg.ik);
            return Err(ConfigError::EmptyLegChain { leg: i });
        }

        leg_starts.push(leg_indices.len());
        leg_indices.push(ik);
        leg_indices.push(leg.bones.len());
        for (k, bone) in leg.bones.iter().enumerate() {
            leg_indices.push(resolve_name(hierarchy, format!("leg {} bone {}", i, k), bone)?);
        }
    }

    let ik_initial = hierarchy.initial_global_transform(spine_ik).translation;
    let bone_initial = hierarchy.initial_global_transform(spine_bone).translation;

    Ok(ResolvedIndices {
        spine_ik,
        spine_bone,
        spine_ik_offset: bone_initial - ik_initial,
        leg_indices,
        leg_starts,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::skeleton::{BoneSet, BoneTransform};

    fn hierarchy() -> BoneSet {
        let mut set = BoneSet::new();
        let root = set.add_bone("root", None, BoneTransform::IDENTITY);
        let spine_ctrl = BoneTransform::from_translation(Vec3::Z * 8.0);
        set.add_control("spine_ctrl", Some(root), spine_ctrl);
        let spine_bone = BoneTransform::from_translation(Vec3::Z * 10.0);
        let spine = set.add_bone("spine", Some(root), spine_bone);
        let hip = set.add_bone("hip", Some(spine), BoneTransform::from_translation(Vec3::X));
        set.add_bone("foot", Some(hip), BoneTransform::from_translation(Vec3::X * 2.0));
        set.add_control("foot_ik", Some(root), BoneTransform::from_translation(Vec3::X * 2.0));
        set
    }

    #[test]
    fn test_resolve_flat_layout() {
        let set = hierarchy();
        let legs = vec![LegDef::new("foot_ik", ["hip", "foot"]), LegDef::new("foot_ik", ["foot"])];
        let resolved = resolve(&set, &SpineDef::new("spine_ctrl", "spine"), &legs, RigVariant::Full)
            .expect("valid definition");

        assert_eq!(resolved.leg_count(), 2);
        assert_eq!(resolved.leg(0), Some((5, &[3usize, 4][..])));
        assert_eq!(resolved.leg(1), Some((5, &[4usize][..])));
        assert_eq!(resolved.leg(2), None);
        assert_eq!(resolved.max_chain_len(), 2);
        assert!((resolved.spine_ik_offset - Vec3::new(0.0, 0.0, 2.0)).length() < 1e-6);
    }

    #[test]
    fn test_resolve_errors() {
        let set = hierarchy();
        let spine = SpineDef::new("spine_ctrl", "spine");
        let leg = LegDef::new("foot_ik", ["hip", "foot"]);
        let empty = LegDef::new("foot_ik", Vec::<String>::new());
        let unknown = LegDef::new("foot_ik", ["hip", "toe"]);

        assert_eq!(
            resolve(&set, &spine, &[], RigVariant::Full),
            Err(ConfigError::NotEnoughLegs { found: 0, required: 2 })
        );
        assert!(resolve(&set, &spine, &[leg.clone()], RigVariant::SingleLeg).is_ok());
        assert_eq!(
            resolve(&set, &spine, &[leg.clone(), empty], RigVariant::Full),
            Err(ConfigError::EmptyLegChain { leg: 1 })
        );
        assert_eq!(
            resolve(
                &set,
                &SpineDef::new("", "spine"),
                &[leg.clone(), leg.clone()],
                RigVariant::Full
            ),
            Err(ConfigError::EmptyName { role: "spine IK".to_string() })
        );
        assert_eq!(
            resolve(&set, &spine, &[leg.clone(), unknown], RigVariant::Full),
            Err(ConfigError::UnknownElement {
                role: "leg 1 bone 1".to_string(),
                name: "toe".to_string()
            })
        );
    }
}
