//! SpiderRig - 多足角色程序化动画核心
//!
//! 每帧驱动脊柱与腿部：
//! - skeleton: 骨骼层次抽象与 CCD IK 求解器
//! - animation: 弹簧插值器与一维曲线
//! - physics: 可调参数、地面探测与世界查询
//! - rig: 配置解析、逐帧更新、特效通知

pub mod animation;
pub mod physics;
pub mod rig;
pub mod skeleton;

use thiserror::Error;

pub use animation::{Curve, SpringInterpolator};
pub use physics::{get_config, set_config, RigConfig, WorldQuery};
pub use rig::{CharacterState, LegDef, RigContext, RigVariant, SpiderRig, SpineDef};
pub use skeleton::{BoneSet, BoneTransform, RigHierarchy};

/// 配置错误
///
/// 唯一会返回给调用方的错误类型。任何一项失败都会让 rig 保持“未就绪”。
#[derive(Debug, Error, Clone, PartialEq)]
pub enum ConfigError {
    #[error("{role} name is empty")]
    EmptyName { role: String },

    #[error("{role} '{name}' not found in hierarchy")]
    UnknownElement { role: String, name: String },

    #[error("not enough legs: found {found}, required {required}")]
    NotEnoughLegs { found: usize, required: usize },

    #[error("leg {leg} has no bones")]
    EmptyLegChain { leg: usize },
}

pub type Result<T> = std::result::Result<T, ConfigError>;
