//! 动画系统
//!
//! - spring: 矢量弹簧插值器（脊柱平滑）
//! - bezier_curve / gait_curve: 一维曲线查找（步态相位 -> 系数）

mod bezier_curve;
mod gait_curve;
mod spring;

pub use bezier_curve::{BezierCurve, Curve};
pub use gait_curve::KeyedCurve;
pub use spring::SpringInterpolator;
