//! 关键帧曲线与默认步态曲线
//!
//! 步态周期内每条腿由两条曲线驱动：
//! - 贴地系数：1 = 脚固定在地面，0 = 脚自由摆动
//! - 抬腿偏移：乘以抬腿高度得到脚离地距离

use super::bezier_curve::Curve;

/// 分段线性关键帧曲线
#[derive(Debug, Clone, PartialEq)]
pub struct KeyedCurve {
    /// (时间, 值)，按时间升序
    keys: Vec<(f32, f32)>,
    /// 周期曲线：输入按 [0, 1) 取模
    cyclic: bool,
}

impl KeyedCurve {
    /// 由关键帧创建曲线，关键帧会按时间排序
    pub fn new(mut keys: Vec<(f32, f32)>, cyclic: bool) -> Self {
        keys.retain(|(t, v)| t.is_finite() && v.is_finite());
        keys.sort_by(|a, b| a.0.total_cmp(&b.0));
        Self { keys, cyclic }
    }

    /// 常量曲线
    pub fn constant(value: f32) -> Self {
        Self::new(vec![(0.0, value)], false)
    }

    /// 默认贴地曲线：周期前 65% 着地，之后摆动，周期末重新落地
    pub fn default_stick() -> Self {
        Self::new(
            vec![(0.0, 1.0), (0.65, 1.0), (0.7, 0.0), (0.95, 0.0), (1.0, 1.0)],
            true,
        )
    }

    /// 默认抬腿曲线：摆动阶段的抬腿弧线
    pub fn default_offset() -> Self {
        Self::new(
            vec![(0.0, 0.0), (0.65, 0.0), (0.8, 1.0), (0.95, 0.0), (1.0, 0.0)],
            true,
        )
    }
}

impl Curve for KeyedCurve {
    fn value(&self, v: f32) -> f32 {
        let (first, last) = match (self.keys.first(), self.keys.last()) {
            (Some(first), Some(last)) => (*first, *last),
            _ => return 0.0,
        };
        let v = if self.cyclic { v.rem_euclid(1.0) } else { v };

        if v <= first.0 {
            return first.1;
        }
        if v >= last.0 {
            return last.1;
        }

        let upper = self.keys.partition_point(|(t, _)| *t <= v);
        let (t0, v0) = self.keys[upper - 1];
        let (t1, v1) = self.keys[upper];
        if t1 <= t0 {
            v0
        } else {
            v0 + (v1 - v0) * (v - t0) / (t1 - t0)
        }
    }
}
