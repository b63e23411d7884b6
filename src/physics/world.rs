//! 世界查询接口
//!
//! rig 只需要一种查询：球体扫掠。宿主可以用任意物理后端实现。

use glam::Vec3;

/// 物体标识（宿主定义，rig 只用于忽略自身）
pub type BodyId = u64;

/// 扫掠时需要忽略的物体集合
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct IgnoreSet {
    ids: Vec<BodyId>,
}

impl IgnoreSet {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn single(id: BodyId) -> Self {
        Self { ids: vec![id] }
    }

    pub fn insert(&mut self, id: BodyId) {
        if !self.ids.contains(&id) {
            self.ids.push(id);
        }
    }

    #[inline]
    pub fn contains(&self, id: BodyId) -> bool {
        self.ids.contains(&id)
    }

    pub fn clear(&mut self) {
        self.ids.clear();
    }

    pub fn is_empty(&self) -> bool {
        self.ids.is_empty()
    }
}

/// 世界查询
pub trait WorldQuery {
    /// 球体从 `origin` 扫掠到 `end`，返回首次接触时的球心位置
    fn sweep_sphere(
        &self,
        origin: Vec3,
        end: Vec3,
        radius: f32,
        ignore: &IgnoreSet,
    ) -> Option<Vec3>;
}

impl<F> WorldQuery for F
where
    F: Fn(Vec3, Vec3, f32, &IgnoreSet) -> Option<Vec3>,
{
    fn sweep_sphere(
        &self,
        origin: Vec3,
        end: Vec3,
        radius: f32,
        ignore: &IgnoreSet,
    ) -> Option<Vec3> {
        self(origin, end, radius, ignore)
    }
}

/// 无限大水平地面（Z 向上，单面：只能从上方命中）
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct FlatGround {
    pub height: f32,
    pub body_id: BodyId,
}

impl FlatGround {
    pub fn new(height: f32) -> Self {
        Self { height, body_id: 0 }
    }
}

impl WorldQuery for FlatGround {
    fn sweep_sphere(
        &self,
        origin: Vec3,
        end: Vec3,
        radius: f32,
        ignore: &IgnoreSet,
    ) -> Option<Vec3> {
        if ignore.contains(self.body_id) {
            return None;
        }

        // 球心触地高度
        let contact_z = self.height + radius.max(0.0);
        if origin.z <= contact_z || end.z >= origin.z || end.z > contact_z {
            return None;
        }

        let t = (origin.z - contact_z) / (origin.z - end.z);
        Some(origin + (end - origin) * t)
    }
}
