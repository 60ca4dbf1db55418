//! Grid raycast for block targeting.
//!
//! Amanatides & Woo DDA over world block coordinates. The query closure
//! reports loaded blocks; unloaded space reads as empty so rays simply
//! pass through it until `max_dist`.

use glam::{IVec3, Vec3};
use voxel_grid::{BlockId, AIR};

/// Result of a targeting raycast.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct TargetHit {
    /// First solid block along the ray.
    pub block: IVec3,
    /// Its block id.
    pub id: BlockId,
    /// The empty cell the ray crossed last; where a placement would go.
    pub place: IVec3,
}

pub(crate) fn raycast(
    origin: Vec3,
    dir: Vec3,
    max_dist: f32,
    block_at: impl Fn(IVec3) -> Option<BlockId>,
) -> Option<TargetHit> {
    if dir.length_squared() <= 1.0e-8 {
        return None;
    }
    let d = dir.normalize();

    let mut block = IVec3::new(
        origin.x.floor() as i32,
        origin.y.floor() as i32,
        origin.z.floor() as i32,
    );

    let step = IVec3::new(signum_step(d.x), signum_step(d.y), signum_step(d.z));

    let next_boundary = |p: f32, s: i32| -> f32 {
        let f = p - p.floor();
        if s > 0 {
            1.0 - f
        } else {
            f
        }
    };
    let mut t_max = Vec3::new(
        axis_t(next_boundary(origin.x, step.x), d.x),
        axis_t(next_boundary(origin.y, step.y), d.y),
        axis_t(next_boundary(origin.z, step.z), d.z),
    );
    let t_delta = Vec3::new(inv_abs(d.x), inv_abs(d.y), inv_abs(d.z));

    let mut t = 0.0_f32;
    while t <= max_dist {
        let prev = block;
        if t_max.x <= t_max.y && t_max.x <= t_max.z {
            t = t_max.x;
            t_max.x += t_delta.x;
            block.x += step.x;
        } else if t_max.y <= t_max.z {
            t = t_max.y;
            t_max.y += t_delta.y;
            block.y += step.y;
        } else {
            t = t_max.z;
            t_max.z += t_delta.z;
            block.z += step.z;
        }
        if t > max_dist {
            break;
        }
        match block_at(block) {
            Some(id) if id != AIR => {
                return Some(TargetHit {
                    block,
                    id,
                    place: prev,
                });
            }
            _ => {}
        }
    }
    None
}

#[inline]
fn signum_step(v: f32) -> i32 {
    if v > 0.0 {
        1
    } else if v < 0.0 {
        -1
    } else {
        0
    }
}

#[inline]
fn axis_t(frac: f32, v: f32) -> f32 {
    if v == 0.0 {
        f32::INFINITY
    } else {
        frac / v.abs()
    }
}

#[inline]
fn inv_abs(v: f32) -> f32 {
    if v == 0.0 {
        f32::INFINITY
    } else {
        1.0 / v.abs()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use voxel_grid::STONE;

    fn ground(block: IVec3) -> Option<BlockId> {
        if block.y <= 0 {
            Some(STONE)
        } else {
            Some(AIR)
        }
    }

    #[test]
    fn straight_down_hits_the_ground() {
        let hit = raycast(
            Vec3::new(8.5, 5.0, 8.5),
            Vec3::new(0.0, -1.0, 0.0),
            16.0,
            ground,
        )
        .expect("ground within range");
        assert_eq!(hit.block, IVec3::new(8, 0, 8));
        assert_eq!(hit.id, STONE);
        assert_eq!(hit.place, IVec3::new(8, 1, 8));
    }

    #[test]
    fn upward_ray_misses() {
        assert_eq!(
            raycast(Vec3::new(0.5, 5.0, 0.5), Vec3::Y, 64.0, ground),
            None
        );
    }

    #[test]
    fn range_bounds_the_march() {
        assert_eq!(
            raycast(Vec3::new(0.5, 50.0, 0.5), Vec3::NEG_Y, 10.0, ground),
            None
        );
    }

    #[test]
    fn zero_direction_is_rejected() {
        assert_eq!(raycast(Vec3::ZERO, Vec3::ZERO, 8.0, ground), None);
    }

    #[test]
    fn diagonal_ray_reports_the_crossed_face() {
        // Single solid block at (2, 0, 2); approach along x first.
        let single = |b: IVec3| {
            if b == IVec3::new(2, 0, 2) {
                Some(STONE)
            } else {
                Some(AIR)
            }
        };
        let hit = raycast(
            Vec3::new(0.5, 0.5, 2.5),
            Vec3::new(1.0, 0.0, 0.0),
            8.0,
            single,
        )
        .expect("block in path");
        assert_eq!(hit.block, IVec3::new(2, 0, 2));
        assert_eq!(hit.place, IVec3::new(1, 0, 2));
    }

    #[test]
    fn unloaded_space_reads_as_empty() {
        let hit = raycast(Vec3::new(0.5, 0.5, 0.5), Vec3::X, 8.0, |_| None);
        assert_eq!(hit, None);
    }
}
