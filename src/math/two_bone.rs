use glam::Vec3;

use super::EPSILON;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TwoBoneSolution {
    pub mid: Vec3,
    pub end: Vec3,
}

/// Law-of-cosines solve of a two-segment chain in the plane spanned by the
/// root→target line and the pole.
///
/// The reach is clamped to `[|upper - lower|, upper + lower]`, so the end can
/// fall short of the target but the mid position is always valid.
pub fn two_bone_mid_position(
    root: Vec3,
    target: Vec3,
    pole: Vec3,
    upper: f32,
    lower: f32,
) -> TwoBoneSolution {
    let upper = upper.max(0.0);
    let lower = lower.max(0.0);

    let to_target = target - root;
    let raw_distance = to_target.length();
    let to_pole = pole - root;
    let direction = if raw_distance > EPSILON {
        to_target / raw_distance
    } else if to_pole.length_squared() > EPSILON {
        to_pole.normalize()
    } else {
        Vec3::X
    };

    let distance = raw_distance.clamp((upper - lower).abs(), upper + lower);

    let planar = to_pole - direction * to_pole.dot(direction);
    let pole_dir = if planar.length_squared() > EPSILON {
        planar.normalize()
    } else {
        direction.any_orthonormal_vector()
    };

    let denom = 2.0 * upper * distance;
    let cos_angle = if denom > EPSILON {
        ((distance * distance + upper * upper - lower * lower) / denom).clamp(-1.0, 1.0)
    } else {
        1.0
    };
    let sin_angle = (1.0 - cos_angle * cos_angle).max(0.0).sqrt();

    TwoBoneSolution {
        mid: root + direction * (upper * cos_angle) + pole_dir * (upper * sin_angle),
        end: root + direction * distance,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn reachable_target_keeps_segment_lengths() {
        let root = Vec3::ZERO;
        let target = Vec3::new(6.0, 0.0, 0.0);
        let pole = Vec3::new(3.0, 0.0, -5.0);
        let solution = two_bone_mid_position(root, target, pole, 5.0, 5.0);

        assert!((solution.mid.distance(root) - 5.0).abs() < 1e-4);
        assert!((solution.mid.distance(target) - 5.0).abs() < 1e-4);
        assert!(solution.mid.z < 0.0);
        assert!(solution.end.abs_diff_eq(target, 1e-5));
    }

    #[test]
    fn unreachable_target_straightens_the_chain() {
        let solution = two_bone_mid_position(
            Vec3::ZERO,
            Vec3::new(20.0, 0.0, 0.0),
            Vec3::new(0.0, 0.0, -1.0),
            5.0,
            5.0,
        );
        assert!(solution.mid.abs_diff_eq(Vec3::new(5.0, 0.0, 0.0), 1e-4));
        assert!(solution.end.abs_diff_eq(Vec3::new(10.0, 0.0, 0.0), 1e-4));
    }
}
