use glam::Vec3;

/// Parametric strip sampled by the ribbon, `t` in `[0, 1]`.
///
/// Hosts with real surface geometry implement this over their own types.
pub trait StripProvider {
    fn position(&self, t: f32) -> Vec3;

    /// Unit direction of increasing `t`.
    fn tangent(&self, t: f32) -> Vec3;

    fn length(&self) -> f32 {
        const STEPS: usize = 16;
        (0..STEPS)
            .map(|i| {
                let a = self.position(i as f32 / STEPS as f32);
                let b = self.position((i + 1) as f32 / STEPS as f32);
                a.distance(b)
            })
            .sum()
    }
}

/// Straight strip between two points.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LinearStrip {
    pub start: Vec3,
    pub end: Vec3,
}

impl LinearStrip {
    pub fn new(start: Vec3, end: Vec3) -> Self {
        Self { start, end }
    }
}

impl StripProvider for LinearStrip {
    fn position(&self, t: f32) -> Vec3 {
        self.start.lerp(self.end, t)
    }

    fn tangent(&self, _t: f32) -> Vec3 {
        (self.end - self.start).normalize_or_zero()
    }

    fn length(&self) -> f32 {
        self.start.distance(self.end)
    }
}

/// Evenly spaced parameters `k / (count - 1)`, rails included.
pub fn sample_params(count: usize) -> Vec<f32> {
    if count < 2 {
        return vec![0.0; count];
    }
    let last = (count - 1) as f32;
    (0..count).map(|k| k as f32 / last).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn params_include_both_rails() {
        assert_eq!(sample_params(5), vec![0.0, 0.25, 0.5, 0.75, 1.0]);
        assert_eq!(sample_params(2), vec![0.0, 1.0]);
    }

    #[test]
    fn default_length_matches_linear_length() {
        struct Bent;
        impl StripProvider for Bent {
            fn position(&self, t: f32) -> Vec3 {
                Vec3::new(t * 4.0, 0.0, 0.0)
            }
            fn tangent(&self, _t: f32) -> Vec3 {
                Vec3::X
            }
        }
        assert!((Bent.length() - 4.0).abs() < 1e-5);
        assert_eq!(LinearStrip::new(Vec3::ZERO, Vec3::Y * 3.0).length(), 3.0);
    }
}
