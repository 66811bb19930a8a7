use std::f32::consts::TAU;

use crate::{
    config::ParticleConfig,
    mapping::AnimationMode,
    palette::{Palette, Rgb},
    shape::FrameGeometry,
    surface::Point,
};

/// One orbiting point, recomputed from scratch every frame.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Particle {
    pub position: Point,
    pub radius: f32,
    pub alpha: f32,
    pub color: Rgb,
}

/// Orbiting particles around the orb.
///
/// Counts are fixed when the field is built; the mode only selects between
/// the active and idle count.
#[derive(Debug, Clone)]
pub struct ParticleField {
    active_count: usize,
    idle_count: usize,
    drift_speed: f32,
    phase_spread: f32,
    base_size: f32,
}

impl ParticleField {
    pub fn new(config: &ParticleConfig) -> Self {
        Self {
            active_count: config.active_count,
            idle_count: config.idle_count,
            drift_speed: config.drift_speed,
            phase_spread: config.phase_spread,
            base_size: config.base_size.max(0.0),
        }
    }

    pub fn count_for(&self, mode: AnimationMode) -> usize {
        if mode.is_active() {
            self.active_count
        } else {
            self.idle_count
        }
    }

    pub fn particles(
        &self,
        mode: AnimationMode,
        frame: &FrameGeometry,
        palette: &Palette,
    ) -> Vec<Particle> {
        let count = self.count_for(mode);
        if count == 0 || frame.is_empty() {
            return Vec::new();
        }

        let t = frame.elapsed;
        let intensity = frame.intensity;
        (0..count)
            .map(|i| {
                let fi = i as f32;
                let angle = fi / count as f32 * TAU + t * self.drift_speed;
                let distance = frame.base_radius
                    * (1.1 + (t * 0.5 + fi * self.phase_spread).sin() * 0.3 * intensity);
                let size = self.base_size
                    * frame.scale
                    * (1.0 + 0.5 * (t * 1.3 + fi * 1.7).sin())
                    * (0.6 + 0.4 * intensity);
                let alpha = (0.3 + 0.3 * (t * 2.0 + fi * 0.9).sin()) * intensity;

                Particle {
                    position: frame
                        .center
                        .offset(angle.cos() * distance, angle.sin() * distance),
                    radius: size.max(0.0),
                    alpha: alpha.clamp(0.0, 1.0),
                    color: palette.color(i),
                }
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::surface::SurfaceSize;

    fn field() -> ParticleField {
        ParticleField::new(&ParticleConfig::default())
    }

    fn frame(t: f32, intensity: f32) -> FrameGeometry {
        FrameGeometry::new(&SurfaceSize::square(200.0, 1.0), t, intensity, 1.0)
    }

    #[test]
    fn idle_uses_fewer_particles() {
        let f = field();
        assert_eq!(f.count_for(AnimationMode::Speaking), 20);
        assert_eq!(f.count_for(AnimationMode::Listening), 20);
        assert_eq!(f.count_for(AnimationMode::Idle), 12);
    }

    #[test]
    fn particles_orbit_within_distance_band() {
        let f = field();
        let palette = Palette::default();
        for step in 0..50 {
            let geometry = frame(step as f32 * 0.3, 1.0);
            for p in f.particles(AnimationMode::Speaking, &geometry, &palette) {
                let d = p.position.distance(geometry.center);
                assert!(d >= geometry.base_radius * 0.8 - 1e-3);
                assert!(d <= geometry.base_radius * 1.4 + 1e-3);
                assert!((0.0..=0.6).contains(&p.alpha));
                assert!(p.radius > 0.0);
            }
        }
    }

    #[test]
    fn particles_reuse_palette_cyclically() {
        let palette = Palette::default();
        let particles = field().particles(AnimationMode::Speaking, &frame(0.0, 1.0), &palette);
        assert_eq!(particles[7].color, palette.color(1));
        assert_eq!(particles[0].color, particles[6].color);
    }

    #[test]
    fn zero_intensity_hides_particles() {
        let particles = field().particles(
            AnimationMode::Idle,
            &frame(4.0, 0.0),
            &Palette::default(),
        );
        assert!(particles.iter().all(|p| p.alpha == 0.0));
    }

    #[test]
    fn particles_are_pure_functions_of_time() {
        let f = field();
        let palette = Palette::default();
        let geometry = frame(1.75, 0.9);
        assert_eq!(
            f.particles(AnimationMode::Listening, &geometry, &palette),
            f.particles(AnimationMode::Listening, &geometry, &palette)
        );
    }
}
