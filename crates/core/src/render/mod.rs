use crate::{
    palette::{Palette, Rgb},
    particles::Particle,
    shape::{FrameGeometry, LayerShape, Outline},
    surface::{Canvas, Paint, Point, RadialGradient, SurfaceSize},
};

/// Glow radius relative to the orb base radius.
const GLOW_RADIUS: f32 = 2.2;
const GLOW_ALPHA: f32 = 0.18;
const CORE_RADIUS: f32 = 0.35;
const CORE_ALPHA: f32 = 0.9;
const HIGHLIGHT_RADIUS: f32 = 0.18;
const HIGHLIGHT_OFFSET: (f32, f32) = (-0.25, -0.3);
const HIGHLIGHT_ALPHA: f32 = 0.55;
/// Gradient centre wander relative to a layer's extent.
const GRADIENT_DRIFT: f32 = 0.2;

/// Everything the compositor needs for one frame.
#[derive(Debug, Clone, Copy)]
pub struct FrameInput<'a> {
    pub size: &'a SurfaceSize,
    pub geometry: &'a FrameGeometry,
    pub layers: &'a [LayerShape],
    pub particles: &'a [Particle],
    pub palette: &'a Palette,
}

/// Paints one frame in fixed order: clear, glow, layers, core, highlight,
/// particles. The device pixel ratio is applied for the duration of the
/// frame and reset afterwards.
#[derive(Debug, Clone, Default)]
pub struct Compositor;

impl Compositor {
    pub fn new() -> Self {
        Self
    }

    /// Blur for a layer, in logical pixels; grows with the layer index.
    pub fn layer_blur(index: usize, scale: f32) -> f32 {
        (2.0 + 3.0 * index as f32) * scale
    }

    pub fn draw<C: Canvas + ?Sized>(&self, canvas: &mut C, frame: &FrameInput<'_>) {
        canvas.clear();
        if !frame.size.is_drawable() || frame.geometry.is_empty() {
            return;
        }

        canvas.set_scale(frame.size.device_pixel_ratio);

        let geometry = frame.geometry;
        self.paint_glow(canvas, geometry, frame.palette);
        for layer in frame.layers {
            self.paint_layer(canvas, geometry, layer, frame.palette);
        }
        self.paint_core(canvas, geometry, frame.palette);
        self.paint_highlight(canvas, geometry);
        for particle in frame.particles {
            if particle.alpha > 0.0 && particle.radius > 0.0 {
                canvas.fill_circle(
                    particle.position,
                    particle.radius,
                    &Paint::Solid(particle.color.with_alpha(particle.alpha)),
                );
            }
        }

        canvas.reset_transform();
    }

    fn paint_glow<C: Canvas + ?Sized>(
        &self,
        canvas: &mut C,
        geometry: &FrameGeometry,
        palette: &Palette,
    ) {
        let color = palette.color(0);
        let radius = geometry.base_radius * GLOW_RADIUS;
        let alpha = GLOW_ALPHA * geometry.intensity;
        let gradient = RadialGradient::new(geometry.center, radius)
            .stop(0.0, color.with_alpha(alpha))
            .stop(0.5, color.with_alpha(alpha * 0.35))
            .stop(1.0, color.with_alpha(0.0));
        canvas.fill_circle(geometry.center, radius, &Paint::Radial(gradient));
    }

    fn paint_layer<C: Canvas + ?Sized>(
        &self,
        canvas: &mut C,
        geometry: &FrameGeometry,
        layer: &LayerShape,
        palette: &Palette,
    ) {
        let config = palette.layer(layer.index);
        let alpha = config.base_opacity * geometry.intensity;

        match &layer.outline {
            Outline::Closed(points) => {
                let t = geometry.elapsed;
                let i = layer.index as f32;
                let drift = layer.extent * GRADIENT_DRIFT;
                let center = geometry.center.offset(
                    (t * 0.5 + i * 0.8).sin() * drift,
                    (t * 0.4 + i * 1.1).cos() * drift,
                );
                let gradient = RadialGradient::new(center, layer.extent * 1.3)
                    .stop(0.0, config.color.with_alpha(alpha))
                    .stop(0.6, config.color.with_alpha(alpha * 0.6))
                    .stop(1.0, config.color.with_alpha(0.0));
                canvas.fill_polygon(
                    points,
                    &Paint::Radial(gradient),
                    Self::layer_blur(layer.index, geometry.scale),
                );
            }
            Outline::Open(points) => {
                let width = (2.5 - 0.3 * layer.index as f32).max(1.0) * geometry.scale;
                let stroke_alpha = (alpha + 0.3 * geometry.intensity).min(1.0);
                let paint = Paint::Solid(config.color.with_alpha(stroke_alpha));
                canvas.stroke_polyline(points, width, &paint);
            }
        }
    }

    fn paint_core<C: Canvas + ?Sized>(
        &self,
        canvas: &mut C,
        geometry: &FrameGeometry,
        palette: &Palette,
    ) {
        let radius = geometry.base_radius * CORE_RADIUS;
        let tint = palette.color(0);
        let gradient = RadialGradient::new(geometry.center, radius)
            .stop(0.0, Rgb::WHITE.with_alpha(CORE_ALPHA * geometry.intensity))
            .stop(0.4, tint.with_alpha(0.5 * geometry.intensity))
            .stop(1.0, tint.with_alpha(0.0));
        canvas.fill_circle(geometry.center, radius, &Paint::Radial(gradient));
    }

    fn paint_highlight<C: Canvas + ?Sized>(&self, canvas: &mut C, geometry: &FrameGeometry) {
        let base = geometry.base_radius;
        let center: Point = geometry
            .center
            .offset(HIGHLIGHT_OFFSET.0 * base, HIGHLIGHT_OFFSET.1 * base);
        let radius = base * HIGHLIGHT_RADIUS;
        let gradient = RadialGradient::new(center, radius)
            .stop(0.0, Rgb::WHITE.with_alpha(HIGHLIGHT_ALPHA * geometry.intensity))
            .stop(1.0, Rgb::WHITE.with_alpha(0.0));
        canvas.fill_circle(center, radius, &Paint::Radial(gradient));
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        config::ParticleConfig,
        mapping::AnimationMode,
        particles::ParticleField,
        shape::{NoiseBlobGenerator, ShapeGenerator, WaveformGenerator},
        surface::{
            recording::{DrawCall, RecordingCanvas},
            PixelCanvas,
        },
    };

    struct Scene {
        size: SurfaceSize,
        geometry: FrameGeometry,
        layers: Vec<LayerShape>,
        particles: Vec<Particle>,
        palette: Palette,
    }

    impl Scene {
        fn new(size: SurfaceSize, intensity: f32, generator: &dyn ShapeGenerator) -> Self {
            let palette = Palette::default();
            let geometry = FrameGeometry::new(&size, 1.5, intensity, 1.0);
            let layers = generator.generate(&geometry, &palette);
            let particles = ParticleField::new(&ParticleConfig::default()).particles(
                AnimationMode::Speaking,
                &geometry,
                &palette,
            );
            Self {
                size,
                geometry,
                layers,
                particles,
                palette,
            }
        }

        fn input(&self) -> FrameInput<'_> {
            FrameInput {
                size: &self.size,
                geometry: &self.geometry,
                layers: &self.layers,
                particles: &self.particles,
                palette: &self.palette,
            }
        }
    }

    fn blob() -> NoiseBlobGenerator {
        NoiseBlobGenerator::new(6, 64, 0.12)
    }

    #[test]
    fn paints_in_fixed_order() {
        let scene = Scene::new(SurfaceSize::square(200.0, 2.0), 1.0, &blob());
        let mut canvas = RecordingCanvas::default();
        Compositor::new().draw(&mut canvas, &scene.input());

        let calls = &canvas.calls;
        assert_eq!(calls[0], DrawCall::Clear);
        assert_eq!(calls[1], DrawCall::SetScale(2.0));
        assert!(matches!(calls[2], DrawCall::Circle { .. }), "glow");
        for call in &calls[3..9] {
            assert!(matches!(call, DrawCall::Polygon { vertices: 64, .. }));
        }
        assert!(matches!(calls[9], DrawCall::Circle { .. }), "core");
        assert!(matches!(calls[10], DrawCall::Circle { .. }), "highlight");
        assert_eq!(calls.last(), Some(&DrawCall::ResetTransform));
        assert_eq!(
            calls.iter().filter(|c| matches!(c, DrawCall::SetScale(_))).count(),
            1
        );
        // Particles come last, right before the reset.
        let visible = scene.particles.iter().filter(|p| p.alpha > 0.0).count();
        assert_eq!(canvas.paint_calls(), 1 + 6 + 2 + visible);
    }

    #[test]
    fn layer_blur_grows_with_index() {
        let scene = Scene::new(SurfaceSize::square(200.0, 1.0), 1.0, &blob());
        let mut canvas = RecordingCanvas::default();
        Compositor::new().draw(&mut canvas, &scene.input());

        let blurs: Vec<f32> = canvas
            .calls
            .iter()
            .filter_map(|c| match c {
                DrawCall::Polygon { blur, .. } => Some(*blur),
                _ => None,
            })
            .collect();
        // Painted back to front, so the blurriest layer comes first.
        assert!(blurs.windows(2).all(|w| w[0] > w[1]));
        assert_eq!(*blurs.last().unwrap(), Compositor::layer_blur(0, 1.0));
    }

    #[test]
    fn layer_gradient_drifts_with_time() {
        let generator = blob();
        let gradient_centre = |elapsed: f32| {
            let mut scene = Scene::new(SurfaceSize::square(200.0, 1.0), 1.0, &generator);
            scene.geometry = FrameGeometry::new(&scene.size, elapsed, 1.0, 1.0);
            scene.layers = generator.generate(&scene.geometry, &scene.palette);

            let mut canvas = RecordingCanvas::default();
            Compositor::new().draw(&mut canvas, &scene.input());
            canvas
                .calls
                .iter()
                .find_map(|c| match c {
                    DrawCall::Polygon {
                        paint: Paint::Radial(gradient),
                        ..
                    } => Some(gradient.center),
                    _ => None,
                })
                .unwrap()
        };

        let early = gradient_centre(0.5);
        let late = gradient_centre(3.0);
        assert!(early.distance(late) > 0.5, "{early:?} vs {late:?}");
        assert_eq!(gradient_centre(0.5), early);
    }

    #[test]
    fn waveform_layers_are_stroked() {
        let scene = Scene::new(SurfaceSize::square(120.0, 1.0), 1.0, &WaveformGenerator::new(4));
        let mut canvas = RecordingCanvas::default();
        Compositor::new().draw(&mut canvas, &scene.input());

        let strokes = canvas
            .calls
            .iter()
            .filter(|c| matches!(c, DrawCall::Stroke { vertices: 121, .. }))
            .count();
        assert_eq!(strokes, 4);
    }

    #[test]
    fn invalid_size_only_clears() {
        let scene = Scene::new(SurfaceSize::square(0.0, 1.0), 1.0, &blob());
        let mut canvas = RecordingCanvas::default();
        Compositor::new().draw(&mut canvas, &scene.input());
        assert_eq!(canvas.calls, vec![DrawCall::Clear]);
    }

    #[test]
    fn alpha_follows_intensity() {
        let scene = Scene::new(SurfaceSize::square(200.0, 1.0), 0.0, &blob());
        let mut canvas = RecordingCanvas::default();
        Compositor::new().draw(&mut canvas, &scene.input());

        let glow = canvas
            .calls
            .iter()
            .find_map(|c| match c {
                DrawCall::Circle { paint, center, .. } => Some(paint.color_at(*center)),
                _ => None,
            })
            .unwrap();
        assert_eq!(glow.a, 0.0);
    }

    #[test]
    fn rasterises_visible_orb() {
        let scene = Scene::new(SurfaceSize::square(64.0, 1.0), 1.0, &blob());
        let mut canvas = PixelCanvas::new(64, 64);
        Compositor::new().draw(&mut canvas, &scene.input());

        let center = canvas.pixel(32, 32).unwrap();
        assert!(center.a > 0.5);
        assert!(canvas.pixel(0, 0).unwrap().a < 0.05);
        assert_eq!(canvas.scale(), 1.0);
    }
}
