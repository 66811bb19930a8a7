use image::{Rgba as ImageRgba, RgbaImage};

use super::{Canvas, Paint, Point};
use crate::palette::Rgba;

/// Vertical sub-scanlines per pixel row for polygon and circle coverage.
const SUBSAMPLES: usize = 4;
/// Three box passes approximate a gaussian.
const BLUR_PASSES: usize = 3;
const MIN_COVERAGE: f32 = 1e-4;

/// Software canvas over a premultiplied `f32` RGBA buffer.
#[derive(Debug, Clone)]
pub struct PixelCanvas {
    width: u32,
    height: u32,
    scale: f32,
    pixels: Vec<[f32; 4]>,
    draw_calls: u64,
}

impl PixelCanvas {
    pub fn new(width: u32, height: u32) -> Self {
        Self {
            width,
            height,
            scale: 1.0,
            pixels: vec![[0.0; 4]; width as usize * height as usize],
            draw_calls: 0,
        }
    }

    pub fn width(&self) -> u32 {
        self.width
    }

    pub fn height(&self) -> u32 {
        self.height
    }

    pub fn scale(&self) -> f32 {
        self.scale
    }

    /// Number of fill/stroke calls that touched the buffer since creation.
    pub fn draw_calls(&self) -> u64 {
        self.draw_calls
    }

    /// Straight-alpha colour of a physical pixel.
    pub fn pixel(&self, x: u32, y: u32) -> Option<Rgba> {
        if x >= self.width || y >= self.height {
            return None;
        }
        let [r, g, b, a] = self.pixels[(y * self.width + x) as usize];
        if a <= 0.0 {
            return Some(Rgba::TRANSPARENT);
        }
        Some(Rgba {
            r: r / a,
            g: g / a,
            b: b / a,
            a,
        })
    }

    /// Sum of alpha over the whole buffer; zero for a cleared canvas.
    pub fn total_alpha(&self) -> f32 {
        self.pixels.iter().map(|p| p[3]).sum()
    }

    /// 8-bit, un-premultiplied copy of the buffer.
    pub fn to_image(&self) -> RgbaImage {
        RgbaImage::from_fn(self.width, self.height, |x, y| {
            let [r, g, b, a] = self.pixels[(y * self.width + x) as usize];
            if a <= 0.0 {
                return ImageRgba([0, 0, 0, 0]);
            }
            ImageRgba([
                to_byte(r / a),
                to_byte(g / a),
                to_byte(b / a),
                to_byte(a),
            ])
        })
    }

    fn to_physical(&self, point: Point) -> Point {
        Point::new(point.x * self.scale, point.y * self.scale)
    }

    /// Allocates a mask covering `[min, max]` plus `pad`, clipped to the buffer.
    fn mask_for(&self, min: Point, max: Point, pad: f32) -> Option<Mask> {
        if self.width == 0 || self.height == 0 {
            return None;
        }
        let x0 = ((min.x - pad).floor().max(0.0)) as i64;
        let y0 = ((min.y - pad).floor().max(0.0)) as i64;
        let x1 = ((max.x + pad).ceil() as i64).min(self.width as i64);
        let y1 = ((max.y + pad).ceil() as i64).min(self.height as i64);
        if x1 <= x0 || y1 <= y0 {
            return None;
        }
        Some(Mask::new(
            x0 as usize,
            y0 as usize,
            (x1 - x0) as usize,
            (y1 - y0) as usize,
        ))
    }

    fn composite(&mut self, mask: &Mask, paint: &Paint) {
        let inv_scale = 1.0 / self.scale;
        for my in 0..mask.height {
            let py = mask.y0 + my;
            for mx in 0..mask.width {
                let coverage = mask.data[my * mask.width + mx].min(1.0);
                if coverage <= MIN_COVERAGE {
                    continue;
                }
                let px = mask.x0 + mx;
                let logical = Point::new(
                    (px as f32 + 0.5) * inv_scale,
                    (py as f32 + 0.5) * inv_scale,
                );
                let color = paint.color_at(logical);
                let alpha = color.a * coverage;
                if alpha <= 0.0 {
                    continue;
                }
                let dst = &mut self.pixels[py * self.width as usize + px];
                let keep = 1.0 - alpha;
                dst[0] = color.r * alpha + dst[0] * keep;
                dst[1] = color.g * alpha + dst[1] * keep;
                dst[2] = color.b * alpha + dst[2] * keep;
                dst[3] = alpha + dst[3] * keep;
            }
        }
        self.draw_calls += 1;
    }
}

impl Canvas for PixelCanvas {
    fn physical_size(&self) -> (u32, u32) {
        (self.width, self.height)
    }

    fn resize(&mut self, width: u32, height: u32) {
        self.width = width;
        self.height = height;
        self.pixels = vec![[0.0; 4]; width as usize * height as usize];
    }

    fn clear(&mut self) {
        self.pixels.fill([0.0; 4]);
    }

    fn set_scale(&mut self, factor: f32) {
        self.scale = if factor.is_finite() && factor > 0.0 {
            factor
        } else {
            1.0
        };
    }

    fn reset_transform(&mut self) {
        self.scale = 1.0;
    }

    fn fill_circle(&mut self, center: Point, radius: f32, paint: &Paint) {
        if !radius.is_finite() || radius <= 0.0 || !is_finite(center) {
            return;
        }
        let c = self.to_physical(center);
        let r = radius * self.scale;
        let Some(mut mask) = self.mask_for(c.offset(-r, -r), c.offset(r, r), 1.0) else {
            return;
        };

        mask.rasterize(|y, spans| {
            let dy = y - c.y;
            if dy.abs() < r {
                let half = (r * r - dy * dy).sqrt();
                spans.push((c.x - half, c.x + half));
            }
        });
        self.composite(&mask, paint);
    }

    fn fill_polygon(&mut self, points: &[Point], paint: &Paint, blur: f32) {
        if points.len() < 3 || !points.iter().copied().all(is_finite) {
            return;
        }
        let physical: Vec<Point> = points.iter().map(|p| self.to_physical(*p)).collect();
        let (min, max) = bounds(&physical);
        let radius = if blur.is_finite() && blur > 0.0 {
            (blur * self.scale).round() as usize
        } else {
            0
        };
        let pad = (radius * BLUR_PASSES) as f32 + 1.0;
        let Some(mut mask) = self.mask_for(min, max, pad) else {
            return;
        };

        mask.rasterize(|y, spans| {
            let mut crossings: Vec<f32> = Vec::new();
            for (index, a) in physical.iter().enumerate() {
                let b = physical[(index + 1) % physical.len()];
                if (a.y <= y) != (b.y <= y) {
                    crossings.push(a.x + (y - a.y) / (b.y - a.y) * (b.x - a.x));
                }
            }
            crossings.sort_by(|l, r| l.total_cmp(r));
            for pair in crossings.chunks_exact(2) {
                spans.push((pair[0], pair[1]));
            }
        });

        if radius > 0 {
            mask.blur(radius);
        }
        self.composite(&mask, paint);
    }

    fn stroke_polyline(&mut self, points: &[Point], width: f32, paint: &Paint) {
        if points.is_empty() || !width.is_finite() || width <= 0.0 {
            return;
        }
        if !points.iter().copied().all(is_finite) {
            return;
        }
        let physical: Vec<Point> = points.iter().map(|p| self.to_physical(*p)).collect();
        let half = (width * self.scale * 0.5).max(0.5);
        let (min, max) = bounds(&physical);
        let Some(mut mask) = self.mask_for(min, max, half + 1.0) else {
            return;
        };

        let segments: Vec<(Point, Point)> = if physical.len() == 1 {
            vec![(physical[0], physical[0])]
        } else {
            physical.windows(2).map(|w| (w[0], w[1])).collect()
        };

        for (a, b) in segments {
            mask.stamp_capsule(a, b, half);
        }
        self.composite(&mask, paint);
    }
}

/// Coverage accumulator for one draw call, in physical pixels.
struct Mask {
    x0: usize,
    y0: usize,
    width: usize,
    height: usize,
    data: Vec<f32>,
}

impl Mask {
    fn new(x0: usize, y0: usize, width: usize, height: usize) -> Self {
        Self {
            x0,
            y0,
            width,
            height,
            data: vec![0.0; width * height],
        }
    }

    /// Calls `spans_at(y, spans)` for every sub-scanline and accumulates the
    /// returned `[x_start, x_end)` spans (absolute physical coordinates).
    fn rasterize<F>(&mut self, mut spans_at: F)
    where
        F: FnMut(f32, &mut Vec<(f32, f32)>),
    {
        let weight = 1.0 / SUBSAMPLES as f32;
        let mut spans = Vec::new();
        for row in 0..self.height {
            for sub in 0..SUBSAMPLES {
                let y = (self.y0 + row) as f32 + (sub as f32 + 0.5) * weight;
                spans.clear();
                spans_at(y, &mut spans);
                for &(start, end) in &spans {
                    self.accumulate_span(row, start - self.x0 as f32, end - self.x0 as f32, weight);
                }
            }
        }
    }

    fn accumulate_span(&mut self, row: usize, start: f32, end: f32, weight: f32) {
        let limit = self.width as f32;
        let start = start.clamp(0.0, limit);
        let end = end.clamp(0.0, limit);
        if end <= start {
            return;
        }

        let width = self.width;
        let line = &mut self.data[row * width..(row + 1) * width];
        let first = start.floor() as usize;
        let last = end.floor() as usize;
        if first == last {
            line[first.min(width - 1)] += (end - start) * weight;
            return;
        }

        line[first] += (first as f32 + 1.0 - start) * weight;
        for cell in &mut line[first + 1..last] {
            *cell += weight;
        }
        if last < width {
            line[last] += (end - last as f32) * weight;
        }
    }

    fn stamp_capsule(&mut self, a: Point, b: Point, half: f32) {
        let reach = half + 1.0;
        let min_x = (a.x.min(b.x) - reach - self.x0 as f32).floor().max(0.0) as usize;
        let min_y = (a.y.min(b.y) - reach - self.y0 as f32).floor().max(0.0) as usize;
        let max_x = ((a.x.max(b.x) + reach - self.x0 as f32).ceil().max(0.0) as usize)
            .min(self.width);
        let max_y = ((a.y.max(b.y) + reach - self.y0 as f32).ceil().max(0.0) as usize)
            .min(self.height);

        for my in min_y..max_y {
            for mx in min_x..max_x {
                let p = Point::new(
                    (self.x0 + mx) as f32 + 0.5,
                    (self.y0 + my) as f32 + 0.5,
                );
                let coverage = (half + 0.5 - distance_to_segment(p, a, b)).clamp(0.0, 1.0);
                let cell = &mut self.data[my * self.width + mx];
                if coverage > *cell {
                    *cell = coverage;
                }
            }
        }
    }

    fn blur(&mut self, radius: usize) {
        let mut line = Vec::new();
        let mut out = Vec::new();
        for _ in 0..BLUR_PASSES {
            for row in 0..self.height {
                line.clear();
                line.extend_from_slice(&self.data[row * self.width..(row + 1) * self.width]);
                out.resize(line.len(), 0.0);
                box_blur_line(&line, &mut out, radius);
                self.data[row * self.width..(row + 1) * self.width].copy_from_slice(&out);
            }
            for col in 0..self.width {
                line.clear();
                line.extend((0..self.height).map(|row| self.data[row * self.width + col]));
                out.resize(line.len(), 0.0);
                box_blur_line(&line, &mut out, radius);
                for (row, value) in out.iter().enumerate() {
                    self.data[row * self.width + col] = *value;
                }
            }
        }
    }
}

/// Moving average over `[i - radius, i + radius]`, treating outside samples as 0.
fn box_blur_line(line: &[f32], out: &mut [f32], radius: usize) {
    let norm = 1.0 / (2 * radius + 1) as f32;
    let mut sum: f32 = line.iter().take(radius + 1).sum();
    for index in 0..line.len() {
        out[index] = sum * norm;
        if let Some(incoming) = line.get(index + radius + 1) {
            sum += incoming;
        }
        if index >= radius {
            sum -= line[index - radius];
        }
    }
}

fn distance_to_segment(p: Point, a: Point, b: Point) -> f32 {
    let (dx, dy) = (b.x - a.x, b.y - a.y);
    let length_sq = dx * dx + dy * dy;
    if length_sq <= f32::EPSILON {
        return p.distance(a);
    }
    let t = (((p.x - a.x) * dx + (p.y - a.y) * dy) / length_sq).clamp(0.0, 1.0);
    p.distance(Point::new(a.x + dx * t, a.y + dy * t))
}

fn bounds(points: &[Point]) -> (Point, Point) {
    points.iter().fold(
        (
            Point::new(f32::INFINITY, f32::INFINITY),
            Point::new(f32::NEG_INFINITY, f32::NEG_INFINITY),
        ),
        |(min, max), p| {
            (
                Point::new(min.x.min(p.x), min.y.min(p.y)),
                Point::new(max.x.max(p.x), max.y.max(p.y)),
            )
        },
    )
}

fn is_finite(point: Point) -> bool {
    point.x.is_finite() && point.y.is_finite()
}

fn to_byte(value: f32) -> u8 {
    (value.clamp(0.0, 1.0) * 255.0).round() as u8
}
