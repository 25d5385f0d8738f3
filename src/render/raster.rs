//! Screen-space rasterization: depth-tested lines and filled triangles.

use crate::color::Color;
use crate::math::vec3::Vec3;

use super::framebuffer::{FrameBuffers, PixelWrite};

/// A vertex ready for rasterization: pixel coordinates, depth in [0, 1],
/// and the color to interpolate from.
#[derive(Clone, Copy, Debug)]
pub struct ScreenVertex {
    pub x: i32,
    pub y: i32,
    pub z: f32,
    pub color: Color,
}

impl ScreenVertex {
    pub const fn new(x: i32, y: i32, z: f32, color: Color) -> Self {
        Self { x, y, z, color }
    }
}

/// True when a line stepping left to right can no longer re-enter the
/// buffer: past the right edge, or past either vertical edge.
fn past_bounds(frame: &FrameBuffers, x: i32, y: i32) -> bool {
    x > frame.width() as i32 || y > frame.height() as i32 || y < 0
}

/// Draws a line with Bresenham stepping, interpolating depth and RGB
/// linearly between the endpoints.
///
/// Steep lines are transposed so x is always the major axis; endpoints are
/// swapped (with their depth and color) so x ascends. The y error
/// accumulator advances by 2|dy| per step and pays back 2dx on overflow.
/// Once a pixel lands out of bounds with no way back in, the rest of the
/// line is abandoned.
pub fn draw_line(frame: &mut FrameBuffers, from: ScreenVertex, to: ScreenVertex) {
    let (mut x0, mut y0, mut z0, mut c0) = (from.x, from.y, from.z, from.color);
    let (mut x1, mut y1, mut z1, mut c1) = (to.x, to.y, to.z, to.color);

    let steep = (x0 - x1).abs() < (y0 - y1).abs();
    if steep {
        std::mem::swap(&mut x0, &mut y0);
        std::mem::swap(&mut x1, &mut y1);
    }
    if x0 > x1 {
        std::mem::swap(&mut x0, &mut x1);
        std::mem::swap(&mut y0, &mut y1);
        std::mem::swap(&mut z0, &mut z1);
        std::mem::swap(&mut c0, &mut c1);
    }

    let dx = x1 - x0;
    let dy = y1 - y0;
    if dx == 0 {
        // Both endpoints share a pixel.
        let (sx, sy) = if steep { (y0, x0) } else { (x0, y0) };
        frame.set_pixel(sx, sy, c0, z0);
        return;
    }

    let dz = (z1 - z0) / dx as f32;
    let dr = (c1.r() as f32 - c0.r() as f32) / dx as f32;
    let dg = (c1.g() as f32 - c0.g() as f32) / dx as f32;
    let db = (c1.b() as f32 - c0.b() as f32) / dx as f32;

    let dyerror2 = dy.abs() * 2;
    let mut yerror2 = 0;
    let mut y = y0;
    let mut z = z0;
    let (mut r, mut g, mut b) = (c0.r() as f32, c0.g() as f32, c0.b() as f32);

    for x in x0..=x1 {
        let color = Color::from_rgb(
            r.clamp(0.0, 255.0) as u8,
            g.clamp(0.0, 255.0) as u8,
            b.clamp(0.0, 255.0) as u8,
        );
        let (sx, sy) = if steep { (y, x) } else { (x, y) };
        if frame.set_pixel(sx, sy, color, z) == PixelWrite::OutOfBounds && past_bounds(frame, sx, sy)
        {
            return;
        }

        yerror2 += dyerror2;
        if yerror2 > dx {
            y += if y1 > y0 { 1 } else { -1 };
            yerror2 -= dx * 2;
        }
        z += dz;
        r += dr;
        g += dg;
        b += db;
    }
}

/// Draws the three edges of a triangle in one color.
pub fn draw_wire_triangle(frame: &mut FrameBuffers, a: ScreenVertex, b: ScreenVertex, c: ScreenVertex) {
    draw_line(frame, a, b);
    draw_line(frame, b, c);
    draw_line(frame, c, a);
}

/// Fills a triangle with barycentric interpolation of color and depth.
///
/// Every pixel of the bounding box is weighted by the relative areas of the
/// three sub-triangles it forms with the corners; points whose weights sum
/// to roughly one are inside.
pub fn fill_triangle(frame: &mut FrameBuffers, a: ScreenVertex, b: ScreenVertex, c: ScreenVertex) {
    let pa = Vec3::new(a.x as f32, a.y as f32, 0.0);
    let pb = Vec3::new(b.x as f32, b.y as f32, 0.0);
    let pc = Vec3::new(c.x as f32, c.y as f32, 0.0);

    let area = (pb - pa).cross(pc - pa).magnitude() / 2.0;
    if area <= f32::EPSILON {
        return;
    }

    let min_x = a.x.min(b.x).min(c.x).max(0);
    let max_x = a.x.max(b.x).max(c.x).min(frame.width() as i32 - 1);
    let min_y = a.y.min(b.y).min(c.y).max(0);
    let max_y = a.y.max(b.y).max(c.y).min(frame.height() as i32 - 1);

    for y in min_y..=max_y {
        for x in min_x..=max_x {
            let p = Vec3::new(x as f32, y as f32, 0.0);
            let va = pa - p;
            let vb = pb - p;
            let vc = pc - p;

            let u = va.cross(vc).magnitude() / 2.0 / area;
            let v = va.cross(vb).magnitude() / 2.0 / area;
            let w = vc.cross(vb).magnitude() / 2.0 / area;

            if (0.99..=1.01).contains(&(u + v + w)) {
                let color = a.color * w + b.color * u + c.color * v;
                let depth = a.z * w + b.z * u + c.z * v;
                frame.set_pixel(x, y, color, depth);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn diagonal_line_covers_the_diagonal() {
        let mut frame = FrameBuffers::new(10, 10);
        draw_line(
            &mut frame,
            ScreenVertex::new(0, 0, 0.5, Color::WHITE),
            ScreenVertex::new(9, 9, 0.5, Color::WHITE),
        );
        for i in 0..10 {
            assert_eq!(frame.pixel(i, i), Some(Color::WHITE), "pixel ({i}, {i})");
            assert_relative_eq!(frame.depth_at(i, i).unwrap(), 0.5, epsilon = 1e-5);
        }
    }

    #[test]
    fn line_interpolates_depth() {
        let mut frame = FrameBuffers::new(11, 11);
        draw_line(
            &mut frame,
            ScreenVertex::new(0, 5, 0.0, Color::WHITE),
            ScreenVertex::new(10, 5, 1.0, Color::WHITE),
        );
        // Depth exactly 1.0 never beats the cleared buffer, so probe the
        // interior of the ramp.
        assert_relative_eq!(frame.depth_at(5, 5).unwrap(), 0.5, epsilon = 1e-5);
        assert_relative_eq!(frame.depth_at(0, 5).unwrap(), 0.0, epsilon = 1e-5);
    }

    #[test]
    fn line_interpolates_color_channels() {
        let mut frame = FrameBuffers::new(11, 11);
        draw_line(
            &mut frame,
            ScreenVertex::new(0, 0, 0.5, Color::BLACK),
            ScreenVertex::new(10, 0, 0.5, Color::from_rgb(250, 0, 100)),
        );
        let mid = frame.pixel(5, 0).unwrap();
        assert_eq!(mid.r(), 125);
        assert_eq!(mid.b(), 50);
    }

    #[test]
    fn steep_line_is_transposed_not_gapped() {
        let mut frame = FrameBuffers::new(10, 10);
        draw_line(
            &mut frame,
            ScreenVertex::new(2, 0, 0.5, Color::WHITE),
            ScreenVertex::new(3, 9, 0.5, Color::WHITE),
        );
        // One pixel per row along the major axis.
        for y in 0..10 {
            let hits = (0..10).filter(|&x| frame.pixel(x, y) == Some(Color::WHITE)).count();
            assert_eq!(hits, 1, "row {y}");
        }
    }

    #[test]
    fn line_leaving_the_buffer_stops_quietly() {
        let mut frame = FrameBuffers::new(4, 4);
        draw_line(
            &mut frame,
            ScreenVertex::new(0, 0, 0.5, Color::WHITE),
            ScreenVertex::new(100, 0, 0.5, Color::WHITE),
        );
        for x in 0..4 {
            assert_eq!(frame.pixel(x, 0), Some(Color::WHITE));
        }
    }

    #[test]
    fn fill_covers_exactly_the_barycentric_interior() {
        let mut frame = FrameBuffers::new(16, 16);
        let a = ScreenVertex::new(2, 2, 0.5, Color::WHITE);
        let b = ScreenVertex::new(10, 2, 0.5, Color::WHITE);
        let c = ScreenVertex::new(2, 10, 0.5, Color::WHITE);
        fill_triangle(&mut frame, a, b, c);

        let area = 32.0;
        for y in 0..16 {
            for x in 0..16 {
                let p = Vec3::new(x as f32, y as f32, 0.0);
                let pa = Vec3::new(2.0, 2.0, 0.0) - p;
                let pb = Vec3::new(10.0, 2.0, 0.0) - p;
                let pc = Vec3::new(2.0, 10.0, 0.0) - p;
                let u = pa.cross(pc).magnitude() / 2.0 / area;
                let v = pa.cross(pb).magnitude() / 2.0 / area;
                let w = pc.cross(pb).magnitude() / 2.0 / area;
                let inside = (0.99..=1.01).contains(&(u + v + w));
                let written = frame.pixel(x, y) == Some(Color::WHITE);
                assert_eq!(written, inside, "pixel ({x}, {y})");
            }
        }
    }

    #[test]
    fn fill_puts_pure_corner_colors_at_the_corners() {
        let mut frame = FrameBuffers::new(32, 32);
        let a = ScreenVertex::new(1, 1, 0.5, Color::RED);
        let b = ScreenVertex::new(29, 1, 0.5, Color::GREEN);
        let c = ScreenVertex::new(1, 29, 0.5, Color::BLUE);
        fill_triangle(&mut frame, a, b, c);

        let at_a = frame.pixel(1, 1).unwrap();
        assert!(at_a.r() >= 254 && at_a.g() <= 1 && at_a.b() <= 1);
        let at_b = frame.pixel(29, 1).unwrap();
        assert!(at_b.g() >= 254 && at_b.r() <= 1 && at_b.b() <= 1);
        let at_c = frame.pixel(1, 29).unwrap();
        assert!(at_c.b() >= 254 && at_c.r() <= 1 && at_c.g() <= 1);
    }

    #[test]
    fn fill_interpolates_depth_across_the_face() {
        let mut frame = FrameBuffers::new(16, 16);
        let a = ScreenVertex::new(0, 0, 0.2, Color::WHITE);
        let b = ScreenVertex::new(10, 0, 0.8, Color::WHITE);
        let c = ScreenVertex::new(0, 10, 0.2, Color::WHITE);
        fill_triangle(&mut frame, a, b, c);
        assert_relative_eq!(frame.depth_at(0, 0).unwrap(), 0.2, epsilon = 1e-4);
        assert_relative_eq!(frame.depth_at(5, 0).unwrap(), 0.5, epsilon = 0.01);
    }

    #[test]
    fn degenerate_triangle_draws_nothing() {
        let mut frame = FrameBuffers::new(8, 8);
        let a = ScreenVertex::new(1, 1, 0.5, Color::WHITE);
        let b = ScreenVertex::new(4, 4, 0.5, Color::WHITE);
        fill_triangle(&mut frame, a, b, b);
        for y in 0..8 {
            for x in 0..8 {
                assert_eq!(frame.pixel(x, y), Some(Color::BLACK));
            }
        }
    }
}
