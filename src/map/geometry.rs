use glam::DVec2;

use crate::braille::BrailleCanvas;

/// Draw a line using Bresenham's algorithm
pub fn draw_line(canvas: &mut BrailleCanvas, x0: i32, y0: i32, x1: i32, y1: i32) {
    let dx = (x1 - x0).abs();
    let dy = -(y1 - y0).abs();
    let sx = if x0 < x1 { 1 } else { -1 };
    let sy = if y0 < y1 { 1 } else { -1 };
    let mut err = dx + dy;

    let mut x = x0;
    let mut y = y0;

    loop {
        canvas.set_pixel_signed(x, y);

        if x == x1 && y == y1 {
            break;
        }

        let e2 = 2 * err;

        if e2 >= dy {
            if x == x1 {
                break;
            }
            err += dy;
            x += sx;
        }

        if e2 <= dx {
            if y == y1 {
                break;
            }
            err += dx;
            y += sy;
        }
    }
}

/// Draw a thicker line (used for overlay borders)
pub fn draw_thick_line(canvas: &mut BrailleCanvas, x0: i32, y0: i32, x1: i32, y1: i32) {
    draw_line(canvas, x0, y0, x1, y1);
    draw_line(canvas, x0 + 1, y0, x1 + 1, y1);
    draw_line(canvas, x0, y0 + 1, x1, y1 + 1);
}

/// Draw a point marker (small cross)
pub fn draw_marker(canvas: &mut BrailleCanvas, x: i32, y: i32, size: i32) {
    for i in -size..=size {
        canvas.set_pixel_signed(x + i, y);
        canvas.set_pixel_signed(x, y + i);
    }
}

/// Scanline fill of a polygon given as pixel-space rings (outer ring plus holes,
/// even-odd rule). Each covered pixel is dithered at `opacity`.
pub fn fill_polygon(canvas: &mut BrailleCanvas, rings: &[Vec<DVec2>], opacity: f64) {
    if opacity <= 0.0 {
        return;
    }

    let (min_y, max_y) = rings
        .iter()
        .flatten()
        .fold((f64::INFINITY, f64::NEG_INFINITY), |(lo, hi), p| (lo.min(p.y), hi.max(p.y)));
    if !min_y.is_finite() {
        return;
    }

    let y_start = min_y.floor().max(0.0) as i32;
    let y_end = max_y.ceil().min(canvas.pixel_height() as f64) as i32;
    let x_limit = canvas.pixel_width() as f64;

    let mut crossings: Vec<f64> = Vec::new();
    for y in y_start..y_end {
        let scan = y as f64 + 0.5;
        crossings.clear();

        for ring in rings {
            for edge in ring.windows(2) {
                let (a, b) = (edge[0], edge[1]);
                if (a.y <= scan) != (b.y <= scan) {
                    crossings.push(a.x + (scan - a.y) / (b.y - a.y) * (b.x - a.x));
                }
            }
        }
        crossings.sort_by(|a, b| a.total_cmp(b));

        for span in crossings.chunks_exact(2) {
            let x0 = span[0].max(0.0).round() as i32;
            let x1 = span[1].min(x_limit).round() as i32;
            for x in x0..x1 {
                canvas.set_dithered(x, y, opacity);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_horizontal_line() {
        let mut canvas = BrailleCanvas::new(5, 1);
        draw_line(&mut canvas, 0, 0, 9, 0);
        assert_eq!(canvas.count(), 10);
        assert!(canvas.is_set(9, 0));
    }

    #[test]
    fn test_vertical_line() {
        let mut canvas = BrailleCanvas::new(1, 2);
        draw_line(&mut canvas, 0, 0, 0, 7);
        assert_eq!(canvas.count(), 8);
    }

    fn square(x0: f64, y0: f64, x1: f64, y1: f64) -> Vec<DVec2> {
        vec![
            DVec2::new(x0, y0),
            DVec2::new(x1, y0),
            DVec2::new(x1, y1),
            DVec2::new(x0, y1),
            DVec2::new(x0, y0),
        ]
    }

    #[test]
    fn solid_fill_covers_square() {
        let mut canvas = BrailleCanvas::new(10, 5);
        fill_polygon(&mut canvas, &[square(2.0, 4.0, 10.0, 12.0)], 1.0);
        assert_eq!(canvas.count(), 64);
        assert!(canvas.is_set(2, 4));
        assert!(!canvas.is_set(10, 12));
    }

    #[test]
    fn holes_are_left_empty() {
        let mut canvas = BrailleCanvas::new(10, 5);
        let rings = vec![square(0.0, 0.0, 16.0, 16.0), square(4.0, 4.0, 12.0, 12.0)];
        fill_polygon(&mut canvas, &rings, 1.0);
        assert_eq!(canvas.count(), 256 - 64);
        assert!(!canvas.is_set(8, 8));
    }
}
