use crate::features::LandmarkVector;

/// Bones of the 21-point hand model as landmark index pairs.
pub const CONNECTIONS: &[(usize, usize)] = &[
    (0, 1),
    (1, 2),
    (2, 3),
    (3, 4),
    (0, 5),
    (5, 6),
    (6, 7),
    (7, 8),
    (0, 9),
    (9, 10),
    (10, 11),
    (11, 12),
    (0, 13),
    (13, 14),
    (14, 15),
    (15, 16),
    (0, 17),
    (17, 18),
    (18, 19),
    (19, 20),
    (5, 9),
    (9, 13),
    (13, 17),
];

pub const SKELETON_LINE_THICKNESS: i32 = 3;
const LINE_COLOR: [u8; 4] = [56, 189, 248, 255];
const POINT_COLOR: [u8; 4] = [248, 113, 113, 255];

/// Normalized landmarks scaled back to pixel positions in a
/// `width` x `height` frame.
pub fn landmark_pixels(hand: &LandmarkVector, width: u32, height: u32) -> Vec<(f32, f32)> {
    hand.as_slice()
        .chunks_exact(3)
        .map(|p| (p[0] * width as f32, p[1] * height as f32))
        .collect()
}

/// Draws bones and joints into an RGBA buffer. Points off the frame are
/// clipped.
pub fn draw_skeleton(buffer: &mut [u8], width: u32, height: u32, points: &[(f32, f32)]) {
    if points.len() < 2 {
        return;
    }

    for &(a, b) in CONNECTIONS {
        if let (Some(pa), Some(pb)) = (points.get(a), points.get(b)) {
            draw_line(
                buffer,
                width,
                height,
                pa,
                pb,
                LINE_COLOR,
                SKELETON_LINE_THICKNESS,
            );
        }
    }

    let point_radius = (SKELETON_LINE_THICKNESS / 2).max(2) + 1;
    for &(x, y) in points {
        draw_circle(
            buffer,
            width,
            height,
            (x as i32, y as i32),
            point_radius,
            POINT_COLOR,
        );
    }
}

fn draw_line(
    buffer: &mut [u8],
    width: u32,
    height: u32,
    p0: &(f32, f32),
    p1: &(f32, f32),
    color: [u8; 4],
    thickness: i32,
) {
    let (mut x0, mut y0) = (p0.0 as i32, p0.1 as i32);
    let (x1, y1) = (p1.0 as i32, p1.1 as i32);
    let dx = (x1 - x0).abs();
    let sx = if x0 < x1 { 1 } else { -1 };
    let dy = -(y1 - y0).abs();
    let sy = if y0 < y1 { 1 } else { -1 };
    let mut err = dx + dy;
    let radius = (thickness.max(1) - 1) / 2;

    loop {
        put_pixel_safe(buffer, width, height, x0, y0, color);
        for ox in -radius..=radius {
            for oy in -radius..=radius {
                if (ox != 0 || oy != 0) && ox.abs() + oy.abs() <= radius {
                    put_pixel_safe(buffer, width, height, x0 + ox, y0 + oy, color);
                }
            }
        }
        if x0 == x1 && y0 == y1 {
            break;
        }
        let e2 = 2 * err;
        if e2 >= dy {
            err += dy;
            x0 += sx;
        }
        if e2 <= dx {
            err += dx;
            y0 += sy;
        }
    }
}

fn draw_circle(
    buffer: &mut [u8],
    width: u32,
    height: u32,
    center: (i32, i32),
    radius: i32,
    color: [u8; 4],
) {
    let (cx, cy) = center;
    for dy in -radius..=radius {
        for dx in -radius..=radius {
            if dx * dx + dy * dy <= radius * radius {
                put_pixel_safe(buffer, width, height, cx + dx, cy + dy, color);
            }
        }
    }
}

fn put_pixel_safe(buffer: &mut [u8], width: u32, height: u32, x: i32, y: i32, color: [u8; 4]) {
    if x < 0 || y < 0 {
        return;
    }
    let (ux, uy) = (x as usize, y as usize);
    if ux >= width as usize || uy >= height as usize {
        return;
    }
    let idx = (uy * width as usize + ux) * 4;
    if let Some(px) = buffer.get_mut(idx..idx + 4) {
        px.copy_from_slice(&color);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{FEATURE_LEN, NUM_LANDMARKS};

    fn pixel(buffer: &[u8], width: u32, x: usize, y: usize) -> [u8; 4] {
        let idx = (y * width as usize + x) * 4;
        [buffer[idx], buffer[idx + 1], buffer[idx + 2], buffer[idx + 3]]
    }

    #[test]
    fn scales_normalized_landmarks_to_pixels() {
        let mut values = [0.0f32; FEATURE_LEN];
        values[0] = 0.5;
        values[1] = 0.25;
        values[3] = 1.5;
        values[4] = -0.1;
        let hand = LandmarkVector::from_values(&values).unwrap();

        let points = landmark_pixels(&hand, 200, 100);
        assert_eq!(points.len(), NUM_LANDMARKS);
        assert_eq!(points[0], (100.0, 25.0));
        assert_eq!(points[1], (300.0, -10.0));
    }

    #[test]
    fn draws_bones_between_joints() {
        let (width, height) = (40, 40);
        let mut buffer = vec![0u8; (width * height * 4) as usize];
        let mut points = vec![(5.0, 20.0); NUM_LANDMARKS];
        points[1] = (35.0, 20.0);

        draw_skeleton(&mut buffer, width, height, &points);

        assert_eq!(pixel(&buffer, width, 20, 20), LINE_COLOR);
        assert_eq!(pixel(&buffer, width, 5, 20), POINT_COLOR);
        assert_eq!(pixel(&buffer, width, 20, 35), [0, 0, 0, 0]);
    }

    #[test]
    fn off_frame_points_are_clipped() {
        let (width, height) = (8, 8);
        let mut buffer = vec![0u8; (width * height * 4) as usize];
        let points = vec![(-50.0, -50.0); NUM_LANDMARKS];
        draw_skeleton(&mut buffer, width, height, &points);
        assert!(buffer.iter().all(|&b| b == 0));

        let crossing = [(-20.0, 4.0), (30.0, 4.0)];
        draw_skeleton(&mut buffer, width, height, &crossing);
        assert_eq!(pixel(&buffer, width, 4, 4), LINE_COLOR);
    }
}
