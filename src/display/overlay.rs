use crate::detect::{HandObservation, Handedness, Point};
use crate::frame::{Frame, Rgb};

const LANDMARK_RADIUS: i64 = 4;

/// Colour used for a hand's annotations.
pub fn hand_color(handedness: Handedness) -> Rgb {
    match handedness {
        Handedness::Left => Rgb(255, 200, 0),
        Handedness::Right => Rgb(0, 200, 255),
    }
}

/// Draw a hand's landmarks and its thumb-index line onto the frame.
pub fn annotate_hand(frame: &mut Frame, hand: &HandObservation) {
    if let Some((thumb, index)) = hand.pinch() {
        draw_line(frame, thumb, index, Rgb(255, 0, 255));
    }
    let color = hand_color(hand.handedness);
    for (_, point) in hand.landmarks() {
        draw_dot(frame, point, LANDMARK_RADIUS, color);
    }
}

fn draw_dot(frame: &mut Frame, center: Point, radius: i64, color: Rgb) {
    let cx = center.x.round() as i64;
    let cy = center.y.round() as i64;
    for dy in -radius..=radius {
        for dx in -radius..=radius {
            if dx * dx + dy * dy <= radius * radius {
                frame.put_pixel(cx + dx, cy + dy, color);
            }
        }
    }
}

fn draw_line(frame: &mut Frame, from: Point, to: Point, color: Rgb) {
    let steps = from.distance(&to).ceil().max(1.0) as i64;
    for i in 0..=steps {
        let t = i as f64 / steps as f64;
        let x = from.x + (to.x - from.x) * t;
        let y = from.y + (to.y - from.y) * t;
        frame.put_pixel(x.round() as i64, y.round() as i64, color);
    }
}
