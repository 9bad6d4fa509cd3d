use std::collections::BTreeMap;
use std::fmt;

/// Number of landmarks in a hand skeleton (ids 0..=20).
pub const LANDMARK_COUNT: u8 = 21;

/// Landmark id of the thumb tip.
pub const THUMB_TIP: u8 = 4;

/// Landmark id of the index finger tip.
pub const INDEX_FINGER_TIP: u8 = 8;

/// Pixel coordinate in frame space.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Point {
    pub x: f64,
    pub y: f64,
}

impl Point {
    pub fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }

    /// Euclidean distance to `other`.
    pub fn distance(&self, other: &Point) -> f64 {
        (other.x - self.x).hypot(other.y - self.y)
    }
}

/// Which hand the detector believes it saw.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Handedness {
    Left,
    Right,
}

impl fmt::Display for Handedness {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Handedness::Left => f.write_str("left"),
            Handedness::Right => f.write_str("right"),
        }
    }
}

/// One detected hand: side label plus landmark id → pixel position.
#[derive(Clone, Debug, PartialEq)]
pub struct HandObservation {
    pub handedness: Handedness,
    /// Detector confidence that this is a hand.
    pub confidence: f32,
    landmarks: BTreeMap<u8, Point>,
}

impl HandObservation {
    pub fn new(handedness: Handedness, confidence: f32) -> Self {
        Self {
            handedness,
            confidence,
            landmarks: BTreeMap::new(),
        }
    }

    /// Builder-style landmark insertion. Ids outside 0..=20 are dropped.
    pub fn with_landmark(mut self, id: u8, point: Point) -> Self {
        self.insert(id, point);
        self
    }

    /// Insert a landmark. Returns false (and stores nothing) for ids outside 0..=20.
    pub fn insert(&mut self, id: u8, point: Point) -> bool {
        if id >= LANDMARK_COUNT {
            return false;
        }
        self.landmarks.insert(id, point);
        true
    }

    pub fn landmark(&self, id: u8) -> Option<Point> {
        self.landmarks.get(&id).copied()
    }

    /// Landmarks in id order.
    pub fn landmarks(&self) -> impl Iterator<Item = (u8, Point)> + '_ {
        self.landmarks.iter().map(|(id, p)| (*id, *p))
    }

    pub fn len(&self) -> usize {
        self.landmarks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.landmarks.is_empty()
    }

    /// Thumb tip and index tip, when both were detected.
    pub fn pinch(&self) -> Option<(Point, Point)> {
        Some((self.landmark(THUMB_TIP)?, self.landmark(INDEX_FINGER_TIP)?))
    }

    /// Distance between thumb tip and index tip, when both were detected.
    pub fn pinch_distance(&self) -> Option<f64> {
        self.pinch().map(|(thumb, index)| thumb.distance(&index))
    }
}
