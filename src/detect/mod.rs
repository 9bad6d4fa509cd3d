mod backend;
mod backends;
mod registry;
mod result;

pub use backend::DetectorBackend;
pub use backends::StubBackend;
#[cfg(feature = "backend-tract")]
pub use backends::TractBackend;
pub use registry::BackendRegistry;
pub use result::{
    HandObservation, Handedness, Point, INDEX_FINGER_TIP, LANDMARK_COUNT, THUMB_TIP,
};
