#[cfg(feature = "camera-nokhwa")]
pub mod camera;
pub mod detector;
#[cfg(feature = "camera-nokhwa")]
pub mod rgba_converter;
pub mod skeleton;
pub mod source;

// Re-exports for convenience
#[cfg(feature = "camera-nokhwa")]
pub use camera::{CameraDevice, WebcamSource, available_cameras};
pub use detector::{DetectorConfig, HandDetector, OrtHandDetector};
pub use source::{FrameSource, RetryPolicy, next_frame};
