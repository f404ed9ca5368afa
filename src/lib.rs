//! Hand-gesture toolkit: capture labelled landmark data from a webcam,
//! train a random-forest classifier over it, and recognize gestures live
//! or over HTTP.

pub mod artifacts;
pub mod capture;
pub mod config;
pub mod console;
pub mod features;
pub mod forest;
pub mod gesture;
pub mod live;
pub mod model_download;
pub mod pipeline;
pub mod preview;
pub mod recognizer;
pub mod server;
pub mod training;
pub mod types;
#[cfg(feature = "preview-window")]
pub mod ui;
