//! Hand-off of annotated camera frames to whatever displays them.

use crossbeam_channel::Sender;

use crate::{
    features::LandmarkVector,
    pipeline::skeleton::{draw_skeleton, landmark_pixels},
    types::Frame,
};

/// A frame ready for display, skeleton already drawn, with a status line.
#[derive(Clone, Debug)]
pub struct PreviewFrame {
    pub frame: Frame,
    pub status: String,
}

/// Receives every frame the capture and live loops read.
pub trait FramePreview {
    fn show(&mut self, frame: &Frame, hand: Option<&LandmarkVector>, status: &str);
}

/// Headless runs.
pub struct NoPreview;

impl FramePreview for NoPreview {
    fn show(&mut self, _frame: &Frame, _hand: Option<&LandmarkVector>, _status: &str) {}
}

/// Copies `frame` and draws the hand skeleton on it when one is given.
pub fn annotate(frame: &Frame, hand: Option<&LandmarkVector>) -> Frame {
    let mut annotated = frame.clone();
    if let Some(hand) = hand {
        let points = landmark_pixels(hand, frame.width, frame.height);
        draw_skeleton(&mut annotated.rgba, frame.width, frame.height, &points);
    }
    annotated
}

/// Sends annotated frames to a display thread.
///
/// Frames are dropped while the display still holds an undrawn one, so a
/// slow window never stalls the camera loop.
pub struct ChannelPreview {
    frames: Sender<PreviewFrame>,
}

impl ChannelPreview {
    pub fn new(frames: Sender<PreviewFrame>) -> Self {
        Self { frames }
    }
}

impl FramePreview for ChannelPreview {
    fn show(&mut self, frame: &Frame, hand: Option<&LandmarkVector>, status: &str) {
        if self.frames.is_full() {
            return;
        }
        let _ = self.frames.try_send(PreviewFrame {
            frame: annotate(frame, hand),
            status: status.to_string(),
        });
    }
}

#[cfg(test)]
pub(crate) mod testing {
    use super::*;

    /// Remembers the status of each shown frame and whether it had a hand.
    #[derive(Default)]
    pub struct RecordingPreview {
        pub shown: Vec<(String, bool)>,
    }

    impl FramePreview for RecordingPreview {
        fn show(&mut self, _frame: &Frame, hand: Option<&LandmarkVector>, status: &str) {
            self.shown.push((status.to_string(), hand.is_some()));
        }
    }
}
