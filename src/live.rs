use std::time::{Duration, Instant};

use anyhow::Result;

use crate::{
    console::OperatorControl,
    pipeline::{FrameSource, RetryPolicy, next_frame},
    preview::FramePreview,
    recognizer::Recognizer,
};

const SEARCHING_TEXT: &str = "Looking for a hand...";

fn warmup_text(remaining: Duration) -> String {
    format!("Get ready, detection starts in {:.0}s", remaining.as_secs_f32().ceil())
}

/// Streams frames until one shows a hand, then names its gesture.
///
/// Every frame goes to `preview` from the first read on. Detection only
/// starts once `warmup` has passed. Returns `None` if the operator quits
/// first.
pub fn run_live(
    source: &mut dyn FrameSource,
    recognizer: &Recognizer,
    control: &mut dyn OperatorControl,
    preview: &mut dyn FramePreview,
    warmup: Duration,
    retry: &RetryPolicy,
) -> Result<Option<String>> {
    println!(
        "Show a gesture to the camera, detection starts in {:.0}s (q + Enter to quit)",
        warmup.as_secs_f32()
    );
    let started = Instant::now();

    loop {
        if control.quit_requested() {
            log::info!("live recognition cancelled");
            return Ok(None);
        }

        let frame = next_frame(source, retry)?;
        let elapsed = started.elapsed();
        if elapsed < warmup {
            preview.show(&frame, None, &warmup_text(warmup - elapsed));
            continue;
        }

        match recognizer.recognize_hand(&frame) {
            Ok(Some(recognition)) => {
                let text = format!("Detected Gesture: {}", recognition.label);
                preview.show(&frame, Some(&recognition.landmarks), &text);
                println!("{text}");
                return Ok(Some(recognition.label));
            }
            Ok(None) => preview.show(&frame, None, SEARCHING_TEXT),
            Err(err) => {
                log::warn!("recognition failed, skipping frame: {err:?}");
                preview.show(&frame, None, SEARCHING_TEXT);
            }
        }
    }
}
