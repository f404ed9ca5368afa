use std::path::Path;

use anyhow::{Context, Result};

use crate::{
    config::{DEFAULT_SAMPLES_PER_GESTURE, default_gestures},
    console::OperatorControl,
    features::LabeledSample,
    pipeline::{FrameSource, HandDetector, RetryPolicy, next_frame},
    preview::FramePreview,
    training::write_dataset,
};

#[derive(Clone, Debug)]
pub struct CaptureOptions {
    pub gestures: Vec<String>,
    pub samples_per_gesture: usize,
    pub retry: RetryPolicy,
}

impl Default for CaptureOptions {
    fn default() -> Self {
        Self {
            gestures: default_gestures(),
            samples_per_gesture: DEFAULT_SAMPLES_PER_GESTURE,
            retry: RetryPolicy::default(),
        }
    }
}

#[derive(Debug)]
pub struct CaptureOutcome {
    pub samples: Vec<LabeledSample>,
    /// The operator quit before every quota was filled.
    pub stopped_early: bool,
}

/// Records `samples_per_gesture` landmark rows for each gesture in turn.
///
/// Frames without a hand, and frames the detector fails on, add nothing.
/// A quit request ends the whole session; rows gathered so far are kept.
/// Every frame read goes to `preview` with the hand found in it, if any.
pub fn run_capture(
    source: &mut dyn FrameSource,
    detector: &mut dyn HandDetector,
    control: &mut dyn OperatorControl,
    preview: &mut dyn FramePreview,
    options: &CaptureOptions,
) -> Result<CaptureOutcome> {
    let mut samples = Vec::with_capacity(options.gestures.len() * options.samples_per_gesture);

    for gesture in &options.gestures {
        if !control.wait_ready(gesture) {
            return Ok(CaptureOutcome {
                samples,
                stopped_early: true,
            });
        }
        log::info!("recording gesture {gesture}");

        let mut count = 0;
        while count < options.samples_per_gesture {
            if control.quit_requested() {
                log::info!("capture stopped during {gesture} at {count} samples");
                return Ok(CaptureOutcome {
                    samples,
                    stopped_early: true,
                });
            }

            let frame = next_frame(source, &options.retry)?;
            let hand = detector.detect(&frame).unwrap_or_else(|err| {
                log::warn!("hand detection failed, skipping frame: {err:?}");
                None
            });

            if let Some(landmarks) = &hand {
                samples.push(LabeledSample::new(landmarks.clone(), gesture.as_str()));
                count += 1;
                println!("{gesture}: {count}/{}", options.samples_per_gesture);
            }
            preview.show(
                &frame,
                hand.as_ref(),
                &format!("{gesture}: {count}/{}", options.samples_per_gesture),
            );
        }
    }

    Ok(CaptureOutcome {
        samples,
        stopped_early: false,
    })
}

/// Runs a capture session and writes its rows to `dataset`, replacing any
/// existing file.
pub fn capture_to_dataset(
    source: &mut dyn FrameSource,
    detector: &mut dyn HandDetector,
    control: &mut dyn OperatorControl,
    preview: &mut dyn FramePreview,
    options: &CaptureOptions,
    dataset: &Path,
) -> Result<CaptureOutcome> {
    let outcome = run_capture(source, detector, control, preview, options)?;
    write_dataset(dataset, &outcome.samples)
        .with_context(|| format!("failed to write dataset {}", dataset.display()))?;
    log::info!(
        "wrote {} samples to {}",
        outcome.samples.len(),
        dataset.display()
    );
    Ok(outcome)
}
