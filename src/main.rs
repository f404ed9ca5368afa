use std::{
    net::{IpAddr, SocketAddr},
    path::PathBuf,
    sync::Arc,
    time::Duration,
};

use anyhow::{Context, Result};
use clap::{Args, Parser, Subcommand};
use env_logger::Env;

use gesture_signs::{
    capture::{CaptureOptions, capture_to_dataset},
    config::{
        DEFAULT_BIND_ADDR, DEFAULT_DATASET_PATH, DEFAULT_MODEL_DIR, DEFAULT_PORT,
        DEFAULT_SAMPLES_PER_GESTURE, DEFAULT_SEED, DEFAULT_TEST_FRACTION, DEFAULT_TREES,
        DEFAULT_WARMUP, ModelDir, default_gestures,
    },
    console::Console,
    forest::ForestConfig,
    gesture::ForestGestureClassifier,
    live::run_live,
    pipeline::{DetectorConfig, FrameSource, OrtHandDetector, RetryPolicy},
    preview::{FramePreview, NoPreview},
    recognizer::Recognizer,
    server,
    training::{TrainOptions, train},
};

#[derive(Parser)]
#[command(author, version, about)]
struct Cli {
    /// Directory holding the trained classifier, label encoder and detector models
    #[arg(
        long,
        global = true,
        env = "GESTURE_MODEL_DIR",
        default_value = DEFAULT_MODEL_DIR
    )]
    model_dir: PathBuf,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Record labelled landmark rows from the webcam
    Capture {
        #[arg(long, default_value = DEFAULT_DATASET_PATH)]
        dataset: PathBuf,
        #[arg(long, default_value_t = 0)]
        camera: u32,
        /// Samples to record per gesture
        #[arg(long, default_value_t = DEFAULT_SAMPLES_PER_GESTURE)]
        samples: usize,
        /// Gesture to record (repeatable); defaults to the built-in set
        #[arg(long = "gesture")]
        gestures: Vec<String>,
        #[command(flatten)]
        detector: DetectorArgs,
        #[command(flatten)]
        preview: PreviewArgs,
    },
    /// Fit the gesture classifier on a captured dataset
    Train {
        #[arg(long, default_value = DEFAULT_DATASET_PATH)]
        dataset: PathBuf,
        #[arg(long, default_value_t = DEFAULT_TREES)]
        trees: usize,
        #[arg(long, default_value_t = DEFAULT_SEED)]
        seed: u64,
        #[arg(long, default_value_t = DEFAULT_TEST_FRACTION)]
        test_fraction: f64,
    },
    /// Recognize one gesture from the webcam and exit
    Live {
        #[arg(long, default_value_t = 0)]
        camera: u32,
        #[arg(long, default_value_t = DEFAULT_WARMUP.as_secs_f64())]
        warmup_secs: f64,
        #[command(flatten)]
        detector: DetectorArgs,
        #[command(flatten)]
        preview: PreviewArgs,
    },
    /// Serve POST /predict-sign over HTTP
    Serve {
        #[arg(long, default_value = DEFAULT_BIND_ADDR)]
        bind: IpAddr,
        #[arg(long, default_value_t = DEFAULT_PORT)]
        port: u16,
        #[command(flatten)]
        detector: DetectorArgs,
    },
    /// List the cameras the capture backend can open
    Cameras,
}

#[derive(Args)]
struct DetectorArgs {
    /// Minimum hand confidence (handpose score times palm score)
    #[arg(long, default_value_t = 0.5)]
    min_hand_confidence: f32,
}

#[derive(Args)]
struct PreviewArgs {
    /// Skip the camera preview window and use console controls only
    #[arg(long)]
    headless: bool,
}

impl DetectorArgs {
    fn build(&self, model_dir: &ModelDir) -> Result<OrtHandDetector> {
        let config =
            DetectorConfig::new(model_dir).with_min_hand_confidence(self.min_hand_confidence);
        OrtHandDetector::new(&config).context("failed to initialize hand detector")
    }
}

fn main() -> Result<()> {
    env_logger::Builder::from_env(Env::default().default_filter_or("info")).init();

    let cli = Cli::parse();
    let model_dir = ModelDir::new(cli.model_dir);

    match cli.command {
        Command::Capture {
            dataset,
            camera,
            samples,
            gestures,
            detector,
            preview,
        } => {
            let options = CaptureOptions {
                gestures: if gestures.is_empty() {
                    default_gestures()
                } else {
                    gestures
                },
                samples_per_gesture: samples,
                retry: RetryPolicy::default(),
            };

            run_interactive("Gesture capture", preview.headless, move |frames, console| {
                let mut detector = detector.build(&model_dir)?;
                let mut source = open_camera(camera)?;
                let outcome = capture_to_dataset(
                    &mut *source,
                    &mut detector,
                    console,
                    frames,
                    &options,
                    &dataset,
                )?;
                println!(
                    "Saved {} samples to {}",
                    outcome.samples.len(),
                    dataset.display()
                );
                Ok(())
            })?;
        }
        Command::Train {
            dataset,
            trees,
            seed,
            test_fraction,
        } => {
            let options = TrainOptions {
                dataset,
                model_dir,
                forest: ForestConfig {
                    n_trees: trees,
                    seed,
                    ..ForestConfig::default()
                },
                test_fraction,
            };
            let report = train(&options)?;
            println!("Model Accuracy: {:.2}%", report.accuracy * 100.0);
        }
        Command::Live {
            camera,
            warmup_secs,
            detector,
            preview,
        } => {
            let warmup = Duration::try_from_secs_f64(warmup_secs)
                .context("--warmup-secs must be a non-negative number")?;

            run_interactive("Live gesture", preview.headless, move |frames, console| {
                let recognizer = build_recognizer(&model_dir, &detector)?;
                let mut source = open_camera(camera)?;
                let label = run_live(
                    &mut *source,
                    &recognizer,
                    console,
                    frames,
                    warmup,
                    &RetryPolicy::default(),
                )?;
                if label.is_none() {
                    println!("No gesture detected");
                }
                Ok(())
            })?;
        }
        Command::Serve {
            bind,
            port,
            detector,
        } => {
            let recognizer = Arc::new(build_recognizer(&model_dir, &detector)?);
            let runtime = tokio::runtime::Runtime::new().context("failed to start tokio runtime")?;
            runtime.block_on(server::serve(SocketAddr::new(bind, port), recognizer))?;
        }
        Command::Cameras => list_cameras()?,
    }

    Ok(())
}

/// Runs a camera job on a worker thread while the preview window owns the
/// main thread. The job reports its own results; on some platforms the
/// window's event loop exits the process when it quits.
#[cfg(feature = "preview-window")]
fn run_interactive<F>(title: &str, headless: bool, job: F) -> Result<()>
where
    F: FnOnce(&mut dyn FramePreview, &mut Console) -> Result<()> + Send + 'static,
{
    use crossbeam_channel::{bounded, unbounded};
    use gesture_signs::{
        console::spawn_stdin_reader,
        preview::ChannelPreview,
        ui::{PreviewChannels, run_preview_window},
    };

    if headless {
        return job(&mut NoPreview, &mut Console::spawn());
    }

    let (command_tx, command_rx) = unbounded();
    spawn_stdin_reader(command_tx.clone());
    let (frame_tx, frame_rx) = bounded(1);
    let (finished_tx, finished_rx) = bounded(1);

    let worker = std::thread::Builder::new()
        .name("camera-loop".into())
        .spawn(move || {
            let mut console = Console::from_receiver(command_rx);
            let result = job(&mut ChannelPreview::new(frame_tx), &mut console);
            if let Err(err) = &result {
                log::error!("{err:#}");
            }
            let _ = finished_tx.send(());
            result
        })
        .context("failed to start camera thread")?;

    run_preview_window(
        title.to_string(),
        PreviewChannels {
            frames: frame_rx,
            commands: command_tx,
            finished: finished_rx,
        },
    );

    worker
        .join()
        .map_err(|_| anyhow::anyhow!("camera thread panicked"))?
}

#[cfg(not(feature = "preview-window"))]
fn run_interactive<F>(_title: &str, headless: bool, job: F) -> Result<()>
where
    F: FnOnce(&mut dyn FramePreview, &mut Console) -> Result<()> + Send + 'static,
{
    if !headless {
        log::info!("built without the `preview-window` feature, running headless");
    }
    job(&mut NoPreview, &mut Console::spawn())
}

fn build_recognizer(model_dir: &ModelDir, detector: &DetectorArgs) -> Result<Recognizer> {
    let classifier = ForestGestureClassifier::load(model_dir)?;
    let detector = detector.build(model_dir)?;
    Ok(Recognizer::new(Box::new(detector), Box::new(classifier)))
}

#[cfg(feature = "camera-nokhwa")]
fn open_camera(index: u32) -> Result<Box<dyn FrameSource>> {
    Ok(Box::new(gesture_signs::pipeline::WebcamSource::open(index)?))
}

#[cfg(not(feature = "camera-nokhwa"))]
fn open_camera(_index: u32) -> Result<Box<dyn FrameSource>> {
    anyhow::bail!("built without camera support; enable the `camera-nokhwa` feature")
}

#[cfg(feature = "camera-nokhwa")]
fn list_cameras() -> Result<()> {
    let cameras = gesture_signs::pipeline::available_cameras()?;
    if cameras.is_empty() {
        println!("No cameras found");
    }
    for camera in cameras {
        println!("{}: {}", camera.index.as_string(), camera.label);
    }
    Ok(())
}

#[cfg(not(feature = "camera-nokhwa"))]
fn list_cameras() -> Result<()> {
    anyhow::bail!("built without camera support; enable the `camera-nokhwa` feature")
}
