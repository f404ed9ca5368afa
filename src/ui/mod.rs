//! Camera preview window for the capture and live commands.
//!
//! The window runs on the main thread. The camera loop runs on a worker
//! and feeds it annotated frames; keys pressed in the window go back to
//! the loop as console commands.

use std::{sync::Arc, time::Duration};

use crossbeam_channel::{Receiver, Sender, TryRecvError};
use gpui::{
    App, AppContext, Application, AsyncApp, Context, FocusHandle, InteractiveElement, IntoElement,
    KeyDownEvent, ObjectFit, ParentElement, Render, RenderImage, SharedString, Styled,
    StyledImage, TitlebarOptions, Window, WindowOptions, div, img, rgb,
};
use gpui_component::{Root, v_flex};

use crate::{
    console::{ConsoleCommand, key_command},
    preview::PreviewFrame,
};

mod render_util;

use render_util::frame_to_image;

const FINISHED_POLL_INTERVAL: Duration = Duration::from_millis(50);
const WAITING_TEXT: &str = "Waiting for camera...";

pub struct PreviewChannels {
    pub frames: Receiver<PreviewFrame>,
    pub commands: Sender<ConsoleCommand>,
    /// Fires (or disconnects) once the camera loop has returned.
    pub finished: Receiver<()>,
}

/// Runs the preview window until the camera loop finishes.
///
/// Closing the window, or pressing `q` or Escape in it, sends
/// [`ConsoleCommand::Quit`]; Enter sends [`ConsoleCommand::Ready`].
pub fn run_preview_window(title: String, channels: PreviewChannels) {
    Application::new()
        .with_assets(gpui_component_assets::Assets)
        .run(move |app| {
            gpui_component::init(app);

            let PreviewChannels {
                frames,
                commands,
                finished,
            } = channels;
            quit_when_finished(app, finished);

            let closed_tx = commands.clone();
            app.on_window_closed(move |_| {
                let _ = closed_tx.send(ConsoleCommand::Quit);
            })
            .detach();

            if let Err(err) = open_preview(app, title, frames, commands) {
                log::error!("failed to open preview window: {err:?}");
            }
        });
}

fn open_preview(
    app: &mut App,
    title: String,
    frames: Receiver<PreviewFrame>,
    commands: Sender<ConsoleCommand>,
) -> gpui::Result<()> {
    let window_options = WindowOptions {
        titlebar: Some(TitlebarOptions {
            title: Some(title.into()),
            appears_transparent: false,
            traffic_light_position: None,
        }),
        ..Default::default()
    };

    app.open_window(window_options, move |window, app| {
        let view = app.new(|cx| PreviewView::new(frames, commands, cx));
        let focus_handle = view.read(app).focus_handle.clone();
        window.focus(&focus_handle);
        app.new(|cx| Root::new(view, window, cx))
    })?;

    Ok(())
}

fn quit_when_finished(app: &mut App, finished: Receiver<()>) {
    let executor = app.background_executor().clone();
    app.spawn(async move |cx: &mut AsyncApp| {
        while let Err(TryRecvError::Empty) = finished.try_recv() {
            executor.timer(FINISHED_POLL_INTERVAL).await;
        }
        let _ = cx.update(|app| app.quit());
    })
    .detach();
}

struct PreviewView {
    frames: Receiver<PreviewFrame>,
    commands: Sender<ConsoleCommand>,
    focus_handle: FocusHandle,
    latest_image: Option<Arc<RenderImage>>,
    status: SharedString,
}

impl PreviewView {
    fn new(
        frames: Receiver<PreviewFrame>,
        commands: Sender<ConsoleCommand>,
        cx: &mut Context<'_, Self>,
    ) -> Self {
        Self {
            frames,
            commands,
            focus_handle: cx.focus_handle(),
            latest_image: None,
            status: SharedString::from(WAITING_TEXT),
        }
    }

    fn on_key_down(
        &mut self,
        event: &KeyDownEvent,
        window: &mut Window,
        _cx: &mut Context<'_, Self>,
    ) {
        let Some(command) = key_command(&event.keystroke.key) else {
            return;
        };
        let _ = self.commands.send(command);
        if command == ConsoleCommand::Quit {
            window.remove_window();
        }
    }

    fn poll_frames(&mut self, window: &mut Window, cx: &mut Context<'_, Self>) {
        let Some(latest) = self.frames.try_iter().last() else {
            return;
        };
        self.status = latest.status.into();
        if let Some(image) = frame_to_image(&latest.frame) {
            self.replace_latest_image(image, window, cx);
        }
    }

    fn replace_latest_image(
        &mut self,
        new_image: Arc<RenderImage>,
        window: &mut Window,
        cx: &mut Context<'_, Self>,
    ) {
        if let Some(old_image) = self.latest_image.replace(new_image) {
            // The sprite atlas keeps every texture until it is dropped explicitly.
            cx.drop_image(old_image, Some(window));
        }
    }
}

impl Render for PreviewView {
    fn render(&mut self, window: &mut Window, cx: &mut Context<'_, Self>) -> impl IntoElement {
        cx.defer_in(window, |_, _, cx| {
            cx.notify();
        });
        self.poll_frames(window, cx);

        let camera = match &self.latest_image {
            Some(image) => img(image.clone())
                .size_full()
                .object_fit(ObjectFit::Contain)
                .into_any_element(),
            None => div()
                .size_full()
                .flex()
                .items_center()
                .justify_center()
                .text_color(rgb(0x9ca3af))
                .child(WAITING_TEXT)
                .into_any_element(),
        };

        v_flex()
            .size_full()
            .bg(rgb(0x000000))
            .track_focus(&self.focus_handle)
            .on_key_down(cx.listener(Self::on_key_down))
            .child(div().flex_1().w_full().overflow_hidden().child(camera))
            .child(
                div()
                    .w_full()
                    .px_3()
                    .py_2()
                    .text_sm()
                    .text_color(rgb(0xe5e7eb))
                    .child(self.status.clone()),
            )
    }
}
