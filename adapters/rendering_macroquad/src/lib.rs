#![deny(
    unsafe_code,
    missing_docs,
    dead_code,
    unused_results,
    non_snake_case,
    unreachable_pub
)]

//! Macroquad-backed rendering adapter for the Balloon Analogue Risk Task.
//!
//! Macroquad's optional audio stack depends on native ALSA development
//! libraries, so the crate depends on macroquad without its default `audio`
//! feature. The task has no sound.
//!
//! Window close requests are intercepted with `prevent_quit` and forwarded to
//! the task as [`TaskInput::Close`] so the session can release its sinks before
//! the window goes away.

mod images;

use anyhow::Result;
use bart_core::TaskInput;
use bart_rendering::{FrameInput, Presentation, RenderingBackend, Scene, SceneText, Viewport};
use macroquad::input::{is_key_pressed, is_quit_requested, prevent_quit, KeyCode};
use std::sync::mpsc;
use tracing::debug;

use self::images::ImageCache;

/// Keys observed during a single frame that map onto task input.
#[doc(hidden)]
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct KeyPresses {
    /// `Enter` confirms the current screen.
    pub enter: bool,
    /// `Right` pumps the balloon.
    pub right: bool,
    /// `Left` banks the round's winnings.
    pub left: bool,
    /// `Q` declines to start.
    pub q: bool,
}

impl KeyPresses {
    fn poll() -> Self {
        Self {
            enter: is_key_pressed(KeyCode::Enter) || is_key_pressed(KeyCode::KpEnter),
            right: is_key_pressed(KeyCode::Right),
            left: is_key_pressed(KeyCode::Left),
            q: is_key_pressed(KeyCode::Q),
        }
    }

    /// Translates the pressed keys into task inputs in a fixed order.
    #[must_use]
    pub fn inputs(self) -> Vec<TaskInput> {
        [
            (self.enter, TaskInput::Confirm),
            (self.right, TaskInput::Pump),
            (self.left, TaskInput::CashIn),
            (self.q, TaskInput::Decline),
        ]
        .into_iter()
        .filter_map(|(pressed, input)| pressed.then_some(input))
        .collect()
    }
}

/// Reports window size changes as resize input.
#[doc(hidden)]
#[derive(Clone, Copy, Debug, Default)]
pub struct ViewportTracker {
    last: Option<(u32, u32)>,
}

impl ViewportTracker {
    /// Records the observed surface size, returning a resize input when it changed.
    ///
    /// The first observation always reports, so consumers learn the initial size.
    pub fn observe(&mut self, width: u32, height: u32) -> Option<TaskInput> {
        if self.last == Some((width, height)) {
            return None;
        }
        self.last = Some((width, height));
        Some(TaskInput::Resize { width, height })
    }
}

/// Rendering backend implemented on top of macroquad.
#[derive(Debug)]
pub struct MacroquadBackend {
    swap_interval: Option<i32>,
    resizable: bool,
}

impl Default for MacroquadBackend {
    fn default() -> Self {
        Self {
            swap_interval: None,
            resizable: true,
        }
    }
}

impl MacroquadBackend {
    /// Returns a resizable backend that requests the platform's default swap interval.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Configures the backend to either synchronise presentation with the display refresh rate
    /// or render as fast as possible.
    #[must_use]
    pub fn with_vsync(mut self, enabled: bool) -> Self {
        self.swap_interval = Some(i32::from(enabled));
        self
    }

    /// Configures whether the participant may resize the window.
    #[must_use]
    pub fn with_resizable(mut self, resizable: bool) -> Self {
        self.resizable = resizable;
        self
    }
}

impl RenderingBackend for MacroquadBackend {
    fn run<F>(self, presentation: Presentation, mut update_scene: F) -> Result<()>
    where
        F: FnMut(FrameInput) -> Result<Option<Scene>> + 'static,
    {
        let Self {
            swap_interval,
            resizable,
        } = self;

        let Presentation {
            window_title,
            clear_color,
            viewport,
            images_dir,
        } = presentation;

        let mut config = macroquad::window::Conf {
            window_title,
            window_width: i32::try_from(viewport.width()).unwrap_or(i32::MAX),
            window_height: i32::try_from(viewport.height()).unwrap_or(i32::MAX),
            window_resizable: resizable,
            ..macroquad::window::Conf::default()
        };
        if let Some(swap_interval) = swap_interval {
            config.platform.swap_interval = Some(swap_interval);
        }

        let (outcome_sender, outcome_receiver) = mpsc::channel::<Result<()>>();

        macroquad::Window::from_config(config, async move {
            prevent_quit();

            let background = to_macroquad_color(clear_color);
            let mut images = ImageCache::new(images_dir);
            let mut tracker = ViewportTracker::default();

            let outcome = loop {
                let width = surface_extent(macroquad::window::screen_width());
                let height = surface_extent(macroquad::window::screen_height());

                let mut inputs = Vec::new();
                inputs.extend(tracker.observe(width, height));
                inputs.extend(KeyPresses::poll().inputs());
                let closing = is_quit_requested();
                if closing {
                    inputs.push(TaskInput::Close);
                }

                let viewport = match Viewport::new(width, height) {
                    Ok(viewport) => viewport,
                    Err(error) => break Err(error.into()),
                };

                let scene = match update_scene(FrameInput { inputs, viewport }) {
                    Ok(Some(scene)) => scene,
                    Ok(None) => break Ok(()),
                    Err(error) => break Err(error),
                };
                if closing {
                    break Ok(());
                }

                macroquad::window::clear_background(background);
                for image in &scene.images {
                    images.draw(image);
                }
                for text in &scene.texts {
                    draw_centered_text(text);
                }

                macroquad::window::next_frame().await;
            };

            debug!(ok = outcome.is_ok(), "render loop finished");
            let _ = outcome_sender.send(outcome);
        });

        outcome_receiver.recv().unwrap_or_else(|_| Ok(()))
    }
}

fn surface_extent(pixels: f32) -> u32 {
    pixels.max(1.0) as u32
}

fn draw_centered_text(text: &SceneText) {
    let font_size = text.size.round().clamp(1.0, f32::from(u16::MAX)) as u16;
    let dimensions = macroquad::text::measure_text(&text.text, None, font_size, 1.0);
    macroquad::text::draw_text(
        &text.text,
        text.center.x - dimensions.width / 2.0,
        text.center.y + dimensions.offset_y / 2.0,
        text.size,
        to_macroquad_color(text.color),
    );
}

fn to_macroquad_color(color: bart_rendering::Color) -> macroquad::color::Color {
    macroquad::color::Color::new(color.red, color.green, color.blue, color.alpha)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn vsync_toggles_swap_interval() {
        assert_eq!(MacroquadBackend::new().with_vsync(true).swap_interval, Some(1));
        assert_eq!(MacroquadBackend::new().with_vsync(false).swap_interval, Some(0));
        assert_eq!(MacroquadBackend::new().swap_interval, None);
    }

    #[test]
    fn surface_extent_never_reports_zero() {
        assert_eq!(surface_extent(0.0), 1);
        assert_eq!(surface_extent(1280.7), 1280);
    }

    #[test]
    fn colors_convert_channel_for_channel() {
        let converted = to_macroquad_color(bart_rendering::Color::new(0.1, 0.2, 0.3, 0.4));

        assert_eq!(converted.r, 0.1);
        assert_eq!(converted.g, 0.2);
        assert_eq!(converted.b, 0.3);
        assert_eq!(converted.a, 0.4);
    }
}
