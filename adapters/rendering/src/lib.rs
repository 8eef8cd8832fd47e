#![deny(
    unsafe_code,
    missing_docs,
    dead_code,
    unused_results,
    non_snake_case,
    unreachable_pub
)]

//! Shared rendering contracts for Balloon Analogue Risk Task adapters.
//!
//! Backends receive a [`Scene`] each frame: a flat list of centred images and
//! text lines composed from the controller's [`TaskView`]. Layout happens here
//! so every backend places content identically for a given viewport.

use anyhow::Result as AnyResult;
use bart_core::{Background, BalloonView, RiskTier, RoundOutcome, TaskInput, TaskView};
use glam::Vec2;
use std::{error::Error, fmt, path::PathBuf};

/// Font size of headline text.
const HEADLINE_SIZE: f32 = 32.0;
/// Font size of the winnings counters.
const COUNTER_SIZE: f32 = 24.0;
/// Vertical offset of the winnings counters from the top edge.
const COUNTER_TOP: f32 = 30.0;
/// Drawn size of the balloon artwork.
const BALLOON_SIZE: Vec2 = Vec2::new(400.0, 540.0);
/// Drawn size of the burst artwork for an uninflated balloon.
const BANG_BASE_SIZE: Vec2 = Vec2::new(112.0, 105.0);
/// Pixels the burst rises for every pump made.
const BANG_RISE_PER_PUMP: f32 = 10.0;

/// RGBA color used when presenting frames.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Color {
    /// Red channel intensity in the range 0.0..=1.0.
    pub red: f32,
    /// Green channel intensity in the range 0.0..=1.0.
    pub green: f32,
    /// Blue channel intensity in the range 0.0..=1.0.
    pub blue: f32,
    /// Alpha channel intensity in the range 0.0..=1.0.
    pub alpha: f32,
}

impl Color {
    /// Opaque black.
    pub const BLACK: Self = Self::from_rgb_u8(0, 0, 0);
    /// Opaque white.
    pub const WHITE: Self = Self::from_rgb_u8(255, 255, 255);
    /// Loss feedback red.
    pub const RED: Self = Self::from_rgb_u8(255, 0, 0);
    /// Win feedback green.
    pub const GREEN: Self = Self::from_rgb_u8(0, 128, 0);

    /// Creates a new color from floating point channels.
    #[must_use]
    pub const fn new(red: f32, green: f32, blue: f32, alpha: f32) -> Self {
        Self {
            red,
            green,
            blue,
            alpha,
        }
    }

    /// Creates an opaque color from byte RGB values.
    #[must_use]
    pub const fn from_rgb_u8(red: u8, green: u8, blue: u8) -> Self {
        Self {
            red: red as f32 / 255.0,
            green: green as f32 / 255.0,
            blue: blue as f32 / 255.0,
            alpha: 1.0,
        }
    }

    /// Returns a new color lightened towards white by the provided amount.
    #[must_use]
    pub fn lighten(self, amount: f32) -> Self {
        let amount = amount.clamp(0.0, 1.0);

        Self {
            red: lighten_channel(self.red, amount),
            green: lighten_channel(self.green, amount),
            blue: lighten_channel(self.blue, amount),
            alpha: self.alpha,
        }
    }

    /// Fill used for balloons of the tier when artwork is unavailable.
    #[must_use]
    pub const fn for_tier(tier: RiskTier) -> Self {
        match tier {
            RiskTier::High => Self::from_rgb_u8(0xd3, 0x2f, 0x2f),
            RiskTier::Medium => Self::from_rgb_u8(0xf5, 0x9e, 0x0b),
            RiskTier::Low => Self::from_rgb_u8(0x1e, 0x88, 0xe5),
        }
    }
}

fn lighten_channel(channel: f32, amount: f32) -> f32 {
    channel + (1.0 - channel) * amount
}

/// Size of the presentation surface in pixels.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct Viewport {
    width: u32,
    height: u32,
}

impl Viewport {
    /// Creates a viewport, rejecting surfaces without area.
    pub const fn new(width: u32, height: u32) -> Result<Self, RenderingError> {
        if width == 0 || height == 0 {
            return Err(RenderingError::EmptyViewport { width, height });
        }
        Ok(Self { width, height })
    }

    /// Surface width in pixels.
    #[must_use]
    pub const fn width(&self) -> u32 {
        self.width
    }

    /// Surface height in pixels.
    #[must_use]
    pub const fn height(&self) -> u32 {
        self.height
    }

    fn size(&self) -> Vec2 {
        Vec2::new(self.width as f32, self.height as f32)
    }
}

/// Artwork referenced by a scene.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum ImageKey {
    /// Balloon inflated to `stage` (one more than the pumps made) for the tier.
    Balloon {
        /// Inflation stage, starting at 1 for an untouched balloon.
        stage: u32,
        /// Risk tier selecting the balloon colour.
        tier: RiskTier,
    },
    /// Burst drawn over a popped balloon.
    Bang,
    /// Full-window backdrop.
    Background(Background),
}

impl ImageKey {
    /// File name of the artwork relative to the images directory.
    #[must_use]
    pub fn file_name(&self) -> PathBuf {
        match self {
            Self::Balloon { stage, tier } => PathBuf::from(format!("balloon{stage}{tier}.png")),
            Self::Bang => PathBuf::from("bang.png"),
            Self::Background(background) => PathBuf::from(format!("{}.jpg", background.as_str())),
        }
    }
}

/// Image placed in the scene.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct SceneImage {
    /// Artwork to draw.
    pub key: ImageKey,
    /// Centre of the image in screen pixels.
    pub center: Vec2,
    /// Drawn size in screen pixels.
    pub size: Vec2,
}

/// Line of text placed in the scene.
#[derive(Clone, Debug, PartialEq)]
pub struct SceneText {
    /// Content of the line.
    pub text: String,
    /// Font size in pixels.
    pub size: f32,
    /// Centre of the line in screen pixels.
    pub center: Vec2,
    /// Fill colour.
    pub color: Color,
}

impl SceneText {
    fn new(text: impl Into<String>, size: f32, center: Vec2, color: Color) -> Self {
        Self {
            text: text.into(),
            size,
            center,
            color,
        }
    }
}

/// Everything a backend draws for one frame, in painting order.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct Scene {
    /// Images drawn first, in order.
    pub images: Vec<SceneImage>,
    /// Text drawn above the images, in order.
    pub texts: Vec<SceneText>,
}

impl Scene {
    /// Lays out the view for the viewport, placing the background behind everything.
    #[must_use]
    pub fn compose(view: &TaskView, viewport: Viewport, background: Option<Background>) -> Self {
        let size = viewport.size();
        let mut scene = Self::default();

        if let Some(background) = background {
            scene.images.push(SceneImage {
                key: ImageKey::Background(background),
                center: size * 0.5,
                size,
            });
        }

        match view {
            TaskView::Welcome => {
                scene.headline(
                    "Welcome to the Balloon Analogue Risk Task (BART)!",
                    size.y / 2.0 - 50.0,
                    size,
                );
                scene.headline("Press enter to start or <q> to quit", size.y / 2.0, size);
            }
            TaskView::Preparing => {}
            TaskView::Inflating(balloon) => {
                scene.balloon(balloon, size);
                scene.counters(balloon, size);
            }
            TaskView::RoundOver {
                balloon,
                outcome,
                feedback,
            } => {
                scene.counters(balloon, size);
                scene.headline("Press enter to continue", size.y - 40.0, size);
                scene.balloon(balloon, size);
                match outcome {
                    RoundOutcome::Popped => {
                        scene.bang(balloon, size);
                        if *feedback {
                            scene.texts.push(SceneText::new(
                                "Boom!! You lost this round!",
                                HEADLINE_SIZE,
                                Vec2::new(size.x / 2.0, size.y - 80.0),
                                Color::RED,
                            ));
                        }
                    }
                    RoundOutcome::Cashed => {
                        if *feedback {
                            scene.win_feedback(balloon, size);
                        }
                    }
                }
            }
            TaskView::Complete => {
                scene.headline("The test is now complete", size.y / 2.0, size);
                scene.headline("Press <enter> to exit the app", size.y / 2.0 + 40.0, size);
            }
        }

        scene
    }

    fn headline(&mut self, text: &str, y: f32, size: Vec2) {
        self.texts.push(SceneText::new(
            text,
            HEADLINE_SIZE,
            Vec2::new(size.x / 2.0, y),
            Color::BLACK,
        ));
    }

    fn counters(&mut self, balloon: &BalloonView, size: Vec2) {
        self.texts.push(SceneText::new(
            format!("Money won this round: £{}", balloon.round_winnings),
            COUNTER_SIZE,
            Vec2::new(size.x / 4.0, COUNTER_TOP),
            Color::BLACK,
        ));
        self.texts.push(SceneText::new(
            format!("Total money won: £{}", balloon.total_winnings),
            COUNTER_SIZE,
            Vec2::new(size.x / 4.0 * 3.0, COUNTER_TOP),
            Color::BLACK,
        ));
    }

    fn balloon(&mut self, balloon: &BalloonView, size: Vec2) {
        self.images.push(SceneImage {
            key: ImageKey::Balloon {
                stage: balloon.pumps + 1,
                tier: balloon.tier,
            },
            center: size * 0.5,
            size: BALLOON_SIZE,
        });
    }

    fn bang(&mut self, balloon: &BalloonView, size: Vec2) {
        let growth = ((balloon.pumps + 1) as f32).sqrt();
        self.images.push(SceneImage {
            key: ImageKey::Bang,
            center: Vec2::new(
                size.x / 2.0,
                size.y / 2.0 - balloon.pumps as f32 * BANG_RISE_PER_PUMP,
            ),
            size: BANG_BASE_SIZE * growth,
        });
    }

    fn win_feedback(&mut self, balloon: &BalloonView, size: Vec2) {
        // Sits just right of the total counter, shifting with its digit count.
        let digits = balloon.total_winnings.to_string().len() as f32;
        self.texts.push(SceneText::new(
            format!("+£{}", balloon.round_winnings),
            COUNTER_SIZE,
            Vec2::new(size.x / 4.0 * 3.0 + 145.0 + 15.0 * (digits - 1.0), COUNTER_TOP),
            Color::GREEN,
        ));
        self.texts.push(SceneText::new(
            format!("You won £{} this round!", balloon.round_winnings),
            HEADLINE_SIZE,
            Vec2::new(size.x / 2.0, size.y - 80.0),
            Color::GREEN,
        ));
    }
}

/// Input gathered by a backend during one frame.
#[derive(Clone, Debug, PartialEq)]
pub struct FrameInput {
    /// Discrete inputs in the order they occurred.
    pub inputs: Vec<TaskInput>,
    /// Surface size at the start of the frame.
    pub viewport: Viewport,
}

/// Presentation descriptor consumed by rendering backends.
#[derive(Clone, Debug, PartialEq)]
pub struct Presentation {
    /// Title used by the created window.
    pub window_title: String,
    /// Solid color used to clear each frame.
    pub clear_color: Color,
    /// Initial window size.
    pub viewport: Viewport,
    /// Directory holding the artwork referenced by scenes.
    pub images_dir: PathBuf,
}

impl Presentation {
    /// Constructs a new presentation descriptor.
    #[must_use]
    pub fn new<T>(window_title: T, clear_color: Color, viewport: Viewport, images_dir: PathBuf) -> Self
    where
        T: Into<String>,
    {
        Self {
            window_title: window_title.into(),
            clear_color,
            viewport,
            images_dir,
        }
    }
}

/// Rendering backend capable of presenting task scenes.
pub trait RenderingBackend {
    /// Runs the rendering backend until the update closure stops it.
    ///
    /// `update_scene` receives the input captured during the frame and returns
    /// the scene to draw, `None` to close the window, or an error that stops
    /// the loop and is returned from `run`.
    fn run<F>(self, presentation: Presentation, update_scene: F) -> AnyResult<()>
    where
        F: FnMut(FrameInput) -> AnyResult<Option<Scene>> + 'static;
}

/// Errors that can occur when constructing rendering descriptors.
#[derive(Debug, PartialEq, Eq)]
pub enum RenderingError {
    /// Viewports must have a positive area.
    EmptyViewport {
        /// Provided width.
        width: u32,
        /// Provided height.
        height: u32,
    },
}

impl fmt::Display for RenderingError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::EmptyViewport { width, height } => {
                write!(f, "viewport must have a positive area (received {width}x{height})")
            }
        }
    }
}

impl Error for RenderingError {}
