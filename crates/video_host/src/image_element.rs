//! Stretch-aware image element hosted on the video thread.

use serde::{Deserialize, Serialize};

use frame_renderer::{DisplayImage, ImageSink};
use visual_host::{HostedElement, Size};

/// How the image fills the space it is arranged into.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum Stretch {
    /// Natural pixel size.
    None,
    /// Fill both dimensions, ignoring aspect ratio.
    Fill,
    /// Fit inside, preserving aspect ratio.
    #[default]
    Uniform,
    /// Cover, preserving aspect ratio; overflow is clipped.
    UniformToFill,
}

/// Which way scaling is allowed to go.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum StretchDirection {
    UpOnly,
    DownOnly,
    #[default]
    Both,
}

/// Per-axis scale for content of `content` size placed into `available`.
///
/// An infinite axis follows the finite one; if both are infinite the content keeps its
/// natural size.
pub fn scale_factor(
    available: Size,
    content: Size,
    stretch: Stretch,
    direction: StretchDirection,
) -> (f64, f64) {
    let width_unbounded = available.width.is_infinite();
    let height_unbounded = available.height.is_infinite();
    if stretch == Stretch::None || (width_unbounded && height_unbounded) {
        return (1.0, 1.0);
    }

    let ratio = |space: f64, natural: f64| if natural == 0.0 { 0.0 } else { space / natural };
    let mut sx = ratio(available.width, content.width);
    let mut sy = ratio(available.height, content.height);

    if width_unbounded {
        sx = sy;
    } else if height_unbounded {
        sy = sx;
    } else {
        match stretch {
            Stretch::Uniform => {
                let s = sx.min(sy);
                (sx, sy) = (s, s);
            }
            Stretch::UniformToFill => {
                let s = sx.max(sy);
                (sx, sy) = (s, s);
            }
            Stretch::Fill | Stretch::None => {}
        }
    }

    match direction {
        StretchDirection::UpOnly => (sx.max(1.0), sy.max(1.0)),
        StretchDirection::DownOnly => (sx.min(1.0), sy.min(1.0)),
        StretchDirection::Both => (sx, sy),
    }
}

#[derive(Debug)]
pub struct ImageElement {
    source: Option<DisplayImage>,
    stretch: Stretch,
    stretch_direction: StretchDirection,
    desired: Size,
    render_size: Size,
    last_available: Size,
    dirty: bool,
    revision: u64,
    invalidations: u64,
}

impl Default for ImageElement {
    fn default() -> Self {
        Self::new()
    }
}

impl ImageElement {
    pub fn new() -> Self {
        Self {
            source: None,
            stretch: Stretch::default(),
            stretch_direction: StretchDirection::default(),
            desired: Size::ZERO,
            render_size: Size::ZERO,
            last_available: Size::INFINITE,
            dirty: false,
            revision: 0,
            invalidations: 0,
        }
    }

    pub fn source(&self) -> Option<&DisplayImage> {
        self.source.as_ref()
    }

    pub fn stretch(&self) -> Stretch {
        self.stretch
    }

    pub fn set_stretch(&mut self, stretch: Stretch) {
        if self.stretch != stretch {
            self.stretch = stretch;
            self.relayout();
        }
    }

    pub fn stretch_direction(&self) -> StretchDirection {
        self.stretch_direction
    }

    pub fn set_stretch_direction(&mut self, direction: StretchDirection) {
        if self.stretch_direction != direction {
            self.stretch_direction = direction;
            self.relayout();
        }
    }

    /// Number of redraw requests received since creation.
    pub fn invalidations(&self) -> u64 {
        self.invalidations
    }

    pub fn revision(&self) -> u64 {
        self.revision
    }

    fn natural_size(&self) -> Size {
        self.source
            .as_ref()
            .map(|image| Size::new(f64::from(image.width()), f64::from(image.height())))
            .unwrap_or(Size::ZERO)
    }

    fn scaled(&self, available: Size) -> Size {
        let natural = self.natural_size();
        let (sx, sy) = scale_factor(available, natural, self.stretch, self.stretch_direction);
        Size::new(natural.width * sx, natural.height * sy)
    }

    // Re-runs layout against the last constraint; a hosted root has no parent pass to rely on.
    fn relayout(&mut self) {
        let desired = self.measure(self.last_available);
        self.arrange(desired);
        self.dirty = true;
    }
}

impl HostedElement for ImageElement {
    fn measure(&mut self, available: Size) -> Size {
        self.last_available = available;
        self.desired = self.scaled(available);
        self.desired
    }

    fn desired_size(&self) -> Size {
        self.desired
    }

    fn arrange(&mut self, final_size: Size) -> Size {
        let arranged = self.scaled(final_size);
        if arranged != self.render_size {
            self.render_size = arranged;
            self.dirty = true;
        }
        arranged
    }

    fn render_size(&self) -> Size {
        self.render_size
    }

    fn is_visual_dirty(&self) -> bool {
        self.dirty
    }

    fn render(&mut self) -> u64 {
        self.dirty = false;
        self.revision += 1;
        self.revision
    }
}

impl ImageSink for ImageElement {
    fn set_source(&mut self, image: DisplayImage) {
        let resized = self
            .source
            .as_ref()
            .map_or(true, |current| {
                current.width() != image.width() || current.height() != image.height()
            });
        self.source = Some(image);
        if resized {
            self.relayout();
        }
    }

    fn invalidate_visual(&mut self) {
        self.invalidations += 1;
        self.dirty = true;
    }
}
