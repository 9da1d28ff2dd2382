use std::sync::Arc;

use visual_host::{
    ElementFactory, HostConfig, HostVisual, HostedDispatcher, ParentThread, Property, PropertyProxy,
    Size, ThreadSeparatedHost,
};

use crate::image_element::{ImageElement, Stretch, StretchDirection};

pub const STRETCH: Property<ImageElement, Stretch> =
    Property::new("stretch", ImageElement::stretch, ImageElement::set_stretch);

pub const STRETCH_DIRECTION: Property<ImageElement, StretchDirection> = Property::new(
    "stretch_direction",
    ImageElement::stretch_direction,
    ImageElement::set_stretch_direction,
);

/// Builds a fresh [`ImageElement`] on the hosted thread.
#[derive(Debug, Default, Clone, Copy)]
pub struct ImageElementFactory;

impl ElementFactory for ImageElementFactory {
    type Element = ImageElement;

    fn create_element(&self) -> anyhow::Result<Option<ImageElement>> {
        Ok(Some(ImageElement::new()))
    }
}

/// An [`ImageElement`] running on its own thread.
pub struct ImageHost {
    host: ThreadSeparatedHost<ImageElementFactory>,
    stretch: PropertyProxy<ImageElement, Stretch>,
    stretch_direction: PropertyProxy<ImageElement, StretchDirection>,
}

impl ImageHost {
    pub fn new(parent: Arc<dyn ParentThread>, config: HostConfig) -> Self {
        let host = ThreadSeparatedHost::new(ImageElementFactory, parent, config);
        let stretch = host.property(STRETCH);
        let stretch_direction = host.property(STRETCH_DIRECTION);
        Self {
            host,
            stretch,
            stretch_direction,
        }
    }

    pub fn stretch(&self) -> &PropertyProxy<ImageElement, Stretch> {
        &self.stretch
    }

    pub fn stretch_direction(&self) -> &PropertyProxy<ImageElement, StretchDirection> {
        &self.stretch_direction
    }

    pub fn host(&self) -> &ThreadSeparatedHost<ImageElementFactory> {
        &self.host
    }

    pub fn load(&mut self) -> visual_host::Result<()> {
        self.host.load()
    }

    pub fn unload(&mut self) {
        self.host.unload();
    }

    pub fn hosted_dispatcher(&self) -> Option<HostedDispatcher<ImageElement>> {
        self.host.hosted_dispatcher()
    }

    pub fn anchor(&self) -> Option<&HostVisual> {
        self.host.anchor()
    }

    pub fn measure(&self, constraint: Size) -> Size {
        self.host.measure_override(constraint)
    }

    pub fn arrange(&self, final_size: Size) -> Size {
        self.host.arrange_override(final_size)
    }
}
