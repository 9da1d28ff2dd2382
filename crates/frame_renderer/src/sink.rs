use crate::image::DisplayImage;

/// Element that displays a [`DisplayImage`], driven by the renderer on the hosting thread.
pub trait ImageSink {
    fn set_source(&mut self, image: DisplayImage);

    /// Mark the element for redraw from the source's current bytes.
    fn invalidate_visual(&mut self);
}
