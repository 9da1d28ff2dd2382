use crate::layout::Size;

/// A UI-tree node living on the hosted thread.
///
/// Layout follows the usual two-pass contract: `measure` computes and stores the desired
/// size for the offered space, `arrange` commits a final size. Elements track their own
/// visual dirtiness; `render` is called by the hosted thread when [`is_visual_dirty`]
/// reports true and returns a revision number identifying the composed content.
///
/// [`is_visual_dirty`]: HostedElement::is_visual_dirty
pub trait HostedElement: 'static {
    fn measure(&mut self, available: Size) -> Size;

    fn desired_size(&self) -> Size;

    fn arrange(&mut self, final_size: Size) -> Size;

    fn render_size(&self) -> Size;

    fn is_visual_dirty(&self) -> bool;

    fn render(&mut self) -> u64;
}

/// Builds the hosted element. Runs on the hosted thread, once per load.
///
/// `Ok(None)` means "nothing to host": the thread exits without starting its loop.
pub trait ElementFactory: Send + Sync + 'static {
    type Element: HostedElement;

    fn create_element(&self) -> anyhow::Result<Option<Self::Element>>;
}

impl<E, F> ElementFactory for F
where
    E: HostedElement,
    F: Fn() -> anyhow::Result<Option<E>> + Send + Sync + 'static,
{
    type Element = E;

    fn create_element(&self) -> anyhow::Result<Option<E>> {
        self()
    }
}
