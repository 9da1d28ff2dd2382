use tracing::debug;

use crate::dispatcher::Dispatcher;

pub type ParentJob = Box<dyn FnOnce() + Send>;

/// The thread that owns the parent visual tree, as seen from a hosted thread.
pub trait ParentThread: Send + Sync + 'static {
    /// Schedule `job` to run on the parent thread.
    fn post(&self, job: ParentJob);

    /// Design/preview contexts get a bridge but never a hosted thread.
    fn is_design_mode(&self) -> bool {
        false
    }
}

impl<S: 'static> ParentThread for Dispatcher<S> {
    fn post(&self, job: ParentJob) {
        if let Err(e) = self.begin_invoke(move |_| job()) {
            debug!(dispatcher = %self.name(), error = %e, "parent thread gone; job dropped");
        }
    }
}

/// A parent context that reports design mode.
pub struct DesignModeParent;

impl ParentThread for DesignModeParent {
    fn post(&self, _job: ParentJob) {}

    fn is_design_mode(&self) -> bool {
        true
    }
}
