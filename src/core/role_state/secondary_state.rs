/// State a replica carries only while serving as secondary.
#[derive(Debug, Default)]
pub struct SecondaryState {
    /// While a checkpoint task runs, committed mutations are not applied to
    /// the app; the private log holds them and catch-up happens after the
    /// checkpoint completes.
    pub checkpoint_is_running: bool,
}

impl SecondaryState {
    pub fn is_cleaned(&self) -> bool {
        !self.checkpoint_is_running
    }

    pub fn cleanup(&mut self) {
        self.checkpoint_is_running = false;
    }
}
