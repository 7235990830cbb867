/// State a replica carries while a partition split is in flight.
#[derive(Debug, Default)]
pub struct SplitState {
    /// The child replica has replayed the parent's state up to the split
    /// point; committed mutations may be applied from here on.
    pub is_caught_up: bool,

    /// The parent's prepare window has been copied into the child.
    pub is_prepare_list_copied: bool,
}

impl SplitState {
    pub fn is_cleaned(&self) -> bool {
        !self.is_caught_up && !self.is_prepare_list_copied
    }

    pub fn cleanup(&mut self) {
        self.is_caught_up = false;
        self.is_prepare_list_copied = false;
    }
}
