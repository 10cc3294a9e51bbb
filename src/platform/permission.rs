use std::fmt::Debug;

pub trait PermissionChecker: Debug + Send + Sync {
    fn has_location_permission(&self) -> bool;
}

/// A permission decided once, up front, by configuration.
#[derive(Debug)]
pub struct StaticPermissionChecker {
    granted: bool,
}

impl StaticPermissionChecker {
    pub fn new(granted: bool) -> Self {
        StaticPermissionChecker { granted }
    }
}

impl PermissionChecker for StaticPermissionChecker {
    fn has_location_permission(&self) -> bool {
        self.granted
    }
}
