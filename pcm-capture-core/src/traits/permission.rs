use crate::models::audio_models::{Capability, PermissionStatus};

/// Callback invoked once the user answers a permission prompt.
pub type PermissionCallback = Box<dyn FnOnce(PermissionStatus) + Send + 'static>;

/// Host permission system.
///
/// Grants are checked on every start; a missing grant rejects the start.
pub trait PermissionProvider: Send + Sync {
    fn has_permission(&self, capability: Capability) -> bool;

    /// Ask the host to prompt for `capability`. The answer arrives later through `on_result`.
    fn request_permission(&self, capability: Capability, on_result: PermissionCallback);
}

/// Permission provider for hosts without a permission system.
#[derive(Debug, Clone, Copy, Default)]
pub struct AlwaysGranted;

impl PermissionProvider for AlwaysGranted {
    fn has_permission(&self, _capability: Capability) -> bool {
        true
    }

    fn request_permission(&self, _capability: Capability, on_result: PermissionCallback) {
        on_result(PermissionStatus::Granted);
    }
}
