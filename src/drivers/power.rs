//! Machine power control

/// Power-off collaborator used by `halt`.
pub trait Power: Send + Sync {
    /// Turn the machine off. On real hardware this does not return.
    fn power_off(&self);
}
