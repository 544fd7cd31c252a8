// Shared event model and the capability seam injection backends implement.

pub mod capability;
pub mod event;
