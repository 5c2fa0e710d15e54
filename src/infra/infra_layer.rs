// The infra module contains implementations of core traits.
// Everything that actually talks to Google lives here.

#[path = "drive/mod.rs"]
pub mod drive;
