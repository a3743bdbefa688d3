// SPDX-FileCopyrightText: 2026 Beacon Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Trait definitions for the external collaborators of the Beacon core.

pub mod sender;
pub mod store;
pub mod surface;

pub use sender::NotificationSender;
pub use store::SessionStore;
pub use surface::SurfaceAdapter;
