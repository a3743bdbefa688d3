// SPDX-FileCopyrightText: 2026 Beacon Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Session coordination and surface fan-out for the Beacon daemon.
//!
//! This crate carries the stateful heart of the system:
//! - [`SessionCoordinator`]: the canonical status state machine with
//!   cancellable stall-detection timers
//! - [`StatusBus`]: the in-process broadcast stream of status events
//! - [`SurfaceMultiplexer`]: origin-first broadcast fan-out over attached
//!   presentation surfaces, with per-surface failure isolation
//! - [`relay`]: the bus subscriber wiring coordinator events into the
//!   multiplexer
//! - [`shutdown`]: signal handling for graceful teardown

pub mod broadcast;
pub mod bus;
pub mod coordinator;
pub mod registry;
pub mod relay;
pub mod shutdown;

pub use broadcast::SurfaceMultiplexer;
pub use bus::StatusBus;
pub use coordinator::SessionCoordinator;
pub use registry::{SurfaceEntry, SurfaceRegistry};
