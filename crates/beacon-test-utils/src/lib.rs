// SPDX-FileCopyrightText: 2026 Beacon Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Test utilities for Beacon integration tests: mock surfaces, mock
//! notification senders, and an in-memory session store.

pub mod memory_store;
pub mod mock_sender;
pub mod mock_surface;

pub use memory_store::MemorySessionStore;
pub use mock_sender::MockSender;
pub use mock_surface::MockSurface;
