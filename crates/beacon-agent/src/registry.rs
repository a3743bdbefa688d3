// SPDX-FileCopyrightText: 2026 Beacon Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Runtime registry of attached surfaces.
//!
//! Each entry is tagged with its capability flag (presentation vs
//! transport-only) once at attach time. Broadcast iteration always works on
//! a snapshot, so attach/detach on surface reconnect never races an
//! in-flight fan-out.

use std::collections::HashMap;
use std::sync::Arc;

use beacon_core::traits::surface::SurfaceAdapter;
use beacon_core::types::SurfaceKind;

/// One attached surface plus its registration-time capability flag.
#[derive(Clone)]
pub struct SurfaceEntry {
    pub name: String,
    pub surface: Arc<dyn SurfaceAdapter>,
    pub kind: SurfaceKind,
}

/// Map from surface name to live surface handle.
#[derive(Default)]
pub struct SurfaceRegistry {
    entries: HashMap<String, SurfaceEntry>,
}

impl SurfaceRegistry {
    pub fn new() -> Self {
        Self {
            entries: HashMap::new(),
        }
    }

    /// Attach a surface under its own name, capturing its kind flag once.
    ///
    /// Re-attaching under the same name replaces the previous handle
    /// (surface reconnect).
    pub fn attach(&mut self, surface: Arc<dyn SurfaceAdapter>) {
        let name = surface.name().to_string();
        let kind = surface.kind();
        self.entries.insert(
            name.clone(),
            SurfaceEntry {
                name,
                surface,
                kind,
            },
        );
    }

    /// Detach a surface by name. Returns true if it was attached.
    pub fn detach(&mut self, name: &str) -> bool {
        self.entries.remove(name).is_some()
    }

    /// Get one entry by name.
    pub fn get(&self, name: &str) -> Option<SurfaceEntry> {
        self.entries.get(name).cloned()
    }

    /// Snapshot of all entries, sorted by name for deterministic iteration.
    pub fn snapshot(&self) -> Vec<SurfaceEntry> {
        let mut entries: Vec<SurfaceEntry> = self.entries.values().cloned().collect();
        entries.sort_by(|a, b| a.name.cmp(&b.name));
        entries
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
