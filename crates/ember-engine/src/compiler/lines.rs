// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.
//
// Copyright (c) 2025 Pegasus Heavy Industries, LLC

//! Bytecode offset to source line map.

/// Start of a run of records generated from one source line.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LineEntry {
    /// Source line
    pub line: u32,
    /// Byte offset of the first record of the run
    pub offset: u32,
}

/// Ordered list of line runs.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LineMap {
    entries: Vec<LineEntry>,
}

impl LineMap {
    /// Creates an empty map.
    pub fn new() -> Self {
        Self::default()
    }

    /// Records that the record at `offset` came from `line`.
    pub fn push(&mut self, line: u32, offset: u32) {
        if self.entries.last().is_some_and(|last| last.line == line) {
            return;
        }

        self.entries.push(LineEntry { line, offset });
    }

    /// Source line of the record at `offset`.
    pub fn lookup(&self, offset: u32) -> Option<u32> {
        let idx = self.entries.partition_point(|e| e.offset <= offset);

        if idx == 0 {
            return None;
        }

        Some(self.entries[idx - 1].line)
    }

    /// All runs in offset order.
    pub fn entries(&self) -> &[LineEntry] {
        &self.entries
    }
}
