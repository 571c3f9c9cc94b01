// Copyright 2025 The hopssh Authors
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
//     http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.

//! The wire envelope exchanged with the duplex message transport.

use serde::{Deserialize, Serialize};

/// One frame on the interactive bridge.
///
/// `op` is one of [`Message::STDIN`], [`Message::STDOUT`] or
/// [`Message::RESIZE`]; anything else is rejected by the bridge's read path.
/// The envelope is treated as opaque here, field names on the wire are
/// `Op`/`Data`/`Rows`/`Cols`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase", default)]
pub struct Message {
    pub op: String,
    pub data: String,
    pub rows: u16,
    pub cols: u16,
}

impl Message {
    pub const STDIN: &'static str = "stdin";
    pub const STDOUT: &'static str = "stdout";
    pub const RESIZE: &'static str = "resize";

    pub fn stdin(data: impl Into<String>) -> Self {
        Self {
            op: Self::STDIN.to_string(),
            data: data.into(),
            ..Default::default()
        }
    }

    pub fn stdout(data: impl Into<String>) -> Self {
        Self {
            op: Self::STDOUT.to_string(),
            data: data.into(),
            ..Default::default()
        }
    }

    pub fn resize(rows: u16, cols: u16) -> Self {
        Self {
            op: Self::RESIZE.to_string(),
            rows,
            cols,
            ..Default::default()
        }
    }
}

/// A transient terminal-size change, delivered from the transport side.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ResizeEvent {
    pub rows: u16,
    pub cols: u16,
}
