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

//! Interactive shell bridging over a duplex message transport.
//!
//! Raw byte piping plus explicit resize signaling; no terminal emulation
//! happens here.

pub mod bridge;
pub mod message;
pub mod shell;
pub mod transport;

pub use bridge::{BridgeReader, BridgeWriter, CloseSignal, TtyBridge};
pub use message::{Message, ResizeEvent};
pub use shell::ShellOptions;
pub use transport::{MessageSink, MessageSource};
