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

//! The duplex message transport the bridge talks to.
//!
//! The transport itself lives outside this crate (a websocket, a test
//! harness, whatever can ferry [`Message`] frames). The bridge only needs the
//! two halves below; splitting a real duplex stream into them is the caller's
//! job, the same way websocket streams split into sink and stream halves.

use async_trait::async_trait;
use std::io;
use tokio::sync::mpsc;

use super::message::Message;

/// The receiving half of a duplex message transport. `recv` blocks until one
/// frame is available and errors on end of stream.
#[async_trait]
pub trait MessageSource: Send {
    async fn recv(&mut self) -> io::Result<Message>;
}

/// The sending half of a duplex message transport.
#[async_trait]
pub trait MessageSink: Send {
    async fn send(&mut self, message: Message) -> io::Result<()>;
}

#[async_trait]
impl MessageSource for mpsc::UnboundedReceiver<Message> {
    async fn recv(&mut self) -> io::Result<Message> {
        mpsc::UnboundedReceiver::recv(self)
            .await
            .ok_or_else(|| io::Error::new(io::ErrorKind::UnexpectedEof, "message stream closed"))
    }
}

#[async_trait]
impl MessageSink for mpsc::UnboundedSender<Message> {
    async fn send(&mut self, message: Message) -> io::Result<()> {
        mpsc::UnboundedSender::send(self, message)
            .map_err(|_| io::Error::new(io::ErrorKind::BrokenPipe, "message sink closed"))
    }
}
