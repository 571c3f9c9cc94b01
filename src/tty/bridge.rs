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

//! Bridging between a message transport and a shell session's byte streams.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;

use super::message::{Message, ResizeEvent};
use super::transport::{MessageSink, MessageSource};
use crate::ssh::Error;

/// One-shot close signal shared between the bridge, the transport pump and
/// the shell loop. Firing twice is a no-op; the atomic guard makes "close
/// exactly once" explicit instead of leaning on channel double-close
/// behavior.
#[derive(Debug, Clone)]
pub struct CloseSignal {
    token: CancellationToken,
    fired: Arc<AtomicBool>,
}

impl CloseSignal {
    fn new() -> Self {
        Self {
            token: CancellationToken::new(),
            fired: Arc::new(AtomicBool::new(false)),
        }
    }

    /// Fire the signal. Returns false when it had already fired.
    pub fn fire(&self) -> bool {
        if self.fired.swap(true, Ordering::SeqCst) {
            return false;
        }
        self.token.cancel();
        true
    }

    pub fn is_fired(&self) -> bool {
        self.fired.load(Ordering::SeqCst)
    }

    /// Resolves once the signal has fired, immediately if it already has.
    pub async fn fired(&self) {
        self.token.cancelled().await;
    }
}

/// The transport-to-session direction.
///
/// [`read`](BridgeReader::read) turns incoming frames into stdin bytes.
/// Resize frames never produce bytes; they are routed onto the bridge's
/// resize channel and the caller retries the read.
pub struct BridgeReader<S: MessageSource> {
    source: S,
    resize_tx: Option<mpsc::UnboundedSender<ResizeEvent>>,
}

impl<S: MessageSource> BridgeReader<S> {
    /// Block until one frame arrives and copy its payload into `buf`.
    ///
    /// Returns the number of bytes copied: the payload length for a `stdin`
    /// frame (truncated to `buf`), zero for a `resize` frame. Any other
    /// operation tag fails with [`Error::UnknownOp`] and consumes nothing.
    pub async fn read(&mut self, buf: &mut [u8]) -> Result<usize, Error> {
        let message = self.source.recv().await.map_err(Error::Transport)?;
        match message.op.as_str() {
            Message::STDIN => {
                let bytes = message.data.as_bytes();
                let n = bytes.len().min(buf.len());
                buf[..n].copy_from_slice(&bytes[..n]);
                Ok(n)
            }
            Message::RESIZE => {
                if let Some(tx) = &self.resize_tx {
                    let _ = tx.send(ResizeEvent {
                        rows: message.rows,
                        cols: message.cols,
                    });
                }
                Ok(0)
            }
            other => Err(Error::UnknownOp(other.to_string())),
        }
    }

    /// Stop forwarding resize frames and close the resize channel.
    fn close_resize(&mut self) {
        self.resize_tx = None;
    }
}

/// The session-to-transport direction: shell output wrapped as `stdout`
/// frames.
pub struct BridgeWriter<K: MessageSink> {
    sink: K,
}

impl<K: MessageSink> BridgeWriter<K> {
    /// Wrap `data` as a `stdout` frame and send it. A transport failure
    /// propagates as a write error.
    pub async fn write(&mut self, data: &[u8]) -> Result<usize, Error> {
        self.sink
            .send(Message::stdout(String::from_utf8_lossy(data).into_owned()))
            .await
            .map_err(Error::Transport)?;
        Ok(data.len())
    }
}

/// Wires a duplex message transport to an interactive shell session.
///
/// Built from the two halves of the transport, then handed to
/// [`Connection::serve_shell`](crate::ssh::Connection::serve_shell). The
/// resize channel is an optional capability: the shell loop probes for it
/// with [`take_resize_events`](TtyBridge::take_resize_events) and simply
/// leaves resize unwired when the receiver is already gone.
pub struct TtyBridge<S: MessageSource, K: MessageSink> {
    reader: BridgeReader<S>,
    writer: BridgeWriter<K>,
    resize_rx: Option<mpsc::UnboundedReceiver<ResizeEvent>>,
    close: CloseSignal,
}

impl<S: MessageSource, K: MessageSink> TtyBridge<S, K> {
    pub fn new(source: S, sink: K) -> Self {
        let (resize_tx, resize_rx) = mpsc::unbounded_channel();
        Self {
            reader: BridgeReader {
                source,
                resize_tx: Some(resize_tx),
            },
            writer: BridgeWriter { sink },
            resize_rx: Some(resize_rx),
            close: CloseSignal::new(),
        }
    }

    /// See [`BridgeReader::read`].
    pub async fn read(&mut self, buf: &mut [u8]) -> Result<usize, Error> {
        self.reader.read(buf).await
    }

    /// See [`BridgeWriter::write`].
    pub async fn write(&mut self, data: &[u8]) -> Result<usize, Error> {
        self.writer.write(data).await
    }

    /// Probe for the resize capability. The first caller gets the receiver;
    /// afterwards (or after close) resize is simply not available.
    pub fn take_resize_events(&mut self) -> Option<mpsc::UnboundedReceiver<ResizeEvent>> {
        self.resize_rx.take()
    }

    /// Handle for observing or triggering teardown from either side.
    pub fn close_signal(&self) -> CloseSignal {
        self.close.clone()
    }

    /// Close the bridge: fire the close signal and close the resize channel.
    /// Both happen at most once across any number of calls.
    pub fn close(&mut self) {
        if self.close.fire() {
            self.reader.close_resize();
            self.resize_rx = None;
        }
    }

    pub(crate) fn split(
        self,
    ) -> (
        BridgeReader<S>,
        BridgeWriter<K>,
        Option<mpsc::UnboundedReceiver<ResizeEvent>>,
        CloseSignal,
    ) {
        (self.reader, self.writer, self.resize_rx, self.close)
    }
}
