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

//! Interactive shell activation over a [`TtyBridge`].

use russh::{ChannelMsg, Pty};
use tokio::sync::mpsc;

use super::bridge::TtyBridge;
use super::message::ResizeEvent;
use super::transport::{MessageSink, MessageSource};
use crate::ssh::{Connection, Error};

/// Nominal baud rates; remote ptys want a value, any value.
const PTY_BAUD: u32 = 14400;

/// Read buffer for incoming stdin frames. 4KB lines up with common SSH
/// packet fragmentation.
const INPUT_BUFFER_SIZE: usize = 4096;

/// Bounded queue between the transport pump and the shell loop. Interactive
/// input is small; 256 entries absorbs paste bursts without letting the
/// queue grow unbounded.
const STDIN_CHANNEL_SIZE: usize = 256;

/// Initial terminal geometry for the remote shell.
#[derive(Debug, Clone)]
pub struct ShellOptions {
    pub rows: u32,
    pub cols: u32,
    pub term: String,
}

impl Default for ShellOptions {
    fn default() -> Self {
        Self {
            rows: 50,
            cols: 180,
            term: "xterm".to_string(),
        }
    }
}

/// Lifecycle of one bridged shell.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum ShellState {
    Idle,
    SessionBound,
    PtyRequested,
    ShellRunning,
    Closed,
}

impl Connection {
    /// Run an interactive shell, wired to `bridge`, until the remote shell
    /// exits or the bridge's close signal fires. Both paths release the same
    /// resources exactly once.
    ///
    /// A failure to acquire the session, request the PTY or start the shell
    /// aborts the whole bridge and is returned to the caller.
    pub async fn serve_shell<S, K>(
        &self,
        bridge: TtyBridge<S, K>,
        options: ShellOptions,
    ) -> Result<(), Error>
    where
        S: MessageSource + 'static,
        K: MessageSink,
    {
        let mut state = ShellState::Idle;
        tracing::trace!(?state, "binding session");
        let mut channel = self.new_session().await?;
        state = ShellState::SessionBound;
        tracing::trace!(?state, "session bound");

        channel
            .request_pty(
                false,
                &options.term,
                options.cols,
                options.rows,
                0,
                0,
                &[
                    (Pty::ECHO, 1),
                    (Pty::TTY_OP_ISPEED, PTY_BAUD),
                    (Pty::TTY_OP_OSPEED, PTY_BAUD),
                ],
            )
            .await?;
        state = ShellState::PtyRequested;
        tracing::debug!(?state, rows = options.rows, cols = options.cols, "pty allocated");

        // Capability probe: a bridge whose resize receiver is already gone
        // simply runs without resize delivery; a closed stand-in channel
        // keeps the select loop uniform.
        let (reader, mut writer, resize_rx, close) = bridge.split();
        let mut resize_rx = resize_rx.unwrap_or_else(|| {
            let (_tx, rx) = mpsc::unbounded_channel();
            rx
        });

        channel.request_shell(false).await?;
        state = ShellState::ShellRunning;
        tracing::debug!(?state, "shell started");

        // Pump frames off the transport: stdin bytes go to the queue below,
        // resize frames were already routed by the reader, an unknown
        // operation ends the pump, a dead transport fires the close signal.
        let (stdin_tx, mut stdin_rx) = mpsc::channel::<Vec<u8>>(STDIN_CHANNEL_SIZE);
        let pump_close = close.clone();
        let input_task = tokio::spawn(async move {
            let mut reader = reader;
            let mut buf = vec![0u8; INPUT_BUFFER_SIZE];
            loop {
                tokio::select! {
                    _ = pump_close.fired() => break,
                    read = reader.read(&mut buf) => match read {
                        Ok(0) => {}
                        Ok(n) => {
                            if stdin_tx.send(buf[..n].to_vec()).await.is_err() {
                                break;
                            }
                        }
                        Err(Error::UnknownOp(op)) => {
                            tracing::warn!(%op, "unknown message operation, stdin pump stopped");
                            break;
                        }
                        Err(err) => {
                            tracing::debug!(%err, "message transport closed");
                            pump_close.fire();
                            break;
                        }
                    },
                }
            }
        });

        let mut result: Result<(), Error> = Ok(());
        'session: loop {
            tokio::select! {
                msg = channel.wait() => match msg {
                    Some(ChannelMsg::Data { data }) => {
                        if let Err(err) = writer.write(&data).await {
                            result = Err(err);
                            break 'session;
                        }
                    }
                    Some(ChannelMsg::ExtendedData { data, ext }) if ext == 1 => {
                        if let Err(err) = writer.write(&data).await {
                            result = Err(err);
                            break 'session;
                        }
                    }
                    Some(ChannelMsg::ExitStatus { exit_status }) => {
                        tracing::debug!(exit_status, "remote shell exited");
                    }
                    Some(_) => {}
                    // The session wait returned: the shell is gone.
                    None => break 'session,
                },
                Some(data) = stdin_rx.recv() => {
                    if let Err(err) = channel.data(&data[..]).await {
                        result = Err(Error::Ssh(err));
                        break 'session;
                    }
                }
                Some(ResizeEvent { rows, cols }) = resize_rx.recv() => {
                    if let Err(err) =
                        channel.window_change(u32::from(cols), u32::from(rows), 0, 0).await
                    {
                        if matches!(err, russh::Error::SendError) {
                            // End of stream: stop draining, quietly.
                            resize_rx.close();
                        } else {
                            tracing::warn!(%err, "window change failed");
                        }
                    }
                }
                _ = close.fired() => break 'session,
            }
        }

        state = ShellState::Closed;
        tracing::debug!(?state, "bridge torn down");
        close.fire();
        let _ = channel.eof().await;
        let _ = input_task.await;

        result
    }
}
