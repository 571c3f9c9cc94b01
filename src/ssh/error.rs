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

use std::path::PathBuf;
use thiserror::Error;

/// Error type shared by connection setup, command execution and the
/// interactive bridge.
///
/// Configuration problems surface before any network I/O. Dial failures wrap
/// the endpoint they were aimed at. An [`Error::Exec`] keeps the captured
/// output so partial results stay available to the caller.
#[derive(Debug, Error)]
pub enum Error {
    #[error("no username specified for SSH connection")]
    NoUsername,

    #[error("no address specified for SSH connection")]
    NoAddress,

    #[error("must specify at least one of password, private key, key file or agent socket")]
    NoCredentials,

    #[error("failed to read key file {path:?}")]
    KeyFile {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("the given SSH key could not be parsed")]
    KeyParse(#[source] russh::keys::Error),

    #[error("could not open agent socket {socket:?}")]
    AgentDial {
        socket: String,
        #[source]
        source: russh::keys::Error,
    },

    #[error("error when requesting signers from the SSH agent")]
    AgentSigners(#[source] russh::keys::Error),

    #[error("could not establish connection to {endpoint}")]
    Dial {
        endpoint: String,
        #[source]
        source: Box<Error>,
    },

    #[error("timed out after {seconds}s")]
    Timeout { seconds: u64 },

    #[error("authentication failed for user {username}")]
    AuthenticationFailed { username: String },

    #[error("connection closed")]
    ConnectionClosed,

    #[error(transparent)]
    Ssh(#[from] russh::Error),

    #[error(transparent)]
    Sftp(#[from] russh_sftp::client::error::Error),

    #[error("failed to exec command: {command}\n{output}")]
    Exec {
        command: String,
        /// Cleaned output captured up to the failure.
        output: String,
        /// Remote exit status, if the command exited at all.
        exit_status: Option<u32>,
    },

    #[error("unknown operation: {0}")]
    UnknownOp(String),

    #[error("message transport error")]
    Transport(#[source] std::io::Error),

    #[error("file transfer I/O error")]
    TransferIo(#[source] std::io::Error),
}

impl Error {
    /// Output captured by a failed exec, if any.
    pub fn output(&self) -> Option<&str> {
        match self {
            Error::Exec { output, .. } => Some(output),
            _ => None,
        }
    }

    /// Remote exit status reported by a failed exec.
    pub fn exit_status(&self) -> Option<u32> {
        match self {
            Error::Exec { exit_status, .. } => *exit_status,
            _ => None,
        }
    }

    /// True for errors that indicate a bad configuration rather than a
    /// runtime failure; these are never worth retrying as-is.
    pub fn is_configuration(&self) -> bool {
        matches!(
            self,
            Error::NoUsername
                | Error::NoAddress
                | Error::NoCredentials
                | Error::KeyFile { .. }
                | Error::KeyParse(_)
        )
    }
}
