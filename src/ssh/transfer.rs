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

//! SFTP file transfer on an established connection.

use russh_sftp::client::SftpSession;
use russh_sftp::protocol::OpenFlags;
use std::path::Path;
use tokio::io::{AsyncReadExt, AsyncWriteExt};

use super::connection::Connection;
use super::Error;

impl Connection {
    /// Start an SFTP session on a fresh channel.
    ///
    /// The remote side must have the `sftp` subsystem enabled, e.g.
    /// `Subsystem sftp internal-sftp` in its sshd_config.
    pub async fn sftp(&self) -> Result<SftpSession, Error> {
        let channel = self.new_session().await?;
        channel.request_subsystem(true, "sftp").await?;
        let sftp = SftpSession::new(channel.into_stream()).await?;
        Ok(sftp)
    }

    /// Copy a local file to `remote_path`, replacing it if it exists.
    pub async fn upload(&self, local_path: &Path, remote_path: &str) -> Result<(), Error> {
        let sftp = self.sftp().await?;

        let contents = tokio::fs::read(local_path)
            .await
            .map_err(Error::TransferIo)?;

        let mut remote = sftp
            .open_with_flags(
                remote_path,
                OpenFlags::CREATE | OpenFlags::TRUNCATE | OpenFlags::WRITE,
            )
            .await?;
        remote.write_all(&contents).await.map_err(Error::TransferIo)?;
        remote.flush().await.map_err(Error::TransferIo)?;
        remote.shutdown().await.map_err(Error::TransferIo)?;

        tracing::debug!(?local_path, remote_path, bytes = contents.len(), "upload complete");
        Ok(())
    }

    /// Copy a remote file to `local_path`, creating parent directories as
    /// needed.
    pub async fn download(&self, remote_path: &str, local_path: &Path) -> Result<(), Error> {
        let sftp = self.sftp().await?;

        let mut remote = sftp.open_with_flags(remote_path, OpenFlags::READ).await?;
        let mut contents = Vec::new();
        remote
            .read_to_end(&mut contents)
            .await
            .map_err(Error::TransferIo)?;

        if let Some(parent) = local_path.parent() {
            tokio::fs::create_dir_all(parent)
                .await
                .map_err(Error::TransferIo)?;
        }
        tokio::fs::write(local_path, &contents)
            .await
            .map_err(Error::TransferIo)?;

        tracing::debug!(remote_path, ?local_path, bytes = contents.len(), "download complete");
        Ok(())
    }
}
