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

//! Host descriptors and dial configuration.

use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::time::Duration;

use crate::ssh::Error;

/// Default SSH port, applied whenever a port is left unset.
pub const DEFAULT_SSH_PORT: u16 = 22;

/// Default dial timeout when the caller does not supply one.
pub const DEFAULT_DIAL_TIMEOUT: Duration = Duration::from_secs(60);

/// Identity and credentials of one target machine, as read from inventory
/// configuration. Immutable once loaded; conversions into dial parameters
/// happen in [`ConnectConfig`].
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct Host {
    pub name: String,
    pub address: String,
    pub internal_address: String,
    pub port: Option<u16>,
    pub user: String,
    pub password: String,
    pub private_key_path: String,
    pub arch: String,
}

/// The intermediary hop used to reach a host that is not directly routable.
#[derive(Debug, Clone, Default)]
pub struct BastionConfig {
    pub address: String,
    /// Zero means [`DEFAULT_SSH_PORT`].
    pub port: u16,
    /// Empty means the target username is reused for the bastion hop.
    pub username: String,
}

/// Normalized dial parameters.
///
/// At least one of `password`, `private_key`, `key_file` or `agent_socket`
/// must be set. [`ConnectConfig::normalized`] enforces this, folds a key file
/// into `private_key`, and fills in defaults.
#[derive(Debug, Clone, Default)]
pub struct ConnectConfig {
    pub username: String,
    pub password: String,
    pub address: String,
    /// Zero means [`DEFAULT_SSH_PORT`].
    pub port: u16,
    /// Private key material (PEM/OpenSSH text).
    pub private_key: String,
    /// Path to a private key file; read and folded into `private_key` during
    /// normalization.
    pub key_file: Option<PathBuf>,
    /// SSH agent socket path, or `env:NAME` to read the path from the
    /// environment variable `NAME` at dial time.
    pub agent_socket: String,
    pub timeout: Option<Duration>,
    pub bastion: Option<BastionConfig>,
}

impl ConnectConfig {
    /// Derive dial parameters from a host descriptor.
    pub fn from_host(host: &Host) -> Self {
        Self {
            username: host.user.clone(),
            password: host.password.clone(),
            address: host.address.clone(),
            port: host.port.unwrap_or(0),
            key_file: if host.private_key_path.is_empty() {
                None
            } else {
                Some(PathBuf::from(&host.private_key_path))
            },
            ..Default::default()
        }
    }

    /// Validate the configuration and apply defaults.
    ///
    /// Fails before any network I/O when the username or address is missing,
    /// when no credential is available, or when the key file cannot be read.
    pub fn normalized(mut self) -> Result<Self, Error> {
        if self.username.is_empty() {
            return Err(Error::NoUsername);
        }
        if self.address.is_empty() {
            return Err(Error::NoAddress);
        }
        if self.password.is_empty()
            && self.private_key.is_empty()
            && self.key_file.is_none()
            && self.agent_socket.is_empty()
        {
            return Err(Error::NoCredentials);
        }

        if let Some(path) = self.key_file.take() {
            self.private_key = std::fs::read_to_string(&path)
                .map_err(|source| Error::KeyFile { path, source })?;
        }

        if self.port == 0 {
            self.port = DEFAULT_SSH_PORT;
        }
        if let Some(bastion) = self.bastion.as_mut() {
            if bastion.port == 0 {
                bastion.port = DEFAULT_SSH_PORT;
            }
            if bastion.username.is_empty() {
                bastion.username = self.username.clone();
            }
        }
        if self.timeout.is_none() {
            self.timeout = Some(DEFAULT_DIAL_TIMEOUT);
        }

        Ok(self)
    }

    /// `host:port` of the dial target.
    pub fn endpoint(&self) -> String {
        format!("{}:{}", self.address, self.port)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn minimal() -> ConnectConfig {
        ConnectConfig {
            username: "alice".to_string(),
            address: "10.0.0.7".to_string(),
            password: "secret".to_string(),
            ..Default::default()
        }
    }

    #[test]
    fn normalization_applies_defaults() {
        let cfg = minimal().normalized().unwrap();
        assert_eq!(cfg.port, 22);
        assert_eq!(cfg.timeout, Some(Duration::from_secs(60)));
    }

    #[test]
    fn missing_username_is_rejected() {
        let cfg = ConnectConfig {
            username: String::new(),
            ..minimal()
        };
        assert!(matches!(cfg.normalized(), Err(Error::NoUsername)));
    }

    #[test]
    fn missing_address_is_rejected() {
        let cfg = ConnectConfig {
            address: String::new(),
            ..minimal()
        };
        assert!(matches!(cfg.normalized(), Err(Error::NoAddress)));
    }

    #[test]
    fn missing_credentials_are_rejected() {
        let cfg = ConnectConfig {
            password: String::new(),
            ..minimal()
        };
        assert!(matches!(cfg.normalized(), Err(Error::NoCredentials)));
    }

    #[test]
    fn agent_socket_counts_as_credential() {
        let cfg = ConnectConfig {
            password: String::new(),
            agent_socket: "/run/user/1000/ssh-agent.sock".to_string(),
            ..minimal()
        };
        assert!(cfg.normalized().is_ok());
    }

    #[test]
    fn key_file_is_folded_into_private_key() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("id_ed25519");
        std::fs::write(&path, "key material").unwrap();

        let cfg = ConnectConfig {
            password: String::new(),
            key_file: Some(path),
            ..minimal()
        };
        let cfg = cfg.normalized().unwrap();
        assert_eq!(cfg.private_key, "key material");
        assert!(cfg.key_file.is_none());
    }

    #[test]
    fn unreadable_key_file_is_an_error() {
        let cfg = ConnectConfig {
            key_file: Some(PathBuf::from("/nonexistent/id_rsa")),
            ..minimal()
        };
        assert!(matches!(cfg.normalized(), Err(Error::KeyFile { .. })));
    }

    #[test]
    fn bastion_defaults_fall_back_to_target() {
        let cfg = ConnectConfig {
            bastion: Some(BastionConfig {
                address: "bastion.example.com".to_string(),
                ..Default::default()
            }),
            ..minimal()
        };
        let cfg = cfg.normalized().unwrap();
        let bastion = cfg.bastion.unwrap();
        assert_eq!(bastion.port, 22);
        assert_eq!(bastion.username, "alice");
    }

    #[test]
    fn explicit_bastion_user_is_kept() {
        let cfg = ConnectConfig {
            bastion: Some(BastionConfig {
                address: "bastion.example.com".to_string(),
                port: 2222,
                username: "jump".to_string(),
            }),
            ..minimal()
        };
        let bastion = cfg.normalized().unwrap().bastion.unwrap();
        assert_eq!(bastion.port, 2222);
        assert_eq!(bastion.username, "jump");
    }

    #[test]
    fn host_descriptor_derivation() {
        let host = Host {
            name: "node-1".to_string(),
            address: "192.168.1.10".to_string(),
            user: "ops".to_string(),
            password: "pw".to_string(),
            private_key_path: "/home/ops/.ssh/id_rsa".to_string(),
            port: Some(2200),
            ..Default::default()
        };
        let cfg = ConnectConfig::from_host(&host);
        assert_eq!(cfg.username, "ops");
        assert_eq!(cfg.address, "192.168.1.10");
        assert_eq!(cfg.port, 2200);
        assert_eq!(cfg.key_file.as_deref(), Some(std::path::Path::new("/home/ops/.ssh/id_rsa")));
        assert!(cfg.bastion.is_none());
    }

    #[test]
    fn host_descriptor_uses_camel_case_field_names() {
        let host: Host = serde_json::from_str(
            r#"{
                "name": "node-1",
                "address": "192.168.1.10",
                "internalAddress": "10.0.0.10",
                "user": "ops",
                "privateKeyPath": "/home/ops/.ssh/id_rsa",
                "arch": "amd64"
            }"#,
        )
        .unwrap();
        assert_eq!(host.internal_address, "10.0.0.10");
        assert_eq!(host.private_key_path, "/home/ops/.ssh/id_rsa");
        assert!(host.port.is_none());
    }
}
