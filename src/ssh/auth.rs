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

//! Authentication method assembly and the per-hop authentication loop.

use russh::client::Handle;
use russh::keys::agent::client::AgentClient;
use russh::keys::{PrivateKey, PrivateKeyWithHashAlg, PublicKey};
use std::sync::Arc;
use tokio::net::UnixStream;
use zeroize::Zeroizing;

use super::dial::AcceptingHandler;
use super::Error;
use crate::config::ConnectConfig;

/// Agent socket values of the form `env:NAME` are resolved through the
/// environment before dialing.
const SOCKET_ENV_PREFIX: &str = "env:";

/// One way of proving who we are to a server.
///
/// A key is parsed and an agent is dialed while the list is being assembled,
/// so malformed keys and unreachable agents fail before the first hop.
pub enum AuthMethod {
    Password(Zeroizing<String>),
    PrivateKey(Arc<PrivateKey>),
    Agent {
        client: AgentClient<UnixStream>,
        identities: Vec<PublicKey>,
    },
}

impl std::fmt::Debug for AuthMethod {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            AuthMethod::Password(_) => f.write_str("Password(..)"),
            AuthMethod::PrivateKey(_) => f.write_str("PrivateKey(..)"),
            AuthMethod::Agent { identities, .. } => {
                write!(f, "Agent({} identities)", identities.len())
            }
        }
    }
}

/// Resolve an agent socket address, replacing an `env:NAME` indirection with
/// the value of the named environment variable. An unset or empty variable
/// leaves the literal value in place; the dial will then fail with the
/// unresolved address in the error.
pub(crate) fn resolve_agent_socket(socket: &str) -> String {
    if let Some(name) = socket.strip_prefix(SOCKET_ENV_PREFIX) {
        if let Ok(addr) = std::env::var(name) {
            if !addr.is_empty() {
                return addr;
            }
        }
    }
    socket.to_string()
}

/// Build the ordered list of authentication methods for a normalized
/// configuration: password first, then the public-key signer parsed from the
/// in-memory key, then every identity the agent offers.
pub(crate) async fn build_auth_methods(cfg: &ConnectConfig) -> Result<Vec<AuthMethod>, Error> {
    let mut methods = Vec::new();

    if !cfg.password.is_empty() {
        methods.push(AuthMethod::Password(Zeroizing::new(cfg.password.clone())));
    }

    if !cfg.private_key.is_empty() {
        let key = russh::keys::decode_secret_key(&cfg.private_key, None)
            .map_err(Error::KeyParse)?;
        methods.push(AuthMethod::PrivateKey(Arc::new(key)));
    }

    if !cfg.agent_socket.is_empty() {
        let socket = resolve_agent_socket(&cfg.agent_socket);
        let mut client = AgentClient::connect_uds(&socket)
            .await
            .map_err(|source| Error::AgentDial {
                socket: socket.clone(),
                source,
            })?;
        let identities = client
            .request_identities()
            .await
            .map_err(Error::AgentSigners)?;
        tracing::debug!(socket = %socket, identities = identities.len(), "using SSH agent");
        methods.push(AuthMethod::Agent { client, identities });
    }

    Ok(methods)
}

/// Try each method in order until the server accepts one.
pub(crate) async fn authenticate(
    handle: &mut Handle<AcceptingHandler>,
    username: &str,
    methods: &mut [AuthMethod],
) -> Result<(), Error> {
    for method in methods.iter_mut() {
        match method {
            AuthMethod::Password(password) => {
                let result = handle
                    .authenticate_password(username, password.as_str())
                    .await?;
                if result.success() {
                    return Ok(());
                }
                tracing::debug!(username, "password authentication rejected");
            }
            AuthMethod::PrivateKey(key) => {
                let hash = handle.best_supported_rsa_hash().await?.flatten();
                let result = handle
                    .authenticate_publickey(
                        username,
                        PrivateKeyWithHashAlg::new(Arc::clone(key), hash),
                    )
                    .await?;
                if result.success() {
                    return Ok(());
                }
                tracing::debug!(username, "public key authentication rejected");
            }
            AuthMethod::Agent { client, identities } => {
                for identity in identities.clone() {
                    let hash = handle.best_supported_rsa_hash().await?.flatten();
                    match handle
                        .authenticate_publickey_with(username, identity, hash, client)
                        .await
                    {
                        Ok(result) if result.success() => return Ok(()),
                        Ok(_) => {}
                        Err(err) => {
                            tracing::debug!(username, %err, "agent identity rejected");
                        }
                    }
                }
            }
        }
    }

    Err(Error::AuthenticationFailed {
        username: username.to_string(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn plain_socket_addresses_pass_through() {
        assert_eq!(
            resolve_agent_socket("/run/user/1000/ssh-agent.sock"),
            "/run/user/1000/ssh-agent.sock"
        );
    }

    #[test]
    fn env_indirection_is_resolved() {
        std::env::set_var("HOPSSH_TEST_AGENT_SOCK", "/tmp/agent.sock");
        assert_eq!(resolve_agent_socket("env:HOPSSH_TEST_AGENT_SOCK"), "/tmp/agent.sock");
        std::env::remove_var("HOPSSH_TEST_AGENT_SOCK");
    }

    #[test]
    fn unset_env_keeps_the_literal_value() {
        std::env::remove_var("HOPSSH_TEST_AGENT_UNSET");
        assert_eq!(
            resolve_agent_socket("env:HOPSSH_TEST_AGENT_UNSET"),
            "env:HOPSSH_TEST_AGENT_UNSET"
        );
    }

    #[tokio::test]
    async fn malformed_private_key_fails_at_assembly() {
        let cfg = ConnectConfig {
            username: "alice".to_string(),
            address: "10.0.0.7".to_string(),
            private_key: "not a key".to_string(),
            ..Default::default()
        };
        let err = build_auth_methods(&cfg).await.unwrap_err();
        assert!(matches!(err, Error::KeyParse(_)));
    }

    #[tokio::test]
    async fn unreachable_agent_socket_fails_at_assembly() {
        let cfg = ConnectConfig {
            username: "alice".to_string(),
            address: "10.0.0.7".to_string(),
            agent_socket: "/nonexistent/agent.sock".to_string(),
            ..Default::default()
        };
        let err = build_auth_methods(&cfg).await.unwrap_err();
        assert!(matches!(err, Error::AgentDial { .. }));
    }

    #[tokio::test]
    async fn password_only_config_builds_one_method() {
        let cfg = ConnectConfig {
            username: "alice".to_string(),
            address: "10.0.0.7".to_string(),
            password: "secret".to_string(),
            ..Default::default()
        };
        let methods = build_auth_methods(&cfg).await.unwrap();
        assert_eq!(methods.len(), 1);
        assert!(matches!(methods[0], AuthMethod::Password(_)));
    }
}
