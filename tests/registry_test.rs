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

//! Registry behavior that can be exercised without a live SSH server:
//! configuration validation ahead of any dial, and consistent outcomes when
//! the same descriptor is dialed repeatedly.

use hopssh::config::Host;
use hopssh::ssh::{ConnectionRegistry, Error};

fn unreachable_host() -> Host {
    Host {
        name: "unreachable".to_string(),
        address: "127.0.0.1".to_string(),
        // Reserved port, nothing listens here, so the dial is refused fast.
        port: Some(1),
        user: "alice".to_string(),
        password: "secret".to_string(),
        ..Default::default()
    }
}

#[tokio::test]
async fn descriptor_without_credentials_fails_before_dialing() {
    let registry = ConnectionRegistry::new();
    let host = Host {
        name: "node-1".to_string(),
        // TEST-NET address; a real dial here would hang, so this passing
        // quickly is itself evidence that validation runs first.
        address: "203.0.113.1".to_string(),
        user: "alice".to_string(),
        ..Default::default()
    };

    let err = registry.connect(&host).await.unwrap_err();
    assert!(matches!(err, Error::NoCredentials));
    assert!(err.is_configuration());
    assert!(registry.get(&host.address).await.is_none());
}

#[tokio::test]
async fn repeated_connects_fail_consistently_for_the_same_descriptor() {
    let registry = ConnectionRegistry::new();
    let host = unreachable_host();

    let first = registry.connect(&host).await.unwrap_err();
    let second = registry.connect(&host).await.unwrap_err();

    for err in [&first, &second] {
        match err {
            Error::Dial { endpoint, .. } => assert_eq!(endpoint, "127.0.0.1:1"),
            other => panic!("expected a dial error, got {other:?}"),
        }
    }
    // Failed dials leave no cache entry behind.
    assert!(registry.get(&host.address).await.is_none());
}

#[tokio::test]
async fn dial_errors_name_the_endpoint_in_their_message() {
    let registry = ConnectionRegistry::new();
    let err = registry.connect(&unreachable_host()).await.unwrap_err();
    assert!(err
        .to_string()
        .contains("could not establish connection to 127.0.0.1:1"));
}

#[tokio::test]
async fn close_all_on_an_empty_registry_is_a_no_op() {
    let registry = ConnectionRegistry::new();
    registry.close_all().await;
    assert!(registry.get("127.0.0.1").await.is_none());
}
