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

use tracing_subscriber::EnvFilter;

/// Create an environment filter based on verbosity level. `RUST_LOG`
/// overrides, which also allows turning on russh's own logs.
pub fn env_filter(verbosity: u8) -> EnvFilter {
    if std::env::var("RUST_LOG").is_ok() {
        EnvFilter::from_default_env()
    } else {
        match verbosity {
            0 => EnvFilter::new("hopssh=warn"),
            1 => EnvFilter::new("hopssh=info"),
            2 => EnvFilter::new("hopssh=debug,russh=debug"),
            _ => EnvFilter::new("hopssh=trace,russh=trace,russh_sftp=debug"),
        }
    }
}

/// Initialize console logging. Safe to call more than once; later calls are
/// no-ops, which keeps test setups simple.
pub fn init(verbosity: u8) {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(env_filter(verbosity))
        .with_writer(std::io::stderr)
        .try_init();
}
