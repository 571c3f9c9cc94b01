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

//! Connection establishment, caching, command execution and file transfer.

pub mod auth;
pub mod connection;
pub mod dial;
pub mod error;
pub mod exec;
pub mod registry;
pub mod transfer;

pub use connection::Connection;
pub use dial::connect;
pub use error::Error;
pub use registry::ConnectionRegistry;
