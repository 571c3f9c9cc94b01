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

//! Remote access building blocks on top of [russh]:
//!
//! * [`ssh::connect`] dials a host directly or through a bastion and returns a
//!   reusable, mutex-guarded [`ssh::Connection`].
//! * [`ssh::ConnectionRegistry`] caches connections per host address.
//! * [`ssh::Connection::exec`] runs one-shot commands and answers sudo
//!   password prompts as they appear in the output stream.
//! * [`tty`] bridges an interactive remote shell to any duplex,
//!   message-framed transport, including terminal resize delivery.
//!
//! [russh]: https://docs.rs/russh

pub mod config;
pub mod logging;
pub mod ssh;
pub mod tty;

pub use config::{BastionConfig, ConnectConfig, Host};
pub use ssh::{connect, Connection, ConnectionRegistry, Error};
pub use tty::{Message, ResizeEvent, ShellOptions, TtyBridge};
