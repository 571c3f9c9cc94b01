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

//! One-shot remote command execution with sudo password injection.

use russh::{ChannelMsg, Pty};

use super::connection::Connection;
use super::Error;
use crate::config::Host;

/// Exec sessions get a fixed pseudo-terminal so sudo talks to us at all.
const EXEC_PTY_ROWS: u32 = 100;
const EXEC_PTY_COLS: u32 = 50;

/// Nominal baud rates; remote ptys want a value, any value.
const PTY_BAUD: u32 = 14400;

const SUDO_PROMPT_PREFIX: &[u8] = b"[sudo] password for ";
const PASSWORD_PROMPT_PREFIX: &[u8] = b"Password";
const PROMPT_SUFFIX: &[u8] = b": ";

/// Incremental password-prompt detector.
///
/// Feeds one byte at a time into a rolling current-line buffer that resets on
/// every newline. The scan has to stay incremental: the password must go in
/// while the remote process is still blocked reading stdin, so waiting for
/// the full output first would deadlock. Only the current unterminated line
/// is examined, which means a prompt that is followed by a newline before the
/// check can never match.
#[derive(Debug, Default)]
pub(crate) struct PromptScanner {
    line: Vec<u8>,
}

impl PromptScanner {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    /// Feed one output byte. Returns true when the current line has just
    /// become a password prompt.
    pub(crate) fn push(&mut self, byte: u8) -> bool {
        if byte == b'\n' {
            self.line.clear();
            return false;
        }
        self.line.push(byte);

        (self.line.starts_with(SUDO_PROMPT_PREFIX) || self.line.starts_with(PASSWORD_PROMPT_PREFIX))
            && self.line.ends_with(PROMPT_SUFFIX)
    }
}

/// Strip the echoed sudo prompt for `user` and surrounding whitespace.
fn clean_output(raw: &[u8], user: &str) -> String {
    let text = String::from_utf8_lossy(raw);
    let prompt = format!("[sudo] password for {user}:");
    text.strip_prefix(prompt.as_str())
        .unwrap_or(&text)
        .trim()
        .to_string()
}

impl Connection {
    /// Run `command` on a fresh session and collect its full output.
    ///
    /// The output stream is scanned byte by byte; whenever the current line
    /// turns into a sudo or password prompt, `host`'s password is written to
    /// the session's input followed by a newline, strictly before any further
    /// output is consumed.
    ///
    /// A non-zero exit (or a session that never reports one) comes back as
    /// [`Error::Exec`], which still carries the cleaned output: a failing
    /// command usually printed the reason, so callers get both.
    pub async fn exec(&self, command: &str, host: &Host) -> Result<String, Error> {
        let command = command.trim();
        let mut channel = self.new_session().await?;

        channel
            .request_pty(
                false,
                "xterm",
                EXEC_PTY_COLS,
                EXEC_PTY_ROWS,
                0,
                0,
                &[
                    (Pty::ECHO, 0),
                    (Pty::TTY_OP_ISPEED, PTY_BAUD),
                    (Pty::TTY_OP_OSPEED, PTY_BAUD),
                ],
            )
            .await?;

        channel.exec(true, command).await?;

        let mut output: Vec<u8> = Vec::new();
        let mut scanner = PromptScanner::new();
        let mut exit_status: Option<u32> = None;
        let password_line = format!("{}\n", host.password);

        'outer: while let Some(msg) = channel.wait().await {
            match msg {
                ChannelMsg::Data { ref data } => {
                    for &byte in data.iter() {
                        output.push(byte);
                        if scanner.push(byte) {
                            tracing::debug!(host = %host.address, "answering password prompt");
                            if channel.data(password_line.as_bytes()).await.is_err() {
                                break 'outer;
                            }
                        }
                    }
                }
                ChannelMsg::ExtendedData { ref data, ext } if ext == 1 => {
                    for &byte in data.iter() {
                        output.push(byte);
                        if scanner.push(byte) {
                            tracing::debug!(host = %host.address, "answering password prompt");
                            if channel.data(password_line.as_bytes()).await.is_err() {
                                break 'outer;
                            }
                        }
                    }
                }
                ChannelMsg::ExitStatus { exit_status: status } => {
                    exit_status = Some(status);
                }
                _ => {}
            }
        }

        let output = clean_output(&output, &host.user);
        match exit_status {
            Some(0) => Ok(output),
            status => Err(Error::Exec {
                command: command.to_string(),
                output,
                exit_status: status,
            }),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn feed(scanner: &mut PromptScanner, bytes: &[u8]) -> usize {
        bytes.iter().filter(|&&b| scanner.push(b)).count()
    }

    #[test]
    fn sudo_prompt_fires_exactly_once_on_the_final_byte() {
        let mut scanner = PromptScanner::new();
        let prompt = b"[sudo] password for alice: ";
        for &byte in &prompt[..prompt.len() - 1] {
            assert!(!scanner.push(byte), "fired mid-line");
        }
        assert!(scanner.push(prompt[prompt.len() - 1]));
    }

    #[test]
    fn plain_password_prompt_is_detected() {
        let mut scanner = PromptScanner::new();
        assert_eq!(feed(&mut scanner, b"Password: "), 1);
    }

    #[test]
    fn ordinary_output_never_fires() {
        let mut scanner = PromptScanner::new();
        assert_eq!(feed(&mut scanner, b"total 4\n-rw-r--r-- 1 root root\n"), 0);
    }

    #[test]
    fn newline_resets_the_line_buffer() {
        let mut scanner = PromptScanner::new();
        assert_eq!(feed(&mut scanner, b"[sudo] password for alice\n: "), 0);
        assert_eq!(feed(&mut scanner, b"[sudo] password for alice: "), 1);
    }

    #[test]
    fn prompt_inside_a_terminated_line_is_not_detected() {
        // A prompt string that ends before a newline is unreachable: the scan
        // only looks at the unterminated tail.
        let mut scanner = PromptScanner::new();
        assert_eq!(feed(&mut scanner, b"[sudo] password for alice: \nmore\n"), 1);
    }

    #[test]
    fn output_cleanup_strips_prompt_echo_and_whitespace() {
        let raw = b"[sudo] password for alice:\nLinux node-1\n";
        assert_eq!(clean_output(raw, "alice"), "Linux node-1");
    }

    #[test]
    fn output_cleanup_leaves_other_users_prompts_alone() {
        let raw = b"[sudo] password for bob:\nLinux node-1\n";
        assert_eq!(
            clean_output(raw, "alice"),
            "[sudo] password for bob:\nLinux node-1"
        );
    }

    #[test]
    fn output_cleanup_without_prompt_just_trims() {
        assert_eq!(clean_output(b"  hello\n", "alice"), "hello");
    }
}
