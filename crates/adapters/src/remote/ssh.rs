// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! ssh command transport

use super::RemoteError;
use crate::subprocess::{run_with_input, run_with_timeout};
use std::process::Output;
use std::time::Duration;
use tokio::process::Command;

/// ssh exits with 255 when the connection itself failed
const SSH_CONNECTION_FAILURE: i32 = 255;

/// Runs shell snippets on cluster hosts through the system `ssh` binary.
///
/// Relies on the user's ssh configuration (keys, ControlMaster) for
/// authentication and connection sharing.
#[derive(Clone, Debug)]
pub struct SshTransport {
    ssh_bin: String,
    connect_timeout: Duration,
}

impl Default for SshTransport {
    fn default() -> Self {
        Self {
            ssh_bin: crate::env::ssh_bin(),
            connect_timeout: crate::env::ssh_connect_timeout(),
        }
    }
}

impl SshTransport {
    pub fn new() -> Self {
        Self::default()
    }

    fn command(&self, host: &str, script: &str) -> Command {
        let mut cmd = Command::new(&self.ssh_bin);
        cmd.arg("-o")
            .arg("BatchMode=yes")
            .arg("-o")
            .arg(format!("ConnectTimeout={}", self.connect_timeout.as_secs()))
            .arg("--")
            .arg(host)
            .arg(script);
        cmd
    }

    /// Run `script` on `host`. A non-zero exit of the remote command is
    /// returned as output; only transport failures are errors.
    pub async fn exec(
        &self,
        host: &str,
        script: &str,
        timeout: Duration,
    ) -> Result<Output, RemoteError> {
        let output = run_with_timeout(self.command(host, script), timeout, "ssh")
            .await
            .map_err(|e| classify(host, e))?;
        check_connection(host, output)
    }

    /// Run `script` on `host` with `input` on stdin.
    pub async fn exec_with_input(
        &self,
        host: &str,
        script: &str,
        input: &[u8],
        timeout: Duration,
    ) -> Result<Output, RemoteError> {
        let output = run_with_input(self.command(host, script), input, timeout, "ssh")
            .await
            .map_err(|e| classify(host, e))?;
        check_connection(host, output)
    }
}

fn classify(host: &str, message: String) -> RemoteError {
    if message.contains("timed out") {
        RemoteError::Timeout(format!("{host}: {message}"))
    } else {
        RemoteError::Connection {
            host: host.to_string(),
            message,
        }
    }
}

fn check_connection(host: &str, output: Output) -> Result<Output, RemoteError> {
    if output.status.code() == Some(SSH_CONNECTION_FAILURE) {
        return Err(RemoteError::Connection {
            host: host.to_string(),
            message: String::from_utf8_lossy(&output.stderr).trim().to_string(),
        });
    }
    Ok(output)
}

/// Quote a value for POSIX `sh` using single quotes.
pub fn shell_quote(value: &str) -> String {
    format!("'{}'", value.replace('\'', r"'\''"))
}

#[cfg(test)]
#[path = "ssh_tests.rs"]
mod tests;
