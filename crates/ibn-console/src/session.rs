//! One interactive console session against one device.
//!
//! Output has no framing: after each command the session polls the socket on
//! a short interval and considers the command finished once some output has
//! arrived and several consecutive polls came back empty, or once the overall
//! deadline passes. A peer that hangs up before a command produced any output
//! fails the command with `UnexpectedEof`.

use std::io;
use std::time::Duration;

use tokio::io::AsyncWriteExt;
use tokio::net::TcpStream;
use tokio::time::{sleep, timeout, Instant};
use tracing::debug;

const LINE_END: &[u8] = b"\r\n";
const READ_CHUNK: usize = 4096;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ConsoleOptions {
    /// Connect timeout and per-command collection deadline
    pub timeout: Duration,
    pub poll_interval: Duration,
    /// Consecutive empty polls, after output was seen, that end a command
    pub idle_polls: u32,
    /// Wait after the initial blank line before discarding the banner
    pub flush_delay: Duration,
}

impl Default for ConsoleOptions {
    fn default() -> Self {
        Self {
            timeout: Duration::from_secs(10),
            poll_interval: Duration::from_millis(200),
            idle_polls: 3,
            flush_delay: Duration::from_millis(200),
        }
    }
}

impl ConsoleOptions {
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }
}

pub struct ConsoleSession {
    stream: TcpStream,
    options: ConsoleOptions,
    /// Peer closed its side; further polls return nothing.
    eof: bool,
}

impl ConsoleSession {
    /// Connect, then send a blank line and discard the banner/prompt it provokes.
    pub async fn connect(host: &str, port: u16, options: ConsoleOptions) -> io::Result<Self> {
        let stream = timeout(options.timeout, TcpStream::connect((host, port)))
            .await
            .map_err(|_| {
                io::Error::new(
                    io::ErrorKind::TimedOut,
                    format!("connect to {}:{} timed out", host, port),
                )
            })??;
        stream.set_nodelay(true)?;

        let mut session = Self {
            stream,
            options,
            eof: false,
        };
        session.flush_prompt().await?;
        Ok(session)
    }

    async fn flush_prompt(&mut self) -> io::Result<()> {
        self.stream.write_all(LINE_END).await?;
        sleep(self.options.flush_delay).await;
        let discarded = self.read_available()?;
        if discarded.is_empty() && self.eof {
            return Err(closed_by_peer());
        }
        debug!(bytes = discarded.len(), "console banner flushed");
        Ok(())
    }

    /// Drain whatever is readable right now without waiting.
    fn read_available(&mut self) -> io::Result<Vec<u8>> {
        let mut out = Vec::new();
        if self.eof {
            return Ok(out);
        }
        let mut buf = [0u8; READ_CHUNK];
        loop {
            match self.stream.try_read(&mut buf) {
                Ok(0) => {
                    self.eof = true;
                    break;
                }
                Ok(n) => out.extend_from_slice(&buf[..n]),
                Err(e) if e.kind() == io::ErrorKind::WouldBlock => break,
                Err(e) if e.kind() == io::ErrorKind::Interrupted => continue,
                Err(e) => return Err(e),
            }
        }
        Ok(out)
    }

    async fn collect_output(&mut self) -> io::Result<String> {
        let deadline = Instant::now() + self.options.timeout;
        let mut buffer = Vec::new();
        let mut idle = 0u32;
        let mut polls = 0u32;

        while Instant::now() < deadline {
            sleep(self.options.poll_interval).await;
            polls += 1;
            let chunk = self.read_available()?;
            if chunk.is_empty() && self.eof {
                if buffer.is_empty() {
                    return Err(closed_by_peer());
                }
                // Keep what arrived before the hangup; the next command fails.
                break;
            }
            if chunk.is_empty() {
                idle += 1;
                if !buffer.is_empty() && idle >= self.options.idle_polls {
                    break;
                }
            } else {
                buffer.extend_from_slice(&chunk);
                idle = 0;
            }
        }

        debug!(bytes = buffer.len(), polls, "command output collected");
        Ok(decode_lossy(&buffer))
    }

    /// Run commands in order; one trimmed output string per command.
    pub async fn run_commands<S: AsRef<str>>(&mut self, commands: &[S]) -> io::Result<Vec<String>> {
        let mut outputs = Vec::with_capacity(commands.len());
        for command in commands {
            let mut line: Vec<u8> = command
                .as_ref()
                .chars()
                .filter(char::is_ascii)
                .map(|c| c as u8)
                .collect();
            line.extend_from_slice(LINE_END);
            self.stream.write_all(&line).await?;
            outputs.push(self.collect_output().await?);
        }
        Ok(outputs)
    }

    /// Shut the connection down. Dropping the session also releases the socket.
    pub async fn close(mut self) -> io::Result<()> {
        self.stream.shutdown().await
    }
}

fn closed_by_peer() -> io::Error {
    io::Error::new(io::ErrorKind::UnexpectedEof, "console closed by peer")
}

/// UTF-8 decode that drops invalid sequences, trimmed.
pub fn decode_lossy(bytes: &[u8]) -> String {
    let mut text = String::with_capacity(bytes.len());
    for chunk in bytes.utf8_chunks() {
        text.push_str(chunk.valid());
    }
    text.trim().to_string()
}
