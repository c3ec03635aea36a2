//! Scripted serial link for tests
//!
//! Replies are keyed by command (uppercase, spaces removed). A scripted
//! reply queued with [`MockLink::expect`] is used once; [`MockLink::respond`]
//! sets a reply used whenever the queue for that command is empty. Without
//! either, AT commands answer `OK` (`ATZ`/`ATI` answer with a banner,
//! `ATDPN` with `A6`) and everything else answers `NO DATA`.

use std::collections::{HashMap, HashSet, VecDeque};
use std::io;
use std::sync::Arc;

use parking_lot::Mutex;

use super::{not_open, SerialLink};

/// Banner returned for `ATZ` / `ATI`
pub const MOCK_BANNER: &str = "ELM327 v1.5";

#[derive(Debug, Clone)]
enum Reply {
    /// Lines joined with `\r`, prompt appended unless present
    Lines(Vec<String>),
    /// Bytes delivered verbatim (no prompt added)
    Raw(String),
    /// Nothing at all
    Silent,
}

#[derive(Default)]
struct MockState {
    port: Option<String>,
    open: bool,
    open_error: Option<String>,
    fault: Option<(io::ErrorKind, String)>,
    queued: HashMap<String, VecDeque<Reply>>,
    sticky: HashMap<String, Reply>,
    silent: HashSet<String>,
    tx: Vec<u8>,
    rx: Vec<u8>,
    sent: Vec<String>,
    opens: usize,
}

/// In-memory adapter; clones share state so a test can keep a handle
#[derive(Clone, Default)]
pub struct MockLink {
    state: Arc<Mutex<MockState>>,
}

fn key(command: &str) -> String {
    command
        .chars()
        .filter(|c| !c.is_whitespace())
        .collect::<String>()
        .to_uppercase()
}

impl MockLink {
    pub fn new() -> Self {
        Self::default()
    }

    /// Queue a one-shot reply for `command`
    pub fn expect(&self, command: &str, lines: &[&str]) -> &Self {
        let reply = Reply::Lines(lines.iter().map(|s| s.to_string()).collect());
        self.state
            .lock()
            .queued
            .entry(key(command))
            .or_default()
            .push_back(reply);
        self
    }

    /// Queue a one-shot reply delivered byte for byte, without a prompt
    pub fn expect_raw(&self, command: &str, text: &str) -> &Self {
        self.state
            .lock()
            .queued
            .entry(key(command))
            .or_default()
            .push_back(Reply::Raw(text.to_string()));
        self
    }

    /// Reply used for `command` whenever nothing is queued
    pub fn respond(&self, command: &str, lines: &[&str]) -> &Self {
        let reply = Reply::Lines(lines.iter().map(|s| s.to_string()).collect());
        self.state.lock().sticky.insert(key(command), reply);
        self
    }

    /// Never answer `command`
    pub fn silent(&self, command: &str) -> &Self {
        self.state.lock().silent.insert(key(command));
        self
    }

    /// Make `open` fail with `message`
    pub fn fail_open(&self, message: &str) -> &Self {
        self.state.lock().open_error = Some(message.to_string());
        self
    }

    /// Make every following I/O call fail with `message`
    pub fn fail_with(&self, kind: io::ErrorKind, message: &str) -> &Self {
        self.state.lock().fault = Some((kind, message.to_string()));
        self
    }

    /// Simulate the adapter being unplugged
    pub fn disconnect(&self) -> &Self {
        self.fail_with(io::ErrorKind::Other, "Device not configured")
    }

    /// Clear an injected fault
    pub fn restore(&self) -> &Self {
        self.state.lock().fault = None;
        self
    }

    /// Commands written so far, in order
    pub fn sent(&self) -> Vec<String> {
        self.state.lock().sent.clone()
    }

    /// Forget the recorded commands
    pub fn clear_sent(&self) {
        self.state.lock().sent.clear();
    }

    /// Number of successful `open` calls
    pub fn open_count(&self) -> usize {
        self.state.lock().opens
    }

    pub fn current_port(&self) -> Option<String> {
        self.state.lock().port.clone()
    }

    fn check_fault(state: &MockState) -> io::Result<()> {
        if let Some((kind, message)) = &state.fault {
            return Err(io::Error::new(*kind, message.clone()));
        }
        if !state.open {
            return Err(not_open());
        }
        Ok(())
    }
}

impl MockState {
    fn reply_for(&mut self, command: &str) -> Reply {
        let k = key(command);
        if self.silent.contains(&k) {
            return Reply::Silent;
        }
        if let Some(reply) = self.queued.get_mut(&k).and_then(VecDeque::pop_front) {
            return reply;
        }
        if let Some(reply) = self.sticky.get(&k) {
            return reply.clone();
        }
        let line = match k.as_str() {
            "ATZ" | "ATI" => MOCK_BANNER,
            "ATDPN" => "A6",
            k if k.starts_with("AT") => "OK",
            _ => "NO DATA",
        };
        Reply::Lines(vec![line.to_string()])
    }

    fn deliver(&mut self, reply: Reply) {
        match reply {
            Reply::Lines(lines) => {
                let mut text = lines.join("\r");
                if !lines.iter().any(|l| l.contains('>')) {
                    text.push_str("\r\r>");
                }
                self.rx.extend_from_slice(text.as_bytes());
            }
            Reply::Raw(text) => self.rx.extend_from_slice(text.as_bytes()),
            Reply::Silent => {}
        }
    }
}

impl SerialLink for MockLink {
    fn open(&mut self) -> io::Result<()> {
        let mut state = self.state.lock();
        if let Some(message) = &state.open_error {
            return Err(io::Error::new(io::ErrorKind::NotFound, message.clone()));
        }
        state.open = true;
        state.opens += 1;
        Ok(())
    }

    fn close(&mut self) {
        let mut state = self.state.lock();
        state.open = false;
        state.rx.clear();
        state.tx.clear();
    }

    fn is_open(&self) -> bool {
        self.state.lock().open
    }

    fn port(&self) -> Option<String> {
        self.current_port()
    }

    fn set_port(&mut self, port: &str) {
        self.state.lock().port = Some(port.to_string());
    }

    fn clear_buffers(&mut self) -> io::Result<()> {
        let mut state = self.state.lock();
        Self::check_fault(&state)?;
        state.rx.clear();
        state.tx.clear();
        Ok(())
    }

    fn write_all(&mut self, data: &[u8]) -> io::Result<()> {
        let mut state = self.state.lock();
        Self::check_fault(&state)?;
        for &byte in data {
            if byte == b'\r' {
                let command = String::from_utf8_lossy(&state.tx).trim().to_string();
                state.tx.clear();
                if command.is_empty() {
                    continue;
                }
                state.sent.push(command.clone());
                let reply = state.reply_for(&command);
                state.deliver(reply);
            } else {
                state.tx.push(byte);
            }
        }
        Ok(())
    }

    fn flush(&mut self) -> io::Result<()> {
        Self::check_fault(&self.state.lock())
    }

    fn bytes_to_read(&mut self) -> io::Result<usize> {
        let state = self.state.lock();
        Self::check_fault(&state)?;
        Ok(state.rx.len())
    }

    fn read_available(&mut self, buf: &mut Vec<u8>) -> io::Result<usize> {
        let mut state = self.state.lock();
        Self::check_fault(&state)?;
        let n = state.rx.len();
        buf.append(&mut state.rx);
        Ok(n)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn exchange(link: &mut MockLink, command: &str) -> String {
        link.write_all(format!("{}\r", command).as_bytes()).unwrap();
        let mut buf = Vec::new();
        link.read_available(&mut buf).unwrap();
        String::from_utf8(buf).unwrap()
    }

    #[test]
    fn test_default_replies() {
        let mut link = MockLink::new();
        link.open().unwrap();
        assert_eq!(exchange(&mut link, "ATZ"), "ELM327 v1.5\r\r>");
        assert_eq!(exchange(&mut link, "ATE0"), "OK\r\r>");
        assert_eq!(exchange(&mut link, "0100"), "NO DATA\r\r>");
        assert_eq!(link.sent(), vec!["ATZ", "ATE0", "0100"]);
    }

    #[test]
    fn test_queued_then_sticky() {
        let mut link = MockLink::new();
        link.open().unwrap();
        link.respond("0100", &["41 00 BE 3E B8 11"]);
        link.expect("01 00", &["7E8 06 41 00 BE 3E B8 11", ">"]);
        assert_eq!(exchange(&mut link, "0100"), "7E8 06 41 00 BE 3E B8 11\r>");
        assert_eq!(exchange(&mut link, "0100"), "41 00 BE 3E B8 11\r\r>");
    }

    #[test]
    fn test_disconnect_fault() {
        let mut link = MockLink::new();
        link.open().unwrap();
        link.disconnect();
        let err = link.write_all(b"0100\r").unwrap_err();
        assert_eq!(err.to_string(), "Device not configured");
        link.restore();
        assert!(link.write_all(b"0100\r").is_ok());
    }

    #[test]
    fn test_closed_link_rejects_io() {
        let mut link = MockLink::new();
        assert!(link.bytes_to_read().is_err());
    }
}
