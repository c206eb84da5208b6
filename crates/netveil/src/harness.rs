//! Stdin command harness.
//!
//! Drives the interception adapter the way a host's hooks would, one line
//! per simulated call.

use netveil_blocklist::BlockListStore;
use netveil_bodystore::{BodyProvider, BodyStoreError, BodyValues};
use netveil_engine::{CallerApp, Decision, GuardAdapter, InterceptionAdapter};
use std::io::Read;
use thiserror::Error;

/// One harness command
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    Dns(String),
    Connect(String, u16),
    Fetch(String),
    WebView(String),
    Body(String),
    Clear,
    Stats,
    Help,
}

#[derive(Debug, Error)]
pub enum CommandError {
    #[error("Unknown command: {0}")]
    Unknown(String),

    #[error("Usage: {0}")]
    Usage(&'static str),

    #[error("Invalid port: {0}")]
    InvalidPort(String),

    #[error("Body store error: {0}")]
    BodyStore(#[from] BodyStoreError),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl Command {
    /// Parse a command line. Blank lines yield `None`.
    pub fn parse(line: &str) -> Result<Option<Self>, CommandError> {
        let line = line.trim();
        if line.is_empty() {
            return Ok(None);
        }

        let (verb, rest) = match line.split_once(char::is_whitespace) {
            Some((verb, rest)) => (verb, rest.trim()),
            None => (line, ""),
        };

        let command = match verb {
            "dns" => Self::Dns(required(rest, "dns <host>")?),
            "connect" => {
                let mut parts = rest.split_whitespace();
                match (parts.next(), parts.next(), parts.next()) {
                    (Some(host), Some(port), None) => {
                        let port = port
                            .parse()
                            .map_err(|_| CommandError::InvalidPort(port.to_string()))?;
                        Self::Connect(host.to_string(), port)
                    }
                    _ => return Err(CommandError::Usage("connect <host> <port>")),
                }
            }
            "fetch" => Self::Fetch(required(rest, "fetch <url>")?),
            "webview" => Self::WebView(required(rest, "webview <url>")?),
            // Body text keeps its inner whitespace
            "body" => Self::Body(rest.to_string()),
            "clear" => Self::Clear,
            "stats" => Self::Stats,
            "help" => Self::Help,
            other => return Err(CommandError::Unknown(other.to_string())),
        };
        Ok(Some(command))
    }
}

fn required(arg: &str, usage: &'static str) -> Result<String, CommandError> {
    if arg.is_empty() || arg.contains(char::is_whitespace) {
        return Err(CommandError::Usage(usage));
    }
    Ok(arg.to_string())
}

pub const HELP: &str = "\
commands:
  dns <host>             resolve through the adapter
  connect <host> <port>  open a socket through the adapter
  fetch <url>            HTTP fetch through the adapter
  webview <url>          WebView navigation through the adapter
  body <text>            store a response body, stream it back, delete it
  clear                  delete every stored body (including event bodies)
  stats                  classification and store counters";

/// Adapter, body provider and caller identity
pub struct Harness {
    adapter: GuardAdapter,
    store: BlockListStore,
    bodies: BodyProvider<'static>,
    caller: CallerApp,
}

impl Harness {
    pub fn new(
        adapter: GuardAdapter,
        store: BlockListStore,
        bodies: BodyProvider<'static>,
        caller: CallerApp,
    ) -> Self {
        Self {
            adapter,
            store,
            bodies,
            caller,
        }
    }

    /// Run one command and return the line to print.
    pub fn execute(&self, command: Command) -> Result<String, CommandError> {
        let output = match command {
            Command::Dns(host) => match self.adapter.on_dns_lookup(&self.caller, &host) {
                Decision::Proceed => format!("dns {}: proceed", host),
                Decision::Substitute(result) => {
                    format!("dns {}: blocked ({} addresses)", host, result.addresses.len())
                }
            },
            Command::Connect(host, port) => {
                match self.adapter.on_socket_connect(&self.caller, &host, port) {
                    Decision::Proceed => format!("connect {}:{}: proceed", host, port),
                    Decision::Substitute(e) => format!("connect {}:{}: blocked ({})", host, port, e),
                }
            }
            Command::Fetch(url) => match self.adapter.on_http_fetch(&self.caller, &url, None) {
                Decision::Proceed => format!("fetch {}: proceed", url),
                Decision::Substitute(response) => format!(
                    "fetch {}: blocked ({} {}, {} byte body)",
                    url,
                    response.status.as_u16(),
                    response.reason,
                    response.body.len()
                ),
            },
            Command::WebView(url) => match self.adapter.on_webview_navigate(&self.caller, &url) {
                Decision::Proceed => format!("webview {}: proceed", url),
                Decision::Substitute(_) => format!("webview {}: suppressed", url),
            },
            Command::Body(text) => {
                let uri = self
                    .bodies
                    .insert(self.bodies.collection_uri().as_str(), BodyValues::new(text))?;
                let mut streamed = String::new();
                self.bodies
                    .open_file(uri.as_str(), "r")?
                    .read_to_string(&mut streamed)?;
                self.bodies.delete(uri.as_str())?;
                format!("{} ({} bytes): {}", uri, streamed.len(), streamed)
            }
            Command::Clear => {
                let removed = self.bodies.delete(self.bodies.collection_uri().as_str())?;
                format!("cleared {} bodies", removed)
            }
            Command::Stats => {
                let guard = self.adapter.guard();
                let (total, blocked, _) = guard.stats();
                format!(
                    "requests={} blocked={} avg_check_ns={} ready={} hosts={} urls={}",
                    total,
                    blocked,
                    guard.avg_check_time_ns(),
                    self.store.is_ready(),
                    self.store.host_count(),
                    self.store.url_count()
                )
            }
            Command::Help => HELP.to_string(),
        };
        Ok(output)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use netveil_engine::{NullSink, TrafficGuard};
    use std::sync::Arc;

    fn create_test_harness() -> Harness {
        let store = BlockListStore::from_entries(
            ["ads.example.com"],
            ["https://cdn.example.com/track"],
        );
        let guard = TrafficGuard::new(store.clone(), Arc::new(NullSink));
        Harness::new(
            GuardAdapter::new(guard),
            store,
            BodyProvider::global("netveil.harness.test").unwrap(),
            CallerApp::new("dev.netveil.test", "Test"),
        )
    }

    fn run(harness: &Harness, line: &str) -> String {
        let command = Command::parse(line).unwrap().unwrap();
        harness.execute(command).unwrap()
    }

    #[test]
    fn test_parse_commands() {
        assert_eq!(Command::parse("  ").unwrap(), None);
        assert_eq!(
            Command::parse("dns ads.example.com").unwrap(),
            Some(Command::Dns("ads.example.com".into()))
        );
        assert_eq!(
            Command::parse("connect ads.example.com 443").unwrap(),
            Some(Command::Connect("ads.example.com".into(), 443))
        );
        assert_eq!(
            Command::parse("body  two  words ").unwrap(),
            Some(Command::Body("two  words".into()))
        );
        assert_eq!(Command::parse("stats").unwrap(), Some(Command::Stats));
    }

    #[test]
    fn test_parse_errors() {
        assert!(matches!(Command::parse("dns"), Err(CommandError::Usage(_))));
        assert!(matches!(
            Command::parse("connect host 99999"),
            Err(CommandError::InvalidPort(_))
        ));
        assert!(matches!(Command::parse("connect host"), Err(CommandError::Usage(_))));
        assert!(matches!(Command::parse("resolve x"), Err(CommandError::Unknown(_))));
    }

    #[test]
    fn test_execute_adapter_commands() {
        let harness = create_test_harness();
        assert_eq!(run(&harness, "dns ads.example.com"), "dns ads.example.com: blocked (0 addresses)");
        assert_eq!(run(&harness, "dns safe.example.com"), "dns safe.example.com: proceed");
        assert!(run(&harness, "connect ads.example.com 443").contains("blocked"));
        assert_eq!(
            run(&harness, "fetch https://cdn.example.com/track?id=1"),
            "fetch https://cdn.example.com/track?id=1: blocked (403 Forbidden, 0 byte body)"
        );
        assert_eq!(
            run(&harness, "webview https://ads.example.com/"),
            "webview https://ads.example.com/: suppressed"
        );
        assert!(run(&harness, "stats").starts_with("requests=5 blocked=4"));
    }

    #[test]
    fn test_execute_body() {
        let harness = create_test_harness();
        let output = run(&harness, "body hello body");
        assert!(output.starts_with("content://netveil.harness.test/response_bodies/"));
        assert!(output.ends_with("(10 bytes): hello body"));

        // Streamed bodies do not linger in the store
        let (uri, _) = output.split_once(' ').unwrap();
        assert_eq!(harness.bodies.query(uri).unwrap(), None);
        assert!(run(&harness, "clear").starts_with("cleared "));
    }
}
