use std::collections::HashMap;

use console_logging::console_debug;
use tokio_util::sync::CancellationToken;

/// A live connection that can be torn down.
pub trait Connection {
    fn close(&mut self);
}

/// A spawned stream task, stopped through its cancellation token.
#[derive(Debug)]
pub struct StreamConnection {
    token: CancellationToken,
}

impl StreamConnection {
    pub fn new(token: CancellationToken) -> Self {
        Self { token }
    }
}

impl Connection for StreamConnection {
    fn close(&mut self) {
        self.token.cancel();
    }
}

/// At most one live connection per session key.
///
/// Not shared: the owner applies every `open`/`close` from a single thread.
#[derive(Debug)]
pub struct ConnectionRegistry<C: Connection> {
    live: HashMap<String, C>,
}

impl<C: Connection> Default for ConnectionRegistry<C> {
    fn default() -> Self {
        Self {
            live: HashMap::new(),
        }
    }
}

impl<C: Connection> ConnectionRegistry<C> {
    pub fn new() -> Self {
        Self::default()
    }

    /// Closes any connection already registered under `key`, then registers the one `connect` opens.
    pub fn open<F>(&mut self, key: &str, connect: F)
    where
        F: FnOnce() -> C,
    {
        if self.close(key) {
            console_debug!("Closed previous connection for session={} before reopening", key);
        }
        self.live.insert(key.to_string(), connect());
    }

    /// Returns whether a connection was registered under `key`.
    pub fn close(&mut self, key: &str) -> bool {
        match self.live.remove(key) {
            Some(mut connection) => {
                connection.close();
                true
            }
            None => false,
        }
    }

    pub fn close_all(&mut self) {
        for (_, mut connection) in self.live.drain() {
            connection.close();
        }
    }

    pub fn is_open(&self, key: &str) -> bool {
        self.live.contains_key(key)
    }

    pub fn len(&self) -> usize {
        self.live.len()
    }

    pub fn is_empty(&self) -> bool {
        self.live.is_empty()
    }
}

impl<C: Connection> Drop for ConnectionRegistry<C> {
    fn drop(&mut self) {
        self.close_all();
    }
}
