//! Connection management for the session relay
//!
//! This module handles the server-side roster of live connections, including:
//! - Session lifecycle (connect, disconnect, timeout)
//! - Stable session identifier assignment
//! - Connection health monitoring and automatic cleanup
//! - Capacity enforcement and address tracking
//!
//! The connection manager owns nothing but connection metadata; player
//! records live in the world store and are cleaned up by the relay when a
//! session ends.

use log::info;
use std::collections::HashMap;
use std::net::SocketAddr;
use std::time::{Duration, Instant};

/// Metadata for a single live connection
///
/// Each connection tracks:
/// - The session id assigned at connect time (never reused in-process)
/// - The network address packets are sent to
/// - The last time any packet arrived, for timeout detection
#[derive(Debug)]
pub struct Connection {
    /// Unique session identifier assigned by the relay
    pub id: u32,
    /// Network address for sending responses
    pub addr: SocketAddr,
    /// Last time we received any packet from this connection
    pub last_seen: Instant,
}

impl Connection {
    /// Creates a new connection with the given session id and address
    pub fn new(id: u32, addr: SocketAddr) -> Self {
        Self {
            id,
            addr,
            last_seen: Instant::now(),
        }
    }

    /// Marks the connection as recently active
    pub fn touch(&mut self) {
        self.last_seen = Instant::now();
    }

    /// Checks if the connection has exceeded the inactivity timeout
    ///
    /// Returns true if no packets have been received within the given
    /// duration, indicating a likely silent disconnect.
    pub fn is_timed_out(&self, timeout: Duration) -> bool {
        self.last_seen.elapsed() > timeout
    }
}

/// Manages all live connections for the relay
///
/// The ConnectionManager provides centralized control over session
/// lifecycle: it assigns monotonically increasing session ids, enforces
/// the capacity limit, maps addresses back to sessions for inbound
/// packets, and sweeps out connections that have gone silent.
pub struct ConnectionManager {
    /// Live connections indexed by session id
    connections: HashMap<u32, Connection>,
    /// Next available session id for new connections
    next_session_id: u32,
    /// Maximum number of concurrent connections allowed
    max_clients: usize,
    /// Inactivity window after which a connection is considered gone
    timeout: Duration,
}

impl ConnectionManager {
    /// Creates a new connection manager with the specified capacity limit
    ///
    /// Session ids start from 1 and increment for each new connection;
    /// an id is never handed out twice within a process run.
    pub fn new(max_clients: usize, timeout: Duration) -> Self {
        Self {
            connections: HashMap::new(),
            next_session_id: 1,
            max_clients,
            timeout,
        }
    }

    /// Attempts to register a new connection
    ///
    /// Returns Some(session_id) if successful, None if the relay is at
    /// capacity. Logs the new connection for server monitoring.
    pub fn add_connection(&mut self, addr: SocketAddr) -> Option<u32> {
        if self.connections.len() >= self.max_clients {
            return None;
        }

        let session_id = self.next_session_id;
        self.next_session_id += 1;

        let connection = Connection::new(session_id, addr);
        info!("Session {} connected from {}", session_id, addr);
        self.connections.insert(session_id, connection);

        Some(session_id)
    }

    /// Removes a connection from the roster
    ///
    /// Returns true if the connection was found and removed, false if it
    /// was already gone. Handles both explicit disconnects and timeout
    /// cleanup; the caller is responsible for tearing down the player
    /// record exactly once.
    pub fn remove_connection(&mut self, session_id: &u32) -> bool {
        if let Some(connection) = self.connections.remove(session_id) {
            info!("Session {} disconnected", connection.id);
            true
        } else {
            false
        }
    }

    /// Finds a session id by network address
    ///
    /// Used to associate incoming packets with the session that owns them.
    /// Returns None if no connection exists for the given address.
    pub fn find_by_addr(&self, addr: SocketAddr) -> Option<u32> {
        self.connections
            .iter()
            .find(|(_, connection)| connection.addr == addr)
            .map(|(id, _)| *id)
    }

    /// Looks up the network address for a session id
    pub fn addr_of(&self, session_id: &u32) -> Option<SocketAddr> {
        self.connections
            .get(session_id)
            .map(|connection| connection.addr)
    }

    /// Refreshes the activity timestamp for a session
    ///
    /// Called for every inbound packet so that chatty connections never
    /// trip the inactivity sweep. Returns false for unknown sessions.
    pub fn touch(&mut self, session_id: u32) -> bool {
        if let Some(connection) = self.connections.get_mut(&session_id) {
            connection.touch();
            true
        } else {
            false
        }
    }

    /// Checks for and removes timed-out connections
    ///
    /// Automatically drops connections that haven't sent packets within
    /// the timeout threshold. Returns the removed session ids so the
    /// relay can tear down the matching player records and broadcast
    /// their departure.
    pub fn check_timeouts(&mut self) -> Vec<u32> {
        let timeout = self.timeout;
        let timed_out: Vec<u32> = self
            .connections
            .iter()
            .filter(|(_, connection)| connection.is_timed_out(timeout))
            .map(|(id, _)| *id)
            .collect();

        for session_id in &timed_out {
            self.remove_connection(session_id);
        }

        timed_out
    }

    /// Gets all session ids and their network addresses
    ///
    /// Used by the sender task to fan broadcasts out to every live
    /// connection (optionally excluding the original sender).
    pub fn connection_addrs(&self) -> Vec<(u32, SocketAddr)> {
        self.connections
            .iter()
            .map(|(id, connection)| (*id, connection.addr))
            .collect()
    }

    /// Returns the number of live connections
    pub fn len(&self) -> usize {
        self.connections.len()
    }

    /// Returns true if no connections are live
    pub fn is_empty(&self) -> bool {
        self.connections.is_empty()
    }
}
