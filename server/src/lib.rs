//! # Arena Session Relay Library
//!
//! This library implements the server side of a real-time multiplayer
//! arena session: it tracks connected players, replicates world-mutating
//! events (movement, building, combat damage, loot, elimination and
//! respawn) to all participants, and holds the single in-memory copy of
//! world truth for the lifetime of the process.
//!
//! ## Core Responsibilities
//!
//! ### World Truth
//! The relay owns the only authoritative copy of player vitals and
//! transforms, standing structures, and remaining loot containers. All
//! state is in-memory and dies with the process; there is deliberately
//! no persistence layer.
//!
//! ### Session Management
//! Handles the complete lifecycle of client connections:
//! - Session id assignment and world snapshot delivery on connect
//! - Inactivity timeouts for silently dropped clients
//! - Exactly-once player teardown and departure broadcast
//!
//! ### Event Replication
//! Every accepted event fans out to one of three audiences: the single
//! affected session, everyone except the sender, or everyone. The relay
//! trusts client-reported positions, damage amounts, and placements
//! as-is; it is a relay, not an anti-cheat authority.
//!
//! ## Architecture Design
//!
//! ### Serialized Message Handling
//! All inbound packets funnel through one channel into a single loop
//! that processes each message to completion before the next. This is
//! the property that makes the combat resolver's elimination guard
//! correct: two lethal hits on the same target can never be in flight
//! simultaneously. Outbound sends are fire-and-forget through a
//! dedicated sender task whose single queue preserves per-recipient
//! ordering.
//!
//! ### UDP-Based Communication
//! Uses UDP sockets with an explicit connect/disconnect handshake and an
//! inactivity sweep. The protocol is fire-and-forget: a client that
//! wants confirmation of an action relies on the corresponding broadcast
//! arriving.
//!
//! ## Module Organization
//!
//! - [`connections`]: session roster, id assignment, address mapping,
//!   activity tracking, timeout sweep, capacity limits.
//! - [`world`]: the world state store, holding player records,
//!   structures, loot containers, and the monotonic structure ids.
//! - [`combat`]: damage absorption (shield before health), the single
//!   alive-to-eliminated transition, and respawn.
//! - [`relay`]: the dispatch table mapping each inbound packet to world
//!   mutations plus outbound packets with explicit audiences; pure over
//!   the store, so every behavior is testable without sockets.
//! - [`network`]: UDP plumbing, with receiver/sender/timeout tasks
//!   around the serialized relay loop.
//!
//! ## Usage Example
//!
//! ```rust,no_run
//! use server::network::Server;
//! use std::time::Duration;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let mut server = Server::new(
//!         "127.0.0.1:8080",
//!         32,                      // max concurrent sessions
//!         Duration::from_secs(5),  // inactivity timeout
//!     ).await?;
//!
//!     // Runs the relay loop: accepts connections, applies each inbound
//!     // event to the world store, and fans the resulting broadcasts out
//!     // to the affected sessions.
//!     server.run().await?;
//!
//!     Ok(())
//! }
//! ```

pub mod combat;
pub mod connections;
pub mod network;
pub mod relay;
pub mod world;
