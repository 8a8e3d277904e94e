//! Server network layer: UDP plumbing around the serialized relay loop

use crate::connections::ConnectionManager;
use crate::relay::{self, Audience, Outbound};
use crate::world::WorldState;
use bincode::{deserialize, serialize};
use log::{debug, error, info, warn};
use shared::Packet;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;
use tokio::net::UdpSocket;
use tokio::sync::{mpsc, RwLock};

/// Messages sent from network tasks to the main relay loop
#[derive(Debug)]
pub enum ServerMessage {
    PacketReceived {
        packet: Packet,
        addr: SocketAddr,
    },
    SessionTimeout {
        session_id: u32,
    },
    #[allow(dead_code)]
    Shutdown,
}

/// Messages sent from the relay loop to the sender task
#[derive(Debug)]
pub enum GameMessage {
    /// Deliver to one session, resolved to an address at send time.
    SendTo { packet: Packet, session_id: u32 },
    /// Deliver to a raw address (pre-session traffic like the connect
    /// handshake and capacity rejections).
    SendPacket { packet: Packet, addr: SocketAddr },
    /// Deliver to every live session, optionally excluding one.
    BroadcastPacket {
        packet: Packet,
        exclude: Option<u32>,
    },
}

/// The relay server: owns the world store and coordinates the network
/// tasks around a single serialized message-handling loop.
///
/// Every inbound packet is processed to completion (world mutation plus
/// queued broadcasts) before the next is looked at, so world state needs
/// no locking and duplicate/racing events resolve deterministically.
/// Sends are fire-and-forget through the sender task; its single queue
/// preserves per-recipient ordering.
pub struct Server {
    socket: Arc<UdpSocket>,
    connections: Arc<RwLock<ConnectionManager>>,
    world: WorldState,

    // Communication channels
    server_tx: mpsc::UnboundedSender<ServerMessage>,
    server_rx: mpsc::UnboundedReceiver<ServerMessage>,
    game_tx: mpsc::UnboundedSender<GameMessage>,
    game_rx: mpsc::UnboundedReceiver<GameMessage>,
}

impl Server {
    pub async fn new(
        addr: &str,
        max_clients: usize,
        client_timeout: Duration,
    ) -> Result<Self, Box<dyn std::error::Error>> {
        let socket = Arc::new(UdpSocket::bind(addr).await?);
        info!("Relay listening on {}", addr);

        let (server_tx, server_rx) = mpsc::unbounded_channel();
        let (game_tx, game_rx) = mpsc::unbounded_channel();

        Ok(Server {
            socket,
            connections: Arc::new(RwLock::new(ConnectionManager::new(
                max_clients,
                client_timeout,
            ))),
            world: WorldState::new(),
            server_tx,
            server_rx,
            game_tx,
            game_rx,
        })
    }

    /// Spawns the task that continuously listens for incoming packets
    async fn spawn_network_receiver(&self) {
        let socket = Arc::clone(&self.socket);
        let server_tx = self.server_tx.clone();

        tokio::spawn(async move {
            let mut buffer = [0u8; 2048];

            loop {
                match socket.recv_from(&mut buffer).await {
                    Ok((len, addr)) => {
                        if let Ok(packet) = deserialize::<Packet>(&buffer[0..len]) {
                            if let Err(e) =
                                server_tx.send(ServerMessage::PacketReceived { packet, addr })
                            {
                                error!("Failed to send packet to relay loop: {}", e);
                                break;
                            }
                        } else {
                            warn!("Failed to deserialize packet from {}", addr);
                        }
                    }
                    Err(e) => {
                        error!("Error receiving packet: {}", e);
                        tokio::time::sleep(Duration::from_millis(10)).await;
                    }
                }
            }
        });
    }

    /// Spawns the task that drains the outgoing packet queue
    ///
    /// A single consumer on one queue means packets reach the socket in
    /// exactly the order the relay loop decided to send them.
    async fn spawn_network_sender(&mut self) {
        let socket = Arc::clone(&self.socket);
        let connections = Arc::clone(&self.connections);
        let mut game_rx = std::mem::replace(&mut self.game_rx, mpsc::unbounded_channel().1);

        tokio::spawn(async move {
            while let Some(message) = game_rx.recv().await {
                match message {
                    GameMessage::SendTo { packet, session_id } => {
                        let addr = {
                            let connections_guard = connections.read().await;
                            connections_guard.addr_of(&session_id)
                        };

                        match addr {
                            Some(addr) => {
                                if let Err(e) = Self::send_packet_impl(&socket, &packet, addr).await
                                {
                                    error!("Failed to send to session {}: {}", session_id, e);
                                }
                            }
                            // Session vanished between decision and send;
                            // fire-and-forget means we just drop it.
                            None => debug!("Dropping packet for gone session {}", session_id),
                        }
                    }
                    GameMessage::SendPacket { packet, addr } => {
                        if let Err(e) = Self::send_packet_impl(&socket, &packet, addr).await {
                            error!("Failed to send packet to {}: {}", addr, e);
                        }
                    }
                    GameMessage::BroadcastPacket { packet, exclude } => {
                        let connection_addrs = {
                            let connections_guard = connections.read().await;
                            connections_guard.connection_addrs()
                        };

                        for (session_id, addr) in connection_addrs {
                            if Some(session_id) == exclude {
                                continue;
                            }

                            if let Err(e) = Self::send_packet_impl(&socket, &packet, addr).await {
                                error!("Failed to send to session {}: {}", session_id, e);
                            }
                        }
                    }
                }
            }
        });
    }

    /// Spawns the task that sweeps out silent connections
    async fn spawn_timeout_checker(&self) {
        let connections = Arc::clone(&self.connections);
        let server_tx = self.server_tx.clone();

        tokio::spawn(async move {
            let mut interval = tokio::time::interval(Duration::from_secs(1));

            loop {
                interval.tick().await;

                let timed_out = {
                    let mut connections_guard = connections.write().await;
                    connections_guard.check_timeouts()
                };

                for session_id in timed_out {
                    if let Err(e) = server_tx.send(ServerMessage::SessionTimeout { session_id }) {
                        error!("Failed to send timeout message: {}", e);
                        break;
                    }
                }
            }
        });
    }

    async fn send_packet_impl(
        socket: &UdpSocket,
        packet: &Packet,
        addr: SocketAddr,
    ) -> Result<(), Box<dyn std::error::Error>> {
        let data = serialize(packet)?;
        socket.send_to(&data, addr).await?;
        Ok(())
    }

    fn queue(&self, message: GameMessage) {
        if let Err(e) = self.game_tx.send(message) {
            error!("Failed to queue packet for sending: {}", e);
        }
    }

    /// Hands the relay's fan-out decisions to the sender task, mapping
    /// each audience onto a send mode.
    fn dispatch(&self, outbounds: Vec<Outbound>) {
        for outbound in outbounds {
            let message = match outbound.audience {
                Audience::One(session_id) => GameMessage::SendTo {
                    packet: outbound.packet,
                    session_id,
                },
                Audience::AllButSender(session_id) => GameMessage::BroadcastPacket {
                    packet: outbound.packet,
                    exclude: Some(session_id),
                },
                Audience::All => GameMessage::BroadcastPacket {
                    packet: outbound.packet,
                    exclude: None,
                },
            };
            self.queue(message);
        }
    }

    /// Tears down a session's player record and broadcasts the departure.
    /// The relay layer guarantees at most one `PlayerLeft` per session no
    /// matter which teardown path got here first.
    fn cleanup_session(&mut self, session_id: u32) {
        let outbounds = relay::disconnect(&mut self.world, session_id);
        self.dispatch(outbounds);
    }

    /// Processes one inbound packet against the world state
    async fn handle_packet(&mut self, packet: Packet, addr: SocketAddr) {
        match packet {
            Packet::Connect { client_version } => {
                info!(
                    "Client connecting from {} (version: {})",
                    addr, client_version
                );

                // Tear down any existing session from this address first
                let existing_session = {
                    let connections = self.connections.read().await;
                    connections.find_by_addr(addr)
                };

                if let Some(existing_id) = existing_session {
                    info!("Replacing existing session {} from {}", existing_id, addr);
                    {
                        let mut connections = self.connections.write().await;
                        connections.remove_connection(&existing_id);
                    }
                    self.cleanup_session(existing_id);
                }

                let session_id = {
                    let mut connections = self.connections.write().await;
                    connections.add_connection(addr)
                };

                if let Some(session_id) = session_id {
                    self.queue(GameMessage::SendPacket {
                        packet: Packet::Connected { session_id },
                        addr,
                    });
                    let outbounds = relay::connect(&mut self.world, session_id);
                    self.dispatch(outbounds);
                } else {
                    self.queue(GameMessage::SendPacket {
                        packet: Packet::Disconnected {
                            reason: "Server full".to_string(),
                        },
                        addr,
                    });
                }
            }

            Packet::Disconnect => {
                let session_id = {
                    let connections = self.connections.read().await;
                    connections.find_by_addr(addr)
                };

                if let Some(session_id) = session_id {
                    let removed = {
                        let mut connections = self.connections.write().await;
                        connections.remove_connection(&session_id)
                    };
                    if removed {
                        self.cleanup_session(session_id);
                    }
                }
            }

            packet => {
                let session_id = {
                    let connections = self.connections.read().await;
                    connections.find_by_addr(addr)
                };

                match session_id {
                    Some(session_id) => {
                        {
                            let mut connections = self.connections.write().await;
                            connections.touch(session_id);
                        }
                        let outbounds = relay::handle(&mut self.world, session_id, packet);
                        self.dispatch(outbounds);
                    }
                    None => {
                        debug!("Dropping packet from unknown address {}", addr);
                    }
                }
            }
        }
    }

    /// Main relay loop: one message at a time, to completion
    pub async fn run(&mut self) -> Result<(), Box<dyn std::error::Error>> {
        self.spawn_network_receiver().await;
        self.spawn_network_sender().await;
        self.spawn_timeout_checker().await;

        info!("Relay started successfully");

        loop {
            match self.server_rx.recv().await {
                Some(ServerMessage::PacketReceived { packet, addr }) => {
                    self.handle_packet(packet, addr).await;
                }
                Some(ServerMessage::SessionTimeout { session_id }) => {
                    info!("Session {} timed out", session_id);
                    self.cleanup_session(session_id);
                }
                Some(ServerMessage::Shutdown) | None => {
                    info!("Relay shutting down");
                    break;
                }
            }
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::net::{IpAddr, Ipv4Addr};
    use tokio::sync::mpsc;

    #[test]
    fn test_server_message_creation() {
        let packet = Packet::Connect { client_version: 1 };
        let addr = SocketAddr::new(IpAddr::V4(Ipv4Addr::new(127, 0, 0, 1)), 8080);

        let msg = ServerMessage::PacketReceived {
            packet: packet.clone(),
            addr,
        };

        match msg {
            ServerMessage::PacketReceived { packet: p, addr: a } => {
                assert_eq!(a, addr);
                match p {
                    Packet::Connect { client_version } => {
                        assert_eq!(client_version, 1);
                    }
                    _ => panic!("Unexpected packet type"),
                }
            }
            _ => panic!("Unexpected message type"),
        }
    }

    #[test]
    fn test_session_timeout_message() {
        let session_id = 42;
        let msg = ServerMessage::SessionTimeout { session_id };

        match msg {
            ServerMessage::SessionTimeout { session_id: id } => {
                assert_eq!(id, session_id);
            }
            _ => panic!("Unexpected message type"),
        }
    }

    #[test]
    fn test_game_message_send_to_session() {
        let packet = Packet::Eliminated;

        let msg = GameMessage::SendTo {
            packet,
            session_id: 7,
        };

        match msg {
            GameMessage::SendTo { packet: p, session_id } => {
                assert_eq!(session_id, 7);
                assert!(matches!(p, Packet::Eliminated));
            }
            _ => panic!("Unexpected message type"),
        }
    }

    #[test]
    fn test_game_message_broadcast_excludes_sender() {
        let packet = Packet::PlayerMoved {
            id: 5,
            x: 1.0,
            y: 2.0,
            z: 3.0,
            rotation: 0.0,
        };

        let msg = GameMessage::BroadcastPacket {
            packet: packet.clone(),
            exclude: Some(5),
        };

        match msg {
            GameMessage::BroadcastPacket { packet: p, exclude } => {
                assert_eq!(exclude, Some(5));
                match p {
                    Packet::PlayerMoved { id, .. } => assert_eq!(id, 5),
                    _ => panic!("Unexpected packet type"),
                }
            }
            _ => panic!("Unexpected message type"),
        }
    }

    #[test]
    fn test_channel_communication() {
        let (tx, mut rx) = mpsc::unbounded_channel::<ServerMessage>();

        let packet = Packet::Connect { client_version: 1 };
        let addr = SocketAddr::new(IpAddr::V4(Ipv4Addr::new(127, 0, 0, 1)), 8080);

        let msg = ServerMessage::PacketReceived {
            packet: packet.clone(),
            addr,
        };

        assert!(tx.send(msg).is_ok());

        let received = rx.try_recv();
        assert!(received.is_ok());

        match received.unwrap() {
            ServerMessage::PacketReceived { packet: p, addr: a } => {
                assert_eq!(a, addr);
                match p {
                    Packet::Connect { client_version } => {
                        assert_eq!(client_version, 1);
                    }
                    _ => panic!("Unexpected packet type"),
                }
            }
            _ => panic!("Unexpected message type"),
        }
    }

    #[tokio::test]
    async fn test_connect_handshake_end_to_end() {
        let mut server = Server::new("127.0.0.1:0", 4, Duration::from_secs(5))
            .await
            .expect("Failed to bind relay");
        let server_addr = server.socket.local_addr().unwrap();

        tokio::spawn(async move {
            let _ = server.run().await;
        });

        let client = UdpSocket::bind("127.0.0.1:0").await.unwrap();
        let connect = serialize(&Packet::Connect { client_version: 1 }).unwrap();
        client.send_to(&connect, server_addr).await.unwrap();

        // Expect Connected, InitWorld, StatsUpdate in that order
        let mut buf = [0u8; 8192];
        let mut received = Vec::new();
        for _ in 0..3 {
            let (len, _) =
                tokio::time::timeout(Duration::from_secs(2), client.recv_from(&mut buf))
                    .await
                    .expect("Timed out waiting for handshake packet")
                    .unwrap();
            received.push(deserialize::<Packet>(&buf[0..len]).unwrap());
        }

        assert!(matches!(received[0], Packet::Connected { session_id: 1 }));
        match &received[1] {
            Packet::InitWorld {
                structures,
                containers,
            } => {
                assert!(structures.is_empty());
                assert_eq!(containers.len(), shared::CONTAINER_COUNT as usize);
            }
            other => panic!("Expected InitWorld, got {:?}", other),
        }
        assert!(matches!(
            received[2],
            Packet::StatsUpdate {
                health: 100,
                shield: 100
            }
        ));
    }
}
