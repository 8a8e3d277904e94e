//! Message dispatch: maps each inbound packet to world mutations and the
//! outbound packets they imply.
//!
//! Handlers here are plain functions over the world store. They never
//! touch sockets or channels, which keeps every relay behavior testable
//! without a network layer; the network module is responsible for
//! actually delivering each [`Outbound`] to its audience.

use crate::combat::{self, DamageOutcome};
use crate::world::WorldState;
use log::warn;
use shared::{Packet, MAX_HEALTH, MAX_SHIELD};

/// Who an outbound packet is for.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Audience {
    /// A single session.
    One(u32),
    /// Every live session except the named one.
    AllButSender(u32),
    /// Every live session.
    All,
}

/// A packet the relay has decided to send, paired with its audience.
/// Delivery order per recipient matches the order of the returned Vec.
#[derive(Debug, Clone)]
pub struct Outbound {
    pub audience: Audience,
    pub packet: Packet,
}

impl Outbound {
    fn to(session_id: u32, packet: Packet) -> Self {
        Self {
            audience: Audience::One(session_id),
            packet,
        }
    }

    fn all_but(session_id: u32, packet: Packet) -> Self {
        Self {
            audience: Audience::AllButSender(session_id),
            packet,
        }
    }

    fn all(packet: Packet) -> Self {
        Self {
            audience: Audience::All,
            packet,
        }
    }
}

/// Creates the player record for a fresh session and produces its
/// welcome: the world snapshot (structures and remaining containers)
/// followed by its own vitals.
///
/// Nobody else hears about the newcomer here; presence reaches remote
/// clients implicitly through the first `Movement` fan-out.
pub fn connect(world: &mut WorldState, session_id: u32) -> Vec<Outbound> {
    world.add_player(session_id);

    vec![
        Outbound::to(
            session_id,
            Packet::InitWorld {
                structures: world.structures().to_vec(),
                containers: world.containers().to_vec(),
            },
        ),
        Outbound::to(
            session_id,
            Packet::StatsUpdate {
                health: MAX_HEALTH,
                shield: MAX_SHIELD,
            },
        ),
    ]
}

/// Tears down a session's player record and announces the departure.
///
/// Safe to call from any teardown path (explicit disconnect, timeout,
/// reconnect from the same address): the `PlayerLeft` broadcast is only
/// produced if the record was actually removed, so it fires exactly once
/// per connection.
pub fn disconnect(world: &mut WorldState, session_id: u32) -> Vec<Outbound> {
    if world.remove_player(&session_id) {
        vec![Outbound::all(Packet::PlayerLeft { id: session_id })]
    } else {
        Vec::new()
    }
}

/// Dispatches one inbound packet from a live session.
///
/// Reference-not-found conditions (stale structure ids, already-looted
/// containers, vanished damage targets) produce no output at all; clients
/// race against broadcasts they have not seen yet, and that is normal.
pub fn handle(world: &mut WorldState, sender: u32, packet: Packet) -> Vec<Outbound> {
    match packet {
        Packet::Movement { x, y, z, rotation } => {
            if world.set_transform(sender, x, y, z, rotation) {
                vec![Outbound::all_but(
                    sender,
                    Packet::PlayerMoved {
                        id: sender,
                        x,
                        y,
                        z,
                        rotation,
                    },
                )]
            } else {
                Vec::new()
            }
        }

        Packet::Build {
            kind,
            x,
            y,
            z,
            rotation,
        } => {
            let structure = world.add_structure(kind, x, y, z, rotation);
            vec![Outbound::all(Packet::StructureCreated { structure })]
        }

        Packet::DestroyStructure { structure_id } => {
            if world.remove_structure(structure_id) {
                vec![Outbound::all(Packet::StructureDestroyed { structure_id })]
            } else {
                Vec::new()
            }
        }

        Packet::DamagePlayer { target_id, amount } => {
            match combat::apply_damage(world, target_id, amount) {
                DamageOutcome::Ignored => Vec::new(),
                DamageOutcome::Damaged { health, shield } => {
                    vec![Outbound::to(target_id, Packet::StatsUpdate { health, shield })]
                }
                DamageOutcome::Eliminated { health, shield } => vec![
                    Outbound::to(target_id, Packet::StatsUpdate { health, shield }),
                    Outbound::to(target_id, Packet::Eliminated),
                    Outbound::all(Packet::PlayerDied { id: target_id }),
                ],
            }
        }

        Packet::RequestRespawn => match combat::respawn(world, sender) {
            Some((x, y, z)) => vec![
                Outbound::to(
                    sender,
                    Packet::StatsUpdate {
                        health: MAX_HEALTH,
                        shield: MAX_SHIELD,
                    },
                ),
                Outbound::all(Packet::PlayerRespawned { id: sender, x, y, z }),
            ],
            None => Vec::new(),
        },

        Packet::Loot { container_id } => {
            if world.remove_container(container_id) {
                vec![Outbound::all(Packet::ContainerLooted { container_id })]
            } else {
                Vec::new()
            }
        }

        // Connect/Disconnect are session management and handled by the
        // network layer before dispatch reaches here.
        other => {
            warn!("Session {} sent a server-bound packet: {:?}", sender, other);
            Vec::new()
        }
    }
}
