use serde::{Deserialize, Serialize};

pub const PROTOCOL_VERSION: u32 = 1;
pub const MAX_HEALTH: i32 = 100;
pub const MAX_SHIELD: i32 = 100;
pub const CONTAINER_COUNT: u32 = 20;
pub const LOOT_FIELD_EXTENT: f32 = 160.0;
pub const CONTAINER_ALTITUDE: f32 = 0.35;
pub const SPAWN_FIELD_EXTENT: f32 = 100.0;
pub const SPAWN_ALTITUDE: f32 = 10.0;

/// Every message exchanged between a client and the relay, in both
/// directions. Encoded with bincode on the wire.
#[derive(Debug, Serialize, Deserialize, Clone)]
pub enum Packet {
    // Client -> server
    Connect {
        client_version: u32,
    },
    Movement {
        x: f32,
        y: f32,
        z: f32,
        rotation: f32,
    },
    Build {
        kind: StructureKind,
        x: f32,
        y: f32,
        z: f32,
        rotation: f32,
    },
    DestroyStructure {
        structure_id: u64,
    },
    DamagePlayer {
        target_id: u32,
        amount: i32,
    },
    RequestRespawn,
    Loot {
        container_id: u32,
    },
    Disconnect,

    // Server -> client
    Connected {
        session_id: u32,
    },
    InitWorld {
        structures: Vec<Structure>,
        containers: Vec<Container>,
    },
    StatsUpdate {
        health: i32,
        shield: i32,
    },
    PlayerMoved {
        id: u32,
        x: f32,
        y: f32,
        z: f32,
        rotation: f32,
    },
    StructureCreated {
        structure: Structure,
    },
    StructureDestroyed {
        structure_id: u64,
    },
    Eliminated,
    PlayerDied {
        id: u32,
    },
    PlayerRespawned {
        id: u32,
        x: f32,
        y: f32,
        z: f32,
    },
    ContainerLooted {
        container_id: u32,
    },
    PlayerLeft {
        id: u32,
    },
    Disconnected {
        reason: String,
    },
}

/// A player record as held by the relay's world store.
///
/// The relay owns the only authoritative copy; clients learn about remote
/// players exclusively through `PlayerMoved`/`PlayerRespawned` broadcasts.
#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct Player {
    pub id: u32,
    pub x: f32,
    pub y: f32,
    pub z: f32,
    pub rotation: f32,
    pub health: i32,
    pub shield: i32,
    pub alive: bool,
}

impl Player {
    pub fn new(id: u32, x: f32, y: f32, z: f32) -> Self {
        Self {
            id,
            x,
            y,
            z,
            rotation: 0.0,
            health: MAX_HEALTH,
            shield: MAX_SHIELD,
            alive: true,
        }
    }

    /// True when both vitals sit inside their allowed ranges and the
    /// alive flag agrees with health. Used by tests and debug assertions.
    pub fn vitals_consistent(&self) -> bool {
        (0..=MAX_HEALTH).contains(&self.health)
            && (0..=MAX_SHIELD).contains(&self.shield)
            && (self.health == 0) == !self.alive
    }
}

/// Kinds of placeable structures.
#[derive(Debug, Serialize, Deserialize, Clone, Copy, PartialEq, Eq)]
pub enum StructureKind {
    Wall,
    Floor,
    Ramp,
}

/// A standing structure. The placement transform is client-provided and
/// trusted as-is; the id is assigned by the relay and never reissued.
#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct Structure {
    pub id: u64,
    pub kind: StructureKind,
    pub x: f32,
    pub y: f32,
    pub z: f32,
    pub rotation: f32,
}

/// An unlooted loot container, seeded once at world start.
#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct Container {
    pub id: u32,
    pub x: f32,
    pub y: f32,
    pub z: f32,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_player_creation() {
        let player = Player::new(7, 0.0, SPAWN_ALTITUDE, 0.0);
        assert_eq!(player.id, 7);
        assert_eq!(player.health, MAX_HEALTH);
        assert_eq!(player.shield, MAX_SHIELD);
        assert!(player.alive);
        assert_eq!(player.rotation, 0.0);
        assert!(player.vitals_consistent());
    }

    #[test]
    fn test_vitals_consistency_check() {
        let mut player = Player::new(1, 0.0, 0.0, 0.0);
        assert!(player.vitals_consistent());

        player.health = 0;
        assert!(!player.vitals_consistent());

        player.alive = false;
        assert!(player.vitals_consistent());

        player.shield = MAX_SHIELD + 1;
        assert!(!player.vitals_consistent());
    }

    #[test]
    fn test_packet_serialization_connect() {
        let packet = Packet::Connect {
            client_version: PROTOCOL_VERSION,
        };
        let serialized = bincode::serialize(&packet).unwrap();
        let deserialized: Packet = bincode::deserialize(&serialized).unwrap();

        match deserialized {
            Packet::Connect { client_version } => assert_eq!(client_version, PROTOCOL_VERSION),
            _ => panic!("Wrong packet type after deserialization"),
        }
    }

    #[test]
    fn test_packet_serialization_build() {
        let packet = Packet::Build {
            kind: StructureKind::Ramp,
            x: 1.0,
            y: 2.0,
            z: 3.0,
            rotation: 0.5,
        };

        let serialized = bincode::serialize(&packet).unwrap();
        let deserialized: Packet = bincode::deserialize(&serialized).unwrap();

        match deserialized {
            Packet::Build {
                kind,
                x,
                y,
                z,
                rotation,
            } => {
                assert_eq!(kind, StructureKind::Ramp);
                assert_eq!(x, 1.0);
                assert_eq!(y, 2.0);
                assert_eq!(z, 3.0);
                assert_eq!(rotation, 0.5);
            }
            _ => panic!("Wrong packet type after deserialization"),
        }
    }

    #[test]
    fn test_packet_serialization_init_world() {
        let structures = vec![Structure {
            id: 11,
            kind: StructureKind::Wall,
            x: 4.0,
            y: 0.0,
            z: -2.0,
            rotation: 1.5,
        }];
        let containers = vec![
            Container {
                id: 0,
                x: 10.0,
                y: CONTAINER_ALTITUDE,
                z: -30.0,
            },
            Container {
                id: 1,
                x: -55.0,
                y: CONTAINER_ALTITUDE,
                z: 12.0,
            },
        ];

        let packet = Packet::InitWorld {
            structures,
            containers,
        };

        let serialized = bincode::serialize(&packet).unwrap();
        let deserialized: Packet = bincode::deserialize(&serialized).unwrap();

        match deserialized {
            Packet::InitWorld {
                structures,
                containers,
            } => {
                assert_eq!(structures.len(), 1);
                assert_eq!(structures[0].id, 11);
                assert_eq!(structures[0].kind, StructureKind::Wall);
                assert_eq!(containers.len(), 2);
                assert_eq!(containers[0].id, 0);
                assert_eq!(containers[1].x, -55.0);
            }
            _ => panic!("Wrong packet type after deserialization"),
        }
    }

    #[test]
    fn test_packet_serialization_damage() {
        let packet = Packet::DamagePlayer {
            target_id: 3,
            amount: 25,
        };

        let serialized = bincode::serialize(&packet).unwrap();
        let deserialized: Packet = bincode::deserialize(&serialized).unwrap();

        match deserialized {
            Packet::DamagePlayer { target_id, amount } => {
                assert_eq!(target_id, 3);
                assert_eq!(amount, 25);
            }
            _ => panic!("Wrong packet type after deserialization"),
        }
    }
}
