use log::info;
use rand::Rng;
use shared::{
    Container, Player, Structure, StructureKind, CONTAINER_ALTITUDE, CONTAINER_COUNT,
    LOOT_FIELD_EXTENT, SPAWN_ALTITUDE,
};
use std::collections::HashMap;

/// The single authoritative copy of world truth: player vitals and
/// transforms, standing structures, and unlooted containers.
///
/// Only the serialized message-handling path mutates this store, so no
/// locking is needed and no caller ever observes a half-applied update.
#[derive(Debug, Clone)]
pub struct WorldState {
    players: HashMap<u32, Player>,
    structures: Vec<Structure>,
    containers: Vec<Container>,
    next_structure_id: u64,
}

impl WorldState {
    /// Creates a world with no players or structures and the fixed
    /// complement of loot containers scattered over the loot field.
    pub fn new() -> Self {
        let mut world = Self {
            players: HashMap::new(),
            structures: Vec::new(),
            containers: Vec::new(),
            next_structure_id: 1,
        };
        world.seed_containers();
        world
    }

    fn seed_containers(&mut self) {
        let mut rng = rand::thread_rng();
        let half = LOOT_FIELD_EXTENT / 2.0;

        for id in 0..CONTAINER_COUNT {
            self.containers.push(Container {
                id,
                x: rng.gen_range(-half..half),
                y: CONTAINER_ALTITUDE,
                z: rng.gen_range(-half..half),
            });
        }
    }

    /// Creates the player record for a new session at the default spawn.
    pub fn add_player(&mut self, session_id: u32) {
        let player = Player::new(session_id, 0.0, SPAWN_ALTITUDE, 0.0);
        info!("Added player {} at default spawn", session_id);
        self.players.insert(session_id, player);
    }

    /// Removes a player record. Returns false if it was already gone.
    pub fn remove_player(&mut self, session_id: &u32) -> bool {
        if self.players.remove(session_id).is_some() {
            info!("Removed player {}", session_id);
            true
        } else {
            false
        }
    }

    pub fn player(&self, session_id: &u32) -> Option<&Player> {
        self.players.get(session_id)
    }

    pub fn player_mut(&mut self, session_id: &u32) -> Option<&mut Player> {
        self.players.get_mut(session_id)
    }

    /// Updates a player's position and facing. Vitals are untouched;
    /// position is last-write-wins per player. Returns false for unknown
    /// players (e.g. a movement racing a disconnect).
    pub fn set_transform(&mut self, session_id: u32, x: f32, y: f32, z: f32, rotation: f32) -> bool {
        if let Some(player) = self.players.get_mut(&session_id) {
            player.x = x;
            player.y = y;
            player.z = z;
            player.rotation = rotation;
            true
        } else {
            false
        }
    }

    pub fn structures(&self) -> &[Structure] {
        &self.structures
    }

    /// Appends a structure record with a fresh id and returns it.
    ///
    /// Ids are monotonic for the process lifetime and never reissued,
    /// even after the structure is destroyed.
    pub fn add_structure(
        &mut self,
        kind: StructureKind,
        x: f32,
        y: f32,
        z: f32,
        rotation: f32,
    ) -> Structure {
        let structure = Structure {
            id: self.next_structure_id,
            kind,
            x,
            y,
            z,
            rotation,
        };
        self.next_structure_id += 1;

        info!("Placed structure {} ({:?})", structure.id, structure.kind);
        self.structures.push(structure.clone());
        structure
    }

    /// Removes a structure by id. Unknown ids are a silent no-op.
    pub fn remove_structure(&mut self, structure_id: u64) -> bool {
        let before = self.structures.len();
        self.structures.retain(|s| s.id != structure_id);

        if self.structures.len() < before {
            info!("Destroyed structure {}", structure_id);
            true
        } else {
            false
        }
    }

    pub fn containers(&self) -> &[Container] {
        &self.containers
    }

    /// Removes a container on first interaction. Repeats and unknown ids
    /// are silent no-ops.
    pub fn remove_container(&mut self, container_id: u32) -> bool {
        let before = self.containers.len();
        self.containers.retain(|c| c.id != container_id);

        if self.containers.len() < before {
            info!("Container {} looted", container_id);
            true
        } else {
            false
        }
    }
}

impl Default for WorldState {
    fn default() -> Self {
        Self::new()
    }
}
