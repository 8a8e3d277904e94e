//! Combat resolution: shield-then-health damage absorption, the single
//! alive-to-eliminated transition, and respawn.
//!
//! All inbound messages are handled one at a time, so two damage
//! applications for the same target can never interleave; the alive
//! guard in [`apply_damage`] is what makes elimination fire at most once
//! per life.

use crate::world::WorldState;
use log::info;
use rand::Rng;
use shared::{MAX_HEALTH, MAX_SHIELD, SPAWN_ALTITUDE, SPAWN_FIELD_EXTENT};

/// Result of a damage application, carrying the vitals the target's
/// client must be told about.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DamageOutcome {
    /// Unknown target, or target already eliminated. Nothing changed and
    /// nothing is sent.
    Ignored,
    /// Target survived with the given vitals.
    Damaged { health: i32, shield: i32 },
    /// This application drove health to zero; the target is now
    /// eliminated and stays so until an explicit respawn.
    Eliminated { health: i32, shield: i32 },
}

/// Applies damage to a player record.
///
/// Shield absorbs first; any overflow past zero shield is taken from
/// health (original absorption rule). Both vitals are clamped into
/// `0..=100` afterwards, which also neutralizes negative amounts from
/// hostile clients. Eliminated or unknown targets are a no-op.
pub fn apply_damage(world: &mut WorldState, target_id: u32, amount: i32) -> DamageOutcome {
    let player = match world.player_mut(&target_id) {
        Some(player) => player,
        None => return DamageOutcome::Ignored,
    };

    if !player.alive {
        return DamageOutcome::Ignored;
    }

    // Saturating arithmetic: the amount is client-supplied and may sit at
    // either i32 extreme, which must never panic or wrap the vitals.
    if player.shield > 0 {
        let overflow = amount.saturating_sub(player.shield);
        player.shield = player.shield.saturating_sub(amount).clamp(0, MAX_SHIELD);
        if overflow > 0 {
            player.health = player.health.saturating_sub(overflow);
        }
    } else {
        player.health = player.health.saturating_sub(amount);
    }
    player.health = player.health.clamp(0, MAX_HEALTH);

    if player.health == 0 {
        player.alive = false;
        info!("Player {} eliminated", target_id);
        DamageOutcome::Eliminated {
            health: player.health,
            shield: player.shield,
        }
    } else {
        DamageOutcome::Damaged {
            health: player.health,
            shield: player.shield,
        }
    }
}

/// Resets a player's vitals and places them at a fresh random spawn.
///
/// Honored at any time after (or even before) elimination; the respawn
/// cooldown is a client-side courtesy, not a server rule. Returns the new
/// position, or None for unknown players.
pub fn respawn(world: &mut WorldState, session_id: u32) -> Option<(f32, f32, f32)> {
    let player = world.player_mut(&session_id)?;
    let half = SPAWN_FIELD_EXTENT / 2.0;

    let mut rng = rand::thread_rng();
    player.health = MAX_HEALTH;
    player.shield = MAX_SHIELD;
    player.alive = true;
    player.x = rng.gen_range(-half..half);
    player.y = SPAWN_ALTITUDE;
    player.z = rng.gen_range(-half..half);

    info!("Player {} respawned at ({:.1}, {:.1})", session_id, player.x, player.z);
    Some((player.x, player.y, player.z))
}
