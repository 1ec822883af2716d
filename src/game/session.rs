//! Session lifecycle: join, movement and leave handling over the world store
//!
//! Each handler runs to completion against the owned [`WorldState`] and returns the
//! addressed messages it produced. Delivery is the caller's job.

use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::ws::dispatch::Dispatch;
use crate::ws::protocol::{Direction, MovementIntent, MovementPayload, ScoreUpdate, ServerMsg};

use super::collectible::CollectibleGenerator;
use super::collision::check_pickups;
use super::state::{Player, WorldState};
use super::{Position, MAX_X, MAX_Y, MIN_X, MIN_Y};

/// Phase of a single connection
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionPhase {
    /// Socket accepted, player not yet registered
    Connecting,
    /// Player exists in the world
    Active,
    /// Terminal
    Disconnected,
}

impl SessionPhase {
    /// Advance one step; `Disconnected` stays put
    pub fn next(self) -> Self {
        match self {
            SessionPhase::Connecting => SessionPhase::Active,
            SessionPhase::Active | SessionPhase::Disconnected => SessionPhase::Disconnected,
        }
    }
}

/// Owns the authoritative world and applies session events to it
#[derive(Debug)]
pub struct SessionManager {
    world: WorldState,
    generator: CollectibleGenerator,
    rng: ChaCha8Rng,
}

impl SessionManager {
    /// Create a world holding `collectible_count` collectibles
    pub fn new(collectible_count: usize, seed: u64) -> Self {
        let mut generator = CollectibleGenerator::new(seed);
        let mut world = WorldState::new();
        for _ in 0..collectible_count {
            world.add_collectible(generator.create());
        }

        Self {
            world,
            generator,
            rng: ChaCha8Rng::seed_from_u64(seed.wrapping_add(1)),
        }
    }

    pub fn world(&self) -> &WorldState {
        &self.world
    }

    /// Mutable access to the store, bypassing the lifecycle rules
    #[cfg(test)]
    pub(crate) fn world_mut(&mut self) -> &mut WorldState {
        &mut self.world
    }

    #[cfg(test)]
    pub(crate) fn generator_mut(&mut self) -> &mut CollectibleGenerator {
        &mut self.generator
    }

    fn spawn_position(&mut self) -> Position {
        Position::new(
            self.rng.gen_range(MIN_X..=MAX_X),
            self.rng.gen_range(MIN_Y..=MAX_Y),
        )
    }

    /// Register a new player, snapshot the world to them and announce them to everyone else
    pub fn connect(&mut self, session_id: Uuid) -> Vec<Dispatch> {
        if self.world.contains_player(&session_id) {
            warn!(session_id = %session_id, "Session already active");
            return Vec::new();
        }

        let player = Player::new(session_id, self.spawn_position());
        self.world.set_player(player.clone());

        info!(
            session_id = %session_id,
            x = player.x,
            y = player.y,
            player_count = self.world.player_count(),
            "Player joined"
        );

        let init = ServerMsg::Init {
            id: session_id,
            players: self.world.players().clone(),
            collectibles: self.world.collectibles().to_vec(),
        };

        vec![
            Dispatch::only(session_id, init),
            Dispatch::all_except(session_id, ServerMsg::NewPlayer(player)),
        ]
    }

    /// Apply a movement intent, resolve pickups and announce the results
    pub fn movement(&mut self, session_id: Uuid, payload: &MovementPayload) -> Vec<Dispatch> {
        let Some(intent) = payload.intent() else {
            debug!(session_id = %session_id, ?payload, "Ignoring malformed movement");
            return Vec::new();
        };

        let Some(player) = self.world.player_mut(&session_id) else {
            debug!(session_id = %session_id, "Movement for unknown session");
            return Vec::new();
        };

        let target = apply_intent(player.position(), intent);
        player.set_position(target);

        let mut dispatches = Vec::new();

        for picked in check_pickups(target, self.world.collectibles()) {
            if self.world.remove_collectible(picked.id).is_none() {
                continue;
            }

            let replacement = self.generator.create();
            self.world.add_collectible(replacement.clone());

            let Some(player) = self.world.player_mut(&session_id) else {
                break;
            };
            player.score = player.score.saturating_add(picked.value);

            debug!(
                session_id = %session_id,
                collected = picked.id,
                value = picked.value,
                score = player.score,
                replacement = replacement.id,
                "Collectible picked up"
            );

            dispatches.push(Dispatch::all(ServerMsg::CollectibleUpdate {
                collected: picked.id,
                replacement,
                player: ScoreUpdate {
                    id: session_id,
                    score: player.score,
                },
            }));
        }

        if let Some(player) = self.world.player(&session_id) {
            dispatches.push(Dispatch::all_except(
                session_id,
                ServerMsg::player_update(player),
            ));
        }

        dispatches
    }

    /// Remove a player and tell the rest. Unknown ids are a no-op.
    pub fn disconnect(&mut self, session_id: Uuid) -> Vec<Dispatch> {
        match self.world.remove_player(&session_id) {
            Some(player) => {
                info!(
                    session_id = %session_id,
                    score = player.score,
                    player_count = self.world.player_count(),
                    "Player left"
                );
                vec![Dispatch::all(ServerMsg::PlayerDisconnect(session_id))]
            }
            None => {
                debug!(session_id = %session_id, "Disconnect for unknown session");
                Vec::new()
            }
        }
    }
}

/// Resolve an intent against the current position; the result is always in bounds
pub fn apply_intent(current: Position, intent: MovementIntent) -> Position {
    let target = match intent {
        MovementIntent::Absolute { x, y } => Position::new(x, y),
        MovementIntent::Relative { direction, speed } => match direction {
            Direction::Up => Position::new(current.x, current.y - speed),
            Direction::Down => Position::new(current.x, current.y + speed),
            Direction::Left => Position::new(current.x - speed, current.y),
            Direction::Right => Position::new(current.x + speed, current.y),
        },
    };
    target.clamped()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::game::state::Collectible;
    use crate::ws::dispatch::Recipients;

    fn manager_with_player() -> (SessionManager, Uuid) {
        let mut manager = SessionManager::new(0, 1);
        let id = Uuid::new_v4();
        manager.connect(id);
        (manager, id)
    }

    /// Place a freshly generated collectible at a fixed spot
    fn place(manager: &mut SessionManager, x: f64, y: f64, value: u32) -> Collectible {
        let mut c = manager.generator_mut().create();
        c.x = x;
        c.y = y;
        c.value = value;
        manager.world_mut().add_collectible(c.clone());
        c
    }

    fn teleport(manager: &mut SessionManager, id: Uuid, x: f64, y: f64) {
        manager
            .world_mut()
            .player_mut(&id)
            .unwrap()
            .set_position(Position::new(x, y));
    }

    #[test]
    fn test_phase_transitions() {
        assert_eq!(SessionPhase::Connecting.next(), SessionPhase::Active);
        assert_eq!(SessionPhase::Active.next(), SessionPhase::Disconnected);
        assert_eq!(SessionPhase::Disconnected.next(), SessionPhase::Disconnected);
    }

    #[test]
    fn test_initial_collectibles() {
        let manager = SessionManager::new(5, 3);
        let ids: Vec<u64> = manager.world().collectibles().iter().map(|c| c.id).collect();
        assert_eq!(ids, vec![0, 1, 2, 3, 4]);
    }

    #[test]
    fn test_connect_sends_init_then_announces() {
        let mut manager = SessionManager::new(3, 9);
        let first = Uuid::new_v4();
        let second = Uuid::new_v4();
        manager.connect(first);

        let dispatches = manager.connect(second);
        assert_eq!(dispatches.len(), 2);

        assert_eq!(dispatches[0].to, Recipients::Only(second));
        match &dispatches[0].msg {
            ServerMsg::Init {
                id,
                players,
                collectibles,
            } => {
                assert_eq!(*id, second);
                assert_eq!(players.len(), 2);
                assert!(players.contains_key(&first));
                assert!(players.contains_key(&second));
                assert_eq!(collectibles.len(), 3);
            }
            other => panic!("expected init, got {other:?}"),
        }

        assert_eq!(dispatches[1].to, Recipients::AllExcept(second));
        match &dispatches[1].msg {
            ServerMsg::NewPlayer(player) => {
                assert_eq!(player.id, second);
                assert_eq!(player.score, 0);
            }
            other => panic!("expected new-player, got {other:?}"),
        }
    }

    #[test]
    fn test_spawn_positions_in_bounds() {
        let mut manager = SessionManager::new(0, 11);
        for _ in 0..200 {
            manager.connect(Uuid::new_v4());
        }
        for player in manager.world().players().values() {
            assert!((MIN_X..=MAX_X).contains(&player.x));
            assert!((MIN_Y..=MAX_Y).contains(&player.y));
        }
    }

    #[test]
    fn test_duplicate_connect_is_noop() {
        let (mut manager, id) = manager_with_player();
        manager.world_mut().player_mut(&id).unwrap().score = 4;

        assert!(manager.connect(id).is_empty());
        assert_eq!(manager.world().player(&id).unwrap().score, 4);
    }

    #[test]
    fn test_absolute_move_clamped() {
        let (mut manager, id) = manager_with_player();

        manager.movement(id, &MovementPayload::absolute(-500.0, 10_000.0, 0.0, 0.0));
        let player = manager.world().player(&id).unwrap();
        assert_eq!((player.x, player.y), (MIN_X, MAX_Y));

        manager.movement(id, &MovementPayload::absolute(1e9, -1e9, 0.0, 0.0));
        let player = manager.world().player(&id).unwrap();
        assert_eq!((player.x, player.y), (MAX_X, MIN_Y));
    }

    #[test]
    fn test_relative_move() {
        let (mut manager, id) = manager_with_player();
        teleport(&mut manager, id, 300.0, 200.0);

        manager.movement(id, &MovementPayload::relative(Direction::Up, 5.0));
        manager.movement(id, &MovementPayload::relative(Direction::Right, 7.0));
        let player = manager.world().player(&id).unwrap();
        assert_eq!((player.x, player.y), (307.0, 195.0));

        manager.movement(id, &MovementPayload::relative(Direction::Left, 10_000.0));
        manager.movement(id, &MovementPayload::relative(Direction::Down, 10_000.0));
        let player = manager.world().player(&id).unwrap();
        assert_eq!((player.x, player.y), (MIN_X, MAX_Y));
    }

    #[test]
    fn test_malformed_move_changes_nothing() {
        let (mut manager, id) = manager_with_player();
        teleport(&mut manager, id, 300.0, 200.0);

        let dispatches = manager.movement(id, &MovementPayload::default());
        assert!(dispatches.is_empty());

        let player = manager.world().player(&id).unwrap();
        assert_eq!((player.x, player.y), (300.0, 200.0));
    }

    #[test]
    fn test_move_for_unknown_session_is_noop() {
        let (mut manager, id) = manager_with_player();
        let dispatches =
            manager.movement(Uuid::new_v4(), &MovementPayload::absolute(100.0, 100.0, 0.0, 0.0));
        assert!(dispatches.is_empty());
        assert_eq!(manager.world().player_count(), 1);
        assert!(manager.world().contains_player(&id));
    }

    #[test]
    fn test_plain_move_broadcasts_update_except_mover() {
        let (mut manager, id) = manager_with_player();
        let dispatches = manager.movement(id, &MovementPayload::absolute(100.0, 100.0, 1.0, 0.0));

        assert_eq!(
            dispatches,
            vec![Dispatch::all_except(
                id,
                ServerMsg::PlayerUpdate {
                    id,
                    x: 100.0,
                    y: 100.0,
                    score: 0
                }
            )]
        );
    }

    #[test]
    fn test_pickup_scenario() {
        let (mut manager, id) = manager_with_player();
        teleport(&mut manager, id, 300.0, 300.0);
        let c = place(&mut manager, 605.0, 20.0, 3);

        let dispatches = manager.movement(id, &MovementPayload::absolute(600.0, 20.0, 5.0, 0.0));

        let player = manager.world().player(&id).unwrap();
        assert_eq!((player.x, player.y), (600.0, 20.0));
        assert_eq!(player.score, 3);

        let collectibles = manager.world().collectibles();
        assert_eq!(collectibles.len(), 1);
        assert!(collectibles.iter().all(|x| x.id != c.id));

        assert_eq!(dispatches.len(), 2);
        assert_eq!(dispatches[0].to, Recipients::All);
        match &dispatches[0].msg {
            ServerMsg::CollectibleUpdate {
                collected,
                replacement,
                player,
            } => {
                assert_eq!(*collected, c.id);
                assert!(replacement.id > c.id);
                assert_eq!(*replacement, collectibles[0]);
                assert_eq!(player.id, id);
                assert_eq!(player.score, 3);
            }
            other => panic!("expected collectible-update, got {other:?}"),
        }

        assert_eq!(dispatches[1].to, Recipients::AllExcept(id));
        assert!(matches!(
            dispatches[1].msg,
            ServerMsg::PlayerUpdate { score: 3, .. }
        ));
    }

    #[test]
    fn test_pickup_uses_clamped_position() {
        let (mut manager, id) = manager_with_player();
        // Raw target (0, 100) would be on top of it; clamped (20, 100) is 15 away
        place(&mut manager, 5.0, 100.0, 2);
        // Clamped (20, 100) is exactly 20 away from this one
        place(&mut manager, 40.0, 100.0, 4);

        manager.movement(id, &MovementPayload::absolute(0.0, 100.0, 0.0, 0.0));
        assert_eq!(manager.world().player(&id).unwrap().score, 2);
    }

    #[test]
    fn test_two_pickups_in_one_move() {
        let (mut manager, id) = manager_with_player();
        teleport(&mut manager, id, 300.0, 300.0);
        let a = place(&mut manager, 100.0, 105.0, 2);
        let b = place(&mut manager, 95.0, 100.0, 5);
        let far = place(&mut manager, 500.0, 400.0, 1);

        let dispatches = manager.movement(id, &MovementPayload::absolute(100.0, 100.0, 0.0, 0.0));

        let collected: Vec<u64> = dispatches
            .iter()
            .filter_map(|d| match &d.msg {
                ServerMsg::CollectibleUpdate { collected, .. } => Some(*collected),
                _ => None,
            })
            .collect();
        assert_eq!(collected, vec![a.id, b.id]);
        assert!(dispatches[..2].iter().all(|d| d.to == Recipients::All));

        assert_eq!(manager.world().player(&id).unwrap().score, 7);
        assert_eq!(manager.world().collectible_count(), 3);
        assert!(manager.world().collectibles().iter().any(|c| c.id == far.id));
    }

    #[test]
    fn test_score_saturates_at_max() {
        let (mut manager, id) = manager_with_player();
        teleport(&mut manager, id, 300.0, 300.0);
        manager.world_mut().player_mut(&id).unwrap().score = u32::MAX - 1;
        place(&mut manager, 200.0, 200.0, 5);

        let dispatches = manager.movement(id, &MovementPayload::absolute(200.0, 200.0, 0.0, 0.0));

        assert_eq!(manager.world().player(&id).unwrap().score, u32::MAX);
        assert!(matches!(
            &dispatches[0].msg,
            ServerMsg::CollectibleUpdate { player, .. } if player.score == u32::MAX
        ));
    }

    #[test]
    fn test_invariants_over_random_walk() {
        let mut manager = SessionManager::new(8, 2024);
        let ids: Vec<Uuid> = (0..4).map(|_| Uuid::new_v4()).collect();
        for id in &ids {
            manager.connect(*id);
        }

        let mut rng = ChaCha8Rng::seed_from_u64(5);
        let mut last_scores = vec![0u32; ids.len()];
        let mut max_seen_id = manager
            .world()
            .collectibles()
            .iter()
            .map(|c| c.id)
            .max()
            .unwrap();

        for step in 0..5_000 {
            let who = step % ids.len();
            let payload = if rng.gen_bool(0.8) {
                MovementPayload::absolute(
                    rng.gen_range(-100.0..740.0),
                    rng.gen_range(-100.0..580.0),
                    0.0,
                    0.0,
                )
            } else {
                MovementPayload::relative(Direction::Right, rng.gen_range(-50.0..50.0))
            };

            for dispatch in manager.movement(ids[who], &payload) {
                if let ServerMsg::CollectibleUpdate { replacement, .. } = dispatch.msg {
                    assert!(replacement.id > max_seen_id);
                    max_seen_id = replacement.id;
                }
            }

            assert_eq!(manager.world().collectible_count(), 8);

            let player = manager.world().player(&ids[who]).unwrap();
            assert!((MIN_X..=MAX_X).contains(&player.x));
            assert!((MIN_Y..=MAX_Y).contains(&player.y));
            assert!(player.score >= last_scores[who]);
            last_scores[who] = player.score;
        }

        let mut seen: Vec<u64> = manager.world().collectibles().iter().map(|c| c.id).collect();
        seen.sort_unstable();
        seen.dedup();
        assert_eq!(seen.len(), 8);
    }

    #[test]
    fn test_disconnect_and_double_disconnect() {
        let mut manager = SessionManager::new(2, 4);
        let leaving = Uuid::new_v4();
        let staying = Uuid::new_v4();
        manager.connect(leaving);
        manager.connect(staying);
        manager.world_mut().player_mut(&staying).unwrap().score = 11;

        let dispatches = manager.disconnect(leaving);
        assert_eq!(
            dispatches,
            vec![Dispatch::all(ServerMsg::PlayerDisconnect(leaving))]
        );

        assert!(manager.disconnect(leaving).is_empty());
        assert!(manager.disconnect(Uuid::new_v4()).is_empty());

        assert_eq!(manager.world().player_count(), 1);
        assert_eq!(manager.world().player(&staying).unwrap().score, 11);
    }

    #[test]
    fn test_init_reflects_later_joiners() {
        let mut manager = SessionManager::new(4, 8);
        let early: Vec<Uuid> = (0..3).map(|_| Uuid::new_v4()).collect();
        for id in &early {
            manager.connect(*id);
        }
        manager.disconnect(early[1]);

        let late = Uuid::new_v4();
        let dispatches = manager.connect(late);
        let ServerMsg::Init {
            players,
            collectibles,
            ..
        } = &dispatches[0].msg
        else {
            panic!("expected init");
        };

        assert_eq!(players.len(), manager.world().player_count());
        assert!(!players.contains_key(&early[1]));
        assert!(players.contains_key(&early[0]) && players.contains_key(&early[2]));
        assert_eq!(collectibles.as_slice(), manager.world().collectibles());
    }
}
