pub mod catalog;
pub mod code;
pub mod error;
pub mod messaging;
pub mod net;
pub mod phase;
pub mod player;
pub mod roster;
pub mod scenario;
pub mod session;
pub mod snapshot;
pub mod time;

#[cfg(any(test, feature = "test-helpers"))]
pub mod test_helpers {
    use std::sync::Arc;

    use rand::SeedableRng;
    use rand::rngs::StdRng;
    use uuid::Uuid;

    use crate::catalog::BUILTIN_SCENARIO_JSON;
    use crate::messaging::AccusationClaim;
    use crate::player::{Player, PlayerId};
    use crate::scenario::Scenario;
    use crate::session::GameSession;

    /// The built-in scenario (4 to 6 players).
    pub fn heiress() -> Arc<Scenario> {
        Arc::new(Scenario::from_json(BUILTIN_SCENARIO_JSON).expect("built-in scenario parses"))
    }

    /// Deterministic RNG for allocator tests.
    pub fn seeded(seed: u64) -> StdRng {
        StdRng::seed_from_u64(seed)
    }

    pub fn rng() -> StdRng {
        seeded(42)
    }

    /// A lobby session with a single host named `host_name`.
    pub fn new_session(host_name: &str) -> (GameSession, PlayerId) {
        let host = Player::new(Uuid::new_v4(), host_name.to_string(), 0);
        let host_id = host.id;
        (
            GameSession::new("TEST01".to_string(), heiress(), host, 0),
            host_id,
        )
    }

    /// A lobby session with `n` players named `Player0..`, the first being
    /// host. Ids are returned in join order.
    pub fn full_session(n: usize) -> (GameSession, Vec<PlayerId>) {
        assert!(n >= 1, "a session needs a host");
        let (mut session, host) = new_session("Player0");
        let mut ids = vec![host];
        for i in 1..n {
            let p = Player::new(Uuid::new_v4(), format!("Player{i}"), i as u64);
            ids.push(session.add_player(p).expect("room for player"));
        }
        (session, ids)
    }

    pub fn claim() -> AccusationClaim {
        AccusationClaim {
            murderer: "Dr. Margaret Thornfield".to_string(),
            motive: "Hide the forgery".to_string(),
            method: "Poison".to_string(),
        }
    }
}
