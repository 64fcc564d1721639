// src/fleet.rs
use futures_util::future::join_all;

use crate::config::ServerEntry;
use crate::models::server::ServerInfo;
use crate::query::client;

// A single dropped datagram must not toggle the public status, so an
// endpoint has to miss this many polls in a row before it goes offline.
pub const FAILURE_CAP: u8 = 3;

// Placeholder map shown while an endpoint is missing polls but has not
// yet crossed the failure cap.
pub const REFRESHING_MAP: &str = "Refreshing...";

#[derive(Debug, Clone, PartialEq)]
pub struct EndpointState {
    pub name: String,
    pub map: String,
    pub players: i32,
    pub max_players: i32,
    pub info: Option<ServerInfo>,
    pub failed_updates: u8,
    pub online: bool,
}

impl EndpointState {
    pub fn new(fallback_name: &str) -> Self {
        Self {
            name: fallback_name.to_string(),
            map: String::new(),
            players: 0,
            max_players: 0,
            info: None,
            failed_updates: 0,
            online: false,
        }
    }
}

// One poll-cycle transition. A reply resets the failure counter and
// refreshes everything from live data; a miss bumps the capped counter.
// Below the cap the online flag is left alone and only the displayed map
// turns into the refreshing placeholder; at the cap the endpoint goes
// offline and its stale player count is zeroed.
pub fn next_state(mut state: EndpointState, result: Option<ServerInfo>) -> EndpointState {
    match result {
        Some(info) => {
            state.name = info.name.clone();
            state.map = info.map.clone();
            state.players = info.players;
            state.max_players = info.max_players;
            state.info = Some(info);
            state.failed_updates = 0;
            state.online = true;
        }
        None => {
            state.failed_updates = (state.failed_updates + 1).min(FAILURE_CAP);
            if state.failed_updates >= FAILURE_CAP {
                state.online = false;
                state.players = 0;
            } else {
                state.map = REFRESHING_MAP.to_string();
            }
        }
    }
    state
}

#[derive(Debug)]
pub struct Endpoint {
    pub host: String,
    pub port: u16,
    pub state: EndpointState,
}

impl Endpoint {
    pub fn new(host: &str, port: u16, fallback_name: &str) -> Self {
        Self {
            host: host.to_string(),
            port,
            state: EndpointState::new(fallback_name),
        }
    }

    pub fn apply(&mut self, result: Option<ServerInfo>) {
        self.state = next_state(self.state.clone(), result);
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct SnapshotEntry {
    pub host: String,
    pub port: u16,
    pub name: String,
    pub map: String,
    pub players: i32,
    pub max_players: i32,
    pub online: bool,
}

// Post-update state of every endpoint, in configured order. Presentation
// re-sorts by player count; keeping configuration order here makes that
// re-sort deterministic for equal keys.
#[derive(Debug, Clone, PartialEq)]
pub struct FleetSnapshot {
    pub entries: Vec<SnapshotEntry>,
    pub cycle_failed: bool,
}

impl FleetSnapshot {
    pub fn total_players(&self) -> i64 {
        self.entries
            .iter()
            .filter(|e| e.online)
            .map(|e| i64::from(e.players))
            .sum()
    }
}

pub struct Fleet {
    endpoints: Vec<Endpoint>,
}

impl Fleet {
    pub fn from_config(servers: &[ServerEntry]) -> Self {
        Self {
            endpoints: servers
                .iter()
                .map(|s| Endpoint::new(&s.address, s.query_port, &s.name))
                .collect(),
        }
    }

    pub fn len(&self) -> usize {
        self.endpoints.len()
    }

    // Queries every endpoint concurrently, applies the monitor transition
    // per result and captures the snapshot. One endpoint failing never
    // delays or aborts the others; wall time is bounded by the single
    // query timeout, not the fleet size.
    pub async fn poll_all(&mut self) -> FleetSnapshot {
        let queries = self
            .endpoints
            .iter()
            .map(|e| client::query(&e.host, e.port));
        let results = join_all(queries).await;

        let cycle_failed = !results.is_empty() && results.iter().all(|r| r.is_none());

        for (endpoint, result) in self.endpoints.iter_mut().zip(results) {
            endpoint.apply(result);
        }

        FleetSnapshot {
            entries: self
                .endpoints
                .iter()
                .map(|e| SnapshotEntry {
                    host: e.host.clone(),
                    port: e.port,
                    name: e.state.name.clone(),
                    map: e.state.map.clone(),
                    players: e.state.players,
                    max_players: e.state.max_players,
                    online: e.state.online,
                })
                .collect(),
            cycle_failed,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::{Duration, Instant};
    use tokio::net::UdpSocket;

    fn info(players: i32) -> ServerInfo {
        ServerInfo {
            name: "Test Server".to_string(),
            map: "DH-Test_".to_string(),
            players,
            max_players: 32,
        }
    }

    #[test]
    fn reply_resets_failures_and_marks_online() {
        let mut state = EndpointState::new("Fallback");
        state.failed_updates = 2;
        let state = next_state(state, Some(info(5)));
        assert!(state.online);
        assert_eq!(state.failed_updates, 0);
        assert_eq!(state.name, "Test Server");
        assert_eq!(state.players, 5);
    }

    #[test]
    fn two_consecutive_misses_never_flip_online() {
        // Alternating windows of up to two misses between replies must
        // keep the public status stable.
        let mut state = next_state(EndpointState::new("Fallback"), Some(info(5)));
        for _ in 0..10 {
            state = next_state(state, None);
            assert!(state.online);
            state = next_state(state, None);
            assert!(state.online);
            assert_eq!(state.map, REFRESHING_MAP);
            state = next_state(state, Some(info(5)));
            assert!(state.online);
            assert_eq!(state.map, "DH-Test_");
        }
    }

    #[test]
    fn third_consecutive_miss_goes_offline_with_zero_players() {
        let mut state = next_state(EndpointState::new("Fallback"), Some(info(17)));
        for _ in 0..2 {
            state = next_state(state, None);
            assert!(state.online);
            assert_eq!(state.players, 17);
        }
        state = next_state(state, None);
        assert!(!state.online);
        assert_eq!(state.players, 0);
    }

    #[test]
    fn failure_counter_stays_capped() {
        let mut state = EndpointState::new("Fallback");
        for _ in 0..20 {
            state = next_state(state, None);
        }
        assert_eq!(state.failed_updates, FAILURE_CAP);
        assert!(!state.online);
    }

    #[test]
    fn recovery_after_offline_restores_live_data() {
        let mut state = EndpointState::new("Fallback");
        for _ in 0..4 {
            state = next_state(state, None);
        }
        let state = next_state(state, Some(info(3)));
        assert!(state.online);
        assert_eq!(state.players, 3);
        assert_eq!(state.failed_updates, 0);
    }

    #[test]
    fn hysteresis_scenario_over_four_cycles() {
        let mut endpoint = Endpoint::new("10.0.0.1", 7777, "Fallback");

        endpoint.apply(Some(info(5)));
        assert!(endpoint.state.online);
        assert_eq!(endpoint.state.map, "DH-Test_");

        endpoint.apply(None);
        endpoint.apply(None);
        assert!(endpoint.state.online);
        assert_eq!(endpoint.state.map, REFRESHING_MAP);
        assert_eq!(endpoint.state.players, 5);

        endpoint.apply(None);
        assert!(!endpoint.state.online);
        assert_eq!(endpoint.state.players, 0);
    }

    fn entry(name: &str, port: u16) -> ServerEntry {
        ServerEntry {
            name: name.to_string(),
            address: "127.0.0.1".to_string(),
            query_port: port,
        }
    }

    #[tokio::test]
    async fn poll_all_is_bounded_by_single_timeout_and_keeps_order() {
        // Eight listeners that never answer; the sockets stay bound for
        // the duration of the test so nothing short-circuits the timeout.
        let mut sockets = Vec::new();
        let mut entries = Vec::new();
        for i in 0..8 {
            let socket = UdpSocket::bind("127.0.0.1:0").await.unwrap();
            entries.push(entry(&format!("server-{}", i), socket.local_addr().unwrap().port()));
            sockets.push(socket);
        }

        let mut fleet = Fleet::from_config(&entries);
        let started = Instant::now();
        let snapshot = fleet.poll_all().await;
        let elapsed = started.elapsed();

        assert!(elapsed < Duration::from_millis(800), "took {:?}", elapsed);
        assert!(snapshot.cycle_failed);
        let names: Vec<&str> = snapshot.entries.iter().map(|e| e.name.as_str()).collect();
        let expected: Vec<String> = (0..8).map(|i| format!("server-{}", i)).collect();
        assert_eq!(names, expected.iter().map(String::as_str).collect::<Vec<_>>());
    }

    #[tokio::test]
    async fn empty_fleet_is_not_a_failed_cycle() {
        let mut fleet = Fleet::from_config(&[]);
        let snapshot = fleet.poll_all().await;
        assert!(!snapshot.cycle_failed);
        assert!(snapshot.entries.is_empty());
        assert_eq!(snapshot.total_players(), 0);
    }

    #[test]
    fn total_players_counts_only_online_endpoints() {
        let snapshot = FleetSnapshot {
            entries: vec![
                SnapshotEntry {
                    host: "a".into(),
                    port: 1,
                    name: "A".into(),
                    map: "DH-Foy".into(),
                    players: 10,
                    max_players: 64,
                    online: true,
                },
                SnapshotEntry {
                    host: "b".into(),
                    port: 2,
                    name: "B".into(),
                    map: String::new(),
                    players: 0,
                    max_players: 0,
                    online: false,
                },
            ],
            cycle_failed: false,
        };
        assert_eq!(snapshot.total_players(), 10);
    }
}
