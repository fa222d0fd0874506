//! Per-peer attack lifecycle shared by every connection task. A peer only ever
//! moves forward through the lifecycle; racing connections decide the winner
//! with `transition` and followers block in `wait_until`.

use log::debug;
use std::collections::HashMap;
use std::net::IpAddr;
use std::time::Duration;
use tokio::sync::{Mutex, watch};

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum AttackState {
    FirstContact,
    PreparationStarted,
    Prepared,
    Finished,
}

#[derive(Default)]
pub struct PeerStateStore {
    peers: Mutex<HashMap<IpAddr, watch::Sender<AttackState>>>,
}

impl PeerStateStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Current state of the peer; unseen peers are in `FirstContact`.
    pub async fn get(&self, peer: IpAddr) -> AttackState {
        let mut peers = self.peers.lock().await;
        *Self::entry(&mut peers, peer).borrow()
    }

    /// Moves the peer to `to` only if its state still equals `from` and the
    /// move goes forward in the lifecycle. Returns whether the transition
    /// happened; among racing callers exactly one succeeds.
    pub async fn transition(&self, peer: IpAddr, from: AttackState, to: AttackState) -> bool {
        if to <= from {
            return false;
        }
        let mut peers = self.peers.lock().await;
        let state = Self::entry(&mut peers, peer);
        if *state.borrow() != from {
            return false;
        }
        state.send_replace(to);
        debug!("Peer {peer} moved from {from:?} to {to:?}");
        true
    }

    /// Blocks until the peer reaches `target` (or beyond) or the timeout
    /// lapses; returns whether it was reached. Waiting is signal-driven, not
    /// a poll loop.
    pub async fn wait_until(&self, peer: IpAddr, target: AttackState, timeout: Duration) -> bool {
        let mut receiver = {
            let mut peers = self.peers.lock().await;
            Self::entry(&mut peers, peer).subscribe()
        };
        match tokio::time::timeout(timeout, receiver.wait_for(|state| *state >= target)).await {
            Ok(reached) => reached.is_ok(),
            Err(_) => false,
        }
    }

    fn entry(
        peers: &mut HashMap<IpAddr, watch::Sender<AttackState>>,
        peer: IpAddr,
    ) -> &watch::Sender<AttackState> {
        peers
            .entry(peer)
            .or_insert_with(|| watch::channel(AttackState::FirstContact).0)
    }
}
