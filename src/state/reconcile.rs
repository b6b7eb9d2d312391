//! Remote to local adoption rule.
//!
//! The ledger length acts as a logical clock: a remote copy of the same match
//! only replaces the local one when it carries strictly more history. This
//! never downgrades local progress but accepts real progress made on another
//! device. Concurrent edits on two devices between syncs are not merged; the
//! longer history wins and the other one is dropped.

use crate::state::{ledger::TeamId, session::MatchState};

/// Outcome of comparing a remote snapshot with the local match.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SyncDecision {
    /// Replace the local match wholesale.
    AdoptRemote,
    /// Keep local scores, take the remote display names that differ.
    PatchNames {
        /// New name for nosotros, when it changed.
        nosotros: Option<String>,
        /// New name for ellos, when it changed.
        ellos: Option<String>,
    },
    /// Nothing to take from the remote copy.
    KeepLocal,
}

/// Decide what to do with `remote` given the `local` match.
pub fn decide(local: &MatchState, remote: &MatchState) -> SyncDecision {
    if remote.id != local.id || remote.ledger().len() > local.ledger().len() {
        return SyncDecision::AdoptRemote;
    }

    let renamed = |team: TeamId| {
        let name = &remote.team(team).name;
        (name != &local.team(team).name).then(|| name.clone())
    };
    let nosotros = renamed(TeamId::Nosotros);
    let ellos = renamed(TeamId::Ellos);

    if nosotros.is_none() && ellos.is_none() {
        SyncDecision::KeepLocal
    } else {
        SyncDecision::PatchNames { nosotros, ellos }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::state::{
        bids::BidType,
        session::{MatchMode, MatchSession},
        win_policy::TargetScore,
    };

    fn scored(session: &mut MatchSession, actions: usize) {
        for _ in 0..actions {
            session
                .add_points(TeamId::Nosotros, 1, BidType::ManualTap)
                .unwrap();
        }
    }

    #[test]
    fn shorter_remote_history_only_patches_names() {
        let mut local = MatchSession::new(MatchMode::OneVsOne, TargetScore::Thirty);
        scored(&mut local, 3);
        let mut remote = local.clone();
        scored(&mut local, 2);
        remote.set_team_name(TeamId::Ellos, "Rivales");

        assert_eq!(
            decide(local.state(), remote.state()),
            SyncDecision::PatchNames {
                nosotros: None,
                ellos: Some("Rivales".into()),
            }
        );
    }

    #[test]
    fn equal_history_without_renames_keeps_local() {
        let mut local = MatchSession::new(MatchMode::OneVsOne, TargetScore::Thirty);
        scored(&mut local, 2);
        let remote = local.clone();
        assert_eq!(
            decide(local.state(), remote.state()),
            SyncDecision::KeepLocal
        );
    }

    #[test]
    fn longer_remote_history_is_adopted() {
        let local = MatchSession::new(MatchMode::OneVsOne, TargetScore::Thirty);
        let mut remote = local.clone();
        scored(&mut remote, 1);
        assert_eq!(
            decide(local.state(), remote.state()),
            SyncDecision::AdoptRemote
        );
    }

    #[test]
    fn different_match_is_always_adopted() {
        let mut local = MatchSession::new(MatchMode::OneVsOne, TargetScore::Thirty);
        scored(&mut local, 4);
        let remote = MatchSession::new(MatchMode::TwoVsTwo, TargetScore::Fifteen);
        assert_eq!(
            decide(local.state(), remote.state()),
            SyncDecision::AdoptRemote
        );
    }
}
