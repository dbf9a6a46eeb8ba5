use std::collections::BTreeMap;

use serde::Serialize;

use crate::constants::majority_threshold;
use crate::types::{Participant, ParticipantId, Vote};

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct VoteResolution {
    pub round: u32,
    pub tally: BTreeMap<ParticipantId, usize>,
    pub total_votes: usize,
    pub max_count: usize,
    /// Holder of the strict maximum. A tie at the top accuses nobody.
    pub accused: Option<ParticipantId>,
    pub threshold: usize,
    pub impostor_id: Option<ParticipantId>,
    pub impostor_caught: bool,
    /// Non-impostors who voted for the impostor, in the order they voted.
    pub correct_guessers: Vec<ParticipantId>,
}

/// Tallies this round's votes. Caught requires the impostor to hold the strict
/// maximum and that maximum to reach `ceil(total / 2)`.
pub fn resolve_votes(participants: &[Participant], votes: &[Vote], round: u32) -> VoteResolution {
    let impostor_id = participants
        .iter()
        .find(|p| p.is_impostor)
        .map(|p| p.id.clone());

    let round_votes: Vec<&Vote> = votes
        .iter()
        .filter(|vote| vote.round == round)
        .filter(|vote| participants.iter().any(|p| p.id == vote.voter_id))
        .collect();

    let mut tally: BTreeMap<ParticipantId, usize> = BTreeMap::new();
    for vote in &round_votes {
        *tally.entry(vote.suspect_id.clone()).or_default() += 1;
    }

    let max_count = tally.values().copied().max().unwrap_or(0);
    let mut leaders = tally.iter().filter(|(_, count)| **count == max_count);
    let accused = match (leaders.next(), leaders.next()) {
        (Some((id, _)), None) if max_count > 0 => Some(id.clone()),
        _ => None,
    };

    let total_votes = round_votes.len();
    let threshold = majority_threshold(total_votes);
    let impostor_caught = total_votes > 0
        && accused.is_some()
        && accused == impostor_id
        && max_count >= threshold;

    let correct_guessers = match impostor_id.as_deref() {
        Some(impostor) => round_votes
            .iter()
            .filter(|vote| vote.suspect_id == impostor && vote.voter_id != impostor)
            .map(|vote| vote.voter_id.clone())
            .collect(),
        None => Vec::new(),
    };

    VoteResolution {
        round,
        tally,
        total_votes,
        max_count,
        accused,
        threshold,
        impostor_id,
        impostor_caught,
        correct_guessers,
    }
}

pub fn all_voted(participants: &[Participant]) -> bool {
    !participants.is_empty() && participants.iter().all(|p| p.voted)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::ScoreTotals;

    fn roster(ids: &[&str], impostor: &str) -> Vec<Participant> {
        ids.iter()
            .map(|id| {
                let mut participant = Participant::human(id, id, ScoreTotals::default());
                participant.is_impostor = *id == impostor;
                participant
            })
            .collect()
    }

    fn votes(round: u32, pairs: &[(&str, &str)]) -> Vec<Vote> {
        pairs
            .iter()
            .map(|(voter, suspect)| Vote {
                voter_id: voter.to_string(),
                suspect_id: suspect.to_string(),
                round,
            })
            .collect()
    }

    #[test]
    fn plurality_reaching_majority_catches_impostor() {
        let players = roster(&["p1", "p2", "p3", "p4"], "p2");
        let cast = votes(0, &[("p1", "p2"), ("p3", "p2"), ("p4", "p1"), ("p2", "p4")]);
        let resolution = resolve_votes(&players, &cast, 0);
        assert_eq!(resolution.max_count, 2);
        assert_eq!(resolution.total_votes, 4);
        assert_eq!(resolution.threshold, 2);
        assert_eq!(resolution.accused.as_deref(), Some("p2"));
        assert!(resolution.impostor_caught);
        assert_eq!(resolution.correct_guessers, vec!["p1", "p3"]);
    }

    #[test]
    fn tie_at_the_top_is_not_caught() {
        let players = roster(&["p1", "p2", "p3", "p4"], "p2");
        let cast = votes(0, &[("p1", "p2"), ("p3", "p4"), ("p4", "p2"), ("p2", "p4")]);
        let resolution = resolve_votes(&players, &cast, 0);
        assert_eq!(resolution.accused, None);
        assert!(!resolution.impostor_caught);
        assert_eq!(resolution.correct_guessers, vec!["p1", "p4"]);
    }

    #[test]
    fn plurality_below_majority_is_not_caught() {
        let players = roster(&["a", "b", "c", "d", "e", "f"], "a");
        let cast = votes(
            0,
            &[("b", "a"), ("c", "a"), ("d", "e"), ("e", "f"), ("f", "d"), ("a", "b")],
        );
        let resolution = resolve_votes(&players, &cast, 0);
        assert_eq!(resolution.accused.as_deref(), Some("a"));
        assert_eq!(resolution.threshold, 3);
        assert!(!resolution.impostor_caught);
    }

    #[test]
    fn zero_votes_resolve_to_not_caught() {
        let players = roster(&["p1", "p2", "p3"], "p1");
        let resolution = resolve_votes(&players, &[], 0);
        assert_eq!(resolution.total_votes, 0);
        assert!(!resolution.impostor_caught);
        assert!(resolution.correct_guessers.is_empty());
    }

    #[test]
    fn votes_from_other_rounds_are_ignored() {
        let players = roster(&["p1", "p2", "p3"], "p1");
        let mut cast = votes(0, &[("p2", "p1"), ("p3", "p1")]);
        cast.extend(votes(1, &[("p2", "p3")]));
        let resolution = resolve_votes(&players, &cast, 1);
        assert_eq!(resolution.total_votes, 1);
        assert!(!resolution.impostor_caught);
    }
}
