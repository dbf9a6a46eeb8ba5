use std::collections::BTreeMap;

use crate::constants::{CATCH_POINTS, CORRECT_GUESS_POINTS, SURVIVE_POINTS};
use crate::engine::voting::VoteResolution;
use crate::types::{FinalScore, Participant, ParticipantId};

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct ScoreDelta {
    pub non_impostor: u32,
    pub impostor: u32,
}

impl ScoreDelta {
    pub fn total(&self) -> u32 {
        self.non_impostor + self.impostor
    }
}

pub type RoundDeltas = BTreeMap<ParticipantId, ScoreDelta>;

/// Awards for one resolved round. Bonuses stack: a non-impostor who voted for
/// a caught impostor gets both the catch and the correct-guess points.
pub fn score_deltas(participants: &[Participant], resolution: &VoteResolution) -> RoundDeltas {
    let mut deltas = RoundDeltas::new();
    for voter in &resolution.correct_guessers {
        let is_non_impostor = participants
            .iter()
            .any(|p| p.id == *voter && !p.is_impostor);
        if is_non_impostor {
            deltas.entry(voter.clone()).or_default().non_impostor += CORRECT_GUESS_POINTS;
        }
    }
    if resolution.impostor_caught {
        merge(&mut deltas, catch_bonus(participants));
    } else if participants.len() <= 2 {
        merge(&mut deltas, survive_bonus(participants));
    }
    deltas
}

pub fn catch_bonus(participants: &[Participant]) -> RoundDeltas {
    participants
        .iter()
        .filter(|p| !p.is_impostor)
        .map(|p| {
            (
                p.id.clone(),
                ScoreDelta {
                    non_impostor: CATCH_POINTS,
                    impostor: 0,
                },
            )
        })
        .collect()
}

pub fn survive_bonus(participants: &[Participant]) -> RoundDeltas {
    participants
        .iter()
        .filter(|p| p.is_impostor)
        .map(|p| {
            (
                p.id.clone(),
                ScoreDelta {
                    non_impostor: 0,
                    impostor: SURVIVE_POINTS,
                },
            )
        })
        .collect()
}

pub fn apply_deltas(participants: &mut [Participant], deltas: &RoundDeltas) {
    for participant in participants {
        if let Some(delta) = deltas.get(&participant.id) {
            participant.score.non_impostor += delta.non_impostor;
            participant.score.impostor += delta.impostor;
            participant.latest_round_score += delta.total();
        }
    }
}

/// Cumulative standings, highest total first; ties keep roster order.
pub fn final_scores(participants: &[Participant]) -> Vec<FinalScore> {
    let mut scores: Vec<FinalScore> = participants
        .iter()
        .map(|p| FinalScore {
            participant_id: p.id.clone(),
            name: p.name.clone(),
            non_impostor: p.score.non_impostor,
            impostor: p.score.impostor,
            total: p.score.total(),
            is_surrogate: p.is_surrogate,
        })
        .collect();
    scores.sort_by(|a, b| b.total.cmp(&a.total));
    scores
}

fn merge(into: &mut RoundDeltas, from: RoundDeltas) {
    for (id, delta) in from {
        let entry = into.entry(id).or_default();
        entry.non_impostor += delta.non_impostor;
        entry.impostor += delta.impostor;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::voting::resolve_votes;
    use crate::types::{ScoreTotals, Vote};

    fn roster(ids: &[&str], impostor: &str) -> Vec<Participant> {
        ids.iter()
            .map(|id| {
                let mut participant = Participant::human(id, id, ScoreTotals::default());
                participant.is_impostor = *id == impostor;
                participant
            })
            .collect()
    }

    fn cast(pairs: &[(&str, &str)]) -> Vec<Vote> {
        pairs
            .iter()
            .map(|(voter, suspect)| Vote {
                voter_id: voter.to_string(),
                suspect_id: suspect.to_string(),
                round: 0,
            })
            .collect()
    }

    #[test]
    fn catch_and_correct_guess_stack() {
        let mut players = roster(&["p1", "p2", "p3", "p4"], "p2");
        let resolution = resolve_votes(
            &players,
            &cast(&[("p1", "p2"), ("p3", "p2"), ("p4", "p1"), ("p2", "p4")]),
            0,
        );
        let deltas = score_deltas(&players, &resolution);
        apply_deltas(&mut players, &deltas);

        let score = |id: &str| {
            players
                .iter()
                .find(|p| p.id == id)
                .map(|p| (p.score, p.latest_round_score))
                .expect("present")
        };
        let both = CATCH_POINTS + CORRECT_GUESS_POINTS;
        assert_eq!(score("p1").0.non_impostor, both);
        assert_eq!(score("p1").1, both);
        assert_eq!(score("p3").0.non_impostor, both);
        assert_eq!(score("p4").0.non_impostor, CATCH_POINTS);
        assert_eq!(score("p2").0, ScoreTotals::default());
    }

    #[test]
    fn missed_crowd_still_pays_correct_guessers() {
        let players = roster(&["p1", "p2", "p3"], "p3");
        let resolution = resolve_votes(&players, &cast(&[("p1", "p3"), ("p2", "p1")]), 0);
        assert!(!resolution.impostor_caught);
        let deltas = score_deltas(&players, &resolution);
        assert_eq!(deltas.len(), 1);
        assert_eq!(deltas["p1"].non_impostor, CORRECT_GUESS_POINTS);
    }

    #[test]
    fn survive_bonus_only_when_two_remain() {
        let players = roster(&["p1", "p2"], "p2");
        let resolution = resolve_votes(&players, &[], 0);
        let deltas = score_deltas(&players, &resolution);
        assert_eq!(deltas["p2"].impostor, SURVIVE_POINTS);

        let players = roster(&["p1", "p2", "p3"], "p2");
        let resolution = resolve_votes(&players, &[], 0);
        assert!(score_deltas(&players, &resolution).is_empty());
    }

    #[test]
    fn final_scores_sort_by_total() {
        let mut players = roster(&["low", "high"], "");
        players[1].score = ScoreTotals {
            non_impostor: 2,
            impostor: 5,
        };
        let scores = final_scores(&players);
        assert_eq!(scores[0].participant_id, "high");
        assert_eq!(scores[0].total, 7);
    }
}
