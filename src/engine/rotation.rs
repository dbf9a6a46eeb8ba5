//! Description-turn bookkeeping. Pure functions over a [`CurrentTurn`] and the
//! roster; the lifecycle decides what a step means for the stage and timer.

use crate::types::{CurrentTurn, Participant, ParticipantId};

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum RotationStep {
    Next(ParticipantId),
    Done,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum PruneOutcome {
    NotListed,
    Repaired,
    /// The departed id was the active describer; the rotation moved on.
    CurrentReplaced(RotationStep),
}

/// Starts the describing pass at the first id in the order.
pub fn begin(turn: &mut CurrentTurn, participants: &mut [Participant]) -> RotationStep {
    turn.completed_describers.clear();
    turn.previous_describer_id = None;
    turn.current_describer_id = None;
    let first = next_eligible(&turn.description_order, &turn.completed_describers, 0, None);
    activate(turn, participants, first)
}

/// Marks the current describer complete and moves to the next id in order
/// that has not yet described, wrapping only when nothing remains ahead.
pub fn advance(turn: &mut CurrentTurn, participants: &mut [Participant]) -> RotationStep {
    let Some(current) = turn.current_describer_id.take() else {
        let first = next_eligible(&turn.description_order, &turn.completed_describers, 0, None);
        return activate(turn, participants, first);
    };
    if turn.description_order.contains(&current) && !turn.completed_describers.contains(&current)
    {
        turn.completed_describers.push(current.clone());
    }
    let start = position(&turn.description_order, &current).map_or(0, |index| index + 1);
    let next = next_eligible(&turn.description_order, &turn.completed_describers, start, None);
    turn.previous_describer_id = Some(current);
    activate(turn, participants, next)
}

/// Removes a departed id from the order and completed set. When it was the
/// active describer, the rotation continues from the slot it occupied.
pub fn prune(
    turn: &mut CurrentTurn,
    participants: &mut [Participant],
    departed: &str,
) -> PruneOutcome {
    let Some(index) = position(&turn.description_order, departed) else {
        return PruneOutcome::NotListed;
    };
    turn.description_order.remove(index);
    turn.completed_describers.retain(|id| id != departed);
    if turn.previous_describer_id.as_deref() == Some(departed) {
        turn.previous_describer_id = None;
    }

    if turn.current_describer_id.as_deref() != Some(departed) {
        refresh_next(turn);
        return PruneOutcome::Repaired;
    }
    turn.current_describer_id = None;
    let next = next_eligible(&turn.description_order, &turn.completed_describers, index, None);
    PruneOutcome::CurrentReplaced(activate(turn, participants, next))
}

pub fn is_complete(turn: &CurrentTurn) -> bool {
    turn.description_order
        .iter()
        .all(|id| turn.completed_describers.contains(id))
}

/// Keeps exactly one `describing` flag in sync with the current describer.
pub fn set_describing(participants: &mut [Participant], describer: Option<&str>) {
    for participant in participants {
        participant.describing = describer == Some(participant.id.as_str());
    }
}

fn activate(
    turn: &mut CurrentTurn,
    participants: &mut [Participant],
    next: Option<ParticipantId>,
) -> RotationStep {
    turn.current_describer_id = next.clone();
    refresh_next(turn);
    set_describing(participants, next.as_deref());
    match next {
        Some(id) => RotationStep::Next(id),
        None => RotationStep::Done,
    }
}

fn refresh_next(turn: &mut CurrentTurn) {
    turn.next_describer_id = match turn.current_describer_id.as_deref() {
        Some(current) => {
            let start = position(&turn.description_order, current).map_or(0, |index| index + 1);
            next_eligible(
                &turn.description_order,
                &turn.completed_describers,
                start,
                Some(current),
            )
        }
        None => next_eligible(&turn.description_order, &turn.completed_describers, 0, None),
    };
}

fn next_eligible(
    order: &[ParticipantId],
    completed: &[ParticipantId],
    start: usize,
    skip: Option<&str>,
) -> Option<ParticipantId> {
    let len = order.len();
    (0..len)
        .map(|offset| &order[(start + offset) % len])
        .find(|id| !completed.contains(id) && skip != Some(id.as_str()))
        .cloned()
}

fn position(order: &[ParticipantId], id: &str) -> Option<usize> {
    order.iter().position(|entry| entry == id)
}
