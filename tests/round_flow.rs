use other_word::constants::{
    CATCH_POINTS, CORRECT_GUESS_POINTS, SURROGATE_ID_PREFIX, TICK_MS,
};
use other_word::engine::GameEngine;
use other_word::score_store::{JsonScoreStore, MemoryScoreStore, ScoreStore};
use other_word::types::{Action, GameConfig, ScoreTotals, Stage, Team};
use other_word::ActionError;

fn engine_with(seed: u32, humans: &[&str], config: GameConfig) -> GameEngine {
    engine_with_store(seed, humans, config, Box::new(MemoryScoreStore::new()))
}

fn engine_with_store(
    seed: u32,
    humans: &[&str],
    config: GameConfig,
    store: Box<dyn ScoreStore>,
) -> GameEngine {
    let mut engine = GameEngine::new(seed, config, store);
    for id in humans {
        engine.participant_joined(id, id).expect("join accepted");
    }
    engine
}

fn ready_all(engine: &mut GameEngine, humans: &[&str]) {
    for id in humans {
        engine
            .apply(id, Action::SetReadyToStart)
            .expect("ready accepted");
    }
}

fn tick_until(engine: &mut GameEngine, stage: Stage) {
    for _ in 0..20_000 {
        if engine.state().stage() == Some(stage) {
            return;
        }
        engine.step(TICK_MS);
    }
    panic!("stage {stage:?} never reached");
}

fn impostor_id(engine: &GameEngine) -> String {
    engine
        .state()
        .impostor()
        .map(|p| p.id.clone())
        .expect("one impostor")
}

fn assert_consistent(engine: &GameEngine) {
    let state = engine.state();
    let Some(turn) = state.current_turn.as_ref() else {
        return;
    };
    assert_eq!(state.participants.iter().filter(|p| p.is_impostor).count(), 1);
    assert!(turn.completed_describers.len() <= turn.description_order.len());
    for id in &turn.completed_describers {
        assert!(turn.description_order.contains(id));
    }
    let all_completed = turn.completed_describers.len() == turn.description_order.len();
    if turn.stage == Stage::Voting {
        assert!(all_completed);
    }
    if turn.stage == Stage::Describing {
        assert!(!all_completed);
    }
    let mut voters: Vec<&str> = state
        .votes
        .iter()
        .filter(|vote| vote.round == state.round)
        .map(|vote| vote.voter_id.as_str())
        .collect();
    let before = voters.len();
    voters.sort_unstable();
    voters.dedup();
    assert_eq!(before, voters.len());
}

#[test]
fn describers_finish_in_order_before_voting_opens() {
    let humans = ["p1", "p2", "p3", "p4"];
    for seed in [1, 7, 42, 900] {
        let mut engine = engine_with(seed, &humans, GameConfig::default());
        ready_all(&mut engine, &humans);
        tick_until(&mut engine, Stage::Describing);

        let order = engine
            .state()
            .current_turn
            .as_ref()
            .map(|turn| turn.description_order.clone())
            .expect("turn");
        assert_eq!(order.len(), 4);

        for (finished, id) in order.iter().enumerate() {
            assert_consistent(&engine);
            let turn = engine.state().current_turn.as_ref().expect("turn");
            assert_eq!(turn.stage, Stage::Describing);
            assert_eq!(turn.completed_describers.len(), finished);
            assert_eq!(turn.current_describer_id.as_ref(), Some(id));
            engine
                .apply(id, Action::FinishDescribing)
                .expect("describer finishes");
        }

        let turn = engine.state().current_turn.as_ref().expect("turn");
        assert_eq!(turn.stage, Stage::Voting);
        assert_eq!(turn.completed_describers, order);
        assert_consistent(&engine);
    }
}

#[test]
fn majority_on_impostor_ends_game_with_stacked_bonuses() {
    let humans = ["p1", "p2", "p3", "p4"];
    let mut engine = engine_with(5, &humans, GameConfig::default());
    ready_all(&mut engine, &humans);
    tick_until(&mut engine, Stage::Voting);

    let impostor = impostor_id(&engine);
    let innocents: Vec<&str> = humans
        .iter()
        .copied()
        .filter(|id| *id != impostor)
        .collect();
    let round = engine.state().round;
    let vote = |engine: &mut GameEngine, voter: &str, suspect: &str| {
        engine
            .apply(
                voter,
                Action::SubmitVote {
                    suspect_id: suspect.to_string(),
                    round,
                },
            )
            .expect("vote accepted");
    };
    vote(&mut engine, innocents[0], &impostor);
    vote(&mut engine, innocents[1], &impostor);
    vote(&mut engine, innocents[2], innocents[0]);
    vote(&mut engine, &impostor, innocents[2]);

    let state = engine.state();
    let turn = state.current_turn.as_ref().expect("turn");
    assert_eq!(turn.stage, Stage::Result);
    assert!(turn.impostor_caught);
    assert!(state.game_over);
    assert_eq!(state.winning_team, Some(Team::NonImpostors));

    let score = |id: &str| state.participant(id).expect("present").score;
    assert_eq!(
        score(innocents[0]).non_impostor,
        CATCH_POINTS + CORRECT_GUESS_POINTS
    );
    assert_eq!(
        score(innocents[1]).non_impostor,
        CATCH_POINTS + CORRECT_GUESS_POINTS
    );
    assert_eq!(score(innocents[2]).non_impostor, CATCH_POINTS);
    assert_eq!(score(&impostor), ScoreTotals::default());

    let summary = engine.build_summary().expect("summary");
    assert_eq!(summary.final_scores[0].total, CATCH_POINTS + CORRECT_GUESS_POINTS);
}

#[test]
fn current_describer_leaving_hands_turn_to_next() {
    let humans = ["p1", "p2", "p3", "p4", "p5"];
    let mut engine = engine_with(11, &humans, GameConfig::default());
    ready_all(&mut engine, &humans);
    tick_until(&mut engine, Stage::Describing);

    let impostor = impostor_id(&engine);
    loop {
        let current = engine
            .state()
            .current_turn
            .as_ref()
            .and_then(|turn| turn.current_describer_id.clone())
            .expect("someone describing");
        if current != impostor {
            break;
        }
        engine
            .apply(&current, Action::FinishDescribing)
            .expect("impostor finishes");
    }

    let (departed, expected_next) = {
        let turn = engine.state().current_turn.as_ref().expect("turn");
        (
            turn.current_describer_id.clone().expect("current"),
            turn.next_describer_id.clone(),
        )
    };
    let now = engine.now_ms();
    assert!(engine.participant_left(&departed));

    let state = engine.state();
    let turn = state.current_turn.as_ref().expect("turn");
    assert!(!turn.description_order.contains(&departed));
    assert!(!state.game_over);
    match expected_next {
        Some(next) => {
            assert_eq!(turn.stage, Stage::Describing);
            assert_eq!(turn.current_describer_id, Some(next));
            assert_eq!(turn.timer_started_at_ms, now);
        }
        None => assert_eq!(turn.stage, Stage::Voting),
    }
    assert_eq!(turn.remaining_participants, 4);
    assert_consistent(&engine);
}

#[test]
fn surrogates_fill_short_roster_before_start() {
    for humans in [&["solo"][..], &["a", "b"][..]] {
        let config = GameConfig {
            surrogates_enabled: true,
            ..GameConfig::default()
        };
        let mut engine = engine_with(3, humans, config);
        ready_all(&mut engine, humans);

        let state = engine.state();
        assert!(state.game_started);
        let surrogates: Vec<_> = state
            .participants
            .iter()
            .filter(|p| p.is_surrogate)
            .collect();
        assert_eq!(surrogates.len(), 3 - humans.len());
        assert!(surrogates
            .iter()
            .all(|p| p.id.starts_with(SURROGATE_ID_PREFIX) && p.ready_to_start));

        let seat = surrogates[0].id.clone();
        assert_eq!(
            engine.apply(&seat, Action::FinishDescribing),
            Err(ActionError::SurrogateSeat(seat.clone()))
        );
    }
}

#[test]
fn short_roster_without_surrogates_does_not_start() {
    let mut engine = engine_with(3, &["a", "b"], GameConfig::default());
    ready_all(&mut engine, &["a", "b"]);
    assert!(!engine.state().game_started);
    engine.participant_joined("c", "c").expect("join");
    engine.apply("c", Action::SetReadyToStart).expect("ready");
    assert!(engine.state().game_started);
}

#[test]
fn solo_game_with_surrogates_plays_to_completion() {
    for seed in 0..20 {
        let config = GameConfig {
            surrogates_enabled: true,
            auto_advance_results: true,
            ..GameConfig::default()
        };
        let mut engine = engine_with(seed, &["solo"], config);
        ready_all(&mut engine, &["solo"]);
        for _ in 0..20_000 {
            if engine.is_ended() {
                break;
            }
            engine.step(TICK_MS);
            assert_consistent(&engine);
        }
        assert!(engine.is_ended(), "seed {seed} did not finish");
        assert!(engine.build_summary().is_some());
    }
}

#[test]
fn same_seed_same_inputs_same_snapshots() {
    let run = |seed: u32| {
        let config = GameConfig {
            surrogates_enabled: true,
            auto_advance_results: true,
            ..GameConfig::default()
        };
        let mut engine = engine_with(seed, &["a", "b"], config);
        ready_all(&mut engine, &["a", "b"]);
        let mut frames = Vec::new();
        for _ in 0..3_000 {
            engine.step(TICK_MS);
            frames.push(serde_json::to_string(&engine.build_snapshot()).expect("serializes"));
            if engine.is_ended() {
                break;
            }
        }
        frames
    };
    for seed in [0, 1, 99] {
        assert_eq!(run(seed), run(seed));
    }
    assert_ne!(run(1), run(2));
}

#[test]
fn round_seed_is_published_and_words_are_assigned() {
    let humans = ["p1", "p2", "p3"];
    let mut engine = engine_with(77, &humans, GameConfig::default());
    ready_all(&mut engine, &humans);
    let state = engine.state();
    let context = state.round_context.as_ref().expect("context");
    assert_eq!(context.seed, other_word::rng::round_seed(77, 0));
    assert_ne!(context.current_word, context.impostor_word);
    for participant in &state.participants {
        let expected = if participant.is_impostor {
            &context.impostor_word
        } else {
            &context.current_word
        };
        assert_eq!(&participant.secret_word, expected);
    }
}

#[test]
fn redacted_snapshot_hides_other_words_until_result() {
    let humans = ["p1", "p2", "p3"];
    let mut engine = engine_with(8, &humans, GameConfig::default());
    ready_all(&mut engine, &humans);

    let view = engine.build_snapshot().redacted_for("p1");
    for participant in &view.participants {
        if participant.id == "p1" {
            assert!(!participant.secret_word.is_empty());
        } else {
            assert!(participant.secret_word.is_empty());
            assert!(!participant.is_impostor);
        }
    }
    let context = view.round_context.expect("context");
    assert!(context.current_word.is_empty());

    tick_until(&mut engine, Stage::Result);
    let view = engine.build_snapshot().redacted_for("p1");
    assert_eq!(view.participants.iter().filter(|p| p.is_impostor).count(), 1);
}

#[test]
fn scores_persist_across_sessions() {
    let dir = tempfile::tempdir().expect("temp dir");
    let path = dir.path().join("scores.json");
    let humans = ["p1", "p2", "p3"];

    let mut engine = engine_with_store(
        21,
        &humans,
        GameConfig::default(),
        Box::new(JsonScoreStore::new(path.clone())),
    );
    ready_all(&mut engine, &humans);
    tick_until(&mut engine, Stage::Voting);
    let impostor = impostor_id(&engine);
    let round = engine.state().round;
    for id in humans.iter().filter(|id| **id != impostor) {
        engine
            .apply(
                id,
                Action::SubmitVote {
                    suspect_id: impostor.clone(),
                    round,
                },
            )
            .expect("vote");
    }
    engine.step(engine.state().config.voting_ms);
    assert!(engine.is_ended());
    let expected: Vec<(String, ScoreTotals)> = humans
        .iter()
        .map(|id| {
            let p = engine.state().participant(id).expect("present");
            (p.id.clone(), p.score)
        })
        .collect();
    drop(engine);

    let mut next = GameEngine::new(22, GameConfig::default(), Box::new(JsonScoreStore::new(path)));
    for (id, score) in expected {
        next.participant_joined(&id, &id).expect("join");
        assert_eq!(next.state().participant(&id).expect("present").score, score);
    }
}

#[test]
fn actions_from_unknown_or_wrong_callers_leave_state_untouched() {
    let humans = ["p1", "p2", "p3"];
    let mut engine = engine_with(4, &humans, GameConfig::default());
    ready_all(&mut engine, &humans);
    let before = serde_json::to_string(&engine.build_snapshot()).expect("serializes");

    assert!(engine.apply("nobody", Action::NextRound).is_err());
    assert!(engine.apply("p1", Action::NextRound).is_err());
    assert!(engine.apply("p1", Action::ToggleAutoAdvance).is_err());
    assert!(engine
        .apply(
            "p1",
            Action::SubmitVote {
                suspect_id: "p2".to_string(),
                round: 0
            }
        )
        .is_err());

    let after = serde_json::to_string(&engine.build_snapshot()).expect("serializes");
    assert_eq!(before, after);
}
