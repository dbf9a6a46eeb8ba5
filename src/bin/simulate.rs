use chrono::Utc;
use clap::Parser;
use other_word::constants::{MAX_PARTICIPANTS, TICK_MS};
use other_word::engine::{rotation, GameEngine, GameState};
use other_word::rng::Rng;
use other_word::score_store::MemoryScoreStore;
use other_word::types::{Action, GameConfig, GameOverReason, Stage, Team};
use serde::Serialize;
use serde_json::{json, Value};
use std::collections::{BTreeMap, HashMap, HashSet};
use std::io;
use std::path::{Path, PathBuf};

const TICK_SAFETY_LIMIT: usize = 10 * 60 * 30;

#[derive(Parser, Debug)]
#[command(author, version, about)]
struct Cli {
    /// Number of games to play back to back.
    #[arg(long, default_value_t = 5)]
    games: usize,
    /// Scripted human seats per game; surrogates fill the rest up to three.
    #[arg(long, default_value_t = 1)]
    humans: usize,
    #[arg(long)]
    seed: Option<u64>,
    #[arg(long)]
    no_surrogates: bool,
    /// Chance per tick that a scripted human voluntarily leaves mid-game.
    #[arg(long, default_value_t = 0.0)]
    leave_chance: f32,
    #[arg(long)]
    match_id: Option<String>,
    #[arg(long)]
    summary_out: Option<PathBuf>,
}

#[derive(Clone, Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct Scenario {
    name: String,
    humans: usize,
    surrogates_enabled: bool,
    leave_chance: f32,
    seed: u32,
}

#[derive(Clone, Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct GameResultLine {
    scenario: String,
    seed: u32,
    humans: usize,
    reason: Option<GameOverReason>,
    winning_team: Option<Team>,
    rounds_played: u32,
    duration_ms: u64,
    votes_cast: usize,
    early_finishes: usize,
    reactions_sent: usize,
    departures: usize,
    anomalies: Vec<String>,
}

#[derive(Clone, Debug, Serialize)]
struct AnomalyRecord {
    tick: u64,
    message: String,
}

#[derive(Clone, Debug)]
struct GameRunResult {
    result: GameResultLine,
    anomaly_records: Vec<AnomalyRecord>,
    finished_tick: u64,
}

#[derive(Clone, Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct RunSummary {
    match_id: String,
    started_at_ms: i64,
    finished_at_ms: i64,
    game_count: usize,
    anomaly_count: usize,
    average_duration_ms: u64,
    reason_counts: BTreeMap<String, usize>,
    games: Vec<GameResultLine>,
}

#[derive(Clone, Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct StructuredLogLine {
    timestamp_ms: i64,
    level: String,
    event: String,
    match_id: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    scenario: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    seed: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    tick: Option<u64>,
    details: Value,
}

fn main() {
    let cli = Cli::parse();
    let scenarios = resolve_scenarios(&cli);
    let run_started_at_ms = Utc::now().timestamp_millis();
    let seed_hint = scenarios.first().map(|scenario| scenario.seed).unwrap_or(0);
    let match_id = cli
        .match_id
        .clone()
        .unwrap_or_else(|| default_match_id(seed_hint, run_started_at_ms));
    let mut has_anomaly = false;
    let mut results = Vec::new();
    let mut reason_counts: BTreeMap<String, usize> = BTreeMap::new();
    let mut total_duration_ms = 0u64;
    let mut total_anomalies = 0usize;

    for scenario in scenarios {
        emit_log(
            "info",
            "game_started",
            &match_id,
            Some(&scenario.name),
            Some(scenario.seed),
            None,
            json!({
                "humans": scenario.humans,
                "surrogatesEnabled": scenario.surrogates_enabled,
                "leaveChance": scenario.leave_chance,
            }),
        );
        let run = run_game(&scenario);

        for anomaly in &run.anomaly_records {
            emit_log(
                "warn",
                "anomaly_detected",
                &match_id,
                Some(&scenario.name),
                Some(scenario.seed),
                Some(anomaly.tick),
                json!({ "message": anomaly.message }),
            );
        }

        if !run.result.anomalies.is_empty() {
            has_anomaly = true;
        }
        total_anomalies += run.anomaly_records.len();
        total_duration_ms += run.result.duration_ms;
        *reason_counts
            .entry(reason_key(run.result.reason))
            .or_insert(0) += 1;

        emit_log(
            "info",
            "game_finished",
            &match_id,
            Some(&scenario.name),
            Some(scenario.seed),
            Some(run.finished_tick),
            json!({
                "reason": run.result.reason,
                "winningTeam": run.result.winning_team,
                "roundsPlayed": run.result.rounds_played,
                "anomalyCount": run.anomaly_records.len(),
            }),
        );

        match serde_json::to_string(&run.result) {
            Ok(line) => println!("{line}"),
            Err(error) => eprintln!("failed to serialize game result: {error}"),
        }
        results.push(run.result);
    }

    let summary = build_run_summary(
        match_id.clone(),
        run_started_at_ms,
        Utc::now().timestamp_millis(),
        results,
        reason_counts,
        total_anomalies,
        total_duration_ms,
    );

    let mut summary_out_written: Option<String> = None;
    if let Some(path) = cli.summary_out.as_ref() {
        if let Err(error) = write_summary(path, &summary) {
            emit_log(
                "error",
                "summary_write_failed",
                &match_id,
                None,
                None,
                None,
                json!({
                    "path": path.to_string_lossy(),
                    "error": error.to_string(),
                }),
            );
            std::process::exit(2);
        }
        summary_out_written = Some(path.to_string_lossy().to_string());
    }

    emit_log(
        "info",
        "run_finished",
        &match_id,
        None,
        None,
        None,
        json!({
            "gameCount": summary.game_count,
            "anomalyCount": summary.anomaly_count,
            "averageDurationMs": summary.average_duration_ms,
            "reasonCounts": summary.reason_counts,
            "summaryOut": summary_out_written,
        }),
    );

    if has_anomaly {
        std::process::exit(1);
    }
}

struct Counters {
    votes_cast: usize,
    early_finishes: usize,
    reactions_sent: usize,
    departures: usize,
}

fn run_game(scenario: &Scenario) -> GameRunResult {
    let config = GameConfig {
        surrogates_enabled: scenario.surrogates_enabled,
        auto_advance_results: true,
        ..GameConfig::default()
    };
    let mut engine = GameEngine::new(scenario.seed, config, Box::new(MemoryScoreStore::new()));
    let mut sim_rng = Rng::new(scenario.seed ^ 0x5eed_cafe);
    let humans: Vec<String> = (1..=scenario.humans).map(|idx| format!("sim_{idx}")).collect();
    for id in &humans {
        if let Err(error) = engine.participant_joined(id, &format!("Sim-{id}")) {
            return aborted(scenario, format!("join failed for {id}: {error}"));
        }
    }
    for id in &humans {
        let _ = engine.apply(id, Action::SetReadyToStart);
    }
    if !engine.state().game_started {
        return aborted(scenario, "game did not start".to_string());
    }

    let mut counters = Counters {
        votes_cast: 0,
        early_finishes: 0,
        reactions_sent: 0,
        departures: 0,
    };
    let mut anomalies = Vec::new();
    let mut anomaly_records = Vec::new();
    let mut anomaly_seen = HashSet::new();
    let mut best_scores: HashMap<String, u32> = HashMap::new();
    let mut tick = 0u64;

    while !engine.is_ended() && engine.state().game_started {
        drive_humans(&mut engine, &mut sim_rng, scenario, &mut counters);
        engine.step(TICK_MS);
        tick += 1;

        for message in collect_state_anomalies(engine.state(), &mut best_scores) {
            push_anomaly(
                &mut anomalies,
                &mut anomaly_records,
                &mut anomaly_seen,
                tick,
                message,
            );
        }
        if tick as usize > TICK_SAFETY_LIMIT {
            push_anomaly(
                &mut anomalies,
                &mut anomaly_records,
                &mut anomaly_seen,
                tick,
                "tick safety limit exceeded".to_string(),
            );
            break;
        }
    }

    let summary = engine.build_summary();
    let state = engine.state();
    GameRunResult {
        result: GameResultLine {
            scenario: scenario.name.clone(),
            seed: scenario.seed,
            humans: scenario.humans,
            reason: summary.as_ref().map(|s| s.reason),
            winning_team: summary.as_ref().and_then(|s| s.winning_team),
            rounds_played: summary
                .as_ref()
                .map(|s| s.rounds_played)
                .unwrap_or(state.round + 1),
            duration_ms: engine.now_ms(),
            votes_cast: counters.votes_cast,
            early_finishes: counters.early_finishes,
            reactions_sent: counters.reactions_sent,
            departures: counters.departures,
            anomalies,
        },
        anomaly_records,
        finished_tick: tick,
    }
}

fn aborted(scenario: &Scenario, message: String) -> GameRunResult {
    GameRunResult {
        result: GameResultLine {
            scenario: scenario.name.clone(),
            seed: scenario.seed,
            humans: scenario.humans,
            reason: None,
            winning_team: None,
            rounds_played: 0,
            duration_ms: 0,
            votes_cast: 0,
            early_finishes: 0,
            reactions_sent: 0,
            departures: 0,
            anomalies: vec![message.clone()],
        },
        anomaly_records: vec![AnomalyRecord { tick: 0, message }],
        finished_tick: 0,
    }
}

fn current_describer(state: &GameState) -> Option<String> {
    state
        .current_turn
        .as_ref()
        .and_then(|turn| turn.current_describer_id.clone())
}

/// Scripted humans: describers usually finish early, voters vote at a random
/// moment, bystanders react now and then.
fn drive_humans(engine: &mut GameEngine, rng: &mut Rng, scenario: &Scenario, counters: &mut Counters) {
    let human_ids: Vec<String> = engine
        .state()
        .participants
        .iter()
        .filter(|p| !p.is_surrogate)
        .map(|p| p.id.clone())
        .collect();

    for id in human_ids {
        if engine.is_ended() || !engine.state().game_started {
            return;
        }
        if scenario.leave_chance > 0.0 && rng.bool(scenario.leave_chance) {
            if engine.participant_left(&id) {
                counters.departures += 1;
            }
            continue;
        }
        let state = engine.state();
        match state.stage() {
            Some(Stage::Describing) if current_describer(state).as_deref() == Some(id.as_str()) => {
                if rng.bool(0.05) && engine.apply(&id, Action::FinishDescribing).is_ok() {
                    counters.early_finishes += 1;
                }
            }
            Some(Stage::Voting) => {
                let already = state.participant(&id).is_some_and(|p| p.voted);
                if !already && rng.bool(0.08) {
                    let others: Vec<String> = state
                        .participants
                        .iter()
                        .filter(|p| p.id != id)
                        .map(|p| p.id.clone())
                        .collect();
                    if let Some(suspect) = rng.pick(&others).cloned() {
                        let round = state.round;
                        if engine
                            .apply(&id, Action::SubmitVote { suspect_id: suspect, round })
                            .is_ok()
                        {
                            counters.votes_cast += 1;
                        }
                    }
                }
            }
            _ => {}
        }
        if rng.bool(0.02) {
            let emoji = ["😂", "🤔", "👀", "🔥"][rng.pick_index(4)];
            if engine
                .apply(&id, Action::SendReaction { emoji: emoji.to_string() })
                .is_ok()
            {
                counters.reactions_sent += 1;
            }
        }
    }
}

fn collect_state_anomalies(state: &GameState, best_scores: &mut HashMap<String, u32>) -> Vec<String> {
    let mut anomalies = Vec::new();
    if state.participants.len() > MAX_PARTICIPANTS {
        anomalies.push(format!("roster too large: {}", state.participants.len()));
    }

    if let Some(turn) = state.current_turn.as_ref() {
        let impostors = state.participants.iter().filter(|p| p.is_impostor).count();
        if impostors > 1 {
            anomalies.push(format!("more than one impostor: {impostors}"));
        }

        let describers: Vec<&str> = state
            .participants
            .iter()
            .filter(|p| p.describing)
            .map(|p| p.id.as_str())
            .collect();
        if describers.len() > 1 {
            anomalies.push(format!("multiple describers: {describers:?}"));
        }
        if turn.stage == Stage::Describing
            && !state.game_over
            && describers.first().copied() != turn.current_describer_id.as_deref()
        {
            anomalies.push("describing flag out of sync with current describer".to_string());
        }
        if turn.stage != Stage::Describing && !describers.is_empty() {
            anomalies.push(format!("describer flagged during {:?}", turn.stage));
        }

        for id in &turn.completed_describers {
            if !turn.description_order.contains(id) {
                anomalies.push(format!("completed describer not in order: {id}"));
            }
        }
        if turn.stage == Stage::Voting && !rotation::is_complete(turn) {
            anomalies.push("voting entered before every describer finished".to_string());
        }
    }

    let mut voters = HashSet::new();
    for vote in state.votes.iter().filter(|vote| vote.round == state.round) {
        if !voters.insert(vote.voter_id.as_str()) {
            anomalies.push(format!("duplicate vote from {}", vote.voter_id));
        }
    }

    if state.round >= state.config.num_rounds {
        anomalies.push(format!("round {} beyond configured rounds", state.round));
    }

    for participant in &state.participants {
        let total = participant.score.total();
        let best = best_scores.entry(participant.id.clone()).or_insert(0);
        if total < *best {
            anomalies.push(format!("score decreased for {}", participant.id));
        }
        *best = (*best).max(total);
    }
    anomalies
}

fn resolve_scenarios(cli: &Cli) -> Vec<Scenario> {
    let seed = normalize_seed(
        cli.seed
            .unwrap_or_else(|| Utc::now().timestamp_millis().unsigned_abs()),
    );
    let humans = cli.humans.clamp(1, MAX_PARTICIPANTS);
    let leave_chance = cli.leave_chance.clamp(0.0, 1.0);
    (0..cli.games.max(1))
        .map(|index| Scenario {
            name: format!("game-{}-h{humans}", index + 1),
            humans,
            surrogates_enabled: !cli.no_surrogates,
            leave_chance,
            seed: seed.wrapping_add(index as u32),
        })
        .collect()
}

fn normalize_seed(seed: u64) -> u32 {
    seed as u32
}

fn push_anomaly(
    anomalies: &mut Vec<String>,
    anomaly_records: &mut Vec<AnomalyRecord>,
    anomaly_seen: &mut HashSet<String>,
    tick: u64,
    message: String,
) {
    anomaly_records.push(AnomalyRecord {
        tick,
        message: message.clone(),
    });
    if anomaly_seen.insert(message.clone()) {
        anomalies.push(message);
    }
}

fn default_match_id(seed: u32, timestamp_ms: i64) -> String {
    format!("sim-{seed}-{timestamp_ms}")
}

fn build_run_summary(
    match_id: String,
    started_at_ms: i64,
    finished_at_ms: i64,
    games: Vec<GameResultLine>,
    reason_counts: BTreeMap<String, usize>,
    anomaly_count: usize,
    total_duration_ms: u64,
) -> RunSummary {
    let game_count = games.len();
    let average_duration_ms = if game_count == 0 {
        0
    } else {
        total_duration_ms / game_count as u64
    };
    RunSummary {
        match_id,
        started_at_ms,
        finished_at_ms,
        game_count,
        anomaly_count,
        average_duration_ms,
        reason_counts,
        games,
    }
}

fn emit_log(
    level: &str,
    event: &str,
    match_id: &str,
    scenario: Option<&str>,
    seed: Option<u32>,
    tick: Option<u64>,
    details: Value,
) {
    let log_line = StructuredLogLine {
        timestamp_ms: Utc::now().timestamp_millis(),
        level: level.to_string(),
        event: event.to_string(),
        match_id: match_id.to_string(),
        scenario: scenario.map(|value| value.to_string()),
        seed,
        tick,
        details,
    };
    match serde_json::to_string(&log_line) {
        Ok(line) => eprintln!("{line}"),
        Err(error) => eprintln!("failed to serialize log line: {error}"),
    }
}

fn reason_key(reason: Option<GameOverReason>) -> String {
    match reason {
        Some(GameOverReason::ImpostorCaught) => "impostor_caught",
        Some(GameOverReason::ImpostorSurvived) => "impostor_survived",
        Some(GameOverReason::RoundsExhausted) => "rounds_exhausted",
        Some(GameOverReason::ImpostorLeft) => "impostor_left",
        Some(GameOverReason::RosterCollapse) => "roster_collapse",
        None => "reset_to_lobby",
    }
    .to_string()
}

fn write_summary(path: &Path, summary: &RunSummary) -> io::Result<()> {
    let summary_text = serde_json::to_string_pretty(summary).map_err(io::Error::other)?;
    std::fs::write(path, summary_text)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn make_result(reason: Option<GameOverReason>, duration_ms: u64) -> GameResultLine {
        GameResultLine {
            scenario: "test".to_string(),
            seed: 42,
            humans: 1,
            reason,
            winning_team: None,
            rounds_played: 1,
            duration_ms,
            votes_cast: 0,
            early_finishes: 0,
            reactions_sent: 0,
            departures: 0,
            anomalies: Vec::new(),
        }
    }

    fn scenario(humans: usize, leave_chance: f32, seed: u32) -> Scenario {
        Scenario {
            name: "test".to_string(),
            humans,
            surrogates_enabled: true,
            leave_chance,
            seed,
        }
    }

    #[test]
    fn default_match_id_contains_seed_and_timestamp() {
        assert_eq!(default_match_id(42, 123456789), "sim-42-123456789");
    }

    #[test]
    fn build_run_summary_calculates_average_duration() {
        let summary = build_run_summary(
            "sim-42-1".to_string(),
            1,
            2,
            vec![
                make_result(Some(GameOverReason::ImpostorCaught), 60_000),
                make_result(Some(GameOverReason::RoundsExhausted), 90_000),
            ],
            BTreeMap::from([
                ("impostor_caught".to_string(), 1usize),
                ("rounds_exhausted".to_string(), 1usize),
            ]),
            1,
            150_000,
        );
        assert_eq!(summary.average_duration_ms, 75_000);
        assert_eq!(summary.game_count, 2);
    }

    #[test]
    fn write_summary_returns_error_when_parent_does_not_exist() {
        let dir = tempfile::tempdir().expect("temp dir");
        let target = dir.path().join("missing").join("summary.json");
        let summary = build_run_summary(
            "sim-1-1".to_string(),
            1,
            2,
            vec![make_result(None, 0)],
            BTreeMap::new(),
            0,
            0,
        );
        assert!(write_summary(&target, &summary).is_err());
    }

    #[test]
    fn push_anomaly_keeps_records_and_deduplicates_summary_messages() {
        let mut anomalies = Vec::new();
        let mut records = Vec::new();
        let mut seen = HashSet::new();
        push_anomaly(&mut anomalies, &mut records, &mut seen, 10, "same".to_string());
        push_anomaly(&mut anomalies, &mut records, &mut seen, 11, "same".to_string());
        assert_eq!(anomalies.len(), 1);
        assert_eq!(records.len(), 2);
    }

    #[test]
    fn solo_games_finish_without_anomalies() {
        for seed in 0..10 {
            let run = run_game(&scenario(1, 0.0, seed));
            assert!(run.result.anomalies.is_empty(), "{:?}", run.result.anomalies);
            assert!(run.result.reason.is_some());
        }
    }

    #[test]
    fn games_with_departures_stay_consistent() {
        for seed in 0..10 {
            let run = run_game(&scenario(4, 0.002, seed));
            assert!(run.result.anomalies.is_empty(), "{:?}", run.result.anomalies);
        }
    }
}
