use clap::Parser;
use eco_escape_quest::campaign::Campaign;
use eco_escape_quest::photo::judge_image;
use eco_escape_quest::rng::SimRng;
use eco_escape_quest::rooms::energy::{DISTRICTS, ENERGY_SOURCES};
use eco_escape_quest::rooms::policy::{OPTIMAL_POLICIES, POLICIES};
use eco_escape_quest::rooms::shelter::MATERIALS;
use eco_escape_quest::rooms::waste::{FastFashionChoice, WasteKind};
use eco_escape_quest::rooms::water::FILTER_STAGES;
use eco_escape_quest::rooms::{
    EnergyGrid, FilterRig, PolicyChamber, RoomClock, RoomError, ShelterSite, WasteSorter,
};
use eco_escape_quest::scoreboard::AgentScoreboard;
use eco_escape_quest::storage::now_ms;
use eco_escape_quest::types::{Difficulty, RoomCompletion, RoomId, RoomVerdict};
use image::{Rgba, RgbaImage};
use serde::Serialize;
use serde_json::{json, Value};
use std::collections::{BTreeMap, HashSet};
use std::io;
use std::path::{Path, PathBuf};

const MIN_MOVE_SECS: u32 = 4;
const MAX_MOVE_SECS: u32 = 20;
const WIND_SOURCE: &str = "wind";
const CEMENT: &str = "cement";
const SNAPSHOT_SIDE: u32 = 320;

#[derive(Parser, Debug)]
#[command(author, version, about)]
struct Cli {
    #[arg(long, default_value = "SimAgent")]
    agent: String,
    #[arg(long, default_value_t = 1)]
    runs: u32,
    #[arg(long)]
    seed: Option<u64>,
    /// Probability in [0, 1] that the simulated agent makes the right move.
    #[arg(long, default_value_t = 0.8)]
    skill: f32,
    #[arg(long)]
    difficulty: Option<String>,
    /// Lifetime scoreboard file. Without it points are kept in memory only.
    #[arg(long)]
    scoreboard: Option<PathBuf>,
    #[arg(long)]
    run_id: Option<String>,
    #[arg(long)]
    summary_out: Option<PathBuf>,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
enum RoomOutcome {
    Completed,
    Failed,
    TimeUp,
}

#[derive(Clone, Debug, Serialize)]
struct RoomRunLine {
    room: RoomId,
    outcome: RoomOutcome,
    moves: u32,
    #[serde(rename = "elapsedSecs")]
    elapsed_secs: u32,
    #[serde(skip_serializing_if = "Option::is_none")]
    completion: Option<RoomCompletion>,
    #[serde(rename = "photoBonus")]
    photo_bonus: u32,
}

#[derive(Clone, Debug, Serialize)]
struct AnomalyRecord {
    room: Option<RoomId>,
    message: String,
}

#[derive(Clone, Debug, Serialize)]
struct RunResultLine {
    run: u32,
    seed: u32,
    agent: String,
    skill: f32,
    difficulty: Difficulty,
    outcome: String,
    #[serde(rename = "roomsCleared")]
    rooms_cleared: usize,
    #[serde(rename = "sessionPoints")]
    session_points: u64,
    #[serde(rename = "lifetimePoints")]
    lifetime_points: u64,
    rooms: Vec<RoomRunLine>,
    anomalies: Vec<String>,
}

#[derive(Clone, Debug)]
struct RunResult {
    result: RunResultLine,
    anomaly_records: Vec<AnomalyRecord>,
}

#[derive(Clone, Debug, Serialize)]
struct RunSummary {
    #[serde(rename = "runId")]
    run_id: String,
    #[serde(rename = "startedAtMs")]
    started_at_ms: u64,
    #[serde(rename = "finishedAtMs")]
    finished_at_ms: u64,
    #[serde(rename = "runCount")]
    run_count: usize,
    #[serde(rename = "anomalyCount")]
    anomaly_count: usize,
    #[serde(rename = "averageSessionPoints")]
    average_session_points: u64,
    #[serde(rename = "outcomeCounts")]
    outcome_counts: BTreeMap<String, usize>,
    runs: Vec<RunResultLine>,
}

#[derive(Clone, Debug, Serialize)]
struct StructuredLogLine {
    #[serde(rename = "timestampMs")]
    timestamp_ms: u64,
    level: String,
    event: String,
    #[serde(rename = "runId")]
    run_id: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    run: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    seed: Option<u32>,
    details: Value,
}

struct Player {
    rng: SimRng,
    skill: f32,
}

impl Player {
    fn new(seed: u32, skill: f32) -> Self {
        Self {
            rng: SimRng::new(seed),
            skill: skill.clamp(0.0, 1.0),
        }
    }

    fn skilled(&mut self) -> bool {
        self.skill >= 1.0 || self.rng.chance(self.skill)
    }

    fn think_secs(&mut self) -> u32 {
        self.rng.int(MIN_MOVE_SECS, MAX_MOVE_SECS)
    }
}

struct RoomPlay {
    outcome: RoomOutcome,
    moves: u32,
    completion: Option<RoomCompletion>,
    anomalies: Vec<String>,
}

impl RoomPlay {
    fn new() -> Self {
        Self {
            outcome: RoomOutcome::TimeUp,
            moves: 0,
            completion: None,
            anomalies: Vec::new(),
        }
    }

    fn absorb(&mut self, error: RoomError) {
        self.outcome = RoomOutcome::TimeUp;
        if error != RoomError::TimeUp {
            self.anomalies.push(format!("unexpected room error: {error}"));
        }
    }

    fn finish(mut self, completion: Option<RoomCompletion>) -> Self {
        if let Some(completion) = completion {
            self.outcome = RoomOutcome::Completed;
            self.completion = Some(completion);
        }
        self
    }
}

fn main() {
    env_logger::init();
    let cli = Cli::parse();
    let base_seed = resolve_seed(cli.seed);
    let difficulty = cli
        .difficulty
        .as_deref()
        .and_then(Difficulty::parse)
        .unwrap_or(Difficulty::Beginner);
    let run_started_at_ms = now_ms();
    let run_id = cli
        .run_id
        .clone()
        .unwrap_or_else(|| default_run_id(base_seed, run_started_at_ms));
    let mut scoreboard = match cli.scoreboard.as_ref() {
        Some(path) => AgentScoreboard::new(path.clone()),
        None => AgentScoreboard::in_memory(),
    };

    let mut has_anomaly = false;
    let mut results = Vec::new();
    let mut outcome_counts: BTreeMap<String, usize> = BTreeMap::new();
    let mut total_anomalies = 0usize;

    for run in 0..cli.runs.max(1) {
        let seed = base_seed.wrapping_add(run);
        emit_log(
            "info",
            "run_started",
            &run_id,
            Some(run),
            Some(seed),
            json!({
                "agent": cli.agent,
                "skill": cli.skill,
                "difficulty": difficulty,
            }),
        );
        let run_result = run_campaign(
            run,
            seed,
            &cli.agent,
            cli.skill,
            difficulty,
            &mut scoreboard,
        );

        for room in &run_result.result.rooms {
            emit_log(
                "info",
                "room_finished",
                &run_id,
                Some(run),
                Some(seed),
                json!({
                    "room": room.room,
                    "outcome": room.outcome,
                    "moves": room.moves,
                    "elapsedSecs": room.elapsed_secs,
                    "points": room.completion.map(|c| c.total()).unwrap_or(0),
                    "photoBonus": room.photo_bonus,
                }),
            );
        }
        for anomaly in &run_result.anomaly_records {
            emit_log(
                "warn",
                "anomaly_detected",
                &run_id,
                Some(run),
                Some(seed),
                json!({
                    "room": anomaly.room,
                    "message": anomaly.message,
                }),
            );
        }

        if !run_result.result.anomalies.is_empty() {
            has_anomaly = true;
        }
        total_anomalies += run_result.anomaly_records.len();
        *outcome_counts
            .entry(run_result.result.outcome.clone())
            .or_insert(0) += 1;

        match serde_json::to_string(&run_result.result) {
            Ok(line) => println!("{line}"),
            Err(error) => log::error!("[simulate] run result did not serialize: {error}"),
        }
        results.push(run_result.result);
    }

    let summary = build_run_summary(
        run_id.clone(),
        run_started_at_ms,
        now_ms(),
        results,
        outcome_counts,
        total_anomalies,
    );

    let mut summary_out_written: Option<String> = None;
    if let Some(path) = cli.summary_out.as_ref() {
        if let Err(error) = write_summary(path, &summary) {
            emit_log(
                "error",
                "summary_write_failed",
                &run_id,
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
        &run_id,
        None,
        None,
        json!({
            "runCount": summary.run_count,
            "anomalyCount": summary.anomaly_count,
            "averageSessionPoints": summary.average_session_points,
            "outcomeCounts": summary.outcome_counts,
            "summaryOut": summary_out_written,
        }),
    );

    if has_anomaly {
        std::process::exit(1);
    }
}

fn run_campaign(
    run: u32,
    seed: u32,
    agent: &str,
    skill: f32,
    difficulty: Difficulty,
    scoreboard: &mut AgentScoreboard,
) -> RunResult {
    let mut player = Player::new(seed, skill);
    let mut campaign = Campaign::new(agent, difficulty);
    let lifetime_before = lifetime_points(scoreboard, agent);
    let mut rooms = Vec::new();
    let mut anomalies = Vec::new();
    let mut anomaly_records = Vec::new();
    let mut anomaly_seen = HashSet::new();
    let mut outcome = "escaped".to_string();

    while let Some(room) = campaign.next_room() {
        let (play, elapsed_secs) = play_room(room, &mut player);
        for message in &play.anomalies {
            push_anomaly(
                &mut anomalies,
                &mut anomaly_records,
                &mut anomaly_seen,
                Some(room),
                message.clone(),
            );
        }
        let mut line = RoomRunLine {
            room,
            outcome: play.outcome,
            moves: play.moves,
            elapsed_secs,
            completion: play.completion,
            photo_bonus: 0,
        };

        let Some(completion) = play.completion else {
            rooms.push(line);
            outcome = format!("{}_{}", outcome_key(play.outcome), room.as_str());
            break;
        };
        if let Err(error) = campaign.complete_room(room, completion, scoreboard) {
            push_anomaly(
                &mut anomalies,
                &mut anomaly_records,
                &mut anomaly_seen,
                Some(room),
                format!("campaign rejected completion: {error}"),
            );
            rooms.push(line);
            outcome = "rejected".to_string();
            break;
        }

        if player.skilled() {
            let awarded = judge_image(room, &room_snapshot(room))
                .map_err(|error| format!("snapshot rejected: {error}"))
                .and_then(|verdict| {
                    campaign
                        .award_photo_bonus(room, &verdict, scoreboard)
                        .map_err(|error| format!("photo bonus refused: {error}"))
                });
            match awarded {
                Ok(bonus) => line.photo_bonus = bonus,
                Err(message) => push_anomaly(
                    &mut anomalies,
                    &mut anomaly_records,
                    &mut anomaly_seen,
                    Some(room),
                    message,
                ),
            }
        }
        rooms.push(line);
    }

    let lifetime_after = lifetime_points(scoreboard, agent);
    for message in collect_campaign_anomalies(&campaign, &rooms, lifetime_before, lifetime_after) {
        push_anomaly(
            &mut anomalies,
            &mut anomaly_records,
            &mut anomaly_seen,
            None,
            message,
        );
    }

    RunResult {
        result: RunResultLine {
            run,
            seed,
            agent: campaign.agent().to_string(),
            skill: player.skill,
            difficulty,
            outcome,
            rooms_cleared: campaign.progress().completed,
            session_points: campaign.session_points(),
            lifetime_points: lifetime_after,
            rooms,
            anomalies,
        },
        anomaly_records,
    }
}

fn play_room(room: RoomId, player: &mut Player) -> (RoomPlay, u32) {
    match room {
        RoomId::Energy => {
            let mut grid = EnergyGrid::new();
            let play = play_energy(&mut grid, player);
            (play, elapsed(grid.clock()))
        }
        RoomId::Waste => {
            let mut sorter = WasteSorter::new();
            let play = play_waste(&mut sorter, player);
            (play, elapsed(sorter.clock()))
        }
        RoomId::Water => {
            let mut rig = FilterRig::new();
            let play = play_water(&mut rig, player);
            (play, elapsed(rig.clock()))
        }
        RoomId::Shelter => {
            let mut site = ShelterSite::new();
            let play = play_shelter(&mut site, player);
            (play, elapsed(site.clock()))
        }
        RoomId::Policy => {
            let mut chamber = PolicyChamber::new();
            let play = play_policy(&mut chamber, player);
            (play, elapsed(chamber.clock()))
        }
    }
}

fn room_snapshot(room: RoomId) -> RgbaImage {
    let colour = match room {
        RoomId::Energy | RoomId::Water => [20, 40, 200],
        RoomId::Waste => [20, 200, 20],
        RoomId::Shelter => [128, 128, 128],
        RoomId::Policy => [0, 0, 0],
    };
    let mut image = RgbaImage::from_pixel(
        SNAPSHOT_SIDE,
        SNAPSHOT_SIDE,
        Rgba([colour[0], colour[1], colour[2], 255]),
    );
    if room == RoomId::Waste {
        // a second, red bin across the lower half
        for y in SNAPSHOT_SIDE / 2..SNAPSHOT_SIDE {
            for x in 0..SNAPSHOT_SIDE {
                image.put_pixel(x, y, Rgba([200, 20, 20, 255]));
            }
        }
    }
    image
}

fn elapsed(clock: &RoomClock) -> u32 {
    clock.elapsed_secs()
}

fn play_energy(grid: &mut EnergyGrid, player: &mut Player) -> RoomPlay {
    let mut play = RoomPlay::new();
    while grid.completion().is_none() {
        let Some(district) = DISTRICTS.iter().find(|district| {
            !grid
                .connections()
                .iter()
                .any(|c| c.district == district.id && c.source == WIND_SOURCE)
        }) else {
            play.anomalies
                .push("all districts on wind but grid not restored".to_string());
            break;
        };
        let source = if player.skilled() {
            WIND_SOURCE
        } else {
            player
                .rng
                .pick(&ENERGY_SOURCES)
                .map(|source| source.id)
                .unwrap_or(WIND_SOURCE)
        };

        grid.tick(player.think_secs());
        play.moves += 1;
        match grid.connect(source, district.id) {
            Ok(report) => {
                let pct = report.stats.renewable_pct;
                if !pct.is_finite() || !(0.0..=100.0).contains(&pct) {
                    play.anomalies
                        .push(format!("renewable share out of range: {pct}"));
                }
            }
            Err(error) => {
                play.absorb(error);
                break;
            }
        }
    }
    let completion = grid.completion();
    play.finish(completion)
}

fn play_waste(sorter: &mut WasteSorter, player: &mut Player) -> RoomPlay {
    let mut play = RoomPlay::new();
    let mut items = sorter.remaining_items();
    player.rng.shuffle(&mut items);

    for item in items {
        sorter.tick(player.think_secs());
        if sorter.fast_fashion_due() {
            let choice = if player.skilled() {
                FastFashionChoice::Sustainable
            } else {
                FastFashionChoice::Buy
            };
            if let Err(error) = sorter.choose_fast_fashion(choice) {
                play.anomalies
                    .push(format!("fast fashion offer rejected: {error}"));
            }
        }

        let bin = if player.skilled() {
            item.kind
        } else {
            let wrong: Vec<WasteKind> = WasteKind::ALL
                .into_iter()
                .filter(|kind| *kind != item.kind)
                .collect();
            player.rng.pick(&wrong).copied().unwrap_or(item.kind)
        };
        play.moves += 1;
        match sorter.place(item.id, bin) {
            Ok(outcome) => {
                if !(0.0..=100.0).contains(&outcome.accuracy_pct) {
                    play.anomalies.push(format!(
                        "sorting accuracy out of range: {}",
                        outcome.accuracy_pct
                    ));
                }
            }
            Err(error) => {
                play.absorb(error);
                break;
            }
        }
    }

    match sorter.verdict().clone() {
        RoomVerdict::Completed { completion } => play.finish(Some(completion)),
        RoomVerdict::Failed { .. } => {
            play.outcome = RoomOutcome::Failed;
            play
        }
        RoomVerdict::InProgress => play,
    }
}

fn play_water(rig: &mut FilterRig, player: &mut Player) -> RoomPlay {
    let mut play = RoomPlay::new();
    while rig.completion().is_none() {
        rig.tick(player.think_secs());
        play.moves += 1;

        let misplaced_slot = rig
            .slots()
            .iter()
            .enumerate()
            .find_map(|(slot, stage)| match stage {
                Some(stage) if stage.correct_slot != slot => Some(slot),
                _ => None,
            });
        let result = if let Some(slot) = misplaced_slot {
            rig.remove(slot)
        } else {
            let shelf = rig.shelf();
            let Some(stage) = player.rng.pick(&shelf).copied() else {
                play.anomalies
                    .push("every stage placed correctly but water not purified".to_string());
                break;
            };
            let empty: Vec<usize> = (0..FILTER_STAGES.len())
                .filter(|slot| rig.slots()[*slot].is_none())
                .collect();
            let slot = if player.skilled() {
                stage.correct_slot
            } else {
                player.rng.pick(&empty).copied().unwrap_or(stage.correct_slot)
            };
            rig.place(stage.id, slot)
        };

        match result {
            Ok(report) => {
                if !(0.0..=100.0).contains(&report.purity_pct) {
                    play.anomalies
                        .push(format!("purity out of range: {}", report.purity_pct));
                }
            }
            Err(error) => {
                play.absorb(error);
                break;
            }
        }
    }
    let completion = rig.completion();
    play.finish(completion)
}

fn play_shelter(site: &mut ShelterSite, player: &mut Player) -> RoomPlay {
    let mut play = RoomPlay::new();
    while site.completion().is_none() {
        site.tick(player.think_secs());
        play.moves += 1;

        let result = match site.shelters().iter().position(|s| !s.is_complete()) {
            Some(shelter) => {
                let material = pick_material(site, player);
                site.add_material(shelter, material)
            }
            None => {
                // Every shelter is full without a win: tear out some cement.
                let target = site.shelters().iter().enumerate().find_map(|(idx, s)| {
                    if s.is_sustainable() {
                        return None;
                    }
                    s.materials
                        .iter()
                        .position(|m| *m == CEMENT)
                        .map(|pos| (idx, pos))
                });
                let Some((shelter, index)) = target else {
                    play.anomalies
                        .push("no cement left to replace but site not finished".to_string());
                    break;
                };
                site.remove_material(shelter, index)
            }
        };

        match result {
            Ok(report) => {
                if !(0.0..=100.0).contains(&report.avg_sustainability) {
                    play.anomalies.push(format!(
                        "average sustainability out of range: {}",
                        report.avg_sustainability
                    ));
                }
            }
            Err(error) => {
                play.absorb(error);
                break;
            }
        }
    }
    let completion = site.completion();
    play.finish(completion)
}

fn pick_material(site: &ShelterSite, player: &mut Player) -> &'static str {
    let in_stock: Vec<&'static str> = MATERIALS
        .iter()
        .filter(|m| m.id != CEMENT && site.remaining_stock(m.id).unwrap_or(0) > 0)
        .map(|m| m.id)
        .collect();
    if in_stock.is_empty() || !player.skilled() {
        return CEMENT;
    }
    player.rng.pick(&in_stock).copied().unwrap_or(CEMENT)
}

fn play_policy(chamber: &mut PolicyChamber, player: &mut Player) -> RoomPlay {
    let mut play = RoomPlay::new();
    'attempts: while chamber.completion().is_none() {
        let picks: Vec<&'static str> = if player.skilled() {
            OPTIMAL_POLICIES.to_vec()
        } else {
            let mut ids: Vec<&'static str> = POLICIES.iter().map(|p| p.id).collect();
            player.rng.shuffle(&mut ids);
            ids.truncate(OPTIMAL_POLICIES.len());
            ids
        };

        for id in picks {
            chamber.tick(player.think_secs());
            play.moves += 1;
            if let Err(error) = chamber.toggle(id) {
                play.absorb(error);
                break 'attempts;
            }
        }

        chamber.tick(player.think_secs());
        play.moves += 1;
        match chamber.simulate() {
            Ok(result) if chamber.completion().is_none() => {
                log::debug!(
                    "[simulate] policy attempt ended {:?}",
                    result.planet_status
                );
                chamber.reset_simulation();
            }
            Ok(_) => {}
            Err(error) => {
                play.absorb(error);
                break;
            }
        }
    }
    let completion = chamber.completion();
    play.finish(completion)
}

fn collect_campaign_anomalies(
    campaign: &Campaign,
    rooms: &[RoomRunLine],
    lifetime_before: u64,
    lifetime_after: u64,
) -> Vec<String> {
    let mut anomalies = Vec::new();
    let earned: u64 = rooms
        .iter()
        .map(|room| {
            room.completion.map(|c| c.total() as u64).unwrap_or(0) + room.photo_bonus as u64
        })
        .sum();
    if earned != campaign.session_points() {
        anomalies.push(format!(
            "session points {} differ from room and photo totals {earned}",
            campaign.session_points()
        ));
    }
    if lifetime_after.saturating_sub(lifetime_before) != campaign.session_points() {
        anomalies.push(format!(
            "lifetime score moved {lifetime_before} -> {lifetime_after} for a {} point session",
            campaign.session_points()
        ));
    }
    let cleared = rooms
        .iter()
        .filter(|room| room.outcome == RoomOutcome::Completed)
        .count();
    if cleared != campaign.progress().completed {
        anomalies.push(format!(
            "{cleared} rooms cleared but campaign counts {}",
            campaign.progress().completed
        ));
    }
    anomalies
}

fn lifetime_points(scoreboard: &AgentScoreboard, agent: &str) -> u64 {
    scoreboard.get(agent).map(|entry| entry.points).unwrap_or(0)
}

fn outcome_key(outcome: RoomOutcome) -> &'static str {
    match outcome {
        RoomOutcome::Completed => "escaped",
        RoomOutcome::Failed => "failed",
        RoomOutcome::TimeUp => "time_up",
    }
}

fn resolve_seed(seed: Option<u64>) -> u32 {
    normalize_seed(seed.unwrap_or_else(now_ms))
}

fn normalize_seed(seed: u64) -> u32 {
    seed as u32
}

fn push_anomaly(
    anomalies: &mut Vec<String>,
    anomaly_records: &mut Vec<AnomalyRecord>,
    anomaly_seen: &mut HashSet<String>,
    room: Option<RoomId>,
    message: String,
) {
    anomaly_records.push(AnomalyRecord {
        room,
        message: message.clone(),
    });
    if anomaly_seen.insert(message.clone()) {
        anomalies.push(message);
    }
}

fn default_run_id(seed: u32, timestamp_ms: u64) -> String {
    format!("sim-{seed}-{timestamp_ms}")
}

fn build_run_summary(
    run_id: String,
    started_at_ms: u64,
    finished_at_ms: u64,
    runs: Vec<RunResultLine>,
    outcome_counts: BTreeMap<String, usize>,
    anomaly_count: usize,
) -> RunSummary {
    let run_count = runs.len();
    let total_points: u64 = runs.iter().map(|run| run.session_points).sum();
    let average_session_points = if run_count == 0 {
        0
    } else {
        total_points / run_count as u64
    };
    RunSummary {
        run_id,
        started_at_ms,
        finished_at_ms,
        run_count,
        anomaly_count,
        average_session_points,
        outcome_counts,
        runs,
    }
}

fn emit_log(
    level: &str,
    event: &str,
    run_id: &str,
    run: Option<u32>,
    seed: Option<u32>,
    details: Value,
) {
    let log_line = StructuredLogLine {
        timestamp_ms: now_ms(),
        level: level.to_string(),
        event: event.to_string(),
        run_id: run_id.to_string(),
        run,
        seed,
        details,
    };
    match serde_json::to_string(&log_line) {
        Ok(line) => eprintln!("{line}"),
        Err(error) => log::error!("[simulate] log line did not serialize: {error}"),
    }
}

fn write_summary(path: &Path, summary: &RunSummary) -> io::Result<()> {
    let summary_text = serde_json::to_string_pretty(summary).map_err(io::Error::other)?;
    std::fs::write(path, summary_text)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn make_run_line(outcome: &str, session_points: u64) -> RunResultLine {
        RunResultLine {
            run: 0,
            seed: 7,
            agent: "Ada".to_string(),
            skill: 1.0,
            difficulty: Difficulty::Beginner,
            outcome: outcome.to_string(),
            rooms_cleared: 5,
            session_points,
            lifetime_points: session_points,
            rooms: Vec::new(),
            anomalies: Vec::new(),
        }
    }

    #[test]
    fn default_run_id_uses_seed_and_timestamp() {
        assert_eq!(default_run_id(42, 1_700_000_000_000), "sim-42-1700000000000");
    }

    #[test]
    fn seed_is_truncated_to_u32() {
        assert_eq!(normalize_seed(5), 5);
        assert_eq!(normalize_seed(u32::MAX as u64 + 3), 2);
        assert_eq!(resolve_seed(Some(9)), 9);
    }

    #[test]
    fn perfect_player_clears_every_room() {
        for room in RoomId::ALL {
            let mut player = Player::new(11, 1.0);
            let (play, elapsed_secs) = play_room(room, &mut player);
            assert_eq!(play.outcome, RoomOutcome::Completed, "{}", room.as_str());
            assert!(play.completion.is_some());
            assert!(play.anomalies.is_empty());
            assert!(elapsed_secs >= MIN_MOVE_SECS);
        }
    }

    #[test]
    fn perfect_energy_run_wires_every_district_to_wind() {
        let mut grid = EnergyGrid::new();
        let mut player = Player::new(3, 1.0);
        let play = play_energy(&mut grid, &mut player);
        assert_eq!(play.moves, DISTRICTS.len() as u32);
        assert!(grid.connections().iter().all(|c| c.source == WIND_SOURCE));
        assert_eq!(play.completion.map(|c| c.bonus), Some(50));
    }

    #[test]
    fn hopeless_waste_sorter_fails_the_room() {
        let mut sorter = WasteSorter::new();
        let mut player = Player::new(5, 0.0);
        let play = play_waste(&mut sorter, &mut player);
        assert_eq!(play.outcome, RoomOutcome::Failed);
        assert_eq!(play.completion, None);
        assert_eq!(sorter.correct_count(), 0);
    }

    #[test]
    fn hopeless_policy_maker_runs_out_of_time() {
        let mut chamber = PolicyChamber::new();
        let mut player = Player::new(8, 0.0);
        let play = play_policy(&mut chamber, &mut player);
        // A random draw can still save the planet, otherwise the clock runs out.
        match play.outcome {
            RoomOutcome::Completed => assert!(chamber.completion().is_some()),
            RoomOutcome::TimeUp => assert!(chamber.clock().is_expired()),
            RoomOutcome::Failed => panic!("policy room has no failed state"),
        }
        assert!(play.anomalies.is_empty());
    }

    #[test]
    fn perfect_campaign_escapes_without_anomalies() {
        let mut board = AgentScoreboard::in_memory();
        board.set_points("Ada", 40);
        let run = run_campaign(0, 21, "Ada", 1.0, Difficulty::Expert, &mut board);
        assert_eq!(run.result.outcome, "escaped");
        assert_eq!(run.result.rooms_cleared, 5);
        assert!(run.result.anomalies.is_empty());
        assert_eq!(run.result.lifetime_points, 40 + run.result.session_points);
        assert!(run.result.rooms.iter().all(|room| room.photo_bonus == 50));
    }

    #[test]
    fn every_room_snapshot_passes_its_photo_check() {
        for room in RoomId::ALL {
            let verdict = judge_image(room, &room_snapshot(room)).expect("snapshot accepted");
            assert_eq!(verdict.bonus, 50, "{}", room.as_str());
        }
    }

    #[test]
    fn failed_room_stops_the_campaign() {
        let mut board = AgentScoreboard::in_memory();
        let run = run_campaign(0, 4, "Bo", 0.0, Difficulty::Beginner, &mut board);
        assert_ne!(run.result.outcome, "escaped");
        assert!(run.result.rooms_cleared < 5);
        assert!(run.result.anomalies.is_empty());
        assert_eq!(run.result.rooms.len(), run.result.rooms_cleared + 1);
    }

    #[test]
    fn campaign_anomalies_flag_point_mismatch() {
        let campaign = Campaign::new("Ada", Difficulty::Beginner);
        let rooms = vec![RoomRunLine {
            room: RoomId::Energy,
            outcome: RoomOutcome::Completed,
            moves: 3,
            elapsed_secs: 30,
            completion: Some(RoomCompletion {
                points: 60,
                bonus: 0,
            }),
            photo_bonus: 0,
        }];
        let anomalies = collect_campaign_anomalies(&campaign, &rooms, 0, 0);
        assert_eq!(anomalies.len(), 2);
        assert!(anomalies[0].contains("session points 0"));
    }

    #[test]
    fn build_run_summary_averages_session_points() {
        let summary = build_run_summary(
            "sim-42-1".to_string(),
            1,
            2,
            vec![make_run_line("escaped", 600), make_run_line("time_up_water", 200)],
            BTreeMap::from([
                ("escaped".to_string(), 1usize),
                ("time_up_water".to_string(), 1usize),
            ]),
            0,
        );
        assert_eq!(summary.average_session_points, 400);
        assert_eq!(summary.run_count, 2);
    }

    #[test]
    fn summary_write_fails_for_a_missing_output_directory() {
        let target = std::env::temp_dir()
            .join(format!("eco-escape-missing-{}", now_ms()))
            .join("summary.json");
        let summary = build_run_summary(
            "sim-1-1".to_string(),
            1,
            2,
            vec![make_run_line("escaped", 100)],
            BTreeMap::from([("escaped".to_string(), 1usize)]),
            0,
        );
        assert!(write_summary(&target, &summary).is_err());
    }

    #[test]
    fn repeated_anomaly_is_reported_once_but_recorded_per_room() {
        let mut anomalies = Vec::new();
        let mut records = Vec::new();
        let mut seen = HashSet::new();
        push_anomaly(
            &mut anomalies,
            &mut records,
            &mut seen,
            Some(RoomId::Water),
            "same anomaly".to_string(),
        );
        push_anomaly(
            &mut anomalies,
            &mut records,
            &mut seen,
            None,
            "same anomaly".to_string(),
        );

        assert_eq!(anomalies.len(), 1);
        assert_eq!(records.len(), 2);
        assert_eq!(records[0].room, Some(RoomId::Water));
        assert_eq!(records[1].room, None);
    }
}
