use anyhow::{Context, Result};
use boardwatch::capture;
use boardwatch::classify::{Classifier, ClassifierMode};
use boardwatch::config::{Config, DEFAULT_CONFIG_PATH};
use boardwatch::engine::IdentityPolicy;
use boardwatch::{ReconcileOutcome, Reconciler, format_clock};
use clap::{Arg, ArgAction, Command};
use dialoguer::Select;
use log::{debug, info, warn};
use std::path::PathBuf;
use std::time::Duration;
use tokio::io::{AsyncBufRead, AsyncBufReadExt, BufReader, Lines};
use tokio::time::{Instant, MissedTickBehavior, interval, interval_at};

const ONE_SECOND: Duration = Duration::from_secs(1);
const AMBIGUITY_CHOICES: [&str; 2] = ["Re-sample now", "Discard this reading"];
const COMMAND_HELP: &str = "sample (or empty line), pause, resume, restart, quit";

#[derive(Clone, Copy, Debug, Default)]
struct RunOptions {
    /// Ask the operator what to do after an ambiguous reading.
    interactive: bool,
    /// No periodic sampling; reconcile only on an operator `sample`.
    on_demand: bool,
}

/// One line typed by the operator while the tracker runs.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum OperatorCommand {
    Sample,
    Pause,
    Resume,
    Restart,
    Quit,
}

impl OperatorCommand {
    fn parse(line: &str) -> Option<Self> {
        match line.trim().to_ascii_lowercase().as_str() {
            "" | "s" | "sample" | "move" => Some(OperatorCommand::Sample),
            "p" | "pause" => Some(OperatorCommand::Pause),
            "c" | "resume" => Some(OperatorCommand::Resume),
            "r" | "restart" => Some(OperatorCommand::Restart),
            "q" | "quit" => Some(OperatorCommand::Quit),
            _ => None,
        }
    }
}

fn cli() -> Command {
    Command::new("Boardwatch")
        .version(env!("CARGO_PKG_VERSION"))
        .about("Tracks a physical chessboard, its moves and both clocks")
        .arg(
            Arg::new("config")
                .long("config")
                .value_name("PATH")
                .help("Config file (JSON)")
                .default_value(DEFAULT_CONFIG_PATH),
        )
        .arg(
            Arg::new("classifier")
                .long("classifier")
                .value_name("MODE")
                .help("Snapshot source")
                .value_parser(["stub", "replay"]),
        )
        .arg(
            Arg::new("replay")
                .long("replay")
                .value_name("PATH")
                .help("JSON-lines snapshot file; implies --classifier replay"),
        )
        .arg(
            Arg::new("frame")
                .long("frame")
                .value_name("PATH")
                .help("Board frame written by the camera collaborator"),
        )
        .arg(
            Arg::new("seconds")
                .long("seconds")
                .value_name("SECS")
                .help("Starting clock budget per side")
                .value_parser(clap::value_parser!(u32)),
        )
        .arg(
            Arg::new("strict")
                .long("strict")
                .help("Reject snapshots that place one piece identity on several squares")
                .action(ArgAction::SetTrue),
        )
        .arg(
            Arg::new("on-demand")
                .long("on-demand")
                .help("Only reconcile when the operator asks (type `sample`)")
                .action(ArgAction::SetTrue),
        )
        .arg(
            Arg::new("interactive")
                .long("interactive")
                .help("Ask what to do when a reading is ambiguous")
                .action(ArgAction::SetTrue),
        )
}

fn apply_overrides(config: &mut Config, matches: &clap::ArgMatches) {
    if let Some(mode) = matches.get_one::<String>("classifier") {
        config.classifier = match mode.as_str() {
            "replay" => ClassifierMode::Replay,
            _ => ClassifierMode::Stub,
        };
    }
    if let Some(path) = matches.get_one::<String>("replay") {
        config.replay_path = Some(PathBuf::from(path));
        config.classifier = ClassifierMode::Replay;
    }
    if let Some(path) = matches.get_one::<String>("frame") {
        config.frame_path = Some(PathBuf::from(path));
    }
    if let Some(secs) = matches.get_one::<u32>("seconds") {
        config.initial_seconds = *secs;
    }
    if matches.get_flag("strict") {
        config.identity_policy = IdentityPolicy::Reject;
    }
}

fn build_classifier(config: &Config) -> Result<Classifier> {
    match (config.classifier, &config.replay_path) {
        (ClassifierMode::Replay, Some(path)) => Classifier::replay_from_file(path),
        _ => Ok(Classifier::stub()),
    }
}

fn main() -> Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let matches = cli().get_matches();
    let config_path = PathBuf::from(
        matches
            .get_one::<String>("config")
            .map(String::as_str)
            .unwrap_or(DEFAULT_CONFIG_PATH),
    );
    let mut config = Config::load_or_default(&config_path)?;
    apply_overrides(&mut config, &matches);
    config.validate().context("Invalid configuration")?;

    let classifier = build_classifier(&config)?;
    let engine = Reconciler::new(config.initial_seconds, config.identity_policy);
    let options = RunOptions {
        interactive: matches.get_flag("interactive"),
        on_demand: matches.get_flag("on-demand"),
    };

    info!("Boardwatch starting...");
    info!("Classifier: {}", classifier.mode());
    info!("Commands: {}", COMMAND_HELP);
    info!("Press Ctrl+C to stop.");

    // Single-threaded: the clock tick and reconciliation never run concurrently.
    let runtime = tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()
        .context("Failed to start runtime")?;
    let result = runtime.block_on(async {
        let commands = BufReader::new(tokio::io::stdin()).lines();
        run(engine, classifier, &config, options, commands).await
    });
    // A stdin read may still be parked on its blocking thread.
    runtime.shutdown_background();

    let engine = result?;
    println!("{}", engine.move_log().render());
    Ok(())
}

/// The two periodic activities and operator input share this single-threaded loop, so a
/// reconciliation cycle always completes before the next clock tick is handled.
async fn run<R>(
    mut engine: Reconciler,
    mut classifier: Classifier,
    config: &Config,
    options: RunOptions,
    mut commands: Lines<R>,
) -> Result<Reconciler>
where
    R: AsyncBufRead + Unpin,
{
    let mut clock_tick = interval_at(Instant::now() + ONE_SECOND, ONE_SECOND);
    clock_tick.set_missed_tick_behavior(MissedTickBehavior::Burst);
    let mut sampler = interval(Duration::from_millis(config.sample_interval_ms));
    sampler.set_missed_tick_behavior(MissedTickBehavior::Delay);
    let mut armed_epoch = engine.clock().epoch();
    let mut input_open = true;

    let shutdown = tokio::signal::ctrl_c();
    tokio::pin!(shutdown);

    info!("{}", clock_line(&engine));
    loop {
        let mut outcome = None;
        tokio::select! {
            _ = clock_tick.tick() => {
                if engine.tick().is_some() {
                    info!("{}", clock_line(&engine));
                } else {
                    debug!("{}", clock_line(&engine));
                }
            }
            _ = sampler.tick(), if !options.on_demand => {
                outcome = sample(&mut engine, &mut classifier, config).await;
                if outcome.is_none() && classifier.is_exhausted() {
                    info!("Replay finished");
                    break;
                }
            }
            line = commands.next_line(), if input_open => {
                let Some(line) = line.context("Failed to read operator input")? else {
                    debug!("Operator input closed");
                    input_open = false;
                    continue;
                };
                match OperatorCommand::parse(&line) {
                    Some(OperatorCommand::Sample) => {
                        outcome = sample(&mut engine, &mut classifier, config).await;
                        if outcome.is_none() {
                            info!("Nothing to reconcile");
                        }
                    }
                    Some(OperatorCommand::Pause) => engine.pause(),
                    Some(OperatorCommand::Resume) => engine.resume(),
                    Some(OperatorCommand::Restart) => engine.restart(),
                    Some(OperatorCommand::Quit) => break,
                    None => warn!("Unknown command '{}' ({})", line.trim(), COMMAND_HELP),
                }
            }
            _ = &mut shutdown => {
                info!("Stopping");
                break;
            }
        }

        // A new armed timer replaces the old one: drop the pending tick.
        if engine.clock().epoch() != armed_epoch {
            clock_tick.reset();
            armed_epoch = engine.clock().epoch();
        }

        if let Some(outcome) = outcome {
            if outcome.is_ambiguous() && options.interactive && ask_resample(&outcome).await? {
                if options.on_demand {
                    sample(&mut engine, &mut classifier, config).await;
                } else {
                    sampler.reset_immediately();
                }
            }
        }
    }
    Ok(engine)
}

/// One reconciliation cycle. `None` when no snapshot was available.
async fn sample(
    engine: &mut Reconciler,
    classifier: &mut Classifier,
    config: &Config,
) -> Option<ReconcileOutcome> {
    let frame = match &config.frame_path {
        Some(path) => {
            let path = path.clone();
            let bounds = config.board_bounds;
            match tokio::task::spawn_blocking(move || capture::load_frame(&path, bounds)).await {
                Ok(Ok(frame)) => Some(frame),
                Ok(Err(e)) => {
                    warn!("Skipping cycle: {:#}", e);
                    return None;
                }
                Err(e) => {
                    warn!("Frame loading task failed: {}", e);
                    return None;
                }
            }
        }
        None => None,
    };

    let Some(snapshot) = classifier.classify(frame.as_ref()) else {
        debug!("Classifier declined this cycle");
        return None;
    };

    let outcome = engine.reconcile(&snapshot);
    if let ReconcileOutcome::MoveAccepted(record) = &outcome {
        println!("{}", record);
        info!("{}", clock_line(engine));
        let to_move = engine.turn_clock_state().active_side;
        match engine.current_snapshot().to_fen(to_move) {
            Ok(fen) => info!("Position: {}", fen),
            Err(e) => debug!("No FEN for this position: {}", e),
        }
    }
    Some(outcome)
}

fn clock_line(engine: &Reconciler) -> String {
    let state = engine.turn_clock_state();
    format!(
        "White Time: {} | Black Time: {} ({:?})",
        format_clock(state.white_remaining_secs),
        format_clock(state.black_remaining_secs),
        state.phase
    )
}

/// Returns `true` if the operator wants an immediate re-sample.
async fn ask_resample(outcome: &ReconcileOutcome) -> Result<bool> {
    let prompt = format!("Ambiguous reading: {:?}", outcome);
    let choice = tokio::task::spawn_blocking(move || {
        Select::new()
            .with_prompt(prompt)
            .items(&AMBIGUITY_CHOICES[..])
            .default(0)
            .interact()
    })
    .await
    .context("Prompt task failed")?
    .context("Failed to read operator choice")?;
    Ok(choice == 0)
}

#[cfg(test)]
mod tests {
    use super::*;
    use boardwatch::{BoardSnapshot, ClockPhase, Side, Square};

    fn sq(label: &str) -> Square {
        label.parse().unwrap()
    }

    fn moved(base: &BoardSnapshot, from: &str, to: &str) -> BoardSnapshot {
        let mut next = base.clone();
        let piece = next.get(sq(from)).cloned();
        next.set(sq(from), None);
        next.set(sq(to), piece);
        next
    }

    fn input(text: &'static str) -> Lines<BufReader<&'static [u8]>> {
        BufReader::new(text.as_bytes()).lines()
    }

    #[test]
    fn test_cli_overrides() {
        let matches = cli()
            .try_get_matches_from(["boardwatch", "--replay", "game.jsonl", "--seconds", "90", "--strict"])
            .unwrap();
        let mut config = Config::default();
        apply_overrides(&mut config, &matches);
        assert_eq!(config.classifier, ClassifierMode::Replay);
        assert_eq!(config.replay_path, Some(PathBuf::from("game.jsonl")));
        assert_eq!(config.initial_seconds, 90);
        assert_eq!(config.identity_policy, IdentityPolicy::Reject);
    }

    #[test]
    fn test_cli_rejects_unknown_classifier() {
        assert!(cli().try_get_matches_from(["boardwatch", "--classifier", "llm"]).is_err());
    }

    #[test]
    fn test_operator_command_parsing() {
        assert_eq!(OperatorCommand::parse(""), Some(OperatorCommand::Sample));
        assert_eq!(OperatorCommand::parse("  Sample \n"), Some(OperatorCommand::Sample));
        assert_eq!(OperatorCommand::parse("p"), Some(OperatorCommand::Pause));
        assert_eq!(OperatorCommand::parse("resume"), Some(OperatorCommand::Resume));
        assert_eq!(OperatorCommand::parse("restart"), Some(OperatorCommand::Restart));
        assert_eq!(OperatorCommand::parse("q"), Some(OperatorCommand::Quit));
        assert_eq!(OperatorCommand::parse("castle"), None);
    }

    #[test]
    fn test_clock_line_format() {
        let mut engine = Reconciler::default();
        engine.tick();
        assert_eq!(
            clock_line(&engine),
            "White Time: 4:59 | Black Time: 5:00 (Running(White))"
        );
    }

    #[tokio::test]
    async fn test_replay_run_applies_moves_and_stops() {
        let start = BoardSnapshot::starting_position();
        let after_e4 = moved(&start, "e2", "e4");

        let classifier = Classifier::replay([start, after_e4.clone(), after_e4]);
        let config = Config { sample_interval_ms: 5, ..Config::default() };

        let engine = run(Reconciler::default(), classifier, &config, RunOptions::default(), input(""))
            .await
            .unwrap();
        assert_eq!(engine.move_log().len(), 1);
        assert_eq!(engine.turn_clock_state().active_side, Side::Black);
        assert_eq!(engine.current_snapshot().get(sq("e4")).unwrap().as_str(), "WP5");
    }

    #[tokio::test(start_paused = true)]
    async fn test_turn_switch_drops_pending_tick_of_previous_side() {
        // Samples at 0s (no change), 1.75s (e2-e4) and 3.5s (replay exhausted).
        // White is charged at 1s. Black's first second is due at 2.75s, not at the 2s
        // tick White had pending, so Black loses exactly one second by 3.5s.
        let start = BoardSnapshot::starting_position();
        let after_e4 = moved(&start, "e2", "e4");
        let classifier = Classifier::replay([start, after_e4]);
        let config = Config { sample_interval_ms: 1750, ..Config::default() };

        let engine = run(Reconciler::default(), classifier, &config, RunOptions::default(), input(""))
            .await
            .unwrap();

        let state = engine.turn_clock_state();
        assert_eq!(engine.move_log().len(), 1);
        assert_eq!(state.phase, ClockPhase::Running(Side::Black));
        assert_eq!(state.white_remaining_secs, 299);
        assert_eq!(state.black_remaining_secs, 299);
    }

    #[tokio::test]
    async fn test_on_demand_reconciles_only_when_asked() {
        let start = BoardSnapshot::starting_position();
        let after_e4 = moved(&start, "e2", "e4");
        let after_e5 = moved(&after_e4, "e7", "e5");
        let classifier = Classifier::replay([after_e4, after_e5]);
        let options = RunOptions { on_demand: true, ..RunOptions::default() };

        let engine = run(Reconciler::default(), classifier, &Config::default(), options, input("sample\nquit\n"))
            .await
            .unwrap();
        assert_eq!(engine.move_log().render(), "WP5 e2 → e4");
        assert_eq!(engine.turn_clock_state().active_side, Side::Black);
    }

    #[tokio::test]
    async fn test_operator_pause_and_restart() {
        let start = BoardSnapshot::starting_position();
        let classifier = Classifier::replay([moved(&start, "e2", "e4")]);
        let options = RunOptions { on_demand: true, ..RunOptions::default() };

        let engine = run(Reconciler::default(), classifier, &Config::default(), options, input("\npause\nquit\n"))
            .await
            .unwrap();
        assert_eq!(engine.move_log().len(), 1);
        assert_eq!(engine.turn_clock_state().phase, ClockPhase::Idle);

        let classifier = Classifier::replay([moved(&start, "e2", "e4")]);
        let engine = run(Reconciler::default(), classifier, &Config::default(), options, input("sample\nrestart\nquit\n"))
            .await
            .unwrap();
        assert!(engine.move_log().is_empty());
        assert_eq!(engine.current_snapshot(), &BoardSnapshot::starting_position());
        assert_eq!(engine.turn_clock_state().phase, ClockPhase::Running(Side::White));
    }
}
