// quote-along: terminal front end for the timing engine.

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use log::{info, warn};

use quote_along::app::{Pipeline, RealtimeRunner, replay, spawn_stdin_reader};
use quote_along::config::{AppConfig, CONFIG_FILE, Settings};
use quote_along::input::InputLogger;
use quote_along::playback::LogMedia;
use quote_along::score::{HttpScoreService, NullScoreService, ScoreService};
use quote_along::session::{LogObserver, Session};
use quote_along::traits::SystemClock;
use quote_along::util::init_logging;

#[derive(Parser, Debug)]
#[command(name = "quote-along", about = "Press along with a scripted clip")]
struct Cli {
    /// Path to the application config JSON file.
    #[arg(long, default_value = CONFIG_FILE)]
    config: PathBuf,

    /// Settings file with the script, controls and scoring.
    #[arg(long, global = true)]
    settings: Option<PathBuf>,

    /// Name sent along with score submissions.
    #[arg(long, global = true)]
    nickname: Option<String>,

    /// Base URL of the score server.
    #[arg(long, global = true, env = "QUOTE_ALONG_SERVER")]
    server: Option<String>,

    #[arg(short, long, global = true)]
    verbose: bool,

    #[arg(long, global = true)]
    log_file: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Play in the terminal: `+49` presses code 49, `-49` releases it, `49` taps it.
    Play {
        /// Save the raw input log here when the session ends.
        #[arg(long)]
        record: Option<PathBuf>,
    },
    /// Replay a recorded input log offline and print the outcome.
    Replay {
        inputs: PathBuf,
        /// Stop at this many milliseconds after start.
        #[arg(long)]
        horizon: Option<i64>,
    },
    /// Validate a settings file.
    Check,
}

impl Cli {
    fn merge_into(&self, config: &mut AppConfig) {
        if let Some(path) = &self.settings {
            config.settings_path = path.clone();
        }
        if let Some(nickname) = &self.nickname {
            config.nickname = Some(nickname.clone());
        }
        if let Some(server) = &self.server {
            config.score_server_url = Some(server.clone());
        }
        if let Some(log_file) = &self.log_file {
            config.log_file = Some(log_file.clone());
        }
        config.verbose |= self.verbose;
    }
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    let mut config = AppConfig::load_from(&cli.config)?;
    cli.merge_into(&mut config);
    init_logging(config.log_file.as_deref(), config.verbose)?;

    match cli.command {
        Command::Play { record } => cmd_play(config, record),
        Command::Replay { inputs, horizon } => cmd_replay(&config, &inputs, horizon),
        Command::Check => cmd_check(&config),
    }
}

#[derive(Default)]
struct Bootstrap {
    config: AppConfig,
    settings: Option<Settings>,
    session: Option<Session<SystemClock>>,
}

impl Bootstrap {
    fn settings(&self) -> Result<&Settings> {
        self.settings.as_ref().context("Settings are not loaded")
    }

    fn session(&mut self) -> Result<&mut Session<SystemClock>> {
        self.session.as_mut().context("Session is not configured")
    }
}

fn cmd_play(config: AppConfig, record: Option<PathBuf>) -> Result<()> {
    let mut boot = Bootstrap {
        config,
        ..Bootstrap::default()
    };

    Pipeline::new()
        .step("load settings", |b: &mut Bootstrap| {
            b.settings = Some(Settings::load_from(&b.config.settings_path)?);
            Ok(())
        })
        .step("configure session", |b: &mut Bootstrap| {
            let settings = b.settings()?;
            let media = LogMedia::new(settings.media_source().map(str::to_string));
            let scores: Box<dyn ScoreService> = match &b.config.score_server_url {
                Some(url) => Box::new(HttpScoreService::new(url.as_str())?),
                None => Box::new(NullScoreService),
            };
            let mut session = Session::new(SystemClock::new(), Box::new(media), scores);
            session.load(settings)?;
            session.subscribe(Box::new(LogObserver));
            b.session = Some(session);
            Ok(())
        })
        .step("set nickname", |b: &mut Bootstrap| {
            if let Some(nickname) = b.config.nickname.clone() {
                b.session()?.set_nickname(nickname);
            }
            Ok(())
        })
        .step("load media", |b: &mut Bootstrap| {
            match b.settings()?.media_source() {
                Some(src) => info!("media source {}", src),
                None => warn!("settings name no media source, playing without video"),
            }
            Ok(())
        })
        .step("start", |b: &mut Bootstrap| {
            b.session()?.start()?;
            Ok(())
        })
        .run(&mut boot)?;

    let session = boot.session.context("Session is not configured")?;
    let signals = spawn_stdin_reader().context("Failed to read stdin")?;
    let mut runner = RealtimeRunner::new(session, signals);
    runner.run();

    let session = runner.into_session();
    let standing = session.standing();
    println!(
        "score {} (combo x{}), high score {}",
        standing.score, standing.combo_factor, standing.high_score
    );
    if let Some(path) = record {
        session.input_log().save_to(&path)?;
        info!("input log saved to {}", path.display());
    }
    Ok(())
}

fn cmd_replay(config: &AppConfig, inputs: &Path, horizon: Option<i64>) -> Result<()> {
    let settings = Settings::load_from(&config.settings_path)?;
    let inputs = InputLogger::load_from(inputs)?;
    let horizon = horizon.unwrap_or_else(|| {
        let last_input = inputs.iter().map(|i| i.time_ms).max().unwrap_or(0);
        let script_end = settings.script().duration_ms() + settings.tolerance_ms();
        last_input.max(script_end)
    });

    let report = replay(&settings, &inputs, horizon)?;
    println!("replayed {} inputs up to {}ms", inputs.len(), horizon);
    println!(
        "hits {}, misses {}, completed passes {}",
        report.successes, report.cancels, report.completed_passes
    );
    println!(
        "final score {}, combo x{}",
        report.final_score, report.combo_factor
    );
    for submission in &report.submissions {
        println!(
            "  failed at {} with {}",
            submission.failed_at, submission.final_score
        );
    }
    Ok(())
}

fn cmd_check(config: &AppConfig) -> Result<()> {
    let settings = Settings::load_from(&config.settings_path)?;
    let script = settings.script();
    let controls = settings.control_map()?;
    println!("{}: ok", config.settings_path.display());
    println!(
        "  {} events over {}ms, tolerance {}ms",
        script.len(),
        script.duration_ms(),
        settings.tolerance_ms()
    );
    for (id, label) in controls.controls() {
        if let Some(code) = controls.key_for(id) {
            println!("  control {} '{}' on {}", id, label, code);
        }
    }
    for (index, segment) in settings.segments().iter().enumerate() {
        println!(
            "  segment {}: {}ms..{}ms",
            index, segment.start_ms, segment.end_ms
        );
    }
    Ok(())
}
