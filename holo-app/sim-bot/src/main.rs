use std::{cell::RefCell, f64::consts::PI, path::PathBuf, process::ExitCode, rc::Rc};

use clap::Parser;
use holo_core::utils::{
    actions::{ActionBuilder, Scheduler},
    config::{DriveConfig, FeedbackGains, Feedforward, MechanismConfig, RobotConfig},
    controllers::{
        drive::{DriveDiagnostics, MecanumDrive},
        mechanism::{Mechanism, MechanismReport},
    },
    hal::{Clock, ManualClock},
    math::geometry::{Pose2d, Vector2d},
    tuning::{TuningCommand, TUNING_CHANNEL},
    Duration,
};
use serde::Serialize;
use tracing::{error, info, warn};

mod plant;

use plant::{Plant, SimChassis, SimLift};

#[derive(Parser)]
#[clap(version = "1.0")]
struct Opts {
    /// JSON robot configuration; built-in defaults when omitted
    #[clap(long)]
    config: Option<PathBuf>,
    /// control loop rate in Hz
    #[clap(long, default_value_t = 50)]
    hz: u32,
    /// give up after this many cycles
    #[clap(long, default_value_t = 3000)]
    max_cycles: u32,
    /// print telemetry every N cycles
    #[clap(long, default_value_t = 10)]
    report_every: u32,
    /// sleep between cycles so the run takes wall-clock time
    #[clap(long)]
    realtime: bool,
    /// tuning command (JSON, tag "tc") queued before the first cycle
    #[clap(long)]
    tune: Vec<String>,
}

/// One telemetry line.
#[derive(Serialize)]
struct Telemetry<'a> {
    cycle: u64,
    actions: usize,
    t: f64,
    drive: &'a DriveDiagnostics,
    lift: Option<&'a MechanismReport>,
}

fn default_config() -> RobotConfig {
    RobotConfig {
        drive: DriveConfig {
            in_per_tick: 0.01,
            lateral_in_per_tick: 0.01,
            track_width_ticks: 1400.0,
            feedforward: Feedforward {
                k_s: 0.0,
                k_v: 0.2,
                k_a: 0.005,
            },
            gains: FeedbackGains {
                axial: 4.0,
                lateral: 4.0,
                heading: 4.0,
                axial_vel: 0.1,
                lateral_vel: 0.1,
                heading_vel: 0.1,
            },
            ..DriveConfig::default()
        },
        mechanisms: vec![
            MechanismConfig::new("lift", 0.0, 2400.0)
                .with_idle_power(0.1)
                .with_timeout(Duration::from_secs(3)),
        ],
        ..RobotConfig::default()
    }
}

fn load_config(opts: &Opts) -> Result<RobotConfig, String> {
    let Some(path) = &opts.config else {
        return Ok(default_config());
    };
    let text = std::fs::read_to_string(path).map_err(|e| format!("{}: {}", path.display(), e))?;
    RobotConfig::from_json(&text).map_err(|e| format!("{}: {}", path.display(), e))
}

fn queue_tuning(commands: &[String]) -> Result<(), String> {
    for text in commands {
        let command = TuningCommand::from_json(text).map_err(|e| e.to_string())?;
        TUNING_CHANNEL
            .try_send(command)
            .map_err(|_| String::from("tuning channel full"))?;
    }
    Ok(())
}

fn main() -> ExitCode {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .init();

    let opts: Opts = Opts::parse();
    let config = match load_config(&opts) {
        Ok(config) => config,
        Err(e) => {
            error!("Failed to load config: {}", e);
            return ExitCode::FAILURE;
        }
    };
    if let Err(e) = queue_tuning(&opts.tune) {
        error!("Bad tuning command: {}", e);
        return ExitCode::FAILURE;
    }
    let lift_config = config
        .mechanism("lift")
        .cloned()
        .unwrap_or_else(|| MechanismConfig::new("lift", 0.0, 2400.0));

    let plant = Rc::new(RefCell::new(Plant::new(
        config.drive.kinematics(),
        config.drive.in_per_tick,
    )));
    let clock = ManualClock::new();
    let dt = Duration::from_micros(1_000_000 / u64::from(opts.hz.max(1)));

    let drive = MecanumDrive::new(
        config.drive,
        SimChassis(plant.clone()),
        SimChassis(plant.clone()),
        &clock,
        Pose2d::default(),
    );
    let lift = Mechanism::new(lift_config, SimLift(plant.clone()), &clock);

    let (raise, lower) = match (lift.move_to(0.9, 1800.0), lift.move_to(0.6, 0.0)) {
        (Ok(raise), Ok(lower)) => (raise, lower),
        (Err(e), _) | (_, Err(e)) => {
            error!("Lift motion rejected: {}", e);
            return ExitCode::FAILURE;
        }
    };
    let path = drive
        .action_builder(drive.pose())
        .strafe_to(Vector2d::new(24.0, 0.0))
        .turn(PI / 2.0)
        .strafe_to_linear_heading(Vector2d::new(24.0, 24.0), PI)
        .build();
    let routine = ActionBuilder::new()
        .parallel(|p| p.then(raise).then(path))
        .instant(|| info!("Scoring position reached"))
        .wait(&clock, Duration::from_millis(500))
        .then(lower)
        .then(lift.reset_encoder())
        .build();

    let mut scheduler = Scheduler::new();
    scheduler.add(routine.labeled("auto"));

    info!(hz = opts.hz, "Starting control loop");
    while scheduler.cycles() < u64::from(opts.max_cycles) && !scheduler.is_idle() {
        drive.apply_pending_tuning();
        if let Err(e) = scheduler.poll() {
            error!("Routine aborted: {}", e);
        }
        if drive.diagnostics().target.is_none() {
            if let Err(e) = drive.update_pose_estimate() {
                warn!("Pose update failed: {:?}", e);
            }
        }
        let report = lift.report().map_err(|e| warn!("Lift report failed: {:?}", e)).ok();

        let cycle = scheduler.cycles();
        if cycle % u64::from(opts.report_every.max(1)) == 0 {
            let diagnostics = drive.diagnostics();
            let telemetry = Telemetry {
                cycle,
                actions: scheduler.len(),
                t: clock.now().as_micros() as f64 / 1e6,
                drive: &diagnostics,
                lift: report.as_ref(),
            };
            match serde_json::to_string(&telemetry) {
                Ok(line) => info!("{}", line),
                Err(e) => warn!("Telemetry serialization failed: {}", e),
            }
        }

        plant.borrow_mut().step(dt.as_micros() as f64 / 1e6);
        clock.advance(dt);
        if opts.realtime {
            std::thread::sleep(std::time::Duration::from_micros(dt.as_micros()));
        }
    }

    if let Err(e) = drive.stop() {
        error!("Failed to stop drive: {:?}", e);
    }
    let pose = drive.pose();
    info!(
        cycles = scheduler.cycles(),
        x = pose.position.x,
        y = pose.position.y,
        heading = pose.heading.log(),
        "Routine finished"
    );
    if scheduler.is_idle() {
        ExitCode::SUCCESS
    } else {
        warn!("Gave up after {} cycles", scheduler.cycles());
        ExitCode::FAILURE
    }
}
