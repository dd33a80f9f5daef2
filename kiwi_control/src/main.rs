//! # Kiwi Control
//!
//! Runs the motion-control loop against the simulation backend: three
//! first-order motor models stand in for the drive hardware while the
//! full wheel-PID → odometry → scheduler → kinematics tick runs at the
//! configured period.

use std::path::PathBuf;

use clap::Parser;
use kiwi_common::frame::BodyVector;
use kiwi_common::params::RobotParams;
use kiwi_control::movements::IndefiniteMovement;
use kiwi_control::robot::Robot;
use kiwi_control::wheel::Wheel;
use kiwi_hal::clock::MonotonicClock;
use kiwi_hal::sim::{SimMotor, SimMotorConfig};
use tracing::info;
use tracing_subscriber::EnvFilter;

#[derive(Debug, Parser)]
#[command(about = "Kiwi-drive control loop (simulation backend)")]
struct Args {
    /// TOML parameter file; defaults apply when omitted.
    #[arg(long)]
    config: Option<PathBuf>,

    /// Control loop period [ms].
    #[arg(long, default_value_t = 10)]
    cycle_ms: u64,

    /// Commanded forward speed [m/s].
    #[arg(long, default_value_t = 0.2)]
    forward: f64,

    /// Commanded strafe speed [m/s].
    #[arg(long, default_value_t = 0.0)]
    strafe: f64,

    /// Commanded angular speed [rad/s].
    #[arg(long, default_value_t = 0.0)]
    theta: f64,

    /// Stop after this many cycles (run forever when omitted).
    #[arg(long)]
    cycles: Option<u64>,
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .init();

    let args = Args::parse();

    let params = match &args.config {
        Some(path) => RobotParams::load(path)?,
        None => RobotParams::default(),
    };

    let motor_config = SimMotorConfig {
        max_speed: params.max_wheel_speed,
        ..SimMotorConfig::default()
    };
    let mut motors = [
        SimMotor::new(motor_config),
        SimMotor::new(motor_config),
        SimMotor::new(motor_config),
    ];
    let wheels = [
        Wheel::new(motors[0].pins(), motors[0].encoder()),
        Wheel::new(motors[1].pins(), motors[1].encoder()),
        Wheel::new(motors[2].pins(), motors[2].encoder()),
    ];

    let mut robot = Robot::new(wheels, MonotonicClock::new(), &params);
    robot.set_indefinite(IndefiniteMovement::Speed(BodyVector::new(
        args.forward,
        args.strafe,
        args.theta,
    )));

    info!(
        forward = args.forward,
        strafe = args.strafe,
        theta = args.theta,
        cycle_ms = args.cycle_ms,
        "control loop starting"
    );

    let cycle = std::time::Duration::from_millis(args.cycle_ms);
    let dt = cycle.as_secs_f64();
    let mut count = 0_u64;

    loop {
        let started = std::time::Instant::now();

        for motor in &mut motors {
            motor.step(dt);
        }
        robot.tick();

        count += 1;
        if count % 100 == 0 {
            let pose = robot.pose();
            info!(
                cycle = count,
                x = %format_args!("{:.3}", pose.x),
                y = %format_args!("{:.3}", pose.y),
                phi = %format_args!("{:.3}", pose.phi),
                halted = robot.is_halted(),
                "pose"
            );
        }
        if let Some(limit) = args.cycles {
            if count >= limit {
                break;
            }
        }

        if let Some(remaining) = cycle.checked_sub(started.elapsed()) {
            std::thread::sleep(remaining);
        }
    }

    let pose = robot.pose();
    info!(x = pose.x, y = pose.y, phi = pose.phi, "final pose");
    Ok(())
}
