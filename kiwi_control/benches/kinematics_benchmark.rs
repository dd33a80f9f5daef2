//! Kinematics and odometry micro-benchmarks.
//!
//! The forward/inverse transforms and the pose integration run three
//! times per tick each; they must stay trivially cheap.

use criterion::{Criterion, criterion_group, criterion_main};

use kiwi_common::frame::{BodyVector, Pose, WheelVector};
use kiwi_control::kinematics::Kinematics;
use kiwi_control::odometry;

fn bench_inverse(c: &mut Criterion) {
    let geometry = Kinematics::new(0.05, 0.15);
    let mut cycle = 0_u64;

    c.bench_function("inverse_kinematics", |b| {
        b.iter(|| {
            cycle += 1;
            let t = cycle as f64 * 0.01;
            geometry.inverse(&BodyVector::new(0.3 * t.sin(), 0.2 * t.cos(), t.sin()))
        });
    });
}

fn bench_forward(c: &mut Criterion) {
    let geometry = Kinematics::new(0.05, 0.15);
    let mut cycle = 0_u64;

    c.bench_function("forward_kinematics", |b| {
        b.iter(|| {
            cycle += 1;
            let t = cycle as f64 * 0.01;
            geometry.forward(&WheelVector::new(t.sin(), t.cos(), -t.sin()))
        });
    });
}

fn bench_odometry(c: &mut Criterion) {
    let mut pose = Pose::ORIGIN;
    let displacement = BodyVector::new(0.002, 0.001, 0.003);

    c.bench_function("odometry_advance", |b| {
        b.iter(|| {
            pose = odometry::advance(&pose, &displacement);
            pose
        });
    });
}

criterion_group!(benches, bench_inverse, bench_forward, bench_odometry);
criterion_main!(benches);
