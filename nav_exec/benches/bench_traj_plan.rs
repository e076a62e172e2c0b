//! # Trajectory Planning Benchmark

use criterion::{black_box, criterion_group, criterion_main, Criterion};

use nav_lib::{
    loc::{Pose2D, Velocity2D},
    traj_gen::{PlannerParams, TrajPlanner},
};

fn traj_plan_benchmark(c: &mut Criterion) {
    let planner = TrajPlanner::new(PlannerParams {
        max_combined_vel: 1.0,
        sample_rate_hz: 50.0,
        time_step_s: 0.1,
        max_horizon_s: 600.0,
    });

    let start = Pose2D::new(0.0, 0.0, 0.0);

    // Short hop, accepted within a few iterations
    c.bench_function("plan_short", |b| {
        b.iter(|| {
            planner.plan(
                black_box(&start),
                black_box(&Velocity2D::zero()),
                black_box(&Pose2D::new(0.5, 0.2, 0.1)),
            )
        })
    });

    // Long diagonal with a large turn, the search runs for many iterations
    c.bench_function("plan_long_turn", |b| {
        b.iter(|| {
            planner.plan(
                black_box(&start),
                black_box(&Velocity2D::new(0.2, 0.1, 0.0)),
                black_box(&Pose2D::new(8.0, -6.0, 3.0)),
            )
        })
    });
}

criterion_group!(benches, traj_plan_benchmark);
criterion_main!(benches);
