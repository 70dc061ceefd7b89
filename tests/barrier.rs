//! Phase-barrier contracts: triggering, generations, overuse, teardown.

use regent::{
    Coherence, Privilege, RegionRequirement, Runtime, RuntimeError, TaskError, TaskLauncher,
};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

fn exclusive_write(runtime: &Runtime) -> (regent::LogicalRegion, regent::FieldId) {
    let is = runtime.create_index_space(16);
    let fs = runtime.create_field_space();
    let field = runtime.allocate_field(fs, 8).expect("allocate field");
    let region = runtime.create_region(is, fs).expect("create region");
    (region, field)
}

fn write_requirement(
    region: regent::LogicalRegion,
    field: regent::FieldId,
) -> RegionRequirement {
    let mut req = RegionRequirement::new(region, Privilege::ReadWrite, Coherence::Exclusive, region);
    req.add_field(field);
    req
}

#[test]
fn generation_triggers_after_all_participants_arrive() {
    let runtime = Runtime::builder().workers(2).build();
    let barrier = runtime.create_phase_barrier(3);

    let ran = Arc::new(AtomicBool::new(false));
    let mut waiter = TaskLauncher::new({
        let ran = Arc::clone(&ran);
        move || {
            ran.store(true, Ordering::SeqCst);
            Ok(())
        }
    });
    waiter.add_wait_barrier(barrier);
    let waiter = runtime.submit(waiter).expect("submit waiter");

    runtime.arrive(barrier).expect("first arrival");
    runtime.arrive(barrier).expect("second arrival");
    std::thread::sleep(Duration::from_millis(30));
    assert!(
        !ran.load(Ordering::SeqCst),
        "waiter ran before the generation triggered"
    );

    runtime.arrive(barrier).expect("third arrival");
    runtime.wait_for(waiter).expect("waiter failed");
    assert!(ran.load(Ordering::SeqCst));
}

#[test]
fn wait_on_triggered_generation_does_not_block() {
    let runtime = Runtime::builder().workers(2).build();
    let barrier = runtime.create_phase_barrier(1);
    runtime.arrive(barrier).expect("arrival");

    let mut waiter = TaskLauncher::new(|| Ok(()));
    waiter.add_wait_barrier(barrier);
    let waiter = runtime.submit(waiter).expect("submit waiter");
    runtime.wait_for(waiter).expect("waiter failed");
}

#[test]
fn manual_over_arrival_is_rejected() {
    let runtime = Runtime::builder().workers(2).build();
    let barrier = runtime.create_phase_barrier(2);

    runtime.arrive(barrier).expect("first arrival");
    runtime.arrive(barrier).expect("second arrival");
    match runtime.arrive(barrier) {
        Err(RuntimeError::BarrierOveruse {
            generation,
            participants,
            ..
        }) => {
            assert_eq!(generation, 0);
            assert_eq!(participants, 2);
        }
        other => panic!("expected barrier overuse, got {other:?}"),
    }
}

#[test]
fn declared_over_arrival_fails_at_submission() {
    let runtime = Runtime::builder().workers(2).build();
    let barrier = runtime.create_phase_barrier(1);
    runtime.arrive(barrier).expect("arrival");

    // The generation already has its full complement; a declared launch
    // arrival must be refused synchronously, not when the task finishes.
    let mut launcher = TaskLauncher::new(|| Ok(()));
    launcher.add_arrival_barrier(barrier);
    match runtime.submit(launcher) {
        Err(RuntimeError::BarrierOveruse { generation, .. }) => assert_eq!(generation, 0),
        other => panic!("expected barrier overuse, got {other:?}"),
    }
}

#[test]
fn generations_advance_independently() {
    let runtime = Runtime::builder().workers(2).build();
    let gen0 = runtime.create_phase_barrier(1);
    let gen1 = gen0.advance();

    let ran = Arc::new(AtomicBool::new(false));
    let mut waiter = TaskLauncher::new({
        let ran = Arc::clone(&ran);
        move || {
            ran.store(true, Ordering::SeqCst);
            Ok(())
        }
    });
    waiter.add_wait_barrier(gen1);
    let waiter = runtime.submit(waiter).expect("submit waiter");

    // An arrival on generation 0 must not release a generation-1 waiter.
    runtime.arrive(gen0).expect("generation-0 arrival");
    std::thread::sleep(Duration::from_millis(30));
    assert!(!ran.load(Ordering::SeqCst), "generation-1 waiter released early");

    runtime.arrive(gen1).expect("generation-1 arrival");
    runtime.wait_for(waiter).expect("waiter failed");
}

#[test]
fn task_completion_commits_declared_arrivals() {
    let runtime = Runtime::builder().workers(2).build();
    let (region, field) = exclusive_write(&runtime);
    let barrier = runtime.create_phase_barrier(1);

    let mut arriver = TaskLauncher::new(|| Ok(()));
    arriver.add_region_requirement(write_requirement(region, field));
    arriver.add_arrival_barrier(barrier);
    let arriver = runtime.submit(arriver).expect("submit arriver");

    let mut waiter = TaskLauncher::new(|| Ok(()));
    waiter.add_wait_barrier(barrier);
    let waiter = runtime.submit(waiter).expect("submit waiter");

    runtime.wait_for(arriver).expect("arriver failed");
    runtime.wait_for(waiter).expect("waiter failed");
}

#[test]
fn aborted_task_still_arrives() {
    let runtime = Runtime::builder().workers(2).build();
    let (region, field) = exclusive_write(&runtime);
    let barrier = runtime.create_phase_barrier(1);

    let mut failing = TaskLauncher::new(|| Err("seed data missing".into()));
    failing.add_region_requirement(write_requirement(region, field));
    let failing = runtime.submit(failing).expect("submit failing");

    // Aborted before running, but its declared arrival must still be
    // committed or the waiter below would hang forever.
    let mut doomed = TaskLauncher::new(|| Ok(()));
    doomed.add_region_requirement(write_requirement(region, field));
    doomed.add_arrival_barrier(barrier);
    let doomed = runtime.submit(doomed).expect("submit doomed");

    let mut waiter = TaskLauncher::new(|| Ok(()));
    waiter.add_wait_barrier(barrier);
    let waiter = runtime.submit(waiter).expect("submit waiter");

    assert!(runtime.wait_for(failing).is_err());
    assert_eq!(runtime.wait_for(doomed), Err(TaskError::Aborted));
    runtime.wait_for(waiter).expect("waiter failed");
}

#[test]
fn destroy_refuses_in_use_barrier() {
    let runtime = Runtime::builder().workers(2).build();
    let barrier = runtime.create_phase_barrier(2);

    let ran = Arc::new(AtomicBool::new(false));
    let mut waiter = TaskLauncher::new({
        let ran = Arc::clone(&ran);
        move || {
            ran.store(true, Ordering::SeqCst);
            Ok(())
        }
    });
    waiter.add_wait_barrier(barrier);
    let waiter = runtime.submit(waiter).expect("submit waiter");

    assert_eq!(
        runtime.destroy_phase_barrier(barrier),
        Err(RuntimeError::UseAfterFree(regent::Resource::Barrier(
            barrier.id()
        )))
    );

    runtime.arrive(barrier).expect("first arrival");
    runtime.arrive(barrier).expect("second arrival");
    runtime.wait_for(waiter).expect("waiter failed");
    runtime
        .destroy_phase_barrier(barrier)
        .expect("destroy after quiescence");

    // Stale handle after destruction.
    assert!(matches!(
        runtime.arrive(barrier),
        Err(RuntimeError::StaleReference(_))
    ));
}
