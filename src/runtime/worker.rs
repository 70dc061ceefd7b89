//! Worker threads.
//!
//! Each worker loops: take a ready task (own queue first, then steal),
//! acquire its atomic lock set inside the state critical section, run the
//! body with the lock released, then re-enter the critical section to
//! record completion. Task bodies that panic are caught and reported as
//! execution failures; they never take a worker down.

use super::Inner;
use crate::error::TaskFailure;
use crate::runtime::state::StoredBody;
use parking_lot::MutexGuard;
use std::panic::{AssertUnwindSafe, catch_unwind};
use std::sync::Arc;

pub(crate) fn run(inner: &Arc<Inner>, index: usize) {
    let mut guard = inner.state.lock();
    loop {
        if let Some(task) = inner.pop_task(index) {
            if let Some(body) = inner.try_start(&mut guard, task) {
                let result = MutexGuard::unlocked(&mut guard, || run_body(body));
                inner.complete_task(&mut guard, task, result);
            }
            continue;
        }
        if guard.shutdown && guard.live == 0 {
            break;
        }
        inner.worker_cv.wait(&mut guard);
    }
}

fn run_body(body: StoredBody) -> Result<(), TaskFailure> {
    match catch_unwind(AssertUnwindSafe(|| body.run())) {
        Ok(result) => result,
        Err(payload) => Err(TaskFailure::new(panic_message(payload.as_ref()))),
    }
}

fn panic_message(payload: &(dyn std::any::Any + Send)) -> String {
    if let Some(message) = payload.downcast_ref::<&str>() {
        (*message).to_string()
    } else if let Some(message) = payload.downcast_ref::<String>() {
        message.clone()
    } else {
        "task body panicked".to_string()
    }
}
