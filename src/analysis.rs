//! Dependence analysis.
//!
//! Given a newly submitted launch and the set of in-flight tasks, computes
//! which prior tasks the new one must order after, and which per-field
//! mutual-exclusion locks it must hold while running. The conflict
//! predicate is an exhaustive match over privilege and coherence pairs so
//! the whole matrix is auditable in isolation from the scheduler.

use crate::launch::{Coherence, Privilege, RegionRequirement};
use crate::types::{FieldId, RegionId, TaskId};
use smallvec::SmallVec;

/// The obligation between two overlapping region requirements.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Dependence {
    /// No ordering or exclusion required; the pair may run concurrently.
    None,
    /// The later task must wait for the earlier one to complete.
    ProgramOrder,
    /// The pair may run in either order but never concurrently.
    MutualExclusion,
}

/// Classifies the obligation between two requirements on the same region
/// with a non-empty field intersection.
///
/// - Both read-only: no conflict, regardless of coherence.
/// - Both simultaneous: the runtime performs no ordering at all; the
///   caller's barriers are the only handshake.
/// - Both atomic (with a write involved): mutual exclusion, order free.
/// - Anything else with a write involved: strict program order. This
///   covers every pairing with an exclusive side, and simultaneous paired
///   with exclusive or atomic.
#[must_use]
pub fn classify(
    existing: (Privilege, Coherence),
    new: (Privilege, Coherence),
) -> Dependence {
    let (existing_privilege, existing_coherence) = existing;
    let (new_privilege, new_coherence) = new;

    if !existing_privilege.is_write() && !new_privilege.is_write() {
        return Dependence::None;
    }

    match (existing_coherence, new_coherence) {
        (Coherence::Simultaneous, Coherence::Simultaneous) => Dependence::None,
        (Coherence::Atomic, Coherence::Atomic) => Dependence::MutualExclusion,
        (
            Coherence::Exclusive | Coherence::Atomic | Coherence::Simultaneous,
            Coherence::Exclusive | Coherence::Atomic | Coherence::Simultaneous,
        ) => Dependence::ProgramOrder,
    }
}

/// Returns true if the two field sets intersect.
#[must_use]
pub fn fields_overlap(a: &[FieldId], b: &[FieldId]) -> bool {
    a.iter().any(|field| b.contains(field))
}

/// Access mode of a per-field mutual-exclusion lock.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum LockMode {
    /// Held by any number of atomic readers.
    Shared,
    /// Held by exactly one atomic writer.
    Exclusive,
}

/// A per-field mutual-exclusion lock, keyed by region and field.
pub type FieldLockKey = (RegionId, FieldId);

/// The analyzer's output for one launch.
#[derive(Debug, Default)]
pub struct LaunchAnalysis {
    /// Tasks the new launch must wait for, deduplicated, in submission
    /// order. Readiness requires every one of them to reach a terminal
    /// state.
    pub predecessors: Vec<TaskId>,
    /// The atomic lock set: sorted ascending by key so acquisition follows
    /// a single fixed global order across all tasks, never piecemeal.
    pub atomic_locks: SmallVec<[(FieldLockKey, LockMode); 4]>,
}

/// Analyzes a new launch's requirements against the in-flight history.
///
/// `in_flight` must iterate previously submitted, not-yet-terminal tasks in
/// submission order. Every conflicting predecessor is recorded; a task
/// becomes ready only once all of them have resolved.
pub fn analyze<'a, I>(requirements: &[RegionRequirement], in_flight: I) -> LaunchAnalysis
where
    I: IntoIterator<Item = (TaskId, &'a [RegionRequirement])>,
{
    let mut analysis = LaunchAnalysis::default();

    for (task, prior_requirements) in in_flight {
        let conflicts = requirements.iter().any(|new| {
            prior_requirements.iter().any(|prior| {
                prior.region.id() == new.region.id()
                    && fields_overlap(&prior.fields, &new.fields)
                    && classify(
                        (prior.privilege, prior.coherence),
                        (new.privilege, new.coherence),
                    ) == Dependence::ProgramOrder
            })
        });
        if conflicts {
            analysis.predecessors.push(task);
        }
    }

    // The atomic lock set depends only on the launch's own requirements:
    // the locks also guard against atomic tasks submitted later.
    for requirement in requirements {
        if requirement.coherence != Coherence::Atomic {
            continue;
        }
        let mode = if requirement.privilege.is_write() {
            LockMode::Exclusive
        } else {
            LockMode::Shared
        };
        for &field in &requirement.fields {
            analysis.atomic_locks.push(((requirement.region.id(), field), mode));
        }
    }
    analysis.atomic_locks.sort();
    // A field requested both shared and exclusive keeps the exclusive
    // entry, which sorts last within the key.
    analysis.atomic_locks.dedup_by(|next, kept| {
        if next.0 == kept.0 {
            kept.1 = kept.1.max(next.1);
            true
        } else {
            false
        }
    });

    analysis
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    const PRIVILEGES: [Privilege; 3] =
        [Privilege::ReadOnly, Privilege::ReadWrite, Privilege::WriteDiscard];
    const COHERENCES: [Coherence; 3] =
        [Coherence::Exclusive, Coherence::Atomic, Coherence::Simultaneous];

    #[test]
    fn read_only_pairs_never_conflict() {
        for &cx in &COHERENCES {
            for &cy in &COHERENCES {
                assert_eq!(
                    classify((Privilege::ReadOnly, cx), (Privilege::ReadOnly, cy)),
                    Dependence::None,
                    "read-only pair under ({cx:?}, {cy:?})"
                );
            }
        }
    }

    #[test]
    fn simultaneous_writers_are_unordered() {
        assert_eq!(
            classify(
                (Privilege::WriteDiscard, Coherence::Simultaneous),
                (Privilege::ReadWrite, Coherence::Simultaneous),
            ),
            Dependence::None
        );
    }

    #[test]
    fn atomic_writers_mutually_exclude() {
        assert_eq!(
            classify(
                (Privilege::ReadWrite, Coherence::Atomic),
                (Privilege::ReadWrite, Coherence::Atomic),
            ),
            Dependence::MutualExclusion
        );
        // Atomic reader against atomic writer still excludes.
        assert_eq!(
            classify(
                (Privilege::ReadOnly, Coherence::Atomic),
                (Privilege::ReadWrite, Coherence::Atomic),
            ),
            Dependence::MutualExclusion
        );
    }

    #[test]
    fn exclusive_side_forces_program_order() {
        for &coherence in &COHERENCES {
            assert_eq!(
                classify(
                    (Privilege::ReadWrite, Coherence::Exclusive),
                    (Privilege::ReadWrite, coherence),
                ),
                Dependence::ProgramOrder,
                "exclusive writer against {coherence:?}"
            );
        }
    }

    #[test]
    fn simultaneous_against_atomic_orders() {
        assert_eq!(
            classify(
                (Privilege::ReadWrite, Coherence::Simultaneous),
                (Privilege::ReadWrite, Coherence::Atomic),
            ),
            Dependence::ProgramOrder
        );
    }

    #[test]
    fn overlap_requires_a_common_field() {
        use crate::types::FieldId;
        assert!(fields_overlap(&[FieldId(0), FieldId(1)], &[FieldId(1)]));
        assert!(!fields_overlap(&[FieldId(0)], &[FieldId(1)]));
        assert!(!fields_overlap(&[], &[FieldId(0)]));
    }

    proptest! {
        #[test]
        fn classification_is_symmetric(px in 0usize..3, cx in 0usize..3, py in 0usize..3, cy in 0usize..3) {
            let x = (PRIVILEGES[px], COHERENCES[cx]);
            let y = (PRIVILEGES[py], COHERENCES[cy]);
            prop_assert_eq!(classify(x, y), classify(y, x));
        }

        #[test]
        fn writes_without_simultaneous_pair_always_obligate(px in 0usize..3, cx in 0usize..3, py in 0usize..3, cy in 0usize..3) {
            let x = (PRIVILEGES[px], COHERENCES[cx]);
            let y = (PRIVILEGES[py], COHERENCES[cy]);
            let write_involved = x.0.is_write() || y.0.is_write();
            let both_simultaneous =
                x.1 == Coherence::Simultaneous && y.1 == Coherence::Simultaneous;
            if write_involved && !both_simultaneous {
                prop_assert_ne!(classify(x, y), Dependence::None);
            } else {
                prop_assert_eq!(classify(x, y), Dependence::None);
            }
        }
    }
}
