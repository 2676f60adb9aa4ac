//! Adaptive decision for the next trial's target sequence.

use rand::Rng;

use tonespan_core::GRID_SIZE;

use crate::trial::Trial;

/// Failures at one target length that end a scenario.
pub const FAILURE_LIMIT: u32 = 3;

/// Decide the length and content of the next trial from the scenario's full
/// history. Returns the fresh trial and whether the scenario should finish
/// once that trial completes.
///
/// Length moves +1 after a success and -1 (floored at 1) after a failure. The
/// finish flag is raised on the first trial, scanned chronologically, whose
/// failure brings its length's running count to [`FAILURE_LIMIT`]. Note that
/// the trial returned alongside a raised flag still runs: one more trial
/// always follows the threshold crossing.
pub fn next_trial<R: Rng>(history: &[Trial], rng: &mut R) -> (Trial, bool) {
    let Some(last) = history.last() else {
        return (Trial::new(vec![rng.random_range(0..GRID_SIZE)]), false);
    };

    let mut finishing = false;
    let mut failures_per_length = vec![0u32; 2];
    for trial in history {
        let length = trial.length();
        if failures_per_length.len() <= length {
            failures_per_length.resize(length + 1, 0);
        }
        if !trial.is_correct() {
            failures_per_length[length] += 1;
            if failures_per_length[length] >= FAILURE_LIMIT {
                finishing = true;
                break;
            }
        }
    }

    let next_length = if last.is_correct() {
        last.length() + 1
    } else {
        (last.length() - 1).max(1)
    };
    let target = (0..next_length)
        .map(|_| rng.random_range(0..GRID_SIZE))
        .collect();

    (Trial::new(target), finishing)
}

#[cfg(test)]
mod tests {
    use super::{next_trial, FAILURE_LIMIT};
    use crate::trial::Trial;
    use rand::rngs::StdRng;
    use rand::SeedableRng;
    use tonespan_core::GRID_SIZE;

    fn rng() -> StdRng {
        StdRng::seed_from_u64(17)
    }

    fn passed(length: usize) -> Trial {
        let target: Vec<usize> = (0..length).map(|n| n % GRID_SIZE).collect();
        let mut trial = Trial::new(target.clone());
        trial.observed = target;
        trial
    }

    fn failed(length: usize) -> Trial {
        let mut trial = passed(length);
        trial.observed[0] = (trial.target[0] + 1) % GRID_SIZE;
        trial
    }

    #[test]
    fn first_trial_has_length_one() {
        let (trial, finishing) = next_trial(&[], &mut rng());
        assert_eq!(trial.length(), 1);
        assert!(trial.target[0] < GRID_SIZE);
        assert!(!finishing);
    }

    #[test]
    fn success_grows_length_by_one() {
        let history = vec![passed(1), passed(2), passed(3)];
        let (trial, finishing) = next_trial(&history, &mut rng());
        assert_eq!(trial.length(), 4);
        assert!(!finishing);
    }

    #[test]
    fn failure_shrinks_length_by_one() {
        let history = vec![passed(1), passed(2), failed(3)];
        let (trial, _) = next_trial(&history, &mut rng());
        assert_eq!(trial.length(), 2);
    }

    #[test]
    fn failure_at_length_one_stays_at_one() {
        let history = vec![failed(1)];
        let (trial, _) = next_trial(&history, &mut rng());
        assert_eq!(trial.length(), 1);
    }

    #[test]
    fn targets_stay_on_the_grid() {
        let history = vec![passed(1), passed(2), passed(3), passed(4)];
        let (trial, _) = next_trial(&history, &mut rng());
        assert!(trial.target.iter().all(|&i| i < GRID_SIZE));
    }

    #[test]
    fn finishes_when_one_length_accumulates_three_failures() {
        let mut history = Vec::new();
        for n in 0..FAILURE_LIMIT {
            history.push(failed(1));
            let (_, finishing) = next_trial(&history, &mut rng());
            assert_eq!(finishing, n + 1 >= FAILURE_LIMIT, "after {} failures", n + 1);
        }
    }

    #[test]
    fn failures_at_different_lengths_do_not_accumulate() {
        // 1 fail at 2, bounce between lengths: no single bucket reaches three.
        let history = vec![passed(1), failed(2), failed(1), passed(1), failed(2)];
        let (_, finishing) = next_trial(&history, &mut rng());
        assert!(!finishing);
    }

    #[test]
    fn threshold_scan_is_chronological() {
        // Length 1 reaches three failures before length 2 ever could.
        let history = vec![failed(1), failed(1), failed(1), failed(2), failed(2), failed(2)];
        let (trial, finishing) = next_trial(&history, &mut rng());
        assert!(finishing);
        // Last trial failed at length 2, so the next one shrinks to 1.
        assert_eq!(trial.length(), 1);
    }
}
