use chrono::{DateTime, Utc};

use crate::models::Task;

/// Sets a task's progress and keeps the actual dates consistent with it.
///
/// - progress is clamped to 0..=100
/// - 100 stamps `actual_end_date` if it is not set yet
/// - anything below 100 clears `actual_end_date`
/// - anything above 0 stamps `actual_start_date` if it is not set yet
///
/// Every code path that changes progress goes through here.
pub fn apply_progress(task: &mut Task, progress: u8, now: DateTime<Utc>) {
    let progress = progress.min(100);
    task.progress = progress;
    if progress > 0 && task.actual_start_date.is_none() {
        task.actual_start_date = Some(now);
    }
    if progress == 100 {
        if task.actual_end_date.is_none() {
            task.actual_end_date = Some(now);
        }
    } else {
        task.actual_end_date = None;
    }
}

/// Moves progress by `delta` percentage points, saturating at the bounds.
pub fn step_progress(task: &mut Task, delta: i16, now: DateTime<Utc>) {
    let next = (task.progress as i16 + delta).clamp(0, 100) as u8;
    apply_progress(task, next, now);
}

/// Average progress over `tasks`, 0 for an empty slice.
pub fn overall_progress(tasks: &[Task]) -> u8 {
    if tasks.is_empty() {
        return 0;
    }
    let total: u32 = tasks.iter().map(|t| t.progress as u32).sum();
    (total as f64 / tasks.len() as f64).round() as u8
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    fn task() -> Task {
        serde_json::from_value(serde_json::json!({ "id": "t1", "name": "Wire up" })).unwrap()
    }

    #[test]
    fn completion_stamps_end_date() {
        let now = Utc::now();
        let mut t = task();
        apply_progress(&mut t, 100, now);
        assert_eq!(t.progress, 100);
        assert_eq!(t.actual_end_date, Some(now));
        assert_eq!(t.actual_start_date, Some(now));
    }

    #[test]
    fn reopening_clears_end_date() {
        let now = Utc::now();
        let mut t = task();
        apply_progress(&mut t, 100, now);
        apply_progress(&mut t, 90, now + Duration::hours(1));
        assert_eq!(t.actual_end_date, None);
        assert_eq!(t.actual_start_date, Some(now));
    }

    #[test]
    fn existing_end_date_is_kept_at_100() {
        let first = Utc::now() - Duration::days(2);
        let mut t = task();
        apply_progress(&mut t, 100, first);
        apply_progress(&mut t, 100, Utc::now());
        assert_eq!(t.actual_end_date, Some(first));
    }

    #[test]
    fn over_100_is_clamped() {
        let mut t = task();
        apply_progress(&mut t, 250, Utc::now());
        assert_eq!(t.progress, 100);
        assert!(t.actual_end_date.is_some());
    }

    #[test]
    fn stepping_saturates() {
        let now = Utc::now();
        let mut t = task();
        step_progress(&mut t, -10, now);
        assert_eq!(t.progress, 0);
        assert_eq!(t.actual_start_date, None);
        step_progress(&mut t, 95, now);
        step_progress(&mut t, 10, now);
        assert_eq!(t.progress, 100);
        assert!(t.actual_end_date.is_some());
    }

    #[test]
    fn average_rounds() {
        let mut a = task();
        let mut b = task();
        apply_progress(&mut a, 50, Utc::now());
        apply_progress(&mut b, 25, Utc::now());
        assert_eq!(overall_progress(&[a, b]), 38);
        assert_eq!(overall_progress(&[]), 0);
    }
}
