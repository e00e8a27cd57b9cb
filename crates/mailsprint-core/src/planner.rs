//! Task planner - Deterministic multi-day delivery planning
//!
//! Pure schedule computation: no I/O, no clock access. Senders are
//! partitioned into groups of the per-recipient diversity cap and the
//! groups are executed serially, one after the other, so that on any
//! single day a recipient hears from at most `emails_per_recipient_per_day`
//! distinct senders.

use chrono::NaiveTime;
use mailsprint_common::types::{GroupTailPolicy, RecipientId, SenderId};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use tracing::error;

/// Planner input.
///
/// Validity (non-empty senders, non-empty recipients, positive rates) is
/// the caller's responsibility; planning itself is total.
#[derive(Debug, Clone)]
pub struct PlanParams {
    pub sender_ids: Vec<SenderId>,
    /// Blacklist-excluded recipient population, in index order
    pub recipient_ids: Vec<RecipientId>,
    /// Emails per hour per sender; fractional values are supported and
    /// round up to at least one slot per working hour
    pub emails_per_hour: f64,
    /// Maximum distinct senders reaching one recipient per calendar day
    pub emails_per_recipient_per_day: u32,
    /// Working hours per day (1..=24)
    pub working_hours: u32,
    pub group_tail: GroupTailPolicy,
}

/// Group arithmetic summary
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GroupInfo {
    pub total_groups: u32,
    pub days_per_group: u32,
    pub senders_per_group: u32,
    pub sender_daily_capacity: u32,
}

/// One sender's assignments for one day.
///
/// `recipient_ids` and `planned_times` are index-aligned; the planner
/// guarantees equal length.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SenderDaySchedule {
    pub sender_id: SenderId,
    pub recipient_ids: Vec<RecipientId>,
    pub planned_times: Vec<NaiveTime>,
}

/// All assignments for one plan day (1-indexed)
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DaySchedule {
    pub day: u32,
    pub per_sender: Vec<SenderDaySchedule>,
    pub total_for_day: usize,
}

/// Immutable planner output
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Plan {
    pub total_emails: usize,
    pub calculated_days: u32,
    pub group_info: GroupInfo,
    pub daily_schedule: Vec<DaySchedule>,
    /// Sparse seed: only (recipient, sender) pairs actually scheduled on
    /// some day, deduplicated
    pub status_matrix_seed: Vec<(RecipientId, SenderId)>,
}

impl Plan {
    /// First per-sender day whose recipient and time lists disagree in
    /// length, if any. The scheduler refuses such plans outright.
    pub fn alignment_error(&self) -> Option<String> {
        for day in &self.daily_schedule {
            for per_sender in &day.per_sender {
                if per_sender.recipient_ids.len() != per_sender.planned_times.len() {
                    return Some(format!(
                        "day {} sender {}: {} recipients vs {} planned times",
                        day.day,
                        per_sender.sender_id,
                        per_sender.recipient_ids.len(),
                        per_sender.planned_times.len()
                    ));
                }
            }
        }
        None
    }
}

/// Compute a delivery plan. Total for any input; empty senders or
/// recipients yield an empty plan.
pub fn plan(params: &PlanParams) -> Plan {
    let n = params.recipient_ids.len();
    let r = params.emails_per_recipient_per_day.max(1) as usize;
    let hours = params.working_hours.clamp(1, 24);
    let capacity = sender_daily_capacity(params.emails_per_hour, hours);
    let per_hour = hourly_quota(params.emails_per_hour);

    let groups = build_groups(&params.sender_ids, r, params.group_tail);
    let days_per_group = if n == 0 { 0 } else { div_ceil(n, capacity) };
    let calculated_days = groups.len() * days_per_group;

    let mut daily_schedule = Vec::with_capacity(calculated_days);
    let mut seed = Vec::new();
    let mut seen = HashSet::new();
    let mut total_emails = 0;

    for day in 1..=calculated_days {
        let group = &groups[(day - 1) / days_per_group];
        let day_in_group = (day - 1) % days_per_group;
        let lo = day_in_group * capacity;
        let hi = ((day_in_group + 1) * capacity).min(n);
        let recipients = &params.recipient_ids[lo..hi];

        let mut per_sender = Vec::with_capacity(group.len());
        for &sender_id in group {
            let planned_times = slot_times(recipients.len(), per_hour, hours);
            if planned_times.len() != recipients.len() {
                // slot_times repairs its own length, so this is unreachable
                // unless the slotting logic regresses
                error!(
                    day,
                    sender = %sender_id,
                    recipients = recipients.len(),
                    times = planned_times.len(),
                    "planned time count does not match recipient count"
                );
            }

            for &recipient_id in recipients {
                if seen.insert((recipient_id, sender_id)) {
                    seed.push((recipient_id, sender_id));
                }
            }
            total_emails += recipients.len();

            per_sender.push(SenderDaySchedule {
                sender_id,
                recipient_ids: recipients.to_vec(),
                planned_times,
            });
        }

        let total_for_day = per_sender.iter().map(|s| s.recipient_ids.len()).sum();
        daily_schedule.push(DaySchedule {
            day: day as u32,
            per_sender,
            total_for_day,
        });
    }

    Plan {
        total_emails,
        calculated_days: calculated_days as u32,
        group_info: GroupInfo {
            total_groups: groups.len() as u32,
            days_per_group: days_per_group as u32,
            senders_per_group: r as u32,
            sender_daily_capacity: capacity as u32,
        },
        daily_schedule,
        status_matrix_seed: seed,
    }
}

/// `ceil(emails_per_hour * working_hours)`, at least 1
fn sender_daily_capacity(emails_per_hour: f64, working_hours: u32) -> usize {
    ((emails_per_hour * working_hours as f64).ceil() as usize).max(1)
}

/// Slots emitted per working hour: `ceil(emails_per_hour)`, at least 1
fn hourly_quota(emails_per_hour: f64) -> usize {
    (emails_per_hour.ceil() as usize).max(1)
}

fn div_ceil(a: usize, b: usize) -> usize {
    (a + b - 1) / b
}

/// Partition senders into groups of `r` in input order. Under `Wrap` the
/// tail group is padded from the head of the list (skipping senders
/// already in the group); under `Short` it stays under-sized.
fn build_groups(senders: &[SenderId], r: usize, tail: GroupTailPolicy) -> Vec<Vec<SenderId>> {
    if senders.is_empty() {
        return Vec::new();
    }

    let total = div_ceil(senders.len(), r);
    let mut groups = Vec::with_capacity(total);
    for g in 0..total {
        let group = match tail {
            GroupTailPolicy::Wrap => {
                let mut group = Vec::with_capacity(r);
                for j in 0..r {
                    let id = senders[(g * r + j) % senders.len()];
                    if !group.contains(&id) {
                        group.push(id);
                    }
                }
                group
            }
            GroupTailPolicy::Short => {
                senders[g * r..(g * r + r).min(senders.len())].to_vec()
            }
        };
        groups.push(group);
    }
    groups
}

/// Emit `k` minute-of-day stamps, distributing the hourly quota evenly
/// inside each working hour and filling hour by hour. The result is
/// non-decreasing and always exactly `k` long.
fn slot_times(k: usize, per_hour: usize, working_hours: u32) -> Vec<NaiveTime> {
    let mut times = Vec::with_capacity(k);
    'hours: for hour in 0..working_hours {
        for i in 0..per_hour {
            if times.len() == k {
                break 'hours;
            }
            let minute = (i * 60 / per_hour) as u32;
            times.push(NaiveTime::from_hms_opt(hour, minute, 0).unwrap_or(NaiveTime::MIN));
        }
    }
    // The capacity arithmetic keeps k below per_hour * working_hours;
    // clamp into the last emitted minute if that ever stops holding.
    while times.len() < k {
        times.push(times.last().copied().unwrap_or(NaiveTime::MIN));
    }
    times
}

#[cfg(test)]
mod tests {
    use super::*;
    use uuid::Uuid;

    fn ids(n: usize) -> Vec<Uuid> {
        (0..n).map(|_| Uuid::new_v4()).collect()
    }

    fn params(
        senders: usize,
        recipients: usize,
        per_hour: f64,
        diversity: u32,
        hours: u32,
    ) -> PlanParams {
        PlanParams {
            sender_ids: ids(senders),
            recipient_ids: ids(recipients),
            emails_per_hour: per_hour,
            emails_per_recipient_per_day: diversity,
            working_hours: hours,
            group_tail: GroupTailPolicy::Wrap,
        }
    }

    #[test]
    fn test_six_senders_thirty_recipients_serial_groups() {
        let p = params(6, 30, 1.0, 2, 24);
        let plan = plan(&p);

        assert_eq!(plan.calculated_days, 6);
        assert_eq!(plan.group_info.total_groups, 3);
        assert_eq!(plan.group_info.days_per_group, 2);
        assert_eq!(plan.group_info.sender_daily_capacity, 24);
        assert_eq!(plan.status_matrix_seed.len(), 180);
        assert_eq!(plan.total_emails, 180);
    }

    #[test]
    fn test_four_senders_single_day_groups() {
        let p = params(4, 30, 2.0, 2, 24);
        let plan = plan(&p);

        assert_eq!(plan.calculated_days, 2);
        assert_eq!(plan.group_info.total_groups, 2);
        assert_eq!(plan.group_info.days_per_group, 1);
        assert_eq!(plan.group_info.sender_daily_capacity, 48);
        assert_eq!(plan.status_matrix_seed.len(), 120);
        assert_eq!(plan.total_emails, 120);
    }

    #[test]
    fn test_fractional_hourly_rate_rounds_to_one_per_hour() {
        let p = params(6, 30, 0.5, 3, 24);
        let plan = plan(&p);

        // capacity ceil(0.5 * 24) = 12 -> 3 days per group, 2 groups
        assert_eq!(plan.group_info.sender_daily_capacity, 12);
        assert_eq!(plan.group_info.days_per_group, 3);
        assert_eq!(plan.group_info.total_groups, 2);
        assert_eq!(plan.calculated_days, 6);

        // at most one slot per hour
        use chrono::Timelike;
        for day in &plan.daily_schedule {
            for per_sender in &day.per_sender {
                let mut hours_used = HashSet::new();
                for t in &per_sender.planned_times {
                    assert!(hours_used.insert(t.hour()));
                }
            }
        }
    }

    #[test]
    fn test_diversity_cap_per_day() {
        let p = params(7, 50, 3.0, 2, 8);
        let plan = plan(&p);

        for day in &plan.daily_schedule {
            let mut senders_per_recipient: std::collections::HashMap<Uuid, HashSet<Uuid>> =
                std::collections::HashMap::new();
            for per_sender in &day.per_sender {
                for &recipient in &per_sender.recipient_ids {
                    senders_per_recipient
                        .entry(recipient)
                        .or_default()
                        .insert(per_sender.sender_id);
                }
            }
            for senders in senders_per_recipient.values() {
                assert!(senders.len() <= 2);
            }
        }
    }

    #[test]
    fn test_per_sender_daily_cap_and_alignment() {
        let p = params(5, 100, 3.0, 2, 8);
        let plan = plan(&p);
        let capacity = plan.group_info.sender_daily_capacity as usize;

        assert!(plan.alignment_error().is_none());
        for day in &plan.daily_schedule {
            for per_sender in &day.per_sender {
                assert!(per_sender.recipient_ids.len() <= capacity);
                assert_eq!(
                    per_sender.recipient_ids.len(),
                    per_sender.planned_times.len()
                );
            }
        }
    }

    #[test]
    fn test_completion_bound() {
        for (senders, recipients, per_hour, diversity, hours) in [
            (6, 30, 1.0_f64, 2_u32, 24_u32),
            (4, 30, 2.0, 2, 24),
            (9, 77, 1.5, 4, 10),
            (1, 1, 1.0, 1, 1),
        ] {
            let p = params(senders, recipients, per_hour, diversity, hours);
            let plan = plan(&p);
            let capacity = ((per_hour * hours as f64).ceil() as usize).max(1);
            let expected = div_ceil(senders, diversity as usize) as u32
                * div_ceil(recipients, capacity) as u32;
            assert_eq!(plan.calculated_days, expected);
        }
    }

    #[test]
    fn test_planned_times_non_decreasing() {
        let p = params(2, 60, 4.0, 2, 10);
        let plan = plan(&p);

        for day in &plan.daily_schedule {
            for per_sender in &day.per_sender {
                for pair in per_sender.planned_times.windows(2) {
                    assert!(pair[0] <= pair[1]);
                }
            }
        }
    }

    #[test]
    fn test_wrap_tail_reuses_head_senders() {
        let p = params(5, 10, 1.0, 2, 24);
        let plan = plan(&p);

        // groups: [s0 s1] [s2 s3] [s4 s0]
        assert_eq!(plan.group_info.total_groups, 3);
        let last_group_days: Vec<&DaySchedule> = plan
            .daily_schedule
            .iter()
            .filter(|d| d.day > 2 * plan.group_info.days_per_group)
            .collect();
        for day in last_group_days {
            assert_eq!(day.per_sender.len(), 2);
            assert_eq!(day.per_sender[0].sender_id, p.sender_ids[4]);
            assert_eq!(day.per_sender[1].sender_id, p.sender_ids[0]);
        }

        // wrapped coverage still yields the full sparse matrix
        assert_eq!(plan.status_matrix_seed.len(), 5 * 10);
    }

    #[test]
    fn test_short_tail_leaves_group_undersized() {
        let mut p = params(5, 10, 1.0, 2, 24);
        p.group_tail = GroupTailPolicy::Short;
        let plan = plan(&p);

        let last_day = plan.daily_schedule.last().unwrap();
        assert_eq!(last_day.per_sender.len(), 1);
        assert_eq!(last_day.per_sender[0].sender_id, p.sender_ids[4]);
    }

    #[test]
    fn test_fewer_senders_than_cap_does_not_duplicate() {
        let p = params(1, 5, 1.0, 3, 24);
        let plan = plan(&p);

        assert_eq!(plan.group_info.total_groups, 1);
        assert_eq!(plan.daily_schedule[0].per_sender.len(), 1);
        assert_eq!(plan.status_matrix_seed.len(), 5);
    }

    #[test]
    fn test_empty_recipients_yield_empty_plan() {
        let p = params(3, 0, 1.0, 2, 24);
        let plan = plan(&p);

        assert_eq!(plan.calculated_days, 0);
        assert_eq!(plan.total_emails, 0);
        assert!(plan.daily_schedule.is_empty());
        assert!(plan.status_matrix_seed.is_empty());
    }

    #[test]
    fn test_alignment_error_reports_mismatch() {
        let p = params(2, 10, 1.0, 2, 24);
        let mut plan = plan(&p);
        plan.daily_schedule[0].per_sender[0].planned_times.pop();

        let err = plan.alignment_error().unwrap();
        assert!(err.contains("9 planned times"));
    }
}
