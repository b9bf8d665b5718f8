use chrono::{NaiveDate, NaiveDateTime, TimeZone, Timelike, Utc};
use chrono_tz::Tz;
use serde::Serialize;

use crate::models::{ServiceType, Ticket, User, TICKET_CALLED, TICKET_COMPLETED, TICKET_WAITING};

#[derive(Debug, Clone)]
pub struct MetricsFilter {
    pub date_start: NaiveDate,
    pub date_end: NaiveDate,
    pub service_type_id: Option<i32>,
    pub attendant_id: Option<i32>,
}

#[derive(Debug, Clone)]
pub struct Viewer {
    pub user_id: i32,
    pub is_admin: bool,
}

#[derive(Debug, Serialize)]
pub struct ServiceStat {
    pub service_type_id: i32,
    pub name: String,
    pub completed: i64,
    pub avg_wait_minutes: i64,
}

#[derive(Debug, Serialize)]
pub struct AttendantStat {
    pub user_id: i32,
    pub name: String,
    pub completed: i64,
}

#[derive(Debug, Serialize)]
pub struct QueueMetrics {
    pub total_all_time: i64,
    pub currently_serving: i64,
    pub avg_wait_minutes: i64,
    pub efficiency_percent: i64,
    pub service_stats: Vec<ServiceStat>,
    pub attendant_stats: Vec<AttendantStat>,
    pub hourly_counts: [i64; 24],
    pub max_hourly: i64,
    pub peak_hour: u32,
    pub peak_hour_count: i64,
}

/// Computes the queue dashboard statistics over an in-memory ticket snapshot.
///
/// Filters are applied in order: viewer restriction, service type, attendant,
/// date range. Timestamps are stored as UTC; the date range and hour buckets
/// are evaluated in the station timezone.
pub fn compute_queue_metrics(
    tickets: &[Ticket],
    service_types: &[ServiceType],
    users: &[User],
    filter: &MetricsFilter,
    viewer: &Viewer,
    tz: Tz,
) -> QueueMetrics {
    let filtered: Vec<&Ticket> = tickets
        .iter()
        // Non-admin viewers only ever see tickets they attended themselves
        .filter(|t| viewer.is_admin || t.attendant_user_id == Some(viewer.user_id))
        .filter(|t| {
            filter
                .service_type_id
                .map_or(true, |s| t.service_type_id == s)
        })
        .filter(|t| {
            filter
                .attendant_id
                .map_or(true, |a| t.attendant_user_id == Some(a))
        })
        .filter(|t| {
            let d = local_date(t.created_at, tz);
            d >= filter.date_start && d <= filter.date_end
        })
        .collect();

    let total = filtered.len() as i64;
    let total_all_time = filtered
        .iter()
        .filter(|t| t.status != TICKET_WAITING)
        .count() as i64;
    let currently_serving = filtered
        .iter()
        .filter(|t| t.status == TICKET_CALLED)
        .count() as i64;

    let waits: Vec<f64> = filtered.iter().filter_map(|t| wait_minutes(t)).collect();
    let avg_wait_minutes = round_mean(&waits);

    let efficiency_percent = if total == 0 {
        0
    } else {
        ((total_all_time as f64 / total as f64) * 100.0).round() as i64
    };

    let mut service_stats: Vec<ServiceStat> = service_types
        .iter()
        .map(|st| {
            let completed: Vec<&Ticket> = filtered
                .iter()
                .copied()
                .filter(|t| t.service_type_id == st.id && t.status == TICKET_COMPLETED)
                .collect();
            let waits: Vec<f64> = completed.iter().filter_map(|t| wait_minutes(t)).collect();
            ServiceStat {
                service_type_id: st.id,
                name: st.name.clone(),
                completed: completed.len() as i64,
                avg_wait_minutes: round_mean(&waits),
            }
        })
        .collect();
    // Stable sort: ties keep catalog order
    service_stats.sort_by(|a, b| b.completed.cmp(&a.completed));

    let mut attendant_stats: Vec<AttendantStat> = users
        .iter()
        .filter(|u| u.is_staff())
        .map(|u| AttendantStat {
            user_id: u.id,
            name: u.name.clone().unwrap_or_else(|| u.username.clone()),
            completed: filtered
                .iter()
                .filter(|t| {
                    t.attendant_user_id == Some(u.id) && t.status == TICKET_COMPLETED
                })
                .count() as i64,
        })
        .collect();
    attendant_stats.sort_by(|a, b| b.completed.cmp(&a.completed));

    let mut hourly_counts = [0i64; 24];
    for t in &filtered {
        hourly_counts[local_hour(t.created_at, tz) as usize] += 1;
    }

    // Floor at 1 so chart scaling never divides by zero
    let max_hourly = hourly_counts.iter().copied().max().unwrap_or(0).max(1);

    let mut peak_hour = 0u32;
    let mut peak_hour_count = 0i64;
    for (hour, &count) in hourly_counts.iter().enumerate() {
        // Strictly greater: the earliest hour wins ties
        if count > peak_hour_count {
            peak_hour = hour as u32;
            peak_hour_count = count;
        }
    }

    QueueMetrics {
        total_all_time,
        currently_serving,
        avg_wait_minutes,
        efficiency_percent,
        service_stats,
        attendant_stats,
        hourly_counts,
        max_hourly,
        peak_hour,
        peak_hour_count,
    }
}

fn local_date(ts: NaiveDateTime, tz: Tz) -> NaiveDate {
    Utc.from_utc_datetime(&ts).with_timezone(&tz).date_naive()
}

fn local_hour(ts: NaiveDateTime, tz: Tz) -> u32 {
    Utc.from_utc_datetime(&ts).with_timezone(&tz).hour()
}

/// Wait time in minutes for one ticket. Tickets that were never called, and
/// rows whose call timestamp is not strictly after creation, yield no sample.
fn wait_minutes(ticket: &Ticket) -> Option<f64> {
    let called_at = ticket.called_at?;
    let secs = (called_at - ticket.created_at).num_seconds();
    if secs > 0 {
        Some(secs as f64 / 60.0)
    } else {
        None
    }
}

fn round_mean(samples: &[f64]) -> i64 {
    if samples.is_empty() {
        return 0;
    }
    (samples.iter().sum::<f64>() / samples.len() as f64).round() as i64
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    fn dt(day: u32, hour: u32, min: u32) -> NaiveDateTime {
        NaiveDate::from_ymd_opt(2026, 3, day)
            .unwrap()
            .and_hms_opt(hour, min, 0)
            .unwrap()
    }

    fn ticket(
        id: i32,
        status: &str,
        service: i32,
        attendant: Option<i32>,
        created_at: NaiveDateTime,
        called_at: Option<NaiveDateTime>,
    ) -> Ticket {
        Ticket {
            id,
            number: format!("A{:03}", id),
            status: status.to_string(),
            service_type_id: service,
            attendant_user_id: attendant,
            created_at,
            called_at,
        }
    }

    fn service(id: i32, name: &str) -> ServiceType {
        ServiceType {
            id,
            name: name.to_string(),
            prefix: name[..1].to_string(),
            created_at: dt(1, 0, 0),
        }
    }

    fn user(id: i32, name: &str, role: &str) -> User {
        User {
            id,
            username: name.to_lowercase(),
            password_hash: String::new(),
            name: Some(name.to_string()),
            role: role.to_string(),
            desk_info: None,
            created_at: dt(1, 0, 0),
            updated_at: dt(1, 0, 0),
        }
    }

    fn admin() -> Viewer {
        Viewer {
            user_id: 1,
            is_admin: true,
        }
    }

    fn march_10() -> MetricsFilter {
        MetricsFilter {
            date_start: NaiveDate::from_ymd_opt(2026, 3, 10).unwrap(),
            date_end: NaiveDate::from_ymd_opt(2026, 3, 10).unwrap(),
            service_type_id: None,
            attendant_id: None,
        }
    }

    #[test]
    fn basic_scenario() {
        // One completed ticket with a 5 minute wait, one still waiting
        let tickets = vec![
            ticket(1, TICKET_COMPLETED, 1, Some(2), dt(10, 9, 0), Some(dt(10, 9, 5))),
            ticket(2, TICKET_WAITING, 1, None, dt(10, 9, 10), None),
        ];

        let m = compute_queue_metrics(
            &tickets,
            &[service(1, "General")],
            &[user(2, "Ana", "attendant")],
            &march_10(),
            &admin(),
            chrono_tz::UTC,
        );

        assert_eq!(m.avg_wait_minutes, 5);
        assert_eq!(m.total_all_time, 1);
        assert_eq!(m.currently_serving, 0);
        assert_eq!(m.efficiency_percent, 50);
        assert_eq!(m.hourly_counts[9], 2);
        assert_eq!(m.peak_hour, 9);
        assert_eq!(m.peak_hour_count, 2);
    }

    #[test]
    fn empty_set_yields_zeros() {
        let m = compute_queue_metrics(&[], &[], &[], &march_10(), &admin(), chrono_tz::UTC);

        assert_eq!(m.total_all_time, 0);
        assert_eq!(m.avg_wait_minutes, 0);
        assert_eq!(m.efficiency_percent, 0);
        assert_eq!(m.max_hourly, 1);
        assert_eq!(m.peak_hour, 0);
        assert_eq!(m.peak_hour_count, 0);
    }

    #[test]
    fn negative_wait_deltas_are_discarded() {
        // called_at before created_at must not produce a negative average
        let tickets = vec![
            ticket(1, TICKET_COMPLETED, 1, None, dt(10, 9, 30), Some(dt(10, 9, 0))),
            ticket(2, TICKET_COMPLETED, 1, None, dt(10, 10, 0), Some(dt(10, 10, 4))),
        ];

        let m = compute_queue_metrics(
            &tickets,
            &[service(1, "General")],
            &[],
            &march_10(),
            &admin(),
            chrono_tz::UTC,
        );

        assert_eq!(m.avg_wait_minutes, 4);
        assert!(m.avg_wait_minutes >= 0);
    }

    #[test]
    fn zero_delta_is_not_a_sample() {
        let tickets = vec![ticket(
            1,
            TICKET_CALLED,
            1,
            None,
            dt(10, 9, 0),
            Some(dt(10, 9, 0)),
        )];

        let m = compute_queue_metrics(&tickets, &[], &[], &march_10(), &admin(), chrono_tz::UTC);
        assert_eq!(m.avg_wait_minutes, 0);
    }

    #[test]
    fn average_rounds_half_up() {
        // 2 and 3 minute waits average to 2.5, reported as 3
        let tickets = vec![
            ticket(1, TICKET_CALLED, 1, None, dt(10, 9, 0), Some(dt(10, 9, 2))),
            ticket(2, TICKET_CALLED, 1, None, dt(10, 9, 0), Some(dt(10, 9, 3))),
        ];

        let m = compute_queue_metrics(&tickets, &[], &[], &march_10(), &admin(), chrono_tz::UTC);
        assert_eq!(m.avg_wait_minutes, 3);
    }

    #[test]
    fn peak_hour_ties_pick_the_earliest_hour() {
        let tickets = vec![
            ticket(1, TICKET_WAITING, 1, None, dt(10, 14, 0), None),
            ticket(2, TICKET_WAITING, 1, None, dt(10, 8, 0), None),
            ticket(3, TICKET_WAITING, 1, None, dt(10, 8, 30), None),
            ticket(4, TICKET_WAITING, 1, None, dt(10, 14, 30), None),
        ];

        let m = compute_queue_metrics(&tickets, &[], &[], &march_10(), &admin(), chrono_tz::UTC);
        assert_eq!(m.peak_hour, 8);
        assert_eq!(m.peak_hour_count, 2);
        assert_eq!(m.max_hourly, 2);
    }

    #[test]
    fn peak_hour_is_deterministic() {
        let tickets = vec![
            ticket(1, TICKET_WAITING, 1, None, dt(10, 11, 0), None),
            ticket(2, TICKET_WAITING, 1, None, dt(10, 16, 0), None),
        ];

        let first = compute_queue_metrics(&tickets, &[], &[], &march_10(), &admin(), chrono_tz::UTC);
        let second =
            compute_queue_metrics(&tickets, &[], &[], &march_10(), &admin(), chrono_tz::UTC);
        assert_eq!(first.peak_hour, second.peak_hour);
        assert_eq!(first.hourly_counts, second.hourly_counts);
    }

    #[test]
    fn date_range_is_inclusive_at_both_ends() {
        let tickets = vec![
            ticket(1, TICKET_WAITING, 1, None, dt(10, 0, 0), None),
            ticket(2, TICKET_WAITING, 1, None, dt(11, 23, 59), None),
            ticket(3, TICKET_WAITING, 1, None, dt(12, 0, 0), None),
        ];

        let filter = MetricsFilter {
            date_start: NaiveDate::from_ymd_opt(2026, 3, 10).unwrap(),
            date_end: NaiveDate::from_ymd_opt(2026, 3, 11).unwrap(),
            service_type_id: None,
            attendant_id: None,
        };

        let m = compute_queue_metrics(&tickets, &[], &[], &filter, &admin(), chrono_tz::UTC);
        assert_eq!(m.hourly_counts.iter().sum::<i64>(), 2);
    }

    #[test]
    fn date_buckets_follow_the_station_timezone() {
        // 02:00 UTC on March 10 is still March 9 in Sao Paulo (UTC-3)
        let tickets = vec![ticket(1, TICKET_WAITING, 1, None, dt(10, 2, 0), None)];

        let m = compute_queue_metrics(
            &tickets,
            &[],
            &[],
            &march_10(),
            &admin(),
            chrono_tz::America::Sao_Paulo,
        );
        assert_eq!(m.hourly_counts.iter().sum::<i64>(), 0);
    }

    #[test]
    fn non_admin_viewers_only_see_their_own_tickets() {
        let tickets = vec![
            ticket(1, TICKET_COMPLETED, 1, Some(2), dt(10, 9, 0), Some(dt(10, 9, 5))),
            ticket(2, TICKET_COMPLETED, 1, Some(3), dt(10, 9, 0), Some(dt(10, 9, 15))),
            ticket(3, TICKET_WAITING, 1, None, dt(10, 9, 0), None),
        ];

        let viewer = Viewer {
            user_id: 2,
            is_admin: false,
        };
        let m = compute_queue_metrics(&tickets, &[], &[], &march_10(), &viewer, chrono_tz::UTC);

        assert_eq!(m.total_all_time, 1);
        assert_eq!(m.avg_wait_minutes, 5);
    }

    #[test]
    fn service_stats_count_completed_only_and_sort_descending() {
        let tickets = vec![
            ticket(1, TICKET_COMPLETED, 2, None, dt(10, 9, 0), Some(dt(10, 9, 2))),
            ticket(2, TICKET_COMPLETED, 2, None, dt(10, 9, 0), Some(dt(10, 9, 4))),
            ticket(3, TICKET_CALLED, 1, None, dt(10, 9, 0), Some(dt(10, 9, 1))),
            ticket(4, TICKET_COMPLETED, 1, None, dt(10, 9, 0), Some(dt(10, 9, 8))),
        ];

        let services = vec![service(1, "General"), service(2, "Priority")];
        let m = compute_queue_metrics(&tickets, &services, &[], &march_10(), &admin(), chrono_tz::UTC);

        assert_eq!(m.service_stats.len(), 2);
        assert_eq!(m.service_stats[0].service_type_id, 2);
        assert_eq!(m.service_stats[0].completed, 2);
        assert_eq!(m.service_stats[0].avg_wait_minutes, 3);
        assert_eq!(m.service_stats[1].service_type_id, 1);
        assert_eq!(m.service_stats[1].completed, 1);
    }

    #[test]
    fn attendant_ranking_excludes_viewer_accounts() {
        let tickets = vec![
            ticket(1, TICKET_COMPLETED, 1, Some(2), dt(10, 9, 0), None),
            ticket(2, TICKET_COMPLETED, 1, Some(3), dt(10, 9, 0), None),
            ticket(3, TICKET_COMPLETED, 1, Some(3), dt(10, 9, 0), None),
            ticket(4, TICKET_CALLED, 1, Some(2), dt(10, 9, 0), None),
        ];

        let users = vec![
            user(2, "Ana", "attendant"),
            user(3, "Bruno", "super_admin"),
            user(4, "Carla", "viewer"),
        ];
        let m = compute_queue_metrics(&tickets, &[], &users, &march_10(), &admin(), chrono_tz::UTC);

        assert_eq!(m.attendant_stats.len(), 2);
        assert_eq!(m.attendant_stats[0].user_id, 3);
        assert_eq!(m.attendant_stats[0].completed, 2);
        assert_eq!(m.attendant_stats[1].user_id, 2);
        assert_eq!(m.attendant_stats[1].completed, 1);
    }

    #[test]
    fn service_and_attendant_filters_narrow_the_set() {
        let tickets = vec![
            ticket(1, TICKET_COMPLETED, 1, Some(2), dt(10, 9, 0), None),
            ticket(2, TICKET_COMPLETED, 2, Some(2), dt(10, 9, 0), None),
            ticket(3, TICKET_COMPLETED, 1, Some(3), dt(10, 9, 0), None),
        ];

        let filter = MetricsFilter {
            service_type_id: Some(1),
            attendant_id: Some(2),
            ..march_10()
        };
        let m = compute_queue_metrics(&tickets, &[], &[], &filter, &admin(), chrono_tz::UTC);
        assert_eq!(m.total_all_time, 1);
    }
}
