//! Reporting over the post collection

use crate::model::{
    GroupAverages, OptimalPostingTime, Platform, PostStatus, ScheduledPost, SchedulingStats,
};

/// Aggregate counts and recorded engagement.
///
/// Pure: the result depends only on `posts`. Averages are computed from metrics recorded on
/// published posts and are `None` when nothing has been recorded.
pub fn compute_stats(posts: &[ScheduledPost]) -> SchedulingStats {
    let mut stats = SchedulingStats::default();
    let mut all = Accumulator::default();
    let mut scheduled = Accumulator::default();
    let mut immediate = Accumulator::default();

    for post in posts {
        match post.status {
            PostStatus::Scheduled => stats.total_scheduled += 1,
            PostStatus::Failed => stats.total_failed += 1,
            PostStatus::Cancelled => stats.total_cancelled += 1,
            PostStatus::Published => {
                stats.total_published += 1;
                if let Some(metrics) = post.metrics {
                    all.add(metrics.engagement, metrics.reach);
                    if post.scheduled_time <= post.created_at {
                        immediate.add(metrics.engagement, metrics.reach);
                    } else {
                        scheduled.add(metrics.engagement, metrics.reach);
                    }
                }
            }
        }
    }

    stats.avg_engagement = all.averages().avg_engagement;
    stats.scheduled = scheduled.averages();
    stats.immediate = immediate.averages();
    stats
}

#[derive(Default)]
struct Accumulator {
    count: usize,
    engagement: f64,
    reach: f64,
}

impl Accumulator {
    fn add(&mut self, engagement: f64, reach: u64) {
        self.count += 1;
        self.engagement += engagement;
        self.reach += reach as f64;
    }

    fn averages(&self) -> GroupAverages {
        if self.count == 0 {
            return GroupAverages::default();
        }
        let n = self.count as f64;
        GroupAverages {
            samples: self.count,
            avg_engagement: Some(self.engagement / n),
            avg_reach: Some(self.reach / n),
        }
    }
}

/// Advisory posting slots per platform
pub fn optimal_posting_times() -> Vec<OptimalPostingTime> {
    vec![
        OptimalPostingTime {
            platform: Platform::Tiktok,
            day: "Thursday",
            time: "18:00",
            engagement: 8.5,
            reach: 12000,
            reason: "Peak evening usage",
        },
        OptimalPostingTime {
            platform: Platform::Instagram,
            day: "Wednesday",
            time: "11:00",
            engagement: 7.2,
            reach: 8500,
            reason: "Lunch break scrolling",
        },
        OptimalPostingTime {
            platform: Platform::Twitter,
            day: "Monday",
            time: "09:00",
            engagement: 6.8,
            reach: 6200,
            reason: "Morning commute",
        },
        OptimalPostingTime {
            platform: Platform::Youtube,
            day: "Friday",
            time: "20:00",
            engagement: 9.1,
            reach: 15000,
            reason: "Weekend planning",
        },
    ]
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{PostMetrics, Recurrence};
    use time::macros::datetime;
    use time::{Duration, OffsetDateTime};

    fn post(id: &str, status: PostStatus, scheduled_time: OffsetDateTime) -> ScheduledPost {
        ScheduledPost {
            id: id.to_string(),
            content: String::new(),
            caption: "caption".to_string(),
            media_url: None,
            platforms: vec![Platform::Instagram],
            scheduled_time,
            timezone: "UTC".to_string(),
            status,
            recurrence: Recurrence::Once,
            max_recurrences: None,
            recurrence_count: 0,
            retries: 0,
            max_retries: 3,
            last_error: None,
            created_at: datetime!(2026-10-01 00:00 UTC),
            published_at: None,
            tags: vec![],
            metrics: None,
        }
    }

    #[test]
    fn test_counts_by_status() {
        let t = datetime!(2026-10-02 00:00 UTC);
        let posts = vec![
            post("a", PostStatus::Scheduled, t),
            post("b", PostStatus::Scheduled, t),
            post("c", PostStatus::Published, t),
            post("d", PostStatus::Failed, t),
            post("e", PostStatus::Cancelled, t),
        ];

        let stats = compute_stats(&posts);
        assert_eq!(stats.total_scheduled, 2);
        assert_eq!(stats.total_published, 1);
        assert_eq!(stats.total_failed, 1);
        assert_eq!(stats.total_cancelled, 1);
        assert_eq!(stats.avg_engagement, None);
    }

    #[test]
    fn test_engagement_from_recorded_metrics() {
        let created = datetime!(2026-10-01 00:00 UTC);
        let mut ahead = post("ahead", PostStatus::Published, created + Duration::days(2));
        ahead.metrics = Some(PostMetrics {
            engagement: 8.0,
            reach: 1000,
        });
        let mut now = post("now", PostStatus::Published, created);
        now.metrics = Some(PostMetrics {
            engagement: 4.0,
            reach: 200,
        });
        let unrecorded = post("none", PostStatus::Published, created);

        let stats = compute_stats(&[ahead, now, unrecorded]);
        assert_eq!(stats.total_published, 3);
        assert_eq!(stats.avg_engagement, Some(6.0));
        assert_eq!(stats.scheduled.samples, 1);
        assert_eq!(stats.scheduled.avg_reach, Some(1000.0));
        assert_eq!(stats.immediate.avg_engagement, Some(4.0));
    }

    #[test]
    fn test_stats_are_repeatable() {
        let t = datetime!(2026-10-02 00:00 UTC);
        let mut published = post("p", PostStatus::Published, t);
        published.metrics = Some(PostMetrics {
            engagement: 3.3,
            reach: 10,
        });
        let posts = vec![published, post("s", PostStatus::Scheduled, t)];

        assert_eq!(compute_stats(&posts), compute_stats(&posts));
    }

    #[test]
    fn test_optimal_times_cover_every_platform() {
        let times = optimal_posting_times();
        for platform in Platform::ALL {
            assert!(times.iter().any(|t| t.platform == platform));
        }
    }
}
