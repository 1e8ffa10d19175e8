use std::fmt;
use std::str::FromStr;

use chrono::{Datelike, Days, NaiveDateTime, NaiveTime, Weekday};
use serde::Serialize;
use tracing::{debug, warn};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Permission {
    Granted,
    Denied,
    Undetermined,
}

impl fmt::Display for Permission {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            Permission::Granted => "granted",
            Permission::Denied => "denied",
            Permission::Undetermined => "undetermined",
        };
        f.write_str(label)
    }
}

impl FromStr for Permission {
    type Err = String;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value {
            "granted" => Ok(Permission::Granted),
            "denied" => Ok(Permission::Denied),
            "undetermined" => Ok(Permission::Undetermined),
            other => Err(format!("unknown permission state '{other}'")),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ReminderSettings {
    pub daily_enabled: bool,
    pub daily_time: NaiveTime,
    pub weekly_enabled: bool,
    pub weekly_day: Weekday,
    pub weekly_time: NaiveTime,
}

impl Default for ReminderSettings {
    fn default() -> Self {
        Self {
            daily_enabled: false,
            daily_time: NaiveTime::from_hms_opt(20, 0, 0).unwrap_or(NaiveTime::MIN),
            weekly_enabled: false,
            weekly_day: Weekday::Sun,
            weekly_time: NaiveTime::from_hms_opt(18, 0, 0).unwrap_or(NaiveTime::MIN),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ReminderKind {
    Daily,
    Weekly,
}

impl ReminderKind {
    pub fn message(self) -> &'static str {
        match self {
            ReminderKind::Daily => "How was today? Take a minute to record your ratings.",
            ReminderKind::Weekly => "Your week in review: check your rolling averages.",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ScheduledReminder {
    pub kind: ReminderKind,
    pub weekday: Option<Weekday>,
    pub time: NaiveTime,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Occurrence {
    pub kind: ReminderKind,
    pub at: NaiveDateTime,
}

/// Turns reminder settings into a schedule for a given permission state.
#[derive(Debug, Clone, Copy)]
pub struct ReminderService {
    permission: Permission,
}

impl ReminderService {
    pub fn new(permission: Permission) -> Self {
        Self { permission }
    }

    pub fn permission(&self) -> Permission {
        self.permission
    }

    /// Returns the service with an updated permission state.
    pub fn with_permission(self, permission: Permission) -> Self {
        Self { permission }
    }

    pub fn plan(&self, settings: &ReminderSettings) -> Vec<ScheduledReminder> {
        if self.permission != Permission::Granted {
            warn!(permission = %self.permission, "notifications not permitted; nothing scheduled");
            return Vec::new();
        }

        let mut plan = Vec::new();
        if settings.daily_enabled {
            plan.push(ScheduledReminder {
                kind: ReminderKind::Daily,
                weekday: None,
                time: settings.daily_time,
            });
        }
        if settings.weekly_enabled {
            plan.push(ScheduledReminder {
                kind: ReminderKind::Weekly,
                weekday: Some(settings.weekly_day),
                time: settings.weekly_time,
            });
        }
        debug!(count = plan.len(), "reminder plan built");
        plan
    }

    /// The next `count` fire times strictly after `after`, earliest first.
    pub fn upcoming(
        &self,
        settings: &ReminderSettings,
        after: NaiveDateTime,
        count: usize,
    ) -> Vec<Occurrence> {
        let plan = self.plan(settings);
        let mut cursors: Vec<(&ScheduledReminder, NaiveDateTime)> = plan
            .iter()
            .filter_map(|reminder| next_fire(reminder, after).map(|at| (reminder, at)))
            .collect();

        let mut occurrences = Vec::with_capacity(count);
        while occurrences.len() < count {
            let Some(index) = cursors
                .iter()
                .enumerate()
                .min_by_key(|(_, (_, at))| *at)
                .map(|(index, _)| index)
            else {
                break;
            };

            let (reminder, at) = cursors[index];
            occurrences.push(Occurrence {
                kind: reminder.kind,
                at,
            });
            match next_fire(reminder, at) {
                Some(next) => cursors[index].1 = next,
                None => {
                    cursors.remove(index);
                }
            }
        }
        occurrences
    }
}

fn next_fire(reminder: &ScheduledReminder, after: NaiveDateTime) -> Option<NaiveDateTime> {
    let mut date = after.date();
    if date.and_time(reminder.time) <= after {
        date = date.checked_add_days(Days::new(1))?;
    }
    if let Some(weekday) = reminder.weekday {
        let ahead = (weekday.num_days_from_monday() + 7 - date.weekday().num_days_from_monday()) % 7;
        date = date.checked_add_days(Days::new(u64::from(ahead)))?;
    }
    Some(date.and_time(reminder.time))
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    fn at(day: u32, hour: u32, minute: u32) -> NaiveDateTime {
        // June 2026: the 1st is a Monday.
        NaiveDate::from_ymd_opt(2026, 6, day)
            .unwrap()
            .and_hms_opt(hour, minute, 0)
            .unwrap()
    }

    fn settings() -> ReminderSettings {
        ReminderSettings {
            daily_enabled: true,
            daily_time: NaiveTime::from_hms_opt(21, 0, 0).unwrap(),
            weekly_enabled: true,
            weekly_day: Weekday::Wed,
            weekly_time: NaiveTime::from_hms_opt(9, 30, 0).unwrap(),
        }
    }

    #[test]
    fn nothing_is_planned_without_permission() {
        for permission in [Permission::Denied, Permission::Undetermined] {
            let service = ReminderService::new(permission);
            assert!(service.plan(&settings()).is_empty());
            assert!(service.upcoming(&settings(), at(1, 8, 0), 5).is_empty());
        }
    }

    #[test]
    fn plan_respects_enable_flags() {
        let service = ReminderService::new(Permission::Granted);
        let mut only_daily = settings();
        only_daily.weekly_enabled = false;
        let plan = service.plan(&only_daily);
        assert_eq!(plan.len(), 1);
        assert_eq!(plan[0].kind, ReminderKind::Daily);
        assert!(service.plan(&ReminderSettings::default()).is_empty());
    }

    #[test]
    fn daily_reminder_rolls_to_tomorrow_once_passed() {
        let service = ReminderService::new(Permission::Granted);
        let mut daily = settings();
        daily.weekly_enabled = false;

        let before = service.upcoming(&daily, at(1, 8, 0), 1);
        assert_eq!(before[0].at, at(1, 21, 0));

        let exactly = service.upcoming(&daily, at(1, 21, 0), 1);
        assert_eq!(exactly[0].at, at(2, 21, 0));
    }

    #[test]
    fn weekly_reminder_lands_on_its_weekday() {
        let service = ReminderService::new(Permission::Granted);
        let mut weekly = settings();
        weekly.daily_enabled = false;

        let next = service.upcoming(&weekly, at(1, 8, 0), 2);
        assert_eq!(next[0].at, at(3, 9, 30));
        assert_eq!(next[1].at, at(10, 9, 30));

        let same_day_later = service.upcoming(&weekly, at(3, 10, 0), 1);
        assert_eq!(same_day_later[0].at, at(10, 9, 30));
    }

    #[test]
    fn upcoming_merges_both_schedules_in_order() {
        let service = ReminderService::new(Permission::Granted);
        let next = service.upcoming(&settings(), at(2, 22, 0), 3);
        let kinds: Vec<ReminderKind> = next.iter().map(|o| o.kind).collect();
        assert_eq!(
            kinds,
            vec![ReminderKind::Weekly, ReminderKind::Daily, ReminderKind::Daily]
        );
        assert_eq!(next[0].at, at(3, 9, 30));
        assert_eq!(next[1].at, at(3, 21, 0));
        assert_eq!(next[2].at, at(4, 21, 0));
    }

    #[test]
    fn permission_round_trips_through_text() {
        let service = ReminderService::new(Permission::Undetermined)
            .with_permission("granted".parse().unwrap());
        assert_eq!(service.permission(), Permission::Granted);
        assert!("maybe".parse::<Permission>().is_err());
    }
}
