use std::collections::HashMap;

use anyhow::Context;
use chrono::{Duration, Local, NaiveTime, Weekday};
use sqlx::{PgPool, Row};
use tracing::{debug, info};
use uuid::Uuid;

use crate::models::{Category, DailyRecord, LegacyRatings, RecordInput, LEGACY_CATEGORIES};
use crate::reminders::{Permission, ReminderSettings};

const WEEKDAYS: [Weekday; 7] = [
    Weekday::Mon,
    Weekday::Tue,
    Weekday::Wed,
    Weekday::Thu,
    Weekday::Fri,
    Weekday::Sat,
    Weekday::Sun,
];

pub async fn init_db(pool: &PgPool) -> anyhow::Result<()> {
    sqlx::migrate!("./migrations").run(pool).await?;
    info!("schema migrations applied");
    Ok(())
}

pub async fn seed(pool: &PgPool) -> anyhow::Result<()> {
    for (order, identifier) in LEGACY_CATEGORIES.iter().enumerate() {
        let mut display_name = identifier.to_string();
        if let Some(first) = display_name.get_mut(0..1) {
            first.make_ascii_uppercase();
        }
        upsert_category(pool, &Category::new(identifier, &display_name, order as i32 + 1)).await?;
    }

    let today = Local::now().date_naive();
    let samples = [
        (0, [1, 0, 1, 2], "Long walk after work"),
        (3, [0, -1, 1, 1], "Deadline pressure"),
        (12, [2, 1, 0, 1], "Weekend trip"),
        (40, [-1, 0, 0, 2], "Caught a cold"),
    ];

    for (days_ago, values, notes) in samples {
        let ratings = LEGACY_CATEGORIES
            .iter()
            .zip(values)
            .map(|(category, value)| (category.to_string(), value))
            .collect();
        upsert_record(
            pool,
            &RecordInput {
                date: today - Duration::days(days_ago),
                ratings,
                notes: Some(notes.to_string()),
            },
        )
        .await?;
    }

    // A record from before per-category ratings existed.
    sqlx::query(
        r#"
        INSERT INTO daily_metrics.daily_records
        (id, record_date, notes, legacy_health, legacy_work, legacy_growth, legacy_family)
        VALUES ($1, $2, $3, $4, $5, $6, $7)
        ON CONFLICT (record_date) DO NOTHING
        "#,
    )
    .bind(Uuid::new_v4())
    .bind(today - Duration::days(90))
    .bind("Imported from the first app version")
    .bind(1)
    .bind(-1)
    .bind(0)
    .bind(2)
    .execute(pool)
    .await?;

    info!("seed data inserted");
    Ok(())
}

pub async fn upsert_category(pool: &PgPool, category: &Category) -> anyhow::Result<()> {
    sqlx::query(
        r#"
        INSERT INTO daily_metrics.categories (identifier, display_name, display_order, active)
        VALUES ($1, $2, $3, $4)
        ON CONFLICT (identifier) DO UPDATE
        SET display_name = EXCLUDED.display_name,
            display_order = EXCLUDED.display_order,
            active = EXCLUDED.active
        "#,
    )
    .bind(&category.identifier)
    .bind(&category.display_name)
    .bind(category.display_order)
    .bind(category.active)
    .execute(pool)
    .await
    .with_context(|| format!("failed to save category '{}'", category.identifier))?;
    Ok(())
}

/// Returns false when no category has that identifier.
pub async fn set_category_active(
    pool: &PgPool,
    identifier: &str,
    active: bool,
) -> anyhow::Result<bool> {
    let result =
        sqlx::query("UPDATE daily_metrics.categories SET active = $2 WHERE identifier = $1")
            .bind(identifier)
            .bind(active)
            .execute(pool)
            .await?;
    Ok(result.rows_affected() > 0)
}

pub async fn fetch_categories(pool: &PgPool) -> anyhow::Result<Vec<Category>> {
    load_categories(pool, false).await
}

/// Active categories in display order.
pub async fn fetch_active_categories(pool: &PgPool) -> anyhow::Result<Vec<Category>> {
    load_categories(pool, true).await
}

async fn load_categories(pool: &PgPool, active_only: bool) -> anyhow::Result<Vec<Category>> {
    let rows = sqlx::query(
        r#"
        SELECT identifier, display_name, display_order, active
        FROM daily_metrics.categories
        WHERE active OR NOT $1
        ORDER BY display_order, identifier
        "#,
    )
    .bind(active_only)
    .fetch_all(pool)
    .await?;

    Ok(rows
        .into_iter()
        .map(|row| Category {
            identifier: row.get("identifier"),
            display_name: row.get("display_name"),
            display_order: row.get("display_order"),
            active: row.get("active"),
        })
        .collect())
}

/// Creates or updates the record for `input.date`. Ratings merge into any
/// existing ones; notes are replaced only when given.
pub async fn upsert_record(pool: &PgPool, input: &RecordInput) -> anyhow::Result<Uuid> {
    let mut tx = pool.begin().await?;

    let record_id: Uuid = sqlx::query(
        r#"
        INSERT INTO daily_metrics.daily_records (id, record_date, notes)
        VALUES ($1, $2, COALESCE($3::text, ''))
        ON CONFLICT (record_date) DO UPDATE
        SET notes = COALESCE($3::text, daily_metrics.daily_records.notes),
            updated_at = now()
        RETURNING id
        "#,
    )
    .bind(Uuid::new_v4())
    .bind(input.date)
    .bind(input.notes.as_deref())
    .fetch_one(&mut *tx)
    .await
    .with_context(|| format!("failed to save record for {}", input.date))?
    .get("id");

    for (category, value) in &input.ratings {
        sqlx::query(
            r#"
            INSERT INTO daily_metrics.record_ratings (record_id, category_identifier, value)
            VALUES ($1, $2, $3)
            ON CONFLICT (record_id, category_identifier) DO UPDATE
            SET value = EXCLUDED.value
            "#,
        )
        .bind(record_id)
        .bind(category)
        .bind(*value)
        .execute(&mut *tx)
        .await?;
    }

    tx.commit().await?;
    debug!(date = %input.date, ratings = input.ratings.len(), "record saved");
    Ok(record_id)
}

/// Reads every record with its ratings from one snapshot, so a write that
/// commits mid-read is either fully visible or not at all.
pub async fn fetch_records(pool: &PgPool) -> anyhow::Result<Vec<DailyRecord>> {
    let mut tx = pool.begin().await?;
    sqlx::query("SET TRANSACTION ISOLATION LEVEL REPEATABLE READ, READ ONLY")
        .execute(&mut *tx)
        .await?;

    let rows = sqlx::query(
        r#"
        SELECT id, record_date, notes,
               legacy_health, legacy_work, legacy_growth, legacy_family
        FROM daily_metrics.daily_records
        ORDER BY record_date
        "#,
    )
    .fetch_all(&mut *tx)
    .await?;

    let ratings = sqlx::query(
        "SELECT record_id, category_identifier, value FROM daily_metrics.record_ratings",
    )
    .fetch_all(&mut *tx)
    .await?;

    tx.commit().await?;

    let records = rows
        .into_iter()
        .map(|row| DailyRecord {
            id: row.get("id"),
            date: row.get("record_date"),
            ratings: Default::default(),
            legacy: LegacyRatings {
                health: row.get("legacy_health"),
                work: row.get("legacy_work"),
                growth: row.get("legacy_growth"),
                family: row.get("legacy_family"),
            },
            notes: row.get("notes"),
        })
        .collect();
    let ratings = ratings
        .into_iter()
        .map(|row| {
            (
                row.get("record_id"),
                row.get("category_identifier"),
                row.get("value"),
            )
        })
        .collect();

    let records = attach_ratings(records, ratings)?;
    debug!(count = records.len(), "records fetched");
    Ok(records)
}

/// Joins rating rows onto their records. A rating whose record is missing
/// means the two reads disagree, which a single snapshot rules out.
fn attach_ratings(
    mut records: Vec<DailyRecord>,
    ratings: Vec<(Uuid, String, i32)>,
) -> anyhow::Result<Vec<DailyRecord>> {
    let positions: HashMap<Uuid, usize> = records
        .iter()
        .enumerate()
        .map(|(index, record)| (record.id, index))
        .collect();

    for (record_id, category, value) in ratings {
        let index = positions
            .get(&record_id)
            .copied()
            .with_context(|| format!("rating '{category}' refers to unknown record {record_id}"))?;
        records[index].ratings.insert(category, value);
    }

    Ok(records)
}

pub async fn load_reminder_settings(
    pool: &PgPool,
) -> anyhow::Result<(ReminderSettings, Permission)> {
    let row = sqlx::query(
        r#"
        SELECT daily_enabled, daily_time, weekly_enabled, weekly_day, weekly_time, permission
        FROM daily_metrics.reminder_settings
        WHERE id = 1
        "#,
    )
    .fetch_optional(pool)
    .await?;

    let Some(row) = row else {
        return Ok((ReminderSettings::default(), Permission::Undetermined));
    };

    let weekly_day: i16 = row.get("weekly_day");
    let permission: String = row.get("permission");
    let settings = ReminderSettings {
        daily_enabled: row.get("daily_enabled"),
        daily_time: row.get::<NaiveTime, _>("daily_time"),
        weekly_enabled: row.get("weekly_enabled"),
        weekly_day: usize::try_from(weekly_day)
            .ok()
            .and_then(|index| WEEKDAYS.get(index).copied())
            .with_context(|| format!("stored weekday {weekly_day} is out of range"))?,
        weekly_time: row.get::<NaiveTime, _>("weekly_time"),
    };
    let permission = permission.parse().map_err(anyhow::Error::msg)?;
    Ok((settings, permission))
}

pub async fn save_reminder_settings(
    pool: &PgPool,
    settings: &ReminderSettings,
    permission: Permission,
) -> anyhow::Result<()> {
    sqlx::query(
        r#"
        INSERT INTO daily_metrics.reminder_settings
        (id, daily_enabled, daily_time, weekly_enabled, weekly_day, weekly_time, permission)
        VALUES (1, $1, $2, $3, $4, $5, $6)
        ON CONFLICT (id) DO UPDATE
        SET daily_enabled = EXCLUDED.daily_enabled,
            daily_time = EXCLUDED.daily_time,
            weekly_enabled = EXCLUDED.weekly_enabled,
            weekly_day = EXCLUDED.weekly_day,
            weekly_time = EXCLUDED.weekly_time,
            permission = EXCLUDED.permission
        "#,
    )
    .bind(settings.daily_enabled)
    .bind(settings.daily_time)
    .bind(settings.weekly_enabled)
    .bind(settings.weekly_day.num_days_from_monday() as i16)
    .bind(settings.weekly_time)
    .bind(permission.to_string())
    .execute(pool)
    .await
    .context("failed to save reminder settings")?;
    info!(%permission, "reminder settings saved");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    fn record(day: u32) -> DailyRecord {
        DailyRecord {
            id: Uuid::new_v4(),
            date: NaiveDate::from_ymd_opt(2026, 5, day).unwrap(),
            ratings: Default::default(),
            legacy: LegacyRatings::default(),
            notes: String::new(),
        }
    }

    #[test]
    fn ratings_join_onto_their_records() {
        let records = vec![record(1), record(2)];
        let (first, second) = (records[0].id, records[1].id);

        let records = attach_ratings(
            records,
            vec![
                (second, "health".to_string(), -1),
                (first, "health".to_string(), 2),
                (first, "work".to_string(), 1),
            ],
        )
        .unwrap();

        assert_eq!(records[0].rating("health"), 2);
        assert_eq!(records[0].rating("work"), 1);
        assert_eq!(records[1].rating("health"), -1);
    }

    #[test]
    fn rating_without_its_record_is_an_error() {
        let orphan = Uuid::new_v4();
        let err = attach_ratings(vec![record(1)], vec![(orphan, "health".to_string(), 2)])
            .unwrap_err();
        assert!(err.to_string().contains(&orphan.to_string()));
    }
}
