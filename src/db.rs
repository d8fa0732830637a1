use anyhow::Context;
use chrono::NaiveDate;
use serde_json::json;
use sqlx::{PgPool, Row};
use uuid::Uuid;

use crate::models::{CourseTree, VisitRecord};

pub async fn init_db(pool: &PgPool) -> anyhow::Result<()> {
    sqlx::migrate!("./migrations").run(pool).await?;
    Ok(())
}

pub async fn seed(pool: &PgPool) -> anyhow::Result<()> {
    let structure = json!({
        "id": "block-v1:Demo+RUST101+2026",
        "name": "Practical Rust",
        "chapters": [
            {
                "name": "Getting Started",
                "sequentials": [
                    {
                        "name": "Week 1",
                        "verticals": [
                            {"vertical_id": "block-v1:Demo+vertical+welcome", "name": "Welcome"},
                            {"vertical_id": "block-v1:Demo+vertical+setup", "name": "Toolchain Setup"}
                        ]
                    }
                ]
            },
            {
                "name": "Ownership",
                "sequentials": [
                    {
                        "name": "Week 2",
                        "verticals": [
                            {"vertical_id": "block-v1:Demo+vertical+moves", "name": "Moves and Copies"},
                            {"vertical_id": "block-v1:Demo+vertical+borrows", "name": "Borrowing"},
                            {"vertical_id": "block-v1:Demo+vertical+quiz", "name": "Ownership Quiz"}
                        ]
                    }
                ]
            }
        ]
    });

    let raw = structure.to_string();
    let tree: CourseTree =
        serde_json::from_value(structure).context("seed structure is not a valid course tree")?;
    store_structure(pool, &tree, &raw).await?;

    let visits = vec![
        (
            "seed-001",
            "avery",
            "block-v1:Demo+vertical+welcome",
            4.0,
            NaiveDate::from_ymd_opt(2026, 3, 2).context("invalid date")?,
        ),
        (
            "seed-002",
            "avery",
            "block-v1:Demo+vertical+moves",
            7.0,
            NaiveDate::from_ymd_opt(2026, 3, 9).context("invalid date")?,
        ),
        (
            "seed-003",
            "jules",
            "block-v1:Demo+vertical+welcome",
            2.0,
            NaiveDate::from_ymd_opt(2026, 3, 3).context("invalid date")?,
        ),
        (
            "seed-004",
            "jules",
            "block-v1:Demo+vertical+quiz",
            1.0,
            NaiveDate::from_ymd_opt(2026, 3, 10).context("invalid date")?,
        ),
        (
            "seed-005",
            "kiara",
            "block-v1:Demo+vertical+borrows",
            5.0,
            NaiveDate::from_ymd_opt(2026, 3, 11).context("invalid date")?,
        ),
    ];

    for (source_key, username, vertical_id, total, visited_at) in visits {
        sqlx::query(
            r#"
            INSERT INTO course_engagement.visits
            (id, username, course, vertical_id, total, visited_at, source_key)
            VALUES ($1, $2, $3, $4, $5, $6, $7)
            ON CONFLICT (source_key) DO NOTHING
            "#,
        )
        .bind(Uuid::new_v4())
        .bind(username)
        .bind(&tree.id)
        .bind(vertical_id)
        .bind(total)
        .bind(visited_at)
        .bind(source_key)
        .execute(pool)
        .await?;
    }

    Ok(())
}

pub async fn store_structure(pool: &PgPool, tree: &CourseTree, raw: &str) -> anyhow::Result<()> {
    sqlx::query(
        r#"
        INSERT INTO course_engagement.structures (course, structure)
        VALUES ($1, $2)
        ON CONFLICT (course) DO UPDATE
        SET structure = EXCLUDED.structure, loaded_at = now()
        "#,
    )
    .bind(&tree.id)
    .bind(raw)
    .execute(pool)
    .await?;

    Ok(())
}

pub async fn fetch_structure(pool: &PgPool, course: &str) -> anyhow::Result<CourseTree> {
    let row = sqlx::query("SELECT structure FROM course_engagement.structures WHERE course = $1")
        .bind(course)
        .fetch_optional(pool)
        .await?
        .with_context(|| format!("no structure loaded for {course}; run load-structure first"))?;

    let raw: String = row.get("structure");
    let tree = serde_json::from_str(&raw)
        .with_context(|| format!("stored structure for {course} is not a valid course tree"))?;
    Ok(tree)
}

pub async fn import_csv(pool: &PgPool, csv_path: &std::path::Path) -> anyhow::Result<usize> {
    #[derive(serde::Deserialize)]
    struct CsvRow {
        username: String,
        course: String,
        vertical_id: String,
        total: f64,
        visited_at: NaiveDate,
        source_key: Option<String>,
    }

    let mut reader = csv::Reader::from_path(csv_path)?;
    let mut inserted = 0usize;

    for result in reader.deserialize::<CsvRow>() {
        let row = result?;
        let source_key = row
            .source_key
            .unwrap_or_else(|| format!("import-{}", Uuid::new_v4()));

        let result = sqlx::query(
            r#"
            INSERT INTO course_engagement.visits
            (id, username, course, vertical_id, total, visited_at, source_key)
            VALUES ($1, $2, $3, $4, $5, $6, $7)
            ON CONFLICT (source_key) DO NOTHING
            "#,
        )
        .bind(Uuid::new_v4())
        .bind(&row.username)
        .bind(&row.course)
        .bind(&row.vertical_id)
        .bind(row.total)
        .bind(row.visited_at)
        .bind(source_key)
        .execute(pool)
        .await?;

        if result.rows_affected() > 0 {
            inserted += 1;
        }
    }

    Ok(inserted)
}

/// One summed value per (student, vertical) over the inclusive date window,
/// ordered by username then vertical so downstream grouping is stable.
pub async fn fetch_visit_sums(
    pool: &PgPool,
    course: &str,
    from: NaiveDate,
    to: NaiveDate,
) -> anyhow::Result<Vec<VisitRecord>> {
    let rows = sqlx::query(
        r#"
        SELECT username, vertical_id, SUM(total) AS total
        FROM course_engagement.visits
        WHERE course = $1 AND visited_at >= $2 AND visited_at <= $3
        GROUP BY username, vertical_id
        ORDER BY username, vertical_id
        "#,
    )
    .bind(course)
    .bind(from)
    .bind(to)
    .fetch_all(pool)
    .await?;

    let mut records = Vec::new();
    for row in rows {
        records.push(VisitRecord {
            username: row.get("username"),
            vertical_id: row.get("vertical_id"),
            total: row.get("total"),
        });
    }

    Ok(records)
}
