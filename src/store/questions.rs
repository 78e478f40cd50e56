// src/store/questions.rs

use sqlx::SqlitePool;

use crate::{
    models::question::{PublicQuestion, Question},
    scoring::AnswerKey,
};

/// Result of a guarded delete.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DeleteOutcome {
    Deleted,
    NotFound,
    /// Refused: the bank must keep at least one question.
    LastQuestion,
}

/// Plain text for a new or replaced question; the label is already normalized.
#[derive(Debug, Clone)]
pub struct QuestionFields {
    pub prompt: String,
    pub option_a: String,
    pub option_b: String,
    pub option_c: String,
    pub option_d: String,
    pub correct_option: String,
}

pub async fn list_questions(pool: &SqlitePool) -> Result<Vec<Question>, sqlx::Error> {
    sqlx::query_as::<_, Question>(
        r#"
        SELECT id, prompt, option_a, option_b, option_c, option_d, correct_option
        FROM questions
        ORDER BY id
        "#,
    )
    .fetch_all(pool)
    .await
}

/// Question set for students. The correct option is never selected.
pub async fn list_public_questions(pool: &SqlitePool) -> Result<Vec<PublicQuestion>, sqlx::Error> {
    sqlx::query_as::<_, PublicQuestion>(
        r#"
        SELECT id, prompt, option_a, option_b, option_c, option_d
        FROM questions
        ORDER BY id
        "#,
    )
    .fetch_all(pool)
    .await
}

pub async fn get_question(pool: &SqlitePool, id: i64) -> Result<Option<Question>, sqlx::Error> {
    sqlx::query_as::<_, Question>(
        r#"
        SELECT id, prompt, option_a, option_b, option_c, option_d, correct_option
        FROM questions
        WHERE id = ?
        "#,
    )
    .bind(id)
    .fetch_optional(pool)
    .await
}

/// The full bank's answer key.
pub async fn answer_key(pool: &SqlitePool) -> Result<AnswerKey, sqlx::Error> {
    let rows: Vec<(i64, String)> = sqlx::query_as("SELECT id, correct_option FROM questions")
        .fetch_all(pool)
        .await?;

    Ok(rows.into_iter().collect())
}

pub async fn count_questions(pool: &SqlitePool) -> Result<i64, sqlx::Error> {
    sqlx::query_scalar("SELECT COUNT(*) FROM questions")
        .fetch_one(pool)
        .await
}

pub async fn create_question(pool: &SqlitePool, fields: &QuestionFields) -> Result<Question, sqlx::Error> {
    sqlx::query_as::<_, Question>(
        r#"
        INSERT INTO questions (prompt, option_a, option_b, option_c, option_d, correct_option)
        VALUES (?, ?, ?, ?, ?, ?)
        RETURNING id, prompt, option_a, option_b, option_c, option_d, correct_option
        "#,
    )
    .bind(&fields.prompt)
    .bind(&fields.option_a)
    .bind(&fields.option_b)
    .bind(&fields.option_c)
    .bind(&fields.option_d)
    .bind(&fields.correct_option)
    .fetch_one(pool)
    .await
}

/// Replaces every field of question `id`. Returns `None` if it does not exist.
pub async fn update_question(
    pool: &SqlitePool,
    id: i64,
    fields: &QuestionFields,
) -> Result<Option<Question>, sqlx::Error> {
    sqlx::query_as::<_, Question>(
        r#"
        UPDATE questions
        SET prompt = ?, option_a = ?, option_b = ?, option_c = ?, option_d = ?, correct_option = ?
        WHERE id = ?
        RETURNING id, prompt, option_a, option_b, option_c, option_d, correct_option
        "#,
    )
    .bind(&fields.prompt)
    .bind(&fields.option_a)
    .bind(&fields.option_b)
    .bind(&fields.option_c)
    .bind(&fields.option_d)
    .bind(&fields.correct_option)
    .bind(id)
    .fetch_optional(pool)
    .await
}

/// Deletes question `id` unless it is the last one left.
///
/// The count check is part of the DELETE statement itself, so two concurrent
/// deletes can never take the bank below one question.
pub async fn delete_question(pool: &SqlitePool, id: i64) -> Result<DeleteOutcome, sqlx::Error> {
    let result = sqlx::query(
        r#"
        DELETE FROM questions
        WHERE id = ? AND (SELECT COUNT(*) FROM questions) > 1
        "#,
    )
    .bind(id)
    .execute(pool)
    .await?;

    if result.rows_affected() > 0 {
        return Ok(DeleteOutcome::Deleted);
    }

    let exists: bool = sqlx::query_scalar("SELECT EXISTS(SELECT 1 FROM questions WHERE id = ?)")
        .bind(id)
        .fetch_one(pool)
        .await?;

    Ok(if exists {
        DeleteOutcome::LastQuestion
    } else {
        DeleteOutcome::NotFound
    })
}

/// Inserts the sample questions when the bank is empty. Returns how many were added.
pub async fn seed_default_questions(pool: &SqlitePool) -> Result<usize, sqlx::Error> {
    if count_questions(pool).await? > 0 {
        return Ok(0);
    }

    let samples = [
        ("What is the capital of France?", ["London", "Berlin", "Paris", "Madrid"], "c"),
        (
            "Which programming language is known as the 'mother of all languages'?",
            ["C", "Assembly", "FORTRAN", "COBOL"],
            "a",
        ),
        (
            "What does HTML stand for?",
            [
                "Hyper Text Markup Language",
                "High Tech Modern Language",
                "Home Tool Markup Language",
                "Hyperlink and Text Markup Language",
            ],
            "a",
        ),
        ("Which planet is known as the Red Planet?", ["Venus", "Mars", "Jupiter", "Saturn"], "b"),
        (
            "What is the largest ocean on Earth?",
            ["Atlantic Ocean", "Indian Ocean", "Arctic Ocean", "Pacific Ocean"],
            "d",
        ),
    ];

    let mut tx = pool.begin().await?;
    for (prompt, [a, b, c, d], correct) in samples {
        sqlx::query(
            r#"
            INSERT INTO questions (prompt, option_a, option_b, option_c, option_d, correct_option)
            VALUES (?, ?, ?, ?, ?, ?)
            "#,
        )
        .bind(prompt)
        .bind(a)
        .bind(b)
        .bind(c)
        .bind(d)
        .bind(correct)
        .execute(&mut *tx)
        .await?;
    }
    tx.commit().await?;

    Ok(samples.len())
}
