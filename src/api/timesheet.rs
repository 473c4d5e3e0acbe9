use crate::{
    auth::auth::AuthUser,
    error::{ApiError, is_duplicate_key},
    model::{
        activity_log::ActivityLog,
        timesheet::{Activity, Timesheet},
    },
};
use actix_web::{HttpResponse, Responder, web};
use chrono::Utc;
use serde_json::json;
use sqlx::MySqlPool;
use tracing::info;

const SELECT_OPEN: &str = r#"
    SELECT id, employee_id, date, start_time, end_time,
           work_time, lunch_time, break_time, total_work_time, status
    FROM timesheets
    WHERE employee_id = ? AND status <> 'PUNCHED_OUT'
"#;

async fn log_activity(
    conn: &mut sqlx::MySqlConnection,
    sheet: &Timesheet,
    activity: Activity,
) -> sqlx::Result<()> {
    sqlx::query("INSERT INTO activity_logs (employee_id, timesheet_id, activity) VALUES (?, ?, ?)")
        .bind(sheet.employee_id)
        .bind(sheet.id)
        .bind(activity)
        .execute(&mut *conn)
        .await?;
    Ok(())
}

/// Runs one transition end to end: lock the open sheet, apply, persist the
/// sheet and its activity-log entry as one transaction. Either both writes
/// land or neither does.
async fn apply_transition(
    pool: &MySqlPool,
    employee_id: u64,
    activity: Activity,
) -> Result<Timesheet, ApiError> {
    let now = Utc::now();
    let mut tx = pool.begin().await?;

    let locked_select = format!("{SELECT_OPEN} FOR UPDATE");
    let sheet = sqlx::query_as::<_, Timesheet>(&locked_select)
        .bind(employee_id)
        .fetch_optional(&mut *tx)
        .await?;

    let mut sheet =
        sheet.ok_or_else(|| ApiError::InvalidState("No active timesheet found".into()))?;

    sheet.apply(activity, now)?;

    sqlx::query(
        r#"
        UPDATE timesheets
        SET start_time = ?, end_time = ?, work_time = ?, lunch_time = ?,
            break_time = ?, total_work_time = ?, status = ?
        WHERE id = ?
        "#,
    )
    .bind(sheet.start_time)
    .bind(sheet.end_time)
    .bind(sheet.work_time)
    .bind(sheet.lunch_time)
    .bind(sheet.break_time)
    .bind(sheet.total_work_time)
    .bind(sheet.status)
    .bind(sheet.id)
    .execute(&mut *tx)
    .await?;

    log_activity(&mut *tx, &sheet, activity).await?;

    tx.commit().await?;

    info!(employee_id, timesheet_id = sheet.id, %activity, "Timesheet transition");
    Ok(sheet)
}

/// Punch In — opens a new timesheet.
#[utoipa::path(
    post,
    path = "/api/timesheets/punch-in",
    responses(
        (status = 201, description = "Punched in", body = Timesheet),
        (status = 400, description = "Already punched in"),
        (status = 401, description = "Unauthorized"),
        (status = 500, description = "Internal server error")
    ),
    security(("bearer_auth" = [])),
    tag = "Timesheet"
)]
pub async fn punch_in(
    auth: AuthUser,
    pool: web::Data<MySqlPool>,
) -> Result<impl Responder, ApiError> {
    let mut sheet = Timesheet::open(auth.employee_id, Utc::now());
    let mut tx = pool.begin().await?;

    // The unique key over open sheets makes the "no open timesheet"
    // check-then-create race safe: the second insert loses here.
    let result = sqlx::query(
        "INSERT INTO timesheets (employee_id, date, start_time, status) VALUES (?, ?, ?, ?)",
    )
    .bind(sheet.employee_id)
    .bind(sheet.date)
    .bind(sheet.start_time)
    .bind(sheet.status)
    .execute(&mut *tx)
    .await;

    sheet.id = match result {
        Ok(res) => res.last_insert_id(),
        Err(e) if is_duplicate_key(&e) => {
            return Err(ApiError::Conflict("Already punched in".into()));
        }
        Err(e) => return Err(e.into()),
    };

    log_activity(&mut *tx, &sheet, Activity::PunchIn).await?;
    tx.commit().await?;

    info!(employee_id = auth.employee_id, timesheet_id = sheet.id, "Punched in");
    Ok(HttpResponse::Created().json(sheet))
}

/// Lunch In — suspends work, starts the lunch segment.
#[utoipa::path(
    post,
    path = "/api/timesheets/lunch-in",
    responses(
        (status = 200, description = "Updated timesheet", body = Timesheet),
        (status = 400, description = "Not currently punched in"),
        (status = 401, description = "Unauthorized"),
        (status = 500, description = "Internal server error")
    ),
    security(("bearer_auth" = [])),
    tag = "Timesheet"
)]
pub async fn lunch_in(
    auth: AuthUser,
    pool: web::Data<MySqlPool>,
) -> Result<impl Responder, ApiError> {
    let sheet = apply_transition(pool.get_ref(), auth.employee_id, Activity::LunchIn).await?;
    Ok(HttpResponse::Ok().json(sheet))
}

/// Lunch Out — ends the lunch segment, resumes work.
#[utoipa::path(
    post,
    path = "/api/timesheets/lunch-out",
    responses(
        (status = 200, description = "Updated timesheet", body = Timesheet),
        (status = 400, description = "Not on lunch break"),
        (status = 401, description = "Unauthorized"),
        (status = 500, description = "Internal server error")
    ),
    security(("bearer_auth" = [])),
    tag = "Timesheet"
)]
pub async fn lunch_out(
    auth: AuthUser,
    pool: web::Data<MySqlPool>,
) -> Result<impl Responder, ApiError> {
    let sheet = apply_transition(pool.get_ref(), auth.employee_id, Activity::LunchOut).await?;
    Ok(HttpResponse::Ok().json(sheet))
}

/// Break In — suspends work, starts a break segment.
#[utoipa::path(
    post,
    path = "/api/timesheets/break-in",
    responses(
        (status = 200, description = "Updated timesheet", body = Timesheet),
        (status = 400, description = "Not currently punched in"),
        (status = 401, description = "Unauthorized"),
        (status = 500, description = "Internal server error")
    ),
    security(("bearer_auth" = [])),
    tag = "Timesheet"
)]
pub async fn break_in(
    auth: AuthUser,
    pool: web::Data<MySqlPool>,
) -> Result<impl Responder, ApiError> {
    let sheet = apply_transition(pool.get_ref(), auth.employee_id, Activity::BreakIn).await?;
    Ok(HttpResponse::Ok().json(sheet))
}

/// Break Out — ends the break segment, resumes work.
#[utoipa::path(
    post,
    path = "/api/timesheets/break-out",
    responses(
        (status = 200, description = "Updated timesheet", body = Timesheet),
        (status = 400, description = "Not on break"),
        (status = 401, description = "Unauthorized"),
        (status = 500, description = "Internal server error")
    ),
    security(("bearer_auth" = [])),
    tag = "Timesheet"
)]
pub async fn break_out(
    auth: AuthUser,
    pool: web::Data<MySqlPool>,
) -> Result<impl Responder, ApiError> {
    let sheet = apply_transition(pool.get_ref(), auth.employee_id, Activity::BreakOut).await?;
    Ok(HttpResponse::Ok().json(sheet))
}

/// Punch Out — closes the session; the sheet becomes history.
#[utoipa::path(
    post,
    path = "/api/timesheets/punch-out",
    responses(
        (status = 200, description = "Closed timesheet", body = Timesheet),
        (status = 400, description = "No active timesheet found"),
        (status = 401, description = "Unauthorized"),
        (status = 500, description = "Internal server error")
    ),
    security(("bearer_auth" = [])),
    tag = "Timesheet"
)]
pub async fn punch_out(
    auth: AuthUser,
    pool: web::Data<MySqlPool>,
) -> Result<impl Responder, ApiError> {
    let sheet = apply_transition(pool.get_ref(), auth.employee_id, Activity::PunchOut).await?;
    Ok(HttpResponse::Ok().json(sheet))
}

/// Current open timesheet, if any.
#[utoipa::path(
    get,
    path = "/api/timesheets/current",
    responses(
        (status = 200, description = "Open timesheet, or a no-active-timesheet payload", body = Timesheet),
        (status = 401, description = "Unauthorized"),
        (status = 500, description = "Internal server error")
    ),
    security(("bearer_auth" = [])),
    tag = "Timesheet"
)]
pub async fn current(
    auth: AuthUser,
    pool: web::Data<MySqlPool>,
) -> Result<impl Responder, ApiError> {
    let sheet = sqlx::query_as::<_, Timesheet>(SELECT_OPEN)
        .bind(auth.employee_id)
        .fetch_optional(pool.get_ref())
        .await?;

    Ok(match sheet {
        Some(sheet) => HttpResponse::Ok().json(sheet),
        None => HttpResponse::Ok().json(json!({ "message": "No active timesheet" })),
    })
}

/// Closed timesheets, newest first.
#[utoipa::path(
    get,
    path = "/api/timesheets/history",
    responses(
        (status = 200, description = "Closed timesheets, newest first", body = [Timesheet]),
        (status = 401, description = "Unauthorized"),
        (status = 500, description = "Internal server error")
    ),
    security(("bearer_auth" = [])),
    tag = "Timesheet"
)]
pub async fn history(
    auth: AuthUser,
    pool: web::Data<MySqlPool>,
) -> Result<impl Responder, ApiError> {
    let sheets = sqlx::query_as::<_, Timesheet>(
        r#"
        SELECT id, employee_id, date, start_time, end_time,
               work_time, lunch_time, break_time, total_work_time, status
        FROM timesheets
        WHERE employee_id = ? AND status = 'PUNCHED_OUT'
        ORDER BY date DESC, id DESC
        "#,
    )
    .bind(auth.employee_id)
    .fetch_all(pool.get_ref())
    .await?;

    Ok(HttpResponse::Ok().json(sheets))
}

/// Activity log, newest first.
#[utoipa::path(
    get,
    path = "/api/timesheets/activity-log",
    responses(
        (status = 200, description = "Activity entries, newest first", body = [ActivityLog]),
        (status = 401, description = "Unauthorized"),
        (status = 500, description = "Internal server error")
    ),
    security(("bearer_auth" = [])),
    tag = "Timesheet"
)]
pub async fn activity_log(
    auth: AuthUser,
    pool: web::Data<MySqlPool>,
) -> Result<impl Responder, ApiError> {
    let entries = sqlx::query_as::<_, ActivityLog>(
        r#"
        SELECT id, employee_id, timesheet_id, activity, created_at
        FROM activity_logs
        WHERE employee_id = ?
        ORDER BY created_at DESC, id DESC
        "#,
    )
    .bind(auth.employee_id)
    .fetch_all(pool.get_ref())
    .await?;

    Ok(HttpResponse::Ok().json(entries))
}
