use chrono::{DateTime, NaiveDate, NaiveTime, Utc};
use uuid::Uuid;

use crate::{
    audit,
    dto::salary::{CreateSalaryRequest, PaySalaryRequest, SalaryList, UpdateSalaryStatusRequest},
    error::{AppError, AppResult},
    middleware::auth::{AuthUser, ensure_admin},
    models::{BankDetails, DeliveryProfile, SalaryPayment},
    response::{ApiResponse, Meta},
    state::AppState,
};

/// Half-open UTC interval [start, end) covering the given calendar month.
pub fn month_bounds(year: i32, month: u32) -> Option<(DateTime<Utc>, DateTime<Utc>)> {
    let start = NaiveDate::from_ymd_opt(year, month, 1)?;
    let (next_year, next_month) = if month == 12 {
        (year + 1, 1)
    } else {
        (year, month + 1)
    };
    let end = NaiveDate::from_ymd_opt(next_year, next_month, 1)?;
    Some((
        start.and_time(NaiveTime::MIN).and_utc(),
        end.and_time(NaiveTime::MIN).and_utc(),
    ))
}

/// Net pay never goes negative, whatever the deductions say.
pub fn compute_net(base_salary: i64, bonus: i64, deductions: i64) -> i64 {
    (base_salary + bonus - deductions).max(0)
}

/// Only the tail of the account number is kept on the payment record.
pub fn account_last4(account_number: &str) -> String {
    let digits = account_number.trim();
    let skip = digits.chars().count().saturating_sub(4);
    digits.chars().skip(skip).collect()
}

pub async fn create_salary(
    state: &AppState,
    user: &AuthUser,
    payload: CreateSalaryRequest,
) -> AppResult<ApiResponse<SalaryPayment>> {
    ensure_admin(user)?;

    if !(1..=12).contains(&payload.month) {
        return Err(AppError::BadRequest("Month must be between 1 and 12".into()));
    }

    let profile: Option<DeliveryProfile> = sqlx::query_as(
        r#"
        SELECT dp.* FROM delivery_profiles dp
        JOIN users u ON u.id = dp.user_id
        WHERE dp.user_id = $1 AND u.role = 'Delivery'
        "#,
    )
    .bind(payload.partner_id)
    .fetch_optional(&state.pool)
    .await?;
    let profile = profile.ok_or(AppError::NotFound)?;

    let exists: Option<(Uuid,)> = sqlx::query_as(
        "SELECT id FROM salary_payments WHERE partner_id = $1 AND month = $2 AND year = $3",
    )
    .bind(payload.partner_id)
    .bind(payload.month)
    .bind(payload.year)
    .fetch_optional(&state.pool)
    .await?;
    if exists.is_some() {
        return Err(AppError::Conflict(
            "Salary for this month already exists".into(),
        ));
    }

    let (start, end) = month_bounds(payload.year, payload.month as u32)
        .ok_or_else(|| AppError::BadRequest("Invalid month or year".into()))?;

    let deliveries: (i64,) = sqlx::query_as(
        r#"
        SELECT COUNT(*) FROM orders
        WHERE assigned_to = $1 AND status = 'Delivered'
          AND delivered_at >= $2 AND delivered_at < $3
        "#,
    )
    .bind(payload.partner_id)
    .bind(start)
    .bind(end)
    .fetch_one(&state.pool)
    .await?;

    let returns: (i64,) = sqlx::query_as(
        r#"
        SELECT COUNT(*) FROM returns
        WHERE assigned_to = $1 AND status = 'Completed'
          AND picked_up_at >= $2 AND picked_up_at < $3
        "#,
    )
    .bind(payload.partner_id)
    .bind(start)
    .bind(end)
    .fetch_one(&state.pool)
    .await?;

    let net = compute_net(profile.base_salary, payload.bonus, payload.deductions);

    let record: SalaryPayment = sqlx::query_as(
        r#"
        INSERT INTO salary_payments
            (id, partner_id, month, year, base_salary, bonus, deductions, net_salary,
             deliveries_completed, returns_completed, remarks)
        VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11)
        RETURNING *
        "#,
    )
    .bind(Uuid::new_v4())
    .bind(payload.partner_id)
    .bind(payload.month)
    .bind(payload.year)
    .bind(profile.base_salary)
    .bind(payload.bonus)
    .bind(payload.deductions)
    .bind(net)
    .bind(deliveries.0 as i32)
    .bind(returns.0 as i32)
    .bind(payload.remarks.as_deref().map(str::trim))
    .fetch_one(&state.pool)
    .await?;

    audit::record(
        &state.pool,
        Some(user.user_id),
        "salary_create",
        Some("salary_payments"),
        Some(serde_json::json!({ "salary_id": record.id, "partner_id": record.partner_id })),
    )
    .await;

    Ok(ApiResponse::success("Salary record created", record, None))
}

pub async fn pay_salary(
    state: &AppState,
    user: &AuthUser,
    salary_id: Uuid,
    payload: PaySalaryRequest,
) -> AppResult<ApiResponse<SalaryPayment>> {
    ensure_admin(user)?;

    let mut tx = state.pool.begin().await?;

    let record: Option<SalaryPayment> =
        sqlx::query_as("SELECT * FROM salary_payments WHERE id = $1 FOR UPDATE")
            .bind(salary_id)
            .fetch_optional(&mut *tx)
            .await?;
    let record = record.ok_or(AppError::NotFound)?;

    if record.status != "Pending" && record.status != "Hold" {
        return Err(AppError::BadRequest(format!(
            "Cannot pay a salary in status {}",
            record.status
        )));
    }

    let bank: Option<BankDetails> = sqlx::query_as("SELECT * FROM bank_details WHERE user_id = $1")
        .bind(record.partner_id)
        .fetch_optional(&mut *tx)
        .await?;

    // Bank coordinates are copied onto the payment so later edits to the
    // partner's details never change what was actually paid out.
    let (holder, last4, ifsc, bank_name, upi) = match payload.payment_mode.as_str() {
        "Bank Transfer" => {
            let bank = bank.ok_or_else(|| {
                AppError::BadRequest("Partner has no bank details on file".into())
            })?;
            (
                Some(bank.account_holder_name),
                Some(account_last4(&bank.account_number)),
                Some(bank.ifsc_code),
                Some(bank.bank_name),
                None,
            )
        }
        "UPI" => {
            let upi = bank
                .and_then(|b| b.upi_id)
                .ok_or_else(|| AppError::BadRequest("Partner has no UPI id on file".into()))?;
            (None, None, None, None, Some(upi))
        }
        other => {
            return Err(AppError::BadRequest(format!(
                "Unsupported payment mode: {other}"
            )));
        }
    };

    let record: SalaryPayment = sqlx::query_as(
        r#"
        UPDATE salary_payments
        SET status = 'Paid',
            payment_mode = $2,
            transaction_reference = $3,
            transfer_account_holder_name = $4,
            transfer_account_last4 = $5,
            transfer_ifsc_code = $6,
            transfer_bank_name = $7,
            transfer_upi_id = $8,
            paid_at = now(),
            paid_by = $9
        WHERE id = $1
        RETURNING *
        "#,
    )
    .bind(record.id)
    .bind(&payload.payment_mode)
    .bind(payload.transaction_reference.as_deref().map(str::trim))
    .bind(holder)
    .bind(last4)
    .bind(ifsc)
    .bind(bank_name)
    .bind(upi)
    .bind(user.user_id)
    .fetch_one(&mut *tx)
    .await?;

    tx.commit().await?;

    audit::record(
        &state.pool,
        Some(user.user_id),
        "salary_paid",
        Some("salary_payments"),
        Some(serde_json::json!({
            "salary_id": record.id,
            "partner_id": record.partner_id,
            "net_salary": record.net_salary,
            "payment_mode": record.payment_mode,
        })),
    )
    .await;

    Ok(ApiResponse::success("Salary paid", record, None))
}

pub async fn update_status(
    state: &AppState,
    user: &AuthUser,
    salary_id: Uuid,
    payload: UpdateSalaryStatusRequest,
) -> AppResult<ApiResponse<SalaryPayment>> {
    ensure_admin(user)?;

    if payload.status != "Hold" && payload.status != "Cancelled" {
        return Err(AppError::BadRequest("Status must be Hold or Cancelled".into()));
    }

    let record: Option<SalaryPayment> = sqlx::query_as(
        r#"
        UPDATE salary_payments
        SET status = $2
        WHERE id = $1 AND status IN ('Pending', 'Hold')
        RETURNING *
        "#,
    )
    .bind(salary_id)
    .bind(&payload.status)
    .fetch_optional(&state.pool)
    .await?;

    let record = record.ok_or_else(|| {
        AppError::BadRequest("Only a Pending or Hold salary can be updated".into())
    })?;

    audit::record(
        &state.pool,
        Some(user.user_id),
        "salary_status",
        Some("salary_payments"),
        Some(serde_json::json!({ "salary_id": record.id, "status": record.status })),
    )
    .await;

    Ok(ApiResponse::success("Salary updated", record, None))
}

pub async fn list_salaries(
    state: &AppState,
    user: &AuthUser,
) -> AppResult<ApiResponse<SalaryList>> {
    ensure_admin(user)?;

    let items: Vec<SalaryPayment> = sqlx::query_as(
        "SELECT * FROM salary_payments ORDER BY year DESC, month DESC, created_at DESC",
    )
    .fetch_all(&state.pool)
    .await?;

    Ok(ApiResponse::success(
        "OK",
        SalaryList { items },
        Some(Meta::empty()),
    ))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn net_salary_never_negative() {
        assert_eq!(compute_net(1_000_00, 200_00, 50_00), 1_150_00);
        assert_eq!(compute_net(1_000_00, 0, 2_000_00), 0);
        assert_eq!(compute_net(0, 0, 0), 0);
    }

    #[test]
    fn month_bounds_handles_year_rollover() {
        let (start, end) = month_bounds(2025, 12).unwrap();
        assert_eq!(start.to_rfc3339(), "2025-12-01T00:00:00+00:00");
        assert_eq!(end.to_rfc3339(), "2026-01-01T00:00:00+00:00");
        assert!(month_bounds(2025, 13).is_none());
        assert!(month_bounds(2025, 0).is_none());
    }

    #[test]
    fn last4_tolerates_short_numbers() {
        assert_eq!(account_last4("123456789012"), "9012");
        assert_eq!(account_last4("42"), "42");
        assert_eq!(account_last4(""), "");
    }

    // Account numbers arrive unvalidated, so non-ASCII input must not panic.
    #[test]
    fn last4_counts_chars_not_bytes() {
        assert_eq!(account_last4("あいう"), "あいう");
        assert_eq!(account_last4("１２３４５６"), "３４５６");
        assert_eq!(account_last4("AB-१२३४"), "१२३४");
    }
}
