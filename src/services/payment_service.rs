use hmac::{Hmac, Mac};
use sha2::Sha256;

use crate::{
    audit,
    error::{AppError, AppResult},
    models::Order,
    response::ApiResponse,
    state::AppState,
};

type HmacSha256 = Hmac<Sha256>;

pub fn gateway_secret() -> AppResult<String> {
    std::env::var("RAZORPAY_KEY_SECRET")
        .map_err(|_| AppError::Internal(anyhow::anyhow!("RAZORPAY_KEY_SECRET is not set")))
}

/// Checkout confirmation signature: HMAC-SHA256 over `"{order_id}|{payment_id}"`,
/// hex-encoded. Verified in constant time via the mac itself.
pub fn verify_checkout_signature(
    key_secret: &str,
    gateway_order_id: &str,
    gateway_payment_id: &str,
    signature: &str,
) -> bool {
    let message = format!("{gateway_order_id}|{gateway_payment_id}");
    verify_hex_hmac(key_secret, message.as_bytes(), signature)
}

/// Webhook signature: HMAC-SHA256 over the raw request body, hex-encoded,
/// carried in the `X-Razorpay-Signature` header.
pub fn verify_webhook_signature(key_secret: &str, body: &[u8], signature: &str) -> bool {
    verify_hex_hmac(key_secret, body, signature)
}

fn verify_hex_hmac(key_secret: &str, message: &[u8], signature_hex: &str) -> bool {
    let Ok(expected) = hex::decode(signature_hex) else {
        return false;
    };
    let Ok(mut mac) = HmacSha256::new_from_slice(key_secret.as_bytes()) else {
        return false;
    };
    mac.update(message);
    mac.verify_slice(&expected).is_ok()
}

/// Apply a verified gateway webhook event. Unknown events and unknown orders
/// are acknowledged without touching anything, per gateway retry semantics.
pub async fn apply_webhook_event(
    state: &AppState,
    body: &[u8],
) -> AppResult<ApiResponse<serde_json::Value>> {
    let event: serde_json::Value = serde_json::from_slice(body)
        .map_err(|_| AppError::BadRequest("Malformed webhook payload".into()))?;

    let event_name = event.get("event").and_then(|e| e.as_str()).unwrap_or("");
    let entity = &event["payload"]["payment"]["entity"];
    let gateway_order_id = entity.get("order_id").and_then(|v| v.as_str());
    let gateway_payment_id = entity.get("id").and_then(|v| v.as_str());

    match event_name {
        "payment.authorized" => {
            if let (Some(gw_order), Some(gw_payment)) = (gateway_order_id, gateway_payment_id) {
                mark_payment(state, gw_order, Some(gw_payment), "Paid", "Completed").await?;
            }
        }
        "payment.failed" => {
            if let Some(gw_order) = gateway_order_id {
                mark_payment(state, gw_order, gateway_payment_id, "Failed", "Failed").await?;
            }
        }
        other => {
            tracing::debug!(event = other, "ignoring webhook event");
        }
    }

    Ok(ApiResponse::ack("Webhook processed"))
}

async fn mark_payment(
    state: &AppState,
    gateway_order_id: &str,
    gateway_payment_id: Option<&str>,
    order_status: &str,
    payment_status: &str,
) -> AppResult<()> {
    let order: Option<Order> = sqlx::query_as(
        r#"
        UPDATE orders
        SET payment_status = $2, updated_at = now()
        WHERE gateway_order_id = $1
        RETURNING *
        "#,
    )
    .bind(gateway_order_id)
    .bind(order_status)
    .fetch_optional(&state.pool)
    .await?;

    let Some(order) = order else {
        tracing::warn!(gateway_order_id, "webhook for unknown order");
        return Ok(());
    };

    sqlx::query(
        r#"
        UPDATE payments
        SET status = $2,
            gateway_payment_id = COALESCE($3, gateway_payment_id),
            completed_at = CASE WHEN $2 = 'Completed' THEN now() ELSE completed_at END,
            updated_at = now()
        WHERE order_id = $1
        "#,
    )
    .bind(order.id)
    .bind(payment_status)
    .bind(gateway_payment_id)
    .execute(&state.pool)
    .await?;

    audit::record(
        &state.pool,
        None,
        "payment_webhook",
        Some("payments"),
        Some(serde_json::json!({
            "order_id": order.id,
            "gateway_order_id": gateway_order_id,
            "payment_status": payment_status,
        })),
    )
    .await;

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use hmac::{Hmac, Mac};
    use sha2::Sha256;

    fn sign(secret: &str, message: &[u8]) -> String {
        let mut mac = Hmac::<Sha256>::new_from_slice(secret.as_bytes()).unwrap();
        mac.update(message);
        hex::encode(mac.finalize().into_bytes())
    }

    #[test]
    fn checkout_signature_roundtrip() {
        let sig = sign("s3cret", b"order_abc|pay_xyz");
        assert!(verify_checkout_signature("s3cret", "order_abc", "pay_xyz", &sig));
        assert!(!verify_checkout_signature("s3cret", "order_abc", "pay_other", &sig));
        assert!(!verify_checkout_signature("wrong", "order_abc", "pay_xyz", &sig));
    }

    #[test]
    fn webhook_signature_roundtrip() {
        let body = br#"{"event":"payment.authorized"}"#;
        let sig = sign("s3cret", body);
        assert!(verify_webhook_signature("s3cret", body, &sig));

        let mut tampered = body.to_vec();
        tampered[2] = b'E';
        assert!(!verify_webhook_signature("s3cret", &tampered, &sig));
    }

    #[test]
    fn non_hex_signature_rejected() {
        assert!(!verify_webhook_signature("s3cret", b"body", "not-hex!"));
        assert!(!verify_webhook_signature("s3cret", b"body", ""));
    }
}
