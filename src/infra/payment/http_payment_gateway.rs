use crate::domain::models::booking::Booking;
use crate::domain::ports::PaymentGateway;
use crate::error::AppError;
use async_trait::async_trait;
use reqwest::Client;
use serde::Serialize;
use tracing::error;

pub struct HttpPaymentGateway {
    client: Client,
    api_url: String,
    api_key: String,
}

impl HttpPaymentGateway {
    pub fn new(api_url: String, api_key: String) -> Self {
        Self {
            client: Client::new(),
            api_url,
            api_key,
        }
    }

    async fn post(&self, path: &str, payload: &impl Serialize) -> Result<(), AppError> {
        let url = format!("{}/{}", self.api_url.trim_end_matches('/'), path);
        let res = self.client.post(&url)
            .header("Authorization", format!("Bearer {}", self.api_key))
            .json(payload)
            .send()
            .await
            .map_err(|e| {
                let msg = format!("Payment service connection error: {}", e);
                error!("{}", msg);
                AppError::InternalWithMsg(msg)
            })?;

        if !res.status().is_success() {
            let status = res.status();
            let text = res.text().await.unwrap_or_default();
            let msg = format!("Payment service failed. Status: {}, Body: {}", status, text);
            error!("{}", msg);
            return Err(AppError::InternalWithMsg(msg));
        }

        Ok(())
    }
}

#[derive(Serialize)]
struct CreatedPayload {
    booking_id: String,
    student_id: String,
    instructor_id: String,
    price: i64,
}

#[derive(Serialize)]
struct CancelledPayload {
    booking_id: String,
    refund_fraction: f64,
}

#[async_trait]
impl PaymentGateway for HttpPaymentGateway {
    async fn notify_created(&self, booking: &Booking) -> Result<(), AppError> {
        let payload = CreatedPayload {
            booking_id: booking.id.clone(),
            student_id: booking.student_id.clone(),
            instructor_id: booking.instructor_id.clone(),
            price: booking.price,
        };
        self.post("created", &payload).await
    }

    async fn notify_cancelled(&self, booking_id: &str, refund_fraction: f64) -> Result<(), AppError> {
        let payload = CancelledPayload {
            booking_id: booking_id.to_string(),
            refund_fraction,
        };
        self.post("cancelled", &payload).await
    }
}
