use lesson_scheduler::{
    api::router::create_router,
    config::Config,
    domain::models::booking::Booking,
    domain::ports::{Clock, PaymentGateway},
    domain::services::notifier::BookingNotifier,
    error::AppError,
    infra::realtime::in_process::InProcessPushChannel,
    infra::repositories::{
        sqlite_availability_repo::SqliteAvailabilityRepo,
        sqlite_booking_repo::SqliteBookingRepo,
    },
    state::AppState,
};
use async_trait::async_trait;
use axum::{
    body::Body,
    http::Request,
    Router,
};
use chrono::{DateTime, NaiveDate, TimeZone, Utc};
use serde_json::json;
use sqlx::sqlite::{SqliteConnectOptions, SqlitePoolOptions};
use sqlx::{Pool, Sqlite};
use std::str::FromStr;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use tower::ServiceExt;
use uuid::Uuid;

/// Settable clock so tests can place "now" wherever the scenario needs it.
pub struct TestClock {
    now: Mutex<DateTime<Utc>>,
}

#[allow(dead_code)]
impl TestClock {
    pub fn new(start: DateTime<Utc>) -> Self {
        Self { now: Mutex::new(start) }
    }

    pub fn set(&self, to: DateTime<Utc>) {
        *self.now.lock().unwrap() = to;
    }
}

impl Clock for TestClock {
    fn now(&self) -> DateTime<Utc> {
        *self.now.lock().unwrap()
    }
}

#[derive(Default)]
pub struct MockPaymentGateway {
    pub created: Mutex<Vec<String>>,
    pub cancelled: Mutex<Vec<(String, f64)>>,
    pub fail: AtomicBool,
}

#[async_trait]
impl PaymentGateway for MockPaymentGateway {
    async fn notify_created(&self, booking: &Booking) -> Result<(), AppError> {
        if self.fail.load(Ordering::SeqCst) {
            return Err(AppError::InternalWithMsg("payment service down".to_string()));
        }
        self.created.lock().unwrap().push(booking.id.clone());
        Ok(())
    }

    async fn notify_cancelled(&self, booking_id: &str, refund_fraction: f64) -> Result<(), AppError> {
        if self.fail.load(Ordering::SeqCst) {
            return Err(AppError::InternalWithMsg("payment service down".to_string()));
        }
        self.cancelled.lock().unwrap().push((booking_id.to_string(), refund_fraction));
        Ok(())
    }
}

/// All tests run against 2030 dates with the clock pinned to Tuesday
/// 2030-01-01 08:00 UTC, so "next Monday" is always 2030-01-07.
pub fn base_now() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2030, 1, 1, 8, 0, 0).unwrap()
}

#[allow(dead_code)]
pub fn monday() -> NaiveDate {
    NaiveDate::from_ymd_opt(2030, 1, 7).unwrap()
}

#[allow(dead_code)]
pub fn monday_at(hour: u32, min: u32) -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2030, 1, 7, hour, min, 0).unwrap()
}

#[allow(dead_code)]
pub struct TestApp {
    pub router: Router,
    pub pool: Pool<Sqlite>,
    pub db_filename: String,
    pub state: Arc<AppState>,
    pub push: Arc<InProcessPushChannel>,
    pub clock: Arc<TestClock>,
    pub payments: Arc<MockPaymentGateway>,
}

#[allow(dead_code)]
impl TestApp {
    pub async fn new() -> Self {
        Self::with_auto_confirm(false).await
    }

    pub async fn with_auto_confirm(auto_confirm: bool) -> Self {
        let db_filename = format!("test_{}.db", Uuid::new_v4());
        let db_url = format!("sqlite://{}?mode=rwc", db_filename);

        let connection_options = SqliteConnectOptions::from_str(&db_url)
            .unwrap()
            .create_if_missing(true);

        let pool = SqlitePoolOptions::new()
            .connect_with(connection_options)
            .await
            .expect("Failed to connect to test db");

        sqlx::migrate!("./migrations/sqlite")
            .run(&pool)
            .await
            .expect("Failed to migrate test db");

        let config = Config {
            database_url: db_url.clone(),
            port: 0,
            payment_service_url: "http://localhost".to_string(),
            payment_service_token: "test-token-1".to_string(),
            auto_confirm_bookings: auto_confirm,
        };

        let push = Arc::new(InProcessPushChannel::new());
        let clock = Arc::new(TestClock::new(base_now()));
        let payments = Arc::new(MockPaymentGateway::default());

        let state = Arc::new(AppState {
            config: config.clone(),
            availability_repo: Arc::new(SqliteAvailabilityRepo::new(pool.clone())),
            booking_repo: Arc::new(SqliteBookingRepo::new(pool.clone())),
            payment_gateway: payments.clone(),
            push_channel: push.clone(),
            push_registry: push.clone(),
            notifier: Arc::new(BookingNotifier::new(push.clone())),
            clock: clock.clone(),
        });

        let router = create_router(state.clone());

        Self {
            router,
            pool,
            db_filename,
            state,
            push,
            clock,
            payments,
        }
    }

    /// POST a weekly window as the owning instructor, panicking on failure so
    /// setup mistakes surface where they happen.
    pub async fn seed_window(&self, instructor_id: &str, day_of_week: i32, start: &str, end: &str) {
        let response = self
            .router
            .clone()
            .oneshot(
                Request::builder()
                    .method("POST")
                    .uri(format!("/api/v1/instructors/{}/availability", instructor_id))
                    .header("content-type", "application/json")
                    .header("x-actor-id", instructor_id)
                    .header("x-actor-role", "instructor")
                    .body(Body::from(
                        json!({ "day_of_week": day_of_week, "start": start, "end": end }).to_string(),
                    ))
                    .unwrap(),
            )
            .await
            .unwrap();

        if !response.status().is_success() {
            panic!("seed_window failed: status {}", response.status());
        }
    }

    pub async fn create_booking(
        &self,
        student_id: &str,
        instructor_id: &str,
        scheduled_at: DateTime<Utc>,
        duration_min: i32,
    ) -> axum::response::Response {
        self.router
            .clone()
            .oneshot(
                Request::builder()
                    .method("POST")
                    .uri("/api/v1/bookings")
                    .header("content-type", "application/json")
                    .header("x-actor-id", student_id)
                    .header("x-actor-role", "student")
                    .body(Body::from(
                        json!({
                            "instructor_id": instructor_id,
                            "scheduled_at": scheduled_at.to_rfc3339(),
                            "duration_min": duration_min,
                            "price": 5000
                        })
                        .to_string(),
                    ))
                    .unwrap(),
            )
            .await
            .unwrap()
    }

    /// POST to a booking sub-route (confirm, cancel, reschedule, ...) as the
    /// given actor; `body` may be omitted for routes without a payload.
    pub async fn post_action(
        &self,
        booking_id: &str,
        action: &str,
        actor_id: &str,
        role: &str,
        body: Option<serde_json::Value>,
    ) -> axum::response::Response {
        let builder = Request::builder()
            .method("POST")
            .uri(format!("/api/v1/bookings/{}/{}", booking_id, action))
            .header("x-actor-id", actor_id)
            .header("x-actor-role", role);

        // No content-type on bodyless requests, otherwise optional Json
        // extractors would try to parse the empty body.
        let request = match body {
            Some(value) => builder
                .header("content-type", "application/json")
                .body(Body::from(value.to_string()))
                .unwrap(),
            None => builder.body(Body::empty()).unwrap(),
        };

        self.router.clone().oneshot(request).await.unwrap()
    }
}

impl Drop for TestApp {
    fn drop(&mut self) {
        let _ = std::fs::remove_file(&self.db_filename);
    }
}
