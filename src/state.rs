use std::sync::Arc;

use crate::config::Config;
use crate::domain::ports::{AvailabilityRepository, BookingRepository, Clock, PaymentGateway, PushChannel};
use crate::domain::services::notifier::BookingNotifier;
use crate::infra::realtime::in_process::InProcessPushChannel;

#[derive(Clone)]
pub struct AppState {
    pub config: Config,
    pub availability_repo: Arc<dyn AvailabilityRepository>,
    pub booking_repo: Arc<dyn BookingRepository>,
    pub payment_gateway: Arc<dyn PaymentGateway>,
    pub push_channel: Arc<dyn PushChannel>,
    // Concrete handle to the same channel for the websocket endpoint, which
    // needs register/unregister beyond the port surface.
    pub push_registry: Arc<InProcessPushChannel>,
    pub notifier: Arc<BookingNotifier>,
    pub clock: Arc<dyn Clock>,
}
