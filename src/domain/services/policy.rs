/// Maps hours-until-lesson to the fraction of the price refunded on
/// cancellation: under 24h nothing, under 48h half, otherwise everything.
pub fn refund_fraction(hours_until_lesson: f64) -> f64 {
    if hours_until_lesson < 24.0 {
        0.0
    } else if hours_until_lesson < 48.0 {
        0.5
    } else {
        1.0
    }
}
