//! Live arrival estimates for parsed predictions.

use crate::model::Prediction;
use crate::time::{Timestamp, minutes_between};

/// Minutes from `now` until the prediction's estimated arrival.
///
/// Unlike [`Prediction::minutes_at_creation`], which is measured from the
/// prediction's generation time, this measures from the caller's `now`. It
/// reads no clock and can be called any number of times. Zero or negative
/// means the estimated arrival has passed.
#[must_use]
pub fn estimate_minutes_remaining(prediction: &Prediction, now: Timestamp) -> i64 {
    minutes_between(now, prediction.estimated_arrival)
}

impl Prediction {
    /// See [`estimate_minutes_remaining`].
    #[must_use]
    pub fn minutes_remaining(&self, now: Timestamp) -> i64 {
        estimate_minutes_remaining(self, now)
    }
}
