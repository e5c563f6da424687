//! Scalar Kalman filter for smoothing noisy analog sensors.

#[derive(Debug, Clone, PartialEq)]
pub struct KalmanFilter {
    process_noise: f32,
    measurement_noise: f32,
    estimate: Option<f32>,
    error: f32,
}

impl KalmanFilter {
    pub fn new(process_noise: f32, measurement_noise: f32) -> Self {
        Self {
            process_noise,
            measurement_noise,
            estimate: None,
            error: 1.0,
        }
    }

    /// Feed one measurement and return the new estimate.
    ///
    /// The first measurement seeds the estimate directly.
    pub fn update(&mut self, measurement: f32) -> f32 {
        let Some(estimate) = self.estimate else {
            self.estimate = Some(measurement);
            return measurement;
        };

        self.error += self.process_noise;
        let total = self.error + self.measurement_noise;
        // A noiseless measurement is taken as-is.
        let gain = if total > 0.0 { self.error / total } else { 1.0 };
        let estimate = estimate + gain * (measurement - estimate);
        self.error *= 1.0 - gain;
        self.estimate = Some(estimate);

        estimate
    }

    pub fn estimate(&self) -> Option<f32> {
        self.estimate
    }
}
