use std::time::Instant;

use crate::core::fault::ConfigError;

// Substituted for dt when the clock reads zero or negative between updates.
const MIN_DT: f64 = 1e-6;

pub struct PidController {
    kp: f64,
    ki: f64,
    kd: f64,
    setpoint: f64,
    deadzone: f64,
    min_output: f64,
    max_output: f64,
    integral: f64,
    prev_error: Option<f64>,
    last_update: Option<Instant>,
}

impl PidController {
    pub fn new(
        kp: f64,
        ki: f64,
        kd: f64,
        setpoint: f64,
        output_limits: (f64, f64),
        deadzone: f64,
    ) -> Result<Self, ConfigError> {
        let (min_output, max_output) = output_limits;
        if min_output >= max_output {
            return Err(ConfigError::InvalidOutputLimits {
                lower: min_output,
                upper: max_output,
            });
        }
        if !(deadzone >= 0.0) {
            return Err(ConfigError::NegativeDeadzone(deadzone));
        }

        Ok(Self {
            kp,
            ki,
            kd,
            setpoint,
            deadzone,
            min_output,
            max_output,
            integral: 0.0,
            prev_error: None,
            last_update: None,
        })
    }

    /// Computes the actuator command for the current measurement.
    ///
    /// Errors smaller than the deadzone return zero without touching any
    /// internal state, so sensor noise near target cannot make the motor hunt.
    /// When the output clamps, the integral contribution added this tick is
    /// undone so the term never winds up past what the actuator can use.
    pub fn update(&mut self, measurement: f64, now: Instant) -> f64 {
        let dt = match self.last_update {
            Some(prev) => {
                let dt = now.saturating_duration_since(prev).as_secs_f64();
                if dt > 0.0 { dt } else { MIN_DT }
            }
            None => MIN_DT,
        };

        let error = self.setpoint - measurement;

        if error.abs() < self.deadzone {
            return 0.0;
        }

        let p_term = self.kp * error;

        self.integral += error * dt;
        let i_term = self.ki * self.integral;

        let derivative = match self.prev_error {
            Some(prev) => (error - prev) / dt,
            None => 0.0,
        };
        let d_term = self.kd * derivative;

        let raw_output = p_term + i_term + d_term;
        let output = raw_output.clamp(self.min_output, self.max_output);

        if output != raw_output {
            self.integral -= error * dt;
        }

        self.prev_error = Some(error);
        self.last_update = Some(now);

        output
    }

    /// Replaces the target. Integral state is kept; the caller decides when a
    /// reset is warranted (e.g. on a deployment transition).
    pub fn set_setpoint(&mut self, setpoint: f64) {
        self.setpoint = setpoint;
    }

    pub fn get_setpoint(&self) -> f64 {
        self.setpoint
    }

    pub fn get_integral(&self) -> f64 {
        self.integral
    }

    /// Clears integral, previous error and the timing reference. Call whenever
    /// the fin stows or control is re-enabled after a gap, so a stale error
    /// sample cannot produce a derivative spike.
    pub fn reset(&mut self) {
        self.integral = 0.0;
        self.prev_error = None;
        self.last_update = None;
    }

    /// Partial runtime retune; unspecified gains are unchanged. Takes effect
    /// on the next update.
    pub fn update_gains(&mut self, kp: Option<f64>, ki: Option<f64>, kd: Option<f64>) {
        if let Some(kp) = kp {
            self.kp = kp;
        }
        if let Some(ki) = ki {
            self.ki = ki;
        }
        if let Some(kd) = kd {
            self.kd = kd;
        }
    }
}
