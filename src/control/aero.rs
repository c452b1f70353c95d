use crate::core::fault::ConfigError;

/// Wind speed (m/s) to target fin angle (degrees), reconstructed from
/// pre-calculated aerodynamic breakpoints by linear interpolation.
/// Immutable after construction.
pub struct AeroLookupTable {
    wind_speeds: Vec<f64>,
    target_angles: Vec<f64>,
}

impl Default for AeroLookupTable {
    fn default() -> Self {
        // Experimental aerodynamic data for the current fin profile.
        AeroLookupTable::new(
            vec![0.0, 5.0, 10.0, 15.0, 20.0, 25.0, 30.0, 35.0, 40.0],
            vec![0.0, 2.0, 5.0, 9.0, 14.0, 18.0, 21.0, 23.0, 25.0],
        )
        .expect("built-in table is valid")
    }
}

impl AeroLookupTable {
    pub fn new(wind_speeds: Vec<f64>, target_angles: Vec<f64>) -> Result<Self, ConfigError> {
        if wind_speeds.len() != target_angles.len() {
            return Err(ConfigError::MismatchedTableLengths {
                speeds: wind_speeds.len(),
                angles: target_angles.len(),
            });
        }

        if wind_speeds.is_empty() {
            return Err(ConfigError::EmptyTable);
        }

        if wind_speeds
            .iter()
            .chain(target_angles.iter())
            .any(|v| !v.is_finite())
        {
            return Err(ConfigError::NonFiniteTableEntry);
        }

        if wind_speeds.windows(2).any(|pair| pair[0] >= pair[1]) {
            return Err(ConfigError::NonMonotonicWindSpeeds);
        }

        Ok(Self {
            wind_speeds,
            target_angles,
        })
    }

    /// Clamps outside the table range, no extrapolation.
    pub fn interpolate(&self, wind_speed: f64) -> f64 {
        let first_speed = self.wind_speeds[0];
        let last_speed = self.wind_speeds[self.wind_speeds.len() - 1];

        if wind_speed <= first_speed {
            return self.target_angles[0];
        }
        if wind_speed >= last_speed {
            return self.target_angles[self.target_angles.len() - 1];
        }

        let upper = self.wind_speeds.partition_point(|&s| s <= wind_speed);
        let (s0, s1) = (self.wind_speeds[upper - 1], self.wind_speeds[upper]);
        let (a0, a1) = (self.target_angles[upper - 1], self.target_angles[upper]);

        a0 + (wind_speed - s0) * (a1 - a0) / (s1 - s0)
    }
}
