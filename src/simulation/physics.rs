/// First-order fin plant: drive duty maps to angular rate. Good enough to
/// exercise the control loop without modeling aerodynamic load.
pub struct FinPhysics {
    // Parameters
    rate_per_duty: f64, // deg/s per unit of drive duty

    // State
    angle: f64, // deg

    // Input
    drive: f64,
}

impl FinPhysics {
    pub fn new(initial_angle: f64, rate_per_duty: f64) -> Self {
        Self {
            rate_per_duty,
            angle: initial_angle,
            drive: 0.0,
        }
    }

    pub fn update(&mut self, dt: f64) {
        if dt <= 0.0 {
            return;
        }

        self.angle += self.drive * self.rate_per_duty * dt;
    }

    pub fn set_drive(&mut self, drive: f64) {
        self.drive = drive;
    }

    pub fn get_angle(&self) -> f64 {
        self.angle
    }
}
