use std::cell::RefCell;
use std::rc::Rc;

use crate::core::{Encoder, FinMotor, LimitSwitch, StepDirection, StepperMotor, WindSensor};

pub struct SimulatedEncoder {
    position: f64,
    parity_fault: bool,
}

impl SimulatedEncoder {
    pub fn new(initial_position: f64) -> Self {
        Self {
            position: initial_position,
            parity_fault: false,
        }
    }

    pub fn set_position(&mut self, position: f64) {
        self.position = position;
    }

    // Models an SPI parity failure: the next reads carry no valid measurement.
    pub fn set_parity_fault(&mut self, faulted: bool) {
        self.parity_fault = faulted;
    }
}

impl Encoder for SimulatedEncoder {
    fn read_position(&self) -> Option<f64> {
        if self.parity_fault {
            None
        } else {
            Some(self.position)
        }
    }
}

pub struct SimulatedFinMotor {
    drive: f64,
}

impl Default for SimulatedFinMotor {
    fn default() -> Self {
        SimulatedFinMotor::new()
    }
}

impl SimulatedFinMotor {
    pub fn new() -> Self {
        Self { drive: 0.0 }
    }

    pub fn get_drive(&self) -> f64 {
        self.drive
    }
}

impl FinMotor for SimulatedFinMotor {
    fn set_drive(&mut self, duty: f64) {
        self.drive = duty;
    }

    fn stop(&mut self) {
        self.drive = 0.0;
    }
}

pub struct SimulatedWind {
    speed: f64,
}

impl SimulatedWind {
    pub fn new(speed: f64) -> Self {
        Self { speed }
    }

    pub fn set_speed(&mut self, speed: f64) {
        self.speed = speed;
    }
}

impl WindSensor for SimulatedWind {
    fn read_wind_speed(&self) -> f64 {
        self.speed
    }
}

/// Stepper-driven carriage between two hard stops. The limit switch views
/// derive their truth from the carriage position, like the real switches
/// derive theirs from the mechanism.
pub struct SimulatedElevatorRig {
    position: f64,
    travel: f64,
    step_size: f64,
    stopped: bool,
}

impl SimulatedElevatorRig {
    pub fn new(travel: f64, step_size: f64) -> Self {
        Self {
            position: 0.0,
            travel,
            step_size,
            stopped: true,
        }
    }

    pub fn get_position(&self) -> f64 {
        self.position
    }

    pub fn is_stopped(&self) -> bool {
        self.stopped
    }

    pub fn at_top(&self) -> bool {
        self.position >= self.travel
    }

    pub fn at_bottom(&self) -> bool {
        self.position <= 0.0
    }
}

impl StepperMotor for SimulatedElevatorRig {
    fn step(&mut self, direction: StepDirection) {
        self.stopped = false;
        self.position = match direction {
            StepDirection::UP => (self.position + self.step_size).min(self.travel),
            StepDirection::DOWN => (self.position - self.step_size).max(0.0),
        };
    }

    fn stop(&mut self) {
        self.stopped = true;
    }
}

pub struct RigTopSwitch {
    rig: Rc<RefCell<SimulatedElevatorRig>>,
}

impl RigTopSwitch {
    pub fn new(rig: Rc<RefCell<SimulatedElevatorRig>>) -> Self {
        Self { rig }
    }
}

impl LimitSwitch for RigTopSwitch {
    fn is_pressed(&self) -> bool {
        self.rig.borrow().at_top()
    }
}

pub struct RigBottomSwitch {
    rig: Rc<RefCell<SimulatedElevatorRig>>,
}

impl RigBottomSwitch {
    pub fn new(rig: Rc<RefCell<SimulatedElevatorRig>>) -> Self {
        Self { rig }
    }
}

impl LimitSwitch for RigBottomSwitch {
    fn is_pressed(&self) -> bool {
        self.rig.borrow().at_bottom()
    }
}
