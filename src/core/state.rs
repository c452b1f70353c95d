use std::cell::RefCell;
use std::rc::Rc;

use log::{error, info};

use crate::core::fault::{ConfigError, FinFault};
use crate::core::hardware::{LimitSwitch, StepDirection, StepperMotor};

#[derive(PartialEq, Eq, Hash, Clone, Copy, Debug)]
pub enum DeploymentState {
    STOWED,
    MOVING,
    DEPLOYED,
    UNKNOWN,
}

// A move is state carried across ticks, never a loop that holds the thread.
#[derive(PartialEq, Clone, Copy, Debug)]
pub enum MoveState {
    IDLE,
    MovingUp { elapsed: f64 },
    MovingDown { elapsed: f64 },
}

pub struct ElevatorStateMachine<'a> {
    motor: Rc<RefCell<dyn StepperMotor + 'a>>,
    ls_top: Rc<RefCell<dyn LimitSwitch + 'a>>,
    ls_bottom: Rc<RefCell<dyn LimitSwitch + 'a>>,
    move_state: MoveState,
    move_timeout: f64,
    fault: Option<FinFault>,
}

impl<'a> ElevatorStateMachine<'a> {
    pub fn new(
        motor: Rc<RefCell<impl StepperMotor + 'a>>,
        ls_top: Rc<RefCell<impl LimitSwitch + 'a>>,
        ls_bottom: Rc<RefCell<impl LimitSwitch + 'a>>,
        move_timeout: f64,
    ) -> Result<Self, ConfigError> {
        if !move_timeout.is_finite() || move_timeout <= 0.0 {
            return Err(ConfigError::InvalidMoveTimeout(move_timeout));
        }

        Ok(Self {
            motor,
            ls_top,
            ls_bottom,
            move_state: MoveState::IDLE,
            move_timeout,
            fault: None,
        })
    }

    pub fn is_fully_deployed(&self) -> bool {
        self.ls_top.borrow().is_pressed()
    }

    pub fn is_fully_stowed(&self) -> bool {
        self.ls_bottom.borrow().is_pressed()
    }

    pub fn get_status(&self) -> DeploymentState {
        if self.fault.is_some() {
            return DeploymentState::UNKNOWN;
        }

        let top = self.ls_top.borrow().is_pressed();
        let bottom = self.ls_bottom.borrow().is_pressed();

        match (top, bottom) {
            (true, true) => DeploymentState::UNKNOWN,
            (true, false) => DeploymentState::DEPLOYED,
            (false, true) => DeploymentState::STOWED,
            (false, false) if self.move_state != MoveState::IDLE => DeploymentState::MOVING,
            (false, false) => DeploymentState::UNKNOWN,
        }
    }

    pub fn get_move_state(&self) -> MoveState {
        self.move_state
    }

    pub fn get_fault(&self) -> Option<FinFault> {
        self.fault
    }

    /// One decision tick. Limit switches are ground truth, sampled fresh here
    /// and never cached across ticks. A latched fault repeats until cleared.
    pub fn update_position(
        &mut self,
        should_be_active: bool,
        dt: f64,
    ) -> Result<DeploymentState, FinFault> {
        if let Some(fault) = self.fault {
            return Err(fault);
        }

        let top = self.ls_top.borrow().is_pressed();
        let bottom = self.ls_bottom.borrow().is_pressed();

        if top && bottom {
            return Err(self.latch_fault(FinFault::ContradictorySwitches));
        }

        if should_be_active {
            self.drive_toward(StepDirection::UP, top, dt)
        } else {
            self.drive_toward(StepDirection::DOWN, bottom, dt)
        }
    }

    fn drive_toward(
        &mut self,
        direction: StepDirection,
        at_limit: bool,
        dt: f64,
    ) -> Result<DeploymentState, FinFault> {
        if at_limit {
            // Switch asserted in the commanded direction: stop on this tick,
            // before any further command can be issued.
            if self.move_state != MoveState::IDLE {
                self.motor.borrow_mut().stop();
                self.move_state = MoveState::IDLE;
                info!("elevator: {:?} limit confirmed", direction);
            }

            return Ok(match direction {
                StepDirection::UP => DeploymentState::DEPLOYED,
                StepDirection::DOWN => DeploymentState::STOWED,
            });
        }

        // Reversing direction starts a new move with a fresh deadline.
        let elapsed = match (direction, self.move_state) {
            (StepDirection::UP, MoveState::MovingUp { elapsed }) => elapsed + dt,
            (StepDirection::DOWN, MoveState::MovingDown { elapsed }) => elapsed + dt,
            _ => {
                info!("elevator: moving toward {:?} limit", direction);
                0.0
            }
        };

        if elapsed > self.move_timeout {
            return Err(self.latch_fault(FinFault::MoveTimeout { direction, elapsed }));
        }

        self.move_state = match direction {
            StepDirection::UP => MoveState::MovingUp { elapsed },
            StepDirection::DOWN => MoveState::MovingDown { elapsed },
        };
        self.motor.borrow_mut().step(direction);

        Ok(DeploymentState::MOVING)
    }

    fn latch_fault(&mut self, fault: FinFault) -> FinFault {
        self.motor.borrow_mut().stop();
        self.move_state = MoveState::IDLE;
        self.fault = Some(fault);
        error!("elevator: {fault}");
        fault
    }

    /// Halts the actuator immediately. Logical state is untouched, only the
    /// physical command.
    pub fn emergency_stop(&mut self) {
        self.motor.borrow_mut().stop();
    }

    /// Faults require external intervention, there is no auto-retry.
    pub fn clear_fault(&mut self) {
        self.fault = None;
        self.move_state = MoveState::IDLE;
    }
}
