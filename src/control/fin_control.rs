use std::cell::RefCell;
use std::rc::Rc;
use std::time::Instant;

use log::{info, warn};

use crate::control::aero::AeroLookupTable;
use crate::control::pid::PidController;
use crate::core::fault::{ConfigError, FinFault};
use crate::core::hardware::{Encoder, FinMotor, WindSensor};
use crate::core::state::{DeploymentState, ElevatorStateMachine};

/// Orchestrates one fixed-cadence control tick: wind speed gates deployment,
/// and only a confirmed DEPLOYED fin is allowed to track the aero target.
pub struct FinController<'a> {
    encoder: Rc<RefCell<dyn Encoder + 'a>>,
    motor: Rc<RefCell<dyn FinMotor + 'a>>,
    wind: Rc<RefCell<dyn WindSensor + 'a>>,
    elevator: ElevatorStateMachine<'a>,
    aero: AeroLookupTable,
    pid: PidController,
    band_low: f64,
    band_high: f64,
    last_command: f64,
    last_state: DeploymentState,
}

impl<'a> FinController<'a> {
    pub fn new(
        encoder: Rc<RefCell<impl Encoder + 'a>>,
        motor: Rc<RefCell<impl FinMotor + 'a>>,
        wind: Rc<RefCell<impl WindSensor + 'a>>,
        elevator: ElevatorStateMachine<'a>,
        aero: AeroLookupTable,
        pid: PidController,
        activation_band: (f64, f64),
    ) -> Result<Self, ConfigError> {
        let (band_low, band_high) = activation_band;
        if !(band_low < band_high) {
            return Err(ConfigError::InvalidActivationBand {
                low: band_low,
                high: band_high,
            });
        }

        Ok(Self {
            encoder,
            motor,
            wind,
            elevator,
            aero,
            pid,
            band_low,
            band_high,
            last_command: 0.0,
            last_state: DeploymentState::UNKNOWN,
        })
    }

    /// One control tick. The PID path runs only while the elevator reports
    /// DEPLOYED; otherwise the fin motor is held neutral and the PID cleared
    /// so no integral accumulates while the fin cannot act.
    pub fn tick(&mut self, now: Instant, dt: f64) -> Result<DeploymentState, FinFault> {
        let wind_speed = self.wind.borrow().read_wind_speed();
        let should_be_active = self.band_low < wind_speed && wind_speed < self.band_high;

        let state = match self.elevator.update_position(should_be_active, dt) {
            Ok(state) => state,
            Err(fault) => {
                self.motor.borrow_mut().stop();
                self.pid.reset();
                self.last_command = 0.0;
                self.last_state = DeploymentState::UNKNOWN;
                return Err(fault);
            }
        };

        if state != self.last_state {
            info!("fin: {:?} -> {:?} (wind {:.1} m/s)", self.last_state, state, wind_speed);
            self.last_state = state;
        }

        if state == DeploymentState::DEPLOYED {
            self.pid.set_setpoint(self.aero.interpolate(wind_speed));

            match self.encoder.borrow().read_position() {
                Some(angle) => {
                    let command = self.pid.update(angle, now);
                    self.motor.borrow_mut().set_drive(command);
                    self.last_command = command;
                }
                None => {
                    // No valid measurement this tick: skip the PID update and
                    // hold the previous command.
                    warn!("fin: position sensor fault, holding last command");
                }
            }
        } else {
            self.motor.borrow_mut().stop();
            self.pid.reset();
            self.last_command = 0.0;
        }

        Ok(state)
    }

    /// Halts both actuators immediately, regardless of state.
    pub fn emergency_stop(&mut self) {
        self.elevator.emergency_stop();
        self.motor.borrow_mut().stop();
        self.pid.reset();
        self.last_command = 0.0;
    }

    pub fn update_gains(&mut self, kp: Option<f64>, ki: Option<f64>, kd: Option<f64>) {
        self.pid.update_gains(kp, ki, kd);
    }

    pub fn get_status(&self) -> DeploymentState {
        self.elevator.get_status()
    }

    pub fn get_fault(&self) -> Option<FinFault> {
        self.elevator.get_fault()
    }

    pub fn clear_fault(&mut self) {
        self.elevator.clear_fault();
    }

    pub fn get_target_angle(&self) -> f64 {
        self.pid.get_setpoint()
    }

    pub fn get_last_command(&self) -> f64 {
        self.last_command
    }
}

#[cfg(test)]
mod fin_control_tests {
    use super::*;
    use crate::simulation::simulated_hardware::{
        RigBottomSwitch, RigTopSwitch, SimulatedElevatorRig, SimulatedEncoder, SimulatedFinMotor,
        SimulatedWind,
    };
    use std::time::Duration;

    struct Harness {
        controller: FinController<'static>,
        encoder: Rc<RefCell<SimulatedEncoder>>,
        motor: Rc<RefCell<SimulatedFinMotor>>,
        wind: Rc<RefCell<SimulatedWind>>,
        rig: Rc<RefCell<SimulatedElevatorRig>>,
        t0: Instant,
    }

    // Rig travel 1.0 at 0.25 per step: four up steps from stowed to deployed.
    fn harness(kp: f64, ki: f64, deadzone: f64, move_timeout: f64) -> Harness {
        let rig = Rc::new(RefCell::new(SimulatedElevatorRig::new(1.0, 0.25)));
        let ls_top = Rc::new(RefCell::new(RigTopSwitch::new(Rc::clone(&rig))));
        let ls_bottom = Rc::new(RefCell::new(RigBottomSwitch::new(Rc::clone(&rig))));
        let elevator =
            ElevatorStateMachine::new(Rc::clone(&rig), ls_top, ls_bottom, move_timeout).unwrap();

        let encoder = Rc::new(RefCell::new(SimulatedEncoder::new(0.0)));
        let motor = Rc::new(RefCell::new(SimulatedFinMotor::new()));
        let wind = Rc::new(RefCell::new(SimulatedWind::new(12.5)));

        let pid =
            PidController::new(kp, ki, 0.0, 0.0, (-100.0, 100.0), deadzone).unwrap();

        let controller = FinController::new(
            Rc::clone(&encoder),
            Rc::clone(&motor),
            Rc::clone(&wind),
            elevator,
            AeroLookupTable::default(),
            pid,
            (5.0, 35.0),
        )
        .unwrap();

        Harness {
            controller,
            encoder,
            motor,
            wind,
            rig,
            t0: Instant::now(),
        }
    }

    fn tick_at(h: &mut Harness, tick: u64) -> Result<DeploymentState, FinFault> {
        h.controller
            .tick(h.t0 + Duration::from_millis(10 * tick), 0.01)
    }

    fn deploy(h: &mut Harness) {
        for tick in 0..4 {
            assert_eq!(tick_at(h, tick), Ok(DeploymentState::MOVING));
        }
        assert_eq!(tick_at(h, 4), Ok(DeploymentState::DEPLOYED));
    }

    #[test]
    fn pid_engages_only_once_deployed() {
        let mut h = harness(1.0, 0.0, 0.1, 10.0);

        // While the elevator climbs, the fin motor stays neutral.
        for tick in 0..4 {
            assert_eq!(tick_at(&mut h, tick), Ok(DeploymentState::MOVING));
            assert_eq!(
                h.motor.borrow().get_drive(),
                0.0,
                "fin motor must stay neutral until deployment is confirmed"
            );
        }

        // Deployed: wind 12.5 m/s -> target 7.0 deg, measured 0 -> kp * 7.0.
        assert_eq!(tick_at(&mut h, 4), Ok(DeploymentState::DEPLOYED));
        assert_eq!(h.controller.get_target_angle(), 7.0);
        assert_eq!(h.motor.borrow().get_drive(), 7.0);
        assert_eq!(h.controller.get_last_command(), 7.0);
    }

    #[test]
    fn wind_outside_band_stows_and_resets_pid() {
        let mut h = harness(1.0, 1.0, 0.1, 10.0);
        deploy(&mut h);

        // Let some integral accumulate while deployed.
        tick_at(&mut h, 5).unwrap();

        h.wind.borrow_mut().set_speed(40.0);
        assert_eq!(
            tick_at(&mut h, 6),
            Ok(DeploymentState::MOVING),
            "wind above the band commands a stow"
        );
        assert_eq!(h.motor.borrow().get_drive(), 0.0, "fin held neutral while stowing");
        assert_eq!(
            h.controller.get_last_command(),
            0.0,
            "command forced to neutral when not deployed"
        );

        for tick in 7..10 {
            assert_eq!(tick_at(&mut h, tick), Ok(DeploymentState::MOVING));
        }
        assert_eq!(tick_at(&mut h, 10), Ok(DeploymentState::STOWED));
    }

    #[test]
    fn band_edges_are_exclusive() {
        let mut h = harness(1.0, 0.0, 0.1, 10.0);

        h.wind.borrow_mut().set_speed(5.0);
        assert_eq!(
            tick_at(&mut h, 0),
            Ok(DeploymentState::STOWED),
            "wind at the lower edge is not active"
        );

        h.wind.borrow_mut().set_speed(35.0);
        assert_eq!(
            tick_at(&mut h, 1),
            Ok(DeploymentState::STOWED),
            "wind at the upper edge is not active"
        );
    }

    #[test]
    fn sensor_fault_holds_previous_command() {
        let mut h = harness(1.0, 0.0, 0.1, 10.0);
        deploy(&mut h);

        let held = h.motor.borrow().get_drive();
        assert!(held != 0.0);

        h.encoder.borrow_mut().set_parity_fault(true);
        assert_eq!(
            tick_at(&mut h, 5),
            Ok(DeploymentState::DEPLOYED),
            "a sensor fault is recovered locally, not surfaced"
        );
        assert_eq!(
            h.motor.borrow().get_drive(),
            held,
            "drive command held across the faulted tick"
        );

        // Measurement returns; control resumes from a fresh reading.
        h.encoder.borrow_mut().set_parity_fault(false);
        h.encoder.borrow_mut().set_position(3.0);
        tick_at(&mut h, 6).unwrap();
        assert_eq!(h.motor.borrow().get_drive(), 4.0, "kp * (7.0 - 3.0)");
    }

    #[test]
    fn move_timeout_surfaces_and_stops_fin() {
        // Timeout shorter than the four ticks the climb needs.
        let mut h = harness(1.0, 0.0, 0.1, 0.025);

        let mut fault = None;
        for tick in 0..10 {
            match tick_at(&mut h, tick) {
                Ok(_) => {}
                Err(f) => {
                    fault = Some(f);
                    break;
                }
            }
        }

        assert!(
            matches!(fault, Some(FinFault::MoveTimeout { .. })),
            "expected a move timeout, got {:?}",
            fault
        );
        assert_eq!(h.motor.borrow().get_drive(), 0.0, "fault forces the fin neutral");
        assert!(
            h.rig.borrow().is_stopped(),
            "fault stops the elevator stepper"
        );
        assert_eq!(h.controller.get_status(), DeploymentState::UNKNOWN);

        // The fault repeats until cleared.
        assert!(tick_at(&mut h, 11).is_err());
        h.controller.clear_fault();
        assert!(tick_at(&mut h, 12).is_ok());
    }

    #[test]
    fn closed_loop_converges_to_lut_target() {
        let mut h = harness(4.5, 0.0, 0.05, 10.0);
        deploy(&mut h);

        // First-order plant: drive scaled to angle rate, integrated per tick.
        let mut angle = 0.0;
        for tick in 5..400 {
            tick_at(&mut h, tick).unwrap();
            angle += h.motor.borrow().get_drive() * 0.5 * 0.01;
            h.encoder.borrow_mut().set_position(angle);
        }

        assert!(
            (angle - 7.0).abs() < 0.1,
            "fin should settle at the 7.0 deg target, got {angle}"
        );
    }

    #[test]
    fn emergency_stop_neutralizes_everything() {
        let mut h = harness(1.0, 0.0, 0.1, 10.0);
        deploy(&mut h);
        assert!(h.motor.borrow().get_drive() != 0.0);

        h.controller.emergency_stop();
        assert_eq!(h.motor.borrow().get_drive(), 0.0);
        assert!(h.rig.borrow().is_stopped());
        assert_eq!(h.controller.get_last_command(), 0.0);
    }

    #[test]
    fn runtime_gain_retune_takes_effect() {
        let mut h = harness(1.0, 0.0, 0.1, 10.0);
        deploy(&mut h);
        assert_eq!(h.motor.borrow().get_drive(), 7.0);

        h.controller.update_gains(Some(2.0), None, None);
        tick_at(&mut h, 5).unwrap();
        assert_eq!(h.motor.borrow().get_drive(), 14.0, "kp doubled at runtime");
    }

    #[test]
    fn rejects_inverted_activation_band() {
        let rig = Rc::new(RefCell::new(SimulatedElevatorRig::new(1.0, 0.25)));
        let ls_top = Rc::new(RefCell::new(RigTopSwitch::new(Rc::clone(&rig))));
        let ls_bottom = Rc::new(RefCell::new(RigBottomSwitch::new(Rc::clone(&rig))));
        let elevator = ElevatorStateMachine::new(Rc::clone(&rig), ls_top, ls_bottom, 10.0).unwrap();

        let result = FinController::new(
            Rc::new(RefCell::new(SimulatedEncoder::new(0.0))),
            Rc::new(RefCell::new(SimulatedFinMotor::new())),
            Rc::new(RefCell::new(SimulatedWind::new(0.0))),
            elevator,
            AeroLookupTable::default(),
            PidController::new(1.0, 0.0, 0.0, 0.0, (-100.0, 100.0), 0.0).unwrap(),
            (35.0, 5.0),
        );

        assert!(matches!(
            result.err(),
            Some(ConfigError::InvalidActivationBand { .. })
        ));
    }
}
