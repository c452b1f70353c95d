use std::{
    cell::RefCell,
    rc::Rc,
    thread,
    time::{Duration, Instant},
};

use aerofin::{
    AeroLookupTable, ElevatorStateMachine, FinController, FinPhysics, PidController,
    RigBottomSwitch, RigTopSwitch, SimulatedElevatorRig, SimulatedEncoder, SimulatedFinMotor,
    SimulatedWind, ui,
};
use chrono::Local;
use fern::Dispatch;

const TICK_PERIOD: Duration = Duration::from_millis(10);
const SIM_DURATION_SECS: f64 = 60.0;

fn setup_logger() -> Result<(), Box<dyn std::error::Error>> {
    Dispatch::new()
        .format(|out, message, record| {
            out.finish(format_args!(
                "[{}][{}][{}] {}",
                Local::now().format("%Y-%m-%d %H:%M:%S"),
                record.level(),
                record.target(),
                message
            ))
        })
        .level(log::LevelFilter::Debug)
        .chain(std::fs::File::create("aerofin.log")?)
        .chain(std::io::stdout())
        .apply()?;

    Ok(())
}

fn main() {
    setup_logger().expect("failed");

    println!("aerofin control demo.");

    let rig = Rc::new(RefCell::new(SimulatedElevatorRig::new(1.0, 0.005)));
    let ls_top = Rc::new(RefCell::new(RigTopSwitch::new(Rc::clone(&rig))));
    let ls_bottom = Rc::new(RefCell::new(RigBottomSwitch::new(Rc::clone(&rig))));

    let encoder = Rc::new(RefCell::new(SimulatedEncoder::new(0.0)));
    let fin_motor = Rc::new(RefCell::new(SimulatedFinMotor::new()));
    let wind = Rc::new(RefCell::new(SimulatedWind::new(25.0)));

    let elevator = ElevatorStateMachine::new(Rc::clone(&rig), ls_top, ls_bottom, 10.0)
        .expect("elevator config");

    let pid = PidController::new(4.5, 1.5, 0.0, 0.0, (-100.0, 100.0), 0.5).expect("pid config");

    let mut controller = FinController::new(
        Rc::clone(&encoder),
        Rc::clone(&fin_motor),
        Rc::clone(&wind),
        elevator,
        AeroLookupTable::default(),
        pid,
        (5.0, 35.0),
    )
    .expect("controller config");

    let mut physics = FinPhysics::new(0.0, 0.05);

    let start = Instant::now();
    let mut previous = start;
    loop {
        let now = Instant::now();
        let dt_secs = now.duration_since(previous).as_secs_f64();
        previous = now;

        let elapsed = now.duration_since(start).as_secs_f64();
        if elapsed >= SIM_DURATION_SECS {
            println!("simulation finished.");
            break;
        }

        // Sinusoidal gusts sweep in and out of the activation band.
        let wind_speed = 25.0 + 15.0 * (0.15 * elapsed).sin();
        wind.borrow_mut().set_speed(wind_speed);

        if let Err(fault) = controller.tick(now, dt_secs) {
            log::error!("control fault, shutting down: {fault}");
            controller.emergency_stop();
            break;
        }

        // Plant Loop - decide what happened -> outputs 'angle'
        physics.set_drive(fin_motor.borrow().get_drive());
        physics.update(dt_secs);
        encoder.borrow_mut().set_position(physics.get_angle());

        ui::terminal_ui::log_to_terminal(&controller, &physics, rig.borrow(), wind_speed);

        thread::sleep(TICK_PERIOD);
    }
}
