use std::cell::Ref;

use crate::control::fin_control::FinController;
use crate::core::state::DeploymentState;
use crate::simulation::physics::FinPhysics;
use crate::simulation::simulated_hardware::SimulatedElevatorRig;

pub struct DisplayData {
    pub wind_speed: f64,
    pub deployment_state: String,
    pub target_angle: f64,
    pub fin_angle: f64,
    pub drive_command: f64,
    pub carriage_position: f64,
}

pub fn format_deployment_state(state: DeploymentState) -> String {
    match state {
        DeploymentState::STOWED => "STOWED".to_string(),
        DeploymentState::MOVING => "MOVING".to_string(),
        DeploymentState::DEPLOYED => "DEPLOYED".to_string(),
        DeploymentState::UNKNOWN => "UNKNOWN".to_string(),
    }
}

pub fn log_to_terminal(
    controller: &FinController,
    physics: &FinPhysics,
    rig: Ref<SimulatedElevatorRig>,
    wind_speed: f64,
) {
    let display_data = DisplayData {
        wind_speed,
        deployment_state: format_deployment_state(controller.get_status()),
        target_angle: controller.get_target_angle(),
        fin_angle: physics.get_angle(),
        drive_command: controller.get_last_command(),
        carriage_position: rig.get_position(),
    };

    print!("\x1B[2J\x1B[1;1H");

    println!("--- Wind ---");
    println!("Speed: {:.1} m/s", display_data.wind_speed);

    println!("\n--- Elevator ---");
    println!("State: {}", display_data.deployment_state);
    println!("Carriage: {:.2}", display_data.carriage_position);

    println!("\n--- Fin Control ---");
    println!("Target Angle: {:.2} deg", display_data.target_angle);
    println!("Fin Angle: {:.2} deg", display_data.fin_angle);
    println!("Drive Command: {:.2}", display_data.drive_command);
    println!("----------------------\n");
}
