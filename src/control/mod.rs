pub mod aero;
pub mod fin_control;
pub mod pid;

pub use aero::*;
pub use fin_control::*;
pub use pid::*;
