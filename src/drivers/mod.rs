pub mod display;
#[cfg(target_os = "espidf")]
pub mod adc;
#[cfg(not(target_os = "espidf"))]
pub mod sim;
