mod bit;
pub use bit::*;

pub mod input;
pub mod restart;
pub mod welcome_screen;

mod ribbit_communication;
pub use ribbit_communication::*;

pub mod window_resizing;
