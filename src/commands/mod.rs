mod prepare;
mod verify;

pub use prepare::prepare;
pub use verify::verify;
