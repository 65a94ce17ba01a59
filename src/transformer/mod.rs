//! The encoder block, one stage per module: diagonal projection, attention
//! scoring, combination with residual and the squared feedforward.

pub mod attention;
pub mod block;
pub mod combine;
pub mod diagonal;
pub mod feedforward;
pub mod positional;
pub mod projection;
pub mod readout;
pub mod reference;
