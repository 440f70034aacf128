//! D8 hydrology: flow direction and the upstream area it implies.

mod flow_accumulation;
mod flow_direction;

pub use flow_accumulation::flow_accumulation;
pub use flow_direction::{flow_direction, FLOW_NODATA};
