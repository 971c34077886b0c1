pub mod asset;
pub mod boolean;
pub mod conformal;
pub mod creation;
pub mod error;
pub mod extrude;
pub mod math;
pub mod path;
pub mod pipeline;
pub mod raycast;
pub mod solid;
pub mod surface;
pub mod trace;

pub use error::{GravureError, Result};
