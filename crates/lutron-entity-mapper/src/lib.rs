//! Entity mapping between the hub and a Lutron Caseta bridge
//!
//! This crate provides the EntityMapper, which translates hub commands into
//! bridge calls and bridge state into hub entity attributes, and the Driver,
//! which owns the bridge connection lifecycle and feeds bridge notifications
//! into the mapper.

mod cover;
mod driver;
mod error;
mod light;
mod mapper;

pub use cover::{toggle_target, Direction};
pub use driver::Driver;
pub use error::{MapperError, MapperResult};
pub use light::BRIGHTNESS_PARAM;
pub use mapper::{EntityMapper, SharedEntityMapper, SyncSummary};
