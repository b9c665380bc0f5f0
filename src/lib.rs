//! portwatch: monitor de puertos TCP en escucha para Linux.
//!
//! Lee `/proc` para asociar cada puerto a su proceso, lo clasifica, sigue su
//! antigüedad entre escaneos y permite terminarlo con un análisis previo de
//! impacto.

pub mod classify;
pub mod config;
pub mod engine;
pub mod error;
pub mod inode;
pub mod interface;
pub mod observation;
pub mod process_table;
pub mod safety;
pub mod service;
pub mod simulate;
pub mod socket_table;
pub mod source;
pub mod terminate;

pub use config::EngineConfig;
pub use engine::Engine;
pub use error::{EngineError, Result};
