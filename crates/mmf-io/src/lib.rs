//! I/O for the MERRILL Tecplot conversion pipeline.
//!
//! This crate provides:
//! - **Tecplot (`*.tec`)** incremental reader producing a normalized
//!   mesh + field-snapshot model
//! - **Container writer** for VTK XML unstructured grids (`.vtu`) with
//!   inline binary arrays
//! - **Descriptor writer** for ParaView temporal collections (`.pvd`),
//!   one entry per snapshot

mod error;
pub mod pvd;
pub mod tecplot;
pub mod vtu;

pub use error::{MmfError, Result};
pub use pvd::PvdWriter;
pub use tecplot::{Axis, TecplotError, parse_file, parse_reader, parse_str};
pub use vtu::VtuWriter;
