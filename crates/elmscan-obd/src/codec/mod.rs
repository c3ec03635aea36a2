//! OBD-II decoders
//!
//! All decoders fail soft: malformed input produces an invalid marker,
//! `None` or an empty list, never an error.

pub mod dtc;
pub mod pid;
pub mod readiness;
