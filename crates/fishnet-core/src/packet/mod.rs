//! L3 frame layout and FCMP error kinds.

pub mod fcmp;
pub mod header;
