//! Display, I/O and logging helpers shared by the `dockbox2` executables.

// Each executable uses a different subset of these helpers.
#![allow(dead_code, unused_imports)]

pub mod display;
pub mod io;
pub mod logging;
pub mod text;
