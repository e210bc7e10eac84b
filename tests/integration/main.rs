//! Integration test driver for `tests/integration/` submodule.
//!
//! Each `mod` below maps to a file that exercises a specific subsystem
//! against mock adapters.  All tests run on the host with no real hardware
//! and no real time passing.

mod bringup_tests;
mod mock_hw;
mod session_tests;
mod sim_end_to_end_tests;
