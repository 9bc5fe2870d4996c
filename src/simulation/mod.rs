/*!
 * Simulation
 * Trace-driven machine, async driver and run report
 */

pub mod driver;
pub mod os;
pub mod report;
pub mod trace;

pub use driver::Simulation;
pub use os::{BurstTiming, IoRequest, ProcessOutcome, SimulatedOs};
pub use report::{ProcessReport, Report, Summary};
pub use trace::{ProcessSpec, Trace};
