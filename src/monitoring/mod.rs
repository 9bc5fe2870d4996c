/*!
 * Monitoring
 * Tracing subscriber setup and run spans
 */

mod tracer;

pub use tracer::{init_tracing, RunSpan};
