/*!
 * Monitoring Module
 * Logging setup shared by both binaries
 */

pub mod tracer;

pub use tracer::init_tracing;
