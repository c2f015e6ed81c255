//! Provider health tracking and selection with background recovery probes.

mod coordinator;

#[cfg(test)]
mod tests;

pub use coordinator::FailoverCoordinator;
