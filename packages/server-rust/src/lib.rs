//! `logctx` Server — HTTP request boundary, bounded worker pool, and demo
//! endpoints for request-scoped diagnostic context propagation.

pub mod logging;
pub mod network;
pub mod service;

#[cfg(test)]
mod tests {
    #[test]
    fn crate_loads() {
        // Empty body: if this test runs, the crate compiles and loads.
    }
}
