use std::sync::Arc;

use snip_core::ExternalStore;
use snip_engine::ShortenerEngine;

/// Engine type served by the gateway, independent of the store backend.
pub type Engine = ShortenerEngine<dyn ExternalStore>;

#[derive(Clone)]
pub struct AppState {
    engine: Arc<Engine>,
}

impl AppState {
    pub fn new(engine: Arc<Engine>) -> Self {
        Self { engine }
    }

    pub fn engine(&self) -> &Engine {
        &self.engine
    }
}
