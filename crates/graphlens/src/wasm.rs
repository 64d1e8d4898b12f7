//! WebAssembly bindings for Graphlens
//!
//! A browser front-end owns the websocket; it forwards every inbound message
//! to `handle_message`, ships whatever `take_requests` returns, and redraws
//! from the snapshot returned by `graph_json`.

use wasm_bindgen::prelude::*;

use crate::core::SessionConfig;
use crate::engine::{ExpandParams, GraphSession, MessageOutcome, NeighborFilter, RequestQueue};

/// Initialize WASM module
///
/// Sets up panic hooks and logging for better error messages in the browser.
#[wasm_bindgen(start)]
pub fn init() {
    console_error_panic_hook::set_once();

    // Logs go to the browser console
    use crate::core::logging::init_logging;
    let _ = init_logging(Some("info"), None);
}

fn js_error(err: impl std::fmt::Display) -> JsValue {
    JsValue::from_str(&err.to_string())
}

/// Browser handle on one exploration session
#[wasm_bindgen]
pub struct WasmGraphSession {
    session: GraphSession<RequestQueue>,
}

#[wasm_bindgen]
impl WasmGraphSession {
    /// Create a session; `config` is an optional JSON `SessionConfig`
    #[wasm_bindgen(constructor)]
    pub fn new(config: Option<String>) -> Result<WasmGraphSession, JsValue> {
        let config = match config {
            Some(json) => SessionConfig::from_json(&json).map_err(js_error)?,
            None => SessionConfig::default(),
        };
        Ok(Self {
            session: GraphSession::with_config(RequestQueue::new(), config),
        })
    }

    /// Feed one inbound message.
    ///
    /// Returns true when the message finalized a batch that changed the graph.
    #[wasm_bindgen(js_name = handleMessage)]
    pub fn handle_message(&mut self, message: &str) -> bool {
        matches!(
            self.session.handle_message(message),
            Some(MessageOutcome::Applied(_))
        )
    }

    /// Queue an expansion of a node towards `neighbors` ("All" or a label)
    pub fn expand(
        &mut self,
        node_id: &str,
        origin: Option<String>,
        neighbors: &str,
    ) -> Result<(), JsValue> {
        let params = ExpandParams {
            origin,
            neighbors: NeighborFilter::parse(neighbors),
        };
        self.session
            .node_expand(node_id, params)
            .map(|_| ())
            .map_err(js_error)
    }

    /// Collapse a node's expansion; fails when it has none
    pub fn collapse(&mut self, node_id: &str) -> Result<(), JsValue> {
        self.session
            .node_collapse(node_id, None)
            .map(|_| ())
            .map_err(js_error)
    }

    pub fn clear(&mut self) {
        self.session.clear_graph();
    }

    /// Drain queued outbound requests as a JSON array
    #[wasm_bindgen(js_name = takeRequests)]
    pub fn take_requests(&mut self) -> Result<String, JsValue> {
        let requests = self.session.connection_mut().drain();
        serde_json::to_string(&requests).map_err(js_error)
    }

    /// Current graph as `{"nodes": [...], "links": [...]}`
    #[wasm_bindgen(js_name = graphJson)]
    pub fn graph_json(&self) -> Result<String, JsValue> {
        serde_json::to_string(self.session.graph()).map_err(js_error)
    }
}
