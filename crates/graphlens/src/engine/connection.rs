//! Data connection seam
//!
//! The session never talks to a transport directly. It hands every outbound
//! request to a `DataConnection`; responses come back through
//! `GraphSession::handle_message` whenever the transport delivers them.

use tracing::trace;

use crate::core::GraphError;
use crate::engine::protocol::Request;

/// Outbound half of the message-based connection
pub trait DataConnection {
    /// Queue or transmit one request
    fn send(&mut self, request: &Request) -> Result<(), GraphError>;
}

impl<C: DataConnection + ?Sized> DataConnection for Box<C> {
    fn send(&mut self, request: &Request) -> Result<(), GraphError> {
        (**self).send(request)
    }
}

/// In-memory connection that collects requests for later delivery
#[derive(Debug, Default, Clone)]
pub struct RequestQueue {
    requests: Vec<Request>,
}

impl RequestQueue {
    pub fn new() -> Self {
        Self::default()
    }

    /// Requests sent so far, oldest first
    pub fn requests(&self) -> &[Request] {
        &self.requests
    }

    /// Remove and return every queued request
    pub fn drain(&mut self) -> Vec<Request> {
        std::mem::take(&mut self.requests)
    }

    pub fn last(&self) -> Option<&Request> {
        self.requests.last()
    }

    pub fn len(&self) -> usize {
        self.requests.len()
    }

    pub fn is_empty(&self) -> bool {
        self.requests.is_empty()
    }
}

impl DataConnection for RequestQueue {
    fn send(&mut self, request: &Request) -> Result<(), GraphError> {
        trace!(kind = %request.kind, queued = self.requests.len() + 1, "Queueing request");
        self.requests.push(request.clone());
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::Properties;

    fn request(kind: &str) -> Request {
        Request {
            kind: kind.to_string(),
            message: String::new(),
            params: Properties::new(),
        }
    }

    #[test]
    fn test_queue_keeps_order() {
        let mut queue = RequestQueue::new();
        queue.send(&request("expand")).unwrap();
        queue.send(&request("path")).unwrap();
        assert_eq!(queue.len(), 2);
        assert_eq!(queue.last().unwrap().kind, "path");

        let drained = queue.drain();
        assert_eq!(drained[0].kind, "expand");
        assert!(queue.is_empty());
    }

    #[test]
    fn test_boxed_connection() {
        let mut boxed: Box<RequestQueue> = Box::new(RequestQueue::new());
        boxed.send(&request("node")).unwrap();
        assert_eq!(boxed.len(), 1);
    }
}
