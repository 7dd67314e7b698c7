//! In-memory transport doubles for dispatcher and restore tests.

use std::collections::VecDeque;
use std::sync::{Arc, Mutex};

use async_trait::async_trait;

use crate::error::ClientError;
use crate::outcome::QueryOutcome;
use crate::transport::{QueryTransport, TransportConnector};

#[derive(Default)]
struct Inner {
    executed: Mutex<Vec<String>>,
    responses: Mutex<Vec<(String, VecDeque<QueryOutcome>)>>,
}

/// Scripted transport: responses are matched by statement prefix, queued
/// responses for the same prefix are consumed in order and the last one
/// repeats. Unscripted statements get a plausible default.
pub struct MockTransport {
    database: String,
    user: String,
    inner: Arc<Inner>,
}

impl MockTransport {
    pub fn new() -> Self {
        Self {
            database: "shop".to_string(),
            user: "alice".to_string(),
            inner: Arc::default(),
        }
    }

    /// Queue a response for statements starting with `prefix`.
    pub fn respond(self, prefix: &str, outcome: QueryOutcome) -> Self {
        {
            let mut responses = self.inner.responses.lock().unwrap();
            match responses.iter_mut().find(|(p, _)| p == prefix) {
                Some((_, queue)) => queue.push_back(outcome),
                None => responses.push((prefix.to_string(), VecDeque::from([outcome]))),
            }
        }
        self
    }

    /// Every statement executed so far, across shared handles.
    pub fn executed(&self) -> Vec<String> {
        self.inner.executed.lock().unwrap().clone()
    }

    /// A handle on the same script and execution record, reporting a
    /// different database name.
    pub fn share_as(&self, database: &str) -> MockTransport {
        MockTransport {
            database: database.to_string(),
            user: self.user.clone(),
            inner: Arc::clone(&self.inner),
        }
    }

    pub fn share(&self) -> MockTransport {
        self.share_as(&self.database)
    }

    fn default_outcome(sql: &str) -> QueryOutcome {
        let upper = sql.trim().to_uppercase();
        if upper.starts_with("SELECT") || upper.contains(" RETURNING ") {
            QueryOutcome::with_rows(Vec::new(), Vec::new())
        } else {
            QueryOutcome::command_ok("OK")
        }
    }
}

#[async_trait]
impl QueryTransport for MockTransport {
    async fn execute(&self, sql: &str) -> Result<QueryOutcome, ClientError> {
        self.inner.executed.lock().unwrap().push(sql.to_string());
        let mut responses = self.inner.responses.lock().unwrap();
        for (prefix, queue) in responses.iter_mut() {
            if sql.starts_with(prefix.as_str()) {
                if queue.len() > 1 {
                    if let Some(outcome) = queue.pop_front() {
                        return Ok(outcome);
                    }
                }
                if let Some(outcome) = queue.front() {
                    return Ok(outcome.clone());
                }
            }
        }
        Ok(Self::default_outcome(sql))
    }

    fn database(&self) -> &str {
        &self.database
    }

    fn user(&self) -> &str {
        &self.user
    }
}

/// Connector handing out shared handles of one scripted transport.
pub struct MockConnector {
    target: String,
    template: MockTransport,
}

impl MockConnector {
    pub fn new(target: &str, template: MockTransport) -> Self {
        Self {
            target: target.to_string(),
            template,
        }
    }
}

#[async_trait]
impl TransportConnector for MockConnector {
    async fn connect(&self, database: &str) -> Result<Box<dyn QueryTransport>, ClientError> {
        Ok(Box::new(self.template.share_as(database)))
    }

    fn target_database(&self) -> &str {
        &self.target
    }
}
