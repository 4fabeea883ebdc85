//! Host delegates
//!
//! The four asynchronous operations a host plugs into the interpreter. Each
//! takes the awaited request as a JSON object and answers with the reply
//! payload, or fails with a reason that the script receives as an error value.

use std::fmt;
use std::future::Future;
use std::pin::Pin;
use std::rc::Rc;

use crate::entity::{HostKind, JsonObject};

pub type DelegateFuture = Pin<Box<dyn Future<Output = anyhow::Result<JsonObject>>>>;

/// Shared handle on one host operation
pub type Delegate = Rc<dyn Fn(JsonObject) -> DelegateFuture>;

fn delegate<F, Fut>(f: F) -> Delegate
where
    F: Fn(JsonObject) -> Fut + 'static,
    Fut: Future<Output = anyhow::Result<JsonObject>> + 'static,
{
    Rc::new(move |request| Box::pin(f(request)) as DelegateFuture)
}

#[derive(Clone, Default)]
pub struct Extensions {
    pub run_action: Option<Delegate>,
    pub run_campaign: Option<Delegate>,
    pub device_info_request: Option<Delegate>,
    pub http_request: Option<Delegate>,
}

impl Extensions {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_action<F, Fut>(mut self, f: F) -> Self
    where
        F: Fn(JsonObject) -> Fut + 'static,
        Fut: Future<Output = anyhow::Result<JsonObject>> + 'static,
    {
        self.run_action = Some(delegate(f));
        self
    }

    pub fn with_campaign<F, Fut>(mut self, f: F) -> Self
    where
        F: Fn(JsonObject) -> Fut + 'static,
        Fut: Future<Output = anyhow::Result<JsonObject>> + 'static,
    {
        self.run_campaign = Some(delegate(f));
        self
    }

    pub fn with_device_info<F, Fut>(mut self, f: F) -> Self
    where
        F: Fn(JsonObject) -> Fut + 'static,
        Fut: Future<Output = anyhow::Result<JsonObject>> + 'static,
    {
        self.device_info_request = Some(delegate(f));
        self
    }

    pub fn with_http<F, Fut>(mut self, f: F) -> Self
    where
        F: Fn(JsonObject) -> Fut + 'static,
        Fut: Future<Output = anyhow::Result<JsonObject>> + 'static,
    {
        self.http_request = Some(delegate(f));
        self
    }

    /// Delegate serving an awaited request kind, `None` for reply kinds or
    /// when the host did not provide one
    pub fn for_request(&self, kind: HostKind) -> Option<Delegate> {
        match kind {
            HostKind::Action => self.run_action.clone(),
            HostKind::Campaign => self.run_campaign.clone(),
            HostKind::DeviceInfoRequest => self.device_info_request.clone(),
            HostKind::HttpRequest => self.http_request.clone(),
            _ => None,
        }
    }
}

impl fmt::Debug for Extensions {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Extensions")
            .field("run_action", &self.run_action.is_some())
            .field("run_campaign", &self.run_campaign.is_some())
            .field("device_info_request", &self.device_info_request.is_some())
            .field("http_request", &self.http_request.is_some())
            .finish()
    }
}
