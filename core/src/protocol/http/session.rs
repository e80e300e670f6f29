/*
 * session.rs
 * Copyright (C) 2026 Chris Burdess
 *
 * This file is part of Ruscello, a streaming HTTP client.
 *
 * Ruscello is free software: you can redistribute it and/or modify
 * it under the terms of the GNU General Public License as published by
 * the Free Software Foundation, either version 3 of the License, or
 * (at your option) any later version.
 *
 * Ruscello is distributed in the hope that it will be useful,
 * but WITHOUT ANY WARRANTY; without even the implied warranty of
 * MERCHANTABILITY or FITNESS FOR A PARTICULAR PURPOSE.  See the
 * GNU General Public License for more details.
 *
 * You should have received a copy of the GNU General Public License
 * along with Ruscello.  If not, see <http://www.gnu.org/licenses/>.
 */

//! Cancellable requests. A `Session` runs one request at a time; `terminate` (from any
//! task or thread) raises the close signal of the in-flight socket, and the transport
//! error that the blocked read then returns is reported as a normal completion.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, MutexGuard};

use serde_json::Value;
use tokio::sync::watch;

use crate::config::ClientConfig;
use crate::error::Error;
use crate::json::JsonStreamParser;
use crate::protocol::http::client::{self, HttpClient};
use crate::protocol::http::request::{Body, Method, Request};
use crate::stream::StreamParser;

#[derive(Debug, Default)]
struct Shared {
    intentional_termination: AtomicBool,
    /// Close signal of the request in flight, if any.
    active: Mutex<Option<watch::Sender<bool>>>,
}

impl Shared {
    fn active(&self) -> MutexGuard<'_, Option<watch::Sender<bool>>> {
        self.active.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    fn terminate(&self) {
        self.intentional_termination.store(true, Ordering::SeqCst);
        let active = self.active();
        match active.as_ref() {
            Some(signal) => {
                // false -> true happens once; later calls change nothing
                let closed_now = signal.send_if_modified(|closed| !std::mem::replace(closed, true));
                if closed_now {
                    log::info!("session terminated by caller");
                }
            }
            None => log::debug!("terminate with no request in flight"),
        }
    }

    fn is_terminated(&self) -> bool {
        self.intentional_termination.load(Ordering::SeqCst)
    }
}

/// Clears the in-flight signal when the request ends, including when its future is dropped.
struct InFlight<'a>(&'a Shared);

impl Drop for InFlight<'_> {
    fn drop(&mut self) {
        *self.0.active() = None;
        log::debug!("session closed");
    }
}

/// Cloneable handle that terminates the owning session's in-flight request.
#[derive(Debug, Clone)]
pub struct TerminateHandle {
    shared: Arc<Shared>,
}

impl TerminateHandle {
    pub fn terminate(&self) {
        self.shared.terminate();
    }

    pub fn is_terminated(&self) -> bool {
        self.shared.is_terminated()
    }
}

#[derive(Debug, Default)]
pub struct Session {
    client: HttpClient,
    shared: Arc<Shared>,
}

impl Session {
    pub fn new(config: ClientConfig) -> Self {
        Self::from_client(HttpClient::new(config))
    }

    pub fn from_client(client: HttpClient) -> Self {
        Self {
            client,
            shared: Arc::new(Shared::default()),
        }
    }

    pub fn client(&self) -> &HttpClient {
        &self.client
    }

    pub async fn get<F>(&self, uri: &str, on_value: F) -> Result<(), Error>
    where
        F: FnMut(Value),
    {
        self.send(Request::new(Method::Get, uri)?, on_value).await
    }

    pub async fn post<F>(&self, uri: &str, body: impl Into<Body>, on_value: F) -> Result<(), Error>
    where
        F: FnMut(Value),
    {
        self.send(Request::post(uri, body)?, on_value).await
    }

    pub async fn put<F>(&self, uri: &str, body: impl Into<Body>, on_value: F) -> Result<(), Error>
    where
        F: FnMut(Value),
    {
        self.send(Request::put(uri, body)?, on_value).await
    }

    pub async fn delete<F>(&self, uri: &str, on_value: F) -> Result<(), Error>
    where
        F: FnMut(Value),
    {
        self.send(Request::new(Method::Delete, uri)?, on_value).await
    }

    pub async fn send<F>(&self, request: Request, on_value: F) -> Result<(), Error>
    where
        F: FnMut(Value),
    {
        let mut parser = JsonStreamParser::new(&self.client.config().parser);
        self.send_with_parser(request, &mut parser, on_value).await
    }

    /// Run `request` under this session. Resets the termination flag, then behaves like
    /// `HttpClient::send_with_parser` except that a transport failure caused by
    /// `terminate` returns `Ok(())`.
    pub async fn send_with_parser<P, F>(&self, request: Request, parser: &mut P, mut on_value: F) -> Result<(), Error>
    where
        P: StreamParser,
        F: FnMut(P::Value),
    {
        let signal = {
            let mut active = self.shared.active();
            if active.is_some() {
                return Err(Error::Configuration(
                    "session already has a request in flight".to_string(),
                ));
            }
            let (tx, rx) = watch::channel(false);
            self.shared.intentional_termination.store(false, Ordering::SeqCst);
            *active = Some(tx);
            rx
        };
        let in_flight = InFlight(&self.shared);
        log::debug!("session open {}", request.target().host_header());
        let result = client::run(
            self.client.config(),
            &request,
            Some(signal),
            parser,
            &mut on_value,
            true,
        )
        .await;
        drop(in_flight);
        match result {
            Err(e) if e.is_transport() && self.shared.is_terminated() => {
                log::debug!("transport error after terminate suppressed: {}", e);
                Ok(())
            }
            other => other,
        }
    }

    /// Mark the session intentionally terminated and close the in-flight socket, if any.
    /// Safe to call from any task or thread, any number of times.
    pub fn terminate(&self) {
        self.shared.terminate();
    }

    pub fn is_terminated(&self) -> bool {
        self.shared.is_terminated()
    }

    pub fn terminate_handle(&self) -> TerminateHandle {
        TerminateHandle {
            shared: Arc::clone(&self.shared),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn terminate_without_request_sets_flag() {
        let session = Session::default();
        assert!(!session.is_terminated());
        session.terminate();
        session.terminate();
        assert!(session.is_terminated());
    }

    #[test]
    fn handle_shares_state() {
        let session = Session::default();
        let handle = session.terminate_handle();
        let other = handle.clone();
        other.terminate();
        assert!(session.is_terminated());
        assert!(handle.is_terminated());
    }

    #[test]
    fn signal_raised_once() {
        let shared = Shared::default();
        let (tx, mut rx) = watch::channel(false);
        *shared.active() = Some(tx);
        shared.terminate();
        assert!(rx.has_changed().unwrap());
        assert!(*rx.borrow_and_update());
        shared.terminate();
        assert!(!rx.has_changed().unwrap());
    }

    #[test]
    fn session_is_shareable_across_threads() {
        fn assert_send_sync<T: Send + Sync>() {}
        assert_send_sync::<Session>();
        assert_send_sync::<TerminateHandle>();
    }

    #[tokio::test]
    async fn invalid_uri_is_not_suppressed() {
        let session = Session::default();
        session.terminate();
        let err = session.get("ftp://example.com/", |_| {}).await.unwrap_err();
        assert!(matches!(err, Error::InvalidUri(_)));
    }
}
