//! Request dispatcher running inside the background context.
//!
//! For every [`RequestMessage`] the dispatcher:
//! 1. Resolves the destination authority and fetches a pooled client
//! 2. Marks the request as bridge-originated
//! 3. Executes it and materializes the body (buffered unless the server set
//!    the stream sentinel)
//! 4. Replies with a [`ResponseMessage`], then sets the notification cell

use std::sync::Arc;

use bytes::BytesMut;
use http::Method;
use tracing::{debug, info, instrument, warn};
use url::Url;

use fetch_bridge_common::wire::{
    APPLICATION_ERROR_STATUS, BRIDGE_ORIGIN_HEADER, ERROR_BODY_HEADER, STREAM_BODY_HEADER,
    header_value,
};
use fetch_bridge_common::{
    BackgroundEndpoint, BridgeConfig, ErrorPayload, NotifyCell, RequestMessage, ResponseBody,
    ResponseMessage, StreamSender, encode_error, stream_channel,
};

use crate::client::{Authority, Connector, OutboundRequest, PooledClient, UpstreamBody};
use crate::pool::PoolCache;

/// Executes bridged requests through the pool cache.
pub struct Dispatcher<C: Connector> {
    pool: PoolCache<C>,
    stream_capacity: usize,
}

impl<C: Connector> Dispatcher<C> {
    pub fn new(connector: C, config: &BridgeConfig) -> Self {
        Self {
            pool: PoolCache::new(connector),
            stream_capacity: config.stream.channel_capacity,
        }
    }

    /// The pool cache, for inspection.
    pub fn pool(&self) -> &PoolCache<C> {
        &self.pool
    }

    /// Serve requests until the caller endpoint is dropped.
    ///
    /// Each reply is fully enqueued before the cell is set, so a woken caller
    /// always finds its message.
    pub async fn run(mut self, mut endpoint: BackgroundEndpoint, cell: Arc<NotifyCell>) {
        while let Some(request) = endpoint.receive().await {
            let response = self.dispatch(request).await;
            if !endpoint.reply(response) {
                debug!("Caller endpoint closed, stopping dispatcher");
                break;
            }
            cell.notify();
        }
        debug!(
            clients_created = self.pool.clients_created(),
            "Dispatcher stopped"
        );
    }

    /// Execute one request and convert the outcome into a response message.
    ///
    /// Never fails: errors become [`ResponseMessage::Failure`].
    #[instrument(skip(self, request), fields(id = request.id, method = %request.method, url = %request.url))]
    pub async fn dispatch(&mut self, request: RequestMessage) -> ResponseMessage {
        let id = request.id;
        match self.execute(request).await {
            Ok(response) => response,
            Err(payload) => {
                warn!(error = %payload, "Bridged fetch failed");
                ResponseMessage::Failure {
                    id,
                    error: encode_error(&payload),
                }
            }
        }
    }

    async fn execute(&mut self, request: RequestMessage) -> Result<ResponseMessage, ErrorPayload> {
        let RequestMessage {
            id,
            method,
            url,
            mut headers,
            body,
        } = request;

        let url = Url::parse(&url)
            .map_err(|e| ErrorPayload::new("TypeError", format!("Invalid URL '{url}': {e}")))?;
        let authority = Authority::from_url(&url).ok_or_else(|| {
            ErrorPayload::new("TypeError", format!("URL has no network authority: {url}"))
        })?;
        let method = Method::from_bytes(method.as_bytes())
            .map_err(|_| ErrorPayload::new("TypeError", format!("Invalid method '{method}'")))?;

        headers.retain(|(key, _)| !key.eq_ignore_ascii_case(BRIDGE_ORIGIN_HEADER));
        headers.push((BRIDGE_ORIGIN_HEADER.to_string(), "1".to_string()));

        let client = self.pool.client_for(&authority)?;
        let upstream = client
            .execute(OutboundRequest {
                method: method.clone(),
                url,
                headers,
                body,
            })
            .await?;

        let status = upstream.status;
        let body = materialize_body(
            &method,
            status,
            &upstream.headers,
            upstream.body,
            self.stream_capacity,
        )
        .await?;

        info!(
            status = status,
            body = body_kind(&body),
            "Bridged fetch completed"
        );

        Ok(ResponseMessage::Success {
            id,
            status,
            headers: upstream.headers,
            body,
        })
    }
}

impl<C: Connector> std::fmt::Debug for Dispatcher<C> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Dispatcher")
            .field("pool", &self.pool)
            .field("stream_capacity", &self.stream_capacity)
            .finish()
    }
}

/// Responses that carry no body regardless of what the server sends.
fn has_null_body(method: &Method, status: u16) -> bool {
    *method == Method::HEAD || (100..200).contains(&status) || matches!(status, 204 | 205 | 304)
}

/// Decide how the body travels back to the caller.
///
/// An application error is always buffered so the caller can revive it, even
/// if the stream sentinel is also present.
async fn materialize_body(
    method: &Method,
    status: u16,
    headers: &[(String, String)],
    mut body: Box<dyn UpstreamBody>,
    stream_capacity: usize,
) -> Result<ResponseBody, ErrorPayload> {
    if has_null_body(method, status) {
        return Ok(ResponseBody::Null);
    }

    let is_error =
        status == APPLICATION_ERROR_STATUS && header_value(headers, ERROR_BODY_HEADER).is_some();
    let streamed = !is_error && header_value(headers, STREAM_BODY_HEADER).is_some();

    if streamed {
        let (sender, handle) = stream_channel(stream_capacity);
        tokio::spawn(pump_body(body, sender));
        return Ok(ResponseBody::Stream(handle));
    }

    let mut buf = BytesMut::new();
    while let Some(chunk) = body.chunk().await? {
        buf.extend_from_slice(&chunk);
    }
    Ok(ResponseBody::Bytes(buf.freeze()))
}

/// Forward upstream chunks to a stream handle until either side finishes.
async fn pump_body(mut body: Box<dyn UpstreamBody>, sender: StreamSender) {
    loop {
        let next = tokio::select! {
            () = sender.closed() => {
                debug!("Stream handle dropped, releasing upstream body");
                return;
            }
            next = body.chunk() => next,
        };

        match next {
            Ok(Some(chunk)) => {
                if !sender.send_chunk(chunk).await {
                    debug!("Stream handle dropped, releasing upstream body");
                    return;
                }
            }
            Ok(None) => {
                sender.finish().await;
                return;
            }
            Err(payload) => {
                warn!(error = %payload, "Streamed body failed");
                sender.fail(payload.revive()).await;
                return;
            }
        }
    }
}

fn body_kind(body: &ResponseBody) -> &'static str {
    match body {
        ResponseBody::Null => "null",
        ResponseBody::Bytes(_) => "buffered",
        ResponseBody::Stream(_) => "stream",
    }
}
