use super::server::{Handler, Server};
use crate::request::Request;
use crate::response::Response;
use lapin::message::Delivery;
use std::time::Instant;
use tracing::warn;
use wharf_core::AppContext;
use wharf_sync::Retriever;
use tokio::select;

/// One dispatched unit of work: a resolved handler, the decoded request, and
/// the raw delivery needed to write the response back (reply-to, correlation
/// id, and the ack/reject decision).
pub(crate) struct Job {
    pub(crate) server: Server,
    pub(crate) handler: Handler,
    pub(crate) request: Request,
    pub(crate) delivery: Delivery,
}

impl Job {
    async fn run(self) {
        let Job {
            server,
            handler,
            request,
            delivery,
        } = self;

        let extensions = server.extensions_snapshot();

        for extension in &extensions {
            extension.incoming_request(&request);
        }

        let mut response = Response::new();
        let started = Instant::now();
        (handler)(&request, &mut response);
        let elapsed = started.elapsed();

        for extension in &extensions {
            extension.outgoing_response(&request, &response, elapsed, response.status_code());
        }

        if let Err(error) = server.write_response(&delivery, response).await {
            warn!(
                method = request.method(),
                ?error,
                error_message = %error,
                "Failed to write RPC response",
            );
        }
    }
}

/// Runs for the lifetime of the server: repeatedly asks for work through
/// `retriever` and executes whatever [`Job`] it receives.
///
/// Any number of these may run concurrently against the same
/// [`Conduit`](wharf_sync::Conduit), forming the worker pool. Work is
/// naturally capped at the pool size, since [`Server::process_request`]
/// blocks on handing off a job until some worker is ready for it.
pub(crate) async fn run_worker(retriever: Retriever<Job>) {
    loop {
        select! {
            biased;
            _ = AppContext::terminated() => break,
            job = retriever.anticipate() => job.run().await,
        }
    }
}
