#![allow(dead_code)]

use hyper::service::{make_service_fn, service_fn};
use hyper::{Body, Response, Server, StatusCode};
use std::convert::Infallible;
use std::net::SocketAddr;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

/// In-process target that answers every request with `status` after
/// `delay`, counting the requests it has seen.
pub struct Stub {
    pub addr: SocketAddr,
    hits: Arc<AtomicU64>,
}

impl Stub {
    pub fn spawn(status: StatusCode, delay: Duration) -> Self {
        let hits = Arc::new(AtomicU64::new(0));
        let counter = hits.clone();

        let make_svc = make_service_fn(move |_conn| {
            let counter = counter.clone();
            async move {
                Ok::<_, Infallible>(service_fn(move |_req| {
                    counter.fetch_add(1, Ordering::SeqCst);
                    async move {
                        if !delay.is_zero() {
                            tokio::time::sleep(delay).await;
                        }
                        let mut response = Response::new(Body::from(r#"[{"id":1,"name":"user"}]"#));
                        *response.status_mut() = status;
                        Ok::<_, Infallible>(response)
                    }
                }))
            }
        });

        let server = Server::bind(&SocketAddr::from(([127, 0, 0, 1], 0))).serve(make_svc);
        let addr = server.local_addr();
        tokio::spawn(server);
        Self { addr, hits }
    }

    pub fn hits(&self) -> u64 {
        self.hits.load(Ordering::SeqCst)
    }

    pub fn users_url(&self) -> String {
        format!("http://{}/users", self.addr)
    }
}
