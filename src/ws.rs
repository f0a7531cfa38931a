use actix::prelude::*;
use actix_web::{web, Error, HttpRequest, HttpResponse};
use actix_web_actors::ws;
use serde::Serialize;
use tracing::{info, warn};

use crate::executor::run_load_test;
use crate::models::dsl_model::RunConfig;
use crate::models::metrics::Metrics;

/// Frames a worker sends back to its controller.
#[derive(Debug, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum WorkerMessage {
    Accepted { name: String },
    Report { metrics: Box<Metrics> },
    Error { message: String },
}

impl WorkerMessage {
    fn to_text(&self) -> String {
        serde_json::to_string(self).unwrap_or_else(|e| {
            format!(r#"{{"type":"error","message":"failed to encode reply: {}"}}"#, e)
        })
    }
}

/// Parses and validates a run request received over the socket.
pub fn parse_run_request(text: &str) -> Result<RunConfig, String> {
    let config = RunConfig::from_json(text).map_err(|e| e.to_string())?;
    config.validate().map_err(|e| e.to_string())?;
    Ok(config)
}

/// One controller connection. Runs at most one load test at a time.
#[derive(Default)]
pub struct WsSession {
    busy: bool,
}

impl WsSession {
    pub fn new() -> Self {
        Self::default()
    }

    fn start_run(&mut self, config: RunConfig, ctx: &mut ws::WebsocketContext<Self>) {
        self.busy = true;
        ctx.text(WorkerMessage::Accepted { name: config.name.clone() }.to_text());

        let run = async move { run_load_test(config).await };
        ctx.spawn(run.into_actor(self).map(|result, act, ctx| {
            act.busy = false;
            let reply = match result {
                Ok(metrics) => WorkerMessage::Report { metrics: Box::new(metrics) },
                Err(e) => WorkerMessage::Error { message: e.to_string() },
            };
            ctx.text(reply.to_text());
        }));
    }
}

impl Actor for WsSession {
    type Context = ws::WebsocketContext<Self>;

    fn started(&mut self, _ctx: &mut Self::Context) {
        info!("worker connection started");
    }
}

impl StreamHandler<Result<ws::Message, ws::ProtocolError>> for WsSession {
    fn handle(&mut self, msg: Result<ws::Message, ws::ProtocolError>, ctx: &mut Self::Context) {
        match msg {
            Ok(ws::Message::Text(text)) => {
                if self.busy {
                    ctx.text(
                        WorkerMessage::Error { message: "a load test is already running".into() }
                            .to_text(),
                    );
                    return;
                }
                match parse_run_request(&text) {
                    Ok(config) => self.start_run(config, ctx),
                    Err(message) => {
                        warn!(%message, "rejected run request");
                        ctx.text(WorkerMessage::Error { message }.to_text());
                    }
                }
            }
            Ok(ws::Message::Ping(bytes)) => ctx.pong(&bytes),
            Ok(ws::Message::Close(reason)) => {
                ctx.close(reason);
                ctx.stop();
            }
            Err(e) => {
                warn!(error = %e, "websocket protocol error");
                ctx.stop();
            }
            _ => {}
        }
    }
}

pub async fn ws_handler(req: HttpRequest, stream: web::Payload) -> Result<HttpResponse, Error> {
    ws::start(WsSession::new(), &req, stream)
}
