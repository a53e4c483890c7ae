use std::net::{IpAddr, SocketAddr};
use std::sync::Arc;

use futures_util::{SinkExt, StreamExt};
use log::{debug, info};
use tokio::sync::Mutex;
use warp::ws::{Message, WebSocket};
use warp::{http::StatusCode, reply, Filter, Rejection, Reply};

use crate::broadcast::BroadcastHub;
use crate::control::control_plane::ControlPlane;
use crate::error_handling::types::{ControlError, WebError};
use crate::state_sync::engine::SyncHandle;
use crate::web_interface::types::{ApiError, LogsQuery, SequenceResponse};

/// Web server for the HTTP API, dashboard page and event stream
pub struct WebServer {
    control: Arc<ControlPlane>,
    sync: SyncHandle,
    hub: Arc<Mutex<BroadcastHub>>,
}

impl WebServer {
    pub fn new(
        control: Arc<ControlPlane>,
        sync: SyncHandle,
        hub: Arc<Mutex<BroadcastHub>>,
    ) -> Self {
        Self { control, sync, hub }
    }

    /// Start the web server on the given address and port
    pub async fn start(&self, bind_address: &str, port: u16) -> Result<(), WebError> {
        let ip: IpAddr = bind_address
            .parse()
            .map_err(|_| WebError::BindError(bind_address.to_string()))?;

        // Clone shared deps into filters
        let control_for_services = self.control.clone();
        let control_for_start = self.control.clone();
        let control_for_stop = self.control.clone();
        let control_for_containers = self.control.clone();
        let control_for_c_start = self.control.clone();
        let control_for_c_stop = self.control.clone();
        let control_for_c_remove = self.control.clone();
        let control_for_logs = self.control.clone();
        let control_for_system = self.control.clone();
        let sync = self.sync.clone();
        let hub = self.hub.clone();

        // GET / -> dashboard
        let dashboard = warp::path::end().and(warp::get()).and_then(|| async move {
            let html = r#"<html><head><title>Dockhand</title></head>
                <body><h1>Dockhand is running</h1><p>See /services for JSON, /events for the live stream.</p></body></html>"#;
            Ok::<_, Rejection>(reply::html(html))
        });

        // GET /health -> sync loop health
        let health = warp::path("health")
            .and(warp::path::end())
            .and(warp::get())
            .and_then(move || {
                let sync = sync.clone();
                async move {
                    let health = sync.health().await;
                    let status = if health.runtime_available {
                        StatusCode::OK
                    } else {
                        StatusCode::SERVICE_UNAVAILABLE
                    };
                    Ok::<_, Rejection>(reply::with_status(reply::json(&health), status))
                }
            });

        // GET /services -> current service view
        let list_services = warp::path("services")
            .and(warp::path::end())
            .and(warp::get())
            .and_then(move || {
                let control = control_for_services.clone();
                async move {
                    let services = control.list_services().await;
                    Ok::<_, Rejection>(reply::json(&services))
                }
            });

        // POST /services/:id/start
        let start_service = warp::path!("services" / String / "start")
            .and(warp::post())
            .and_then(move |id: String| {
                let control = control_for_start.clone();
                async move {
                    let result = control.start_service(&id).await;
                    Ok::<_, Rejection>(outcome_response(result))
                }
            });

        // POST /services/:id/stop
        let stop_service = warp::path!("services" / String / "stop")
            .and(warp::post())
            .and_then(move |id: String| {
                let control = control_for_stop.clone();
                async move {
                    let result = control.stop_service(&id).await;
                    Ok::<_, Rejection>(outcome_response(result))
                }
            });

        // GET /containers -> current container view
        let list_containers = warp::path("containers")
            .and(warp::path::end())
            .and(warp::get())
            .and_then(move || {
                let control = control_for_containers.clone();
                async move {
                    let containers = control.list_containers().await;
                    Ok::<_, Rejection>(reply::json(&containers))
                }
            });

        // POST /containers/:id/start
        let start_container = warp::path!("containers" / String / "start")
            .and(warp::post())
            .and_then(move |id: String| {
                let control = control_for_c_start.clone();
                async move {
                    let result = control.start_container(&id).await;
                    Ok::<_, Rejection>(sequence_response(result))
                }
            });

        // POST /containers/:id/stop
        let stop_container = warp::path!("containers" / String / "stop")
            .and(warp::post())
            .and_then(move |id: String| {
                let control = control_for_c_stop.clone();
                async move {
                    let result = control.stop_container(&id).await;
                    Ok::<_, Rejection>(sequence_response(result))
                }
            });

        // GET /containers/:id/logs?tail=N
        let container_logs = warp::path!("containers" / String / "logs")
            .and(warp::get())
            .and(warp::query::<LogsQuery>())
            .and_then(move |id: String, query: LogsQuery| {
                let control = control_for_logs.clone();
                async move {
                    let result = control.container_logs(&id, query.tail.unwrap_or(100)).await;
                    Ok::<_, Rejection>(match result {
                        Ok(logs) => reply::with_status(reply::json(&logs), StatusCode::OK)
                            .into_response(),
                        Err(e) => error_response(&e),
                    })
                }
            });

        // GET /system -> engine version and object counts
        let system_info = warp::path("system")
            .and(warp::path::end())
            .and(warp::get())
            .and_then(move || {
                let control = control_for_system.clone();
                async move {
                    Ok::<_, Rejection>(match control.system_info().await {
                        Ok(info) => reply::with_status(reply::json(&info), StatusCode::OK)
                            .into_response(),
                        Err(e) => error_response(&e),
                    })
                }
            });

        // DELETE /containers/:id
        let remove_container = warp::path!("containers" / String)
            .and(warp::delete())
            .and_then(move |id: String| {
                let control = control_for_c_remove.clone();
                async move {
                    let result = control.remove_container(&id).await;
                    Ok::<_, Rejection>(sequence_response(result))
                }
            });

        // GET /events -> websocket event stream
        let events = warp::path("events")
            .and(warp::path::end())
            .and(warp::ws())
            .map(move |ws: warp::ws::Ws| {
                let hub = hub.clone();
                ws.on_upgrade(move |socket| stream_events(socket, hub))
            });

        // Compose routes
        let routes = dashboard
            .or(health)
            .or(list_services)
            .or(start_service)
            .or(stop_service)
            .or(list_containers)
            .or(start_container)
            .or(stop_container)
            .or(container_logs)
            .or(remove_container)
            .or(system_info)
            .or(events);

        let addr: SocketAddr = (ip, port).into();
        info!("Web server listening on {}", addr);
        warp::serve(routes).run(addr).await;

        Ok(())
    }
}

/// Forwards hub events to one websocket client until either side closes.
async fn stream_events(socket: WebSocket, hub: Arc<Mutex<BroadcastHub>>) {
    let (mut ws_tx, mut ws_rx) = socket.split();
    let (id, mut events) = hub.lock().await.subscribe();

    loop {
        tokio::select! {
            event = events.recv() => {
                let event = match event {
                    Some(event) => event,
                    None => break,
                };
                let json = match serde_json::to_string(&event) {
                    Ok(json) => json,
                    Err(e) => {
                        debug!("Dropping unserializable event: {}", e);
                        continue;
                    }
                };
                if ws_tx.send(Message::text(json)).await.is_err() {
                    break;
                }
            }
            incoming = ws_rx.next() => {
                match incoming {
                    Some(Ok(message)) if message.is_close() => break,
                    Some(Ok(_)) => {} // the stream is one-way; ignore client messages
                    _ => break,
                }
            }
        }
    }

    hub.lock().await.unsubscribe(id);
}

fn outcome_response(
    result: Result<crate::control::types::ServiceCommandOutcome, ControlError>,
) -> warp::reply::Response {
    match result {
        Ok(outcome) if outcome.success => {
            reply::with_status(reply::json(&outcome), StatusCode::OK).into_response()
        }
        // the command ran but failed; return its captured output
        Ok(outcome) => {
            reply::with_status(reply::json(&outcome), StatusCode::INTERNAL_SERVER_ERROR)
                .into_response()
        }
        Err(e) => error_response(&e),
    }
}

fn sequence_response(result: Result<u64, ControlError>) -> warp::reply::Response {
    match result {
        Ok(sequence) => {
            reply::with_status(reply::json(&SequenceResponse { sequence }), StatusCode::OK)
                .into_response()
        }
        Err(e) => error_response(&e),
    }
}

fn error_response(error: &ControlError) -> warp::reply::Response {
    let status = match error {
        ControlError::UnknownService(_) | ControlError::UnknownContainer(_) => {
            StatusCode::NOT_FOUND
        }
        ControlError::CommandInFlight(_) => StatusCode::CONFLICT,
        ControlError::Reconcile(_) | ControlError::Runtime(_) => {
            StatusCode::INTERNAL_SERVER_ERROR
        }
    };
    reply::with_status(reply::json(&ApiError::new(error.to_string())), status).into_response()
}
