//! HTTP map server.
//!
//! Serves full-extent terrain maps rendered from the tile store:
//!
//! - `GET /` JSON summary of the world
//! - `GET /terrain/color_map.jpg?scale=<f64 >= 1>`
//! - `GET /terrain/height_map.jpg?scale=<f64 >= 1>`
//!
//! Routing is a pure function of the request line and the store so it can be
//! tested without opening a socket.

use std::io::Cursor;
use std::sync::Arc;
use std::time::Instant;

use image::{DynamicImage, ImageFormat};
use serde::Serialize;
use tiny_http::{Header, Method, Request, Response, Server};
use tracing::{info, warn};

use crate::export::{render_color_map, render_height_map};
use crate::store::WorldStore;

#[derive(Debug, thiserror::Error)]
pub enum ServerError {
    #[error("failed to bind to {addr}: {reason}")]
    Bind { addr: String, reason: String },

    #[error("bad request: {0}")]
    BadRequest(String),

    #[error("no route for {0}")]
    NotFound(String),

    #[error("method {0} not allowed")]
    MethodNotAllowed(String),

    #[error("image encoding failed: {0}")]
    Encode(#[from] image::ImageError),

    #[error("JSON encoding failed: {0}")]
    Json(#[from] serde_json::Error),
}

impl ServerError {
    pub fn status(&self) -> u16 {
        match self {
            ServerError::BadRequest(_) => 400,
            ServerError::NotFound(_) => 404,
            ServerError::MethodNotAllowed(_) => 405,
            ServerError::Bind { .. } | ServerError::Encode(_) | ServerError::Json(_) => 500,
        }
    }
}

/// A response body ready to send.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Reply {
    pub status: u16,
    pub content_type: &'static str,
    pub body: Vec<u8>,
}

impl Reply {
    fn json<T: Serialize>(value: &T) -> Result<Self, ServerError> {
        Ok(Self {
            status: 200,
            content_type: "application/json",
            body: serde_json::to_vec(value)?,
        })
    }

    fn jpeg(body: Vec<u8>) -> Self {
        Self {
            status: 200,
            content_type: "image/jpeg",
            body,
        }
    }

    fn error(err: &ServerError) -> Self {
        #[derive(Serialize)]
        struct ErrorBody {
            error: String,
        }
        let body = serde_json::to_vec(&ErrorBody { error: err.to_string() }).unwrap_or_default();
        Self {
            status: err.status(),
            content_type: "application/json",
            body,
        }
    }
}

#[derive(Serialize)]
struct Summary<'a> {
    message: &'a str,
    width: u32,
    height: u32,
    seed: u64,
    water_level: f64,
    complete: bool,
    endpoints: [&'a str; 2],
}

/// Parse `scale` from a query string. Absent means 1.
pub fn parse_scale(query: Option<&str>) -> Result<f64, ServerError> {
    let Some(query) = query else {
        return Ok(1.0);
    };
    for pair in query.split('&') {
        let (key, value) = pair.split_once('=').unwrap_or((pair, ""));
        if key != "scale" {
            continue;
        }
        let scale: f64 = value
            .parse()
            .map_err(|_| ServerError::BadRequest(format!("scale must be a number (got {value:?})")))?;
        if !scale.is_finite() || scale < 1.0 {
            return Err(ServerError::BadRequest(format!("scale must be >= 1 (got {scale})")));
        }
        return Ok(scale);
    }
    Ok(1.0)
}

fn encode_jpeg(img: DynamicImage) -> Result<Vec<u8>, ServerError> {
    let mut buf = Cursor::new(Vec::new());
    img.write_to(&mut buf, ImageFormat::Jpeg)?;
    Ok(buf.into_inner())
}

/// Answer one request.
pub fn route(method: &Method, url: &str, store: &WorldStore) -> Result<Reply, ServerError> {
    let (path, query) = match url.split_once('?') {
        Some((path, query)) => (path, Some(query)),
        None => (url, None),
    };

    let known = matches!(path, "/" | "/terrain/color_map.jpg" | "/terrain/height_map.jpg");
    if !known {
        return Err(ServerError::NotFound(path.to_string()));
    }
    if *method != Method::Get {
        return Err(ServerError::MethodNotAllowed(method.to_string()));
    }

    match path {
        "/" => {
            let config = store.config();
            Reply::json(&Summary {
                message: "isometric planet map server",
                width: config.width,
                height: config.height,
                seed: config.seed,
                water_level: config.water_level,
                complete: store.terrain.has_data(),
                endpoints: ["/terrain/color_map.jpg", "/terrain/height_map.jpg"],
            })
        }
        "/terrain/color_map.jpg" => {
            let scale = parse_scale(query)?;
            Ok(Reply::jpeg(encode_jpeg(DynamicImage::ImageRgb8(render_color_map(&store.terrain, scale)))?))
        }
        _ => {
            let scale = parse_scale(query)?;
            Ok(Reply::jpeg(encode_jpeg(DynamicImage::ImageLuma8(render_height_map(&store.terrain, scale)))?))
        }
    }
}

/// Blocking HTTP server over a read-only store.
pub struct MapServer {
    server: Server,
    store: Arc<WorldStore>,
}

impl MapServer {
    pub fn bind(addr: &str, store: Arc<WorldStore>) -> Result<Self, ServerError> {
        let server = Server::http(addr).map_err(|e| ServerError::Bind {
            addr: addr.to_string(),
            reason: e.to_string(),
        })?;
        Ok(Self { server, store })
    }

    /// Bound address, e.g. to find the port after binding to port 0.
    pub fn local_addr(&self) -> String {
        self.server.server_addr().to_string()
    }

    /// Serve requests until the process exits.
    pub fn run(&self) {
        info!(addr = %self.local_addr(), "map server listening");
        for request in self.server.incoming_requests() {
            self.handle(request);
        }
    }

    fn handle(&self, request: Request) {
        let start = Instant::now();
        let method = request.method().clone();
        let url = request.url().to_string();

        let reply = match route(&method, &url, &self.store) {
            Ok(reply) => reply,
            Err(err) => {
                warn!(%method, %url, error = %err, "request failed");
                Reply::error(&err)
            }
        };

        info!(
            %method,
            %url,
            status = reply.status,
            bytes = reply.body.len(),
            elapsed_ms = start.elapsed().as_millis() as u64,
            "request served"
        );

        let mut response = Response::from_data(reply.body).with_status_code(reply.status);
        if let Ok(header) = Header::from_bytes(&b"Content-Type"[..], reply.content_type.as_bytes()) {
            response = response.with_header(header);
        }
        if let Err(e) = request.respond(response) {
            warn!(error = %e, "failed to send response");
        }
    }
}
