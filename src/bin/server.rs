use std::time::Duration;

use axum::{
    Json, Router,
    http::StatusCode,
    routing::{get, post},
};
use roll_optimizer::error::NestError;
use roll_optimizer::roll_finder::{self, RollOption};
use roll_optimizer::solver::Solver;
use roll_optimizer::types::{NestConfig, PanelDemand, Solution};
use serde::{Deserialize, Serialize};
use tower_http::trace::{DefaultMakeSpan, DefaultOnResponse, TraceLayer};
use tracing::Level;

const MAX_PASSES: usize = 500;
const MAX_PANELS: usize = 50;
const MAX_QUANTITY: u32 = 200;

#[derive(Deserialize, Serialize)]
struct OptimizeRequest {
    #[serde(default = "default_roll_width")]
    roll_width: f64,
    #[serde(default = "default_overlap")]
    overlap: f64,
    #[serde(default = "default_passes")]
    passes: usize,
    #[serde(default)]
    seed: Option<u64>,
    #[serde(default)]
    roll_length: Option<f64>,
    #[serde(default)]
    time_limit_ms: Option<u64>,
    panels: Vec<PanelDemand>,
}

fn default_roll_width() -> f64 {
    NestConfig::DEFAULT_ROLL_WIDTH
}

fn default_overlap() -> f64 {
    NestConfig::DEFAULT_OVERLAP
}

fn default_passes() -> usize {
    NestConfig::DEFAULT_PASSES
}

#[derive(Serialize)]
struct OptimizeResponse {
    #[serde(flatten)]
    solution: Solution,
    length_m: f64,
    piece_count: usize,
    waste_percent: f64,
}

#[derive(Deserialize)]
struct RollFinderRequest {
    width: f64,
    height: f64,
}

fn error_status(e: &NestError) -> StatusCode {
    match e {
        NestError::InvalidInput(_) | NestError::NotFittable { .. } => StatusCode::BAD_REQUEST,
        NestError::PackingFailed | NestError::NoFeasibleLayout { .. } => {
            StatusCode::UNPROCESSABLE_ENTITY
        }
    }
}

fn check_limits(req: &OptimizeRequest) -> Result<(), String> {
    if req.passes > MAX_PASSES {
        return Err(format!("passes must be at most {MAX_PASSES}"));
    }
    if req.panels.len() > MAX_PANELS {
        return Err(format!("at most {MAX_PANELS} panels per request"));
    }
    if let Some(p) = req.panels.iter().find(|p| p.quantity > MAX_QUANTITY) {
        return Err(format!(
            "panel {} quantity must be at most {MAX_QUANTITY}",
            p.id
        ));
    }
    Ok(())
}

async fn optimize(
    Json(req): Json<OptimizeRequest>,
) -> Result<Json<OptimizeResponse>, (StatusCode, String)> {
    tracing::info!(
        body = serde_json::to_string(&req).unwrap_or_default(),
        "POST /optimize"
    );

    check_limits(&req).map_err(|e| (StatusCode::BAD_REQUEST, e))?;

    let config = NestConfig {
        roll_width: req.roll_width,
        overlap: req.overlap,
        passes: req.passes,
        seed: req.seed,
        roll_length: req.roll_length,
        time_limit: req.time_limit_ms.map(Duration::from_millis),
        ..NestConfig::default()
    };
    let solver = Solver::new(config, req.panels);

    let solution = tokio::task::spawn_blocking(move || solver.solve())
        .await
        .map_err(|e| (StatusCode::INTERNAL_SERVER_ERROR, e.to_string()))?
        .map_err(|e| (error_status(&e), e.to_string()))?;

    Ok(Json(OptimizeResponse {
        length_m: solution.length / 100.0,
        piece_count: solution.piece_count(),
        waste_percent: solution.waste_percent(),
        solution,
    }))
}

async fn roll_finder(
    Json(req): Json<RollFinderRequest>,
) -> Result<Json<Vec<RollOption>>, (StatusCode, String)> {
    let valid = |v: f64| v.is_finite() && v > 0.0;
    if !(valid(req.width) && valid(req.height)) {
        return Err((
            StatusCode::BAD_REQUEST,
            "artwork dimensions must be positive and finite".to_string(),
        ));
    }
    let options = roll_finder::find_rolls(req.width, req.height, 10);
    if options.is_empty() {
        return Err((
            StatusCode::UNPROCESSABLE_ENTITY,
            "artwork does not fit any roll".to_string(),
        ));
    }
    Ok(Json(options))
}

#[tokio::main]
async fn main() {
    let _sentry = sentry::init((
        std::env::var("SENTRY_DSN").ok(),
        sentry::ClientOptions {
            release: sentry::release_name!(),
            ..Default::default()
        },
    ));

    let log_file = std::fs::OpenOptions::new()
        .create(true)
        .append(true)
        .open("development.log")
        .expect("failed to open development.log");

    tracing_subscriber::fmt()
        .with_writer(log_file)
        .with_target(false)
        .with_ansi(false)
        .with_max_level(Level::INFO)
        .init();

    let port = std::env::var("PORT").unwrap_or_else(|_| "3001".to_string());
    let addr = format!("0.0.0.0:{port}");

    let app = Router::new()
        .route("/up", get(|| async { "ok" }))
        .route("/optimize", post(optimize))
        .route("/roll-finder", post(roll_finder))
        .layer(
            TraceLayer::new_for_http()
                .make_span_with(DefaultMakeSpan::new().level(Level::INFO))
                .on_response(DefaultOnResponse::new().level(Level::INFO)),
        );

    let listener = tokio::net::TcpListener::bind(&addr).await.unwrap();
    eprintln!("Listening on {addr}");
    axum::serve(listener, app).await.unwrap();
}

#[cfg(test)]
mod tests {
    use super::*;

    fn request(panels: Vec<PanelDemand>) -> OptimizeRequest {
        OptimizeRequest {
            roll_width: 137.0,
            overlap: 1.0,
            passes: 50,
            seed: None,
            roll_length: None,
            time_limit_ms: None,
            panels,
        }
    }

    #[test]
    fn test_limits_accept_normal_order() {
        let req = request(vec![PanelDemand::new(1, 300.0, 50.0, MAX_QUANTITY)]);
        assert!(check_limits(&req).is_ok());
    }

    #[test]
    fn test_limits_reject_huge_quantity() {
        let req: OptimizeRequest = serde_json::from_str(
            r#"{"panels":[{"id":1,"width":600,"height":10,"quantity":4000000000}]}"#,
        )
        .unwrap();
        let err = check_limits(&req).unwrap_err();
        assert!(err.contains("quantity"));
    }

    #[test]
    fn test_limits_reject_too_many_panels() {
        let panels = (1..=MAX_PANELS as u32 + 1)
            .map(|id| PanelDemand::new(id, 50.0, 50.0, 1))
            .collect();
        assert!(check_limits(&request(panels)).is_err());
    }

    #[test]
    fn test_limits_reject_too_many_passes() {
        let mut req = request(vec![]);
        req.passes = MAX_PASSES + 1;
        assert!(check_limits(&req).is_err());
    }

    #[tokio::test]
    async fn test_optimize_rejects_oversized_order() {
        let req = request(vec![PanelDemand::new(1, 600.0, 10.0, 4_000_000_000)]);
        let Err((status, _)) = optimize(Json(req)).await else {
            panic!("oversized order was accepted");
        };
        assert_eq!(status, StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn test_roll_finder_rejects_non_finite_artwork() {
        let req = RollFinderRequest {
            width: f64::INFINITY,
            height: 5.0,
        };
        let Err((status, _)) = roll_finder(Json(req)).await else {
            panic!("infinite artwork was accepted");
        };
        assert_eq!(status, StatusCode::BAD_REQUEST);
    }
}
