// 🌐 JSON API over the record store
// Used by the `calf-server` binary; kept in the library so the routes are testable.

use crate::records::{parse_br_date, CalfRecord, TreatmentRecord};
use crate::reports::{ear_tag_options, filter_by_property, property_options, ChartSummary, ALL_PROPERTIES};
use crate::store::{Notice, RecordStore};
use crate::timeline::{order_for_display, request_timeline, TimelineError};
use axum::{
    extract::{Query, State},
    http::StatusCode,
    response::{IntoResponse, Json, Response},
    routing::{get, post},
    Router,
};
use serde::{Deserialize, Serialize};
use std::sync::{Arc, Mutex, MutexGuard};

/// Shared application state
#[derive(Clone)]
pub struct AppState {
    store: Arc<Mutex<RecordStore>>,
}

impl AppState {
    pub fn new(store: RecordStore) -> Self {
        Self {
            store: Arc::new(Mutex::new(store)),
        }
    }

    fn lock(&self) -> Result<MutexGuard<'_, RecordStore>, Response> {
        self.store
            .lock()
            .map_err(|_| failure(StatusCode::INTERNAL_SERVER_ERROR, "record store unavailable"))
    }
}

/// API Response wrapper
#[derive(Serialize)]
pub struct ApiResponse<T> {
    pub success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<T>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub notices: Vec<Notice>,
}

impl<T> ApiResponse<T> {
    fn ok(data: T) -> Self {
        Self {
            success: true,
            data: Some(data),
            error: None,
            notices: Vec::new(),
        }
    }

    fn with_notices(mut self, notices: Vec<Notice>) -> Self {
        self.notices = notices;
        self
    }
}

fn failure(status: StatusCode, message: impl Into<String>) -> Response {
    failure_with_notices(status, message, Vec::new())
}

fn failure_with_notices(
    status: StatusCode,
    message: impl Into<String>,
    notices: Vec<Notice>,
) -> Response {
    let body: ApiResponse<()> = ApiResponse {
        success: false,
        data: None,
        error: Some(message.into()),
        notices,
    };
    (status, Json(body)).into_response()
}

// ============================================================================
// Request bodies
// ============================================================================

#[derive(Debug, Deserialize)]
pub struct PropertyFilter {
    pub property: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct TimelineQuery {
    /// Comma-separated ear tags, e.g. `001,002`
    pub tags: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct NewCalf {
    pub property: String,
    pub ear_tag: String,
    /// DD/MM/YYYY
    pub birth_date: String,
    #[serde(default)]
    pub mother_ear_tag: String,
    #[serde(default)]
    pub weight_kg: f64,
    #[serde(default)]
    pub height_cm: f64,
    #[serde(default)]
    pub colostrum_volume: f64,
    #[serde(default)]
    pub brix_score: f64,
}

#[derive(Debug, Deserialize)]
pub struct NewTreatment {
    pub property: String,
    pub calf_ear_tag: String,
    pub reason: String,
    #[serde(default)]
    pub medication_type: String,
    #[serde(default)]
    pub medication_name: String,
    #[serde(default)]
    pub dose: String,
    /// DD/MM/YYYY
    pub first_dose_date: String,
    #[serde(default = "one")]
    pub dose_count: u32,
    #[serde(default)]
    pub responsible: String,
}

fn one() -> u32 {
    1
}

impl NewCalf {
    fn into_record(self) -> Result<CalfRecord, Response> {
        let birth = parse_br_date("Nascimento", &self.birth_date)
            .map_err(|e| failure(StatusCode::BAD_REQUEST, e.to_string()))?;

        Ok(CalfRecord::new(self.property, self.ear_tag, birth)
            .with_mother(self.mother_ear_tag)
            .with_measurements(self.weight_kg, self.height_cm)
            .with_colostrum(self.colostrum_volume, self.brix_score))
    }
}

impl NewTreatment {
    fn into_record(self) -> Result<TreatmentRecord, Response> {
        let first_dose = parse_br_date("Data da 1ª Dose", &self.first_dose_date)
            .map_err(|e| failure(StatusCode::BAD_REQUEST, e.to_string()))?;
        if self.dose_count == 0 {
            return Err(failure(StatusCode::BAD_REQUEST, "Nº de Doses must be at least 1"));
        }

        Ok(TreatmentRecord::new(self.property, self.calf_ear_tag, self.reason, first_dose)
            .with_medication(self.medication_type, self.medication_name, self.dose)
            .with_dose_count(self.dose_count)
            .with_responsible(self.responsible))
    }
}

#[derive(Serialize)]
pub struct PropertyOptions {
    pub calves: Vec<String>,
    pub treatments: Vec<String>,
}

// ============================================================================
// API Handlers
// ============================================================================

/// GET /api/health
async fn health_check() -> impl IntoResponse {
    Json(ApiResponse::ok("OK"))
}

/// GET /api/calves?property=
async fn list_calves(State(state): State<AppState>, Query(filter): Query<PropertyFilter>) -> Response {
    let store = match state.lock() {
        Ok(store) => store,
        Err(resp) => return resp,
    };
    let property = filter.property.as_deref().unwrap_or(ALL_PROPERTIES);
    Json(ApiResponse::ok(filter_by_property(store.calves(), property))).into_response()
}

/// GET /api/treatments?property=
async fn list_treatments(
    State(state): State<AppState>,
    Query(filter): Query<PropertyFilter>,
) -> Response {
    let store = match state.lock() {
        Ok(store) => store,
        Err(resp) => return resp,
    };
    let property = filter.property.as_deref().unwrap_or(ALL_PROPERTIES);
    Json(ApiResponse::ok(filter_by_property(store.treatments(), property))).into_response()
}

/// POST /api/calves
async fn add_calf(State(state): State<AppState>, Json(body): Json<NewCalf>) -> Response {
    let record = match body.into_record() {
        Ok(record) => record,
        Err(resp) => return resp,
    };
    let mut store = match state.lock() {
        Ok(store) => store,
        Err(resp) => return resp,
    };

    match store.add_calf(record.clone()) {
        Ok(()) => {
            let notices = store.take_notices();
            (StatusCode::CREATED, Json(ApiResponse::ok(record).with_notices(notices))).into_response()
        }
        Err(e) => {
            let notices = store.take_notices();
            failure_with_notices(StatusCode::INTERNAL_SERVER_ERROR, e.to_string(), notices)
        }
    }
}

/// POST /api/treatments
async fn add_treatment(State(state): State<AppState>, Json(body): Json<NewTreatment>) -> Response {
    let record = match body.into_record() {
        Ok(record) => record,
        Err(resp) => return resp,
    };
    let mut store = match state.lock() {
        Ok(store) => store,
        Err(resp) => return resp,
    };

    match store.add_treatment(record.clone()) {
        Ok(()) => {
            let notices = store.take_notices();
            (StatusCode::CREATED, Json(ApiResponse::ok(record).with_notices(notices))).into_response()
        }
        Err(e) => {
            let notices = store.take_notices();
            failure_with_notices(StatusCode::INTERNAL_SERVER_ERROR, e.to_string(), notices)
        }
    }
}

/// GET /api/charts
async fn get_charts(State(state): State<AppState>) -> Response {
    let store = match state.lock() {
        Ok(store) => store,
        Err(resp) => return resp,
    };
    Json(ApiResponse::ok(ChartSummary::from_treatments(store.treatments()))).into_response()
}

/// GET /api/timeline?tags=001,002
async fn get_timeline(State(state): State<AppState>, Query(query): Query<TimelineQuery>) -> Response {
    let tags: Vec<String> = query
        .tags
        .unwrap_or_default()
        .split(',')
        .map(str::trim)
        .filter(|t| !t.is_empty())
        .map(str::to_string)
        .collect();

    let store = match state.lock() {
        Ok(store) => store,
        Err(resp) => return resp,
    };

    match request_timeline(&tags, store.calves(), store.treatments()) {
        Ok(events) => Json(ApiResponse::ok(order_for_display(events))).into_response(),
        Err(e @ TimelineError::EmptySelection) => failure(StatusCode::BAD_REQUEST, e.to_string()),
        Err(e) => failure(StatusCode::UNPROCESSABLE_ENTITY, e.to_string()),
    }
}

/// POST /api/refresh - re-read both files
async fn refresh(State(state): State<AppState>) -> Response {
    let mut store = match state.lock() {
        Ok(store) => store,
        Err(resp) => return resp,
    };
    store.refresh();
    let counts = (store.calves().len(), store.treatments().len());
    let notices = store.take_notices();
    Json(ApiResponse::ok(counts).with_notices(notices)).into_response()
}

/// GET /api/properties - filter selector options
async fn get_properties(State(state): State<AppState>) -> Response {
    let store = match state.lock() {
        Ok(store) => store,
        Err(resp) => return resp,
    };
    Json(ApiResponse::ok(PropertyOptions {
        calves: property_options(store.calves()),
        treatments: property_options(store.treatments()),
    }))
    .into_response()
}

/// GET /api/ear-tags - timeline selector options
async fn get_ear_tags(State(state): State<AppState>) -> Response {
    let store = match state.lock() {
        Ok(store) => store,
        Err(resp) => return resp,
    };
    Json(ApiResponse::ok(ear_tag_options(store.calves()))).into_response()
}

/// GET /api/notices - drain pending load/save messages
async fn get_notices(State(state): State<AppState>) -> Response {
    let mut store = match state.lock() {
        Ok(store) => store,
        Err(resp) => return resp,
    };
    Json(ApiResponse::ok(store.take_notices())).into_response()
}

/// All `/api` routes
pub fn router(state: AppState) -> Router {
    let api_routes = Router::new()
        .route("/health", get(health_check))
        .route("/calves", get(list_calves).post(add_calf))
        .route("/treatments", get(list_treatments).post(add_treatment))
        .route("/charts", get(get_charts))
        .route("/timeline", get(get_timeline))
        .route("/refresh", post(refresh))
        .route("/properties", get(get_properties))
        .route("/ear-tags", get(get_ear_tags))
        .route("/notices", get(get_notices))
        .with_state(state);

    Router::new().nest("/api", api_routes)
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::{to_bytes, Body};
    use axum::http::{header, Request};
    use serde_json::{json, Value};
    use tempfile::{tempdir, TempDir};
    use tower::ServiceExt;

    fn app() -> (TempDir, Router) {
        let dir = tempdir().unwrap();
        let store = RecordStore::open(dir.path().join("calves.csv"), dir.path().join("t.csv"));
        (dir, router(AppState::new(store)))
    }

    async fn send(app: &Router, req: Request<Body>) -> (StatusCode, Value) {
        let resp = app.clone().oneshot(req).await.unwrap();
        let status = resp.status();
        let bytes = to_bytes(resp.into_body(), usize::MAX).await.unwrap();
        (status, serde_json::from_slice(&bytes).unwrap())
    }

    fn post_json(uri: &str, body: Value) -> Request<Body> {
        Request::post(uri)
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from(body.to_string()))
            .unwrap()
    }

    fn get(uri: &str) -> Request<Body> {
        Request::get(uri).body(Body::empty()).unwrap()
    }

    #[tokio::test]
    async fn test_health() {
        let (_dir, app) = app();
        let (status, body) = send(&app, get("/api/health")).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["data"], "OK");
    }

    #[tokio::test]
    async fn test_add_calf_then_timeline() {
        let (dir, app) = app();

        let (status, body) = send(
            &app,
            post_json(
                "/api/calves",
                json!({"property": "Fazenda A", "ear_tag": "001", "birth_date": "01/01/2023", "weight_kg": 38.0}),
            ),
        )
        .await;
        assert_eq!(status, StatusCode::CREATED);
        assert_eq!(body["data"]["Nascimento"], "01/01/2023");
        assert!(dir.path().join("calves.csv").exists());

        let (status, _) = send(
            &app,
            post_json(
                "/api/treatments",
                json!({"property": "Fazenda A", "calf_ear_tag": "001", "reason": "Fever", "first_dose_date": "15/01/2023"}),
            ),
        )
        .await;
        assert_eq!(status, StatusCode::CREATED);

        let (status, body) = send(&app, get("/api/timeline?tags=001")).await;
        assert_eq!(status, StatusCode::OK);
        let events = body["data"].as_array().unwrap();
        assert_eq!(events.len(), 2);
        assert_eq!(events[0]["label"], "001 - Fever");
        assert_eq!(events[1]["category"], "Birth");
    }

    #[tokio::test]
    async fn test_bad_date_is_rejected() {
        let (_dir, app) = app();
        let (status, body) = send(
            &app,
            post_json(
                "/api/calves",
                json!({"property": "A", "ear_tag": "001", "birth_date": "2023-01-01"}),
            ),
        )
        .await;

        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["success"], false);
    }

    #[tokio::test]
    async fn test_empty_timeline_selection() {
        let (_dir, app) = app();
        let (status, body) = send(&app, get("/api/timeline")).await;

        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["error"], "Selecione pelo menos uma bezerra.");
    }

    #[tokio::test]
    async fn test_filter_and_charts() {
        let (_dir, app) = app();
        for (property, reason) in [("A", "fever"), ("A", "fever"), ("B", "cold")] {
            let (status, _) = send(
                &app,
                post_json(
                    "/api/treatments",
                    json!({"property": property, "calf_ear_tag": "001", "reason": reason, "first_dose_date": "02/01/2023"}),
                ),
            )
            .await;
            assert_eq!(status, StatusCode::CREATED);
        }

        let (_, body) = send(&app, get("/api/treatments?property=B")).await;
        assert_eq!(body["data"].as_array().unwrap().len(), 1);

        let (_, body) = send(&app, get("/api/treatments?property=Todas")).await;
        assert_eq!(body["data"].as_array().unwrap().len(), 3);

        let (_, body) = send(&app, get("/api/charts")).await;
        assert_eq!(body["data"]["by_reason"][0], json!(["fever", 2]));
        assert_eq!(body["data"]["over_time"], json!([["2023-01-02", 3]]));

        let (_, body) = send(&app, get("/api/properties")).await;
        assert_eq!(body["data"]["treatments"], json!(["Todas", "A", "B"]));
    }

    #[tokio::test]
    async fn test_notices_drain_once() {
        let (_dir, app) = app();

        let (status, body) = send(&app, get("/api/notices")).await;
        assert_eq!(status, StatusCode::OK);
        let notices = body["data"].as_array().unwrap();
        assert_eq!(notices.len(), 2);
        assert!(notices.iter().all(|n| n["level"] == "Info"));
        assert_eq!(
            notices[1]["text"],
            "Arquivo de cadastro de bezerras não encontrado, criando nova tabela."
        );

        let (_, body) = send(&app, get("/api/notices")).await;
        assert_eq!(body["data"], json!([]));
    }

    #[tokio::test]
    async fn test_refresh_reports_external_writes() {
        let (dir, app) = app();
        let born = chrono::NaiveDate::from_ymd_opt(2023, 1, 1).unwrap();
        crate::store::persist_calf_registry(
            &dir.path().join("calves.csv"),
            &[
                CalfRecord::new("Fazenda A", "002", born),
                CalfRecord::new("Fazenda A", "001", born),
            ],
        )
        .unwrap();

        let (status, body) = send(&app, Request::post("/api/refresh").body(Body::empty()).unwrap()).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["data"], json!([2, 0]));
        assert!(body["notices"]
            .as_array()
            .unwrap()
            .iter()
            .any(|n| n["text"] == "Dados de cadastro de bezerras carregados com sucesso."));

        let (_, body) = send(&app, get("/api/ear-tags")).await;
        assert_eq!(body["data"], json!(["002", "001"]));
    }

    #[tokio::test]
    async fn test_refresh_keeps_rows_when_file_is_corrupt() {
        let (dir, app) = app();
        let (status, _) = send(
            &app,
            post_json(
                "/api/calves",
                json!({"property": "A", "ear_tag": "001", "birth_date": "01/01/2023"}),
            ),
        )
        .await;
        assert_eq!(status, StatusCode::CREATED);

        std::fs::write(dir.path().join("calves.csv"), "").unwrap();
        let (status, body) = send(&app, Request::post("/api/refresh").body(Body::empty()).unwrap()).await;

        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["data"], json!([1, 0]));
        assert!(body["notices"]
            .as_array()
            .unwrap()
            .iter()
            .any(|n| n["level"] == "Warning"));

        let (_, body) = send(&app, get("/api/ear-tags")).await;
        assert_eq!(body["data"], json!(["001"]));
    }
}
