use actix_web::{
    App,
    HttpResponse,
    HttpServer,
    dev::ServerHandle,
    web,
};
use device_console::device::{
    BalanceUpdate,
    Device,
    DeviceId,
    DeviceSummary,
    Place,
    PlaceId,
};
use rust_decimal::Decimal;
use serde::Deserialize;
use serde_json::json;
use std::{
    collections::HashMap,
    net::TcpListener,
    sync::{
        Arc,
        Mutex,
    },
    thread::JoinHandle,
};

#[derive(Debug, Clone, PartialEq)]
pub struct RecordedUpdate {
    pub device_id: String,
    pub place: u32,
    pub body: serde_json::Value,
}

#[derive(Default)]
struct FakeState {
    devices: Vec<Device>,
    fail_listing: bool,
    rejections: HashMap<(String, u32), String>,
    updates: Vec<RecordedUpdate>,
    device_requests: Vec<String>,
}

type SharedState = Arc<Mutex<FakeState>>;

/// In-process stand-in for the device backend, served by actix on an
/// ephemeral port. Mounted under `/api/v1` like the real service.
pub struct FakeDeviceServer {
    state: SharedState,
    base_url: String,
    server_handle: ServerHandle,
    server_thread: Option<JoinHandle<()>>,
}

impl FakeDeviceServer {
    pub fn start(devices: Vec<Device>) -> Self {
        let state: SharedState = Arc::new(Mutex::new(FakeState {
            devices,
            ..FakeState::default()
        }));

        let listener = TcpListener::bind(("127.0.0.1", 0)).unwrap();
        let address = listener.local_addr().unwrap();
        let base_url = format!("http://{address}/api/v1");

        let server_state = state.clone();
        let server = HttpServer::new(move || {
            App::new()
                .app_data(web::Data::new(server_state.clone()))
                .route("/api/v1/a/devices/", web::get().to(handle_list))
                .route("/api/v1/a/devices/{id}/", web::get().to(handle_detail))
                .route(
                    "/api/v1/a/devices/{id}/place/{place}/update",
                    web::post().to(handle_update),
                )
        })
        .workers(1)
        .shutdown_timeout(1)
        .listen(listener)
        .unwrap()
        .run();

        let server_handle = server.handle();
        let server_thread = std::thread::spawn(move || {
            let sys = actix_web::rt::System::new();
            let _ = sys.block_on(server);
        });

        Self {
            state,
            base_url,
            server_handle,
            server_thread: Some(server_thread),
        }
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    pub fn fail_listing(&self) {
        self.state.lock().unwrap().fail_listing = true;
    }

    /// Makes every update on `place` of `device_id` fail with a 400 whose
    /// body carries `detail`.
    pub fn reject_updates(&self, device_id: &str, place: u32, detail: &str) {
        self.state
            .lock()
            .unwrap()
            .rejections
            .insert((device_id.to_string(), place), detail.to_string());
    }

    pub fn updates(&self) -> Vec<RecordedUpdate> {
        self.state.lock().unwrap().updates.clone()
    }

    pub fn device_requests(&self) -> Vec<String> {
        self.state.lock().unwrap().device_requests.clone()
    }

    pub fn balance(&self, device_id: &str, place: u32) -> Option<Decimal> {
        let state = self.state.lock().unwrap();
        state
            .devices
            .iter()
            .find(|d| d.id.as_str() == device_id)?
            .places
            .iter()
            .find(|p| p.place == PlaceId(place))
            .map(|p| p.balances)
    }
}

impl Drop for FakeDeviceServer {
    fn drop(&mut self) {
        let _ = self.server_handle.stop(true);
        if let Some(thread) = self.server_thread.take() {
            let _ = thread.join();
        }
    }
}

pub fn device(id: &str, name: &str, places: Vec<Place>) -> Device {
    Device {
        id: DeviceId::new(id),
        name: name.to_string(),
        places,
    }
}

/// Place with a balance given in cents.
pub fn place(id: u32, cents: i64) -> Place {
    Place {
        place: PlaceId(id),
        currency: "EUR".to_string(),
        balances: Decimal::new(cents, 2),
    }
}

#[derive(Deserialize)]
struct UpdateBody {
    #[serde(with = "rust_decimal::serde::float")]
    delta: Decimal,
}

async fn handle_list(state: web::Data<SharedState>) -> HttpResponse {
    let state = state.lock().unwrap();
    if state.fail_listing {
        return HttpResponse::InternalServerError().json(json!({"detail": "listing down"}));
    }
    let summaries: Vec<DeviceSummary> = state
        .devices
        .iter()
        .map(|d| DeviceSummary {
            id: d.id.clone(),
            name: d.name.clone(),
        })
        .collect();
    HttpResponse::Ok().json(summaries)
}

async fn handle_detail(state: web::Data<SharedState>, id: web::Path<String>) -> HttpResponse {
    let mut state = state.lock().unwrap();
    state.device_requests.push(id.as_str().to_string());
    match state.devices.iter().find(|d| d.id.as_str() == id.as_str()) {
        Some(device) => HttpResponse::Ok().json(device),
        None => HttpResponse::NotFound().json(json!({"detail": "Not found."})),
    }
}

async fn handle_update(
    state: web::Data<SharedState>,
    path: web::Path<(String, u32)>,
    body: web::Json<serde_json::Value>,
) -> HttpResponse {
    let (device_id, place_id) = path.into_inner();
    let body = body.into_inner();
    let mut state = state.lock().unwrap();
    state.updates.push(RecordedUpdate {
        device_id: device_id.clone(),
        place: place_id,
        body: body.clone(),
    });
    if let Some(detail) = state.rejections.get(&(device_id.clone(), place_id)) {
        return HttpResponse::BadRequest().json(json!({ "detail": detail }));
    }
    let Ok(UpdateBody { delta }) = serde_json::from_value::<UpdateBody>(body) else {
        return HttpResponse::BadRequest().json(json!({"detail": "delta is required"}));
    };
    let Some(place) = state
        .devices
        .iter_mut()
        .find(|d| d.id.as_str() == device_id)
        .and_then(|d| d.places.iter_mut().find(|p| p.place == PlaceId(place_id)))
    else {
        return HttpResponse::NotFound().json(json!({"detail": "Not found."}));
    };
    place.balances += delta;
    HttpResponse::Ok().json(BalanceUpdate {
        place: place.place,
        balances: place.balances,
        currency: place.currency.clone(),
        device_id: Some(DeviceId::new(device_id)),
    })
}
