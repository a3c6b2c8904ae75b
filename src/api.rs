use crate::device::{
    BalanceUpdate,
    Device,
    DeviceId,
    DeviceSummary,
    PlaceId,
};
use reqwest::{
    StatusCode,
    Url,
    header,
};
use rust_decimal::Decimal;
use serde::{
    Deserialize,
    Serialize,
};
use tracing::{
    debug,
    info,
    warn,
};

pub const DEFAULT_API_URL: &str = "https://dev-space.su/api/v1";

/// Shown when a failed update carries neither a server detail nor a usable
/// error message.
pub const UPDATE_FAILED_MESSAGE: &str = "Balance update failed";

#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    #[error("invalid API base URL {0:?}")]
    InvalidBaseUrl(String),
    #[error("device id is required")]
    MissingDeviceId,
    #[error("place id is required")]
    MissingPlaceId,
    #[error("failed to build HTTP client: {0}")]
    Client(#[source] reqwest::Error),
    #[error("request to {url} failed: {source}")]
    Transport {
        url: String,
        #[source]
        source: reqwest::Error,
    },
    #[error("server responded with {status}")]
    Server {
        status: StatusCode,
        detail: Option<String>,
    },
    #[error("invalid response payload: {0}")]
    Decode(#[source] serde_json::Error),
}

impl ApiError {
    /// Message provided by the server in the `detail` field of an error body.
    pub fn detail(&self) -> Option<&str> {
        match self {
            ApiError::Server {
                detail: Some(detail),
                ..
            } => Some(detail.as_str()),
            _ => None,
        }
    }

    /// Text for the error banner: server detail, then this error's own
    /// message, then [`UPDATE_FAILED_MESSAGE`].
    pub fn user_message(&self) -> String {
        failure_message(self.detail(), &self.to_string())
    }
}

pub fn failure_message(detail: Option<&str>, message: &str) -> String {
    detail
        .map(str::trim)
        .filter(|d| !d.is_empty())
        .or_else(|| Some(message.trim()).filter(|m| !m.is_empty()))
        .unwrap_or(UPDATE_FAILED_MESSAGE)
        .to_string()
}

/// Remote device backend as seen by the console.
///
/// Reads fail soft: a failed listing is an empty vector and a failed detail
/// fetch is `None`. Only balance updates surface their errors.
pub trait DeviceService: Clone + Send + Sync + 'static {
    fn list_devices(&self) -> impl Future<Output = Vec<DeviceSummary>> + Send;

    fn get_device(&self, id: &DeviceId) -> impl Future<Output = Option<Device>> + Send;

    fn update_place_balance(
        &self,
        device_id: &DeviceId,
        place: PlaceId,
        delta: Decimal,
    ) -> impl Future<Output = Result<BalanceUpdate, ApiError>> + Send;
}

#[derive(Clone, Debug)]
pub struct DeviceApi {
    base_url: Url,
    http: reqwest::Client,
}

#[derive(Serialize)]
struct UpdateBalanceDto {
    #[serde(with = "rust_decimal::serde::float")]
    delta: Decimal,
}

#[derive(Deserialize)]
struct ErrorBodyDto {
    #[serde(default)]
    detail: Option<serde_json::Value>,
}

impl DeviceApi {
    pub fn new(base_url: impl AsRef<str>) -> Result<Self, ApiError> {
        let raw = base_url.as_ref().trim();
        let base_url = Url::parse(raw)
            .ok()
            .filter(|url| !url.cannot_be_a_base())
            .ok_or_else(|| ApiError::InvalidBaseUrl(raw.to_string()))?;
        let mut headers = header::HeaderMap::new();
        headers.insert(
            header::CONTENT_TYPE,
            header::HeaderValue::from_static("application/json"),
        );
        let http = reqwest::Client::builder()
            .default_headers(headers)
            .build()
            .map_err(ApiError::Client)?;
        Ok(Self { base_url, http })
    }

    pub fn base_url(&self) -> &Url {
        &self.base_url
    }

    fn endpoint(&self, segments: &[&str]) -> Url {
        let mut url = self.base_url.clone();
        if let Ok(mut path) = url.path_segments_mut() {
            path.pop_if_empty().extend(segments);
        }
        url
    }

    pub async fn list_devices(&self) -> Vec<DeviceSummary> {
        let url = self.endpoint(&["a", "devices", ""]);
        match self.fetch_json::<Vec<DeviceSummary>>(url).await {
            Ok(devices) => {
                debug!(count = devices.len(), "fetched device list");
                devices
            }
            Err(err) => {
                warn!(%err, "failed to fetch device list");
                Vec::new()
            }
        }
    }

    pub async fn get_device(&self, id: &DeviceId) -> Option<Device> {
        if id.is_empty() {
            warn!("device id missing; skipping device fetch");
            return None;
        }
        let url = self.endpoint(&["a", "devices", id.as_str(), ""]);
        match self.fetch_json::<Device>(url).await {
            Ok(device) => {
                debug!(device = %id, places = device.places.len(), "fetched device");
                Some(device)
            }
            Err(err) => {
                warn!(device = %id, %err, "failed to fetch device");
                None
            }
        }
    }

    pub async fn update_place_balance(
        &self,
        device_id: &DeviceId,
        place: PlaceId,
        delta: Decimal,
    ) -> Result<BalanceUpdate, ApiError> {
        if device_id.is_empty() {
            return Err(ApiError::MissingDeviceId);
        }
        if place.is_unset() {
            return Err(ApiError::MissingPlaceId);
        }
        let place_segment = place.to_string();
        let url = self.endpoint(&[
            "a",
            "devices",
            device_id.as_str(),
            "place",
            &place_segment,
            "update",
        ]);
        let res = self
            .http
            .post(url.clone())
            .json(&UpdateBalanceDto { delta })
            .send()
            .await
            .map_err(|source| ApiError::Transport {
                url: url.to_string(),
                source,
            })?;
        let update: BalanceUpdate = Self::read_body(url, res).await?;
        info!(
            device = %device_id,
            %place,
            %delta,
            balance = %update.balances,
            "place balance updated"
        );
        Ok(update)
    }

    async fn fetch_json<T>(&self, url: Url) -> Result<T, ApiError>
    where
        T: for<'de> Deserialize<'de>,
    {
        let res = self
            .http
            .get(url.clone())
            .send()
            .await
            .map_err(|source| ApiError::Transport {
                url: url.to_string(),
                source,
            })?;
        Self::read_body(url, res).await
    }

    async fn read_body<T>(url: Url, res: reqwest::Response) -> Result<T, ApiError>
    where
        T: for<'de> Deserialize<'de>,
    {
        let status = res.status();
        let bytes = res.bytes().await.map_err(|source| ApiError::Transport {
            url: url.to_string(),
            source,
        })?;
        if !status.is_success() {
            return Err(ApiError::Server {
                status,
                detail: error_detail(&bytes),
            });
        }
        serde_json::from_slice(&bytes).map_err(ApiError::Decode)
    }
}

/// Pulls the `detail` field out of an error body. Strings are used as-is,
/// any other JSON value is rendered compactly.
fn error_detail(body: &[u8]) -> Option<String> {
    let dto: ErrorBodyDto = serde_json::from_slice(body).ok()?;
    match dto.detail? {
        serde_json::Value::Null => None,
        serde_json::Value::String(s) => Some(s),
        other => Some(other.to_string()),
    }
}

impl DeviceService for DeviceApi {
    async fn list_devices(&self) -> Vec<DeviceSummary> {
        DeviceApi::list_devices(self).await
    }

    async fn get_device(&self, id: &DeviceId) -> Option<Device> {
        DeviceApi::get_device(self, id).await
    }

    async fn update_place_balance(
        &self,
        device_id: &DeviceId,
        place: PlaceId,
        delta: Decimal,
    ) -> Result<BalanceUpdate, ApiError> {
        DeviceApi::update_place_balance(self, device_id, place, delta).await
    }
}
