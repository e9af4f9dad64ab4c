use crate::config::ClientConfig;
use crate::error::TransportError;
use crate::model::{
    DeviceId, DownloaderStatus, GalleryEntry, MfaDevice, PhaseResponse, ScreenPower, SessionPhase,
};
use async_trait::async_trait;
use reqwest::{Client, Response};
use serde::de::DeserializeOwned;
use serde::Serialize;
use tracing::{debug, trace};
use url::Url;

/// Request surface of the frame backend. Implementations hold no session state.
#[async_trait]
pub trait StatusTransport: Send + Sync {
    async fn session_status(&self) -> Result<SessionPhase, TransportError>;

    async fn login(&self, user_name: &str, password: &str)
        -> Result<SessionPhase, TransportError>;

    async fn mfa_devices(&self) -> Result<Vec<MfaDevice>, TransportError>;

    async fn choose_mfa_device(&self, device: &DeviceId) -> Result<SessionPhase, TransportError>;

    async fn submit_mfa_code(&self, code: &str) -> Result<SessionPhase, TransportError>;

    async fn downloader_status(&self) -> Result<DownloaderStatus, TransportError>;

    async fn displayed_list(&self) -> Result<Vec<GalleryEntry>, TransportError>;

    async fn screen_control(&self, power: ScreenPower) -> Result<(), TransportError>;

    /// `photo` is a bare file name, never a path.
    async fn delete_photo(&self, photo: &str) -> Result<(), TransportError>;
}

#[derive(Debug, Clone)]
pub struct HttpStatusTransport {
    client: Client,
    base: Url,
}

impl HttpStatusTransport {
    pub fn new(config: &ClientConfig) -> Result<Self, TransportError> {
        let client = Client::builder()
            .timeout(config.request_timeout)
            .build()
            .map_err(TransportError::Network)?;
        Ok(Self {
            client,
            base: config.server.clone(),
        })
    }

    pub fn base(&self) -> &Url {
        &self.base
    }

    /// Absolute url of the image behind a gallery entry.
    pub fn media_url(&self, entry: &GalleryEntry) -> Result<Url, TransportError> {
        self.url(&entry.media_path())
    }

    fn url(&self, path: &str) -> Result<Url, TransportError> {
        self.base
            .join(path)
            .map_err(|err| TransportError::InvalidUrl(format!("{path}: {err}")))
    }

    async fn get_json<T: DeserializeOwned>(&self, endpoint: &'static str) -> Result<T, TransportError> {
        let url = self.url(endpoint)?;
        debug!(target: "frame::transport", %url, "GET");
        let response = self
            .client
            .get(url)
            .send()
            .await
            .map_err(TransportError::Network)?;
        decode(endpoint, response).await
    }

    async fn post<B: Serialize + ?Sized>(
        &self,
        endpoint: &'static str,
        body: &B,
    ) -> Result<String, TransportError> {
        let url = self.url(endpoint)?;
        debug!(target: "frame::transport", %url, "POST");
        let response = self
            .client
            .post(url)
            .json(body)
            .send()
            .await
            .map_err(TransportError::Network)?;
        success_body(response).await
    }

    async fn post_for_phase<B: Serialize + ?Sized>(
        &self,
        endpoint: &'static str,
        body: &B,
    ) -> Result<SessionPhase, TransportError> {
        let text = self.post(endpoint, body).await?;
        parse_body::<PhaseResponse>(endpoint, &text).map(|response| response.status)
    }
}

async fn success_body(response: Response) -> Result<String, TransportError> {
    let status = response.status();
    let text = response.text().await.map_err(TransportError::Network)?;
    if !status.is_success() {
        return Err(TransportError::Server { status, body: text });
    }
    Ok(text)
}

async fn decode<T: DeserializeOwned>(
    endpoint: &'static str,
    response: Response,
) -> Result<T, TransportError> {
    let text = success_body(response).await?;
    parse_body(endpoint, &text)
}

fn parse_body<T: DeserializeOwned>(endpoint: &'static str, text: &str) -> Result<T, TransportError> {
    trace!(target: "frame::transport", endpoint, body = %text, "response body");
    serde_json::from_str(text).map_err(|err| TransportError::Parse {
        endpoint,
        detail: err.to_string(),
    })
}

#[async_trait]
impl StatusTransport for HttpStatusTransport {
    async fn session_status(&self) -> Result<SessionPhase, TransportError> {
        let response: PhaseResponse = self.get_json("api/status").await?;
        Ok(response.status)
    }

    async fn login(
        &self,
        user_name: &str,
        password: &str,
    ) -> Result<SessionPhase, TransportError> {
        #[derive(Serialize)]
        #[serde(rename_all = "camelCase")]
        struct RequestBody<'a> {
            user_name: &'a str,
            password: &'a str,
        }

        self.post_for_phase("api/login", &RequestBody { user_name, password })
            .await
    }

    async fn mfa_devices(&self) -> Result<Vec<MfaDevice>, TransportError> {
        // The backend answers `null` when it has no device list yet.
        let devices: Option<Vec<MfaDevice>> = self.get_json("api/mfa_device_choice").await?;
        Ok(devices.unwrap_or_default())
    }

    async fn choose_mfa_device(&self, device: &DeviceId) -> Result<SessionPhase, TransportError> {
        #[derive(Serialize)]
        struct RequestBody<'a> {
            device: &'a DeviceId,
        }

        self.post_for_phase("api/mfa_device_choice", &RequestBody { device })
            .await
    }

    async fn submit_mfa_code(&self, code: &str) -> Result<SessionPhase, TransportError> {
        #[derive(Serialize)]
        struct RequestBody<'a> {
            code: &'a str,
        }

        self.post_for_phase("api/mfa_code", &RequestBody { code }).await
    }

    async fn downloader_status(&self) -> Result<DownloaderStatus, TransportError> {
        self.get_json("api/downloader_status").await
    }

    async fn displayed_list(&self) -> Result<Vec<GalleryEntry>, TransportError> {
        self.get_json("api/displayed_list").await
    }

    async fn screen_control(&self, power: ScreenPower) -> Result<(), TransportError> {
        #[derive(Serialize)]
        struct RequestBody {
            action: ScreenPower,
        }

        self.post("api/screen_control", &RequestBody { action: power })
            .await
            .map(|_| ())
    }

    async fn delete_photo(&self, photo: &str) -> Result<(), TransportError> {
        #[derive(Serialize)]
        struct RequestBody<'a> {
            photo: &'a str,
        }

        self.post("api/delete_photo", &RequestBody { photo })
            .await
            .map(|_| ())
    }
}
