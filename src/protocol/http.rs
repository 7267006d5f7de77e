/*!
 * HTTP(S) upload and download with milestone progress
 */

use std::fs::File;
use std::io::Write;
use std::path::Path;
use std::time::Duration;

use reqwest::blocking::{Body, Client, RequestBuilder};
use reqwest::StatusCode;
use tracing::debug;
use url::Url;

use crate::config::HttpConfig;
use crate::core::copier::{copy_stream, Copied, CopyOptions, MonitoredReader};
use crate::core::listener::CopyStreamListener;
use crate::core::session::StreamSize;
use crate::error::{ArtshipError, Result};

pub struct HttpClient {
    client: Client,
    username: Option<String>,
    password: Option<String>,
}

impl HttpClient {
    pub fn new(config: &HttpConfig) -> Result<Self> {
        let client = Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .user_agent(format!("artship/{}", crate::VERSION))
            .build()?;

        Ok(Self {
            client,
            username: config.username.clone(),
            password: config.password.clone(),
        })
    }

    fn authorize(&self, request: RequestBuilder) -> RequestBuilder {
        match &self.username {
            Some(user) => request.basic_auth(user, self.password.as_deref()),
            None => request,
        }
    }

    /// PUT a file, reporting milestones as the body is streamed
    pub fn put_file<L>(&self, url: &Url, path: &Path, milestone_unit: u64, listener: L) -> Result<u64>
    where
        L: CopyStreamListener + Send + 'static,
    {
        let file = File::open(path)?;
        let len = file.metadata()?.len();
        let reader = MonitoredReader::new(file, StreamSize::Known(len), milestone_unit, listener)?;

        debug!("PUT {} ({} bytes)", url, len);
        let response = self
            .authorize(self.client.put(url.clone()))
            .body(Body::sized(reader, len))
            .send()?;

        let status = response.status();
        if !status.is_success() {
            return Err(ArtshipError::Protocol(format!("PUT {} failed: {}", url, status)));
        }
        Ok(len)
    }

    /// PUT a small in-memory body, such as a checksum sidecar
    pub fn put_bytes(&self, url: &Url, bytes: Vec<u8>) -> Result<()> {
        let response = self.authorize(self.client.put(url.clone())).body(bytes).send()?;
        let status = response.status();
        if !status.is_success() {
            return Err(ArtshipError::Protocol(format!("PUT {} failed: {}", url, status)));
        }
        Ok(())
    }

    /// GET `url` into `destination`.
    ///
    /// `Ok(None)` when the server answers 404.
    pub fn get<W, L>(
        &self,
        url: &Url,
        destination: W,
        options: &CopyOptions,
        listener: &mut L,
    ) -> Result<Option<Copied<W>>>
    where
        W: Write,
        L: CopyStreamListener + ?Sized,
    {
        debug!("GET {}", url);
        let mut response = self.authorize(self.client.get(url.clone())).send()?;

        let status = response.status();
        if status == StatusCode::NOT_FOUND {
            return Ok(None);
        }
        if !status.is_success() {
            return Err(ArtshipError::Protocol(format!("GET {} failed: {}", url, status)));
        }

        let options = options.with_stream_size(StreamSize::from_len(response.content_length()));
        copy_stream(&mut response, destination, &options, listener).map(Some)
    }
}
