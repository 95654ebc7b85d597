use std::fs::{self, File};
use std::path::Path;
use std::time::Duration;

use regex::Regex;
use reqwest::blocking::{Client, Response};

use crate::error::ZooError;
use crate::http::{build_client, ensure_success, send_with_retries};

const DRIVE_URL: &str = "https://drive.google.com/uc";
const DRIVE_CONFIRM_URL: &str = "https://drive.usercontent.google.com/download";

pub trait RemoteFileClient: Send + Sync {
    /// Downloads a Google Drive file identified by `file_id` to `destination`.
    fn download_drive_file(&self, file_id: &str, destination: &Path) -> Result<(), ZooError>;
    fn download_url(&self, url: &str, destination: &Path) -> Result<(), ZooError>;
}

#[derive(Clone)]
pub struct HttpRemoteClient {
    client: Client,
}

impl HttpRemoteClient {
    pub fn new() -> Result<Self, ZooError> {
        let client = build_client(Duration::from_secs(300))?;
        Ok(Self { client })
    }
}

impl RemoteFileClient for HttpRemoteClient {
    fn download_drive_file(&self, file_id: &str, destination: &Path) -> Result<(), ZooError> {
        let response = send_with_retries(|| {
            self.client
                .get(DRIVE_URL)
                .query(&[("export", "download"), ("id", file_id)])
        })?;
        let response = ensure_success(response)?;
        if !is_html(&response) {
            return write_response_to_file(response, destination);
        }

        // Large files are served behind a virus scan warning page.
        let page = response
            .text()
            .map_err(|err| ZooError::Download(err.to_string()))?;
        let token = parse_confirm_token(&page).ok_or_else(|| {
            ZooError::Download(format!(
                "Google Drive did not serve file {file_id} and no confirmation token was found"
            ))
        })?;
        tracing::debug!(file_id, "confirming Google Drive download");

        let response = send_with_retries(|| {
            let mut request = self.client.get(DRIVE_CONFIRM_URL).query(&[
                ("id", file_id),
                ("export", "download"),
                ("confirm", token.confirm.as_str()),
            ]);
            if let Some(uuid) = &token.uuid {
                request = request.query(&[("uuid", uuid.as_str())]);
            }
            request
        })?;
        let response = ensure_success(response)?;
        if is_html(&response) {
            return Err(ZooError::Download(format!(
                "Google Drive returned an HTML page instead of file {file_id}"
            )));
        }
        write_response_to_file(response, destination)
    }

    fn download_url(&self, url: &str, destination: &Path) -> Result<(), ZooError> {
        let response = send_with_retries(|| self.client.get(url))?;
        let response = ensure_success(response)?;
        write_response_to_file(response, destination)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConfirmToken {
    pub confirm: String,
    pub uuid: Option<String>,
}

pub fn parse_confirm_token(page: &str) -> Option<ConfirmToken> {
    let input_re = Regex::new(r#"name="confirm"\s+value="([^"]+)""#).unwrap();
    let href_re = Regex::new(r"confirm=([0-9A-Za-z_-]+)").unwrap();
    let uuid_re = Regex::new(r#"name="uuid"\s+value="([^"]+)""#).unwrap();

    let confirm = input_re
        .captures(page)
        .or_else(|| href_re.captures(page))
        .and_then(|caps| caps.get(1))
        .map(|value| value.as_str().to_string())?;
    let uuid = uuid_re
        .captures(page)
        .and_then(|caps| caps.get(1))
        .map(|value| value.as_str().to_string());
    Some(ConfirmToken { confirm, uuid })
}

fn is_html(response: &Response) -> bool {
    response
        .headers()
        .get(reqwest::header::CONTENT_TYPE)
        .and_then(|value| value.to_str().ok())
        .map(|value| value.contains("text/html"))
        .unwrap_or(false)
}

fn write_response_to_file(mut response: Response, destination: &Path) -> Result<(), ZooError> {
    if let Some(parent) = destination.parent() {
        fs::create_dir_all(parent).map_err(|err| ZooError::Filesystem(err.to_string()))?;
    }
    let mut file =
        File::create(destination).map_err(|err| ZooError::Filesystem(err.to_string()))?;
    std::io::copy(&mut response, &mut file).map_err(|err| ZooError::Download(err.to_string()))?;
    Ok(())
}
