// Copyright 2024 Lectern Media, Inc.
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
//     http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.

use std::fmt::Debug;

use http::StatusCode;
use lectern_protocol::ControlMessage;
use thiserror::Error;
use url::Url;

pub const ROOM_COMMAND_PATH: &str = "api/rooms/command";

#[derive(Debug, Error)]
pub enum ServiceError {
    #[error("invalid base url: {0}")]
    Url(#[from] url::ParseError),
    #[error("request failed: {0}")]
    Request(#[from] reqwest::Error),
    #[error("relay returned {0}")]
    Status(StatusCode),
}

pub type ServiceResult<T> = Result<T, ServiceError>;

/// Client for the auxiliary room-command relay.
///
/// The relay fans a [`ControlMessage`] out to the targeted participant's
/// control channel. There is no response contract beyond success/failure.
#[derive(Clone)]
pub struct RoomCommandClient {
    endpoint: Url,
    client: reqwest::Client,
}

impl Debug for RoomCommandClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RoomCommandClient").field("endpoint", &self.endpoint.as_str()).finish()
    }
}

impl RoomCommandClient {
    /// Creates a client for the relay rooted at `base_url`
    /// (e.g. `https://api.example.com`).
    pub fn with_base_url(base_url: &str) -> ServiceResult<Self> {
        let endpoint = Url::parse(base_url)?.join(ROOM_COMMAND_PATH)?;
        Ok(Self { endpoint, client: reqwest::Client::new() })
    }

    pub async fn send_command(&self, msg: &ControlMessage) -> ServiceResult<()> {
        let response = self.client.post(self.endpoint.clone()).json(msg).send().await?;

        let status = response.status();
        if !status.is_success() {
            log::warn!("room command rejected: {} -> {}", msg.target(), status);
            return Err(ServiceError::Status(status));
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_endpoint_join() {
        let client = RoomCommandClient::with_base_url("https://relay.example.com").unwrap();
        assert_eq!(client.endpoint.as_str(), "https://relay.example.com/api/rooms/command");
    }

    #[test]
    fn test_rejects_invalid_base_url() {
        assert!(RoomCommandClient::with_base_url("not a url").is_err());
    }
}
