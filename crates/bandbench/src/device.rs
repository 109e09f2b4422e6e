//! HTTP client for the device control API.
//!
//! Two exchanges, both bounded and both re-authenticated per attempt: the
//! session/token handshake and the network-mode command. Every failure is
//! folded into a [`SwitchOutcome`] — nothing here raises past the caller.

use std::time::Duration;

use bandbench_common::config::RunConfig;
use bandbench_common::models::{BandDefinition, Credential, SwitchOutcome};
use bandbench_common::protocol::{
    self, AuthError, CommandReply, NET_MODE_PATH, SESSION_INFO_PATH,
};

use crate::orchestrate::BandSwitcher;

/// Blocking client for a Huawei-class router's control API.
pub struct DeviceClient {
    base_url: String,
    session_agent: ureq::Agent,
    command_agent: ureq::Agent,
}

impl DeviceClient {
    pub fn new(config: &RunConfig) -> Self {
        Self {
            base_url: config.device_url.clone(),
            session_agent: agent_with_timeout(config.session_timeout),
            command_agent: agent_with_timeout(config.command_timeout),
        }
    }

    /// Fetch a fresh session/token pair from the device.
    ///
    /// One request, no retry — the caller decides whether a failed
    /// handshake is worth another attempt.
    pub fn acquire_session(&self) -> Result<Credential, AuthError> {
        let url = format!("{}{}", self.base_url, SESSION_INFO_PATH);
        let mut response = self
            .session_agent
            .get(&url)
            .call()
            .map_err(|e| AuthError::Transport(e.to_string()))?;
        let body = response
            .body_mut()
            .read_to_string()
            .map_err(|e| AuthError::Transport(e.to_string()))?;
        protocol::parse_session_tokens(&body)
    }
}

impl BandSwitcher for DeviceClient {
    /// Issue the band-restriction command for `band`.
    fn switch(&self, band: &BandDefinition) -> SwitchOutcome {
        let credential = match self.acquire_session() {
            Ok(credential) => credential,
            Err(e) => {
                tracing::warn!(band = %band.label, error = %e, "session handshake failed");
                return SwitchOutcome::AuthFailed(e.to_string());
            }
        };

        let url = format!("{}{}", self.base_url, NET_MODE_PATH);
        let body = protocol::net_mode_request(&band.mask);

        let mut response = match self
            .command_agent
            .post(&url)
            .header("Cookie", &credential.session_id)
            .header("__RequestVerificationToken", &credential.token)
            .header("Content-Type", "application/xml")
            .send(body.as_bytes())
        {
            Ok(response) => response,
            Err(e) => {
                tracing::warn!(band = %band.label, error = %e, "net-mode command failed to send");
                return SwitchOutcome::TransportError(e.to_string());
            }
        };

        let status = response.status().as_u16();
        let reply = match response.body_mut().read_to_string() {
            Ok(body) => body,
            Err(e) => {
                tracing::warn!(band = %band.label, error = %e, "failed to read command response");
                return SwitchOutcome::TransportError(e.to_string());
            }
        };

        match protocol::parse_command_reply(&reply) {
            CommandReply::Ok => {
                tracing::info!(band = %band.label, mask = %band.mask, "device acknowledged band restriction");
                SwitchOutcome::Switched
            }
            CommandReply::Rejected { code, message } => {
                tracing::warn!(
                    band = %band.label,
                    status,
                    code = ?code,
                    message = %message,
                    "device rejected band restriction"
                );
                SwitchOutcome::CommandRejected(message)
            }
        }
    }
}

/// Agent with a global timeout. Non-2xx statuses are surfaced as responses
/// rather than transport errors so rejection bodies stay readable.
fn agent_with_timeout(timeout: Duration) -> ureq::Agent {
    ureq::Agent::config_builder()
        .timeout_global(Some(timeout))
        .http_status_as_error(false)
        .build()
        .into()
}
