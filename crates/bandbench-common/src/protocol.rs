//! Device control protocol codec.
//!
//! Huawei-class portable routers expose an XML-over-HTTP control API on the
//! LAN. Two exchanges matter here: the session/token handshake
//! (`GET /api/webserver/SesTokInfo`) and the network-mode command
//! (`POST /api/net/net-mode`). Request bodies are a fixed command shape;
//! responses are small XML documents parsed by this module.

use thiserror::Error;

use crate::models::Credential;

/// Session-info endpoint path.
pub const SESSION_INFO_PATH: &str = "/api/webserver/SesTokInfo";
/// Network-mode command endpoint path.
pub const NET_MODE_PATH: &str = "/api/net/net-mode";

/// Network mode selector: LTE only. Some firmwares want `00` (all modes)
/// instead.
pub const NETWORK_MODE_LTE: &str = "03";
/// The 3G band mask is left wide open; only the LTE mask is restricted.
pub const NETWORK_BAND_ALL: &str = "3FFFFFFF";

/// Handshake failure: the session-info exchange did not yield a usable
/// credential pair.
#[derive(Debug, Error)]
pub enum AuthError {
    #[error("session request failed: {0}")]
    Transport(String),
    #[error("malformed session response: {0}")]
    MalformedResponse(String),
}

/// Parse `SesInfo` + `TokInfo` out of the session-info response body.
pub fn parse_session_tokens(xml: &str) -> Result<Credential, AuthError> {
    let doc = roxmltree::Document::parse(xml)
        .map_err(|e| AuthError::MalformedResponse(e.to_string()))?;
    let field = |name: &str| {
        doc.descendants()
            .find(|n| n.has_tag_name(name))
            .and_then(|n| n.text())
            .map(str::trim)
            .filter(|t| !t.is_empty())
            .map(str::to_string)
    };
    let session_id =
        field("SesInfo").ok_or_else(|| AuthError::MalformedResponse("missing SesInfo".into()))?;
    let token =
        field("TokInfo").ok_or_else(|| AuthError::MalformedResponse("missing TokInfo".into()))?;
    Ok(Credential { session_id, token })
}

/// Build the net-mode command body restricting LTE to `mask`.
pub fn net_mode_request(mask: &str) -> String {
    format!(
        "<request><NetworkMode>{NETWORK_MODE_LTE}</NetworkMode>\
         <NetworkBand>{NETWORK_BAND_ALL}</NetworkBand>\
         <LTEBand>{mask}</LTEBand></request>"
    )
}

/// Parsed device reply to a command POST.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CommandReply {
    /// Explicit `<response>OK</response>` acknowledgment.
    Ok,
    /// The device declined, or the body was not a recognizable
    /// acknowledgment.
    Rejected {
        code: Option<String>,
        message: String,
    },
}

/// Interpret a command response body.
///
/// Success requires the explicit OK acknowledgment. These devices return
/// HTTP 200 around `<error>` documents, so the status code alone proves
/// nothing; an error body or an unrecognizable body both count as
/// rejections.
pub fn parse_command_reply(body: &str) -> CommandReply {
    let Ok(doc) = roxmltree::Document::parse(body) else {
        return CommandReply::Rejected {
            code: None,
            message: snippet(body),
        };
    };
    let root = doc.root_element();

    if root.has_tag_name("response") && root.text().map(str::trim) == Some("OK") {
        return CommandReply::Ok;
    }

    if root.has_tag_name("error") {
        let child = |name: &str| {
            root.children()
                .find(|n| n.has_tag_name(name))
                .and_then(|n| n.text())
                .map(str::trim)
                .filter(|t| !t.is_empty())
                .map(str::to_string)
        };
        let code = child("code");
        let message = child("message").unwrap_or_else(|| match &code {
            Some(c) => format!("device error code {c}"),
            None => "device returned an error".to_string(),
        });
        return CommandReply::Rejected { code, message };
    }

    CommandReply::Rejected {
        code: None,
        message: snippet(body),
    }
}

/// First line of the raw body, bounded, for reject messages and logs.
fn snippet(body: &str) -> String {
    let line = body.lines().next().unwrap_or("").trim();
    if line.is_empty() {
        return "empty response body".to_string();
    }
    if line.len() > 120 {
        let cut: String = line.chars().take(120).collect();
        format!("{cut}...")
    } else {
        line.to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn session_tokens_parsed() {
        let xml = "<response><SesInfo>SessionID=abc123</SesInfo><TokInfo>tok456</TokInfo></response>";
        let credential = parse_session_tokens(xml).unwrap();
        assert_eq!(credential.session_id, "SessionID=abc123");
        assert_eq!(credential.token, "tok456");
    }

    #[test]
    fn session_missing_token_rejected() {
        let xml = "<response><SesInfo>SessionID=abc123</SesInfo></response>";
        assert!(matches!(
            parse_session_tokens(xml),
            Err(AuthError::MalformedResponse(_))
        ));
    }

    #[test]
    fn session_garbage_rejected() {
        assert!(matches!(
            parse_session_tokens("not xml at all"),
            Err(AuthError::MalformedResponse(_))
        ));
    }

    #[test]
    fn net_mode_body_embeds_mask_and_selectors() {
        let body = net_mode_request("80");
        assert!(body.contains("<NetworkMode>03</NetworkMode>"));
        assert!(body.contains("<NetworkBand>3FFFFFFF</NetworkBand>"));
        assert!(body.contains("<LTEBand>80</LTEBand>"));
    }

    #[test]
    fn explicit_ok_is_acknowledged() {
        assert_eq!(parse_command_reply("<response>OK</response>"), CommandReply::Ok);
        assert_eq!(
            parse_command_reply("<response>\n  OK\n</response>"),
            CommandReply::Ok
        );
    }

    #[test]
    fn error_document_is_rejected_with_code() {
        let reply = parse_command_reply(
            "<error><code>100003</code><message>No rights</message></error>",
        );
        assert_eq!(
            reply,
            CommandReply::Rejected {
                code: Some("100003".to_string()),
                message: "No rights".to_string(),
            }
        );
    }

    #[test]
    fn error_without_message_reports_code() {
        let reply = parse_command_reply("<error><code>125002</code><message/></error>");
        match reply {
            CommandReply::Rejected { code, message } => {
                assert_eq!(code.as_deref(), Some("125002"));
                assert_eq!(message, "device error code 125002");
            }
            CommandReply::Ok => panic!("error body must not acknowledge"),
        }
    }

    #[test]
    fn http_200_with_unrelated_body_is_not_success() {
        // The permissive "OK substring or any 200" signal is exactly what
        // this parser refuses to accept.
        let reply = parse_command_reply("<html><body>login OK</body></html>");
        assert!(matches!(reply, CommandReply::Rejected { .. }));
    }
}
