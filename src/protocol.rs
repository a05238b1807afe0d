/// Protocol helpers for the helper ↔ front end communication.
use crate::command_view::MAX_FRAME_ROWS;
use crate::error::ViewError;
use crate::helper_requests::{DisasmRequest, HelperEvent};
use crate::utils::parse_hex_address;
use serde_json::{json, Value};

/// A disasm request after its hex fields have been parsed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DisasmJob {
    /// `None` means "use the named tab's base".
    pub start_addr: Option<u32>,
    pub tab: Option<String>,
    pub count: u32,
    pub seq_id: u64,
}

impl DisasmJob {
    /// Fails when the address is present but does not parse, when the
    /// request names neither an address nor a tab, or when the row count or
    /// format options are out of range.
    pub fn from_request(req: &DisasmRequest) -> Result<Self, ViewError> {
        let start_addr = match &req.address {
            Some(a) => Some(
                parse_hex_address(a).ok_or_else(|| ViewError::InvalidAddress(a.clone()))?,
            ),
            None => None,
        };
        if start_addr.is_none() && req.tab.is_none() {
            return Err(ViewError::InvalidOption(
                "disasm needs an address or a tab".to_string(),
            ));
        }
        if req.count > MAX_FRAME_ROWS {
            return Err(ViewError::InvalidOption(format!(
                "count must be at most {}, got {}",
                MAX_FRAME_ROWS, req.count
            )));
        }
        req.options.validate()?;
        Ok(Self {
            start_addr,
            tab: req.tab.clone(),
            count: req.count,
            seq_id: req.seq,
        })
    }
}

/// Wrap an event in a JSON-RPC notification envelope.
pub fn wrap_event_as_notification(event: &HelperEvent) -> Value {
    json!({
        "jsonrpc": "2.0",
        "method": "HelperEvent",
        "params": event
    })
}

/// Build a Ready event notification.
pub fn ready_notification(session_id: &str, version: &str, memory_size: u32) -> Value {
    let event = HelperEvent::Ready {
        session_id: session_id.to_string(),
        version: version.to_string(),
        memory_size,
    };
    wrap_event_as_notification(&event)
}

/// Build an Error event notification.
pub fn error_notification(
    session_id: &str,
    seq: Option<u64>,
    code: &str,
    message: impl Into<String>,
) -> Value {
    let event = HelperEvent::Error {
        session_id: session_id.to_string(),
        seq,
        code: Some(code.to_string()),
        message: message.into(),
        details: None,
    };
    wrap_event_as_notification(&event)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::formatter::FormatOptions;

    fn request(address: Option<&str>, tab: Option<&str>) -> DisasmRequest {
        DisasmRequest {
            req: "disasm".into(),
            seq: 9,
            address: address.map(String::from),
            tab: tab.map(String::from),
            count: 4,
            options: FormatOptions::default(),
            overlay: false,
        }
    }

    #[test]
    fn job_from_request() {
        let job = DisasmJob::from_request(&request(Some("0x80000010"), None)).unwrap();
        assert_eq!(job.start_addr, Some(0x8000_0010));
        assert_eq!(job.seq_id, 9);

        let job = DisasmJob::from_request(&request(None, Some("main"))).unwrap();
        assert_eq!(job.start_addr, None);

        assert!(matches!(
            DisasmJob::from_request(&request(Some("xyz"), None)),
            Err(ViewError::InvalidAddress(_))
        ));
        assert!(DisasmJob::from_request(&request(None, None)).is_err());
    }

    #[test]
    fn job_limits_rows_and_spacing() {
        let mut req = request(Some("0x80000000"), None);
        req.count = MAX_FRAME_ROWS;
        assert!(DisasmJob::from_request(&req).is_ok());
        req.count = u32::MAX;
        assert!(matches!(
            DisasmJob::from_request(&req),
            Err(ViewError::InvalidOption(_))
        ));

        let mut req = request(Some("0x80000000"), None);
        req.options.spacing = u32::MAX;
        assert!(matches!(
            DisasmJob::from_request(&req),
            Err(ViewError::InvalidOption(_))
        ));
    }

    #[test]
    fn notifications_are_json_rpc() {
        let v = ready_notification("local-session", "0.1.0", 0x80_0000);
        assert_eq!(v["jsonrpc"], "2.0");
        assert_eq!(v["params"]["type"], "Ready");
        assert_eq!(v["params"]["memory_size"], 0x80_0000);

        let v = error_notification("local-session", Some(4), "unknown_request", "nope");
        assert_eq!(v["params"]["code"], "unknown_request");
        assert_eq!(v["params"]["seq"], 4);
    }
}
