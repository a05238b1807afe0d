//! Request parsing and dispatch for the helper's request loop.
use std::collections::HashMap;

use serde::Serialize;
use serde_json::Value;

use crate::command_view::{CommandView, ViewerTab, MAX_FRAME_ROWS};
use crate::decoder::MipsDecoder;
use crate::error::ViewError;
use crate::helper_requests::*;
use crate::hex_view::{apply_edit, readout, render_hex, HexCursor, HexEdit, MAX_BYTES_PER_ROW};
use crate::layout::Geometry;
use crate::memory::{Memory, KSEG0};
use crate::protocol::{error_notification, ready_notification, DisasmJob};
use crate::transport::{MalformedFrame, Transport};
use crate::utils::parse_hex_address;

/// Everything the helper keeps between requests: the memory being viewed
/// and the viewer tabs the front end has opened.
pub struct HelperState {
    memory: Box<dyn Memory>,
    tabs: HashMap<String, ViewerTab>,
    session_id: String,
    geometry: Geometry,
}

impl HelperState {
    pub fn new(memory: Box<dyn Memory>, session_id: impl Into<String>) -> Self {
        Self {
            memory,
            tabs: HashMap::new(),
            session_id: session_id.into(),
            geometry: Geometry::default(),
        }
    }

    pub fn with_geometry(mut self, geometry: Geometry) -> Self {
        self.geometry = geometry;
        self
    }

    pub fn tab(&self, name: &str) -> Option<&ViewerTab> {
        self.tabs.get(name)
    }

    fn error(&self, transport: &mut dyn Transport, seq: Option<u64>, code: &str, msg: String) {
        log::warn!("{}: {}", code, msg);
        let note = error_notification(&self.session_id, seq, code, msg);
        if let Err(e) = transport.write_message(&note) {
            log::error!("Failed to write error event: {}", e);
        }
    }
}

fn send<T: Serialize>(transport: &mut dyn Transport, response: &T) -> bool {
    let value = match serde_json::to_value(response) {
        Ok(v) => v,
        Err(e) => {
            log::error!("Failed to serialize response: {}", e);
            return false;
        }
    };
    match transport.write_message(&value) {
        Ok(()) => true,
        Err(e) => {
            log::error!("Failed to write response: {}", e);
            false
        }
    }
}

fn seq_of(msg: &Value) -> Option<u64> {
    msg.get("seq").and_then(|v| v.as_u64())
}

/// Error event code for a failed request.
fn error_code(e: &ViewError) -> &'static str {
    match e {
        ViewError::InvalidAddress(_) => "bad_address",
        ViewError::OutOfRange(_) => "out_of_range",
        ViewError::ReadOnly { .. } => "read_only",
        _ => "bad_request",
    }
}

/// Parse and dispatch one request based on its 'req' discriminant.
///
/// All requests have a 'req' field that identifies the request type. We peek at this
/// field, then deserialize into the appropriate typed struct. Returns false when the
/// request was rejected; the front end has been sent an Error event in that case.
pub fn dispatch_request(
    msg: &Value,
    state: &mut HelperState,
    transport: &mut dyn Transport,
) -> bool {
    let req_type = msg.get("req").and_then(|v| v.as_str());

    match req_type {
        Some("disasm") => handle_disasm_request(msg, state, transport),
        Some("hex") => handle_hex_request(msg, state, transport),
        Some("scroll") => handle_scroll_request(msg, state, transport),
        Some("hex_edit") => handle_hex_edit_request(msg, state, transport),
        _ => {
            state.error(
                transport,
                seq_of(msg),
                "unknown_request",
                format!("Unknown request type: {:?}", req_type),
            );
            false
        }
    }
}

fn parse<T: serde::de::DeserializeOwned>(
    msg: &Value,
    state: &HelperState,
    transport: &mut dyn Transport,
) -> Option<T> {
    match serde_json::from_value::<T>(msg.clone()) {
        Ok(v) => Some(v),
        Err(e) => {
            state.error(transport, seq_of(msg), "bad_request", e.to_string());
            None
        }
    }
}

fn handle_disasm_request(
    msg: &Value,
    state: &mut HelperState,
    transport: &mut dyn Transport,
) -> bool {
    let Some(req) = parse::<DisasmRequest>(msg, state, transport) else {
        return false;
    };
    let job = match DisasmJob::from_request(&req) {
        Ok(job) => job,
        Err(e) => {
            state.error(transport, Some(req.seq), error_code(&e), e.to_string());
            return false;
        }
    };

    let tab = match (&job.tab, job.start_addr) {
        (Some(name), start) => {
            let tab = state.tabs.entry(name.clone()).or_default();
            if let Some(addr) = start {
                tab.address = addr;
            }
            tab.clone()
        }
        (None, start) => ViewerTab::new(start.unwrap_or(KSEG0)),
    };

    let view = CommandView::new(req.options, state.geometry).with_alignment_overlay(req.overlay);
    let frame = view.render(state.memory.as_ref(), &MipsDecoder, &tab, job.count);
    log::debug!(
        "disasm seq {}: {} rows from 0x{:08x}, {} branches",
        job.seq_id,
        frame.rows.len(),
        frame.base,
        frame.forest.len()
    );

    send(
        transport,
        &DisasmResponse {
            req: "disasm".to_string(),
            seq: job.seq_id,
            base: format!("0x{:08x}", frame.base),
            rows: frame.rows,
            primitives: frame.primitives,
            max_depth: frame.max_depth,
        },
    )
}

/// `Ok(None)` when absent, `Err` with the text when it does not parse.
fn optional_address(input: &Option<String>) -> Result<Option<u32>, String> {
    match input {
        None => Ok(None),
        Some(s) => parse_hex_address(s).map(Some).ok_or_else(|| s.clone()),
    }
}

fn handle_hex_request(msg: &Value, state: &mut HelperState, transport: &mut dyn Transport) -> bool {
    let Some(req) = parse::<HexRequest>(msg, state, transport) else {
        return false;
    };
    let checked = if req.rows > MAX_FRAME_ROWS {
        Err(ViewError::InvalidOption(format!(
            "rows {} exceeds {}",
            req.rows, MAX_FRAME_ROWS
        )))
    } else {
        req.options.validate()
    };
    if let Err(e) = checked {
        state.error(transport, Some(req.seq), error_code(&e), e.to_string());
        return false;
    }
    let parsed = parse_hex_address(&req.address)
        .ok_or_else(|| req.address.clone())
        .and_then(|base| {
            let cursor = optional_address(&req.cursor)?;
            let end = optional_address(&req.selection_end)?;
            Ok((base, cursor, end))
        });
    let (base, cursor, end) = match parsed {
        Ok(v) => v,
        Err(bad) => {
            state.error(
                transport,
                Some(req.seq),
                "bad_address",
                format!("invalid address '{}'", bad),
            );
            return false;
        }
    };

    let memory = state.memory.as_ref();
    let rows = render_hex(memory, base, req.rows, &req.options);
    let readout = cursor.map(|c| readout(memory, c, end));
    send(
        transport,
        &HexResponse {
            req: "hex".to_string(),
            seq: req.seq,
            rows,
            readout,
        },
    )
}

fn handle_scroll_request(
    msg: &Value,
    state: &mut HelperState,
    transport: &mut dyn Transport,
) -> bool {
    let Some(req) = parse::<ScrollRequest>(msg, state, transport) else {
        return false;
    };
    let mut tab = state.tabs.get(&req.tab).cloned().unwrap_or_default();

    let applied: Result<(), String> = match &req.action {
        ScrollAction::Wheel { delta } => {
            tab.scroll(*delta);
            Ok(())
        }
        ScrollAction::PageUp { rows } => {
            tab.page_up(*rows);
            Ok(())
        }
        ScrollAction::PageDown { rows } => {
            tab.page_down(*rows);
            Ok(())
        }
        ScrollAction::Goto { expr } => tab.goto(expr).map(|_| ()).map_err(|e| e.to_string()),
        ScrollAction::Follow { address } => match parse_hex_address(address) {
            Some(addr) => {
                if tab.follow(state.memory.as_ref(), &MipsDecoder, addr).is_none() {
                    log::debug!("nothing to follow at 0x{:08x}", addr);
                }
                Ok(())
            }
            None => Err(format!("invalid address '{}'", address)),
        },
        ScrollAction::Note { text } => {
            tab.note = text.clone();
            Ok(())
        }
        ScrollAction::Close => {
            tab.open = false;
            Ok(())
        }
    };

    if let Err(message) = applied {
        state.error(transport, Some(req.seq), "bad_address", message);
        return false;
    }

    let response = ScrollResponse {
        req: "scroll".to_string(),
        seq: req.seq,
        tab: req.tab.clone(),
        address: format!("0x{:08x}", tab.address),
        open: tab.open,
        note: tab.note.clone(),
    };
    state.tabs.insert(req.tab, tab);
    send(transport, &response)
}

fn row_anchor(base: &str, bytes_per_row: u32) -> Result<u32, ViewError> {
    if !(1..=MAX_BYTES_PER_ROW).contains(&bytes_per_row) {
        return Err(ViewError::InvalidOption(format!(
            "bytes_per_row {} is outside 1..={}",
            bytes_per_row, MAX_BYTES_PER_ROW
        )));
    }
    parse_hex_address(base).ok_or_else(|| ViewError::InvalidAddress(base.to_string()))
}

/// Apply one hex-view keystroke. Writes go to the helper's memory; the
/// response carries the new cursor.
fn handle_hex_edit_request(
    msg: &Value,
    state: &mut HelperState,
    transport: &mut dyn Transport,
) -> bool {
    let Some(req) = parse::<HexEditRequest>(msg, state, transport) else {
        return false;
    };
    let Some(address) = parse_hex_address(&req.cursor) else {
        state.error(
            transport,
            Some(req.seq),
            "bad_address",
            format!("invalid address '{}'", req.cursor),
        );
        return false;
    };
    let cursor = HexCursor {
        address,
        low_nibble: req.low_nibble,
    };

    let mut opened: Option<(String, u32)> = None;
    let moved = match &req.action {
        HexEditAction::Digit { digit, mode } => apply_edit(
            state.memory.as_mut(),
            cursor,
            HexEdit::Digit {
                digit: *digit,
                mode: *mode,
            },
        ),
        HexEditAction::Backspace => apply_edit(state.memory.as_mut(), cursor, HexEdit::Backspace),
        HexEditAction::Delete => apply_edit(state.memory.as_mut(), cursor, HexEdit::Delete),
        HexEditAction::Home { base, bytes_per_row } => {
            row_anchor(base, *bytes_per_row).map(|b| cursor.home(b, *bytes_per_row))
        }
        HexEditAction::End { base, bytes_per_row } => {
            row_anchor(base, *bytes_per_row).map(|b| cursor.end(b, *bytes_per_row))
        }
        HexEditAction::OpenPointer { tab } => match state.memory.read32(cursor.address) {
            Ok(pointer) => {
                log::debug!("tab {} opened at pointer 0x{:08x}", tab, pointer);
                state.tabs.insert(tab.clone(), ViewerTab::new(pointer));
                opened = Some((tab.clone(), pointer));
                Ok(cursor)
            }
            Err(e) => Err(e.into()),
        },
    };

    let next = match moved {
        Ok(next) => next,
        Err(e) => {
            state.error(transport, Some(req.seq), error_code(&e), e.to_string());
            return false;
        }
    };
    let (tab, tab_address) = match opened {
        Some((name, pointer)) => (Some(name), Some(format!("0x{:08x}", pointer))),
        None => (None, None),
    };
    send(
        transport,
        &HexEditResponse {
            req: "hex_edit".to_string(),
            seq: req.seq,
            cursor: format!("0x{:08x}", next.address),
            low_nibble: next.low_nibble,
            tab,
            tab_address,
        },
    )
}

/// Announce readiness, then serve requests until the transport closes.
pub fn serve(
    state: &mut HelperState,
    transport: &mut dyn Transport,
    memory_size: u32,
) -> anyhow::Result<()> {
    let ready = ready_notification(&state.session_id, env!("CARGO_PKG_VERSION"), memory_size);
    transport
        .write_message(&ready)
        .map_err(|e| anyhow::anyhow!("failed to send Ready: {}", e))?;
    log::info!("helper ready, {} bytes of memory", memory_size);

    loop {
        let msg = match transport.read_message() {
            Ok(msg) => msg,
            Err(e) if e.downcast_ref::<MalformedFrame>().is_some() => {
                state.error(transport, None, "parse_error", e.to_string());
                continue;
            }
            Err(e) => {
                log::info!("request loop finished: {}", e);
                return Ok(());
            }
        };
        log::debug!("request: {}", msg);
        dispatch_request(&msg, state, transport);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::memory::RamImage;
    use serde_json::json;
    use std::collections::VecDeque;
    use std::error::Error;

    /// `Err` entries in `incoming` arrive as malformed frames.
    #[derive(Default)]
    struct QueueTransport {
        incoming: VecDeque<Result<Value, String>>,
        sent: Vec<Value>,
    }

    impl Transport for QueueTransport {
        fn read_message(&mut self) -> Result<Value, Box<dyn Error + Send + Sync>> {
            match self.incoming.pop_front() {
                Some(Ok(v)) => Ok(v),
                Some(Err(reason)) => Err(Box::new(MalformedFrame { reason })),
                None => Err("EOF".into()),
            }
        }

        fn write_message(&mut self, msg: &Value) -> Result<(), Box<dyn Error + Send + Sync>> {
            self.sent.push(msg.clone());
            Ok(())
        }
    }

    fn state() -> HelperState {
        let words = [0x1044_0003u32, 0x7C00_0000, 0x8FBF_0014, 0, 0x0C00_0400];
        let bytes: Vec<u8> = words.iter().flat_map(|w| w.to_be_bytes()).collect();
        HelperState::new(Box::new(RamImage::from_bytes(bytes)), "test")
    }

    #[test]
    fn disasm_returns_rows_and_primitives() {
        let mut st = state();
        let mut t = QueueTransport::default();
        let ok = dispatch_request(
            &json!({"req": "disasm", "seq": 2, "address": "0x80000000", "count": 4}),
            &mut st,
            &mut t,
        );
        assert!(ok);
        let resp = &t.sent[0];
        assert_eq!(resp["seq"], 2);
        assert_eq!(resp["base"], "0x80000000");
        assert_eq!(resp["rows"].as_array().unwrap().len(), 4);
        assert_eq!(resp["rows"][1]["kind"], "decode_error");
        assert_eq!(resp["max_depth"], 1);
        assert!(!resp["primitives"].as_array().unwrap().is_empty());
    }

    #[test]
    fn unknown_request_gets_error_event() {
        let mut st = state();
        let mut t = QueueTransport::default();
        assert!(!dispatch_request(&json!({"req": "globals", "seq": 5}), &mut st, &mut t));
        assert_eq!(t.sent[0]["params"]["type"], "Error");
        assert_eq!(t.sent[0]["params"]["seq"], 5);
    }

    #[test]
    fn scroll_keeps_tab_state() {
        let mut st = state();
        let mut t = QueueTransport::default();
        let scroll = |action: Value| json!({"req": "scroll", "seq": 1, "tab": "main", "action": action});

        assert!(dispatch_request(&scroll(json!({"kind": "wheel", "delta": -3})), &mut st, &mut t));
        assert_eq!(t.sent[0]["address"], "0x8000000c");
        assert!(dispatch_request(
            &scroll(json!({"kind": "follow", "address": "0x80000010"})),
            &mut st,
            &mut t
        ));
        assert_eq!(t.sent[1]["address"], "0x80001000");
        assert!(!dispatch_request(&scroll(json!({"kind": "goto", "expr": "??"})), &mut st, &mut t));
        assert_eq!(st.tab("main").unwrap().address, 0x8000_1000);

        // a disasm on the tab starts from its base
        assert!(dispatch_request(
            &json!({"req": "disasm", "seq": 7, "tab": "main", "count": 2}),
            &mut st,
            &mut t
        ));
        assert_eq!(t.sent.last().unwrap()["base"], "0x80001000");
    }

    #[test]
    fn hex_with_readout() {
        let mut st = state();
        let mut t = QueueTransport::default();
        assert!(dispatch_request(
            &json!({"req": "hex", "seq": 3, "address": "0x80000000", "rows": 2, "cursor": "0x80000000"}),
            &mut st,
            &mut t
        ));
        let resp = &t.sent[0];
        assert_eq!(resp["rows"][0]["cells"][0]["text"], "10");
        assert_eq!(resp["rows"][1]["cells"][4]["text"], "**");
        assert!(resp["readout"].as_str().unwrap().starts_with("80000000|u8:16"));
    }

    #[test]
    fn serve_answers_until_eof() {
        let mut st = state();
        let mut t = QueueTransport::default();
        t.incoming
            .push_back(Ok(json!({"req": "disasm", "seq": 1, "address": "0x80000000", "count": 1})));
        t.incoming.push_back(Ok(json!({"req": "bogus"})));
        serve(&mut st, &mut t, 20).unwrap();
        assert_eq!(t.sent.len(), 3);
        assert_eq!(t.sent[0]["params"]["type"], "Ready");
        assert_eq!(t.sent[1]["seq"], 1);
        assert_eq!(t.sent[2]["params"]["type"], "Error");
    }

    #[test]
    fn serve_keeps_going_after_a_bad_frame() {
        let mut st = state();
        let mut t = QueueTransport::default();
        t.incoming.push_back(Err("expected value at line 1 column 1".into()));
        t.incoming
            .push_back(Ok(json!({"req": "hex", "seq": 4, "address": "0x80000000", "rows": 1})));
        serve(&mut st, &mut t, 20).unwrap();
        assert_eq!(t.sent.len(), 3);
        assert_eq!(t.sent[1]["params"]["type"], "Error");
        assert_eq!(t.sent[1]["params"]["code"], "parse_error");
        assert_eq!(t.sent[2]["seq"], 4);
    }

    #[test]
    fn oversized_disasm_count_is_refused() {
        let mut st = state();
        let mut t = QueueTransport::default();
        assert!(!dispatch_request(
            &json!({"req": "disasm", "seq": 6, "address": "0x80000000", "count": 4294967295u32}),
            &mut st,
            &mut t
        ));
        assert_eq!(t.sent[0]["params"]["type"], "Error");
        assert_eq!(t.sent[0]["params"]["code"], "bad_request");
        assert_eq!(t.sent[0]["params"]["seq"], 6);

        // neither an address nor a tab
        assert!(!dispatch_request(&json!({"req": "disasm", "seq": 7, "count": 1}), &mut st, &mut t));
        assert_eq!(t.sent[1]["params"]["code"], "bad_request");
        assert!(!dispatch_request(
            &json!({"req": "disasm", "seq": 8, "address": "zz", "count": 1}),
            &mut st,
            &mut t
        ));
        assert_eq!(t.sent[2]["params"]["code"], "bad_address");

        // the helper still answers afterwards
        assert!(dispatch_request(
            &json!({"req": "disasm", "seq": 9, "address": "0x80000000", "count": 1}),
            &mut st,
            &mut t
        ));
    }

    #[test]
    fn hex_rejects_bad_geometry() {
        let mut st = state();
        let mut t = QueueTransport::default();
        let hex = |options: Value, rows: u32| {
            json!({"req": "hex", "seq": 1, "address": "0x80000000", "rows": rows, "options": options})
        };
        assert!(!dispatch_request(&hex(json!({"byte_grouping": 4294967295u32}), 1), &mut st, &mut t));
        assert!(!dispatch_request(&hex(json!({"bytes_per_row": 0}), 1), &mut st, &mut t));
        assert!(!dispatch_request(&hex(json!({}), 4294967295), &mut st, &mut t));
        assert_eq!(t.sent.len(), 3);
        assert!(t.sent.iter().all(|e| e["params"]["code"] == "bad_request"));
    }

    #[test]
    fn hex_edit_writes_and_moves_the_cursor() {
        let mut st = state();
        let mut t = QueueTransport::default();
        let edit = |cursor: &str, low: bool, action: Value| {
            json!({"req": "hex_edit", "seq": 2, "cursor": cursor, "low_nibble": low, "action": action})
        };

        assert!(dispatch_request(
            &edit("0x80000000", false, json!({"kind": "digit", "digit": 15})),
            &mut st,
            &mut t
        ));
        assert_eq!(t.sent[0]["cursor"], "0x80000000");
        assert_eq!(t.sent[0]["low_nibble"], true);
        assert_eq!(st.memory.read8(0x8000_0000).unwrap(), 0xF0);

        assert!(dispatch_request(
            &edit("0x80000001", false, json!({"kind": "digit", "digit": 3, "mode": "byte"})),
            &mut st,
            &mut t
        ));
        assert_eq!(t.sent[1]["cursor"], "0x80000002");
        assert_eq!(st.memory.read8(0x8000_0001).unwrap(), 0x33);

        assert!(dispatch_request(&edit("0x80000001", false, json!({"kind": "delete"})), &mut st, &mut t));
        assert_eq!(st.memory.read8(0x8000_0001).unwrap(), 0);

        assert!(dispatch_request(
            &edit("0x80000013", true, json!({"kind": "home", "base": "0x80000000", "bytes_per_row": 16})),
            &mut st,
            &mut t
        ));
        assert_eq!(t.sent[3]["cursor"], "0x80000010");
        assert_eq!(t.sent[3]["low_nibble"], false);
        assert!(dispatch_request(
            &edit("0x80000003", false, json!({"kind": "end", "base": "0x80000000", "bytes_per_row": 16})),
            &mut st,
            &mut t
        ));
        assert_eq!(t.sent[4]["cursor"], "0x8000000f");
        assert_eq!(t.sent[4]["low_nibble"], true);

        assert!(!dispatch_request(
            &edit("0x80000000", false, json!({"kind": "home", "base": "0x80000000", "bytes_per_row": 0})),
            &mut st,
            &mut t
        ));
        assert_eq!(t.sent[5]["params"]["code"], "bad_request");
        assert!(!dispatch_request(
            &edit("0x80000100", false, json!({"kind": "delete"})),
            &mut st,
            &mut t
        ));
        assert_eq!(t.sent[6]["params"]["code"], "out_of_range");
    }

    #[test]
    fn open_pointer_opens_a_tab_at_the_word() {
        let mut st = state();
        let mut t = QueueTransport::default();
        // the word at 0x80000010 is 0x0C000400
        assert!(dispatch_request(
            &json!({"req": "hex_edit", "seq": 3, "cursor": "0x80000010",
                    "action": {"kind": "open_pointer", "tab": "ptr"}}),
            &mut st,
            &mut t
        ));
        assert_eq!(t.sent[0]["tab"], "ptr");
        assert_eq!(t.sent[0]["tab_address"], "0x0c000400");
        assert_eq!(t.sent[0]["cursor"], "0x80000010");
        assert_eq!(st.tab("ptr").unwrap().address, 0x0C00_0400);
    }

    #[test]
    fn mapped_image_refuses_edits() {
        use std::io::Write;

        let mut file = tempfile::NamedTempFile::new().unwrap();
        file.write_all(&[0x11, 0x22, 0x33, 0x44]).unwrap();
        file.flush().unwrap();
        let image = RamImage::open(file.path()).unwrap();
        let mut st = HelperState::new(Box::new(image), "test");
        let mut t = QueueTransport::default();

        assert!(!dispatch_request(
            &json!({"req": "hex_edit", "seq": 1, "cursor": "0x80000000",
                    "action": {"kind": "digit", "digit": 1}}),
            &mut st,
            &mut t
        ));
        assert_eq!(t.sent[0]["params"]["code"], "read_only");
        assert_eq!(st.memory.read8(0x8000_0000).unwrap(), 0x11);
    }
}
