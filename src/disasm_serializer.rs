use serde_json::json;
use serde_json::Value;

use crate::command_view::Frame;

/// Serialize a rendered [`Frame`] into a compact JSON message for front ends
/// that only want the text.
/// Format:
/// {
///   "t": "disasm_chunk",
///   "id": <seq id>,
///   "start": "0x...",
///   "final": bool,
///   "lines": [ [addr_hex, [[text, class, column], ...]], ... ]
/// }
pub fn serialize_compact_frame(frame: &Frame, seq_id: u64, final_chunk: bool) -> Value {
    let mut lines: Vec<Value> = Vec::with_capacity(frame.rows.len());
    for row in &frame.rows {
        // Address as hex string for JS safe handling
        let addr_hex = format!("0x{:x}", row.address);
        let tokens: Vec<Value> = row
            .tokens
            .iter()
            .map(|t| json!([t.text, t.color, t.column]))
            .collect();
        lines.push(json!([addr_hex, tokens]));
    }

    json!({
        "t": "disasm_chunk",
        "id": seq_id,
        "start": format!("0x{:x}", frame.base),
        "final": final_chunk,
        "lines": Value::Array(lines),
    })
}
