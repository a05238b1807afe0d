// Copyright (c) 2026 MIPS-Memview Authors.
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

use serde::{Deserialize, Serialize};

use crate::formatter::{FormatOptions, FormattedRow};
use crate::hex_view::{EditMode, HexOptions, HexRow};
use crate::layout::DrawPrimitive;

// Request and response types exchanged with the front end. Addresses travel
// as hex strings ("0x80001000") so the front end never has to care about
// number precision; the helper parses them with `utils::parse_hex_address`.

/**
 * DisasmRequest asks for one frame of the instruction viewer: `count` rows
 * starting at `address`. When `tab` names a tab held by the helper, the
 * tab's current base is used instead of `address`.
 */
#[derive(Serialize, Deserialize, Debug, ts_rs::TS)]
#[ts(export, export_to = "bindings/")]
pub struct DisasmRequest {
    pub req: String, // "disasm"
    pub seq: u64,
    #[serde(default)]
    pub address: Option<String>,
    #[serde(default)]
    pub tab: Option<String>,
    pub count: u32,
    #[serde(default)]
    pub options: FormatOptions,
    /// Underline every token to check column alignment.
    #[serde(default)]
    pub overlay: bool,
}

#[derive(Serialize, Deserialize, Debug, ts_rs::TS)]
#[ts(export, export_to = "bindings/")]
pub struct DisasmResponse {
    pub req: String, // "disasm"
    pub seq: u64,
    pub base: String,
    pub rows: Vec<FormattedRow>,
    pub primitives: Vec<DrawPrimitive>,
    pub max_depth: u32,
}

#[derive(Serialize, Deserialize, Debug, ts_rs::TS)]
#[ts(export, export_to = "bindings/")]
pub struct HexRequest {
    pub req: String, // "hex"
    pub seq: u64,
    pub address: String,
    pub rows: u32,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cursor: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub selection_end: Option<String>,
    #[serde(default)]
    pub options: HexOptions,
}

#[derive(Serialize, Deserialize, Debug, ts_rs::TS)]
#[ts(export, export_to = "bindings/")]
pub struct HexResponse {
    pub req: String, // "hex"
    pub seq: u64,
    pub rows: Vec<HexRow>,
    /// Present when the request carried a cursor.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub readout: Option<String>,
}

/// Input applied to a viewer tab held by the helper.
#[derive(Serialize, Deserialize, Debug, Clone, ts_rs::TS)]
#[ts(export, export_to = "bindings/")]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ScrollAction {
    Wheel { delta: i32 },
    PageUp { rows: u32 },
    PageDown { rows: u32 },
    /// Hex expression: `0x80001000`, `80001000`, `+0x40`, `-8`.
    Goto { expr: String },
    /// Base moves to the target of the branch or jump at `address`.
    Follow { address: String },
    Note { text: String },
    Close,
}

#[derive(Serialize, Deserialize, Debug, ts_rs::TS)]
#[ts(export, export_to = "bindings/")]
pub struct ScrollRequest {
    pub req: String, // "scroll"
    pub seq: u64,
    pub tab: String,
    pub action: ScrollAction,
}

#[derive(Serialize, Deserialize, Debug, ts_rs::TS)]
#[ts(export, export_to = "bindings/")]
pub struct ScrollResponse {
    pub req: String, // "scroll"
    pub seq: u64,
    pub tab: String,
    pub address: String,
    pub open: bool,
    pub note: String,
}

/// Keystroke applied at the hex cursor.
#[derive(Serialize, Deserialize, Debug, Clone, ts_rs::TS)]
#[ts(export, export_to = "bindings/")]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum HexEditAction {
    /// A hex digit 0..=15, written according to `mode`.
    Digit {
        digit: u8,
        #[serde(default)]
        mode: EditMode,
    },
    Backspace,
    Delete,
    /// Start of the cursor's row in a grid whose first row is at `base`.
    Home { base: String, bytes_per_row: u32 },
    /// Low nibble of the last byte of the cursor's row.
    End { base: String, bytes_per_row: u32 },
    /// Open (or retarget) instruction tab `tab` at the word under the cursor.
    OpenPointer { tab: String },
}

#[derive(Serialize, Deserialize, Debug, ts_rs::TS)]
#[ts(export, export_to = "bindings/")]
pub struct HexEditRequest {
    pub req: String, // "hex_edit"
    pub seq: u64,
    pub cursor: String,
    #[serde(default)]
    pub low_nibble: bool,
    pub action: HexEditAction,
}

#[derive(Serialize, Deserialize, Debug, ts_rs::TS)]
#[ts(export, export_to = "bindings/")]
pub struct HexEditResponse {
    pub req: String, // "hex_edit"
    pub seq: u64,
    pub cursor: String,
    pub low_nibble: bool,
    /// Set by `open_pointer`: the tab and the address it now shows.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tab: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tab_address: Option<String>,
}

/**
 * Events generated by the helper process and sent to the front end.
 * Uses internally-tagged enum serialization so each variant has a 'type' field.
 * In TypeScript, this becomes a discriminated union for type-safe event handling.
 */
#[derive(Serialize, Deserialize, Debug, ts_rs::TS)]
#[ts(export, export_to = "bindings/")]
#[serde(tag = "type")]
pub enum HelperEvent {
    /// Memory image is mapped and requests can be served
    Ready {
        session_id: String,
        version: String,
        memory_size: u32,
    },

    /// A request failed or could not be understood
    Error {
        session_id: String,
        #[serde(skip_serializing_if = "Option::is_none")]
        seq: Option<u64>,
        #[serde(skip_serializing_if = "Option::is_none")]
        code: Option<String>,
        message: String,
        #[serde(skip_serializing_if = "Option::is_none")]
        details: Option<String>,
    },

    /// Diagnostic/log message (typically only shown if verbose logging enabled)
    Log {
        session_id: String,
        level: String,
        message: String,
    },
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    /// ts_rs writes the TypeScript bindings when the exported types are
    /// compiled for tests; this also checks the wire shape of a request.
    #[test]
    fn disasm_request_defaults() {
        let req: DisasmRequest = serde_json::from_value(json!({
            "req": "disasm",
            "seq": 3,
            "address": "0x80000000",
            "count": 8
        }))
        .unwrap();
        assert_eq!(req.count, 8);
        assert_eq!(req.options, FormatOptions::default());
        assert!(!req.overlay);
        assert!(req.tab.is_none());
    }

    #[test]
    fn scroll_actions_are_tagged() {
        let req: ScrollRequest = serde_json::from_value(json!({
            "req": "scroll",
            "seq": 1,
            "tab": "main",
            "action": { "kind": "page_down", "rows": 20 }
        }))
        .unwrap();
        assert!(matches!(req.action, ScrollAction::PageDown { rows: 20 }));

        let v = serde_json::to_value(HelperEvent::Error {
            session_id: "s".into(),
            seq: None,
            code: None,
            message: "boom".into(),
            details: None,
        })
        .unwrap();
        assert_eq!(v, json!({"type": "Error", "session_id": "s", "message": "boom"}));
    }

    #[test]
    fn hex_edit_digit_defaults_to_nibble_mode() {
        let req: HexEditRequest = serde_json::from_value(json!({
            "req": "hex_edit",
            "seq": 9,
            "cursor": "0x80000010",
            "action": { "kind": "digit", "digit": 7 }
        }))
        .unwrap();
        assert!(!req.low_nibble);
        assert!(matches!(
            req.action,
            HexEditAction::Digit {
                digit: 7,
                mode: EditMode::Nibble
            }
        ));

        let action: HexEditAction =
            serde_json::from_value(json!({"kind": "open_pointer", "tab": "ptr"})).unwrap();
        assert!(matches!(action, HexEditAction::OpenPointer { tab } if tab == "ptr"));
    }
}
