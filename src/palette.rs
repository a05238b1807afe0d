use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize, ts_rs::TS)]
#[ts(export, export_to = "bindings/")]
pub struct Rgba {
    pub r: f32,
    pub g: f32,
    pub b: f32,
    pub a: f32,
}

impl Rgba {
    pub const fn new(r: f32, g: f32, b: f32, a: f32) -> Self {
        Self { r, g, b, a }
    }

    pub const fn rgb(r: f32, g: f32, b: f32) -> Self {
        Self::new(r, g, b, 1.0)
    }
}

/// What a piece of text is, as far as colouring goes. The renderer owns the
/// actual colours; [`Palette`] is the default mapping.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, ts_rs::TS)]
#[ts(export, export_to = "bindings/")]
#[serde(rename_all = "snake_case")]
pub enum ColorClass {
    Text,
    Address,
    Jump,
    Branch,
    Instruction,
    Immediate,
    RsOffset,
    StackIn,
    StackOut,
    JrRa,
    Disabled,
    Error,
    Diagnostic,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Palette {
    pub text: Rgba,
    pub address: Rgba,
    pub jump: Rgba,
    pub branch: Rgba,
    pub instruction: Rgba,
    pub immediate: Rgba,
    pub rs_offset: Rgba,
    pub stack_in: Rgba,
    pub stack_out: Rgba,
    pub jr_ra: Rgba,
    pub disabled: Rgba,
    pub error: Rgba,
    pub diagnostic: Rgba,
    pub separator: Rgba,
}

impl Default for Palette {
    fn default() -> Self {
        Self {
            text: Rgba::rgb(0.6, 0.5, 0.6),
            address: Rgba::rgb(0.5, 0.5, 0.5),
            jump: Rgba::rgb(0.5, 0.5, 0.75),
            branch: Rgba::rgb(0.5, 0.65, 0.65),
            instruction: Rgba::rgb(0.5, 0.75, 0.5),
            immediate: Rgba::rgb(0.5, 0.5, 0.3),
            rs_offset: Rgba::rgb(0.65, 0.65, 0.2),
            stack_in: Rgba::rgb(0.5, 0.8, 1.0),
            stack_out: Rgba::rgb(0.75, 0.5, 0.65),
            jr_ra: Rgba::rgb(1.0, 0.5, 0.5),
            disabled: Rgba::rgb(0.5, 0.5, 0.5),
            error: Rgba::rgb(1.0, 0.0, 0.0),
            diagnostic: Rgba::rgb(1.0, 0.5, 0.5),
            separator: Rgba::new(0.43, 0.43, 0.5, 0.5),
        }
    }
}

impl Palette {
    pub fn color(&self, class: ColorClass) -> Rgba {
        match class {
            ColorClass::Text => self.text,
            ColorClass::Address => self.address,
            ColorClass::Jump => self.jump,
            ColorClass::Branch => self.branch,
            ColorClass::Instruction => self.instruction,
            ColorClass::Immediate => self.immediate,
            ColorClass::RsOffset => self.rs_offset,
            ColorClass::StackIn => self.stack_in,
            ColorClass::StackOut => self.stack_out,
            ColorClass::JrRa => self.jr_ra,
            ColorClass::Disabled => self.disabled,
            ColorClass::Error => self.error,
            ColorClass::Diagnostic => self.diagnostic,
        }
    }
}
