use mips_memview::disasm_serializer::serialize_compact_frame;
use mips_memview::text_canvas::TextCanvas;
use mips_memview::{CommandView, FormatOptions, Geometry, MipsDecoder, RamImage, ViewerTab};

fn main() {
    // addiu sp, sp, -0x18 ; sw ra, 0x14(sp) ; beq a0, zero, +3 ; nop ;
    // bne a1, zero, +1 ; nop ; lw ra, 0x14(sp) ; jr ra ; addiu sp, sp, 0x18
    let words: [u32; 9] = [
        0x27BD_FFE8,
        0xAFBF_0014,
        0x1080_0003,
        0x0000_0000,
        0x14A0_0001,
        0x0000_0000,
        0x8FBF_0014,
        0x03E0_0008,
        0x27BD_0018,
    ];
    let bytes = words.iter().flat_map(|w| w.to_be_bytes()).collect();
    let image = RamImage::from_bytes(bytes);
    let tab = ViewerTab::new(0x8000_0000);

    let options = FormatOptions::default();
    let text_view = CommandView::new(options, Geometry::unit());
    let frame = text_view.render(&image, &MipsDecoder, &tab, words.len() as u32);
    print!("{}", TextCanvas::render_frame(&frame, 72));

    let frame = CommandView::default().render(&image, &MipsDecoder, &tab, words.len() as u32);
    let v = serialize_compact_frame(&frame, 1, true);
    eprintln!("{}", serde_json::to_string_pretty(&v).unwrap());
}
