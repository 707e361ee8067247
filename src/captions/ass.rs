// ASS (Advanced SubStation Alpha) caption track
use std::fmt::Write;

use super::{CaptionStyle, PhraseSegment};

/// Convert seconds to the ASS time format `H:MM:SS.CC`.
///
/// Components are floor-divided, never rounded up, so a caption can not
/// start ahead of its audio.
pub fn format_ass_time(seconds: f64) -> String {
    let hours = (seconds / 3600.0) as u64;
    let minutes = ((seconds % 3600.0) / 60.0) as u64;
    let secs = (seconds % 60.0) as u64;
    let centis = ((seconds % 1.0) * 100.0) as u64;
    format!("{}:{:02}:{:02}.{:02}", hours, minutes, secs, centis)
}

/// Render phrases into a complete ASS document.
///
/// One Dialogue event per phrase; text is passed through verbatim since the
/// format treats special characters literally. An empty phrase list yields a
/// valid header-only document.
pub fn build_caption_track(phrases: &[PhraseSegment], style: &CaptionStyle) -> String {
    let mut doc = String::new();

    doc.push_str("[Script Info]\n");
    doc.push_str("ScriptType: v4.00+\n");
    let _ = writeln!(doc, "PlayResX: {}", style.play_res_x);
    let _ = writeln!(doc, "PlayResY: {}", style.play_res_y);
    doc.push('\n');

    doc.push_str("[V4+ Styles]\n");
    doc.push_str(
        "Format: Name, Fontname, Fontsize, PrimaryColour, SecondaryColour, OutlineColour, \
         BackColour, Bold, Italic, Underline, StrikeOut, ScaleX, ScaleY, Spacing, Angle, \
         BorderStyle, Outline, Shadow, Alignment, MarginL, MarginR, MarginV, Encoding\n",
    );
    let _ = writeln!(
        doc,
        "Style: Default,{},{},&H00FFFFFF,&H000000FF,&H00000000,&H80000000,-1,0,0,0,100,100,0,0,3,2,0,2,10,10,{},1",
        style.font, style.font_size, style.margin_v
    );
    doc.push('\n');

    doc.push_str("[Events]\n");
    doc.push_str("Format: Layer, Start, End, Style, Name, MarginL, MarginR, MarginV, Effect, Text\n");

    for phrase in phrases {
        let _ = writeln!(
            doc,
            "Dialogue: 0,{},{},Default,,0,0,0,,{}",
            format_ass_time(phrase.start),
            format_ass_time(phrase.end),
            phrase.text
        );
    }

    doc
}
