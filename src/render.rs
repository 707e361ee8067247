//! Still-image to silent-clip rendering with parametric zoom/pan effects.
//!
//! The source image is upsampled to 4096x4096 before zoompan and downsampled
//! to the output resolution afterward. Skipping the two-stage scale makes the
//! zoom trajectory visibly shaky from integer rounding, so it is a
//! correctness requirement here, not an optimization.

use std::path::Path;

use tracing::{debug, warn};

use crate::error::{NewsreelError, Result};
use crate::media;

/// Working resolution for the zoompan filter.
pub const SUPERSAMPLE_RES: &str = "4096x4096";
/// Final clip resolution.
pub const OUTPUT_RES: &str = "1024x1024";

/// Named zoom/pan transforms applied to still images.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Effect {
    #[default]
    ZoomIn,
    ZoomOut,
    PanRight,
    PanLeft,
    KenBurns,
}

impl Effect {
    /// Round-robin rotation used across multi-story segments. Selection is
    /// positional, never content-dependent.
    pub const ROTATION: [Effect; 4] = [
        Effect::ZoomIn,
        Effect::PanRight,
        Effect::ZoomOut,
        Effect::KenBurns,
    ];

    pub fn name(&self) -> &'static str {
        match self {
            Effect::ZoomIn => "zoom-in",
            Effect::ZoomOut => "zoom-out",
            Effect::PanRight => "pan-right",
            Effect::PanLeft => "pan-left",
            Effect::KenBurns => "ken-burns",
        }
    }

    pub fn description(&self) -> &'static str {
        match self {
            Effect::ZoomIn => "Zoom in 25%",
            Effect::ZoomOut => "Zoom out from 25%",
            Effect::PanRight => "Pan right with slight zoom",
            Effect::PanLeft => "Pan left with slight zoom",
            Effect::KenBurns => "Ken Burns effect - zoom + pan",
        }
    }

    /// zoompan `z` expression.
    fn zoom(&self) -> &'static str {
        match self {
            Effect::ZoomIn => "min(zoom+0.0004,1.25)",
            Effect::ZoomOut => "if(lte(zoom,1.01),1.25,max(zoom-0.0004,1.0))",
            Effect::PanRight | Effect::PanLeft => "min(zoom+0.0002,1.15)",
            Effect::KenBurns => "min(zoom+0.0003,1.20)",
        }
    }

    /// zoompan `x` expression.
    fn x(&self) -> &'static str {
        match self {
            Effect::PanRight => "iw/2-(iw/zoom/2)+on*2",
            Effect::PanLeft => "iw/2-(iw/zoom/2)-on*2",
            Effect::KenBurns => "iw/2-(iw/zoom/2)+on*1.5",
            _ => "iw/2-(iw/zoom/2)",
        }
    }

    /// zoompan `y` expression.
    fn y(&self) -> &'static str {
        match self {
            Effect::KenBurns => "ih/2-(ih/zoom/2)+on*1",
            _ => "ih/2-(ih/zoom/2)",
        }
    }

    /// Look up an effect by name. Effect choice is cosmetic, so unknown
    /// names fall back to the default rather than failing.
    pub fn from_name(name: &str) -> Effect {
        match name.to_lowercase().replace('_', "-").as_str() {
            "zoom-in" => Effect::ZoomIn,
            "zoom-out" => Effect::ZoomOut,
            "pan-right" => Effect::PanRight,
            "pan-left" => Effect::PanLeft,
            "ken-burns" => Effect::KenBurns,
            other => {
                warn!(
                    "Unknown effect '{}', falling back to '{}'",
                    other,
                    Effect::default().name()
                );
                Effect::default()
            }
        }
    }

    /// The full zoompan-based filter chain for one still image.
    pub fn filter_chain(&self, frames: u64, fps: u32) -> String {
        format!(
            "[0:v]scale={res},zoompan=z='{z}':x='{x}':y='{y}':d={d}:s={res}:fps={fps},scale={out}[v]",
            res = SUPERSAMPLE_RES,
            z = self.zoom(),
            x = self.x(),
            y = self.y(),
            d = frames,
            fps = fps,
            out = OUTPUT_RES,
        )
    }
}

impl std::fmt::Display for Effect {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.name())
    }
}

/// Number of frames a clip of `duration` seconds holds at `fps`.
pub fn frame_count(duration: f64, fps: u32) -> u64 {
    ((duration * f64::from(fps)).round() as u64).max(1)
}

/// Render a silent clip of exactly `duration` seconds from one still image.
pub fn render_segment(
    image: &Path,
    duration: f64,
    effect: Effect,
    output: &Path,
    fps: u32,
) -> Result<()> {
    if duration <= 0.0 {
        return Err(NewsreelError::Render(format!(
            "segment duration must be positive, got {duration}"
        )));
    }

    let frames = frame_count(duration, fps);
    let filter = effect.filter_chain(frames, fps);
    let duration_arg = format!("{duration:.3}");

    debug!(
        "Rendering {} for {:.2}s with {} ({})",
        image.display(),
        duration,
        effect,
        effect.description()
    );

    media::run_ffmpeg([
        "-loop".as_ref(),
        "1".as_ref(),
        "-i".as_ref(),
        image.as_os_str(),
        "-filter_complex".as_ref(),
        filter.as_ref(),
        "-map".as_ref(),
        "[v]".as_ref(),
        "-c:v".as_ref(),
        "libx264".as_ref(),
        "-preset".as_ref(),
        "medium".as_ref(),
        "-t".as_ref(),
        duration_arg.as_ref(),
        "-pix_fmt".as_ref(),
        "yuv420p".as_ref(),
        "-an".as_ref(),
        output.as_os_str(),
    ])
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_rotation_has_four_effects() {
        assert_eq!(Effect::ROTATION.len(), 4);
        assert_eq!(Effect::ROTATION[0], Effect::ZoomIn);
        assert_eq!(Effect::ROTATION[1], Effect::PanRight);
        assert_eq!(Effect::ROTATION[2], Effect::ZoomOut);
        assert_eq!(Effect::ROTATION[3], Effect::KenBurns);
    }

    #[test]
    fn test_from_name_known_effects() {
        assert_eq!(Effect::from_name("zoom-in"), Effect::ZoomIn);
        assert_eq!(Effect::from_name("ZOOM-OUT"), Effect::ZoomOut);
        assert_eq!(Effect::from_name("ken_burns"), Effect::KenBurns);
        assert_eq!(Effect::from_name("pan-left"), Effect::PanLeft);
    }

    #[test]
    fn test_from_name_unknown_falls_back_to_default() {
        assert_eq!(Effect::from_name("spiral"), Effect::default());
        assert_eq!(Effect::from_name(""), Effect::default());
    }

    #[test]
    fn test_filter_chain_has_two_stage_scale() {
        let filter = Effect::ZoomIn.filter_chain(250, 25);
        let zoompan_pos = filter.find("zoompan").unwrap();
        let up = filter.find(&format!("scale={SUPERSAMPLE_RES}")).unwrap();
        let down = filter.find(&format!("scale={OUTPUT_RES}")).unwrap();
        assert!(up < zoompan_pos);
        assert!(zoompan_pos < down);
        assert!(filter.contains("d=250"));
        assert!(filter.contains("fps=25"));
    }

    #[test]
    fn test_frame_count() {
        assert_eq!(frame_count(10.0, 25), 250);
        assert_eq!(frame_count(0.5, 25), 13);
        // Never zero frames, even for tiny durations
        assert_eq!(frame_count(0.001, 25), 1);
    }

    #[test]
    fn test_render_rejects_non_positive_duration() {
        let result = render_segment(
            Path::new("/tmp/img.png"),
            0.0,
            Effect::ZoomIn,
            Path::new("/tmp/out.mp4"),
            25,
        );
        assert!(matches!(result, Err(NewsreelError::Render(_))));
    }
}
