//! Default values for configuration

use crate::frames::Region;

/// Default playlist cache directory
pub fn default_cache_dir() -> std::path::PathBuf {
    std::env::temp_dir().join("vodframes")
}

/// Default user agent
pub fn default_user_agent() -> String {
    format!("vodframes/{}", env!("CARGO_PKG_VERSION"))
}

/// Default request timeout in seconds
pub fn default_timeout() -> u64 {
    60
}

/// HTTP statuses that mean "no media for this fragment" rather than a failure
pub fn default_absent_statuses() -> Vec<u16> {
    vec![403, 404]
}

/// Default playable-URL resolver binary
pub fn default_resolver_program() -> String {
    "youtube-dl".to_string()
}

/// Default resolver arguments (the broadcast address is appended)
pub fn default_resolver_args() -> Vec<String> {
    vec!["--get-url".to_string()]
}

/// Default broadcast address handed to the resolver
pub fn default_address_template() -> String {
    "https://www.twitch.tv/videos/{id}".to_string()
}

/// Default shareable web URL (`{offset}` is rendered as `1h2m3s`)
pub fn default_web_url_template() -> String {
    "https://www.twitch.tv/videos/{id}?t={offset}".to_string()
}

/// Default frame decoder binary
pub fn default_decoder_program() -> String {
    "ffmpeg".to_string()
}

/// Default OCR binary
pub fn default_ocr_program() -> String {
    "tesseract".to_string()
}

/// Default tesseract data directory
pub fn default_ocr_data_dir() -> String {
    "tppocr/tessdata/".to_string()
}

/// Default tesseract language (trained on the stream overlay font)
pub fn default_ocr_language() -> String {
    "pkmngba_en".to_string()
}

/// Default digits-only recognition profile
pub fn default_ocr_digits_config() -> String {
    "/usr/share/tesseract-ocr/tessdata/configs/digits".to_string()
}

/// Seconds between the logged input time and the on-stream capture
pub fn default_countdown_offset() -> i64 {
    4
}

/// Drift beyond this is treated as an OCR misread
pub fn default_max_drift() -> f64 {
    120.0
}

/// Drift at or above this triggers a corrected fetch
pub fn default_correction_threshold() -> f64 {
    2.0
}

/// Clock overlay strip at the bottom left of the stream layout
pub fn default_clock_region() -> Region {
    Region::from_pixels(165, 1040, 442, 1075, 1920, 1080)
}

/// Game screen region of the earlier layout
pub fn default_output_region() -> Region {
    Region::from_pixels(1676, 916, 1916, 1076, 1920, 1080)
}

/// Game screen region after the layout change
///
/// Placeholder geometry: no capture of the later layout has been measured
/// yet. Override it in `[[layout.output_regions]]` once one has.
pub fn default_late_output_region() -> Region {
    Region::from_pixels(1556, 836, 1916, 1076, 1920, 1080)
}

/// First frame id captured with the changed layout (placeholder, like the
/// region above)
pub fn default_layout_change_frame() -> i64 {
    7000
}

/// Default event log table
pub fn default_input_table() -> String {
    "pmd_inputs".to_string()
}

/// Default broadcast index table
pub fn default_broadcast_table() -> String {
    "vods".to_string()
}
