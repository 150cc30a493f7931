use chrono::NaiveDate;

use imgsearch_core::types::parse_date;
use imgsearch_core::ImageInput;

/// Comma-separated floats, e.g. `0.1,0.2,0.3`.
pub fn vector(s: &str) -> Result<Vec<f32>, String> {
    s.split(',')
        .map(|x| x.trim().parse::<f32>().map_err(|e| format!("'{x}' is not a number: {e}")))
        .collect()
}

pub fn day(s: &str) -> Result<NaiveDate, String> {
    parse_date(s).ok_or_else(|| format!("'{s}' is not a date (expected YYYY-MM-DD or RFC 3339)"))
}

/// `http(s)://` arguments are fetched by the embedder; anything else is read from disk.
pub fn image_input(arg: &str) -> anyhow::Result<ImageInput> {
    if arg.starts_with("http://") || arg.starts_with("https://") {
        return Ok(ImageInput::Url(arg.to_string()));
    }
    let bytes = std::fs::read(arg).map_err(|e| anyhow::anyhow!("Failed to read image {arg}: {e}"))?;
    Ok(ImageInput::Bytes(bytes))
}
