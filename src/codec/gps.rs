// gps.rs - the `GPS:<name>:<x>:<y>[:<z>]:` marker format
use super::{DECIMALS, GPS_TAG, SEPARATOR};
use thiserror::Error;

#[derive(Error, Debug, PartialEq)]
pub enum ParseError {
    #[error("Marker does not start with GPS: {0}")]
    MissingTag(String),

    #[error("Coordinates must be wrapped in ':' separators: {0}")]
    Unterminated(String),

    #[error("Invalid coordinate {field:?}")]
    InvalidNumber { field: String },

    #[error("Coordinate {field:?} is not finite")]
    NonFinite { field: String },

    #[error("Expected 2 or 3 coordinates, found {0}")]
    Dimensions(usize),
}

/// A decoded marker line
#[derive(Debug, Clone, PartialEq)]
pub struct GpsMarker {
    pub name: String,
    pub coords: Vec<f64>,
}

/// Render a coordinate vector as `:<d0>:<d1>:...:` with fixed decimals
pub fn render(coords: &[f64]) -> String {
    let mut out = String::with_capacity(1 + coords.len() * (DECIMALS + 8));
    out.push(SEPARATOR);
    for value in coords {
        out.push_str(&format!("{:.*}", DECIMALS, value));
        out.push(SEPARATOR);
    }
    out
}

/// Persisted label of one output centroid: `GPS:R_<id>_Cluster_<index><rendered>`
pub fn label(result_id: i64, index: usize, rendered: &str) -> String {
    format!("{}R_{}_Cluster_{}{}", GPS_TAG, result_id, index, rendered)
}

/// Decode the output of [`render`]
pub fn parse_rendered(text: &str) -> Result<Vec<f64>, ParseError> {
    let inner = text
        .strip_prefix(SEPARATOR)
        .and_then(|rest| rest.strip_suffix(SEPARATOR))
        .ok_or_else(|| ParseError::Unterminated(text.to_string()))?;

    let coords = inner
        .split(SEPARATOR)
        .map(|field| {
            let field = field.trim();
            let value: f64 = field.parse().map_err(|_| ParseError::InvalidNumber {
                field: field.to_string(),
            })?;
            if !value.is_finite() {
                return Err(ParseError::NonFinite {
                    field: field.to_string(),
                });
            }
            Ok(value)
        })
        .collect::<Result<Vec<_>, _>>()?;

    if !(2..=3).contains(&coords.len()) {
        return Err(ParseError::Dimensions(coords.len()));
    }
    Ok(coords)
}

/// Decode a full marker line
pub fn parse_gps(text: &str) -> Result<GpsMarker, ParseError> {
    let text = text.trim();
    let body = text
        .strip_prefix(GPS_TAG)
        .ok_or_else(|| ParseError::MissingTag(text.to_string()))?;
    let split = body
        .find(SEPARATOR)
        .ok_or_else(|| ParseError::Unterminated(text.to_string()))?;
    let (name, rendered) = body.split_at(split);

    Ok(GpsMarker {
        name: name.to_string(),
        coords: parse_rendered(rendered)?,
    })
}
