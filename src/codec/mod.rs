mod gps;
mod pager;


pub use gps::{GpsMarker, ParseError, label, parse_gps, parse_rendered, render};
pub use pager::{Pager, paginate};

/// Field separator of the GPS marker format
pub const SEPARATOR: char = ':';

/// Type tag every marker line starts with
pub const GPS_TAG: &str = "GPS:";

/// Fixed-point digits written per coordinate
pub const DECIMALS: usize = 10;
