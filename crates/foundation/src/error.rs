/// Rejected request input. Raised before any data is fetched.
#[derive(Debug, Copy, Clone, PartialEq)]
pub enum InputError {
    InvalidLatitude(f64),
    InvalidLongitude(f64),
    InvalidArea(f64),
}

impl std::fmt::Display for InputError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            InputError::InvalidLatitude(v) => {
                write!(f, "latitude must be a finite value in [-90, 90], got {v}")
            }
            InputError::InvalidLongitude(v) => {
                write!(f, "longitude must be a finite value in [-180, 180], got {v}")
            }
            InputError::InvalidArea(v) => {
                write!(f, "capture area must be a finite value > 0 km², got {v}")
            }
        }
    }
}

impl std::error::Error for InputError {}
