use std::fmt;

#[derive(Debug)]
pub enum GutterError {
    MissingContent(String),
    InvalidGeometry(String),
    InvalidConfiguration(String),
    Render { page: usize, message: String },
    Html(String),
    Font(String),
    Json(serde_json::Error),
    Io(std::io::Error),
}

impl fmt::Display for GutterError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            GutterError::MissingContent(message) => {
                write!(f, "no source content to paginate: {}", message)
            }
            GutterError::InvalidGeometry(message) => {
                write!(f, "invalid page geometry: {}", message)
            }
            GutterError::InvalidConfiguration(message) => {
                write!(f, "invalid configuration: {}", message)
            }
            GutterError::Render { page, message } => {
                write!(f, "rendering page {} failed: {}", page, message)
            }
            GutterError::Html(message) => write!(f, "html import error: {}", message),
            GutterError::Font(message) => write!(f, "font error: {}", message),
            GutterError::Json(err) => write!(f, "json error: {}", err),
            GutterError::Io(err) => write!(f, "io error: {}", err),
        }
    }
}

impl std::error::Error for GutterError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            GutterError::Io(err) => Some(err),
            GutterError::Json(err) => Some(err),
            _ => None,
        }
    }
}

impl From<std::io::Error> for GutterError {
    fn from(value: std::io::Error) -> Self {
        GutterError::Io(value)
    }
}

impl From<serde_json::Error> for GutterError {
    fn from(value: serde_json::Error) -> Self {
        GutterError::Json(value)
    }
}
