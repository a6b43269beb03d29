#[cfg(feature = "tf-engine")]
use tensorflow::Status;
use image::ImageError;
use serde_json::Error as JsonError;
use reqwest::Error as HttpError;

use std::error::Error;
use std::fmt;
use std::io::Error as IOError;

#[derive(Debug)]
pub struct LprError(LprErrorKind);

#[derive(Debug)]
pub enum LprErrorKind {
    IOError(IOError),
    ImageError(ImageError),
    JsonError(JsonError),
    HttpError(HttpError),
    #[cfg(feature = "tf-engine")]
    TensorflowError(Status),
    /// font bytes could not be parsed
    FontError(String),
    ConfigError(String),
    EngineError(String),
}

impl LprError {
    pub fn kind(&self) -> &LprErrorKind {
        &self.0
    }

    pub fn config(msg: impl Into<String>) -> Self {
        Self(LprErrorKind::ConfigError(msg.into()))
    }

    pub fn engine(msg: impl Into<String>) -> Self {
        Self(LprErrorKind::EngineError(msg.into()))
    }

    pub fn font(msg: impl Into<String>) -> Self {
        Self(LprErrorKind::FontError(msg.into()))
    }
}

impl<T> From<T> for LprError
where T:  Into<LprErrorKind>
{
    fn from(e: T) -> Self {
        Self(e.into())
    }
}

impl fmt::Display for LprError {

    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.kind() {
            LprErrorKind::IOError(e) => write!(f, "{}", e),
            LprErrorKind::ImageError(e) => write!(f, "{}", e),
            LprErrorKind::JsonError(e) => write!(f, "{}", e),
            LprErrorKind::HttpError(e) => write!(f, "{}", e),
            #[cfg(feature = "tf-engine")]
            LprErrorKind::TensorflowError(e) => write!(f, "{}", e),
            LprErrorKind::FontError(msg) => write!(f, "font error: {}", msg),
            LprErrorKind::ConfigError(msg) => write!(f, "config error: {}", msg),
            LprErrorKind::EngineError(msg) => write!(f, "engine error: {}", msg),
        }
    }
}

impl Error for LprError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self.kind() {
            LprErrorKind::IOError(e) => Some(e),
            LprErrorKind::ImageError(e) => Some(e),
            LprErrorKind::JsonError(e) => Some(e),
            LprErrorKind::HttpError(e) => Some(e),
            #[cfg(feature = "tf-engine")]
            LprErrorKind::TensorflowError(e) => Some(e),
            _ => None,
        }
    }
}

impl From<IOError> for LprErrorKind {
    fn from(e: IOError) -> Self {
        Self::IOError(e)
    }
}

impl From<ImageError> for LprErrorKind {
    fn from(e: ImageError) -> Self {
        Self::ImageError(e)
    }
}

impl From<JsonError> for LprErrorKind {
    fn from(e: JsonError) -> Self {
        Self::JsonError(e)
    }
}

impl From<HttpError> for LprErrorKind {
    fn from(e: HttpError) -> Self {
        Self::HttpError(e)
    }
}

#[cfg(feature = "tf-engine")]
impl From<Status> for LprErrorKind {
    fn from(e: Status) -> Self {
        Self::TensorflowError(e)
    }
}
