use bytes::Bytes;

/// Image formats the upload endpoints accept.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ImageFormat {
    Jpeg,
    Png,
    Webp,
    Heic,
}

impl ImageFormat {
    pub fn mime_type(self) -> &'static str {
        match self {
            ImageFormat::Jpeg => "image/jpeg",
            ImageFormat::Png => "image/png",
            ImageFormat::Webp => "image/webp",
            ImageFormat::Heic => "image/heic",
        }
    }

    pub fn extension(self) -> &'static str {
        match self {
            ImageFormat::Jpeg => "jpg",
            ImageFormat::Png => "png",
            ImageFormat::Webp => "webp",
            ImageFormat::Heic => "heic",
        }
    }

    /// Guess the format from a file extension (case-insensitive).
    pub fn from_extension(extension: &str) -> Option<Self> {
        match extension.to_ascii_lowercase().as_str() {
            "jpg" | "jpeg" => Some(ImageFormat::Jpeg),
            "png" => Some(ImageFormat::Png),
            "webp" => Some(ImageFormat::Webp),
            "heic" => Some(ImageFormat::Heic),
            _ => None,
        }
    }
}

/// Already-compressed image bytes ready to be sent as one multipart part.
#[derive(Clone, PartialEq, Eq)]
pub struct ImageUpload {
    pub bytes: Bytes,
    pub format: ImageFormat,
    pub file_name: String,
}

impl ImageUpload {
    pub fn new(bytes: impl Into<Bytes>, format: ImageFormat) -> Self {
        Self {
            bytes: bytes.into(),
            format,
            file_name: format!("image.{}", format.extension()),
        }
    }
}

impl std::fmt::Debug for ImageUpload {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ImageUpload")
            .field("len", &self.bytes.len())
            .field("format", &self.format)
            .field("file_name", &self.file_name)
            .finish()
    }
}

/// Every field kind a multipart request body can carry.
#[derive(Debug, Clone, PartialEq)]
pub enum FormValue {
    Text(String),
    Integer(i64),
    Boolean(bool),
    Image(ImageUpload),
    List(Vec<String>),
}

#[derive(Debug, Clone, PartialEq)]
pub struct FormField {
    pub name: &'static str,
    pub value: FormValue,
}

impl FormField {
    pub fn text(name: &'static str, value: impl Into<String>) -> Self {
        Self {
            name,
            value: FormValue::Text(value.into()),
        }
    }

    pub fn integer(name: &'static str, value: i64) -> Self {
        Self {
            name,
            value: FormValue::Integer(value),
        }
    }

    pub fn boolean(name: &'static str, value: bool) -> Self {
        Self {
            name,
            value: FormValue::Boolean(value),
        }
    }

    pub fn image(name: &'static str, image: ImageUpload) -> Self {
        Self {
            name,
            value: FormValue::Image(image),
        }
    }

    pub fn list(name: &'static str, values: Vec<String>) -> Self {
        Self {
            name,
            value: FormValue::List(values),
        }
    }
}

/// A typed write payload that knows how to lay itself out as form fields.
pub trait FormPayload: Send + Sync {
    fn form_fields(&self) -> Vec<FormField>;
}
