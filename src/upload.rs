use std::future::Future;
use std::pin::Pin;

use base64::Engine as _;
use base64::engine::general_purpose::STANDARD;

use crate::controller::FormResult;

/// One selected file as handed over by the hosting layer.
#[derive(Clone, Debug)]
pub struct FileSource {
    pub name: String,
    pub media_type: String,
    pub bytes: Vec<u8>,
}

impl FileSource {
    pub fn new(name: impl Into<String>, media_type: impl Into<String>, bytes: Vec<u8>) -> Self {
        Self {
            name: name.into(),
            media_type: media_type.into(),
            bytes,
        }
    }
}

pub type BoxedDataUrlFuture = Pin<Box<dyn Future<Output = FormResult<String>> + Send + 'static>>;

/// Injected file-to-data-URL capability. Each file is dispatched as an
/// independent decode; the controller merges completions against the latest
/// stored value.
pub trait DataUrlReader: Send + Sync {
    fn read_data_url(&self, file: FileSource) -> BoxedDataUrlFuture;
}

/// Default reader rendering `data:<media-type>;base64,<payload>`.
#[derive(Clone, Copy, Debug, Default)]
pub struct Base64DataUrlReader;

impl DataUrlReader for Base64DataUrlReader {
    fn read_data_url(&self, file: FileSource) -> BoxedDataUrlFuture {
        Box::pin(async move {
            let payload = STANDARD.encode(&file.bytes);
            Ok(format!("data:{};base64,{payload}", file.media_type))
        })
    }
}
