//! Method channel: the asynchronous boundary in front of [`Gallery`].
//!
//! Host applications talk to the bridge with JSON messages:
//!
//! ```text
//! → {"id": 7, "method": "listMedia", "arguments": {"albumId": "__ALL__", "mediumType": "image", "take": 20}}
//! ← {"id": 7, "result": {"start": 0, "total": 153, "items": [...]}}
//! ← {"id": 8, "error": {"code": "notImplemented", "message": "..."}}
//! ```
//!
//! | Method | Result |
//! |---|---|
//! | `listAlbums` | array of albums |
//! | `listMedia` | `{start, total, items}` |
//! | `getMedium` | medium or `null` |
//! | `getThumbnail` | base64 JPEG, `null` for an unknown id, `unsupportedMedium` error for video/audio |
//! | `getAlbumThumbnail` | base64 JPEG of the newest image (or `null`) |
//! | `getFile` | absolute path or `null` |
//! | `clear` | `null` |
//!
//! Every call runs on tokio's blocking pool, so slow disks and large decodes
//! never stall the transport. [`serve`] answers a JSON-lines stream with
//! calls in flight concurrently; responses carry the request `id` and may
//! arrive out of order.

use crate::cache::ExportError;
use crate::gallery::{Gallery, GalleryError};
use crate::imaging::ImageBackend;
use crate::index::MediaIndex;
use crate::types::{Album, ContentMode, MediaPage, MediaRecord, MediumType};
use base64::Engine;
use base64::engine::general_purpose::STANDARD as BASE64;
use serde::Deserialize;
use serde::de::DeserializeOwned;
use serde_json::{Value, json};
use std::path::PathBuf;
use std::sync::Arc;
use thiserror::Error;
use tokio::io::{AsyncBufRead, AsyncBufReadExt, AsyncWrite, AsyncWriteExt};
use tokio::sync::mpsc;

#[derive(Error, Debug)]
pub enum ChannelError {
    #[error("Malformed message: {0}")]
    Malformed(serde_json::Error),
    #[error("Method not implemented: {0}")]
    NotImplemented(String),
    #[error("Invalid arguments for {method}: {error}")]
    InvalidArguments {
        method: String,
        error: serde_json::Error,
    },
    #[error(transparent)]
    Gallery(#[from] GalleryError),
    #[error("Failed to encode result: {0}")]
    Serialize(serde_json::Error),
    #[error("Call aborted: {0}")]
    Join(#[from] tokio::task::JoinError),
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl ChannelError {
    /// Stable error code sent to the caller.
    pub fn code(&self) -> &'static str {
        match self {
            ChannelError::Malformed(_) => "malformedMessage",
            ChannelError::NotImplemented(_) => "notImplemented",
            ChannelError::InvalidArguments { .. } => "invalidArguments",
            ChannelError::Gallery(GalleryError::Index(_)) => "indexError",
            ChannelError::Gallery(GalleryError::Backend(_)) => "decodeError",
            ChannelError::Gallery(GalleryError::ThumbnailUnsupported { .. }) => {
                "unsupportedMedium"
            }
            ChannelError::Gallery(GalleryError::Export(e)) => match e {
                ExportError::Io(_) => "ioError",
                ExportError::Decode(_) => "decodeError",
                ExportError::Encode(_) => "encodeError",
                ExportError::Precondition(_) => "preconditionViolation",
            },
            ChannelError::Serialize(_) | ChannelError::Join(_) | ChannelError::Io(_) => {
                "internalError"
            }
        }
    }
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ListAlbumsArgs {
    medium_type: MediumType,
    medium_subtype: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ListMediaArgs {
    album_id: String,
    medium_type: MediumType,
    medium_subtype: Option<String>,
    skip: Option<usize>,
    take: Option<usize>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct MediumArgs {
    medium_id: String,
    medium_type: Option<MediumType>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ThumbnailArgs {
    medium_id: String,
    medium_type: Option<MediumType>,
    width: Option<u32>,
    height: Option<u32>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct AlbumThumbnailArgs {
    album_id: String,
    medium_type: Option<MediumType>,
    medium_subtype: Option<String>,
    width: Option<u32>,
    height: Option<u32>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct FileArgs {
    medium_id: String,
    medium_type: Option<MediumType>,
    width: Option<u32>,
    height: Option<u32>,
    content_mode: Option<String>,
}

/// A decoded request.
#[derive(Debug, Clone, PartialEq)]
pub enum MethodCall {
    ListAlbums {
        medium_type: MediumType,
        medium_subtype: Option<String>,
    },
    ListMedia {
        album_id: String,
        medium_type: MediumType,
        medium_subtype: Option<String>,
        skip: Option<usize>,
        take: Option<usize>,
    },
    GetMedium {
        medium_id: String,
        medium_type: Option<MediumType>,
    },
    GetThumbnail {
        medium_id: String,
        medium_type: Option<MediumType>,
        width: Option<u32>,
        height: Option<u32>,
    },
    GetAlbumThumbnail {
        album_id: String,
        medium_type: Option<MediumType>,
        medium_subtype: Option<String>,
        width: Option<u32>,
        height: Option<u32>,
    },
    GetFile {
        medium_id: String,
        medium_type: Option<MediumType>,
        width: Option<u32>,
        height: Option<u32>,
        content_mode: Option<ContentMode>,
    },
    Clear,
}

fn args<T: DeserializeOwned>(method: &str, arguments: Value) -> Result<T, ChannelError> {
    serde_json::from_value(arguments).map_err(|error| ChannelError::InvalidArguments {
        method: method.to_string(),
        error,
    })
}

impl MethodCall {
    /// Decode a method name and its argument map.
    pub fn parse(method: &str, arguments: Value) -> Result<Self, ChannelError> {
        let call = match method {
            "listAlbums" => {
                let a: ListAlbumsArgs = args(method, arguments)?;
                MethodCall::ListAlbums {
                    medium_type: a.medium_type,
                    medium_subtype: a.medium_subtype,
                }
            }
            "listMedia" => {
                let a: ListMediaArgs = args(method, arguments)?;
                MethodCall::ListMedia {
                    album_id: a.album_id,
                    medium_type: a.medium_type,
                    medium_subtype: a.medium_subtype,
                    skip: a.skip,
                    take: a.take,
                }
            }
            "getMedium" => {
                let a: MediumArgs = args(method, arguments)?;
                MethodCall::GetMedium {
                    medium_id: a.medium_id,
                    medium_type: a.medium_type,
                }
            }
            "getThumbnail" => {
                let a: ThumbnailArgs = args(method, arguments)?;
                MethodCall::GetThumbnail {
                    medium_id: a.medium_id,
                    medium_type: a.medium_type,
                    width: a.width,
                    height: a.height,
                }
            }
            "getAlbumThumbnail" => {
                let a: AlbumThumbnailArgs = args(method, arguments)?;
                MethodCall::GetAlbumThumbnail {
                    album_id: a.album_id,
                    medium_type: a.medium_type,
                    medium_subtype: a.medium_subtype,
                    width: a.width,
                    height: a.height,
                }
            }
            "getFile" => {
                let a: FileArgs = args(method, arguments)?;
                MethodCall::GetFile {
                    medium_id: a.medium_id,
                    medium_type: a.medium_type,
                    width: a.width,
                    height: a.height,
                    content_mode: a.content_mode.as_deref().and_then(ContentMode::parse),
                }
            }
            "clear" => MethodCall::Clear,
            other => return Err(ChannelError::NotImplemented(other.to_string())),
        };
        Ok(call)
    }

    /// Run the call against a gallery, blocking.
    pub fn invoke<I: MediaIndex, B: ImageBackend>(
        self,
        gallery: &Gallery<I, B>,
    ) -> Result<Reply, GalleryError> {
        Ok(match self {
            MethodCall::ListAlbums {
                medium_type,
                medium_subtype,
            } => Reply::Albums(gallery.list_albums(medium_type, medium_subtype.as_deref())?),
            MethodCall::ListMedia {
                album_id,
                medium_type,
                medium_subtype,
                skip,
                take,
            } => Reply::Page(gallery.list_media(
                &album_id,
                medium_type,
                medium_subtype.as_deref(),
                skip,
                take,
            )?),
            MethodCall::GetMedium {
                medium_id,
                medium_type,
            } => Reply::Medium(gallery.get_medium(&medium_id, medium_type)?),
            MethodCall::GetThumbnail {
                medium_id,
                medium_type,
                width,
                height,
            } => Reply::Bytes(gallery.get_thumbnail(&medium_id, medium_type, width, height)?),
            MethodCall::GetAlbumThumbnail {
                album_id,
                medium_type,
                medium_subtype,
                width,
                height,
            } => Reply::Bytes(gallery.get_album_thumbnail(
                &album_id,
                medium_type,
                medium_subtype.as_deref(),
                width,
                height,
            )?),
            MethodCall::GetFile {
                medium_id,
                medium_type,
                width,
                height,
                content_mode,
            } => Reply::File(gallery.get_file(&medium_id, medium_type, width, height, content_mode)?),
            MethodCall::Clear => {
                gallery.clear()?;
                Reply::Cleared
            }
        })
    }
}

/// A call's successful answer.
#[derive(Debug, Clone, PartialEq)]
pub enum Reply {
    Albums(Vec<Album>),
    Page(MediaPage),
    Medium(Option<MediaRecord>),
    Bytes(Option<Vec<u8>>),
    File(Option<PathBuf>),
    Cleared,
}

impl Reply {
    /// JSON form of the reply. Bytes travel base64-encoded.
    pub fn to_json(&self) -> Result<Value, ChannelError> {
        let value = match self {
            Reply::Albums(albums) => serde_json::to_value(albums),
            Reply::Page(page) => serde_json::to_value(page),
            Reply::Medium(medium) => serde_json::to_value(medium),
            Reply::Bytes(bytes) => Ok(bytes
                .as_ref()
                .map_or(Value::Null, |b| Value::String(BASE64.encode(b)))),
            Reply::File(path) => Ok(path
                .as_ref()
                .map_or(Value::Null, |p| Value::String(p.display().to_string()))),
            Reply::Cleared => Ok(Value::Null),
        };
        value.map_err(ChannelError::Serialize)
    }
}

#[derive(Debug, Deserialize)]
struct Envelope {
    #[serde(default)]
    id: Value,
    method: String,
    #[serde(default)]
    arguments: Value,
}

fn error_response(id: Value, err: &ChannelError) -> Value {
    json!({
        "id": id,
        "error": { "code": err.code(), "message": err.to_string() },
    })
}

/// Routes calls from the transport onto a shared gallery.
pub struct Dispatcher<I, B> {
    gallery: Arc<Gallery<I, B>>,
}

impl<I, B> Dispatcher<I, B>
where
    I: MediaIndex + 'static,
    B: ImageBackend + Send + 'static,
{
    pub fn new(gallery: Gallery<I, B>) -> Self {
        Self {
            gallery: Arc::new(gallery),
        }
    }

    pub fn gallery(&self) -> &Gallery<I, B> {
        &self.gallery
    }

    /// Run one call on the blocking pool.
    pub async fn call(&self, call: MethodCall) -> Result<Reply, ChannelError> {
        let gallery = Arc::clone(&self.gallery);
        let reply = tokio::task::spawn_blocking(move || call.invoke(gallery.as_ref())).await??;
        Ok(reply)
    }

    /// Answer one JSON request with a JSON response envelope.
    pub async fn handle_message(&self, message: &str) -> Value {
        let envelope: Envelope = match serde_json::from_str(message) {
            Ok(envelope) => envelope,
            Err(e) => {
                let err = ChannelError::Malformed(e);
                log::warn!("{err}");
                return error_response(Value::Null, &err);
            }
        };

        log::debug!("call {} {}", envelope.method, envelope.arguments);
        let outcome = match MethodCall::parse(&envelope.method, envelope.arguments) {
            Ok(call) => match self.call(call).await {
                Ok(reply) => reply.to_json(),
                Err(e) => Err(e),
            },
            Err(e) => Err(e),
        };

        match outcome {
            Ok(result) => json!({ "id": envelope.id, "result": result }),
            Err(err) => {
                log::warn!("{} failed: {}", envelope.method, err);
                error_response(envelope.id, &err)
            }
        }
    }
}

/// Answer newline-delimited JSON requests from `reader` on `writer` until
/// the reader is exhausted.
pub async fn serve<I, B, R, W>(
    dispatcher: Arc<Dispatcher<I, B>>,
    reader: R,
    writer: W,
) -> Result<(), ChannelError>
where
    I: MediaIndex + 'static,
    B: ImageBackend + Send + 'static,
    R: AsyncBufRead + Unpin,
    W: AsyncWrite + Unpin + Send + 'static,
{
    let (tx, mut rx) = mpsc::channel::<String>(64);
    let writer_task = tokio::spawn(async move {
        let mut writer = writer;
        while let Some(line) = rx.recv().await {
            writer.write_all(line.as_bytes()).await?;
            writer.write_all(b"\n").await?;
            writer.flush().await?;
        }
        Ok::<_, std::io::Error>(())
    });

    let mut lines = reader.lines();
    while let Some(line) = lines.next_line().await? {
        if line.trim().is_empty() {
            continue;
        }
        let dispatcher = Arc::clone(&dispatcher);
        let tx = tx.clone();
        tokio::spawn(async move {
            let response = dispatcher.handle_message(&line).await;
            if tx.send(response.to_string()).await.is_err() {
                log::warn!("response dropped: writer closed");
            }
        });
    }
    drop(tx);

    writer_task.await??;
    Ok(())
}
