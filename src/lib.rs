//! # thumbcache
//!
//! On-demand thumbnail generation with a content-keyed disk cache.
//!
//! Give it a source image (a local path or an `http(s)` URL) and the size you
//! want; it returns the path of a thumbnail on disk, or a URL for it under a
//! configured base. The first request renders and writes the file. Every
//! identical request afterwards is a cache hit that never decodes a pixel.
//!
//! ```no_run
//! use thumbcache::config::ThumbConfig;
//! use thumbcache::request::ThumbnailRequest;
//! use thumbcache::Thumbnailer;
//!
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let thumbnailer = Thumbnailer::new(ThumbConfig::default())?;
//! let request = ThumbnailRequest::builder("photos/dawn.jpg")
//!     .resize(200, 100)
//!     .crop()
//!     .base_url("https://cdn.example.com/thumbs")
//!     .build();
//!
//! match thumbnailer.generate(&request)? {
//!     Some(url) => println!("<img src=\"{url}\">"),
//!     None => println!("<!-- no thumbnail -->"),
//! }
//! # Ok(())
//! # }
//! ```
//!
//! # Pipeline
//!
//! ```text
//! request → source (local / downloaded / default) → geometry → cache key
//!         → hit?  yes: return reference
//!                 no:  decode → resample → [sharpen] → encode → write
//! ```
//!
//! # Module Map
//!
//! | Module | Role |
//! |--------|------|
//! | [`request`] | `ThumbnailRequest`, its fluent builder, and the flat `RequestSpec` used by batch files |
//! | [`thumbnail`] | The `thumb` operation: orchestrates everything below, classifies failures |
//! | [`imaging`] | Geometry math, codecs on the `image` crate, two-stage resampling, unsharp mask |
//! | [`cache`] | Cache keys, output naming, public references, atomic writes, per-path locks |
//! | [`remote`] | Local copies of remote sources with lifetime and `Last-Modified` revalidation |
//! | [`config`] | `thumbcache.toml` loading, merging onto stock defaults, validation |
//! | [`batch`] | Parallel execution of many requests with an ordered report |
//! | [`output`] | CLI output formatting |
//!
//! # Design Decisions
//!
//! ## Absence Is Not an Error
//!
//! A missing, unreadable or oversized source is an everyday condition for a
//! thumbnail service, so [`Thumbnailer::thumb`] returns `Ok(None)` for it. Only
//! failures that point at the environment (an uncreatable cache directory, a
//! codec or disk refusing the output) are `Err`.
//!
//! ## The File Name Is the Cache
//!
//! There is no manifest. A thumbnail's name is a hash of the source path, the
//! source modification time and every request parameter, so a lookup is one
//! `stat`, touching the source invalidates everything made from it, and the
//! cache directory can be wiped at any time.
//!
//! ## Pure-Rust Imaging
//!
//! Decoding, resizing and encoding go through the `image` crate. There are no
//! system libraries to install; the binary is self-contained.

pub mod batch;
pub mod cache;
pub mod config;
pub mod imaging;
pub mod output;
pub mod remote;
pub mod request;
pub mod thumbnail;

pub use request::{ThumbnailRequest, ThumbnailRequestBuilder};
pub use thumbnail::{CacheStatus, ThumbError, Thumbnail, Thumbnailer};
