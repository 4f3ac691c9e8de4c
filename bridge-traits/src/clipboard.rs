//! Clipboard Abstraction
//!
//! Copying a retrieved secret to the system clipboard is performed by the
//! host; the core only hands over the text.

use async_trait::async_trait;

use crate::error::Result;

/// System clipboard access
///
/// # Security
///
/// Implementations should not persist clipboard contents anywhere else and
/// must never log the copied text.
#[async_trait]
pub trait Clipboard: Send + Sync {
    /// Replace the clipboard contents with `text`
    async fn write_text(&self, text: &str) -> Result<()>;
}
