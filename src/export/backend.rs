use std::path::PathBuf;

use crate::error::Result;
use crate::export::job::{ExportContext, ExportRequest};

/// Something that can turn an [`ExportRequest`] into an output file.
///
/// `render` blocks; the controller runs it on the blocking pool. It should
/// call [`ExportContext::report_progress`] as work advances and return
/// `Err(SubburnError::Cancelled)` soon after cancellation is requested.
///
/// [`ExportContext::report_progress`]: crate::export::job::ExportContext::report_progress
pub trait ExportBackend: Send + Sync {
    fn render(&self, request: &ExportRequest, ctx: &ExportContext) -> Result<PathBuf>;

    /// Short name for logs.
    fn name(&self) -> &str;
}
