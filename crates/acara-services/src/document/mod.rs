//! Document generation from print data.

mod docx;

pub use docx::DocxTemplateRenderer;

use acara_core::AppError;
use async_trait::async_trait;
use serde_json::Value;
use uuid::Uuid;

use crate::assembler::RecordAssembler;

/// A rendered document and the name it should be downloaded under.
#[derive(Debug, Clone)]
pub struct RenderedDocument {
    pub bytes: Vec<u8>,
    pub file_name: String,
}

/// Renders a named template against a flat data object.
#[async_trait]
pub trait DocumentRenderer: Send + Sync {
    /// `template_name` of `None` selects the default template.
    async fn render(
        &self,
        template_name: Option<&str>,
        data: &Value,
    ) -> Result<RenderedDocument, AppError>;
}

/// Build the print data of `record_id` and render it.
pub async fn render_record(
    assembler: &RecordAssembler,
    renderer: &dyn DocumentRenderer,
    record_id: Uuid,
    template_name: Option<&str>,
) -> Result<RenderedDocument, AppError> {
    let print_data = assembler.build_print_data(record_id).await?;
    let data = serde_json::to_value(&print_data)?;
    renderer.render(template_name, &data).await
}
