use std::io::{Cursor, Read, Write};
use std::ops::Range;
use std::path::{Path, PathBuf};
use std::sync::LazyLock;

use acara_core::models::ImageExtension;
use acara_core::AppError;
use async_trait::async_trait;
use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use regex::{Captures, NoExpand, Regex};
use serde_json::Value;
use zip::write::{FileOptions, ZipWriter};
use zip::{CompressionMethod, ZipArchive};

use super::{DocumentRenderer, RenderedDocument};

/// `+++ command +++`
static COMMAND: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\+\+\+([^+]*)\+\+\+").expect("valid regex"));

/// Dotted data path, optionally rooted at a loop variable (`$p.nama`).
static DATA_PATH: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^\$?[A-Za-z_][A-Za-z0-9_]*(?:\.[A-Za-z0-9_]+)*$").expect("valid regex")
});

static ROW_OPEN: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"<w:tr[ >]").expect("valid regex"));
static PARAGRAPH_OPEN: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"<w:p[ >]").expect("valid regex"));

const EMU_PER_CM: f64 = 360_000.0;
const IMAGE_RELATIONSHIP: &str =
    "http://schemas.openxmlformats.org/officeDocument/2006/relationships/image";
const EMPTY_RELATIONSHIPS: &str = concat!(
    r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>"#,
    r#"<Relationships xmlns="http://schemas.openxmlformats.org/package/2006/relationships"></Relationships>"#
);
const EMPTY_CONTENT_TYPES: &str = concat!(
    r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>"#,
    r#"<Types xmlns="http://schemas.openxmlformats.org/package/2006/content-types"></Types>"#
);

/// Renders `.docx` templates kept in one directory.
///
/// Templates use `+++`-delimited commands in body, header and footer text:
///
/// - `+++key+++`, `+++INS key+++` and `+++= key+++` insert text;
/// - `+++IMAGE key+++` embeds an image object (`data`, `extension`, `width`
///   and `height` in cm);
/// - `+++FOR x IN key+++ ... +++END-FOR x+++` repeats its body once per
///   array element, with `$x.field` naming the current element. When both
///   commands sit in one paragraph the text between them repeats; otherwise
///   the enclosing table rows (or paragraphs) repeat.
///
/// Keys are dotted paths. Every other entry of the package is copied
/// unchanged. Commands split across Word runs are not recognized.
#[derive(Debug, Clone)]
pub struct DocxTemplateRenderer {
    templates_dir: PathBuf,
    default_template: String,
}

impl DocxTemplateRenderer {
    pub fn new(templates_dir: impl Into<PathBuf>, default_template: impl Into<String>) -> Self {
        Self {
            templates_dir: templates_dir.into(),
            default_template: default_template.into(),
        }
    }

    /// Only the base name of `template_name` is used.
    fn resolve_template(&self, template_name: Option<&str>) -> Result<(PathBuf, String), AppError> {
        let requested = template_name
            .map(str::trim)
            .filter(|name| !name.is_empty())
            .unwrap_or(&self.default_template);
        let base_name = Path::new(requested)
            .file_name()
            .and_then(|name| name.to_str())
            .filter(|name| *name != "." && *name != "..")
            .ok_or_else(|| AppError::TemplateNotFound(requested.to_string()))?;

        Ok((self.templates_dir.join(base_name), base_name.to_string()))
    }
}

#[async_trait]
impl DocumentRenderer for DocxTemplateRenderer {
    #[tracing::instrument(skip(self, data))]
    async fn render(
        &self,
        template_name: Option<&str>,
        data: &Value,
    ) -> Result<RenderedDocument, AppError> {
        let (path, file_name) = self.resolve_template(template_name)?;
        let template = match tokio::fs::read(&path).await {
            Ok(bytes) => bytes,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                return Err(AppError::TemplateNotFound(file_name))
            }
            Err(e) => return Err(e.into()),
        };

        let start = std::time::Instant::now();
        let data = data.clone();
        let bytes = tokio::task::spawn_blocking(move || fill_template(&template, &data))
            .await
            .map_err(|e| AppError::DocumentRender(e.to_string()))??;

        tracing::info!(
            template = %file_name,
            size_bytes = bytes.len(),
            duration_ms = start.elapsed().as_secs_f64() * 1000.0,
            "Document rendered"
        );

        Ok(RenderedDocument { bytes, file_name })
    }
}

fn render_error(e: impl std::fmt::Display) -> AppError {
    AppError::DocumentRender(e.to_string())
}

fn is_text_part(name: &str) -> bool {
    name == "word/document.xml"
        || (name.starts_with("word/header") && name.ends_with(".xml"))
        || (name.starts_with("word/footer") && name.ends_with(".xml"))
}

struct PackageEntry {
    name: String,
    options: FileOptions,
    is_dir: bool,
    content: Vec<u8>,
}

impl PackageEntry {
    fn new_file(name: String, content: Vec<u8>) -> Self {
        Self {
            name,
            options: FileOptions::default().compression_method(CompressionMethod::Deflated),
            is_dir: false,
            content,
        }
    }
}

fn fill_template(template: &[u8], data: &Value) -> Result<Vec<u8>, AppError> {
    let mut archive = ZipArchive::new(Cursor::new(template)).map_err(render_error)?;
    let mut entries = Vec::with_capacity(archive.len());
    for index in 0..archive.len() {
        let mut entry = archive.by_index(index).map_err(render_error)?;
        let mut content = Vec::with_capacity(entry.size() as usize);
        if !entry.is_dir() {
            entry.read_to_end(&mut content)?;
        }
        entries.push(PackageEntry {
            name: entry.name().to_string(),
            options: FileOptions::default().compression_method(entry.compression()),
            is_dir: entry.is_dir(),
            content,
        });
    }

    let mut media = MediaCollector::default();
    for entry in entries.iter_mut().filter(|entry| is_text_part(&entry.name)) {
        let xml = std::str::from_utf8(&entry.content).map_err(render_error)?;
        let expanded = expand_loops(xml, data)?;
        entry.content = fill_commands(&expanded, data, &entry.name, &mut media)?.into_bytes();
    }
    media.attach(&mut entries)?;

    let mut writer = ZipWriter::new(Cursor::new(Vec::new()));
    for entry in entries {
        if entry.is_dir {
            writer
                .add_directory(entry.name, entry.options)
                .map_err(render_error)?;
            continue;
        }
        writer
            .start_file(entry.name, entry.options)
            .map_err(render_error)?;
        writer.write_all(&entry.content)?;
    }

    let cursor = writer.finish().map_err(render_error)?;
    Ok(cursor.into_inner())
}

#[derive(Debug, PartialEq)]
enum Command<'a> {
    Insert(&'a str),
    Image(&'a str),
    For { var: &'a str, path: &'a str },
    EndFor(&'a str),
}

fn is_identifier(name: &str) -> bool {
    name.chars().next().is_some_and(|c| c.is_ascii_alphabetic() || c == '_')
        && name.chars().all(|c| c.is_ascii_alphanumeric() || c == '_')
}

/// `None` for text that is not a well-formed command; it is left as is.
fn parse_command(text: &str) -> Option<Command<'_>> {
    let text = text.trim();
    let (keyword, rest) = match text.split_once(char::is_whitespace) {
        Some((keyword, rest)) => (keyword, rest.trim()),
        None => (text, ""),
    };
    let command = match keyword {
        "FOR" => {
            let (var, path) = rest.split_once(" IN ")?;
            Command::For {
                var: var.trim(),
                path: path.trim(),
            }
        }
        "END-FOR" => Command::EndFor(rest),
        "IMAGE" => Command::Image(rest),
        "INS" => Command::Insert(rest),
        _ => Command::Insert(text.strip_prefix('=').map(str::trim).unwrap_or(text)),
    };

    let valid = match &command {
        Command::For { var, path } => is_identifier(var) && DATA_PATH.is_match(path),
        Command::EndFor(var) => is_identifier(var),
        Command::Image(path) | Command::Insert(path) => DATA_PATH.is_match(path),
    };
    valid.then_some(command)
}

/// Expand every FOR block, outermost first, binding loop variables to
/// absolute paths (`$p.nama` becomes `pengukuran_dihadiri.1.nama`).
fn expand_loops(xml: &str, data: &Value) -> Result<String, AppError> {
    let mut xml = xml.to_string();
    while let Some((open, var, path)) = first_loop(&xml) {
        let close = matching_end(&xml, open.end, &var)
            .ok_or_else(|| render_error(format!("FOR {} has no matching END-FOR", var)))?;
        let (block, body) = loop_block(&xml, open, close)?;

        let count = match lookup(data, &path) {
            Some(Value::Array(items)) => items.len(),
            _ => {
                tracing::debug!(path = %path, "Loop source is not a list");
                0
            }
        };
        let binding = Regex::new(&format!(r"\${}\b", regex::escape(&var))).map_err(render_error)?;
        let repeated: String = (0..count)
            .map(|i| bind_loop_variable(&body, &binding, &format!("{}.{}", path, i)))
            .collect();

        xml.replace_range(block, &repeated);
    }
    Ok(xml)
}

fn first_loop(xml: &str) -> Option<(Range<usize>, String, String)> {
    COMMAND.captures_iter(xml).find_map(|caps| {
        match parse_command(caps.get(1)?.as_str())? {
            Command::For { var, path } => {
                Some((caps.get(0)?.range(), var.to_string(), path.to_string()))
            }
            _ => None,
        }
    })
}

fn matching_end(xml: &str, from: usize, var: &str) -> Option<Range<usize>> {
    COMMAND.captures_iter(&xml[from..]).find_map(|caps| {
        match parse_command(caps.get(1)?.as_str())? {
            Command::EndFor(end) if end == var => {
                caps.get(0).map(|m| from + m.start()..from + m.end())
            }
            _ => None,
        }
    })
}

/// The span a loop replaces and the body repeated in its place.
fn loop_block(
    xml: &str,
    open: Range<usize>,
    close: Range<usize>,
) -> Result<(Range<usize>, String), AppError> {
    if !xml[open.end..close.start].contains("</w:p>") {
        return Ok((open.start..close.end, xml[open.end..close.start].to_string()));
    }

    let (opening, closing) = if is_inside(xml, open.start, &ROW_OPEN, "</w:tr>") {
        (&*ROW_OPEN, "</w:tr>")
    } else {
        (&*PARAGRAPH_OPEN, "</w:p>")
    };
    let start = opening
        .find_iter(&xml[..open.start])
        .last()
        .map(|m| m.start())
        .ok_or_else(|| render_error("FOR outside of a paragraph"))?;
    let end = xml[close.end..]
        .find(closing)
        .map(|i| close.end + i + closing.len())
        .ok_or_else(|| render_error("END-FOR outside of a paragraph"))?;

    let body = format!(
        "{}{}{}",
        &xml[start..open.start],
        &xml[open.end..close.start],
        &xml[close.end..end]
    );
    Ok((start..end, body))
}

fn is_inside(xml: &str, pos: usize, opening: &Regex, closing: &str) -> bool {
    let before = &xml[..pos];
    opening
        .find_iter(before)
        .last()
        .is_some_and(|open| !before[open.start()..].contains(closing))
}

fn bind_loop_variable(body: &str, binding: &Regex, item_path: &str) -> String {
    COMMAND
        .replace_all(body, |caps: &Captures| {
            format!("+++{}+++", binding.replace_all(&caps[1], NoExpand(item_path)))
        })
        .into_owned()
}

fn fill_commands(
    xml: &str,
    data: &Value,
    part: &str,
    media: &mut MediaCollector,
) -> Result<String, AppError> {
    let mut filled = String::with_capacity(xml.len());
    let mut last = 0;

    for caps in COMMAND.captures_iter(xml) {
        let (Some(whole), Some(inner)) = (caps.get(0), caps.get(1)) else {
            continue;
        };
        let replacement = match parse_command(inner.as_str()) {
            Some(Command::Insert(path)) => match lookup(data, path) {
                Some(value) => escape_xml(&scalar_text(value)),
                None => {
                    tracing::debug!(key = %path, "Template placeholder has no value");
                    String::new()
                }
            },
            Some(Command::Image(path)) => match lookup(data, path) {
                Some(value) => media.embed(part, value)?.unwrap_or_default(),
                None => {
                    tracing::debug!(key = %path, "Template image has no value");
                    String::new()
                }
            },
            Some(Command::EndFor(var)) | Some(Command::For { var, .. }) => {
                return Err(render_error(format!("END-FOR {} has no matching FOR", var)))
            }
            None => continue,
        };

        filled.push_str(&xml[last..whole.start()]);
        filled.push_str(&replacement);
        last = whole.end();
    }

    filled.push_str(&xml[last..]);
    Ok(filled)
}

fn lookup<'a>(data: &'a Value, path: &str) -> Option<&'a Value> {
    path.split('.').try_fold(data, |current, segment| match current {
        Value::Object(map) => map.get(segment),
        Value::Array(items) => segment.parse::<usize>().ok().and_then(|i| items.get(i)),
        _ => None,
    })
}

fn scalar_text(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        Value::Number(n) => n.to_string(),
        Value::Bool(b) => b.to_string(),
        Value::Null | Value::Array(_) | Value::Object(_) => String::new(),
    }
}

fn escape_xml(value: &str) -> String {
    let mut escaped = String::with_capacity(value.len());
    for c in value.chars() {
        match c {
            '&' => escaped.push_str("&amp;"),
            '<' => escaped.push_str("&lt;"),
            '>' => escaped.push_str("&gt;"),
            '"' => escaped.push_str("&quot;"),
            '\'' => escaped.push_str("&apos;"),
            other => escaped.push(other),
        }
    }
    escaped
}

struct EmbeddedImage {
    part: String,
    rel_id: String,
    file_name: String,
    extension: ImageExtension,
    bytes: Vec<u8>,
}

/// Images embedded while filling the text parts, added to the package
/// afterwards.
#[derive(Default)]
struct MediaCollector {
    images: Vec<EmbeddedImage>,
}

impl MediaCollector {
    /// Drawing markup for `value`, or `None` when it is not an image object.
    fn embed(&mut self, part: &str, value: &Value) -> Result<Option<String>, AppError> {
        let data = value.get("data").and_then(Value::as_str).unwrap_or_default();
        let extension = value
            .get("extension")
            .and_then(Value::as_str)
            .and_then(ImageExtension::from_extension);
        let Some(extension) = extension.filter(|_| !data.is_empty()) else {
            tracing::debug!(part = %part, "Template image value is not an image");
            return Ok(None);
        };
        let bytes = STANDARD.decode(data).map_err(render_error)?;
        let width = value.get("width").and_then(Value::as_f64).unwrap_or_default();
        let height = value.get("height").and_then(Value::as_f64).unwrap_or_default();

        let number = self.images.len() + 1;
        let rel_id = format!("rIdAcaraImage{}", number);
        let file_name = format!("acara_image{}{}", number, extension.as_str());
        let drawing = drawing_xml(number, &rel_id, &file_name, width, height);

        self.images.push(EmbeddedImage {
            part: part.to_string(),
            rel_id,
            file_name,
            extension,
            bytes,
        });
        Ok(Some(drawing))
    }

    /// Add the media parts, their relationships and content types.
    fn attach(self, entries: &mut Vec<PackageEntry>) -> Result<(), AppError> {
        if self.images.is_empty() {
            return Ok(());
        }

        let mut extensions: Vec<ImageExtension> = Vec::new();
        for image in &self.images {
            if !extensions.contains(&image.extension) {
                extensions.push(image.extension);
            }
        }
        let content_types = entry_content(entries, "[Content_Types].xml", EMPTY_CONTENT_TYPES)?;
        let defaults: String = extensions
            .iter()
            .filter(|ext| {
                let needle = format!("extension=\"{}\"", &ext.as_str()[1..]);
                !content_types.to_ascii_lowercase().contains(&needle)
            })
            .map(|ext| {
                format!(
                    r#"<Default Extension="{}" ContentType="{}"/>"#,
                    &ext.as_str()[1..],
                    ext.content_type()
                )
            })
            .collect();
        let content_types = insert_before_close(&content_types, "Types", &defaults)?;
        set_entry(entries, "[Content_Types].xml", content_types.into_bytes());

        let mut parts: Vec<&str> = Vec::new();
        for image in &self.images {
            if !parts.contains(&image.part.as_str()) {
                parts.push(&image.part);
            }
        }
        for part in parts {
            let rels_name = relationships_path(part);
            let relationships: String = self
                .images
                .iter()
                .filter(|image| image.part == part)
                .map(|image| {
                    format!(
                        r#"<Relationship Id="{}" Type="{}" Target="media/{}"/>"#,
                        image.rel_id, IMAGE_RELATIONSHIP, image.file_name
                    )
                })
                .collect();
            let rels = entry_content(entries, &rels_name, EMPTY_RELATIONSHIPS)?;
            let rels = insert_before_close(&rels, "Relationships", &relationships)?;
            set_entry(entries, &rels_name, rels.into_bytes());
        }

        for image in self.images {
            let dir = image.part.rsplit_once('/').map(|(dir, _)| dir).unwrap_or("");
            let name = if dir.is_empty() {
                format!("media/{}", image.file_name)
            } else {
                format!("{}/media/{}", dir, image.file_name)
            };
            entries.push(PackageEntry::new_file(name, image.bytes));
        }
        Ok(())
    }
}

fn drawing_xml(number: usize, rel_id: &str, file_name: &str, width_cm: f64, height_cm: f64) -> String {
    let cx = (width_cm * EMU_PER_CM).round() as i64;
    let cy = (height_cm * EMU_PER_CM).round() as i64;
    format!(
        concat!(
            r#"</w:t><w:drawing>"#,
            r#"<wp:inline xmlns:wp="http://schemas.openxmlformats.org/drawingml/2006/wordprocessingDrawing" distT="0" distB="0" distL="0" distR="0">"#,
            r#"<wp:extent cx="{cx}" cy="{cy}"/>"#,
            r#"<wp:docPr id="{id}" name="Picture {id}"/>"#,
            r#"<a:graphic xmlns:a="http://schemas.openxmlformats.org/drawingml/2006/main">"#,
            r#"<a:graphicData uri="http://schemas.openxmlformats.org/drawingml/2006/picture">"#,
            r#"<pic:pic xmlns:pic="http://schemas.openxmlformats.org/drawingml/2006/picture">"#,
            r#"<pic:nvPicPr><pic:cNvPr id="0" name="{name}"/><pic:cNvPicPr/></pic:nvPicPr>"#,
            r#"<pic:blipFill><a:blip xmlns:r="http://schemas.openxmlformats.org/officeDocument/2006/relationships" r:embed="{rel}"/>"#,
            r#"<a:stretch><a:fillRect/></a:stretch></pic:blipFill>"#,
            r#"<pic:spPr><a:xfrm><a:off x="0" y="0"/><a:ext cx="{cx}" cy="{cy}"/></a:xfrm>"#,
            r#"<a:prstGeom prst="rect"><a:avLst/></a:prstGeom></pic:spPr>"#,
            r#"</pic:pic></a:graphicData></a:graphic></wp:inline>"#,
            r#"</w:drawing><w:t xml:space="preserve">"#,
        ),
        cx = cx,
        cy = cy,
        id = 1000 + number,
        name = file_name,
        rel = rel_id,
    )
}

/// `word/document.xml` -> `word/_rels/document.xml.rels`
fn relationships_path(part: &str) -> String {
    match part.rsplit_once('/') {
        Some((dir, file)) => format!("{}/_rels/{}.rels", dir, file),
        None => format!("_rels/{}.rels", part),
    }
}

fn entry_content(entries: &[PackageEntry], name: &str, default: &str) -> Result<String, AppError> {
    match entries.iter().find(|entry| entry.name == name) {
        Some(entry) => String::from_utf8(entry.content.clone()).map_err(render_error),
        None => Ok(default.to_string()),
    }
}

fn set_entry(entries: &mut Vec<PackageEntry>, name: &str, content: Vec<u8>) {
    match entries.iter_mut().find(|entry| entry.name == name) {
        Some(entry) => entry.content = content,
        None => entries.push(PackageEntry::new_file(name.to_string(), content)),
    }
}

/// Insert `content` as the last children of the root element `tag`, which
/// may be self-closing.
fn insert_before_close(xml: &str, tag: &str, content: &str) -> Result<String, AppError> {
    let close = format!("</{}>", tag);
    if let Some(pos) = xml.rfind(&close) {
        let mut updated = xml.to_string();
        updated.insert_str(pos, content);
        return Ok(updated);
    }

    let self_closing = Regex::new(&format!(r"<{}([^>]*?)\s*/>", regex::escape(tag)))
        .map_err(render_error)?;
    if !self_closing.is_match(xml) {
        return Err(render_error(format!("package part has no <{}> element", tag)));
    }
    Ok(self_closing
        .replacen(xml, 1, |caps: &Captures| {
            format!("<{}{}>{}</{}>", tag, &caps[1], content, tag)
        })
        .into_owned())
}

#[cfg(test)]
mod tests {
    use super::*;
    use acara_core::constants::FALLBACK_IMAGE_BASE64;
    use serde_json::json;
    use tempfile::tempdir;

    fn write_template(dir: &Path, name: &str, body: &str) {
        let mut writer = ZipWriter::new(Cursor::new(Vec::new()));
        let options = FileOptions::default().compression_method(CompressionMethod::Deflated);
        writer.start_file("[Content_Types].xml", options).unwrap();
        writer.write_all(b"<Types/>").unwrap();
        writer.start_file("word/document.xml", options).unwrap();
        writer.write_all(body.as_bytes()).unwrap();
        writer.start_file("word/footer1.xml", options).unwrap();
        writer.write_all(b"<w:ftr>+++INS no_berkas+++</w:ftr>").unwrap();
        let bytes = writer.finish().unwrap().into_inner();
        std::fs::write(dir.join(name), bytes).unwrap();
    }

    fn read_part(bytes: &[u8], name: &str) -> String {
        let mut archive = ZipArchive::new(Cursor::new(bytes)).unwrap();
        let mut content = String::new();
        archive
            .by_name(name)
            .unwrap()
            .read_to_string(&mut content)
            .unwrap();
        content
    }

    #[tokio::test]
    async fn test_render_substitutes_placeholders() {
        let dir = tempdir().unwrap();
        write_template(
            dir.path(),
            "berita-acara.docx",
            "<w:t>+++full_name+++ / +++INS day+++ +++= year+++ +++pengukuran_dihadiri.0.nama+++ +++missing+++</w:t>",
        );
        let renderer = DocxTemplateRenderer::new(dir.path(), "berita-acara.docx");
        let data = json!({
            "full_name": "Budi & Sons <PT>",
            "day": "Rabu",
            "year": 2025,
            "no_berkas": "B-7",
            "pengukuran_dihadiri": [{"no": 1, "nama": "Ani"}]
        });

        let rendered = renderer.render(None, &data).await.unwrap();
        assert_eq!(rendered.file_name, "berita-acara.docx");
        assert_eq!(
            read_part(&rendered.bytes, "word/document.xml"),
            "<w:t>Budi &amp; Sons &lt;PT&gt; / Rabu 2025 Ani </w:t>"
        );
        assert_eq!(read_part(&rendered.bytes, "word/footer1.xml"), "<w:ftr>B-7</w:ftr>");
        assert_eq!(read_part(&rendered.bytes, "[Content_Types].xml"), "<Types/>");
    }

    #[tokio::test]
    async fn test_template_lookup_uses_base_name_only() {
        let dir = tempdir().unwrap();
        write_template(dir.path(), "custom.docx", "<w:t>+++desa+++</w:t>");
        let renderer = DocxTemplateRenderer::new(dir.path(), "berita-acara.docx");

        let rendered = renderer
            .render(Some("../../somewhere/custom.docx"), &json!({"desa": "Sukamaju"}))
            .await
            .unwrap();
        assert_eq!(rendered.file_name, "custom.docx");
        assert_eq!(read_part(&rendered.bytes, "word/document.xml"), "<w:t>Sukamaju</w:t>");

        assert!(matches!(
            renderer.render(None, &json!({})).await,
            Err(AppError::TemplateNotFound(_))
        ));
        assert!(matches!(
            renderer.render(Some(".."), &json!({})).await,
            Err(AppError::TemplateNotFound(_))
        ));
    }

    #[tokio::test]
    async fn test_corrupt_template_is_a_render_error() {
        let dir = tempdir().unwrap();
        std::fs::write(dir.path().join("broken.docx"), b"not a zip").unwrap();
        let renderer = DocxTemplateRenderer::new(dir.path(), "broken.docx");
        assert!(matches!(
            renderer.render(None, &json!({})).await,
            Err(AppError::DocumentRender(_))
        ));
    }

    fn print_image(width: f64, height: f64) -> Value {
        json!({
            "width": width,
            "height": height,
            "data": FALLBACK_IMAGE_BASE64,
            "extension": ".png"
        })
    }

    #[tokio::test]
    async fn test_render_embeds_images_and_repeats_inline_loops() {
        let dir = tempdir().unwrap();
        write_template(
            dir.path(),
            "berita-acara.docx",
            "<w:p><w:r><w:t>+++IMAGE gambar_denah_area+++|+++FOR p IN pengukuran_dihadiri++++++INS $p.no+++. +++INS $p.nama+++;+++END-FOR p+++</w:t></w:r></w:p>",
        );
        let renderer = DocxTemplateRenderer::new(dir.path(), "berita-acara.docx");
        let data = json!({
            "no_berkas": "B-7",
            "gambar_denah_area": print_image(7.0, 7.0),
            "pengukuran_dihadiri": [
                {"no": "1", "nama": "Ani", "foto": print_image(7.0, 7.0)},
                {"no": "2", "nama": "Budi", "foto": print_image(7.0, 7.0)}
            ]
        });

        let rendered = renderer.render(None, &data).await.unwrap();
        let document = read_part(&rendered.bytes, "word/document.xml");
        assert!(document.contains(r#"<w:t xml:space="preserve">|1. Ani;2. Budi;</w:t>"#));
        assert!(!document.contains("+++"));
        assert!(document.contains(r#"<wp:extent cx="2520000" cy="2520000"/>"#));
        assert!(document.contains(r#"r:embed="rIdAcaraImage1""#));

        let rels = read_part(&rendered.bytes, "word/_rels/document.xml.rels");
        assert!(rels.contains(r#"Id="rIdAcaraImage1""#));
        assert!(rels.contains(r#"Target="media/acara_image1.png""#));

        let mut archive = ZipArchive::new(Cursor::new(&rendered.bytes[..])).unwrap();
        let mut media = Vec::new();
        archive
            .by_name("word/media/acara_image1.png")
            .unwrap()
            .read_to_end(&mut media)
            .unwrap();
        assert_eq!(media, STANDARD.decode(FALLBACK_IMAGE_BASE64).unwrap());

        assert_eq!(
            read_part(&rendered.bytes, "[Content_Types].xml"),
            r#"<Types><Default Extension="png" ContentType="image/png"/></Types>"#
        );
    }

    #[tokio::test]
    async fn test_table_row_loop_repeats_rows_with_signatures() {
        let dir = tempdir().unwrap();
        write_template(
            dir.path(),
            "berita-acara.docx",
            concat!(
                "<w:tbl><w:tr><w:tc><w:p><w:r><w:t>No</w:t></w:r></w:p></w:tc></w:tr>",
                "<w:tr><w:trPr/><w:tc><w:p><w:r><w:t>+++FOR o IN daftar_petugas++++++INS $o.no+++</w:t></w:r></w:p></w:tc>",
                "<w:tc><w:p><w:r><w:t>+++INS $o.nama+++ +++IMAGE $o.ttd++++++END-FOR o+++</w:t></w:r></w:p></w:tc></w:tr>",
                "</w:tbl><w:p><w:r><w:t>+++INS $o.nama+++</w:t></w:r></w:p>",
            ),
        );
        let renderer = DocxTemplateRenderer::new(dir.path(), "berita-acara.docx");
        let data = json!({
            "daftar_petugas": [
                {"no": "1", "nama": "Sari", "ttd": print_image(2.0, 2.0)},
                {"no": "2", "nama": "Tono", "ttd": print_image(2.0, 2.0)},
                {"no": "3", "nama": "Umar", "ttd": {"data": "", "extension": ".png"}}
            ]
        });

        let rendered = renderer.render(None, &data).await.unwrap();
        let document = read_part(&rendered.bytes, "word/document.xml");
        assert_eq!(document.matches("<w:tr>").count(), 4);
        assert_eq!(document.matches("<w:drawing>").count(), 2);
        assert!(document.contains("<w:t>1</w:t>"));
        assert!(document.contains("<w:t>3</w:t>"));
        let sari = document.find("Sari").unwrap();
        let tono = document.find("Tono").unwrap();
        let umar = document.find("Umar").unwrap();
        assert!(sari < tono && tono < umar);
        assert!(document.contains(r#"<wp:extent cx="720000" cy="720000"/>"#));
        assert!(document.ends_with("</w:tbl><w:p><w:r><w:t></w:t></w:r></w:p>"));

        let rels = read_part(&rendered.bytes, "word/_rels/document.xml.rels");
        assert_eq!(rels.matches("<Relationship ").count(), 2);
    }

    #[tokio::test]
    async fn test_empty_loop_source_removes_block() {
        let dir = tempdir().unwrap();
        write_template(
            dir.path(),
            "berita-acara.docx",
            "<w:p><w:r><w:t>A+++FOR t IN tanah_terdampak++++++INS $t.nib+++,+++END-FOR t+++B</w:t></w:r></w:p>",
        );
        let renderer = DocxTemplateRenderer::new(dir.path(), "berita-acara.docx");

        let rendered = renderer
            .render(None, &json!({"tanah_terdampak": []}))
            .await
            .unwrap();
        assert_eq!(
            read_part(&rendered.bytes, "word/document.xml"),
            "<w:p><w:r><w:t>AB</w:t></w:r></w:p>"
        );
        assert!(ZipArchive::new(Cursor::new(&rendered.bytes[..]))
            .unwrap()
            .by_name("word/_rels/document.xml.rels")
            .is_err());
    }

    #[tokio::test]
    async fn test_unbalanced_loops_are_render_errors() {
        let dir = tempdir().unwrap();
        write_template(dir.path(), "open.docx", "<w:t>+++FOR p IN items+++</w:t>");
        write_template(dir.path(), "close.docx", "<w:t>+++END-FOR p+++</w:t>");
        let renderer = DocxTemplateRenderer::new(dir.path(), "open.docx");

        for name in ["open.docx", "close.docx"] {
            assert!(matches!(
                renderer.render(Some(name), &json!({"items": [1]})).await,
                Err(AppError::DocumentRender(_))
            ));
        }
    }

    #[test]
    fn test_parse_command_forms() {
        assert_eq!(parse_command("desa"), Some(Command::Insert("desa")));
        assert_eq!(parse_command(" INS $p.nama "), Some(Command::Insert("$p.nama")));
        assert_eq!(parse_command("= year"), Some(Command::Insert("year")));
        assert_eq!(
            parse_command("FOR p IN pengukuran_dihadiri"),
            Some(Command::For {
                var: "p",
                path: "pengukuran_dihadiri"
            })
        );
        assert_eq!(parse_command("END-FOR p"), Some(Command::EndFor("p")));
        assert_eq!(parse_command("IMAGE gambar_denah_area"), Some(Command::Image("gambar_denah_area")));
        assert_eq!(parse_command(" "), None);
        assert_eq!(parse_command("not a command"), None);
    }
}
