//! Content extraction: raw bytes or a URL in, plain text out
//!
//! Every extractor is best-effort. Anything that cannot be turned into text
//! reports "no text" rather than an error; the ingest pipeline treats that as
//! zero chunks.

use std::io::Read;

use scraper::{ElementRef, Html, Selector};
use tracing::{debug, warn};

use crate::config::URL_TEXT_CAP;

/// Extract plain text from an uploaded file, selected by extension.
///
/// Supported: `.txt`/`.md` (lossy UTF-8), `.pdf` (per-page text joined with
/// newlines), `.docx` (paragraph text). Anything else yields `None`.
pub fn extract_bytes(data: &[u8], filename: &str) -> Option<String> {
    let name = filename.to_lowercase();
    if name.ends_with(".txt") || name.ends_with(".md") {
        let text = String::from_utf8_lossy(data).replace('\u{FFFD}', "");
        return non_empty(text);
    }
    if name.ends_with(".pdf") {
        return pdf_to_text(data);
    }
    if name.ends_with(".docx") {
        return docx_to_text(data);
    }
    debug!("Unsupported file extension: {}", filename);
    None
}

/// Fetch a web page and extract its main content, capped at
/// [`URL_TEXT_CAP`] chars. Any fetch or decode failure yields `None`.
pub async fn fetch_url_text(url: &str) -> Option<String> {
    let client = reqwest::Client::new();
    let response = match client
        .get(url)
        .header("Cache-Control", "no-cache")
        .header("Referer", "https://www.google.com/")
        .header("User-Agent", "Mozilla/5.0")
        .send()
        .await
        .and_then(|r| r.error_for_status())
    {
        Ok(response) => response,
        Err(err) => {
            warn!("Failed to fetch {}: {}", url, err);
            return None;
        }
    };

    let html = match response.text().await {
        Ok(html) => html,
        Err(err) => {
            warn!("Failed to read body of {}: {}", url, err);
            return None;
        }
    };

    non_empty(cap_chars(&html_to_text(&html), URL_TEXT_CAP))
}

/// Readability-style main-content extraction: prefer `article`/`main`
/// containers, collect block-level text, fall back to the whole body.
pub fn html_to_text(html: &str) -> String {
    let doc = Html::parse_document(html);
    let container = Selector::parse("article, main").expect("valid selector");
    let blocks =
        Selector::parse("p, h1, h2, h3, h4, li, blockquote, pre").expect("valid selector");

    if let Some(root) = doc.select(&container).next() {
        let text = collect_blocks(root, &blocks);
        if !text.is_empty() {
            return text;
        }
    }

    let text = doc
        .select(&blocks)
        .map(element_text)
        .filter(|s| !s.is_empty())
        .collect::<Vec<_>>()
        .join("\n");
    if !text.is_empty() {
        return text;
    }

    // Last resort: all body text, scripts and styles included being the cost.
    let body = Selector::parse("body").expect("valid selector");
    doc.select(&body)
        .next()
        .map(|b| b.text().collect::<Vec<_>>().join(" ").trim().to_string())
        .unwrap_or_default()
}

fn collect_blocks(root: ElementRef<'_>, blocks: &Selector) -> String {
    root.select(blocks)
        .map(element_text)
        .filter(|s| !s.is_empty())
        .collect::<Vec<_>>()
        .join("\n")
}

fn element_text(el: ElementRef<'_>) -> String {
    el.text().collect::<String>().trim().to_string()
}

fn pdf_to_text(data: &[u8]) -> Option<String> {
    match pdf_extract::extract_text_from_mem_by_pages(data) {
        Ok(pages) => non_empty(pages.join("\n")),
        Err(err) => {
            warn!("Failed extracting PDF text: {}", err);
            None
        }
    }
}

fn docx_to_text(data: &[u8]) -> Option<String> {
    let cursor = std::io::Cursor::new(data);
    let mut archive = match zip::ZipArchive::new(cursor) {
        Ok(archive) => archive,
        Err(err) => {
            warn!("Failed opening DOCX archive: {}", err);
            return None;
        }
    };

    let mut xml = String::new();
    match archive.by_name("word/document.xml") {
        Ok(mut file) => {
            if let Err(err) = file.read_to_string(&mut xml) {
                warn!("Failed reading DOCX document.xml: {}", err);
                return None;
            }
        }
        Err(err) => {
            warn!("DOCX has no document.xml: {}", err);
            return None;
        }
    }

    non_empty(docx_xml_to_text(&xml))
}

/// Pull paragraph text out of WordprocessingML: the character content of
/// `w:t` runs, one line per `w:p` paragraph.
fn docx_xml_to_text(xml: &str) -> String {
    use quick_xml::events::Event;
    use quick_xml::Reader;

    let mut reader = Reader::from_str(xml);
    let mut out = String::new();
    let mut in_text = false;

    loop {
        match reader.read_event() {
            Ok(Event::Start(e)) if e.name().as_ref() == b"w:t" => in_text = true,
            Ok(Event::End(e)) => match e.name().as_ref() {
                b"w:t" => in_text = false,
                b"w:p" => out.push('\n'),
                _ => {}
            },
            Ok(Event::Text(t)) if in_text => {
                out.push_str(&t.unescape().unwrap_or_default());
            }
            Ok(Event::Eof) => break,
            Err(err) => {
                warn!("Malformed DOCX xml: {}", err);
                break;
            }
            _ => {}
        }
    }

    out.lines()
        .map(str::trim_end)
        .filter(|l| !l.is_empty())
        .collect::<Vec<_>>()
        .join("\n")
}

/// Truncate to at most `cap` chars without splitting a code point.
pub(crate) fn cap_chars(text: &str, cap: usize) -> String {
    if text.chars().count() <= cap {
        text.to_string()
    } else {
        text.chars().take(cap).collect()
    }
}

fn non_empty(text: String) -> Option<String> {
    if text.trim().is_empty() {
        None
    } else {
        Some(text)
    }
}
