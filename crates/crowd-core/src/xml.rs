//! XML marshalling helpers built on `quick-xml`'s serde support.

use crate::{Error, Result};
use quick_xml::events::{BytesCData, BytesText, Event};
use quick_xml::reader::Reader;
use quick_xml::writer::Writer;
use serde::de::DeserializeOwned;
use serde::Serialize;

/// Standard XML declaration prepended to every request body.
pub const XML_DECLARATION: &str = "<?xml version=\"1.0\" encoding=\"UTF-8\"?>\n";

/// Marshal a value to an XML document prefixed with [`XML_DECLARATION`].
///
/// The root element name comes from the type's serde name.
///
/// # Errors
///
/// Returns [`Error::EncodeError`] if the value cannot be represented as XML.
pub fn to_xml<T>(value: &T) -> Result<Vec<u8>>
where
    T: Serialize + ?Sized,
{
    let body = quick_xml::se::to_string(value).map_err(|err| Error::EncodeError(err.to_string()))?;

    let mut document = String::with_capacity(XML_DECLARATION.len() + body.len());
    document.push_str(XML_DECLARATION);
    document.push_str(&body);
    Ok(document.into_bytes())
}

/// Unmarshal an XML document into a typed value.
///
/// Unknown elements and attributes are ignored. Text content of leaf elements is kept
/// verbatim, including leading and trailing whitespace.
///
/// # Errors
///
/// Returns [`Error::DecodeError`] if the bytes are not UTF-8, are not well-formed XML or do
/// not match the shape of `T`.
pub fn from_xml<T>(data: &[u8]) -> Result<T>
where
    T: DeserializeOwned,
{
    let text = std::str::from_utf8(data)
        .map_err(|err| Error::DecodeError(format!("response is not valid UTF-8: {err}")))?;
    let document = preserve_leaf_whitespace(text)?;

    quick_xml::de::from_str(&document).map_err(|err| Error::DecodeError(err.to_string()))
}

/// Re-emit every text-only element whose content has edge whitespace as CDATA.
///
/// The serde deserializer trims text events but never CDATA, so this keeps values such as
/// `<display-name> John </display-name>` intact. Whitespace between elements is untouched.
fn preserve_leaf_whitespace(document: &str) -> Result<String> {
    let mut reader = Reader::from_str(document);
    let mut writer = Writer::new(Vec::with_capacity(document.len()));
    let mut after_start = false;
    let mut held: Option<BytesText<'_>> = None;

    loop {
        let event = reader
            .read_event()
            .map_err(|err| Error::DecodeError(err.to_string()))?;

        match event {
            Event::Eof => break,
            Event::Text(text) if after_start => {
                held = Some(text);
                after_start = false;
            }
            Event::End(end) => {
                if let Some(text) = held.take() {
                    write_leaf_text(&mut writer, text)?;
                }
                write_event(&mut writer, Event::End(end))?;
                after_start = false;
            }
            other => {
                if let Some(text) = held.take() {
                    write_event(&mut writer, Event::Text(text))?;
                }
                after_start = matches!(other, Event::Start(_));
                write_event(&mut writer, other)?;
            }
        }
    }

    if let Some(text) = held {
        write_event(&mut writer, Event::Text(text))?;
    }

    String::from_utf8(writer.into_inner()).map_err(|err| Error::DecodeError(err.to_string()))
}

fn write_leaf_text(writer: &mut Writer<Vec<u8>>, text: BytesText<'_>) -> Result<()> {
    let content = text
        .unescape()
        .map_err(|err| Error::DecodeError(err.to_string()))?;

    if content.trim_matches(is_xml_whitespace).len() == content.len() {
        return write_event(writer, Event::Text(text));
    }

    for piece in BytesCData::escaped(&content) {
        write_event(writer, Event::CData(piece))?;
    }
    Ok(())
}

const fn is_xml_whitespace(c: char) -> bool {
    matches!(c, ' ' | '\t' | '\r' | '\n')
}

fn write_event(writer: &mut Writer<Vec<u8>>, event: Event<'_>) -> Result<()> {
    writer
        .write_event(event)
        .map_err(|err| Error::DecodeError(err.to_string()))
}
