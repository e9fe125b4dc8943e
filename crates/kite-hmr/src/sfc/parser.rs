//! Top-level block scanner for single-file components.
//!
//! Only the outermost structure is parsed. Block contents are kept verbatim
//! and handed to the script rewriter, template compiler or style module
//! builder later.

use indexmap::IndexMap;
use memchr::{memchr, memmem};

use super::{SfcBlock, SfcDescriptor};

/// Maximum component size (10 MB).
pub const MAX_FILE_SIZE: usize = 10 * 1024 * 1024;

/// Maximum number of top-level blocks, custom blocks included.
pub const MAX_BLOCKS: usize = 100;

/// Errors produced while splitting a component into blocks.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum SfcParseError {
    #[error("File too large: {size} bytes (max: {max} bytes)")]
    FileTooLarge { size: usize, max: usize },

    #[error("Too many blocks: {count} found (max: {max} allowed)")]
    TooManyBlocks { count: usize, max: usize },

    #[error("Unclosed <{tag}> block starting at byte position {position}")]
    UnclosedTag { tag: String, position: usize },

    #[error("Unclosed comment starting at byte position {position}")]
    UnclosedComment { position: usize },

    #[error("Duplicate <{tag}> block at byte position {position}")]
    DuplicateBlock { tag: String, position: usize },
}

/// Split a component's source into its top-level blocks.
pub fn parse_sfc(source: &str) -> Result<SfcDescriptor, SfcParseError> {
    if source.len() > MAX_FILE_SIZE {
        return Err(SfcParseError::FileTooLarge {
            size: source.len(),
            max: MAX_FILE_SIZE,
        });
    }

    let bytes = source.as_bytes();
    let mut descriptor = SfcDescriptor::default();
    let mut pointer = 0;
    let mut block_count = 0;

    while let Some(offset) = memchr(b'<', &bytes[pointer..]) {
        let start = pointer + offset;

        if bytes[start..].starts_with(b"<!--") {
            let end = memmem::find(&bytes[start + 4..], b"-->")
                .ok_or(SfcParseError::UnclosedComment { position: start })?;
            pointer = start + 4 + end + 3;
            continue;
        }

        let name_start = start + 1;
        let name_end = name_start
            + bytes[name_start..]
                .iter()
                .take_while(|b| b.is_ascii_alphanumeric() || **b == b'-' || **b == b'_')
                .count();
        if name_end == name_start {
            // Stray `<`, closing tag or doctype outside any block.
            pointer = name_start;
            continue;
        }
        let tag = &source[name_start..name_end];

        let tag_end = find_closing_angle(bytes, name_end).ok_or_else(|| unclosed(tag, start))?;
        let self_closing = bytes[tag_end - 1] == b'/';
        let attr_end = if self_closing { tag_end - 1 } else { tag_end };
        let attrs = parse_attributes(&source[name_end..attr_end]);

        let (content, next) = if self_closing {
            ("", tag_end + 1)
        } else {
            let (content_end, after) = find_block_end(bytes, tag, tag_end + 1)
                .ok_or_else(|| unclosed(tag, start))?;
            (&source[tag_end + 1..content_end], after)
        };
        pointer = next;

        block_count += 1;
        if block_count > MAX_BLOCKS {
            return Err(SfcParseError::TooManyBlocks {
                count: block_count,
                max: MAX_BLOCKS,
            });
        }

        let block = SfcBlock {
            content: content.to_string(),
            src: attrs.get("src").cloned(),
            attrs,
        };

        match tag {
            "template" => set_once(&mut descriptor.template, block, tag, start)?,
            "script" if block.has_attr("setup") => {
                set_once(&mut descriptor.script_setup, block, "script setup", start)?
            }
            "script" => set_once(&mut descriptor.script, block, tag, start)?,
            "style" => descriptor.styles.push(block),
            // Custom blocks (`<i18n>`, `<docs>`) are not served.
            _ => {}
        }
    }

    Ok(descriptor)
}

fn unclosed(tag: &str, position: usize) -> SfcParseError {
    SfcParseError::UnclosedTag {
        tag: tag.to_string(),
        position,
    }
}

fn set_once(
    slot: &mut Option<SfcBlock>,
    block: SfcBlock,
    tag: &str,
    position: usize,
) -> Result<(), SfcParseError> {
    if slot.is_some() {
        return Err(SfcParseError::DuplicateBlock {
            tag: tag.to_string(),
            position,
        });
    }
    *slot = Some(block);
    Ok(())
}

/// Finds the `>` ending an opening tag, skipping quoted attribute values.
fn find_closing_angle(bytes: &[u8], start: usize) -> Option<usize> {
    let mut quote: Option<u8> = None;

    for (i, &byte) in bytes[start..].iter().enumerate() {
        match (quote, byte) {
            (None, b'"' | b'\'') => quote = Some(byte),
            (Some(q), _) if q == byte => quote = None,
            (None, b'>') => return Some(start + i),
            _ => {}
        }
    }

    None
}

/// Finds the closing tag of a block.
///
/// Returns the content end and the position after the closing tag. Templates
/// may nest `<template>` elements, so openings are counted for them; script
/// and style content is raw text and ends at the first closing tag.
fn find_block_end(bytes: &[u8], tag: &str, from: usize) -> Option<(usize, usize)> {
    let open = format!("<{tag}");
    let close = format!("</{tag}");
    let nests = tag == "template";
    let mut depth = 1usize;
    let mut pointer = from;

    loop {
        let close_at = pointer + find_tag(&bytes[pointer..], close.as_bytes())?;

        if nests {
            let mut scan = pointer;
            while let Some(offset) = find_tag(&bytes[scan..close_at], open.as_bytes()) {
                let open_at = scan + offset;
                let open_end = find_closing_angle(bytes, open_at)?;
                if bytes[open_end - 1] != b'/' {
                    depth += 1;
                }
                scan = open_end.min(close_at);
            }
        }

        let close_end = close_at + memchr(b'>', &bytes[close_at..])?;
        depth -= 1;
        if depth == 0 {
            return Some((close_at, close_end + 1));
        }
        pointer = close_end + 1;
    }
}

/// Finds `needle` followed by a tag-name boundary.
fn find_tag(haystack: &[u8], needle: &[u8]) -> Option<usize> {
    let finder = memmem::Finder::new(needle);
    let mut from = 0;

    while let Some(offset) = finder.find(&haystack[from..]) {
        let at = from + offset;
        match haystack.get(at + needle.len()) {
            Some(b' ' | b'\t' | b'\n' | b'\r' | b'>' | b'/') => return Some(at),
            None => return None,
            Some(_) => from = at + needle.len(),
        }
    }

    None
}

/// Parses `name`, `name=value`, `name="value"` and `name='value'` pairs.
fn parse_attributes(text: &str) -> IndexMap<String, String> {
    let mut attrs = IndexMap::new();
    let bytes = text.as_bytes();
    let mut i = 0;

    while i < bytes.len() {
        while i < bytes.len() && (bytes[i].is_ascii_whitespace() || bytes[i] == b'/') {
            i += 1;
        }
        let name_start = i;
        while i < bytes.len() && !bytes[i].is_ascii_whitespace() && !matches!(bytes[i], b'=' | b'/')
        {
            i += 1;
        }
        if name_start == i {
            break;
        }
        let name = &text[name_start..i];

        while i < bytes.len() && bytes[i].is_ascii_whitespace() {
            i += 1;
        }
        let value = if i < bytes.len() && bytes[i] == b'=' {
            i += 1;
            while i < bytes.len() && bytes[i].is_ascii_whitespace() {
                i += 1;
            }
            match bytes.get(i).copied() {
                Some(quote) if quote == b'"' || quote == b'\'' => {
                    let value_start = i + 1;
                    let value_end = memchr(quote, &bytes[value_start..])
                        .map(|end| value_start + end)
                        .unwrap_or(bytes.len());
                    i = (value_end + 1).min(bytes.len());
                    &text[value_start..value_end]
                }
                _ => {
                    let value_start = i;
                    while i < bytes.len() && !bytes[i].is_ascii_whitespace() {
                        i += 1;
                    }
                    &text[value_start..i]
                }
            }
        } else {
            ""
        };

        attrs.insert(name.to_string(), value.to_string());
    }

    attrs
}
