//! Single-file component (`.vue`) handling.
//!
//! A component is split into its top-level `<script>`, `<script setup>`,
//! `<template>` and `<style>` blocks. The last parse of every component is
//! cached so a change can be classified by comparing blocks.

mod cache;
mod diff;
mod parser;

use indexmap::IndexMap;
use serde::Serialize;

pub use cache::DescriptorCache;
pub use diff::{blocks_equal, diff_descriptors};
pub use parser::{parse_sfc, SfcParseError, MAX_BLOCKS, MAX_FILE_SIZE};

/// One top-level block of a component.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct SfcBlock {
    /// Text between the opening and closing tag.
    pub content: String,
    /// Attributes in source order. Boolean attributes map to `""`.
    pub attrs: IndexMap<String, String>,
    /// External source locator from a `src` attribute.
    pub src: Option<String>,
}

impl SfcBlock {
    /// The `lang` attribute, if present and non-empty.
    pub fn lang(&self) -> Option<&str> {
        self.attrs
            .get("lang")
            .map(String::as_str)
            .filter(|lang| !lang.is_empty())
    }

    pub fn has_attr(&self, name: &str) -> bool {
        self.attrs.contains_key(name)
    }
}

/// The block structure of one component parse.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct SfcDescriptor {
    pub script: Option<SfcBlock>,
    pub script_setup: Option<SfcBlock>,
    pub template: Option<SfcBlock>,
    pub styles: Vec<SfcBlock>,
}

impl SfcDescriptor {
    /// The script block the component's module is built from; `<script setup>` wins.
    pub fn primary_script(&self) -> Option<&SfcBlock> {
        self.script_setup.as_ref().or(self.script.as_ref())
    }
}
