//! Color tables and the colors a conversion actually references.
//!
//! MEDM widgets never carry literal colors; they index into the display's
//! `"color map"` block, or into the stock 65-entry MEDM palette when the
//! display has none. Gestalt wants named colors, so every index referenced by
//! an emitted widget becomes one [`ResolvedColor`] named after its index.

use std::{
    collections::{btree_map::Entry, BTreeMap},
    fmt,
};

use serde::{Deserialize, Serialize};
use smol_str::{format_smolstr, SmolStr};

use crate::{
    reader::RawValue,
    tree::{AttributeGroup, ColorIndex, WidgetNode, WidgetTree},
    Adl2GestaltError,
};

/// The largest palette MEDM can address.
pub const MAX_COLORS: usize = 256;

/// The palette MEDM uses when a display declares no color map.
static DEFAULT_MEDM_PALETTE: [u32; 65] = [
    0xffffff, 0xececec, 0xdadada, 0xc8c8c8, 0xbbbbbb, 0xaeaeae, 0x9e9e9e, 0x919191, 0x858585,
    0x787878, 0x696969, 0x5a5a5a, 0x464646, 0x2d2d2d, 0x000000, 0x00d800, 0x1ebb00, 0x339900,
    0x2d7f00, 0x216c00, 0xfd0000, 0xde1309, 0xbe190b, 0xa01207, 0x820400, 0x5893ff, 0x597ee1,
    0x4b6ec7, 0x3a5eab, 0x27548d, 0xfbf34a, 0xf9da3c, 0xeeb62b, 0xe19015, 0xcd6100, 0xffb0ff,
    0xd67fe2, 0xae4ebc, 0x8b1a96, 0x610a75, 0xa4aaff, 0x8793e2, 0x6a73c1, 0x4d52a4, 0x343386,
    0xc7bb6d, 0xb79d5c, 0xa47e3c, 0x7d5627, 0x58340f, 0x99ffff, 0x73dfff, 0x4ea5f9, 0x2a63e4,
    0x0a00b8, 0xebf1b5, 0xd4db9d, 0xbbc187, 0xa6a462, 0x8b8239, 0x73ff6b, 0x52da3b, 0x3cb420,
    0x289315, 0x1a7309,
];

/// A 24-bit RGB color
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Rgb(pub u32);

impl Rgb {
    pub fn new(r: u8, g: u8, b: u8) -> Self {
        Rgb(((r as u32) << 16) | ((g as u32) << 8) | b as u32)
    }

    /// Parse six hex digits, as written in a `colors` list.
    pub fn from_hex(s: &str) -> Option<Self> {
        if s.len() != 6 || !s.bytes().all(|b| b.is_ascii_hexdigit()) {
            return None;
        }
        u32::from_str_radix(s, 16).ok().map(Rgb)
    }

    pub fn r(&self) -> u8 {
        (self.0 >> 16) as u8
    }

    pub fn g(&self) -> u8 {
        (self.0 >> 8) as u8
    }

    pub fn b(&self) -> u8 {
        self.0 as u8
    }
}

impl fmt::Display for Rgb {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "${:06x}", self.0)
    }
}

#[derive(Debug, Copy, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ColorTableEntry {
    pub index: ColorIndex,
    pub rgb: Rgb,
}

/// An immutable indexed palette
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ColorTable {
    entries: Vec<ColorTableEntry>,
}

impl Default for ColorTable {
    fn default() -> Self {
        Self::default_medm()
    }
}

impl ColorTable {
    pub fn default_medm() -> Self {
        Self::from_rgbs(DEFAULT_MEDM_PALETTE.iter().map(|&rgb| Rgb(rgb)))
    }

    /// Build a table from at most [`MAX_COLORS`] colors; extra colors are ignored.
    pub fn from_rgbs(rgbs: impl IntoIterator<Item = Rgb>) -> Self {
        let entries = rgbs
            .into_iter()
            .take(MAX_COLORS)
            .enumerate()
            .map(|(index, rgb)| ColorTableEntry {
                index: ColorIndex(index as u8),
                rgb,
            })
            .collect();
        ColorTable { entries }
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn entries(&self) -> &[ColorTableEntry] {
        &self.entries
    }

    pub fn resolve(&self, index: ColorIndex, line: usize) -> Result<Rgb, Adl2GestaltError> {
        self.entries
            .get(index.0 as usize)
            .map(|entry| entry.rgb)
            .ok_or(Adl2GestaltError::ColorIndex {
                line,
                index: index.0 as i64,
                available: self.entries.len(),
            })
    }
}

/// Accumulates the contents of a `"color map"` block.
///
/// Two layouts exist: a `colors { rrggbb, ... }` list, and (in older files)
/// one `dl_color { r= g= b= inten= }` block per entry.
#[derive(Debug, Default)]
pub(crate) struct ColorMapBuilder {
    declared: Option<usize>,
    rgbs: Vec<Rgb>,
    line: usize,
}

impl ColorMapBuilder {
    pub(crate) fn new(line: usize) -> Self {
        ColorMapBuilder {
            line,
            ..Default::default()
        }
    }

    pub(crate) fn declare(&mut self, ncolors: i64, line: usize) -> Result<(), Adl2GestaltError> {
        match usize::try_from(ncolors) {
            Ok(n) if n <= MAX_COLORS => {
                self.declared = Some(n);
                Ok(())
            }
            _ => Err(Adl2GestaltError::Value {
                line,
                field: "ncolors".to_string(),
                value: ncolors.to_string(),
                expected: "a color count between 0 and 256",
            }),
        }
    }

    pub(crate) fn push_item(
        &mut self,
        item: &RawValue,
        line: usize,
    ) -> Result<(), Adl2GestaltError> {
        let rgb = Rgb::from_hex(item.as_str()).ok_or_else(|| Adl2GestaltError::Value {
            line,
            field: "colors".to_string(),
            value: item.as_str().to_string(),
            expected: "a six digit hex color",
        })?;
        self.push(rgb, line)
    }

    pub(crate) fn push_dl_color(&mut self, group: &AttributeGroup) -> Result<(), Adl2GestaltError> {
        let channel = |key: &'static str| -> Result<u8, Adl2GestaltError> {
            let value = group.int(key).unwrap_or(0);
            u8::try_from(value).map_err(|_| Adl2GestaltError::Value {
                line: group.line,
                field: key.to_string(),
                value: value.to_string(),
                expected: "a color component between 0 and 255",
            })
        };
        let rgb = Rgb::new(channel("r")?, channel("g")?, channel("b")?);
        self.push(rgb, group.line)
    }

    fn push(&mut self, rgb: Rgb, line: usize) -> Result<(), Adl2GestaltError> {
        if self.rgbs.len() >= MAX_COLORS {
            return Err(Adl2GestaltError::Value {
                line,
                field: "colors".to_string(),
                value: (self.rgbs.len() + 1).to_string(),
                expected: "at most 256 colors",
            });
        }
        self.rgbs.push(rgb);
        Ok(())
    }

    pub(crate) fn finish(self) -> ColorTable {
        if self.rgbs.is_empty() {
            log::warn!(
                "Color map on line {} lists no colors; using the default MEDM palette",
                self.line
            );
            return ColorTable::default_medm();
        }
        if let Some(declared) = self.declared {
            if declared != self.rgbs.len() {
                log::warn!(
                    "Color map on line {} declares {} colors but lists {}",
                    self.line,
                    declared,
                    self.rgbs.len()
                );
            }
        }
        ColorTable::from_rgbs(self.rgbs)
    }
}

/// The stable name a color index is emitted under.
pub fn color_name(index: ColorIndex) -> SmolStr {
    format_smolstr!("medm_color_{}", index.0)
}

/// A color definition to be emitted
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResolvedColor {
    pub index: ColorIndex,
    pub name: SmolStr,
    pub rgb: Rgb,
}

/// The deduplicated set of colors one conversion references, ordered by index.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct ResolvedColors {
    colors: BTreeMap<ColorIndex, ResolvedColor>,
}

impl ResolvedColors {
    /// Gather the foreground and background of every widget that will be
    /// emitted. Those are the only colors a Gestalt widget carries.
    ///
    /// Subtrees of widget kinds with no Gestalt counterpart are not visited.
    pub fn collect(tree: &WidgetTree) -> Result<Self, Adl2GestaltError> {
        let mut colors = ResolvedColors::default();
        colors.visit(&tree.root, &tree.colors)?;
        log::debug!("Display references {} distinct colors", colors.len());
        Ok(colors)
    }

    fn visit(&mut self, node: &WidgetNode, table: &ColorTable) -> Result<(), Adl2GestaltError> {
        if crate::mapper::target_kind(node.kind).is_none() {
            return Ok(());
        }
        let (fg, bg) = node.colors();
        for index in fg.into_iter().chain(bg) {
            self.intern(table, index, node.line)?;
        }
        for child in &node.children {
            self.visit(child, table)?;
        }
        Ok(())
    }

    /// Look a color up, resolving and adding it on first use.
    pub(crate) fn intern(
        &mut self,
        table: &ColorTable,
        index: ColorIndex,
        line: usize,
    ) -> Result<&ResolvedColor, Adl2GestaltError> {
        match self.colors.entry(index) {
            Entry::Occupied(entry) => Ok(entry.into_mut()),
            Entry::Vacant(entry) => {
                let rgb = table.resolve(index, line)?;
                Ok(entry.insert(ResolvedColor {
                    index,
                    name: color_name(index),
                    rgb,
                }))
            }
        }
    }

    pub fn get(&self, index: ColorIndex) -> Option<&ResolvedColor> {
        self.colors.get(&index)
    }

    pub fn len(&self) -> usize {
        self.colors.len()
    }

    pub fn is_empty(&self) -> bool {
        self.colors.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &ResolvedColor> {
        self.colors.values()
    }
}
