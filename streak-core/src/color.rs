//! Colors and pick color keys.
//!
//! Parsing covers what scene documents use in practice (`#rgb`,
//! `#rrggbb`, `#rrggbbaa`, `rgb()`, `rgba()` and a short list of names).

use std::collections::BTreeSet;
use std::fmt;
use std::sync::Mutex;

use crate::{SceneError, SceneResult};

/// An 8-bit-per-channel color with a fractional alpha.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Rgba {
    /// Red channel.
    pub r: u8,
    /// Green channel.
    pub g: u8,
    /// Blue channel.
    pub b: u8,
    /// Alpha in `[0, 1]`.
    pub a: f64,
}

const NAMED_COLORS: &[(&str, [u8; 3])] = &[
    ("black", [0, 0, 0]),
    ("white", [255, 255, 255]),
    ("red", [255, 0, 0]),
    ("green", [0, 128, 0]),
    ("lime", [0, 255, 0]),
    ("blue", [0, 0, 255]),
    ("yellow", [255, 255, 0]),
    ("cyan", [0, 255, 255]),
    ("aqua", [0, 255, 255]),
    ("magenta", [255, 0, 255]),
    ("fuchsia", [255, 0, 255]),
    ("gray", [128, 128, 128]),
    ("grey", [128, 128, 128]),
    ("silver", [192, 192, 192]),
    ("maroon", [128, 0, 0]),
    ("olive", [128, 128, 0]),
    ("navy", [0, 0, 128]),
    ("purple", [128, 0, 128]),
    ("teal", [0, 128, 128]),
    ("orange", [255, 165, 0]),
    ("pink", [255, 192, 203]),
    ("brown", [165, 42, 42]),
];

impl Rgba {
    /// Fully transparent black.
    pub const TRANSPARENT: Self = Self::new(0, 0, 0, 0.0);

    /// Create a color.
    #[must_use]
    pub const fn new(r: u8, g: u8, b: u8, a: f64) -> Self {
        Self { r, g, b, a }
    }

    /// Create an opaque color.
    #[must_use]
    pub const fn rgb(r: u8, g: u8, b: u8) -> Self {
        Self::new(r, g, b, 1.0)
    }

    /// Parse a CSS-like color string. Returns `None` when unrecognized.
    #[must_use]
    pub fn parse(input: &str) -> Option<Self> {
        let s = input.trim().to_ascii_lowercase();
        if s == "transparent" {
            return Some(Self::TRANSPARENT);
        }
        if let Some(hex) = s.strip_prefix('#') {
            return parse_hex(hex);
        }
        if let Some(body) = s.strip_prefix("rgba(").and_then(|r| r.strip_suffix(')')) {
            return parse_functional(body, true);
        }
        if let Some(body) = s.strip_prefix("rgb(").and_then(|r| r.strip_suffix(')')) {
            return parse_functional(body, false);
        }
        NAMED_COLORS
            .iter()
            .find(|(name, _)| *name == s)
            .map(|(_, [r, g, b])| Self::rgb(*r, *g, *b))
    }

    /// Linear interpolation per channel; `t` is not clamped.
    #[must_use]
    #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
    pub fn lerp(&self, other: &Self, t: f64) -> Self {
        let channel = |a: u8, b: u8| {
            let v = f64::from(a) + (f64::from(b) - f64::from(a)) * t;
            v.round().clamp(0.0, 255.0) as u8
        };
        Self {
            r: channel(self.r, other.r),
            g: channel(self.g, other.g),
            b: channel(self.b, other.b),
            a: (self.a + (other.a - self.a) * t).clamp(0.0, 1.0),
        }
    }

    /// Same color with a different alpha.
    #[must_use]
    pub fn with_alpha(&self, a: f64) -> Self {
        Self { a, ..*self }
    }
}

impl fmt::Display for Rgba {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "rgba({},{},{},{})", self.r, self.g, self.b, self.a)
    }
}

fn parse_hex(hex: &str) -> Option<Rgba> {
    if !hex.chars().all(|c| c.is_ascii_hexdigit()) {
        return None;
    }
    let nibble = |i: usize| u8::from_str_radix(&hex[i..=i], 16).ok().map(|v| v * 17);
    let byte = |i: usize| u8::from_str_radix(&hex[i..i + 2], 16).ok();
    match hex.len() {
        3 => Some(Rgba::rgb(nibble(0)?, nibble(1)?, nibble(2)?)),
        6 => Some(Rgba::rgb(byte(0)?, byte(2)?, byte(4)?)),
        8 => Some(Rgba::new(
            byte(0)?,
            byte(2)?,
            byte(4)?,
            f64::from(byte(6)?) / 255.0,
        )),
        _ => None,
    }
}

#[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
fn parse_functional(body: &str, with_alpha: bool) -> Option<Rgba> {
    let parts: Vec<&str> = body.split(',').map(str::trim).collect();
    let expected = if with_alpha { 4 } else { 3 };
    if parts.len() != expected {
        return None;
    }
    let mut channels = [0u8; 3];
    for (slot, part) in channels.iter_mut().zip(&parts) {
        let v: f64 = part.parse().ok()?;
        if !v.is_finite() {
            return None;
        }
        *slot = v.round().clamp(0.0, 255.0) as u8;
    }
    let a = if with_alpha {
        let v: f64 = parts[3].parse().ok()?;
        if !v.is_finite() {
            return None;
        }
        v.clamp(0.0, 1.0)
    } else {
        1.0
    };
    Some(Rgba::new(channels[0], channels[1], channels[2], a))
}

/// Largest representable key (24 bits of RGB).
pub const MAX_COLOR_KEY: u32 = 0x00FF_FFFF;

/// A unique solid color identifying one shape on a hit surface.
///
/// Key `0` (opaque black) is never handed out.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ColorKey(u32);

impl ColorKey {
    /// Key from an RGB triple read back from a surface.
    #[must_use]
    pub fn from_rgb(r: u8, g: u8, b: u8) -> Self {
        Self(u32::from(r) << 16 | u32::from(g) << 8 | u32::from(b))
    }

    /// RGB bytes of this key.
    #[must_use]
    pub fn rgb(self) -> [u8; 3] {
        let [_, r, g, b] = self.0.to_be_bytes();
        [r, g, b]
    }

    /// Raw 24-bit value.
    #[must_use]
    pub fn value(self) -> u32 {
        self.0
    }
}

impl fmt::Display for ColorKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{:06x}", self.0)
    }
}

/// Hands out pick keys sequentially and recycles released ones.
#[derive(Debug)]
pub struct ColorKeyAllocator {
    next: u32,
    limit: u32,
    free: BTreeSet<u32>,
    live: u32,
}

impl ColorKeyAllocator {
    /// Allocator over the full 24-bit key space.
    #[must_use]
    pub const fn new() -> Self {
        Self::with_limit(MAX_COLOR_KEY)
    }

    /// Allocator that hands out keys `1..=limit`.
    #[must_use]
    pub const fn with_limit(limit: u32) -> Self {
        Self {
            next: 1,
            limit,
            free: BTreeSet::new(),
            live: 0,
        }
    }

    /// Take a key.
    ///
    /// # Errors
    ///
    /// Returns [`SceneError::ColorKeySpaceExhausted`] when every key is live.
    pub fn allocate(&mut self) -> SceneResult<ColorKey> {
        let key = if let Some(key) = self.free.pop_first() {
            key
        } else if self.next <= self.limit {
            self.next += 1;
            self.next - 1
        } else {
            return Err(SceneError::ColorKeySpaceExhausted(self.live));
        };
        self.live += 1;
        Ok(ColorKey(key))
    }

    /// Return a key for reuse.
    pub fn release(&mut self, key: ColorKey) {
        if key.0 == 0 || key.0 >= self.next || !self.free.insert(key.0) {
            return;
        }
        self.live -= 1;
    }

    /// Number of keys currently handed out.
    #[must_use]
    pub fn live(&self) -> u32 {
        self.live
    }
}

impl Default for ColorKeyAllocator {
    fn default() -> Self {
        Self::new()
    }
}

static KEYS: Mutex<ColorKeyAllocator> = Mutex::new(ColorKeyAllocator::new());

/// Take a key from the process-wide allocator.
pub(crate) fn allocate_key() -> SceneResult<ColorKey> {
    KEYS.lock()
        .unwrap_or_else(std::sync::PoisonError::into_inner)
        .allocate()
}

/// Return a key to the process-wide allocator.
pub(crate) fn release_key(key: ColorKey) {
    KEYS.lock()
        .unwrap_or_else(std::sync::PoisonError::into_inner)
        .release(key);
}
