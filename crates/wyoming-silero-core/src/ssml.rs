//! Global SSML overlay — prosody and break markup merged into request text.
//!
//! Pure functions, no I/O. Markup already present in the request wins over
//! the global settings, attribute by attribute.

use std::fmt;
use std::str::FromStr;
use std::sync::LazyLock;
use std::time::Duration;

use regex::Regex;
use thiserror::Error;

static RE_SPEAK: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?s)^<speak(?:\s[^>]*)?>(.*)</speak>$").unwrap());
static RE_LOCAL_RATE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"<prosody\b[^>]*\brate\s*=").unwrap());
static RE_LOCAL_PITCH: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"<prosody\b[^>]*\bpitch\s*=").unwrap());
static RE_LOCAL_BREAK: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"<break\b").unwrap());
static RE_SSML_TAG: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r"</?(?:speak|break|prosody|emphasis|say-as|sub|phoneme|voice|lang|mark|audio|p|s)(?:\s[^<>]*)?/?>",
    )
    .unwrap()
});
static RE_BREAK_TIME: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^(\d+(?:\.\d+)?)(ms|s)$").unwrap());

/// A keyword value outside its SSML enumeration.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("'{value}' is not one of: {expected}")]
pub struct InvalidKeyword {
    pub value: String,
    pub expected: &'static str,
}

impl InvalidKeyword {
    fn new(value: &str, expected: &'static str) -> Self {
        Self {
            value: value.to_string(),
            expected,
        }
    }
}

// ─── Keyword enumerations ──────────────────────────────────────────────────

/// `<prosody rate="…">` keyword.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProsodyRate {
    XSlow,
    Slow,
    Medium,
    Fast,
    XFast,
}

impl ProsodyRate {
    pub const VALUES: &'static str = "x-slow, slow, medium, fast, x-fast";

    pub fn as_str(self) -> &'static str {
        match self {
            Self::XSlow => "x-slow",
            Self::Slow => "slow",
            Self::Medium => "medium",
            Self::Fast => "fast",
            Self::XFast => "x-fast",
        }
    }
}

impl FromStr for ProsodyRate {
    type Err = InvalidKeyword;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "x-slow" => Ok(Self::XSlow),
            "slow" => Ok(Self::Slow),
            "medium" => Ok(Self::Medium),
            "fast" => Ok(Self::Fast),
            "x-fast" => Ok(Self::XFast),
            _ => Err(InvalidKeyword::new(s, Self::VALUES)),
        }
    }
}

/// `<prosody pitch="…">` keyword.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProsodyPitch {
    XLow,
    Low,
    Medium,
    High,
    XHigh,
}

impl ProsodyPitch {
    pub const VALUES: &'static str = "x-low, low, medium, high, x-high";

    pub fn as_str(self) -> &'static str {
        match self {
            Self::XLow => "x-low",
            Self::Low => "low",
            Self::Medium => "medium",
            Self::High => "high",
            Self::XHigh => "x-high",
        }
    }
}

impl FromStr for ProsodyPitch {
    type Err = InvalidKeyword;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "x-low" => Ok(Self::XLow),
            "low" => Ok(Self::Low),
            "medium" => Ok(Self::Medium),
            "high" => Ok(Self::High),
            "x-high" => Ok(Self::XHigh),
            _ => Err(InvalidKeyword::new(s, Self::VALUES)),
        }
    }
}

/// `<break strength="…">` keyword.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BreakStrength {
    None,
    XWeak,
    Weak,
    Medium,
    Strong,
    XStrong,
}

impl BreakStrength {
    pub const VALUES: &'static str = "none, x-weak, weak, medium, strong, x-strong";

    pub fn as_str(self) -> &'static str {
        match self {
            Self::None => "none",
            Self::XWeak => "x-weak",
            Self::Weak => "weak",
            Self::Medium => "medium",
            Self::Strong => "strong",
            Self::XStrong => "x-strong",
        }
    }
}

impl FromStr for BreakStrength {
    type Err = InvalidKeyword;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "none" => Ok(Self::None),
            "x-weak" => Ok(Self::XWeak),
            "weak" => Ok(Self::Weak),
            "medium" => Ok(Self::Medium),
            "strong" => Ok(Self::Strong),
            "x-strong" => Ok(Self::XStrong),
            _ => Err(InvalidKeyword::new(s, Self::VALUES)),
        }
    }
}

macro_rules! display_as_str {
    ($($ty:ty),*) => {
        $(impl fmt::Display for $ty {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str(self.as_str())
            }
        })*
    };
}

display_as_str!(ProsodyRate, ProsodyPitch, BreakStrength);

/// `<break time="…">` value such as `500ms` or `1.5s`.
#[derive(Debug, Clone, PartialEq)]
pub struct BreakTime {
    text: String,
}

impl BreakTime {
    pub fn as_str(&self) -> &str {
        &self.text
    }
}

impl FromStr for BreakTime {
    type Err = InvalidKeyword;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        const EXPECTED: &str = "a duration such as 500ms or 1.5s";
        let text = s.trim().to_ascii_lowercase();
        let caps = RE_BREAK_TIME
            .captures(&text)
            .ok_or_else(|| InvalidKeyword::new(s, EXPECTED))?;
        let amount: f64 = caps[1]
            .parse()
            .map_err(|_| InvalidKeyword::new(s, EXPECTED))?;
        let secs = if &caps[2] == "ms" { amount / 1000.0 } else { amount };
        // overflow check
        Duration::try_from_secs_f64(secs).map_err(|_| InvalidKeyword::new(s, EXPECTED))?;
        Ok(Self { text })
    }
}

impl fmt::Display for BreakTime {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.text)
    }
}

// ─── Overlay ───────────────────────────────────────────────────────────────

/// The single pause appended to an utterance. Time and strength never combine.
#[derive(Debug, Clone, PartialEq)]
pub enum SsmlBreak {
    Time(BreakTime),
    Strength(BreakStrength),
}

impl SsmlBreak {
    fn tag(&self) -> String {
        match self {
            Self::Time(time) => format!(r#"<break time="{time}"/>"#),
            Self::Strength(strength) => format!(r#"<break strength="{strength}"/>"#),
        }
    }
}

/// Global SSML settings applied to every synthesis request.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SsmlOverlay {
    pub rate: Option<ProsodyRate>,
    pub pitch: Option<ProsodyPitch>,
    pub pause: Option<SsmlBreak>,
}

/// Which attributes the request text already sets on its own.
#[derive(Debug, Default)]
struct LocalMarkup {
    rate: bool,
    pitch: bool,
    pause: bool,
}

impl LocalMarkup {
    fn scan(markup: &str) -> Self {
        Self {
            rate: RE_LOCAL_RATE.is_match(markup),
            pitch: RE_LOCAL_PITCH.is_match(markup),
            pause: RE_LOCAL_BREAK.is_match(markup),
        }
    }
}

impl SsmlOverlay {
    /// Build the overlay. A break time always takes priority over a break
    /// strength; the strength is dropped.
    pub fn new(
        rate: Option<ProsodyRate>,
        pitch: Option<ProsodyPitch>,
        break_time: Option<BreakTime>,
        break_strength: Option<BreakStrength>,
    ) -> Self {
        let pause = match (break_time, break_strength) {
            (Some(time), _) => Some(SsmlBreak::Time(time)),
            (None, Some(strength)) => Some(SsmlBreak::Strength(strength)),
            (None, None) => None,
        };
        Self { rate, pitch, pause }
    }

    pub fn is_empty(&self) -> bool {
        self.rate.is_none() && self.pitch.is_none() && self.pause.is_none()
    }

    /// Merge the overlay into `text`.
    ///
    /// Plain text is escaped and wrapped; `<speak>` documents are unwrapped and
    /// re-wrapped with whatever global attributes the document does not set
    /// itself. Tagged text without a `<speak>` root is kept as markup and gets
    /// the root added. The break only ever goes at the very end.
    pub fn apply(&self, text: &str) -> String {
        if self.is_empty() && !contains_ssml(text) {
            return text.to_string();
        }

        let trimmed = text.trim();
        let document = RE_SPEAK
            .captures(trimmed)
            .map(|caps| caps.get(1).map_or("", |m| m.as_str()).trim());
        // SSML tags without the <speak> wrapper
        let fragment = document.is_none() && !is_ssml(trimmed) && contains_ssml(trimmed);

        let (inner, local) = match document {
            Some(inner) => (inner.to_string(), LocalMarkup::scan(inner)),
            None if fragment => (trimmed.to_string(), LocalMarkup::scan(trimmed)),
            None => (escape_xml(trimmed), LocalMarkup::default()),
        };

        let rate = self.rate.filter(|_| !local.rate);
        let pitch = self.pitch.filter(|_| !local.pitch);
        let pause = self.pause.as_ref().filter(|_| !local.pause);

        if rate.is_none() && pitch.is_none() && pause.is_none() {
            return if fragment {
                format!("<speak>{inner}</speak>")
            } else {
                text.to_string()
            };
        }

        let mut body = inner;

        if rate.is_some() || pitch.is_some() {
            let mut attrs = Vec::with_capacity(2);
            if let Some(rate) = rate {
                attrs.push(format!(r#"rate="{rate}""#));
            }
            if let Some(pitch) = pitch {
                attrs.push(format!(r#"pitch="{pitch}""#));
            }
            body = format!("<prosody {}>{body}</prosody>", attrs.join(" "));
        }

        if let Some(pause) = pause {
            body.push_str(&pause.tag());
        }

        format!("<speak>{body}</speak>")
    }
}

/// Whether the engine should treat `text` as SSML.
pub fn is_ssml(text: &str) -> bool {
    let t = text.trim_start();
    t.starts_with("<speak>") || t.starts_with("<speak ")
}

/// Whether `text` carries SSML markup, with or without the `<speak>` wrapper.
pub fn contains_ssml(text: &str) -> bool {
    is_ssml(text) || RE_SSML_TAG.is_match(text)
}

/// Escape the five XML special characters.
pub fn escape_xml(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&apos;"),
            _ => out.push(c),
        }
    }
    out
}
