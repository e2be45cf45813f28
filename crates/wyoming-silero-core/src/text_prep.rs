//! Text preparation for TTS — digits and clock times spelled out as words.
//!
//! Silero models read only letters, so `10:30` or `21` must reach the engine
//! as words. Pure functions, no I/O. Tags and character references in SSML
//! input are never touched; only the text between them is rewritten.

use std::sync::LazyLock;

use regex::{Captures, Regex};

use crate::ssml::contains_ssml;

/// Tags and character references, both left verbatim inside SSML.
static RE_MARKUP: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"<[^>]*>|&#?\w+;").unwrap());
static RE_TIME: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\b([0-9]{1,2}):([0-9]{2})\b").unwrap());
static RE_NUMBER: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"-?[0-9]+(?:[.,][0-9]+)?").unwrap());

/// Largest integer part that gets spelled out (999 trillion).
pub const MAX_SPELLED: u64 = 999_999_999_999_999;

/// Languages with a number speller.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SpellLanguage {
    English,
    Russian,
    Ukrainian,
    German,
    Spanish,
    French,
}

impl SpellLanguage {
    /// Map an ISO-639-1 (or Silero) language code.
    pub fn from_code(code: &str) -> Option<Self> {
        match code {
            "en" => Some(Self::English),
            "ru" => Some(Self::Russian),
            "uk" | "ua" => Some(Self::Ukrainian),
            "de" => Some(Self::German),
            "es" => Some(Self::Spanish),
            "fr" => Some(Self::French),
            _ => None,
        }
    }

    /// Cardinal number in words.
    pub fn cardinal(self, n: u64) -> String {
        match self {
            Self::English => en_cardinal(n),
            Self::Russian => RUSSIAN.cardinal(n, Gender::Masculine),
            Self::Ukrainian => UKRAINIAN.cardinal(n, Gender::Masculine),
            Self::German => de_cardinal(n),
            Self::Spanish => es_cardinal(n),
            Self::French => fr_cardinal(n),
        }
    }

    fn decimal(self, int: u64, frac: &str) -> String {
        match self {
            Self::English => {
                let digits: Vec<&str> = frac
                    .chars()
                    .filter_map(|c| c.to_digit(10))
                    .map(|d| EN_ONES[d as usize])
                    .collect();
                format!("{} point {}", en_cardinal(int), digits.join(" "))
            }
            Self::Russian => RUSSIAN.decimal(int, frac),
            Self::Ukrainian => UKRAINIAN.decimal(int, frac),
            Self::German => digit_decimal(de_cardinal(int), "Komma", frac, &DE_ONES),
            Self::Spanish => digit_decimal(es_cardinal(int), "coma", frac, &ES_ONES),
            Self::French => digit_decimal(fr_cardinal(int), "virgule", frac, &FR_ONES),
        }
    }

    fn minus(self) -> &'static str {
        match self {
            Self::English => "minus",
            Self::Russian => RUSSIAN.minus,
            Self::Ukrainian => UKRAINIAN.minus,
            Self::German => "minus",
            Self::Spanish => "menos",
            Self::French => "moins",
        }
    }

    /// Clock time as hours and minutes. Zero minutes are left out.
    pub fn time(self, hours: u64, minutes: u64) -> String {
        match self {
            Self::English => {
                let hour_unit = if hours == 1 { "hour" } else { "hours" };
                let mut out = format!("{} {hour_unit}", en_cardinal(hours));
                if minutes > 0 {
                    let minute_unit = if minutes == 1 { "minute" } else { "minutes" };
                    out.push_str(&format!(" {} {minute_unit}", en_cardinal(minutes)));
                }
                out
            }
            Self::Russian => RUSSIAN.time(hours, minutes),
            Self::Ukrainian => UKRAINIAN.time(hours, minutes),
            Self::German => de_time(hours, minutes),
            Self::Spanish => es_time(hours, minutes),
            Self::French => fr_time(hours, minutes),
        }
    }
}

/// Spell out clock times and numbers in `text` for the given language code.
/// Languages without a speller get the text back unchanged.
pub fn normalize_numbers(text: &str, language: &str) -> String {
    let Some(lang) = SpellLanguage::from_code(language) else {
        return text.to_string();
    };

    if !contains_ssml(text) {
        return normalize_segment(text, lang);
    }

    let mut out = String::with_capacity(text.len());
    let mut last = 0;
    for tag in RE_MARKUP.find_iter(text) {
        out.push_str(&normalize_segment(&text[last..tag.start()], lang));
        out.push_str(tag.as_str());
        last = tag.end();
    }
    out.push_str(&normalize_segment(&text[last..], lang));
    out
}

fn normalize_segment(segment: &str, lang: SpellLanguage) -> String {
    let timed = RE_TIME.replace_all(segment, |caps: &Captures| {
        match (caps[1].parse::<u64>(), caps[2].parse::<u64>()) {
            (Ok(h), Ok(m)) if h <= 23 && m <= 59 => lang.time(h, m),
            _ => caps[0].to_string(),
        }
    });

    let mut out = String::with_capacity(timed.len());
    let mut last = 0;
    for m in RE_NUMBER.find_iter(&timed) {
        out.push_str(&timed[last..m.start()]);
        let mut token = m.as_str();

        // "2-3" or "COVID-19": the dash joins words, it is not a sign
        let glued = timed[..m.start()]
            .chars()
            .next_back()
            .is_some_and(char::is_alphanumeric);
        if glued && token.starts_with('-') {
            out.push('-');
            token = &token[1..];
        }

        match spell_number(token, lang) {
            Some(words) => out.push_str(&words),
            None => out.push_str(token),
        }
        last = m.end();
    }
    out.push_str(&timed[last..]);
    out
}

/// Spell one numeric token (`-12`, `3.5`, `0,25`). `None` when out of range.
fn spell_number(token: &str, lang: SpellLanguage) -> Option<String> {
    let (negative, digits) = match token.strip_prefix('-') {
        Some(rest) => (true, rest),
        None => (false, token),
    };

    let (int_part, frac_part) = match digits.split_once(['.', ',']) {
        Some((int, frac)) => (int, Some(frac)),
        None => (digits, None),
    };

    let int: u64 = int_part.parse().ok()?;
    if int > MAX_SPELLED {
        return None;
    }

    let words = match frac_part {
        Some(frac) => lang.decimal(int, frac),
        None => lang.cardinal(int),
    };

    if negative {
        Some(format!("{} {words}", lang.minus()))
    } else {
        Some(words)
    }
}

// ─── English ───────────────────────────────────────────────────────────────

const EN_ONES: [&str; 20] = [
    "zero", "one", "two", "three", "four", "five", "six", "seven", "eight", "nine", "ten",
    "eleven", "twelve", "thirteen", "fourteen", "fifteen", "sixteen", "seventeen", "eighteen",
    "nineteen",
];
const EN_TENS: [&str; 10] = [
    "", "", "twenty", "thirty", "forty", "fifty", "sixty", "seventy", "eighty", "ninety",
];
const EN_SCALES: [&str; 4] = ["thousand", "million", "billion", "trillion"];

fn en_below_hundred(n: u64) -> String {
    let n = n as usize;
    if n < 20 {
        EN_ONES[n].to_string()
    } else if n % 10 == 0 {
        EN_TENS[n / 10].to_string()
    } else {
        format!("{}-{}", EN_TENS[n / 10], EN_ONES[n % 10])
    }
}

fn en_group(n: u64) -> String {
    let hundreds = n / 100;
    let rest = n % 100;
    match (hundreds, rest) {
        (0, _) => en_below_hundred(rest),
        (h, 0) => format!("{} hundred", EN_ONES[h as usize]),
        (h, r) => format!("{} hundred and {}", EN_ONES[h as usize], en_below_hundred(r)),
    }
}

fn en_cardinal(n: u64) -> String {
    if n == 0 {
        return EN_ONES[0].to_string();
    }

    let mut parts = Vec::new();
    for i in (1..=EN_SCALES.len() as u32).rev() {
        let group = (n / 1000u64.pow(i)) % 1000;
        if group > 0 {
            parts.push(format!("{} {}", en_group(group), EN_SCALES[i as usize - 1]));
        }
    }

    let low = n % 1000;
    if low > 0 {
        if n >= 1000 && low < 100 {
            parts.push(format!("and {}", en_group(low)));
        } else {
            parts.push(en_group(low));
        }
    }

    parts.join(" ")
}

/// `<int> <separator> <digit> <digit> ...`
fn digit_decimal(int: String, separator: &str, frac: &str, ones: &[&str]) -> String {
    let mut words = vec![int, separator.to_string()];
    words.extend(
        frac.chars()
            .filter_map(|c| c.to_digit(10))
            .map(|d| ones[d as usize].to_string()),
    );
    words.join(" ")
}

// ─── German ────────────────────────────────────────────────────────────────

const DE_ONES: [&str; 20] = [
    "null", "eins", "zwei", "drei", "vier", "fünf", "sechs", "sieben", "acht", "neun", "zehn",
    "elf", "zwölf", "dreizehn", "vierzehn", "fünfzehn", "sechzehn", "siebzehn", "achtzehn",
    "neunzehn",
];
const DE_TENS: [&str; 10] = [
    "", "", "zwanzig", "dreißig", "vierzig", "fünfzig", "sechzig", "siebzig", "achtzig",
    "neunzig",
];
/// million, billion, trillion as (singular, plural)
const DE_SCALES: [(&str, &str); 3] = [
    ("Million", "Millionen"),
    ("Milliarde", "Milliarden"),
    ("Billion", "Billionen"),
];

/// Units inside a compound: 1 is "ein" (einundzwanzig, einhundert).
fn de_prefix(n: u64) -> &'static str {
    if n == 1 { "ein" } else { DE_ONES[n as usize] }
}

/// 1..=999 as one word. `last` keeps a trailing 1 as "eins".
fn de_group(n: u64, last: bool) -> String {
    let (hundreds, rest) = (n / 100, n % 100);
    let mut out = String::new();
    if hundreds > 0 {
        out.push_str(de_prefix(hundreds));
        out.push_str("hundert");
    }
    match rest {
        0 => {}
        1 if !last => out.push_str("ein"),
        1..=19 => out.push_str(DE_ONES[rest as usize]),
        _ if rest % 10 == 0 => out.push_str(DE_TENS[(rest / 10) as usize]),
        _ => {
            out.push_str(de_prefix(rest % 10));
            out.push_str("und");
            out.push_str(DE_TENS[(rest / 10) as usize]);
        }
    }
    out
}

fn de_cardinal(n: u64) -> String {
    if n == 0 {
        return DE_ONES[0].to_string();
    }

    let mut parts = Vec::new();
    for i in (0..DE_SCALES.len()).rev() {
        let group = (n / 1000u64.pow(i as u32 + 2)) % 1000;
        let (one, many) = DE_SCALES[i];
        match group {
            0 => {}
            1 => parts.push(format!("eine {one}")),
            _ => parts.push(format!("{} {many}", de_group(group, true))),
        }
    }

    let mut tail = String::new();
    let thousands = (n / 1000) % 1000;
    if thousands > 0 {
        tail.push_str(&de_group(thousands, false));
        tail.push_str("tausend");
    }
    let low = n % 1000;
    if low > 0 {
        tail.push_str(&de_group(low, true));
    }
    if !tail.is_empty() {
        parts.push(tail);
    }
    parts.join(" ")
}

/// "zehn Uhr dreißig"; the hour before "Uhr" is "ein", not "eins".
fn de_time(hours: u64, minutes: u64) -> String {
    let hour = if hours == 1 { "ein".to_string() } else { de_cardinal(hours) };
    if minutes > 0 {
        format!("{hour} Uhr {}", de_cardinal(minutes))
    } else {
        format!("{hour} Uhr")
    }
}

// ─── Spanish ───────────────────────────────────────────────────────────────

const ES_ONES: [&str; 30] = [
    "cero", "uno", "dos", "tres", "cuatro", "cinco", "seis", "siete", "ocho", "nueve", "diez",
    "once", "doce", "trece", "catorce", "quince", "dieciséis", "diecisiete", "dieciocho",
    "diecinueve", "veinte", "veintiuno", "veintidós", "veintitrés", "veinticuatro",
    "veinticinco", "veintiséis", "veintisiete", "veintiocho", "veintinueve",
];
const ES_TENS: [&str; 10] = [
    "", "", "", "treinta", "cuarenta", "cincuenta", "sesenta", "setenta", "ochenta", "noventa",
];
const ES_HUNDREDS: [&str; 10] = [
    "", "ciento", "doscientos", "trescientos", "cuatrocientos", "quinientos", "seiscientos",
    "setecientos", "ochocientos", "novecientos",
];

/// Shortened form before a noun: uno → un, veintiuno → veintiún.
fn es_apocope(words: String) -> String {
    if let Some(stem) = words.strip_suffix("veintiuno") {
        format!("{stem}veintiún")
    } else if let Some(stem) = words.strip_suffix("uno") {
        format!("{stem}un")
    } else {
        words
    }
}

/// Feminine form before hora: una, veintiuna.
fn es_feminine(words: String) -> String {
    match words.strip_suffix("uno") {
        Some(stem) => format!("{stem}una"),
        None => words,
    }
}

fn es_group(n: u64) -> String {
    let (hundreds, rest) = (n / 100, n % 100);
    let tail = match rest {
        0 => None,
        1..=29 => Some(ES_ONES[rest as usize].to_string()),
        _ if rest % 10 == 0 => Some(ES_TENS[(rest / 10) as usize].to_string()),
        _ => Some(format!(
            "{} y {}",
            ES_TENS[(rest / 10) as usize],
            ES_ONES[(rest % 10) as usize]
        )),
    };
    match (hundreds, tail) {
        (0, Some(tail)) => tail,
        (1, None) => "cien".to_string(),
        (h, None) => ES_HUNDREDS[h as usize].to_string(),
        (h, Some(tail)) => format!("{} {tail}", ES_HUNDREDS[h as usize]),
    }
}

fn es_below_million(n: u64) -> String {
    let (thousands, low) = (n / 1000, n % 1000);
    let mut parts = Vec::new();
    match thousands {
        0 => {}
        1 => parts.push("mil".to_string()),
        _ => parts.push(format!("{} mil", es_apocope(es_group(thousands)))),
    }
    if low > 0 {
        parts.push(es_group(low));
    }
    parts.join(" ")
}

/// Long scale: 10^9 is "mil millones", 10^12 is "un billón".
fn es_cardinal(n: u64) -> String {
    if n == 0 {
        return ES_ONES[0].to_string();
    }

    let billions = n / 1_000_000_000_000;
    let millions = (n / 1_000_000) % 1_000_000;
    let low = n % 1_000_000;

    let mut parts = Vec::new();
    match billions {
        0 => {}
        1 => parts.push("un billón".to_string()),
        _ => parts.push(format!("{} billones", es_apocope(es_below_million(billions)))),
    }
    match millions {
        0 => {}
        1 => parts.push("un millón".to_string()),
        _ => parts.push(format!("{} millones", es_apocope(es_below_million(millions)))),
    }
    if low > 0 {
        parts.push(es_below_million(low));
    }
    parts.join(" ")
}

fn es_time(hours: u64, minutes: u64) -> String {
    let hour_unit = if hours == 1 { "hora" } else { "horas" };
    let mut out = format!("{} {hour_unit}", es_feminine(es_cardinal(hours)));
    if minutes > 0 {
        let minute_unit = if minutes == 1 { "minuto" } else { "minutos" };
        out.push_str(&format!(" y {} {minute_unit}", es_apocope(es_cardinal(minutes))));
    }
    out
}

// ─── French ────────────────────────────────────────────────────────────────

const FR_ONES: [&str; 17] = [
    "zéro", "un", "deux", "trois", "quatre", "cinq", "six", "sept", "huit", "neuf", "dix",
    "onze", "douze", "treize", "quatorze", "quinze", "seize",
];
const FR_TENS: [&str; 7] = ["", "dix", "vingt", "trente", "quarante", "cinquante", "soixante"];
/// million, milliard, billion as (singular, plural)
const FR_SCALES: [(&str, &str); 3] = [
    ("million", "millions"),
    ("milliard", "milliards"),
    ("billion", "billions"),
];

/// 0..=99. `last` marks the end of the number, where quatre-vingts keeps its s.
fn fr_below_hundred(n: u64, last: bool) -> String {
    let (tens, units) = (n / 10, n % 10);
    match n {
        0..=16 => FR_ONES[n as usize].to_string(),
        17..=19 => format!("dix-{}", FR_ONES[units as usize]),
        70 => "soixante-dix".to_string(),
        71 => "soixante et onze".to_string(),
        72..=79 => format!("soixante-{}", fr_below_hundred(n - 60, last)),
        80 if last => "quatre-vingts".to_string(),
        80 => "quatre-vingt".to_string(),
        81..=99 => format!("quatre-vingt-{}", fr_below_hundred(n - 80, last)),
        _ if units == 0 => FR_TENS[tens as usize].to_string(),
        _ if units == 1 => format!("{} et un", FR_TENS[tens as usize]),
        _ => format!("{}-{}", FR_TENS[tens as usize], FR_ONES[units as usize]),
    }
}

/// 1..=999. Round hundreds take an s only when `last`.
fn fr_group(n: u64, last: bool) -> String {
    let (hundreds, rest) = (n / 100, n % 100);
    let head = match hundreds {
        0 => None,
        1 => Some("cent".to_string()),
        h if rest == 0 && last => Some(format!("{} cents", FR_ONES[h as usize])),
        h => Some(format!("{} cent", FR_ONES[h as usize])),
    };
    match (head, rest) {
        (Some(head), 0) => head,
        (Some(head), r) => format!("{head} {}", fr_below_hundred(r, last)),
        (None, r) => fr_below_hundred(r, last),
    }
}

fn fr_cardinal(n: u64) -> String {
    if n == 0 {
        return FR_ONES[0].to_string();
    }

    let mut parts = Vec::new();
    for i in (0..FR_SCALES.len()).rev() {
        let group = (n / 1000u64.pow(i as u32 + 2)) % 1000;
        let (one, many) = FR_SCALES[i];
        match group {
            0 => {}
            1 => parts.push(format!("un {one}")),
            _ => parts.push(format!("{} {many}", fr_group(group, true))),
        }
    }

    // mille is invariable and never preceded by "un"
    match (n / 1000) % 1000 {
        0 => {}
        1 => parts.push("mille".to_string()),
        thousands => parts.push(format!("{} mille", fr_group(thousands, false))),
    }
    let low = n % 1000;
    if low > 0 {
        parts.push(fr_group(low, true));
    }
    parts.join(" ")
}

/// Feminine agreement with heure and minute: un → une.
fn fr_feminine(words: String) -> String {
    match words.strip_suffix("un") {
        Some(stem) if stem.is_empty() || stem.ends_with(' ') => format!("{stem}une"),
        _ => words,
    }
}

fn fr_time(hours: u64, minutes: u64) -> String {
    let hour_unit = if hours <= 1 { "heure" } else { "heures" };
    let mut out = format!("{} {hour_unit}", fr_feminine(fr_cardinal(hours)));
    if minutes > 0 {
        let minute_unit = if minutes == 1 { "minute" } else { "minutes" };
        out.push_str(&format!(" {} {minute_unit}", fr_feminine(fr_cardinal(minutes))));
    }
    out
}

// ─── Russian / Ukrainian ───────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Gender {
    Masculine,
    Feminine,
}

/// Singular, paucal (2–4) and plural forms of a counted noun.
struct Forms(&'static str, &'static str, &'static str);

impl Forms {
    fn pick(&self, n: u64) -> &'static str {
        let (last, last_two) = (n % 10, n % 100);
        if last == 1 && last_two != 11 {
            self.0
        } else if (2..=4).contains(&last) && !(12..=14).contains(&last_two) {
            self.1
        } else {
            self.2
        }
    }
}

struct Slavic {
    ones: [&'static str; 20],
    one_feminine: &'static str,
    two_feminine: &'static str,
    tens: [&'static str; 10],
    hundreds: [&'static str; 10],
    /// thousand, million, billion, trillion
    scales: [(Forms, Gender); 4],
    whole: Forms,
    /// tenths, hundredths, thousandths
    fractions: [Forms; 3],
    comma: &'static str,
    minus: &'static str,
    hour: (Forms, Gender),
    minute: Forms,
}

impl Slavic {
    fn unit(&self, n: u64, gender: Gender) -> &'static str {
        match (n, gender) {
            (1, Gender::Feminine) => self.one_feminine,
            (2, Gender::Feminine) => self.two_feminine,
            _ => self.ones[n as usize],
        }
    }

    fn group(&self, n: u64, gender: Gender) -> Vec<&'static str> {
        let mut words = Vec::with_capacity(3);
        let hundreds = (n / 100) as usize;
        let rest = n % 100;
        if hundreds > 0 {
            words.push(self.hundreds[hundreds]);
        }
        if rest >= 20 {
            words.push(self.tens[(rest / 10) as usize]);
            if rest % 10 > 0 {
                words.push(self.unit(rest % 10, gender));
            }
        } else if rest > 0 {
            words.push(self.unit(rest, gender));
        }
        words
    }

    fn cardinal(&self, n: u64, gender: Gender) -> String {
        if n == 0 {
            return self.ones[0].to_string();
        }

        let mut words = Vec::new();
        for i in (1..=self.scales.len() as u32).rev() {
            let group = (n / 1000u64.pow(i)) % 1000;
            if group > 0 {
                let (forms, scale_gender) = &self.scales[i as usize - 1];
                words.extend(self.group(group, *scale_gender));
                words.push(forms.pick(group));
            }
        }
        let low = n % 1000;
        if low > 0 {
            words.extend(self.group(low, gender));
        }
        words.join(" ")
    }

    fn decimal(&self, int: u64, frac: &str) -> String {
        match (frac.len(), frac.parse::<u64>()) {
            (1..=3, Ok(value)) => format!(
                "{} {} {} {}",
                self.cardinal(int, Gender::Feminine),
                self.whole.pick(int),
                self.cardinal(value, Gender::Feminine),
                self.fractions[frac.len() - 1].pick(value),
            ),
            _ => {
                let mut words = vec![self.cardinal(int, Gender::Masculine), self.comma.to_string()];
                words.extend(
                    frac.chars()
                        .filter_map(|c| c.to_digit(10))
                        .map(|d| self.ones[d as usize].to_string()),
                );
                words.join(" ")
            }
        }
    }

    fn time(&self, hours: u64, minutes: u64) -> String {
        let (hour_forms, hour_gender) = &self.hour;
        let mut out = format!(
            "{} {}",
            self.cardinal(hours, *hour_gender),
            hour_forms.pick(hours)
        );
        if minutes > 0 {
            out.push_str(&format!(
                " {} {}",
                self.cardinal(minutes, Gender::Feminine),
                self.minute.pick(minutes)
            ));
        }
        out
    }
}

static RUSSIAN: Slavic = Slavic {
    ones: [
        "ноль", "один", "два", "три", "четыре", "пять", "шесть", "семь", "восемь", "девять",
        "десять", "одиннадцать", "двенадцать", "тринадцать", "четырнадцать", "пятнадцать",
        "шестнадцать", "семнадцать", "восемнадцать", "девятнадцать",
    ],
    one_feminine: "одна",
    two_feminine: "две",
    tens: [
        "", "", "двадцать", "тридцать", "сорок", "пятьдесят", "шестьдесят", "семьдесят",
        "восемьдесят", "девяносто",
    ],
    hundreds: [
        "", "сто", "двести", "триста", "четыреста", "пятьсот", "шестьсот", "семьсот",
        "восемьсот", "девятьсот",
    ],
    scales: [
        (Forms("тысяча", "тысячи", "тысяч"), Gender::Feminine),
        (Forms("миллион", "миллиона", "миллионов"), Gender::Masculine),
        (Forms("миллиард", "миллиарда", "миллиардов"), Gender::Masculine),
        (Forms("триллион", "триллиона", "триллионов"), Gender::Masculine),
    ],
    whole: Forms("целая", "целых", "целых"),
    fractions: [
        Forms("десятая", "десятых", "десятых"),
        Forms("сотая", "сотых", "сотых"),
        Forms("тысячная", "тысячных", "тысячных"),
    ],
    comma: "запятая",
    minus: "минус",
    hour: (Forms("час", "часа", "часов"), Gender::Masculine),
    minute: Forms("минута", "минуты", "минут"),
};

static UKRAINIAN: Slavic = Slavic {
    ones: [
        "нуль", "один", "два", "три", "чотири", "п'ять", "шість", "сім", "вісім", "дев'ять",
        "десять", "одинадцять", "дванадцять", "тринадцять", "чотирнадцять", "п'ятнадцять",
        "шістнадцять", "сімнадцять", "вісімнадцять", "дев'ятнадцять",
    ],
    one_feminine: "одна",
    two_feminine: "дві",
    tens: [
        "", "", "двадцять", "тридцять", "сорок", "п'ятдесят", "шістдесят", "сімдесят",
        "вісімдесят", "дев'яносто",
    ],
    hundreds: [
        "", "сто", "двісті", "триста", "чотириста", "п'ятсот", "шістсот", "сімсот", "вісімсот",
        "дев'ятсот",
    ],
    scales: [
        (Forms("тисяча", "тисячі", "тисяч"), Gender::Feminine),
        (Forms("мільйон", "мільйони", "мільйонів"), Gender::Masculine),
        (Forms("мільярд", "мільярди", "мільярдів"), Gender::Masculine),
        (Forms("трильйон", "трильйони", "трильйонів"), Gender::Masculine),
    ],
    whole: Forms("ціла", "цілі", "цілих"),
    fractions: [
        Forms("десята", "десяті", "десятих"),
        Forms("сота", "соті", "сотих"),
        Forms("тисячна", "тисячні", "тисячних"),
    ],
    comma: "кома",
    minus: "мінус",
    hour: (Forms("година", "години", "годин"), Gender::Feminine),
    minute: Forms("хвилина", "хвилини", "хвилин"),
};

#[cfg(test)]
mod tests {
    use super::*;

    // ── English ─────────────────────────────────────────────────────

    #[test]
    fn english_cardinals() {
        let en = SpellLanguage::English;
        assert_eq!(en.cardinal(0), "zero");
        assert_eq!(en.cardinal(21), "twenty-one");
        assert_eq!(en.cardinal(40), "forty");
        assert_eq!(en.cardinal(123), "one hundred and twenty-three");
        assert_eq!(en.cardinal(1001), "one thousand and one");
        assert_eq!(en.cardinal(2_000_000), "two million");
        assert_eq!(
            en.cardinal(1_250_300),
            "one million two hundred and fifty thousand three hundred"
        );
    }

    #[test]
    fn english_sentence() {
        assert_eq!(
            normalize_numbers("I have 21 apples and -5 pears", "en"),
            "I have twenty-one apples and minus five pears"
        );
        assert_eq!(normalize_numbers("pi is 3.14", "en"), "pi is three point one four");
    }

    #[test]
    fn dash_between_numbers_is_not_a_sign() {
        assert_eq!(normalize_numbers("pages 2-3", "en"), "pages two-three");
    }

    #[test]
    fn english_times() {
        assert_eq!(normalize_numbers("at 10:30", "en"), "at ten hours thirty minutes");
        assert_eq!(normalize_numbers("1:01", "en"), "one hour one minute");
        assert_eq!(normalize_numbers("7:00", "en"), "seven hours");
    }

    #[test]
    fn out_of_range_time_is_read_as_numbers() {
        assert_eq!(normalize_numbers("25:61", "en"), "twenty-five:sixty-one");
    }

    // ── Russian ─────────────────────────────────────────────────────

    #[test]
    fn russian_cardinals() {
        let ru = SpellLanguage::Russian;
        assert_eq!(ru.cardinal(5), "пять");
        assert_eq!(ru.cardinal(1000), "одна тысяча");
        assert_eq!(ru.cardinal(2001), "две тысячи один");
        assert_eq!(ru.cardinal(11_000), "одиннадцать тысяч");
        assert_eq!(
            ru.cardinal(1_234_567),
            "один миллион двести тридцать четыре тысячи пятьсот шестьдесят семь"
        );
    }

    #[test]
    fn russian_times_use_feminine_minutes() {
        assert_eq!(normalize_numbers("21:01", "ru"), "двадцать один час одна минута");
        assert_eq!(normalize_numbers("22:32", "ru"), "двадцать два часа тридцать две минуты");
        assert_eq!(normalize_numbers("11:11", "ru"), "одиннадцать часов одиннадцать минут");
        assert_eq!(normalize_numbers("5:00", "ru"), "пять часов");
    }

    #[test]
    fn russian_decimals() {
        assert_eq!(normalize_numbers("3,5", "ru"), "три целых пять десятых");
        assert_eq!(normalize_numbers("1.25", "ru"), "одна целая двадцать пять сотых");
        assert_eq!(
            normalize_numbers("0.1234", "ru"),
            "ноль запятая один два три четыре"
        );
    }

    // ── Ukrainian ───────────────────────────────────────────────────

    #[test]
    fn ukrainian_times_and_numbers() {
        assert_eq!(
            normalize_numbers("2:22", "uk"),
            "дві години двадцять дві хвилини"
        );
        assert_eq!(normalize_numbers("5:00", "ua"), "п'ять годин");
        assert_eq!(SpellLanguage::Ukrainian.cardinal(2000), "дві тисячі");
        assert_eq!(normalize_numbers("2.5", "uk"), "дві цілі п'ять десятих");
    }

    // ── German ──────────────────────────────────────────────────────

    #[test]
    fn german_cardinals() {
        let de = SpellLanguage::German;
        assert_eq!(de.cardinal(1), "eins");
        assert_eq!(de.cardinal(21), "einundzwanzig");
        assert_eq!(de.cardinal(101), "einhunderteins");
        assert_eq!(de.cardinal(1000), "eintausend");
        assert_eq!(de.cardinal(2345), "zweitausenddreihundertfünfundvierzig");
        assert_eq!(de.cardinal(1_000_000), "eine Million");
        assert_eq!(de.cardinal(3_000_021), "drei Millionen einundzwanzig");
    }

    #[test]
    fn german_sentence_and_times() {
        assert_eq!(normalize_numbers("Es ist 10:30", "de"), "Es ist zehn Uhr dreißig");
        assert_eq!(normalize_numbers("1:00", "de"), "ein Uhr");
        assert_eq!(normalize_numbers("-2,5", "de"), "minus zwei Komma fünf");
    }

    // ── Spanish ─────────────────────────────────────────────────────

    #[test]
    fn spanish_cardinals() {
        let es = SpellLanguage::Spanish;
        assert_eq!(es.cardinal(21), "veintiuno");
        assert_eq!(es.cardinal(35), "treinta y cinco");
        assert_eq!(es.cardinal(100), "cien");
        assert_eq!(es.cardinal(101), "ciento uno");
        assert_eq!(es.cardinal(500), "quinientos");
        assert_eq!(es.cardinal(1000), "mil");
        assert_eq!(es.cardinal(21_000), "veintiún mil");
        assert_eq!(es.cardinal(1_000_000), "un millón");
        assert_eq!(es.cardinal(2_000_000_000), "dos mil millones");
    }

    #[test]
    fn spanish_times_agree_with_units() {
        assert_eq!(normalize_numbers("1:01", "es"), "una hora y un minuto");
        assert_eq!(normalize_numbers("21:21", "es"), "veintiuna horas y veintiún minutos");
        assert_eq!(normalize_numbers("3,5", "es"), "tres coma cinco");
    }

    // ── French ──────────────────────────────────────────────────────

    #[test]
    fn french_cardinals() {
        let fr = SpellLanguage::French;
        assert_eq!(fr.cardinal(21), "vingt et un");
        assert_eq!(fr.cardinal(70), "soixante-dix");
        assert_eq!(fr.cardinal(71), "soixante et onze");
        assert_eq!(fr.cardinal(77), "soixante-dix-sept");
        assert_eq!(fr.cardinal(80), "quatre-vingts");
        assert_eq!(fr.cardinal(91), "quatre-vingt-onze");
        assert_eq!(fr.cardinal(200), "deux cents");
        assert_eq!(fr.cardinal(201), "deux cent un");
        assert_eq!(fr.cardinal(1000), "mille");
        assert_eq!(fr.cardinal(80_000), "quatre-vingt mille");
        assert_eq!(fr.cardinal(2_000_000), "deux millions");
    }

    #[test]
    fn french_times_are_feminine() {
        assert_eq!(normalize_numbers("1:21", "fr"), "une heure vingt et une minutes");
        assert_eq!(normalize_numbers("10:30", "fr"), "dix heures trente minutes");
        assert_eq!(normalize_numbers("-1.5", "fr"), "moins un virgule cinq");
    }

    // ── general ─────────────────────────────────────────────────────

    #[test]
    fn unsupported_language_is_unchanged() {
        assert_eq!(normalize_numbers("soat 10:30", "uz"), "soat 10:30");
    }

    #[test]
    fn ssml_attributes_are_untouched() {
        let input = r#"<speak>Wait <break time="500ms"/> 5 seconds</speak>"#;
        assert_eq!(
            normalize_numbers(input, "en"),
            r#"<speak>Wait <break time="500ms"/> five seconds</speak>"#
        );
    }

    #[test]
    fn bare_ssml_attributes_are_untouched() {
        assert_eq!(
            normalize_numbers(r#"Hello <break time="500ms"/> world 2"#, "en"),
            r#"Hello <break time="500ms"/> world two"#
        );
    }

    #[test]
    fn character_references_are_untouched() {
        let input = "<speak>Tom &#38; Jerry</speak>";
        assert_eq!(normalize_numbers(input, "en"), input);
        assert_eq!(
            normalize_numbers("<speak>7 &amp; 8</speak>", "en"),
            "<speak>seven &amp; eight</speak>"
        );
    }

    #[test]
    fn plain_text_angle_brackets_are_not_markup() {
        assert_eq!(normalize_numbers("a <5> b", "en"), "a <five> b");
    }

    #[test]
    fn huge_numbers_are_left_alone() {
        assert_eq!(normalize_numbers("1000000000000000", "en"), "1000000000000000");
        assert_eq!(
            normalize_numbers("12345678901234567890", "ru"),
            "12345678901234567890"
        );
    }

    #[test]
    fn text_without_digits_is_identical() {
        let text = "Привет, мир!";
        assert_eq!(normalize_numbers(text, "ru"), text);
    }
}
