//! Text conversion over a loaded mapping
//!
//! [`Converter`] wraps a mapping and turns input text into a stream of
//! [`ConvPart`] spans, optionally withholding spans matched by an exclusion
//! pattern. Output renderers turn the stream into plain text, inline markup,
//! an HTML fragment, or a JSON event list.

use std::path::Path;
use std::str::FromStr;

use regex::Regex;
use serde::{Deserialize, Serialize};

use crate::dict::{ConvPart, Dict, DictFormat, DictMatch, Table, Trie};
use crate::error::HanconvError;
use crate::Result;

/// Output renderings for [`Converter::convert_formatted`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TextFormat {
    /// Default candidates only.
    Txt,
    /// Inline markup: `{{key->v1|v2}}`, collapsed to `{{key}}` for an
    /// identity conversion.
    Txtm,
    /// HTML fragment with the original hidden and alternatives listed.
    Html,
    /// One JSON element per span.
    Json,
}

impl FromStr for TextFormat {
    type Err = HanconvError;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "txt" => Ok(TextFormat::Txt),
            "txtm" => Ok(TextFormat::Txtm),
            "html" => Ok(TextFormat::Html),
            "json" => Ok(TextFormat::Json),
            other => Err(HanconvError::UnsupportedFormat(other.to_string())),
        }
    }
}

/// Runtime-selected mapping backend, resolved once when a dictionary file is
/// opened.
#[derive(Debug, Clone)]
pub enum AnyDict {
    Table(Table),
    Trie(Trie),
}

impl Default for AnyDict {
    fn default() -> Self {
        AnyDict::Table(Table::default())
    }
}

impl Dict for AnyDict {
    fn len(&self) -> usize {
        match self {
            AnyDict::Table(d) => d.len(),
            AnyDict::Trie(d) => d.len(),
        }
    }

    fn get(&self, key: &str) -> Option<&[String]> {
        match self {
            AnyDict::Table(d) => d.get(key),
            AnyDict::Trie(d) => d.get(key),
        }
    }

    fn add(&mut self, key: &str, values: &[String], skip_dedup: bool) {
        match self {
            AnyDict::Table(d) => d.add(key, values, skip_dedup),
            AnyDict::Trie(d) => d.add(key, values, skip_dedup),
        }
    }

    fn remove(&mut self, key: &str) -> Option<Vec<String>> {
        match self {
            AnyDict::Table(d) => d.remove(key),
            AnyDict::Trie(d) => d.remove(key),
        }
    }

    fn iter(&self) -> Box<dyn Iterator<Item = (String, &[String])> + '_> {
        match self {
            AnyDict::Table(d) => d.iter(),
            AnyDict::Trie(d) => d.iter(),
        }
    }

    fn match_at<'t>(
        &self,
        units: &'t [String],
        pos: usize,
        maxpos: usize,
    ) -> Option<DictMatch<'t, '_>> {
        match self {
            AnyDict::Table(d) => d.match_at(units, pos, maxpos),
            AnyDict::Trie(d) => d.match_at(units, pos, maxpos),
        }
    }
}

#[derive(Debug)]
pub struct Converter<D: Dict> {
    dict: D,
}

impl Converter<AnyDict> {
    /// Open a dictionary file, picking the backend from the format: nested
    /// trie JSON loads into a [`Trie`], everything else into a [`Table`].
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let fmt = DictFormat::from_path(path);
        let mut dict = match fmt {
            DictFormat::Tlist => AnyDict::Trie(Trie::default()),
            DictFormat::List | DictFormat::Jlist => AnyDict::Table(Table::default()),
        };
        dict.load_path_as(path, fmt)?;
        log::debug!("opened {} ({:?})", path.display(), fmt);
        Ok(Converter::new(dict))
    }
}

impl<D: Dict> Converter<D> {
    pub fn new(dict: D) -> Self {
        Converter { dict }
    }

    pub fn dict(&self) -> &D {
        &self.dict
    }

    pub fn into_dict(self) -> D {
        self.dict
    }

    /// Convert `text` into a span stream. Spans matched by `exclude` bypass
    /// conversion: when a capture group whose name starts with `return`
    /// participates in the match, only its content is kept (nothing at all
    /// when it is empty), otherwise the whole match is kept verbatim.
    pub fn convert(&self, text: &str, exclude: Option<&Regex>) -> Vec<ConvPart> {
        let mut parts = Vec::new();
        let Some(re) = exclude else {
            self.convert_segment(text, &mut parts);
            return parts;
        };
        let mut last = 0;
        for caps in re.captures_iter(text) {
            let Some(whole) = caps.get(0) else {
                continue;
            };
            self.convert_segment(&text[last..whole.start()], &mut parts);
            last = whole.end();
            let returned = re
                .capture_names()
                .flatten()
                .filter(|name| name.starts_with("return"))
                .find_map(|name| caps.name(name));
            match returned {
                Some(group) => {
                    if !group.as_str().is_empty() {
                        parts.push(ConvPart::Excluded(group.as_str().to_string()));
                    }
                }
                None => parts.push(ConvPart::Excluded(whole.as_str().to_string())),
            }
        }
        self.convert_segment(&text[last..], &mut parts);
        parts
    }

    fn convert_segment(&self, segment: &str, parts: &mut Vec<ConvPart>) {
        if segment.is_empty() {
            return;
        }
        parts.extend(self.dict.apply(segment));
    }

    /// Default-candidate conversion of the whole text.
    pub fn convert_text(&self, text: &str, exclude: Option<&Regex>) -> String {
        self.convert(text, exclude)
            .iter()
            .map(ConvPart::default_text)
            .collect()
    }

    /// Convert and render in the requested output format.
    pub fn convert_formatted(
        &self,
        text: &str,
        format: TextFormat,
        exclude: Option<&Regex>,
    ) -> Result<String> {
        let parts = self.convert(text, exclude);
        match format {
            TextFormat::Txt => Ok(parts.iter().map(ConvPart::default_text).collect()),
            TextFormat::Txtm => Ok(parts.iter().map(render_txtm).collect()),
            TextFormat::Html => Ok(parts.iter().map(render_html).collect()),
            TextFormat::Json => Ok(serde_json::to_string(&parts)?),
        }
    }

    /// All possible full-text conversions, via the mapping's enumerator.
    pub fn apply_enum(&self, text: &str, include_short: bool, include_self: bool) -> Vec<String> {
        self.dict.apply_enum(text, include_short, include_self)
    }
}

fn render_txtm(part: &ConvPart) -> String {
    match part {
        ConvPart::Literal(text) | ConvPart::Excluded(text) => text.clone(),
        ConvPart::Converted(conv) => {
            let key = conv.key();
            if conv.values.len() == 1 && conv.values[0] == key {
                format!("{{{{{key}}}}}")
            } else {
                format!("{{{{{}->{}}}}}", key, conv.values.join("|"))
            }
        }
    }
}

fn render_html(part: &ConvPart) -> String {
    match part {
        ConvPart::Literal(text) | ConvPart::Excluded(text) => html_escape(text),
        ConvPart::Converted(conv) => {
            let mut out = String::new();
            if conv.units.len() == 1 {
                out.push_str("<a atomic>");
            } else {
                out.push_str("<a>");
            }
            out.push_str("<del hidden>");
            out.push_str(&html_escape(&conv.key()));
            out.push_str("</del>");
            for (i, value) in conv.values.iter().enumerate() {
                if i == 0 {
                    out.push_str("<ins>");
                } else {
                    out.push_str("<ins hidden>");
                }
                out.push_str(&html_escape(value));
                out.push_str("</ins>");
            }
            out.push_str("</a>");
            out
        }
    }
}

fn html_escape(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            _ => out.push(c),
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dict::testutil::dict_from;
    use crate::dict::Conv;

    fn sample() -> Converter<Trie> {
        let dict: Trie = dict_from(&[
            ("⿰虫风", &["𧍯"]),
            ("沙⿰虫风", &["沙虱"]),
            ("干", &["幹", "乾", "干"]),
            ("干涉", &["干涉"]),
            ("会", &["會"]),
            ("简", &["簡"]),
            ("虫", &["蟲"]),
            ("转", &["轉"]),
            ("错", &["錯"]),
            ("风", &["風"]),
        ]);
        Converter::new(dict)
    }

    fn lit(text: &str) -> ConvPart {
        ConvPart::Literal(text.to_string())
    }

    fn conv(units: &[&str], values: &[&str]) -> ConvPart {
        ConvPart::Converted(Conv {
            units: units.iter().map(|u| u.to_string()).collect(),
            values: values.iter().map(|v| v.to_string()).collect(),
        })
    }

    #[test]
    fn test_convert_parts() {
        let converter = sample();
        let output = converter.convert("干了 干涉 ⿱艹⿰虫风不简", None);
        assert_eq!(
            vec![
                conv(&["干"], &["幹", "乾", "干"]),
                lit("了"),
                lit(" "),
                conv(&["干", "涉"], &["干涉"]),
                lit(" "),
                lit("⿱艹⿰虫风"),
                lit("不"),
                conv(&["简"], &["簡"]),
            ],
            output
        );
    }

    #[test]
    fn test_convert_text() {
        let converter = sample();
        assert_eq!(
            "幹了 干涉 ⿱艹⿰虫风不需要簡轉繁",
            converter.convert_text("干了 干涉 ⿱艹⿰虫风不需要简转繁", None)
        );
    }

    #[test]
    fn test_convert_formatted() {
        let converter = sample();
        let input = "干了 干涉\n⿰虫风需要简转繁\n⿱艹⿰虫风不需要简转繁\n沙⿰虫风也简转繁\n";

        let expected = "幹了 干涉\n𧍯需要簡轉繁\n⿱艹⿰虫风不需要簡轉繁\n沙虱也簡轉繁\n";
        assert_eq!(
            expected,
            converter
                .convert_formatted(input, TextFormat::Txt, None)
                .unwrap()
        );

        let expected = "{{干->幹|乾|干}}了 {{干涉}}\n\
                        {{⿰虫风->𧍯}}需要{{简->簡}}{{转->轉}}繁\n\
                        ⿱艹⿰虫风不需要{{简->簡}}{{转->轉}}繁\n\
                        {{沙⿰虫风->沙虱}}也{{简->簡}}{{转->轉}}繁\n";
        assert_eq!(
            expected,
            converter
                .convert_formatted(input, TextFormat::Txtm, None)
                .unwrap()
        );

        let expected = "<a atomic><del hidden>干</del><ins>幹</ins><ins hidden>乾</ins><ins hidden>干</ins></a>了 <a><del hidden>干涉</del><ins>干涉</ins></a>\n\
                        <a atomic><del hidden>⿰虫风</del><ins>𧍯</ins></a>需要<a atomic><del hidden>简</del><ins>簡</ins></a><a atomic><del hidden>转</del><ins>轉</ins></a>繁\n\
                        ⿱艹⿰虫风不需要<a atomic><del hidden>简</del><ins>簡</ins></a><a atomic><del hidden>转</del><ins>轉</ins></a>繁\n\
                        <a><del hidden>沙⿰虫风</del><ins>沙虱</ins></a>也<a atomic><del hidden>简</del><ins>簡</ins></a><a atomic><del hidden>转</del><ins>轉</ins></a>繁\n";
        assert_eq!(
            expected,
            converter
                .convert_formatted(input, TextFormat::Html, None)
                .unwrap()
        );

        let expected = concat!(
            r#"[[["干"],["幹","乾","干"]],"了"," ",[["干","涉"],["干涉"]],"\n","#,
            r#"[["⿰虫风"],["𧍯"]],"需","要",[["简"],["簡"]],[["转"],["轉"]],"繁","\n","#,
            r#""⿱艹⿰虫风","不","需","要",[["简"],["簡"]],[["转"],["轉"]],"繁","\n","#,
            r#"[["沙","⿰虫风"],["沙虱"]],"也",[["简"],["簡"]],[["转"],["轉"]],"繁","\n"]"#,
        );
        assert_eq!(
            expected,
            converter
                .convert_formatted(input, TextFormat::Json, None)
                .unwrap()
        );
    }

    #[test]
    fn test_convert_exclude_return_group() {
        let dict: Table = dict_from(&[("卜", &["卜", "蔔"])]);
        let converter = Converter::new(dict);
        let re = Regex::new(r"-\{(?P<return>.*?)\}-").unwrap();
        let output = converter.convert("-{尸}-廿山女田卜", Some(&re));
        assert_eq!(
            vec![
                ConvPart::Excluded("尸".to_string()),
                lit("廿"),
                lit("山"),
                lit("女"),
                lit("田"),
                conv(&["卜"], &["卜", "蔔"]),
            ],
            output
        );
    }

    #[test]
    fn test_convert_exclude_empty_return_group() {
        // an empty return group drops the span entirely
        let dict: Table = dict_from(&[("驰", &["馳"])]);
        let converter = Converter::new(dict);
        let re = Regex::new(r"-\{(?P<return>.*?)\}-").unwrap();
        let output = converter.convert("奔-{}-驰", Some(&re));
        assert_eq!(vec![lit("奔"), conv(&["驰"], &["馳"])], output);
    }

    #[test]
    fn test_convert_exclude_whole_match() {
        let dict: Table = dict_from(&[("奔馳", &["賓士"])]);
        let converter = Converter::new(dict);
        let re = Regex::new(r"「.*?」").unwrap();
        let output = converter.convert("「奔馳」不是奔馳", Some(&re));
        assert_eq!(
            vec![
                ConvPart::Excluded("「奔馳」".to_string()),
                lit("不"),
                lit("是"),
                conv(&["奔", "馳"], &["賓士"]),
            ],
            output
        );
    }

    #[test]
    fn test_convert_exclude_unnamed_group_keeps_whole_match() {
        // only groups named return* participate in span replacement
        let dict: Table = dict_from(&[("奔馳", &["賓士"])]);
        let converter = Converter::new(dict);
        let re = Regex::new(r"「(?P<nomatter>.*?)」").unwrap();
        let output = converter.convert("「奔馳」不是奔馳", Some(&re));
        assert_eq!(
            vec![
                ConvPart::Excluded("「奔馳」".to_string()),
                lit("不"),
                lit("是"),
                conv(&["奔", "馳"], &["賓士"]),
            ],
            output
        );
    }

    #[test]
    fn test_convert_exclude_alternate_return_groups() {
        let dict: Table = dict_from(&[("财", &["財"]), ("干", &["幹", "乾", "干"])]);
        let converter = Converter::new(dict);
        let re = Regex::new(r"-\{(?P<return>.*?)\}-|<!-->(?P<return2>.*?)<-->").unwrap();
        let output = converter.convert("-{尸}-大口 <!-->财干<-->", Some(&re));
        assert_eq!(
            vec![
                ConvPart::Excluded("尸".to_string()),
                lit("大"),
                lit("口"),
                lit(" "),
                ConvPart::Excluded("财干".to_string()),
            ],
            output
        );
    }

    #[test]
    fn test_convert_formatted_exclude() {
        let dict: Table = dict_from(&[("卜", &["卜", "蔔"])]);
        let converter = Converter::new(dict);
        let re = Regex::new(r"-\{(?P<return>.*?)\}-").unwrap();
        let input = "-{尸}-廿山女田卜";

        assert_eq!(
            "尸廿山女田卜",
            converter
                .convert_formatted(input, TextFormat::Txt, Some(&re))
                .unwrap()
        );
        assert_eq!(
            "尸廿山女田{{卜->卜|蔔}}",
            converter
                .convert_formatted(input, TextFormat::Txtm, Some(&re))
                .unwrap()
        );
        assert_eq!(
            "尸廿山女田<a atomic><del hidden>卜</del><ins>卜</ins><ins hidden>蔔</ins></a>",
            converter
                .convert_formatted(input, TextFormat::Html, Some(&re))
                .unwrap()
        );
        assert_eq!(
            r#"[["尸"],"廿","山","女","田",[["卜"],["卜","蔔"]]]"#,
            converter
                .convert_formatted(input, TextFormat::Json, Some(&re))
                .unwrap()
        );
    }

    #[test]
    fn test_html_escaping() {
        let dict: Table = dict_from(&[("<", &["&lt;"])]);
        let converter = Converter::new(dict);
        let output = converter
            .convert_formatted("a<b", TextFormat::Html, None)
            .unwrap();
        assert_eq!(
            "a<a atomic><del hidden>&lt;</del><ins>&amp;lt;</ins></a>b",
            output
        );
    }

    #[test]
    fn test_text_format_from_str() {
        assert_eq!(TextFormat::Txtm, "txtm".parse().unwrap());
        assert!(matches!(
            "htmlpage".parse::<TextFormat>(),
            Err(HanconvError::UnsupportedFormat(_))
        ));
    }
}
