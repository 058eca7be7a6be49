//! Unicode composite unit segmentation
//!
//! A composite unit is one or more scalar values that must travel together
//! through matching and conversion: a base character with trailing combining
//! marks or variation selectors, or an Ideographic Description Sequence (IDS)
//! introduced by an IDC operator. Iteration is by scalar value, never by
//! UTF-16 code unit.

/// Number of operands taken by a prefix composer, if `c` is one.
///
/// U+303E (ideographic variation indicator) takes one operand; IDC operators
/// take two or three.
fn prefix_arity(c: char) -> Option<usize> {
    match c {
        '\u{303E}' => Some(1),
        '\u{2FF0}'..='\u{2FF1}' => Some(2),
        '\u{2FF2}'..='\u{2FF3}' => Some(3),
        '\u{2FF4}'..='\u{2FFB}' => Some(2),
        _ => None,
    }
}

/// Combining marks and variation selectors that glue onto the preceding
/// character.
fn is_postfix_composer(c: char) -> bool {
    matches!(c,
        '\u{0300}'..='\u{036F}'        // combining diacritical marks
        | '\u{1AB0}'..='\u{1AFF}'
        | '\u{1DC0}'..='\u{1DFF}'
        | '\u{20D0}'..='\u{20FF}'
        | '\u{FE20}'..='\u{FE2F}'
        | '\u{180B}'..='\u{180D}'      // Mongolian free variation selectors
        | '\u{FE00}'..='\u{FE0F}'      // variation selectors
        | '\u{E0100}'..='\u{E01EF}'    // variation selectors supplement
    )
}

/// Characters acceptable as an IDS leaf operand:
/// ideographic-or-compatible characters plus the U+FF1F placeholder.
fn is_ids_operand_char(c: char) -> bool {
    matches!(c,
        '\u{FF1F}'
        | '\u{3005}'..='\u{3007}'
        | '\u{2E80}'..='\u{2EFF}'      // CJK radicals supplement
        | '\u{2F00}'..='\u{2FDF}'      // Kangxi radicals
        | '\u{31C0}'..='\u{31EF}'      // CJK strokes
        | '\u{3400}'..='\u{4DBF}'
        | '\u{4E00}'..='\u{9FFF}'
        | '\u{E000}'..='\u{F8FF}'      // PUA, appears in some IDS data sets
        | '\u{F900}'..='\u{FAFF}'
        | '\u{20000}'..='\u{3FFFF}'    // planes 2-3
    )
}

/// Absorb any run of postfix composers starting at `pos`.
fn consume_postfix(chars: &[char], pos: usize) -> usize {
    let mut j = pos;
    while j < chars.len() && is_postfix_composer(chars[j]) {
        j += 1;
    }
    j
}

/// End index (exclusive) of the composite unit starting at `pos`.
///
/// Grammar: `IDS := ideographic-or-compatible char | U+FF1F | operator IDS{1,3}`.
/// An invalid operand aborts extension: everything consumed so far stays one
/// unit and the offending character starts the next unit. Text ending with an
/// incomplete IDS yields one oversized unit spanning to end of text.
fn composite_length(chars: &[char], pos: usize) -> usize {
    let Some(arity) = prefix_arity(chars[pos]) else {
        return consume_postfix(chars, pos + 1);
    };

    // pending[k] = operands still owed at IDS nesting level k
    let mut pending: Vec<usize> = vec![arity];
    let mut j = pos + 1;
    while !pending.is_empty() {
        if j >= chars.len() {
            return chars.len();
        }
        let c = chars[j];
        if let Some(a) = prefix_arity(c) {
            pending.push(a);
            j += 1;
            continue;
        }
        if !is_ids_operand_char(c) {
            return j;
        }
        j = consume_postfix(chars, j + 1);
        // one operand satisfied; completed levels cascade upward
        loop {
            let top = pending.last_mut().unwrap();
            *top -= 1;
            if *top > 0 {
                break;
            }
            pending.pop();
            j = consume_postfix(chars, j);
            if pending.is_empty() {
                break;
            }
        }
    }
    j
}

/// Split `text` into composite units. Pure function; concatenating the
/// returned units reproduces the input exactly.
pub fn split(text: &str) -> Vec<String> {
    let chars: Vec<char> = text.chars().collect();
    let mut units = Vec::new();
    let mut i = 0;
    while i < chars.len() {
        let end = composite_length(&chars, i);
        units.push(chars[i..end].iter().collect());
        i = end;
    }
    units
}
