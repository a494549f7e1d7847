use std::io::IsTerminal;

// Room taken by everything left of the input excerpt: line number (4),
// mark and padding, the 30-column call, the 4-column position, quotes.
const DECOR_WIDTH: usize = 4 + 1 + 2 + 30 + 2 + 4 + 3;
const MIN_TAIL_WIDTH: usize = 20;

pub(crate) fn format_line(
    num: usize,
    lvl: usize,
    glyph: char,
    call: &str,
    pos: usize,
    tail: &str,
    styled: bool,
) -> String {
    let mark = if styled {
        let style = glyph_style(glyph);
        format!("{}{glyph}{}", style.render(), style.render_reset())
    } else {
        glyph.to_string()
    };
    let indent = indent(lvl);
    let tail = escape_tail(tail, tail_width(indent.len()));
    format!("{num:>4} {indent}{mark} {call:<30}  {pos:>4} '{tail}'")
}

/// `lvl` spaces with the decimal digits of the level overwriting the
/// leading ones, so deep nesting stays legible without widening the line.
pub(crate) fn indent(lvl: usize) -> String {
    let mut pad = " ".repeat(lvl);
    if lvl > 0 {
        let digits = lvl.to_string();
        let n = digits.len().min(pad.len());
        pad.replace_range(..n, &digits[..n]);
    }
    pad
}

fn glyph_style(glyph: char) -> anstyle::Style {
    match glyph {
        '+' | '=' => anstyle::Style::new().fg_color(Some(anstyle::AnsiColor::Green.into())),
        'x' | '!' => anstyle::Style::new().fg_color(Some(anstyle::AnsiColor::Yellow.into())),
        _ => anstyle::Style::new(),
    }
}

fn escape_tail(tail: &str, width: usize) -> String {
    let mut out = String::new();
    let mut cols = 0;
    for ch in tail.chars() {
        if cols >= width {
            break;
        }
        match ch {
            '\n' => {
                out.push_str("\\n");
                cols += 2;
            }
            '\r' => {
                out.push_str("\\r");
                cols += 2;
            }
            '\t' => {
                out.push_str("\\t");
                cols += 2;
            }
            _ => {
                out.push(ch);
                cols += 1;
            }
        }
    }
    out
}

fn tail_width(indent: usize) -> usize {
    term_width()
        .saturating_sub(DECOR_WIDTH + indent)
        .max(MIN_TAIL_WIDTH)
}

fn term_width() -> usize {
    columns_env().or_else(query_width).unwrap_or(80)
}

fn query_width() -> Option<usize> {
    if std::io::stderr().is_terminal() {
        terminal_size::terminal_size().map(|(w, _h)| w.0.into())
    } else {
        None
    }
}

fn columns_env() -> Option<usize> {
    std::env::var("COLUMNS")
        .ok()
        .and_then(|c| c.parse::<usize>().ok())
}
