//! LaTeX 文本工具
//!
//! 转义、数学公式识别。正文里已有的数学公式和 `\command` 原样保留，
//! 其余文本中的特殊字符被转义。

use std::borrow::Cow;
use std::sync::LazyLock;

use phf::phf_map;
use regex::{Captures, Regex};

/// LaTeX 特殊字符（完整转义）
pub static LATEX_SPECIAL_CHARS: phf::Map<char, &'static str> = phf_map! {
    '&' => r"\&",
    '%' => r"\%",
    '$' => r"\$",
    '#' => r"\#",
    '_' => r"\_",
    '{' => r"\{",
    '}' => r"\}",
    '~' => r"\textasciitilde{}",
    '^' => r"\textasciicircum{}",
    '\\' => r"\textbackslash{}",
};

/// 正文转义：保留 `\`、`{`、`}`，以免破坏学生自己写的 LaTeX 命令
static TEXT_ESCAPES: phf::Map<char, &'static str> = phf_map! {
    '&' => r"\&",
    '%' => r"\%",
    '$' => r"\$",
    '#' => r"\#",
    '_' => r"\_",
    '^' => r"\textasciicircum{}",
};

/// pdflatex 默认不认识的常见 Unicode 数学符号
static UNICODE_SYMBOLS: phf::Map<char, &'static str> = phf_map! {
    '≤' => r"$\le$",
    '≥' => r"$\ge$",
    '≠' => r"$\neq$",
    '×' => r"$\times$",
    '÷' => r"$\div$",
    '±' => r"$\pm$",
    '→' => r"$\rightarrow$",
    '←' => r"$\leftarrow$",
    '∞' => r"$\infty$",
    '∈' => r"$\in$",
    '∑' => r"$\sum$",
    '√' => r"$\surd$",
    'α' => r"$\alpha$",
    'β' => r"$\beta$",
    'γ' => r"$\gamma$",
    'δ' => r"$\delta$",
    'θ' => r"$\theta$",
    'Θ' => r"$\Theta$",
    'λ' => r"$\lambda$",
    'π' => r"$\pi$",
    'Σ' => r"$\Sigma$",
    'Ω' => r"$\Omega$",
};

/// 数学公式或命令
///
/// - display: `$$…$$`、`\[…\]`
/// - inline: `\(…\)`、`$…$`
/// - cmd: `\name`、`\name*` 以及转义符号如 `\%`、`\\`
static LATEX_TOKEN: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r"(?s)(?P<display>\$\$.+?\$\$|\\\[.+?\\\])|(?P<inline>\\\(.+?\\\)|\$[^$]+\$)|(?P<cmd>\\[a-zA-Z]+\*?|\\[^a-zA-Z\s(\[])",
    )
    .expect("LATEX_TOKEN")
});

/// 裸指数表达式：`(b^k/2)^2`、`n^2`、`b^k/2`
static CARET_EXPR: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"\(([^)]*\^[^)]*)\)(?:\^(\d+))?|\w\^[\w/]+").expect("CARET_EXPR")
});

/// 文本片段
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Span<'a> {
    /// 普通文本
    Text(&'a str),
    /// 行内公式
    InlineMath(&'a str),
    /// 行间公式
    DisplayMath(&'a str),
    /// LaTeX 命令或转义符号
    Command(&'a str),
}

/// 段落之间的空行，行内公式不能跨过它
static BLANK_LINE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\n[ \t]*\n").expect("BLANK_LINE"));

/// 将文本切分为普通文本 / 数学公式 / 命令
///
/// 跨段落配对的 `$`（通常是金额）不算公式，留在普通文本中被转义。
pub fn split_latex(text: &str) -> Vec<Span<'_>> {
    let mut spans = Vec::new();
    let mut last = 0;
    let mut pos = 0;

    while let Some(caps) = LATEX_TOKEN.captures_at(text, pos) {
        let Some(whole) = caps.get(0) else { break };
        let inline = caps.name("inline").is_some();

        if inline && whole.as_str().starts_with('$') && BLANK_LINE.is_match(whole.as_str()) {
            pos = whole.start() + 1;
            continue;
        }

        if whole.start() > last {
            spans.push(Span::Text(&text[last..whole.start()]));
        }
        let span = if caps.name("display").is_some() {
            Span::DisplayMath(whole.as_str())
        } else if inline {
            Span::InlineMath(whole.as_str())
        } else {
            Span::Command(whole.as_str())
        };
        spans.push(span);
        last = whole.end();
        pos = last;
    }

    if last < text.len() {
        spans.push(Span::Text(&text[last..]));
    }
    spans
}

/// 完整转义，用于姓名、学号、行内代码
pub fn escape_all(text: &str) -> String {
    escape_with(text, &LATEX_SPECIAL_CHARS)
}

/// 正文转义（不识别公式，调用方负责先切分）
pub fn escape_text(text: &str) -> String {
    escape_with(text, &TEXT_ESCAPES)
}

fn escape_with(text: &str, table: &phf::Map<char, &'static str>) -> String {
    let mut out = String::with_capacity(text.len());
    for c in text.chars() {
        match table.get(&c).or_else(|| UNICODE_SYMBOLS.get(&c)) {
            Some(escaped) => out.push_str(escaped),
            None => out.push(c),
        }
    }
    out
}

/// 公式内部只需处理会破坏编译的字符
///
/// Unicode 符号换成对应的命令（已在公式中，不再包 `$`）。
pub fn escape_in_math(text: &str) -> Cow<'_, str> {
    let needs_escape = |c: char| matches!(c, '%' | '#' | '&') || UNICODE_SYMBOLS.contains_key(&c);
    if !text.chars().any(needs_escape) {
        return Cow::Borrowed(text);
    }

    let mut out = String::with_capacity(text.len() + 8);
    let mut chars = text.chars().peekable();
    while let Some(c) = chars.next() {
        match c {
            '%' | '#' | '&' => {
                out.push('\\');
                out.push(c);
            }
            _ => match UNICODE_SYMBOLS.get(&c) {
                Some(symbol) => {
                    out.push_str(symbol.trim_matches('$'));
                    // `\alpha` 后面紧跟字母会连成另一个命令
                    if chars.peek().is_some_and(|n| n.is_ascii_alphabetic()) {
                        out.push(' ');
                    }
                }
                None => out.push(c),
            },
        }
    }
    Cow::Owned(out)
}

/// 渲染正文：保留已有公式和命令，转义其余文本
///
/// `caret_math` 为 true 时，把裸指数表达式（如 `n^2`）包成行内公式。
/// `$$…$$` 统一改写为 `\[…\]`。
pub fn render_text(text: &str, caret_math: bool) -> String {
    let mut out = String::with_capacity(text.len() + 16);

    for span in split_latex(text) {
        match span {
            Span::Text(t) if caret_math => out.push_str(&wrap_caret_expressions(t)),
            Span::Text(t) => out.push_str(&escape_text(t)),
            Span::DisplayMath(m) => match m.strip_prefix("$$").and_then(|m| m.strip_suffix("$$")) {
                Some(inner) => {
                    out.push_str(r"\[");
                    out.push_str(inner);
                    out.push_str(r"\]");
                }
                None => out.push_str(m),
            },
            Span::InlineMath(m) | Span::Command(m) => out.push_str(m),
        }
    }
    out
}

/// 裸指数表达式包成公式，其余部分转义
fn wrap_caret_expressions(text: &str) -> String {
    let mut out = String::new();
    let mut last = 0;

    for caps in CARET_EXPR.captures_iter(text) {
        let Some(whole) = caps.get(0) else { continue };
        out.push_str(&escape_text(&text[last..whole.start()]));
        out.push_str(&caret_to_math(&caps));
        last = whole.end();
    }
    out.push_str(&escape_text(&text[last..]));
    out
}

fn caret_to_math(caps: &Captures<'_>) -> String {
    match caps.get(1) {
        Some(inner) => {
            let exp = caps
                .get(2)
                .map(|e| format!("^{{{}}}", e.as_str()))
                .unwrap_or_default();
            format!("$({}){}$", escape_in_math(inner.as_str()), exp)
        }
        None => format!("${}$", escape_in_math(&caps[0])),
    }
}

/// 只对公式以外的普通文本做变换（已渲染的 LaTeX 上使用）
pub fn map_outside_math<F>(latex: &str, mut f: F) -> String
where
    F: FnMut(&str) -> String,
{
    let mut out = String::with_capacity(latex.len());
    for span in split_latex(latex) {
        match span {
            Span::Text(t) => out.push_str(&f(t)),
            Span::InlineMath(m) | Span::DisplayMath(m) | Span::Command(m) => out.push_str(m),
        }
    }
    out
}
