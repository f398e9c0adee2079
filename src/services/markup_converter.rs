//! HTML → LaTeX 转换服务 - 业务能力层
//!
//! Canvas 导出里的题干是纯文本，答案是富文本编辑器生成的 HTML。
//! 这里只处理 Canvas 编辑器会产生的那一小部分标签：
//! 粗体/斜体/下划线、上下标、公式图片、代码块和段落结构。

use std::sync::LazyLock;

use phf::phf_map;
use regex::Regex;

use crate::services::latex_text::{escape_all, escape_in_math, render_text};

/// HTML 标签或注释；引号内的 `>` 不结束标签（公式属性里常见 `x > 0`）
static HTML_TAG: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"(?s)<!--.*?-->|<(/?)([a-zA-Z][a-zA-Z0-9]*)((?:[^>"']|"[^"]*"|'[^']*')*)>"#)
        .expect("HTML_TAG")
});

/// 标签属性：`name="v"`、`name='v'`、`name=v`
static HTML_ATTR: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"([a-zA-Z_:][-a-zA-Z0-9_:.]*)\s*=\s*(?:"([^"]*)"|'([^']*)'|([^\s"'>]+))"#)
        .expect("HTML_ATTR")
});

static HTML_ENTITY: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"&(#[0-9]+|#[xX][0-9a-fA-F]+|[a-zA-Z][a-zA-Z0-9]*);").expect("HTML_ENTITY")
});

static NUMBERED_LINE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(\d+\.\s+)").expect("NUMBERED_LINE"));

static PARAGRAPH_BREAK: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\n\s*\n").expect("PARAGRAPH_BREAK"));

static MULTI_SPACE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"  +").expect("MULTI_SPACE"));

static SPACE_AROUND_NEWLINE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"[ \t]*\n[ \t]*").expect("SPACE_AROUND_NEWLINE"));

static INDENT: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"(?m)^((?: {4})+)").expect("INDENT"));

static NAMED_ENTITIES: phf::Map<&'static str, &'static str> = phf_map! {
    "amp" => "&",
    "lt" => "<",
    "gt" => ">",
    "quot" => "\"",
    "apos" => "'",
    "nbsp" => "\u{a0}",
    "ensp" => "\u{2002}",
    "emsp" => "\u{2003}",
    "thinsp" => " ",
    "ndash" => "–",
    "mdash" => "—",
    "hellip" => "…",
    "lsquo" => "‘",
    "rsquo" => "’",
    "ldquo" => "“",
    "rdquo" => "”",
    "middot" => "·",
    "times" => "×",
    "divide" => "÷",
    "le" => "≤",
    "ge" => "≥",
    "ne" => "≠",
    "plusmn" => "±",
    "deg" => "°",
    "minus" => "-",
    "rarr" => "→",
    "larr" => "←",
    "infin" => "∞",
};

/// 没有闭合标签的元素
const VOID_ELEMENTS: &[&str] = &[
    "area", "base", "br", "col", "embed", "hr", "img", "input", "link", "meta", "source", "wbr",
];

/// 不插入分隔空格的行内标签
const INLINE_ELEMENTS: &[&str] = &[
    "a", "abbr", "b", "code", "em", "font", "i", "span", "strong", "sub", "sup", "u",
];

/// 结束时产生段落的块级标签
const BLOCK_ELEMENTS: &[&str] = &[
    "blockquote", "div", "h1", "h2", "h3", "h4", "h5", "h6", "li", "ol", "p", "table", "tr", "ul",
];

/// HTML 转 LaTeX 转换器
#[derive(Debug, Clone, Copy, Default)]
pub struct MarkupConverter;

impl MarkupConverter {
    pub fn new() -> Self {
        Self
    }

    /// 转换题干或答案
    ///
    /// # 参数
    /// - `content`: CSV 单元格内容（纯文本或 HTML）
    /// - `is_question`: 是否为题干（题干中的缩进转换为 `\quad`）
    ///
    /// # 返回
    /// 可以直接放进文档的 LaTeX 文本
    pub fn html_to_latex(&self, content: &str, is_question: bool) -> String {
        if content.trim().is_empty() {
            return String::new();
        }

        if !content.contains('<') {
            return self.plain_to_latex(content, is_question);
        }

        let fragments = HtmlRenderer::render(content);
        assemble(fragments)
    }

    /// 纯文本（没有 HTML 标签）
    fn plain_to_latex(&self, content: &str, is_question: bool) -> String {
        let mut text = replace_unicode_spaces(content.trim());

        let quad_indent = is_question && text.contains('\n');
        if quad_indent {
            text = INDENT
                .replace_all(&text, |caps: &regex::Captures<'_>| {
                    r"\quad ".repeat(caps[1].len() / 4)
                })
                .into_owned();
        }

        text = MULTI_SPACE.replace_all(&text, " ").into_owned();
        if NUMBERED_LINE.is_match(&text) {
            text = split_numbered_lines(&text);
        }

        render_text(text.trim(), false)
    }
}

/// 转换过程中的片段
#[derive(Debug, Clone, PartialEq)]
enum Fragment {
    /// 普通文本：后续做编号换行、指数公式、转义
    Text(String),
    /// 转换器生成的 LaTeX
    Raw(String),
    /// 行内代码：完整转义
    Literal(String),
    /// `<pre>` 内容：原样输出
    Verbatim(String),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum OnClose {
    Raw(&'static str),
    Paragraph,
    Separator,
    EndMath,
    EndCode,
    EndPre,
    EndSkip,
}

struct OpenTag {
    name: String,
    on_close: OnClose,
}

/// 基于栈的简单 HTML 遍历
#[derive(Default)]
struct HtmlRenderer {
    out: Vec<Fragment>,
    stack: Vec<OpenTag>,
    math_depth: usize,
    code_depth: usize,
    pre_depth: usize,
    skip_depth: usize,
}

impl HtmlRenderer {
    fn render(html: &str) -> Vec<Fragment> {
        let mut renderer = Self::default();
        let mut last = 0;

        for caps in HTML_TAG.captures_iter(html) {
            let Some(whole) = caps.get(0) else { continue };
            renderer.text(&html[last..whole.start()]);
            last = whole.end();

            // 注释
            let Some(name) = caps.get(2) else { continue };
            let name = name.as_str().to_ascii_lowercase();
            let closing = caps.get(1).is_some_and(|m| !m.as_str().is_empty());
            let attrs = caps.get(3).map_or("", |m| m.as_str());

            if closing {
                renderer.close(&name);
            } else {
                renderer.open(&name, attrs);
            }
        }
        renderer.text(&html[last..]);

        // 未闭合的标签
        while let Some(tag) = renderer.stack.pop() {
            renderer.finish(tag.on_close);
        }
        renderer.out
    }

    fn push(&mut self, fragment: Fragment) {
        match (self.out.last_mut(), fragment) {
            (Some(Fragment::Text(prev)), Fragment::Text(next)) => prev.push_str(&next),
            (Some(Fragment::Verbatim(prev)), Fragment::Verbatim(next)) => prev.push_str(&next),
            (_, fragment) => self.out.push(fragment),
        }
    }

    fn text(&mut self, raw: &str) {
        if raw.is_empty() || self.skip_depth > 0 {
            return;
        }
        let decoded = decode_entities(raw);
        let fragment = if self.pre_depth > 0 {
            Fragment::Verbatim(decoded)
        } else if self.math_depth > 0 {
            Fragment::Raw(escape_in_math(&replace_unicode_spaces(&decoded)).into_owned())
        } else if self.code_depth > 0 {
            Fragment::Literal(decoded)
        } else {
            Fragment::Text(decoded)
        };
        self.push(fragment);
    }

    fn open(&mut self, name: &str, attrs: &str) {
        if self.skip_depth > 0 {
            if matches!(name, "script" | "style") {
                self.enter(name, OnClose::EndSkip);
                self.skip_depth += 1;
            }
            return;
        }
        // <pre> 内部忽略所有标签
        if self.pre_depth > 0 {
            if name == "pre" {
                self.enter(name, OnClose::EndPre);
                self.pre_depth += 1;
            }
            return;
        }

        let self_closing = attrs.trim_end().ends_with('/');
        let is_void = VOID_ELEMENTS.contains(&name) || self_closing;

        match name {
            "br" => self.push(Fragment::Text("\n".to_string())),
            "img" => {
                if let Some(latex) = equation_image(attrs) {
                    self.push(Fragment::Raw(format!(" {} ", latex)));
                }
            }
            "script" | "style" => {
                self.enter(name, OnClose::EndSkip);
                self.skip_depth += 1;
            }
            "pre" => {
                self.enter(name, OnClose::EndPre);
                self.pre_depth += 1;
            }
            _ if is_void => {}
            "strong" | "b" => self.wrap(name, r"\textbf{", "}"),
            "em" | "i" => self.wrap(name, r"\textit{", "}"),
            "u" => self.wrap(name, r"\underline{", "}"),
            "sub" | "sup" => {
                let mark = if name == "sub" { "_" } else { "^" };
                let open = if self.math_depth > 0 {
                    format!("{mark}{{")
                } else {
                    format!("${mark}{{")
                };
                self.push(Fragment::Raw(open));
                self.enter(name, OnClose::EndMath);
                self.math_depth += 1;
            }
            "code" => {
                self.push(Fragment::Raw(r"\texttt{".to_string()));
                self.enter(name, OnClose::EndCode);
                self.code_depth += 1;
            }
            _ if BLOCK_ELEMENTS.contains(&name) => {
                self.push(Fragment::Text(" ".to_string()));
                self.enter(name, OnClose::Paragraph);
            }
            _ if INLINE_ELEMENTS.contains(&name) => self.enter(name, OnClose::Raw("")),
            _ => {
                self.push(Fragment::Text(" ".to_string()));
                self.enter(name, OnClose::Separator);
            }
        }
    }

    fn wrap(&mut self, name: &str, open: &'static str, close: &'static str) {
        self.push(Fragment::Raw(open.to_string()));
        self.enter(name, OnClose::Raw(close));
    }

    fn enter(&mut self, name: &str, on_close: OnClose) {
        self.stack.push(OpenTag {
            name: name.to_string(),
            on_close,
        });
    }

    fn close(&mut self, name: &str) {
        // 在 <pre>/<script> 内部只认对应的结束标签
        if self.pre_depth > 0 && name != "pre" {
            return;
        }
        if self.skip_depth > 0 && !matches!(name, "script" | "style") {
            return;
        }

        let Some(pos) = self.stack.iter().rposition(|t| t.name == name) else {
            return;
        };
        while self.stack.len() > pos {
            if let Some(tag) = self.stack.pop() {
                self.finish(tag.on_close);
            }
        }
    }

    fn finish(&mut self, on_close: OnClose) {
        match on_close {
            OnClose::Raw(s) => {
                if !s.is_empty() {
                    self.push(Fragment::Raw(s.to_string()));
                }
            }
            OnClose::Paragraph => self.push(Fragment::Text("\n\n".to_string())),
            OnClose::Separator => self.push(Fragment::Text(" ".to_string())),
            OnClose::EndMath => {
                self.math_depth = self.math_depth.saturating_sub(1);
                let close = if self.math_depth > 0 { "}" } else { "}$" };
                self.push(Fragment::Raw(close.to_string()));
            }
            OnClose::EndCode => {
                self.code_depth = self.code_depth.saturating_sub(1);
                self.push(Fragment::Raw("}".to_string()));
            }
            OnClose::EndPre => {
                self.pre_depth = self.pre_depth.saturating_sub(1);
                // 相邻的两个 <pre> 不合并
                if self.pre_depth == 0 {
                    self.out.push(Fragment::Raw(String::new()));
                }
            }
            OnClose::EndSkip => self.skip_depth = self.skip_depth.saturating_sub(1),
        }
    }
}

/// Canvas 公式编辑器插入的图片：`<img class="equation_image" data-equation-content="...">`
fn equation_image(attrs: &str) -> Option<String> {
    let mut class = None;
    let mut content = None;
    let mut title = None;

    for caps in HTML_ATTR.captures_iter(attrs) {
        let value = caps
            .get(2)
            .or_else(|| caps.get(3))
            .or_else(|| caps.get(4))
            .map_or("", |m| m.as_str());
        match caps[1].to_ascii_lowercase().as_str() {
            "class" => class = Some(value),
            "data-equation-content" => content = Some(value),
            "title" => title = Some(value),
            _ => {}
        }
    }

    if !class.is_some_and(|c| c.split_whitespace().any(|c| c == "equation_image")) {
        return None;
    }

    let latex = [content, title]
        .into_iter()
        .flatten()
        .map(decode_entities)
        .find(|s| !s.trim().is_empty())?;
    let latex = latex.trim();

    if latex.starts_with('$') {
        Some(latex.to_string())
    } else {
        Some(format!("${latex}$"))
    }
}

/// 解码 HTML 实体，未知实体原样保留
fn decode_entities(text: &str) -> String {
    if !text.contains('&') {
        return text.to_string();
    }
    HTML_ENTITY
        .replace_all(text, |caps: &regex::Captures<'_>| {
            let entity = &caps[1];
            let decoded = if let Some(hex) = entity
                .strip_prefix("#x")
                .or_else(|| entity.strip_prefix("#X"))
            {
                u32::from_str_radix(hex, 16).ok().and_then(char::from_u32).map(String::from)
            } else if let Some(dec) = entity.strip_prefix('#') {
                dec.parse().ok().and_then(char::from_u32).map(String::from)
            } else {
                NAMED_ENTITIES.get(entity).map(|s| s.to_string())
            };
            decoded.unwrap_or_else(|| caps[0].to_string())
        })
        .into_owned()
}

fn replace_unicode_spaces(text: &str) -> String {
    text.replace(['\u{a0}', '\u{2002}', '\u{2003}'], " ")
}

/// 在每个 `1. `、`2. ` 前换行
fn split_numbered_lines(text: &str) -> String {
    NUMBERED_LINE
        .replace_all(text, "\n$1")
        .trim()
        .to_string()
}

/// 拼接片段：文本先整理空白，再转义；代码块原样保留
fn assemble(mut fragments: Vec<Fragment>) -> String {
    for fragment in fragments.iter_mut() {
        if let Fragment::Text(t) = fragment {
            *t = replace_unicode_spaces(t);
        }
    }

    let numbered = fragments
        .iter()
        .any(|f| matches!(f, Fragment::Text(t) if NUMBERED_LINE.is_match(t)));

    // 以代码块为界分段，段落之间用空行连接
    let mut parts: Vec<String> = Vec::new();
    let mut run = String::new();

    for fragment in fragments {
        match fragment {
            Fragment::Text(t) => {
                let t = normalize_whitespace(&t);
                let t = if numbered {
                    NUMBERED_LINE.replace_all(&t, "\n$1").into_owned()
                } else {
                    t
                };
                run.push_str(&render_text(&t, true));
            }
            Fragment::Raw(r) => run.push_str(&r),
            Fragment::Literal(l) => run.push_str(&escape_all(&l)),
            Fragment::Verbatim(v) => {
                flush_run(&mut parts, &mut run);
                let body = v.strip_prefix('\n').unwrap_or(&v).trim_end();
                parts.push(format!("\\begin{{verbatim}}\n{body}\n\\end{{verbatim}}"));
            }
        }
    }
    flush_run(&mut parts, &mut run);

    parts.join("\n\n")
}

fn flush_run(parts: &mut Vec<String>, run: &mut String) {
    let text = normalize_whitespace(run);
    let text = text.trim();
    if !text.is_empty() {
        parts.push(text.to_string());
    }
    run.clear();
}

fn normalize_whitespace(text: &str) -> String {
    let text = PARAGRAPH_BREAK.replace_all(text, "\n\n");
    let text = MULTI_SPACE.replace_all(&text, " ");
    SPACE_AROUND_NEWLINE.replace_all(&text, "\n").into_owned()
}
