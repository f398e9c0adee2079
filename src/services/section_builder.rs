//! 题目区块生成服务 - 业务能力层
//!
//! 把一个学生的问答题拼成模板中 `QUESTIONS_SECTION` 的内容

use std::sync::LazyLock;

use regex::{Captures, Regex};

use crate::models::EssayAnswer;
use crate::services::latex_text::map_outside_math;
use crate::services::markup_converter::MarkupConverter;

static SENTENCE_END: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\.\s+([\[*])?").expect("SENTENCE_END"));

static NUMBERED_LINE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\d+\.\s+").expect("NUMBERED_LINE"));

/// 题目区块生成器
#[derive(Debug, Clone)]
pub struct SectionBuilder {
    converter: MarkupConverter,
    long_answer_threshold: usize,
}

impl SectionBuilder {
    pub fn new(long_answer_threshold: usize) -> Self {
        Self {
            converter: MarkupConverter::new(),
            long_answer_threshold,
        }
    }

    /// 生成全部题目的 LaTeX，题号从 1 开始
    pub fn build(&self, answers: &[EssayAnswer]) -> String {
        answers
            .iter()
            .enumerate()
            .map(|(i, answer)| self.section(i + 1, answer))
            .collect::<Vec<_>>()
            .join("\n")
    }

    fn section(&self, number: usize, answer: &EssayAnswer) -> String {
        let question = self.converter.html_to_latex(&answer.prompt, true);
        let mut answer_text = self.converter.html_to_latex(&answer.answer, false);

        if !answer_text.contains('\n') && answer_text.chars().count() > self.long_answer_threshold {
            answer_text = break_sentences(&answer_text);
        }

        let question_section = if question.contains('\n') && NUMBERED_LINE.is_match(&question) {
            format!("\\begin{{small}}\n{}\n\\end{{small}}", algorithm_lines(&question))
        } else {
            question
        };

        format!(
            "\\section*{{Question {number}}}\n\
             \n\
             {question_section}\n\
             \n\
             \\vspace{{0.5em}}\n\
             \\noindent\\textbf{{Answer:}}\n\
             \n\
             \\begin{{RaggedRight}}\n\
             {answer_text}\n\
             \\end{{RaggedRight}}\n\
             \n\
             \\vspace{{1em}}\n"
        )
    }
}

/// 很长的单行答案：每句之后强制换行
fn break_sentences(text: &str) -> String {
    map_outside_math(text, |t| {
        SENTENCE_END
            .replace_all(t, |caps: &Captures<'_>| match caps.get(1) {
                // `\\` 后紧跟 `[` 或 `*` 会被当成参数
                Some(next) => format!(". \\\\{{}} {}", next.as_str()),
                None => ". \\\\ ".to_string(),
            })
            .into_owned()
    })
}

/// 算法类题干：逐行强制换行，去掉空行
fn algorithm_lines(question: &str) -> String {
    let lines: Vec<&str> = question
        .lines()
        .map(str::trim_end)
        .filter(|l| !l.trim().is_empty())
        .collect();

    let mut out = String::new();
    for (i, line) in lines.iter().enumerate() {
        out.push_str(line);
        if let Some(next) = lines.get(i + 1) {
            if next.trim_start().starts_with(['[', '*']) {
                out.push_str(" \\\\{}\n");
            } else {
                out.push_str(" \\\\\n");
            }
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    fn essay(prompt: &str, answer: &str) -> EssayAnswer {
        EssayAnswer {
            item_id: "1".to_string(),
            prompt: prompt.to_string(),
            answer: answer.to_string(),
            earned_points: None,
        }
    }

    #[test]
    fn test_single_section_layout() {
        let builder = SectionBuilder::new(200);
        let out = builder.build(&[essay("Explain merge sort.", "<p>It <b>splits</b>.</p>")]);

        assert_eq!(
            out,
            "\\section*{Question 1}\n\nExplain merge sort.\n\n\\vspace{0.5em}\n\\noindent\\textbf{Answer:}\n\n\\begin{RaggedRight}\nIt \\textbf{splits}.\n\\end{RaggedRight}\n\n\\vspace{1em}\n"
        );
    }

    #[test]
    fn test_sections_are_numbered_in_order() {
        let builder = SectionBuilder::new(200);
        let out = builder.build(&[essay("A", "x"), essay("B", "y")]);

        let first = out.find("Question 1").unwrap();
        let second = out.find("Question 2").unwrap();
        assert!(first < second);
        assert!(out.contains("\\vspace{1em}\n\n\\section*{Question 2}"));
    }

    #[test]
    fn test_long_answer_gets_sentence_breaks() {
        let builder = SectionBuilder::new(20);
        let out = builder.build(&[essay("Q", "First sentence here. Second one $a. b$ too. [1] cited")]);

        assert!(out.contains(r"First sentence here. \\ Second one $a. b$ too. \\{} [1] cited"));
    }

    #[test]
    fn test_short_answer_untouched() {
        let builder = SectionBuilder::new(200);
        let out = builder.build(&[essay("Q", "One. Two.")]);
        assert!(out.contains("\nOne. Two.\n"));
    }

    #[test]
    fn test_algorithm_question_uses_small_block() {
        let builder = SectionBuilder::new(200);
        let out = builder.build(&[essay("Consider: 1. split 2. recurse 3. merge", "ok")]);

        assert!(out.contains(
            "\\begin{small}\nConsider: \\\\\n1. split \\\\\n2. recurse \\\\\n3. merge\n\\end{small}"
        ));
    }
}
