use std::fmt::Write as _;
use std::fs::File;
use std::io::Read;
use std::path::Path;

use csv::{ErrorKind, ReaderBuilder, StringRecord};
use tracing::{debug, info};

use crate::error::{AppError, AppResult, InputError};
use crate::models::quiz::{QuestionColumns, QuizExport};
use crate::utils::logging::truncate_text;

const NAME_COLUMN: &str = "Name";
const ID_COLUMN: &str = "ID";

/// 从 CSV 文件加载 Canvas 测验导出
pub fn load_quiz_export(csv_path: &Path) -> AppResult<QuizExport> {
    info!("📄 正在读取 CSV 文件: {}", csv_path.display());

    if !csv_path.is_file() {
        return Err(InputError::CsvNotFound {
            path: csv_path.to_path_buf(),
        }
        .into());
    }

    let file = File::open(csv_path).map_err(|e| InputError::CsvReadFailed {
        path: csv_path.to_path_buf(),
        source: e.into(),
    })?;

    parse_quiz_export(file, csv_path)
}

/// 从任意 reader 解析导出数据，`source` 只用于错误信息
pub fn parse_quiz_export<R: Read>(reader: R, source: &Path) -> AppResult<QuizExport> {
    let mut rdr = ReaderBuilder::new().has_headers(true).from_reader(reader);

    let headers: Vec<String> = rdr
        .headers()
        .map_err(|e| InputError::CsvReadFailed {
            path: source.to_path_buf(),
            source: e,
        })?
        .iter()
        .map(|h| h.trim_start_matches('\u{feff}').to_string())
        .collect();

    let name_col = find_column(&headers, NAME_COLUMN)?;
    let id_col = find_column(&headers, ID_COLUMN)?;
    let questions = detect_question_columns(&headers);

    let mut rows: Vec<StringRecord> = Vec::new();
    for (index, record) in rdr.records().enumerate() {
        let record = record.map_err(|e| row_error(e, index, source))?;
        rows.push(record);
    }

    debug!(
        "CSV 共 {} 列, {} 行, 识别出 {} 道题",
        headers.len(),
        rows.len(),
        questions.len()
    );

    Ok(QuizExport {
        headers,
        questions,
        name_col,
        id_col,
        rows,
    })
}

fn find_column(headers: &[String], column: &str) -> AppResult<usize> {
    headers
        .iter()
        .position(|h| h == column)
        .ok_or_else(|| AppError::missing_column(column))
}

fn row_error(err: csv::Error, index: usize, source: &Path) -> AppError {
    // 表头占第一行
    let fallback_line = index as u64 + 2;
    let unequal_line = match err.kind() {
        ErrorKind::UnequalLengths { pos, .. } => {
            Some(pos.as_ref().map(|p| p.line()).unwrap_or(fallback_line))
        }
        _ => None,
    };

    match unequal_line {
        Some(line) => InputError::MalformedRow { line, source: err }.into(),
        None => InputError::CsvReadFailed {
            path: source.to_path_buf(),
            source: err,
        }
        .into(),
    }
}

/// 从表头识别题目列组
///
/// 每组五列：`ItemID*`, `ItemType*`, `<题干>`, `EarnedPoints*`, `Status*`。
/// 表头可能带有去重后缀（如 `ItemID.1`），因此按前缀匹配。
pub fn detect_question_columns(headers: &[String]) -> Vec<QuestionColumns> {
    let mut questions = Vec::new();
    let mut i = 0;

    while i < headers.len() {
        if headers[i].starts_with("ItemID") && i + 4 < headers.len() {
            if headers[i + 1].starts_with("ItemType")
                && headers[i + 3].starts_with("EarnedPoints")
                && headers[i + 4].starts_with("Status")
            {
                questions.push(QuestionColumns {
                    item_id: i,
                    item_type: i + 1,
                    answer: i + 2,
                    earned_points: i + 3,
                    status: i + 4,
                    prompt: headers[i + 2].clone(),
                });
            }
            i += 5;
        } else {
            i += 1;
        }
    }

    questions
}

/// 生成 CSV 结构报告（`--inspect`）
///
/// 列出识别出的题目列组，以及第一个学生每道题的状态。
pub fn describe_layout(export: &QuizExport) -> String {
    let mut out = String::new();
    let _ = writeln!(
        out,
        "CSV: {} 列, {} 行, 识别出 {} 道题",
        export.headers().len(),
        export.row_count(),
        export.questions().len()
    );

    for (n, q) in export.questions().iter().enumerate() {
        let _ = writeln!(
            out,
            "  题目 {:>2} | 列 {}-{} | {}",
            n + 1,
            q.item_id,
            q.status,
            truncate_text(&q.prompt, 80)
        );
    }

    let Some((name, id)) = export.identity(0) else {
        return out;
    };

    let _ = writeln!(out, "\n第一个学生: {} ({})", name, id);
    for (n, block) in export.blocks(0).iter().enumerate() {
        let marker = if block.is_graded_essay() { "✓" } else { " " };
        let _ = writeln!(
            out,
            "  {} 题目 {:>2} | {} | {} | 得分 {:?} | {}",
            marker,
            n + 1,
            block.item_type,
            block.status,
            block.earned_points,
            truncate_text(block.answer.trim(), 60)
        );
    }

    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    const SAMPLE: &str = "\
Name,ID,SIS ID,ItemID,ItemType,Explain merge sort.,EarnedPoints,Status,ItemID.1,ItemType.1,Pick one,EarnedPoints.1,Status.1,ItemID.2,ItemType.2,Prove T(n) = 2T(n/2) + n.,EarnedPoints.2,Status.2
Alice Smith,101,s1,11,essay,<p>It <strong>splits</strong> the array.</p>,4,Graded,12,multiple_choice,B,1,Graded,13,essay,By induction,2.5,Graded
Bob Jones,102,s2,11,essay,,0,Graded,12,multiple_choice,A,0,Graded,13,essay,pending,,Needs Grading
Carol King,103,s3,11,essay,Divide and conquer,3,Graded,12,multiple_choice,B,1,Graded,13,essay,,0,Graded
";

    fn sample_export() -> QuizExport {
        parse_quiz_export(SAMPLE.as_bytes(), Path::new("sample.csv")).unwrap()
    }

    #[test]
    fn test_detect_question_columns() {
        let export = sample_export();
        let questions = export.questions();

        assert_eq!(questions.len(), 3);
        assert_eq!(questions[0].item_id, 3);
        assert_eq!(questions[0].prompt, "Explain merge sort.");
        assert_eq!(questions[1].status, 12);
        assert_eq!(questions[2].prompt, "Prove T(n) = 2T(n/2) + n.");
    }

    #[test]
    fn test_broken_block_is_skipped() {
        let headers: Vec<String> = ["ItemID", "ItemType", "Q", "Points", "Status", "ItemID", "ItemType", "Q2", "EarnedPoints", "Status"]
            .iter()
            .map(|s| s.to_string())
            .collect();

        let questions = detect_question_columns(&headers);
        assert_eq!(questions.len(), 1);
        assert_eq!(questions[0].prompt, "Q2");
    }

    #[test]
    fn test_trailing_partial_block_is_ignored() {
        let headers: Vec<String> = ["Name", "ItemID", "ItemType", "Q", "EarnedPoints"]
            .iter()
            .map(|s| s.to_string())
            .collect();
        assert!(detect_question_columns(&headers).is_empty());
    }

    #[test]
    fn test_students_filter_graded_essays() {
        let students = sample_export().students(None);

        // Bob 没有已批改且非空的问答题
        assert_eq!(students.len(), 2);

        let alice = &students[0];
        assert_eq!(alice.name, "Alice Smith");
        assert_eq!(alice.id, "101");
        assert_eq!(alice.answers.len(), 2);
        assert_eq!(alice.answers[0].prompt, "Explain merge sort.");
        assert_eq!(alice.answers[1].earned_points, Some(2.5));

        let carol = &students[1];
        assert_eq!(carol.answers.len(), 1);
        assert_eq!(carol.answers[0].answer, "Divide and conquer");
    }

    #[test]
    fn test_limit_applies_before_filtering() {
        let export = sample_export();
        assert_eq!(export.students(Some(2)).len(), 1);
        assert_eq!(export.students(Some(100)).len(), 2);
        // 0 表示不限制
        assert_eq!(export.students(Some(0)).len(), 2);
    }

    #[test]
    fn test_missing_name_column() {
        let csv = "Student,ID\nAlice,1\n";
        let err = parse_quiz_export(csv.as_bytes(), Path::new("x.csv")).unwrap_err();
        assert!(matches!(
            err,
            AppError::Input(InputError::MissingColumn { ref column }) if column == "Name"
        ));
    }

    #[test]
    fn test_malformed_row_reports_line() {
        let csv = "Name,ID\nAlice,1\nBob,2,extra\n";
        let err = parse_quiz_export(csv.as_bytes(), Path::new("x.csv")).unwrap_err();
        match err {
            AppError::Input(InputError::MalformedRow { line, .. }) => assert_eq!(line, 3),
            other => panic!("意外的错误: {other}"),
        }
    }

    #[test]
    fn test_bom_is_stripped_from_headers() {
        let csv = "\u{feff}Name,ID\nAlice,1\n";
        let export = parse_quiz_export(csv.as_bytes(), Path::new("x.csv")).unwrap();
        assert_eq!(export.identity(0), Some(("Alice", "1")));
    }

    #[test]
    fn test_load_missing_file() {
        let err = load_quiz_export(Path::new("/definitely/not/here.csv")).unwrap_err();
        assert!(matches!(err, AppError::Input(InputError::CsvNotFound { .. })));
    }

    #[test]
    fn test_load_from_file() {
        let mut file = NamedTempFile::new().unwrap();
        file.write_all(SAMPLE.as_bytes()).unwrap();

        let export = load_quiz_export(file.path()).unwrap();
        assert_eq!(export.row_count(), 3);
    }

    #[test]
    fn test_describe_layout() {
        let report = describe_layout(&sample_export());
        assert!(report.contains("识别出 3 道题"));
        assert!(report.contains("第一个学生: Alice Smith (101)"));
        assert!(report.contains("multiple_choice"));
    }
}
